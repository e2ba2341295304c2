// Program binaries
//
// Vulkan consumes SPIR-V words. build.rs compiles the GLSL sources under
// shaders/ with glslc; this module loads the results by program name
// ("vert", "frag", "comp", "test") so objects can create shader modules.

use anyhow::{Context, Result};
use std::collections::HashMap;
use std::fs::File;
use std::path::Path;

use crate::error::{TestError, TestResultOf};

/// Compiled SPIR-V programs keyed by name
#[derive(Debug, Default, Clone)]
pub struct BinaryCollection {
    programs: HashMap<String, Vec<u32>>,
}

impl BinaryCollection {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Load every `*.spv` in `dir`, named by file stem.
    /// A missing directory yields an empty collection.
    pub fn load<P: AsRef<Path>>(dir: P) -> Result<Self> {
        let dir = dir.as_ref();
        let mut collection = Self::empty();

        if !dir.is_dir() {
            log::warn!("Shader directory {:?} not found, programs unavailable", dir);
            return Ok(collection);
        }

        let entries = std::fs::read_dir(dir)
            .with_context(|| format!("Failed to read shader directory: {:?}", dir))?;

        for entry in entries {
            let path = entry?.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some("spv") {
                continue;
            }
            let Some(name) = path.file_stem().and_then(|stem| stem.to_str()) else {
                continue;
            };

            // read_spv checks the length and fixes alignment for us
            let mut file = File::open(&path)
                .with_context(|| format!("Failed to open {:?}", path))?;
            let words = ash::util::read_spv(&mut file)
                .with_context(|| format!("Invalid SPIR-V in {:?}", path))?;

            log::debug!("Loaded program '{}' ({} words)", name, words.len());
            collection.programs.insert(name.to_string(), words);
        }

        log::info!("Loaded {} program binaries from {:?}", collection.len(), dir);
        Ok(collection)
    }

    pub fn insert(&mut self, name: impl Into<String>, words: Vec<u32>) {
        self.programs.insert(name.into(), words);
    }

    /// SPIR-V for `name`; NotSupported if it was never compiled
    pub fn get(&self, name: &str) -> TestResultOf<&[u32]> {
        self.programs
            .get(name)
            .map(Vec::as_slice)
            .ok_or_else(|| TestError::not_supported(format!("Program binary '{}' not available", name)))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.programs.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.programs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.programs.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::status::TestResult;

    #[test]
    fn missing_program_is_not_supported() {
        let binaries = BinaryCollection::empty();
        let err = binaries.get("comp").unwrap_err();
        assert_eq!(err.result(), TestResult::NotSupported);
    }

    #[test]
    fn inserted_program_is_found() {
        let mut binaries = BinaryCollection::empty();
        binaries.insert("vert", vec![0x0723_0203, 0x0001_0000]);
        assert!(binaries.contains("vert"));
        assert_eq!(binaries.get("vert").unwrap().len(), 2);
    }

    #[test]
    fn missing_directory_loads_empty() {
        let binaries = BinaryCollection::load("definitely/not/a/dir").unwrap();
        assert!(binaries.is_empty());
    }

    #[test]
    fn loads_spv_files_by_stem() {
        let dir = std::env::temp_dir().join(format!("objmgmt-binaries-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();

        let words: [u32; 5] = [0x0723_0203, 0x0001_0000, 0, 1, 0];
        let bytes: Vec<u8> = words.iter().flat_map(|w| w.to_le_bytes()).collect();
        std::fs::write(dir.join("comp.spv"), &bytes).unwrap();
        std::fs::write(dir.join("notes.txt"), b"ignored").unwrap();

        let binaries = BinaryCollection::load(&dir).unwrap();
        assert_eq!(binaries.len(), 1);
        assert_eq!(binaries.get("comp").unwrap(), &words);

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn every_built_program_is_found_by_name() {
        let dir = std::env::temp_dir().join(format!("objmgmt-programs-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();

        let bytes: Vec<u8> = [0x0723_0203u32, 0x0001_0000].iter().flat_map(|w| w.to_le_bytes()).collect();
        for name in ["vert", "frag", "comp", "test"] {
            std::fs::write(dir.join(format!("{}.spv", name)), &bytes).unwrap();
        }

        let binaries = BinaryCollection::load(&dir).unwrap();
        for name in ["vert", "frag", "comp", "test"] {
            assert!(binaries.contains(name), "{}", name);
        }

        std::fs::remove_dir_all(&dir).unwrap();
    }
}
