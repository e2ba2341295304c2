// Compiles the object-management programs to shaders/<name>.spv
//
// Without glslc the build still succeeds; cases that need a missing program
// report NotSupported when they run.

use std::process::Command;

/// Program name -> GLSL source. The name is what `BinaryCollection::get` looks up.
const PROGRAMS: &[(&str, &str)] = &[
    ("vert", "shaders/vert.vert"),
    ("frag", "shaders/frag.frag"),
    ("comp", "shaders/comp.comp"),
    ("test", "shaders/comp.comp"),
];

fn main() {
    println!("cargo:rerun-if-changed=shaders/");

    let mut missing = Vec::new();

    for &(name, source) in PROGRAMS {
        let binary = format!("shaders/{}.spv", name);

        match Command::new("glslc").args([source, "-o", binary.as_str()]).status() {
            Ok(status) if status.success() => {}
            Ok(status) => panic!("glslc rejected {} (program '{}'): {:?}", source, name, status.code()),
            Err(e) => {
                println!("cargo:warning=glslc unavailable for '{}': {}", name, e);
                missing.push(name);
            }
        }
    }

    if !missing.is_empty() {
        println!("cargo:warning=programs not built: {}", missing.join(", "));
    }
}
