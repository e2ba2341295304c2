// VkInstance

use ash::vk;
use std::ffi::{CStr, CString};

use super::{safe_object_count, Context, Environment, Object, MAX_CONCURRENT_INSTANCES};
use crate::backend::UniqueInstance;
use crate::error::{TestError, TestResultOf, VkCheck};

/// Instance extensions that became core, with the version that absorbed them
const CORE_INSTANCE_EXTENSIONS: &[(&str, u32)] = &[
    ("VK_KHR_device_group_creation", vk::API_VERSION_1_1),
    ("VK_KHR_external_fence_capabilities", vk::API_VERSION_1_1),
    ("VK_KHR_external_memory_capabilities", vk::API_VERSION_1_1),
    ("VK_KHR_external_semaphore_capabilities", vk::API_VERSION_1_1),
    ("VK_KHR_get_physical_device_properties2", vk::API_VERSION_1_1),
];

pub fn is_core_instance_extension(api_version: u32, name: &str) -> bool {
    CORE_INSTANCE_EXTENSIONS
        .iter()
        .any(|&(ext, core_version)| ext == name && api_version >= core_version)
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InstanceParameters {
    pub extensions: Vec<String>,
}

impl InstanceParameters {
    pub fn with_extensions(extensions: &[&str]) -> Self {
        Self {
            extensions: extensions.iter().map(|ext| ext.to_string()).collect(),
        }
    }
}

pub struct Instance;

impl Object for Instance {
    type Parameters = InstanceParameters;
    type Resources = ();
    type Handle = UniqueInstance;

    const TYPE_NAME: &'static str = "VkInstance";
    const CREATE_COUNT: u32 = 20;

    fn resources(_env: &Environment, _params: &InstanceParameters) -> TestResultOf<()> {
        Ok(())
    }

    fn create(env: &Environment, _res: &(), params: &InstanceParameters) -> TestResultOf<UniqueInstance> {
        let available = env
            .entry
            .enumerate_instance_extension_properties(None)
            .check("vkEnumerateInstanceExtensionProperties")?;

        let mut names = Vec::new();
        for ext in &params.extensions {
            if is_core_instance_extension(env.api_version, ext) {
                continue;
            }
            let supported = available
                .iter()
                .any(|props| unsafe { CStr::from_ptr(props.extension_name.as_ptr()) }.to_bytes() == ext.as_bytes());
            if !supported {
                return Err(TestError::not_supported(format!("{} is not supported", ext)));
            }
            let name = CString::new(ext.as_str())
                .map_err(|_| TestError::Internal(format!("Bad extension name '{}'", ext)))?;
            names.push(name);
        }
        let name_ptrs: Vec<_> = names.iter().map(|name| name.as_ptr()).collect();

        let app_info = vk::ApplicationInfo::builder().api_version(env.api_version);

        let create_info = vk::InstanceCreateInfo::builder()
            .application_info(&app_info)
            .enabled_extension_names(&name_ptrs);

        let instance = unsafe { env.entry.create_instance(&create_info, None) }.check("vkCreateInstance")?;

        Ok(UniqueInstance { instance })
    }

    fn max_concurrent(context: &Context, _params: &InstanceParameters) -> TestResultOf<u32> {
        Ok(safe_object_count(context, MAX_CONCURRENT_INSTANCES, 0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn device_group_creation_is_core_from_1_1() {
        assert!(!is_core_instance_extension(vk::API_VERSION_1_0, "VK_KHR_device_group_creation"));
        assert!(is_core_instance_extension(vk::API_VERSION_1_1, "VK_KHR_device_group_creation"));
        assert!(is_core_instance_extension(vk::API_VERSION_1_3, "VK_KHR_device_group_creation"));
        assert!(!is_core_instance_extension(vk::API_VERSION_1_3, "VK_EXT_debug_utils"));
    }

    #[test]
    fn multiple_unique_builds_four_instances() {
        assert_eq!(<Instance as Object>::UNIQUE_RESOURCE_SETS, 4);
    }
}
