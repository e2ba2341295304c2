// Vulkan context - the default instance and device cases run against
//
// Responsibilities:
// - Instance creation with optional validation layers
// - Physical device selection by index
// - Logical device with a universal (graphics + compute) queue
// - Caching properties/features that support checks need

use anyhow::{Context, Result};
use ash::{vk, Entry};
use std::ffi::{CStr, CString};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

const VALIDATION_LAYER: &CStr = c"VK_LAYER_KHRONOS_validation";

/// Error-severity messages reported by the validation layers so far
static VALIDATION_ERRORS: AtomicU32 = AtomicU32::new(0);

pub fn validation_error_count() -> u32 {
    VALIDATION_ERRORS.load(Ordering::SeqCst)
}

/// Instance and device every case shares
pub struct VulkanContext {
    pub device: Arc<ash::Device>,
    pub physical_device: vk::PhysicalDevice,
    pub instance: ash::Instance,
    pub entry: Entry,

    pub api_version: u32,
    pub universal_queue_family: u32,
    /// 0-based index into vkEnumeratePhysicalDevices
    pub device_index: u32,

    debug_utils: Option<(ash::extensions::ext::DebugUtils, vk::DebugUtilsMessengerEXT)>,

    pub properties: vk::PhysicalDeviceProperties,
    pub features: vk::PhysicalDeviceFeatures,
    pub device_extensions: Vec<String>,
}

impl VulkanContext {
    /// Create the shared context
    ///
    /// # Arguments
    /// * `device_index` - 0-based physical device index
    /// * `enable_validation` - Enable Vulkan validation layers if present
    pub fn new(device_index: u32, enable_validation: bool) -> Result<Self> {
        // Step 1: Load Vulkan library
        let entry = unsafe { Entry::load() }
            .context("Failed to load Vulkan library. Is Vulkan installed?")?;

        let api_version = instance_api_version(&entry)?;
        log::info!(
            "Loader API version: {}.{}.{}",
            vk::api_version_major(api_version),
            vk::api_version_minor(api_version),
            vk::api_version_patch(api_version)
        );

        // Step 2: Create instance
        let enable_validation = enable_validation && Self::has_validation_layer(&entry)?;
        let instance = Self::create_instance(&entry, api_version, enable_validation)?;

        // Step 3: Setup debug messenger if validation enabled
        let debug_utils = if enable_validation {
            Some(Self::setup_debug_messenger(&entry, &instance)?)
        } else {
            None
        };

        // Step 4: Pick physical device
        let (physical_device, universal_queue_family) =
            Self::pick_physical_device(&instance, device_index)?;

        let properties = unsafe { instance.get_physical_device_properties(physical_device) };
        let features = unsafe { instance.get_physical_device_features(physical_device) };
        let device_extensions = Self::enumerate_device_extensions(&instance, physical_device)?;

        log::info!("Selected GPU: {}", device_name(&properties));
        log::info!(
            "Device API Version: {}.{}.{}",
            vk::api_version_major(properties.api_version),
            vk::api_version_minor(properties.api_version),
            vk::api_version_patch(properties.api_version)
        );

        // Step 5: Create logical device
        let device = Self::create_logical_device(&instance, physical_device, universal_queue_family, &features)?;

        Ok(Self {
            device: Arc::new(device),
            physical_device,
            instance,
            entry,
            api_version,
            universal_queue_family,
            device_index,
            debug_utils,
            properties,
            features,
            device_extensions,
        })
    }

    fn has_validation_layer(entry: &Entry) -> Result<bool> {
        let layers = entry.enumerate_instance_layer_properties()?;
        let found = layers
            .iter()
            .any(|layer| unsafe { CStr::from_ptr(layer.layer_name.as_ptr()) } == VALIDATION_LAYER);

        if !found {
            log::warn!("Validation requested but VK_LAYER_KHRONOS_validation is not installed");
        }
        Ok(found)
    }

    fn create_instance(entry: &Entry, api_version: u32, enable_validation: bool) -> Result<ash::Instance> {
        let app_name = CString::new("vk-objmgmt-cts")?;

        let app_info = vk::ApplicationInfo::builder()
            .application_name(&app_name)
            .application_version(vk::make_api_version(0, 0, 1, 0))
            .api_version(api_version);

        let mut extensions = Vec::new();
        let mut layer_names = Vec::new();

        if enable_validation {
            extensions.push(ash::extensions::ext::DebugUtils::name().as_ptr());
            layer_names.push(VALIDATION_LAYER.as_ptr());
        }

        let create_info = vk::InstanceCreateInfo::builder()
            .application_info(&app_info)
            .enabled_extension_names(&extensions)
            .enabled_layer_names(&layer_names);

        let instance = unsafe { entry.create_instance(&create_info, None) }
            .context("Failed to create Vulkan instance")?;

        Ok(instance)
    }

    fn setup_debug_messenger(
        entry: &Entry,
        instance: &ash::Instance,
    ) -> Result<(ash::extensions::ext::DebugUtils, vk::DebugUtilsMessengerEXT)> {
        let debug_utils = ash::extensions::ext::DebugUtils::new(entry, instance);

        let create_info = vk::DebugUtilsMessengerCreateInfoEXT::builder()
            .message_severity(
                vk::DebugUtilsMessageSeverityFlagsEXT::WARNING
                    | vk::DebugUtilsMessageSeverityFlagsEXT::ERROR,
            )
            .message_type(
                vk::DebugUtilsMessageTypeFlagsEXT::GENERAL
                    | vk::DebugUtilsMessageTypeFlagsEXT::VALIDATION
                    | vk::DebugUtilsMessageTypeFlagsEXT::PERFORMANCE,
            )
            .pfn_user_callback(Some(debug_callback));

        let messenger = unsafe { debug_utils.create_debug_utils_messenger(&create_info, None) }?;

        Ok((debug_utils, messenger))
    }

    fn pick_physical_device(instance: &ash::Instance, device_index: u32) -> Result<(vk::PhysicalDevice, u32)> {
        let devices = unsafe { instance.enumerate_physical_devices() }?;

        if devices.is_empty() {
            anyhow::bail!("No Vulkan-capable GPU found");
        }

        let device = *devices.get(device_index as usize).ok_or_else(|| {
            anyhow::anyhow!(
                "Device index {} out of range, {} device(s) present",
                device_index + 1,
                devices.len()
            )
        })?;

        let universal_queue_family = find_queue_family(instance, device, vk::QueueFlags::GRAPHICS | vk::QueueFlags::COMPUTE)
            .ok_or_else(|| anyhow::anyhow!("No queue family supports both graphics and compute"))?;

        Ok((device, universal_queue_family))
    }

    fn enumerate_device_extensions(instance: &ash::Instance, physical_device: vk::PhysicalDevice) -> Result<Vec<String>> {
        let props = unsafe { instance.enumerate_device_extension_properties(physical_device) }?;

        Ok(props
            .iter()
            .map(|ext| {
                unsafe { CStr::from_ptr(ext.extension_name.as_ptr()) }
                    .to_string_lossy()
                    .into_owned()
            })
            .collect())
    }

    fn create_logical_device(
        instance: &ash::Instance,
        physical_device: vk::PhysicalDevice,
        queue_family: u32,
        supported_features: &vk::PhysicalDeviceFeatures,
    ) -> Result<ash::Device> {
        let queue_priorities = [1.0];
        let queue_create_info = vk::DeviceQueueCreateInfo::builder()
            .queue_family_index(queue_family)
            .queue_priorities(&queue_priorities)
            .build();

        let enabled_features = default_device_features(supported_features);

        let create_info = vk::DeviceCreateInfo::builder()
            .queue_create_infos(std::slice::from_ref(&queue_create_info))
            .enabled_features(&enabled_features);

        let device = unsafe { instance.create_device(physical_device, &create_info, None) }
            .context("Failed to create logical device")?;

        Ok(device)
    }

    pub fn device_name(&self) -> String {
        device_name(&self.properties)
    }

    pub fn has_device_extension(&self, name: &str) -> bool {
        self.device_extensions.iter().any(|ext| ext == name)
    }

    /// `events` member of VkPhysicalDevicePortabilitySubsetFeaturesKHR,
    /// true on implementations that are not portability subsets
    pub fn portability_events_supported(&self) -> bool {
        if !self.has_device_extension("VK_KHR_portability_subset") {
            return true;
        }
        if self.api_version < vk::API_VERSION_1_1 {
            return false;
        }

        let mut portability = vk::PhysicalDevicePortabilitySubsetFeaturesKHR::default();
        let mut features2 = vk::PhysicalDeviceFeatures2::builder().push_next(&mut portability);
        unsafe {
            self.instance
                .get_physical_device_features2(self.physical_device, &mut features2);
        }
        portability.events == vk::TRUE
    }

    /// Wait for device to be idle (e.g., before cleanup)
    pub fn wait_idle(&self) -> Result<()> {
        unsafe { self.device.device_wait_idle() }?;
        Ok(())
    }
}

impl Drop for VulkanContext {
    fn drop(&mut self) {
        log::info!("Destroying Vulkan context...");

        let _ = self.wait_idle();

        // Cleanup in reverse order
        unsafe {
            self.device.destroy_device(None);

            if let Some((debug_utils, messenger)) = self.debug_utils.take() {
                debug_utils.destroy_debug_utils_messenger(messenger, None);
            }

            self.instance.destroy_instance(None);
        }
    }
}

/// Highest instance version the loader supports (1.0 for 1.0 loaders)
fn device_name(properties: &vk::PhysicalDeviceProperties) -> String {
    unsafe { CStr::from_ptr(properties.device_name.as_ptr()) }
        .to_string_lossy()
        .into_owned()
}

pub fn instance_api_version(entry: &Entry) -> Result<u32> {
    let version = entry
        .try_enumerate_instance_version()
        .context("Failed to query instance version")?;
    Ok(version.unwrap_or(vk::API_VERSION_1_0))
}

/// Last queue family whose flags contain all of `flags`
pub fn find_queue_family(instance: &ash::Instance, physical_device: vk::PhysicalDevice, flags: vk::QueueFlags) -> Option<u32> {
    let queue_families = unsafe { instance.get_physical_device_queue_family_properties(physical_device) };

    queue_families
        .iter()
        .enumerate()
        .filter(|(_, props)| props.queue_flags.contains(flags))
        .map(|(i, _)| i as u32)
        .last()
}

/// Every supported core feature except robust buffer access
pub fn default_device_features(supported: &vk::PhysicalDeviceFeatures) -> vk::PhysicalDeviceFeatures {
    vk::PhysicalDeviceFeatures {
        robust_buffer_access: vk::FALSE,
        ..*supported
    }
}

// Debug callback for validation layers
unsafe extern "system" fn debug_callback(
    message_severity: vk::DebugUtilsMessageSeverityFlagsEXT,
    _message_type: vk::DebugUtilsMessageTypeFlagsEXT,
    p_callback_data: *const vk::DebugUtilsMessengerCallbackDataEXT,
    _p_user_data: *mut std::ffi::c_void,
) -> vk::Bool32 {
    let message = CStr::from_ptr((*p_callback_data).p_message);

    match message_severity {
        vk::DebugUtilsMessageSeverityFlagsEXT::ERROR => {
            VALIDATION_ERRORS.fetch_add(1, Ordering::SeqCst);
            log::error!("[Vulkan] {}", message.to_string_lossy());
        }
        vk::DebugUtilsMessageSeverityFlagsEXT::WARNING => {
            log::warn!("[Vulkan] {}", message.to_string_lossy());
        }
        _ => {
            log::debug!("[Vulkan] {}", message.to_string_lossy());
        }
    }

    vk::FALSE
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn robust_buffer_access_is_never_enabled() {
        let supported = vk::PhysicalDeviceFeatures {
            robust_buffer_access: vk::TRUE,
            image_cube_array: vk::TRUE,
            ..Default::default()
        };
        let enabled = default_device_features(&supported);
        assert_eq!(enabled.robust_buffer_access, vk::FALSE);
        assert_eq!(enabled.image_cube_array, vk::TRUE);
    }
}
