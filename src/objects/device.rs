// VkDevice, standalone or spanning a physical device group
//
// Both kinds own a private VkInstance so creating one never touches the
// default context's instance.

use ash::vk;
use std::sync::Arc;

use super::instance::{Instance, InstanceParameters};
use super::{safe_object_count, Context, Dependency, Environment, Object, MAX_CONCURRENT_DEVICES};
use crate::backend::context::find_queue_family;
use crate::backend::UniqueDevice;
use crate::error::{TestError, TestResultOf, VkCheck};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceParameters {
    /// 0-based index into vkEnumeratePhysicalDevices
    pub device_index: u32,
    pub queue_flags: vk::QueueFlags,
}

impl DeviceParameters {
    pub fn new(device_index: u32, queue_flags: vk::QueueFlags) -> Self {
        Self { device_index, queue_flags }
    }

    /// What per-thread-device cases build each worker's device from
    pub fn default_for(context: &Context) -> Self {
        Self::new(
            context.device_id - 1,
            vk::QueueFlags::GRAPHICS | vk::QueueFlags::COMPUTE,
        )
    }
}

pub struct DeviceResources {
    pub instance: Dependency<Instance>,
    pub physical_device: vk::PhysicalDevice,
    pub queue_family_index: u32,
}

pub struct Device;

impl Object for Device {
    type Parameters = DeviceParameters;
    type Resources = DeviceResources;
    type Handle = UniqueDevice;

    const TYPE_NAME: &'static str = "VkDevice";
    const CREATE_COUNT: u32 = 20;

    fn resources(env: &Environment, params: &DeviceParameters) -> TestResultOf<DeviceResources> {
        let instance = Dependency::<Instance>::new(env, &InstanceParameters::default())?;

        let physical_devices =
            unsafe { instance.object.enumerate_physical_devices() }.check("vkEnumeratePhysicalDevices")?;
        let physical_device = *physical_devices
            .get(params.device_index as usize)
            .ok_or_else(|| TestError::not_supported("Device not found"))?;

        let queue_family_index = find_queue_family(&instance.object, physical_device, params.queue_flags)
            .ok_or_else(|| TestError::not_supported("Matching queue not found"))?;

        Ok(DeviceResources {
            instance,
            physical_device,
            queue_family_index,
        })
    }

    fn create(_env: &Environment, res: &DeviceResources, _params: &DeviceParameters) -> TestResultOf<UniqueDevice> {
        create_device(&res.instance.object, res.physical_device, res.queue_family_index, None)
    }

    fn max_concurrent(context: &Context, _params: &DeviceParameters) -> TestResultOf<u32> {
        Ok(safe_object_count(context, MAX_CONCURRENT_DEVICES, 0))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceGroupParameters {
    /// 0-based index into vkEnumeratePhysicalDeviceGroups
    pub device_group_index: u32,
    /// 0-based index of the device inside the group
    pub device_index: u32,
    pub queue_flags: vk::QueueFlags,
}

pub struct DeviceGroupResources {
    pub instance: Dependency<Instance>,
    pub physical_devices: Vec<vk::PhysicalDevice>,
    pub queue_family_index: u32,
}

pub struct DeviceGroup;

impl Object for DeviceGroup {
    type Parameters = DeviceGroupParameters;
    type Resources = DeviceGroupResources;
    type Handle = UniqueDevice;

    const TYPE_NAME: &'static str = "VkDevice";
    const CREATE_COUNT: u32 = 20;

    fn resources(env: &Environment, params: &DeviceGroupParameters) -> TestResultOf<DeviceGroupResources> {
        let instance = Dependency::<Instance>::new(
            env,
            &InstanceParameters::with_extensions(&["VK_KHR_device_group_creation"]),
        )?;

        let groups = enumerate_device_groups(env, &instance.object)?;
        let group = groups
            .get(params.device_group_index as usize)
            .ok_or_else(|| TestError::not_supported("Device Group not found"))?;

        let physical_devices = group.physical_devices[..group.physical_device_count as usize].to_vec();
        let physical_device = *physical_devices
            .get(params.device_index as usize)
            .ok_or_else(|| TestError::not_supported("Device not found in group"))?;

        let queue_family_index = find_queue_family(&instance.object, physical_device, params.queue_flags)
            .ok_or_else(|| TestError::not_supported("Matching queue not found"))?;

        Ok(DeviceGroupResources {
            instance,
            physical_devices,
            queue_family_index,
        })
    }

    fn create(
        _env: &Environment,
        res: &DeviceGroupResources,
        params: &DeviceGroupParameters,
    ) -> TestResultOf<UniqueDevice> {
        let physical_device = res.physical_devices[params.device_index as usize];
        create_device(
            &res.instance.object,
            physical_device,
            res.queue_family_index,
            Some(&res.physical_devices),
        )
    }

    fn max_concurrent(context: &Context, _params: &DeviceGroupParameters) -> TestResultOf<u32> {
        Ok(safe_object_count(context, MAX_CONCURRENT_DEVICES, 0))
    }
}

/// Where vkEnumeratePhysicalDeviceGroups comes from for an instance version
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum GroupEnumeration {
    Core,
    /// Pre-1.1 instances go through VK_KHR_device_group_creation
    Khr,
}

impl GroupEnumeration {
    fn for_api_version(api_version: u32) -> Self {
        if api_version >= vk::API_VERSION_1_1 {
            GroupEnumeration::Core
        } else {
            GroupEnumeration::Khr
        }
    }
}

fn enumerate_device_groups(
    env: &Environment,
    instance: &ash::Instance,
) -> TestResultOf<Vec<vk::PhysicalDeviceGroupProperties>> {
    match GroupEnumeration::for_api_version(env.api_version) {
        GroupEnumeration::Core => unsafe {
            let count = instance
                .enumerate_physical_device_groups_len()
                .check("vkEnumeratePhysicalDeviceGroups")?;
            let mut groups = vec![vk::PhysicalDeviceGroupProperties::default(); count];
            instance
                .enumerate_physical_device_groups(&mut groups)
                .check("vkEnumeratePhysicalDeviceGroups")?;
            Ok(groups)
        },
        GroupEnumeration::Khr => unsafe {
            let group_creation = ash::extensions::khr::DeviceGroupCreation::new(env.entry.clone(), instance);
            let count = group_creation
                .enumerate_physical_device_groups_len()
                .check("vkEnumeratePhysicalDeviceGroupsKHR")?;
            let mut groups = vec![vk::PhysicalDeviceGroupProperties::default(); count];
            group_creation
                .enumerate_physical_device_groups(&mut groups)
                .check("vkEnumeratePhysicalDeviceGroupsKHR")?;
            Ok(groups)
        },
    }
}

/// One queue from `queue_family`, every supported core feature enabled
fn create_device(
    instance: &ash::Instance,
    physical_device: vk::PhysicalDevice,
    queue_family: u32,
    group: Option<&[vk::PhysicalDevice]>,
) -> TestResultOf<UniqueDevice> {
    let queue_priorities = [1.0];
    let queue_create_info = vk::DeviceQueueCreateInfo::builder()
        .queue_family_index(queue_family)
        .queue_priorities(&queue_priorities)
        .build();

    let enabled_features = unsafe { instance.get_physical_device_features(physical_device) };

    let mut group_info = vk::DeviceGroupDeviceCreateInfo::builder().physical_devices(group.unwrap_or(&[]));

    let mut create_info = vk::DeviceCreateInfo::builder()
        .queue_create_infos(std::slice::from_ref(&queue_create_info))
        .enabled_features(&enabled_features);
    if group.is_some() {
        create_info = create_info.push_next(&mut group_info);
    }

    let device = unsafe { instance.create_device(physical_device, &create_info, None) }.check("vkCreateDevice")?;

    Ok(UniqueDevice {
        device: Arc::new(device),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vulkan_1_0_enumerates_groups_through_khr() {
        assert_eq!(GroupEnumeration::for_api_version(vk::API_VERSION_1_0), GroupEnumeration::Khr);
        assert_eq!(GroupEnumeration::for_api_version(vk::API_VERSION_1_1), GroupEnumeration::Core);
        assert_eq!(GroupEnumeration::for_api_version(vk::API_VERSION_1_3), GroupEnumeration::Core);
    }
}
