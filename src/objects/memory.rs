// VkDeviceMemory

use ash::vk;

use super::{safe_object_count, Context, Environment, Object, DEFAULT_MAX_CONCURRENT_OBJECTS};
use crate::backend::Unique;
use crate::error::{TestResultOf, VkCheck};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceMemoryParameters {
    pub size: vk::DeviceSize,
    pub memory_type_index: u32,
}

impl DeviceMemoryParameters {
    pub fn new(size: vk::DeviceSize, memory_type_index: u32) -> Self {
        Self { size, memory_type_index }
    }

    /// Allocation that satisfies `requirements`, from the lowest allowed type
    pub fn from_requirements(requirements: &vk::MemoryRequirements) -> Self {
        Self::new(requirements.size, requirements.memory_type_bits.trailing_zeros())
    }
}

pub struct DeviceMemory;

impl Object for DeviceMemory {
    type Parameters = DeviceMemoryParameters;
    type Resources = ();
    type Handle = Unique<vk::DeviceMemory>;

    const TYPE_NAME: &'static str = "VkDeviceMemory";

    fn resources(_env: &Environment, _params: &DeviceMemoryParameters) -> TestResultOf<()> {
        Ok(())
    }

    fn create(env: &Environment, _res: &(), params: &DeviceMemoryParameters) -> TestResultOf<Self::Handle> {
        let alloc_info = vk::MemoryAllocateInfo::builder()
            .allocation_size(params.size)
            .memory_type_index(params.memory_type_index);

        let memory = unsafe { env.device.allocate_memory(&alloc_info, None) }.check("vkAllocateMemory")?;

        Ok(Unique::new(&env.device, memory))
    }

    fn max_concurrent(context: &Context, params: &DeviceMemoryParameters) -> TestResultOf<u32> {
        let device_memory_usage = params.size + context.memory_limits.page_table_size(params.size);
        let hard_limit = context
            .limits()
            .max_memory_allocation_count
            .min(DEFAULT_MAX_CONCURRENT_OBJECTS);

        Ok(safe_object_count(context, hard_limit, device_memory_usage))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parameters_use_lowest_memory_type() {
        let requirements = vk::MemoryRequirements {
            size: 4096,
            alignment: 256,
            memory_type_bits: 0b1011_0100,
        };
        let params = DeviceMemoryParameters::from_requirements(&requirements);
        assert_eq!(params.size, 4096);
        assert_eq!(params.memory_type_index, 2);
    }
}
