// Buffers and texel buffer views
//
// A view needs a buffer with memory bound, so BufferView's resources carry
// both the buffer and an allocation sized from its requirements.

use ash::vk;

use super::memory::{DeviceMemory, DeviceMemoryParameters};
use super::{safe_object_count, Context, Dependency, Environment, Object, DEFAULT_MAX_CONCURRENT_OBJECTS};
use crate::backend::Unique;
use crate::error::{TestResultOf, VkCheck};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BufferParameters {
    pub size: vk::DeviceSize,
    pub usage: vk::BufferUsageFlags,
}

impl BufferParameters {
    pub fn new(size: vk::DeviceSize, usage: vk::BufferUsageFlags) -> Self {
        Self { size, usage }
    }
}

pub struct Buffer;

impl Object for Buffer {
    type Parameters = BufferParameters;
    type Resources = ();
    type Handle = Unique<vk::Buffer>;

    const TYPE_NAME: &'static str = "VkBuffer";

    fn resources(_env: &Environment, _params: &BufferParameters) -> TestResultOf<()> {
        Ok(())
    }

    fn create(env: &Environment, _res: &(), params: &BufferParameters) -> TestResultOf<Self::Handle> {
        let queue_families = [env.queue_family_index];
        let buffer_info = vk::BufferCreateInfo::builder()
            .size(params.size)
            .usage(params.usage)
            .sharing_mode(vk::SharingMode::EXCLUSIVE)
            .queue_family_indices(&queue_families);

        let buffer = unsafe { env.device.create_buffer(&buffer_info, None) }.check("vkCreateBuffer")?;

        Ok(Unique::new(&env.device, buffer))
    }

    fn max_concurrent(context: &Context, params: &BufferParameters) -> TestResultOf<u32> {
        // Probe one buffer for its memory size
        let env = Environment::new(context, 1);
        let buffer = Self::create(&env, &(), params)?;
        let requirements = unsafe { env.device.get_buffer_memory_requirements(buffer.get()) };

        Ok(safe_object_count(
            context,
            DEFAULT_MAX_CONCURRENT_OBJECTS,
            context.memory_limits.page_table_size(requirements.size),
        ))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BufferViewParameters {
    pub buffer: BufferParameters,
    pub format: vk::Format,
    pub offset: vk::DeviceSize,
    pub range: vk::DeviceSize,
}

pub struct BufferViewResources {
    pub buffer: Dependency<Buffer>,
    pub memory: Dependency<DeviceMemory>,
}

pub struct BufferView;

impl Object for BufferView {
    type Parameters = BufferViewParameters;
    type Resources = BufferViewResources;
    type Handle = Unique<vk::BufferView>;

    const TYPE_NAME: &'static str = "VkBufferView";

    fn resources(env: &Environment, params: &BufferViewParameters) -> TestResultOf<BufferViewResources> {
        let buffer = Dependency::<Buffer>::new(env, &params.buffer)?;
        let requirements = unsafe { env.device.get_buffer_memory_requirements(buffer.object.get()) };
        let memory = Dependency::<DeviceMemory>::new(env, &DeviceMemoryParameters::from_requirements(&requirements))?;

        unsafe { env.device.bind_buffer_memory(buffer.object.get(), memory.object.get(), 0) }
            .check("vkBindBufferMemory")?;

        Ok(BufferViewResources { buffer, memory })
    }

    fn create(env: &Environment, res: &BufferViewResources, params: &BufferViewParameters) -> TestResultOf<Self::Handle> {
        let view_info = vk::BufferViewCreateInfo::builder()
            .buffer(res.buffer.object.get())
            .format(params.format)
            .offset(params.offset)
            .range(params.range);

        let view = unsafe { env.device.create_buffer_view(&view_info, None) }.check("vkCreateBufferView")?;

        Ok(Unique::new(&env.device, view))
    }

    fn max_concurrent(context: &Context, _params: &BufferViewParameters) -> TestResultOf<u32> {
        Ok(safe_object_count(context, DEFAULT_MAX_CONCURRENT_OBJECTS, 0))
    }
}
