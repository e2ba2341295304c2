// Command pools and command buffers

use ash::vk;

use super::{safe_object_count, Context, Dependency, Environment, Object, DEFAULT_MAX_CONCURRENT_OBJECTS};
use crate::backend::Unique;
use crate::error::{TestResultOf, VkCheck};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandPoolParameters {
    pub flags: vk::CommandPoolCreateFlags,
}

impl CommandPoolParameters {
    pub fn new(flags: vk::CommandPoolCreateFlags) -> Self {
        Self { flags }
    }
}

pub struct CommandPool;

impl Object for CommandPool {
    type Parameters = CommandPoolParameters;
    type Resources = ();
    type Handle = Unique<vk::CommandPool>;

    const TYPE_NAME: &'static str = "VkCommandPool";

    fn resources(_env: &Environment, _params: &CommandPoolParameters) -> TestResultOf<()> {
        Ok(())
    }

    fn create(env: &Environment, _res: &(), params: &CommandPoolParameters) -> TestResultOf<Self::Handle> {
        let pool_info = vk::CommandPoolCreateInfo::builder()
            .flags(params.flags)
            .queue_family_index(env.queue_family_index);

        let pool = unsafe { env.device.create_command_pool(&pool_info, None) }.check("vkCreateCommandPool")?;

        Ok(Unique::new(&env.device, pool))
    }

    fn max_concurrent(context: &Context, _params: &CommandPoolParameters) -> TestResultOf<u32> {
        Ok(safe_object_count(context, DEFAULT_MAX_CONCURRENT_OBJECTS, 0))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandBufferParameters {
    pub pool: CommandPoolParameters,
    pub level: vk::CommandBufferLevel,
}

impl CommandBufferParameters {
    pub fn new(pool: CommandPoolParameters, level: vk::CommandBufferLevel) -> Self {
        Self { pool, level }
    }
}

pub struct CommandBuffer;

impl Object for CommandBuffer {
    type Parameters = CommandBufferParameters;
    type Resources = Dependency<CommandPool>;
    type Handle = Unique<vk::CommandBuffer>;

    const TYPE_NAME: &'static str = "VkCommandBuffer";

    fn resources(env: &Environment, params: &CommandBufferParameters) -> TestResultOf<Dependency<CommandPool>> {
        Dependency::new(env, &params.pool)
    }

    fn create(
        env: &Environment,
        pool: &Dependency<CommandPool>,
        params: &CommandBufferParameters,
    ) -> TestResultOf<Self::Handle> {
        let allocate_info = vk::CommandBufferAllocateInfo::builder()
            .command_pool(pool.object.get())
            .level(params.level)
            .command_buffer_count(1);

        let buffers =
            unsafe { env.device.allocate_command_buffers(&allocate_info) }.check("vkAllocateCommandBuffers")?;

        Ok(Unique::with_owner(&env.device, buffers[0], pool.object.get()))
    }

    fn max_concurrent(context: &Context, _params: &CommandBufferParameters) -> TestResultOf<u32> {
        Ok(safe_object_count(context, DEFAULT_MAX_CONCURRENT_OBJECTS, 0))
    }
}
