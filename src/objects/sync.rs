// Synchronization primitives: semaphores, fences, events
//
// Each is parameterized by nothing but its create flags.

use ash::vk;

use super::{safe_object_count, Context, Environment, Object, MAX_CONCURRENT_SYNC_PRIMITIVES};
use crate::backend::Unique;
use crate::error::{TestResultOf, VkCheck};

pub struct Semaphore;

impl Object for Semaphore {
    type Parameters = vk::SemaphoreCreateFlags;
    type Resources = ();
    type Handle = Unique<vk::Semaphore>;

    const TYPE_NAME: &'static str = "VkSemaphore";

    fn resources(_env: &Environment, _flags: &vk::SemaphoreCreateFlags) -> TestResultOf<()> {
        Ok(())
    }

    fn create(env: &Environment, _res: &(), flags: &vk::SemaphoreCreateFlags) -> TestResultOf<Self::Handle> {
        let semaphore_info = vk::SemaphoreCreateInfo::builder().flags(*flags);

        let semaphore =
            unsafe { env.device.create_semaphore(&semaphore_info, None) }.check("vkCreateSemaphore")?;

        Ok(Unique::new(&env.device, semaphore))
    }

    fn max_concurrent(context: &Context, _flags: &vk::SemaphoreCreateFlags) -> TestResultOf<u32> {
        Ok(safe_object_count(context, MAX_CONCURRENT_SYNC_PRIMITIVES, 0))
    }
}

pub struct Fence;

impl Object for Fence {
    type Parameters = vk::FenceCreateFlags;
    type Resources = ();
    type Handle = Unique<vk::Fence>;

    const TYPE_NAME: &'static str = "VkFence";

    fn resources(_env: &Environment, _flags: &vk::FenceCreateFlags) -> TestResultOf<()> {
        Ok(())
    }

    fn create(env: &Environment, _res: &(), flags: &vk::FenceCreateFlags) -> TestResultOf<Self::Handle> {
        let fence_info = vk::FenceCreateInfo::builder().flags(*flags);

        let fence = unsafe { env.device.create_fence(&fence_info, None) }.check("vkCreateFence")?;

        Ok(Unique::new(&env.device, fence))
    }

    fn max_concurrent(context: &Context, _flags: &vk::FenceCreateFlags) -> TestResultOf<u32> {
        Ok(safe_object_count(context, MAX_CONCURRENT_SYNC_PRIMITIVES, 0))
    }
}

pub struct Event;

impl Object for Event {
    type Parameters = vk::EventCreateFlags;
    type Resources = ();
    type Handle = Unique<vk::Event>;

    const TYPE_NAME: &'static str = "VkEvent";

    fn resources(_env: &Environment, _flags: &vk::EventCreateFlags) -> TestResultOf<()> {
        Ok(())
    }

    fn create(env: &Environment, _res: &(), flags: &vk::EventCreateFlags) -> TestResultOf<Self::Handle> {
        let event_info = vk::EventCreateInfo::builder().flags(*flags);

        let event = unsafe { env.device.create_event(&event_info, None) }.check("vkCreateEvent")?;

        Ok(Unique::new(&env.device, event))
    }

    fn max_concurrent(context: &Context, _flags: &vk::EventCreateFlags) -> TestResultOf<u32> {
        Ok(safe_object_count(context, MAX_CONCURRENT_SYNC_PRIMITIVES, 0))
    }
}
