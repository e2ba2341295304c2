// RAII ownership for Vulkan handles
//
// Unique<H> destroys a device-level handle when dropped. Instances and
// devices own their function tables, so they get dedicated wrappers.
// Every wrapper must be dropped before the objects it was created from;
// Dependency and the case bodies rely on field/local drop order for that.

use ash::vk;
use std::ops::Deref;
use std::sync::Arc;

/// A device-level handle that knows how to destroy itself
pub trait DeviceHandle: Copy + Send + Sync + 'static {
    /// Pool the handle was allocated from, `()` for standalone objects
    type Owner: Copy + Send + Sync + 'static;

    const TYPE_NAME: &'static str;

    /// # Safety
    /// `self` must be a live handle created on `device` (from `owner`) and
    /// not in use by the GPU.
    unsafe fn destroy(self, device: &ash::Device, owner: Self::Owner);
}

macro_rules! device_handle {
    ($ty:ident, $name:literal, $destroy:ident) => {
        impl DeviceHandle for vk::$ty {
            type Owner = ();

            const TYPE_NAME: &'static str = $name;

            unsafe fn destroy(self, device: &ash::Device, _owner: ()) {
                device.$destroy(self, None);
            }
        }
    };
}

device_handle!(DeviceMemory, "VkDeviceMemory", free_memory);
device_handle!(Buffer, "VkBuffer", destroy_buffer);
device_handle!(BufferView, "VkBufferView", destroy_buffer_view);
device_handle!(Image, "VkImage", destroy_image);
device_handle!(ImageView, "VkImageView", destroy_image_view);
device_handle!(Semaphore, "VkSemaphore", destroy_semaphore);
device_handle!(Fence, "VkFence", destroy_fence);
device_handle!(Event, "VkEvent", destroy_event);
device_handle!(QueryPool, "VkQueryPool", destroy_query_pool);
device_handle!(ShaderModule, "VkShaderModule", destroy_shader_module);
device_handle!(PipelineCache, "VkPipelineCache", destroy_pipeline_cache);
device_handle!(Sampler, "VkSampler", destroy_sampler);
device_handle!(DescriptorSetLayout, "VkDescriptorSetLayout", destroy_descriptor_set_layout);
device_handle!(PipelineLayout, "VkPipelineLayout", destroy_pipeline_layout);
device_handle!(RenderPass, "VkRenderPass", destroy_render_pass);
device_handle!(Pipeline, "VkPipeline", destroy_pipeline);
device_handle!(DescriptorPool, "VkDescriptorPool", destroy_descriptor_pool);
device_handle!(Framebuffer, "VkFramebuffer", destroy_framebuffer);
device_handle!(CommandPool, "VkCommandPool", destroy_command_pool);

impl DeviceHandle for vk::DescriptorSet {
    type Owner = vk::DescriptorPool;

    const TYPE_NAME: &'static str = "VkDescriptorSet";

    unsafe fn destroy(self, device: &ash::Device, pool: vk::DescriptorPool) {
        // Pool is created with FREE_DESCRIPTOR_SET
        let _ = device.free_descriptor_sets(pool, &[self]);
    }
}

impl DeviceHandle for vk::CommandBuffer {
    type Owner = vk::CommandPool;

    const TYPE_NAME: &'static str = "VkCommandBuffer";

    unsafe fn destroy(self, device: &ash::Device, pool: vk::CommandPool) {
        device.free_command_buffers(pool, &[self]);
    }
}

/// Owned device-level handle, destroyed on drop
pub struct Unique<H: DeviceHandle> {
    handle: H,
    owner: H::Owner,
    device: Arc<ash::Device>,
}

impl<H: DeviceHandle> Unique<H> {
    /// Take ownership of a standalone handle
    pub fn new(device: &Arc<ash::Device>, handle: H) -> Self
    where
        H: DeviceHandle<Owner = ()>,
    {
        Self::with_owner(device, handle, ())
    }

    /// Take ownership of a handle allocated from `owner`
    pub fn with_owner(device: &Arc<ash::Device>, handle: H, owner: H::Owner) -> Self {
        Self {
            handle,
            owner,
            device: Arc::clone(device),
        }
    }

    pub fn get(&self) -> H {
        self.handle
    }
}

impl<H: DeviceHandle> Deref for Unique<H> {
    type Target = H;

    fn deref(&self) -> &H {
        &self.handle
    }
}

impl<H: DeviceHandle> Drop for Unique<H> {
    fn drop(&mut self) {
        unsafe { self.handle.destroy(&self.device, self.owner) }
    }
}

/// Owned instance, destroyed on drop
pub struct UniqueInstance {
    pub instance: ash::Instance,
}

impl Deref for UniqueInstance {
    type Target = ash::Instance;

    fn deref(&self) -> &ash::Instance {
        &self.instance
    }
}

impl Drop for UniqueInstance {
    fn drop(&mut self) {
        unsafe { self.instance.destroy_instance(None) }
    }
}

/// Owned logical device, destroyed on drop
pub struct UniqueDevice {
    pub device: Arc<ash::Device>,
}

impl Deref for UniqueDevice {
    type Target = ash::Device;

    fn deref(&self) -> &ash::Device {
        &self.device
    }
}

impl Drop for UniqueDevice {
    fn drop(&mut self) {
        unsafe { self.device.destroy_device(None) }
    }
}
