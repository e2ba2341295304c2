// =============================================================================
// OBJECTS - one Object impl per Vulkan object type
// =============================================================================
//
// An Object knows how to build its prerequisites (Resources) from an
// Environment and how to create one handle from them. Dependency<O> bundles
// a created object with the resources it came from.

use ash::vk;
use std::sync::Arc;

use crate::backend::{BinaryCollection, PlatformMemoryLimits, VulkanContext};
use crate::config::Config;
use crate::error::TestResultOf;

pub mod buffer;
pub mod command;
pub mod descriptor;
pub mod device;
pub mod image;
pub mod instance;
pub mod memory;
pub mod pipeline;
pub mod query;
pub mod shader;
pub mod sync;

pub use buffer::{Buffer, BufferParameters, BufferView, BufferViewParameters};
pub use command::{CommandBuffer, CommandBufferParameters, CommandPool, CommandPoolParameters};
pub use descriptor::{
    compute_pool_sizes, DescriptorPool, DescriptorPoolParameters, DescriptorSet, DescriptorSetLayout,
    DescriptorSetLayoutParameters, DescriptorSetParameters, LayoutBinding, PipelineLayout,
    PipelineLayoutParameters, Sampler, SamplerParameters,
};
pub use device::{Device, DeviceGroup, DeviceGroupParameters, DeviceParameters};
pub use image::{Image, ImageParameters, ImageView, ImageViewParameters};
pub use instance::{Instance, InstanceParameters};
pub use memory::{DeviceMemory, DeviceMemoryParameters};
pub use pipeline::{ComputePipeline, Framebuffer, GraphicsPipeline, RenderPass};
pub use query::{QueryPool, QueryPoolParameters};
pub use shader::{PipelineCache, ShaderModule, ShaderModuleParameters};
pub use sync::{Event, Fence, Semaphore};

// Hard caps on live objects in max_concurrent cases
pub const MAX_CONCURRENT_INSTANCES: u32 = 32;
pub const MAX_CONCURRENT_DEVICES: u32 = 32;
pub const MAX_CONCURRENT_SYNC_PRIMITIVES: u32 = 100;
pub const MAX_CONCURRENT_PIPELINE_CACHES: u32 = 128;
pub const MAX_CONCURRENT_QUERY_POOLS: u32 = 8192;
pub const DEFAULT_MAX_CONCURRENT_OBJECTS: u32 = 16 * 1024;

/// Everything a case needs from the run: the default device plus settings
pub struct Context {
    pub vk: VulkanContext,
    pub binaries: Arc<BinaryCollection>,
    pub memory_limits: PlatformMemoryLimits,
    /// Workers per multithreaded case
    pub thread_count: u32,
    /// 1-based, as given on the command line
    pub device_id: u32,
    /// 1-based, as given on the command line
    pub device_group_id: u32,
}

impl Context {
    /// Open the configured device and load the program binaries
    pub fn new(config: &Config) -> anyhow::Result<Self> {
        let vk = VulkanContext::new(config.device.device_id - 1, config.debug.validation_layers)?;
        let binaries = BinaryCollection::load(config.shader_dir())?;

        log::info!(
            "Using {} with {} programs, {} threads per multithreaded case",
            vk.device_name(),
            binaries.len(),
            config.thread_count()
        );

        Ok(Self {
            vk,
            binaries: Arc::new(binaries),
            memory_limits: config.limits,
            thread_count: config.thread_count(),
            device_id: config.device.device_id,
            device_group_id: config.device.device_group_id,
        })
    }

    pub fn limits(&self) -> &vk::PhysicalDeviceLimits {
        &self.vk.properties.limits
    }
}

/// The device objects are created on, plus what creation needs
#[derive(Clone)]
pub struct Environment {
    pub entry: ash::Entry,
    pub api_version: u32,
    pub device: Arc<ash::Device>,
    pub queue_family_index: u32,
    pub binaries: Arc<BinaryCollection>,
    /// How many objects may share one set of resources (sizes descriptor pools)
    pub max_resource_consumers: u32,
}

impl Environment {
    /// Environment on the context's default device
    pub fn new(context: &Context, max_resource_consumers: u32) -> Self {
        Self {
            entry: context.vk.entry.clone(),
            api_version: context.vk.api_version,
            device: Arc::clone(&context.vk.device),
            queue_family_index: context.vk.universal_queue_family,
            binaries: Arc::clone(&context.binaries),
            max_resource_consumers,
        }
    }
}

/// A Vulkan object type under test
pub trait Object: 'static {
    type Parameters: Clone + Send + Sync + 'static;
    /// Prerequisites, shared by every object created from them
    type Resources: Send + Sync;
    /// Owning handle; dropping it destroys the object
    type Handle: Send + Sync;

    const TYPE_NAME: &'static str;

    /// Create/destroy iterations per worker in multithreaded cases
    const CREATE_COUNT: u32 = 100;

    /// Resource sets built by the multiple_unique_resources case
    const UNIQUE_RESOURCE_SETS: usize = 4;

    fn resources(env: &Environment, params: &Self::Parameters) -> TestResultOf<Self::Resources>;

    fn create(env: &Environment, res: &Self::Resources, params: &Self::Parameters) -> TestResultOf<Self::Handle>;

    /// How many objects a max_concurrent case keeps alive at once
    fn max_concurrent(context: &Context, params: &Self::Parameters) -> TestResultOf<u32>;
}

/// An object together with the resources it was created from.
/// Fields drop in declaration order, so the object goes first.
pub struct Dependency<O: Object> {
    pub object: O::Handle,
    pub resources: O::Resources,
}

impl<O: Object> Dependency<O> {
    pub fn new(env: &Environment, params: &O::Parameters) -> TestResultOf<Self> {
        let resources = O::resources(env, params)?;
        let object = O::create(env, &resources, params)?;
        Ok(Self { object, resources })
    }
}

/// Hard limit, further bounded by how much device memory each object costs.
/// Host memory per object is not measured, so only device usage counts.
pub fn safe_object_count(context: &Context, hard_limit: u32, device_memory_usage: vk::DeviceSize) -> u32 {
    let memory_bound = context.memory_limits.safe_object_count(0, device_memory_usage);
    (hard_limit as usize).min(memory_bound) as u32
}
