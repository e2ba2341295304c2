// =============================================================================
// TEST TREE - groups, leaf cases and the object_management hierarchy
// =============================================================================
//
// Leaves are addressed by their dot-joined path, e.g.
// `object_management.single.device`. The tree is built without touching
// Vulkan, so it can be listed and filtered on machines without a driver.

use ash::vk;
use std::any::TypeId;

use crate::cases;
use crate::error::TestResultOf;
use crate::objects::{
    Buffer, BufferParameters, BufferView, BufferViewParameters, CommandBuffer, CommandBufferParameters, CommandPool,
    CommandPoolParameters, ComputePipeline, Context, DescriptorPool, DescriptorPoolParameters, DescriptorSet,
    DescriptorSetLayout, DescriptorSetLayoutParameters, DescriptorSetParameters, Device, DeviceGroup,
    DeviceGroupParameters, DeviceMemory, DeviceMemoryParameters, DeviceParameters, Event, Fence, Framebuffer,
    GraphicsPipeline, Image, ImageParameters, ImageView, ImageViewParameters, Instance, InstanceParameters, Object,
    PipelineCache, PipelineLayout, PipelineLayoutParameters, QueryPool, QueryPoolParameters, RenderPass, Sampler,
    SamplerParameters, Semaphore, ShaderModule, ShaderModuleParameters,
};
use crate::status::TestStatus;

pub type CaseBody<C> = Box<dyn Fn(&C) -> TestResultOf<TestStatus> + Send + Sync>;
pub type SupportCheck<C> = Box<dyn Fn(&C) -> TestResultOf<()> + Send + Sync>;

/// A runnable leaf
pub struct TestCase<C = Context> {
    name: String,
    support: Option<SupportCheck<C>>,
    body: CaseBody<C>,
}

impl<C> TestCase<C> {
    pub fn new<F>(name: impl Into<String>, body: F) -> Self
    where
        F: Fn(&C) -> TestResultOf<TestStatus> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            support: None,
            body: Box::new(body),
        }
    }

    /// Run `check` before the body; an error there skips the body
    pub fn with_support<F>(mut self, check: F) -> Self
    where
        F: Fn(&C) -> TestResultOf<()> + Send + Sync + 'static,
    {
        self.support = Some(Box::new(check));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn check_support(&self, context: &C) -> TestResultOf<()> {
        match &self.support {
            Some(check) => check(context),
            None => Ok(()),
        }
    }

    pub fn execute(&self, context: &C) -> TestResultOf<TestStatus> {
        (self.body)(context)
    }
}

pub enum TestNode<C = Context> {
    Group(TestCaseGroup<C>),
    Case(TestCase<C>),
}

pub struct TestCaseGroup<C = Context> {
    name: String,
    description: String,
    children: Vec<TestNode<C>>,
}

impl<C> TestCaseGroup<C> {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            children: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn children(&self) -> &[TestNode<C>] {
        &self.children
    }

    pub fn add_group(&mut self, group: TestCaseGroup<C>) {
        self.children.push(TestNode::Group(group));
    }

    pub fn add_case(&mut self, case: TestCase<C>) {
        self.children.push(TestNode::Case(case));
    }

    /// Every leaf below this group with its full path, in tree order
    pub fn leaves(&self) -> Vec<(String, &TestCase<C>)> {
        let mut leaves = Vec::new();
        self.collect_leaves(&self.name, &mut leaves);
        leaves
    }

    fn collect_leaves<'t>(&'t self, prefix: &str, leaves: &mut Vec<(String, &'t TestCase<C>)>) {
        for child in &self.children {
            match child {
                TestNode::Group(group) => group.collect_leaves(&format!("{}.{}", prefix, group.name), leaves),
                TestNode::Case(case) => leaves.push((format!("{}.{}", prefix, case.name), case)),
            }
        }
    }
}

// =============================================================================
// Case selection
// =============================================================================

/// Glob match where `*` stands for any run of characters, including none
pub fn matches_pattern(pattern: &str, path: &str) -> bool {
    let pattern = pattern.as_bytes();
    let path = path.as_bytes();

    let (mut p, mut s) = (0, 0);
    let mut backtrack: Option<(usize, usize)> = None;

    while s < path.len() {
        if p < pattern.len() && pattern[p] == b'*' {
            backtrack = Some((p, s));
            p += 1;
        } else if p < pattern.len() && pattern[p] == path[s] {
            p += 1;
            s += 1;
        } else if let Some((star, matched)) = backtrack {
            // Let the last star swallow one more character
            p = star + 1;
            s = matched + 1;
            backtrack = Some((star, s));
        } else {
            return false;
        }
    }

    pattern[p..].iter().all(|&c| c == b'*')
}

/// Selects leaves whose path matches any pattern; no patterns selects all
#[derive(Debug, Clone, Default)]
pub struct CaseFilter {
    patterns: Vec<String>,
}

impl CaseFilter {
    pub fn new(patterns: Vec<String>) -> Self {
        Self { patterns }
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    pub fn matches(&self, path: &str) -> bool {
        self.patterns.is_empty() || self.patterns.iter().any(|pattern| matches_pattern(pattern, path))
    }
}

// =============================================================================
// object_management
// =============================================================================

pub struct NamedParameters<O: Object> {
    pub name: &'static str,
    pub parameters: O::Parameters,
}

fn named<O: Object>(name: &'static str, parameters: O::Parameters) -> NamedParameters<O> {
    NamedParameters { name, parameters }
}

pub type CaseFunction<O> = fn(&Context, &<O as Object>::Parameters) -> TestResultOf<TestStatus>;
pub type SupportFunction<O> = fn(&Context, &<O as Object>::Parameters) -> TestResultOf<()>;

/// Named parameter sets per object type, shared by every case group
pub struct CaseTables {
    pub instance: Vec<NamedParameters<Instance>>,
    pub device: Vec<NamedParameters<Device>>,
    pub device_group: Vec<NamedParameters<DeviceGroup>>,
    pub device_memory: Vec<NamedParameters<DeviceMemory>>,
    pub buffer: Vec<NamedParameters<Buffer>>,
    pub buffer_view: Vec<NamedParameters<BufferView>>,
    pub image: Vec<NamedParameters<Image>>,
    pub image_view: Vec<NamedParameters<ImageView>>,
    pub semaphore: Vec<NamedParameters<Semaphore>>,
    pub event: Vec<NamedParameters<Event>>,
    pub fence: Vec<NamedParameters<Fence>>,
    pub query_pool: Vec<NamedParameters<QueryPool>>,
    pub sampler: Vec<NamedParameters<Sampler>>,
    pub shader_module: Vec<NamedParameters<ShaderModule>>,
    pub pipeline_cache: Vec<NamedParameters<PipelineCache>>,
    pub pipeline_layout: Vec<NamedParameters<PipelineLayout>>,
    pub render_pass: Vec<NamedParameters<RenderPass>>,
    pub graphics_pipeline: Vec<NamedParameters<GraphicsPipeline>>,
    pub compute_pipeline: Vec<NamedParameters<ComputePipeline>>,
    pub descriptor_set_layout: Vec<NamedParameters<DescriptorSetLayout>>,
    pub descriptor_pool: Vec<NamedParameters<DescriptorPool>>,
    pub descriptor_set: Vec<NamedParameters<DescriptorSet>>,
    pub framebuffer: Vec<NamedParameters<Framebuffer>>,
    pub command_pool: Vec<NamedParameters<CommandPool>>,
    pub command_buffer: Vec<NamedParameters<CommandBuffer>>,
}

impl CaseTables {
    /// Device and group ids are 1-based, as on the command line
    pub fn new(device_id: u32, device_group_id: u32) -> Self {
        let device_index = device_id.saturating_sub(1);
        let device_group_index = device_group_id.saturating_sub(1);

        let rgba8 = vk::Format::R8G8B8A8_UNORM;
        let extent = |width, height, depth| vk::Extent3D { width, height, depth };
        let color = vk::ImageAspectFlags::COLOR;

        let img_1d = ImageParameters::simple(
            vk::ImageCreateFlags::empty(),
            vk::ImageType::TYPE_1D,
            rgba8,
            extent(256, 1, 1),
            4,
            vk::ImageUsageFlags::SAMPLED,
        );
        let img_2d = ImageParameters::simple(
            vk::ImageCreateFlags::empty(),
            vk::ImageType::TYPE_2D,
            rgba8,
            extent(64, 64, 1),
            12,
            vk::ImageUsageFlags::SAMPLED | vk::ImageUsageFlags::COLOR_ATTACHMENT,
        );
        let img_cube = ImageParameters {
            flags: vk::ImageCreateFlags::CUBE_COMPATIBLE,
            ..img_2d
        };
        let img_3d = ImageParameters::simple(
            vk::ImageCreateFlags::empty(),
            vk::ImageType::TYPE_3D,
            rgba8,
            extent(64, 64, 4),
            1,
            vk::ImageUsageFlags::SAMPLED,
        );

        let single_ubo_layout = DescriptorSetLayoutParameters::single(
            0,
            vk::DescriptorType::UNIFORM_BUFFER,
            1,
            vk::ShaderStageFlags::VERTEX,
            false,
        );

        let command_pool = CommandPoolParameters::new(vk::CommandPoolCreateFlags::empty());

        Self {
            instance: vec![named("instance", InstanceParameters::default())],
            device: vec![named("device", DeviceParameters::new(device_index, vk::QueueFlags::GRAPHICS))],
            device_group: vec![named(
                "device_group",
                DeviceGroupParameters {
                    device_group_index,
                    device_index,
                    queue_flags: vk::QueueFlags::GRAPHICS,
                },
            )],
            device_memory: vec![named("device_memory_small", DeviceMemoryParameters::new(1024, 0))],
            buffer: vec![
                named("buffer_uniform_small", BufferParameters::new(1024, vk::BufferUsageFlags::UNIFORM_BUFFER)),
                named(
                    "buffer_uniform_large",
                    BufferParameters::new(1024 * 1024 * 16, vk::BufferUsageFlags::UNIFORM_BUFFER),
                ),
                named("buffer_storage_small", BufferParameters::new(1024, vk::BufferUsageFlags::STORAGE_BUFFER)),
                named(
                    "buffer_storage_large",
                    BufferParameters::new(1024 * 1024 * 16, vk::BufferUsageFlags::STORAGE_BUFFER),
                ),
            ],
            buffer_view: vec![
                named(
                    "buffer_view_uniform_r8g8b8a8_unorm",
                    BufferViewParameters {
                        buffer: BufferParameters::new(8192, vk::BufferUsageFlags::UNIFORM_TEXEL_BUFFER),
                        format: rgba8,
                        offset: 0,
                        range: 4096,
                    },
                ),
                named(
                    "buffer_view_storage_r8g8b8a8_unorm",
                    BufferViewParameters {
                        buffer: BufferParameters::new(8192, vk::BufferUsageFlags::STORAGE_TEXEL_BUFFER),
                        format: rgba8,
                        offset: 0,
                        range: 4096,
                    },
                ),
            ],
            image: vec![named("image_1d", img_1d), named("image_2d", img_2d), named("image_3d", img_3d)],
            image_view: vec![
                named("image_view_1d", ImageViewParameters::new(img_1d, vk::ImageViewType::TYPE_1D, color, 1)),
                named(
                    "image_view_1d_arr",
                    ImageViewParameters::new(img_1d, vk::ImageViewType::TYPE_1D_ARRAY, color, 4),
                ),
                named("image_view_2d", ImageViewParameters::new(img_2d, vk::ImageViewType::TYPE_2D, color, 1)),
                named(
                    "image_view_2d_arr",
                    ImageViewParameters::new(img_2d, vk::ImageViewType::TYPE_2D_ARRAY, color, 8),
                ),
                named("image_view_cube", ImageViewParameters::new(img_cube, vk::ImageViewType::CUBE, color, 6)),
                named(
                    "image_view_cube_arr",
                    ImageViewParameters::new(img_cube, vk::ImageViewType::CUBE_ARRAY, color, 12),
                ),
                named("image_view_3d", ImageViewParameters::new(img_3d, vk::ImageViewType::TYPE_3D, color, 1)),
            ],
            semaphore: vec![named("semaphore", vk::SemaphoreCreateFlags::empty())],
            event: vec![named("event", vk::EventCreateFlags::empty())],
            fence: vec![
                named("fence", vk::FenceCreateFlags::empty()),
                named("fence_signaled", vk::FenceCreateFlags::SIGNALED),
            ],
            query_pool: vec![named(
                "query_pool",
                QueryPoolParameters {
                    query_type: vk::QueryType::OCCLUSION,
                    entry_count: 1,
                    pipeline_statistics: vk::QueryPipelineStatisticFlags::empty(),
                },
            )],
            sampler: vec![named("sampler", SamplerParameters::default())],
            shader_module: vec![named(
                "shader_module",
                ShaderModuleParameters::new(vk::ShaderStageFlags::COMPUTE, "test"),
            )],
            pipeline_cache: vec![named("pipeline_cache", ())],
            pipeline_layout: vec![
                named("pipeline_layout_empty", PipelineLayoutParameters::empty()),
                named(
                    "pipeline_layout_single",
                    PipelineLayoutParameters::single_descriptor_set(single_ubo_layout.clone()),
                ),
            ],
            render_pass: vec![named("render_pass", ())],
            graphics_pipeline: vec![named("graphics_pipeline", ())],
            compute_pipeline: vec![named("compute_pipeline", ())],
            descriptor_set_layout: vec![
                named("descriptor_set_layout_empty", DescriptorSetLayoutParameters::empty()),
                named("descriptor_set_layout_single", single_ubo_layout.clone()),
            ],
            descriptor_pool: vec![
                named(
                    "descriptor_pool",
                    DescriptorPoolParameters::single_type(
                        vk::DescriptorPoolCreateFlags::empty(),
                        4,
                        vk::DescriptorType::UNIFORM_BUFFER,
                        3,
                    ),
                ),
                named(
                    "descriptor_pool_free_descriptor_set",
                    DescriptorPoolParameters::single_type(
                        vk::DescriptorPoolCreateFlags::FREE_DESCRIPTOR_SET,
                        4,
                        vk::DescriptorType::UNIFORM_BUFFER,
                        3,
                    ),
                ),
            ],
            descriptor_set: vec![named(
                "descriptor_set",
                DescriptorSetParameters {
                    layout: single_ubo_layout,
                },
            )],
            framebuffer: vec![named("framebuffer", ())],
            command_pool: vec![
                named("command_pool", command_pool),
                named(
                    "command_pool_transient",
                    CommandPoolParameters::new(vk::CommandPoolCreateFlags::TRANSIENT),
                ),
            ],
            command_buffer: vec![
                named(
                    "command_buffer_primary",
                    CommandBufferParameters::new(command_pool, vk::CommandBufferLevel::PRIMARY),
                ),
                named(
                    "command_buffer_secondary",
                    CommandBufferParameters::new(command_pool, vk::CommandBufferLevel::SECONDARY),
                ),
            ],
        }
    }
}

/// The seven ways each object type is exercised
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaseKind {
    Single,
    MultipleUniqueResources,
    MultipleSharedResources,
    MaxConcurrent,
    MultithreadedPerThreadDevice,
    MultithreadedPerThreadResources,
    MultithreadedSharedResources,
}

impl CaseKind {
    pub const ALL: [CaseKind; 7] = [
        CaseKind::Single,
        CaseKind::MultipleUniqueResources,
        CaseKind::MultipleSharedResources,
        CaseKind::MaxConcurrent,
        CaseKind::MultithreadedPerThreadDevice,
        CaseKind::MultithreadedPerThreadResources,
        CaseKind::MultithreadedSharedResources,
    ];

    pub fn group_name(self) -> &'static str {
        match self {
            CaseKind::Single => "single",
            CaseKind::MultipleUniqueResources => "multiple_unique_resources",
            CaseKind::MultipleSharedResources => "multiple_shared_resources",
            CaseKind::MaxConcurrent => "max_concurrent",
            CaseKind::MultithreadedPerThreadDevice => "multithreaded_per_thread_device",
            CaseKind::MultithreadedPerThreadResources => "multithreaded_per_thread_resources",
            CaseKind::MultithreadedSharedResources => "multithreaded_shared_resources",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            CaseKind::Single => "Create single object",
            CaseKind::MultipleUniqueResources => "Multiple objects with per-object unique resources",
            CaseKind::MultipleSharedResources => "Multiple objects with shared resources",
            CaseKind::MaxConcurrent => "Maximum number of concurrently live objects",
            CaseKind::MultithreadedPerThreadDevice => "Multithreaded object construction with per-thread device",
            CaseKind::MultithreadedPerThreadResources => {
                "Multithreaded object construction with per-thread resources"
            }
            CaseKind::MultithreadedSharedResources => "Multithreaded object construction with shared resources",
        }
    }

    /// Object types a group has no cases for
    fn excludes(self, object: TypeId) -> bool {
        match self {
            // Instances take no resources to share
            CaseKind::MultipleSharedResources => object == TypeId::of::<Instance>(),
            CaseKind::MultithreadedPerThreadDevice => [
                TypeId::of::<Instance>(),
                TypeId::of::<Device>(),
                TypeId::of::<DeviceGroup>(),
            ]
            .contains(&object),
            // Sets and command buffers would share one externally synchronized pool
            CaseKind::MultithreadedSharedResources => [
                TypeId::of::<Instance>(),
                TypeId::of::<DescriptorSet>(),
                TypeId::of::<CommandBuffer>(),
            ]
            .contains(&object),
            _ => false,
        }
    }

    pub fn function<O: Object>(self) -> Option<CaseFunction<O>> {
        if self.excludes(TypeId::of::<O>()) {
            return None;
        }

        let function: CaseFunction<O> = match self {
            CaseKind::Single => cases::create_single::<O>,
            CaseKind::MultipleUniqueResources => cases::multiple_unique_resources::<O>,
            CaseKind::MultipleSharedResources => cases::multiple_shared_resources::<O>,
            CaseKind::MaxConcurrent => cases::max_concurrent::<O>,
            CaseKind::MultithreadedPerThreadDevice => cases::multithreaded_per_thread_device::<O>,
            CaseKind::MultithreadedPerThreadResources => cases::multithreaded_per_thread_resources::<O>,
            CaseKind::MultithreadedSharedResources => cases::multithreaded_shared_resources::<O>,
        };
        Some(function)
    }
}

fn add_cases<O: Object>(
    group: &mut TestCaseGroup,
    kind: CaseKind,
    cases: &[NamedParameters<O>],
    support: Option<SupportFunction<O>>,
) {
    let Some(function) = kind.function::<O>() else {
        return;
    };

    for named in cases {
        let params = named.parameters.clone();
        let mut case = TestCase::new(named.name, {
            let params = params.clone();
            move |context: &Context| function(context, &params)
        });
        if let Some(check) = support {
            case = case.with_support(move |context: &Context| check(context, &params));
        }
        group.add_case(case);
    }
}

fn create_group(kind: CaseKind, tables: &CaseTables) -> TestCaseGroup {
    let mut group = TestCaseGroup::new(kind.group_name(), kind.description());

    add_cases(&mut group, kind, &tables.instance, None);
    add_cases(&mut group, kind, &tables.device, None);
    add_cases(&mut group, kind, &tables.device_group, None);
    add_cases(&mut group, kind, &tables.device_memory, None);
    add_cases(&mut group, kind, &tables.buffer, None);
    add_cases(&mut group, kind, &tables.buffer_view, None);
    add_cases(&mut group, kind, &tables.image, None);
    add_cases(&mut group, kind, &tables.image_view, Some(cases::check_image_cube_array));
    add_cases(&mut group, kind, &tables.semaphore, None);
    add_cases(&mut group, kind, &tables.event, Some(cases::check_event_support));
    add_cases(&mut group, kind, &tables.fence, None);
    add_cases(&mut group, kind, &tables.query_pool, None);
    add_cases(&mut group, kind, &tables.sampler, None);
    add_cases(&mut group, kind, &tables.shader_module, None);
    add_cases(&mut group, kind, &tables.pipeline_cache, None);
    add_cases(&mut group, kind, &tables.pipeline_layout, None);
    add_cases(&mut group, kind, &tables.render_pass, None);
    add_cases(&mut group, kind, &tables.graphics_pipeline, None);
    add_cases(&mut group, kind, &tables.compute_pipeline, None);
    add_cases(&mut group, kind, &tables.descriptor_set_layout, None);
    add_cases(&mut group, kind, &tables.descriptor_pool, None);
    add_cases(&mut group, kind, &tables.descriptor_set, None);
    add_cases(&mut group, kind, &tables.framebuffer, None);
    add_cases(&mut group, kind, &tables.command_pool, None);
    add_cases(&mut group, kind, &tables.command_buffer, None);

    group
}

/// The `object_management` tree for the given 1-based device and group ids
pub fn object_management_tests(device_id: u32, device_group_id: u32) -> TestCaseGroup {
    let tables = CaseTables::new(device_id, device_group_id);
    let mut root = TestCaseGroup::new("object_management", "Object management tests");

    for kind in CaseKind::ALL {
        root.add_group(create_group(kind, &tables));
    }

    root
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wildcard_matching() {
        assert!(matches_pattern("*", "object_management.single.device"));
        assert!(matches_pattern("object_management.single.*", "object_management.single.device"));
        assert!(matches_pattern("*.image_view_*", "object_management.max_concurrent.image_view_cube_arr"));
        assert!(matches_pattern("a*b*c", "aXXbYYc"));
        assert!(matches_pattern("a*", "a"));
        assert!(!matches_pattern("object_management.single", "object_management.single.device"));
        assert!(!matches_pattern("*.fence", "object_management.single.fence_signaled"));
        assert!(!matches_pattern("a*b", "aXXc"));
    }

    #[test]
    fn empty_filter_selects_everything() {
        let filter = CaseFilter::default();
        assert!(filter.is_empty());
        assert!(filter.matches("anything.at.all"));
    }

    #[test]
    fn filter_patterns_are_alternatives() {
        let filter = CaseFilter::new(vec!["*.fence".to_string(), "*.single.*".to_string()]);
        assert!(filter.matches("object_management.max_concurrent.fence"));
        assert!(filter.matches("object_management.single.sampler"));
        assert!(!filter.matches("object_management.max_concurrent.sampler"));
    }

    #[test]
    fn leaves_carry_full_paths() {
        let mut root: TestCaseGroup<()> = TestCaseGroup::new("root", "");
        let mut child = TestCaseGroup::new("child", "");
        child.add_case(TestCase::new("leaf", |_: &()| Ok(TestStatus::pass("Ok"))));
        root.add_group(child);
        root.add_case(TestCase::new("top", |_: &()| Ok(TestStatus::pass("Ok"))));

        let paths: Vec<String> = root.leaves().into_iter().map(|(path, _)| path).collect();
        assert_eq!(paths, vec!["root.child.leaf".to_string(), "root.top".to_string()]);
    }

    #[test]
    fn excluded_object_types() {
        assert!(CaseKind::Single.function::<Instance>().is_some());
        assert!(CaseKind::MultipleSharedResources.function::<Instance>().is_none());
        assert!(CaseKind::MultipleSharedResources.function::<Device>().is_some());
        assert!(CaseKind::MultithreadedPerThreadDevice.function::<DeviceGroup>().is_none());
        assert!(CaseKind::MultithreadedSharedResources.function::<CommandBuffer>().is_none());
        assert!(CaseKind::MultithreadedSharedResources.function::<CommandPool>().is_some());
    }
}
