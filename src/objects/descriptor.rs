// Samplers, descriptor set layouts, pipeline layouts, descriptor pools/sets

use ash::vk;
use std::collections::BTreeMap;

use super::{safe_object_count, Context, Dependency, Environment, Object, DEFAULT_MAX_CONCURRENT_OBJECTS};
use crate::backend::Unique;
use crate::error::{TestResultOf, VkCheck};

// =============================================================================
// Sampler
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SamplerParameters {
    pub mag_filter: vk::Filter,
    pub min_filter: vk::Filter,
    pub mipmap_mode: vk::SamplerMipmapMode,
    pub address_mode_u: vk::SamplerAddressMode,
    pub address_mode_v: vk::SamplerAddressMode,
    pub address_mode_w: vk::SamplerAddressMode,
    pub mip_lod_bias: f32,
    pub anisotropy_enable: bool,
    pub max_anisotropy: f32,
    pub compare_enable: bool,
    pub compare_op: vk::CompareOp,
    pub min_lod: f32,
    pub max_lod: f32,
    pub border_color: vk::BorderColor,
    pub unnormalized_coordinates: bool,
}

impl Default for SamplerParameters {
    fn default() -> Self {
        Self {
            mag_filter: vk::Filter::NEAREST,
            min_filter: vk::Filter::NEAREST,
            mipmap_mode: vk::SamplerMipmapMode::NEAREST,
            address_mode_u: vk::SamplerAddressMode::CLAMP_TO_EDGE,
            address_mode_v: vk::SamplerAddressMode::CLAMP_TO_EDGE,
            address_mode_w: vk::SamplerAddressMode::CLAMP_TO_EDGE,
            mip_lod_bias: 0.0,
            anisotropy_enable: false,
            max_anisotropy: 1.0,
            compare_enable: false,
            compare_op: vk::CompareOp::ALWAYS,
            min_lod: -1000.0,
            max_lod: 1000.0,
            border_color: vk::BorderColor::FLOAT_TRANSPARENT_BLACK,
            unnormalized_coordinates: false,
        }
    }
}

pub struct Sampler;

impl Object for Sampler {
    type Parameters = SamplerParameters;
    type Resources = ();
    type Handle = Unique<vk::Sampler>;

    const TYPE_NAME: &'static str = "VkSampler";

    fn resources(_env: &Environment, _params: &SamplerParameters) -> TestResultOf<()> {
        Ok(())
    }

    fn create(env: &Environment, _res: &(), params: &SamplerParameters) -> TestResultOf<Self::Handle> {
        let sampler_info = vk::SamplerCreateInfo::builder()
            .mag_filter(params.mag_filter)
            .min_filter(params.min_filter)
            .mipmap_mode(params.mipmap_mode)
            .address_mode_u(params.address_mode_u)
            .address_mode_v(params.address_mode_v)
            .address_mode_w(params.address_mode_w)
            .mip_lod_bias(params.mip_lod_bias)
            .anisotropy_enable(params.anisotropy_enable)
            .max_anisotropy(params.max_anisotropy)
            .compare_enable(params.compare_enable)
            .compare_op(params.compare_op)
            .min_lod(params.min_lod)
            .max_lod(params.max_lod)
            .border_color(params.border_color)
            .unnormalized_coordinates(params.unnormalized_coordinates);

        let sampler = unsafe { env.device.create_sampler(&sampler_info, None) }.check("vkCreateSampler")?;

        Ok(Unique::new(&env.device, sampler))
    }

    fn max_concurrent(context: &Context, _params: &SamplerParameters) -> TestResultOf<u32> {
        let hard_limit = context
            .limits()
            .max_sampler_allocation_count
            .min(DEFAULT_MAX_CONCURRENT_OBJECTS);
        Ok(safe_object_count(context, hard_limit, 0))
    }
}

// =============================================================================
// Descriptor set layout
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LayoutBinding {
    pub binding: u32,
    pub descriptor_type: vk::DescriptorType,
    pub descriptor_count: u32,
    pub stage_flags: vk::ShaderStageFlags,
    pub use_immutable_sampler: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DescriptorSetLayoutParameters {
    pub bindings: Vec<LayoutBinding>,
}

impl DescriptorSetLayoutParameters {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn single(
        binding: u32,
        descriptor_type: vk::DescriptorType,
        descriptor_count: u32,
        stage_flags: vk::ShaderStageFlags,
        use_immutable_sampler: bool,
    ) -> Self {
        Self {
            bindings: vec![LayoutBinding {
                binding,
                descriptor_type,
                descriptor_count,
                stage_flags,
                use_immutable_sampler,
            }],
        }
    }
}

pub struct DescriptorSetLayoutResources {
    /// One sampler shared by every binding that asks for an immutable one
    pub immutable_sampler: Option<Dependency<Sampler>>,
    pub immutable_samplers: Vec<vk::Sampler>,
}

pub struct DescriptorSetLayout;

impl Object for DescriptorSetLayout {
    type Parameters = DescriptorSetLayoutParameters;
    type Resources = DescriptorSetLayoutResources;
    type Handle = Unique<vk::DescriptorSetLayout>;

    const TYPE_NAME: &'static str = "VkDescriptorSetLayout";

    fn resources(env: &Environment, params: &DescriptorSetLayoutParameters) -> TestResultOf<DescriptorSetLayoutResources> {
        let sampler_count = params
            .bindings
            .iter()
            .filter(|binding| binding.use_immutable_sampler)
            .map(|binding| binding.descriptor_count as usize)
            .max();

        let Some(sampler_count) = sampler_count else {
            return Ok(DescriptorSetLayoutResources {
                immutable_sampler: None,
                immutable_samplers: Vec::new(),
            });
        };

        let sampler = Dependency::<Sampler>::new(env, &SamplerParameters::default())?;
        let immutable_samplers = vec![sampler.object.get(); sampler_count];

        Ok(DescriptorSetLayoutResources {
            immutable_sampler: Some(sampler),
            immutable_samplers,
        })
    }

    fn create(
        env: &Environment,
        res: &DescriptorSetLayoutResources,
        params: &DescriptorSetLayoutParameters,
    ) -> TestResultOf<Self::Handle> {
        let bindings: Vec<vk::DescriptorSetLayoutBinding> = params
            .bindings
            .iter()
            .map(|binding| {
                let builder = vk::DescriptorSetLayoutBinding::builder()
                    .binding(binding.binding)
                    .descriptor_type(binding.descriptor_type)
                    .stage_flags(binding.stage_flags);

                if binding.use_immutable_sampler {
                    builder
                        .immutable_samplers(&res.immutable_samplers[..binding.descriptor_count as usize])
                        .build()
                } else {
                    builder.descriptor_count(binding.descriptor_count).build()
                }
            })
            .collect();

        let layout_info = vk::DescriptorSetLayoutCreateInfo::builder().bindings(&bindings);

        let layout = unsafe { env.device.create_descriptor_set_layout(&layout_info, None) }
            .check("vkCreateDescriptorSetLayout")?;

        Ok(Unique::new(&env.device, layout))
    }

    fn max_concurrent(context: &Context, _params: &DescriptorSetLayoutParameters) -> TestResultOf<u32> {
        Ok(safe_object_count(context, DEFAULT_MAX_CONCURRENT_OBJECTS, 0))
    }
}

// =============================================================================
// Pipeline layout
// =============================================================================

#[derive(Debug, Clone, Default)]
pub struct PipelineLayoutParameters {
    pub set_layouts: Vec<DescriptorSetLayoutParameters>,
    pub push_constant_ranges: Vec<vk::PushConstantRange>,
}

impl PipelineLayoutParameters {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn single_descriptor_set(layout: DescriptorSetLayoutParameters) -> Self {
        Self {
            set_layouts: vec![layout],
            push_constant_ranges: Vec::new(),
        }
    }
}

pub struct PipelineLayoutResources {
    pub set_layouts: Vec<Dependency<DescriptorSetLayout>>,
    pub set_layout_handles: Vec<vk::DescriptorSetLayout>,
}

pub struct PipelineLayout;

impl Object for PipelineLayout {
    type Parameters = PipelineLayoutParameters;
    type Resources = PipelineLayoutResources;
    type Handle = Unique<vk::PipelineLayout>;

    const TYPE_NAME: &'static str = "VkPipelineLayout";

    fn resources(env: &Environment, params: &PipelineLayoutParameters) -> TestResultOf<PipelineLayoutResources> {
        let set_layouts = params
            .set_layouts
            .iter()
            .map(|layout| Dependency::<DescriptorSetLayout>::new(env, layout))
            .collect::<TestResultOf<Vec<_>>>()?;
        let set_layout_handles = set_layouts.iter().map(|layout| layout.object.get()).collect();

        Ok(PipelineLayoutResources {
            set_layouts,
            set_layout_handles,
        })
    }

    fn create(
        env: &Environment,
        res: &PipelineLayoutResources,
        params: &PipelineLayoutParameters,
    ) -> TestResultOf<Self::Handle> {
        let layout_info = vk::PipelineLayoutCreateInfo::builder()
            .set_layouts(&res.set_layout_handles)
            .push_constant_ranges(&params.push_constant_ranges);

        let layout =
            unsafe { env.device.create_pipeline_layout(&layout_info, None) }.check("vkCreatePipelineLayout")?;

        Ok(Unique::new(&env.device, layout))
    }

    fn max_concurrent(context: &Context, _params: &PipelineLayoutParameters) -> TestResultOf<u32> {
        Ok(safe_object_count(context, DEFAULT_MAX_CONCURRENT_OBJECTS, 0))
    }
}

// =============================================================================
// Descriptor pool
// =============================================================================

#[derive(Debug, Clone)]
pub struct DescriptorPoolParameters {
    pub flags: vk::DescriptorPoolCreateFlags,
    pub max_sets: u32,
    pub pool_sizes: Vec<vk::DescriptorPoolSize>,
}

impl DescriptorPoolParameters {
    pub fn single_type(
        flags: vk::DescriptorPoolCreateFlags,
        max_sets: u32,
        descriptor_type: vk::DescriptorType,
        count: u32,
    ) -> Self {
        Self {
            flags,
            max_sets,
            pool_sizes: vec![vk::DescriptorPoolSize {
                ty: descriptor_type,
                descriptor_count: count,
            }],
        }
    }
}

pub struct DescriptorPool;

impl Object for DescriptorPool {
    type Parameters = DescriptorPoolParameters;
    type Resources = ();
    type Handle = Unique<vk::DescriptorPool>;

    const TYPE_NAME: &'static str = "VkDescriptorPool";

    fn resources(_env: &Environment, _params: &DescriptorPoolParameters) -> TestResultOf<()> {
        Ok(())
    }

    fn create(env: &Environment, _res: &(), params: &DescriptorPoolParameters) -> TestResultOf<Self::Handle> {
        let pool_info = vk::DescriptorPoolCreateInfo::builder()
            .flags(params.flags)
            .max_sets(params.max_sets)
            .pool_sizes(&params.pool_sizes);

        let pool =
            unsafe { env.device.create_descriptor_pool(&pool_info, None) }.check("vkCreateDescriptorPool")?;

        Ok(Unique::new(&env.device, pool))
    }

    fn max_concurrent(context: &Context, _params: &DescriptorPoolParameters) -> TestResultOf<u32> {
        Ok(safe_object_count(context, DEFAULT_MAX_CONCURRENT_OBJECTS, 0))
    }
}

// =============================================================================
// Descriptor set
// =============================================================================

/// Pool sizes that fit `max_sets` sets of `layout`, one entry per used type
/// in ascending type order
pub fn compute_pool_sizes(layout: &DescriptorSetLayoutParameters, max_sets: u32) -> Vec<vk::DescriptorPoolSize> {
    let mut count_by_type: BTreeMap<i32, u32> = BTreeMap::new();

    for binding in &layout.bindings {
        *count_by_type.entry(binding.descriptor_type.as_raw()).or_default() += binding.descriptor_count * max_sets;
    }

    count_by_type
        .into_iter()
        .filter(|&(_, count)| count > 0)
        .map(|(ty, descriptor_count)| vk::DescriptorPoolSize {
            ty: vk::DescriptorType::from_raw(ty),
            descriptor_count,
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DescriptorSetParameters {
    pub layout: DescriptorSetLayoutParameters,
}

pub struct DescriptorSetResources {
    pub pool: Dependency<DescriptorPool>,
    pub layout: Dependency<DescriptorSetLayout>,
}

pub struct DescriptorSet;

impl Object for DescriptorSet {
    type Parameters = DescriptorSetParameters;
    type Resources = DescriptorSetResources;
    type Handle = Unique<vk::DescriptorSet>;

    const TYPE_NAME: &'static str = "VkDescriptorSet";

    fn resources(env: &Environment, params: &DescriptorSetParameters) -> TestResultOf<DescriptorSetResources> {
        // Every consumer of these resources may hold one set at a time
        let pool_params = DescriptorPoolParameters {
            flags: vk::DescriptorPoolCreateFlags::FREE_DESCRIPTOR_SET,
            max_sets: env.max_resource_consumers,
            pool_sizes: compute_pool_sizes(&params.layout, env.max_resource_consumers),
        };

        let pool = Dependency::<DescriptorPool>::new(env, &pool_params)?;
        let layout = Dependency::<DescriptorSetLayout>::new(env, &params.layout)?;

        Ok(DescriptorSetResources { pool, layout })
    }

    fn create(env: &Environment, res: &DescriptorSetResources, _params: &DescriptorSetParameters) -> TestResultOf<Self::Handle> {
        let set_layouts = [res.layout.object.get()];
        let allocate_info = vk::DescriptorSetAllocateInfo::builder()
            .descriptor_pool(res.pool.object.get())
            .set_layouts(&set_layouts);

        let sets =
            unsafe { env.device.allocate_descriptor_sets(&allocate_info) }.check("vkAllocateDescriptorSets")?;

        Ok(Unique::with_owner(&env.device, sets[0], res.pool.object.get()))
    }

    fn max_concurrent(context: &Context, _params: &DescriptorSetParameters) -> TestResultOf<u32> {
        Ok(safe_object_count(context, DEFAULT_MAX_CONCURRENT_OBJECTS, 0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn binding(ndx: u32, descriptor_type: vk::DescriptorType, count: u32) -> LayoutBinding {
        LayoutBinding {
            binding: ndx,
            descriptor_type,
            descriptor_count: count,
            stage_flags: vk::ShaderStageFlags::ALL,
            use_immutable_sampler: false,
        }
    }

    #[test]
    fn pool_sizes_scale_with_max_sets() {
        let layout = DescriptorSetLayoutParameters::single(
            0,
            vk::DescriptorType::UNIFORM_BUFFER,
            1,
            vk::ShaderStageFlags::VERTEX,
            false,
        );
        let sizes = compute_pool_sizes(&layout, 4);
        assert_eq!(sizes.len(), 1);
        assert_eq!(sizes[0].ty, vk::DescriptorType::UNIFORM_BUFFER);
        assert_eq!(sizes[0].descriptor_count, 4);
    }

    #[test]
    fn pool_sizes_merge_types_in_order() {
        let layout = DescriptorSetLayoutParameters {
            bindings: vec![
                binding(0, vk::DescriptorType::STORAGE_BUFFER, 2),
                binding(1, vk::DescriptorType::SAMPLER, 1),
                binding(2, vk::DescriptorType::STORAGE_BUFFER, 3),
            ],
        };
        let sizes = compute_pool_sizes(&layout, 2);
        assert_eq!(sizes.len(), 2);
        assert_eq!(sizes[0].ty, vk::DescriptorType::SAMPLER);
        assert_eq!(sizes[0].descriptor_count, 2);
        assert_eq!(sizes[1].ty, vk::DescriptorType::STORAGE_BUFFER);
        assert_eq!(sizes[1].descriptor_count, 10);
    }

    #[test]
    fn empty_layout_needs_no_pool_sizes() {
        assert!(compute_pool_sizes(&DescriptorSetLayoutParameters::empty(), 8).is_empty());
    }

    #[test]
    fn default_sampler_is_nearest_clamped() {
        let params = SamplerParameters::default();
        assert_eq!(params.mag_filter, vk::Filter::NEAREST);
        assert_eq!(params.address_mode_w, vk::SamplerAddressMode::CLAMP_TO_EDGE);
        assert_eq!(params.min_lod, -1000.0);
    }
}
