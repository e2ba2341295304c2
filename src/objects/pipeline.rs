// Render passes, graphics/compute pipelines and framebuffers
//
// Each of these has a single fixed configuration: one color + depth
// render pass, a vertex/fragment pipeline drawing into it, a compute
// pipeline over two storage buffers and a 256x256 framebuffer.

use ash::vk;

use super::descriptor::{DescriptorSetLayoutParameters, LayoutBinding, PipelineLayout, PipelineLayoutParameters};
use super::image::{ImageParameters, ImageView, ImageViewParameters};
use super::shader::{PipelineCache, ShaderModule, ShaderModuleParameters};
use super::{safe_object_count, Context, Dependency, Environment, Object, DEFAULT_MAX_CONCURRENT_OBJECTS};
use crate::backend::Unique;
use crate::error::{TestResultOf, VkCheck};

const COLOR_FORMAT: vk::Format = vk::Format::R8G8B8A8_UNORM;
const DEPTH_FORMAT: vk::Format = vk::Format::D16_UNORM;

const FRAMEBUFFER_SIZE: u32 = 256;
const VIEWPORT_SIZE: u32 = 64;

// =============================================================================
// Render pass
// =============================================================================

pub struct RenderPass;

impl Object for RenderPass {
    type Parameters = ();
    type Resources = ();
    type Handle = Unique<vk::RenderPass>;

    const TYPE_NAME: &'static str = "VkRenderPass";

    fn resources(_env: &Environment, _params: &()) -> TestResultOf<()> {
        Ok(())
    }

    fn create(env: &Environment, _res: &(), _params: &()) -> TestResultOf<Self::Handle> {
        let color_attachment = vk::AttachmentDescription::builder()
            .format(COLOR_FORMAT)
            .samples(vk::SampleCountFlags::TYPE_1)
            .load_op(vk::AttachmentLoadOp::CLEAR)
            .store_op(vk::AttachmentStoreOp::DONT_CARE)
            .stencil_load_op(vk::AttachmentLoadOp::DONT_CARE)
            .stencil_store_op(vk::AttachmentStoreOp::DONT_CARE)
            .initial_layout(vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL)
            .final_layout(vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL)
            .build();

        let depth_attachment = vk::AttachmentDescription::builder()
            .format(DEPTH_FORMAT)
            .samples(vk::SampleCountFlags::TYPE_1)
            .load_op(vk::AttachmentLoadOp::CLEAR)
            .store_op(vk::AttachmentStoreOp::DONT_CARE)
            .stencil_load_op(vk::AttachmentLoadOp::DONT_CARE)
            .stencil_store_op(vk::AttachmentStoreOp::DONT_CARE)
            .initial_layout(vk::ImageLayout::DEPTH_STENCIL_ATTACHMENT_OPTIMAL)
            .final_layout(vk::ImageLayout::DEPTH_STENCIL_ATTACHMENT_OPTIMAL)
            .build();

        let color_attachment_ref = vk::AttachmentReference::builder()
            .attachment(0)
            .layout(vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL)
            .build();

        let depth_attachment_ref = vk::AttachmentReference::builder()
            .attachment(1)
            .layout(vk::ImageLayout::DEPTH_STENCIL_ATTACHMENT_OPTIMAL)
            .build();

        let color_attachments = [color_attachment_ref];
        let subpass = vk::SubpassDescription::builder()
            .pipeline_bind_point(vk::PipelineBindPoint::GRAPHICS)
            .color_attachments(&color_attachments)
            .depth_stencil_attachment(&depth_attachment_ref)
            .build();

        let attachments = [color_attachment, depth_attachment];
        let subpasses = [subpass];

        let render_pass_info = vk::RenderPassCreateInfo::builder()
            .attachments(&attachments)
            .subpasses(&subpasses);

        let render_pass =
            unsafe { env.device.create_render_pass(&render_pass_info, None) }.check("vkCreateRenderPass")?;

        Ok(Unique::new(&env.device, render_pass))
    }

    fn max_concurrent(context: &Context, _params: &()) -> TestResultOf<u32> {
        Ok(safe_object_count(context, DEFAULT_MAX_CONCURRENT_OBJECTS, 0))
    }
}

// =============================================================================
// Graphics pipeline
// =============================================================================

pub struct GraphicsPipelineResources {
    pub vertex_shader: Dependency<ShaderModule>,
    pub fragment_shader: Dependency<ShaderModule>,
    pub layout: Dependency<PipelineLayout>,
    pub render_pass: Dependency<RenderPass>,
    pub cache: Dependency<PipelineCache>,
}

/// One set with an immutable combined image sampler for the fragment stage
fn sampled_fragment_layout() -> PipelineLayoutParameters {
    PipelineLayoutParameters::single_descriptor_set(DescriptorSetLayoutParameters::single(
        0,
        vk::DescriptorType::COMBINED_IMAGE_SAMPLER,
        1,
        vk::ShaderStageFlags::FRAGMENT,
        true,
    ))
}

pub struct GraphicsPipeline;

impl Object for GraphicsPipeline {
    type Parameters = ();
    type Resources = GraphicsPipelineResources;
    type Handle = Unique<vk::Pipeline>;

    const TYPE_NAME: &'static str = "VkPipeline";

    fn resources(env: &Environment, _params: &()) -> TestResultOf<GraphicsPipelineResources> {
        Ok(GraphicsPipelineResources {
            vertex_shader: Dependency::new(env, &ShaderModuleParameters::new(vk::ShaderStageFlags::VERTEX, "vert"))?,
            fragment_shader: Dependency::new(
                env,
                &ShaderModuleParameters::new(vk::ShaderStageFlags::FRAGMENT, "frag"),
            )?,
            layout: Dependency::new(env, &sampled_fragment_layout())?,
            render_pass: Dependency::new(env, &())?,
            cache: Dependency::new(env, &())?,
        })
    }

    fn create(env: &Environment, res: &GraphicsPipelineResources, _params: &()) -> TestResultOf<Self::Handle> {
        let entry_point = c"main";

        let shader_stages = [
            vk::PipelineShaderStageCreateInfo::builder()
                .stage(vk::ShaderStageFlags::VERTEX)
                .module(res.vertex_shader.object.get())
                .name(entry_point)
                .build(),
            vk::PipelineShaderStageCreateInfo::builder()
                .stage(vk::ShaderStageFlags::FRAGMENT)
                .module(res.fragment_shader.object.get())
                .name(entry_point)
                .build(),
        ];

        // Single vec4 position
        let bindings = [vk::VertexInputBindingDescription::builder()
            .binding(0)
            .stride(4 * std::mem::size_of::<f32>() as u32)
            .input_rate(vk::VertexInputRate::VERTEX)
            .build()];
        let attributes = [vk::VertexInputAttributeDescription::builder()
            .binding(0)
            .location(0)
            .format(vk::Format::R32G32B32A32_SFLOAT)
            .offset(0)
            .build()];

        let vertex_input_info = vk::PipelineVertexInputStateCreateInfo::builder()
            .vertex_binding_descriptions(&bindings)
            .vertex_attribute_descriptions(&attributes);

        let input_assembly = vk::PipelineInputAssemblyStateCreateInfo::builder()
            .topology(vk::PrimitiveTopology::TRIANGLE_LIST)
            .primitive_restart_enable(false);

        let viewports = [vk::Viewport::builder()
            .x(0.0)
            .y(0.0)
            .width(VIEWPORT_SIZE as f32)
            .height(VIEWPORT_SIZE as f32)
            .min_depth(0.0)
            .max_depth(1.0)
            .build()];
        let scissors = [vk::Rect2D {
            offset: vk::Offset2D { x: 0, y: 0 },
            extent: vk::Extent2D {
                width: VIEWPORT_SIZE,
                height: VIEWPORT_SIZE,
            },
        }];
        let viewport_state = vk::PipelineViewportStateCreateInfo::builder()
            .viewports(&viewports)
            .scissors(&scissors);

        let rasterizer = vk::PipelineRasterizationStateCreateInfo::builder()
            .depth_clamp_enable(false)
            .rasterizer_discard_enable(false)
            .polygon_mode(vk::PolygonMode::FILL)
            .line_width(1.0)
            .cull_mode(vk::CullModeFlags::BACK)
            .front_face(vk::FrontFace::COUNTER_CLOCKWISE)
            .depth_bias_enable(false);

        let multisampling = vk::PipelineMultisampleStateCreateInfo::builder()
            .sample_shading_enable(false)
            .rasterization_samples(vk::SampleCountFlags::TYPE_1);

        let depth_stencil = vk::PipelineDepthStencilStateCreateInfo::builder()
            .depth_test_enable(true)
            .depth_write_enable(true)
            .depth_compare_op(vk::CompareOp::LESS)
            .depth_bounds_test_enable(false)
            .stencil_test_enable(false)
            .min_depth_bounds(0.0)
            .max_depth_bounds(1.0);

        let color_blend_attachments = [vk::PipelineColorBlendAttachmentState::builder()
            .color_write_mask(vk::ColorComponentFlags::RGBA)
            .blend_enable(false)
            .build()];
        let color_blending = vk::PipelineColorBlendStateCreateInfo::builder()
            .logic_op_enable(false)
            .attachments(&color_blend_attachments);

        let pipeline_info = vk::GraphicsPipelineCreateInfo::builder()
            .stages(&shader_stages)
            .vertex_input_state(&vertex_input_info)
            .input_assembly_state(&input_assembly)
            .viewport_state(&viewport_state)
            .rasterization_state(&rasterizer)
            .multisample_state(&multisampling)
            .depth_stencil_state(&depth_stencil)
            .color_blend_state(&color_blending)
            .layout(res.layout.object.get())
            .render_pass(res.render_pass.object.get())
            .subpass(0)
            .build();

        let pipelines = unsafe {
            env.device
                .create_graphics_pipelines(res.cache.object.get(), &[pipeline_info], None)
        }
        .map_err(|(_, result)| result)
        .check("vkCreateGraphicsPipelines")?;

        Ok(Unique::new(&env.device, pipelines[0]))
    }

    fn max_concurrent(context: &Context, _params: &()) -> TestResultOf<u32> {
        Ok(safe_object_count(context, DEFAULT_MAX_CONCURRENT_OBJECTS, 0))
    }
}

// =============================================================================
// Compute pipeline
// =============================================================================

pub struct ComputePipelineResources {
    pub shader: Dependency<ShaderModule>,
    pub layout: Dependency<PipelineLayout>,
    pub cache: Dependency<PipelineCache>,
}

/// Input and output storage buffers for the compute stage
fn storage_buffer_layout() -> PipelineLayoutParameters {
    let storage_binding = |binding| LayoutBinding {
        binding,
        descriptor_type: vk::DescriptorType::STORAGE_BUFFER,
        descriptor_count: 1,
        stage_flags: vk::ShaderStageFlags::COMPUTE,
        use_immutable_sampler: false,
    };

    PipelineLayoutParameters::single_descriptor_set(DescriptorSetLayoutParameters {
        bindings: vec![storage_binding(0), storage_binding(1)],
    })
}

pub struct ComputePipeline;

impl Object for ComputePipeline {
    type Parameters = ();
    type Resources = ComputePipelineResources;
    type Handle = Unique<vk::Pipeline>;

    const TYPE_NAME: &'static str = "VkPipeline";

    fn resources(env: &Environment, _params: &()) -> TestResultOf<ComputePipelineResources> {
        Ok(ComputePipelineResources {
            shader: Dependency::new(env, &ShaderModuleParameters::new(vk::ShaderStageFlags::COMPUTE, "comp"))?,
            layout: Dependency::new(env, &storage_buffer_layout())?,
            cache: Dependency::new(env, &())?,
        })
    }

    fn create(env: &Environment, res: &ComputePipelineResources, _params: &()) -> TestResultOf<Self::Handle> {
        let stage = vk::PipelineShaderStageCreateInfo::builder()
            .stage(vk::ShaderStageFlags::COMPUTE)
            .module(res.shader.object.get())
            .name(c"main")
            .build();

        let pipeline_info = vk::ComputePipelineCreateInfo::builder()
            .stage(stage)
            .layout(res.layout.object.get())
            .base_pipeline_index(0)
            .build();

        let pipelines = unsafe {
            env.device
                .create_compute_pipelines(res.cache.object.get(), &[pipeline_info], None)
        }
        .map_err(|(_, result)| result)
        .check("vkCreateComputePipelines")?;

        Ok(Unique::new(&env.device, pipelines[0]))
    }

    fn max_concurrent(context: &Context, _params: &()) -> TestResultOf<u32> {
        Ok(safe_object_count(context, DEFAULT_MAX_CONCURRENT_OBJECTS, 0))
    }
}

// =============================================================================
// Framebuffer
// =============================================================================

pub struct FramebufferResources {
    pub color_attachment: Dependency<ImageView>,
    pub depth_stencil_attachment: Dependency<ImageView>,
    pub render_pass: Dependency<RenderPass>,
}

fn attachment_view(format: vk::Format, usage: vk::ImageUsageFlags, aspect: vk::ImageAspectFlags) -> ImageViewParameters {
    let image = ImageParameters::simple(
        vk::ImageCreateFlags::empty(),
        vk::ImageType::TYPE_2D,
        format,
        vk::Extent3D {
            width: FRAMEBUFFER_SIZE,
            height: FRAMEBUFFER_SIZE,
            depth: 1,
        },
        1,
        usage,
    );

    ImageViewParameters::new(image, vk::ImageViewType::TYPE_2D, aspect, 1)
}

pub struct Framebuffer;

impl Object for Framebuffer {
    type Parameters = ();
    type Resources = FramebufferResources;
    type Handle = Unique<vk::Framebuffer>;

    const TYPE_NAME: &'static str = "VkFramebuffer";

    fn resources(env: &Environment, _params: &()) -> TestResultOf<FramebufferResources> {
        let color_attachment = Dependency::new(
            env,
            &attachment_view(
                COLOR_FORMAT,
                vk::ImageUsageFlags::COLOR_ATTACHMENT,
                vk::ImageAspectFlags::COLOR,
            ),
        )?;
        let depth_stencil_attachment = Dependency::new(
            env,
            &attachment_view(
                DEPTH_FORMAT,
                vk::ImageUsageFlags::DEPTH_STENCIL_ATTACHMENT,
                vk::ImageAspectFlags::DEPTH,
            ),
        )?;

        Ok(FramebufferResources {
            color_attachment,
            depth_stencil_attachment,
            render_pass: Dependency::new(env, &())?,
        })
    }

    fn create(env: &Environment, res: &FramebufferResources, _params: &()) -> TestResultOf<Self::Handle> {
        let attachments = [
            res.color_attachment.object.get(),
            res.depth_stencil_attachment.object.get(),
        ];

        let framebuffer_info = vk::FramebufferCreateInfo::builder()
            .render_pass(res.render_pass.object.get())
            .attachments(&attachments)
            .width(FRAMEBUFFER_SIZE)
            .height(FRAMEBUFFER_SIZE)
            .layers(1);

        let framebuffer =
            unsafe { env.device.create_framebuffer(&framebuffer_info, None) }.check("vkCreateFramebuffer")?;

        Ok(Unique::new(&env.device, framebuffer))
    }

    fn max_concurrent(context: &Context, _params: &()) -> TestResultOf<u32> {
        Ok(safe_object_count(context, DEFAULT_MAX_CONCURRENT_OBJECTS, 0))
    }
}
