// Images and image views

use ash::vk;

use super::memory::{DeviceMemory, DeviceMemoryParameters};
use super::{safe_object_count, Context, Dependency, Environment, Object, DEFAULT_MAX_CONCURRENT_OBJECTS};
use crate::backend::Unique;
use crate::error::{TestResultOf, VkCheck};

#[derive(Debug, Clone, Copy)]
pub struct ImageParameters {
    pub flags: vk::ImageCreateFlags,
    pub image_type: vk::ImageType,
    pub format: vk::Format,
    pub extent: vk::Extent3D,
    pub mip_levels: u32,
    pub array_size: u32,
    pub samples: vk::SampleCountFlags,
    pub tiling: vk::ImageTiling,
    pub usage: vk::ImageUsageFlags,
    pub initial_layout: vk::ImageLayout,
}

impl ImageParameters {
    /// Single-sampled, optimally tiled, one mip level, undefined layout
    pub fn simple(
        flags: vk::ImageCreateFlags,
        image_type: vk::ImageType,
        format: vk::Format,
        extent: vk::Extent3D,
        array_size: u32,
        usage: vk::ImageUsageFlags,
    ) -> Self {
        Self {
            flags,
            image_type,
            format,
            extent,
            mip_levels: 1,
            array_size,
            samples: vk::SampleCountFlags::TYPE_1,
            tiling: vk::ImageTiling::OPTIMAL,
            usage,
            initial_layout: vk::ImageLayout::UNDEFINED,
        }
    }
}

pub struct Image;

impl Object for Image {
    type Parameters = ImageParameters;
    type Resources = ();
    type Handle = Unique<vk::Image>;

    const TYPE_NAME: &'static str = "VkImage";

    fn resources(_env: &Environment, _params: &ImageParameters) -> TestResultOf<()> {
        Ok(())
    }

    fn create(env: &Environment, _res: &(), params: &ImageParameters) -> TestResultOf<Self::Handle> {
        let queue_families = [env.queue_family_index];
        let image_info = vk::ImageCreateInfo::builder()
            .flags(params.flags)
            .image_type(params.image_type)
            .format(params.format)
            .extent(params.extent)
            .mip_levels(params.mip_levels)
            .array_layers(params.array_size)
            .samples(params.samples)
            .tiling(params.tiling)
            .usage(params.usage)
            .sharing_mode(vk::SharingMode::EXCLUSIVE)
            .queue_family_indices(&queue_families)
            .initial_layout(params.initial_layout);

        let image = unsafe { env.device.create_image(&image_info, None) }.check("vkCreateImage")?;

        Ok(Unique::new(&env.device, image))
    }

    fn max_concurrent(context: &Context, params: &ImageParameters) -> TestResultOf<u32> {
        let env = Environment::new(context, 1);
        let image = Self::create(&env, &(), params)?;
        let requirements = unsafe { env.device.get_image_memory_requirements(image.get()) };

        Ok(safe_object_count(
            context,
            DEFAULT_MAX_CONCURRENT_OBJECTS,
            context.memory_limits.page_table_size(requirements.size),
        ))
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ImageViewParameters {
    pub image: ImageParameters,
    pub view_type: vk::ImageViewType,
    pub format: vk::Format,
    pub components: vk::ComponentMapping,
    pub subresource_range: vk::ImageSubresourceRange,
}

impl ImageViewParameters {
    /// Identity swizzle over `layer_count` layers of mip 0
    pub fn new(
        image: ImageParameters,
        view_type: vk::ImageViewType,
        aspect_mask: vk::ImageAspectFlags,
        layer_count: u32,
    ) -> Self {
        Self {
            image,
            view_type,
            format: image.format,
            components: rgba_mapping(),
            subresource_range: vk::ImageSubresourceRange {
                aspect_mask,
                base_mip_level: 0,
                level_count: 1,
                base_array_layer: 0,
                layer_count,
            },
        }
    }
}

pub fn rgba_mapping() -> vk::ComponentMapping {
    vk::ComponentMapping {
        r: vk::ComponentSwizzle::R,
        g: vk::ComponentSwizzle::G,
        b: vk::ComponentSwizzle::B,
        a: vk::ComponentSwizzle::A,
    }
}

pub struct ImageViewResources {
    pub image: Dependency<Image>,
    pub memory: Dependency<DeviceMemory>,
}

pub struct ImageView;

impl Object for ImageView {
    type Parameters = ImageViewParameters;
    type Resources = ImageViewResources;
    type Handle = Unique<vk::ImageView>;

    const TYPE_NAME: &'static str = "VkImageView";

    fn resources(env: &Environment, params: &ImageViewParameters) -> TestResultOf<ImageViewResources> {
        let image = Dependency::<Image>::new(env, &params.image)?;
        let requirements = unsafe { env.device.get_image_memory_requirements(image.object.get()) };
        let memory = Dependency::<DeviceMemory>::new(env, &DeviceMemoryParameters::from_requirements(&requirements))?;

        unsafe { env.device.bind_image_memory(image.object.get(), memory.object.get(), 0) }
            .check("vkBindImageMemory")?;

        Ok(ImageViewResources { image, memory })
    }

    fn create(env: &Environment, res: &ImageViewResources, params: &ImageViewParameters) -> TestResultOf<Self::Handle> {
        let view_info = vk::ImageViewCreateInfo::builder()
            .image(res.image.object.get())
            .view_type(params.view_type)
            .format(params.format)
            .components(params.components)
            .subresource_range(params.subresource_range);

        let view = unsafe { env.device.create_image_view(&view_info, None) }.check("vkCreateImageView")?;

        Ok(Unique::new(&env.device, view))
    }

    fn max_concurrent(context: &Context, _params: &ImageViewParameters) -> TestResultOf<u32> {
        Ok(safe_object_count(context, DEFAULT_MAX_CONCURRENT_OBJECTS, 0))
    }
}
