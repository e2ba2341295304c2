// Shader modules and pipeline caches
//
// Modules are created from the precompiled SPIR-V in the environment's
// BinaryCollection. A missing program turns into NotSupported.

use ash::vk;

use super::{
    safe_object_count, Context, Environment, Object, DEFAULT_MAX_CONCURRENT_OBJECTS, MAX_CONCURRENT_PIPELINE_CACHES,
};
use crate::backend::Unique;
use crate::error::{TestResultOf, VkCheck};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShaderModuleParameters {
    pub stage: vk::ShaderStageFlags,
    pub binary_name: String,
}

impl ShaderModuleParameters {
    pub fn new(stage: vk::ShaderStageFlags, binary_name: &str) -> Self {
        Self {
            stage,
            binary_name: binary_name.to_string(),
        }
    }
}

pub struct ShaderModuleResources {
    pub code: Vec<u32>,
}

pub struct ShaderModule;

impl Object for ShaderModule {
    type Parameters = ShaderModuleParameters;
    type Resources = ShaderModuleResources;
    type Handle = Unique<vk::ShaderModule>;

    const TYPE_NAME: &'static str = "VkShaderModule";

    fn resources(env: &Environment, params: &ShaderModuleParameters) -> TestResultOf<ShaderModuleResources> {
        let code = env.binaries.get(&params.binary_name)?.to_vec();
        Ok(ShaderModuleResources { code })
    }

    fn create(env: &Environment, res: &ShaderModuleResources, _params: &ShaderModuleParameters) -> TestResultOf<Self::Handle> {
        let create_info = vk::ShaderModuleCreateInfo::builder().code(&res.code);

        let module =
            unsafe { env.device.create_shader_module(&create_info, None) }.check("vkCreateShaderModule")?;

        Ok(Unique::new(&env.device, module))
    }

    fn max_concurrent(context: &Context, _params: &ShaderModuleParameters) -> TestResultOf<u32> {
        Ok(safe_object_count(context, DEFAULT_MAX_CONCURRENT_OBJECTS, 0))
    }
}

pub struct PipelineCache;

impl Object for PipelineCache {
    type Parameters = ();
    type Resources = ();
    type Handle = Unique<vk::PipelineCache>;

    const TYPE_NAME: &'static str = "VkPipelineCache";

    fn resources(_env: &Environment, _params: &()) -> TestResultOf<()> {
        Ok(())
    }

    fn create(env: &Environment, _res: &(), _params: &()) -> TestResultOf<Self::Handle> {
        let create_info = vk::PipelineCacheCreateInfo::builder();

        let cache =
            unsafe { env.device.create_pipeline_cache(&create_info, None) }.check("vkCreatePipelineCache")?;

        Ok(Unique::new(&env.device, cache))
    }

    fn max_concurrent(context: &Context, _params: &()) -> TestResultOf<u32> {
        Ok(safe_object_count(context, MAX_CONCURRENT_PIPELINE_CACHES, 0))
    }
}
