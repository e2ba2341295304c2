// VkQueryPool

use ash::vk;

use super::{safe_object_count, Context, Environment, Object, MAX_CONCURRENT_QUERY_POOLS};
use crate::backend::Unique;
use crate::error::{TestResultOf, VkCheck};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueryPoolParameters {
    pub query_type: vk::QueryType,
    pub entry_count: u32,
    pub pipeline_statistics: vk::QueryPipelineStatisticFlags,
}

pub struct QueryPool;

impl Object for QueryPool {
    type Parameters = QueryPoolParameters;
    type Resources = ();
    type Handle = Unique<vk::QueryPool>;

    const TYPE_NAME: &'static str = "VkQueryPool";

    fn resources(_env: &Environment, _params: &QueryPoolParameters) -> TestResultOf<()> {
        Ok(())
    }

    fn create(env: &Environment, _res: &(), params: &QueryPoolParameters) -> TestResultOf<Self::Handle> {
        let pool_info = vk::QueryPoolCreateInfo::builder()
            .query_type(params.query_type)
            .query_count(params.entry_count)
            .pipeline_statistics(params.pipeline_statistics);

        let pool = unsafe { env.device.create_query_pool(&pool_info, None) }.check("vkCreateQueryPool")?;

        Ok(Unique::new(&env.device, pool))
    }

    fn max_concurrent(context: &Context, _params: &QueryPoolParameters) -> TestResultOf<u32> {
        Ok(safe_object_count(context, MAX_CONCURRENT_QUERY_POOLS, 0))
    }
}
