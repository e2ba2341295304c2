// Cases against the installed Vulkan implementation; skipped without one

use vk_objmgmt_cts::config::Config;
use vk_objmgmt_cts::objects::{Context, Dependency, Environment, Fence, Semaphore};
use vk_objmgmt_cts::runner::Runner;
use vk_objmgmt_cts::tree::{object_management_tests, CaseFilter};
use vk_objmgmt_cts::TestResult;

fn context() -> Option<Context> {
    let mut config = Config::default();
    config.runner.shader_dir = format!("{}/shaders", env!("CARGO_MANIFEST_DIR"));
    config.runner.threads = 2;

    match Context::new(&config) {
        Ok(context) => Some(context),
        Err(e) => {
            eprintln!("Skipping: no Vulkan implementation ({:?})", e);
            None
        }
    }
}

#[test]
fn dependencies_create_and_destroy() {
    let Some(context) = context() else { return };
    let env = Environment::new(&context, 1);

    let fence = Dependency::<Fence>::new(&env, &ash::vk::FenceCreateFlags::SIGNALED).unwrap();
    let status = unsafe { env.device.get_fence_status(fence.object.get()) }.unwrap();
    assert!(status);

    let _semaphore = Dependency::<Semaphore>::new(&env, &ash::vk::SemaphoreCreateFlags::empty()).unwrap();
}

#[test]
fn single_object_cases_pass() {
    let Some(context) = context() else { return };
    let root = object_management_tests(context.device_id, context.device_group_id);
    let runner = Runner::new(CaseFilter::new(vec!["object_management.single.*".to_string()]));

    let summary = runner.run(&root, &context);

    assert_eq!(summary.total(), 43);
    for outcome in summary.failures() {
        panic!("{} : {}", outcome.path, outcome.status);
    }
}

#[test]
fn multithreaded_sync_primitives_pass() {
    let Some(context) = context() else { return };
    let root = object_management_tests(context.device_id, context.device_group_id);
    let runner = Runner::new(CaseFilter::new(vec![
        "object_management.multithreaded_*.semaphore".to_string(),
        "object_management.multithreaded_*.fence*".to_string(),
    ]));

    let summary = runner.run(&root, &context);

    // Three multithreaded groups, one semaphore and two fence cases each
    assert_eq!(summary.total(), 9);
    assert_eq!(summary.count(TestResult::Pass) + summary.count(TestResult::NotSupported), 9);
}
