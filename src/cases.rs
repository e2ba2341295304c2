// =============================================================================
// CASES - create/destroy bodies shared by every object type
// =============================================================================
//
// Each body is generic over an Object and takes the case's parameters.
// Locals drop in reverse declaration order, so objects are always destroyed
// before the resources and environments they were created from.

use ash::vk;
use std::sync::Arc;

use crate::error::{TestError, TestResultOf};
use crate::objects::{Context, Dependency, Device, DeviceParameters, Environment, ImageViewParameters, Object};
use crate::status::TestStatus;
use crate::sync::{ThreadBarrier, ThreadGroup, ThreadGroupThread};

/// Objects created between progress messages in max_concurrent cases
const PROGRESS_INTERVAL: u32 = 1024;

/// Consumers sharing one resource set in multiple_shared_resources cases
const SHARED_RESOURCE_CONSUMERS: u32 = 4;

// =============================================================================
// Single-threaded bodies
// =============================================================================

pub fn create_single<O: Object>(context: &Context, params: &O::Parameters) -> TestResultOf<TestStatus> {
    let env = Environment::new(context, 1);
    let resources = O::resources(&env, params)?;
    let _object = O::create(&env, &resources, params)?;

    Ok(TestStatus::pass("Ok"))
}

pub fn multiple_unique_resources<O: Object>(context: &Context, params: &O::Parameters) -> TestResultOf<TestStatus> {
    let env = Environment::new(context, 1);
    let resources = (0..O::UNIQUE_RESOURCE_SETS)
        .map(|_| O::resources(&env, params))
        .collect::<TestResultOf<Vec<_>>>()?;
    let _objects = resources
        .iter()
        .map(|res| O::create(&env, res, params))
        .collect::<TestResultOf<Vec<_>>>()?;

    Ok(TestStatus::pass("Ok"))
}

pub fn multiple_shared_resources<O: Object>(context: &Context, params: &O::Parameters) -> TestResultOf<TestStatus> {
    let env = Environment::new(context, SHARED_RESOURCE_CONSUMERS);
    let resources = O::resources(&env, params)?;
    let _objects = (0..SHARED_RESOURCE_CONSUMERS)
        .map(|_| O::create(&env, &resources, params))
        .collect::<TestResultOf<Vec<_>>>()?;

    Ok(TestStatus::pass("Ok"))
}

pub fn max_concurrent<O: Object>(context: &Context, params: &O::Parameters) -> TestResultOf<TestStatus> {
    let num_objects = O::max_concurrent(context, params)?;
    let env = Environment::new(context, num_objects);
    let resources = O::resources(&env, params)?;
    let mut objects = Vec::with_capacity(num_objects as usize);

    log::info!("Creating {} {} objects", num_objects, O::TYPE_NAME);

    for ndx in 0..num_objects {
        objects.push(O::create(&env, &resources, params)?);

        if ndx > 0 && ndx % PROGRESS_INTERVAL == 0 {
            log::debug!("Created {} of {} objects", ndx, num_objects);
        }
    }

    log::info!("Destroying {} objects", objects.len());
    objects.clear();

    Ok(TestStatus::pass("Ok"))
}

// =============================================================================
// Multithreaded bodies
// =============================================================================

/// Worker that repeatedly creates and destroys one object type
struct CreateThread<'a, O: Object> {
    env: &'a Environment,
    resources: &'a O::Resources,
    params: &'a O::Parameters,
}

impl<'a, O: Object> CreateThread<'a, O> {
    fn new(env: &'a Environment, resources: &'a O::Resources, params: &'a O::Parameters) -> Self {
        Self { env, resources, params }
    }
}

impl<O: Object> ThreadGroupThread for CreateThread<'_, O> {
    fn run_thread(&mut self, barrier: &ThreadBarrier<'_>) -> Result<(), TestError> {
        let num_iters = O::CREATE_COUNT;
        let iters_between_syncs = (num_iters / 5).max(1);

        for iter in 0..num_iters {
            // Line workers up so they enter the driver together
            if iter % iters_between_syncs == 0 {
                barrier.sync();
            }

            let _object = O::create(self.env, self.resources, self.params)?;
        }

        Ok(())
    }
}

pub fn multithreaded_shared_resources<O: Object>(
    context: &Context,
    params: &O::Parameters,
) -> TestResultOf<TestStatus> {
    let num_threads = context.thread_count;
    let env = Environment::new(context, num_threads);
    let resources = O::resources(&env, params)?;
    let mut threads = ThreadGroup::new();

    log::info!("numThreads = {}", num_threads);

    for _ in 0..num_threads {
        threads.add(Box::new(CreateThread::<O>::new(&env, &resources, params)));
    }

    Ok(threads.run())
}

pub fn multithreaded_per_thread_resources<O: Object>(
    context: &Context,
    params: &O::Parameters,
) -> TestResultOf<TestStatus> {
    let num_threads = context.thread_count;
    let env = Environment::new(context, 1);
    let resources = (0..num_threads)
        .map(|_| O::resources(&env, params))
        .collect::<TestResultOf<Vec<_>>>()?;
    let mut threads = ThreadGroup::new();

    log::info!("numThreads = {}", num_threads);

    for res in &resources {
        threads.add(Box::new(CreateThread::<O>::new(&env, res, params)));
    }

    Ok(threads.run())
}

/// Environment on a private device created from a parent environment
struct EnvClone {
    env: Environment,
    // Declared after env so the device outlives every handle cloned from it
    _device: Dependency<Device>,
}

impl EnvClone {
    fn new(
        parent: &Environment,
        device_params: &DeviceParameters,
        max_resource_consumers: u32,
    ) -> TestResultOf<Self> {
        let device = Dependency::<Device>::new(parent, device_params)?;

        let env = Environment {
            entry: parent.entry.clone(),
            api_version: parent.api_version,
            device: Arc::clone(&device.object.device),
            queue_family_index: device.resources.queue_family_index,
            binaries: Arc::clone(&parent.binaries),
            max_resource_consumers,
        };

        Ok(Self { env, _device: device })
    }
}

pub fn multithreaded_per_thread_device<O: Object>(
    context: &Context,
    params: &O::Parameters,
) -> TestResultOf<TestStatus> {
    let num_threads = context.thread_count;
    let device_params = DeviceParameters::default_for(context);
    let shared_env = Environment::new(context, num_threads);
    let per_thread_env = (0..num_threads)
        .map(|_| EnvClone::new(&shared_env, &device_params, 1))
        .collect::<TestResultOf<Vec<_>>>()?;
    let resources = per_thread_env
        .iter()
        .map(|clone| O::resources(&clone.env, params))
        .collect::<TestResultOf<Vec<_>>>()?;
    let mut threads = ThreadGroup::new();

    log::info!("numThreads = {}", num_threads);

    for (clone, res) in per_thread_env.iter().zip(&resources) {
        threads.add(Box::new(CreateThread::<O>::new(&clone.env, res, params)));
    }

    Ok(threads.run())
}

// =============================================================================
// Support checks
// =============================================================================

pub fn check_image_cube_array(context: &Context, params: &ImageViewParameters) -> TestResultOf<()> {
    if params.view_type == vk::ImageViewType::CUBE_ARRAY && context.vk.features.image_cube_array == vk::FALSE {
        crate::throw_not_supported!("imageCubeArray feature is not supported by this implementation");
    }
    Ok(())
}

pub fn check_event_support(context: &Context, _flags: &vk::EventCreateFlags) -> TestResultOf<()> {
    if !context.vk.portability_events_supported() {
        crate::throw_not_supported!("VK_KHR_portability_subset: Events are not supported by this implementation");
    }
    Ok(())
}
