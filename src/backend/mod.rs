// Backend module - Vulkan plumbing shared by every case
//
// Design: Thin wrappers around ash; RAII handles, the default context,
// program binaries and the platform memory budget

pub mod binaries;
pub mod context;
pub mod handle;
pub mod memory;

pub use binaries::BinaryCollection;
pub use context::VulkanContext;
pub use handle::{DeviceHandle, Unique, UniqueDevice, UniqueInstance};
pub use memory::PlatformMemoryLimits;
