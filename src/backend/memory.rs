// Platform memory budget
//
// Decides how many objects a "max concurrent" case may create before it
// would exhaust system or device-local memory rather than the driver's own
// object limits.

use ash::vk;
use serde::Deserialize;

/// Memory available to the implementation under test
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct PlatformMemoryLimits {
    pub total_system_memory: usize,
    /// 0 when the device has no dedicated memory
    pub total_device_local_memory: vk::DeviceSize,
    pub device_memory_allocation_granularity: vk::DeviceSize,
    pub device_page_size: vk::DeviceSize,
    pub device_page_table_entry_size: vk::DeviceSize,
    pub device_page_table_hierarchy_levels: u32,
}

impl Default for PlatformMemoryLimits {
    fn default() -> Self {
        Self {
            total_system_memory: 256 * 1024 * 1024,
            total_device_local_memory: 128 * 1024 * 1024,
            device_memory_allocation_granularity: 64 * 1024,
            device_page_size: 4096,
            device_page_table_entry_size: 8,
            device_page_table_hierarchy_levels: 3,
        }
    }
}

impl PlatformMemoryLimits {
    /// Page table memory needed to map an allocation of `allocation_size`
    pub fn page_table_size(&self, allocation_size: vk::DeviceSize) -> vk::DeviceSize {
        (0..self.device_page_table_hierarchy_levels)
            .map(|level| {
                let covered = self.device_page_size << level;
                let pages = align_to_power_of_two(allocation_size, covered) / covered;
                pages * self.device_page_table_entry_size
            })
            .sum()
    }

    /// How many objects fit, given per-object system and device memory usage.
    /// `usize::MAX` when neither usage is known.
    pub fn safe_object_count(&self, object_system_memory: usize, object_device_memory: vk::DeviceSize) -> usize {
        let rounded_device =
            round_up_to_next_multiple(object_device_memory, self.device_memory_allocation_granularity);

        if self.total_device_local_memory > 0 && rounded_device > 0 {
            let device_count = usize::try_from(self.total_device_local_memory / rounded_device).unwrap_or(usize::MAX);
            if object_system_memory > 0 {
                (self.total_system_memory / object_system_memory).min(device_count)
            } else {
                device_count
            }
        } else if object_system_memory as u64 + rounded_device > 0 {
            let per_object = object_system_memory.saturating_add(usize::try_from(rounded_device).unwrap_or(usize::MAX));
            self.total_system_memory / per_object
        } else {
            usize::MAX
        }
    }
}

pub fn round_up_to_next_multiple(value: u64, multiple: u64) -> u64 {
    if multiple == 0 || value % multiple == 0 {
        value
    } else {
        value + multiple - (value % multiple)
    }
}

pub fn align_to_power_of_two(value: u64, align: u64) -> u64 {
    debug_assert!(align.is_power_of_two());
    (value + align - 1) & !(align - 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rounding() {
        assert_eq!(round_up_to_next_multiple(0, 64), 0);
        assert_eq!(round_up_to_next_multiple(64, 64), 64);
        assert_eq!(round_up_to_next_multiple(65, 64), 128);
        assert_eq!(align_to_power_of_two(1, 4096), 4096);
        assert_eq!(align_to_power_of_two(8192, 4096), 8192);
    }

    #[test]
    fn page_table_size_sums_levels() {
        let limits = PlatformMemoryLimits::default();
        // 1 MiB: 256 4K pages, 128 8K pages, 64 16K pages, 8 bytes each
        assert_eq!(limits.page_table_size(1024 * 1024), (256 + 128 + 64) * 8);
        // Anything small still takes one entry per level
        assert_eq!(limits.page_table_size(1), 3 * 8);
    }

    #[test]
    fn device_memory_bounds_count() {
        let limits = PlatformMemoryLimits::default();
        // 1000 bytes rounds up to one 64K granule: 128M / 64K
        assert_eq!(limits.safe_object_count(0, 1000), 2048);
        // System memory can be the tighter bound
        assert_eq!(limits.safe_object_count(1024 * 1024, 1000), 256);
    }

    #[test]
    fn unified_memory_uses_system_total() {
        let limits = PlatformMemoryLimits {
            total_device_local_memory: 0,
            ..Default::default()
        };
        assert_eq!(limits.safe_object_count(0, 64 * 1024), 4096);
    }

    #[test]
    fn unknown_usage_is_unbounded() {
        let limits = PlatformMemoryLimits::default();
        assert_eq!(limits.safe_object_count(0, 0), usize::MAX);
    }
}
