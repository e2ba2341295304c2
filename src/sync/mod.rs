// Synchronization for multithreaded cases
//
// SpinBarrier lines workers up so they enter the driver at the same time,
// ThreadGroup runs them and merges what they report.

pub mod barrier;
pub mod thread_group;

pub use barrier::{SpinBarrier, WaitMode};
pub use thread_group::{default_thread_count, ThreadBarrier, ThreadGroup, ThreadGroupThread};
