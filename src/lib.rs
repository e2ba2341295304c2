// =============================================================================
// VULKAN OBJECT MANAGEMENT CONFORMANCE TESTS
// =============================================================================
//
// Stress tests for creating and destroying Vulkan objects: one at a time,
// in batches sharing or not sharing prerequisites, up to implementation
// limits, and from several threads at once.
//
// LAYOUT:
// ┌─────────────────────────────────────────────────────────────────┐
// │  runner (filter, execute, summarize)                            │
// │    └── tree (object_management.<group>.<case>)                  │
// │          └── cases (single, multiple, max, multithreaded)       │
// │                └── objects (Object impl per Vulkan type)        │
// │                      └── backend (context, RAII handles)        │
// │  sync (SpinBarrier, ThreadGroup)   status / error (verdicts)    │
// └─────────────────────────────────────────────────────────────────┘
//
// =============================================================================

pub mod backend;
pub mod cases;
pub mod config;
pub mod error;
pub mod objects;
pub mod runner;
pub mod status;
pub mod sync;
pub mod tree;

pub use error::{TestError, TestResultOf};
pub use status::{ResultCollector, TestResult, TestStatus};
