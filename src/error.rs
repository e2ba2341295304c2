//! Error taxonomy for test bodies and worker threads

use ash::prelude::VkResult;
use ash::vk;
use thiserror::Error;

use crate::status::{TestResult, TestStatus};

/// Result type used by test bodies, object constructors and workers
pub type TestResultOf<T> = std::result::Result<T, TestError>;

/// Why a test case or worker did not pass
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TestError {
    /// A required feature, format, extension or limit is absent
    #[error("{0}")]
    NotSupported(String),

    /// Test logic detected wrong behaviour
    #[error("{0}")]
    Fail(String),

    /// The implementation ran out of a resource
    #[error("{0}")]
    ResourceError(String),

    /// A Vulkan call returned an unexpected code
    #[error("{call} returned {result:?}")]
    Vk {
        call: &'static str,
        result: vk::Result,
    },

    /// Harness misuse, e.g. a missing program binary name
    #[error("{0}")]
    Internal(String),
}

impl TestError {
    pub fn not_supported(message: impl Into<String>) -> Self {
        TestError::NotSupported(message.into())
    }

    pub fn fail(message: impl Into<String>) -> Self {
        TestError::Fail(message.into())
    }

    /// Result type this error is reported as
    pub fn result(&self) -> TestResult {
        match self {
            TestError::NotSupported(_) => TestResult::NotSupported,
            TestError::Fail(_) => TestResult::Fail,
            TestError::ResourceError(_) => TestResult::ResourceError,
            TestError::Vk { result, .. } => match *result {
                vk::Result::ERROR_OUT_OF_HOST_MEMORY | vk::Result::ERROR_OUT_OF_DEVICE_MEMORY => {
                    TestResult::ResourceError
                }
                _ => TestResult::Fail,
            },
            TestError::Internal(_) => TestResult::InternalError,
        }
    }

    pub fn into_status(self) -> TestStatus {
        TestStatus::new(self.result(), self.to_string())
    }
}

/// Attaches the call name to a failed `VkResult`
pub trait VkCheck<T> {
    fn check(self, call: &'static str) -> TestResultOf<T>;
}

impl<T> VkCheck<T> for VkResult<T> {
    fn check(self, call: &'static str) -> TestResultOf<T> {
        self.map_err(|result| TestError::Vk { call, result })
    }
}

/// Return `TestError::NotSupported` from the enclosing function
#[macro_export]
macro_rules! throw_not_supported {
    ($($arg:tt)*) => {
        return Err($crate::error::TestError::NotSupported(format!($($arg)*)))
    };
}

/// Fail the enclosing test function unless the condition holds
#[macro_export]
macro_rules! test_check {
    ($cond:expr) => {
        if !$cond {
            return Err($crate::error::TestError::Fail(format!(
                "'{}' failed at {}:{}",
                stringify!($cond),
                file!(),
                line!()
            )));
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vk_out_of_memory_is_resource_error() {
        let err = TestError::Vk {
            call: "vkAllocateMemory",
            result: vk::Result::ERROR_OUT_OF_DEVICE_MEMORY,
        };
        assert_eq!(err.result(), TestResult::ResourceError);
        assert_eq!(err.to_string(), "vkAllocateMemory returned ERROR_OUT_OF_DEVICE_MEMORY");
    }

    #[test]
    fn other_vk_codes_fail() {
        let err: TestResultOf<()> = Err(vk::Result::ERROR_INITIALIZATION_FAILED).check("vkCreateDevice");
        assert_eq!(err.unwrap_err().result(), TestResult::Fail);
    }

    #[test]
    fn not_supported_status() {
        let status = TestError::not_supported("imageCubeArray").into_status();
        assert_eq!(status, TestStatus::not_supported("imageCubeArray"));
    }

    fn checked(value: u32) -> TestResultOf<u32> {
        test_check!(value < 4);
        Ok(value)
    }

    #[test]
    fn test_check_macro() {
        assert_eq!(checked(3), Ok(3));
        let err = checked(7).unwrap_err();
        assert!(matches!(err, TestError::Fail(ref msg) if msg.starts_with("'value < 4' failed")));
    }
}
