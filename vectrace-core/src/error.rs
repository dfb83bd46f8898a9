//! Error types for the vectrace-core library

use thiserror::Error;

/// Main error type for tracing and posterization operations
#[derive(Error, Debug)]
pub enum TraceError {
    #[error("Invalid parameter: {message}")]
    InvalidParameter { message: String },

    #[error("Image should be loaded first")]
    UnloadedImage,

    #[error("Image decoding failed: {0}")]
    ImageDecodingFailed(#[from] image::ImageError),

    #[error("Allocation failure: {context}")]
    AllocationFailure { context: String },

    #[error("Curve optimization incomplete, unoptimized curve kept")]
    OptimizationIncomplete,
}

impl TraceError {
    /// Create a new invalid-parameter error
    pub fn invalid_parameter(message: impl Into<String>) -> Self {
        Self::InvalidParameter {
            message: message.into(),
        }
    }

    /// Create a new allocation-failure error
    pub fn allocation_failure(context: impl Into<String>) -> Self {
        Self::AllocationFailure {
            context: context.into(),
        }
    }
}

/// Result type alias for convenience
pub type TraceResult<T> = Result<T, TraceError>;
