use thiserror::Error;

/// GPU resource failures. Callers treat every variant as fatal.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum GpuResourceError {
    #[error("shader `{label}` failed to compile: {message}")]
    ShaderCompile { label: String, message: String },

    #[error("cannot allocate `{label}`: {requested} bytes exceeds the device limit of {limit}")]
    Allocation {
        label: String,
        requested: u64,
        limit: u64,
    },
}
