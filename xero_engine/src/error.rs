//! Error types for the Xero engine
//!
//! This module defines the error type used throughout the shader pipeline:
//! preprocessing, compilation, reflection, descriptor creation and the
//! shader library.

use std::fmt;

/// Result type for Xero engine operations
pub type Result<T> = std::result::Result<T, Error>;

/// Xero engine errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Backend-specific error (Vulkan, etc.)
    BackendError(String),

    /// Out of GPU memory
    OutOfMemory,

    /// The descriptor pool has no room left for the requested sets
    PoolExhausted,

    /// Invalid resource (shader module, layout, pool, etc.)
    InvalidResource(String),

    /// Initialization failed (engine, backend, subsystems)
    InitializationFailed(String),

    /// File system error (path and OS message)
    Io(String),

    /// Malformed `#type` stage marker
    ShaderSyntax(String),

    /// Stage name in a `#type` marker is not a known stage
    UnknownStage(String),

    /// The compilation backend rejected a stage (carries its diagnostic)
    CompilationFailed(String),

    /// Binary introspection failed
    ReflectionFailed(String),

    /// A reflected member type has no uniform type equivalent
    UnsupportedType(String),

    /// Two resource kinds claim the same binding index in one set
    BindingConflict {
        /// Descriptor set index
        set: u32,
        /// Binding index claimed twice
        binding: u32,
        /// Kind that claimed the binding first
        first: &'static str,
        /// Kind that claimed it again
        second: &'static str,
    },

    /// No descriptor-set layout exists for the requested set
    MissingDescriptorSetLayout(u32),

    /// A shader with this name is already registered
    DuplicateShader(String),

    /// No shader with this name is registered
    ShaderNotFound(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::BackendError(msg) => write!(f, "Backend error: {}", msg),
            Error::OutOfMemory => write!(f, "Out of GPU memory"),
            Error::PoolExhausted => write!(f, "Descriptor pool exhausted"),
            Error::InvalidResource(msg) => write!(f, "Invalid resource: {}", msg),
            Error::InitializationFailed(msg) => write!(f, "Initialization failed: {}", msg),
            Error::Io(msg) => write!(f, "I/O error: {}", msg),
            Error::ShaderSyntax(msg) => write!(f, "Shader syntax error: {}", msg),
            Error::UnknownStage(stage) => write!(f, "Invalid shader type specified: '{}'", stage),
            Error::CompilationFailed(msg) => write!(f, "Shader compilation failed: {}", msg),
            Error::ReflectionFailed(msg) => write!(f, "Shader reflection failed: {}", msg),
            Error::UnsupportedType(msg) => write!(f, "Unsupported uniform type: {}", msg),
            Error::BindingConflict { set, binding, first, second } => write!(
                f,
                "Binding {} in set {} is already present as {} (redeclared as {})",
                binding, set, first, second
            ),
            Error::MissingDescriptorSetLayout(set) => {
                write!(f, "No descriptor set layout for set {}", set)
            }
            Error::DuplicateShader(name) => write!(f, "Shader '{}' already exists", name),
            Error::ShaderNotFound(name) => write!(f, "Shader '{}' not found", name),
        }
    }
}

impl std::error::Error for Error {}

/// Top-level fatal policy for load-time code paths
///
/// The pipeline returns typed errors everywhere; an application that wants
/// the crash-fast behaviour calls `or_fatal` at the outermost call site.
pub trait OrFatal<T> {
    /// Unwrap the value, or log the error and abort the current thread
    fn or_fatal(self, source: &str) -> T;
}

impl<T> OrFatal<T> for Result<T> {
    fn or_fatal(self, source: &str) -> T {
        match self {
            Ok(value) => value,
            Err(error) => {
                crate::engine_error!(source, "Fatal: {}", error);
                panic!("{}: {}", source, error);
            }
        }
    }
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
