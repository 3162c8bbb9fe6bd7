//! Error types for the Galaxy3D scene pipeline
//!
//! This module defines the error type shared by every stage of the frame:
//! spatial indexing, render queue ordering, geometry batching, device
//! resource lifecycle and frame submission.

use std::fmt;

/// Result type for Galaxy3D operations
pub type Result<T> = std::result::Result<T, Error>;

/// Galaxy3D errors
#[derive(Debug, Clone, PartialEq)]
pub enum Error {
    /// Backend-specific error (device, command list, poisoned locks, etc.)
    BackendError(String),

    /// Out of GPU memory.
    ///
    /// Raised by `GraphicsDevice` implementations when an allocation
    /// fails; the pipeline passes it through unchanged.
    OutOfMemory,

    /// Invalid resource (buffer, texture, drawable, etc.)
    InvalidResource(String),

    /// Initialization failed (configuration, device objects)
    InitializationFailed(String),

    /// A fixed-capacity resource was asked for more than it can hold.
    ///
    /// Never recoverable within a frame: the frame is aborted and the
    /// session is expected to terminate with this diagnostic.
    CapacityExceeded {
        /// Name of the overflowing resource
        resource: String,
        /// Total element count that was requested
        requested: usize,
        /// Fixed capacity of the resource
        capacity: usize,
    },

    /// Bounding volume with inverted or NaN coordinates
    InvalidBounds(String),

    /// Operation called in the wrong lifecycle state
    InvalidState(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::BackendError(msg) => write!(f, "Backend error: {}", msg),
            Error::OutOfMemory => write!(f, "Out of GPU memory"),
            Error::InvalidResource(msg) => write!(f, "Invalid resource: {}", msg),
            Error::InitializationFailed(msg) => write!(f, "Initialization failed: {}", msg),
            Error::CapacityExceeded { resource, requested, capacity } => write!(
                f,
                "Capacity exceeded: '{}' requested {} elements but holds only {}",
                resource, requested, capacity
            ),
            Error::InvalidBounds(msg) => write!(f, "Invalid bounds: {}", msg),
            Error::InvalidState(msg) => write!(f, "Invalid state: {}", msg),
        }
    }
}

impl std::error::Error for Error {}

/// Build a `BackendError`, logging it at ERROR severity first.
///
/// ```ignore
/// let err = engine_err!("galaxy3d::Scene", "Drawable {} not found", id);
/// ```
#[macro_export]
macro_rules! engine_err {
    ($source:expr, $($arg:tt)*) => {{
        let message = format!($($arg)*);
        $crate::engine_error!($source, "{}", message);
        $crate::galaxy3d::Error::BackendError(message)
    }};
}

/// Log and return a `BackendError` from the enclosing function.
#[macro_export]
macro_rules! engine_bail {
    ($source:expr, $($arg:tt)*) => {
        return Err($crate::engine_err!($source, $($arg)*))
    };
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
