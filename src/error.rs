//! Errors that may occur during lightmap generation.

use std::fmt::{Display, Formatter};

/// An error that may occur during lightmap generation.
#[derive(Debug, PartialEq)]
pub enum LightmapGenerationError {
    /// Generation was cancelled by user.
    Cancelled,
    /// A face does not fit even a freshly allocated lightmap page. Should not
    /// occur with partition-time clamping in place, so it is a configuration
    /// error worth aborting on.
    OversizedFace {
        /// Required face size in texels.
        width: usize,
        /// Required face size in texels.
        height: usize,
        /// Configured page size.
        page_size: usize,
    },
    /// A light source failed validation.
    InvalidLight {
        /// Index of the light in the input list.
        index: usize,
        /// Human-readable reason.
        reason: String,
    },
    /// An index of a triangle vertex is out of bounds of the vertex buffer.
    InvalidIndex {
        /// Value of the index.
        index: usize,
        /// Amount of vertices in the buffer.
        count: usize,
    },
}

impl Display for LightmapGenerationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            LightmapGenerationError::Cancelled => {
                write!(f, "Lightmap generation was cancelled by the user.")
            }
            LightmapGenerationError::OversizedFace {
                width,
                height,
                page_size,
            } => {
                write!(
                    f,
                    "Face of size {width}x{height} does not fit an empty {page_size}x{page_size} \
                    lightmap page."
                )
            }
            LightmapGenerationError::InvalidLight { index, reason } => {
                write!(f, "Light source {index} is invalid: {reason}")
            }
            LightmapGenerationError::InvalidIndex { index, count } => {
                write!(
                    f,
                    "Vertex index {index} is out of bounds of a vertex buffer of {count} vertices."
                )
            }
        }
    }
}
