//! Error types shared by the loaders, the frame loop and configuration.

use std::path::PathBuf;

use thiserror::Error;

use crate::stl::StlError;
use crate::trigger::TriggerHandle;

/// A model or texture could not be fetched or decoded.
#[derive(Debug, Error)]
pub enum LoadFailure {
    #[error("failed to read {}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse mesh {source_id}")]
    Mesh {
        source_id: String,
        #[source]
        source: StlError,
    },
    #[error("mesh {source_id} contains no triangles")]
    EmptyMesh { source_id: String },
    #[error("failed to decode texture {source_id}")]
    Texture {
        source_id: String,
        #[source]
        source: image::ImageError,
    },
    #[error("texture {source_id} has no pixels")]
    EmptyTexture { source_id: String },
    #[error("failed to fetch {source_id}: {reason}")]
    Fetch { source_id: String, reason: String },
}

/// A fault raised while driving one render cycle.
///
/// Faults are local to the cycle they happen in; the loop keeps running.
#[derive(Debug, Error)]
pub enum FrameFault {
    #[error("trigger {handle} failed: {cause:#}")]
    Trigger {
        handle: TriggerHandle,
        cause: anyhow::Error,
    },
    #[error("render failed: {cause:#}")]
    Render { cause: anyhow::Error },
    #[error("could not schedule the next frame: {cause:#}")]
    Schedule { cause: anyhow::Error },
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}
