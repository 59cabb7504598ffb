//! Error types for the sonification pipeline.

use thiserror::Error;

/// Pipeline errors
#[derive(Error, Debug)]
pub enum ThermalError {
    /// Frame input could not be decoded or is malformed
    #[error("Invalid frame source: {0}")]
    InvalidSource(String),

    /// Composed soundscape contains NaN or infinite samples
    #[error("Invalid audio data: {0}")]
    InvalidAudioData(String),

    /// Renderer, persistence or audio output failed
    #[error("{collaborator} failed: {message}")]
    CollaboratorFailure {
        collaborator: &'static str,
        message: String,
    },

    /// Sensor read failed
    #[error("Sensor error: {0}")]
    Sensor(String),

    /// Rejected configuration value
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// I/O error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Image decode/encode error
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    /// WAV encode/decode error
    #[error("WAV error: {0}")]
    Wav(#[from] hound::Error),

    /// TOML configuration parse error
    #[error("Config parse error: {0}")]
    Toml(#[from] toml::de::Error),
}

impl ThermalError {
    /// Wrap any displayable failure as a collaborator failure
    pub fn collaborator(collaborator: &'static str, err: impl std::fmt::Display) -> Self {
        Self::CollaboratorFailure {
            collaborator,
            message: err.to_string(),
        }
    }

    /// Whether this error ends processing of the current frame.
    ///
    /// `InvalidAudioData` only suppresses audio emission and collaborator
    /// failures are logged in place, so neither aborts the frame.
    pub fn aborts_frame(&self) -> bool {
        !matches!(
            self,
            Self::InvalidAudioData(_) | Self::CollaboratorFailure { .. }
        )
    }
}

/// Result type for pipeline operations
pub type Result<T> = std::result::Result<T, ThermalError>;
