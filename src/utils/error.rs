use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Invalid dimensions: {width}x{height}")]
    InvalidDimensions { width: i64, height: i64 },

    #[error("Degenerate source: {message}")]
    DegenerateSource { message: String },

    #[error("Probe failed: {message}")]
    ProbeFailed { message: String },

    #[error("Decode failed: {message}")]
    DecodeFailed { message: String },

    #[error("Render failed: {message}")]
    RenderFailed { message: String },

    #[error("Unsupported format: {extension}")]
    UnsupportedFormat { extension: String },

    #[error("Operation cancelled")]
    Cancelled,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Config file error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),
}

impl Error {
    pub fn configuration<T: Into<String>>(message: T) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    pub fn invalid_dimensions(width: i64, height: i64) -> Self {
        Self::InvalidDimensions { width, height }
    }

    pub fn degenerate_source<T: Into<String>>(message: T) -> Self {
        Self::DegenerateSource {
            message: message.into(),
        }
    }

    pub fn probe_failed<T: Into<String>>(message: T) -> Self {
        Self::ProbeFailed {
            message: message.into(),
        }
    }

    pub fn decode_failed<T: Into<String>>(message: T) -> Self {
        Self::DecodeFailed {
            message: message.into(),
        }
    }

    pub fn render_failed<T: Into<String>>(message: T) -> Self {
        Self::RenderFailed {
            message: message.into(),
        }
    }

    pub fn unsupported_format<T: Into<String>>(extension: T) -> Self {
        Self::UnsupportedFormat {
            extension: extension.into(),
        }
    }

    /// Startup errors abort the process; everything else is contained at the job boundary.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Configuration { .. } | Self::Yaml(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_configuration_errors_are_fatal() {
        assert!(Error::configuration("missing background").is_fatal());
        assert!(!Error::render_failed("ffmpeg exited 1").is_fatal());
        assert!(!Error::invalid_dimensions(0, 10).is_fatal());
        assert!(!Error::Cancelled.is_fatal());
    }

    #[test]
    fn test_error_messages_carry_cause() {
        let err = Error::configuration("Background image not found: /tmp/bg.jpg");
        assert_eq!(
            err.to_string(),
            "Configuration error: Background image not found: /tmp/bg.jpg"
        );
        assert_eq!(
            Error::invalid_dimensions(0, 720).to_string(),
            "Invalid dimensions: 0x720"
        );
    }
}
