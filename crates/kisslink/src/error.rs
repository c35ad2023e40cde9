use kisslink_frame::FrameError;

/// Construction-time configuration errors. Never retried.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// No serial port specified.
    #[error("no port specified for serial interface")]
    MissingPort,

    /// Invalid callsign or SSID.
    #[error(transparent)]
    Address(#[from] FrameError),

    /// Unrecognized parity designator.
    #[error("invalid parity {0:?} (use N, E, or O)")]
    InvalidParity(String),
}

/// Errors that can occur in interface operations.
#[derive(Debug, thiserror::Error)]
pub enum InterfaceError {
    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Transport-level error.
    #[error("transport error: {0}")]
    Transport(#[from] kisslink_transport::TransportError),

    /// A device-configuration control frame was not written in full.
    #[error("could not configure {setting}: wrote {written} of {expected} bytes")]
    DeviceConfig {
        setting: &'static str,
        written: usize,
        expected: usize,
    },

    /// A data frame was only partially written. The payload is not
    /// re-queued.
    #[error("short write: wrote {written} of {expected} bytes")]
    ShortWrite { written: usize, expected: usize },
}

pub type Result<T> = std::result::Result<T, InterfaceError>;
