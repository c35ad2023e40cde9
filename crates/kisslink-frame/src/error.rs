/// Errors that can occur while building frames and addresses.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// Callsign outside the 3-6 character range allowed by AX.25.
    #[error("invalid callsign {callsign:?} (must be 3-6 characters)")]
    InvalidCallsign { callsign: String },

    /// SSID outside the 4-bit 0-15 range.
    #[error("invalid SSID {ssid} (must be 0-15)")]
    InvalidSsid { ssid: i16 },
}

pub type Result<T> = std::result::Result<T, FrameError>;
