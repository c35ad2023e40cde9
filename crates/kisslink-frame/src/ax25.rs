use crate::error::{FrameError, Result};

/// Control field for an unnumbered information (UI) frame.
pub const CTRL_UI: u8 = 0x03;
/// Protocol ID: no layer 3 protocol.
pub const PID_NOLAYER3: u8 = 0xF0;
/// Fixed size of the address header: two 7-byte address fields plus
/// control and PID bytes.
pub const HEADER_SIZE: usize = 16;

/// A validated callsign/SSID pair.
///
/// Callsigns are 3-6 ASCII characters, stored uppercased; SSIDs fit in
/// 4 bits (0-15).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ax25Address {
    callsign: String,
    ssid: u8,
}

impl Ax25Address {
    pub fn new(callsign: &str, ssid: i16) -> Result<Self> {
        if callsign.len() < 3 || callsign.len() > 6 {
            return Err(FrameError::InvalidCallsign {
                callsign: callsign.to_string(),
            });
        }
        if !(0..=15).contains(&ssid) {
            return Err(FrameError::InvalidSsid { ssid });
        }
        Ok(Self {
            callsign: callsign.to_ascii_uppercase(),
            ssid: ssid as u8,
        })
    }

    pub fn callsign(&self) -> &str {
        &self.callsign
    }

    pub fn ssid(&self) -> u8 {
        self.ssid
    }

    /// Encode the 6 shifted callsign bytes into `out`.
    ///
    /// Each character code is shifted left one bit; short callsigns are
    /// padded with shifted spaces.
    fn put_callsign(&self, out: &mut Vec<u8>) {
        let bytes = self.callsign.as_bytes();
        for i in 0..6 {
            if i < bytes.len() {
                out.push(bytes[i] << 1);
            } else {
                out.push(b' ' << 1);
            }
        }
    }
}

impl std::fmt::Display for Ax25Address {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-{}", self.callsign, self.ssid)
    }
}

/// Encode the 16-byte AX.25 UI header prepended to every data frame.
///
/// Layout: destination callsign (6 shifted bytes) + destination SSID byte,
/// source callsign + source SSID byte with the end-of-address marker bit,
/// control (UI), PID (no layer 3).
pub fn encode_header(dst: &Ax25Address, src: &Ax25Address) -> Vec<u8> {
    let mut header = Vec::with_capacity(HEADER_SIZE);

    dst.put_callsign(&mut header);
    header.push(0x60 | (dst.ssid() << 1));

    src.put_callsign(&mut header);
    // Low bit marks the end of the address field.
    header.push(0x60 | (src.ssid() << 1) | 0x01);

    header.push(CTRL_UI);
    header.push(PID_NOLAYER3);

    debug_assert_eq!(header.len(), HEADER_SIZE);
    header
}
