use bytes::{BufMut, Bytes, BytesMut};

/// Frame delimiter.
pub const FEND: u8 = 0xC0;
/// Escape marker.
pub const FESC: u8 = 0xDB;
/// Transposed FEND: follows FESC in place of an in-band 0xC0.
pub const TFEND: u8 = 0xDC;
/// Transposed FESC: follows FESC in place of an in-band 0xDB.
pub const TFESC: u8 = 0xDD;

/// Data frame.
pub const CMD_DATA: u8 = 0x00;
/// TX delay (preamble) in tens of milliseconds.
pub const CMD_TXDELAY: u8 = 0x01;
/// CSMA persistence parameter.
pub const CMD_P: u8 = 0x02;
/// Slot time in tens of milliseconds.
pub const CMD_SLOTTIME: u8 = 0x03;
/// TX tail in tens of milliseconds.
pub const CMD_TXTAIL: u8 = 0x04;
/// Full duplex toggle.
pub const CMD_FULLDUPLEX: u8 = 0x05;
/// Hardware-specific setting.
pub const CMD_SETHARDWARE: u8 = 0x06;
/// Device-level flow control: the TNC is ready for the next frame.
pub const CMD_READY: u8 = 0x0F;
/// Exit KISS mode.
pub const CMD_RETURN: u8 = 0xFF;
/// Sentinel for "no command byte parsed yet"; never on the wire.
pub const CMD_UNKNOWN: u8 = 0xFE;

/// Returns a human-readable name for a command byte.
pub fn command_name(cmd: u8) -> &'static str {
    match cmd {
        CMD_DATA => "DATA",
        CMD_TXDELAY => "TXDELAY",
        CMD_P => "P",
        CMD_SLOTTIME => "SLOTTIME",
        CMD_TXTAIL => "TXTAIL",
        CMD_FULLDUPLEX => "FULLDUPLEX",
        CMD_SETHARDWARE => "SETHARDWARE",
        CMD_READY => "READY",
        CMD_RETURN => "RETURN",
        _ => "UNKNOWN",
    }
}

/// Escape in-band FESC and FEND bytes.
///
/// FESC is substituted first; escaping FEND first would re-escape the
/// FESC bytes it inserts.
pub fn escape(payload: &[u8]) -> BytesMut {
    let mut out = BytesMut::with_capacity(payload.len());
    for &byte in payload {
        match byte {
            FESC => {
                out.put_u8(FESC);
                out.put_u8(TFESC);
            }
            FEND => {
                out.put_u8(FESC);
                out.put_u8(TFEND);
            }
            _ => out.put_u8(byte),
        }
    }
    out
}

/// Build a complete frame: FEND, command, escaped payload, FEND.
pub fn data_frame(command: u8, payload: &[u8]) -> Bytes {
    let escaped = escape(payload);
    let mut out = BytesMut::with_capacity(escaped.len() + 3);
    out.put_u8(FEND);
    out.put_u8(command);
    out.extend_from_slice(&escaped);
    out.put_u8(FEND);
    out.freeze()
}

/// Build a device-configuration frame: FEND, command, raw value, FEND.
///
/// Configuration commands carry exactly one byte and are never escaped.
pub fn control_frame(command: u8, value: u8) -> [u8; 4] {
    [FEND, command, value, FEND]
}
