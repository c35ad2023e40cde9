//! KISS framing and AX.25 addressing codecs.
//!
//! This is the core value-add layer of kisslink. Outbound packets get a
//! 16-byte AX.25 UI header, are KISS-escaped, and wrapped in FEND
//! delimiters. Inbound bytes go through a byte-at-a-time [`Decoder`] that
//! tolerates partial, interleaved, and garbled input.
//!
//! No partial frames, no buffer management in user code.

pub mod ax25;
pub mod decoder;
pub mod error;
pub mod kiss;

pub use ax25::{encode_header, Ax25Address, CTRL_UI, HEADER_SIZE, PID_NOLAYER3};
pub use decoder::{DecodeEvent, Decoder, DEFAULT_MTU};
pub use error::{FrameError, Result};
pub use kiss::{control_frame, data_frame, escape};
