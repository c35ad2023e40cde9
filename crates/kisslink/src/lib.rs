//! AX.25 KISS serial interface.
//!
//! Adapts a byte-oriented serial transport carrying the KISS protocol into
//! discrete, addressed packets for a packet router, and back. Handles frame
//! delimiting and escaping, the fixed AX.25 UI address header, the
//! device-level flow-control handshake, and automatic reconnection after
//! transport failures.
//!
//! Dependencies are injected: the packet router implements [`PacketSink`],
//! the serial boundary is a [`kisslink_transport::SerialOpener`], and time
//! comes from a [`Clock`].

pub mod clock;
pub mod config;
pub mod error;
mod flow;
pub mod iface;

pub use clock::{Clock, SystemClock};
pub use config::InterfaceConfig;
pub use error::{ConfigError, InterfaceError, Result};
pub use iface::{KissInterface, PacketSink, Timeouts, DEFAULT_DST_CALLSIGN};
