//! Serial transport abstraction for KISS TNC links.
//!
//! Provides the byte-level boundary the rest of kisslink builds on:
//! - [`SerialLink`]: a connected, non-blocking byte link
//! - [`SerialOpener`]: opens links from [`PortSettings`], so the interface
//!   layer can reopen a failed link without knowing how it is made
//! - [`StreamLink`]: adapts any non-blocking `Read + Write` stream (for
//!   example a network-attached TNC socket) into a [`SerialLink`]
//!
//! This is the lowest layer of kisslink. Everything else builds on top of
//! the traits provided here.

pub mod error;
pub mod link;
pub mod settings;

pub use error::{Result, TransportError};
pub use link::{SerialLink, SerialOpener, StreamLink};
pub use settings::{Parity, PortSettings};
