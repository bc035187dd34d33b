//! Byte-level transport capabilities for SHDLC links.
//!
//! The frame layer never owns a line; it borrows one capability per
//! operation:
//! - [`ReadChannel`] while receiving a response
//! - [`WriteChannel`] while transmitting a request
//! - [`Sleep`] between polling attempts
//!
//! Implementations provided here: [`IoChannel`] over any `std::io` stream,
//! [`SerialDevice`] for character devices on Unix, and the in-memory
//! [`Loopback`].

pub mod error;
pub mod loopback;
pub mod traits;

#[cfg(unix)]
pub mod device;

pub use error::{Result, TransportError};
pub use loopback::Loopback;
pub use traits::{IoChannel, ReadChannel, Sleep, ThreadSleep, WriteChannel};

#[cfg(unix)]
pub use device::SerialDevice;
