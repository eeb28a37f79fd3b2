//! Client connection to a NatNet server
//!
//! [`NatNetClient`] binds the command and data sockets, runs the receive
//! loops and exposes the command surface.

mod client;

pub use client::NatNetClient;

#[cfg(test)]
mod tests;
