//! Telescope control frontend for the F1 mount.
//!
//! The mount exposes two interfaces: an ASCOM Alpaca property API over HTTP
//! and an ASCII line protocol over raw TCP. This crate wraps both behind one
//! small HTTP API for the observatory GUI. See [`Server`] for the routes.

pub mod ascii;
pub mod ascom;
pub mod config;
mod endpoint;
mod errors;
mod macros;
pub mod pointing;
mod server;

#[cfg(test)]
mod test_utils;

pub use endpoint::{DeviceEndpoint, Endpoints};
pub use errors::{DeviceError, Error, ErrorCode, Result};
pub use server::{BoundServer, Server};
