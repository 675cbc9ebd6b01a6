//! Alpaca property API of the mount.

mod transaction;

mod client;
pub use client::{Method, Params, PropertyClient, PropertyResult};

mod gather;
pub use gather::GatheredStatus;
