//! ASCII line protocol spoken by the mount's servo controller software.
//!
//! One command, one newline-terminated response, one TCP connection.

mod connection;

mod client;
pub use client::{CommandSink, DEFAULT_TIMEOUT, LineProtocolClient, MAX_RESPONSE_LEN};

mod status;
pub use status::{SCOPE_STATUS_FIELDS, ScopeStatusRecord, StatusMask, parse_scope_status};

mod sequence;
pub use sequence::{Sequence, Step, run_steps};
