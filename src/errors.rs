use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Alpaca `ErrorNumber` as reported by the mount.
///
/// Zero means success; anything else is a device-level failure. Devices are
/// free to report driver-specific numbers, so unlike the named constants below
/// the raw value is not range-checked.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ErrorCode(i32);

impl ErrorCode {
    /// Wrap a raw error number.
    pub const fn new(raw: i32) -> Self {
        Self(raw)
    }

    /// Get the raw error number.
    pub const fn raw(self) -> i32 {
        self.0
    }

    /// Whether this code denotes success.
    pub const fn is_ok(self) -> bool {
        self.0 == 0
    }
}

impl From<i32> for ErrorCode {
    fn from(raw: i32) -> Self {
        Self(raw)
    }
}

macro_rules! device_error_codes {
    ($(#[doc = $doc:literal] $name:ident = $value:literal,)*) => {
        impl ErrorCode {
            $(
                #[doc = $doc]
                pub const $name: Self = Self($value);
            )*
        }

        impl std::fmt::Debug for ErrorCode {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                match *self {
                    $(
                        Self::$name => f.write_str(stringify!($name)),
                    )*
                    Self(raw) => write!(f, "{raw:#X}"),
                }
            }
        }

        impl std::fmt::Display for ErrorCode {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                std::fmt::Debug::fmt(self, f)
            }
        }
    };
}

device_error_codes! {
    #[doc = "Success"]
    OK = 0,
    #[doc = "Property or method not implemented"]
    NOT_IMPLEMENTED = 0x400,
    #[doc = "Invalid value"]
    INVALID_VALUE = 0x401,
    #[doc = "A value has not been set"]
    VALUE_NOT_SET = 0x402,
    #[doc = "The communications channel is not connected"]
    NOT_CONNECTED = 0x407,
    #[doc = "The attempted operation is invalid because the mount is currently in a Parked state"]
    INVALID_WHILE_PARKED = 0x408,
    #[doc = "The attempted operation is invalid because the mount is currently in a Slaved state"]
    INVALID_WHILE_SLAVED = 0x409,
    #[doc = "The requested operation can not be undertaken at this time"]
    INVALID_OPERATION = 0x40B,
    #[doc = "The requested action is not implemented in this driver"]
    ACTION_NOT_IMPLEMENTED = 0x40C,
}

/// Logical error reported by the mount through the property API.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("device error on path {path}: {code}: {message}")]
pub struct DeviceError {
    /// Error number.
    pub code: ErrorCode,
    /// Error message, empty if the device didn't send one.
    pub message: String,
    /// Normalised property path the error was reported for.
    pub path: String,
}

/// Faults raised by the bridge.
#[derive(Debug, Error)]
pub enum Error {
    /// The peer refused the connection or didn't accept it in time.
    #[error("couldn't connect to {addr}: {source}")]
    Connection {
        /// `host:port` that was dialled.
        addr: String,
        /// Underlying I/O failure.
        #[source]
        source: std::io::Error,
    },
    /// No response line arrived before the deadline.
    #[error("timed out after {timeout:?} waiting for response to command {command:?}")]
    ProtocolTimeout {
        /// Command as passed by the caller.
        command: String,
        /// Deadline that elapsed.
        timeout: Duration,
    },
    /// Any other I/O failure during a line-protocol exchange.
    #[error("error sending command {command:?}: {source}")]
    Protocol {
        /// Command as passed by the caller.
        command: String,
        /// Underlying I/O failure.
        #[source]
        source: std::io::Error,
    },
    /// Telemetry line with the wrong field count or an unparsable field.
    #[error("malformed scope status {line:?}: {reason}")]
    MalformedStatus {
        /// Offending line.
        line: String,
        /// What exactly was wrong with it.
        reason: String,
    },
    /// The HTTP exchange with the property API failed, including non-success statuses.
    #[error("transport error on {path}: {source}")]
    Transport {
        /// Normalised property path.
        path: String,
        /// Underlying HTTP failure.
        #[source]
        source: reqwest::Error,
    },
    /// Device-reported error, raised only when the caller asked for it.
    #[error(transparent)]
    Device(#[from] DeviceError),
    /// Invalid configuration detected at startup.
    #[error("configuration error: {0}")]
    Config(String),
    /// A mount sequence task ended without reporting its outcome.
    #[error("sequence {sequence} did not run to completion: {source}")]
    SequenceAborted {
        /// Sequence name.
        sequence: &'static str,
        /// Why the task ended.
        #[source]
        source: tokio::task::JoinError,
    },
}

/// Result type for bridge operations.
pub type Result<T = ()> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::{DeviceError, Error, ErrorCode};
    use std::time::Duration;

    #[test]
    fn named_codes_debug_symbolically() {
        assert_eq!(format!("{}", ErrorCode::NOT_CONNECTED), "NOT_CONNECTED");
        assert_eq!(format!("{:?}", ErrorCode::new(0x4FF)), "0x4FF");
        assert!(ErrorCode::OK.is_ok());
        assert!(!ErrorCode::INVALID_WHILE_PARKED.is_ok());
    }

    #[test]
    fn error_code_deserializes_from_plain_integer() -> eyre::Result<()> {
        let code = serde_json::from_str::<ErrorCode>("1031")?;
        assert_eq!(code, ErrorCode::NOT_CONNECTED);
        assert_eq!(code.raw(), 0x407);
        assert_eq!(ErrorCode::from(code.raw()), code);
        Ok(())
    }

    #[test]
    fn messages_name_the_command_and_path() {
        let timeout = Error::ProtocolTimeout {
            command: "Park".to_owned(),
            timeout: Duration::from_secs(1),
        };
        assert_eq!(
            timeout.to_string(),
            r#"timed out after 1s waiting for response to command "Park""#
        );

        let device = Error::from(DeviceError {
            code: ErrorCode::INVALID_WHILE_PARKED,
            message: "Mount is parked".to_owned(),
            path: "telescope/0/slewtoaltaz".to_owned(),
        });
        assert_eq!(
            device.to_string(),
            "device error on path telescope/0/slewtoaltaz: INVALID_WHILE_PARKED: Mount is parked"
        );
    }
}
