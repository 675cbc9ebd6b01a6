use crate::{Error, Result};
use serde::Serialize;
use std::fmt;
use std::str::FromStr;

/// Number of `;`-separated fields in a `ReadScopeStatus` reply.
pub const SCOPE_STATUS_FIELDS: usize = 12;

/// `boolParms` field of the status line.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(transparent)]
pub struct StatusMask(u32);

macro_rules! status_mask_bits {
    ($(#[doc = $doc:literal] $name:ident = $bit:literal,)*) => {
        impl StatusMask {
            $(
                #[doc = $doc]
                pub const $name: Self = Self(1 << $bit);
            )*

            const NAMED: &'static [(Self, &'static str)] = &[$((Self::$name, stringify!($name)),)*];
        }
    };
}

status_mask_bits! {
    #[doc = "Scope is initialized"]
    INITIALIZED = 0,
    #[doc = "Scope is tracking (remains set while slewing)"]
    TRACKING = 1,
    #[doc = "Scope is slewing"]
    SLEWING = 2,
    #[doc = "Scope is parking"]
    PARKING = 3,
    #[doc = "Scope is parked"]
    PARKED = 4,
    #[doc = "Scope is looking east (GEM mount)"]
    LOOKING_EAST = 5,
    #[doc = "Servo controller is in manual (\"blinky\") mode on one or both axes"]
    BLINKY_MODE = 6,
    #[doc = "Communication fault between the control software and the servo controller"]
    COMMUNICATION_FAULT = 7,
    #[doc = "Primary axis plus limit switch active"]
    LIMIT_SWITCH_PRIMARY_PLUS = 8,
    #[doc = "Primary axis minus limit switch active"]
    LIMIT_SWITCH_PRIMARY_MINUS = 9,
    #[doc = "Secondary axis plus limit switch active"]
    LIMIT_SWITCH_SECONDARY_PLUS = 10,
    #[doc = "Secondary axis minus limit switch active"]
    LIMIT_SWITCH_SECONDARY_MINUS = 11,
    #[doc = "Primary axis homing switch active"]
    HOMING_SWITCH_PRIMARY_AXIS = 12,
    #[doc = "Secondary axis homing switch active"]
    HOMING_SWITCH_SECONDARY_AXIS = 13,
    #[doc = "Going to a commanded rotator position (rotator replies only)"]
    ROTATOR_POSITION_COMMANDED = 14,
    #[doc = "Tracking at a non-sidereal offset rate"]
    TRACKING_OFFSET_RATE = 15,
    #[doc = "Tracking a satellite"]
    TRACKING_SATELLITE = 16,
    #[doc = "Tracking hasn't settled after a slew"]
    TRACKING_UNSETTLED_AFTER_SLEW = 17,
}

impl StatusMask {
    /// All 18 defined bits.
    pub const ALL_BITS: u32 = (1 << 18) - 1;

    /// Mask from raw bits; `None` if any undefined bit is set.
    pub const fn from_bits(bits: u32) -> Option<Self> {
        if bits & !Self::ALL_BITS == 0 {
            Some(Self(bits))
        } else {
            None
        }
    }

    /// Raw bits.
    pub const fn bits(self) -> u32 {
        self.0
    }

    /// Whether every bit of `other` is set.
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    /// Names of the set bits, lowest bit first.
    pub fn labels(self) -> Vec<&'static str> {
        Self::NAMED
            .iter()
            .filter(|&&(flag, _)| self.contains(flag))
            .map(|&(_, name)| name)
            .collect()
    }
}

impl fmt::Debug for StatusMask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let labels = self.labels();
        if labels.is_empty() {
            f.write_str("(empty)")
        } else {
            f.write_str(&labels.join(" | "))
        }
    }
}

/// Parsed `ReadScopeStatus` reply.
///
/// Units are passed through exactly as the mount reports them: right ascension
/// and times in hours, angles in degrees.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScopeStatusRecord {
    /// Status flags.
    pub bool_params: StatusMask,
    /// Names of the set status flags, lowest bit first.
    pub bool_params_labels: Vec<&'static str>,
    /// Right ascension (hours, JNow).
    pub right_ascension: f64,
    /// Declination (degrees, JNow).
    pub declination: f64,
    /// Altitude (degrees).
    pub altitude: f64,
    /// Azimuth (degrees).
    pub azimuth: f64,
    /// Secondary axis angle (degrees).
    pub secondary_axis_angle: f64,
    /// Primary axis angle (degrees).
    pub primary_axis_angle: f64,
    /// Sidereal time (hours).
    pub scope_sidereal_time: f64,
    /// Julian day.
    pub scope_julian_day: f64,
    /// Scope time (hours).
    pub scope_time: f64,
    /// Air mass.
    pub air_mass: f64,
    /// Trailing free-text message with its `_` marker stripped.
    pub message: String,
}

/// Parse the `;`-separated reply of `ReadScopeStatus`.
///
/// The same 12-field layout is shared by other commands with different
/// meanings per position: for `ReadScopeDestination` fields 5-8 hold the
/// destination RA, Dec, altitude and azimuth, and for `RotatorComms` they hold
/// parallactic angle, parallactic rate, camera solved angle and commanded
/// rotator position. This decoder only applies the `ReadScopeStatus` meaning.
pub fn parse_scope_status(line: &str) -> Result<ScopeStatusRecord> {
    let malformed = |reason: String| Error::MalformedStatus {
        line: line.to_owned(),
        reason,
    };

    let fields = line.trim().split(';').map(str::trim).collect::<Vec<_>>();
    if fields.len() != SCOPE_STATUS_FIELDS {
        return Err(malformed(format!(
            "expected {SCOPE_STATUS_FIELDS} fields, got {}",
            fields.len()
        )));
    }

    let bits = fields[0]
        .parse::<u32>()
        .map_err(|err| malformed(format!("bool params {:?}: {err}", fields[0])))?;
    let bool_params = StatusMask::from_bits(bits)
        .ok_or_else(|| malformed(format!("bool params {bits:#X} has undefined bits set")))?;

    let float = |index: usize, name: &str| {
        fields[index]
            .parse::<f64>()
            .map_err(|err| malformed(format!("{name} {:?}: {err}", fields[index])))
    };

    Ok(ScopeStatusRecord {
        bool_params,
        bool_params_labels: bool_params.labels(),
        right_ascension: float(1, "right ascension")?,
        declination: float(2, "declination")?,
        altitude: float(3, "altitude")?,
        azimuth: float(4, "azimuth")?,
        secondary_axis_angle: float(5, "secondary axis angle")?,
        primary_axis_angle: float(6, "primary axis angle")?,
        scope_sidereal_time: float(7, "sidereal time")?,
        scope_julian_day: float(8, "julian day")?,
        scope_time: float(9, "scope time")?,
        air_mass: float(10, "air mass")?,
        message: fields[11]
            .strip_prefix('_')
            .unwrap_or(fields[11])
            .to_owned(),
    })
}

impl FromStr for ScopeStatusRecord {
    type Err = Error;

    fn from_str(line: &str) -> Result<Self> {
        parse_scope_status(line)
    }
}
