//! Pointing status assembled from the Alpaca telescope properties.

use crate::Result;
use crate::ascom::{GatheredStatus, Method, Params, PropertyClient, PropertyResult};
use serde::Serialize;
use std::collections::BTreeSet;

/// Properties read for every pointing status.
pub const POINTING_PROPERTIES: [&str; 6] = [
    UTC_DATE,
    SIDEREAL_TIME,
    ALTITUDE,
    AZIMUTH,
    RIGHT_ASCENSION,
    DECLINATION,
];

const UTC_DATE: &str = "utcdate";
const SIDEREAL_TIME: &str = "siderealtime";
const ALTITUDE: &str = "altitude";
const AZIMUTH: &str = "azimuth";
const RIGHT_ASCENSION: &str = "rightascension";
const DECLINATION: &str = "declination";

/// Where the telescope points, as reported to the GUI.
///
/// Fields are `None` whenever the underlying read failed; nothing is ever
/// defaulted to zero.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PointingStatus {
    /// UTC date and time as reported by the mount.
    pub utcdate: Option<String>,
    /// Local sidereal time (hours).
    pub sidereal_time: Option<f64>,
    /// Hour angle (hours), sidereal time minus right ascension.
    #[serde(rename = "ha")]
    pub hour_angle: Option<f64>,
    /// Altitude (degrees).
    pub altitude: Option<f64>,
    /// Azimuth (degrees).
    pub azimuth: Option<f64>,
    /// Right ascension (degrees).
    pub right_ascension: Option<f64>,
    /// Declination (degrees).
    pub declination: Option<f64>,
    /// Properties whose read failed.
    #[serde(rename = "errors")]
    pub failed_fields: BTreeSet<String>,
}

impl PointingStatus {
    /// Combine gathered property reads into a pointing status.
    ///
    /// A property missing from `gathered` counts as failed.
    pub fn from_gathered(gathered: &GatheredStatus) -> Self {
        let ok = |key: &str| gathered.get(key).filter(|result| result.is_ok());
        let number = |key: &str| ok(key).and_then(PropertyResult::as_f64);

        let sidereal_time = number(SIDEREAL_TIME);
        let ra_hours = number(RIGHT_ASCENSION);

        Self {
            utcdate: ok(UTC_DATE).and_then(PropertyResult::as_str).map(str::to_owned),
            sidereal_time,
            hour_angle: sidereal_time.zip(ra_hours).map(|(lst, ra)| lst - ra),
            altitude: number(ALTITUDE),
            azimuth: number(AZIMUTH),
            right_ascension: ra_hours.map(|ra| ra * 15.0),
            declination: number(DECLINATION),
            failed_fields: POINTING_PROPERTIES
                .iter()
                .filter(|&&key| ok(key).is_none())
                .map(|&key| key.to_owned())
                .collect(),
        }
    }
}

impl PropertyClient {
    /// Read all pointing properties concurrently and combine them.
    ///
    /// Device errors end up in [`PointingStatus::failed_fields`]; only
    /// transport faults fail the whole call.
    pub async fn pointing_status(&self) -> Result<PointingStatus> {
        let gathered = self
            .gather(&POINTING_PROPERTIES, Method::Get, false, &Params::new())
            .await?;
        Ok(PointingStatus::from_gathered(&gathered))
    }
}
