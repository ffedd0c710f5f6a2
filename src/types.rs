//! Core types shared by the engine, the sources and the scheduler
//!
//! This module defines the small value types that flow between components:
//! observer coordinates, prayer identifiers, Asr madhab, high-latitude rules
//! and per-prayer minute adjustments.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::PrayerError;

/// Observer position in degrees (north and east positive)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinates {
    /// Create validated coordinates.
    ///
    /// Latitude must lie in [-90, 90] and longitude in [-180, 180].
    pub fn new(latitude: f64, longitude: f64) -> Result<Self, PrayerError> {
        let coordinates = Self {
            latitude,
            longitude,
        };
        coordinates.validate()?;
        Ok(coordinates)
    }

    pub fn validate(&self) -> Result<(), PrayerError> {
        if !self.latitude.is_finite() || !(-90.0..=90.0).contains(&self.latitude) {
            return Err(PrayerError::InvalidCoordinates(format!(
                "latitude {} outside [-90, 90]",
                self.latitude
            )));
        }
        if !self.longitude.is_finite() || !(-180.0..=180.0).contains(&self.longitude) {
            return Err(PrayerError::InvalidCoordinates(format!(
                "longitude {} outside [-180, 180]",
                self.longitude
            )));
        }
        Ok(())
    }
}

/// The six daily instants. `Sunrise` is not a prayer but is part of the record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Prayer {
    Fajr,
    Sunrise,
    Dhuhr,
    Asr,
    Maghrib,
    Isha,
}

impl Prayer {
    /// All six instants in chronological order
    pub const ALL: [Prayer; 6] = [
        Prayer::Fajr,
        Prayer::Sunrise,
        Prayer::Dhuhr,
        Prayer::Asr,
        Prayer::Maghrib,
        Prayer::Isha,
    ];

    /// The five prayers that trigger an adhan (sunrise excluded)
    pub const SALAH: [Prayer; 5] = [
        Prayer::Fajr,
        Prayer::Dhuhr,
        Prayer::Asr,
        Prayer::Maghrib,
        Prayer::Isha,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Prayer::Fajr => "fajr",
            Prayer::Sunrise => "sunrise",
            Prayer::Dhuhr => "dhuhr",
            Prayer::Asr => "asr",
            Prayer::Maghrib => "maghrib",
            Prayer::Isha => "isha",
        }
    }

    /// Whether this instant is one of the five prayers
    pub fn is_salah(&self) -> bool {
        !matches!(self, Prayer::Sunrise)
    }
}

impl fmt::Display for Prayer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Prayer {
    type Err = PrayerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "fajr" => Ok(Prayer::Fajr),
            "sunrise" | "shuruq" => Ok(Prayer::Sunrise),
            "dhuhr" | "zuhr" => Ok(Prayer::Dhuhr),
            "asr" => Ok(Prayer::Asr),
            "maghrib" => Ok(Prayer::Maghrib),
            "isha" => Ok(Prayer::Isha),
            other => Err(PrayerError::ParseError(format!("unknown prayer '{other}'"))),
        }
    }
}

/// Asr juristic convention
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Madhab {
    /// Shafi, Maliki and Hanbali: shadow equals object length
    #[default]
    Shafi,
    /// Hanafi: shadow equals twice the object length
    Hanafi,
}

impl Madhab {
    /// Shadow length multiplier used by the Asr computation
    pub fn shadow_length(&self) -> f64 {
        match self {
            Madhab::Shafi => 1.0,
            Madhab::Hanafi => 2.0,
        }
    }
}

/// Fallback policy bounding Fajr and Isha at high latitudes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HighLatitudeRule {
    /// Fajr no earlier than the middle of the night, Isha no later than it
    #[default]
    MiddleOfTheNight,
    /// Fajr no earlier than the last seventh of the night, Isha no later than the first seventh
    SeventhOfTheNight,
    /// Night portion proportional to the twilight angle (angle / 60)
    TwilightAngle,
}

/// Signed minute offsets for each of the six instants
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PrayerAdjustments {
    pub fajr: i32,
    pub sunrise: i32,
    pub dhuhr: i32,
    pub asr: i32,
    pub maghrib: i32,
    pub isha: i32,
}

impl PrayerAdjustments {
    pub fn new(fajr: i32, sunrise: i32, dhuhr: i32, asr: i32, maghrib: i32, isha: i32) -> Self {
        Self {
            fajr,
            sunrise,
            dhuhr,
            asr,
            maghrib,
            isha,
        }
    }

    pub fn get(&self, prayer: Prayer) -> i32 {
        match prayer {
            Prayer::Fajr => self.fajr,
            Prayer::Sunrise => self.sunrise,
            Prayer::Dhuhr => self.dhuhr,
            Prayer::Asr => self.asr,
            Prayer::Maghrib => self.maghrib,
            Prayer::Isha => self.isha,
        }
    }

    pub fn set(&mut self, prayer: Prayer, minutes: i32) {
        match prayer {
            Prayer::Fajr => self.fajr = minutes,
            Prayer::Sunrise => self.sunrise = minutes,
            Prayer::Dhuhr => self.dhuhr = minutes,
            Prayer::Asr => self.asr = minutes,
            Prayer::Maghrib => self.maghrib = minutes,
            Prayer::Isha => self.isha = minutes,
        }
    }

    pub fn is_zero(&self) -> bool {
        Prayer::ALL.iter().all(|p| self.get(*p) == 0)
    }
}

/// Whole seconds to a `Duration`, rejecting values chrono cannot represent
fn checked_seconds<E: serde::de::Error>(secs: i64) -> Result<chrono::Duration, E> {
    chrono::Duration::try_seconds(secs)
        .ok_or_else(|| E::custom(format!("duration out of range: {secs}s")))
}

/// Serde adapter storing a `chrono::Duration` as whole seconds
pub mod duration_seconds {
    use chrono::Duration;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_i64(duration.num_seconds())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        super::checked_seconds(i64::deserialize(deserializer)?)
    }
}

/// Serde adapter for an optional `chrono::Duration` in whole seconds
pub mod option_duration_seconds {
    use chrono::Duration;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(
        duration: &Option<Duration>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match duration {
            Some(d) => serializer.serialize_some(&d.num_seconds()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<Duration>, D::Error> {
        Option::<i64>::deserialize(deserializer)?
            .map(super::checked_seconds)
            .transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_coordinates_validation() {
        assert!(Coordinates::new(31.95, 35.91).is_ok());
        assert!(Coordinates::new(91.0, 0.0).is_err());
        assert!(Coordinates::new(0.0, -180.5).is_err());
        assert!(Coordinates::new(f64::NAN, 0.0).is_err());
    }

    #[test]
    fn test_prayer_parse_and_display() {
        assert_eq!("Fajr".parse::<Prayer>().unwrap(), Prayer::Fajr);
        assert_eq!("shuruq".parse::<Prayer>().unwrap(), Prayer::Sunrise);
        assert_eq!(Prayer::Maghrib.to_string(), "maghrib");
        assert!("witr".parse::<Prayer>().is_err());
    }

    #[test]
    fn test_salah_excludes_sunrise() {
        assert_eq!(Prayer::SALAH.len(), 5);
        assert!(!Prayer::SALAH.contains(&Prayer::Sunrise));
        assert!(Prayer::SALAH.iter().all(|p| p.is_salah()));
    }

    #[test]
    fn test_adjustments_get_set() {
        let mut adj = PrayerAdjustments::default();
        assert!(adj.is_zero());
        adj.set(Prayer::Isha, -3);
        assert_eq!(adj.get(Prayer::Isha), -3);
        assert!(!adj.is_zero());
    }

    #[test]
    fn test_madhab_shadow_length() {
        assert_eq!(Madhab::Shafi.shadow_length(), 1.0);
        assert_eq!(Madhab::Hanafi.shadow_length(), 2.0);
    }
}
