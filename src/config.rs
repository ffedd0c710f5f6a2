//! Display configuration
//!
//! A `DisplayConfig` is an immutable snapshot of everything a display needs:
//! where it is, how prayer times are computed and how the phase cycle runs.
//! It is read from and written to JSON; storing it is the caller's concern.

use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::error::PrayerError;
use crate::location::{self, ResolvedLocation};
use crate::method::{CalculationMethod, CalculationParameters, Rounding};
use crate::scheduler::PhaseSettings;
use crate::types::{Coordinates, HighLatitudeRule, Madhab, PrayerAdjustments};

/// Where the display is installed.
///
/// Either a catalog location (`country` plus optional `city`) or explicit
/// `coordinates` with a `timezone`. Explicit coordinates win.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LocationConfig {
    pub country: Option<String>,
    pub city: Option<String>,
    pub coordinates: Option<Coordinates>,
    /// IANA name, required with explicit coordinates
    pub timezone: Option<String>,
}

impl Default for LocationConfig {
    fn default() -> Self {
        Self {
            country: Some("Jordan".to_string()),
            city: Some("Amman".to_string()),
            coordinates: None,
            timezone: None,
        }
    }
}

/// How prayer times are computed
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CalculationConfig {
    /// Preset to use; the location's customary method when unset
    pub method: Option<CalculationMethod>,
    pub madhab: Madhab,
    pub high_latitude_rule: HighLatitudeRule,
    /// Manual per-prayer offsets in minutes
    pub adjustments: PrayerAdjustments,
    pub rounding: Rounding,
}

/// Full configuration of one display
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    pub location: LocationConfig,
    pub calculation: CalculationConfig,
    pub phases: PhaseSettings,
}

impl DisplayConfig {
    pub fn from_json(json: &str) -> Result<Self, PrayerError> {
        let config: DisplayConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json(&self) -> Result<String, PrayerError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> Result<(), PrayerError> {
        self.resolve_location()
            .map_err(|e| PrayerError::InvalidConfig(format!("location: {e}")))?;
        self.calculation_parameters()
            .and_then(|params| params.validate())
            .map_err(|e| PrayerError::InvalidConfig(format!("calculation: {e}")))?;
        self.phases.validate()
    }

    /// Coordinates, timezone and customary method of the configured location
    pub fn resolve_location(&self) -> Result<ResolvedLocation, PrayerError> {
        let loc = &self.location;
        let Some(coordinates) = loc.coordinates else {
            let country = loc.country.as_deref().unwrap_or("Jordan");
            return location::resolve(country, loc.city.as_deref());
        };

        coordinates.validate()?;
        let tz_name = loc.timezone.as_deref().ok_or_else(|| {
            PrayerError::InvalidTimezone("explicit coordinates need a timezone".to_string())
        })?;
        let catalog = loc.country.as_deref().and_then(location::find_country);
        Ok(ResolvedLocation {
            country: catalog
                .map(|c| c.name.to_string())
                .or_else(|| loc.country.clone())
                .unwrap_or_default(),
            city: loc.city.clone().unwrap_or_default(),
            coordinates,
            timezone: location::parse_timezone(tz_name)?,
            method: catalog
                .map(|c| c.method)
                .unwrap_or(CalculationMethod::MuslimWorldLeague),
        })
    }

    pub fn timezone(&self) -> Result<Tz, PrayerError> {
        Ok(self.resolve_location()?.timezone)
    }

    /// Engine parameters: method preset plus madhab, rule, rounding and manual offsets
    pub fn calculation_parameters(&self) -> Result<CalculationParameters, PrayerError> {
        let method = match self.calculation.method {
            Some(method) => method,
            None => self.resolve_location()?.method,
        };
        Ok(method
            .parameters()
            .madhab(self.calculation.madhab)
            .high_latitude_rule(self.calculation.high_latitude_rule)
            .rounding(self.calculation.rounding)
            .adjustments(self.calculation.adjustments))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Prayer;
    use chrono::Duration;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_default_is_amman() {
        let config = DisplayConfig::default();
        let location = config.resolve_location().unwrap();
        assert_eq!(location.city, "Amman");
        assert_eq!(location.timezone, chrono_tz::Asia::Amman);
        assert_eq!(
            config.calculation_parameters().unwrap().method,
            CalculationMethod::Jordan
        );
        assert_eq!(config.phases.iqama_wait_minutes.get(Prayer::Fajr), 20);
        assert_eq!(config.phases.iqama_wait_minutes.get(Prayer::Maghrib), 10);
        assert_eq!(config.phases.adhan_duration, Duration::seconds(194));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_json_round_trip() {
        let mut config = DisplayConfig::default();
        config.calculation.method = Some(CalculationMethod::UmmAlQura);
        config.calculation.adjustments.set(Prayer::Isha, 3);
        config.phases.muted = true;
        let json = config.to_json().unwrap();
        assert_eq!(DisplayConfig::from_json(&json).unwrap(), config);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config = DisplayConfig::from_json(
            r#"{
                "location": {"country": "Egypt"},
                "calculation": {"madhab": "hanafi"},
                "phases": {"adhan_duration": 120, "iqama_wait_minutes": {"fajr": 25, "dhuhr": 15, "asr": 15, "maghrib": 5, "isha": 10}}
            }"#,
        )
        .unwrap();
        let location = config.resolve_location().unwrap();
        assert_eq!(location.city, "Cairo");
        let params = config.calculation_parameters().unwrap();
        assert_eq!(params.method, CalculationMethod::Egyptian);
        assert_eq!(params.madhab, Madhab::Hanafi);
        assert_eq!(config.phases.adhan_duration, Duration::seconds(120));
        assert_eq!(config.phases.iqama_wait_minutes.get(Prayer::Maghrib), 5);
        assert_eq!(config.phases.trigger_window, Duration::seconds(3));
    }

    #[test]
    fn test_explicit_coordinates() {
        let mut config = DisplayConfig::default();
        config.location = LocationConfig {
            country: None,
            city: Some("Oslo".to_string()),
            coordinates: Some(Coordinates::new(59.9139, 10.7522).unwrap()),
            timezone: Some("Europe/Oslo".to_string()),
        };
        let location = config.resolve_location().unwrap();
        assert_eq!(location.timezone, chrono_tz::Europe::Oslo);
        assert_eq!(location.method, CalculationMethod::MuslimWorldLeague);

        config.location.timezone = None;
        assert!(matches!(
            config.resolve_location(),
            Err(PrayerError::InvalidTimezone(_))
        ));
        assert!(matches!(config.validate(), Err(PrayerError::InvalidConfig(_))));
    }

    #[test]
    fn test_method_override() {
        let mut config = DisplayConfig::default();
        config.calculation.method = Some(CalculationMethod::NorthAmerica);
        config.calculation.adjustments.set(Prayer::Fajr, -2);
        let params = config.calculation_parameters().unwrap();
        assert_eq!(params.fajr_angle, 15.0);
        assert_eq!(params.adjustments.get(Prayer::Fajr), -2);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let unknown = r#"{"location": {"country": "Atlantis"}}"#;
        assert!(matches!(
            DisplayConfig::from_json(unknown),
            Err(PrayerError::InvalidConfig(_))
        ));

        let negative = r#"{"phases": {"phone_reminder": -5}}"#;
        assert!(matches!(
            DisplayConfig::from_json(negative),
            Err(PrayerError::InvalidConfig(_))
        ));

        assert!(matches!(
            DisplayConfig::from_json("not json"),
            Err(PrayerError::JsonError(_))
        ));
    }

    #[test]
    fn test_out_of_range_durations_rejected() {
        let unrepresentable = r#"{"phases": {"adhan_duration": 9223372036854775807}}"#;
        assert!(matches!(
            DisplayConfig::from_json(unrepresentable),
            Err(PrayerError::JsonError(_))
        ));

        let too_long = r#"{"phases": {"phone_reminder": 100000000}}"#;
        assert!(matches!(
            DisplayConfig::from_json(too_long),
            Err(PrayerError::InvalidConfig(_))
        ));

        let long_wait = r#"{"phases": {"iqama_wait_minutes": {"fajr": 4000000000, "dhuhr": 10, "asr": 10, "maghrib": 5, "isha": 10}}}"#;
        assert!(matches!(
            DisplayConfig::from_json(long_wait),
            Err(PrayerError::InvalidConfig(_))
        ));

        let full_day = r#"{"phases": {"remembrance_duration": 86400}}"#;
        assert_eq!(
            DisplayConfig::from_json(full_day).unwrap().phases.remembrance_duration,
            Duration::hours(24)
        );
    }
}
