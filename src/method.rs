//! Calculation method catalog
//!
//! Each method is a named preset of twilight angles (or a fixed Isha interval)
//! plus built-in minute adjustments. `CalculationMethod::parameters()` builds a
//! fresh `CalculationParameters` value on every call, so tweaking one set of
//! parameters never affects another.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::PrayerError;
use crate::types::{HighLatitudeRule, Madhab, PrayerAdjustments};

/// Named regional conventions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CalculationMethod {
    MuslimWorldLeague,
    Egyptian,
    Karachi,
    UmmAlQura,
    Dubai,
    MoonsightingCommittee,
    NorthAmerica,
    Kuwait,
    Qatar,
    Singapore,
    Jordan,
    Other,
}

impl CalculationMethod {
    pub const ALL: [CalculationMethod; 12] = [
        CalculationMethod::MuslimWorldLeague,
        CalculationMethod::Egyptian,
        CalculationMethod::Karachi,
        CalculationMethod::UmmAlQura,
        CalculationMethod::Dubai,
        CalculationMethod::MoonsightingCommittee,
        CalculationMethod::NorthAmerica,
        CalculationMethod::Kuwait,
        CalculationMethod::Qatar,
        CalculationMethod::Singapore,
        CalculationMethod::Jordan,
        CalculationMethod::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CalculationMethod::MuslimWorldLeague => "muslim_world_league",
            CalculationMethod::Egyptian => "egyptian",
            CalculationMethod::Karachi => "karachi",
            CalculationMethod::UmmAlQura => "umm_al_qura",
            CalculationMethod::Dubai => "dubai",
            CalculationMethod::MoonsightingCommittee => "moonsighting_committee",
            CalculationMethod::NorthAmerica => "north_america",
            CalculationMethod::Kuwait => "kuwait",
            CalculationMethod::Qatar => "qatar",
            CalculationMethod::Singapore => "singapore",
            CalculationMethod::Jordan => "jordan",
            CalculationMethod::Other => "other",
        }
    }

    /// Human readable authority name
    pub fn description(&self) -> &'static str {
        match self {
            CalculationMethod::MuslimWorldLeague => "Muslim World League",
            CalculationMethod::Egyptian => "Egyptian General Authority of Survey",
            CalculationMethod::Karachi => "University of Islamic Sciences, Karachi",
            CalculationMethod::UmmAlQura => "Umm al-Qura University, Makkah",
            CalculationMethod::Dubai => "Dubai (UAE)",
            CalculationMethod::MoonsightingCommittee => "Moonsighting Committee Worldwide",
            CalculationMethod::NorthAmerica => "Islamic Society of North America (ISNA)",
            CalculationMethod::Kuwait => "Kuwait",
            CalculationMethod::Qatar => "Qatar",
            CalculationMethod::Singapore => "Majlis Ugama Islam Singapura",
            CalculationMethod::Jordan => "Ministry of Awqaf, Jordan",
            CalculationMethod::Other => "Custom angles",
        }
    }

    /// Method for a numeric id of the Aladhan timings API
    pub fn from_aladhan_id(id: u32) -> Result<Self, PrayerError> {
        match id {
            1 => Ok(CalculationMethod::Karachi),
            2 => Ok(CalculationMethod::NorthAmerica),
            3 => Ok(CalculationMethod::MuslimWorldLeague),
            4 => Ok(CalculationMethod::UmmAlQura),
            5 => Ok(CalculationMethod::Egyptian),
            9 => Ok(CalculationMethod::Kuwait),
            10 => Ok(CalculationMethod::Qatar),
            11 => Ok(CalculationMethod::Singapore),
            15 => Ok(CalculationMethod::MoonsightingCommittee),
            16 => Ok(CalculationMethod::Dubai),
            23 => Ok(CalculationMethod::Jordan),
            other => Err(PrayerError::UnknownMethod(format!("aladhan id {other}"))),
        }
    }

    /// Build a fresh parameter set for this method
    pub fn parameters(&self) -> CalculationParameters {
        let uniform_plus_one = PrayerAdjustments::new(0, 0, 1, 1, 1, 1);
        match self {
            CalculationMethod::MuslimWorldLeague => {
                CalculationParameters::with_angles(*self, 18.0, 17.0).method_adjustments(uniform_plus_one)
            }
            CalculationMethod::Egyptian => {
                CalculationParameters::with_angles(*self, 19.5, 17.5).method_adjustments(uniform_plus_one)
            }
            CalculationMethod::Karachi => {
                CalculationParameters::with_angles(*self, 18.0, 18.0).method_adjustments(uniform_plus_one)
            }
            CalculationMethod::UmmAlQura => CalculationParameters::with_interval(*self, 18.5, 90),
            CalculationMethod::Dubai => CalculationParameters::with_angles(*self, 18.2, 18.2)
                .method_adjustments(PrayerAdjustments::new(0, -1, 1, 1, 1, 0)),
            CalculationMethod::MoonsightingCommittee => {
                CalculationParameters::with_angles(*self, 18.0, 18.0)
                    .method_adjustments(PrayerAdjustments::new(0, 0, 5, 5, 3, 0))
            }
            CalculationMethod::NorthAmerica => {
                CalculationParameters::with_angles(*self, 15.0, 15.0).method_adjustments(uniform_plus_one)
            }
            CalculationMethod::Kuwait => CalculationParameters::with_angles(*self, 18.0, 17.5),
            CalculationMethod::Qatar => CalculationParameters::with_interval(*self, 18.0, 90),
            CalculationMethod::Singapore => {
                CalculationParameters::with_angles(*self, 20.0, 18.0).method_adjustments(uniform_plus_one)
            }
            CalculationMethod::Jordan => CalculationParameters::with_angles(*self, 18.0, 18.0)
                .method_adjustments(PrayerAdjustments::new(0, 0, 0, 0, 5, 0)),
            CalculationMethod::Other => CalculationParameters::with_angles(*self, 0.0, 0.0),
        }
    }
}

impl fmt::Display for CalculationMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CalculationMethod {
    type Err = PrayerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key: String = s
            .trim()
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .map(|c| c.to_ascii_lowercase())
            .collect();
        match key.as_str() {
            "muslimworldleague" | "mwl" => Ok(CalculationMethod::MuslimWorldLeague),
            "egyptian" | "egypt" => Ok(CalculationMethod::Egyptian),
            "karachi" => Ok(CalculationMethod::Karachi),
            "ummalqura" | "makkah" => Ok(CalculationMethod::UmmAlQura),
            "dubai" | "uae" => Ok(CalculationMethod::Dubai),
            "moonsightingcommittee" | "moonsighting" => Ok(CalculationMethod::MoonsightingCommittee),
            "northamerica" | "isna" => Ok(CalculationMethod::NorthAmerica),
            "kuwait" => Ok(CalculationMethod::Kuwait),
            "qatar" => Ok(CalculationMethod::Qatar),
            "singapore" => Ok(CalculationMethod::Singapore),
            "jordan" => Ok(CalculationMethod::Jordan),
            "other" | "custom" => Ok(CalculationMethod::Other),
            _ => Err(PrayerError::UnknownMethod(s.to_string())),
        }
    }
}

/// Minute rounding applied to the final instants
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Rounding {
    /// Round to the nearest minute (30 s rounds up)
    #[default]
    Nearest,
    /// Always round up to the next whole minute
    Up,
    /// Keep second precision
    None,
}

/// Fraction of the night bounding Fajr and Isha under the high-latitude rule
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NightPortions {
    pub fajr: f64,
    pub isha: f64,
}

/// Complete input for the prayer time engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalculationParameters {
    /// Method this parameter set was derived from
    pub method: CalculationMethod,
    /// Sun depression below the horizon at Fajr (degrees)
    pub fajr_angle: f64,
    /// Sun depression below the horizon at Isha (degrees), unused when `isha_interval > 0`
    pub isha_angle: f64,
    /// Minutes after Maghrib for Isha; 0 means use `isha_angle`
    #[serde(default)]
    pub isha_interval: u32,
    #[serde(default)]
    pub madhab: Madhab,
    #[serde(default)]
    pub high_latitude_rule: HighLatitudeRule,
    /// Manual per-prayer offsets (minutes)
    #[serde(default)]
    pub adjustments: PrayerAdjustments,
    /// Offsets built into the method (minutes)
    #[serde(default)]
    pub method_adjustments: PrayerAdjustments,
    #[serde(default)]
    pub rounding: Rounding,
}

impl CalculationParameters {
    pub fn with_angles(method: CalculationMethod, fajr_angle: f64, isha_angle: f64) -> Self {
        Self {
            method,
            fajr_angle,
            isha_angle,
            isha_interval: 0,
            madhab: Madhab::default(),
            high_latitude_rule: HighLatitudeRule::default(),
            adjustments: PrayerAdjustments::default(),
            method_adjustments: PrayerAdjustments::default(),
            rounding: Rounding::default(),
        }
    }

    pub fn with_interval(method: CalculationMethod, fajr_angle: f64, isha_interval: u32) -> Self {
        Self {
            isha_interval,
            ..Self::with_angles(method, fajr_angle, 0.0)
        }
    }

    pub fn method_adjustments(mut self, adjustments: PrayerAdjustments) -> Self {
        self.method_adjustments = adjustments;
        self
    }

    pub fn madhab(mut self, madhab: Madhab) -> Self {
        self.madhab = madhab;
        self
    }

    pub fn high_latitude_rule(mut self, rule: HighLatitudeRule) -> Self {
        self.high_latitude_rule = rule;
        self
    }

    pub fn adjustments(mut self, adjustments: PrayerAdjustments) -> Self {
        self.adjustments = adjustments;
        self
    }

    pub fn rounding(mut self, rounding: Rounding) -> Self {
        self.rounding = rounding;
        self
    }

    /// Check angle ranges before handing the parameters to the engine
    pub fn validate(&self) -> Result<(), PrayerError> {
        let check_angle = |name: &str, angle: f64| {
            if angle.is_finite() && (0.0..90.0).contains(&angle) {
                Ok(())
            } else {
                Err(PrayerError::InvalidParameters(format!(
                    "{name} angle {angle} outside [0, 90)"
                )))
            }
        };
        check_angle("fajr", self.fajr_angle)?;
        if self.isha_interval == 0 {
            check_angle("isha", self.isha_angle)?;
        }
        Ok(())
    }

    /// Night fractions used by the high-latitude safe bounds
    pub fn night_portions(&self) -> NightPortions {
        match self.high_latitude_rule {
            HighLatitudeRule::MiddleOfTheNight => NightPortions {
                fajr: 1.0 / 2.0,
                isha: 1.0 / 2.0,
            },
            HighLatitudeRule::SeventhOfTheNight => NightPortions {
                fajr: 1.0 / 7.0,
                isha: 1.0 / 7.0,
            },
            HighLatitudeRule::TwilightAngle => NightPortions {
                fajr: self.fajr_angle / 60.0,
                isha: self.isha_angle / 60.0,
            },
        }
    }
}

impl Default for CalculationParameters {
    fn default() -> Self {
        CalculationMethod::MuslimWorldLeague.parameters()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Prayer;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_catalog_angles() {
        let mwl = CalculationMethod::MuslimWorldLeague.parameters();
        assert_eq!((mwl.fajr_angle, mwl.isha_angle), (18.0, 17.0));

        let egypt = CalculationMethod::Egyptian.parameters();
        assert_eq!((egypt.fajr_angle, egypt.isha_angle), (19.5, 17.5));

        let isna = CalculationMethod::NorthAmerica.parameters();
        assert_eq!((isna.fajr_angle, isna.isha_angle), (15.0, 15.0));

        let singapore = CalculationMethod::Singapore.parameters();
        assert_eq!(singapore.fajr_angle, 20.0);
    }

    #[test]
    fn test_fixed_interval_methods() {
        let umm_al_qura = CalculationMethod::UmmAlQura.parameters();
        assert_eq!(umm_al_qura.isha_interval, 90);
        assert_eq!(umm_al_qura.isha_angle, 0.0);
        assert_eq!(umm_al_qura.fajr_angle, 18.5);

        let qatar = CalculationMethod::Qatar.parameters();
        assert_eq!(qatar.isha_interval, 90);
    }

    #[test]
    fn test_method_adjustments() {
        let msc = CalculationMethod::MoonsightingCommittee.parameters();
        assert_eq!(msc.method_adjustments.get(Prayer::Dhuhr), 5);
        assert_eq!(msc.method_adjustments.get(Prayer::Maghrib), 3);

        let dubai = CalculationMethod::Dubai.parameters();
        assert_eq!(dubai.method_adjustments.get(Prayer::Sunrise), -1);

        assert!(CalculationMethod::Kuwait.parameters().method_adjustments.is_zero());
    }

    #[test]
    fn test_parameters_are_independent_values() {
        let mut first = CalculationMethod::Karachi.parameters();
        first.fajr_angle = 12.0;
        first.adjustments.set(Prayer::Asr, 7);

        let second = CalculationMethod::Karachi.parameters();
        assert_eq!(second.fajr_angle, 18.0);
        assert_eq!(second.adjustments, PrayerAdjustments::default());
    }

    #[test]
    fn test_validate_rejects_bad_angles() {
        let mut params = CalculationMethod::MuslimWorldLeague.parameters();
        params.fajr_angle = 95.0;
        assert!(params.validate().is_err());

        let mut params = CalculationMethod::MuslimWorldLeague.parameters();
        params.isha_angle = f64::NAN;
        assert!(params.validate().is_err());

        // Isha angle is ignored for interval methods
        assert!(CalculationMethod::UmmAlQura.parameters().validate().is_ok());
        assert!(CalculationMethod::Other.parameters().validate().is_ok());
    }

    #[test]
    fn test_night_portions() {
        let params = CalculationMethod::MuslimWorldLeague.parameters();
        assert_eq!(params.night_portions().fajr, 0.5);

        let seventh = params.clone().high_latitude_rule(HighLatitudeRule::SeventhOfTheNight);
        assert_eq!(seventh.night_portions().isha, 1.0 / 7.0);

        let twilight = params.high_latitude_rule(HighLatitudeRule::TwilightAngle);
        assert_eq!(twilight.night_portions().fajr, 18.0 / 60.0);
        assert_eq!(twilight.night_portions().isha, 17.0 / 60.0);
    }

    #[test]
    fn test_method_names_round_trip() {
        for method in CalculationMethod::ALL {
            assert_eq!(method.as_str().parse::<CalculationMethod>().unwrap(), method);
        }
        assert_eq!("ISNA".parse::<CalculationMethod>().unwrap(), CalculationMethod::NorthAmerica);
        assert!("tehran".parse::<CalculationMethod>().is_err());
    }

    #[test]
    fn test_aladhan_ids() {
        assert_eq!(CalculationMethod::from_aladhan_id(4).unwrap(), CalculationMethod::UmmAlQura);
        assert_eq!(CalculationMethod::from_aladhan_id(23).unwrap(), CalculationMethod::Jordan);
        assert!(CalculationMethod::from_aladhan_id(7).is_err());
    }
}
