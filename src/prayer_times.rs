//! Prayer time engine
//!
//! Assembles the six daily instants from a [`SolarTime`] and a
//! [`CalculationParameters`] set:
//!
//! 1. Dhuhr is the solar transit, Sunrise and Maghrib the standard rise and set.
//! 2. Asr uses the madhab's shadow length.
//! 3. Fajr and Isha use the twilight angles, bounded by the high-latitude rule
//!    so that neither becomes undefined or more extreme than a fixed portion of
//!    the night. Isha may instead be a fixed interval after Maghrib.
//! 4. Method and manual minute adjustments are added once, then every instant
//!    is rounded per the parameters.
//!
//! A `PrayerTimes` value is immutable; a new one is computed for each date,
//! location or parameter change.

use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc};
use chrono_tz::Tz;
use log::debug;
use serde::{Deserialize, Serialize};

use crate::astronomy::calculator::{
    season_adjusted_evening_twilight, season_adjusted_morning_twilight,
};
use crate::astronomy::{instant_from_hours, SolarTime};
use crate::error::PrayerError;
use crate::method::{CalculationMethod, CalculationParameters, Rounding};
use crate::types::{Coordinates, Prayer};

/// Latitude from which the Moonsighting Committee method switches Fajr and Isha
/// to its seasonal twilight curve
pub const SEASONAL_TWILIGHT_LATITUDE: f64 = 55.0;

/// The six instants of one civil date, as UTC timestamps
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrayerTimes {
    pub coordinates: Coordinates,
    pub date: NaiveDate,
    pub params: CalculationParameters,
    pub fajr: DateTime<Utc>,
    pub sunrise: DateTime<Utc>,
    pub dhuhr: DateTime<Utc>,
    pub asr: DateTime<Utc>,
    pub maghrib: DateTime<Utc>,
    pub isha: DateTime<Utc>,
}

impl PrayerTimes {
    /// Compute the prayer times for `date` at `coordinates`.
    ///
    /// Fails with `InvalidCoordinates`/`InvalidParameters` on malformed input
    /// and with `Unresolvable` when the sun never rises or sets (polar day or
    /// night), which no high-latitude rule can repair.
    pub fn new(
        coordinates: Coordinates,
        date: NaiveDate,
        params: &CalculationParameters,
    ) -> Result<Self, PrayerError> {
        coordinates.validate()?;
        params.validate()?;

        let tomorrow = date
            .succ_opt()
            .ok_or_else(|| unresolvable(Prayer::Isha, date, "date out of range"))?;
        let solar = SolarTime::new(date, coordinates);
        let solar_tomorrow = SolarTime::new(tomorrow, coordinates);

        let resolve = |prayer: Prayer, day: NaiveDate, hours: f64, reason: &str| {
            instant_from_hours(day, hours).ok_or_else(|| unresolvable(prayer, date, reason))
        };

        let dhuhr = resolve(Prayer::Dhuhr, date, solar.transit, "no solar transit")?;
        let sunrise = resolve(Prayer::Sunrise, date, solar.sunrise, "sun does not rise")?;
        let maghrib = resolve(Prayer::Maghrib, date, solar.sunset, "sun does not set")?;
        let asr = resolve(
            Prayer::Asr,
            date,
            solar.afternoon(params.madhab.shadow_length()),
            "shadow length never reached",
        )?;
        let tomorrow_sunrise = resolve(
            Prayer::Fajr,
            tomorrow,
            solar_tomorrow.sunrise,
            "sun does not rise tomorrow",
        )?;

        let night = tomorrow_sunrise - maghrib;
        let portions = params.night_portions();
        let day_of_year = date.ordinal() as i32;
        let seasonal = params.method == CalculationMethod::MoonsightingCommittee;
        let seasonal_only = seasonal && coordinates.latitude.abs() >= SEASONAL_TWILIGHT_LATITUDE;

        let fajr = if seasonal_only {
            season_adjusted_morning_twilight(coordinates.latitude, day_of_year, date.year(), sunrise)
        } else {
            let safe = if seasonal {
                season_adjusted_morning_twilight(
                    coordinates.latitude,
                    day_of_year,
                    date.year(),
                    sunrise,
                )
            } else {
                sunrise - portion_of(night, portions.fajr)
            };
            match instant_from_hours(date, solar.hour_angle(-params.fajr_angle, false)) {
                Some(fajr) if fajr >= safe => fajr,
                _ => {
                    debug!("fajr on {date} bounded by high-latitude rule");
                    safe
                }
            }
        };

        let isha = if params.isha_interval > 0 {
            maghrib + Duration::minutes(i64::from(params.isha_interval))
        } else if seasonal_only {
            season_adjusted_evening_twilight(coordinates.latitude, day_of_year, date.year(), maghrib)
        } else {
            let safe = if seasonal {
                season_adjusted_evening_twilight(
                    coordinates.latitude,
                    day_of_year,
                    date.year(),
                    maghrib,
                )
            } else {
                maghrib + portion_of(night, portions.isha)
            };
            match instant_from_hours(date, solar.hour_angle(-params.isha_angle, true)) {
                Some(isha) if isha <= safe => isha,
                _ => {
                    debug!("isha on {date} bounded by high-latitude rule");
                    safe
                }
            }
        };

        let finish = |prayer: Prayer, instant: DateTime<Utc>| {
            let minutes =
                params.method_adjustments.get(prayer) + params.adjustments.get(prayer);
            round_instant(instant + Duration::minutes(i64::from(minutes)), params.rounding)
        };

        let times = Self {
            coordinates,
            date,
            params: params.clone(),
            fajr: finish(Prayer::Fajr, fajr),
            sunrise: finish(Prayer::Sunrise, sunrise),
            dhuhr: finish(Prayer::Dhuhr, dhuhr),
            asr: finish(Prayer::Asr, asr),
            maghrib: finish(Prayer::Maghrib, maghrib),
            isha: finish(Prayer::Isha, isha),
        };
        debug!(
            "prayer times {} ({}, {}) method={}: fajr={} dhuhr={} isha={}",
            date,
            coordinates.latitude,
            coordinates.longitude,
            params.method,
            times.fajr,
            times.dhuhr,
            times.isha
        );
        Ok(times)
    }

    pub fn time_for(&self, prayer: Prayer) -> DateTime<Utc> {
        match prayer {
            Prayer::Fajr => self.fajr,
            Prayer::Sunrise => self.sunrise,
            Prayer::Dhuhr => self.dhuhr,
            Prayer::Asr => self.asr,
            Prayer::Maghrib => self.maghrib,
            Prayer::Isha => self.isha,
        }
    }

    /// All six instants in chronological order
    pub fn iter(&self) -> impl Iterator<Item = (Prayer, DateTime<Utc>)> + '_ {
        Prayer::ALL.iter().map(move |p| (*p, self.time_for(*p)))
    }

    /// The latest instant at or before `at`, or `None` before Fajr
    pub fn current_prayer(&self, at: DateTime<Utc>) -> Option<Prayer> {
        self.iter()
            .filter(|(_, time)| *time <= at)
            .map(|(prayer, _)| prayer)
            .last()
    }

    /// The first instant strictly after `at`, or `None` after Isha
    pub fn next_prayer(&self, at: DateTime<Utc>) -> Option<Prayer> {
        self.iter()
            .find(|(_, time)| *time > at)
            .map(|(prayer, _)| prayer)
    }

    /// Tomorrow's prayer times with the same location and parameters
    pub fn tomorrow(&self) -> Result<PrayerTimes, PrayerError> {
        let date = self
            .date
            .succ_opt()
            .ok_or_else(|| unresolvable(Prayer::Fajr, self.date, "date out of range"))?;
        PrayerTimes::new(self.coordinates, date, &self.params)
    }

    /// Midpoint between Maghrib and tomorrow's Fajr
    pub fn middle_of_night(&self) -> Result<DateTime<Utc>, PrayerError> {
        let night = self.tomorrow()?.fajr - self.maghrib;
        Ok(round_instant(self.maghrib + night / 2, Rounding::Nearest))
    }

    /// Start of the last third of the night between Maghrib and tomorrow's Fajr
    pub fn last_third_of_night(&self) -> Result<DateTime<Utc>, PrayerError> {
        let night = self.tomorrow()?.fajr - self.maghrib;
        Ok(round_instant(self.maghrib + night * 2 / 3, Rounding::Nearest))
    }

    /// Convert every instant into civil time of `timezone`
    pub fn in_timezone(&self, timezone: Tz) -> LocalPrayerTimes {
        LocalPrayerTimes {
            date: self.date,
            timezone,
            fajr: self.fajr.with_timezone(&timezone),
            sunrise: self.sunrise.with_timezone(&timezone),
            dhuhr: self.dhuhr.with_timezone(&timezone),
            asr: self.asr.with_timezone(&timezone),
            maghrib: self.maghrib.with_timezone(&timezone),
            isha: self.isha.with_timezone(&timezone),
        }
    }
}

/// Prayer times expressed in a location's civil time
#[derive(Debug, Clone, PartialEq)]
pub struct LocalPrayerTimes {
    pub date: NaiveDate,
    pub timezone: Tz,
    pub fajr: DateTime<Tz>,
    pub sunrise: DateTime<Tz>,
    pub dhuhr: DateTime<Tz>,
    pub asr: DateTime<Tz>,
    pub maghrib: DateTime<Tz>,
    pub isha: DateTime<Tz>,
}

impl LocalPrayerTimes {
    pub fn time_for(&self, prayer: Prayer) -> DateTime<Tz> {
        match prayer {
            Prayer::Fajr => self.fajr,
            Prayer::Sunrise => self.sunrise,
            Prayer::Dhuhr => self.dhuhr,
            Prayer::Asr => self.asr,
            Prayer::Maghrib => self.maghrib,
            Prayer::Isha => self.isha,
        }
    }

    /// 24-hour `HH:MM` civil time
    pub fn format(&self, prayer: Prayer) -> String {
        self.time_for(prayer).format("%H:%M").to_string()
    }
}

fn unresolvable(prayer: Prayer, date: NaiveDate, reason: &str) -> PrayerError {
    PrayerError::Unresolvable {
        prayer: prayer.to_string(),
        date: date.to_string(),
        reason: reason.to_string(),
    }
}

fn portion_of(night: Duration, portion: f64) -> Duration {
    Duration::milliseconds((night.num_milliseconds() as f64 * portion).round() as i64)
}

/// Round an instant to whole minutes
pub fn round_instant(instant: DateTime<Utc>, rounding: Rounding) -> DateTime<Utc> {
    const MINUTE_MS: i64 = 60_000;
    let millis = instant.timestamp_millis();
    let rounded = match rounding {
        Rounding::Nearest => (millis + MINUTE_MS / 2).div_euclid(MINUTE_MS) * MINUTE_MS,
        Rounding::Up => {
            let floor = millis.div_euclid(MINUTE_MS) * MINUTE_MS;
            if floor == millis {
                floor
            } else {
                floor + MINUTE_MS
            }
        }
        Rounding::None => millis.div_euclid(1000) * 1000,
    };
    DateTime::from_timestamp_millis(rounded).unwrap_or(instant)
}
