//! Per-day solar events for an observer
//!
//! `SolarTime` computes transit, sunrise and sunset for one civil date and keeps
//! the three-day ephemeris so arbitrary altitudes can be solved later (twilight
//! angles, Asr shadow lengths). All times are fractional hours after 00:00 UTC
//! of the date; values may fall outside [0, 24) for far east or west longitudes.

use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc};

use super::calculator::{
    approximate_transit, corrected_hour_angle, corrected_transit, deg_to_rad, julian_day,
    rad_to_deg, ThreeDayEphemeris,
};
use super::solar_coordinates::SolarCoordinates;
use crate::types::Coordinates;

/// Standard altitude of the sun's upper limb at rise and set (refraction + semi-diameter)
pub const SUNRISE_ALTITUDE: f64 = -50.0 / 60.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SolarTime {
    pub date: NaiveDate,
    pub observer: Coordinates,
    pub transit: f64,
    pub sunrise: f64,
    pub sunset: f64,
    solar: SolarCoordinates,
    approx_transit: f64,
    ephemeris: ThreeDayEphemeris,
}

impl SolarTime {
    pub fn new(date: NaiveDate, observer: Coordinates) -> Self {
        let jd = julian_day(date.year(), date.month(), date.day(), 0.0);
        let prev_solar = SolarCoordinates::new(jd - 1.0);
        let solar = SolarCoordinates::new(jd);
        let next_solar = SolarCoordinates::new(jd + 1.0);

        let ephemeris = ThreeDayEphemeris {
            sidereal_time: solar.apparent_sidereal_time,
            ra_today: solar.right_ascension,
            ra_yesterday: prev_solar.right_ascension,
            ra_tomorrow: next_solar.right_ascension,
            dec_today: solar.declination,
            dec_yesterday: prev_solar.declination,
            dec_tomorrow: next_solar.declination,
        };

        let m0 = approximate_transit(
            observer.longitude,
            solar.apparent_sidereal_time,
            solar.right_ascension,
        );
        let transit = corrected_transit(
            m0,
            observer.longitude,
            solar.apparent_sidereal_time,
            solar.right_ascension,
            prev_solar.right_ascension,
            next_solar.right_ascension,
        );
        let rise_or_set = |after_transit| {
            corrected_hour_angle(
                m0,
                SUNRISE_ALTITUDE,
                observer.latitude,
                observer.longitude,
                after_transit,
                &ephemeris,
            )
        };

        Self {
            date,
            observer,
            transit,
            sunrise: rise_or_set(false),
            sunset: rise_or_set(true),
            solar,
            approx_transit: m0,
            ephemeris,
        }
    }

    /// Hours at which the sun reaches `angle` degrees of altitude.
    ///
    /// Negative angles are below the horizon. `after_transit` selects the
    /// evening crossing. Returns NaN when the sun never reaches the altitude.
    pub fn hour_angle(&self, angle: f64, after_transit: bool) -> f64 {
        corrected_hour_angle(
            self.approx_transit,
            angle,
            self.observer.latitude,
            self.observer.longitude,
            after_transit,
            &self.ephemeris,
        )
    }

    /// Hours at which an object's shadow reaches `shadow_length` times its
    /// height plus its shadow at transit (the Asr condition).
    pub fn afternoon(&self, shadow_length: f64) -> f64 {
        let tangent = (self.observer.latitude - self.solar.declination).abs();
        let inverse = shadow_length + deg_to_rad(tangent).tan();
        let angle = rad_to_deg((1.0 / inverse).atan());
        self.hour_angle(angle, true)
    }

    pub fn declination(&self) -> f64 {
        self.solar.declination
    }
}

/// Convert fractional hours after 00:00 UTC of `date` into an instant.
///
/// Returns `None` for NaN or infinite input so callers can fall back.
pub fn instant_from_hours(date: NaiveDate, hours: f64) -> Option<DateTime<Utc>> {
    if !hours.is_finite() {
        return None;
    }
    let midnight = date.and_hms_opt(0, 0, 0)?.and_utc();
    let millis = (hours * 3_600_000.0).round() as i64;
    midnight.checked_add_signed(Duration::milliseconds(millis))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Timelike;

    fn amman() -> Coordinates {
        Coordinates::new(31.9539, 35.9106).unwrap()
    }

    #[test]
    fn test_solar_events_are_ordered() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 20).unwrap();
        let solar = SolarTime::new(date, amman());
        assert!(solar.sunrise < solar.transit);
        assert!(solar.transit < solar.sunset);
        // Near the equinox the day is roughly twelve hours long
        assert!((solar.sunset - solar.sunrise - 12.1).abs() < 0.3);
    }

    #[test]
    fn test_transit_follows_longitude() {
        // Amman sits ~36 degrees east, so solar noon is about 2h24m before 12:00 UTC
        let date = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
        let solar = SolarTime::new(date, amman());
        assert!(solar.transit > 9.3 && solar.transit < 9.8, "{}", solar.transit);
    }

    #[test]
    fn test_twilight_brackets_sunrise_and_sunset() {
        let date = NaiveDate::from_ymd_opt(2024, 1, 10).unwrap();
        let solar = SolarTime::new(date, amman());
        let dawn = solar.hour_angle(-18.0, false);
        let dusk = solar.hour_angle(-17.0, true);
        assert!(dawn < solar.sunrise);
        assert!(dusk > solar.sunset);
    }

    #[test]
    fn test_asr_hanafi_after_shafi() {
        let date = NaiveDate::from_ymd_opt(2024, 9, 1).unwrap();
        let solar = SolarTime::new(date, amman());
        let shafi = solar.afternoon(1.0);
        let hanafi = solar.afternoon(2.0);
        assert!(solar.transit < shafi);
        assert!(shafi < hanafi);
        assert!(hanafi < solar.sunset);
    }

    #[test]
    fn test_polar_night_yields_nan() {
        let longyearbyen = Coordinates::new(78.22, 15.65).unwrap();
        let date = NaiveDate::from_ymd_opt(2024, 12, 21).unwrap();
        let solar = SolarTime::new(date, longyearbyen);
        assert!(solar.sunrise.is_nan());
        assert!(instant_from_hours(date, solar.sunrise).is_none());
    }

    #[test]
    fn test_instant_from_hours() {
        let date = NaiveDate::from_ymd_opt(2024, 5, 5).unwrap();
        let instant = instant_from_hours(date, 13.5).unwrap();
        assert_eq!(instant.hour(), 13);
        assert_eq!(instant.minute(), 30);

        let before = instant_from_hours(date, -1.25).unwrap();
        assert_eq!(before.date_naive(), NaiveDate::from_ymd_opt(2024, 5, 4).unwrap());
        assert_eq!(before.hour(), 22);
        assert_eq!(before.minute(), 45);
    }
}
