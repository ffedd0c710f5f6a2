//! Low-precision solar ephemeris
//!
//! Stateless formulas after Meeus, "Astronomical Algorithms", and Montenbruck &
//! Pfleger. Every function takes and returns degrees unless noted otherwise.
//! Nothing here validates its inputs: NaN propagates to the caller, which is
//! expected to apply the high-latitude fallback.

use chrono::{DateTime, Datelike, Duration, Timelike, Utc};

/// Julian day of the J2000.0 epoch
pub const J2000: f64 = 2_451_545.0;

/// Days per Julian century
pub const DAYS_PER_CENTURY: f64 = 36_525.0;

/// Sidereal rotation rate in degrees per day, used when refining transits
pub const SIDEREAL_RATE: f64 = 360.985_647;

pub fn deg_to_rad(deg: f64) -> f64 {
    deg.to_radians()
}

pub fn rad_to_deg(rad: f64) -> f64 {
    rad.to_degrees()
}

/// Wrap `value` into [0, max)
pub fn normalize_to_scale(value: f64, max: f64) -> f64 {
    value - max * (value / max).floor()
}

/// Wrap an angle into [0, 360)
pub fn unwind_angle(angle: f64) -> f64 {
    normalize_to_scale(angle, 360.0)
}

/// Equivalent angle in [-180, 180]
pub fn closest_angle(angle: f64) -> f64 {
    if (-180.0..=180.0).contains(&angle) {
        return angle;
    }
    angle - 360.0 * (angle / 360.0).round()
}

/// Julian day for a Gregorian calendar date and fractional UT hours
pub fn julian_day(year: i32, month: u32, day: u32, hours: f64) -> f64 {
    let (y, m) = if month > 2 {
        (year as f64, month as f64)
    } else {
        (year as f64 - 1.0, month as f64 + 12.0)
    };
    let d = day as f64 + hours / 24.0;

    let a = (y / 100.0).trunc();
    let b = (2.0 - a + (a / 4.0).trunc()).trunc();

    let i0 = (365.25 * (y + 4716.0)).trunc();
    let i1 = (30.6001 * (m + 1.0)).trunc();

    i0 + i1 + d + b - 1524.5
}

/// Julian day of a UTC instant, including the fraction of the day
pub fn julian_day_for(instant: &DateTime<Utc>) -> f64 {
    let hours = instant.hour() as f64
        + instant.minute() as f64 / 60.0
        + (instant.second() as f64 + instant.nanosecond() as f64 * 1e-9) / 3600.0;
    julian_day(instant.year(), instant.month(), instant.day(), hours)
}

/// Julian centuries since J2000.0
pub fn julian_century(julian_day: f64) -> f64 {
    (julian_day - J2000) / DAYS_PER_CENTURY
}

/// Geometric mean longitude of the sun
pub fn mean_solar_longitude(t: f64) -> f64 {
    let term1 = 280.466_456_7;
    let term2 = 36_000.769_83 * t;
    let term3 = 0.000_303_2 * t.powi(2);
    unwind_angle(term1 + term2 + term3)
}

/// Geometric mean longitude of the moon
pub fn mean_lunar_longitude(t: f64) -> f64 {
    let term1 = 218.3165;
    let term2 = 481_267.8813 * t;
    unwind_angle(term1 + term2)
}

/// Longitude of the moon's mean ascending node
pub fn ascending_lunar_node_longitude(t: f64) -> f64 {
    let term1 = 125.044_52;
    let term2 = 1934.136_261 * t;
    let term3 = 0.002_070_8 * t.powi(2);
    let term4 = t.powi(3) / 450_000.0;
    unwind_angle(term1 - term2 + term3 + term4)
}

/// Mean anomaly of the sun
pub fn mean_solar_anomaly(t: f64) -> f64 {
    let term1 = 357.529_11;
    let term2 = 35_999.050_29 * t;
    let term3 = 0.000_153_7 * t.powi(2);
    unwind_angle(term1 + term2 - term3)
}

/// Sun's equation of the center for mean anomaly `m`
pub fn solar_equation_of_center(t: f64, m: f64) -> f64 {
    let m_rad = deg_to_rad(m);
    let term1 = (1.914_602 - 0.004_817 * t - 0.000_014 * t.powi(2)) * m_rad.sin();
    let term2 = (0.019_993 - 0.000_101 * t) * (2.0 * m_rad).sin();
    let term3 = 0.000_289 * (3.0 * m_rad).sin();
    term1 + term2 + term3
}

/// Apparent longitude of the sun, referred to the true equinox of the date
pub fn apparent_solar_longitude(t: f64, l0: f64) -> f64 {
    let longitude = l0 + solar_equation_of_center(t, mean_solar_anomaly(t));
    let omega = 125.04 - 1934.136 * t;
    let lambda = longitude - 0.005_69 - 0.004_78 * deg_to_rad(omega).sin();
    unwind_angle(lambda)
}

/// Mean obliquity of the ecliptic
pub fn mean_obliquity_of_the_ecliptic(t: f64) -> f64 {
    let term1 = 23.439_291;
    let term2 = 0.013_004_167 * t;
    let term3 = 0.000_000_163_9 * t.powi(2);
    let term4 = 0.000_000_503_6 * t.powi(3);
    term1 - term2 - term3 + term4
}

/// Obliquity corrected for the apparent position of the sun
pub fn apparent_obliquity_of_the_ecliptic(t: f64, epsilon0: f64) -> f64 {
    let omega = 125.04 - 1934.136 * t;
    epsilon0 + 0.002_56 * deg_to_rad(omega).cos()
}

/// Mean sidereal time at Greenwich
pub fn mean_sidereal_time(t: f64) -> f64 {
    let jd = t * DAYS_PER_CENTURY + J2000;
    let term1 = 280.460_618_37;
    let term2 = 360.985_647_366_29 * (jd - J2000);
    let term3 = 0.000_387_933 * t.powi(2);
    let term4 = t.powi(3) / 38_710_000.0;
    unwind_angle(term1 + term2 + term3 - term4)
}

/// Nutation in longitude
pub fn nutation_in_longitude(l0: f64, lp: f64, omega: f64) -> f64 {
    let term1 = (-17.2 / 3600.0) * deg_to_rad(omega).sin();
    let term2 = (1.32 / 3600.0) * deg_to_rad(2.0 * l0).sin();
    let term3 = (0.23 / 3600.0) * deg_to_rad(2.0 * lp).sin();
    let term4 = (0.21 / 3600.0) * deg_to_rad(2.0 * omega).sin();
    term1 - term2 - term3 + term4
}

/// Nutation in obliquity
pub fn nutation_in_obliquity(l0: f64, lp: f64, omega: f64) -> f64 {
    let term1 = (9.2 / 3600.0) * deg_to_rad(omega).cos();
    let term2 = (0.57 / 3600.0) * deg_to_rad(2.0 * l0).cos();
    let term3 = (0.10 / 3600.0) * deg_to_rad(2.0 * lp).cos();
    let term4 = (0.09 / 3600.0) * deg_to_rad(2.0 * omega).cos();
    term1 + term2 + term3 - term4
}

/// Declination from apparent longitude `lambda` and obliquity `epsilon`
pub fn declination(lambda: f64, epsilon: f64) -> f64 {
    rad_to_deg((deg_to_rad(epsilon).sin() * deg_to_rad(lambda).sin()).asin())
}

/// Right ascension in [0, 360) from apparent longitude and obliquity
pub fn right_ascension(lambda: f64, epsilon: f64) -> f64 {
    let lambda_rad = deg_to_rad(lambda);
    let y = deg_to_rad(epsilon).cos() * lambda_rad.sin();
    unwind_angle(rad_to_deg(y.atan2(lambda_rad.cos())))
}

/// Altitude of a body at hour angle `h` for an observer at latitude `phi`
pub fn altitude_of_celestial_body(phi: f64, delta: f64, h: f64) -> f64 {
    let (phi, delta, h) = (deg_to_rad(phi), deg_to_rad(delta), deg_to_rad(h));
    let term1 = phi.sin() * delta.sin();
    let term2 = phi.cos() * delta.cos() * h.cos();
    rad_to_deg((term1 + term2).asin())
}

/// Approximate transit as a fraction of the day
pub fn approximate_transit(longitude: f64, sidereal_time: f64, right_ascension: f64) -> f64 {
    let lw = -longitude;
    normalize_to_scale((right_ascension + lw - sidereal_time) / 360.0, 1.0)
}

/// Transit refined by one pass of three-point interpolation, in hours
pub fn corrected_transit(
    m0: f64,
    longitude: f64,
    sidereal_time: f64,
    ra_today: f64,
    ra_yesterday: f64,
    ra_tomorrow: f64,
) -> f64 {
    let lw = -longitude;
    let theta = unwind_angle(sidereal_time + SIDEREAL_RATE * m0);
    let alpha = unwind_angle(interpolate_angles(ra_today, ra_yesterday, ra_tomorrow, m0));
    let h = closest_angle(theta - lw - alpha);
    let delta_m = h / -360.0;
    (m0 + delta_m) * 24.0
}

/// Interpolated solar state of three consecutive days
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ThreeDayEphemeris {
    pub sidereal_time: f64,
    pub ra_today: f64,
    pub ra_yesterday: f64,
    pub ra_tomorrow: f64,
    pub dec_today: f64,
    pub dec_yesterday: f64,
    pub dec_tomorrow: f64,
}

/// Time in hours at which the sun reaches altitude `h0`, before or after transit.
///
/// Single-pass correction: the approximate hour angle is refined once using the
/// interpolated right ascension and declination at that time.
pub fn corrected_hour_angle(
    m0: f64,
    h0: f64,
    latitude: f64,
    longitude: f64,
    after_transit: bool,
    ephemeris: &ThreeDayEphemeris,
) -> f64 {
    let lw = -longitude;
    let lat = deg_to_rad(latitude);
    let dec = deg_to_rad(ephemeris.dec_today);
    let term1 = deg_to_rad(h0).sin() - lat.sin() * dec.sin();
    let term2 = lat.cos() * dec.cos();
    let big_h0 = rad_to_deg((term1 / term2).acos());

    let m = if after_transit {
        m0 + big_h0 / 360.0
    } else {
        m0 - big_h0 / 360.0
    };
    let theta = unwind_angle(ephemeris.sidereal_time + SIDEREAL_RATE * m);
    let alpha = unwind_angle(interpolate_angles(
        ephemeris.ra_today,
        ephemeris.ra_yesterday,
        ephemeris.ra_tomorrow,
        m,
    ));
    let delta = interpolate(
        ephemeris.dec_today,
        ephemeris.dec_yesterday,
        ephemeris.dec_tomorrow,
        m,
    );
    let h = theta - lw - alpha;
    let altitude = altitude_of_celestial_body(latitude, delta, h);

    let term3 = altitude - h0;
    let term4 = 360.0 * deg_to_rad(delta).cos() * lat.cos() * deg_to_rad(h).sin();
    let delta_m = term3 / term4;
    (m + delta_m) * 24.0
}

/// Three-point interpolation of `y2` (today) given its neighbours
pub fn interpolate(y2: f64, y1: f64, y3: f64, n: f64) -> f64 {
    let a = y2 - y1;
    let b = y3 - y2;
    let c = b - a;
    y2 + (n / 2.0) * (a + b + n * c)
}

/// Three-point interpolation for angles wrapping at 360
pub fn interpolate_angles(y2: f64, y1: f64, y3: f64, n: f64) -> f64 {
    let a = unwind_angle(y2 - y1);
    let b = unwind_angle(y3 - y2);
    let c = b - a;
    y2 + (n / 2.0) * (a + b + n * c)
}

pub fn is_leap_year(year: i32) -> bool {
    (year % 4 == 0 && year % 100 != 0) || year % 400 == 0
}

/// Days since the winter solstice of the observer's hemisphere
pub fn days_since_solstice(day_of_year: i32, year: i32, latitude: f64) -> i32 {
    let northern_offset = 10;
    let southern_offset = if is_leap_year(year) { 173 } else { 172 };
    let days_in_year = if is_leap_year(year) { 366 } else { 365 };

    if latitude >= 0.0 {
        let days = day_of_year + northern_offset;
        if days >= days_in_year {
            days - days_in_year
        } else {
            days
        }
    } else {
        let days = day_of_year - southern_offset;
        if days < 0 {
            days + days_in_year
        } else {
            days
        }
    }
}

/// Four control points of a seasonal twilight curve, in minutes
struct SeasonalCurve {
    a: f64,
    b: f64,
    c: f64,
    d: f64,
}

impl SeasonalCurve {
    fn morning(latitude: f64) -> Self {
        let lat = latitude.abs();
        Self {
            a: 75.0 + 28.65 / 55.0 * lat,
            b: 75.0 + 19.44 / 55.0 * lat,
            c: 75.0 + 32.74 / 55.0 * lat,
            d: 75.0 + 48.10 / 55.0 * lat,
        }
    }

    fn evening(latitude: f64) -> Self {
        let lat = latitude.abs();
        Self {
            a: 75.0 + 25.60 / 55.0 * lat,
            b: 75.0 + 2.050 / 55.0 * lat,
            c: 75.0 - 9.210 / 55.0 * lat,
            d: 75.0 + 6.140 / 55.0 * lat,
        }
    }

    /// Piecewise-linear interpolation across the four seasonal segments
    fn minutes(&self, days_since_solstice: i32, year: i32) -> f64 {
        let dyy = days_since_solstice as f64;
        if dyy < 91.0 {
            self.a + (self.b - self.a) / 91.0 * dyy
        } else if dyy < 137.0 {
            self.b + (self.c - self.b) / 46.0 * (dyy - 91.0)
        } else if dyy < 183.0 {
            self.c + (self.d - self.c) / 46.0 * (dyy - 137.0)
        } else {
            let span = if is_leap_year(year) { 92.0 } else { 91.0 };
            self.d + (self.a - self.d) / span * (dyy - 183.0)
        }
    }
}

/// Season-adjusted Fajr: a latitude and season dependent offset before sunrise
pub fn season_adjusted_morning_twilight(
    latitude: f64,
    day_of_year: i32,
    year: i32,
    sunrise: DateTime<Utc>,
) -> DateTime<Utc> {
    let dyy = days_since_solstice(day_of_year, year, latitude);
    let minutes = SeasonalCurve::morning(latitude).minutes(dyy, year);
    sunrise - Duration::seconds((minutes * 60.0).round() as i64)
}

/// Season-adjusted Isha: a latitude and season dependent offset after sunset
pub fn season_adjusted_evening_twilight(
    latitude: f64,
    day_of_year: i32,
    year: i32,
    sunset: DateTime<Utc>,
) -> DateTime<Utc> {
    let dyy = days_since_solstice(day_of_year, year, latitude);
    let minutes = SeasonalCurve::evening(latitude).minutes(dyy, year);
    sunset + Duration::seconds((minutes * 60.0).round() as i64)
}
