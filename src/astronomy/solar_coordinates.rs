//! Apparent solar coordinates for one Julian day

use serde::{Deserialize, Serialize};

use super::calculator::{
    apparent_obliquity_of_the_ecliptic, apparent_solar_longitude, ascending_lunar_node_longitude,
    declination, deg_to_rad, julian_century, mean_lunar_longitude, mean_obliquity_of_the_ecliptic,
    mean_sidereal_time, mean_solar_longitude, nutation_in_longitude, nutation_in_obliquity,
    right_ascension,
};

/// Declination, right ascension and apparent sidereal time of the sun (degrees)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SolarCoordinates {
    pub declination: f64,
    pub right_ascension: f64,
    pub apparent_sidereal_time: f64,
}

impl SolarCoordinates {
    pub fn new(julian_day: f64) -> Self {
        let t = julian_century(julian_day);
        let l0 = mean_solar_longitude(t);
        let lp = mean_lunar_longitude(t);
        let omega = ascending_lunar_node_longitude(t);
        let lambda = apparent_solar_longitude(t, l0);

        let theta0 = mean_sidereal_time(t);
        let delta_psi = nutation_in_longitude(l0, lp, omega);
        let delta_epsilon = nutation_in_obliquity(l0, lp, omega);

        let epsilon0 = mean_obliquity_of_the_ecliptic(t);
        let epsilon_apparent = apparent_obliquity_of_the_ecliptic(t, epsilon0);

        Self {
            declination: declination(lambda, epsilon_apparent),
            right_ascension: right_ascension(lambda, epsilon_apparent),
            // Equation of the equinoxes, converted from arc-seconds
            apparent_sidereal_time: theta0
                + (delta_psi * 3600.0 * deg_to_rad(epsilon0 + delta_epsilon).cos()) / 3600.0,
        }
    }
}
