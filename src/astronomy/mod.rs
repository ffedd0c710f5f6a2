//! Solar astronomy
//!
//! Location-independent solar ephemeris (`calculator`, `solar_coordinates`) and
//! the per-day, per-observer event resolver built on it (`solar_time`).

pub mod calculator;
pub mod solar_coordinates;
pub mod solar_time;

pub use solar_coordinates::SolarCoordinates;
pub use solar_time::{instant_from_hours, SolarTime, SUNRISE_ALTITUDE};
