//! Salah Clock - Prayer time engine and phase scheduler for mosque displays
//!
//! Salah Clock computes the daily Islamic prayer instants for any location
//! from solar astronomy and drives the display cycle that follows each
//! prayer: adhan → iqama countdown → phone reminder → remembrance → idle.
//!
//! ## Modules
//!
//! - **Engine**: Solar position, prayer instants and calculation method presets
//! - **Sources**: Local computation, Aladhan-style payloads and an offline day cache
//! - **Scheduler**: Poll-driven phase state machine with an audio playback seam
//! - **Clock**: Stateful display driver producing one snapshot per tick

pub mod astronomy;
pub mod clock;
pub mod config;
pub mod countdown;
pub mod error;
pub mod location;
pub mod method;
pub mod prayer_times;
pub mod scheduler;
pub mod source;
pub mod types;

pub use clock::{DisplaySnapshot, PrayerClock};
pub use config::DisplayConfig;
pub use countdown::{next_prayer_countdown, Countdown};
pub use error::PrayerError;
pub use method::{CalculationMethod, CalculationParameters, Rounding};
pub use prayer_times::PrayerTimes;
pub use types::{Coordinates, HighLatitudeRule, Madhab, Prayer, PrayerAdjustments};

// Source exports
pub use source::{DailyTimings, FallbackSource, Freshness, TimingsProvider};

// Scheduler exports
pub use scheduler::{Phase, PhaseScheduler, PhaseSettings, PhaseTransition};

/// Crate version reported by the CLI and in exported snapshots
pub const SALAH_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Producer name for exported payloads
pub const PRODUCER_NAME: &str = "salah-clock";
