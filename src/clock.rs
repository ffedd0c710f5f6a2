//! Display driver
//!
//! `PrayerClock` is the stateful runtime behind one display. It owns the
//! configuration, the timings source and the phase scheduler, reloads the
//! day's timings when the civil date changes and turns every tick into a
//! [`DisplaySnapshot`] for the renderer.

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, Utc};
use chrono_tz::Tz;
use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::config::DisplayConfig;
use crate::countdown::{next_prayer_countdown, Countdown};
use crate::error::PrayerError;
use crate::scheduler::{AudioPlayer, Phase, PhaseScheduler, PhaseTransition};
use crate::source::{AstronomicalProvider, DailyTimings, FallbackSource, Freshness};
use crate::types::Prayer;

/// Everything the renderer needs for one frame
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DisplaySnapshot {
    /// Civil time at the display
    pub local_time: NaiveDateTime,
    /// Civil date the timings belong to
    pub date: NaiveDate,
    pub phase: Phase,
    pub active_prayer: Option<Prayer>,
    /// Time left in the current phase
    #[serde(with = "crate::types::option_duration_seconds")]
    pub remaining: Option<Duration>,
    pub remembrance_text: Option<String>,
    pub next_prayer: Countdown,
    pub freshness: Freshness,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hijri_date: Option<String>,
    pub timings: DailyTimings,
    /// Phase changes made during this tick
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub transitions: Vec<PhaseTransition>,
}

struct LoadedDay {
    timings: DailyTimings,
    freshness: Freshness,
    tomorrow_fajr: Option<DateTime<Utc>>,
}

/// Stateful runtime for one display.
///
/// Feed it wall-clock samples with [`PrayerClock::tick`]; it never reads the
/// system clock itself.
pub struct PrayerClock {
    config: DisplayConfig,
    timezone: Tz,
    source: FallbackSource,
    scheduler: PhaseScheduler,
    day: Option<LoadedDay>,
}

impl PrayerClock {
    /// Clock computing its timings locally from the configured location
    pub fn new(config: DisplayConfig) -> Result<Self, PrayerError> {
        let source = FallbackSource::astronomical(computed_provider(&config)?);
        Self::with_source(config, source)
    }

    /// Clock reading timings from an arbitrary source
    pub fn with_source(config: DisplayConfig, source: FallbackSource) -> Result<Self, PrayerError> {
        config.validate()?;
        Ok(Self {
            timezone: config.timezone()?,
            scheduler: PhaseScheduler::new(config.phases.clone()),
            config,
            source,
            day: None,
        })
    }

    /// Route adhan playback through `player`
    pub fn with_player(mut self, player: Box<dyn AudioPlayer>) -> Self {
        self.scheduler = PhaseScheduler::with_player(self.config.phases.clone(), player);
        self
    }

    pub fn config(&self) -> &DisplayConfig {
        &self.config
    }

    pub fn timezone(&self) -> Tz {
        self.timezone
    }

    pub fn scheduler(&self) -> &PhaseScheduler {
        &self.scheduler
    }

    /// Timings currently driving the scheduler, once the first tick ran
    pub fn today(&self) -> Option<&DailyTimings> {
        self.day.as_ref().map(|d| &d.timings)
    }

    /// Save cached provider days to JSON
    pub fn save_cache(&self) -> Result<String, PrayerError> {
        Ok(self.source.cache().to_json()?)
    }

    /// Advance to `now` and describe what the display should show
    pub fn tick(&mut self, now: DateTime<Utc>) -> Result<DisplaySnapshot, PrayerError> {
        self.ensure_day(now)?;
        let Some(day) = &self.day else {
            return Err(PrayerError::DataSource("no timings loaded".to_string()));
        };

        let transitions = self.scheduler.tick(now, &day.timings);
        let state = self.scheduler.state();
        Ok(DisplaySnapshot {
            local_time: now.with_timezone(&self.timezone).naive_local(),
            date: day.timings.date,
            phase: state.current_phase,
            active_prayer: state.active_prayer,
            remaining: self.scheduler.remaining(now),
            remembrance_text: self.scheduler.remembrance_text().map(str::to_string),
            next_prayer: next_prayer_countdown(now, &day.timings, day.tomorrow_fajr),
            freshness: day.freshness,
            hijri_date: day.timings.hijri_date.clone(),
            timings: day.timings.clone(),
            transitions,
        })
    }

    /// Swap the configuration.
    ///
    /// The active phase keeps running; the new location and calculation
    /// settings apply from the next tick.
    pub fn apply_config(&mut self, config: DisplayConfig) -> Result<(), PrayerError> {
        config.validate()?;
        let timezone = config.timezone()?;
        if config.location != self.config.location || config.calculation != self.config.calculation {
            self.source.set_computed(computed_provider(&config)?);
            self.day = None;
        }
        self.scheduler.set_settings(config.phases.clone());
        self.timezone = timezone;
        self.config = config;
        info!("configuration updated");
        Ok(())
    }

    pub fn skip(&mut self, now: DateTime<Utc>) -> Vec<PhaseTransition> {
        self.scheduler.skip(now)
    }

    pub fn reset(&mut self, now: DateTime<Utc>) -> Vec<PhaseTransition> {
        self.scheduler.reset(now)
    }

    fn ensure_day(&mut self, now: DateTime<Utc>) -> Result<(), PrayerError> {
        let date = now.with_timezone(&self.timezone).date_naive();
        if self.day.as_ref().is_some_and(|d| d.timings.date == date) {
            return Ok(());
        }

        match self.source.timings_for(date) {
            Ok((timings, freshness)) => {
                let tomorrow_fajr = self
                    .source
                    .timings_for(date + Duration::days(1))
                    .map(|(t, _)| t.fajr)
                    .ok();
                info!("loaded timings for {date} ({freshness:?})");
                self.day = Some(LoadedDay {
                    timings,
                    freshness,
                    tomorrow_fajr,
                });
            }
            Err(e) => {
                let Some(previous) = self.day.take() else {
                    return Err(e);
                };
                warn!("no timings for {date} ({e}), reusing {}", previous.timings.date);
                self.day = Some(LoadedDay {
                    timings: previous.timings.shifted_to(date),
                    freshness: Freshness::Stale,
                    tomorrow_fajr: None,
                });
            }
        }
        Ok(())
    }
}

fn computed_provider(config: &DisplayConfig) -> Result<AstronomicalProvider, PrayerError> {
    let location = config.resolve_location()?;
    Ok(AstronomicalProvider::new(
        location.coordinates,
        config.calculation_parameters()?,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::{StaticTimingsProvider, TimingsProvider};
    use chrono::{TimeZone, Timelike};
    use pretty_assertions::assert_eq;

    fn june_first() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 1).unwrap()
    }

    fn amman_timings(config: &DisplayConfig, date: NaiveDate) -> DailyTimings {
        computed_provider(config).unwrap().timings_for(date).unwrap()
    }

    #[test]
    fn test_idle_snapshot() {
        let mut clock = PrayerClock::new(DisplayConfig::default()).unwrap();
        // 09:00 in Amman
        let now = Utc.with_ymd_and_hms(2024, 6, 1, 6, 0, 0).unwrap();
        let snapshot = clock.tick(now).unwrap();

        assert_eq!(snapshot.phase, Phase::Idle);
        assert_eq!(snapshot.active_prayer, None);
        assert_eq!(snapshot.remaining, None);
        assert_eq!(snapshot.local_time.hour(), 9);
        assert_eq!(snapshot.date, june_first());
        assert_eq!(snapshot.next_prayer.prayer, Prayer::Dhuhr);
        assert_eq!(snapshot.freshness, Freshness::Live);
        assert!(snapshot.transitions.is_empty());
    }

    #[test]
    fn test_cycle_through_clock() {
        let config = DisplayConfig::default();
        let dhuhr = amman_timings(&config, june_first()).dhuhr;
        let mut clock = PrayerClock::new(config).unwrap();

        let snapshot = clock.tick(dhuhr).unwrap();
        assert_eq!(snapshot.phase, Phase::Adhan);
        assert_eq!(snapshot.active_prayer, Some(Prayer::Dhuhr));
        assert_eq!(snapshot.transitions.len(), 1);
        // Dhuhr is now, Asr is next
        assert_eq!(snapshot.next_prayer.prayer, Prayer::Asr);

        let snapshot = clock.tick(dhuhr + Duration::seconds(194)).unwrap();
        assert_eq!(snapshot.phase, Phase::IqamaCountdown);
        assert_eq!(snapshot.remaining, Some(Duration::minutes(15)));
    }

    #[test]
    fn test_day_rollover_keeps_active_phase() {
        let config = DisplayConfig::default();
        let mut day = amman_timings(&config, june_first());
        // Isha at 23:55 Amman time
        day.isha = Utc.with_ymd_and_hms(2024, 6, 1, 20, 55, 0).unwrap();
        let mut provider = StaticTimingsProvider::new();
        provider.insert(day.clone());
        let source = FallbackSource::new(Box::new(provider), computed_provider(&config).unwrap());
        let mut clock = PrayerClock::with_source(config, source).unwrap();

        let snapshot = clock.tick(day.isha).unwrap();
        assert_eq!(snapshot.phase, Phase::Adhan);
        assert_eq!(snapshot.freshness, Freshness::Live);

        // Local midnight; the provider has nothing for June 2nd so it is computed
        let snapshot = clock.tick(day.isha + Duration::minutes(5)).unwrap();
        assert_eq!(snapshot.date, june_first() + Duration::days(1));
        assert_eq!(snapshot.freshness, Freshness::Computed);
        assert_eq!(snapshot.phase, Phase::IqamaCountdown);
        assert_eq!(snapshot.active_prayer, Some(Prayer::Isha));
        assert_eq!(snapshot.next_prayer.prayer, Prayer::Fajr);
    }

    #[test]
    fn test_apply_config_preserves_phase() {
        let config = DisplayConfig::default();
        let dhuhr = amman_timings(&config, june_first()).dhuhr;
        let mut clock = PrayerClock::new(config.clone()).unwrap();
        clock.tick(dhuhr).unwrap();

        let mut updated = config;
        updated.location.city = Some("Zarqa".to_string());
        updated.phases.iqama_wait_minutes.set(Prayer::Dhuhr, 5);
        clock.apply_config(updated).unwrap();

        let snapshot = clock.tick(dhuhr + Duration::seconds(30)).unwrap();
        assert_eq!(snapshot.phase, Phase::Adhan);
        assert_eq!(snapshot.active_prayer, Some(Prayer::Dhuhr));
        // Zarqa is east of Amman
        assert!(snapshot.timings.dhuhr <= dhuhr);

        let snapshot = clock.tick(dhuhr + Duration::seconds(194)).unwrap();
        assert_eq!(snapshot.phase, Phase::IqamaCountdown);
        assert_eq!(snapshot.remaining, Some(Duration::minutes(5)));
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = DisplayConfig::default();
        let mut clock = PrayerClock::new(config.clone()).unwrap();
        let mut bad = config;
        bad.location.country = Some("Atlantis".to_string());
        assert!(clock.apply_config(bad.clone()).is_err());
        assert!(PrayerClock::new(bad).is_err());
        assert_eq!(clock.config(), &DisplayConfig::default());
    }

    #[test]
    fn test_skip_and_reset() {
        let config = DisplayConfig::default();
        let asr = amman_timings(&config, june_first()).asr;
        let mut clock = PrayerClock::new(config).unwrap();
        clock.tick(asr).unwrap();

        let transitions = clock.skip(asr + Duration::seconds(10));
        assert_eq!(transitions[0].to, Phase::IqamaCountdown);
        let transitions = clock.reset(asr + Duration::seconds(20));
        assert_eq!(transitions[0].to, Phase::Idle);
        assert_eq!(clock.tick(asr + Duration::seconds(21)).unwrap().phase, Phase::Idle);
    }

    #[test]
    fn test_save_cache() {
        let config = DisplayConfig::default();
        let mut provider = StaticTimingsProvider::new();
        provider.insert(amman_timings(&config, june_first()));
        let source = FallbackSource::new(Box::new(provider), computed_provider(&config).unwrap());
        let mut clock = PrayerClock::with_source(config, source).unwrap();
        clock.tick(Utc.with_ymd_and_hms(2024, 6, 1, 6, 0, 0).unwrap()).unwrap();

        let json = clock.save_cache().unwrap();
        let cache = crate::source::DayCache::from_json(&json).unwrap();
        assert!(cache.get(june_first()).is_some());
    }

    #[test]
    fn test_snapshot_serializes() {
        let mut clock = PrayerClock::new(DisplayConfig::default()).unwrap();
        let snapshot = clock
            .tick(Utc.with_ymd_and_hms(2024, 6, 1, 6, 0, 0).unwrap())
            .unwrap();
        let json = serde_json::to_string(&snapshot).unwrap();
        assert!(json.contains("\"phase\":\"idle\""));
        assert!(json.contains("\"remaining\":null"));
        let restored: DisplaySnapshot = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, snapshot);
    }
}
