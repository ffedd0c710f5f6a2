//! Prayer-time data sources
//!
//! The scheduler and the countdown only need a [`DailyTimings`] record per
//! civil date. This module provides where those records come from:
//!
//! - [`AstronomicalProvider`] computes them locally with the engine.
//! - [`StaticTimingsProvider`] serves records parsed from an Aladhan-style
//!   timings payload (`"HH:MM"` or `"HH:MM (TZ)"` strings in civil time).
//! - [`DayCache`] keeps previously obtained days for offline use.
//! - [`FallbackSource`] chains a primary provider, the cache and the local
//!   computation, reporting how fresh the returned record is.

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, VecDeque};

use crate::error::PrayerError;
use crate::method::CalculationParameters;
use crate::prayer_times::PrayerTimes;
use crate::types::{Coordinates, Prayer};

/// Default cache retention in days
pub const DEFAULT_CACHE_RETENTION_DAYS: i64 = 30;

/// The six instants of one civil date as consumed by the scheduler
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyTimings {
    pub date: NaiveDate,
    pub fajr: DateTime<Utc>,
    pub sunrise: DateTime<Utc>,
    pub dhuhr: DateTime<Utc>,
    pub asr: DateTime<Utc>,
    pub maghrib: DateTime<Utc>,
    pub isha: DateTime<Utc>,
    /// Hijri date as reported by the provider, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hijri_date: Option<String>,
}

impl DailyTimings {
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

    /// The five prayers with their instants, sunrise excluded
    pub fn salah(&self) -> impl Iterator<Item = (Prayer, DateTime<Utc>)> + '_ {
        Prayer::SALAH.iter().map(move |p| (*p, self.time_for(*p)))
    }

    /// Move every instant by whole days so the record stands in for `date`
    pub fn shifted_to(&self, date: NaiveDate) -> DailyTimings {
        let offset = Duration::days((date - self.date).num_days());
        DailyTimings {
            date,
            fajr: self.fajr + offset,
            sunrise: self.sunrise + offset,
            dhuhr: self.dhuhr + offset,
            asr: self.asr + offset,
            maghrib: self.maghrib + offset,
            isha: self.isha + offset,
            hijri_date: None,
        }
    }
}

impl From<&PrayerTimes> for DailyTimings {
    fn from(times: &PrayerTimes) -> Self {
        Self {
            date: times.date,
            fajr: times.fajr,
            sunrise: times.sunrise,
            dhuhr: times.dhuhr,
            asr: times.asr,
            maghrib: times.maghrib,
            isha: times.isha,
            hijri_date: None,
        }
    }
}

/// Anything able to produce the timings of a civil date
pub trait TimingsProvider {
    /// Short name used in logs
    fn name(&self) -> &str;

    fn timings_for(&self, date: NaiveDate) -> Result<DailyTimings, PrayerError>;
}

/// Local astronomical computation
#[derive(Debug, Clone)]
pub struct AstronomicalProvider {
    coordinates: Coordinates,
    params: CalculationParameters,
}

impl AstronomicalProvider {
    pub fn new(coordinates: Coordinates, params: CalculationParameters) -> Self {
        Self {
            coordinates,
            params,
        }
    }
}

impl TimingsProvider for AstronomicalProvider {
    fn name(&self) -> &str {
        "astronomical"
    }

    fn timings_for(&self, date: NaiveDate) -> Result<DailyTimings, PrayerError> {
        let times = PrayerTimes::new(self.coordinates, date, &self.params)?;
        Ok(DailyTimings::from(&times))
    }
}

/// Parse a provider time such as `"04:12"` or `"04:12 (EEST)"`.
///
/// Only the first token is used and it must be exactly two digits, a colon
/// and two digits.
pub fn parse_clock_time(raw: &str) -> Result<NaiveTime, PrayerError> {
    let token = raw.split_whitespace().next().unwrap_or_default();
    let bytes = token.as_bytes();
    let well_formed = bytes.len() == 5
        && bytes[2] == b':'
        && bytes
            .iter()
            .enumerate()
            .all(|(i, b)| i == 2 || b.is_ascii_digit());
    if !well_formed {
        return Err(PrayerError::InvalidTime(raw.to_string()));
    }
    NaiveTime::parse_from_str(token, "%H:%M").map_err(|_| PrayerError::InvalidTime(raw.to_string()))
}

/// Resolve a civil date and time in `timezone` to a UTC instant.
///
/// Ambiguous times (clocks set back) take the earlier instant; times skipped
/// by a forward transition are rejected.
pub fn civil_to_utc(
    timezone: Tz,
    date: NaiveDate,
    time: NaiveTime,
) -> Result<DateTime<Utc>, PrayerError> {
    timezone
        .from_local_datetime(&date.and_time(time))
        .earliest()
        .map(|local| local.with_timezone(&Utc))
        .ok_or_else(|| {
            PrayerError::InvalidTime(format!("{date} {time} does not exist in {timezone}"))
        })
}

#[derive(Debug, Deserialize)]
struct AladhanEnvelope<T> {
    code: u16,
    data: T,
}

#[derive(Debug, Deserialize)]
struct AladhanDay {
    timings: AladhanTimings,
    date: AladhanDate,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct AladhanTimings {
    fajr: String,
    sunrise: String,
    dhuhr: String,
    asr: String,
    maghrib: String,
    isha: String,
}

#[derive(Debug, Deserialize)]
struct AladhanDate {
    gregorian: AladhanCalendarDate,
    #[serde(default)]
    hijri: Option<AladhanCalendarDate>,
}

#[derive(Debug, Deserialize)]
struct AladhanCalendarDate {
    /// DD-MM-YYYY
    date: String,
}

impl AladhanDay {
    fn into_timings(self, timezone: Tz) -> Result<DailyTimings, PrayerError> {
        let date = NaiveDate::parse_from_str(&self.date.gregorian.date, "%d-%m-%Y").map_err(|_| {
            PrayerError::ParseError(format!("bad gregorian date '{}'", self.date.gregorian.date))
        })?;
        let at = |raw: &str| -> Result<DateTime<Utc>, PrayerError> {
            civil_to_utc(timezone, date, parse_clock_time(raw)?)
        };
        Ok(DailyTimings {
            date,
            fajr: at(&self.timings.fajr)?,
            sunrise: at(&self.timings.sunrise)?,
            dhuhr: at(&self.timings.dhuhr)?,
            asr: at(&self.timings.asr)?,
            maghrib: at(&self.timings.maghrib)?,
            isha: at(&self.timings.isha)?,
            hijri_date: self.date.hijri.map(|h| h.date),
        })
    }
}

/// Timings loaded ahead of time from an Aladhan-style payload
#[derive(Debug, Clone, Default)]
pub struct StaticTimingsProvider {
    days: BTreeMap<NaiveDate, DailyTimings>,
}

impl StaticTimingsProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a `timingsByCity`/`timings` response (one day)
    pub fn from_aladhan_day(json: &str, timezone: Tz) -> Result<Self, PrayerError> {
        let envelope: AladhanEnvelope<AladhanDay> = serde_json::from_str(json)?;
        check_code(envelope.code)?;
        let mut provider = Self::new();
        provider.insert(envelope.data.into_timings(timezone)?);
        Ok(provider)
    }

    /// Parse a `calendar` response (one month of days)
    pub fn from_aladhan_calendar(json: &str, timezone: Tz) -> Result<Self, PrayerError> {
        let envelope: AladhanEnvelope<Vec<AladhanDay>> = serde_json::from_str(json)?;
        check_code(envelope.code)?;
        let mut provider = Self::new();
        for day in envelope.data {
            provider.insert(day.into_timings(timezone)?);
        }
        Ok(provider)
    }

    pub fn insert(&mut self, timings: DailyTimings) {
        self.days.insert(timings.date, timings);
    }

    pub fn len(&self) -> usize {
        self.days.len()
    }

    pub fn is_empty(&self) -> bool {
        self.days.is_empty()
    }
}

fn check_code(code: u16) -> Result<(), PrayerError> {
    if code == 200 {
        Ok(())
    } else {
        Err(PrayerError::DataSource(format!("provider answered with code {code}")))
    }
}

impl TimingsProvider for StaticTimingsProvider {
    fn name(&self) -> &str {
        "static"
    }

    fn timings_for(&self, date: NaiveDate) -> Result<DailyTimings, PrayerError> {
        self.days
            .get(&date)
            .cloned()
            .ok_or_else(|| PrayerError::DataSource(format!("no timings loaded for {date}")))
    }
}

/// Date-ordered store of previously obtained days
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DayCache {
    /// Records sorted by date, one per date
    days: VecDeque<DailyTimings>,
    /// Days kept before pruning
    retention_days: i64,
}

impl Default for DayCache {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_RETENTION_DAYS)
    }
}

impl DayCache {
    pub fn new(retention_days: i64) -> Self {
        Self {
            days: VecDeque::new(),
            retention_days,
        }
    }

    /// Insert or replace the record of its date
    pub fn insert(&mut self, timings: DailyTimings) {
        match self.days.binary_search_by_key(&timings.date, |d| d.date) {
            Ok(index) => self.days[index] = timings,
            Err(index) => self.days.insert(index, timings),
        }
    }

    pub fn get(&self, date: NaiveDate) -> Option<&DailyTimings> {
        self.days
            .binary_search_by_key(&date, |d| d.date)
            .ok()
            .map(|index| &self.days[index])
    }

    /// Latest record on or before `date`
    pub fn nearest(&self, date: NaiveDate) -> Option<&DailyTimings> {
        self.days.iter().rev().find(|d| d.date <= date)
    }

    /// Drop records older than the retention window relative to `today`
    pub fn prune(&mut self, today: NaiveDate) {
        let cutoff = today - Duration::days(self.retention_days);
        while self.days.front().is_some_and(|d| d.date < cutoff) {
            self.days.pop_front();
        }
    }

    pub fn len(&self) -> usize {
        self.days.len()
    }

    pub fn is_empty(&self) -> bool {
        self.days.is_empty()
    }

    /// Load cache from JSON
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Serialize cache to JSON
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// How a record was obtained, surfaced to the renderer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Freshness {
    /// Fresh from the primary provider
    Live,
    /// Same-day record from the cache
    Cached,
    /// Another day's cached record shifted onto this date
    Stale,
    /// Local astronomical computation after the primary provider failed
    Computed,
}

impl Freshness {
    /// Whether the renderer should show the offline indicator
    pub fn is_degraded(&self) -> bool {
        !matches!(self, Freshness::Live)
    }
}

/// Primary provider with cache and local-computation fallback
pub struct FallbackSource {
    /// `None` when the local computation is the primary source
    primary: Option<Box<dyn TimingsProvider>>,
    cache: DayCache,
    computed: AstronomicalProvider,
}

impl FallbackSource {
    pub fn new(primary: Box<dyn TimingsProvider>, computed: AstronomicalProvider) -> Self {
        Self::with_cache(primary, computed, DayCache::default())
    }

    pub fn with_cache(
        primary: Box<dyn TimingsProvider>,
        computed: AstronomicalProvider,
        cache: DayCache,
    ) -> Self {
        Self {
            primary: Some(primary),
            cache,
            computed,
        }
    }

    /// Source that only computes locally; every record is `Live`
    pub fn astronomical(provider: AstronomicalProvider) -> Self {
        Self {
            primary: None,
            cache: DayCache::default(),
            computed: provider,
        }
    }

    pub fn cache(&self) -> &DayCache {
        &self.cache
    }

    /// Replace the local computation, e.g. after the location changed.
    ///
    /// Cached days belong to the previous settings and are dropped.
    pub fn set_computed(&mut self, provider: AstronomicalProvider) {
        self.computed = provider;
        self.cache = DayCache::new(self.cache.retention_days);
    }

    /// Timings for `date`, degrading through cache and computation.
    ///
    /// Successful primary lookups are cached and the cache is pruned. An
    /// earlier cached day shifted onto `date` is served only when the local
    /// computation fails too.
    pub fn timings_for(&mut self, date: NaiveDate) -> Result<(DailyTimings, Freshness), PrayerError> {
        let Some(primary) = &self.primary else {
            return Ok((self.computed.timings_for(date)?, Freshness::Live));
        };
        match primary.timings_for(date) {
            Ok(timings) => {
                debug!("{} provided timings for {date}", primary.name());
                self.cache.insert(timings.clone());
                self.cache.prune(date);
                return Ok((timings, Freshness::Live));
            }
            Err(e) => warn!("{} failed for {date}: {e}", primary.name()),
        }

        if let Some(cached) = self.cache.get(date) {
            warn!("using cached timings for {date}");
            return Ok((cached.clone(), Freshness::Cached));
        }

        warn!("computing timings for {date} locally");
        let computed_err = match self.computed.timings_for(date) {
            Ok(timings) => return Ok((timings, Freshness::Computed)),
            Err(e) => e,
        };

        match self.cache.nearest(date) {
            Some(nearest) => {
                warn!(
                    "local computation failed for {date} ({computed_err}), using {} shifted",
                    nearest.date
                );
                Ok((nearest.shifted_to(date), Freshness::Stale))
            }
            None => Err(computed_err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::method::CalculationMethod;
    use chrono::Timelike;
    use pretty_assertions::assert_eq;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn amman_provider() -> AstronomicalProvider {
        AstronomicalProvider::new(
            Coordinates::new(31.9539, 35.9106).unwrap(),
            CalculationMethod::Jordan.parameters(),
        )
    }

    struct FailingProvider;

    impl TimingsProvider for FailingProvider {
        fn name(&self) -> &str {
            "failing"
        }

        fn timings_for(&self, date: NaiveDate) -> Result<DailyTimings, PrayerError> {
            Err(PrayerError::DataSource(format!("offline on {date}")))
        }
    }

    const DAY_PAYLOAD: &str = r#"{
        "code": 200,
        "status": "OK",
        "data": {
            "timings": {
                "Fajr": "04:12 (+03)",
                "Sunrise": "05:40 (+03)",
                "Dhuhr": "12:36 (+03)",
                "Asr": "16:19 (+03)",
                "Sunset": "19:32 (+03)",
                "Maghrib": "19:37 (+03)",
                "Isha": "21:05 (+03)",
                "Imsak": "04:02 (+03)",
                "Midnight": "00:36 (+03)"
            },
            "date": {
                "readable": "01 Jun 2024",
                "gregorian": { "date": "01-06-2024", "format": "DD-MM-YYYY" },
                "hijri": { "date": "24-11-1445" }
            }
        }
    }"#;

    #[test]
    fn test_parse_clock_time() {
        assert_eq!(parse_clock_time("04:12").unwrap(), NaiveTime::from_hms_opt(4, 12, 0).unwrap());
        assert_eq!(
            parse_clock_time("21:05 (EEST)").unwrap(),
            NaiveTime::from_hms_opt(21, 5, 0).unwrap()
        );
        assert!(parse_clock_time("4:12").is_err());
        assert!(parse_clock_time("25:00").is_err());
        assert!(parse_clock_time("").is_err());
        assert!(parse_clock_time("ab:cd").is_err());
    }

    #[test]
    fn test_aladhan_day_payload() {
        let provider = StaticTimingsProvider::from_aladhan_day(DAY_PAYLOAD, chrono_tz::Asia::Amman).unwrap();
        let timings = provider.timings_for(date(2024, 6, 1)).unwrap();
        // Amman is UTC+3
        assert_eq!(timings.fajr.hour(), 1);
        assert_eq!(timings.fajr.minute(), 12);
        assert_eq!(timings.isha.hour(), 18);
        assert_eq!(timings.hijri_date.as_deref(), Some("24-11-1445"));
        assert!(provider.timings_for(date(2024, 6, 2)).is_err());
    }

    #[test]
    fn test_aladhan_error_code_rejected() {
        let payload = DAY_PAYLOAD.replace("\"code\": 200", "\"code\": 400");
        let err = StaticTimingsProvider::from_aladhan_day(&payload, chrono_tz::Asia::Amman).unwrap_err();
        assert!(matches!(err, PrayerError::DataSource(_)));
    }

    #[test]
    fn test_aladhan_calendar_payload() {
        let day = |d: u32, fajr: &str| {
            format!(
                r#"{{"timings": {{"Fajr": "{fajr}", "Sunrise": "05:40", "Dhuhr": "12:36",
                "Asr": "16:19", "Maghrib": "19:37", "Isha": "21:05"}},
                "date": {{"gregorian": {{"date": "{d:02}-06-2024"}}}}}}"#
            )
        };
        let payload = format!(
            r#"{{"code": 200, "data": [{}, {}]}}"#,
            day(1, "04:12"),
            day(2, "04:11")
        );
        let provider = StaticTimingsProvider::from_aladhan_calendar(&payload, chrono_tz::Asia::Amman).unwrap();
        assert_eq!(provider.len(), 2);
        assert_eq!(provider.timings_for(date(2024, 6, 2)).unwrap().fajr.minute(), 11);
    }

    #[test]
    fn test_malformed_time_rejected() {
        let payload = DAY_PAYLOAD.replace("04:12 (+03)", "4:12");
        let err = StaticTimingsProvider::from_aladhan_day(&payload, chrono_tz::Asia::Amman).unwrap_err();
        assert!(matches!(err, PrayerError::InvalidTime(_)));
    }

    #[test]
    fn test_day_cache_insert_get_prune() {
        let provider = amman_provider();
        let mut cache = DayCache::new(30);
        for d in [date(2024, 5, 1), date(2024, 6, 1), date(2024, 5, 20)] {
            cache.insert(provider.timings_for(d).unwrap());
        }
        cache.insert(provider.timings_for(date(2024, 6, 1)).unwrap());
        assert_eq!(cache.len(), 3);
        assert!(cache.get(date(2024, 5, 20)).is_some());
        assert_eq!(cache.nearest(date(2024, 5, 25)).unwrap().date, date(2024, 5, 20));
        assert!(cache.nearest(date(2024, 4, 1)).is_none());

        cache.prune(date(2024, 6, 10));
        assert_eq!(cache.len(), 2);
        assert!(cache.get(date(2024, 5, 1)).is_none());
    }

    #[test]
    fn test_day_cache_json_round_trip() {
        let mut cache = DayCache::default();
        cache.insert(amman_provider().timings_for(date(2024, 6, 1)).unwrap());
        let json = cache.to_json().unwrap();
        let restored = DayCache::from_json(&json).unwrap();
        assert_eq!(restored.get(date(2024, 6, 1)), cache.get(date(2024, 6, 1)));
    }

    #[test]
    fn test_fallback_live_then_cached() {
        let provider = StaticTimingsProvider::from_aladhan_day(DAY_PAYLOAD, chrono_tz::Asia::Amman).unwrap();
        let mut source = FallbackSource::new(Box::new(provider), amman_provider());
        let (timings, freshness) = source.timings_for(date(2024, 6, 1)).unwrap();
        assert_eq!(freshness, Freshness::Live);
        assert_eq!(source.cache().len(), 1);

        let cache = source.cache().clone();
        let mut offline = FallbackSource::with_cache(Box::new(FailingProvider), amman_provider(), cache);
        let (cached, freshness) = offline.timings_for(date(2024, 6, 1)).unwrap();
        assert_eq!(freshness, Freshness::Cached);
        assert_eq!(cached, timings);
        assert!(freshness.is_degraded());
    }

    #[test]
    fn test_fallback_prefers_computation_over_older_cached_day() {
        let london = AstronomicalProvider::new(
            Coordinates::new(51.5074, -0.1278).unwrap(),
            CalculationMethod::MuslimWorldLeague.parameters(),
        );
        let mut cache = DayCache::default();
        cache.insert(london.timings_for(date(2024, 3, 1)).unwrap());
        let mut offline = FallbackSource::with_cache(Box::new(FailingProvider), london.clone(), cache);

        let (timings, freshness) = offline.timings_for(date(2024, 3, 30)).unwrap();
        assert_eq!(freshness, Freshness::Computed);
        assert_eq!(timings, london.timings_for(date(2024, 3, 30)).unwrap());
    }

    #[test]
    fn test_fallback_shifts_cached_day_when_computation_fails() {
        // Midnight sun: the sun never sets in June at 80N
        let polar = AstronomicalProvider::new(
            Coordinates::new(80.0, 15.0).unwrap(),
            CalculationMethod::MuslimWorldLeague.parameters(),
        );
        let cached = amman_provider().timings_for(date(2024, 6, 1)).unwrap();
        let mut cache = DayCache::default();
        cache.insert(cached.clone());
        let mut offline = FallbackSource::with_cache(Box::new(FailingProvider), polar.clone(), cache);

        let (stale, freshness) = offline.timings_for(date(2024, 6, 3)).unwrap();
        assert_eq!(freshness, Freshness::Stale);
        assert_eq!(stale.fajr - cached.fajr, Duration::days(2));

        // Nothing cached on or before the date: the computation error surfaces
        let mut empty = FallbackSource::new(Box::new(FailingProvider), polar);
        assert!(matches!(
            empty.timings_for(date(2024, 6, 3)),
            Err(PrayerError::Unresolvable { .. })
        ));
    }

    #[test]
    fn test_fallback_computes_when_cache_empty() {
        let mut source = FallbackSource::new(Box::new(FailingProvider), amman_provider());
        let (timings, freshness) = source.timings_for(date(2024, 6, 1)).unwrap();
        assert_eq!(freshness, Freshness::Computed);
        assert!(timings.fajr < timings.isha);
    }

    #[test]
    fn test_astronomical_source_is_live() {
        let mut source = FallbackSource::astronomical(amman_provider());
        let (_, freshness) = source.timings_for(date(2024, 6, 1)).unwrap();
        assert_eq!(freshness, Freshness::Live);
        assert!(!freshness.is_degraded());
        assert!(source.cache().is_empty());
    }

    #[test]
    fn test_set_computed_drops_cache() {
        let provider = StaticTimingsProvider::from_aladhan_day(DAY_PAYLOAD, chrono_tz::Asia::Amman).unwrap();
        let mut source = FallbackSource::new(Box::new(provider), amman_provider());
        source.timings_for(date(2024, 6, 1)).unwrap();
        assert_eq!(source.cache().len(), 1);

        let makkah = AstronomicalProvider::new(
            Coordinates::new(21.4225, 39.8262).unwrap(),
            CalculationMethod::UmmAlQura.parameters(),
        );
        source.set_computed(makkah.clone());
        assert!(source.cache().is_empty());
        let (timings, freshness) = source.timings_for(date(2024, 6, 2)).unwrap();
        assert_eq!(freshness, Freshness::Computed);
        assert_eq!(timings, makkah.timings_for(date(2024, 6, 2)).unwrap());
    }
}
