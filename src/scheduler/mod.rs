//! Prayer phase scheduler
//!
//! A poll-driven state machine deciding what the display shows:
//!
//! ```text
//! idle -> adhan -> iqama_countdown -> phone_reminder -> remembrance -> idle
//! ```
//!
//! The caller samples the clock and calls [`PhaseScheduler::tick`] with the
//! current instant and today's timings. A prayer starts when the clock falls
//! within a short window at the start of its minute while the scheduler is
//! idle. Every phase end is an absolute instant, so a tick arriving late
//! (suspended process, clock jump) catches up against the current instant
//! instead of replaying a stale phase.

pub mod audio;
pub mod phase;
pub mod remembrance;

use chrono::{DateTime, Duration, Utc};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

pub use audio::{
    AudioError, AudioPlayer, ChannelPlayback, Playback, PlaybackEvent, PlaybackStatus, SilentPlayer,
};
pub use phase::{Phase, PhaseSchedule, PhaseTransition};

use crate::error::PrayerError;
use crate::source::DailyTimings;
use crate::types::{duration_seconds, Prayer};

/// Remembrance slot used when the configured total is zero
pub const DEFAULT_REMEMBRANCE_SLOT_SECONDS: i64 = 15;

/// Upper bound for any configured phase length or iqama wait
pub const MAX_PHASE_HOURS: i64 = 24;

/// Gap between ticks reported as a clock jump
const CLOCK_JUMP_SECONDS: i64 = 5;

/// Minutes between the adhan and the iqama, per prayer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IqamaWaits {
    pub fajr: u32,
    pub dhuhr: u32,
    pub asr: u32,
    pub maghrib: u32,
    pub isha: u32,
}

impl Default for IqamaWaits {
    fn default() -> Self {
        Self {
            fajr: 20,
            dhuhr: 15,
            asr: 15,
            maghrib: 10,
            isha: 15,
        }
    }
}

impl IqamaWaits {
    pub fn get(&self, prayer: Prayer) -> u32 {
        match prayer {
            Prayer::Fajr => self.fajr,
            Prayer::Sunrise => 0,
            Prayer::Dhuhr => self.dhuhr,
            Prayer::Asr => self.asr,
            Prayer::Maghrib => self.maghrib,
            Prayer::Isha => self.isha,
        }
    }

    pub fn set(&mut self, prayer: Prayer, minutes: u32) {
        match prayer {
            Prayer::Fajr => self.fajr = minutes,
            Prayer::Sunrise => {}
            Prayer::Dhuhr => self.dhuhr = minutes,
            Prayer::Asr => self.asr = minutes,
            Prayer::Maghrib => self.maghrib = minutes,
            Prayer::Isha => self.isha = minutes,
        }
    }
}

/// Durations and audio sources driving the phase cycle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PhaseSettings {
    pub iqama_wait_minutes: IqamaWaits,
    /// Adhan length when no audio completion is available
    #[serde(with = "duration_seconds")]
    pub adhan_duration: Duration,
    /// Extra time granted to audio before the adhan is forced to end
    #[serde(with = "duration_seconds")]
    pub adhan_grace: Duration,
    /// Phone reminder display time; zero skips the phase
    #[serde(with = "duration_seconds")]
    pub phone_reminder: Duration,
    /// Total remembrance display time, split evenly across the texts
    #[serde(with = "duration_seconds")]
    pub remembrance_duration: Duration,
    /// Pause on the last text before returning to idle
    #[serde(with = "duration_seconds")]
    pub remembrance_pause: Duration,
    /// Tolerance after the start of a prayer's minute in which it triggers
    #[serde(with = "duration_seconds")]
    pub trigger_window: Duration,
    pub adhan_sound: Option<String>,
    /// Fajr-specific adhan, falls back to `adhan_sound`
    pub fajr_adhan_sound: Option<String>,
    pub muted: bool,
    pub remembrance_texts: Vec<String>,
}

impl Default for PhaseSettings {
    fn default() -> Self {
        Self {
            iqama_wait_minutes: IqamaWaits::default(),
            adhan_duration: Duration::seconds(3 * 60 + 14),
            adhan_grace: Duration::seconds(10),
            phone_reminder: Duration::minutes(2),
            remembrance_duration: Duration::minutes(5),
            remembrance_pause: Duration::seconds(2),
            trigger_window: Duration::seconds(3),
            adhan_sound: None,
            fajr_adhan_sound: None,
            muted: false,
            remembrance_texts: remembrance::default_texts(),
        }
    }
}

impl PhaseSettings {
    pub fn validate(&self) -> Result<(), PrayerError> {
        let durations = [
            ("adhan_duration", self.adhan_duration),
            ("adhan_grace", self.adhan_grace),
            ("phone_reminder", self.phone_reminder),
            ("remembrance_duration", self.remembrance_duration),
            ("remembrance_pause", self.remembrance_pause),
            ("trigger_window", self.trigger_window),
        ];
        for (name, duration) in durations {
            if duration < Duration::zero() {
                return Err(PrayerError::InvalidConfig(format!("{name} must not be negative")));
            }
            if duration > Duration::hours(MAX_PHASE_HOURS) {
                return Err(PrayerError::InvalidConfig(format!(
                    "{name} must not exceed {MAX_PHASE_HOURS} hours"
                )));
            }
        }
        if let Some(prayer) = Prayer::ALL
            .into_iter()
            .find(|p| i64::from(self.iqama_wait_minutes.get(*p)) > MAX_PHASE_HOURS * 60)
        {
            return Err(PrayerError::InvalidConfig(format!(
                "iqama wait for {prayer} must not exceed {MAX_PHASE_HOURS} hours"
            )));
        }
        if self.trigger_window >= Duration::minutes(1) {
            return Err(PrayerError::InvalidConfig(
                "trigger_window must be shorter than a minute".to_string(),
            ));
        }
        Ok(())
    }

    /// How long each remembrance text stays on screen
    pub fn remembrance_slot(&self) -> Duration {
        let count = self.remembrance_texts.len().max(1) as i32;
        if self.remembrance_duration <= Duration::zero() {
            Duration::seconds(DEFAULT_REMEMBRANCE_SLOT_SECONDS)
        } else {
            self.remembrance_duration / count
        }
    }

    /// Audio source for a prayer's adhan, if any is configured
    pub fn adhan_source_for(&self, prayer: Prayer) -> Option<String> {
        let configured = match prayer {
            Prayer::Fajr => self.fajr_adhan_sound.as_deref().or(self.adhan_sound.as_deref()),
            _ => self.adhan_sound.as_deref(),
        };
        configured
            .map(str::trim)
            .filter(|s| !s.is_empty() && !s.eq_ignore_ascii_case("none"))
            .map(str::to_string)
    }
}

/// Phase state machine driven by explicit clock samples
pub struct PhaseScheduler {
    settings: PhaseSettings,
    state: PhaseSchedule,
    player: Box<dyn AudioPlayer>,
    playback: Option<Box<dyn Playback>>,
    adhan_deadline: Option<DateTime<Utc>>,
    last_trigger: Option<DateTime<Utc>>,
    last_dropped: Option<DateTime<Utc>>,
    last_tick: Option<DateTime<Utc>>,
}

impl Default for PhaseScheduler {
    fn default() -> Self {
        Self::new(PhaseSettings::default())
    }
}

impl PhaseScheduler {
    /// Scheduler without audio output; adhan phases run on their timer
    pub fn new(settings: PhaseSettings) -> Self {
        Self::with_player(settings, Box::new(SilentPlayer))
    }

    pub fn with_player(settings: PhaseSettings, player: Box<dyn AudioPlayer>) -> Self {
        Self {
            settings,
            state: PhaseSchedule::idle(),
            player,
            playback: None,
            adhan_deadline: None,
            last_trigger: None,
            last_dropped: None,
            last_tick: None,
        }
    }

    pub fn state(&self) -> &PhaseSchedule {
        &self.state
    }

    pub fn phase(&self) -> Phase {
        self.state.current_phase
    }

    pub fn settings(&self) -> &PhaseSettings {
        &self.settings
    }

    /// Swap settings; the active phase keeps its end instant
    pub fn set_settings(&mut self, settings: PhaseSettings) {
        self.settings = settings;
    }

    pub fn remaining(&self, now: DateTime<Utc>) -> Option<Duration> {
        self.state.remaining(now)
    }

    /// Text currently shown during the remembrance phase
    pub fn remembrance_text(&self) -> Option<&str> {
        if self.state.current_phase != Phase::Remembrance {
            return None;
        }
        self.settings
            .remembrance_texts
            .get(self.state.remembrance_index)
            .map(String::as_str)
    }

    /// Advance the machine to `now` and report the phase changes made
    pub fn tick(&mut self, now: DateTime<Utc>, today: &DailyTimings) -> Vec<PhaseTransition> {
        let mut transitions = Vec::new();
        self.note_clock_gap(now);
        self.poll_playback(now, &mut transitions);

        while let Some(end) = self.due_end() {
            if now < end {
                break;
            }
            if self.state.current_phase == Phase::Adhan && self.playback.is_some() {
                warn!("adhan audio still playing at {end}, forcing transition");
            }
            self.advance(end, &mut transitions);
        }

        if self.state.current_phase.is_idle() {
            let due = today
                .salah()
                .find(|(_, at)| self.in_trigger_window(*at, now) && self.last_trigger != Some(*at));
            if let Some((prayer, at)) = due {
                self.start_adhan(prayer, at, now, &mut transitions);
            }
        } else {
            self.note_dropped_triggers(now, today);
        }

        transitions
    }

    /// Advance one phase immediately; remembrance skips to idle
    pub fn skip(&mut self, now: DateTime<Utc>) -> Vec<PhaseTransition> {
        let mut transitions = Vec::new();
        match self.state.current_phase {
            Phase::Idle => {}
            Phase::Remembrance => self.transition(Phase::Idle, None, now, &mut transitions),
            _ => self.advance(now, &mut transitions),
        }
        if let Some(t) = transitions.first() {
            info!("skipped {} for {:?}", t.from, t.prayer);
        }
        transitions
    }

    /// Abort the active cycle and return to idle
    pub fn reset(&mut self, now: DateTime<Utc>) -> Vec<PhaseTransition> {
        let mut transitions = Vec::new();
        self.stop_playback();
        if !self.state.current_phase.is_idle() {
            self.transition(Phase::Idle, None, now, &mut transitions);
        }
        transitions
    }

    fn note_clock_gap(&mut self, now: DateTime<Utc>) {
        if let Some(last) = self.last_tick {
            let gap = now - last;
            if gap > Duration::seconds(CLOCK_JUMP_SECONDS) {
                warn!("clock advanced {}s since last tick, catching up", gap.num_seconds());
            } else if gap < -Duration::seconds(1) {
                warn!("clock moved back {}s", -gap.num_seconds());
            }
        }
        self.last_tick = Some(now);
    }

    fn in_trigger_window(&self, at: DateTime<Utc>, now: DateTime<Utc>) -> bool {
        let start = minute_start(at);
        now >= start && now <= start + self.settings.trigger_window
    }

    fn note_dropped_triggers(&mut self, now: DateTime<Utc>, today: &DailyTimings) {
        let dropped = today.salah().find(|(_, at)| {
            self.in_trigger_window(*at, now)
                && self.last_trigger != Some(*at)
                && self.last_dropped != Some(*at)
        });
        if let Some((prayer, at)) = dropped {
            warn!(
                "{prayer} reached while {} is active for {:?}, not queued",
                self.state.current_phase, self.state.active_prayer
            );
            self.last_dropped = Some(at);
        }
    }

    /// Instant at which the current phase must be advanced
    fn due_end(&self) -> Option<DateTime<Utc>> {
        if self.state.current_phase == Phase::Adhan && self.playback.is_some() {
            self.adhan_deadline
        } else {
            self.state.phase_end
        }
    }

    fn poll_playback(&mut self, now: DateTime<Utc>, transitions: &mut Vec<PhaseTransition>) {
        let Some(playback) = self.playback.as_mut() else {
            return;
        };
        match playback.poll() {
            PlaybackStatus::Playing => {}
            PlaybackStatus::Finished => {
                // Completion seen after a suspension ended no later than the deadline
                let at = self.adhan_deadline.map_or(now, |deadline| now.min(deadline));
                debug!("adhan audio finished by {at}");
                self.playback = None;
                if self.state.current_phase == Phase::Adhan {
                    self.advance(at, transitions);
                }
            }
            PlaybackStatus::Failed(e) => {
                warn!("adhan playback failed: {e}, continuing on timer");
                self.playback = None;
            }
        }
    }

    fn start_adhan(
        &mut self,
        prayer: Prayer,
        at: DateTime<Utc>,
        now: DateTime<Utc>,
        transitions: &mut Vec<PhaseTransition>,
    ) {
        info!("{prayer} time reached ({at}), starting adhan");
        self.last_trigger = Some(at);
        self.state.active_prayer = Some(prayer);
        self.state.remembrance_index = 0;
        self.state.trailing_pause = false;
        self.transition(
            Phase::Adhan,
            Some(now + self.settings.adhan_duration),
            now,
            transitions,
        );

        if self.settings.muted {
            debug!("muted, adhan runs on its timer");
            return;
        }
        let Some(source) = self.settings.adhan_source_for(prayer) else {
            return;
        };
        match self.player.play(&source) {
            Ok(playback) => {
                self.playback = Some(playback);
                self.adhan_deadline =
                    Some(now + self.settings.adhan_duration + self.settings.adhan_grace);
            }
            Err(e) => warn!("cannot play adhan '{source}': {e}"),
        }
    }

    fn stop_playback(&mut self) {
        if let Some(mut playback) = self.playback.take() {
            playback.stop();
        }
        self.adhan_deadline = None;
    }

    fn advance(&mut self, at: DateTime<Utc>, transitions: &mut Vec<PhaseTransition>) {
        match self.state.current_phase {
            Phase::Idle => {}
            Phase::Adhan => {
                self.stop_playback();
                self.enter_iqama(at, transitions);
            }
            Phase::IqamaCountdown => self.enter_phone_reminder(at, transitions),
            Phase::PhoneReminder => self.enter_remembrance(at, transitions),
            Phase::Remembrance => self.next_remembrance(at, transitions),
        }
    }

    fn enter_iqama(&mut self, at: DateTime<Utc>, transitions: &mut Vec<PhaseTransition>) {
        let wait = self
            .state
            .active_prayer
            .map(|p| self.settings.iqama_wait_minutes.get(p))
            .unwrap_or(0);
        if wait == 0 {
            self.enter_phone_reminder(at, transitions);
        } else {
            let end = at + Duration::minutes(i64::from(wait));
            self.transition(Phase::IqamaCountdown, Some(end), at, transitions);
        }
    }

    fn enter_phone_reminder(&mut self, at: DateTime<Utc>, transitions: &mut Vec<PhaseTransition>) {
        if self.settings.phone_reminder <= Duration::zero() {
            self.enter_remembrance(at, transitions);
        } else {
            let end = at + self.settings.phone_reminder;
            self.transition(Phase::PhoneReminder, Some(end), at, transitions);
        }
    }

    fn enter_remembrance(&mut self, at: DateTime<Utc>, transitions: &mut Vec<PhaseTransition>) {
        if self.settings.remembrance_texts.is_empty() {
            self.transition(Phase::Idle, None, at, transitions);
            return;
        }
        self.state.remembrance_index = 0;
        self.state.trailing_pause = false;
        let end = at + self.settings.remembrance_slot();
        self.transition(Phase::Remembrance, Some(end), at, transitions);
    }

    fn next_remembrance(&mut self, at: DateTime<Utc>, transitions: &mut Vec<PhaseTransition>) {
        if self.state.trailing_pause {
            self.transition(Phase::Idle, None, at, transitions);
            return;
        }
        let next = self.state.remembrance_index + 1;
        if next >= self.settings.remembrance_texts.len() {
            self.state.trailing_pause = true;
            self.state.phase_end = Some(at + self.settings.remembrance_pause);
        } else {
            self.state.remembrance_index = next;
            self.state.phase_end = Some(at + self.settings.remembrance_slot());
        }
    }

    fn transition(
        &mut self,
        to: Phase,
        end: Option<DateTime<Utc>>,
        at: DateTime<Utc>,
        transitions: &mut Vec<PhaseTransition>,
    ) {
        let from = self.state.current_phase;
        let prayer = self.state.active_prayer;
        self.state.current_phase = to;
        self.state.phase_end = end;
        if to.is_idle() {
            self.state = PhaseSchedule::idle();
            self.adhan_deadline = None;
        }
        debug!("phase {from} -> {to} at {at} ({prayer:?})");
        transitions.push(PhaseTransition {
            from,
            to,
            prayer,
            at,
        });
    }
}

fn minute_start(at: DateTime<Utc>) -> DateTime<Utc> {
    DateTime::from_timestamp(at.timestamp().div_euclid(60) * 60, 0).unwrap_or(at)
}
