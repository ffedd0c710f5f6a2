//! Display phases and the scheduler's observable state

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::types::Prayer;

/// What the display is showing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// Main clock view
    #[default]
    Idle,
    /// The call to prayer is playing
    Adhan,
    /// Counting down to the iqama
    IqamaCountdown,
    /// Reminder to silence phones
    PhoneReminder,
    /// Post-prayer remembrance texts
    Remembrance,
}

impl Phase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Idle => "idle",
            Phase::Adhan => "adhan",
            Phase::IqamaCountdown => "iqama_countdown",
            Phase::PhoneReminder => "phone_reminder",
            Phase::Remembrance => "remembrance",
        }
    }

    pub fn is_idle(&self) -> bool {
        matches!(self, Phase::Idle)
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Single-slot runtime state; at most one prayer is active at a time
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PhaseSchedule {
    pub current_phase: Phase,
    pub active_prayer: Option<Prayer>,
    /// When the current phase (or remembrance text) is due to end
    pub phase_end: Option<DateTime<Utc>>,
    pub remembrance_index: usize,
    /// Remembrance list exhausted, holding the last text before going idle
    #[serde(default)]
    pub trailing_pause: bool,
}

impl PhaseSchedule {
    pub fn idle() -> Self {
        Self::default()
    }

    /// Time left in the current phase, clamped at zero
    pub fn remaining(&self, now: DateTime<Utc>) -> Option<Duration> {
        self.phase_end
            .map(|end| (end - now).max(Duration::zero()))
    }
}

/// A phase change observed during a tick
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhaseTransition {
    pub from: Phase,
    pub to: Phase,
    pub prayer: Option<Prayer>,
    pub at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_phase_serde_names() {
        assert_eq!(
            serde_json::to_string(&Phase::IqamaCountdown).unwrap(),
            "\"iqama_countdown\""
        );
        assert_eq!(Phase::PhoneReminder.to_string(), "phone_reminder");
    }

    #[test]
    fn test_remaining_clamps_at_zero() {
        let end = Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap();
        let schedule = PhaseSchedule {
            current_phase: Phase::IqamaCountdown,
            active_prayer: Some(Prayer::Dhuhr),
            phase_end: Some(end),
            remembrance_index: 0,
            trailing_pause: false,
        };
        assert_eq!(schedule.remaining(end - Duration::seconds(90)), Some(Duration::seconds(90)));
        assert_eq!(schedule.remaining(end + Duration::seconds(5)), Some(Duration::zero()));
        assert_eq!(PhaseSchedule::idle().remaining(end), None);
    }
}
