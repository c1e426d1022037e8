use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use super::TimerConfig;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub enum TimerStatus {
    #[default]
    Idle,
    Running,
    Paused,
    Finished,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum Phase {
    #[default]
    Work,
    Rest,
}

impl Phase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Work => "WORK",
            Phase::Rest => "REST",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum RoundLabel {
    Box,
    Bell,
}

impl RoundLabel {
    pub fn as_str(&self) -> &'static str {
        match self {
            RoundLabel::Box => "BOX",
            RoundLabel::Bell => "BELL",
        }
    }
}

/// Side effect requested by a tick. The driver hands these to an
/// [`AlertSink`](crate::audio::AlertSink) in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Cue {
    Chime,
    Speak(String),
}

/// Formats seconds as `MM:SS`. Minutes are not wrapped into hours.
pub fn format_clock(secs: u32) -> String {
    format!("{:02}:{:02}", secs / 60, secs % 60)
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TimerSnapshot {
    pub session_id: Option<String>,
    pub started_at: Option<DateTime<Utc>>,
    pub status: TimerStatus,
    pub round: u32,
    pub total_rounds: u32,
    pub label: RoundLabel,
    pub phase: Phase,
    pub remaining_secs: u32,
    pub clock: String,
    pub total_remaining_secs: u64,
    pub is_running: bool,
}

impl fmt::Display for TimerSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.status == TimerStatus::Finished {
            return write!(f, "DONE  {} rounds complete", self.total_rounds);
        }
        write!(
            f,
            "ROUND {}/{}  {:<4}  {}  {}",
            self.round,
            self.total_rounds,
            self.label.as_str(),
            self.phase.as_str(),
            self.clock
        )?;
        if self.status == TimerStatus::Paused {
            write!(f, "  (paused)")?;
        }
        Ok(())
    }
}

/// Round/phase state machine for one session. Pure: it never sleeps and
/// never plays sounds, it only reports which cues a tick produced.
#[derive(Debug, Clone)]
pub struct TimerState {
    config: TimerConfig,
    pub status: TimerStatus,
    pub round: u32,
    pub phase: Phase,
    pub remaining_secs: u32,
    pub session_id: Option<String>,
    pub started_at: Option<DateTime<Utc>>,
}

impl TimerState {
    pub fn new(config: TimerConfig) -> Result<Self> {
        config.validate()?;
        let remaining_secs = config.work_secs;
        Ok(Self {
            config,
            status: TimerStatus::Idle,
            round: 1,
            phase: Phase::Work,
            remaining_secs,
            session_id: None,
            started_at: None,
        })
    }

    pub fn config(&self) -> &TimerConfig {
        &self.config
    }

    pub fn is_running(&self) -> bool {
        self.status == TimerStatus::Running
    }

    /// Returns true when the call moved the timer into `Running`.
    pub fn start(&mut self) -> bool {
        match self.status {
            TimerStatus::Idle => {
                self.session_id = Some(Uuid::new_v4().to_string());
                self.started_at = Some(Utc::now());
                self.status = TimerStatus::Running;
                true
            }
            TimerStatus::Paused => {
                self.status = TimerStatus::Running;
                true
            }
            TimerStatus::Running | TimerStatus::Finished => false,
        }
    }

    /// Returns true when the call stopped a running countdown.
    pub fn pause(&mut self) -> bool {
        if self.status == TimerStatus::Running {
            self.status = TimerStatus::Paused;
            true
        } else {
            false
        }
    }

    pub fn reset(&mut self) {
        self.status = TimerStatus::Idle;
        self.round = 1;
        self.phase = Phase::Work;
        self.remaining_secs = self.config.work_secs;
        self.session_id = None;
        self.started_at = None;
    }

    /// Advances the countdown by one second. No-op unless running.
    pub fn tick(&mut self) -> Vec<Cue> {
        let mut cues = Vec::new();
        if self.status != TimerStatus::Running {
            return cues;
        }

        let remaining = self.remaining_secs.saturating_sub(1);
        if remaining > 0 {
            self.remaining_secs = remaining;
            if self.phase == Phase::Work && self.config.alert_marks.contains(&remaining) {
                cues.push(Cue::Chime);
            }
            return cues;
        }

        match self.phase {
            Phase::Work => {
                self.phase = Phase::Rest;
                self.remaining_secs = self.config.rest_secs;
                cues.push(Cue::Chime);
            }
            Phase::Rest => {
                let next = self.round + 1;
                if next > self.config.rounds {
                    self.status = TimerStatus::Finished;
                    self.remaining_secs = 0;
                    cues.push(Cue::Chime);
                } else {
                    self.round = next;
                    self.phase = Phase::Work;
                    self.remaining_secs = self.config.work_secs;
                    if self.config.transition_round() == Some(next) {
                        cues.push(Cue::Speak(self.config.transition_phrase.clone()));
                    }
                    cues.push(Cue::Chime);
                }
            }
        }
        cues
    }

    pub fn label(&self) -> RoundLabel {
        if self.config.is_box_round(self.round) {
            RoundLabel::Box
        } else {
            RoundLabel::Bell
        }
    }

    /// Seconds left across the whole session, counting the current phase.
    pub fn total_remaining_secs(&self) -> u64 {
        if self.status == TimerStatus::Finished {
            return 0;
        }
        let work = u64::from(self.config.work_secs);
        let rest = u64::from(self.config.rest_secs);
        let rounds_after = u64::from(self.config.rounds - self.round);
        let phase_tail = match self.phase {
            Phase::Work => rest,
            Phase::Rest => 0,
        };
        u64::from(self.remaining_secs) + phase_tail + rounds_after * (work + rest)
    }

    pub fn snapshot(&self) -> TimerSnapshot {
        TimerSnapshot {
            session_id: self.session_id.clone(),
            started_at: self.started_at,
            status: self.status,
            round: self.round,
            total_rounds: self.config.rounds,
            label: self.label(),
            phase: self.phase,
            remaining_secs: self.remaining_secs,
            clock: format_clock(self.remaining_secs),
            total_remaining_secs: self.total_remaining_secs(),
            is_running: self.is_running(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn running(config: TimerConfig) -> TimerState {
        let mut state = TimerState::new(config).unwrap();
        assert!(state.start());
        state
    }

    fn advance(state: &mut TimerState, ticks: u32) -> Vec<Cue> {
        (0..ticks).flat_map(|_| state.tick()).collect()
    }

    fn speak_count(cues: &[Cue]) -> usize {
        cues.iter().filter(|cue| matches!(cue, Cue::Speak(_))).count()
    }

    #[test]
    fn starts_idle_on_first_round_of_work() {
        let state = TimerState::new(TimerConfig::default()).unwrap();
        assert_eq!(state.status, TimerStatus::Idle);
        assert_eq!(state.round, 1);
        assert_eq!(state.phase, Phase::Work);
        assert_eq!(state.remaining_secs, 180);
        assert!(state.session_id.is_none());
    }

    #[test]
    fn rejects_invalid_config() {
        assert!(TimerState::new(TimerConfig::new(2, 3, 10, 10)).is_err());
    }

    #[test]
    fn ticks_are_ignored_unless_running() {
        let mut state = TimerState::new(TimerConfig::default()).unwrap();
        assert!(state.tick().is_empty());
        assert_eq!(state.remaining_secs, 180);
    }

    #[test]
    fn default_session_walkthrough() {
        let mut state = running(TimerConfig::default());

        advance(&mut state, 180);
        assert_eq!((state.round, state.phase, state.remaining_secs), (1, Phase::Rest, 60));

        advance(&mut state, 60);
        assert_eq!((state.round, state.phase, state.remaining_secs), (2, Phase::Work, 180));

        let cues = advance(&mut state, 5 * 240 - 240);
        assert_eq!(state.round, 6);
        assert_eq!(state.phase, Phase::Work);
        assert_eq!(speak_count(&cues), 1);

        let cues = advance(&mut state, 5 * 240);
        assert_eq!(speak_count(&cues), 0);
        assert_eq!(state.status, TimerStatus::Finished);
        assert!(!state.is_running());
        assert_eq!(state.remaining_secs, 0);
        assert_eq!(state.round, 10);

        assert!(advance(&mut state, 10).is_empty());
        assert_eq!(state.status, TimerStatus::Finished);
        assert_eq!(state.remaining_secs, 0);
    }

    #[test]
    fn session_length_matches_config() {
        for (rounds, box_rounds, work, rest) in [(1, 0, 5, 5), (3, 1, 2, 1), (4, 4, 1, 3), (7, 2, 9, 4)] {
            let config = TimerConfig::new(rounds, box_rounds, work, rest);
            let total = config.total_secs() as u32;
            let mut state = running(config);
            for _ in 0..total - 1 {
                state.tick();
                assert!(state.round <= rounds);
                assert_eq!(state.status, TimerStatus::Running);
            }
            state.tick();
            assert_eq!(state.status, TimerStatus::Finished);
        }
    }

    #[test]
    fn single_round_scenario() {
        let mut state = running(TimerConfig::new(1, 0, 5, 5));
        let work_cues = advance(&mut state, 5);
        assert_eq!((state.phase, state.remaining_secs), (Phase::Rest, 5));
        assert_eq!(work_cues, vec![Cue::Chime]);
        let rest_cues = advance(&mut state, 5);
        assert_eq!(state.status, TimerStatus::Finished);
        assert_eq!(rest_cues, vec![Cue::Chime]);
    }

    #[test]
    fn labels_partition_rounds() {
        let mut state = running(TimerConfig::new(4, 2, 1, 1));
        let mut labels = vec![state.label()];
        while state.round < 4 {
            state.tick();
            state.tick();
            labels.push(state.label());
        }
        assert_eq!(
            labels,
            vec![RoundLabel::Box, RoundLabel::Box, RoundLabel::Bell, RoundLabel::Bell]
        );
    }

    #[test]
    fn alerts_only_at_marks_during_work() {
        let mut state = running(TimerConfig::default());
        let mut chimes_at = Vec::new();
        for _ in 0..179 {
            if state.tick().contains(&Cue::Chime) {
                chimes_at.push(state.remaining_secs);
            }
        }
        assert_eq!(chimes_at, vec![120, 60]);

        // the 180th tick ends the phase
        assert_eq!(state.tick(), vec![Cue::Chime]);
        assert_eq!(state.phase, Phase::Rest);

        // rest phase is silent until it elapses, even when passing 60/120 values
        let cues = advance(&mut state, 59);
        assert!(cues.is_empty());
    }

    #[test]
    fn transition_cue_speaks_before_chime() {
        let mut state = running(TimerConfig::new(3, 1, 1, 1));
        advance(&mut state, 1);
        let cues = state.tick();
        assert_eq!(state.round, 2);
        assert_eq!(
            cues,
            vec![Cue::Speak("Switch to kettlebell".to_string()), Cue::Chime]
        );
    }

    #[test]
    fn pause_is_idempotent_and_resumes_exactly() {
        let mut reference = running(TimerConfig::default());
        let mut paused = running(TimerConfig::default());

        advance(&mut reference, 51);

        advance(&mut paused, 50);
        assert!(paused.pause());
        let before = (paused.round, paused.phase, paused.remaining_secs);
        assert!(!paused.pause());
        assert!(paused.tick().is_empty());
        assert_eq!((paused.round, paused.phase, paused.remaining_secs), before);
        assert_eq!(paused.status, TimerStatus::Paused);

        let session = paused.session_id.clone();
        assert!(paused.start());
        assert_eq!(paused.session_id, session);
        paused.tick();

        assert_eq!(
            (paused.round, paused.phase, paused.remaining_secs),
            (reference.round, reference.phase, reference.remaining_secs)
        );
    }

    #[test]
    fn start_is_noop_when_running_or_finished() {
        let mut state = running(TimerConfig::new(1, 0, 1, 1));
        assert!(!state.start());
        advance(&mut state, 2);
        assert_eq!(state.status, TimerStatus::Finished);
        assert!(!state.start());
        assert!(!state.pause());
        assert_eq!(state.status, TimerStatus::Finished);
    }

    #[test]
    fn reset_from_any_state() {
        let mut state = running(TimerConfig::default());
        advance(&mut state, 700);
        state.reset();
        assert_eq!(
            (state.round, state.phase, state.remaining_secs, state.is_running()),
            (1, Phase::Work, 180, false)
        );
        assert!(state.session_id.is_none());

        state.start();
        advance(&mut state, 2400);
        state.reset();
        assert_eq!(state.status, TimerStatus::Idle);
        assert_eq!(state.remaining_secs, 180);

        state.start();
        advance(&mut state, 3);
        state.pause();
        state.reset();
        assert_eq!(state.status, TimerStatus::Idle);
        assert_eq!(state.remaining_secs, 180);
    }

    #[test]
    fn transition_cue_fires_once_per_session_after_reset() {
        let mut state = running(TimerConfig::new(3, 1, 1, 1));
        assert_eq!(speak_count(&advance(&mut state, 6)), 1);
        state.reset();
        state.start();
        assert_eq!(speak_count(&advance(&mut state, 6)), 1);
    }

    #[test]
    fn total_remaining_counts_down_with_ticks() {
        let mut state = running(TimerConfig::new(2, 1, 3, 2));
        assert_eq!(state.total_remaining_secs(), 10);
        for expected in (0..10).rev() {
            state.tick();
            assert_eq!(state.total_remaining_secs(), expected);
        }
    }

    #[test]
    fn snapshot_formats_clock_and_labels() {
        let mut state = running(TimerConfig::default());
        advance(&mut state, 1);
        let snapshot = state.snapshot();
        assert_eq!(snapshot.clock, "02:59");
        assert_eq!(snapshot.label, RoundLabel::Box);
        assert!(snapshot.is_running);
        assert_eq!(snapshot.to_string(), "ROUND 1/10  BOX   WORK  02:59");

        let json = serde_json::to_value(&snapshot).unwrap();
        assert_eq!(json["phase"], "WORK");
        assert_eq!(json["status"], "running");
        assert_eq!(json["remainingSecs"], 179);
    }

    #[test]
    fn clock_format() {
        assert_eq!(format_clock(0), "00:00");
        assert_eq!(format_clock(60), "01:00");
        assert_eq!(format_clock(185), "03:05");
        assert_eq!(format_clock(6000), "100:00");
    }
}
