use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

pub const DEFAULT_ROUNDS: u32 = 10;
pub const DEFAULT_BOX_ROUNDS: u32 = 5;
pub const DEFAULT_WORK_SECS: u32 = 180;
pub const DEFAULT_REST_SECS: u32 = 60;

/// Seconds-remaining marks in a work phase that trigger the alert chime.
/// Absolute values: with a 180s work phase they land on "2 minutes left"
/// and "1 minute left".
pub const DEFAULT_ALERT_MARKS: [u32; 2] = [120, 60];

pub const DEFAULT_TRANSITION_PHRASE: &str = "Switch to kettlebell";

/// Shape of one boxing/kettlebell session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TimerConfig {
    pub rounds: u32,
    /// Leading rounds labelled BOX; rounds after these are BELL.
    pub box_rounds: u32,
    pub work_secs: u32,
    pub rest_secs: u32,
    pub alert_marks: Vec<u32>,
    pub transition_phrase: String,
}

impl Default for TimerConfig {
    fn default() -> Self {
        Self {
            rounds: DEFAULT_ROUNDS,
            box_rounds: DEFAULT_BOX_ROUNDS,
            work_secs: DEFAULT_WORK_SECS,
            rest_secs: DEFAULT_REST_SECS,
            alert_marks: DEFAULT_ALERT_MARKS.to_vec(),
            transition_phrase: DEFAULT_TRANSITION_PHRASE.to_string(),
        }
    }
}

impl TimerConfig {
    pub fn new(rounds: u32, box_rounds: u32, work_secs: u32, rest_secs: u32) -> Self {
        Self {
            rounds,
            box_rounds,
            work_secs,
            rest_secs,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.rounds == 0 {
            bail!("rounds must be greater than zero");
        }
        if self.box_rounds > self.rounds {
            bail!(
                "box rounds ({}) cannot exceed total rounds ({})",
                self.box_rounds,
                self.rounds
            );
        }
        if self.work_secs == 0 {
            bail!("work duration must be greater than zero");
        }
        if self.rest_secs == 0 {
            bail!("rest duration must be greater than zero");
        }
        Ok(())
    }

    /// Seconds needed to run every round to completion.
    pub fn total_secs(&self) -> u64 {
        u64::from(self.rounds) * (u64::from(self.work_secs) + u64::from(self.rest_secs))
    }

    /// True when `round` falls in the boxing block.
    pub fn is_box_round(&self, round: u32) -> bool {
        round <= self.box_rounds
    }

    /// The round whose start triggers the spoken switch cue, if the session
    /// actually contains both blocks.
    pub fn transition_round(&self) -> Option<u32> {
        let next = self.box_rounds.checked_add(1)?;
        (self.box_rounds > 0 && next <= self.rounds).then_some(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_hybrid_format() {
        let config = TimerConfig::default();
        assert_eq!(config.rounds, 10);
        assert_eq!(config.box_rounds, 5);
        assert_eq!(config.work_secs, 180);
        assert_eq!(config.rest_secs, 60);
        assert_eq!(config.alert_marks, vec![120, 60]);
        assert_eq!(config.total_secs(), 2400);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn rejects_misconfiguration() {
        assert!(TimerConfig::new(0, 0, 180, 60).validate().is_err());
        assert!(TimerConfig::new(3, 4, 180, 60).validate().is_err());
        assert!(TimerConfig::new(3, 1, 0, 60).validate().is_err());
        assert!(TimerConfig::new(3, 1, 180, 0).validate().is_err());
        assert!(TimerConfig::new(3, 3, 1, 1).validate().is_ok());
        assert!(TimerConfig::new(3, 0, 1, 1).validate().is_ok());
    }

    #[test]
    fn transition_round_only_when_both_blocks_exist() {
        assert_eq!(TimerConfig::default().transition_round(), Some(6));
        assert_eq!(TimerConfig::new(4, 0, 10, 10).transition_round(), None);
        assert_eq!(TimerConfig::new(4, 4, 10, 10).transition_round(), None);
        assert_eq!(TimerConfig::new(4, 3, 10, 10).transition_round(), Some(4));
    }

    #[test]
    fn partial_json_falls_back_to_defaults() {
        let config: TimerConfig = serde_json::from_str(r#"{"rounds": 6, "boxRounds": 2}"#).unwrap();
        assert_eq!(config.rounds, 6);
        assert_eq!(config.box_rounds, 2);
        assert_eq!(config.work_secs, DEFAULT_WORK_SECS);
        assert_eq!(config.transition_phrase, DEFAULT_TRANSITION_PHRASE);
    }
}
