use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand};

use super::{TimerController, TimerSnapshot};

/// Commands accepted on stdin while the timer is on screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Subcommand)]
pub enum TimerCommand {
    /// Start or resume the countdown
    #[command(alias = "s")]
    Start,
    /// Pause, keeping the remaining time
    #[command(alias = "p")]
    Pause,
    /// Start when stopped, pause when running
    #[command(alias = "t")]
    Toggle,
    /// Back to round one
    #[command(alias = "r")]
    Reset,
    /// Print the current state
    #[command(alias = "?")]
    Status,
    /// Leave the timer
    #[command(aliases = ["q", "exit"])]
    Quit,
}

#[derive(Parser)]
#[command(name = "bxkr")]
struct Line {
    #[command(subcommand)]
    command: TimerCommand,
}

impl TimerCommand {
    /// Parses one input line; an empty line toggles.
    pub fn parse_line(line: &str) -> Result<Self> {
        let line = line.trim();
        if line.is_empty() {
            return Ok(TimerCommand::Toggle);
        }
        let mut args = shlex::split(line).ok_or_else(|| anyhow!("invalid quoting"))?;
        args.insert(0, "bxkr".to_string());
        let parsed = Line::try_parse_from(args).map_err(|e| anyhow!("{e}"))?;
        Ok(parsed.command)
    }
}

pub enum Outcome {
    Continue(TimerSnapshot),
    Quit,
}

pub async fn dispatch(controller: &TimerController, command: TimerCommand) -> Outcome {
    let snapshot = match command {
        TimerCommand::Start => controller.start().await,
        TimerCommand::Pause => controller.pause().await,
        TimerCommand::Toggle => {
            if controller.get_snapshot().await.is_running {
                controller.pause().await
            } else {
                controller.start().await
            }
        }
        TimerCommand::Reset => controller.reset().await,
        TimerCommand::Status => controller.get_snapshot().await,
        TimerCommand::Quit => {
            controller.shutdown().await;
            return Outcome::Quit;
        }
    };
    Outcome::Continue(snapshot)
}
