pub mod audio;
pub mod settings;
pub mod timer;
mod utils;

use std::io::Write;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use log::LevelFilter;
use tokio::io::{AsyncBufReadExt, BufReader};

use audio::build_alerts;
use settings::{SettingsStore, SoundSettings};
use timer::{
    commands::{dispatch, Outcome, TimerCommand},
    TimerConfig, TimerController, TimerSnapshot, TimerStatus,
};

const ENABLE_LOGS: bool = true;

#[derive(Parser, Debug)]
#[command(version, about = "Boxing/kettlebell round timer")]
pub struct Cli {
    /// Number of rounds
    #[arg(long)]
    pub rounds: Option<u32>,
    /// Leading rounds labelled BOX; the rest are BELL
    #[arg(long)]
    pub box_rounds: Option<u32>,
    /// Work phase length
    #[arg(long, value_name = "SECS")]
    pub work: Option<u32>,
    /// Rest phase length
    #[arg(long, value_name = "SECS")]
    pub rest: Option<u32>,
    /// Store the effective round setup and volume as the new default
    #[arg(long)]
    pub save: bool,
    /// No chimes and no speech
    #[arg(long)]
    pub mute: bool,
    /// Chimes only, skip the spoken cue
    #[arg(long)]
    pub no_speech: bool,
    /// Chime volume from 0.0 to 1.0
    #[arg(long, value_parser = parse_volume)]
    pub volume: Option<f32>,
    /// Begin counting down immediately
    #[arg(long)]
    pub autostart: bool,
    /// Keep the prompt open after the last round
    #[arg(long)]
    pub stay: bool,
    /// Settings file (defaults to the user config dir)
    #[arg(long, value_name = "PATH")]
    pub settings: Option<PathBuf>,
    #[arg(short, long)]
    pub verbose: bool,
}

impl Cli {
    /// Command-line values override the stored setup field by field.
    pub fn timer_config(&self, stored: TimerConfig) -> TimerConfig {
        TimerConfig {
            rounds: self.rounds.unwrap_or(stored.rounds),
            box_rounds: self.box_rounds.unwrap_or(stored.box_rounds),
            work_secs: self.work.unwrap_or(stored.work_secs),
            rest_secs: self.rest.unwrap_or(stored.rest_secs),
            ..stored
        }
    }

    /// Session-only switches (`--mute`, `--no-speech`) never reach the
    /// stored settings; `--volume` does when saved.
    pub fn sound_settings(&self, stored: SoundSettings) -> (SoundSettings, SoundSettings) {
        let persisted = SoundSettings {
            volume: self.volume.unwrap_or(stored.volume),
            ..stored
        };
        let mut effective = persisted.clone();
        if self.mute {
            effective.enabled = false;
        }
        if self.no_speech {
            effective.speech_enabled = false;
        }
        (persisted, effective)
    }
}

fn parse_volume(raw: &str) -> std::result::Result<f32, String> {
    let volume: f32 = raw.parse().map_err(|_| format!("`{raw}` is not a number"))?;
    if (0.0..=1.0).contains(&volume) {
        Ok(volume)
    } else {
        Err("volume must be between 0.0 and 1.0".to_string())
    }
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };
    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(default_level.as_str()),
    )
    .init();

    log::info!("BXKR timer starting up...");

    let settings_path = cli.settings.clone().unwrap_or_else(SettingsStore::default_path);
    let store = SettingsStore::new(settings_path)?;

    let config = cli.timer_config(store.timer());
    config.validate()?;
    let (stored_sound, sound) = cli.sound_settings(store.sound());
    if cli.save {
        store.update_timer(config.clone())?;
        store.update_sound(stored_sound)?;
        log::info!("saved round setup as default");
    }

    let alerts = build_alerts(&sound)?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to start async runtime")?;

    let result = runtime.block_on(async move {
        let controller = TimerController::new(config, alerts)?;
        if cli.autostart {
            controller.start().await;
        }
        drive(controller, cli.stay).await
    });
    // A pending stdin read sits on a blocking thread; don't wait for it
    runtime.shutdown_background();
    result
}

fn render(snapshot: &TimerSnapshot) {
    let mut stdout = std::io::stdout();
    let _ = write!(stdout, "\r{snapshot}\x1b[K");
    let _ = stdout.flush();
}

/// Terminal front end: redraws on every snapshot and feeds stdin lines to
/// the controller until quit, Ctrl-C, or the session ends.
async fn drive(controller: TimerController, stay: bool) -> Result<()> {
    let mut updates = controller.subscribe();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = true;

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    println!("commands: start | pause | reset | status | quit  (enter toggles)");
    render(&updates.borrow_and_update());

    loop {
        tokio::select! {
            changed = updates.changed() => {
                if changed.is_err() {
                    break;
                }
                let snapshot = updates.borrow_and_update().clone();
                render(&snapshot);
                if snapshot.status == TimerStatus::Finished && !stay {
                    println!();
                    break;
                }
            }
            line = lines.next_line(), if stdin_open => {
                match line {
                    Ok(Some(line)) => match TimerCommand::parse_line(&line) {
                        Ok(command) => match dispatch(&controller, command).await {
                            Outcome::Continue(snapshot) => render(&snapshot),
                            Outcome::Quit => {
                                println!();
                                break;
                            }
                        },
                        Err(err) => eprintln!("{err}"),
                    },
                    Ok(None) => {
                        stdin_open = false;
                        // Nothing left to drive a stopped timer
                        if !controller.get_snapshot().await.is_running {
                            println!();
                            break;
                        }
                    }
                    Err(err) => {
                        log_error!("failed to read stdin: {err}");
                        stdin_open = false;
                    }
                }
            }
            _ = &mut ctrl_c => {
                println!();
                break;
            }
        }
    }

    controller.shutdown().await;
    Ok(())
}
