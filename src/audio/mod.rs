pub mod chime;
#[cfg(feature = "audio")]
pub mod engine;
pub mod speech;

use anyhow::Result;
use std::sync::Arc;

use crate::settings::SoundSettings;
use crate::timer::Cue;

#[cfg(feature = "audio")]
use engine::AudioEngineHandle;
use speech::SpeechEngine;

// Playback failures are expected (no device, no TTS installed); keep them visible
const ENABLE_LOGS: bool = true;

use crate::{log_info, log_warn};

/// Where timer cues end up. Implementations must not block: they are called
/// from the tick task.
pub trait AlertSink: Send + Sync {
    fn chime(&self) -> Result<()>;

    fn speak(&self, phrase: &str) -> Result<()>;

    /// Cut off anything still playing.
    fn silence(&self) {}
}

/// Plays cues in order. Failures are logged and dropped so a missing
/// speaker never affects the countdown.
pub fn play_cues(sink: &dyn AlertSink, cues: &[Cue]) {
    for cue in cues {
        let result = match cue {
            Cue::Chime => sink.chime(),
            Cue::Speak(phrase) => sink.speak(phrase),
        };
        if let Err(err) = result {
            log_warn!("alert playback failed ({cue:?}): {err:#}");
        }
    }
}

pub struct SilentAlerts;

impl AlertSink for SilentAlerts {
    fn chime(&self) -> Result<()> {
        Ok(())
    }

    fn speak(&self, _phrase: &str) -> Result<()> {
        Ok(())
    }
}

/// Chime through the speakers (or the terminal bell when built without the
/// `audio` feature) plus optional spoken cues.
pub struct SoundAlerts {
    #[cfg(feature = "audio")]
    engine: AudioEngineHandle,
    speech: Option<SpeechEngine>,
}

impl SoundAlerts {
    pub fn new(settings: &SoundSettings) -> Result<Self> {
        let speech = if settings.speech_enabled {
            Some(match settings.speech_command.as_deref() {
                Some(line) => SpeechEngine::from_command_line(line)?,
                None => SpeechEngine::platform_default(),
            })
        } else {
            None
        };

        Ok(Self {
            #[cfg(feature = "audio")]
            engine: AudioEngineHandle::new(settings.volume),
            speech,
        })
    }
}

impl AlertSink for SoundAlerts {
    #[cfg(feature = "audio")]
    fn chime(&self) -> Result<()> {
        self.engine.chime()
    }

    #[cfg(not(feature = "audio"))]
    fn chime(&self) -> Result<()> {
        use std::io::Write;

        let mut stderr = std::io::stderr();
        stderr.write_all(b"\x07")?;
        stderr.flush()?;
        Ok(())
    }

    fn speak(&self, phrase: &str) -> Result<()> {
        match &self.speech {
            Some(engine) => engine.speak(phrase),
            None => Ok(()),
        }
    }

    #[cfg(feature = "audio")]
    fn silence(&self) {
        self.engine.stop();
    }
}

pub fn build_alerts(settings: &SoundSettings) -> Result<Arc<dyn AlertSink>> {
    if !settings.enabled {
        log_info!("sound disabled; running silent");
        return Ok(Arc::new(SilentAlerts));
    }
    let alerts = SoundAlerts::new(settings)?;
    if let Some(engine) = &alerts.speech {
        log_info!("spoken cues via `{}`", engine.program());
    }
    Ok(Arc::new(alerts))
}
