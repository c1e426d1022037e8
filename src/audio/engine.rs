use anyhow::{anyhow, Result};
use rodio::{OutputStream, OutputStreamHandle, Sink};
use std::sync::{
    mpsc::{self, Sender},
    Mutex,
};
use std::thread;

use super::chime::Chime;

const ENABLE_LOGS: bool = true;

use crate::log_warn;

enum AudioCommand {
    Chime,
    Stop,
}

/// Owns the rodio output on a dedicated thread; rodio's stream is not `Send`,
/// so callers only ever hold the command channel.
pub struct AudioEngineHandle {
    tx: Mutex<Option<Sender<AudioCommand>>>,
    initial_volume: f32,
}

impl AudioEngineHandle {
    pub fn new(volume: f32) -> Self {
        Self {
            tx: Mutex::new(None),
            initial_volume: volume.clamp(0.0, 1.0),
        }
    }

    fn ensure_thread(&self) -> Result<Sender<AudioCommand>> {
        let mut guard = self
            .tx
            .lock()
            .map_err(|_| anyhow!("audio engine lock poisoned"))?;
        if let Some(tx) = guard.as_ref() {
            return Ok(tx.clone());
        }

        let (tx, rx) = mpsc::channel::<AudioCommand>();
        let volume = self.initial_volume;

        thread::Builder::new()
            .name("audio-engine".to_string())
            .spawn(move || {
                let mut output: Option<(OutputStream, OutputStreamHandle)> = None;
                let mut sink: Option<Sink> = None;

                fn ensure_output(
                    output: &mut Option<(OutputStream, OutputStreamHandle)>,
                ) -> Result<&OutputStreamHandle> {
                    if output.is_none() {
                        let opened = OutputStream::try_default()
                            .map_err(|e| anyhow!("failed to open audio output: {e}"))?;
                        *output = Some(opened);
                    }
                    output
                        .as_ref()
                        .map(|(_, handle)| handle)
                        .ok_or_else(|| anyhow!("audio output unavailable"))
                }

                while let Ok(cmd) = rx.recv() {
                    match cmd {
                        AudioCommand::Chime => {
                            // Restart rather than queue behind a chime still ringing
                            if let Some(old) = sink.take() {
                                old.stop();
                            }
                            let played = ensure_output(&mut output).and_then(|handle| {
                                Sink::try_new(handle)
                                    .map_err(|e| anyhow!("failed to create audio sink: {e}"))
                            });
                            match played {
                                Ok(new_sink) => {
                                    new_sink.set_volume(volume);
                                    new_sink.append(Chime::default());
                                    sink = Some(new_sink);
                                }
                                Err(err) => {
                                    log_warn!("chime skipped: {err}");
                                    // Retry opening the device on the next chime
                                    output = None;
                                }
                            }
                        }
                        AudioCommand::Stop => {
                            if let Some(old) = sink.take() {
                                old.stop();
                            }
                            output = None;
                        }
                    }
                }
            })?;

        *guard = Some(tx.clone());
        Ok(tx)
    }

    pub fn chime(&self) -> Result<()> {
        let tx = self.ensure_thread()?;
        tx.send(AudioCommand::Chime)
            .map_err(|_| anyhow!("audio engine thread has exited"))
    }

    /// Cuts off a ringing chime and releases the output device.
    pub fn stop(&self) {
        if let Ok(Some(tx)) = self.tx.lock().map(|g| g.clone()) {
            let _ = tx.send(AudioCommand::Stop);
        }
    }
}
