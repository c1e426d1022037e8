use anyhow::{anyhow, bail, Context, Result};
use std::process::{Command, Stdio};
use std::thread;

#[cfg(target_os = "macos")]
const DEFAULT_SPEECH_COMMAND: &str = "say";
#[cfg(not(target_os = "macos"))]
const DEFAULT_SPEECH_COMMAND: &str = "espeak-ng";

/// Text-to-speech through an external program; the phrase is passed as the
/// last argument.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpeechEngine {
    program: String,
    args: Vec<String>,
}

impl SpeechEngine {
    pub fn platform_default() -> Self {
        Self {
            program: DEFAULT_SPEECH_COMMAND.to_string(),
            args: Vec::new(),
        }
    }

    /// Parses a shell-style command line such as `espeak -s 150`.
    pub fn from_command_line(line: &str) -> Result<Self> {
        let mut parts = shlex::split(line).ok_or_else(|| anyhow!("invalid quoting in speech command"))?;
        if parts.is_empty() {
            bail!("speech command is empty");
        }
        let program = parts.remove(0);
        Ok(Self {
            program,
            args: parts,
        })
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    /// Starts speaking and returns immediately. A detached thread reaps the
    /// child so finished speech processes don't linger.
    pub fn speak(&self, phrase: &str) -> Result<()> {
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .arg(phrase)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .with_context(|| format!("failed to launch speech program `{}`", self.program))?;

        thread::Builder::new()
            .name("speech-reaper".to_string())
            .spawn(move || {
                let _ = child.wait();
            })?;
        Ok(())
    }
}
