use std::{
    io::Write as _,
    path::Path,
    process::{Command, Stdio},
};

use crate::error::{SlidecastError, SlidecastResult};

/// Turns notes text into audio bytes. Callers are responsible for the
/// "empty notes means no narration" branch; implementations may assume
/// non-empty input.
pub trait TtsEngine {
    fn synthesize(&self, text: &str) -> SlidecastResult<Vec<u8>>;

    /// Duration of a synthesized audio file in seconds.
    fn measure_duration(&self, audio_path: &Path) -> SlidecastResult<f64> {
        crate::media::probe_audio_duration(audio_path)
    }
}

/// System TTS via `espeak-ng`: text on stdin, WAV bytes on stdout.
#[derive(Clone, Debug, Default)]
pub struct EspeakTts {
    voice: Option<String>,
    speed_wpm: Option<u32>,
}

impl EspeakTts {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_voice(mut self, voice: impl Into<String>) -> Self {
        self.voice = Some(voice.into());
        self
    }

    pub fn with_speed_wpm(mut self, wpm: u32) -> Self {
        self.speed_wpm = Some(wpm);
        self
    }
}

impl TtsEngine for EspeakTts {
    fn synthesize(&self, text: &str) -> SlidecastResult<Vec<u8>> {
        let mut cmd = Command::new("espeak-ng");
        cmd.args(["--stdin", "--stdout"])
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        if let Some(voice) = &self.voice {
            cmd.args(["-v", voice]);
        }
        if let Some(wpm) = self.speed_wpm {
            cmd.args(["-s", &wpm.to_string()]);
        }

        let mut child = cmd.spawn().map_err(|e| {
            SlidecastError::synthesis(format!(
                "failed to spawn espeak-ng (is it installed and on PATH?): {e}"
            ))
        })?;

        let mut stdin = child.stdin.take().ok_or_else(|| {
            SlidecastError::synthesis("failed to open espeak-ng stdin (unexpected)")
        })?;
        stdin
            .write_all(text.as_bytes())
            .map_err(|e| SlidecastError::synthesis(format!("failed to write notes text: {e}")))?;
        drop(stdin);

        let out = child.wait_with_output().map_err(|e| {
            SlidecastError::synthesis(format!("failed to wait for espeak-ng: {e}"))
        })?;
        if !out.status.success() {
            return Err(SlidecastError::synthesis(format!(
                "espeak-ng exited with status {}: {}",
                out.status,
                String::from_utf8_lossy(&out.stderr).trim()
            )));
        }
        if out.stdout.is_empty() {
            return Err(SlidecastError::synthesis("espeak-ng produced no audio"));
        }
        Ok(out.stdout)
    }
}
