use std::path::Path;

use crate::error::{SlidecastError, SlidecastResult};

/// Measure the duration of an audio file in seconds using `ffprobe`.
pub fn probe_audio_duration(path: &Path) -> SlidecastResult<f64> {
    let out = std::process::Command::new("ffprobe")
        .args(["-v", "error", "-print_format", "json", "-show_format"])
        .arg(path)
        .output()
        .map_err(|e| SlidecastError::io(format!("failed to run ffprobe: {e}")))?;
    if !out.status.success() {
        return Err(SlidecastError::io(format!(
            "ffprobe failed for '{}': {}",
            path.display(),
            String::from_utf8_lossy(&out.stderr).trim()
        )));
    }

    duration_from_probe_json(&out.stdout)
}

pub(crate) fn duration_from_probe_json(bytes: &[u8]) -> SlidecastResult<f64> {
    #[derive(serde::Deserialize)]
    struct ProbeFormat {
        duration: Option<String>,
    }
    #[derive(serde::Deserialize)]
    struct ProbeOut {
        format: Option<ProbeFormat>,
    }

    let parsed: ProbeOut = serde_json::from_slice(bytes)
        .map_err(|e| SlidecastError::io(format!("ffprobe json parse failed: {e}")))?;
    let duration = parsed
        .format
        .and_then(|f| f.duration)
        .and_then(|s| s.parse::<f64>().ok())
        .ok_or_else(|| SlidecastError::io("ffprobe reported no duration"))?;
    if !duration.is_finite() {
        return Err(SlidecastError::io("ffprobe reported a non-finite duration"));
    }
    Ok(duration)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duration_parses_from_format_block() {
        let json = br#"{"format": {"filename": "a.wav", "duration": "2.345000"}}"#;
        let d = duration_from_probe_json(json).unwrap();
        assert!((d - 2.345).abs() < 1e-9);
    }

    #[test]
    fn missing_duration_is_an_error() {
        assert!(duration_from_probe_json(br#"{"format": {}}"#).is_err());
        assert!(duration_from_probe_json(br#"{}"#).is_err());
        assert!(duration_from_probe_json(b"not json").is_err());
    }
}
