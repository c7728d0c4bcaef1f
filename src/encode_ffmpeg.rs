use std::{
    path::{Path, PathBuf},
    process::{Command, Stdio},
};

use crate::{
    error::{SlidecastError, SlidecastResult},
    model::{Segment, Timeline},
};

/// Frame rate of the output video.
pub const DEFAULT_FPS: u32 = 24;

/// Sample rate of generated silent audio tracks.
const SILENCE_SAMPLE_RATE: u32 = 48_000;

#[derive(Clone, Debug)]
pub struct EncodeConfig {
    pub width: u32,
    pub height: u32,
    pub fps: u32,
    pub out_path: PathBuf,
    pub overwrite: bool,
    /// Where per-segment intermediate clips are written; owned (and swept)
    /// by the run's artifact store.
    pub scratch_dir: PathBuf,
}

impl EncodeConfig {
    pub fn validate(&self) -> SlidecastResult<()> {
        if self.width == 0 || self.height == 0 {
            return Err(SlidecastError::encode(
                "encode width/height must be non-zero",
            ));
        }
        if self.fps == 0 {
            return Err(SlidecastError::encode("encode fps must be non-zero"));
        }
        if !self.width.is_multiple_of(2) || !self.height.is_multiple_of(2) {
            // With the default settings we target yuv420p output for maximum compatibility.
            return Err(SlidecastError::encode(
                "encode width/height must be even (required for yuv420p mp4 output)",
            ));
        }
        Ok(())
    }

    /// Config for a deck's dimensions, rounded down to even as yuv420p
    /// requires.
    pub fn for_deck(
        dimensions: (u32, u32),
        fps: u32,
        out_path: impl Into<PathBuf>,
        overwrite: bool,
        scratch_dir: impl Into<PathBuf>,
    ) -> Self {
        let even = |n: u32| {
            let n = n.max(2);
            n - n % 2
        };
        Self {
            width: even(dimensions.0),
            height: even(dimensions.1),
            fps,
            out_path: out_path.into(),
            overwrite,
            scratch_dir: scratch_dir.into(),
        }
    }
}

/// Turns an assembled timeline into an encoded video file.
pub trait Encoder {
    fn encode(&mut self, timeline: &Timeline, cfg: &EncodeConfig) -> SlidecastResult<()>;
}

pub fn is_ffmpeg_on_path() -> bool {
    Command::new("ffmpeg")
        .arg("-version")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}

pub fn ensure_parent_dir(path: &Path) -> SlidecastResult<()> {
    if let Some(parent) = path.parent() {
        use anyhow::Context as _;
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create output directory '{}'", parent.display()))?;
    }
    Ok(())
}

/// Encodes each segment as a still+audio clip (libx264/yuv420p + aac; a
/// generated silent track when the segment has no narration, so every clip
/// carries the same stream layout), then joins them losslessly with the
/// ffmpeg concat demuxer.
///
/// We intentionally use the system `ffmpeg` binary rather than `ffmpeg-next`
/// to avoid native FFmpeg dev header/lib requirements.
pub struct FfmpegEncoder;

impl Encoder for FfmpegEncoder {
    fn encode(&mut self, timeline: &Timeline, cfg: &EncodeConfig) -> SlidecastResult<()> {
        cfg.validate()?;
        ensure_parent_dir(&cfg.out_path)?;

        if !cfg.overwrite && cfg.out_path.exists() {
            return Err(SlidecastError::encode(format!(
                "output file '{}' already exists",
                cfg.out_path.display()
            )));
        }
        if timeline.is_empty() {
            return Err(SlidecastError::encode("timeline has no segments"));
        }
        if let Some(seg) = timeline.segments.iter().find(|s| s.duration_sec <= 0.0) {
            return Err(SlidecastError::encode(format!(
                "segment for slide {} has non-positive duration",
                seg.image.slide_index
            )));
        }
        if !is_ffmpeg_on_path() {
            return Err(SlidecastError::dependency_missing(
                "ffmpeg is required for MP4 encoding, but was not found on PATH",
            ));
        }

        let mut clip_paths = Vec::with_capacity(timeline.segments.len());
        for (ordinal, segment) in timeline.segments.iter().enumerate() {
            let clip = cfg.scratch_dir.join(format!("seg_{ordinal:04}.mp4"));
            encode_segment(segment, cfg, &clip)?;
            clip_paths.push(clip);
        }

        let list_path = cfg.scratch_dir.join("concat.txt");
        std::fs::write(&list_path, concat_manifest(&clip_paths)).map_err(|e| {
            SlidecastError::encode(format!("failed to write concat list: {e}"))
        })?;

        let mut cmd = Command::new("ffmpeg");
        cmd.args(["-y", "-loglevel", "error", "-f", "concat", "-safe", "0", "-i"])
            .arg(&list_path)
            .args(["-c", "copy", "-movflags", "+faststart"])
            .arg(&cfg.out_path);
        run_ffmpeg(cmd, "concat")?;

        tracing::debug!(
            segments = timeline.segments.len(),
            out = %cfg.out_path.display(),
            "encoded timeline"
        );
        Ok(())
    }
}

fn encode_segment(segment: &Segment, cfg: &EncodeConfig, clip_path: &Path) -> SlidecastResult<()> {
    let mut cmd = Command::new("ffmpeg");
    cmd.args(["-y", "-loglevel", "error", "-loop", "1", "-i"])
        .arg(&segment.image.path);
    match &segment.narration {
        Some(narration) => {
            cmd.arg("-i").arg(&narration.path);
        }
        None => {
            cmd.args([
                "-f",
                "lavfi",
                "-i",
                &format!("anullsrc=r={SILENCE_SAMPLE_RATE}:cl=stereo"),
            ]);
        }
    }

    // Every clip is normalized to the deck geometry (letterboxed when the
    // rasterized aspect differs) so the concat demuxer sees uniform streams.
    let vf = format!(
        "scale={w}:{h}:force_original_aspect_ratio=decrease,pad={w}:{h}:(ow-iw)/2:(oh-ih)/2,format=yuv420p",
        w = cfg.width,
        h = cfg.height
    );
    cmd.args(["-t", &format!("{:.3}", segment.duration_sec)])
        .args(["-vf", &vf])
        .args(["-r", &cfg.fps.to_string()])
        .args(["-c:v", "libx264", "-c:a", "aac"])
        .args(["-ar", &SILENCE_SAMPLE_RATE.to_string()])
        .arg(clip_path);

    run_ffmpeg(cmd, &format!("segment for slide {}", segment.image.slide_index))
}

fn run_ffmpeg(mut cmd: Command, what: &str) -> SlidecastResult<()> {
    let out = cmd
        .stdin(Stdio::null())
        .output()
        .map_err(|e| {
            SlidecastError::encode(format!(
                "failed to spawn ffmpeg (is it installed and on PATH?): {e}"
            ))
        })?;
    if !out.status.success() {
        return Err(SlidecastError::encode(format!(
            "ffmpeg {what} exited with status {}: {}",
            out.status,
            String::from_utf8_lossy(&out.stderr).trim()
        )));
    }
    Ok(())
}

/// Concat-demuxer input list. Paths are single-quoted with embedded quotes
/// escaped the way the demuxer expects.
fn concat_manifest(paths: &[PathBuf]) -> String {
    let mut out = String::new();
    for path in paths {
        let escaped = path.display().to_string().replace('\'', r"'\''");
        out.push_str(&format!("file '{escaped}'\n"));
    }
    out
}
