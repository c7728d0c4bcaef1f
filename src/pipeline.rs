use std::{
    fmt,
    path::{Path, PathBuf},
};

use crate::{
    artifacts::ArtifactStore,
    assemble::assemble_timeline,
    deck::DeckParser,
    encode_ffmpeg::{DEFAULT_FPS, EncodeConfig, Encoder},
    error::{SlidecastError, SlidecastResult},
    extract::extract_assets,
    model::Deck,
    raster::Rasterizer,
    timing::{Prompter, resolve_timing},
    tts::TtsEngine,
};

pub const DECK_EXTENSION: &str = "pptx";
pub const VIDEO_EXTENSION: &str = "mp4";

/// Run lifecycle. Cleanup is the only terminal stage and is always reached;
/// any stage may jump straight to it on a fatal error.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Stage {
    Validating,
    TimingResolved,
    Extracting,
    Assembling,
    Encoding,
    Cleanup,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Validating => "validating",
            Stage::TimingResolved => "timing-resolved",
            Stage::Extracting => "extracting",
            Stage::Assembling => "assembling",
            Stage::Encoding => "encoding",
            Stage::Cleanup => "cleanup",
        };
        f.write_str(name)
    }
}

#[derive(Clone, Debug)]
pub struct ConvertOptions {
    /// Seconds for slides without narration; skips the interactive prompt
    /// when the whole deck is note-less.
    pub fallback_secs: Option<u32>,
    pub fps: u32,
    pub overwrite: bool,
    /// Parent directory for the run's scratch directory; system temp dir
    /// when unset.
    pub work_dir: Option<PathBuf>,
}

impl Default for ConvertOptions {
    fn default() -> Self {
        Self {
            fallback_secs: None,
            fps: DEFAULT_FPS,
            overwrite: true,
            work_dir: None,
        }
    }
}

/// What one conversion run did.
#[derive(Clone, Debug)]
pub struct ConvertReport {
    pub slides_total: usize,
    pub segments: usize,
    pub narrated: usize,
    pub dropped_slides: usize,
    /// `None` when no video was produced (empty deck, declined prompt, or
    /// every slide failed extraction).
    pub output: Option<PathBuf>,
}

impl ConvertReport {
    fn without_output(slides_total: usize) -> Self {
        Self {
            slides_total,
            segments: 0,
            narrated: 0,
            dropped_slides: 0,
            output: None,
        }
    }
}

/// The collaborator seams one conversion runs against.
pub struct Collaborators<'a> {
    pub parser: &'a dyn DeckParser,
    pub rasterizer: &'a mut dyn Rasterizer,
    pub tts: &'a dyn TtsEngine,
    pub encoder: &'a mut dyn Encoder,
    pub prompter: &'a mut dyn Prompter,
}

/// Convert a deck into a narrated video.
///
/// Pre-flight errors abort before any artifact exists. Per-slide failures
/// degrade only that slide. Whatever happens after the artifact store is
/// created — including an encode failure — every temporary file is released
/// before this returns.
pub fn convert(
    deck_path: &Path,
    out_path: &Path,
    opts: &ConvertOptions,
    collab: &mut Collaborators<'_>,
) -> SlidecastResult<ConvertReport> {
    tracing::debug!(stage = %Stage::Validating);
    validate_paths(deck_path, out_path)?;

    let deck = collab.parser.open(deck_path)?;
    tracing::info!(slides = deck.slides.len(), deck = %deck_path.display(), "parsed deck");
    if deck.slides.is_empty() {
        tracing::info!("deck has no slides; nothing to convert");
        return Ok(ConvertReport::without_output(0));
    }

    let Some(policy) = resolve_timing(&deck, opts.fallback_secs, collab.prompter)? else {
        tracing::info!("no fallback duration chosen; no video will be produced");
        return Ok(ConvertReport::without_output(deck.slides.len()));
    };
    tracing::debug!(stage = %Stage::TimingResolved, fallback_secs = policy.fallback_secs);

    let mut store = ArtifactStore::create(opts.work_dir.as_deref())?;
    let result = run_pipeline(&deck, out_path, opts, collab, policy, &mut store);
    // Terminal stage on every path; `Drop` covers unwinding.
    tracing::debug!(stage = %Stage::Cleanup);
    store.release();
    result
}

fn run_pipeline(
    deck: &Deck,
    out_path: &Path,
    opts: &ConvertOptions,
    collab: &mut Collaborators<'_>,
    policy: crate::model::TimingPolicy,
    store: &mut ArtifactStore,
) -> SlidecastResult<ConvertReport> {
    collab.rasterizer.prepare(store.root())?;

    tracing::debug!(stage = %Stage::Extracting);
    let state = extract_assets(deck, collab.rasterizer, collab.tts, store, policy);
    let dropped_slides = deck.slides.len() - state.images.len();

    tracing::debug!(stage = %Stage::Assembling);
    let timeline = assemble_timeline(&state);
    if timeline.is_empty() {
        tracing::warn!("no slide produced a segment; no video will be produced");
        return Ok(ConvertReport {
            dropped_slides,
            ..ConvertReport::without_output(deck.slides.len())
        });
    }

    let cfg = EncodeConfig::for_deck(
        deck.dimensions(),
        opts.fps,
        out_path,
        opts.overwrite,
        store.root(),
    );
    tracing::debug!(stage = %Stage::Encoding, segments = timeline.segments.len());
    collab.encoder.encode(&timeline, &cfg)?;

    let narrated = timeline
        .segments
        .iter()
        .filter(|s| s.narration.is_some())
        .count();
    tracing::info!(
        out = %out_path.display(),
        segments = timeline.segments.len(),
        narrated,
        dropped_slides,
        "encoded video"
    );
    Ok(ConvertReport {
        slides_total: deck.slides.len(),
        segments: timeline.segments.len(),
        narrated,
        dropped_slides,
        output: Some(out_path.to_path_buf()),
    })
}

pub(crate) fn validate_paths(input: &Path, output: &Path) -> SlidecastResult<()> {
    if !input.is_file() {
        return Err(SlidecastError::path_validation(format!(
            "input deck '{}' does not exist",
            input.display()
        )));
    }
    if !has_extension(input, DECK_EXTENSION) {
        return Err(SlidecastError::path_validation(format!(
            "input deck '{}' must have the .{DECK_EXTENSION} extension",
            input.display()
        )));
    }
    if !has_extension(output, VIDEO_EXTENSION) {
        return Err(SlidecastError::path_validation(format!(
            "output '{}' must have the .{VIDEO_EXTENSION} extension",
            output.display()
        )));
    }
    Ok(())
}

fn has_extension(path: &Path, ext: &str) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case(ext))
}
