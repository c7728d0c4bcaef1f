use std::{collections::BTreeMap, path::PathBuf};

/// One slide read from the source deck. Immutable once parsed; `index` is
/// 0-based and defines playback order.
#[derive(Clone, Debug)]
pub struct Slide {
    pub index: usize,
    pub notes_text: String,
}

impl Slide {
    /// Whitespace-only notes count as "no narration".
    pub fn has_notes(&self) -> bool {
        !self.notes_text.trim().is_empty()
    }
}

#[derive(Clone, Debug)]
pub struct Deck {
    pub source_path: PathBuf,
    pub slides: Vec<Slide>,
    pub width_px: u32,
    pub height_px: u32,
}

impl Deck {
    pub fn dimensions(&self) -> (u32, u32) {
        (self.width_px, self.height_px)
    }

    pub fn has_any_notes(&self) -> bool {
        self.slides.iter().any(Slide::has_notes)
    }
}

/// Temporary still-image artifact for one rendered slide.
#[derive(Clone, Debug)]
pub struct ImageAsset {
    pub path: PathBuf,
    pub slide_index: usize,
}

/// Temporary audio artifact synthesized from one slide's notes. The duration
/// is only known after synthesis completes.
#[derive(Clone, Debug)]
pub struct NarrationAsset {
    pub path: PathBuf,
    pub slide_index: usize,
    pub duration_sec: f64,
}

/// One timed entry of the output timeline: an image shown for
/// `duration_sec`, optionally with narration audio.
#[derive(Clone, Debug)]
pub struct Segment {
    pub image: ImageAsset,
    pub narration: Option<NarrationAsset>,
    pub duration_sec: f64,
}

/// Ordered segments in playback order.
#[derive(Clone, Debug, Default)]
pub struct Timeline {
    pub segments: Vec<Segment>,
}

impl Timeline {
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn total_duration_sec(&self) -> f64 {
        self.segments.iter().map(|s| s.duration_sec).sum()
    }
}

/// Resolved display-duration policy for the run.
#[derive(Clone, Copy, Debug)]
pub struct TimingPolicy {
    /// Seconds to show a slide that has no narration. Always > 0.
    pub fallback_secs: u32,
    /// Whether any slide in the deck has non-empty notes.
    pub any_narration: bool,
}

impl TimingPolicy {
    pub fn fallback_duration_sec(&self) -> f64 {
        f64::from(self.fallback_secs)
    }
}

/// Per-run extraction output. Keyed by slide index, so each index carries at
/// most one asset of each kind and iteration order is ascending playback
/// order. Never shared across invocations.
#[derive(Debug)]
pub struct RunState {
    pub images: BTreeMap<usize, ImageAsset>,
    pub narrations: BTreeMap<usize, NarrationAsset>,
    pub policy: TimingPolicy,
}
