#![forbid(unsafe_code)]

pub mod artifacts;
pub mod assemble;
pub mod deck;
pub mod deps;
pub mod encode_ffmpeg;
pub mod error;
pub mod extract;
pub mod media;
pub mod model;
pub mod narrate;
pub mod pipeline;
pub mod raster;
pub mod timing;
pub mod tts;

pub use artifacts::ArtifactStore;
pub use assemble::{MIN_SEGMENT_SECS, assemble_timeline};
pub use deck::{DeckParser, PptxDeckParser};
pub use encode_ffmpeg::{DEFAULT_FPS, EncodeConfig, Encoder, FfmpegEncoder, is_ffmpeg_on_path};
pub use error::{SlidecastError, SlidecastResult};
pub use extract::extract_assets;
pub use media::probe_audio_duration;
pub use model::{
    Deck, ImageAsset, NarrationAsset, RunState, Segment, Slide, Timeline, TimingPolicy,
};
pub use narrate::synthesize_narration;
pub use pipeline::{
    Collaborators, ConvertOptions, ConvertReport, DECK_EXTENSION, VIDEO_EXTENSION, convert,
};
pub use raster::{Rasterizer, SofficeRasterizer};
pub use timing::{DEFAULT_FALLBACK_SECS, Prompter, StdioPrompter, resolve_timing};
pub use tts::{EspeakTts, TtsEngine};
