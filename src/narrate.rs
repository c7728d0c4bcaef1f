use crate::{
    artifacts::ArtifactStore,
    error::SlidecastResult,
    model::{NarrationAsset, Slide},
    tts::TtsEngine,
};

/// Synthesize narration for one slide's notes into the run's audio slot.
///
/// Only called for slides with non-empty notes (the caller branches). The
/// audio file is tracked before the duration probe, so it is released even
/// when probing fails.
pub fn synthesize_narration(
    slide: &Slide,
    tts: &dyn TtsEngine,
    store: &mut ArtifactStore,
) -> SlidecastResult<NarrationAsset> {
    let bytes = tts.synthesize(slide.notes_text.trim())?;
    let path = store.narration_slot(slide.index);
    store.write_tracked(&path, &bytes)?;
    let duration_sec = tts.measure_duration(&path)?;
    tracing::debug!(
        slide = slide.index,
        duration_sec,
        "synthesized narration"
    );
    Ok(NarrationAsset {
        path,
        slide_index: slide.index,
        duration_sec,
    })
}
