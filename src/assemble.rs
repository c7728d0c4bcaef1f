use crate::model::{RunState, Segment, Timeline};

/// Floor for a segment's display duration. A narration whose measured
/// duration is zero, negative, or sub-perceptual is clamped here instead of
/// failing the encode.
pub const MIN_SEGMENT_SECS: f64 = 0.1;

/// Bind each surviving image to its optional narration and resolved duration,
/// in ascending slide-index order. Pure ordering/binding; nothing is
/// re-encoded here.
pub fn assemble_timeline(state: &RunState) -> Timeline {
    let mut segments = Vec::with_capacity(state.images.len());

    for (&index, image) in &state.images {
        let narration = state.narrations.get(&index).cloned();
        let duration_sec = match &narration {
            Some(n) if n.duration_sec >= MIN_SEGMENT_SECS => n.duration_sec,
            Some(n) => {
                tracing::warn!(
                    slide = index,
                    measured_sec = n.duration_sec,
                    "narration duration below minimum; clamping"
                );
                MIN_SEGMENT_SECS
            }
            None => state.policy.fallback_duration_sec(),
        };
        segments.push(Segment {
            image: image.clone(),
            narration,
            duration_sec,
        });
    }

    for index in state.narrations.keys() {
        if !state.images.contains_key(index) {
            tracing::warn!(
                slide = index,
                "narration has no surviving image; leaving it out of the timeline"
            );
        }
    }

    Timeline { segments }
}
