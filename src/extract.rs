use std::collections::BTreeMap;

use image::GenericImageView as _;

use crate::{
    artifacts::ArtifactStore,
    error::{SlidecastError, SlidecastResult},
    model::{Deck, ImageAsset, NarrationAsset, RunState, Slide, TimingPolicy},
    narrate::synthesize_narration,
    raster::Rasterizer,
    tts::TtsEngine,
};

/// A tolerance on width/height ratio, not exact pixel equality; rasterizers
/// round page geometry.
const ASPECT_TOLERANCE: f64 = 0.01;

struct SlideAssets {
    image: ImageAsset,
    narration: Option<NarrationAsset>,
}

/// Walk the deck in slide-index order, rendering each slide's image and
/// synthesizing narration inline for slides with notes.
///
/// Per-slide failures never abort the run: a failed render drops that slide
/// from the output sequences, a failed synthesis drops only the narration.
/// Each outcome is an explicit `Result` collected first and filtered after,
/// so a mid-run failure can never leave the sequences half-updated.
pub fn extract_assets(
    deck: &Deck,
    raster: &mut dyn Rasterizer,
    tts: &dyn TtsEngine,
    store: &mut ArtifactStore,
    policy: TimingPolicy,
) -> RunState {
    let dims = deck.dimensions();
    let outcomes: Vec<(usize, SlidecastResult<SlideAssets>)> = deck
        .slides
        .iter()
        .map(|slide| (slide.index, extract_slide(slide, dims, raster, tts, store)))
        .collect();

    let mut images = BTreeMap::new();
    let mut narrations = BTreeMap::new();
    for (index, outcome) in outcomes {
        match outcome {
            Ok(assets) => {
                images.insert(index, assets.image);
                if let Some(narration) = assets.narration {
                    narrations.insert(index, narration);
                }
            }
            Err(error) => {
                tracing::warn!(slide = index, stage = "extract", %error, "slide dropped from timeline");
            }
        }
    }

    RunState {
        images,
        narrations,
        policy,
    }
}

fn extract_slide(
    slide: &Slide,
    dims: (u32, u32),
    raster: &mut dyn Rasterizer,
    tts: &dyn TtsEngine,
    store: &mut ArtifactStore,
) -> SlidecastResult<SlideAssets> {
    let bytes = raster.render(slide, dims)?;
    let decoded = image::load_from_memory(&bytes).map_err(|e| {
        SlidecastError::render(format!(
            "slide {}: rasterizer returned undecodable image bytes: {e}",
            slide.index
        ))
    })?;
    check_aspect(slide.index, (decoded.width(), decoded.height()), dims);

    let path = store.image_slot(slide.index);
    store.write_tracked(&path, &bytes)?;
    let image = ImageAsset {
        path,
        slide_index: slide.index,
    };

    // Empty or whitespace-only notes mean no narration; the synthesizer is
    // not invoked at all.
    let narration = if slide.has_notes() {
        match synthesize_narration(slide, tts, store) {
            Ok(narration) => Some(narration),
            Err(error) => {
                tracing::warn!(
                    slide = slide.index,
                    stage = "synthesize",
                    %error,
                    "narration failed; slide falls back to the default duration"
                );
                None
            }
        }
    } else {
        None
    };

    Ok(SlideAssets { image, narration })
}

fn check_aspect(index: usize, got: (u32, u32), want: (u32, u32)) {
    if got.1 == 0 || want.1 == 0 {
        return;
    }
    let got_ratio = f64::from(got.0) / f64::from(got.1);
    let want_ratio = f64::from(want.0) / f64::from(want.1);
    if (got_ratio - want_ratio).abs() > ASPECT_TOLERANCE * want_ratio {
        tracing::warn!(
            slide = index,
            got = format!("{}x{}", got.0, got.1),
            want = format!("{}x{}", want.0, want.1),
            "rendered image aspect ratio differs from deck; encoder will letterbox"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    struct StubRaster {
        fail_indices: Vec<usize>,
        garbage_indices: Vec<usize>,
    }

    impl Rasterizer for StubRaster {
        fn render(&mut self, slide: &Slide, dims: (u32, u32)) -> SlidecastResult<Vec<u8>> {
            if self.fail_indices.contains(&slide.index) {
                return Err(SlidecastError::render("scripted render failure"));
            }
            if self.garbage_indices.contains(&slide.index) {
                return Ok(b"not an image".to_vec());
            }
            Ok(png_bytes(dims.0, dims.1))
        }
    }

    struct StubTts;

    impl TtsEngine for StubTts {
        fn synthesize(&self, text: &str) -> SlidecastResult<Vec<u8>> {
            if text.contains("[fail]") {
                return Err(SlidecastError::synthesis("scripted synthesis failure"));
            }
            Ok(text.as_bytes().to_vec())
        }

        fn measure_duration(&self, audio_path: &Path) -> SlidecastResult<f64> {
            let len = std::fs::read(audio_path)
                .map_err(|e| SlidecastError::io(e.to_string()))?
                .len();
            Ok(len as f64 / 10.0)
        }
    }

    fn png_bytes(w: u32, h: u32) -> Vec<u8> {
        let img = image::RgbaImage::from_pixel(w, h, image::Rgba([40, 40, 80, 255]));
        let mut out = std::io::Cursor::new(Vec::new());
        img.write_to(&mut out, image::ImageFormat::Png).unwrap();
        out.into_inner()
    }

    fn deck(notes: &[&str]) -> Deck {
        Deck {
            source_path: "deck.pptx".into(),
            slides: notes
                .iter()
                .enumerate()
                .map(|(index, n)| Slide {
                    index,
                    notes_text: (*n).to_string(),
                })
                .collect(),
            width_px: 64,
            height_px: 36,
        }
    }

    fn scratch(tag: &str) -> (std::path::PathBuf, ArtifactStore) {
        let parent = std::env::temp_dir().join(format!(
            "slidecast_extract_{tag}_{}_{}",
            std::process::id(),
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .unwrap()
                .as_nanos()
        ));
        std::fs::create_dir_all(&parent).unwrap();
        let store = ArtifactStore::create(Some(&parent)).unwrap();
        (parent, store)
    }

    const POLICY: TimingPolicy = TimingPolicy {
        fallback_secs: 5,
        any_narration: true,
    };

    #[test]
    fn narration_only_for_slides_with_notes() {
        let (parent, mut store) = scratch("notes");
        let deck = deck(&["Hello", "", "   ", "Goodbye"]);
        let mut raster = StubRaster {
            fail_indices: vec![],
            garbage_indices: vec![],
        };

        let state = extract_assets(&deck, &mut raster, &StubTts, &mut store, POLICY);
        assert_eq!(state.images.len(), 4);
        assert_eq!(
            state.narrations.keys().copied().collect::<Vec<_>>(),
            vec![0, 3]
        );
        assert!((state.narrations[&0].duration_sec - 0.5).abs() < 1e-9);

        store.release();
        std::fs::remove_dir_all(&parent).unwrap();
    }

    #[test]
    fn render_failure_drops_only_that_slide() {
        let (parent, mut store) = scratch("renderfail");
        let deck = deck(&["a", "b", "c"]);
        let mut raster = StubRaster {
            fail_indices: vec![1],
            garbage_indices: vec![],
        };

        let state = extract_assets(&deck, &mut raster, &StubTts, &mut store, POLICY);
        assert_eq!(state.images.keys().copied().collect::<Vec<_>>(), vec![0, 2]);
        assert_eq!(
            state.narrations.keys().copied().collect::<Vec<_>>(),
            vec![0, 2]
        );

        store.release();
        std::fs::remove_dir_all(&parent).unwrap();
    }

    #[test]
    fn undecodable_image_bytes_drop_the_slide() {
        let (parent, mut store) = scratch("garbage");
        let deck = deck(&["", ""]);
        let mut raster = StubRaster {
            fail_indices: vec![],
            garbage_indices: vec![0],
        };

        let state = extract_assets(&deck, &mut raster, &StubTts, &mut store, POLICY);
        assert_eq!(state.images.keys().copied().collect::<Vec<_>>(), vec![1]);
        // The garbage bytes were never committed to disk.
        assert_eq!(store.tracked_count(), 1);

        store.release();
        std::fs::remove_dir_all(&parent).unwrap();
    }

    #[test]
    fn synthesis_failure_keeps_the_image() {
        let (parent, mut store) = scratch("synthfail");
        let deck = deck(&["fine", "[fail] broken"]);
        let mut raster = StubRaster {
            fail_indices: vec![],
            garbage_indices: vec![],
        };

        let state = extract_assets(&deck, &mut raster, &StubTts, &mut store, POLICY);
        assert_eq!(state.images.len(), 2);
        assert_eq!(
            state.narrations.keys().copied().collect::<Vec<_>>(),
            vec![0]
        );

        store.release();
        std::fs::remove_dir_all(&parent).unwrap();
    }
}
