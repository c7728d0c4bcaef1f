use std::{
    path::{Path, PathBuf},
    process::Command,
};

use crate::{
    error::{SlidecastError, SlidecastResult},
    model::Slide,
};

/// Renders one slide to still-image bytes at the deck's dimensions.
pub trait Rasterizer {
    /// Called once per run with the run's scratch directory before any
    /// `render` call. Intermediates written there are swept with the run.
    fn prepare(&mut self, scratch_dir: &Path) -> SlidecastResult<()> {
        let _ = scratch_dir;
        Ok(())
    }

    fn render(&mut self, slide: &Slide, dimensions: (u32, u32)) -> SlidecastResult<Vec<u8>>;
}

/// Rasterizes via LibreOffice: the deck is converted to PDF once (lazily, on
/// the first render), then each slide's page is rasterized to PNG with
/// `pdftoppm`.
pub struct SofficeRasterizer {
    deck_path: PathBuf,
    scratch_dir: Option<PathBuf>,
    pdf_path: Option<PathBuf>,
}

impl SofficeRasterizer {
    pub fn new(deck_path: impl Into<PathBuf>) -> Self {
        Self {
            deck_path: deck_path.into(),
            scratch_dir: None,
            pdf_path: None,
        }
    }

    fn ensure_pdf(&mut self) -> SlidecastResult<&Path> {
        if self.pdf_path.is_some() {
            return Ok(self.pdf_path.as_deref().unwrap());
        }

        let scratch = self.scratch_dir.as_deref().ok_or_else(|| {
            SlidecastError::render("rasterizer used before prepare (no scratch directory)")
        })?;

        tracing::debug!(deck = %self.deck_path.display(), "converting deck to pdf");
        let out = Command::new("soffice")
            .args(["--headless", "--convert-to", "pdf", "--outdir"])
            .arg(scratch)
            .arg(&self.deck_path)
            .output()
            .map_err(|e| {
                SlidecastError::render(format!(
                    "failed to spawn soffice (is LibreOffice installed and on PATH?): {e}"
                ))
            })?;
        if !out.status.success() {
            return Err(SlidecastError::render(format!(
                "soffice pdf conversion failed for '{}': {}",
                self.deck_path.display(),
                String::from_utf8_lossy(&out.stderr).trim()
            )));
        }

        let stem = self
            .deck_path
            .file_stem()
            .ok_or_else(|| SlidecastError::render("deck path has no file name"))?;
        let pdf = scratch.join(stem).with_extension("pdf");
        if !pdf.is_file() {
            return Err(SlidecastError::render(format!(
                "soffice reported success but '{}' was not produced",
                pdf.display()
            )));
        }
        self.pdf_path = Some(pdf);
        Ok(self.pdf_path.as_deref().unwrap())
    }
}

impl Rasterizer for SofficeRasterizer {
    fn prepare(&mut self, scratch_dir: &Path) -> SlidecastResult<()> {
        self.scratch_dir = Some(scratch_dir.to_path_buf());
        Ok(())
    }

    fn render(&mut self, slide: &Slide, dimensions: (u32, u32)) -> SlidecastResult<Vec<u8>> {
        let pdf = self.ensure_pdf()?.to_path_buf();
        // pdftoppm pages are 1-based.
        let page = (slide.index + 1).to_string();
        let out = Command::new("pdftoppm")
            .args(["-png", "-f", &page, "-l", &page])
            .args(["-scale-to-x", &dimensions.0.to_string()])
            .args(["-scale-to-y", &dimensions.1.to_string()])
            .arg(&pdf)
            .output()
            .map_err(|e| {
                SlidecastError::render(format!(
                    "failed to spawn pdftoppm (is poppler installed and on PATH?): {e}"
                ))
            })?;
        if !out.status.success() {
            return Err(SlidecastError::render(format!(
                "pdftoppm failed for slide {}: {}",
                slide.index,
                String::from_utf8_lossy(&out.stderr).trim()
            )));
        }
        if out.stdout.is_empty() {
            return Err(SlidecastError::render(format!(
                "pdftoppm produced no image for slide {} (page {page} missing?)",
                slide.index
            )));
        }
        Ok(out.stdout)
    }
}
