use std::path::{Path, PathBuf};

use crate::error::{SlidecastError, SlidecastResult};

/// Owns every temporary file created during one conversion run.
///
/// All artifacts live in a run-scoped scratch directory. `release` deletes
/// each tracked path individually (deletion failures are logged, never
/// propagated) and then sweeps the scratch directory itself, so collaborator
/// intermediates written there cannot leak either. Release runs exactly once;
/// `Drop` is the backstop for early returns and panics.
#[derive(Debug)]
pub struct ArtifactStore {
    root: PathBuf,
    tracked: Vec<PathBuf>,
    released: bool,
}

impl ArtifactStore {
    /// Create the run's scratch directory under `parent`, or under the system
    /// temp directory when `parent` is `None`.
    pub fn create(parent: Option<&Path>) -> SlidecastResult<Self> {
        let base = parent
            .map(Path::to_path_buf)
            .unwrap_or_else(std::env::temp_dir);
        let nanos = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_nanos())
            .unwrap_or(0);
        let root = base.join(format!("slidecast-{}-{}", std::process::id(), nanos));
        std::fs::create_dir_all(&root).map_err(|e| {
            SlidecastError::io(format!(
                "failed to create scratch directory '{}': {e}",
                root.display()
            ))
        })?;
        Ok(Self {
            root,
            tracked: Vec::new(),
            released: false,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path slot for slide `index`'s rendered image.
    pub fn image_slot(&self, index: usize) -> PathBuf {
        self.root.join(format!("slide_{index}.png"))
    }

    /// Path slot for slide `index`'s narration audio.
    pub fn narration_slot(&self, index: usize) -> PathBuf {
        self.root.join(format!("narration_{index}.wav"))
    }

    pub fn track(&mut self, path: PathBuf) {
        self.tracked.push(path);
    }

    /// Write `bytes` to `path` and track it for release.
    pub fn write_tracked(&mut self, path: &Path, bytes: &[u8]) -> SlidecastResult<()> {
        std::fs::write(path, bytes).map_err(|e| {
            SlidecastError::io(format!("failed to write '{}': {e}", path.display()))
        })?;
        self.track(path.to_path_buf());
        Ok(())
    }

    pub fn tracked_count(&self) -> usize {
        self.tracked.len()
    }

    /// Delete every tracked artifact and the scratch directory. Idempotent;
    /// individual failures are logged and never block other deletions.
    pub fn release(&mut self) {
        if self.released {
            return;
        }
        self.released = true;

        for path in self.tracked.drain(..) {
            match std::fs::remove_file(&path) {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "failed to delete artifact");
                }
            }
        }

        if self.root.exists()
            && let Err(e) = std::fs::remove_dir_all(&self.root)
        {
            tracing::warn!(path = %self.root.display(), error = %e, "failed to remove scratch directory");
        }
    }
}

impl Drop for ArtifactStore {
    fn drop(&mut self) {
        self.release();
    }
}
