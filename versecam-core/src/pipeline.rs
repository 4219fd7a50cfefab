//! The pipeline orchestrator: one button press in, one receipt out.
//!
//! One state machine drives the whole job:
//! `Idle → ResolvingInput → Captioning → Generating → Printing →
//! Archiving → Idle`. Failures inside a stage are caught here and
//! downgraded to partial output, so the receipt always shows the job was
//! attempted, and the machine always returns to idle with the device in
//! a known state. The single exception is a capture failure: with no
//! image read at all there is nothing to print or archive, so the job
//! aborts after a device reset.

use crate::layout::{self, POEM_COLUMNS};
use crate::uploads::UploadStore;
use anyhow::{Context, Result};
use chrono::Local;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};
use versecam_io::{Camera, PrintJob, Printer, Segment};
use versecam_neural::prompts::{self, FALLBACK_CAPTION, SYSTEM_PROMPT};
use versecam_neural::retry::retry_fixed;
use versecam_neural::{Captioner, Poet, ServiceError};

/// Generation retry policy: bounded attempts, fixed inter-attempt delay.
const GENERATE_ATTEMPTS: u32 = 3;
const GENERATE_DELAY: Duration = Duration::from_secs(2);

/// Pacing pause after each text segment; the print head is slower than
/// the wire.
const SEGMENT_PAUSE: Duration = Duration::from_secs(1);

/// Decorative rule under the timestamp, matching the deployed receipts.
const HEADER_RULE: &str = "`' . ' ` ' . ' ` ' . ' `\n   `     `     `     `     `\n";

/// Attribution and archive pointer at the bottom of every receipt.
const FOOTER: &str =
    "   .     .     .     .     .   \n_.` `._.` `._.` `._.` `._.` `._\n\n 这首诗由AI创作。\n在以下网址探索档案\nroefruit.com\n\n\n\n";

/// Pipeline stages, used as the structured key on every job log event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    ResolvingInput,
    Captioning,
    Generating,
    Printing,
    Archiving,
}

impl Stage {
    fn name(self) -> &'static str {
        match self {
            Stage::ResolvingInput => "resolving_input",
            Stage::Captioning => "captioning",
            Stage::Generating => "generating",
            Stage::Printing => "printing",
            Stage::Archiving => "archiving",
        }
    }
}

/// Where the job's image came from. Only consumed uploads are archived;
/// camera captures are not uploads and stay where they landed.
enum ImageSource {
    Upload(PathBuf),
    Capture(PathBuf),
}

/// Outcome of one pipeline job. `poem` is absent only when every
/// generation attempt failed; the receipt still carries header and
/// footer so the physical output always signals "job attempted".
#[derive(Debug)]
pub struct JobReport {
    pub caption: String,
    pub poem: Option<String>,
    pub archived: Option<PathBuf>,
}

pub struct Pipeline {
    printer: Arc<Mutex<Printer>>,
    captioner: Arc<dyn Captioner>,
    poet: Arc<dyn Poet>,
    camera: Camera,
    uploads: UploadStore,
    capture_dir: PathBuf,
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("capture_dir", &self.capture_dir)
            .finish()
    }
}

impl Pipeline {
    pub fn new(
        printer: Arc<Mutex<Printer>>,
        captioner: Arc<dyn Captioner>,
        poet: Arc<dyn Poet>,
        camera: Camera,
        uploads: UploadStore,
        capture_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            printer,
            captioner,
            poet,
            camera,
            uploads,
            capture_dir: capture_dir.into(),
        }
    }

    /// Run one job to completion. Degraded jobs still return `Ok`; the
    /// only `Err` is a capture failure, where the pipeline never read an
    /// image at all.
    pub async fn run(&self) -> Result<JobReport> {
        info!("pipeline job started");

        // ResolvingInput: an existing upload wins over a fresh capture.
        let source = match self.resolve_input().await {
            Ok(source) => source,
            Err(e) => {
                error!(stage = Stage::ResolvingInput.name(), error = %e, "job aborted");
                self.printer.lock().await.reset();
                return Err(e);
            }
        };

        let (image_path, upload) = match source {
            ImageSource::Upload(path) => (path.clone(), Some(path)),
            ImageSource::Capture(path) => (path, None),
        };

        // Captioning: degraded-continue with the fixed neutral scene.
        let caption = match self.caption_image(&image_path).await {
            Ok(caption) => caption,
            Err(e) => {
                warn!(stage = Stage::Captioning.name(), error = %e, "falling back to neutral caption");
                FALLBACK_CAPTION.to_string()
            }
        };

        // Generating: bounded retry; after exhaustion the job proceeds
        // without a poem body.
        let poem = match self.generate_poem(&caption).await {
            Ok(poem) => Some(poem),
            Err(e) => {
                error!(stage = Stage::Generating.name(), error = %e, "attempts exhausted; printing without poem");
                None
            }
        };

        // Printing: header and footer always; one cut for the whole unit.
        self.print_receipt(poem.as_deref()).await;

        // Archiving: a consumed upload moves exactly once; captures stay.
        let archived = match upload {
            Some(path) => match self.uploads.archive(&path) {
                Ok(dest) => Some(dest),
                Err(e) => {
                    error!(stage = Stage::Archiving.name(), error = %e, "archive failed");
                    None
                }
            },
            None => None,
        };

        info!(degraded = poem.is_none(), "pipeline job finished");
        Ok(JobReport {
            caption,
            poem,
            archived,
        })
    }

    async fn resolve_input(&self) -> Result<ImageSource> {
        let pending = match self.uploads.latest() {
            Ok(pending) => pending,
            Err(e) => {
                warn!(stage = Stage::ResolvingInput.name(), error = %e, "uploads scan failed");
                None
            }
        };
        if let Some(upload) = pending {
            info!(stage = Stage::ResolvingInput.name(), path = %upload.display(), "using pending upload");
            return Ok(ImageSource::Upload(upload));
        }

        let path = self.capture_dir.join("image.jpg");
        info!(stage = Stage::ResolvingInput.name(), "no pending upload; capturing");
        self.camera.capture_to(&path).await?;
        Ok(ImageSource::Capture(path))
    }

    async fn caption_image(&self, path: &Path) -> Result<String> {
        let bytes =
            std::fs::read(path).with_context(|| format!("reading image {}", path.display()))?;
        let caption = self.captioner.caption(&bytes).await?;
        info!(stage = Stage::Captioning.name(), caption = %caption, "scene captioned");
        Ok(caption)
    }

    async fn generate_poem(&self, caption: &str) -> Result<String, ServiceError> {
        let user_prompt = prompts::build_user_prompt(caption);
        retry_fixed(GENERATE_ATTEMPTS, GENERATE_DELAY, || {
            self.poet.generate(SYSTEM_PROMPT, &user_prompt)
        })
        .await
    }

    /// Emit the receipt. The printer is locked per segment, not per job,
    /// so a shutdown racing this only waits for the in-flight write.
    async fn print_receipt(&self, poem: Option<&str>) {
        let mut job = PrintJob::new().text(header());
        if let Some(poem) = poem {
            let body: Vec<String> = layout::wrap(poem, POEM_COLUMNS).collect();
            job = job.text(format!("{}\n", body.join("\n")));
        }
        let job = job.text(FOOTER).cut();

        self.printer.lock().await.reset();
        for segment in job.segments() {
            match segment {
                Segment::Text(text) => {
                    let written = self.printer.lock().await.write_text(text);
                    debug!(stage = Stage::Printing.name(), bytes = written, "segment sent");
                    tokio::time::sleep(SEGMENT_PAUSE).await;
                }
                Segment::Cut => self.printer.lock().await.cut_paper(),
            }
        }
        info!(
            stage = Stage::Printing.name(),
            segments = job.segments().len(),
            "receipt sent"
        );
    }
}

/// Timestamp line plus the decorative rule, as the deployed device
/// prints it.
fn header() -> String {
    let now = Local::now();
    format!(
        "\n{}\n{}\n\n{}",
        now.format("%b %-d, %Y"),
        now.format("%-I:%M %p"),
        HEADER_RULE
    )
}
