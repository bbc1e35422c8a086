//! Drives the per-file pipeline over a single file or a directory tree.

use std::fs;
use std::path::Path;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use rand::Rng;
use tracing::{error, info, warn};
use walkdir::{DirEntry, WalkDir};

use crate::annotate::annotate;
use crate::error::{Error, Result};
use crate::extract::extract;
use crate::models::{
    Annotation, Classification, FileOutcome, FileReport, InputMode, RunConfig, RunStats, Stage,
};
use crate::sample::sample;
use crate::tools::MediaTools;
use crate::video::classify;

#[derive(Clone, Debug, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

pub fn run<T, R>(config: &RunConfig, tools: &T, rng: &mut R) -> Result<RunStats>
where
    T: MediaTools + ?Sized,
    R: Rng + ?Sized,
{
    run_with_progress(config, tools, rng, None, |_| {})
}

/// Processes every candidate file, handing each outcome to `on_file`.
///
/// Per-file failures are recorded in the returned stats and never stop the
/// walk. The only error is [`Error::Cancelled`].
pub fn run_with_progress<T, R, F>(
    config: &RunConfig,
    tools: &T,
    rng: &mut R,
    cancel: Option<&CancelToken>,
    mut on_file: F,
) -> Result<RunStats>
where
    T: MediaTools + ?Sized,
    R: Rng + ?Sized,
    F: FnMut(&FileReport),
{
    check_cancelled(cancel)?;
    let mut stats = RunStats::default();

    match &config.input {
        InputMode::SingleFile(path) => {
            let outcome = process_file(config, tools, rng, path);
            check_cancelled(cancel)?;
            stats.files_seen += 1;
            stats.record(&outcome);
            on_file(&FileReport {
                path: path.clone(),
                outcome,
            });
        }
        InputMode::Directory(root) => {
            let output_dir = fs::canonicalize(&config.output_dir).ok();
            let max_depth = if config.recursive { usize::MAX } else { 1 };
            let walker = WalkDir::new(root)
                .min_depth(1)
                .max_depth(max_depth)
                .follow_links(false)
                .into_iter()
                .filter_entry(|entry| !is_output_dir(entry, output_dir.as_deref()));

            for entry in walker {
                check_cancelled(cancel)?;

                let entry = match entry {
                    Ok(v) => v,
                    Err(err) => {
                        warn!(%err, "skipping unreadable entry");
                        stats.skipped += 1;
                        continue;
                    }
                };

                // Directories are either descended into by the walker or,
                // without --recursive, ignored.
                if entry.file_type().is_dir() || !entry.path().is_file() {
                    continue;
                }

                let path = entry.into_path();
                let outcome = process_file(config, tools, rng, &path);
                check_cancelled(cancel)?;
                stats.files_seen += 1;
                stats.record(&outcome);
                on_file(&FileReport { path, outcome });
            }
        }
    }

    Ok(stats)
}

/// Classifier, sampler, extractor, then the annotator when available.
pub fn process_file<T, R>(
    config: &RunConfig,
    tools: &T,
    rng: &mut R,
    path: &Path,
) -> FileOutcome
where
    T: MediaTools + ?Sized,
    R: Rng + ?Sized,
{
    info!(path = %path.display(), "processing");

    match classify(tools, path) {
        Ok(Classification::Video) => {}
        Ok(Classification::NotVideo) => return FileOutcome::NotVideo,
        Ok(Classification::Unreadable { diagnostic }) => {
            return FileOutcome::Unreadable { diagnostic };
        }
        Err(err) => {
            error!(path = %path.display(), %err, "integrity check failed");
            return FileOutcome::Failed {
                stage: Stage::Classify,
                message: err.to_string(),
            };
        }
    }

    let sample = match sample(tools, path, rng) {
        Ok(v) => v,
        Err(err) => {
            error!(path = %path.display(), %err, "duration probe failed");
            return FileOutcome::Failed {
                stage: Stage::Duration,
                message: err.to_string(),
            };
        }
    };

    let extraction = match extract(
        tools,
        path,
        &sample.timestamp_text(),
        &config.output_dir,
        config.overwrite,
    ) {
        Ok(v) => v,
        Err(err) => {
            error!(path = %path.display(), %err, "frame extraction failed");
            return FileOutcome::Failed {
                stage: Stage::Extract,
                message: err.to_string(),
            };
        }
    };

    let Some(image) = extraction.output_image_path.filter(|_| extraction.succeeded) else {
        return FileOutcome::Failed {
            stage: Stage::Extract,
            message: format!(
                "exit {:?}: {}",
                extraction.exit_code,
                extraction.stderr.trim()
            ),
        };
    };

    let annotation = if config.annotate {
        annotate(tools, &image, &sample)
    } else {
        Annotation::Unavailable
    };

    FileOutcome::Extracted {
        sample,
        image,
        annotation,
    }
}

fn check_cancelled(cancel: Option<&CancelToken>) -> Result<()> {
    match cancel {
        Some(token) if token.is_cancelled() => Err(Error::Cancelled),
        _ => Ok(()),
    }
}

fn is_output_dir(entry: &DirEntry, output_dir: Option<&Path>) -> bool {
    let Some(output_dir) = output_dir else {
        return false;
    };
    entry.file_type().is_dir()
        && fs::canonicalize(entry.path()).is_ok_and(|p| p == output_dir)
}
