use std::path::{Path, PathBuf};
use std::time::Duration;

/// Which input the run was pointed at. Directory and single-file mode are
/// mutually exclusive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputMode {
    Directory(PathBuf),
    SingleFile(PathBuf),
}

impl InputMode {
    pub fn path(&self) -> &Path {
        match self {
            InputMode::Directory(p) | InputMode::SingleFile(p) => p,
        }
    }
}

/// Resolved, immutable configuration for one run.
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub input: InputMode,
    pub output_dir: PathBuf,
    pub recursive: bool,
    pub overwrite: bool,
    /// Whether the annotation tool was found at startup.
    pub annotate: bool,
    /// Per tool invocation. `None` waits forever.
    pub timeout: Option<Duration>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classification {
    Video,
    NotVideo,
    Unreadable { diagnostic: String },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SampleResult {
    pub duration_seconds: f64,
    pub sampled_second: u64,
}

#[derive(Debug, Clone)]
pub struct ExtractionResult {
    pub succeeded: bool,
    pub output_image_path: Option<PathBuf>,
    pub exit_code: Option<i32>,
    pub stderr: String,
}

/// Captured result of one external tool invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToolOutput {
    /// `None` when the child was terminated by a signal.
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl ToolOutput {
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }

    /// stdout followed by stderr, trimmed.
    pub fn combined(&self) -> String {
        let mut text = String::with_capacity(self.stdout.len() + self.stderr.len());
        text.push_str(self.stdout.trim());
        if !text.is_empty() && !self.stderr.trim().is_empty() {
            text.push('\n');
        }
        text.push_str(self.stderr.trim());
        text
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Annotation {
    /// The annotation tool is not installed.
    Unavailable,
    Applied,
    Failed { message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Classify,
    Duration,
    Extract,
}

#[derive(Debug, Clone)]
pub enum FileOutcome {
    NotVideo,
    Unreadable {
        diagnostic: String,
    },
    Failed {
        stage: Stage,
        message: String,
    },
    Extracted {
        sample: SampleResult,
        image: PathBuf,
        annotation: Annotation,
    },
}

#[derive(Debug, Clone)]
pub struct FileReport {
    pub path: PathBuf,
    pub outcome: FileOutcome,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RunStats {
    pub files_seen: u64,
    pub extracted: u64,
    pub annotated: u64,
    pub skipped: u64,
    pub failed: u64,
}

impl RunStats {
    pub(crate) fn record(&mut self, outcome: &FileOutcome) {
        match outcome {
            FileOutcome::NotVideo | FileOutcome::Unreadable { .. } => self.skipped += 1,
            FileOutcome::Failed { .. } => self.failed += 1,
            FileOutcome::Extracted { annotation, .. } => {
                self.extracted += 1;
                if *annotation == Annotation::Applied {
                    self.annotated += 1;
                }
            }
        }
    }
}
