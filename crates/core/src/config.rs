use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use tracing::debug;

use crate::error::{Error, Result};
use crate::models::{InputMode, RunConfig};

/// Name of the output directory created next to the input when no
/// explicit output is given.
pub const DEFAULT_OUTPUT_DIR: &str = "pics";

/// Unvalidated selections, as they come off the command line.
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    pub input_dir: Option<PathBuf>,
    pub file: Option<PathBuf>,
    pub output_dir: Option<PathBuf>,
    pub recursive: bool,
    pub no_overwrite: bool,
    pub annotate: bool,
    pub timeout: Option<Duration>,
}

impl RunConfig {
    /// Validates `options` and creates the output directory.
    ///
    /// Nothing is written to disk unless every check passes.
    pub fn resolve(options: RunOptions) -> Result<Self> {
        let input = match (options.input_dir, options.file) {
            (Some(_), Some(_)) => {
                return Err(Error::InvalidArgument(
                    "--input and --file cannot be used together".to_string(),
                ));
            }
            (None, None) => {
                return Err(Error::InvalidArgument(
                    "input directory or file was not specified".to_string(),
                ));
            }
            (Some(dir), None) => {
                if !dir.exists() {
                    return Err(Error::InvalidArgument(format!(
                        "{} - the directory does not exist",
                        dir.to_string_lossy()
                    )));
                }
                if !dir.is_dir() {
                    return Err(Error::InvalidArgument(format!(
                        "{} - not a directory",
                        dir.to_string_lossy()
                    )));
                }
                InputMode::Directory(dir)
            }
            (None, Some(file)) => InputMode::SingleFile(file),
        };

        let output_dir = match options.output_dir {
            Some(dir) => dir,
            None => default_output_dir(&input),
        };
        if output_dir.as_os_str().is_empty() {
            return Err(Error::InvalidArgument("output path is empty".to_string()));
        }
        if !output_dir.is_dir() {
            debug!(path = %output_dir.display(), "creating output directory");
            fs::create_dir_all(&output_dir)?;
        }

        Ok(Self {
            input,
            output_dir,
            recursive: options.recursive,
            overwrite: !options.no_overwrite,
            annotate: options.annotate,
            timeout: options.timeout,
        })
    }
}

fn default_output_dir(input: &InputMode) -> PathBuf {
    match input {
        InputMode::Directory(dir) => dir.join(DEFAULT_OUTPUT_DIR),
        InputMode::SingleFile(file) => file
            .parent()
            .map(|p| p.join(DEFAULT_OUTPUT_DIR))
            .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT_DIR)),
    }
}
