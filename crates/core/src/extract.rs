use std::path::{Path, PathBuf};

use tracing::{error, info};

use crate::error::Result;
use crate::models::ExtractionResult;
use crate::tools::{FrameRequest, MediaTools, IMAGE_EXTENSION};

/// `<stem>.png` inside `output_dir`: `movie.mkv` becomes `movie.png`.
pub fn output_image_path(input: &Path, output_dir: &Path) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_os_string())
        .unwrap_or_else(|| input.as_os_str().to_os_string());
    let mut name = stem;
    name.push(".");
    name.push(IMAGE_EXTENSION);
    output_dir.join(name)
}

/// Writes one frame at `timestamp`. A non-zero exit from the tool is
/// reported in the result, not raised.
pub fn extract<T: MediaTools + ?Sized>(
    tools: &T,
    input: &Path,
    timestamp: &str,
    output_dir: &Path,
    overwrite: bool,
) -> Result<ExtractionResult> {
    let output = output_image_path(input, output_dir);
    let request = FrameRequest {
        input,
        timestamp,
        output: &output,
        overwrite,
    };
    info!(at = %timestamp, image = %output.display(), "taking snapshot");

    let result = tools.extract_frame(&request)?;
    if !result.success() {
        error!(
            path = %input.display(),
            code = ?result.exit_code,
            stderr = %result.stderr.trim(),
            "frame extraction failed"
        );
        return Ok(ExtractionResult {
            succeeded: false,
            output_image_path: None,
            exit_code: result.exit_code,
            stderr: result.stderr,
        });
    }

    Ok(ExtractionResult {
        succeeded: true,
        output_image_path: Some(output),
        exit_code: result.exit_code,
        stderr: result.stderr,
    })
}
