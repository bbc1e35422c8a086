use std::path::Path;

use tracing::{debug, warn};

use crate::error::Result;
use crate::models::Classification;
use crate::tools::MediaTools;

/// Guesses from the file name whether `path` is a video. Unknown
/// extensions are not videos.
pub fn looks_like_video(path: &Path) -> bool {
    mime_guess::from_path(path)
        .first()
        .is_some_and(|mime| mime.type_() == mime_guess::mime::VIDEO)
}

/// Name-based guess first; only candidates that look like video are handed
/// to the integrity probe.
pub fn classify<T: MediaTools + ?Sized>(tools: &T, path: &Path) -> Result<Classification> {
    if !looks_like_video(path) {
        warn!(path = %path.display(), "not a video mime type");
        return Ok(Classification::NotVideo);
    }

    let output = tools.check_integrity(path)?;
    let diagnostic = output.combined();
    if !diagnostic.is_empty() {
        warn!(path = %path.display(), "integrity check reported errors");
        debug!(path = %path.display(), %diagnostic, "integrity check output");
        return Ok(Classification::Unreadable { diagnostic });
    }

    Ok(Classification::Video)
}
