use std::path::Path;

use tracing::{error, info};

use crate::models::{Annotation, SampleResult};
use crate::tools::MediaTools;

pub fn caption(duration_text: &str, timestamp_text: &str) -> String {
    format!("{duration_text} @ {timestamp_text}")
}

/// Burns the duration and sampled timestamp into `image`. Failures leave
/// the plain frame on disk and are only reported.
pub fn annotate<T: MediaTools + ?Sized>(
    tools: &T,
    image: &Path,
    sample: &SampleResult,
) -> Annotation {
    let text = caption(&sample.duration_text(), &sample.timestamp_text());
    match tools.annotate(image, &text) {
        Ok(out) if out.success() => {
            info!(image = %image.display(), caption = %text, "annotated");
            Annotation::Applied
        }
        Ok(out) => {
            let message = format!("exit {:?}: {}", out.exit_code, out.combined());
            error!(image = %image.display(), %message, "annotation failed");
            Annotation::Failed { message }
        }
        Err(err) => {
            error!(image = %image.display(), %err, "annotation failed");
            Annotation::Failed {
                message: err.to_string(),
            }
        }
    }
}
