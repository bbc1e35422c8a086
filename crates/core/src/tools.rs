//! The seam between the pipeline and the external programs it drives.
//!
//! Every collaborator is invoked with an explicit argument vector; nothing
//! is ever passed through a shell.

use std::ffi::OsString;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use tracing::debug;
use wait_timeout::ChildExt;

use crate::error::{Error, Result};
use crate::models::ToolOutput;

/// Extension of every image the extractor writes.
pub const IMAGE_EXTENSION: &str = "png";

const CAPTION_GRAVITY: &str = "SouthEast";
const CAPTION_FILL: &str = "white";
const CAPTION_POINT_SIZE: &str = "24";
const CAPTION_OFFSET: &str = "+10+10";

#[derive(Debug, Clone, Copy)]
pub struct FrameRequest<'a> {
    pub input: &'a Path,
    /// Seek offset, `H:MM:SS`.
    pub timestamp: &'a str,
    pub output: &'a Path,
    pub overwrite: bool,
}

pub trait MediaTools {
    /// Decodes the file looking for errors. Empty combined output means clean.
    fn check_integrity(&self, path: &Path) -> Result<ToolOutput>;

    /// Prints the container duration in seconds on stdout.
    fn probe_duration(&self, path: &Path) -> Result<ToolOutput>;

    fn extract_frame(&self, request: &FrameRequest<'_>) -> Result<ToolOutput>;

    /// Burns `caption` into `image`, replacing the file in place.
    fn annotate(&self, image: &Path, caption: &str) -> Result<ToolOutput>;
}

/// Where to find each program. Bare names are looked up on `PATH`.
#[derive(Debug, Clone)]
pub struct ToolPaths {
    pub ffprobe: PathBuf,
    pub ffmpeg: PathBuf,
    pub annotator: PathBuf,
}

impl Default for ToolPaths {
    fn default() -> Self {
        Self {
            ffprobe: PathBuf::from("ffprobe"),
            ffmpeg: PathBuf::from("ffmpeg"),
            annotator: PathBuf::from("convert"),
        }
    }
}

/// [`MediaTools`] backed by ffprobe, ffmpeg and ImageMagick.
#[derive(Debug, Clone)]
pub struct ExternalTools {
    ffprobe: PathBuf,
    ffmpeg: PathBuf,
    annotator: Option<PathBuf>,
    timeout: Option<Duration>,
}

impl ExternalTools {
    /// Probes for the optional annotator once; the answer is fixed for the
    /// lifetime of the value.
    pub fn detect(paths: ToolPaths, timeout: Option<Duration>) -> Self {
        let annotator = match which::which(&paths.annotator) {
            Ok(found) => {
                debug!(path = %found.display(), "annotation tool found");
                Some(found)
            }
            Err(err) => {
                debug!(tool = %paths.annotator.display(), %err, "annotation tool not found");
                None
            }
        };
        Self {
            ffprobe: paths.ffprobe,
            ffmpeg: paths.ffmpeg,
            annotator,
            timeout,
        }
    }

    pub fn has_annotator(&self) -> bool {
        self.annotator.is_some()
    }
}

impl MediaTools for ExternalTools {
    fn check_integrity(&self, path: &Path) -> Result<ToolOutput> {
        run_tool(&self.ffprobe, &integrity_args(path), self.timeout)
    }

    fn probe_duration(&self, path: &Path) -> Result<ToolOutput> {
        run_tool(&self.ffprobe, &duration_args(path), self.timeout)
    }

    fn extract_frame(&self, request: &FrameRequest<'_>) -> Result<ToolOutput> {
        run_tool(&self.ffmpeg, &frame_args(request), self.timeout)
    }

    fn annotate(&self, image: &Path, caption: &str) -> Result<ToolOutput> {
        let Some(annotator) = self.annotator.as_deref() else {
            return Err(Error::ToolSpawn {
                tool: "annotator".to_string(),
                source: std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    "no annotation tool on PATH",
                ),
            });
        };
        run_tool(annotator, &annotate_args(image, caption), self.timeout)
    }
}

pub fn integrity_args(path: &Path) -> Vec<OsString> {
    vec!["-v".into(), "error".into(), path.into()]
}

pub fn duration_args(path: &Path) -> Vec<OsString> {
    vec![
        "-v".into(),
        "quiet".into(),
        "-show_entries".into(),
        "format=duration".into(),
        "-of".into(),
        "csv=p=0".into(),
        path.into(),
    ]
}

pub fn frame_args(request: &FrameRequest<'_>) -> Vec<OsString> {
    let clobber = if request.overwrite { "-y" } else { "-n" };
    vec![
        "-hide_banner".into(),
        "-nostdin".into(),
        "-loglevel".into(),
        "error".into(),
        clobber.into(),
        "-ss".into(),
        request.timestamp.into(),
        "-i".into(),
        request.input.into(),
        "-frames:v".into(),
        "1".into(),
        request.output.into(),
    ]
}

pub fn annotate_args(image: &Path, caption: &str) -> Vec<OsString> {
    vec![
        image.into(),
        "-gravity".into(),
        CAPTION_GRAVITY.into(),
        "-fill".into(),
        CAPTION_FILL.into(),
        "-pointsize".into(),
        CAPTION_POINT_SIZE.into(),
        "-annotate".into(),
        CAPTION_OFFSET.into(),
        caption.into(),
        image.into(),
    ]
}

/// Runs `program` to completion, capturing both output streams.
///
/// A non-zero exit is not an error here; callers inspect
/// [`ToolOutput::exit_code`]. Only failing to start the child, or the
/// timeout elapsing, produce `Err`.
pub fn run_tool(
    program: &Path,
    args: &[OsString],
    timeout: Option<Duration>,
) -> Result<ToolOutput> {
    let tool = program.display().to_string();
    debug!(tool = %tool, ?args, "running");

    let mut child = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|source| Error::ToolSpawn {
            tool: tool.clone(),
            source,
        })?;

    // Drained off-thread so a chatty child never blocks on a full pipe.
    let stdout = drain(child.stdout.take());
    let stderr = drain(child.stderr.take());

    let status = match timeout {
        Some(limit) => match child.wait_timeout(limit)? {
            Some(status) => status,
            None => {
                if let Err(err) = child.kill() {
                    debug!(tool = %tool, %err, "kill after timeout failed");
                }
                if let Err(err) = child.wait() {
                    debug!(tool = %tool, %err, "reaping timed out child failed");
                }
                // Pipes close with the child, so the readers finish.
                collect(stdout);
                collect(stderr);
                return Err(Error::ToolTimeout {
                    tool,
                    timeout: limit,
                });
            }
        },
        None => child.wait()?,
    };

    Ok(ToolOutput {
        exit_code: status.code(),
        stdout: collect(stdout),
        stderr: collect(stderr),
    })
}

fn drain<R: Read + Send + 'static>(pipe: Option<R>) -> JoinHandle<String> {
    thread::spawn(move || {
        let mut buf = Vec::new();
        if let Some(mut pipe) = pipe {
            let _ = pipe.read_to_end(&mut buf);
        }
        String::from_utf8_lossy(&buf).into_owned()
    })
}

fn collect(handle: JoinHandle<String>) -> String {
    handle.join().unwrap_or_default()
}
