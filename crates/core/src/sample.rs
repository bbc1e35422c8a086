//! Duration probing and random timestamp selection.

use std::path::Path;

use rand::Rng;
use tracing::info;

use crate::error::{Error, Result};
use crate::models::SampleResult;
use crate::tools::MediaTools;

/// Parses the duration probe's single numeric line.
pub fn parse_duration(text: &str) -> std::result::Result<f64, String> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err("probe printed nothing".to_string());
    }
    let value: f64 = trimmed
        .parse()
        .map_err(|_| format!("not a number: {trimmed:?}"))?;
    if !value.is_finite() || value < 0.0 {
        return Err(format!("out of range: {trimmed}"));
    }
    Ok(value)
}

/// Draws a whole second uniformly from `[0, floor(duration)]`.
pub fn sample_second<R: Rng + ?Sized>(duration_seconds: f64, rng: &mut R) -> u64 {
    let range = duration_seconds.max(0.0).floor() as u64;
    if range == 0 {
        return 0;
    }
    rng.gen_range(0..=range)
}

pub fn sample<T, R>(tools: &T, path: &Path, rng: &mut R) -> Result<SampleResult>
where
    T: MediaTools + ?Sized,
    R: Rng + ?Sized,
{
    let output = tools.probe_duration(path)?;
    if !output.success() {
        return Err(Error::Duration {
            path: path.to_path_buf(),
            reason: format!(
                "probe exited with {:?}: {}",
                output.exit_code,
                output.stderr.trim()
            ),
        });
    }

    let duration_seconds = parse_duration(&output.stdout).map_err(|reason| Error::Duration {
        path: path.to_path_buf(),
        reason,
    })?;
    let sampled_second = sample_second(duration_seconds, rng);
    info!(
        duration = %format_duration(duration_seconds),
        at = %format_timestamp(sampled_second),
        "sampled"
    );

    Ok(SampleResult {
        duration_seconds,
        sampled_second,
    })
}

/// `H:MM:SS`; hours are not padded and grow past 24.
pub fn format_timestamp(seconds: u64) -> String {
    let hours = seconds / 3600;
    let minutes = (seconds % 3600) / 60;
    let secs = seconds % 60;
    format!("{hours}:{minutes:02}:{secs:02}")
}

/// Like [`format_timestamp`], keeping milliseconds when there are any.
pub fn format_duration(seconds: f64) -> String {
    let seconds = seconds.max(0.0);
    let whole = seconds.trunc() as u64;
    let millis = ((seconds - seconds.trunc()) * 1000.0).round() as u64;
    // 0.9996 rounds up into the next second.
    let (whole, millis) = if millis >= 1000 {
        (whole + 1, 0)
    } else {
        (whole, millis)
    };
    if millis == 0 {
        format_timestamp(whole)
    } else {
        format!("{}.{millis:03}", format_timestamp(whole))
    }
}

impl SampleResult {
    pub fn timestamp_text(&self) -> String {
        format_timestamp(self.sampled_second)
    }

    pub fn duration_text(&self) -> String {
        format_duration(self.duration_seconds)
    }
}

#[cfg(test)]
mod tests {
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    use super::*;

    #[test]
    fn parses_probe_output() {
        assert_eq!(parse_duration("10.000000\n"), Ok(10.0));
        assert_eq!(parse_duration("  0.04 "), Ok(0.04));
        assert_eq!(parse_duration("0"), Ok(0.0));
    }

    #[test]
    fn rejects_garbage_durations() {
        for text in ["", "\n", "N/A", "-1.5", "inf", "NaN", "12s"] {
            assert!(parse_duration(text).is_err(), "{text:?}");
        }
    }

    #[test]
    fn zero_length_always_samples_zero() {
        let mut rng = StdRng::seed_from_u64(7);
        for duration in [0.0, 0.2, 0.999] {
            for _ in 0..100 {
                assert_eq!(sample_second(duration, &mut rng), 0);
            }
        }
    }

    #[test]
    fn samples_stay_within_the_floor_of_the_duration() {
        let mut rng = StdRng::seed_from_u64(42);
        for duration in [1.0_f64, 2.5, 10.0, 59.9, 3600.7] {
            let upper = duration.floor() as u64;
            let mut hit_upper = false;
            for _ in 0..5_000 {
                let s = sample_second(duration, &mut rng);
                assert!(s <= upper, "{s} > {upper} for {duration}");
                hit_upper |= s == upper;
            }
            if upper <= 10 {
                assert!(hit_upper, "upper bound {upper} never drawn");
            }
        }
    }

    #[test]
    fn formats_timestamps() {
        assert_eq!(format_timestamp(0), "0:00:00");
        assert_eq!(format_timestamp(65), "0:01:05");
        assert_eq!(format_timestamp(3_600 * 27 + 61), "27:01:01");
    }

    #[test]
    fn formats_fractional_durations() {
        assert_eq!(format_duration(10.0), "0:00:10");
        assert_eq!(format_duration(83.25), "0:01:23.250");
        assert_eq!(format_duration(1.9996), "0:00:02");
    }
}
