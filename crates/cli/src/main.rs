use std::path::PathBuf;
use std::time::Duration;

use clap::{ArgAction, CommandFactory, Parser};
use crossterm::style::Stylize;
use tracing::warn;
use tracing_subscriber::EnvFilter;

use snavi_core::config::RunOptions;
use snavi_core::scan::{run_with_progress, CancelToken};
use snavi_core::tools::{ExternalTools, ToolPaths};
use snavi_core::{Annotation, FileOutcome, FileReport, InputMode, RunConfig, RunStats};

/// Exit code for usage errors, bad input paths and interruption.
const EXIT_USAGE: i32 = 2;

/// Takes a snapshot at a random time of every video it is pointed at.
#[derive(Parser, Debug)]
#[command(name = "snavi", version, disable_help_flag = true)]
struct Cli {
    /// Print this help
    #[arg(short = 'h', long = "help", action = ArgAction::SetTrue)]
    help: bool,

    /// Snapshot a single video file
    #[arg(short = 'f', long = "file", value_name = "PATH", conflicts_with = "input")]
    file: Option<PathBuf>,

    /// Snapshot every video in a directory
    #[arg(short = 'i', long = "input", value_name = "PATH")]
    input: Option<PathBuf>,

    /// Where to write images [default: <input>/pics]
    #[arg(short = 'o', long = "output", value_name = "PATH")]
    output: Option<PathBuf>,

    /// Do not overwrite existing images
    #[arg(short = 'n', long = "no-overwrite")]
    no_overwrite: bool,

    /// Descend into subdirectories
    #[arg(short = 'r', long = "recursive")]
    recursive: bool,

    /// Give up on any single tool invocation after this many seconds
    #[arg(long, value_name = "SECONDS", value_parser = clap::value_parser!(u64).range(1..))]
    timeout: Option<u64>,

    #[arg(long, value_name = "PATH", env = "SNAVI_FFPROBE", default_value = "ffprobe")]
    ffprobe: PathBuf,

    #[arg(long, value_name = "PATH", env = "SNAVI_FFMPEG", default_value = "ffmpeg")]
    ffmpeg: PathBuf,

    /// Captions images when found; skipped otherwise
    #[arg(long, value_name = "PATH", env = "SNAVI_ANNOTATOR", default_value = "convert")]
    annotator: PathBuf,

    /// Debug log output
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count)]
    verbose: u8,
}

impl Cli {
    fn options(&self, annotate: bool) -> RunOptions {
        RunOptions {
            input_dir: self.input.clone(),
            file: self.file.clone(),
            output_dir: self.output.clone(),
            recursive: self.recursive,
            no_overwrite: self.no_overwrite,
            annotate,
            timeout: self.timeout.map(Duration::from_secs),
        }
    }

    fn tool_paths(&self) -> ToolPaths {
        ToolPaths {
            ffprobe: self.ffprobe.clone(),
            ffmpeg: self.ffmpeg.clone(),
            annotator: self.annotator.clone(),
        }
    }
}

fn main() {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            if !err.use_stderr() {
                // --version
                err.exit();
            }
            let _ = err.print();
            std::process::exit(EXIT_USAGE);
        }
    };

    init_logging(cli.verbose);

    let cancel = CancelToken::new();
    {
        let cancel = cancel.clone();
        if let Err(err) = ctrlc::set_handler(move || cancel.cancel()) {
            warn!(%err, "could not install interrupt handler");
        }
    }

    std::process::exit(real_main(&cli, &cancel));
}

/// Filter used when `RUST_LOG` is unset.
fn default_level(verbose: u8) -> &'static str {
    match verbose {
        0 => "info",
        _ => "debug",
    }
}

fn init_logging(verbose: u8) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_level(verbose)));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn real_main(cli: &Cli, cancel: &CancelToken) -> i32 {
    if cli.help {
        print_help();
        return EXIT_USAGE;
    }

    let tools = ExternalTools::detect(cli.tool_paths(), cli.timeout.map(Duration::from_secs));
    let config = match RunConfig::resolve(cli.options(tools.has_annotator())) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("error: {err}");
            print_help();
            return EXIT_USAGE;
        }
    };
    print_config(&config);

    let mut rng = rand::thread_rng();
    match run_with_progress(&config, &tools, &mut rng, Some(cancel), print_report) {
        Ok(stats) => {
            print_stats(&stats);
            0
        }
        Err(snavi_core::Error::Cancelled) => {
            eprintln!("\ninterrupted by user, stopping");
            EXIT_USAGE
        }
        Err(err) => {
            eprintln!("error: {err}");
            EXIT_USAGE
        }
    }
}

fn print_help() {
    println!("{}", Cli::command().render_help());
}

fn print_config(config: &RunConfig) {
    match &config.input {
        InputMode::Directory(dir) => println!("Input folder : {}", dir.display()),
        InputMode::SingleFile(file) => println!("Input file   : {}", file.display()),
    }
    println!("Output folder: {}", config.output_dir.display());
    if !config.annotate {
        println!("Annotation   : off (annotation tool not found)");
    }
    println!();
}

fn print_report(report: &FileReport) {
    let name = report.path.display();
    match &report.outcome {
        FileOutcome::NotVideo => println!("{} {name}: not a video", "[ WARN ]".yellow()),
        FileOutcome::Unreadable { diagnostic } => {
            println!("{} {name}: unreadable\n{diagnostic}", "[ WARN ]".yellow())
        }
        FileOutcome::Failed { stage, message } => {
            println!("{} {name} ({stage:?}): {message}", "[ FAIL ]".red())
        }
        FileOutcome::Extracted {
            sample,
            image,
            annotation,
        } => {
            println!(
                "{} {name} -> {} at {} of {}",
                "[  OK  ]".green(),
                image.display(),
                sample.timestamp_text(),
                sample.duration_text()
            );
            if let Annotation::Failed { message } = annotation {
                println!("         caption failed: {message}");
            }
        }
    }
}

fn print_stats(stats: &RunStats) {
    println!(
        "\nfiles_seen: {}, extracted: {}, annotated: {}, skipped: {}, failed: {}",
        stats.files_seen, stats.extracted, stats.annotated, stats.skipped, stats.failed
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<Cli, clap::Error> {
        Cli::try_parse_from(std::iter::once("snavi").chain(args.iter().copied()))
    }

    #[test]
    fn parses_short_and_long_forms() {
        let cli = parse(&["--file=movie.mkv", "-o", "/tmp/out", "-n"]).unwrap();
        assert_eq!(cli.file, Some(PathBuf::from("movie.mkv")));
        assert_eq!(cli.output, Some(PathBuf::from("/tmp/out")));
        assert!(cli.no_overwrite);
        assert!(!cli.recursive);

        let cli = parse(&["-i", "videos", "-r", "--timeout", "30"]).unwrap();
        assert_eq!(cli.input, Some(PathBuf::from("videos")));
        assert!(cli.recursive);
        let options = cli.options(false);
        assert_eq!(options.timeout, Some(Duration::from_secs(30)));
        assert!(!options.no_overwrite);
    }

    #[test]
    fn file_and_input_are_exclusive() {
        let err = parse(&["-f", "a.mp4", "-i", "dir"]).unwrap_err();
        assert_eq!(err.exit_code(), EXIT_USAGE);
    }

    #[test]
    fn zero_timeout_is_rejected() {
        let err = parse(&["-i", "videos", "--timeout", "0"]).unwrap_err();
        assert_eq!(err.exit_code(), EXIT_USAGE);
        assert!(parse(&["-i", "videos", "--timeout", "1"]).is_ok());
    }

    #[test]
    fn verbosity_picks_the_default_filter() {
        assert_eq!(default_level(0), "info");
        assert_eq!(default_level(1), "debug");
        assert_eq!(default_level(3), "debug");
        assert_eq!(parse(&["-v"]).unwrap().verbose, 1);
    }

    #[test]
    fn unknown_flags_are_usage_errors() {
        let err = parse(&["--frobnicate"]).unwrap_err();
        assert_eq!(err.exit_code(), EXIT_USAGE);
    }

    #[test]
    fn help_exits_with_usage_code() {
        let cli = parse(&["-h"]).unwrap();
        assert!(cli.help);
        assert_eq!(real_main(&cli, &CancelToken::new()), EXIT_USAGE);
    }

    #[test]
    fn missing_input_selection_exits_with_usage_code() {
        for args in [&[][..], &["-n"][..], &["-r", "-o", "out"][..]] {
            let cli = parse(args).unwrap();
            assert_eq!(real_main(&cli, &CancelToken::new()), EXIT_USAGE, "{args:?}");
        }
    }

    #[test]
    fn nonexistent_input_exits_without_creating_output() {
        let tmp = tempfile::tempdir().unwrap();
        let missing = tmp.path().join("missing");
        let out = tmp.path().join("out");
        let cli = parse(&[
            "-i",
            missing.to_str().unwrap(),
            "-o",
            out.to_str().unwrap(),
        ])
        .unwrap();
        assert_eq!(real_main(&cli, &CancelToken::new()), EXIT_USAGE);
        assert!(!out.exists());
    }

    #[test]
    fn empty_directory_completes_cleanly() {
        let tmp = tempfile::tempdir().unwrap();
        let cli = parse(&["-i", tmp.path().to_str().unwrap()]).unwrap();
        assert_eq!(real_main(&cli, &CancelToken::new()), 0);
        assert!(tmp.path().join("pics").is_dir());
    }

    #[test]
    fn interrupted_run_exits_with_usage_code() {
        let tmp = tempfile::tempdir().unwrap();
        let cancel = CancelToken::new();
        cancel.cancel();
        let cli = parse(&["-i", tmp.path().to_str().unwrap()]).unwrap();
        assert_eq!(real_main(&cli, &cancel), EXIT_USAGE);
    }
}
