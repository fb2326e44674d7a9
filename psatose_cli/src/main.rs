#![warn(clippy::all, clippy::pedantic)]

mod list;

use std::{path::PathBuf, process::ExitCode};

use anyhow::{bail, Context};
use clap::Parser;
use tracing::error;
use tracing_subscriber::EnvFilter;

use psatose_core::{convert_files, Conversion, FrameRate, Settings};

/// Converts Unreal PSA animations into SEAnim files.
#[derive(Parser)]
#[clap(version = "0.1.0")]
struct Opts {
    /// PSA files to convert
    #[clap(required = true, parse(from_os_str))]
    inputs: Vec<PathBuf>,
    /// Write animations here instead of `exported_files` next to each input
    #[clap(short, long, parse(from_os_str))]
    output_dir: Option<PathBuf>,
    /// Override the frame rate stored in the file
    #[clap(long)]
    fps: Option<f32>,
    /// Allow unused keys at the end of the key stream
    #[clap(long)]
    lenient: bool,
    /// Print the bones and animations of the inputs instead of converting them
    #[clap(long)]
    list: bool,
    #[clap(short, long)]
    verbose: bool,
}

impl Opts {
    fn settings(&self) -> anyhow::Result<Settings> {
        let mut settings = Settings::new();

        if let Some(output_dir) = &self.output_dir {
            settings.output_directory(output_dir);
        }

        if let Some(fps) = self.fps {
            if !fps.is_finite() || fps <= 0.0 {
                bail!("frame rate must be a positive number, got {}", fps);
            }
            settings.frame_rate(FrameRate::Fixed(fps));
        }

        settings.strict_key_count(!self.lenient);

        Ok(settings)
    }
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)),
        )
        .with_target(false)
        .init();
}

fn main() -> ExitCode {
    let opts = Opts::parse();
    init_logging(opts.verbose);

    if opts.list {
        let mut success = true;

        for input in &opts.inputs {
            if let Err(err) = list::list(input) {
                error!("{:#}", err);
                success = false;
            }
        }

        return if success {
            ExitCode::SUCCESS
        } else {
            ExitCode::FAILURE
        };
    }

    let settings = match opts.settings() {
        Ok(settings) => settings,
        Err(err) => {
            error!("{:#}", err);
            return ExitCode::FAILURE;
        }
    };

    let results = convert_files(&opts.inputs, &settings);
    let mut success = true;

    for (input, result) in opts.inputs.iter().zip(results) {
        let result = result.with_context(|| format!("failed to convert `{}`", input.display()));

        match result {
            Ok(Conversion::Converted(_) | Conversion::NoAnimationData { .. }) => {
                println!("Processed {}!", input.display());
            }
            Err(err) => {
                error!("{:#}", err);
                success = false;
            }
        }
    }

    if success {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}
