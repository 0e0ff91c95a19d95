//! VTT transcript - command-line tool for validating WebVTT files and converting
//! them to canonical WebVTT or HTML transcripts.

mod cli;
mod output;

use clap::Parser as _;
use cli::{Args, OutputFormat};
use output::{Overwrite, write_output};
use std::process::ExitCode;
use vtt_transcript::{Parser, VttError};

fn main() -> ExitCode {
    let mut args = match Args::try_parse() {
        Ok(args) => args,
        Err(e) => {
            // Clap handles printing error messages and help text
            e.exit();
        }
    };

    init_logging(args.verbose);

    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        return e.exit_code();
    }

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            e.exit_code()
        }
    }
}

fn init_logging(verbose: bool) {
    let default_filter = if verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .format_timestamp(None)
        .init();
}

fn run(args: &Args) -> Result<(), VttError> {
    let document = Parser::new(args.parser_options()).parse_file(&args.input)?;
    log::info!(
        "{}: {} cue(s), {} region(s), {} note(s)",
        args.input.display(),
        document.cues().count(),
        document.regions().count(),
        document.notes().count()
    );

    let rendered = match args.format {
        OutputFormat::Vtt => document.to_string(),
        OutputFormat::Html => document.to_html(&args.transcript())?,
    };

    let overwrite = if args.force {
        Overwrite::Force
    } else if args.no_clobber {
        Overwrite::Skip
    } else {
        Overwrite::Refuse
    };
    let output_path = args.get_output_path();
    if !write_output(output_path, &rendered, overwrite)?
        && let Some(path) = output_path
    {
        eprintln!("Skipped: {} already exists", path.display());
    }
    Ok(())
}
