//! Command-line interface argument parsing and validation.
//!
//! This module handles parsing command-line arguments using clap's derive macros,
//! validates argument combinations, and turns them into parser and renderer
//! configuration.

use clap::{Parser, ValueEnum};
use std::path::{Path, PathBuf};
use vtt_transcript::html::{DEFAULT_SECTION_TAG, DEFAULT_SENTENCE_TAG};
use vtt_transcript::{HtmlTranscript, ParserOptions, Strictness, VttError};

/// VTT transcript - Validate, normalize and convert WebVTT caption files
#[derive(Parser, Debug)]
#[command(
    name = "vtt-transcript",
    version,
    about = "Validate WebVTT files and convert them to canonical WebVTT or HTML transcripts",
    long_about = "Parses WebVTT (Web Video Text Tracks) caption files, reporting the first\n\
                  grammar error with its line number, and writes either a canonical WebVTT\n\
                  rendition or an HTML transcript with one element per sentence."
)]
pub struct Args {
    /// Path to the input VTT file
    #[arg(value_name = "INPUT", help = "Path to the input VTT file")]
    pub input: PathBuf,

    /// Path to the output file (defaults to INPUT with the output format's extension)
    #[arg(value_name = "OUTPUT", help = "Path to the output file")]
    pub output: Option<PathBuf>,

    /// Output format
    #[arg(
        long,
        value_name = "FORMAT",
        default_value = "html",
        help = "Output format: html (sentence transcript) or vtt (canonical WebVTT)"
    )]
    pub format: OutputFormat,

    /// Overwrite existing output file
    #[arg(
        short,
        long,
        conflicts_with = "no_clobber",
        help = "Overwrite existing output file"
    )]
    pub force: bool,

    /// Skip conversion if output file exists
    #[arg(
        short = 'n',
        long,
        conflicts_with = "force",
        help = "Skip conversion if output file exists"
    )]
    pub no_clobber: bool,

    /// Print the result to stdout instead of writing to file
    #[arg(long, help = "Print the result to stdout instead of writing to file")]
    pub stdout: bool,

    /// Disable auto-increment of output filename on collision
    #[arg(
        long,
        help = "Disable auto-increment of output filename when file exists (use with --force to overwrite)"
    )]
    pub no_auto_increment: bool,

    /// Strictness level
    #[arg(
        long,
        value_name = "LEVEL",
        default_value_t = 1,
        help = "0 drops unknown tags and settings with a warning; 1 or more rejects them"
    )]
    pub strictness: u8,

    /// Keep NOTE blocks in the parsed document
    #[arg(long, help = "Keep NOTE blocks while parsing (they are reported but never written)")]
    pub keep_notes: bool,

    /// Section boundaries for HTML output
    #[arg(
        long,
        value_name = "SECONDS",
        value_delimiter = ',',
        help = "Comma-separated ascending times (seconds) at which a new HTML section starts"
    )]
    pub timecodes: Vec<f64>,

    /// HTML element wrapping each section
    #[arg(long, value_name = "TAG", default_value = DEFAULT_SECTION_TAG)]
    pub section_tag: String,

    /// HTML element wrapping each sentence
    #[arg(long, value_name = "TAG", default_value = DEFAULT_SENTENCE_TAG)]
    pub sentence_tag: String,

    /// Log parsing progress to stderr
    #[arg(short, long, help = "Log parsing progress to stderr (RUST_LOG overrides)")]
    pub verbose: bool,
}

/// Output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// HTML transcript split into sentences
    Html,
    /// Canonical WebVTT
    Vtt,
}

impl OutputFormat {
    fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Html => "html",
            OutputFormat::Vtt => "vtt",
        }
    }
}

impl Args {
    /// Validate arguments and derive output path if not specified.
    ///
    /// # Errors
    ///
    /// Returns `VttError::UsageError` if the time codes are not ascending, or
    /// `VttError::SameFile` if the output would overwrite the input.
    pub fn validate(&mut self) -> Result<(), VttError> {
        if self.timecodes.windows(2).any(|pair| pair[0] > pair[1]) {
            return Err(VttError::UsageError {
                reason: "--timecodes must be in ascending order".to_string(),
            });
        }
        if self.timecodes.iter().any(|t| !t.is_finite() || *t < 0.0) {
            return Err(VttError::UsageError {
                reason: "--timecodes must be non-negative numbers".to_string(),
            });
        }

        // Derive output path if not specified and not using stdout
        if self.output.is_none() && !self.stdout {
            let extension = self.format.extension();
            if self.no_auto_increment {
                self.output = Some(self.input.with_extension(extension));
            } else {
                self.output = Some(derive_output_path(&self.input, extension));
            }
        }

        if let Some(ref output) = self.output
            && paths_equal(&self.input, output)
        {
            return Err(VttError::SameFile {
                path: self.input.clone(),
            });
        }

        Ok(())
    }

    /// Get the output path, returning None if stdout mode is enabled.
    pub fn get_output_path(&self) -> Option<&Path> {
        if self.stdout {
            None
        } else {
            self.output.as_deref()
        }
    }

    pub fn parser_options(&self) -> ParserOptions {
        ParserOptions {
            strictness: Strictness::from(self.strictness),
            keep_notes: self.keep_notes,
        }
    }

    pub fn transcript(&self) -> HtmlTranscript {
        HtmlTranscript::new()
            .with_section_tag(self.section_tag.as_str())
            .with_sentence_tag(self.sentence_tag.as_str())
            .with_timecodes(self.timecodes.clone())
            .with_strictness(Strictness::from(self.strictness))
    }
}

/// Derive output path from input path by replacing the extension
/// and finding next available filename if collision occurs.
fn derive_output_path(input: &Path, extension: &str) -> PathBuf {
    let base_output = input.with_extension(extension);
    find_available_path(&base_output)
}

/// Find next available path by adding (N) suffix if file exists.
///
/// Given path/to/file.html, tries:
/// - path/to/file.html
/// - path/to/file (1).html
/// - path/to/file (2).html
///
/// etc.
fn find_available_path(base_path: &Path) -> PathBuf {
    if !base_path.exists() {
        return base_path.to_path_buf();
    }

    let parent = base_path.parent().unwrap_or_else(|| Path::new(""));
    let extension = base_path.extension().and_then(|s| s.to_str()).unwrap_or("");
    let stem = base_path.file_stem().and_then(|s| s.to_str()).unwrap_or("");

    for i in 1..=9999 {
        let new_name = if extension.is_empty() {
            format!("{} ({})", stem, i)
        } else {
            format!("{} ({}).{}", stem, i, extension)
        };
        let new_path = parent.join(new_name);
        if !new_path.exists() {
            return new_path;
        }
    }

    // Every candidate is taken; the write will report the collision.
    base_path.to_path_buf()
}

/// Check if two paths refer to the same file.
///
/// Compares canonicalized paths, falling back to a plain comparison when
/// either path does not exist yet.
fn paths_equal(path1: &Path, path2: &Path) -> bool {
    match (path1.canonicalize(), path2.canonicalize()) {
        (Ok(canon1), Ok(canon2)) => canon1 == canon2,
        _ => path1 == path2,
    }
}
