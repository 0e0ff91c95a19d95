//! WebVTT block parsing.
//!
//! This module turns WebVTT text into a [`Document`]. Parsing is a line-based
//! state machine: after the `WEBVTT` header and its blank line comes a
//! preamble of `REGION`, `STYLE` and `NOTE` blocks, then cue blocks
//! optionally interleaved with more `NOTE` blocks. The first violation of the
//! grammar aborts the parse with a [`GrammarError`] carrying its line number;
//! [`Parser::parse_into`] leaves the blocks parsed up to that point in place.

use crate::cue_text::CueText;
use crate::document::{Block, Cue, Document, Region, Settings};
use crate::error::{ErrorKind, GrammarError, NO_ORIGIN, VttError};
use crate::timestamp::{self, TIMESTAMP_PATTERN};
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use std::fs;
use std::io;
use std::path::Path;

static LINE_BREAK_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"\r\n|\r|\n").unwrap());

static HEADER_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"^WEBVTT[ \t]*$").unwrap());

static REGION_HEADER_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"^REGION[ \t]*$").unwrap());

static STYLE_HEADER_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"^STYLE[ \t]*$").unwrap());

static NOTE_HEADER_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"^NOTE(?:[ \t]+(.*))?$").unwrap());

/// `start --> end` followed by optional `key:value` settings.
static TIMING_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        r"^{ts}[ \t]*-->[ \t]*{ts}((?:[ \t]+[^ \t:]+:[^ \t]+)*)[ \t]*$",
        ts = TIMESTAMP_PATTERN
    ))
    .unwrap()
});

const REGION_SETTINGS: &[&str] = &["id", "width", "lines", "regionanchor", "viewportanchor", "scroll"];

const CUE_SETTINGS: &[&str] = &["vertical", "line", "position", "size", "align", "region"];

/// How unrecognized input is treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Strictness {
    /// Unknown tags and setting keys are dropped with a warning.
    Lenient,
    /// Unknown tags and setting keys are errors, as are repeated region keys.
    #[default]
    Strict,
}

/// Numeric strictness level: `0` is lenient, anything above is strict.
impl From<u8> for Strictness {
    fn from(level: u8) -> Self {
        if level == 0 {
            Strictness::Lenient
        } else {
            Strictness::Strict
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ParserOptions {
    pub strictness: Strictness,
    /// Keep `NOTE` blocks in the document instead of discarding them.
    pub keep_notes: bool,
}

/// Reusable WebVTT parser.
///
/// A parser only holds its options; every call builds a fresh document.
#[derive(Debug, Clone, Default)]
pub struct Parser {
    options: ParserOptions,
}

impl Parser {
    pub fn new(options: ParserOptions) -> Self {
        Parser { options }
    }

    pub fn options(&self) -> &ParserOptions {
        &self.options
    }

    /// Parse in-memory WebVTT text.
    pub fn parse(&self, text: &str) -> Result<Document, GrammarError> {
        let mut document = Document::default();
        self.parse_into(text, &mut document)?;
        Ok(document)
    }

    /// Parse into an existing document, clearing it first.
    ///
    /// On error `document` keeps every block that was completely parsed
    /// before the failing line.
    pub fn parse_into(&self, text: &str, document: &mut Document) -> Result<(), GrammarError> {
        self.parse_source(text, NO_ORIGIN, document)
    }

    /// Read and parse a WebVTT file.
    ///
    /// # Errors
    ///
    /// - `VttError::FileNotFound` / `VttError::PermissionDenied` when the file
    ///   cannot be opened
    /// - `VttError::Grammar` with [`ErrorKind::IoFailure`] for other read
    ///   failures, including invalid UTF-8
    /// - `VttError::Grammar` for invalid WebVTT content
    pub fn parse_file<P: AsRef<Path>>(&self, path: P) -> Result<Document, VttError> {
        let path = path.as_ref();
        let origin = path.display().to_string();

        let text = fs::read_to_string(path).map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => VttError::FileNotFound {
                path: path.to_path_buf(),
            },
            io::ErrorKind::PermissionDenied => VttError::PermissionDenied {
                path: path.to_path_buf(),
            },
            _ => GrammarError::new(ErrorKind::IoFailure, &e.to_string())
                .with_origin(origin.as_str())
                .into(),
        })?;

        let mut document = Document::default();
        self.parse_source(&text, &origin, &mut document)?;
        log::debug!("Parsed {} block(s) from {}", document.blocks.len(), origin);
        Ok(document)
    }

    fn parse_source(&self, text: &str, origin: &str, document: &mut Document) -> Result<(), GrammarError> {
        document.blocks.clear();
        let text = text.strip_prefix('\u{FEFF}').unwrap_or(text);
        let mut state = BlockParser {
            lines: LINE_BREAK_REGEX.split(text).collect(),
            pos: 0,
            options: self.options,
            document,
        };
        state.run().map_err(|e| e.with_origin(origin))
    }
}

/// State of one in-flight parse: the lines, the cursor and the output.
struct BlockParser<'t, 'd> {
    lines: Vec<&'t str>,
    pos: usize,
    options: ParserOptions,
    document: &'d mut Document,
}

fn is_blank(line: &str) -> bool {
    line.trim().is_empty()
}

impl<'t> BlockParser<'t, '_> {
    fn current(&self) -> Option<&'t str> {
        self.lines.get(self.pos).copied()
    }

    fn strict(&self) -> bool {
        self.options.strictness == Strictness::Strict
    }

    fn run(&mut self) -> Result<(), GrammarError> {
        let header = self.lines.first().copied().unwrap_or_default();
        if !HEADER_REGEX.is_match(header) {
            return Err(GrammarError::new(ErrorKind::MissingHeader, header).at_line(0));
        }
        if let Some(line) = self.lines.get(1)
            && !is_blank(line)
        {
            return Err(GrammarError::new(ErrorKind::ExpectedBlankLine, line).at_line(1));
        }
        self.pos = 2;

        // Preamble: anything that is not a recognized header starts the cues.
        loop {
            self.skip_blank_lines();
            let Some(line) = self.current() else {
                return Ok(());
            };
            if REGION_HEADER_REGEX.is_match(line) {
                self.parse_region()?;
            } else if STYLE_HEADER_REGEX.is_match(line) {
                self.parse_style();
            } else if NOTE_HEADER_REGEX.is_match(line) {
                self.parse_note();
            } else {
                break;
            }
        }

        loop {
            self.skip_blank_lines();
            let Some(line) = self.current() else {
                return Ok(());
            };
            if NOTE_HEADER_REGEX.is_match(line) {
                self.parse_note();
            } else {
                self.parse_cue()?;
            }
        }
    }

    fn skip_blank_lines(&mut self) {
        while self.current().is_some_and(is_blank) {
            self.pos += 1;
        }
    }

    /// Consume lines up to the next blank line or the end of input.
    fn take_block_lines(&mut self) -> Vec<&'t str> {
        let mut lines = Vec::new();
        while let Some(line) = self.current()
            && !is_blank(line)
        {
            lines.push(line);
            self.pos += 1;
        }
        lines
    }

    fn parse_region(&mut self) -> Result<(), GrammarError> {
        self.pos += 1;
        let mut settings = Settings::new();

        while let Some(line) = self.current()
            && !is_blank(line)
        {
            for fragment in line.split([' ', '\t']).filter(|f| !f.is_empty()) {
                let (key, value) = match fragment.split_once(':') {
                    Some((key, value)) if !key.is_empty() && !value.is_empty() => (key, value),
                    _ => {
                        return Err(GrammarError::new(ErrorKind::MalformedSetting, fragment).at_line(self.pos));
                    }
                };

                if !REGION_SETTINGS.contains(&key) {
                    if self.strict() {
                        return Err(GrammarError::new(ErrorKind::UnknownRegionSetting, fragment).at_line(self.pos));
                    }
                    log::warn!("Ignoring unknown region setting '{}' at line {}", key, self.pos);
                    continue;
                }
                if settings.contains_key(key) {
                    if self.strict() {
                        return Err(GrammarError::new(ErrorKind::DuplicateRegionSetting, fragment).at_line(self.pos));
                    }
                    log::warn!("Region setting '{}' repeated at line {}, keeping last", key, self.pos);
                }
                settings.insert(key, value);
            }
            self.pos += 1;
        }

        let region = Region { settings };
        log::debug!("Parsed region {:?}", region.id());
        self.document.blocks.push(Block::Region(region));
        Ok(())
    }

    fn parse_style(&mut self) {
        self.pos += 1;
        let text: String = self
            .take_block_lines()
            .into_iter()
            .map(|line| format!("{}\n", line))
            .collect();
        self.document.blocks.push(Block::Style { text });
    }

    fn parse_note(&mut self) {
        let header = self.current().unwrap_or_default();
        let inline = NOTE_HEADER_REGEX
            .captures(header)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str())
            .filter(|s| !s.trim().is_empty());
        self.pos += 1;

        let lines = self.take_block_lines();
        if !self.options.keep_notes {
            return;
        }
        let text: String = inline
            .into_iter()
            .chain(lines)
            .map(|line| format!("{}\n", line))
            .collect();
        self.document.blocks.push(Block::Note { text });
    }

    fn parse_cue(&mut self) -> Result<(), GrammarError> {
        let cue_line = self.pos;
        let first = self.current().unwrap_or_default();
        let identifier = if first.contains("-->") {
            String::new()
        } else {
            self.pos += 1;
            first.to_string()
        };

        let timing_line = self.pos;
        let timing = self.current().unwrap_or_default();
        let caps = TIMING_REGEX
            .captures(timing)
            .ok_or_else(|| GrammarError::new(ErrorKind::MalformedTimestamp, timing).at_line(timing_line))?;
        let (start, end) = match (timestamp_at(&caps, 1), timestamp_at(&caps, 5)) {
            (Some(start), Some(end)) => (start, end),
            _ => return Err(GrammarError::new(ErrorKind::MalformedTimestamp, timing).at_line(timing_line)),
        };
        let settings = self.parse_cue_settings(caps.get(9).map_or("", |m| m.as_str()), timing_line)?;
        self.pos += 1;

        let lines = self.take_block_lines();
        let text = CueText::parse(&lines, self.options.strictness).map_err(|e| e.at_line(cue_line))?;

        log::debug!("Parsed cue {:?} at line {}", identifier, cue_line);
        self.document.blocks.push(Block::Cue(Cue {
            identifier,
            start,
            end,
            settings,
            text,
        }));
        Ok(())
    }

    fn parse_cue_settings(&self, raw: &str, line: usize) -> Result<Settings, GrammarError> {
        let mut settings = Settings::new();
        for fragment in raw.split([' ', '\t']).filter(|f| !f.is_empty()) {
            let Some((key, value)) = fragment.split_once(':') else {
                return Err(GrammarError::new(ErrorKind::MalformedTimestamp, fragment).at_line(line));
            };
            if !CUE_SETTINGS.contains(&key) {
                if self.strict() {
                    return Err(GrammarError::new(ErrorKind::UnknownCueSetting, fragment).at_line(line));
                }
                log::warn!("Ignoring unknown cue setting '{}' at line {}", key, line);
                continue;
            }
            settings.insert(key, value);
        }
        Ok(settings)
    }
}

/// Read the timestamp whose four capture groups start at `first`.
fn timestamp_at(caps: &Captures, first: usize) -> Option<f64> {
    timestamp::from_parts(
        caps.get(first).map(|m| m.as_str()),
        caps.get(first + 1)?.as_str(),
        caps.get(first + 2)?.as_str(),
        caps.get(first + 3)?.as_str(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cue_text::{CueNode, Tag};

    fn lenient() -> Parser {
        Parser::new(ParserOptions {
            strictness: Strictness::Lenient,
            keep_notes: false,
        })
    }

    #[test]
    fn test_missing_header() {
        let err = Document::parse("WEBVT\n\n00:00.000 --> 00:01.000\nHi").unwrap_err();
        assert_eq!(err.kind, ErrorKind::MissingHeader);
        assert_eq!(err.line, Some(0));
        assert_eq!(err.origin, "<none>");
    }

    #[test]
    fn test_header_with_title_is_rejected() {
        let err = Document::parse("WEBVTT - Title\n\n").unwrap_err();
        assert_eq!(err.kind, ErrorKind::MissingHeader);
    }

    #[test]
    fn test_empty_input_is_missing_header() {
        let err = Document::parse("").unwrap_err();
        assert_eq!(err.kind, ErrorKind::MissingHeader);
    }

    #[test]
    fn test_expected_blank_line() {
        let err = Document::parse("WEBVTT\n00:00.000 --> 00:01.000\nHi").unwrap_err();
        assert_eq!(err.kind, ErrorKind::ExpectedBlankLine);
        assert_eq!(err.line, Some(1));
    }

    #[test]
    fn test_bom_and_mixed_line_endings() {
        let doc = Document::parse("\u{FEFF}WEBVTT \r\n\r00:01.000 --> 00:02.000\r\nOne\rTwo\n\n").unwrap();
        let cue = doc.cues().next().unwrap();
        assert_eq!(cue.text.flatten(), "One\nTwo");
    }

    #[test]
    fn test_region_block() {
        let doc = Document::parse("WEBVTT\n\nREGION\nid:fred\nwidth:40%\n\n").unwrap();
        let regions: Vec<_> = doc.regions().collect();
        assert_eq!(regions.len(), 1);
        assert_eq!(regions[0].id(), Some("fred"));
        assert_eq!(regions[0].settings.get("width"), Some("40%"));
        assert_eq!(regions[0].settings.len(), 2);
    }

    #[test]
    fn test_region_settings_on_one_line() {
        let doc = Document::parse("WEBVTT\n\nREGION\nid:a\tlines:3  scroll:up\n").unwrap();
        let region = doc.regions().next().unwrap();
        let keys: Vec<_> = region.settings.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["id", "lines", "scroll"]);
    }

    #[test]
    fn test_duplicate_region_setting() {
        let err = Document::parse("WEBVTT\n\nREGION\nid:fred\nid:bob\n\n").unwrap_err();
        assert_eq!(err.kind, ErrorKind::DuplicateRegionSetting);
        assert_eq!(err.line, Some(4));
        assert_eq!(err.context, "id:bob");

        let doc = lenient().parse("WEBVTT\n\nREGION\nid:fred\nid:bob\n\n").unwrap();
        assert_eq!(doc.regions().next().unwrap().id(), Some("bob"));
    }

    #[test]
    fn test_unknown_region_setting() {
        let text = "WEBVTT\n\nREGION\nid:fred colour:red\n";
        let err = Document::parse(text).unwrap_err();
        assert_eq!(err.kind, ErrorKind::UnknownRegionSetting);

        let doc = lenient().parse(text).unwrap();
        assert!(doc.regions().next().unwrap().settings.get("colour").is_none());
    }

    #[test]
    fn test_malformed_region_setting() {
        let err = lenient().parse("WEBVTT\n\nREGION\nid:\n").unwrap_err();
        assert_eq!(err.kind, ErrorKind::MalformedSetting);
        let err = lenient().parse("WEBVTT\n\nREGION\nwidth\n").unwrap_err();
        assert_eq!(err.kind, ErrorKind::MalformedSetting);
    }

    #[test]
    fn test_style_blocks() {
        let doc = Document::parse("WEBVTT\n\nSTYLE\n::cue {\n  color: red;\n}\n\nSTYLE\nb {}\n").unwrap();
        let styles: Vec<_> = doc.styles().collect();
        assert_eq!(styles, vec!["::cue {\n  color: red;\n}\n", "b {}\n"]);
        assert_eq!(doc.style_text(), "::cue {\n  color: red;\n}\nb {}\n");
    }

    #[test]
    fn test_notes_discarded_by_default() {
        let text = "WEBVTT\n\nNOTE header note\nmore\n\n00:01.000 --> 00:02.000\nHi\n\nNOTE\ntrailing\n";
        let doc = Document::parse(text).unwrap();
        assert_eq!(doc.notes().count(), 0);
        assert_eq!(doc.cues().count(), 1);

        let parser = Parser::new(ParserOptions {
            keep_notes: true,
            ..ParserOptions::default()
        });
        let doc = parser.parse(text).unwrap();
        let notes: Vec<_> = doc.notes().collect();
        assert_eq!(notes, vec!["header note\nmore\n", "trailing\n"]);
        assert!(matches!(doc.blocks[1], Block::Cue(_)));
    }

    #[test]
    fn test_cue_identifier_timing_and_settings() {
        let text = "WEBVTT\n\nchapter-1\n01:02:03.004 --> 01:02:05.000 align:start line:0 align:end\nHello\n";
        let doc = Document::parse(text).unwrap();
        let cue = doc.cues().next().unwrap();
        assert_eq!(cue.identifier, "chapter-1");
        assert_eq!(cue.start, 3723.004);
        assert_eq!(cue.end, 3725.0);
        let settings: Vec<_> = cue.settings.iter().collect();
        assert_eq!(settings, vec![("align", "end"), ("line", "0")]);
    }

    #[test]
    fn test_cue_without_identifier() {
        let doc = Document::parse("WEBVTT\n\n00:05.000 --> 00:01.000\n<v Bob>Hi").unwrap();
        let cue = doc.cues().next().unwrap();
        assert!(cue.identifier.is_empty());
        // end before start is accepted
        assert_eq!((cue.start, cue.end), (5.0, 1.0));
        match &cue.text.nodes[..] {
            [CueNode::Span(span)] => assert_eq!(span.tag, Tag::Voice),
            other => panic!("Expected voice span, got {:?}", other),
        }
    }

    #[test]
    fn test_malformed_timestamp() {
        let err = Document::parse("WEBVTT\n\n1\n00:01 --> 00:02.000\nHi\n").unwrap_err();
        assert_eq!(err.kind, ErrorKind::MalformedTimestamp);
        assert_eq!(err.line, Some(3));

        let err = Document::parse("WEBVTT\n\nonly an identifier\n").unwrap_err();
        assert_eq!(err.kind, ErrorKind::MalformedTimestamp);
        assert_eq!(err.line, Some(3));

        let err = Document::parse("WEBVTT\n\n00:01.000 --> 00:02.000 align\n").unwrap_err();
        assert_eq!(err.kind, ErrorKind::MalformedTimestamp);
    }

    #[test]
    fn test_unknown_cue_setting() {
        let text = "WEBVTT\n\n00:01.000 --> 00:02.000 colour:red size:50%\nHi\n";
        let err = Document::parse(text).unwrap_err();
        assert_eq!(err.kind, ErrorKind::UnknownCueSetting);
        assert_eq!(err.line, Some(2));

        let doc = lenient().parse(text).unwrap();
        let settings: Vec<_> = doc.cues().next().unwrap().settings.iter().collect();
        assert_eq!(settings, vec![("size", "50%")]);
    }

    #[test]
    fn test_cue_text_error_reports_cue_line() {
        let text = "WEBVTT\n\n00:01.000 --> 00:02.000\nfine\n\nid\n00:03.000 --> 00:04.000\n<b>broken\n";
        let err = Document::parse(text).unwrap_err();
        assert_eq!(err.kind, ErrorKind::UnclosedTag);
        assert_eq!(err.line, Some(5));
    }

    #[test]
    fn test_unknown_tag_depends_on_strictness() {
        let text = "WEBVTT\n\n00:01.000 --> 00:02.000\n<q>quoted</q>\n";
        let err = Document::parse(text).unwrap_err();
        assert_eq!(err.kind, ErrorKind::UnknownTag);

        let doc = lenient().parse(text).unwrap();
        assert_eq!(doc.cues().next().unwrap().text.flatten(), "quoted");
    }

    #[test]
    fn test_oversized_hours_are_malformed() {
        let err = Document::parse("WEBVTT\n\n99999999999999999:00:00.000 --> 00:01.000\nx\n").unwrap_err();
        assert_eq!(err.kind, ErrorKind::MalformedTimestamp);
        assert_eq!(err.line, Some(2));

        let err = Document::parse("WEBVTT\n\n00:00.000 --> 00:01.000\na <99999999999999999:00:00.000>b\n").unwrap_err();
        assert_eq!(err.kind, ErrorKind::MalformedTag);
        assert_eq!(err.line, Some(2));
    }

    #[test]
    fn test_out_of_range_seconds_are_malformed() {
        let err = Document::parse("WEBVTT\n\n00:99.000 --> 01:00.000\nx\n").unwrap_err();
        assert_eq!(err.kind, ErrorKind::MalformedTimestamp);
    }

    #[test]
    fn test_partial_document_kept_on_error() {
        let text = "WEBVTT\n\nREGION\nid:r\n\n00:01.000 --> 00:02.000\nOne\n\n00:03.000 --> 00:04\nTwo\n";
        let mut doc = Document::default();
        let err = Parser::default().parse_into(text, &mut doc).unwrap_err();
        assert_eq!(err.kind, ErrorKind::MalformedTimestamp);
        assert_eq!(err.line, Some(8));
        assert_eq!(doc.blocks.len(), 2);
        assert_eq!(doc.cues().count(), 1);
    }

    #[test]
    fn test_parser_reuse_clears_previous_document() {
        let parser = Parser::default();
        let mut doc = Document::default();
        parser
            .parse_into("WEBVTT\n\n00:01.000 --> 00:02.000\nOne\n", &mut doc)
            .unwrap();
        parser.parse_into("WEBVTT\n", &mut doc).unwrap();
        assert!(doc.blocks.is_empty());
    }

    #[test]
    fn test_style_after_first_cue_is_a_cue() {
        let err = Document::parse("WEBVTT\n\n00:01.000 --> 00:02.000\nHi\n\nSTYLE\nb {}\n").unwrap_err();
        assert_eq!(err.kind, ErrorKind::MalformedTimestamp);
        assert_eq!(err.line, Some(6));
    }

    #[test]
    fn test_parse_file() {
        let temp_file = std::env::temp_dir().join("vtt_transcript_parse_file.vtt");
        fs::write(&temp_file, "WEBVTT\n\n00:01.000 --> 00:02.000\nHi\n").unwrap();
        let doc = Parser::default().parse_file(&temp_file).unwrap();
        assert_eq!(doc.cues().count(), 1);
        fs::remove_file(&temp_file).ok();
    }

    #[test]
    fn test_parse_file_reports_origin() {
        let temp_file = std::env::temp_dir().join("vtt_transcript_bad_header.vtt");
        fs::write(&temp_file, "NOT VTT\n").unwrap();
        match Parser::default().parse_file(&temp_file) {
            Err(VttError::Grammar(err)) => {
                assert_eq!(err.kind, ErrorKind::MissingHeader);
                assert_eq!(err.origin, temp_file.display().to_string());
            }
            other => panic!("Expected grammar error, got {:?}", other),
        }
        fs::remove_file(&temp_file).ok();
    }

    #[test]
    fn test_parse_file_not_found() {
        match Parser::default().parse_file("nonexistent_file.vtt") {
            Err(VttError::FileNotFound { .. }) => {}
            other => panic!("Expected FileNotFound error, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_file_invalid_utf8() {
        let temp_file = std::env::temp_dir().join("vtt_transcript_invalid_utf8.vtt");
        fs::write(&temp_file, b"WEBVTT\n\n\xff\xfe").unwrap();
        match Parser::default().parse_file(&temp_file) {
            Err(VttError::Grammar(err)) => assert_eq!(err.kind, ErrorKind::IoFailure),
            other => panic!("Expected I/O failure, got {:?}", other),
        }
        fs::remove_file(&temp_file).ok();
    }

    #[test]
    fn test_strictness_from_level() {
        assert_eq!(Strictness::from(0), Strictness::Lenient);
        assert_eq!(Strictness::from(1), Strictness::Strict);
        assert_eq!(Strictness::from(7), Strictness::Strict);
    }
}
