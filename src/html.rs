//! HTML transcript rendering.
//!
//! Cue texts are concatenated into sections (split at caller-supplied time
//! codes), each section is broken into sentences by a [`SentenceSplitter`],
//! open tags are rebalanced around the sentence breaks and the result is
//! emitted as HTML with one element per sentence.

use crate::cue_text::CueText;
use crate::document::Cue;
use crate::error::{ErrorKind, GrammarError};
use crate::parser::Strictness;
use crate::rebalance::rebalance;
use crate::splitter::{DefaultSplitter, SENTENCE_BOUNDARY, SentenceSplitter};

pub const DEFAULT_SECTION_TAG: &str = "section";
pub const DEFAULT_SENTENCE_TAG: &str = "p";

/// Configured transcript renderer.
///
/// # Example
///
/// ```rust,ignore
/// let transcript = HtmlTranscript::new()
///     .with_sentence_tag("span")
///     .with_timecodes(vec![60.0, 120.0]);
/// let html = document.to_html(&transcript)?;
/// ```
pub struct HtmlTranscript {
    section_tag: String,
    sentence_tag: String,
    timecodes: Vec<f64>,
    strictness: Strictness,
    splitter: Box<dyn SentenceSplitter>,
}

impl Default for HtmlTranscript {
    fn default() -> Self {
        HtmlTranscript {
            section_tag: DEFAULT_SECTION_TAG.to_string(),
            sentence_tag: DEFAULT_SENTENCE_TAG.to_string(),
            timecodes: Vec::new(),
            strictness: Strictness::default(),
            splitter: Box::new(DefaultSplitter),
        }
    }
}

impl HtmlTranscript {
    pub fn new() -> Self {
        Self::default()
    }

    /// Element wrapping each section. May carry attributes, e.g. `div class="t"`.
    pub fn with_section_tag(mut self, tag: impl Into<String>) -> Self {
        self.section_tag = tag.into();
        self
    }

    /// Element wrapping each sentence.
    pub fn with_sentence_tag(mut self, tag: impl Into<String>) -> Self {
        self.sentence_tag = tag.into();
        self
    }

    /// Ascending start times, in seconds, at which a new section begins.
    pub fn with_timecodes(mut self, timecodes: Vec<f64>) -> Self {
        self.timecodes = timecodes;
        self
    }

    pub fn with_strictness(mut self, strictness: Strictness) -> Self {
        self.strictness = strictness;
        self
    }

    pub fn with_splitter(mut self, splitter: impl SentenceSplitter + 'static) -> Self {
        self.splitter = Box::new(splitter);
        self
    }

    pub fn render<'c, I>(&self, cues: I) -> Result<String, GrammarError>
    where
        I: IntoIterator<Item = &'c Cue>,
    {
        render(
            cues,
            &self.timecodes,
            &self.section_tag,
            &self.sentence_tag,
            self.splitter.as_ref(),
            self.strictness,
        )
    }
}

/// Render `cues` as HTML sections of sentences.
///
/// A section is flushed whenever a cue starts at or after the next unused
/// time code; whatever remains after the last time code forms the final
/// section. Sections without text produce no output.
pub fn render<'c, I>(
    cues: I,
    timecodes: &[f64],
    section_tag: &str,
    sentence_tag: &str,
    splitter: &dyn SentenceSplitter,
    strictness: Strictness,
) -> Result<String, GrammarError>
where
    I: IntoIterator<Item = &'c Cue>,
{
    let section = Section {
        section_tag,
        sentence_tag,
        splitter,
        strictness,
    };
    let mut out = String::new();
    let mut buffer = String::new();
    let mut timecodes = timecodes.iter().copied().peekable();

    for cue in cues {
        while let Some(timecode) = timecodes.peek()
            && cue.start >= *timecode
        {
            section.flush(&mut buffer, &mut out)?;
            timecodes.next();
        }

        let text = cue.text.flatten();
        if text.is_empty() {
            continue;
        }
        if !buffer.is_empty() {
            buffer.push('\n');
        }
        buffer.push_str(&text);
    }
    section.flush(&mut buffer, &mut out)?;
    Ok(out)
}

struct Section<'a> {
    section_tag: &'a str,
    sentence_tag: &'a str,
    splitter: &'a dyn SentenceSplitter,
    strictness: Strictness,
}

impl Section<'_> {
    /// Write the buffered text as one section and clear the buffer.
    fn flush(&self, buffer: &mut String, out: &mut String) -> Result<(), GrammarError> {
        if buffer.trim().is_empty() {
            buffer.clear();
            return Ok(());
        }

        let split = self.splitter.split(buffer.as_str());
        let balanced = rebalance(&split, self.strictness)
            .map_err(|e| e.rekind(ErrorKind::SentenceSplitterProducedInvalidText))?;
        let html = CueText::parse_str(&balanced, self.strictness)
            .map_err(|e| e.rekind(ErrorKind::SentenceSplitterProducedInvalidText))?
            .flatten_html();

        let open = format!("<{}>", self.sentence_tag);
        let close = format!("</{}>", element_name(self.sentence_tag));
        let body = html.replace(SENTENCE_BOUNDARY, &format!("{}\n{}", close, open));

        out.push_str(&format!(
            "<{}>\n{}{}{}\n</{}>\n",
            self.section_tag,
            open,
            body,
            close,
            element_name(self.section_tag)
        ));
        log::debug!("Rendered section of {} byte(s)", buffer.len());
        buffer.clear();
        Ok(())
    }
}

/// Element name of an opening-tag body such as `div class="x"`.
fn element_name(tag: &str) -> &str {
    tag.split_whitespace().next().unwrap_or(tag)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::Document;
    use crate::parser::{Parser, ParserOptions};

    fn cue(start: f64, text: &str) -> Cue {
        Cue {
            start,
            end: start + 1.0,
            text: CueText::parse_str(text, Strictness::Strict).unwrap(),
            ..Cue::default()
        }
    }

    #[test]
    fn test_sentences_are_balanced() {
        let cues = vec![cue(0.0, "<i>Hi there! What is your name?</i>")];
        let html = HtmlTranscript::new().render(&cues).unwrap();
        assert_eq!(
            html,
            "<section>\n<p><i>Hi there!</i></p>\n<p><i>What is your name?</i></p>\n</section>\n"
        );
    }

    #[test]
    fn test_sentences_span_cues() {
        let cues = vec![
            cue(0.0, "<v Alice>Hello, this is"),
            cue(1.0, "<v Alice>Alice speaking. How are</v>"),
            cue(2.0, "you?"),
        ];
        let html = HtmlTranscript::new().render(&cues).unwrap();
        assert_eq!(
            html,
            "<section>\n\
             <p><span title=\"Alice\">Hello, this is</span>\n\
             <span title=\"Alice\">Alice speaking.</span></p>\n\
             <p><span title=\"Alice\">How are</span>\n\
             you?</p>\n\
             </section>\n"
        );
    }

    #[test]
    fn test_opening_tag_before_gap_moves_to_next_sentence() {
        let cues = vec![cue(0.0, "Stop.<i> Go</i>")];
        let html = HtmlTranscript::new().render(&cues).unwrap();
        assert_eq!(html, "<section>\n<p>Stop.</p>\n<p><i>Go</i></p>\n</section>\n");
    }

    #[test]
    fn test_timecodes_split_sections() {
        let cues = vec![
            cue(0.0, "One."),
            cue(5.0, "Two."),
            cue(10.0, "Three."),
            cue(30.0, "Four."),
        ];
        let html = HtmlTranscript::new()
            .with_timecodes(vec![5.0, 20.0, 25.0])
            .with_section_tag("div class=\"part\"")
            .with_sentence_tag("span")
            .render(&cues)
            .unwrap();
        assert_eq!(
            html,
            "<div class=\"part\">\n<span>One.</span>\n</div>\n\
             <div class=\"part\">\n<span>Two.</span>\n<span>Three.</span>\n</div>\n\
             <div class=\"part\">\n<span>Four.</span>\n</div>\n"
        );
    }

    #[test]
    fn test_empty_cues_produce_nothing() {
        let cues = vec![cue(0.0, "")];
        assert_eq!(HtmlTranscript::new().render(&cues).unwrap(), "");
        let none: Vec<Cue> = Vec::new();
        assert_eq!(HtmlTranscript::new().render(&none).unwrap(), "");
    }

    #[test]
    fn test_custom_splitter() {
        let cues = vec![cue(0.0, "<b>a, b</b>")];
        let transcript = HtmlTranscript::new()
            .with_splitter(|text: &str| text.replace(", ", &SENTENCE_BOUNDARY.to_string()));
        assert_eq!(
            transcript.render(&cues).unwrap(),
            "<section>\n<p><b>a</b></p>\n<p><b>b</b></p>\n</section>\n"
        );
    }

    #[test]
    fn test_splitter_breaking_tags_is_reported() {
        let cues = vec![cue(0.0, "<b>bold</b>")];
        let transcript = HtmlTranscript::new().with_splitter(|text: &str| text.replace("</b>", ""));
        let err = transcript.render(&cues).unwrap_err();
        assert_eq!(err.kind, ErrorKind::SentenceSplitterProducedInvalidText);
    }

    #[test]
    fn test_document_to_html() {
        let parser = Parser::new(ParserOptions::default());
        let doc: Document = parser
            .parse("WEBVTT\n\n00:01.000 --> 00:02.000\n<v Ann>Yes. No.</v>\n")
            .unwrap();
        let html = doc.to_html(&HtmlTranscript::new()).unwrap();
        assert_eq!(
            html,
            "<section>\n<p><span title=\"Ann\">Yes.</span></p>\n<p><span title=\"Ann\">No.</span></p>\n</section>\n"
        );
    }
}
