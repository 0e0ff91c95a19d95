//! Sentence boundary detection for transcript rendering.
//!
//! A splitter takes flattened cue text and returns it with
//! [`SENTENCE_BOUNDARY`] inserted wherever a new sentence starts. The
//! whitespace separating two sentences is replaced by the marker; nothing
//! else in the text changes.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};

/// Marker inserted between sentences (ASCII record separator).
pub const SENTENCE_BOUNDARY: char = '\u{1E}';

/// Terminal punctuation (plus trailing closing tags), whitespace, then an
/// upper-case letter that may be preceded by opening quotes, brackets or tags.
/// Opening tags written before the whitespace move to the next sentence.
static LATIN_BOUNDARY_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"(?P<end>(?:\.\.\.|…|[.!?])(?:</[^>]*>)*)(?P<open>(?:<[^/>][^>]*>)*)(?P<gap>\s+)(?P<next>(?:["'“‘«(\[¿¡]|<[^>]*>)*\p{Lu})"#,
    )
    .unwrap()
});

/// Ideographic or full-width terminal punctuation, optional closing
/// punctuation, then anything that is not whitespace or a tag.
static CJK_BOUNDARY_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?P<end>[。！？｡．]+[」』）】〕〉》”’)\]]*)(?P<next>[^\s<])").unwrap()
});

/// Inserts [`SENTENCE_BOUNDARY`] markers into text.
///
/// Implemented for any `Fn(&str) -> String`, so a closure can stand in for
/// the default heuristic.
pub trait SentenceSplitter {
    fn split(&self, text: &str) -> String;
}

impl<F> SentenceSplitter for F
where
    F: Fn(&str) -> String,
{
    fn split(&self, text: &str) -> String {
        self(text)
    }
}

/// Punctuation and casing heuristic covering Latin and CJK scripts.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultSplitter;

impl SentenceSplitter for DefaultSplitter {
    fn split(&self, text: &str) -> String {
        split_sentences(text)
    }
}

/// Apply the default heuristic.
pub fn split_sentences(text: &str) -> String {
    let text = insert_boundaries(&LATIN_BOUNDARY_REGEX, text);
    insert_boundaries(&CJK_BOUNDARY_REGEX, &text)
}

fn insert_boundaries(regex: &Regex, text: &str) -> String {
    regex
        .replace_all(text, |caps: &Captures| {
            let whole = &caps[0];
            if inside_tag(text, caps.get(0).map_or(0, |m| m.start())) {
                return whole.to_string();
            }
            let open = caps.name("open").map_or("", |m| m.as_str());
            format!("{}{}{}{}", &caps["end"], SENTENCE_BOUNDARY, open, &caps["next"])
        })
        .into_owned()
}

/// Whether byte offset `pos` falls between a `<` and its `>`.
fn inside_tag(text: &str, pos: usize) -> bool {
    let before = &text[..pos];
    match (before.rfind('<'), before.rfind('>')) {
        (Some(open), Some(close)) => open > close,
        (Some(_), None) => true,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn marked(s: &str) -> String {
        s.replace('|', &SENTENCE_BOUNDARY.to_string())
    }

    #[test]
    fn test_splits_on_terminal_punctuation() {
        assert_eq!(
            split_sentences("Hi there! What is your name? I am Bob."),
            marked("Hi there!|What is your name?|I am Bob.")
        );
    }

    #[test]
    fn test_requires_upper_case_after_gap() {
        assert_eq!(split_sentences("e.g. this one"), "e.g. this one");
        assert_eq!(split_sentences("Wait... what"), "Wait... what");
        assert_eq!(split_sentences("Wait... What"), marked("Wait...|What"));
    }

    #[test]
    fn test_consumes_newlines_between_sentences() {
        assert_eq!(split_sentences("Done.\nNext"), marked("Done.|Next"));
    }

    #[test]
    fn test_skips_over_tags_and_quotes() {
        assert_eq!(
            split_sentences("<i>Stop.</i> <b>\"Go</b> now"),
            marked("<i>Stop.</i>|<b>\"Go</b> now")
        );
        assert_eq!(split_sentences("Yes. (Maybe)"), marked("Yes.|(Maybe)"));
    }

    #[test]
    fn test_opening_tags_start_the_next_sentence() {
        assert_eq!(split_sentences("Stop.<i> Go</i>"), marked("Stop.|<i>Go</i>"));
        assert_eq!(
            split_sentences("<b>Stop.</b><i.loud> Go</i>"),
            marked("<b>Stop.</b>|<i.loud>Go</i>")
        );
    }

    #[test]
    fn test_ignores_punctuation_inside_tags() {
        assert_eq!(
            split_sentences("<v Mr. Smith>Hello. Goodbye</v>"),
            marked("<v Mr. Smith>Hello.|Goodbye</v>")
        );
    }

    #[test]
    fn test_ideographic_punctuation() {
        assert_eq!(split_sentences("你好。我很好！"), marked("你好。|我很好！"));
        assert_eq!(split_sentences("「行こう。」はい"), marked("「行こう。」|はい"));
        assert_eq!(split_sentences("終わり。<i>次</i>"), "終わり。<i>次</i>");
    }

    #[test]
    fn test_closure_as_splitter() {
        let splitter = |text: &str| text.replace(';', &SENTENCE_BOUNDARY.to_string());
        assert_eq!(splitter.split("a;b"), marked("a|b"));
    }
}
