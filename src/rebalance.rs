//! Tag rebalancing around sentence boundaries.
//!
//! After a splitter has marked sentence boundaries, a marker may sit inside
//! one or more open spans. [`rebalance`] closes every open tag before each
//! marker and reopens them (same order, same classes and annotations) after
//! it, so that every sentence fragment is well-formed on its own. The same
//! scan validates that closing tags match, which makes it usable as a plain
//! tag-matching check on text without markers.

use crate::cue_text::Tag;
use crate::error::{ErrorKind, GrammarError};
use crate::parser::Strictness;
use crate::splitter::SENTENCE_BOUNDARY;
use crate::timestamp::TIMESTAMP_PATTERN;
use once_cell::sync::Lazy;
use regex::Regex;

static TAG_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"^<(/?)([^\s.<>/]+)[^<>]*>").unwrap());

static TIMESTAMP_TAG_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(&format!("^<{}>", TIMESTAMP_PATTERN)).unwrap());

struct OpenTag<'a> {
    name: &'a str,
    /// The opening tag exactly as written, e.g. `<c.loud>`.
    markup: &'a str,
}

/// Close and reopen tags around every [`SENTENCE_BOUNDARY`] in `text`.
///
/// In strict mode opening tags must be WebVTT span tags. A single `<v>` left
/// open at the end is closed; any other tag left open is an
/// [`ErrorKind::UnclosedTag`] error.
pub fn rebalance(text: &str, strictness: Strictness) -> Result<String, GrammarError> {
    let mut out = String::with_capacity(text.len());
    let mut stack: Vec<OpenTag> = Vec::new();
    let mut rest = text;

    while let Some(idx) = rest.find(|c| c == '<' || c == SENTENCE_BOUNDARY) {
        out.push_str(&rest[..idx]);
        rest = &rest[idx..];

        if rest.starts_with(SENTENCE_BOUNDARY) {
            log::trace!("Sentence boundary inside {} open tag(s)", stack.len());
            for open in stack.iter().rev() {
                out.push_str("</");
                out.push_str(open.name);
                out.push('>');
            }
            out.push(SENTENCE_BOUNDARY);
            for open in &stack {
                out.push_str(open.markup);
            }
            rest = &rest[SENTENCE_BOUNDARY.len_utf8()..];
            continue;
        }

        if let Some(m) = TIMESTAMP_TAG_REGEX.find(rest) {
            out.push_str(m.as_str());
            rest = &rest[m.end()..];
            continue;
        }

        let caps = TAG_REGEX
            .captures(rest)
            .ok_or_else(|| GrammarError::new(ErrorKind::MalformedTag, rest))?;
        let (Some(markup), Some(name)) = (caps.get(0), caps.get(2)) else {
            return Err(GrammarError::new(ErrorKind::MalformedTag, rest));
        };
        let (markup, name) = (markup.as_str(), name.as_str());

        if &caps[1] == "/" {
            match stack.pop() {
                Some(open) if open.name == name => {}
                Some(open) => {
                    return Err(GrammarError::new(
                        ErrorKind::UnmatchedTag,
                        &format!("{}...{}", open.markup, markup),
                    ));
                }
                None => return Err(GrammarError::new(ErrorKind::UnmatchedTag, markup)),
            }
        } else {
            if strictness == Strictness::Strict && Tag::from_name(name).is_none() {
                return Err(GrammarError::new(ErrorKind::UnknownTag, markup));
            }
            stack.push(OpenTag { name, markup });
        }
        out.push_str(markup);
        rest = &rest[markup.len()..];
    }
    out.push_str(rest);

    match stack.as_slice() {
        [] => {}
        [only] if only.name == Tag::Voice.name() => out.push_str("</v>"),
        [.., last] => return Err(GrammarError::new(ErrorKind::UnclosedTag, last.markup)),
    }
    Ok(out)
}
