//! Cue payload parsing: the inline `<v>`, `<i>`, `<c.class>` ... tag language.
//!
//! Each line of a cue payload is parsed on its own by recursive descent and
//! the per-line results are joined with an explicit `"\n"` text run. Spans
//! therefore never cross a line break. A `<v>` span is the only one allowed
//! to run to the end of its line without a closing tag.
//!
//! The tree can be written back out as WebVTT ([`CueText::flatten`]) or as an
//! HTML fragment ([`CueText::flatten_html`]).

use crate::error::{ErrorKind, GrammarError};
use crate::parser::Strictness;
use crate::timestamp::{self, TIMESTAMP_PATTERN};
use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt;
use unicode_normalization::UnicodeNormalization;

static START_TAG_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^<([A-Za-z][A-Za-z0-9]*)((?:\.[^\s.<>]*)*)(?:[ \t]([^>]*))?>").unwrap()
});

static END_TAG_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"^</([A-Za-z][A-Za-z0-9]*)>").unwrap());

static TIMESTAMP_TAG_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(&format!("^<{}>", TIMESTAMP_PATTERN)).unwrap());

static ANY_TAG_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"^<[^>]*>").unwrap());

/// The span tags WebVTT cue text allows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tag {
    Voice,
    Italic,
    Bold,
    Underline,
    Class,
    Lang,
    Ruby,
    RubyText,
}

impl Tag {
    pub fn from_name(name: &str) -> Option<Tag> {
        match name {
            "v" => Some(Tag::Voice),
            "i" => Some(Tag::Italic),
            "b" => Some(Tag::Bold),
            "u" => Some(Tag::Underline),
            "c" => Some(Tag::Class),
            "lang" => Some(Tag::Lang),
            "ruby" => Some(Tag::Ruby),
            "rt" => Some(Tag::RubyText),
            _ => None,
        }
    }

    /// Name as written in cue text.
    pub fn name(&self) -> &'static str {
        match self {
            Tag::Voice => "v",
            Tag::Italic => "i",
            Tag::Bold => "b",
            Tag::Underline => "u",
            Tag::Class => "c",
            Tag::Lang => "lang",
            Tag::Ruby => "ruby",
            Tag::RubyText => "rt",
        }
    }

    /// Element name used in HTML output.
    pub fn html_name(&self) -> &'static str {
        match self {
            Tag::Voice | Tag::Lang | Tag::Class => "span",
            other => other.name(),
        }
    }
}

/// A tagged run of cue text.
#[derive(Debug, Clone, PartialEq)]
pub struct Span {
    pub tag: Tag,
    /// Class names from `<tag.a.b>`, in source order, never empty strings.
    pub classes: Vec<String>,
    /// Text after the tag name: the speaker for `v`, the language for `lang`.
    pub annotation: String,
    pub children: CueText,
}

#[derive(Debug, Clone, PartialEq)]
pub enum CueNode {
    Text(String),
    Span(Span),
    /// An inline `<mm:ss.mmm>` karaoke timestamp, in seconds.
    Timestamp(f64),
}

/// Parsed cue payload.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CueText {
    pub nodes: Vec<CueNode>,
}

impl CueText {
    /// Parse cue payload lines.
    ///
    /// In [`Strictness::Strict`] mode a tag name outside the WebVTT set is an
    /// [`ErrorKind::UnknownTag`] error; in lenient mode the tag is dropped and
    /// its content kept in place.
    pub fn parse<S: AsRef<str>>(lines: &[S], strictness: Strictness) -> Result<CueText, GrammarError> {
        let mut nodes = Vec::new();
        for (i, line) in lines.iter().enumerate() {
            if i > 0 {
                nodes.push(CueNode::Text("\n".to_string()));
            }
            nodes.extend(parse_line(line.as_ref(), strictness)?);
        }
        Ok(CueText { nodes })
    }

    /// Parse a `\n`-separated payload.
    pub fn parse_str(text: &str, strictness: Strictness) -> Result<CueText, GrammarError> {
        let lines: Vec<&str> = text.split('\n').collect();
        CueText::parse(&lines, strictness)
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Serialize back to WebVTT cue text.
    pub fn flatten(&self) -> String {
        let mut out = String::new();
        self.write_vtt(&mut out);
        out
    }

    /// Serialize as an HTML fragment.
    ///
    /// Text runs are copied unchanged since WebVTT text already uses HTML
    /// character references. Inline timestamps are omitted.
    pub fn flatten_html(&self) -> String {
        let mut out = String::new();
        self.write_html(&mut out);
        out
    }

    fn write_vtt(&self, out: &mut String) {
        for node in &self.nodes {
            match node {
                CueNode::Text(text) => out.push_str(text),
                CueNode::Timestamp(seconds) => {
                    out.push('<');
                    out.push_str(&timestamp::format(*seconds));
                    out.push('>');
                }
                CueNode::Span(span) => {
                    let name = span.tag.name();
                    out.push('<');
                    out.push_str(name);
                    for class in &span.classes {
                        out.push('.');
                        out.push_str(class);
                    }
                    if !span.annotation.is_empty() {
                        out.push(' ');
                        out.push_str(&span.annotation);
                    }
                    out.push('>');
                    span.children.write_vtt(out);
                    out.push_str("</");
                    out.push_str(name);
                    out.push('>');
                }
            }
        }
    }

    fn write_html(&self, out: &mut String) {
        for node in &self.nodes {
            match node {
                CueNode::Text(text) => out.push_str(text),
                CueNode::Timestamp(_) => {}
                CueNode::Span(span) => {
                    let name = span.tag.html_name();
                    out.push('<');
                    out.push_str(name);
                    if !span.classes.is_empty() {
                        push_attribute(out, "class", &span.classes.join(" "));
                    }
                    let annotation = span.annotation.trim();
                    match span.tag {
                        Tag::Voice if !annotation.is_empty() => {
                            let speaker: String = annotation.nfc().collect();
                            push_attribute(out, "title", &speaker);
                        }
                        Tag::Lang if !annotation.is_empty() => push_attribute(out, "lang", annotation),
                        _ => {}
                    }
                    out.push('>');
                    span.children.write_html(out);
                    out.push_str("</");
                    out.push_str(name);
                    out.push('>');
                }
            }
        }
    }
}

impl fmt::Display for CueText {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.flatten())
    }
}

fn push_attribute(out: &mut String, name: &str, value: &str) {
    out.push(' ');
    out.push_str(name);
    out.push_str("=\"");
    out.push_str(&value.replace('"', "&quot;"));
    out.push('"');
}

/// Parse one line, requiring every byte of it to be consumed.
fn parse_line(line: &str, strictness: Strictness) -> Result<Vec<CueNode>, GrammarError> {
    let mut parser = LineParser {
        line,
        pos: 0,
        strictness,
    };
    let nodes = parser.parse_nodes(None)?;
    if parser.pos < line.len() {
        return Err(GrammarError::new(ErrorKind::MalformedTag, parser.rest()));
    }
    Ok(nodes)
}

struct LineParser<'a> {
    line: &'a str,
    pos: usize,
    strictness: Strictness,
}

impl<'a> LineParser<'a> {
    fn rest(&self) -> &'a str {
        &self.line[self.pos..]
    }

    /// Parse nodes until the closing tag of `open`, or the end of the line.
    ///
    /// At the top level (`open == None`) a closing tag stops the loop without
    /// being consumed; [`parse_line`] reports it.
    fn parse_nodes(&mut self, open: Option<&'a str>) -> Result<Vec<CueNode>, GrammarError> {
        let mut nodes = Vec::new();
        loop {
            let rest = self.rest();
            if rest.is_empty() {
                return match open {
                    None | Some("v") => Ok(nodes),
                    Some(name) => Err(GrammarError::new(ErrorKind::UnclosedTag, &format!("<{}>", name))),
                };
            }

            if let Some(caps) = END_TAG_REGEX.captures(rest) {
                let whole = &caps[0];
                return match open {
                    Some(name) if name == &caps[1] => {
                        self.pos += whole.len();
                        Ok(nodes)
                    }
                    Some(name) => Err(GrammarError::new(
                        ErrorKind::UnclosedTag,
                        &format!("<{}>...{}", name, whole),
                    )),
                    None => Ok(nodes),
                };
            }

            if let Some(caps) = TIMESTAMP_TAG_REGEX.captures(rest) {
                let seconds = timestamp::from_parts(caps.get(1).map(|m| m.as_str()), &caps[2], &caps[3], &caps[4])
                    .ok_or_else(|| GrammarError::new(ErrorKind::MalformedTag, &caps[0]))?;
                self.pos += caps[0].len();
                nodes.push(CueNode::Timestamp(seconds));
                continue;
            }

            if let Some(caps) = START_TAG_REGEX.captures(rest) {
                let whole = caps.get(0).map_or("", |m| m.as_str());
                let name = caps.get(1).map_or("", |m| m.as_str());
                let tag = Tag::from_name(name);
                if tag.is_none() && self.strictness == Strictness::Strict {
                    return Err(GrammarError::new(ErrorKind::UnknownTag, whole));
                }

                let classes = caps
                    .get(2)
                    .map_or("", |m| m.as_str())
                    .split('.')
                    .filter(|class| !class.is_empty())
                    .map(String::from)
                    .collect();
                let annotation = caps.get(3).map_or("", |m| m.as_str()).to_string();

                self.pos += whole.len();
                let children = self.parse_nodes(Some(name))?;
                match tag {
                    Some(tag) => nodes.push(CueNode::Span(Span {
                        tag,
                        classes,
                        annotation,
                        children: CueText { nodes: children },
                    })),
                    None => {
                        log::warn!("Dropping unknown cue text tag {}", whole);
                        for child in children {
                            push_node(&mut nodes, child);
                        }
                    }
                }
                continue;
            }

            if rest.starts_with('<') {
                let kind = if ANY_TAG_REGEX.is_match(rest) {
                    ErrorKind::UnknownTag
                } else {
                    ErrorKind::MalformedTag
                };
                return Err(GrammarError::new(kind, rest));
            }

            let end = rest.find('<').unwrap_or(rest.len());
            push_node(&mut nodes, CueNode::Text(rest[..end].to_string()));
            self.pos += end;
        }
    }
}

/// Append `node`, merging adjacent text runs.
fn push_node(nodes: &mut Vec<CueNode>, node: CueNode) {
    if let CueNode::Text(text) = &node
        && let Some(CueNode::Text(last)) = nodes.last_mut()
    {
        last.push_str(text);
        return;
    }
    nodes.push(node);
}
