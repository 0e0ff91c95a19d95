//! The parsed WebVTT document model and its serialization back to WebVTT.

use crate::cue_text::CueText;
use crate::error::GrammarError;
use crate::html::HtmlTranscript;
use crate::parser::Parser;
use crate::timestamp;
use std::fmt;

/// Ordered `key:value` settings of a region or cue.
///
/// Keys keep their first-insertion order; inserting an existing key replaces
/// its value in place.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Settings(Vec<(String, String)>);

impl Settings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.iter().find(|(k, _)| k == key).map(|(_, v)| v.as_str())
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.iter().any(|(k, _)| k == key)
    }

    /// Set `key` to `value`, returning the previous value if there was one.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) -> Option<String> {
        let key = key.into();
        let value = value.into();
        match self.0.iter_mut().find(|(k, _)| *k == key) {
            Some((_, existing)) => Some(std::mem::replace(existing, value)),
            None => {
                self.0.push((key, value));
                None
            }
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Settings {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut settings = Settings::new();
        for (key, value) in iter {
            settings.insert(key, value);
        }
        settings
    }
}

/// A `REGION` definition.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Region {
    pub settings: Settings,
}

impl Region {
    pub fn id(&self) -> Option<&str> {
        self.settings.get("id")
    }
}

/// One timed cue.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Cue {
    /// Cue identifier, empty when the cue has none.
    pub identifier: String,
    /// Start time in seconds.
    pub start: f64,
    /// End time in seconds. Not checked against `start`.
    pub end: f64,
    pub settings: Settings,
    pub text: CueText,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Block {
    Region(Region),
    Style { text: String },
    Note { text: String },
    Cue(Cue),
}

/// A parsed WebVTT document: its blocks in source order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Document {
    pub blocks: Vec<Block>,
}

impl Document {
    /// Parse `text` with the default (strict) options.
    ///
    /// # Example
    ///
    /// ```rust,ignore
    /// let doc = Document::parse("WEBVTT\n\n00:01.000 --> 00:02.000\nHello")?;
    /// assert_eq!(doc.cues().count(), 1);
    /// ```
    pub fn parse(text: &str) -> Result<Self, GrammarError> {
        Parser::default().parse(text)
    }

    pub fn cues(&self) -> impl Iterator<Item = &Cue> {
        self.blocks.iter().filter_map(|block| match block {
            Block::Cue(cue) => Some(cue),
            _ => None,
        })
    }

    pub fn regions(&self) -> impl Iterator<Item = &Region> {
        self.blocks.iter().filter_map(|block| match block {
            Block::Region(region) => Some(region),
            _ => None,
        })
    }

    pub fn styles(&self) -> impl Iterator<Item = &str> {
        self.blocks.iter().filter_map(|block| match block {
            Block::Style { text } => Some(text.as_str()),
            _ => None,
        })
    }

    pub fn notes(&self) -> impl Iterator<Item = &str> {
        self.blocks.iter().filter_map(|block| match block {
            Block::Note { text } => Some(text.as_str()),
            _ => None,
        })
    }

    /// All style blocks concatenated, as written by [`fmt::Display`].
    pub fn style_text(&self) -> String {
        self.styles().collect()
    }

    /// Render the cues as an HTML transcript.
    pub fn to_html(&self, transcript: &HtmlTranscript) -> Result<String, GrammarError> {
        transcript.render(self.cues())
    }
}

/// Writes the document as WebVTT.
///
/// The output is canonical: regions first, all style text merged into one
/// `STYLE` block, then the cues. Notes are not written.
impl fmt::Display for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("WEBVTT\n\n")?;

        for region in self.regions() {
            f.write_str("REGION\n")?;
            for (key, value) in region.settings.iter() {
                writeln!(f, "{}:{}", key, value)?;
            }
            f.write_str("\n")?;
        }

        let style = self.style_text();
        if !style.is_empty() {
            write!(f, "STYLE\n{}\n", style)?;
        }

        for cue in self.cues() {
            write!(f, "{}", cue)?;
        }
        Ok(())
    }
}

/// Writes one cue block, including its trailing blank line.
impl fmt::Display for Cue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.identifier.is_empty() {
            writeln!(f, "{}", self.identifier)?;
        }
        write!(
            f,
            "{} --> {}",
            timestamp::format(self.start),
            timestamp::format(self.end)
        )?;
        for (key, value) in self.settings.iter() {
            write!(f, " {}:{}", key, value)?;
        }
        f.write_str("\n")?;
        if !self.text.is_empty() {
            writeln!(f, "{}", self.text)?;
        }
        f.write_str("\n")
    }
}
