//! WebVTT parsing, serialization and HTML transcript rendering.
//!
//! [`Parser`] turns WebVTT text into a [`Document`] of region, style, note
//! and cue blocks; each cue payload is parsed into a [`CueText`] tree of
//! text runs and spans. A document prints back to canonical WebVTT through
//! its `Display` implementation, and [`HtmlTranscript`] renders its cues as
//! HTML sections with one element per detected sentence.
//!
//! ```rust,ignore
//! use vtt_transcript::{Document, HtmlTranscript};
//!
//! let doc = Document::parse("WEBVTT\n\n00:01.000 --> 00:04.000\n<v Esme>Hee! Ha!</v>\n")?;
//! print!("{}", doc);
//! print!("{}", doc.to_html(&HtmlTranscript::new())?);
//! ```

pub mod cue_text;
pub mod document;
pub mod error;
pub mod html;
pub mod parser;
pub mod rebalance;
pub mod splitter;
pub mod timestamp;

pub use cue_text::{CueNode, CueText, Span, Tag};
pub use document::{Block, Cue, Document, Region, Settings};
pub use error::{ErrorKind, GrammarError, VttError};
pub use html::HtmlTranscript;
pub use parser::{Parser, ParserOptions, Strictness};
pub use rebalance::rebalance;
pub use splitter::{DefaultSplitter, SENTENCE_BOUNDARY, SentenceSplitter, split_sentences};
