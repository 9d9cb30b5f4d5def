//! Response extraction: recover the JSON candidate from raw model text.
//!
//! Models are told to return raw JSON, and they frequently wrap it in a
//! Markdown code fence anyway. Stripping is expressed as an explicit rule
//! set rather than a chain of ad hoc prefix checks:
//!
//! | Priority | Rule | Matches at | Example |
//! |----------|------|------------|---------|
//! | 1 | [`FenceRule::TaggedOpener`] | start | ` ```json `, ` ``` json title=x ` |
//! | 2 | [`FenceRule::PlainOpener`]  | start | ` ``` ` |
//! | – | [`FenceRule::Closer`]       | end   | ` ``` ` |
//!
//! At most one opener rule fires (the first that matches, in priority
//! order), so a tagged fence is never stripped twice. The closer rule is
//! checked independently afterwards. Extraction never fails; text without
//! fences passes through trimmed.

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

/// The tag may be followed by attributes (```` ```json title=plan ````); the
/// whole marker line goes, unless JSON starts on that same line.
static RE_TAGGED_OPENER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^```[ \t]*[A-Za-z][\w+.\-]*(?:[^\n{\[]*\n|[ \t]*)").unwrap()
});

static RE_PLAIN_OPENER: Lazy<Regex> = Lazy::new(|| Regex::new(r"^```[ \t]*\r?\n?").unwrap());

static RE_CLOSER: Lazy<Regex> = Lazy::new(|| Regex::new(r"```$").unwrap());

/// One fence-stripping rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FenceRule {
    /// Opening fence with a language tag, e.g. ` ```json `.
    TaggedOpener,
    /// Opening fence without a tag.
    PlainOpener,
    /// Closing fence at the very end of the text.
    Closer,
}

impl FenceRule {
    /// Opener rules in priority order.
    pub const OPENERS: [FenceRule; 2] = [FenceRule::TaggedOpener, FenceRule::PlainOpener];

    /// If the rule matches `text`, return what remains after removing the marker.
    pub fn apply<'a>(&self, text: &'a str) -> Option<&'a str> {
        match self {
            FenceRule::TaggedOpener => RE_TAGGED_OPENER.find(text).map(|m| &text[m.end()..]),
            FenceRule::PlainOpener => RE_PLAIN_OPENER.find(text).map(|m| &text[m.end()..]),
            FenceRule::Closer => RE_CLOSER.find(text).map(|m| &text[..m.start()]),
        }
    }
}

/// The extracted candidate and the rules that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Extraction {
    pub candidate: String,
    pub applied: Vec<FenceRule>,
}

/// Strip incidental fence wrapping from `raw` and report which rules fired.
pub fn extract_with_trace(raw: &str) -> Extraction {
    let mut text = raw.trim();
    let mut applied = Vec::with_capacity(2);

    let opener = FenceRule::OPENERS
        .iter()
        .find_map(|rule| rule.apply(text).map(|rest| (*rule, rest)));
    if let Some((rule, rest)) = opener {
        applied.push(rule);
        text = rest;
    }

    let trimmed = text.trim_end();
    if let Some(rest) = FenceRule::Closer.apply(trimmed) {
        applied.push(FenceRule::Closer);
        text = rest;
    }

    if !applied.is_empty() {
        debug!("Fence rules applied: {:?}", applied);
    }

    Extraction {
        candidate: text.trim().to_string(),
        applied,
    }
}

/// Strip incidental fence wrapping from `raw`.
pub fn extract_candidate(raw: &str) -> String {
    extract_with_trace(raw).candidate
}
