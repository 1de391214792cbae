//! Text rewrites applied by rules
//!
//! Each helper returns `Some(new_text)` only when the text actually changes,
//! so callers can track whether a reply was rewritten.

use aho_corasick::AhoCorasick;
use regex::Regex;
use std::borrow::Cow;
use tracing::warn;

/// Ordered phrases matched as case-insensitive substrings.
///
/// Phrases are lower-cased once and compiled into a single Aho-Corasick
/// automaton. A match reports the phrase that comes first in the list, not
/// the one that occurs first in the text.
#[derive(Debug, Clone)]
pub struct PhraseSet {
    phrases: Vec<String>,
    lowered: Vec<String>,
    matcher: Option<AhoCorasick>,
}

impl PhraseSet {
    /// Create a new phrase set
    pub fn new(phrases: Vec<String>) -> Self {
        let lowered: Vec<String> = phrases.iter().map(|p| p.to_lowercase()).collect();

        let matcher = if lowered.is_empty() {
            None
        } else {
            match AhoCorasick::new(&lowered) {
                Ok(ac) => Some(ac),
                Err(e) => {
                    warn!(error = %e, "Failed to build phrase matcher, using linear scan");
                    None
                }
            }
        };

        Self {
            phrases,
            lowered,
            matcher,
        }
    }

    /// Phrases as written in the rule
    pub fn phrases(&self) -> &[String] {
        &self.phrases
    }

    /// Check if there is nothing to match
    pub fn is_empty(&self) -> bool {
        self.phrases.is_empty()
    }

    /// First phrase (in list order) contained in `text`, ignoring case
    pub fn first_match(&self, text: &str) -> Option<&str> {
        self.first_match_lowered(&text.to_lowercase())
    }

    /// Same as [`first_match`](Self::first_match) for text already lower-cased
    pub fn first_match_lowered(&self, lowered_text: &str) -> Option<&str> {
        let index = match &self.matcher {
            Some(ac) => ac
                .find_overlapping_iter(lowered_text)
                .map(|m| m.pattern().as_usize())
                .min(),
            None => self
                .lowered
                .iter()
                .position(|phrase| lowered_text.contains(phrase.as_str())),
        };

        index.map(|i| self.phrases[i].as_str())
    }
}

impl PartialEq for PhraseSet {
    fn eq(&self, other: &Self) -> bool {
        self.phrases == other.phrases
    }
}

/// Regex substitution over every non-overlapping match.
///
/// The pattern is compiled once. A pattern that does not compile, an empty
/// pattern, or a missing replacement leave the rule inert.
///
/// Replacements are literal text except for `\1` and `\g<name>` group
/// references and the `\\`, `\n`, `\t` and `\r` escapes. A `$` is never
/// special.
#[derive(Debug, Clone)]
pub struct RegexRewrite {
    pattern: String,
    replacement: Option<String>,
    template: Option<String>,
    compiled: Option<Regex>,
}

impl RegexRewrite {
    /// Create a new rewrite, compiling `pattern`
    pub fn new(pattern: impl Into<String>, replacement: Option<String>) -> Self {
        let pattern = pattern.into();

        let compiled = if pattern.is_empty() {
            None
        } else {
            match Regex::new(&pattern) {
                Ok(re) => Some(re),
                Err(e) => {
                    warn!(pattern = %pattern, error = %e, "Invalid rewrite pattern, rule will be a no-op");
                    None
                }
            }
        };

        let template = replacement.as_deref().map(expand_template);

        Self {
            pattern,
            replacement,
            template,
            compiled,
        }
    }

    /// Pattern source
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// Whether applying this rewrite can change text
    pub fn is_active(&self) -> bool {
        self.compiled.is_some() && self.replacement.is_some()
    }

    /// Replace all matches in `text`
    pub fn apply(&self, text: &str) -> Option<String> {
        let (re, template) = match (&self.compiled, &self.template) {
            (Some(re), Some(template)) => (re, template),
            _ => return None,
        };

        match re.replace_all(text, template.as_str()) {
            Cow::Borrowed(_) => None,
            Cow::Owned(rewritten) if rewritten == text => None,
            Cow::Owned(rewritten) => Some(rewritten),
        }
    }
}

/// Convert a backslash-style replacement into a `regex` expansion template
fn expand_template(replacement: &str) -> String {
    let mut template = String::with_capacity(replacement.len());
    let mut rest = replacement;

    while let Some(c) = rest.chars().next() {
        rest = &rest[c.len_utf8()..];

        match c {
            '$' => template.push_str("$$"),
            '\\' => match rest.chars().next() {
                Some(escaped @ ('\\' | 'n' | 't' | 'r')) => {
                    template.push(match escaped {
                        'n' => '\n',
                        't' => '\t',
                        'r' => '\r',
                        _ => '\\',
                    });
                    rest = &rest[1..];
                }
                Some('1'..='9') => {
                    let len = rest.bytes().take(2).take_while(u8::is_ascii_digit).count();
                    template.push_str(&format!("${{{}}}", &rest[..len]));
                    rest = &rest[len..];
                }
                Some('g') => match group_name(&rest[1..]) {
                    Some((name, consumed)) => {
                        template.push_str(&format!("${{{}}}", name));
                        rest = &rest[1 + consumed..];
                    }
                    None => template.push('\\'),
                },
                _ => template.push('\\'),
            },
            other => template.push(other),
        }
    }

    template
}

/// Parse a leading `<name>`, returning the name and the bytes it spans
fn group_name(s: &str) -> Option<(&str, usize)> {
    let inner = s.strip_prefix('<')?;
    let end = inner.find('>')?;
    let name = &inner[..end];

    let valid = !name.is_empty() && name.chars().all(|c| c.is_alphanumeric() || c == '_');
    valid.then_some((name, end + 2))
}

impl PartialEq for RegexRewrite {
    fn eq(&self, other: &Self) -> bool {
        self.pattern == other.pattern && self.replacement == other.replacement
    }
}

/// Prefix `text` with `phrase` unless it already contains it verbatim
pub fn prepend_phrase(phrase: &str, text: &str) -> Option<String> {
    if text.contains(phrase) {
        None
    } else {
        Some(format!("{} {}", phrase, text))
    }
}

/// Cut `text` to at most `max_chars` characters.
///
/// Prefers the last whitespace inside the kept prefix as the cut point and
/// strips trailing whitespace from what remains. Returns `None` when the
/// text already fits.
pub fn truncate_at_boundary(text: &str, max_chars: usize) -> Option<String> {
    let (cut, _) = text.char_indices().nth(max_chars)?;
    let prefix = &text[..cut];

    let kept = match prefix.char_indices().rev().find(|(_, c)| c.is_whitespace()) {
        Some((idx, _)) => &prefix[..idx],
        None => prefix,
    };

    Some(kept.trim_end().to_string())
}
