//! Name filter: include/exclude shell-glob patterns.
//!
//! Patterns are written in the usual shell dialect: `*` matches any run of
//! characters, `?` one character, `[a-z]` / `[^a-z]` a class and `\x` the
//! literal `x`. Runs of `*` are a single `*` (no recursive `**`), and a class
//! member of `-` or `]` must be escaped. They are rewritten into the `glob`
//! crate's dialect before compiling.

use glob::{MatchOptions, Pattern};
use std::iter::Peekable;
use std::str::Chars;
use thiserror::Error;
use tracing::warn;

const MATCH_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: true,
    require_literal_leading_dot: false,
};

/// A range no character falls in
const NO_CHARACTER: &str = "[b-a]";

#[derive(Debug, Error)]
enum BadPattern {
    #[error("pattern ends in an unescaped backslash")]
    TrailingEscape,

    #[error("malformed character class")]
    Class,

    #[error(transparent)]
    Glob(#[from] glob::PatternError),
}

/// Compiled include/exclude pattern sets
///
/// A malformed pattern is kept as a slot that never matches, so a bad include
/// pattern still counts as "includes configured" and rejects everything it
/// would otherwise have let through.
#[derive(Debug, Clone, Default)]
pub struct NameFilter {
    include: Vec<Option<Pattern>>,
    exclude: Vec<Option<Pattern>>,
}

/// Rewrite `raw` into the `glob` dialect
fn translate(raw: &str) -> Result<String, BadPattern> {
    let mut translated = String::with_capacity(raw.len());
    let mut chars = raw.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '*' => {
                while chars.next_if_eq(&'*').is_some() {}
                translated.push('*');
            }
            '?' => translated.push('?'),
            '\\' => {
                let literal = chars.next().ok_or(BadPattern::TrailingEscape)?;
                translated.push_str(&Pattern::escape(&literal.to_string()));
            }
            '[' => translated.push_str(&class(&mut chars)?),
            literal => translated.push_str(&Pattern::escape(&literal.to_string())),
        }
    }
    Ok(translated)
}

/// One class member, after its escape if any
fn class_member(chars: &mut Peekable<Chars<'_>>) -> Result<char, BadPattern> {
    match chars.next() {
        None | Some('-' | ']') => Err(BadPattern::Class),
        Some('\\') => chars.next().ok_or(BadPattern::Class),
        Some(c) => Ok(c),
    }
}

/// Parse a class body (the opening `[` already consumed) and render it
fn class(chars: &mut Peekable<Chars<'_>>) -> Result<String, BadPattern> {
    let negated = chars.next_if_eq(&'^').is_some();
    let mut ranges = Vec::new();

    loop {
        if !ranges.is_empty() && chars.next_if_eq(&']').is_some() {
            break;
        }
        let lo = class_member(chars)?;
        let hi = if chars.next_if_eq(&'-').is_some() {
            class_member(chars)?
        } else {
            lo
        };
        ranges.push((lo, hi));
    }

    Ok(render_class(negated, ranges))
}

/// Remove `c` from `ranges`, splitting the range it falls in
///
/// Returns whether any range held it.
fn carve(ranges: &mut Vec<(char, char)>, c: char) -> bool {
    let before = char::from_u32(u32::from(c) - 1);
    let after = char::from_u32(u32::from(c) + 1);
    let mut held = false;

    *ranges = ranges
        .iter()
        .flat_map(|&(lo, hi)| {
            if lo <= c && c <= hi {
                held = true;
                vec![
                    before.filter(|_| lo < c).map(|before| (lo, before)),
                    after.filter(|_| c < hi).map(|after| (after, hi)),
                ]
            } else {
                vec![Some((lo, hi))]
            }
        })
        .flatten()
        .collect();
    held
}

/// Render a class in the `glob` dialect
///
/// `glob` reads `]` as a member only in first position, `!` in first position
/// as negation and `-` between two members as a range, so those three are
/// pulled out of the ranges and placed where they read literally.
fn render_class(negated: bool, ranges: Vec<(char, char)>) -> String {
    let mut ranges: Vec<(char, char)> = ranges.into_iter().filter(|(lo, hi)| lo <= hi).collect();
    let bracket = carve(&mut ranges, ']');
    let bang = carve(&mut ranges, '!');
    let dash = carve(&mut ranges, '-');

    if ranges.is_empty() && !bracket {
        match (negated, bang, dash) {
            (false, false, false) => return NO_CHARACTER.to_string(),
            (false, true, false) => return "!".to_string(),
            (false, true, true) => return "[-!]".to_string(),
            (true, false, false) => return "?".to_string(),
            _ => {}
        }
    }

    let mut rendered = String::from("[");
    if negated {
        rendered.push('!');
    }
    if bracket {
        rendered.push(']');
    }
    for (lo, hi) in ranges {
        rendered.push(lo);
        rendered.push('-');
        rendered.push(hi);
    }
    if bang {
        rendered.push('!');
    }
    if dash {
        rendered.push('-');
    }
    rendered.push(']');
    rendered
}

fn compile(patterns: &[String]) -> Vec<Option<Pattern>> {
    patterns
        .iter()
        .map(|raw| match translate(raw)
            .and_then(|translated| Pattern::new(&translated).map_err(BadPattern::from))
        {
            Ok(pattern) => Some(pattern),
            Err(e) => {
                warn!(pattern = %raw, error = %e, "Ignoring malformed name pattern");
                None
            }
        })
        .collect()
}

fn any_match(patterns: &[Option<Pattern>], name: &str) -> bool {
    patterns
        .iter()
        .flatten()
        .any(|pattern| pattern.matches_with(name, MATCH_OPTIONS))
}

impl NameFilter {
    pub fn new(include: &[String], exclude: &[String]) -> Self {
        Self {
            include: compile(include),
            exclude: compile(exclude),
        }
    }

    /// Whether `name` participates in replication
    pub fn allows(&self, name: &str) -> bool {
        if !self.include.is_empty() && !any_match(&self.include, name) {
            return false;
        }
        !any_match(&self.exclude, name)
    }
}

/// One-shot form of [`NameFilter::allows`]
pub fn allowed(name: &str, include: &[String], exclude: &[String]) -> bool {
    NameFilter::new(include, exclude).allows(name)
}
