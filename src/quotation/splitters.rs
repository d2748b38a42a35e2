//! Ordered patterns recognising the banner that opens a quoted reply.
//!
//! Every pattern must match at the very start of the window. The first pattern in
//! table order wins, so more specific banners come first.

use crate::config::SplitterRule;
use crate::error::{ExtractError, Result};
use lazy_static::lazy_static;
use regex::Regex;

const ON_DATE_SMB_WROTE: &str = concat!(
    r"-*[ ]?(On|Le|W dniu|Op)[ ].*(,|użytkownik)(.*\n){0,2}.*",
    r"(wrote|sent|a écrit|napisał|schreef|verzond|geschreven):?-*"
);

/// Built-in banners as `(name, pattern)`, highest priority first.
const BUILTIN_SPLITTERS: &[(&str, &str)] = &[
    (
        "original_message",
        r"(?i)\s*-+[ ]*(Original Message|Reply Message|Ursprüngliche Nachricht|Antwort Nachricht|Oprindelig meddelelse)[ ]*-+",
    ),
    ("date_at", r"(\d+/\d+/\d+|\d+\.\d+\.\d+).*@"),
    ("on_date_wrote", ON_DATE_SMB_WROTE),
    (
        "op_schreef",
        r"-*[ ]?Op[ ].*(.*\n){0,2}.*(schreef|verzond|geschreven)[ ].*:",
    ),
    (
        "from_date_header",
        r"(?i)(_+\r?\n)?\s*(:?[*]?(From|Van|De|Von|Fra|Date|Datum|Envoyé))\s?:[*]? .*",
    ),
    (
        "weekday_date_email",
        r"\S{3,10}, \d\d? \S{3,10} 20\d\d,? \d\d?:\d\d(:\d\d)?( \S+){3,6}@\S+:",
    ),
];

/// Compiles `pattern` so that it can only match at the start of the window.
fn compile_anchored(pattern: &str) -> std::result::Result<Regex, regex::Error> {
    Regex::new(&format!(r"\A(?:{pattern})"))
}

lazy_static! {
    /// "On DATE, NAME wrote:" in its unanchored form, also used to split it onto its own line.
    pub static ref RE_ON_DATE_SMB_WROTE: Regex = Regex::new(ON_DATE_SMB_WROTE).unwrap();
    static ref BUILTIN_CASCADE: SplitterCascade = SplitterCascade {
        patterns: BUILTIN_SPLITTERS
            .iter()
            .enumerate()
            .map(|(priority, (name, pattern))| SplitterPattern {
                name: name.to_string(),
                priority,
                regex: compile_anchored(pattern).unwrap(),
            })
            .collect(),
    };
}

#[derive(Debug, Clone)]
pub struct SplitterPattern {
    pub name: String,
    /// Position in the cascade, 0 is tried first.
    pub priority: usize,
    pub regex: Regex,
}

/// A splitter found at the start of a window.
#[derive(Debug, Clone, Copy)]
pub struct SplitterMatch<'p, 'w> {
    pub pattern: &'p SplitterPattern,
    pub text: &'w str,
}

impl SplitterMatch<'_, '_> {
    /// Number of physical lines covered by the match.
    pub fn line_count(&self) -> usize {
        self.text.lines().count().max(1)
    }
}

#[derive(Debug, Clone)]
pub struct SplitterCascade {
    patterns: Vec<SplitterPattern>,
}

impl Default for SplitterCascade {
    fn default() -> Self {
        BUILTIN_CASCADE.clone()
    }
}

impl SplitterCascade {
    /// Built-in cascade followed by `rules` in the given order.
    pub fn with_rules(rules: &[SplitterRule]) -> Result<Self> {
        let mut cascade = Self::default();
        for rule in rules {
            let regex =
                compile_anchored(&rule.pattern).map_err(|source| ExtractError::InvalidPattern {
                    name: rule.name.clone(),
                    source,
                })?;
            cascade.patterns.push(SplitterPattern {
                name: rule.name.clone(),
                priority: cascade.patterns.len(),
                regex,
            });
        }
        Ok(cascade)
    }

    pub fn patterns(&self) -> &[SplitterPattern] {
        &self.patterns
    }

    /// Returns the first pattern matching at offset 0 of `window`.
    pub fn find<'p, 'w>(&'p self, window: &'w str) -> Option<SplitterMatch<'p, 'w>> {
        self.patterns.iter().find_map(|pattern| {
            pattern.regex.find(window).map(|m| SplitterMatch {
                pattern,
                text: m.as_str(),
            })
        })
    }
}
