//! Quotation pass: strips quoted replies from a plain-text body.
//!
//! Lines are tagged with the `{e, m, f, s, t}` alphabet:
//!
//! * `e` - empty line
//! * `m` - line starting with the `>` quote marker
//! * `f` - "---- Forwarded message ----" banner
//! * `s` - splitter, a line of a quoted-reply header
//! * `t` - presumably text of the latest message

pub mod splitters;

use crate::boundary::{MarkerSequence, QuoteMarker};
use crate::config::ExtractionConfig;
use crate::error::Result;
use crate::link_guard;
use crate::text::{get_delimiter, is_blank, join_lines, split_lines};
use lazy_static::lazy_static;
use regex::Regex;
use splitters::SplitterCascade;

lazy_static! {
    static ref RE_QUOTE_MARKER: Regex = Regex::new(r"^>+ ?").unwrap();
    static ref RE_FWD: Regex = Regex::new(r"(?i)^-+[ ]*Forwarded message[ ]*-+$").unwrap();
    static ref RE_PARENTHESIS_LINK: Regex = Regex::new(r"\(https?://").unwrap();

    // Grammars over the marker string.
    static ref RE_QUOTE_RUNS: Regex = Regex::new("(me*){3}").unwrap();
    static ref RE_FORWARDED_FIRST: Regex = Regex::new("^[te]*f").unwrap();
    static ref RE_INLINE_REPLY: Regex = Regex::new("^e*(t[te]*)m").unwrap();
    static ref RE_TEXT_AFTER_SPLITTER: Regex = Regex::new("(se*)+((t|f)+e*)+").unwrap();
    static ref RE_QUOTATION: Regex = Regex::new("((s|(me*){2,}).*me*)[te]*$").unwrap();
    static ref RE_EMPTY_QUOTATION: Regex = Regex::new("(s|(me*){2,})e*").unwrap();

    static ref DEFAULT_EXTRACTOR: QuotationExtractor = QuotationExtractor::default();
}

/// Extracts the latest message from `body` with the default configuration.
pub fn extract_quotation(body: &str) -> String {
    DEFAULT_EXTRACTOR.extract(body)
}

#[derive(Debug, Clone, Default)]
pub struct QuotationExtractor {
    config: ExtractionConfig,
    cascade: SplitterCascade,
}

impl QuotationExtractor {
    pub fn new(config: ExtractionConfig) -> Result<Self> {
        config.validate()?;
        let cascade = SplitterCascade::with_rules(&config.extra_splitters)?;
        Ok(QuotationExtractor { config, cascade })
    }

    pub fn config(&self) -> &ExtractionConfig {
        &self.config
    }

    pub fn cascade(&self) -> &SplitterCascade {
        &self.cascade
    }

    /// Returns `body` without quoted replies.
    ///
    /// Bodies longer than `max_lines_count` lines are returned untouched.
    pub fn extract(&self, body: &str) -> String {
        let delimiter = get_delimiter(body);
        let prepared = link_guard::preprocess(body, delimiter);
        let lines = split_lines(&prepared);
        if lines.len() > self.config.max_lines_count {
            log::debug!(
                "Skipping quotation pass: {} lines exceed limit of {}",
                lines.len(),
                self.config.max_lines_count
            );
            return body.to_string();
        }

        let markers = self.mark_message_lines(&lines);
        log::trace!("Quotation markers: {markers}");
        let kept = process_marked_lines(&lines, &markers);
        link_guard::postprocess(&join_lines(&kept, delimiter))
    }

    /// Markers of `body` after preprocessing, one per line.
    pub fn markers(&self, body: &str) -> MarkerSequence<QuoteMarker> {
        let prepared = link_guard::preprocess(body, get_delimiter(body));
        self.mark_message_lines(&split_lines(&prepared))
    }

    /// Tags every line; a splitter spanning several lines tags all of them and is skipped at once.
    ///
    /// The splitter window runs from the current line over at most `max_lines_count` lines.
    pub fn mark_message_lines(&self, lines: &[&str]) -> MarkerSequence<QuoteMarker> {
        let mut markers = MarkerSequence::filled(QuoteMarker::Text, lines.len());

        // windows are slices of one joined buffer
        let joined = lines.join("\n");
        let mut starts = Vec::with_capacity(lines.len());
        let mut offset = 0;
        for line in lines {
            starts.push(offset);
            offset += line.len() + 1;
        }

        let mut i = 0;
        while i < lines.len() {
            let line = lines[i];
            if is_blank(line) {
                markers.set(i, QuoteMarker::Empty);
            } else if RE_QUOTE_MARKER.is_match(line) {
                markers.set(i, QuoteMarker::Quote);
            } else if RE_FWD.is_match(line) {
                markers.set(i, QuoteMarker::Forwarded);
            } else {
                let last = (i + self.config.max_lines_count).min(lines.len()) - 1;
                let window = &joined[starts[i]..starts[last] + lines[last].len()];
                if let Some(splitter) = self.cascade.find(window) {
                    let consumed = splitter.line_count().min(lines.len() - i);
                    log::debug!(
                        "Splitter '{}' matched {consumed} line(s) at line {i}",
                        splitter.pattern.name
                    );
                    if consumed > self.config.splitter_max_lines {
                        log::debug!(
                            "Splitter '{}' spans more than {} lines",
                            splitter.pattern.name,
                            self.config.splitter_max_lines
                        );
                    }
                    for j in i..i + consumed {
                        markers.set(j, QuoteMarker::Splitter);
                    }
                    i += consumed;
                    continue;
                }
            }
            i += 1;
        }
        markers
    }
}

/// Picks the lines of the latest message out of a marked body.
pub fn process_marked_lines<'a>(
    lines: &[&'a str],
    markers: &MarkerSequence<QuoteMarker>,
) -> Vec<&'a str> {
    let mut markers = markers.to_string();

    // without a splitter a couple of '>' lines are not a quotation
    if !markers.contains('s') && !RE_QUOTE_RUNS.is_match(&markers) {
        markers = markers.replace('m', "t");
    }

    if RE_FORWARDED_FIRST.is_match(&markers) {
        log::debug!("Forwarded message, keeping the whole body");
        return lines.to_vec();
    }

    if is_inline_reply(lines, &markers) {
        log::debug!("Inline reply, keeping the whole body");
        return lines.to_vec();
    }

    if let Some(block) = RE_TEXT_AFTER_SPLITTER.find(&markers) {
        return lines[..block.start()].to_vec();
    }

    let quotation = RE_QUOTATION
        .captures(&markers)
        .or_else(|| RE_EMPTY_QUOTATION.captures(&markers));
    if let Some(block) = quotation.and_then(|caps| caps.get(1)) {
        let mut kept = lines[..block.start()].to_vec();
        kept.extend_from_slice(&lines[block.end()..]);
        return kept;
    }

    lines.to_vec()
}

/// True when answers are interleaved with quoted lines (`m`, text, `m`).
fn is_inline_reply(lines: &[&str], markers: &str) -> bool {
    markers.match_indices('m').any(|(i, _)| {
        let start = i + 1;
        RE_INLINE_REPLY.is_match(&markers[start..]) && !is_broken_link(lines, start)
    })
}

// A long link wrapped in parentheses can break a run of quoted lines.
fn is_broken_link(lines: &[&str], start: usize) -> bool {
    RE_PARENTHESIS_LINK.is_match(lines[start - 1])
        || lines
            .get(start)
            .and_then(|line| RE_PARENTHESIS_LINK.find(line.trim()))
            .map_or(false, |m| m.start() == 0)
}
