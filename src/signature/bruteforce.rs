//! Bounded trailing window where a signature may start.

use crate::boundary::{BoundaryExtent, BoundaryGrammar, CandidateMarker, MarkerSequence};
use crate::config::ExtractionConfig;
use crate::text::is_blank;
use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    /// Candidate lines closed by at most one dashed line, read bottom-up.
    static ref CANDIDATE_GRAMMAR: BoundaryGrammar = BoundaryGrammar::new(
        Regex::new("(c+d)[^d]|(c+d)$|(c+)|(d)[^d]|(d)$").unwrap(),
        false,
        BoundaryExtent::FirstGroup,
    );
}

/// Index of the first line of the signature candidate, if there is one.
pub fn signature_candidate_start(lines: &[&str], config: &ExtractionConfig) -> Option<usize> {
    let non_blank: Vec<usize> = lines
        .iter()
        .enumerate()
        .filter(|(_, line)| !is_blank(line))
        .map(|(i, _)| i)
        .collect();

    // a signature never starts on the first line with content
    if non_blank.len() <= 1 {
        return None;
    }
    let rest = &non_blank[1..];
    let candidate = &rest[rest.len().saturating_sub(config.signature_max_lines)..];

    let markers = mark_candidate_indexes(lines, candidate, config);
    process_marked_candidate_indexes(candidate, &markers)
        .first()
        .copied()
}

/// Trailing lines of `lines` that may hold a signature, empty when none can.
pub fn get_signature_candidate<'a>(lines: &[&'a str], config: &ExtractionConfig) -> Vec<&'a str> {
    signature_candidate_start(lines, config)
        .map(|start| lines[start..].to_vec())
        .unwrap_or_default()
}

/// Tags every candidate line, in candidate order.
pub fn mark_candidate_indexes(
    lines: &[&str],
    candidate: &[usize],
    config: &ExtractionConfig,
) -> MarkerSequence<CandidateMarker> {
    let mut markers = MarkerSequence::filled(CandidateMarker::Candidate, candidate.len());
    for (pos, &index) in candidate.iter().enumerate().rev() {
        let line = lines[index].trim();
        if line.chars().count() > config.too_long_signature_line {
            markers.set(pos, CandidateMarker::TooLong);
        } else if line.starts_with('-') && !line.trim_matches('-').is_empty() {
            markers.set(pos, CandidateMarker::Dashed);
        }
    }
    markers
}

/// Keeps the tail of `candidate` accepted by the candidate grammar.
pub fn process_marked_candidate_indexes(
    candidate: &[usize],
    markers: &MarkerSequence<CandidateMarker>,
) -> Vec<usize> {
    match CANDIDATE_GRAMMAR.find_boundary(&markers.reversed_string()) {
        Some(kept) => candidate[candidate.len().saturating_sub(kept)..].to_vec(),
        None => Vec::new(),
    }
}
