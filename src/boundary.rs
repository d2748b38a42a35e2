//! Per-line marker alphabets and the boundary matcher run over them.
//!
//! Each pass tags every line with one character, joins the tags into a string and
//! runs a regular expression over that string to find where a structural block
//! (a quotation, a signature) begins or ends.

use regex::Regex;
use std::fmt;

/// A single-character line tag.
pub trait Marker: Copy + PartialEq + fmt::Debug {
    fn symbol(self) -> char;
}

/// Tags produced by the quotation pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuoteMarker {
    Empty,
    Quote,
    Forwarded,
    Splitter,
    Text,
}

impl Marker for QuoteMarker {
    fn symbol(self) -> char {
        match self {
            QuoteMarker::Empty => 'e',
            QuoteMarker::Quote => 'm',
            QuoteMarker::Forwarded => 'f',
            QuoteMarker::Splitter => 's',
            QuoteMarker::Text => 't',
        }
    }
}

/// Tags produced by the signature pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignatureMarker {
    Empty,
    Signature,
    Text,
}

impl Marker for SignatureMarker {
    fn symbol(self) -> char {
        match self {
            SignatureMarker::Empty => 'e',
            SignatureMarker::Signature => 's',
            SignatureMarker::Text => 't',
        }
    }
}

/// Tags used inside the bruteforce candidate window only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CandidateMarker {
    Candidate,
    Dashed,
    TooLong,
}

impl Marker for CandidateMarker {
    fn symbol(self) -> char {
        match self {
            CandidateMarker::Candidate => 'c',
            CandidateMarker::Dashed => 'd',
            CandidateMarker::TooLong => 'l',
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MarkerSequence<M: Marker> {
    markers: Vec<M>,
}

impl<M: Marker> MarkerSequence<M> {
    pub fn filled(marker: M, len: usize) -> Self {
        MarkerSequence {
            markers: vec![marker; len],
        }
    }

    pub fn len(&self) -> usize {
        self.markers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.markers.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<M> {
        self.markers.get(index).copied()
    }

    pub fn set(&mut self, index: usize, marker: M) {
        self.markers[index] = marker;
    }

    pub fn as_slice(&self) -> &[M] {
        &self.markers
    }

    pub fn reversed_string(&self) -> String {
        self.markers.iter().rev().map(|m| m.symbol()).collect()
    }
}

impl<M: Marker> From<Vec<M>> for MarkerSequence<M> {
    fn from(markers: Vec<M>) -> Self {
        MarkerSequence { markers }
    }
}

impl<M: Marker> fmt::Display for MarkerSequence<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for marker in &self.markers {
            write!(f, "{}", marker.symbol())?;
        }
        Ok(())
    }
}

/// Which offset of a successful match is reported as the boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoundaryExtent {
    /// End of the whole match.
    WholeMatch,
    /// End of the first capture group that took part in the match.
    FirstGroup,
}

/// A regular expression over a marker string plus the rules for reading a cut point from it.
#[derive(Debug, Clone)]
pub struct BoundaryGrammar {
    pattern: Regex,
    anchored: bool,
    extent: BoundaryExtent,
}

impl BoundaryGrammar {
    pub fn new(pattern: Regex, anchored: bool, extent: BoundaryExtent) -> Self {
        BoundaryGrammar {
            pattern,
            anchored,
            extent,
        }
    }

    /// Runs the grammar over `markers` and returns the boundary offset, if any.
    ///
    /// An anchored grammar only accepts a match starting at offset 0. Markers are
    /// ASCII, so the byte offset is also the line count.
    pub fn find_boundary(&self, markers: &str) -> Option<usize> {
        let caps = self.pattern.captures(markers)?;
        let whole = caps.get(0)?;
        if self.anchored && whole.start() != 0 {
            return None;
        }

        match self.extent {
            BoundaryExtent::WholeMatch => Some(whole.end()),
            BoundaryExtent::FirstGroup => caps
                .iter()
                .skip(1)
                .flatten()
                .map(|group| group.end())
                .find(|&end| end > 0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_marker_sequence_display() {
        let markers = MarkerSequence::from(vec![
            QuoteMarker::Text,
            QuoteMarker::Splitter,
            QuoteMarker::Empty,
            QuoteMarker::Quote,
        ]);
        assert_eq!(markers.to_string(), "tsem");
        assert_eq!(markers.reversed_string(), "mest");
        assert_eq!(markers.len(), 4);
    }

    #[test]
    fn test_anchored_grammar_requires_offset_zero() {
        let grammar = BoundaryGrammar::new(
            Regex::new("(e*(te*){0,2}s)+").unwrap(),
            true,
            BoundaryExtent::WholeMatch,
        );
        assert_eq!(grammar.find_boundary("sest"), Some(3));
        assert_eq!(grammar.find_boundary("ttts"), None);
        assert_eq!(grammar.find_boundary("tts"), Some(3));
    }

    #[test]
    fn test_unanchored_grammar_finds_later_match() {
        let grammar = BoundaryGrammar::new(
            Regex::new("s+").unwrap(),
            false,
            BoundaryExtent::WholeMatch,
        );
        assert_eq!(grammar.find_boundary("ttss"), Some(4));
        assert_eq!(grammar.find_boundary("ttt"), None);
    }

    #[test]
    fn test_first_group_extent() {
        let grammar = BoundaryGrammar::new(
            Regex::new("(c+d)[^d]|(c+d)$|(c+)|(d)[^d]|(d)$").unwrap(),
            true,
            BoundaryExtent::FirstGroup,
        );
        assert_eq!(grammar.find_boundary("ccd"), Some(3));
        assert_eq!(grammar.find_boundary("cdd"), Some(1));
        assert_eq!(grammar.find_boundary("dl"), Some(1));
        assert_eq!(grammar.find_boundary("lc"), None);
    }
}
