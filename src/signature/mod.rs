//! Signature pass: splits a reply into its text and trailing signature.
//!
//! A cheap gate first looks at the last lines of the body. Only when it passes
//! is every line of the candidate window classified and tagged with the
//! `{e, s, t}` alphabet; the signature block is then found bottom-up.

pub mod bruteforce;
pub mod classifier;
pub mod features;

use crate::boundary::{BoundaryExtent, BoundaryGrammar, MarkerSequence, SignatureMarker};
use crate::config::ExtractionConfig;
use crate::error::{ExtractError, Result};
use crate::text::{get_delimiter, is_blank, join_lines, split_lines};
use classifier::LineClassifier;
use features::FeatureSpace;
use lazy_static::lazy_static;
use regex::Regex;
use serde::Serialize;

lazy_static! {
    /// Signature lines with up to two stray text lines between them, read from the end.
    static ref SIGNATURE_GRAMMAR: BoundaryGrammar = BoundaryGrammar::new(
        Regex::new("(e*(te*){0,2}s)+").unwrap(),
        true,
        BoundaryExtent::WholeMatch,
    );
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExtractionResult {
    pub text: String,
    pub signature: String,
}

impl ExtractionResult {
    fn unsigned(text: &str) -> Self {
        ExtractionResult {
            text: text.to_string(),
            signature: String::new(),
        }
    }

    pub fn has_signature(&self) -> bool {
        !self.signature.is_empty()
    }
}

/// Extracts the signature of `body` with the default configuration.
pub fn extract_signature(
    body: &str,
    sender: &str,
    classifier: &dyn LineClassifier,
) -> Result<ExtractionResult> {
    SignatureExtractor::default().extract(body, sender, classifier)
}

#[derive(Debug, Clone, Default)]
pub struct SignatureExtractor {
    config: ExtractionConfig,
}

impl SignatureExtractor {
    pub fn new(config: ExtractionConfig) -> Result<Self> {
        config.validate()?;
        Ok(SignatureExtractor { config })
    }

    pub fn config(&self) -> &ExtractionConfig {
        &self.config
    }

    /// Splits the trimmed `body` into text and signature.
    ///
    /// A body without a detectable signature comes back trimmed with an empty
    /// signature. Fails with `ClassifierUnavailable` when no model is loaded.
    pub fn extract(
        &self,
        body: &str,
        sender: &str,
        classifier: &dyn LineClassifier,
    ) -> Result<ExtractionResult> {
        if !classifier.is_ready() {
            return Err(ExtractError::ClassifierUnavailable);
        }

        let delimiter = get_delimiter(body);
        let body = body.trim();
        let space = FeatureSpace::new(sender, &self.config);
        if !space.has_signature(body) {
            log::debug!("No signature-like lines at the end of the body");
            return Ok(ExtractionResult::unsigned(body));
        }

        let lines = split_lines(body);
        let markers = self.mark_lines(&lines, &space, classifier)?;
        log::trace!("Signature markers: {markers}");

        let (text, signature) = process_marked_lines(&lines, &markers);
        let text = join_lines(text, delimiter);
        if signature.is_empty() || is_blank(&text) {
            return Ok(ExtractionResult::unsigned(body));
        }
        Ok(ExtractionResult {
            text,
            signature: join_lines(signature, delimiter),
        })
    }

    /// Markers of the trimmed `body`, computed whether or not the gate passes.
    pub fn markers(
        &self,
        body: &str,
        sender: &str,
        classifier: &dyn LineClassifier,
    ) -> Result<MarkerSequence<SignatureMarker>> {
        if !classifier.is_ready() {
            return Err(ExtractError::ClassifierUnavailable);
        }
        let space = FeatureSpace::new(sender, &self.config);
        self.mark_lines(&split_lines(body.trim()), &space, classifier)
    }

    /// Tags the lines of the candidate window; lines above it stay `t`.
    pub fn mark_lines(
        &self,
        lines: &[&str],
        space: &FeatureSpace,
        classifier: &dyn LineClassifier,
    ) -> Result<MarkerSequence<SignatureMarker>> {
        let mut markers = MarkerSequence::filled(SignatureMarker::Text, lines.len());
        let Some(start) = bruteforce::signature_candidate_start(lines, &self.config) else {
            return Ok(markers);
        };

        for (i, line) in lines.iter().enumerate().skip(start).rev() {
            if is_blank(line) {
                markers.set(i, SignatureMarker::Empty);
                continue;
            }
            let features = space.line_features(line);
            if classifier.classify(&features)?.is_signature() {
                log::trace!("Line {i} is a signature line {features}");
                markers.set(i, SignatureMarker::Signature);
            }
        }
        Ok(markers)
    }
}

/// Splits `lines` into text and signature at the boundary found in `markers`.
///
/// The signature block must reach the last line; without one everything is text.
pub fn process_marked_lines<'l, 'a>(
    lines: &'l [&'a str],
    markers: &MarkerSequence<SignatureMarker>,
) -> (&'l [&'a str], &'l [&'a str]) {
    match SIGNATURE_GRAMMAR.find_boundary(&markers.reversed_string()) {
        Some(end) => {
            let boundary = lines.len() - end;
            log::debug!("Signature starts at line {boundary}");
            lines.split_at(boundary)
        }
        None => (lines, &[]),
    }
}
