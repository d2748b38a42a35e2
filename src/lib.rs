//! Extraction of the latest reply from plain-text email bodies.
//!
//! Two independent passes are provided. The quotation pass strips quoted
//! replies and forwarded history, the signature pass splits the remaining
//! text from the sender's signature with the help of a line classifier.

pub mod boundary;
pub mod config;
pub mod error;
pub mod link_guard;
pub mod quotation;
pub mod signature;
pub mod text;

pub use config::{ExtractionConfig, SplitterRule};
pub use error::{ExtractError, Result};
pub use quotation::{extract_quotation, QuotationExtractor};
pub use signature::classifier::{
    ClassificationVerdict, LineClassifier, LinearClassifier, SharedClassifier,
};
pub use signature::features::{Feature, FeatureVector};
pub use signature::{extract_signature, ExtractionResult, SignatureExtractor};
