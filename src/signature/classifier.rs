//! Line classifier deciding whether a single line belongs to a signature.

use super::features::{Feature, FeatureVector, FEATURE_COUNT};
use crate::error::{ExtractError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};

/// Scores for the two classes of a line.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClassificationVerdict {
    pub not_signature: f64,
    pub signature: f64,
}

impl ClassificationVerdict {
    pub fn is_signature(&self) -> bool {
        self.signature > self.not_signature
    }
}

pub trait LineClassifier: Send + Sync {
    fn classify(&self, features: &FeatureVector) -> Result<ClassificationVerdict>;

    /// False until a model is trained or loaded.
    fn is_ready(&self) -> bool {
        true
    }
}

/// One labelled row of training data.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrainingSample {
    pub features: FeatureVector,
    pub is_signature: bool,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrainingOptions {
    pub learning_rate: f64,
    pub epochs: usize,
    /// L2 penalty on the weights, the bias is not penalised.
    pub regularization: f64,
}

impl Default for TrainingOptions {
    fn default() -> Self {
        TrainingOptions {
            learning_rate: 0.5,
            epochs: 2000,
            regularization: 0.001,
        }
    }
}

/// Parses training rows: 12 feature columns then a 0/1 label, comma separated.
///
/// Blank lines and lines starting with `#` are skipped. Line numbers in errors are 1-based.
pub fn parse_training_data(content: &str) -> Result<Vec<TrainingSample>> {
    let mut samples = Vec::new();
    for (number, raw) in content.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let error = |reason: String| ExtractError::TrainingData {
            line: number + 1,
            reason,
        };

        let values = line
            .split(',')
            .map(|value| {
                value
                    .trim()
                    .parse::<i64>()
                    .map_err(|e| error(format!("'{}': {}", value.trim(), e)))
            })
            .collect::<Result<Vec<i64>>>()?;
        if values.len() != FEATURE_COUNT + 1 {
            return Err(error(format!(
                "expected {} columns, found {}",
                FEATURE_COUNT + 1,
                values.len()
            )));
        }

        let mut features = FeatureVector::default();
        for (feature, value) in Feature::ALL.iter().zip(&values) {
            features.set(*feature, *value != 0);
        }
        let is_signature = match values[FEATURE_COUNT] {
            0 => false,
            1 => true,
            other => return Err(error(format!("label must be 0 or 1, found {other}"))),
        };
        samples.push(TrainingSample {
            features,
            is_signature,
        });
    }
    Ok(samples)
}

/// Logistic model over the feature flags.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinearClassifier {
    #[serde(default)]
    pub weights: BTreeMap<Feature, f64>,
    #[serde(default)]
    pub bias: f64,
}

impl Default for LinearClassifier {
    fn default() -> Self {
        let weights = [
            (Feature::ManyCapitalizedWords, 0.8),
            (Feature::TooLongLine, -2.5),
            (Feature::Email, 1.6),
            (Feature::Url, 1.4),
            (Feature::Phone, 1.6),
            (Feature::Separator, 2.5),
            (Feature::SpecialChars, 2.0),
            (Feature::SignatureWords, 1.8),
            (Feature::Name, 1.5),
            (Feature::PunctuationHigh, 0.6),
            (Feature::PunctuationVeryHigh, 0.6),
            (Feature::ContainsSenderNames, 2.5),
        ];
        LinearClassifier {
            weights: weights.into_iter().collect(),
            bias: -1.0,
        }
    }
}

fn sigmoid(z: f64) -> f64 {
    1.0 / (1.0 + (-z).exp())
}

impl LinearClassifier {
    pub fn weight(&self, feature: Feature) -> f64 {
        self.weights.get(&feature).copied().unwrap_or(0.0)
    }

    fn weight_array(&self) -> [f64; FEATURE_COUNT] {
        Feature::ALL.map(|feature| self.weight(feature))
    }

    /// Probability of the line being part of a signature.
    pub fn probability(&self, features: &FeatureVector) -> f64 {
        let z: f64 = self
            .weight_array()
            .iter()
            .zip(features.values())
            .map(|(w, x)| w * x)
            .sum();
        sigmoid(z + self.bias)
    }

    /// Fits a new model with batch gradient descent on the logistic loss.
    pub fn train(samples: &[TrainingSample], options: &TrainingOptions) -> Result<Self> {
        if samples.is_empty() {
            return Err(ExtractError::TrainingData {
                line: 0,
                reason: "no training samples".to_string(),
            });
        }

        let n = samples.len() as f64;
        let mut weights = [0.0; FEATURE_COUNT];
        let mut bias = 0.0;
        for _ in 0..options.epochs {
            let mut grad = [0.0; FEATURE_COUNT];
            let mut grad_bias = 0.0;
            for sample in samples {
                let x = sample.features.values();
                let z: f64 = weights.iter().zip(x).map(|(w, x)| w * x).sum::<f64>() + bias;
                let target = if sample.is_signature { 1.0 } else { 0.0 };
                let err = sigmoid(z) - target;
                for (g, x) in grad.iter_mut().zip(x) {
                    *g += err * x;
                }
                grad_bias += err;
            }
            for (w, g) in weights.iter_mut().zip(grad) {
                *w -= options.learning_rate * (g / n + options.regularization * *w);
            }
            bias -= options.learning_rate * grad_bias / n;
        }

        log::debug!("Trained line classifier on {} samples", samples.len());
        Ok(LinearClassifier {
            weights: Feature::ALL.into_iter().zip(weights).collect(),
            bias,
        })
    }

    pub fn from_file(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let model: LinearClassifier = serde_yaml::from_str(&content)?;
        Ok(model)
    }

    pub fn to_file(&self, path: &str) -> Result<()> {
        let content = serde_yaml::to_string(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

impl LineClassifier for LinearClassifier {
    fn classify(&self, features: &FeatureVector) -> Result<ClassificationVerdict> {
        let signature = self.probability(features);
        Ok(ClassificationVerdict {
            not_signature: 1.0 - signature,
            signature,
        })
    }
}

/// Swappable handle to the current model.
///
/// Classification takes a snapshot under the read lock and runs outside it, so a
/// reload never waits for in-flight calls and never exposes a half-built model.
#[derive(Clone, Default)]
pub struct SharedClassifier {
    inner: Arc<RwLock<Option<Arc<dyn LineClassifier>>>>,
}

impl SharedClassifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_model(model: impl LineClassifier + 'static) -> Self {
        let shared = Self::new();
        shared.load(model);
        shared
    }

    pub fn load(&self, model: impl LineClassifier + 'static) {
        let mut slot = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        *slot = Some(Arc::new(model));
        log::debug!("Line classifier loaded");
    }

    pub fn unload(&self) {
        let mut slot = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        *slot = None;
    }

    fn snapshot(&self) -> Option<Arc<dyn LineClassifier>> {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl fmt::Debug for SharedClassifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SharedClassifier")
            .field("ready", &self.is_ready())
            .finish()
    }
}

impl LineClassifier for SharedClassifier {
    fn classify(&self, features: &FeatureVector) -> Result<ClassificationVerdict> {
        match self.snapshot() {
            Some(model) => model.classify(features),
            None => Err(ExtractError::ClassifierUnavailable),
        }
    }

    fn is_ready(&self) -> bool {
        self.snapshot().map_or(false, |model| model.is_ready())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vector_of(features: &[Feature]) -> FeatureVector {
        let mut vector = FeatureVector::default();
        for feature in features {
            vector.set(*feature, true);
        }
        vector
    }

    #[test]
    fn test_default_model() {
        let model = LinearClassifier::default();
        let signature_lines = [
            vector_of(&[Feature::Separator]),
            vector_of(&[Feature::ContainsSenderNames]),
            vector_of(&[Feature::ManyCapitalizedWords, Feature::ContainsSenderNames]),
            vector_of(&[Feature::Phone]),
            vector_of(&[Feature::SignatureWords]),
        ];
        for vector in signature_lines {
            assert!(model.classify(&vector).unwrap().is_signature(), "{vector}");
        }

        let text_lines = [
            FeatureVector::default(),
            vector_of(&[Feature::TooLongLine, Feature::Email]),
            vector_of(&[Feature::ManyCapitalizedWords]),
        ];
        for vector in text_lines {
            assert!(!model.classify(&vector).unwrap().is_signature(), "{vector}");
        }
    }

    #[test]
    fn test_verdict_scores_sum_to_one() {
        let verdict = LinearClassifier::default()
            .classify(&vector_of(&[Feature::Url]))
            .unwrap();
        assert!((verdict.signature + verdict.not_signature - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_parse_training_data() {
        let data = "# features then label\n1,0,0,0,0,0,0,0,0,0,0,1,1\n\n0,1,0,0,0,0,0,0,0,0,0,0,0\n";
        let samples = parse_training_data(data).unwrap();
        assert_eq!(samples.len(), 2);
        assert!(samples[0].is_signature);
        assert!(samples[0].features.get(Feature::ManyCapitalizedWords));
        assert!(samples[0].features.get(Feature::ContainsSenderNames));
        assert!(!samples[1].is_signature);
        assert!(samples[1].features.get(Feature::TooLongLine));
    }

    #[test]
    fn test_parse_training_data_errors() {
        assert!(matches!(
            parse_training_data("1,0,0\n"),
            Err(ExtractError::TrainingData { line: 1, .. })
        ));
        assert!(matches!(
            parse_training_data("# ok\n0,0,0,0,0,0,0,0,0,0,0,0,x\n"),
            Err(ExtractError::TrainingData { line: 2, .. })
        ));
        assert!(matches!(
            parse_training_data("0,0,0,0,0,0,0,0,0,0,0,0,2\n"),
            Err(ExtractError::TrainingData { line: 1, .. })
        ));
    }

    #[test]
    fn test_train_separates_classes() {
        let mut samples = Vec::new();
        for _ in 0..5 {
            samples.push(TrainingSample {
                features: vector_of(&[Feature::Separator]),
                is_signature: true,
            });
            samples.push(TrainingSample {
                features: vector_of(&[Feature::ContainsSenderNames, Feature::Name]),
                is_signature: true,
            });
            samples.push(TrainingSample {
                features: vector_of(&[Feature::TooLongLine]),
                is_signature: false,
            });
            samples.push(TrainingSample {
                features: FeatureVector::default(),
                is_signature: false,
            });
        }

        let model = LinearClassifier::train(&samples, &TrainingOptions::default()).unwrap();
        for sample in &samples {
            let verdict = model.classify(&sample.features).unwrap();
            assert_eq!(verdict.is_signature(), sample.is_signature);
        }
        assert!(model.weight(Feature::Separator) > 0.0);
        assert!(model.weight(Feature::TooLongLine) < 0.0);
    }

    #[test]
    fn test_train_without_samples() {
        assert!(LinearClassifier::train(&[], &TrainingOptions::default()).is_err());
    }

    #[test]
    fn test_model_file_roundtrip() {
        let path = std::env::temp_dir().join(format!("replycut-model-{}.yaml", std::process::id()));
        let path = path.to_str().unwrap();

        let model = LinearClassifier::default();
        model.to_file(path).unwrap();
        let loaded = LinearClassifier::from_file(path).unwrap();
        std::fs::remove_file(path).ok();

        assert_eq!(loaded, model);
    }

    #[test]
    fn test_model_file_errors() {
        let missing = std::env::temp_dir().join("replycut-no-such-model.yaml");
        assert!(matches!(
            LinearClassifier::from_file(missing.to_str().unwrap()),
            Err(ExtractError::Io(_))
        ));

        let path = std::env::temp_dir().join(format!("replycut-bad-model-{}.yaml", std::process::id()));
        let path = path.to_str().unwrap();
        std::fs::write(path, "weights:\n  not_a_feature: 1.0\n").unwrap();
        let result = LinearClassifier::from_file(path);
        std::fs::remove_file(path).ok();
        assert!(matches!(result, Err(ExtractError::Yaml(_))));
    }

    #[test]
    fn test_shared_classifier_swaps_models() {
        let shared = SharedClassifier::new();
        let line = vector_of(&[Feature::Separator]);

        assert!(!shared.is_ready());
        assert!(matches!(
            shared.classify(&line),
            Err(ExtractError::ClassifierUnavailable)
        ));

        shared.load(LinearClassifier::default());
        assert!(shared.is_ready());
        assert!(shared.classify(&line).unwrap().is_signature());

        let handle = shared.clone();
        handle.unload();
        assert!(!shared.is_ready());
    }
}
