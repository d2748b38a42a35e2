use crate::error::{ExtractError, Result};
use serde::{Deserialize, Serialize};

/// Tunable limits shared by the quotation and signature passes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionConfig {
    /// Longest signature considered, counted in non-blank lines.
    pub signature_max_lines: usize,
    /// Trimmed line length above which a line is too long to be a signature line.
    pub too_long_signature_line: usize,
    /// Expected height of a splitter; taller matches are still honoured but logged.
    pub splitter_max_lines: usize,
    /// Bodies with more lines than this are returned untouched by the quotation pass.
    pub max_lines_count: usize,
    /// Additional quoted-header banners, tried after the built-in ones.
    pub extra_splitters: Vec<SplitterRule>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SplitterRule {
    pub name: String,
    pub pattern: String,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        ExtractionConfig {
            signature_max_lines: 11,
            too_long_signature_line: 60,
            splitter_max_lines: 4,
            max_lines_count: 1000,
            extra_splitters: Vec::new(),
        }
    }
}

impl ExtractionConfig {
    pub fn from_file(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: ExtractionConfig = serde_yaml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_file(&self, path: &str) -> Result<()> {
        let content = serde_yaml::to_string(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        let limits = [
            ("signature_max_lines", self.signature_max_lines),
            ("too_long_signature_line", self.too_long_signature_line),
            ("splitter_max_lines", self.splitter_max_lines),
            ("max_lines_count", self.max_lines_count),
        ];
        for (name, value) in limits {
            if value == 0 {
                return Err(ExtractError::InvalidConfig(format!(
                    "{name} must be greater than zero"
                )));
            }
        }

        for rule in &self.extra_splitters {
            if rule.pattern.trim().is_empty() {
                return Err(ExtractError::InvalidConfig(format!(
                    "splitter '{}' has an empty pattern",
                    rule.name
                )));
            }
        }
        Ok(())
    }
}
