//! declarative tagging standard
//!
//! A standard is a YAML document:
//! ```yaml
//! version: 1
//! cloud_provider: aws
//! required_tags:
//!   - key: Environment
//!     allowed_values: [prod, staging, dev]
//! optional_tags:
//!   - key: Owner
//!     data_type: email
//! resource_rules:
//!   - resource_types: ["aws_s3_*"]
//!     required_tags: [Owner]
//! ```
//! [TagStandard::validate] checks the structure before anything is validated against it.
use crate::catalog::CloudProvider;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// The only schema version understood
pub const SUPPORTED_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TagStandard {
    pub version: u32,
    #[serde(default)]
    pub metadata: Metadata,
    pub cloud_provider: CloudProvider,
    #[serde(default)]
    pub required_tags: Vec<TagSpec>,
    #[serde(default)]
    pub optional_tags: Vec<TagSpec>,
    /// resource types skipped entirely
    #[serde(default)]
    pub global_excludes: Vec<String>,
    #[serde(default)]
    pub resource_rules: Vec<ResourceRule>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Metadata {
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub author: String,
    #[serde(default)]
    pub date: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TagSpec {
    pub key: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub allowed_values: Vec<String>,
    /// regular expression the whole value has to match
    #[serde(default, rename = "format", alias = "pattern", skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_type: Option<DataType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_length: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_length: Option<usize>,
    #[serde(default)]
    pub case_sensitive: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_value: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub examples: Vec<String>,
}

impl TagSpec {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            ..Default::default()
        }
    }

    /// Compares a tag key against this spec's key
    pub fn matches_key(&self, key: &str) -> bool {
        if self.case_sensitive {
            self.key == key
        } else {
            self.key.eq_ignore_ascii_case(key)
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataType {
    String,
    Numeric,
    Alphanumeric,
    Email,
    Url,
    Date,
    Boolean,
    Cron,
}

impl DataType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DataType::String => "string",
            DataType::Numeric => "numeric",
            DataType::Alphanumeric => "alphanumeric",
            DataType::Email => "email",
            DataType::Url => "url",
            DataType::Date => "date",
            DataType::Boolean => "boolean",
            DataType::Cron => "cron",
        }
    }
}

/// Extra requirements for resource types matching `resource_types` (`*` is a wildcard)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResourceRule {
    pub resource_types: Vec<String>,
    #[serde(default)]
    pub required_tags: Vec<String>,
    #[serde(default)]
    pub optional_tags: Vec<String>,
    #[serde(default)]
    pub excluded_tags: Vec<String>,
    /// specs replacing the global spec of the same key
    #[serde(default)]
    pub override_tags: Vec<TagSpec>,
}

impl TagStandard {
    pub fn from_yaml_str(yaml: &str) -> Result<Self, StandardError> {
        let standard: TagStandard = serde_yaml::from_str(yaml)?;
        standard.validate()?;
        Ok(standard)
    }

    pub fn load(path: &Path) -> Result<Self, StandardError> {
        tracing::info!(path=%path.display(), "loading standard");
        let yaml = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&yaml)
    }

    /// Global spec of `key`, required specs first
    pub fn find_spec(&self, key: &str) -> Option<&TagSpec> {
        self.required_tags
            .iter()
            .chain(&self.optional_tags)
            .find(|spec| spec.matches_key(key))
    }

    /// Structural checks, see [StandardError]
    pub fn validate(&self) -> Result<(), StandardError> {
        if self.version != SUPPORTED_VERSION {
            return Err(StandardError::UnsupportedVersion(self.version));
        }

        let mut seen: Vec<&TagSpec> = vec![];
        for spec in self.required_tags.iter().chain(&self.optional_tags) {
            validate_spec(spec)?;
            if seen
                .iter()
                .any(|other| other.matches_key(&spec.key) || spec.matches_key(&other.key))
            {
                return Err(StandardError::DuplicateKey(spec.key.clone()));
            }
            seen.push(spec);
        }

        for (index, rule) in self.resource_rules.iter().enumerate() {
            if rule.resource_types.is_empty()
                || rule.resource_types.iter().any(|t| t.trim().is_empty())
            {
                return Err(StandardError::EmptyRuleTypes(index));
            }
            let referenced = rule
                .required_tags
                .iter()
                .chain(&rule.optional_tags)
                .chain(&rule.excluded_tags);
            for key in referenced {
                let known = self.find_spec(key).is_some()
                    || rule.override_tags.iter().any(|spec| spec.matches_key(key));
                if !known {
                    return Err(StandardError::UnknownRuleTag {
                        rule: index,
                        key: key.clone(),
                    });
                }
            }
            for spec in &rule.override_tags {
                validate_spec(spec)?;
            }
        }

        Ok(())
    }
}

fn validate_spec(spec: &TagSpec) -> Result<(), StandardError> {
    if spec.key.trim().is_empty() {
        return Err(StandardError::EmptyKey);
    }

    if let Some(pattern) = &spec.pattern {
        regex::Regex::new(pattern).map_err(|source| StandardError::InvalidPattern {
            key: spec.key.clone(),
            source,
        })?;
    }

    if let (Some(min), Some(max)) = (spec.min_length, spec.max_length) {
        if max < min {
            return Err(StandardError::LengthBounds {
                key: spec.key.clone(),
                min,
                max,
            });
        }
    }

    if spec.allowed_values.iter().any(|value| value.is_empty()) {
        return Err(StandardError::EmptyAllowedValue(spec.key.clone()));
    }

    for example in &spec.examples {
        if let Some(reason) = crate::validate::value_problem(spec, example) {
            return Err(StandardError::InvalidExample {
                key: spec.key.clone(),
                example: example.clone(),
                reason,
            });
        }
    }

    Ok(())
}

#[derive(thiserror::Error, Debug)]
pub enum StandardError {
    #[error("unable to read standard")]
    Io(#[from] std::io::Error),
    #[error("unable to parse standard")]
    Yaml(#[from] serde_yaml::Error),
    #[error("unsupported standard version {0}, expected {}", SUPPORTED_VERSION)]
    UnsupportedVersion(u32),
    #[error("tag spec with empty key")]
    EmptyKey,
    #[error("tag `{0}` is declared more than once")]
    DuplicateKey(String),
    #[error("invalid format for tag `{key}`")]
    InvalidPattern {
        key: String,
        #[source]
        source: regex::Error,
    },
    #[error("tag `{key}` has max_length {max} below min_length {min}")]
    LengthBounds { key: String, min: usize, max: usize },
    #[error("tag `{0}` allows an empty value")]
    EmptyAllowedValue(String),
    #[error("resource rule #{0} has no resource types")]
    EmptyRuleTypes(usize),
    #[error("resource rule #{rule} references undeclared tag `{key}`")]
    UnknownRuleTag { rule: usize, key: String },
    #[error("example `{example}` of tag `{key}` is invalid: {reason}")]
    InvalidExample {
        key: String,
        example: String,
        reason: String,
    },
    #[error("invalid resource type pattern `{pattern}`")]
    InvalidResourcePattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },
}
