//! compliance of resolved tags against a [TagStandard]
//!
//! For every resource the validator reports
//! - missing tags: required keys that are absent
//! - violations: tags whose value breaks their spec, checked in the order
//!   data type, format, allowed values, max length, min length
//! - extra tags: keys neither required nor optional
//!
//! Extra tags only count against compliance with [ValidationOptions::strict].
use crate::{
    standard::{DataType, ResourceRule, StandardError, TagSpec, TagStandard},
    value::Value,
};
use indexmap::IndexMap;
use regex::Regex;
use serde::Serialize;
use std::{path::PathBuf, sync::LazyLock};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ValidationOptions {
    /// extra tags make a resource non-compliant
    pub strict: bool,
    /// optional tags are recognized but their values are not checked
    pub ignore_optional: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ViolationKind {
    InvalidDataType,
    InvalidFormat,
    InvalidValue,
    LengthExceeded,
    LengthTooShort,
    NotAllowed,
    UnresolvableValue,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TagViolation {
    pub tag_key: String,
    pub tag_value: String,
    pub kind: ViolationKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expected: Option<String>,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FixAction {
    Add,
    Update,
    Remove,
    Format,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SuggestedFix {
    pub tag_key: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_value: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggested_value: Option<String>,
    pub action: FixAction,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct ResourceKey {
    pub resource_type: String,
    pub name: String,
    pub file_path: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComplianceResult {
    pub resource: ResourceKey,
    pub is_compliant: bool,
    pub supports_tagging: bool,
    pub missing_tags: Vec<String>,
    pub violations: Vec<TagViolation>,
    pub extra_tags: Vec<String>,
    pub suggested_fixes: Vec<SuggestedFix>,
}

#[derive(Debug, Clone)]
struct CompiledSpec {
    spec: TagSpec,
    pattern: Option<Regex>,
}

impl CompiledSpec {
    fn new(spec: &TagSpec) -> Result<Self, StandardError> {
        let pattern = spec
            .pattern
            .as_deref()
            .map(full_match)
            .transpose()
            .map_err(|source| StandardError::InvalidPattern {
                key: spec.key.clone(),
                source,
            })?;
        Ok(Self {
            spec: spec.clone(),
            pattern,
        })
    }
}

#[derive(Debug, Clone)]
struct CompiledRule {
    resource_types: Vec<Regex>,
    rule: ResourceRule,
    override_tags: Vec<CompiledSpec>,
}

/// Requirements for one resource type after applying resource rules
struct Requirements {
    required: Vec<CompiledSpec>,
    optional: Vec<CompiledSpec>,
    excluded: Vec<CompiledSpec>,
}

#[derive(Debug, Clone)]
pub struct ComplianceValidator {
    standard: TagStandard,
    options: ValidationOptions,
    required: Vec<CompiledSpec>,
    optional: Vec<CompiledSpec>,
    rules: Vec<CompiledRule>,
}

impl ComplianceValidator {
    /// Checks the standard and compiles its patterns
    pub fn new(standard: TagStandard, options: ValidationOptions) -> Result<Self, StandardError> {
        standard.validate()?;

        let compile_all = |specs: &[TagSpec]| {
            specs
                .iter()
                .map(CompiledSpec::new)
                .collect::<Result<Vec<_>, _>>()
        };
        let required = compile_all(&standard.required_tags)?;
        let optional = compile_all(&standard.optional_tags)?;

        let mut rules = vec![];
        for rule in &standard.resource_rules {
            let resource_types = rule
                .resource_types
                .iter()
                .map(|pattern| {
                    type_matcher(pattern).map_err(|source| StandardError::InvalidResourcePattern {
                        pattern: pattern.clone(),
                        source,
                    })
                })
                .collect::<Result<Vec<_>, _>>()?;
            rules.push(CompiledRule {
                resource_types,
                override_tags: compile_all(&rule.override_tags)?,
                rule: rule.clone(),
            });
        }

        Ok(Self {
            standard,
            options,
            required,
            optional,
            rules,
        })
    }

    pub fn standard(&self) -> &TagStandard {
        &self.standard
    }

    pub fn is_globally_excluded(&self, resource_type: &str) -> bool {
        self.standard
            .global_excludes
            .iter()
            .any(|excluded| excluded == resource_type)
    }

    fn requirements(&self, resource_type: &str) -> Requirements {
        let mut requirements = Requirements {
            required: self.required.clone(),
            optional: self.optional.clone(),
            excluded: vec![],
        };

        let matching = self.rules.iter().filter(|compiled| {
            compiled
                .resource_types
                .iter()
                .any(|matcher| matcher.is_match(resource_type))
        });

        for compiled in matching {
            let lookup = |key: &str| {
                compiled
                    .override_tags
                    .iter()
                    .chain(&self.required)
                    .chain(&self.optional)
                    .find(|c| c.spec.matches_key(key))
                    .cloned()
            };

            for key in &compiled.rule.required_tags {
                requirements.optional.retain(|c| !c.spec.matches_key(key));
                if !requirements.required.iter().any(|c| c.spec.matches_key(key)) {
                    requirements.required.extend(lookup(key.as_str()));
                }
            }
            for key in &compiled.rule.optional_tags {
                let known = requirements
                    .required
                    .iter()
                    .chain(&requirements.optional)
                    .any(|c| c.spec.matches_key(key));
                if !known {
                    requirements.optional.extend(lookup(key.as_str()));
                }
            }
            for key in &compiled.rule.excluded_tags {
                requirements.excluded.extend(lookup(key.as_str()));
            }

            for replacement in &compiled.override_tags {
                for existing in requirements
                    .required
                    .iter_mut()
                    .chain(requirements.optional.iter_mut())
                {
                    if existing.spec.matches_key(&replacement.spec.key) {
                        *existing = replacement.clone();
                    }
                }
            }
        }

        requirements
    }

    /// Validates the resolved tags of one resource
    pub fn validate(
        &self,
        resource_type: &str,
        name: &str,
        file_path: impl Into<PathBuf>,
        tags: &IndexMap<String, Value>,
    ) -> ComplianceResult {
        let mut result = ComplianceResult {
            resource: ResourceKey {
                resource_type: resource_type.to_string(),
                name: name.to_string(),
                file_path: file_path.into(),
            },
            is_compliant: true,
            supports_tagging: true,
            missing_tags: vec![],
            violations: vec![],
            extra_tags: vec![],
            suggested_fixes: vec![],
        };

        if self.is_globally_excluded(resource_type) {
            return result;
        }

        let requirements = self.requirements(resource_type);

        for compiled in &requirements.required {
            let spec = &compiled.spec;
            if tags.keys().any(|key| spec.matches_key(key)) {
                continue;
            }
            result.missing_tags.push(spec.key.clone());
            result.suggested_fixes.push(SuggestedFix {
                tag_key: spec.key.clone(),
                current_value: None,
                suggested_value: spec
                    .default_value
                    .clone()
                    .or_else(|| spec.examples.first().cloned())
                    .or_else(|| spec.allowed_values.first().cloned()),
                action: FixAction::Add,
                reason: format!("Required tag '{}' is missing", spec.key),
            });
        }

        for (key, value) in tags {
            if requirements.excluded.iter().any(|c| c.spec.matches_key(key)) {
                let tag_value = display_value(value);
                result.violations.push(TagViolation {
                    tag_key: key.clone(),
                    tag_value: tag_value.clone(),
                    kind: ViolationKind::NotAllowed,
                    expected: None,
                    message: format!("Tag '{key}' is not allowed on resource type '{resource_type}'"),
                });
                result.suggested_fixes.push(SuggestedFix {
                    tag_key: key.clone(),
                    current_value: Some(tag_value),
                    suggested_value: None,
                    action: FixAction::Remove,
                    reason: format!("Tag '{key}' is not allowed on resource type '{resource_type}'"),
                });
                continue;
            }

            let required = requirements.required.iter().find(|c| c.spec.matches_key(key));
            let optional = requirements.optional.iter().find(|c| c.spec.matches_key(key));

            let compiled = match (required, optional) {
                (Some(compiled), _) => compiled,
                (None, Some(_)) if self.options.ignore_optional => continue,
                (None, Some(compiled)) => compiled,
                (None, None) => {
                    result.extra_tags.push(key.clone());
                    result.suggested_fixes.push(SuggestedFix {
                        tag_key: key.clone(),
                        current_value: Some(display_value(value)),
                        suggested_value: None,
                        action: FixAction::Remove,
                        reason: format!("Tag '{key}' is not defined in the standard"),
                    });
                    continue;
                }
            };

            for violation in check_tag(compiled, key, value) {
                if let Some(fix) = suggest_fix(&compiled.spec, &violation) {
                    result.suggested_fixes.push(fix);
                }
                result.violations.push(violation);
            }
        }

        result.is_compliant = result.missing_tags.is_empty()
            && result.violations.is_empty()
            && (!self.options.strict || result.extra_tags.is_empty());

        tracing::debug!(
            resource_type,
            name,
            compliant = result.is_compliant,
            missing = result.missing_tags.len(),
            violations = result.violations.len(),
            extra = result.extra_tags.len(),
            "validated"
        );
        result
    }
}

fn display_value(value: &Value) -> String {
    value.as_scalar_string().unwrap_or_else(|| value.to_string())
}

fn check_tag(compiled: &CompiledSpec, key: &str, value: &Value) -> Vec<TagViolation> {
    let tag_value = display_value(value);

    if !value.is_fully_resolved() {
        return vec![TagViolation {
            tag_key: key.to_string(),
            kind: ViolationKind::UnresolvableValue,
            expected: None,
            message: format!(
                "Tag '{key}' value '{tag_value}' cannot be validated: value could not be resolved"
            ),
            tag_value,
        }];
    }

    let Some(scalar) = value.as_scalar_string() else {
        return vec![TagViolation {
            tag_key: key.to_string(),
            kind: ViolationKind::InvalidDataType,
            expected: Some("string".to_string()),
            message: format!("Tag '{key}' value '{tag_value}' is not a single value"),
            tag_value,
        }];
    };

    value_checks(&compiled.spec, compiled.pattern.as_ref(), &scalar)
        .into_iter()
        .map(|failure| TagViolation {
            tag_key: key.to_string(),
            tag_value: scalar.clone(),
            kind: failure.kind,
            expected: failure.expected,
            message: format!("Tag '{key}' value '{scalar}' {}", failure.detail),
        })
        .collect()
}

struct CheckFailure {
    kind: ViolationKind,
    expected: Option<String>,
    detail: String,
}

/// Value checks of a spec in their fixed order
fn value_checks(spec: &TagSpec, pattern: Option<&Regex>, value: &str) -> Vec<CheckFailure> {
    let mut failures = vec![];

    if let Some(data_type) = spec.data_type {
        if let Some(problem) = data_type_problem(data_type, value) {
            failures.push(CheckFailure {
                kind: ViolationKind::InvalidDataType,
                expected: Some(data_type.as_str().to_string()),
                detail: format!("has invalid data type: {problem}"),
            });
        }
    }

    if let (Some(pattern), Some(source)) = (pattern, &spec.pattern) {
        if !pattern.is_match(value) {
            failures.push(CheckFailure {
                kind: ViolationKind::InvalidFormat,
                expected: Some(source.clone()),
                detail: "does not match required format".to_string(),
            });
        }
    }

    if !spec.allowed_values.is_empty() {
        let allowed = spec.allowed_values.iter().any(|allowed| {
            if spec.case_sensitive {
                allowed == value
            } else {
                allowed.to_lowercase() == value.to_lowercase()
            }
        });
        if !allowed {
            failures.push(CheckFailure {
                kind: ViolationKind::InvalidValue,
                expected: Some(format!("one of: {}", spec.allowed_values.join(", "))),
                detail: "is not in allowed values".to_string(),
            });
        }
    }

    let length = value.chars().count();
    if let Some(max) = spec.max_length {
        if length > max {
            failures.push(CheckFailure {
                kind: ViolationKind::LengthExceeded,
                expected: Some(format!("maximum {max} characters")),
                detail: format!("is too long (maximum {max} characters)"),
            });
        }
    }
    if let Some(min) = spec.min_length {
        if length < min {
            failures.push(CheckFailure {
                kind: ViolationKind::LengthTooShort,
                expected: Some(format!("minimum {min} characters")),
                detail: format!("is too short (minimum {min} characters)"),
            });
        }
    }

    failures
}

/// First problem of `value` against `spec`, used to check a standard's own examples
pub(crate) fn value_problem(spec: &TagSpec, value: &str) -> Option<String> {
    let pattern = match spec.pattern.as_deref().map(full_match).transpose() {
        Ok(pattern) => pattern,
        Err(_) => return Some("format is not a valid regular expression".to_string()),
    };
    value_checks(spec, pattern.as_ref(), value)
        .into_iter()
        .next()
        .map(|failure| failure.detail)
}

fn suggest_fix(spec: &TagSpec, violation: &TagViolation) -> Option<SuggestedFix> {
    let mut action = FixAction::Update;
    let suggested_value = match violation.kind {
        ViolationKind::InvalidValue => {
            let current = violation.tag_value.to_lowercase();
            spec.allowed_values
                .iter()
                .find(|allowed| allowed.to_lowercase().contains(&current))
                .or_else(|| spec.allowed_values.first())
                .cloned()
        }
        ViolationKind::InvalidFormat => spec
            .examples
            .first()
            .cloned()
            .or_else(|| spec.default_value.clone()),
        ViolationKind::LengthTooShort => spec
            .default_value
            .clone()
            .filter(|default| default.chars().count() >= spec.min_length.unwrap_or(0))
            .or_else(|| spec.examples.first().cloned()),
        ViolationKind::LengthExceeded => {
            action = FixAction::Format;
            spec.max_length
                .map(|max| violation.tag_value.chars().take(max).collect())
        }
        ViolationKind::InvalidDataType => spec
            .default_value
            .clone()
            .or_else(|| spec.examples.first().cloned()),
        ViolationKind::NotAllowed | ViolationKind::UnresolvableValue => return None,
    };

    Some(SuggestedFix {
        tag_key: violation.tag_key.clone(),
        current_value: Some(violation.tag_value.clone()),
        suggested_value,
        action,
        reason: violation.message.clone(),
    })
}

fn full_match(pattern: &str) -> Result<Regex, regex::Error> {
    Regex::new(&format!("^(?:{pattern})$"))
}

/// Resource type pattern where `*` matches any sequence
fn type_matcher(pattern: &str) -> Result<Regex, regex::Error> {
    let escaped: Vec<String> = pattern.split('*').map(regex::escape).collect();
    Regex::new(&format!("^{}$", escaped.join(".*")))
}

static EMAIL_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$").expect("email pattern is valid")
});

static URL_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^https?://[^\s/$.?#].[^\s]*$").expect("url pattern is valid"));

static DATE_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{4}-\d{2}-\d{2}$").expect("date pattern is valid"));

fn data_type_problem(data_type: DataType, value: &str) -> Option<String> {
    let valid = match data_type {
        DataType::String => true,
        DataType::Numeric => !value.is_empty() && value.chars().all(|c| c.is_ascii_digit()),
        DataType::Alphanumeric => {
            !value.is_empty() && value.chars().all(|c| c.is_ascii_alphanumeric())
        }
        DataType::Email => EMAIL_REGEX.is_match(value),
        DataType::Url => URL_REGEX.is_match(value),
        DataType::Date => DATE_REGEX.is_match(value),
        DataType::Boolean => matches!(value.to_lowercase().as_str(), "true" | "false"),
        DataType::Cron => {
            let fields: Vec<&str> = value.split_whitespace().collect();
            (fields.len() == 5 || fields.len() == 6)
                && fields.iter().all(|field| {
                    field
                        .chars()
                        .all(|c| c.is_ascii_alphanumeric() || "*?/,-#".contains(c))
                })
        }
    };

    (!valid).then(|| format!("expected {}", data_type.as_str()))
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::catalog::CloudProvider;
    use pretty_assertions::assert_eq;

    fn standard() -> TagStandard {
        TagStandard::from_yaml_str(
            r#"
version: 1
cloud_provider: aws
global_excludes: [aws_route53_zone]
required_tags:
  - key: Environment
    allowed_values: [prod, staging, dev]
  - key: Owner
    format: "^[^@]+@[^@]+$"
    default_value: platform@example.com
optional_tags:
  - key: CostCenter
    data_type: numeric
    max_length: 4
  - key: Name
    min_length: 3
    max_length: 10
  - key: Legacy
resource_rules:
  - resource_types: ["aws_s3_*"]
    required_tags: [CostCenter]
    excluded_tags: [Legacy]
  - resource_types: [aws_instance]
    override_tags:
      - key: Environment
        allowed_values: [prod]
        case_sensitive: true
"#,
        )
        .expect("valid standard")
    }

    fn validator(options: ValidationOptions) -> ComplianceValidator {
        ComplianceValidator::new(standard(), options).expect("compiles")
    }

    fn tags(pairs: &[(&str, &str)]) -> IndexMap<String, Value> {
        pairs
            .iter()
            .map(|(key, value)| (key.to_string(), Value::from(*value)))
            .collect()
    }

    fn kinds(result: &ComplianceResult) -> Vec<(&str, ViolationKind)> {
        result
            .violations
            .iter()
            .map(|v| (v.tag_key.as_str(), v.kind))
            .collect()
    }

    #[test]
    fn compliant_with_allowed_value() {
        let validator = validator(ValidationOptions::default());
        let result = validator.validate(
            "aws_vpc",
            "main",
            "main.tf",
            &tags(&[("Environment", "Prod"), ("Owner", "a@b")]),
        );

        assert!(result.is_compliant);
        assert!(result.violations.is_empty());
        assert!(result.supports_tagging);
    }

    #[test]
    fn missing_required_tag() {
        let validator = validator(ValidationOptions::default());
        let result = validator.validate("aws_vpc", "main", "main.tf", &tags(&[("Environment", "prod")]));

        assert_eq!(result.missing_tags, vec!["Owner"]);
        assert!(!result.is_compliant);
        assert_eq!(
            result.suggested_fixes[0],
            SuggestedFix {
                tag_key: "Owner".to_string(),
                current_value: None,
                suggested_value: Some("platform@example.com".to_string()),
                action: FixAction::Add,
                reason: "Required tag 'Owner' is missing".to_string(),
            }
        );
    }

    #[test]
    fn pattern_violation() {
        let validator = validator(ValidationOptions::default());
        let result = validator.validate(
            "aws_vpc",
            "main",
            "main.tf",
            &tags(&[("Environment", "prod"), ("Owner", "not-an-email")]),
        );

        assert_eq!(kinds(&result), vec![("Owner", ViolationKind::InvalidFormat)]);
        assert!(!result.is_compliant);
    }

    #[test]
    fn check_order() {
        let validator = validator(ValidationOptions::default());
        let result = validator.validate(
            "aws_vpc",
            "main",
            "main.tf",
            &tags(&[
                ("Environment", "qa"),
                ("Owner", "a@b"),
                ("CostCenter", "12ab5"),
                ("Name", "x"),
            ]),
        );

        assert_eq!(
            kinds(&result),
            vec![
                ("Environment", ViolationKind::InvalidValue),
                ("CostCenter", ViolationKind::InvalidDataType),
                ("CostCenter", ViolationKind::LengthExceeded),
                ("Name", ViolationKind::LengthTooShort),
            ]
        );
        let truncate = result
            .suggested_fixes
            .iter()
            .find(|fix| fix.action == FixAction::Format)
            .expect("format fix");
        assert_eq!(truncate.suggested_value.as_deref(), Some("12ab"));
    }

    #[test]
    fn extra_tags_and_strict_mode() {
        let input = tags(&[("Environment", "prod"), ("Owner", "a@b"), ("Team", "x")]);

        let lenient = validator(ValidationOptions::default()).validate("aws_vpc", "main", "main.tf", &input);
        assert_eq!(lenient.extra_tags, vec!["Team"]);
        assert!(lenient.is_compliant);

        let strict = validator(ValidationOptions {
            strict: true,
            ..Default::default()
        })
        .validate("aws_vpc", "main", "main.tf", &input);
        assert_eq!(strict.extra_tags, vec!["Team"]);
        assert!(!strict.is_compliant);
    }

    #[test]
    fn keys_respect_case_sensitivity() {
        let validator = validator(ValidationOptions::default());
        let result = validator.validate(
            "aws_vpc",
            "main",
            "main.tf",
            &tags(&[("environment", "prod"), ("OWNER", "a@b")]),
        );
        assert!(result.missing_tags.is_empty());
        assert!(result.extra_tags.is_empty());
    }

    #[test]
    fn resource_rules() {
        let validator = validator(ValidationOptions::default());

        let bucket = validator.validate(
            "aws_s3_bucket",
            "logs",
            "main.tf",
            &tags(&[("Environment", "prod"), ("Owner", "a@b"), ("Legacy", "yes")]),
        );
        assert_eq!(bucket.missing_tags, vec!["CostCenter"]);
        assert_eq!(kinds(&bucket), vec![("Legacy", ViolationKind::NotAllowed)]);
        assert!(bucket.extra_tags.is_empty());

        let lowercase = validator.validate(
            "aws_s3_bucket",
            "logs",
            "main.tf",
            &tags(&[("Environment", "prod"), ("Owner", "a@b"), ("CostCenter", "1234"), ("legacy", "yes")]),
        );
        assert_eq!(kinds(&lowercase), vec![("legacy", ViolationKind::NotAllowed)]);
        assert!(lowercase.extra_tags.is_empty());

        let instance = validator.validate(
            "aws_instance",
            "web",
            "main.tf",
            &tags(&[("Environment", "Prod"), ("Owner", "a@b")]),
        );
        assert_eq!(kinds(&instance), vec![("Environment", ViolationKind::InvalidValue)]);

        let excluded = validator.validate("aws_route53_zone", "z", "main.tf", &tags(&[]));
        assert!(excluded.is_compliant);
        assert!(excluded.missing_tags.is_empty());
    }

    #[test]
    fn unresolved_values_skip_other_checks() {
        let validator = validator(ValidationOptions::default());
        let mut input = tags(&[("Owner", "a@b")]);
        input.insert(
            "Environment".to_string(),
            Value::Unresolved("var.environment".to_string()),
        );

        let result = validator.validate("aws_vpc", "main", "main.tf", &input);

        assert_eq!(kinds(&result), vec![("Environment", ViolationKind::UnresolvableValue)]);
        assert_eq!(result.violations[0].tag_value, "var.environment");
        assert!(!result.is_compliant);
    }

    #[test]
    fn ignore_optional() {
        let validator = validator(ValidationOptions {
            ignore_optional: true,
            ..Default::default()
        });
        let result = validator.validate(
            "aws_vpc",
            "main",
            "main.tf",
            &tags(&[("Environment", "prod"), ("Owner", "a@b"), ("CostCenter", "abc")]),
        );
        assert!(result.is_compliant);
        assert!(result.extra_tags.is_empty());
    }

    #[test]
    fn data_types() {
        assert_eq!(data_type_problem(DataType::Email, "a.b@example.com"), None);
        assert!(data_type_problem(DataType::Email, "a@b").is_some());
        assert_eq!(data_type_problem(DataType::Url, "https://example.com/x"), None);
        assert_eq!(data_type_problem(DataType::Date, "2024-01-31"), None);
        assert_eq!(data_type_problem(DataType::Boolean, "True"), None);
        assert_eq!(data_type_problem(DataType::Cron, "0 12 * * MON-FRI"), None);
        assert!(data_type_problem(DataType::Cron, "* *").is_some());
        assert!(data_type_problem(DataType::Alphanumeric, "a-b").is_some());
    }

    #[test]
    fn invalid_standard_is_rejected() {
        let mut standard = standard();
        standard.cloud_provider = CloudProvider::Gcp;
        standard.required_tags.push(TagSpec::new("Environment"));

        assert!(matches!(
            ComplianceValidator::new(standard, ValidationOptions::default()),
            Err(StandardError::DuplicateKey(_))
        ));
    }
}
