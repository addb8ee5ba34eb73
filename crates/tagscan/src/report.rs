//! aggregate view over the compliance results of a scan
use crate::validate::{ComplianceResult, ViolationKind};
use serde::Serialize;
use std::{
    collections::BTreeMap,
    fmt::{self, Display, Formatter},
    path::PathBuf,
};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationReport {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub standard_file: Option<PathBuf>,
    pub total_resources: usize,
    pub compliant_resources: usize,
    pub non_compliant_resources: usize,
    pub summary: ValidationSummary,
    pub results: Vec<ComplianceResult>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ValidationSummary {
    /// compliant / total, `0.0` without resources
    pub compliance_rate: f64,
    /// most frequent first
    pub most_common_violations: Vec<ViolationCount>,
    /// most frequent first
    pub most_common_missing_tags: Vec<MissingTagCount>,
    pub resource_type_breakdown: BTreeMap<String, ComplianceBreakdown>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ViolationCount {
    pub kind: ViolationKind,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MissingTagCount {
    pub tag_key: String,
    pub count: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ComplianceBreakdown {
    pub total: usize,
    pub compliant: usize,
    pub rate: f64,
}

fn rate(part: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        part as f64 / total as f64
    }
}

impl ValidationReport {
    pub fn from_results(standard_file: Option<PathBuf>, results: Vec<ComplianceResult>) -> Self {
        let mut breakdown: BTreeMap<String, ComplianceBreakdown> = BTreeMap::new();
        let mut violations: BTreeMap<ViolationKind, usize> = BTreeMap::new();
        let mut missing: BTreeMap<String, usize> = BTreeMap::new();

        for result in &results {
            let entry = breakdown
                .entry(result.resource.resource_type.clone())
                .or_default();
            entry.total += 1;
            if result.is_compliant {
                entry.compliant += 1;
            }
            for violation in &result.violations {
                *violations.entry(violation.kind).or_default() += 1;
            }
            for key in &result.missing_tags {
                *missing.entry(key.clone()).or_default() += 1;
            }
        }
        for entry in breakdown.values_mut() {
            entry.rate = rate(entry.compliant, entry.total);
        }

        let mut most_common_violations: Vec<ViolationCount> = violations
            .into_iter()
            .map(|(kind, count)| ViolationCount { kind, count })
            .collect();
        most_common_violations.sort_by(|a, b| b.count.cmp(&a.count));

        let mut most_common_missing_tags: Vec<MissingTagCount> = missing
            .into_iter()
            .map(|(tag_key, count)| MissingTagCount { tag_key, count })
            .collect();
        most_common_missing_tags.sort_by(|a, b| b.count.cmp(&a.count));

        let total_resources = results.len();
        let compliant_resources = results.iter().filter(|r| r.is_compliant).count();

        Self {
            standard_file,
            total_resources,
            compliant_resources,
            non_compliant_resources: total_resources - compliant_resources,
            summary: ValidationSummary {
                compliance_rate: rate(compliant_resources, total_resources),
                most_common_violations,
                most_common_missing_tags,
                resource_type_breakdown: breakdown,
            },
            results,
        }
    }

    pub fn is_fully_compliant(&self) -> bool {
        self.non_compliant_resources == 0
    }
}

/// Plain text summary for terminals
impl Display for ValidationReport {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        writeln!(f, "TAG COMPLIANCE REPORT")?;
        if let Some(standard_file) = &self.standard_file {
            writeln!(f, "Standard:        {}", standard_file.display())?;
        }
        writeln!(f, "Total resources: {}", self.total_resources)?;
        writeln!(f, "Compliant:       {}", self.compliant_resources)?;
        writeln!(f, "Non-compliant:   {}", self.non_compliant_resources)?;
        writeln!(
            f,
            "Compliance rate: {:.1}%",
            self.summary.compliance_rate * 100.0
        )?;

        let failing: Vec<&ComplianceResult> =
            self.results.iter().filter(|r| !r.is_compliant).collect();
        if !failing.is_empty() {
            writeln!(f, "\nNON-COMPLIANT RESOURCES")?;
            for result in failing {
                let mut issues = vec![];
                if !result.missing_tags.is_empty() {
                    issues.push(format!("missing: {}", result.missing_tags.join(", ")));
                }
                if !result.violations.is_empty() {
                    let keys: Vec<&str> = result
                        .violations
                        .iter()
                        .map(|v| v.tag_key.as_str())
                        .collect();
                    issues.push(format!("invalid: {}", keys.join(", ")));
                }
                if !result.extra_tags.is_empty() {
                    issues.push(format!("extra: {}", result.extra_tags.join(", ")));
                }
                writeln!(
                    f,
                    "  {}.{} ({}): {}",
                    result.resource.resource_type,
                    result.resource.name,
                    result.resource.file_path.display(),
                    issues.join("; ")
                )?;
            }
        }

        if !self.summary.resource_type_breakdown.is_empty() {
            writeln!(f, "\nRESOURCE TYPES")?;
            for (resource_type, breakdown) in &self.summary.resource_type_breakdown {
                writeln!(
                    f,
                    "  {resource_type}: {}/{} ({:.1}%)",
                    breakdown.compliant,
                    breakdown.total,
                    breakdown.rate * 100.0
                )?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::validate::{ResourceKey, TagViolation};
    use pretty_assertions::assert_eq;

    fn result(resource_type: &str, name: &str, missing: &[&str], violations: &[ViolationKind]) -> ComplianceResult {
        ComplianceResult {
            resource: ResourceKey {
                resource_type: resource_type.to_string(),
                name: name.to_string(),
                file_path: "main.tf".into(),
            },
            is_compliant: missing.is_empty() && violations.is_empty(),
            supports_tagging: true,
            missing_tags: missing.iter().map(|key| key.to_string()).collect(),
            violations: violations
                .iter()
                .map(|kind| TagViolation {
                    tag_key: "Environment".to_string(),
                    tag_value: "qa".to_string(),
                    kind: *kind,
                    expected: None,
                    message: String::new(),
                })
                .collect(),
            extra_tags: vec![],
            suggested_fixes: vec![],
        }
    }

    #[test]
    fn aggregates() {
        let report = ValidationReport::from_results(
            Some("standard.yaml".into()),
            vec![
                result("aws_instance", "a", &[], &[]),
                result("aws_instance", "b", &["Owner"], &[ViolationKind::InvalidValue]),
                result("aws_s3_bucket", "c", &["Owner", "Team"], &[]),
                result("aws_s3_bucket", "d", &[], &[ViolationKind::InvalidValue, ViolationKind::LengthExceeded]),
            ],
        );

        assert_eq!(report.total_resources, 4);
        assert_eq!(report.compliant_resources, 1);
        assert_eq!(report.non_compliant_resources, 3);
        assert_eq!(report.summary.compliance_rate, 0.25);
        assert_eq!(
            report.summary.most_common_violations,
            vec![
                ViolationCount { kind: ViolationKind::InvalidValue, count: 2 },
                ViolationCount { kind: ViolationKind::LengthExceeded, count: 1 },
            ]
        );
        assert_eq!(
            report.summary.most_common_missing_tags[0],
            MissingTagCount { tag_key: "Owner".to_string(), count: 2 }
        );
        assert_eq!(
            report.summary.resource_type_breakdown["aws_instance"],
            ComplianceBreakdown { total: 2, compliant: 1, rate: 0.5 }
        );
        assert!(!report.is_fully_compliant());
    }

    #[test]
    fn empty() {
        let report = ValidationReport::from_results(None, vec![]);
        assert_eq!(report.summary.compliance_rate, 0.0);
        assert!(report.is_fully_compliant());
        assert_eq!(
            report.to_string(),
            "TAG COMPLIANCE REPORT\nTotal resources: 0\nCompliant:       0\nNon-compliant:   0\nCompliance rate: 0.0%\n"
        );
    }
}
