//! which resource types carry tags, and under which attribute
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum CloudProvider {
    Aws,
    Gcp,
    Azure,
}

impl CloudProvider {
    /// Provider a resource type belongs to, judged by its prefix
    pub fn of_resource_type(resource_type: &str) -> Option<Self> {
        if resource_type.starts_with("aws_") {
            Some(CloudProvider::Aws)
        } else if resource_type.starts_with("google_") {
            Some(CloudProvider::Gcp)
        } else if AZURE_PREFIXES
            .iter()
            .any(|prefix| resource_type.starts_with(prefix))
        {
            Some(CloudProvider::Azure)
        } else {
            None
        }
    }
}

impl std::fmt::Display for CloudProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            CloudProvider::Aws => "aws",
            CloudProvider::Gcp => "gcp",
            CloudProvider::Azure => "azure",
        })
    }
}

/// Lookup of tagging support per resource type
pub trait TaggingCatalog: Send + Sync {
    fn is_taggable(&self, resource_type: &str, provider: CloudProvider) -> bool;

    /// Name of the attribute (or repeated block) holding the tags
    fn tag_attribute_name(&self, resource_type: &str) -> String;
}

const AZURE_PREFIXES: &[&str] = &["azurerm_", "azurestack_", "azapi_"];

/// AWS types that attach, associate or configure other resources and have no tags
const AWS_UNTAGGED_SUFFIXES: &[&str] = &[
    "_attachment",
    "_association",
    "_bucket_policy",
    "_bucket_acl",
    "_bucket_versioning",
    "_bucket_public_access_block",
    "_bucket_server_side_encryption_configuration",
    "_bucket_lifecycle_configuration",
    "_bucket_notification",
    "_role_policy",
    "_security_group_rule",
    "_route",
    "_record",
    "_iam_user_policy",
    "_iam_group_policy",
    "_iam_group_membership",
];

/// GCP configuration and binding types, which carry no labels
const GCP_UNLABELED_PATTERNS: &[&str] = &[
    "_iam_policy",
    "_iam_binding",
    "_iam_member",
    "_access_control",
    "_peering",
    "_association",
    "_attachment",
    "_policy",
    "_rule",
    "_config",
    "_key",
    "_version",
    "_member",
    "_binding",
    "_metadata",
    "project_service",
    "organization_policy",
];

/// Name-based catalog with optional per-type overrides
#[derive(Debug, Clone, Default)]
pub struct DefaultCatalog {
    overrides: HashMap<String, bool>,
}

impl DefaultCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Forces the taggability of a single resource type
    pub fn with_override(mut self, resource_type: impl Into<String>, taggable: bool) -> Self {
        self.overrides.insert(resource_type.into(), taggable);
        self
    }
}

impl TaggingCatalog for DefaultCatalog {
    fn is_taggable(&self, resource_type: &str, provider: CloudProvider) -> bool {
        if CloudProvider::of_resource_type(resource_type) != Some(provider) {
            return false;
        }
        if let Some(taggable) = self.overrides.get(resource_type) {
            return *taggable;
        }

        match provider {
            CloudProvider::Aws => !AWS_UNTAGGED_SUFFIXES
                .iter()
                .any(|suffix| resource_type.ends_with(suffix)),
            CloudProvider::Gcp => !GCP_UNLABELED_PATTERNS
                .iter()
                .any(|pattern| resource_type.contains(pattern)),
            CloudProvider::Azure => true,
        }
    }

    fn tag_attribute_name(&self, resource_type: &str) -> String {
        if resource_type == "aws_autoscaling_group" {
            "tag".to_string()
        } else if resource_type.starts_with("google_") {
            "labels".to_string()
        } else {
            "tags".to_string()
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn taggability() {
        let catalog = DefaultCatalog::new();

        assert!(catalog.is_taggable("aws_s3_bucket", CloudProvider::Aws));
        assert!(!catalog.is_taggable("aws_s3_bucket_policy", CloudProvider::Aws));
        assert!(!catalog.is_taggable("aws_iam_role_policy_attachment", CloudProvider::Aws));
        assert!(!catalog.is_taggable("aws_s3_bucket", CloudProvider::Gcp));

        assert!(catalog.is_taggable("google_compute_instance", CloudProvider::Gcp));
        assert!(!catalog.is_taggable("google_project_iam_member", CloudProvider::Gcp));
        assert!(!catalog.is_taggable("google_kms_crypto_key", CloudProvider::Gcp));

        assert!(catalog.is_taggable("azurerm_resource_group", CloudProvider::Azure));
        assert!(!catalog.is_taggable("random_id", CloudProvider::Aws));
    }

    #[test]
    fn overrides() {
        let catalog = DefaultCatalog::new()
            .with_override("aws_route", true)
            .with_override("aws_instance", false);

        assert!(catalog.is_taggable("aws_route", CloudProvider::Aws));
        assert!(!catalog.is_taggable("aws_instance", CloudProvider::Aws));
    }

    #[test]
    fn attribute_names() {
        let catalog = DefaultCatalog::new();

        assert_eq!(catalog.tag_attribute_name("aws_instance"), "tags");
        assert_eq!(catalog.tag_attribute_name("aws_autoscaling_group"), "tag");
        assert_eq!(catalog.tag_attribute_name("google_storage_bucket"), "labels");
        assert_eq!(catalog.tag_attribute_name("azurerm_resource_group"), "tags");
    }
}
