//! source files of an IaC tree
//!
//! [discover_files] walks a root directory and returns every file the chosen
//! [IacDialect] cares about, in a stable order (sorted by file name, depth first).
//! Tool caches (`.terraform`, `.terragrunt-cache`) and VCS metadata are never entered.
//!
//! A [SourceFile] is the path plus its full text. Nothing is parsed at this point, so a
//! file only has to be readable utf-8 to be accepted.
use std::path::{Path, PathBuf};

/// Flavour of HCL infrastructure code being scanned
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum IacDialect {
    #[default]
    Terraform,
    #[serde(rename = "opentofu")]
    #[value(name = "opentofu")]
    OpenTofu,
    Terragrunt,
}

impl IacDialect {
    pub fn extensions(&self) -> &'static [&'static str] {
        match self {
            IacDialect::Terraform => &["tf"],
            IacDialect::OpenTofu => &["tf", "tofu"],
            IacDialect::Terragrunt => &["hcl"],
        }
    }

    fn accepts(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| self.extensions().contains(&ext))
    }
}

/// Directories that hold caches or metadata rather than configuration
const SKIPPED_DIRECTORIES: &[&str] = &[".terraform", ".terragrunt-cache", ".git"];

#[derive(Debug, Clone, PartialEq)]
pub struct SourceFile {
    pub path: PathBuf,
    pub contents: String,
}

impl SourceFile {
    pub fn new(path: impl Into<PathBuf>, contents: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            contents: contents.into(),
        }
    }

    pub fn load(path: &Path) -> Result<Self, LoadError> {
        tracing::debug!(path=%path.display(), "loading file");

        let contents = std::fs::read_to_string(path).map_err(|source| LoadError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        Ok(Self::new(path, contents))
    }
}

/// Lists all files below `root` that belong to `dialect`
pub fn discover_files(root: &Path, dialect: IacDialect) -> Result<Vec<PathBuf>, LoadError> {
    if !root.is_dir() {
        return Err(LoadError::NotADirectory(root.to_path_buf()));
    }

    let walker = walkdir::WalkDir::new(root)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| {
            let skipped = entry.file_type().is_dir()
                && entry.depth() > 0
                && entry
                    .file_name()
                    .to_str()
                    .is_some_and(|name| SKIPPED_DIRECTORIES.contains(&name));
            !skipped
        });

    let mut files = vec![];
    for entry in walker {
        let entry = entry?;
        if entry.file_type().is_file() && dialect.accepts(entry.path()) {
            files.push(entry.into_path());
        }
    }

    tracing::debug!(root=%root.display(), count=files.len(), "discovered files");
    Ok(files)
}

#[derive(thiserror::Error, Debug)]
pub enum LoadError {
    #[error("{} is not a directory", .0.display())]
    NotADirectory(PathBuf),
    #[error("unable to read {}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("unable to walk directory")]
    Walk(#[from] walkdir::Error),
}

/// Utility macro to create a list of [SourceFile]s
///
/// ```
/// # use tagscan::source_files;
/// let files = source_files! {
///   "main.tf" => r#"resource "aws_s3_bucket" "logs" {}"#,
///   "variables.tf" => r#"variable "env" {}"#
/// };
/// assert_eq!(files.len(), 2);
/// ```
#[macro_export]
macro_rules! source_files {
    { $($path:expr => $contents:expr),+ $(,)? } => {
        vec![
            $( $crate::documents::SourceFile::new($path, $contents) ),+
        ]
    };
}

#[cfg(test)]
mod test {
    use super::*;
    use pretty_assertions::assert_eq;

    fn touch(root: &Path, relative: &str) {
        let path = root.join(relative);
        std::fs::create_dir_all(path.parent().expect("has parent")).expect("create dirs");
        std::fs::write(path, "").expect("write file");
    }

    #[test]
    fn discovery_order_and_skips() {
        let dir = tempfile::tempdir().expect("tempdir");
        touch(dir.path(), "b.tf");
        touch(dir.path(), "a.tf");
        touch(dir.path(), "modules/net/main.tf");
        touch(dir.path(), "modules/net/README.md");
        touch(dir.path(), ".terraform/modules/x/main.tf");
        touch(dir.path(), "live/terragrunt.hcl");
        touch(dir.path(), "live/.terragrunt-cache/abc/main.tf");
        touch(dir.path(), "extra.tofu");

        let relative = |files: Vec<PathBuf>| -> Vec<String> {
            files
                .iter()
                .map(|p| {
                    p.strip_prefix(dir.path())
                        .expect("below root")
                        .to_string_lossy()
                        .replace('\\', "/")
                })
                .collect()
        };

        let terraform = discover_files(dir.path(), IacDialect::Terraform).expect("discover");
        assert_eq!(
            relative(terraform),
            vec!["a.tf", "b.tf", "modules/net/main.tf"]
        );

        let tofu = discover_files(dir.path(), IacDialect::OpenTofu).expect("discover");
        assert_eq!(
            relative(tofu),
            vec!["a.tf", "b.tf", "extra.tofu", "modules/net/main.tf"]
        );

        let terragrunt = discover_files(dir.path(), IacDialect::Terragrunt).expect("discover");
        assert_eq!(relative(terragrunt), vec!["live/terragrunt.hcl"]);
    }

    #[test]
    fn root_must_be_a_directory() {
        let result = discover_files(Path::new("/definitely/not/here"), IacDialect::Terraform);
        assert!(matches!(result, Err(LoadError::NotADirectory(_))));
    }

    #[test]
    fn macro_builds_files() {
        let files = source_files! { "main.tf" => "locals {}" };
        assert_eq!(files, vec![SourceFile::new("main.tf", "locals {}")]);
    }
}
