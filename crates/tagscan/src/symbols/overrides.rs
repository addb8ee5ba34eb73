//! variable values supplied from outside the configuration
//!
//! Sources are applied in increasing precedence, a later source overwrites earlier values:
//! 1. `TF_VAR_<name>` environment variables
//! 2. `terraform.tfvars` and `terraform.tfvars.json`
//! 3. `*.auto.tfvars` and `*.auto.tfvars.json` in lexical order
//! 4. explicit var files, a plan snapshot, `name=value` assignments (in call order)
use crate::value::Value;
use indexmap::IndexMap;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Overrides {
    values: IndexMap<String, Value>,
}

impl Overrides {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.values.insert(name.into(), value.into());
    }

    /// Picks up `TF_VAR_<name>` pairs
    pub fn extend_from_env(&mut self, vars: impl IntoIterator<Item = (String, String)>) {
        for (key, value) in vars {
            if let Some(name) = key.strip_prefix("TF_VAR_") {
                if !name.is_empty() {
                    self.values.insert(name.to_string(), assigned_value(&value));
                }
            }
        }
    }

    /// Loads `terraform.tfvars(.json)` and `*.auto.tfvars(.json)` from `dir`
    pub fn load_default_files(&mut self, dir: &Path) -> Result<(), OverrideError> {
        for path in default_var_files(dir)? {
            self.load_var_file(&path)?;
        }
        Ok(())
    }

    /// Loads a `.tfvars` (HCL) or `.tfvars.json` file
    pub fn load_var_file(&mut self, path: &Path) -> Result<(), OverrideError> {
        tracing::info!(path=%path.display(), "loading variable values");
        let contents = read(path)?;

        if path.extension().is_some_and(|ext| ext == "json") {
            let values: IndexMap<String, serde_json::Value> = serde_json::from_str(&contents)
                .map_err(|source| OverrideError::Json {
                    path: path.to_path_buf(),
                    source,
                })?;
            self.values
                .extend(values.into_iter().map(|(name, value)| (name, value.into())));
            return Ok(());
        }

        let body = hcl::parse(&contents).map_err(|source| OverrideError::Hcl {
            path: path.to_path_buf(),
            source,
        })?;
        for attribute in body.attributes() {
            match Value::from_literal(&attribute.expr) {
                Some(value) => {
                    self.values.insert(attribute.key.as_str().to_string(), value);
                }
                None => {
                    tracing::warn!(path=%path.display(), name=%attribute.key.as_str(), "ignoring non-literal variable value")
                }
            }
        }
        Ok(())
    }

    /// Loads `variables.<name>.value` from a JSON plan snapshot
    pub fn load_plan(&mut self, path: &Path) -> Result<(), OverrideError> {
        tracing::info!(path=%path.display(), "loading plan variables");
        let contents = read(path)?;
        let plan: PlanSnapshot =
            serde_json::from_str(&contents).map_err(|source| OverrideError::Json {
                path: path.to_path_buf(),
                source,
            })?;

        for (name, variable) in plan.variables {
            if !variable.value.is_null() {
                self.values.insert(name, variable.value.into());
            }
        }
        Ok(())
    }

    /// Applies a `name=value` assignment
    pub fn assign(&mut self, assignment: &str) -> Result<(), OverrideError> {
        let (name, value) = parse_assignment(assignment)?;
        self.values.insert(name, value);
        Ok(())
    }

    pub fn into_values(self) -> IndexMap<String, Value> {
        self.values
    }
}

#[derive(serde::Deserialize)]
struct PlanSnapshot {
    #[serde(default)]
    variables: IndexMap<String, PlanVariable>,
}

#[derive(serde::Deserialize)]
struct PlanVariable {
    #[serde(default)]
    value: serde_json::Value,
}

/// Splits `name=value`; the value may be an HCL list or object literal
pub fn parse_assignment(assignment: &str) -> Result<(String, Value), OverrideError> {
    let Some((name, value)) = assignment.split_once('=') else {
        return Err(OverrideError::Assignment(assignment.to_string()));
    };
    let name = name.trim();
    if name.is_empty() {
        return Err(OverrideError::Assignment(assignment.to_string()));
    }
    Ok((name.to_string(), assigned_value(value)))
}

fn assigned_value(raw: &str) -> Value {
    let trimmed = raw.trim();
    if trimmed.starts_with('[') || trimmed.starts_with('{') {
        let literal = trimmed
            .parse::<hcl_edit::expr::Expression>()
            .ok()
            .and_then(|expr| Value::from_literal(&expr.into()));
        if let Some(value) = literal {
            return value;
        }
    }
    raw.into()
}

fn default_var_files(dir: &Path) -> Result<Vec<PathBuf>, OverrideError> {
    let mut files: Vec<PathBuf> = ["terraform.tfvars", "terraform.tfvars.json"]
        .iter()
        .map(|name| dir.join(name))
        .filter(|path| path.is_file())
        .collect();

    let mut auto = vec![];
    let entries = std::fs::read_dir(dir).map_err(|source| OverrideError::Read {
        path: dir.to_path_buf(),
        source,
    })?;
    for entry in entries {
        let entry = entry.map_err(|source| OverrideError::Read {
            path: dir.to_path_buf(),
            source,
        })?;
        let file_name = entry.file_name().to_string_lossy().to_string();
        if file_name.ends_with(".auto.tfvars") || file_name.ends_with(".auto.tfvars.json") {
            auto.push(entry.path());
        }
    }
    auto.sort();

    files.extend(auto);
    Ok(files)
}

fn read(path: &Path) -> Result<String, OverrideError> {
    std::fs::read_to_string(path).map_err(|source| OverrideError::Read {
        path: path.to_path_buf(),
        source,
    })
}

#[derive(thiserror::Error, Debug)]
pub enum OverrideError {
    #[error("unable to read {}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("unable to parse {}", path.display())]
    Hcl {
        path: PathBuf,
        #[source]
        source: hcl::Error,
    },
    #[error("unable to parse {}", path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("expected `name=value`, got `{0}`")]
    Assignment(String),
}
