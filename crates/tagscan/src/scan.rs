//! one scan over an IaC tree
//!
//! 1. discover and load files below [ScanOptions::root]
//! 2. build the [SymbolTable] from all of them (frozen afterwards)
//! 3. per file, in walk order: locate resources, drop filtered and untaggable types,
//!    extract and resolve tags, annotate the snippet, validate against the standard
//!
//! Unreadable and unparseable files, as well as malformed tag attributes, are
//! [ScanWarning]s unless [ScanOptions::strict] turns them into a [ScanError].
//! Cancellation is checked between files.
use crate::{
    annotate::annotate_snippet,
    catalog::{CloudProvider, TaggingCatalog},
    documents::{discover_files, IacDialect, LoadError, SourceFile},
    extract::{extract_tags, raw_text, tag_attribute, ExtractError},
    locator::{locate_file, ResourceBlock},
    report::ValidationReport,
    standard::{StandardError, TagStandard},
    symbols::{SymbolDump, SymbolTable, SymbolTableBuilder},
    validate::{ComplianceResult, ComplianceValidator, ValidationOptions},
    value::Value,
};
use indexmap::IndexMap;
use regex::Regex;
use serde::Serialize;
use std::{
    path::PathBuf,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::{Duration, Instant},
};

#[derive(Debug, Clone, derive_new::new)]
pub struct ScanOptions {
    pub root: PathBuf,
    #[new(default)]
    pub dialect: IacDialect,
    /// only resource types matching this regular expression
    #[new(default)]
    pub include: Option<String>,
    /// resource types matching this regular expression are skipped
    #[new(default)]
    pub exclude: Option<String>,
    /// fail instead of skipping, see module docs
    #[new(default)]
    pub strict: bool,
    #[new(default)]
    pub ignore_optional: bool,
    #[new(default)]
    pub overrides: IndexMap<String, Value>,
    /// used when no standard is given; otherwise the provider is guessed per resource type
    #[new(default)]
    pub cloud_provider: Option<CloudProvider>,
    /// skip `*terratag.tf` files generated by tag injection
    #[new(default)]
    pub skip_tagged_files: bool,
}

/// Shared flag and optional deadline to stop a running scan
#[derive(Debug, Clone, Default)]
pub struct Cancellation {
    cancelled: Arc<AtomicBool>,
    deadline: Option<Instant>,
}

impl Cancellation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_deadline(deadline: Instant) -> Self {
        Self {
            cancelled: Default::default(),
            deadline: Some(deadline),
        }
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        Self::with_deadline(Instant::now() + timeout)
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
            || self.deadline.is_some_and(|deadline| Instant::now() >= deadline)
    }
}

/// A located resource with its tags as written
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResourceRecord {
    pub resource_type: String,
    pub name: String,
    pub file_path: PathBuf,
    pub line_number: usize,
    pub snippet: String,
    /// tag key to the expression text
    pub tags: IndexMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScannedResource {
    #[serde(flatten)]
    pub record: ResourceRecord,
    pub resolved_tags: IndexMap<String, Value>,
    pub annotated_snippet: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub compliance: Option<ComplianceResult>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum WarningKind {
    Read,
    Parse,
    Extract,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScanWarning {
    pub file_path: PathBuf,
    pub kind: WarningKind,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScanOutcome {
    pub resources: Vec<ScannedResource>,
    pub symbols: SymbolDump,
    pub warnings: Vec<ScanWarning>,
    pub files_scanned: usize,
    pub cancelled: bool,
}

impl ScanOutcome {
    /// Aggregate report over all validated resources
    pub fn report(&self, standard_file: Option<PathBuf>) -> ValidationReport {
        let results = self
            .resources
            .iter()
            .filter_map(|resource| resource.compliance.clone())
            .collect();
        ValidationReport::from_results(standard_file, results)
    }
}

#[derive(thiserror::Error, Debug)]
pub enum ScanError {
    #[error("invalid resource type filter `{pattern}`")]
    InvalidFilter {
        pattern: String,
        #[source]
        source: regex::Error,
    },
    #[error("invalid standard")]
    Standard(#[from] StandardError),
    #[error("unable to discover files")]
    Discover(#[source] LoadError),
    #[error("unable to load files")]
    Load(#[source] LoadError),
    #[error("unable to parse {}: {message}", path.display())]
    Parse { path: PathBuf, message: String },
    #[error("unable to extract tags of `{resource}`")]
    Extract {
        resource: String,
        #[source]
        source: ExtractError,
    },
}

struct Filters {
    include: Option<Regex>,
    exclude: Option<Regex>,
}

impl Filters {
    fn new(options: &ScanOptions) -> Result<Self, ScanError> {
        let compile = |pattern: &Option<String>| {
            pattern
                .as_deref()
                .map(|pattern| {
                    Regex::new(pattern).map_err(|source| ScanError::InvalidFilter {
                        pattern: pattern.to_string(),
                        source,
                    })
                })
                .transpose()
        };
        Ok(Self {
            include: compile(&options.include)?,
            exclude: compile(&options.exclude)?,
        })
    }

    fn accepts(&self, resource_type: &str) -> bool {
        self.include
            .as_ref()
            .map_or(true, |include| include.is_match(resource_type))
            && !self
                .exclude
                .as_ref()
                .is_some_and(|exclude| exclude.is_match(resource_type))
    }
}

/// Message of an error followed by all its sources
fn error_chain(error: &dyn std::error::Error) -> String {
    let mut message = error.to_string();
    let mut source = error.source();
    while let Some(inner) = source {
        message.push_str(": ");
        message.push_str(&inner.to_string());
        source = inner.source();
    }
    message
}

struct Scanner<'s> {
    options: &'s ScanOptions,
    catalog: &'s dyn TaggingCatalog,
    filters: Filters,
    validator: Option<ComplianceValidator>,
    symbols: SymbolTable,
    warnings: Vec<ScanWarning>,
}

#[tracing::instrument(skip_all, fields(root = %options.root.display(), dialect = ?options.dialect))]
pub fn scan(
    options: &ScanOptions,
    standard: Option<TagStandard>,
    catalog: &dyn TaggingCatalog,
    cancellation: &Cancellation,
) -> Result<ScanOutcome, ScanError> {
    let filters = Filters::new(options)?;
    let validator = standard
        .map(|standard| {
            ComplianceValidator::new(
                standard,
                ValidationOptions {
                    strict: options.strict,
                    ignore_optional: options.ignore_optional,
                },
            )
        })
        .transpose()?;

    let Sources {
        files,
        warnings,
        mut cancelled,
    } = load_sources(options, cancellation)?;
    let (symbols, unparseable) = build_symbols(options, &files);

    let mut scanner = Scanner {
        options,
        catalog,
        filters,
        validator,
        symbols,
        warnings,
    };

    let mut resources = vec![];
    let mut files_scanned = 0;
    if !cancelled {
        for file in &files {
            if cancellation.is_cancelled() {
                tracing::info!(path=%file.path.display(), "scan cancelled");
                cancelled = true;
                break;
            }
            resources.extend(scanner.scan_file(file, unparseable.contains_key(&file.path))?);
            files_scanned += 1;
        }
    }

    let outcome = ScanOutcome {
        resources,
        symbols: SymbolDump::from(&scanner.symbols),
        warnings: scanner.warnings,
        files_scanned,
        cancelled,
    };
    tracing::info!(
        files = outcome.files_scanned,
        resources = outcome.resources.len(),
        warnings = outcome.warnings.len(),
        cancelled = outcome.cancelled,
        "scan finished"
    );
    Ok(outcome)
}

/// Builds the symbol table of the tree without locating any resource
///
/// Files that cannot be read or parsed are reported as [ScanWarning]s, or fail the
/// call under [ScanOptions::strict], the same way [scan] treats them.
#[tracing::instrument(skip_all, fields(root = %options.root.display(), dialect = ?options.dialect))]
pub fn load_symbols(options: &ScanOptions) -> Result<(SymbolTable, Vec<ScanWarning>), ScanError> {
    let Sources {
        files,
        mut warnings,
        ..
    } = load_sources(options, &Cancellation::new())?;
    let (symbols, unparseable) = build_symbols(options, &files);

    for (path, message) in unparseable {
        if options.strict {
            return Err(ScanError::Parse { path, message });
        }
        warnings.push(ScanWarning {
            file_path: path,
            kind: WarningKind::Parse,
            message,
        });
    }
    Ok((symbols, warnings))
}

/// Files of a tree in walk order
struct Sources {
    files: Vec<SourceFile>,
    warnings: Vec<ScanWarning>,
    cancelled: bool,
}

fn load_sources(options: &ScanOptions, cancellation: &Cancellation) -> Result<Sources, ScanError> {
    let mut paths = discover_files(&options.root, options.dialect).map_err(ScanError::Discover)?;
    if options.skip_tagged_files {
        paths.retain(|path| {
            let generated = path
                .file_name()
                .and_then(|name| name.to_str())
                .is_some_and(|name| name.ends_with("terratag.tf"));
            if generated {
                tracing::debug!(path=%path.display(), "skipping generated file");
            }
            !generated
        });
    }

    let mut sources = Sources {
        files: vec![],
        warnings: vec![],
        cancelled: false,
    };
    for path in &paths {
        if cancellation.is_cancelled() {
            sources.cancelled = true;
            break;
        }
        match SourceFile::load(path) {
            Ok(file) => sources.files.push(file),
            Err(err) if options.strict => return Err(ScanError::Load(err)),
            Err(err) => {
                tracing::warn!(path=%path.display(), error=%err, "skipping unreadable file");
                sources.warnings.push(ScanWarning {
                    file_path: path.clone(),
                    kind: WarningKind::Read,
                    message: error_chain(&err),
                });
            }
        }
    }
    Ok(sources)
}

/// Symbol table of `files`, along with the files whose declarations were skipped
fn build_symbols(options: &ScanOptions, files: &[SourceFile]) -> (SymbolTable, IndexMap<PathBuf, String>) {
    let mut builder = SymbolTableBuilder::new()
        .with_overrides(options.overrides.clone())
        .strict(options.strict);
    let mut unparseable = IndexMap::new();
    for file in files {
        if let Err(err) = builder.add_source(file) {
            tracing::warn!(path=%file.path.display(), error=%err, "declarations of file skipped");
            unparseable.insert(file.path.clone(), error_chain(&err));
        }
    }
    (builder.build(), unparseable)
}

impl Scanner<'_> {
    fn scan_file(
        &mut self,
        file: &SourceFile,
        declarations_skipped: bool,
    ) -> Result<Vec<ScannedResource>, ScanError> {
        let blocks = match locate_file(file) {
            Ok(blocks) => blocks,
            Err(err) => {
                let message = error_chain(&err);
                if self.options.strict {
                    return Err(ScanError::Parse {
                        path: file.path.clone(),
                        message,
                    });
                }
                tracing::warn!(path=%file.path.display(), error=%message, "skipping unparseable file");
                self.warnings.push(ScanWarning {
                    file_path: file.path.clone(),
                    kind: WarningKind::Parse,
                    message,
                });
                return Ok(vec![]);
            }
        };
        if declarations_skipped {
            self.warnings.push(ScanWarning {
                file_path: file.path.clone(),
                kind: WarningKind::Parse,
                message: "variables and locals of this file could not be read".to_string(),
            });
        }

        let mut resources = vec![];
        for block in blocks {
            if let Some(resource) = self.scan_resource(block)? {
                resources.push(resource);
            }
        }
        Ok(resources)
    }

    fn provider_of(&self, resource_type: &str) -> Option<CloudProvider> {
        self.validator
            .as_ref()
            .map(|validator| validator.standard().cloud_provider)
            .or(self.options.cloud_provider)
            .or_else(|| CloudProvider::of_resource_type(resource_type))
    }

    fn scan_resource(&mut self, block: ResourceBlock) -> Result<Option<ScannedResource>, ScanError> {
        let resource_type = block.resource_type.as_str();

        if !self.filters.accepts(resource_type) {
            tracing::debug!(address=%block.address(), "filtered");
            return Ok(None);
        }
        let Some(provider) = self.provider_of(resource_type) else {
            tracing::debug!(address=%block.address(), "not a cloud resource");
            return Ok(None);
        };
        if !self.catalog.is_taggable(resource_type, provider) {
            tracing::debug!(address=%block.address(), %provider, "does not support tags");
            return Ok(None);
        }
        if self
            .validator
            .as_ref()
            .is_some_and(|validator| validator.is_globally_excluded(resource_type))
        {
            tracing::debug!(address=%block.address(), "globally excluded");
            return Ok(None);
        }

        let attribute = self.catalog.tag_attribute_name(resource_type);
        let (tags, resolved_tags) = match extract_tags(&block.block, &attribute) {
            Ok(expressions) => {
                let mut tags = IndexMap::new();
                let mut resolved = IndexMap::new();
                for (key, expr) in expressions {
                    let result = self.symbols.resolve_expression(&expr);
                    tags.insert(key.clone(), raw_text(&expr));
                    resolved.insert(key, result.value);
                }
                (tags, resolved)
            }
            Err(ExtractError::ComplexExpression { .. }) => self.resolve_whole(&block, &attribute),
            Err(err) => {
                if self.options.strict {
                    return Err(ScanError::Extract {
                        resource: block.address(),
                        source: err,
                    });
                }
                tracing::warn!(address=%block.address(), error=%err, "skipping resource");
                self.warnings.push(ScanWarning {
                    file_path: block.file_path.clone(),
                    kind: WarningKind::Extract,
                    message: format!("{}: {err}", block.address()),
                });
                return Ok(None);
            }
        };

        let compliance = self.validator.as_ref().map(|validator| {
            validator.validate(resource_type, &block.name, block.file_path.clone(), &resolved_tags)
        });
        let annotated_snippet = annotate_snippet(&block.snippet, &self.symbols);

        Ok(Some(ScannedResource {
            record: ResourceRecord {
                resource_type: block.resource_type,
                name: block.name,
                file_path: block.file_path,
                line_number: block.line_number,
                snippet: block.snippet,
                tags,
            },
            resolved_tags,
            annotated_snippet,
            compliance,
        }))
    }

    /// Resolves a tag attribute that is not a literal map as a whole
    ///
    /// Anything but a map resolution means no tags.
    fn resolve_whole(
        &self,
        block: &ResourceBlock,
        attribute: &str,
    ) -> (IndexMap<String, String>, IndexMap<String, Value>) {
        let Some(expr) = tag_attribute(&block.block, attribute) else {
            return Default::default();
        };
        let result = self.symbols.resolve_expression(expr);
        match result.value {
            Value::Map(map) => {
                let tags = map
                    .iter()
                    .map(|(key, value)| {
                        let text = value.as_scalar_string().unwrap_or_else(|| value.to_string());
                        (key.clone(), text)
                    })
                    .collect();
                (tags, map)
            }
            _ => {
                tracing::debug!(address=%block.address(), original=%result.original, reason=?result.uncertainty, "tags not resolvable, treated as empty");
                Default::default()
            }
        }
    }
}
