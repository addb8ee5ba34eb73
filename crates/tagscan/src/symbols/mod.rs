//! variables, locals and the resolution of expressions that reference them
//!
//! A [SymbolTable] is built once per scan with [SymbolTableBuilder] from every
//! `variable` and `locals` block in the tree. Building evaluates all locals up front,
//! afterwards the table is read-only and can be shared between threads.
//!
//! Resolution never fails: unknown references, cycles and unsupported expressions
//! produce a [ResolutionResult] with `resolved == false` and a reason in `uncertainty`.
mod eval;
pub mod overrides;

use crate::{documents::SourceFile, value::Value, visit::VisitTraversals};
use eval::Evaluator;
use hcl_edit::Span;
use indexmap::{IndexMap, IndexSet};
use serde::Serialize;
use std::path::PathBuf;

/// A `variable "<name>" { ... }` declaration
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VariableDef {
    pub name: String,
    /// `type` as written, e.g. `map(string)`
    pub declared_type: Option<String>,
    pub description: Option<String>,
    /// `None` when there is no default or the default is `null`
    pub default: Option<Value>,
    pub sensitive: bool,
    pub nullable: bool,
    pub file_path: PathBuf,
    pub line_number: usize,
}

/// One attribute of a `locals { ... }` block
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LocalDef {
    pub name: String,
    #[serde(skip)]
    pub expression: hcl::Expression,
    /// `var.<name>` and `local.<name>` symbols the expression refers to
    pub dependencies: Vec<String>,
    pub file_path: PathBuf,
    pub line_number: usize,
    /// value computed when the table was built
    pub cached_value: Option<Value>,
    /// why no value could be computed
    pub unresolved_reason: Option<String>,
}

/// Syntactic shape an expression was resolved through
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ResolutionSource {
    Variable,
    Local,
    Interpolation,
    Merge,
    Literal,
    Unknown,
}

impl ResolutionSource {
    fn of(expr: &hcl::Expression) -> Self {
        use hcl::Expression;

        match expr {
            Expression::Traversal(traversal) => {
                match crate::reference::Reference::from_traversal(traversal) {
                    Some(reference) => match reference.namespace {
                        crate::reference::Namespace::Var => ResolutionSource::Variable,
                        crate::reference::Namespace::Local => ResolutionSource::Local,
                    },
                    None => ResolutionSource::Unknown,
                }
            }
            Expression::TemplateExpr(_) => {
                if Value::from_literal(expr).is_some() {
                    ResolutionSource::Literal
                } else {
                    ResolutionSource::Interpolation
                }
            }
            Expression::FuncCall(func_call) if func_call.name.to_string() == "merge" => {
                ResolutionSource::Merge
            }
            Expression::Parenthesis(inner) => ResolutionSource::of(inner),
            Expression::String(_)
            | Expression::Number(_)
            | Expression::Bool(_)
            | Expression::Array(_)
            | Expression::Object(_) => ResolutionSource::Literal,
            _ => ResolutionSource::Unknown,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolutionResult {
    pub original: String,
    pub value: Value,
    pub resolved: bool,
    pub source: ResolutionSource,
    pub uncertainty: Option<String>,
}

impl ResolutionResult {
    fn unresolved(original: &str, source: ResolutionSource, reason: impl Into<String>) -> Self {
        Self {
            original: original.to_string(),
            value: Value::Unresolved(original.to_string()),
            resolved: false,
            source,
            uncertainty: Some(reason.into()),
        }
    }
}

/// Frozen set of variables, locals and override values
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SymbolTable {
    variables: IndexMap<String, VariableDef>,
    locals: IndexMap<String, LocalDef>,
    overrides: IndexMap<String, Value>,
    strict: bool,
}

impl SymbolTable {
    /// Builds a table from all files, skipping files that do not parse
    pub fn build(files: &[SourceFile], overrides: IndexMap<String, Value>) -> Self {
        let mut builder = SymbolTableBuilder::new().with_overrides(overrides);
        for file in files {
            if let Err(err) = builder.add_source(file) {
                tracing::warn!(path=%file.path.display(), error=%err, "skipping declarations");
            }
        }
        builder.build()
    }

    pub fn variables(&self) -> &IndexMap<String, VariableDef> {
        &self.variables
    }

    pub fn locals(&self) -> &IndexMap<String, LocalDef> {
        &self.locals
    }

    /// Resolves an expression given as source text
    ///
    /// Besides regular expressions this accepts a bare interpolation such as
    /// `${var.name}`, which is resolved like the quoted template `"${var.name}"`.
    pub fn resolve_reference(&self, reference: &str) -> ResolutionResult {
        let original = reference.trim();

        let parsed = if original.starts_with("${") && !original.starts_with('"') {
            format!("\"{original}\"").parse::<hcl_edit::expr::Expression>()
        } else {
            original.parse::<hcl_edit::expr::Expression>()
        };

        match parsed {
            Ok(expr) => self.resolve(original, &expr.into()),
            Err(err) => {
                tracing::trace!(%original, error=%err, "unparseable reference");
                ResolutionResult::unresolved(
                    original,
                    ResolutionSource::Unknown,
                    "Expression could not be parsed",
                )
            }
        }
    }

    /// Resolves an already parsed expression
    pub fn resolve_expression(&self, expr: &hcl::Expression) -> ResolutionResult {
        let original = crate::extract::raw_text(expr);
        self.resolve(&original, expr)
    }

    fn resolve(&self, original: &str, expr: &hcl::Expression) -> ResolutionResult {
        let source = ResolutionSource::of(expr);
        match Evaluator::new(self).eval(expr) {
            Ok(value) => {
                let resolved = value.is_fully_resolved();
                let uncertainty =
                    (!resolved).then(|| "Some nested values could not be resolved".to_string());
                ResolutionResult {
                    original: original.to_string(),
                    value,
                    resolved,
                    source,
                    uncertainty,
                }
            }
            Err(reason) => ResolutionResult::unresolved(original, source, reason),
        }
    }

    /// Value of `var.<name>`: override, then default
    pub fn variable_value(&self, name: &str) -> Result<Value, String> {
        if let Some(value) = self.overrides.get(name) {
            return Ok(value.clone());
        }
        match self.variables.get(name) {
            None => Err(format!("Variable `{name}` not defined")),
            Some(VariableDef {
                default: Some(default),
                ..
            }) => Ok(default.clone()),
            Some(_) => Err(format!(
                "Variable `{name}` defined but no value provided and no default value"
            )),
        }
    }
}

/// Collects declarations file by file
#[derive(Debug, Default)]
pub struct SymbolTableBuilder {
    variables: IndexMap<String, VariableDef>,
    locals: IndexMap<String, LocalDef>,
    overrides: IndexMap<String, Value>,
    strict: bool,
}

impl SymbolTableBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Values consulted before declared defaults
    pub fn with_overrides(mut self, overrides: IndexMap<String, Value>) -> Self {
        self.overrides = overrides;
        self
    }

    /// In strict mode a `merge()` with any unresolvable operand stays unresolved
    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    /// Adds all `variable` and `locals` blocks of a file
    ///
    /// Later declarations of the same name replace earlier ones.
    pub fn add_source(&mut self, file: &SourceFile) -> Result<(), hcl_edit::parser::Error> {
        let body = hcl_edit::parser::parse_body(&file.contents)?;
        let line = |span: Option<std::ops::Range<usize>>| {
            span.map(|span| crate::locator::token_line(&file.contents, span.start))
                .unwrap_or(0)
        };

        for block in body.blocks() {
            match block.ident.value().as_str() {
                "variable" => {
                    let Some(name) = block.labels.first() else {
                        tracing::debug!(path=%file.path.display(), "variable block without name");
                        continue;
                    };
                    let mut variable = VariableDef {
                        name: name.as_str().to_string(),
                        declared_type: None,
                        description: None,
                        default: None,
                        sensitive: false,
                        nullable: true,
                        file_path: file.path.clone(),
                        line_number: line(block.span()),
                    };

                    for attribute in block.body.attributes() {
                        let expr: hcl::Expression = attribute.value.clone().into();
                        match attribute.key.value().as_str() {
                            "type" => variable.declared_type = Some(crate::extract::raw_text(&expr)),
                            "description" => {
                                variable.description =
                                    Value::from_literal(&expr).and_then(|v| v.as_scalar_string())
                            }
                            "default" => variable.default = Value::from_literal(&expr),
                            "sensitive" => variable.sensitive = matches!(expr, hcl::Expression::Bool(true)),
                            "nullable" => variable.nullable = !matches!(expr, hcl::Expression::Bool(false)),
                            _ => {}
                        }
                    }

                    if self.variables.contains_key(&variable.name) {
                        tracing::debug!(name=%variable.name, path=%file.path.display(), "variable redeclared");
                    }
                    self.variables.insert(variable.name.clone(), variable);
                }
                "locals" => {
                    for attribute in block.body.attributes() {
                        let name = attribute.key.value().as_str().to_string();
                        let expression: hcl::Expression = attribute.value.clone().into();
                        let local = LocalDef {
                            dependencies: dependencies(&expression),
                            name: name.clone(),
                            expression,
                            file_path: file.path.clone(),
                            line_number: line(attribute.span()),
                            cached_value: None,
                            unresolved_reason: None,
                        };
                        self.locals.insert(name, local);
                    }
                }
                _ => {}
            }
        }

        Ok(())
    }

    /// Evaluates every local and freezes the table
    #[tracing::instrument(level = "debug", skip_all, fields(variables = self.variables.len(), locals = self.locals.len()))]
    pub fn build(self) -> SymbolTable {
        let mut table = SymbolTable {
            variables: self.variables,
            locals: self.locals,
            overrides: self.overrides,
            strict: self.strict,
        };

        let evaluated: Vec<(String, Result<Value, String>)> = {
            let mut evaluator = Evaluator::new(&table);
            table
                .locals
                .keys()
                .map(|name| (name.clone(), evaluator.local_value(name)))
                .collect()
        };

        for (name, result) in evaluated {
            if let Some(local) = table.locals.get_mut(&name) {
                match result {
                    Ok(value) => local.cached_value = Some(value),
                    Err(reason) => {
                        tracing::debug!(%name, %reason, "local unresolved");
                        local.unresolved_reason = Some(reason);
                    }
                }
            }
        }

        table
    }
}

fn dependencies(expr: &hcl::Expression) -> Vec<String> {
    let mut found = IndexSet::new();
    expr.visit_traversals(&mut |traversal: &hcl::Traversal| {
        if let Some(reference) = crate::reference::Reference::from_traversal(traversal) {
            found.insert(reference.symbol());
        }
    });
    found.into_iter().collect()
}

/// Every variable and local of a scan with its resolution status
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SymbolDump {
    pub variables: Vec<SymbolEntry>,
    pub locals: Vec<SymbolEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SymbolEntry {
    pub name: String,
    pub file_path: PathBuf,
    pub line_number: usize,
    pub resolved: bool,
    pub value: Option<Value>,
    pub uncertainty: Option<String>,
}

impl From<&SymbolTable> for SymbolDump {
    fn from(table: &SymbolTable) -> Self {
        let variables = table
            .variables
            .values()
            .map(|variable| {
                let result = table.variable_value(&variable.name);
                SymbolEntry {
                    name: variable.name.clone(),
                    file_path: variable.file_path.clone(),
                    line_number: variable.line_number,
                    resolved: result.as_ref().is_ok_and(Value::is_fully_resolved),
                    uncertainty: result.as_ref().err().cloned(),
                    value: result.ok(),
                }
            })
            .collect();

        let locals = table
            .locals
            .values()
            .map(|local| SymbolEntry {
                name: local.name.clone(),
                file_path: local.file_path.clone(),
                line_number: local.line_number,
                resolved: local
                    .cached_value
                    .as_ref()
                    .is_some_and(Value::is_fully_resolved),
                value: local.cached_value.clone(),
                uncertainty: local.unresolved_reason.clone(),
            })
            .collect();

        SymbolDump { variables, locals }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::source_files;
    use pretty_assertions::assert_eq;

    fn table(files: &[SourceFile]) -> SymbolTable {
        SymbolTable::build(files, IndexMap::new())
    }

    fn tree() -> Vec<SourceFile> {
        source_files! {
            "variables.tf" => r#"
variable "env" {
  type        = string
  description = "deployment environment"
  default     = "prod"
}

variable "owner" {
  type = string
}

variable "nothing" {
  default = null
}
"#,
            "locals.tf" => r#"
locals {
  common_tags = {
    Owner = "teamA"
  }
  envs = {
    prod    = { cost_center = "1000" }
    staging = { cost_center = "2000" }
  }
  name_prefix = "app-${var.env}"
  all_tags    = merge(local.common_tags, { Env = var.env })
  loop_a      = local.loop_b
  loop_b      = local.loop_a
}
"#
        }
    }

    #[test]
    fn declarations() {
        let table = table(&tree());

        let env = &table.variables()["env"];
        assert_eq!(env.declared_type.as_deref(), Some("string"));
        assert_eq!(env.description.as_deref(), Some("deployment environment"));
        assert_eq!(env.default, Some(Value::from("prod")));
        assert_eq!(env.line_number, 2);
        assert_eq!(table.variables()["nothing"].default, None);

        let all_tags = &table.locals()["all_tags"];
        assert_eq!(all_tags.dependencies, vec!["local.common_tags", "var.env"]);
        assert_eq!(all_tags.line_number, 11);
    }

    #[test]
    fn variables() {
        let table = table(&tree());

        let env = table.resolve_reference("var.env");
        assert!(env.resolved);
        assert_eq!(env.value, Value::from("prod"));
        assert_eq!(env.source, ResolutionSource::Variable);

        let owner = table.resolve_reference("var.owner");
        assert!(!owner.resolved);
        assert_eq!(
            owner.uncertainty.as_deref(),
            Some("Variable `owner` defined but no value provided and no default value")
        );

        let undefined = table.resolve_reference("var.undefined");
        assert!(!undefined.resolved);
        assert_eq!(undefined.value, Value::Unresolved("var.undefined".to_string()));
    }

    #[test]
    fn overrides_win_over_defaults() {
        let overrides = IndexMap::from([("env".to_string(), Value::from("staging"))]);
        let table = SymbolTable::build(&tree(), overrides);

        assert_eq!(table.resolve_reference("var.env").value, Value::from("staging"));
        assert_eq!(
            table.resolve_reference("local.name_prefix").value,
            Value::from("app-staging")
        );
    }

    #[test]
    fn locals_with_index() {
        let table = table(&tree());

        let cost_center = table.resolve_reference(r#"local.envs["staging"].cost_center"#);
        assert!(cost_center.resolved);
        assert_eq!(cost_center.value, Value::from("2000"));
        assert_eq!(cost_center.source, ResolutionSource::Local);

        let by_var = table.resolve_reference("local.envs[var.env]");
        assert_eq!(by_var.value.to_string(), r#"{ cost_center = "1000" }"#);

        let missing = table.resolve_reference(r#"local.envs["dev"]"#);
        assert!(!missing.resolved);
    }

    #[test]
    fn merge_unions_left_to_right() {
        let table = table(&tree());

        let merged = table.resolve_reference(r#"merge(local.common_tags, { Name = "x" })"#);
        assert!(merged.resolved);
        assert_eq!(merged.source, ResolutionSource::Merge);
        assert_eq!(merged.value.to_string(), r#"{ Owner = "teamA", Name = "x" }"#);

        let overwritten = table.resolve_reference(r#"merge(local.common_tags, { Owner = "teamB" })"#);
        assert_eq!(overwritten.value.to_string(), r#"{ Owner = "teamB" }"#);

        assert_eq!(
            table.locals()["all_tags"].cached_value.as_ref().map(Value::to_string),
            Some(r#"{ Owner = "teamA", Env = "prod" }"#.to_string())
        );
    }

    #[test]
    fn merge_skips_unresolvable_operands() {
        let lenient = table(&tree());
        let partial = lenient.resolve_reference(r#"merge(local.unknown, { Name = "x" })"#);
        assert!(partial.resolved);
        assert_eq!(partial.value.to_string(), r#"{ Name = "x" }"#);

        let mut builder = SymbolTableBuilder::new().strict(true);
        for file in tree() {
            builder.add_source(&file).expect("parses");
        }
        let strict = builder.build();
        let failed = strict.resolve_reference(r#"merge(local.unknown, { Name = "x" })"#);
        assert!(!failed.resolved);
    }

    #[test]
    fn interpolation() {
        let table = table(&tree());

        let single = table.resolve_reference("${var.env}");
        assert!(single.resolved);
        assert_eq!(single.value, Value::from("prod"));
        assert_eq!(single.source, ResolutionSource::Interpolation);

        let composed = table.resolve_reference(r#""${var.env}-${var.env}""#);
        assert!(!composed.resolved);

        let literal = table.resolve_reference(r#""plain""#);
        assert!(literal.resolved);
        assert_eq!(literal.source, ResolutionSource::Literal);
        assert_eq!(literal.value, Value::from("plain"));
    }

    #[test]
    fn cycles_do_not_loop() {
        let table = table(&tree());

        let result = table.resolve_reference("local.loop_a");
        assert!(!result.resolved);
        assert!(result
            .uncertainty
            .as_deref()
            .is_some_and(|reason| reason.contains("cycle")));
    }

    #[test]
    fn anything_else_is_unresolved() {
        let table = table(&tree());

        for reference in ["upper(var.env)", "aws_vpc.main.id", "var.env == \"prod\" ? 1 : 2", "{{"] {
            assert!(!table.resolve_reference(reference).resolved, "{reference}");
        }
    }

    #[test]
    fn last_declaration_wins() {
        let files = source_files! {
            "a.tf" => r#"variable "region" { default = "eu-west-1" }"#,
            "b.tf" => r#"variable "region" { default = "us-east-1" }"#
        };
        let table = table(&files);

        assert_eq!(table.variables().len(), 1);
        assert_eq!(table.variables()["region"].file_path, PathBuf::from("b.tf"));
        assert_eq!(table.resolve_reference("var.region").value, Value::from("us-east-1"));
    }

    #[test]
    fn building_is_idempotent() {
        assert_eq!(table(&tree()), table(&tree()));
    }

    #[test]
    fn dump_covers_every_symbol() {
        let dump = SymbolDump::from(&table(&tree()));

        let variables: Vec<_> = dump
            .variables
            .iter()
            .map(|entry| (entry.name.as_str(), entry.resolved))
            .collect();
        assert_eq!(
            variables,
            vec![("env", true), ("owner", false), ("nothing", false)]
        );
        assert_eq!(dump.locals.len(), 6);
        assert!(!dump.locals.iter().find(|l| l.name == "loop_b").expect("present").resolved);
    }
}
