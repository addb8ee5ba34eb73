//! # tagscan - tag compliance for terraform sources
//!
//! ## Introduction for developers
//!
//! Read this to understand how `tagscan` works internally.
//!
//! ### HCL Terms
//!
//! In hcl terms...
//! - a file gets parsed as a `body`
//! - ...which is just a list of `structures`
//! - ...where there are two kinds:
//!   - `attribute`: a "key = value" pair
//!   - or `block`: 1 `identifier`, 0 or more `labels` and a `body` enclosed in `{` and `}`
//!
//! The blocks we care about:
//! ```hcl
//! variable "environment" {
//!   default = "prod"
//! }
//!
//! locals {
//!   common_tags = { Owner = "team-a" }
//! }
//!
//! resource "aws_instance" "web" {
//!   tags = merge(local.common_tags, { Environment = var.environment })
//! }
//! ```
//!
//! ### Loading files
//!
//! [documents::discover_files] lists the files of a tree for an [documents::IacDialect] and
//! [documents::SourceFile] holds the text of one of them. At this point files only have to be
//! readable.
//!
//! ### Locating resources
//!
//! see [locator::locate_file]
//!
//! Each file is parsed twice. [hcl::parse] gives us blocks and expressions to work with,
//! [hcl_edit::parser::parse_body] gives us byte spans. Spans become a declaration line and
//! a snippet (the block's source text, cut at 10 KiB).
//!
//! ### Extracting tags
//!
//! see [extract::extract_tags]
//!
//! Which attribute holds the tags depends on the resource type ([catalog::TaggingCatalog]).
//! Its expression is split into key/value expressions where the shape allows it. When it
//! does not, the whole expression is resolved instead.
//!
//! ### Resolving
//!
//! see [symbols::SymbolTable]
//!
//! All `variable` and `locals` blocks of the tree are collected into one table. Variables
//! take their value from an override ([symbols::overrides]) or their default. Locals are
//! evaluated when the table is built, references to other locals are followed and cycles
//! reported.
//!
//! Evaluation only covers what tags are usually written with: literals, references with
//! attribute/index access, single interpolations and `merge()`. What cannot be evaluated
//! stays around as [value::Value::Unresolved] with the expression text.
//!
//! ### Validation
//!
//! see [validate::ComplianceValidator]
//!
//! A [standard::TagStandard] (YAML) lists required and optional tags with constraints and
//! resource type specific rules. Every resolved tag set is checked against it, the results
//! are summed up in [report::ValidationReport].
//!
//! ### Scan
//!
//! [scan::scan] runs all of the above for a directory and also returns a dump of every
//! variable and local with its resolution status. Snippets are annotated with the values
//! their references resolve to ([annotate]).
pub mod annotate;
pub mod catalog;
pub mod documents;
pub mod extract;
pub mod locator;
pub mod reference;
pub mod report;
pub mod scan;
pub mod standard;
pub mod symbols;
pub mod validate;
pub mod value;
mod visit;
