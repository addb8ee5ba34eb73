//! tagscan cli interface

use clap::{Parser, Subcommand, ValueEnum};
use std::fmt::Formatter;
use std::path::PathBuf;
use tagscan::{catalog::CloudProvider, documents::IacDialect};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Change the work directory
    ///
    /// Can be specified multiple times. Note that all
    /// paths on the way to the final path must exist.
    ///
    /// This is equivalent to running { cd <directory>; tagscan ... }
    #[clap(short = 'C', long = "directory", global(true))]
    pub directory: Vec<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Scan a directory for resources and validate their tags
    Scan(ScanCommand),

    /// Check a tagging standard for structural problems
    CheckStandard(CheckStandardCommand),

    /// List variables and locals with their resolved values
    Symbols(SymbolsCommand),

    /// Resolve a single expression against the variables and locals of a directory
    #[command(alias = "eval")]
    Resolve(ResolveCommand),
}

#[derive(Parser, Debug)]
pub struct ScanCommand {
    #[clap(flatten)]
    pub source: SourceArgs,

    #[clap(flatten)]
    pub vars: VarArgs,

    #[clap(flatten)]
    pub output: OutputArgs,

    /// Tagging standard (YAML) to validate against
    #[clap(short = 's', long = "standard")]
    pub standard: Option<PathBuf>,

    /// Only scan resource types matching this regular expression
    #[clap(long = "filter")]
    pub filter: Option<String>,

    /// Skip resource types matching this regular expression
    #[clap(long = "skip")]
    pub skip: Option<String>,

    /// Fail on unreadable files, parse errors and malformed tags
    ///
    /// Also makes extra tags count against compliance and exits with
    /// status 1 when any resource is not compliant.
    #[clap(long = "strict")]
    pub strict: bool,

    /// Only validate required tags
    #[clap(long = "ignore-optional")]
    pub ignore_optional: bool,

    /// Cloud provider when no standard is given
    #[clap(long = "provider", value_enum)]
    pub provider: Option<CloudProvider>,

    /// Skip `*terratag.tf` files
    #[clap(long = "skip-terratag-files")]
    pub skip_tagged_files: bool,

    /// Stop after this many seconds
    #[clap(long = "timeout")]
    pub timeout: Option<u64>,
}

#[derive(Parser, Debug)]
pub struct CheckStandardCommand {
    /// Tagging standard (YAML)
    pub standard: PathBuf,
}

#[derive(Parser, Debug)]
pub struct SymbolsCommand {
    #[clap(flatten)]
    pub source: SourceArgs,

    #[clap(flatten)]
    pub vars: VarArgs,

    #[clap(flatten)]
    pub output: OutputArgs,
}

#[derive(Parser, Debug)]
pub struct ResolveCommand {
    #[clap(flatten)]
    pub source: SourceArgs,

    #[clap(flatten)]
    pub vars: VarArgs,

    #[clap(flatten)]
    pub output: OutputArgs,

    /// Expression to resolve, e.g. `local.common_tags` or `${var.env}`
    #[clap(short = 'e', long = "expression")]
    pub expression: String,
}

#[derive(Parser, Debug)]
pub struct SourceArgs {
    /// Directory to scan
    #[clap(default_value = ".")]
    pub root: PathBuf,

    #[arg(long = "dialect", value_enum, default_value = "terraform")]
    pub dialect: IacDialect,
}

#[derive(Parser, Debug)]
pub struct VarArgs {
    /// Set a variable (`name=value`)
    #[clap(long = "var")]
    pub vars: Vec<String>,

    /// Load variables from a `.tfvars` or `.tfvars.json` file
    #[clap(long = "var-file")]
    pub var_files: Vec<PathBuf>,

    /// Load variables from a plan in JSON format
    #[clap(long = "plan-json")]
    pub plan_json: Option<PathBuf>,

    /// Do not load `terraform.tfvars` and `*.auto.tfvars` from the scanned directory
    #[clap(long = "no-default-var-files")]
    pub no_default_var_files: bool,
}

#[derive(Parser, Debug)]
pub struct OutputArgs {
    #[arg(short = 'F', long = "output-format", default_value_t)]
    pub format: OutputFormat,
}

#[derive(ValueEnum, Clone, Default, Debug)]
pub enum OutputFormat {
    Json,
    #[default]
    Yaml,
    Text,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Json => f.write_str("json"),
            OutputFormat::Yaml => f.write_str("yaml"),
            OutputFormat::Text => f.write_str("text"),
        }
    }
}
