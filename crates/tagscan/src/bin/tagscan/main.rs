mod cli;

use serde::Serialize;
use std::path::Path;
use tagscan::{
    catalog::DefaultCatalog,
    scan::{Cancellation, ScanOptions},
    standard::TagStandard,
    symbols::{overrides::Overrides, SymbolDump},
};

fn main() {
    use clap::Parser;
    let cli = cli::Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_env("TAGSCAN_LOG"))
        .with_writer(std::io::stderr)
        .init();

    for new_path in cli.directory.iter() {
        match new_path.canonicalize() {
            Err(e) => {
                eprintln!(
                    "Failed to resolve path for -C/--directory {}\n{}",
                    new_path.display(),
                    e
                );
                std::process::exit(1);
            }
            Ok(cwd) => {
                if let Err(err) = std::env::set_current_dir(&cwd) {
                    eprintln!("Failed to set work directory to {}\n{}", cwd.display(), err,);
                    std::process::exit(1);
                }

                tracing::info!(directory=%cwd.display(), "Changed working directory");
            }
        }
    }

    let command_result = match cli.command {
        cli::Command::Scan(scan_cli) => scan(scan_cli),
        cli::Command::CheckStandard(check_cli) => check_standard(check_cli),
        cli::Command::Symbols(symbols_cli) => symbols(symbols_cli),
        cli::Command::Resolve(resolve_cli) => resolve(resolve_cli),
    };

    match command_result {
        Ok(true) => {}
        Ok(false) => std::process::exit(1),
        Err(e) => {
            for error in e.chain() {
                eprintln!("{error}")
            }
            std::process::exit(1);
        }
    }
}

/// Returns `false` if the scan was strict and found non-compliant resources
pub fn scan(cli: cli::ScanCommand) -> anyhow::Result<bool> {
    let standard = cli
        .standard
        .as_deref()
        .map(TagStandard::load)
        .transpose()?;
    let validated = standard.is_some();

    let mut options = ScanOptions::new(cli.source.root.clone());
    options.dialect = cli.source.dialect;
    options.include = cli.filter;
    options.exclude = cli.skip;
    options.strict = cli.strict;
    options.ignore_optional = cli.ignore_optional;
    options.cloud_provider = cli.provider;
    options.skip_tagged_files = cli.skip_tagged_files;
    options.overrides = overrides(&cli.vars, &cli.source.root)?.into_values();

    let cancellation = match cli.timeout {
        Some(seconds) => Cancellation::with_timeout(std::time::Duration::from_secs(seconds)),
        None => Cancellation::new(),
    };

    let outcome = tagscan::scan::scan(&options, standard, &DefaultCatalog::new(), &cancellation)?;
    anyhow::ensure!(!outcome.cancelled, "Scan did not finish in time");

    let report = outcome.report(cli.standard.clone());
    let compliant = !validated || report.is_fully_compliant();

    match cli.output.format {
        cli::OutputFormat::Text => {
            for resource in &outcome.resources {
                println!(
                    "# {}.{} ({}:{})",
                    resource.record.resource_type,
                    resource.record.name,
                    resource.record.file_path.display(),
                    resource.record.line_number
                );
                println!("{}\n", resource.annotated_snippet);
            }
            if validated {
                print!("{report}");
            }
        }
        format if validated => {
            #[derive(Serialize)]
            struct ScanOutput<'o> {
                #[serde(flatten)]
                outcome: &'o tagscan::scan::ScanOutcome,
                report: &'o tagscan::report::ValidationReport,
            }
            output(
                &format,
                &ScanOutput {
                    outcome: &outcome,
                    report: &report,
                },
            )?
        }
        format => output(&format, &outcome)?,
    }

    Ok(compliant || !cli.strict)
}

pub fn check_standard(cli: cli::CheckStandardCommand) -> anyhow::Result<bool> {
    let standard = TagStandard::load(&cli.standard)?;
    println!(
        "{}: valid ({} required, {} optional tags, {} resource rules)",
        cli.standard.display(),
        standard.required_tags.len(),
        standard.optional_tags.len(),
        standard.resource_rules.len()
    );
    Ok(true)
}

pub fn symbols(cli: cli::SymbolsCommand) -> anyhow::Result<bool> {
    let table = symbol_table(&cli.source, &cli.vars)?;
    let dump = SymbolDump::from(&table);

    match cli.output.format {
        cli::OutputFormat::Text => {
            for (kind, entries) in [("var", &dump.variables), ("local", &dump.locals)] {
                for entry in entries {
                    let value = match (&entry.value, &entry.uncertainty) {
                        (Some(value), _) => value.to_string(),
                        (None, Some(reason)) => format!("<{reason}>"),
                        (None, None) => "<unresolved>".to_string(),
                    };
                    println!("{kind}.{} = {value}", entry.name);
                }
            }
        }
        format => output(&format, &dump)?,
    }
    Ok(true)
}

pub fn resolve(cli: cli::ResolveCommand) -> anyhow::Result<bool> {
    let table = symbol_table(&cli.source, &cli.vars)?;
    let result = table.resolve_reference(&cli.expression);

    match cli.output.format {
        cli::OutputFormat::Text => match &result.uncertainty {
            None => println!("{}", result.value),
            Some(reason) => println!("{} ({reason})", result.value),
        },
        format => output(&format, &result)?,
    }
    Ok(result.resolved)
}

fn overrides(vars: &cli::VarArgs, root: &Path) -> anyhow::Result<Overrides> {
    let mut overrides = Overrides::new();
    overrides.extend_from_env(std::env::vars());
    if !vars.no_default_var_files {
        overrides.load_default_files(root)?;
    }
    for var_file in &vars.var_files {
        overrides.load_var_file(var_file)?;
    }
    if let Some(plan) = &vars.plan_json {
        overrides.load_plan(plan)?;
    }
    for assignment in &vars.vars {
        overrides.assign(assignment)?;
    }
    Ok(overrides)
}

fn symbol_table(
    source: &cli::SourceArgs,
    vars: &cli::VarArgs,
) -> anyhow::Result<tagscan::symbols::SymbolTable> {
    let mut options = ScanOptions::new(source.root.clone());
    options.dialect = source.dialect;
    options.overrides = overrides(vars, &source.root)?.into_values();

    let (table, warnings) = tagscan::scan::load_symbols(&options)?;
    for warning in &warnings {
        eprintln!("Skipped {}: {}", warning.file_path.display(), warning.message);
    }
    Ok(table)
}

fn output(format: &cli::OutputFormat, value: &impl Serialize) -> anyhow::Result<()> {
    match format {
        cli::OutputFormat::Yaml => serde_yaml::to_writer(std::io::stdout(), value)?,
        cli::OutputFormat::Json => serde_json::to_writer_pretty(std::io::stdout(), value)?,
        cli::OutputFormat::Text => anyhow::bail!("Text output is not available here"),
    };

    Ok(())
}
