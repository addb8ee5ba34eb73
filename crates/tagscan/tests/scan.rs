//! End-to-end scans over temporary directory trees

use pretty_assertions::assert_eq;
use tagscan::{
    catalog::DefaultCatalog,
    scan::{load_symbols, scan, Cancellation, ScanError, ScanOptions, ScanOutcome, WarningKind},
    standard::TagStandard,
    validate::ViolationKind,
    value::Value,
};

const MAIN_TF: &str = r#"
variable "environment" {
  default = "prod"
}

variable "owner" {}

locals {
  common_tags = {
    Owner = "team-a@example.com"
  }
}

resource "aws_instance" "web" {
  ami  = "ami-123"
  tags = merge(local.common_tags, { Name = "web", Environment = var.environment })
}

resource "aws_s3_bucket" "logs" {
  tags = {
    Environment = "qa"
  }
}

resource "aws_iam_role_policy_attachment" "attach" {
  role = "x"
}

resource "random_id" "suffix" {
  byte_length = 4
}
"#;

const STANDARD: &str = r#"
version: 1
cloud_provider: aws
required_tags:
  - key: Environment
    allowed_values: [prod, staging, dev]
  - key: Owner
    format: "^[^@]+@[^@]+$"
optional_tags:
  - key: Name
"#;

fn tree(files: &[(&str, &str)]) -> tempfile::TempDir {
    let dir = tempfile::tempdir().expect("tempdir");
    for (name, contents) in files {
        let path = dir.path().join(name);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("create dir");
        }
        std::fs::write(path, contents).expect("write file");
    }
    dir
}

fn standard() -> TagStandard {
    TagStandard::from_yaml_str(STANDARD).expect("valid standard")
}

fn run(options: &ScanOptions, standard: Option<TagStandard>) -> Result<ScanOutcome, ScanError> {
    scan(options, standard, &DefaultCatalog::new(), &Cancellation::new())
}

fn addresses(outcome: &ScanOutcome) -> Vec<String> {
    outcome
        .resources
        .iter()
        .map(|r| format!("{}.{}", r.record.resource_type, r.record.name))
        .collect()
}

#[test]
fn validates_resolved_tags() {
    let dir = tree(&[("main.tf", MAIN_TF)]);
    let options = ScanOptions::new(dir.path().to_path_buf());

    let outcome = run(&options, Some(standard())).expect("scan succeeds");

    assert_eq!(addresses(&outcome), vec!["aws_instance.web", "aws_s3_bucket.logs"]);
    assert!(outcome.warnings.is_empty());
    assert_eq!(outcome.files_scanned, 1);

    let web = &outcome.resources[0];
    assert_eq!(web.record.line_number, 14);
    assert!(web.record.snippet.starts_with("resource \"aws_instance\" \"web\" {"));
    assert_eq!(
        web.resolved_tags.keys().collect::<Vec<_>>(),
        vec!["Owner", "Name", "Environment"]
    );
    assert_eq!(web.resolved_tags["Owner"], Value::from("team-a@example.com"));
    assert_eq!(web.resolved_tags["Environment"], Value::from("prod"));
    let compliance = web.compliance.as_ref().expect("validated");
    assert!(compliance.is_compliant);

    let logs = outcome.resources[1].compliance.as_ref().expect("validated");
    assert!(!logs.is_compliant);
    assert_eq!(logs.missing_tags, vec!["Owner"]);
    assert_eq!(logs.violations[0].kind, ViolationKind::InvalidValue);

    let report = outcome.report(None);
    assert_eq!(report.total_resources, 2);
    assert_eq!(report.compliant_resources, 1);
}

#[test]
fn symbol_dump_without_standard() {
    let dir = tree(&[("main.tf", MAIN_TF)]);
    let options = ScanOptions::new(dir.path().to_path_buf());

    let outcome = run(&options, None).expect("scan succeeds");

    assert_eq!(addresses(&outcome), vec!["aws_instance.web", "aws_s3_bucket.logs"]);
    assert!(outcome.resources.iter().all(|r| r.compliance.is_none()));

    let variables: Vec<(&str, bool)> = outcome
        .symbols
        .variables
        .iter()
        .map(|entry| (entry.name.as_str(), entry.resolved))
        .collect();
    assert_eq!(variables, vec![("environment", true), ("owner", false)]);
    assert_eq!(outcome.symbols.locals[0].name, "common_tags");
    assert!(outcome.symbols.locals[0].resolved);
}

#[test]
fn overrides_win_over_defaults() {
    let dir = tree(&[("main.tf", MAIN_TF)]);
    let mut options = ScanOptions::new(dir.path().to_path_buf());
    options.overrides.insert("environment".to_string(), "staging".into());

    let outcome = run(&options, None).expect("scan succeeds");

    assert_eq!(
        outcome.resources[0].resolved_tags["Environment"],
        Value::from("staging")
    );
}

#[test]
fn resource_type_filters() {
    let dir = tree(&[("main.tf", MAIN_TF)]);
    let mut options = ScanOptions::new(dir.path().to_path_buf());

    options.include = Some("^aws_s3".to_string());
    assert_eq!(
        addresses(&run(&options, None).expect("scan succeeds")),
        vec!["aws_s3_bucket.logs"]
    );

    options.include = None;
    options.exclude = Some("instance".to_string());
    assert_eq!(
        addresses(&run(&options, None).expect("scan succeeds")),
        vec!["aws_s3_bucket.logs"]
    );

    options.exclude = Some("[".to_string());
    assert!(matches!(
        run(&options, None),
        Err(ScanError::InvalidFilter { .. })
    ));
}

#[test]
fn unparseable_files_are_skipped() {
    let dir = tree(&[
        ("broken.tf", "resource \"aws_instance\" \"broken\" {\n"),
        ("main.tf", MAIN_TF),
    ]);
    let mut options = ScanOptions::new(dir.path().to_path_buf());

    let outcome = run(&options, Some(standard())).expect("scan succeeds");
    assert_eq!(addresses(&outcome), vec!["aws_instance.web", "aws_s3_bucket.logs"]);
    assert_eq!(outcome.warnings.len(), 1);
    assert_eq!(outcome.warnings[0].kind, WarningKind::Parse);
    assert!(outcome.warnings[0].file_path.ends_with("broken.tf"));

    options.strict = true;
    assert!(matches!(
        run(&options, Some(standard())),
        Err(ScanError::Parse { .. })
    ));
}

#[test]
fn malformed_tags_skip_the_resource() {
    let dir = tree(&[(
        "main.tf",
        r#"
resource "aws_instance" "web" {
  tags = "not a map"
}

resource "aws_s3_bucket" "logs" {
  tags = { Environment = "prod", Owner = "a@b" }
}
"#,
    )]);
    let mut options = ScanOptions::new(dir.path().to_path_buf());

    let outcome = run(&options, Some(standard())).expect("scan succeeds");
    assert_eq!(addresses(&outcome), vec!["aws_s3_bucket.logs"]);
    assert_eq!(outcome.warnings[0].kind, WarningKind::Extract);
    assert!(outcome.resources[0]
        .compliance
        .as_ref()
        .is_some_and(|c| c.is_compliant));

    options.strict = true;
    assert!(matches!(
        run(&options, Some(standard())),
        Err(ScanError::Extract { .. })
    ));
}

#[test]
fn unresolvable_tag_expression_means_no_tags() {
    let dir = tree(&[(
        "main.tf",
        r#"
resource "aws_instance" "web" {
  tags = var.tags
}
"#,
    )]);
    let options = ScanOptions::new(dir.path().to_path_buf());

    let outcome = run(&options, Some(standard())).expect("scan succeeds");
    let web = &outcome.resources[0];
    assert!(web.resolved_tags.is_empty());
    assert_eq!(
        web.compliance.as_ref().map(|c| c.missing_tags.clone()),
        Some(vec!["Environment".to_string(), "Owner".to_string()])
    );
}

#[test]
fn cancelled_scan_stops_early() {
    let dir = tree(&[("main.tf", MAIN_TF)]);
    let options = ScanOptions::new(dir.path().to_path_buf());
    let cancellation = Cancellation::new();
    cancellation.cancel();

    let outcome = scan(&options, None, &DefaultCatalog::new(), &cancellation).expect("scan succeeds");

    assert!(outcome.cancelled);
    assert!(outcome.resources.is_empty());
    assert_eq!(outcome.files_scanned, 0);
}

#[test]
fn generated_and_cached_files_are_ignored() {
    let dir = tree(&[
        ("main.tf", MAIN_TF),
        ("main.terratag.tf", "resource \"aws_vpc\" \"generated\" {}\n"),
        (".terraform/modules/m/main.tf", "resource \"aws_vpc\" \"cached\" {}\n"),
    ]);
    let mut options = ScanOptions::new(dir.path().to_path_buf());
    options.skip_tagged_files = true;

    let outcome = run(&options, None).expect("scan succeeds");

    assert_eq!(addresses(&outcome), vec!["aws_instance.web", "aws_s3_bucket.logs"]);
}

#[test]
fn missing_root_is_an_error() {
    let options = ScanOptions::new("/definitely/not/here".into());
    assert!(matches!(run(&options, None), Err(ScanError::Discover(_))));
}

#[test]
fn resources_follow_walk_then_declaration_order() {
    let dir = tree(&[
        (
            "a.tf",
            r#"
resource "aws_vpc" "main" {
  tags = { Environment = var.environment }
}

resource "aws_subnet" "private" {}
"#,
        ),
        (
            "sub/b.tf",
            r#"
variable "environment" {
  default = "dev"
}

resource "aws_s3_bucket" "zeta" {}
resource "aws_s3_bucket" "alpha" {}
"#,
        ),
        ("z.tf", "resource \"aws_eip\" \"ip\" {}\n"),
    ]);
    let options = ScanOptions::new(dir.path().to_path_buf());

    let outcome = run(&options, None).expect("scan succeeds");

    assert_eq!(
        addresses(&outcome),
        vec![
            "aws_vpc.main",
            "aws_subnet.private",
            "aws_s3_bucket.zeta",
            "aws_s3_bucket.alpha",
            "aws_eip.ip",
        ]
    );
    assert_eq!(outcome.files_scanned, 3);
    assert_eq!(
        outcome.resources[0].resolved_tags["Environment"],
        Value::from("dev")
    );
}

#[test]
fn symbols_skip_unreadable_files() {
    let dir = tree(&[("main.tf", MAIN_TF)]);
    std::fs::write(dir.path().join("binary.tf"), [0xff, 0xfe, 0x00]).expect("write file");
    let mut options = ScanOptions::new(dir.path().to_path_buf());

    let (symbols, warnings) = load_symbols(&options).expect("symbols load");

    assert_eq!(warnings.len(), 1);
    assert_eq!(warnings[0].kind, WarningKind::Read);
    assert!(warnings[0].file_path.ends_with("binary.tf"));
    assert!(symbols
        .resolve_reference("var.environment")
        .resolved);

    options.strict = true;
    assert!(matches!(load_symbols(&options), Err(ScanError::Load(_))));
}

#[test]
fn symbols_report_unparseable_files() {
    let dir = tree(&[
        ("broken.tf", "locals {\n"),
        ("main.tf", MAIN_TF),
    ]);
    let options = ScanOptions::new(dir.path().to_path_buf());

    let (symbols, warnings) = load_symbols(&options).expect("symbols load");

    assert_eq!(warnings.len(), 1);
    assert_eq!(warnings[0].kind, WarningKind::Parse);
    assert!(symbols.locals().contains_key("common_tags"));
}
