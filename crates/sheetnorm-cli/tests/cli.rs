use std::fs;
use std::path::PathBuf;

use clap::Parser;
use serde_json::json;
use sheetnorm_cli::cli::{Cli, Command, LogFormatArg, RunArgs};
use sheetnorm_cli::commands::{check_manifest, engine, run_job, telemetry_config};
use sheetnorm_cli::summary::{fields_table, plugins_table, tables_table};
use sheetnorm_model::{JobStatus, Severity};

fn manifest_doc() -> serde_json::Value {
    json!({
        "config_script_api_version": "1",
        "info": {"schema": "sheetnorm.manifest/v1", "title": "Contacts"},
        "engine": {"defaults": {}, "writer": {}},
        "hooks": {},
        "columns": {
            "order": ["name", "email"],
            "meta": {
                "name": {"label": "Name", "script": "builtin/text.py", "synonyms": ["full name"]},
                "email": {"label": "Email", "script": "builtin/email.py", "required": true}
            }
        }
    })
}

struct Workspace {
    _dir: tempfile::TempDir,
    jobs_root: PathBuf,
    manifest_path: PathBuf,
}

impl Workspace {
    fn new() -> Self {
        let dir = tempfile::tempdir().expect("temp dir");
        let jobs_root = dir.path().join("jobs");
        let manifest_path = dir.path().join("manifest.json");
        fs::write(&manifest_path, manifest_doc().to_string()).expect("write manifest");
        Self {
            _dir: dir,
            jobs_root,
            manifest_path,
        }
    }

    fn add_input(&self, job_id: &str, name: &str, contents: &str) {
        let input = self.jobs_root.join(job_id).join("input");
        fs::create_dir_all(&input).expect("input dir");
        fs::write(input.join(name), contents).expect("write input");
    }

    fn run_args(&self, extra: &[&str]) -> RunArgs {
        let mut argv = vec![
            "sheetnorm".to_string(),
            "run".to_string(),
            "--jobs-root".to_string(),
            self.jobs_root.display().to_string(),
            "--manifest".to_string(),
            self.manifest_path.display().to_string(),
        ];
        argv.extend(extra.iter().map(|arg| (*arg).to_string()));
        match Cli::try_parse_from(argv).expect("parse").command {
            Command::Run(args) => args,
            _ => panic!("expected run"),
        }
    }
}

#[test]
fn run_flags_parse() {
    let cli = Cli::try_parse_from([
        "sheetnorm",
        "--log-format",
        "json",
        "run",
        "--jobs-root",
        "jobs",
        "--manifest",
        "manifest.json",
        "--job-id",
        "job-1",
        "--input-sheet",
        "Members",
        "--input-sheet",
        "Staff",
        "--event-sink",
        "builtin:stderr",
        "--safe-mode",
        "--note-level",
        "warning",
        "--event-level",
        "error",
    ])
    .expect("parse");
    assert!(matches!(cli.log_format, LogFormatArg::Json));
    let Command::Run(args) = cli.command else {
        panic!("expected run");
    };
    assert_eq!(args.job_id.as_deref(), Some("job-1"));
    assert_eq!(args.input_sheets, vec!["Members", "Staff"]);
    assert_eq!(args.event_sinks, vec!["builtin:stderr"]);
    assert!(args.safe_mode);
    assert_eq!(args.note_level, Some(Severity::Warning));
    assert_eq!(args.event_level, Some(Severity::Error));
}

#[test]
fn unknown_severity_is_rejected() {
    let parsed = Cli::try_parse_from([
        "sheetnorm",
        "run",
        "--jobs-root",
        "jobs",
        "--manifest",
        "manifest.json",
        "--note-level",
        "loud",
    ]);
    assert!(parsed.is_err());
}

#[test]
fn global_flags_follow_the_subcommand() {
    let cli = Cli::try_parse_from(["sheetnorm", "plugins", "-v", "--log-level", "debug"])
        .expect("parse");
    assert!(matches!(cli.command, Command::Plugins));
    assert!(cli.log_level.is_some());
}

#[test]
fn command_line_overrides_telemetry_defaults() {
    let workspace = Workspace::new();
    let args = workspace.run_args(&["--correlation-id", "corr-7", "--note-level", "error"]);
    let config = telemetry_config(&args).expect("config");
    assert_eq!(config.correlation_id.as_deref(), Some("corr-7"));
    assert_eq!(config.min_note_level, Severity::Error);
}

#[test]
fn run_writes_outputs_and_reports_tables() {
    let workspace = Workspace::new();
    workspace.add_input(
        "job-1",
        "contacts.csv",
        "Name,Email\nAda,ada@example.com\nGrace,grace(at)example.com\n",
    );
    let args = workspace.run_args(&["--job-id", "job-1"]);

    let outcome = run_job(&args).expect("run");
    assert_eq!(outcome.result.status, JobStatus::Succeeded);
    assert_eq!(outcome.exit_code(), 0);
    assert_eq!(outcome.result.processed_files, vec!["contacts.csv"]);
    assert!(outcome.result.output_paths.iter().all(|path| path.exists()));

    let artifact = outcome.artifact.expect("artifact");
    assert_eq!(artifact.tables.len(), 1);
    let rendered = tables_table(&artifact.tables).to_string();
    assert!(rendered.contains("contacts"));
    assert!(rendered.contains("TOTAL"));
}

#[test]
fn run_without_job_id_uses_a_fresh_uuid() {
    let workspace = Workspace::new();
    let args = workspace.run_args(&[]);
    let outcome = run_job(&args).expect("run");
    assert_eq!(outcome.result.job_id.len(), 36);
    assert!(workspace.jobs_root.join(&outcome.result.job_id).is_dir());
}

#[test]
fn invalid_job_id_is_an_error() {
    let workspace = Workspace::new();
    let args = workspace.run_args(&["--job-id", "../escape"]);
    let err = run_job(&args).expect_err("job id must be rejected");
    assert!(format!("{err:#}").contains("escape"));
}

#[test]
fn check_lists_manifest_fields() {
    let workspace = Workspace::new();
    let cli = Cli::try_parse_from([
        "sheetnorm".to_string(),
        "check".to_string(),
        "--manifest".to_string(),
        workspace.manifest_path.display().to_string(),
    ])
    .expect("parse");
    let Command::Check(args) = cli.command else {
        panic!("expected check");
    };

    let activation = check_manifest(&args).expect("check");
    assert_eq!(activation.columns.len(), 2);
    let rendered = fields_table(&activation).to_string();
    assert!(rendered.contains("email"));
    assert!(rendered.contains("builtin/text.py"));
    assert!(rendered.contains("full name"));
}

#[test]
fn check_reports_missing_manifest() {
    let dir = tempfile::tempdir().expect("temp dir");
    let cli = Cli::try_parse_from([
        "sheetnorm".to_string(),
        "check".to_string(),
        "--manifest".to_string(),
        dir.path().join("missing.json").display().to_string(),
    ])
    .expect("parse");
    let Command::Check(args) = cli.command else {
        panic!("expected check");
    };
    assert!(check_manifest(&args).is_err());
}

#[test]
fn plugins_lists_builtin_exports() {
    let engine = engine().expect("engine");
    let rendered = plugins_table(engine.package()).to_string();
    let email_rows: Vec<&str> = rendered
        .lines()
        .filter(|line| line.contains("builtin/email"))
        .collect();
    assert!(!email_rows.is_empty(), "{rendered}");
    assert!(email_rows.iter().all(|line| !line.contains("builtin/email.py")));
    assert!(email_rows.iter().any(|line| line.contains("detect_header") && line.contains("detector")));
    assert!(rendered.contains("**kwargs"));
}
