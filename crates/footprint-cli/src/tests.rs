use super::*;
use crate::render::render_status_line;
use chrono::{TimeZone, Utc};
use clap::error::ErrorKind;
use footprint_core::{
    BundleInfo, Classifications, IntegrityReport, VerificationResult, VerificationSummary,
};
use footprint_installer::InstallationStatus;

fn sample_uninstall_report() -> UninstallReport {
    let mut report = UninstallReport::new(InstallScope::User, "smart", 3);
    report.verification = VerificationSummary {
        intact: 2,
        modified: 1,
        deleted: 0,
        corrupted: 0,
    };
    report.removed = vec![PathBuf::from("/opt/app/a"), PathBuf::from("/opt/app/b")];
    report.preserved = vec![PathBuf::from("/opt/app/c")];
    report.backed_up = vec![PathBuf::from("/opt/app/c")];
    report.backup_path = Some(PathBuf::from("/state/backups/backup-20260101T000000.000Z"));
    report
}

#[test]
fn cli_parses_uninstall_flags() {
    let cli = Cli::try_parse_from([
        "footprint",
        "--state-root",
        "/tmp/state",
        "uninstall",
        "--scope",
        "workspace",
        "--target",
        "/opt/app",
        "--select",
        "bin/tool",
        "--select",
        "lib/a.so",
        "--user-file",
        "notes.md",
        "--backup",
    ])
    .expect("command must parse");

    assert_eq!(cli.state_root, Some(PathBuf::from("/tmp/state")));
    match cli.command {
        Commands::Uninstall {
            scope,
            target,
            policy,
            select,
            user_files,
            backup,
            json,
            ..
        } => {
            assert_eq!(scope, InstallScope::Workspace);
            assert_eq!(target, PathBuf::from("/opt/app"));
            assert!(policy.is_none());
            assert_eq!(select.len(), 2);
            assert_eq!(user_files, vec![PathBuf::from("notes.md")]);
            assert!(backup);
            assert!(!json);
        }
        other => panic!("unexpected command: {other:?}"),
    }
}

#[test]
fn cli_rejects_unknown_scope() {
    let err = Cli::try_parse_from(["footprint", "verify", "--scope", "global"])
        .expect_err("unknown scope must fail");
    assert_eq!(err.kind(), ErrorKind::ValueValidation);
}

#[test]
fn cli_requires_target_for_uninstall() {
    let err = Cli::try_parse_from(["footprint", "uninstall", "--scope", "user"])
        .expect_err("target is required");
    assert_eq!(err.kind(), ErrorKind::MissingRequiredArgument);
}

#[test]
fn resolve_policy_prefers_flag_then_selection_then_config() {
    let config = FootprintConfig {
        default_policy: "complete".to_string(),
        ..FootprintConfig::default()
    };

    assert_eq!(
        resolve_policy(Some("safe"), &[], &config).expect("explicit policy"),
        UninstallPolicy::Smart
    );
    assert_eq!(
        resolve_policy(None, &[], &config).expect("configured policy"),
        UninstallPolicy::Complete
    );
    assert!(matches!(
        resolve_policy(None, &[PathBuf::from("a.txt")], &config).expect("implied custom"),
        UninstallPolicy::Custom(_)
    ));

    let err = resolve_policy(Some("smart"), &[PathBuf::from("a.txt")], &config)
        .expect_err("selection with smart must fail");
    assert!(err.to_string().contains("--select"));

    let err = resolve_policy(Some("custom"), &[], &config).expect_err("empty custom must fail");
    assert!(err.to_string().contains("at least one selected path"));
}

#[test]
fn config_defaults_when_missing_or_empty() {
    let dir = tempfile::tempdir().expect("tempdir");
    let layout = StateLayout::new(dir.path());

    let config = FootprintConfig::load(&layout).expect("missing config must load");
    assert_eq!(config, FootprintConfig::default());
    assert_eq!(config.concurrency, 5);
    assert_eq!(config.default_policy, "smart");
    assert_eq!(config.backup_root(&layout), layout.backups_dir());

    assert_eq!(
        FootprintConfig::parse("").expect("empty config must parse"),
        FootprintConfig::default()
    );
}

#[test]
fn config_reads_overrides_from_state_root() {
    let dir = tempfile::tempdir().expect("tempdir");
    let layout = StateLayout::new(dir.path());
    fs::write(
        layout.config_path(),
        "version = 1\nconcurrency = 2\ndefault_policy = \"complete\"\nbackup_root = \"/srv/backups\"\ncreate_backup = true\n",
    )
    .expect("must write config");

    let config = FootprintConfig::load(&layout).expect("config must load");
    assert_eq!(config.concurrency, 2);
    assert_eq!(config.default_policy, "complete");
    assert!(config.create_backup);
    assert_eq!(config.backup_root(&layout), PathBuf::from("/srv/backups"));
}

#[test]
fn config_rejects_invalid_values() {
    for (raw, expected) in [
        ("version = 2\n", "unsupported config version 2"),
        ("concurrency = 0\n", "concurrency must be at least 1"),
        ("default_policy = \"yolo\"\n", "invalid uninstall policy"),
        ("colour = true\n", "failed to parse footprint.toml"),
    ] {
        let err = FootprintConfig::parse(raw).expect_err("invalid config must fail");
        assert!(
            format!("{err:#}").contains(expected),
            "unexpected error for {raw:?}: {err:#}"
        );
    }
}

#[test]
fn render_status_line_plain_is_unadorned() {
    assert_eq!(
        render_status_line(OutputStyle::Plain, "ok", "recorded 3 files"),
        "recorded 3 files"
    );
}

#[test]
fn render_status_line_rich_includes_ascii_badge() {
    assert_eq!(
        render_status_line(OutputStyle::Rich, "warn", "preserved /opt/app/c"),
        "[WARN] preserved /opt/app/c"
    );
}

#[test]
fn format_uninstall_lines_lists_preserved_backup_and_summary() {
    let mut report = sample_uninstall_report();
    let lines = format_uninstall_lines(&report, OutputStyle::Plain);
    assert_eq!(
        lines,
        vec![
            "preserved /opt/app/c".to_string(),
            "backed up 1 files to /state/backups/backup-20260101T000000.000Z".to_string(),
            "smart uninstall of scope user: removed 2, preserved 1, failed 0".to_string(),
        ]
    );

    report.record_failure(PathBuf::from("/opt/app/d"), "failed to remove: busy");
    let lines = format_uninstall_lines(&report, OutputStyle::Rich);
    assert!(lines.contains(&"[ERROR] /opt/app/d: failed to remove: busy".to_string()));
    assert_eq!(
        lines.last().map(String::as_str),
        Some("[WARN] smart uninstall of scope user: removed 2, preserved 1, failed 1")
    );
}

#[test]
fn format_integrity_lines_skips_intact_entries() {
    let classifications: Classifications = [
        (PathBuf::from("/opt/app/a"), VerificationResult::Intact),
        (PathBuf::from("/opt/app/b"), VerificationResult::Deleted),
        (
            PathBuf::from("/opt/app/c"),
            VerificationResult::Modified {
                current_hash: "0".repeat(64),
            },
        ),
    ]
    .into_iter()
    .collect();
    let report = IntegrityReport::from_classifications(
        InstallScope::Project,
        &classifications,
        Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap(),
    );

    let lines = format_integrity_lines(&report, OutputStyle::Plain);
    assert_eq!(
        lines,
        vec![
            "deleted /opt/app/b".to_string(),
            "modified /opt/app/c".to_string(),
            "integrity check: 3 files tracked, 1 intact, 1 modified, 1 deleted, 0 corrupted"
                .to_string(),
        ]
    );
}

#[test]
fn format_integrity_lines_hides_modified_entries_when_not_reported() {
    let classifications: Classifications = [
        (
            PathBuf::from("/opt/app/a"),
            VerificationResult::Modified {
                current_hash: "0".repeat(64),
            },
        ),
        (
            PathBuf::from("/opt/app/b"),
            VerificationResult::Corrupted {
                reason: "unreadable".to_string(),
            },
        ),
    ]
    .into_iter()
    .collect();
    let report = IntegrityReport::from_classifications(
        InstallScope::User,
        &classifications,
        Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap(),
    )
    .with_report_modifications(false);

    let lines = format_integrity_lines(&report, OutputStyle::Plain);
    assert_eq!(
        lines,
        vec![
            "corrupted /opt/app/b".to_string(),
            "integrity check: 2 files tracked, 0 intact, 1 modified, 0 deleted, 1 corrupted"
                .to_string(),
        ]
    );
}

#[test]
fn format_status_lines_describes_each_scope() {
    assert_eq!(
        format_status_lines(&[], OutputStyle::Plain),
        vec!["no installations recorded".to_string()]
    );

    let status = InstallationStatus {
        scope: InstallScope::User,
        installed_at: Utc.with_ymd_and_hms(2026, 3, 4, 5, 6, 7).unwrap(),
        target_root: PathBuf::from("/home/dev/.olaf"),
        bundle: BundleInfo {
            filename: "olaf-v1.2.3.zip".to_string(),
            size: 10,
            sha256: "ab".repeat(32),
            version: BundleInfo::version_from_filename("olaf-v1.2.3.zip"),
        },
        tracked_files: 12,
    };
    assert_eq!(
        format_status_lines(&[status], OutputStyle::Plain),
        vec![
            "user olaf-v1.2.3.zip 1.2.3 files=12 root=/home/dev/.olaf installed=2026-03-04T05:06:07Z"
                .to_string()
        ]
    );
}

#[test]
fn parse_file_list_skips_blank_lines_and_comments() {
    assert_eq!(
        parse_file_list("# written by setup\nbin/tool\n\n  lib/a.so  \n"),
        vec![PathBuf::from("bin/tool"), PathBuf::from("lib/a.so")]
    );
}

#[test]
fn completions_script_mentions_binary_name() {
    let mut output = Vec::new();
    write_completions_script(Shell::Bash, &mut output).expect("must generate completions");
    let script = String::from_utf8(output).expect("utf8 script");
    assert!(script.contains("footprint"));
    assert!(script.contains("uninstall"));
}

#[test]
fn record_verify_and_uninstall_round_trip_through_cli() {
    let dir = tempfile::tempdir().expect("tempdir");
    let state = dir.path().join("state");
    let root = dir.path().join("install");
    fs::create_dir_all(root.join("bin")).expect("must create bin");
    fs::write(root.join("bin").join("tool"), b"binary").expect("must write tool");
    fs::write(root.join("readme.md"), b"readme").expect("must write readme");
    let bundle = dir.path().join("olaf-v1.2.3.zip");
    fs::write(&bundle, b"zip bytes").expect("must write bundle");
    let list = dir.path().join("files.txt");
    fs::write(&list, "bin/tool\nreadme.md\n").expect("must write list");

    let state_arg = state.to_str().expect("utf8 path");
    let root_arg = root.to_str().expect("utf8 path");
    let run = |args: &[&str]| {
        let mut argv = vec!["footprint", "--state-root", state_arg];
        argv.extend_from_slice(args);
        run_cli(Cli::try_parse_from(argv).expect("command must parse"))
    };

    run(&[
        "record",
        "--scope",
        "user",
        "--target",
        root_arg,
        "--bundle",
        bundle.to_str().expect("utf8 path"),
        "--files-from",
        list.to_str().expect("utf8 path"),
    ])
    .expect("record must succeed");
    assert!(state.join("baselines").join("user.json").is_file());

    run(&["verify", "--scope", "user"]).expect("verify must succeed");
    run(&["status"]).expect("status must succeed");

    run(&[
        "uninstall",
        "--scope",
        "user",
        "--target",
        root_arg,
        "--policy",
        "complete",
        "--json",
    ])
    .expect("uninstall must succeed");
    assert!(!root.join("bin").exists());
    assert!(!root.join("readme.md").exists());
    assert!(root.exists());
    assert!(!state.join("baselines").join("user.json").exists());

    let err = run(&["verify", "--scope", "user"]).expect_err("baseline is gone");
    assert!(err.to_string().starts_with("missing-baseline:"));
}

#[test]
fn uninstall_json_includes_outcome_and_errors() {
    let mut report = sample_uninstall_report();
    report.record_failure(PathBuf::from("/opt/app/d"), "permission denied");

    let raw = uninstall_report_json(&report).expect("must serialize");
    let value: serde_json::Value = serde_json::from_str(&raw).expect("must parse");
    assert_eq!(value["success"], serde_json::Value::Bool(false));
    assert_eq!(value["outcome"], "partial_failure");
    assert_eq!(
        value["errors"],
        serde_json::json!(["/opt/app/d: permission denied"])
    );
    assert!(value.get("removed").is_some());
    assert!(value.get("failed").is_some());
}

#[test]
fn every_subcommand_has_help_text() {
    let command = Cli::command();
    for subcommand in command.get_subcommands() {
        assert!(
            subcommand.get_about().is_some(),
            "{} has no help text",
            subcommand.get_name()
        );
    }
}
