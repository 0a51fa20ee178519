use clap::Parser;

use super::*;

#[test]
fn defaults_select_local_storage() {
    let settings = Settings::from_raw(RawSettings::default()).expect("valid settings");

    assert_eq!(settings.server.addr.port(), DEFAULT_PORT);
    assert_eq!(settings.storage.local_root, PathBuf::from("out"));
    assert!(settings.storage.gcs.is_none());
    assert_eq!(settings.archive.index_key, "index.html");
    assert_eq!(settings.archive.title, "Research Archive");
    assert_eq!(settings.topics.model, "gemini-1.5-flash");
    assert!(settings.topics.api_key.is_none());
    assert_eq!(settings.retention.root, PathBuf::from("out"));
}

#[test]
fn cli_overrides_take_highest_precedence() {
    let mut raw = RawSettings::default();
    raw.server.port = Some(4000);
    raw.logging.level = Some("info".to_string());
    raw.storage.local_root = Some(PathBuf::from("from-file"));

    raw.apply_serve_overrides(&ServeOverrides {
        server_port: Some(4321),
        ..Default::default()
    });
    raw.apply_global_overrides(&GlobalOverrides {
        log_level: Some("debug".to_string()),
        storage_local_root: Some(PathBuf::from("from-cli")),
        ..Default::default()
    });
    let settings = Settings::from_raw(raw).expect("valid settings");

    assert_eq!(settings.server.addr.port(), 4321);
    assert_eq!(settings.logging.level, LevelFilter::DEBUG);
    assert_eq!(settings.storage.local_root, PathBuf::from("from-cli"));
}

#[test]
fn cli_json_logging_enforces_format() {
    let mut raw = RawSettings::default();
    raw.apply_global_overrides(&GlobalOverrides {
        log_json: Some(true),
        ..Default::default()
    });
    let settings = Settings::from_raw(raw).expect("valid settings");

    assert!(matches!(settings.logging.format, LogFormat::Json));
}

#[test]
fn bucket_selects_cloud_storage_with_default_endpoints() {
    let mut raw = RawSettings::default();
    raw.storage.gcs_bucket = Some("reports-bucket".to_string());

    let settings = Settings::from_raw(raw).expect("valid settings");
    let gcs = settings.storage.gcs.expect("gcs settings");
    assert_eq!(gcs.bucket, "reports-bucket");
    assert_eq!(gcs.endpoint.as_str(), "https://storage.googleapis.com/");
    assert!(gcs.token.is_none());
}

#[test]
fn blank_bucket_and_key_are_ignored() {
    let mut raw = RawSettings::default();
    raw.storage.gcs_bucket = Some("   ".to_string());
    raw.topics.api_key = Some(String::new());

    let settings = Settings::from_raw(raw).expect("valid settings");
    assert!(settings.storage.gcs.is_none());
    assert!(settings.topics.api_key.is_none());
}

#[test]
fn zero_port_is_rejected() {
    let mut raw = RawSettings::default();
    raw.server.port = Some(0);

    let err = Settings::from_raw(raw).expect_err("zero port");
    assert!(matches!(err, LoadError::Invalid { key: "server.port", .. }));
}

#[test]
fn escaping_index_key_is_rejected() {
    let mut raw = RawSettings::default();
    raw.archive.index_key = Some("../index.html".to_string());

    let err = Settings::from_raw(raw).expect_err("escaping key");
    assert!(matches!(
        err,
        LoadError::Invalid {
            key: "archive.index_key",
            ..
        }
    ));
}

#[test]
fn invalid_log_level_is_rejected() {
    let mut raw = RawSettings::default();
    raw.logging.level = Some("loud".to_string());

    let err = Settings::from_raw(raw).expect_err("bad level");
    assert!(matches!(err, LoadError::Invalid { key: "logging.level", .. }));
}

#[test]
fn zero_retention_limits_mean_unset() {
    let mut raw = RawSettings::default();
    raw.apply_prune_overrides(&PruneArgs {
        root: Some(PathBuf::from("site")),
        max_keep: Some(0),
        days_keep: Some(14),
        dry_run: false,
    });

    let settings = Settings::from_raw(raw).expect("valid settings");
    assert_eq!(settings.retention.root, PathBuf::from("site"));
    assert_eq!(settings.retention.max_keep, None);
    assert_eq!(settings.retention.days_keep, Some(14));
}

#[test]
fn default_to_serve_command() {
    let args = CliArgs::parse_from(["gazette"]);
    let command = args
        .command
        .unwrap_or(Command::Serve(ServeArgs::default()));
    assert!(matches!(command, Command::Serve(_)));
}

#[test]
fn parse_create_arguments() {
    let args = CliArgs::parse_from([
        "gazette",
        "create",
        "--topic",
        "Edge AI acoustics",
        "--tag",
        "audio",
        "--tag",
        "ml",
        "--template",
        "report_v1_sections",
        "--data",
        "/tmp/data.json",
    ]);

    match args.command.expect("create command") {
        Command::Create(create) => {
            assert_eq!(create.topic, "Edge AI acoustics");
            assert_eq!(create.tags, vec!["audio".to_string(), "ml".to_string()]);
            assert_eq!(create.template, "report_v1_sections");
            assert_eq!(
                create.data.as_deref(),
                Some(std::path::Path::new("/tmp/data.json"))
            );
        }
        _ => panic!("wrong command parsed"),
    }
}

#[test]
fn create_template_defaults_to_report_v1() {
    let args = CliArgs::parse_from(["gazette", "create", "--topic", "Lakehouse trends"]);
    match args.command.expect("create command") {
        Command::Create(create) => {
            assert_eq!(create.template, "report_v1");
            assert!(create.tags.is_empty());
            assert!(create.data.is_none());
        }
        _ => panic!("wrong command parsed"),
    }
}

#[test]
fn parse_prune_arguments() {
    let args = CliArgs::parse_from([
        "gazette", "prune", "--root", "site", "--max", "20", "--days", "30", "--dry-run",
    ]);

    match args.command.expect("prune command") {
        Command::Prune(prune) => {
            assert_eq!(prune.root.as_deref(), Some(std::path::Path::new("site")));
            assert_eq!(prune.max_keep, Some(20));
            assert_eq!(prune.days_keep, Some(30));
            assert!(prune.dry_run);
        }
        _ => panic!("wrong command parsed"),
    }
}

#[test]
fn global_overrides_follow_subcommand() {
    let args = CliArgs::parse_from([
        "gazette",
        "daily",
        "--limit",
        "3",
        "--storage-local-root",
        "public",
    ]);

    assert_eq!(
        args.overrides.storage_local_root.as_deref(),
        Some(std::path::Path::new("public"))
    );
    match args.command.expect("daily command") {
        Command::Daily(daily) => assert_eq!(daily.limit, Some(3)),
        _ => panic!("wrong command parsed"),
    }
}

#[test]
fn rebuild_index_and_topics_parse() {
    let args = CliArgs::parse_from(["gazette", "rebuild-index"]);
    assert!(matches!(args.command, Some(Command::RebuildIndex)));

    let args = CliArgs::parse_from(["gazette", "topics"]);
    assert!(matches!(args.command, Some(Command::Topics)));
}
