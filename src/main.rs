use std::{process, sync::Arc};

use gazette::{
    application::{
        archive::{ArchiveOptions, ArchiveService},
        daily::DailyRunner,
        error::AppError,
        reports::ReportService,
        retention::{self, PrunePolicy, PruneStatus},
        topics::{TopicGenerator, TopicModel},
    },
    config,
    infra::{
        error::InfraError,
        gemini::{GeminiClient, GeminiOptions},
        http::{self, HttpState},
        storage, telemetry,
    },
};
use gazette_api_types::{CreateReportResponse, ReportData, ReportRequest};
use time::OffsetDateTime;
use tokio::sync::Notify;
use tracing::{Dispatch, Level, dispatcher, error, info, warn};
use tracing_subscriber::fmt as tracing_fmt;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        report_application_error(&error);
        process::exit(1);
    }
}

fn report_application_error(error: &AppError) {
    if dispatcher::has_been_set() {
        error!(error = %error, "application error");
        return;
    }

    let subscriber = tracing_fmt().with_max_level(Level::ERROR).finish();
    let dispatch = Dispatch::new(subscriber);
    dispatcher::with_default(&dispatch, || {
        error!(error = %error, "application error");
    });
}

async fn run() -> Result<(), AppError> {
    let (cli_args, settings) = config::load_with_cli().map_err(|err| {
        AppError::from(InfraError::configuration(format!(
            "failed to load configuration: {err}"
        )))
    })?;

    let command = cli_args
        .command
        .unwrap_or(config::Command::Serve(config::ServeArgs::default()));

    telemetry::init(&settings.logging).map_err(AppError::from)?;

    match command {
        config::Command::Serve(_) => run_serve(settings).await,
        config::Command::Create(args) => run_create(settings, args).await,
        config::Command::RebuildIndex => run_rebuild_index(settings).await,
        config::Command::Topics => run_topics(settings).await,
        config::Command::Daily(args) => run_daily(settings, args).await,
        config::Command::Prune(args) => run_prune(settings, args).await,
    }
}

fn build_report_service(settings: &config::Settings) -> Result<Arc<ReportService>, AppError> {
    let store = storage::build_store(&settings.storage)?;
    let archive = Arc::new(ArchiveService::new(
        store.clone(),
        ArchiveOptions {
            index_key: settings.archive.index_key.clone(),
            title: settings.archive.title.clone(),
        },
    ));
    Ok(Arc::new(ReportService::new(store, archive)))
}

fn build_topic_generator(settings: &config::TopicsSettings) -> Result<TopicGenerator, AppError> {
    let Some(api_key) = settings.api_key.clone() else {
        return Ok(TopicGenerator::default());
    };

    let client = GeminiClient::new(GeminiOptions {
        api_key,
        model: settings.model.clone(),
        endpoint: settings.endpoint.clone(),
    })
    .map_err(|err| AppError::from(InfraError::http(err.to_string())))?;
    let model: Arc<dyn TopicModel> = Arc::new(client);
    Ok(TopicGenerator::new(Some(model)))
}

async fn run_serve(settings: config::Settings) -> Result<(), AppError> {
    let reports = build_report_service(&settings)?;
    let router = http::build_router(HttpState::new(reports));

    let listener = tokio::net::TcpListener::bind(settings.server.addr)
        .await
        .map_err(|err| AppError::from(InfraError::from(err)))?;
    info!(
        target = "gazette::serve",
        addr = %settings.server.addr,
        "listening"
    );

    let shutdown = Arc::new(Notify::new());
    let signalled = shutdown.clone();
    let server = axum::serve(listener, router.into_make_service()).with_graceful_shutdown(
        async move {
            if let Err(err) = tokio::signal::ctrl_c().await {
                warn!(target = "gazette::serve", error = %err, "failed to listen for ctrl-c");
                std::future::pending::<()>().await;
            }
            info!(target = "gazette::serve", "shutdown requested");
            signalled.notify_one();
        },
    );

    let grace = settings.server.graceful_shutdown;
    tokio::select! {
        result = server => {
            result.map_err(|err| AppError::unexpected(format!("server error: {err}")))?;
        }
        _ = async {
            shutdown.notified().await;
            tokio::time::sleep(grace).await;
        } => {
            warn!(
                target = "gazette::serve",
                grace_secs = grace.as_secs(),
                "graceful shutdown timed out; dropping open connections"
            );
        }
    }

    Ok(())
}

async fn run_create(settings: config::Settings, args: config::CreateArgs) -> Result<(), AppError> {
    let data = match args.data.as_ref() {
        Some(path) => {
            let bytes = tokio::fs::read(path)
                .await
                .map_err(|err| AppError::from(InfraError::from(err)))?;
            serde_json::from_slice::<ReportData>(&bytes).map_err(|err| {
                AppError::validation(format!("invalid data file {}: {err}", path.display()))
            })?
        }
        None => ReportData::default(),
    };

    let reports = build_report_service(&settings)?;
    let outcome = reports
        .create_report(ReportRequest {
            topic: args.topic,
            tags: args.tags,
            template: args.template,
            data,
        })
        .await?;

    print_json(&CreateReportResponse::from(outcome))
}

async fn run_rebuild_index(settings: config::Settings) -> Result<(), AppError> {
    let reports = build_report_service(&settings)?;
    let outcome = reports.archive().rebuild().await?;
    print_json(&serde_json::json!({
        "count": outcome.count,
        "index": outcome.index,
    }))
}

async fn run_topics(settings: config::Settings) -> Result<(), AppError> {
    let generator = build_topic_generator(&settings.topics)?;
    let topics = generator.generate(OffsetDateTime::now_utc().date()).await;
    print_json(&topics)
}

async fn run_daily(settings: config::Settings, args: config::DailyArgs) -> Result<(), AppError> {
    let reports = build_report_service(&settings)?;
    let generator = build_topic_generator(&settings.topics)?;
    let outcome = DailyRunner::new(reports, generator).run(args.limit).await?;

    print_json(&serde_json::json!({
        "created": outcome.created,
        "failed": outcome
            .failed
            .iter()
            .map(|failure| serde_json::json!({ "topic": failure.topic, "error": failure.error }))
            .collect::<Vec<_>>(),
        "archive": { "count": outcome.archive.count, "index": outcome.archive.index },
    }))
}

async fn run_prune(settings: config::Settings, args: config::PruneArgs) -> Result<(), AppError> {
    let root = settings.retention.root.clone();
    let policy = PrunePolicy {
        max_keep: settings.retention.max_keep,
        days_keep: settings.retention.days_keep,
        dry_run: args.dry_run,
    };

    let report = tokio::task::spawn_blocking(move || retention::prune(&root, &policy))
        .await
        .map_err(|err| AppError::unexpected(format!("retention task failed: {err}")))?;

    if report.status != PruneStatus::Completed {
        return Ok(());
    }

    println!(
        "[retention] pages={} keep={} delete={}",
        report.pages,
        report.kept.len(),
        report.deleted.len()
    );
    let verb = if report.dry_run {
        "DRY-RUN delete"
    } else {
        "deleted"
    };
    for path in &report.deleted {
        println!("{verb}: {}", path.display());
    }
    for failure in &report.errors {
        eprintln!("failed: {}: {}", failure.path.display(), failure.error);
    }
    Ok(())
}

fn print_json<T: serde::Serialize + ?Sized>(value: &T) -> Result<(), AppError> {
    let rendered = serde_json::to_string_pretty(value)
        .map_err(|err| AppError::unexpected(format!("failed to encode output: {err}")))?;
    println!("{rendered}");
    Ok(())
}
