use std::{process, sync::Arc};

use time::OffsetDateTime;
use tracing::{Dispatch, Level, dispatcher, error, info};
use tracing_subscriber::fmt as tracing_fmt;
use vitrine::{
    application::{
        assets::AssetStore,
        documents::DocumentStore,
        error::{AppError, ErrorReport},
        listing::{ListQuery, Listing, list_documents, list_plain, list_projects},
        projects::ProjectStore,
        repos::{AssetsRepo, DocumentsRepo, ProjectsRepo, TagsRepo},
        tags::TagStore,
    },
    cache::{CacheOptions, ExternalCache},
    config::{self, CacheCommand, Command, EntityKind, ListArgs},
    domain::entities::{AssetRecord, DocumentRecord, ProjectRecord, TagRecord, TagRef},
    infra::{db::PostgresRepositories, error::InfraError, github::GithubSource, telemetry},
};

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        report_application_error(&error);
        process::exit(i32::from(error.exit_code()));
    }
}

fn report_application_error(error: &AppError) {
    let report = ErrorReport::from_error("vitrine", error);
    if dispatcher::has_been_set() {
        error!(error = %report.render(), source = report.source, "application error");
        return;
    }

    let subscriber = tracing_fmt().with_max_level(Level::ERROR).finish();
    let dispatch = Dispatch::new(subscriber);
    dispatcher::with_default(&dispatch, || {
        error!(error = %report.render(), source = report.source, "application error");
    });
}

async fn run() -> Result<(), AppError> {
    let (cli_args, settings) = config::load_with_cli().map_err(|err| {
        AppError::from(InfraError::configuration(format!(
            "failed to load configuration: {err}"
        )))
    })?;

    telemetry::init(&settings.logging).map_err(AppError::from)?;

    let repositories = init_repositories(&settings).await?;

    match cli_args.command {
        Command::List(args) => run_list(&settings, repositories, args).await,
        Command::Cache(args) => match args.command {
            CacheCommand::Purge => run_cache_purge(repositories).await,
        },
        Command::Migrate => run_migrate(repositories).await,
    }
}

async fn init_repositories(
    settings: &config::Settings,
) -> Result<Arc<PostgresRepositories>, AppError> {
    let database_url = settings
        .database
        .url
        .as_ref()
        .ok_or_else(|| InfraError::configuration("database url is not configured"))
        .map_err(AppError::from)?;

    let pool = PostgresRepositories::connect(database_url, settings.database.max_connections.get())
        .await
        .map_err(|err| AppError::from(InfraError::database(err.to_string())))?;

    Ok(Arc::new(PostgresRepositories::new(pool)))
}

fn cache_options(settings: &config::Settings, repositories: &PostgresRepositories) -> CacheOptions {
    let options = CacheOptions::default().with_max_age(settings.cache.max_age);
    if settings.cache.persist {
        let table: Arc<dyn ExternalCache> = Arc::new(repositories.cache_table());
        options.with_external(table)
    } else {
        options
    }
}

async fn run_list(
    settings: &config::Settings,
    repositories: Arc<PostgresRepositories>,
    args: ListArgs,
) -> Result<(), AppError> {
    let query = ListQuery {
        sort: args.sort,
        group: args.group,
        tag: args.tag,
        include_hidden: args.include_hidden,
    };

    info!(
        target = "vitrine::list",
        entity = ?args.entity,
        sort = query.sort.as_deref(),
        group = query.group.as_deref(),
        tag = query.tag.as_deref(),
        "Listing entity store"
    );

    match args.entity {
        EntityKind::Documents => {
            let repo: Arc<dyn DocumentsRepo> = repositories;
            let store = DocumentStore::new(repo);
            print_listing(&list_documents(&store, &query).await?, document_line);
        }
        EntityKind::Projects => {
            let source = GithubSource::new(&settings.github)?;
            let repo: Arc<dyn ProjectsRepo> = repositories.clone();
            let cache =
                cache_options(settings, &repositories).with_max_age(settings.github.max_age());
            let store = ProjectStore::new(Arc::new(source), repo, cache);
            print_listing(&list_projects(&store, &query).await?, project_line);
        }
        EntityKind::Tags => {
            let repo: Arc<dyn TagsRepo> = repositories;
            let store = TagStore::new(repo);
            print_listing(&list_plain(&store, &query).await?, tag_line);
        }
        EntityKind::Assets => {
            let repo: Arc<dyn AssetsRepo> = repositories;
            let store = AssetStore::new(repo);
            print_listing(&list_plain(&store, &query).await?, asset_line);
        }
    }

    Ok(())
}

async fn run_cache_purge(repositories: Arc<PostgresRepositories>) -> Result<(), AppError> {
    let now = OffsetDateTime::now_utc();
    let persisted = repositories
        .cache_table()
        .purge_expired(now)
        .await
        .map_err(|err| AppError::from(InfraError::database(err.to_string())))?;

    info!(
        target = "vitrine::cache",
        persisted, "Purged expired persisted cache entries"
    );
    println!("purged {persisted} expired persisted cache entries");
    Ok(())
}

async fn run_migrate(repositories: Arc<PostgresRepositories>) -> Result<(), AppError> {
    PostgresRepositories::run_migrations(repositories.pool())
        .await
        .map_err(|err| AppError::from(InfraError::database(err.to_string())))?;

    info!(target = "vitrine::migrate", "Database migrations applied");
    Ok(())
}

fn print_listing<T>(listing: &Listing<T>, line: fn(&T) -> String) {
    match listing {
        Listing::Flat(store) => {
            for item in store.iter() {
                println!("{}", line(item));
            }
        }
        Listing::Grouped(groups) => {
            for (name, store) in groups.iter() {
                println!("{name}");
                for item in store.iter() {
                    println!("  {}", line(item));
                }
            }
        }
    }
}

fn tag_values(tags: &[TagRef]) -> String {
    tags.iter()
        .map(|tag| tag.value.as_str())
        .collect::<Vec<_>>()
        .join(",")
}

fn document_line(document: &DocumentRecord) -> String {
    format!(
        "{}\t{}\t{}\t[{}]",
        document.id,
        document.created_at.date(),
        document.title,
        tag_values(&document.tags)
    )
}

fn project_line(project: &ProjectRecord) -> String {
    let pushed = project
        .pushed_at
        .map(|pushed| pushed.date().to_string())
        .unwrap_or_else(|| "-".to_string());
    let hidden = if project.hidden { " (hidden)" } else { "" };
    format!(
        "{}\t{}\t{}\t{}{}\t[{}]",
        project.id,
        project.created_at.date(),
        pushed,
        project.name,
        hidden,
        tag_values(&project.tags)
    )
}

fn tag_line(tag: &TagRecord) -> String {
    format!("{}\t{}\t{}", tag.id, tag.value, tag.color)
}

fn asset_line(asset: &AssetRecord) -> String {
    format!("{}\t{}\t{}", asset.id, asset.created_at.date(), asset.name)
}
