use std::{process, sync::Arc, time::Duration};

use agora::{
    application::{
        auth::LogResetMailer,
        error::AppError,
        realtime::RealtimeChannel,
        repos::{RepoError, UsersRepo},
    },
    cache::{CacheConfig, CacheCoordinator, CacheStore, MemoryCacheStore},
    config::{self, StoreBackend},
    domain::types::Role,
    infra::{
        db::PostgresRepositories,
        error::InfraError,
        http::{self, Collaborators, HttpState, Repositories},
        memory::MemoryRepositories,
        realtime::RealtimeHub,
        telemetry,
        uploads::UploadStorage,
    },
};
use tracing::{Dispatch, Level, debug, dispatcher, error, info, warn};
use tracing_subscriber::fmt as tracing_fmt;

const TARGET: &str = "agora::main";
const SESSION_SWEEP_INTERVAL: Duration = Duration::from_secs(10 * 60);

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
    let (cli_args, settings) = config::load_with_cli()
        .map_err(|err| AppError::unexpected(format!("failed to load configuration: {err}")))?;

    let command = cli_args
        .command
        .unwrap_or(config::Command::Serve(Box::<config::ServeArgs>::default()));

    telemetry::init(&settings.logging).map_err(AppError::from)?;

    match command {
        config::Command::Serve(_) => run_serve(settings).await,
        config::Command::Migrate(_) => run_migrate(settings).await,
        config::Command::Promote(args) => run_promote(settings, &args.email).await,
    }
}

async fn run_serve(settings: config::Settings) -> Result<(), AppError> {
    let state = match settings.database.backend {
        StoreBackend::Postgres => {
            let repositories = connect_postgres(&settings).await?;
            repositories
                .migrate()
                .await
                .map_err(|err| AppError::from(InfraError::from(err)))?;
            build_state(&settings, repositories.clone(), Some(repositories))?
        }
        StoreBackend::Memory => {
            warn!(
                target: TARGET,
                "using the in-memory store; all data is lost on shutdown"
            );
            build_state(&settings, Arc::new(MemoryRepositories::new()), None)?
        }
    };

    serve_http(&settings, state).await
}

async fn run_migrate(settings: config::Settings) -> Result<(), AppError> {
    connect_postgres(&settings)
        .await?
        .migrate()
        .await
        .map_err(|err| AppError::from(InfraError::from(err)))?;
    Ok(())
}

async fn run_promote(settings: config::Settings, email: &str) -> Result<(), AppError> {
    let repositories = connect_postgres(&settings).await?;
    let email = email.trim().to_lowercase();
    let user = repositories
        .find_by_email(&email)
        .await?
        .ok_or_else(|| AppError::not_found("user"))?;
    match repositories.set_role(user.id, Role::Admin).await {
        Ok(()) => {}
        Err(RepoError::NotFound) => return Err(AppError::not_found("user")),
        Err(err) => return Err(err.into()),
    }
    info!(target: TARGET, user = %user.id, email = %email, "user promoted to admin");
    Ok(())
}

async fn connect_postgres(
    settings: &config::Settings,
) -> Result<Arc<PostgresRepositories>, AppError> {
    let database_url = settings
        .database
        .url
        .as_ref()
        .ok_or_else(|| InfraError::configuration("database url is not configured"))
        .map_err(AppError::from)?;

    let repositories =
        PostgresRepositories::connect(database_url, settings.database.max_connections.get())
            .await
            .map_err(|err| AppError::from(InfraError::from(err)))?;

    Ok(Arc::new(repositories))
}

fn build_state<R: Repositories>(
    settings: &config::Settings,
    repos: Arc<R>,
    db: Option<Arc<PostgresRepositories>>,
) -> Result<HttpState, AppError> {
    let cache_config = CacheConfig::from(&settings.cache);
    let store: Arc<dyn CacheStore> = Arc::new(MemoryCacheStore::new(&cache_config));
    let cache = Arc::new(CacheCoordinator::new(cache_config, store));
    let sessions = Arc::new(MemoryCacheStore::unbounded());
    spawn_session_sweeper(sessions.clone());

    let realtime: Arc<dyn RealtimeChannel> =
        Arc::new(RealtimeHub::new(settings.realtime.room_capacity.get()));

    let uploads = Arc::new(
        UploadStorage::new(
            settings.uploads.directory.clone(),
            settings.uploads.max_request_bytes.get(),
        )
        .map_err(|err| AppError::from(InfraError::Io(err)))?,
    );

    Ok(HttpState::assemble(Collaborators {
        repos,
        cache,
        sessions,
        realtime,
        uploads,
        mailer: Arc::new(LogResetMailer),
        reset_token_ttl: settings.auth.reset_token_ttl,
        cookie_secure: settings.auth.cookie_secure,
        db,
    }))
}

/// Sessions never evict, so expired tokens are swept on a timer instead.
fn spawn_session_sweeper(sessions: Arc<MemoryCacheStore>) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(SESSION_SWEEP_INTERVAL);
        loop {
            ticker.tick().await;
            let swept = sessions.sweep_expired();
            if swept > 0 {
                debug!(target: TARGET, swept, "expired sessions swept");
            }
        }
    });
}

async fn serve_http(settings: &config::Settings, state: HttpState) -> Result<(), AppError> {
    let router = http::build_router(state);

    let listener = tokio::net::TcpListener::bind(settings.server.addr)
        .await
        .map_err(|err| AppError::from(InfraError::from(err)))?;
    info!(target: TARGET, addr = %settings.server.addr, "listening");

    let grace = settings.server.graceful_shutdown;
    let server = axum::serve(listener, router.into_make_service())
        .with_graceful_shutdown(shutdown_signal());

    // Open SSE streams never finish on their own; cap the drain.
    let drained = async {
        server.await?;
        Ok::<(), std::io::Error>(())
    };
    tokio::select! {
        result = drained => {
            result.map_err(|err| AppError::unexpected(format!("server error: {err}")))?;
        }
        _ = async {
            shutdown_signal().await;
            tokio::time::sleep(grace).await;
        } => {
            warn!(target: TARGET, grace_secs = grace.as_secs(), "graceful shutdown timed out");
        }
    }

    info!(target: TARGET, "server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        error!(target: TARGET, error = %err, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}
