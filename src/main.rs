#![forbid(unsafe_code)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::todo)]
#![warn(clippy::panic)]
#![warn(clippy::dbg_macro)]
#![warn(clippy::print_stdout)]
#![warn(clippy::print_stderr)]
#![warn(clippy::clone_on_ref_ptr)]
#![warn(unreachable_pub)]
#![warn(missing_debug_implementations)]
#![warn(unused_qualifications)]
#![deny(unused_must_use)]

use parentline_server::api::{MgmtState, ServiceContainer};
use parentline_server::config::Config;
use parentline_server::services::conversation_service::ConversationService;
use parentline_server::services::directory::ParticipantDirectory;
use parentline_server::services::fanout::{Fanout, LocalFanout};
use parentline_server::services::health_service::HealthService;
use parentline_server::services::message_service::MessageService;
use parentline_server::storage::message_repo::MessageRepository;
use parentline_server::storage::student_repo::StudentRepository;
use parentline_server::storage::user_repo::UserRepository;
use parentline_server::{api, storage, telemetry};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::Instrument;

fn spawn_signal_handler(shutdown_tx: watch::Sender<bool>) {
    tokio::spawn(async move {
        let ctrl_c = async {
            let _ = tokio::signal::ctrl_c().await;
        };

        #[cfg(unix)]
        let terminate = async {
            match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
                Ok(mut signal) => {
                    signal.recv().await;
                }
                Err(e) => {
                    tracing::error!(error = %e, "Failed to install SIGTERM handler");
                    std::future::pending::<()>().await;
                }
            }
        };

        #[cfg(not(unix))]
        let terminate = std::future::pending::<()>();

        tokio::select! {
            () = ctrl_c => {}
            () = terminate => {}
        }

        tracing::info!("Shutdown signal received");
        let _ = shutdown_tx.send(true);
    });
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::load();
    telemetry::init_telemetry(&config.telemetry)?;

    let boot_span = tracing::info_span!("boot_server");
    let (api_listener, mgmt_listener, app_router, mgmt_app, shutdown_rx) = async {
        // Phase 1: Infrastructure Setup (Resources)
        let pool = storage::init_pool(&config.database_url).await?;
        storage::run_migrations(&pool).await?;

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        spawn_signal_handler(shutdown_tx);

        // Phase 2: Component Wiring
        let message_repo = MessageRepository::new();
        let user_repo = UserRepository::new();
        let student_repo = StudentRepository::new();

        let directory = ParticipantDirectory::new(pool.clone(), user_repo, student_repo);
        let fanout: Arc<dyn Fanout> = Arc::new(LocalFanout::new(
            config.realtime.channel_capacity,
            config.realtime.gc_interval_secs,
            shutdown_rx.clone(),
        ));
        let message_service = MessageService::new(
            pool.clone(),
            message_repo,
            user_repo,
            student_repo,
            directory,
            Arc::clone(&fanout),
            config.messaging.clone(),
        );
        let conversation_service = ConversationService::new(pool.clone(), message_repo, user_repo, student_repo);
        let health_service = HealthService::new(pool);

        // Phase 3: Runtime Setup (Listeners and Routers)
        let services = ServiceContainer { message_service, conversation_service, fanout };
        let app_router = api::app_router(config.clone(), services, shutdown_rx.clone());
        let mgmt_app = api::mgmt_router(MgmtState { health_service });

        let api_addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
        let mgmt_addr: SocketAddr = format!("{}:{}", config.server.host, config.server.mgmt_port).parse()?;

        tracing::info!(address = %api_addr, "listening");
        tracing::info!(address = %mgmt_addr, "management server listening");

        let api_listener = tokio::net::TcpListener::bind(api_addr).await?;
        let mgmt_listener = tokio::net::TcpListener::bind(mgmt_addr).await?;

        Ok::<_, anyhow::Error>((api_listener, mgmt_listener, app_router, mgmt_app, shutdown_rx))
    }
    .instrument(boot_span)
    .await?;

    // Phase 4: Start Runtime
    let mut api_rx = shutdown_rx.clone();
    let api_server = axum::serve(api_listener, app_router.into_make_service_with_connect_info::<SocketAddr>())
        .with_graceful_shutdown(async move {
            let _ = api_rx.wait_for(|&s| s).await;
        });

    let mut mgmt_rx = shutdown_rx.clone();
    let mgmt_server = axum::serve(mgmt_listener, mgmt_app.into_make_service_with_connect_info::<SocketAddr>())
        .with_graceful_shutdown(async move {
            let _ = mgmt_rx.wait_for(|&s| s).await;
        });

    // Phase 5: Graceful Shutdown Orchestration. Draining is bounded: once the
    // shutdown signal fires, slow clients get shutdown_timeout_secs to finish.
    let mut drain_rx = shutdown_rx;
    tokio::select! {
        result = async { tokio::try_join!(api_server, mgmt_server) } => {
            if let Err(e) = result {
                tracing::error!(error = %e, "Server error");
            }
        }
        () = async move {
            let _ = drain_rx.wait_for(|&s| s).await;
            tokio::time::sleep(std::time::Duration::from_secs(config.server.shutdown_timeout_secs)).await;
        } => {
            tracing::warn!("Timeout waiting for connections to drain");
        }
    }

    tracing::info!("Server stopped");
    Ok(())
}
