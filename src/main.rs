use axum::{
    Router,
    extract::Extension,
    routing::{get, post},
};
use infra_solr_admin::admin::client::ClusterAdmin;
use infra_solr_admin::admin::handlers::{
    handle_create_collection, handle_create_shard, handle_dump_collections,
    handle_list_collections, handle_run_command, handle_update_security_state,
};
use infra_solr_admin::admin::http::{HttpAdminApi, build_http_client};
use infra_solr_admin::archive::handlers::handle_archive;
use infra_solr_admin::archive::service::ArchiveService;
use infra_solr_admin::config::ClusterConfig;
use infra_solr_admin::coordination::store::UnconfiguredCoordinationStore;
use infra_solr_admin::executor::retry::CancelFlag;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

const DEFAULT_BIND: &str = "127.0.0.1:8890";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        // .with_max_level(tracing::Level::DEBUG)
        .with_max_level(tracing::Level::INFO)
        .init();

    let args: Vec<String> = std::env::args().collect();

    if args.len() < 3 {
        eprintln!("Usage: {} --config <file> [--bind <addr:port>]", args[0]);
        eprintln!("Example: {} --config cluster.json", args[0]);
        eprintln!(
            "Example: {} --config cluster.json --bind 0.0.0.0:8890",
            args[0]
        );

        std::process::exit(1);
    }

    let mut config_path: Option<PathBuf> = None;
    let mut bind_addr: SocketAddr = DEFAULT_BIND.parse()?;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--config" if i + 1 < args.len() => {
                config_path = Some(PathBuf::from(&args[i + 1]));
                i += 2;
            }
            "--bind" if i + 1 < args.len() => {
                bind_addr = args[i + 1].parse()?;
                i += 2;
            }
            _ => {
                i += 1;
            }
        }
    }

    let config_path = config_path.ok_or_else(|| anyhow::anyhow!("--config is required"))?;
    let config = ClusterConfig::load(&config_path)?;

    tracing::info!(
        "Administering collection '{}' at {} (znode {})",
        config.collection,
        config.solr_url,
        config.znode
    );
    if config.tls.is_enabled() {
        tracing::info!("TLS material configured for the admin client");
    }

    // 1. External clients:
    let client = build_http_client(&config.tls)?;
    let admin_api = Arc::new(HttpAdminApi::new(client.clone(), &config.solr_url));

    tracing::warn!(
        "No coordination store backend configured, coordination commands are disabled"
    );
    let store = UnconfiguredCoordinationStore::new();

    // 2. Services:
    let cancel = CancelFlag::new();
    let archive = Arc::new(ArchiveService::new(
        client,
        &config.solr_url,
        &config.data_folder,
    ));
    let admin = Arc::new(ClusterAdmin::new(config, admin_api, store).with_cancel(cancel.clone()));

    for name in admin.registry().list_commands() {
        tracing::debug!("  - command: {}", name);
    }

    // 3. HTTP Router:
    let app = Router::new()
        .route(
            "/collections",
            get(handle_list_collections).post(handle_create_collection),
        )
        .route("/collections/dump", get(handle_dump_collections))
        .route("/shards", post(handle_create_shard))
        .route("/security/state", post(handle_update_security_state))
        .route("/commands/:name", post(handle_run_command))
        .route("/archive", post(handle_archive))
        .layer(Extension(admin))
        .layer(Extension(archive));

    // 4. Start HTTP server:
    tracing::info!("HTTP server listening on {}", bind_addr);
    tracing::info!("Press Ctrl+C to shutdown");

    let listener = tokio::net::TcpListener::bind(bind_addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::info!("Shutting down, pending retries stop after their current attempt");
            }
            cancel.cancel();
        })
        .await?;

    Ok(())
}
