#![doc = include_str!("../README.md")]

mod server;

use anyhow::Context;
use clap::Parser;
use futures::Stream;
use glossary_tonic_core::proto::{FILE_DESCRIPTOR_SET, glossary_service_server::GlossaryServiceServer};
use server::config::{CliArgs, ServerConfig};
use server::service::handler::TermService;
use server::storage::TermStore;
use server::telemetry::init_telemetry;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpListener;
use tokio::signal;
use tokio_stream::wrappers::TcpListenerStream;
use tonic::transport::server::Connected;
use tonic::{codec::CompressionEncoding, transport::Server};
use tonic_reflection::server::Builder;
use tonic_web::GrpcWebLayer;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};

// Using mimalloc for better performance under contention, especially in musl
// environments.
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load from .env
    let _ = dotenvy::dotenv();
    let args = CliArgs::parse();
    let config = ServerConfig::try_from(args)?;

    let providers = init_telemetry()?;

    let store = TermStore::new(&config.db_path);
    let seeded = store.initialize().await.with_context(|| {
        format!(
            "failed to initialise database at {}",
            config.db_path.display()
        )
    })?;
    tracing::info!(
        db_path = %config.db_path.display(),
        seeded,
        "Database ready"
    );

    let tcp = TcpListener::bind(config.server_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.server_addr))?;
    let incoming = TcpListenerStream::new(tcp);
    log_startup_info(&config);

    let res = run_server_with_incoming(store, incoming, shutdown_signal()).await;
    providers.shutdown();
    res
}

async fn run_server_with_incoming<I, IO, IE, F>(
    store: TermStore,
    incoming: I,
    shutdown: F,
) -> anyhow::Result<()>
where
    I: Stream<Item = Result<IO, IE>>,
    IO: AsyncRead + AsyncWrite + Connected + Unpin + Send + 'static,
    IE: Into<tower::BoxError>,
    F: Future<Output = ()>,
{
    let (health_reporter, health_service) = tonic_health::server::health_reporter();
    health_reporter
        .set_serving::<GlossaryServiceServer<TermService>>()
        .await;

    let service = TermService::new(store);

    // Older tooling (including some grpcurl builds) only speaks v1alpha.
    let reflection_v1 = Builder::configure()
        .register_encoded_file_descriptor_set(FILE_DESCRIPTOR_SET)
        .build_v1()?;
    let reflection_v1alpha = Builder::configure()
        .register_encoded_file_descriptor_set(FILE_DESCRIPTOR_SET)
        .build_v1alpha()?;

    let shutdown = async move {
        shutdown.await;
        tracing::info!("Shutdown signal received, terminating gracefully...");
        health_reporter
            .set_not_serving::<GlossaryServiceServer<TermService>>()
            .await;
    };

    Server::builder()
        .accept_http1(true)
        .http2_adaptive_window(Some(true))
        .layer(
            ServiceBuilder::new()
                .layer(
                    CorsLayer::new()
                        .allow_origin(Any)
                        .allow_methods(Any)
                        .allow_headers(Any),
                )
                .layer(GrpcWebLayer::new()),
        )
        .add_service(health_service)
        .add_service(reflection_v1)
        .add_service(reflection_v1alpha)
        .add_service(build_glossary_service(service))
        .serve_with_incoming_shutdown(incoming, shutdown)
        .await?;

    tracing::info!("Service shut down successfully");
    Ok(())
}

fn log_startup_info(config: &ServerConfig) {
    if cfg!(debug_assertions) {
        tracing::info!(
            "Starting glossary service on {} with full config: {:#?}",
            config.server_addr,
            config
        );
    } else {
        tracing::info!("Starting glossary service on {}", config.server_addr);
    }
}

fn build_glossary_service(service: TermService) -> GlossaryServiceServer<TermService> {
    GlossaryServiceServer::new(service)
        .send_compressed(CompressionEncoding::Zstd)
        .send_compressed(CompressionEncoding::Gzip)
        .send_compressed(CompressionEncoding::Deflate)
        .accept_compressed(CompressionEncoding::Zstd)
        .accept_compressed(CompressionEncoding::Gzip)
        .accept_compressed(CompressionEncoding::Deflate)
}

async fn shutdown_signal() {
    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received Ctrl+C signal");
        },
        () = terminate => {
            tracing::info!("Received SIGTERM signal");
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::server::storage::tests::seeded_store;
    use glossary_tonic_core::proto::{
        AddTermRequest, GetTermRequest, ListTermsRequest, Term,
        glossary_service_client::GlossaryServiceClient,
    };
    use tokio::sync::oneshot;
    use tonic::Code;
    use tonic_health::pb::{
        HealthCheckRequest, health_check_response::ServingStatus, health_client::HealthClient,
    };
    use tonic_reflection::pb::v1::{
        ServerReflectionRequest, server_reflection_client::ServerReflectionClient,
        server_reflection_request::MessageRequest, server_reflection_response::MessageResponse,
    };

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn serves_glossary_over_tcp() {
        let (_dir, store) = seeded_store().await;
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (stop_tx, stop_rx) = oneshot::channel::<()>();

        let server = tokio::spawn(run_server_with_incoming(
            store,
            TcpListenerStream::new(listener),
            async {
                let _ = stop_rx.await;
            },
        ));

        let mut client = GlossaryServiceClient::connect(format!("http://{addr}"))
            .await
            .unwrap()
            .accept_compressed(CompressionEncoding::Zstd)
            .send_compressed(CompressionEncoding::Zstd);

        let gof = client
            .get_term(GetTermRequest {
                keyword: "gof".into(),
            })
            .await
            .unwrap()
            .into_inner()
            .term
            .unwrap();
        assert_eq!(gof.title, "Паттерны GoF");

        let status = client
            .get_term(GetTermRequest {
                keyword: "doesnotexist".into(),
            })
            .await
            .unwrap_err();
        assert_eq!(status.code(), Code::NotFound);

        let page = client
            .list_terms(ListTermsRequest {
                limit: 2,
                offset: 0,
            })
            .await
            .unwrap()
            .into_inner();
        let keywords: Vec<_> = page.terms.iter().map(|t| t.keyword.as_str()).collect();
        assert_eq!(keywords, ["ast", "gof"]);
        assert_eq!(page.total, 4);

        let added = client
            .add_term(AddTermRequest {
                term: Some(Term {
                    keyword: "x".into(),
                    title: "X".into(),
                    description: "d".into(),
                }),
            })
            .await
            .unwrap()
            .into_inner();
        assert!(added.success);

        let x = client
            .get_term(GetTermRequest {
                keyword: "x".into(),
            })
            .await
            .unwrap()
            .into_inner()
            .term
            .unwrap();
        assert_eq!(x.description, "d");

        let mut health = HealthClient::new(
            tonic::transport::Endpoint::new(format!("http://{addr}"))
                .unwrap()
                .connect()
                .await
                .unwrap(),
        );
        let status = health
            .check(HealthCheckRequest {
                service: "glossary.GlossaryService".into(),
            })
            .await
            .unwrap()
            .into_inner()
            .status;
        assert_eq!(status, ServingStatus::Serving as i32);

        let mut reflection = ServerReflectionClient::new(
            tonic::transport::Endpoint::new(format!("http://{addr}"))
                .unwrap()
                .connect()
                .await
                .unwrap(),
        );
        let request = ServerReflectionRequest {
            host: String::new(),
            message_request: Some(MessageRequest::ListServices(String::new())),
        };
        let mut responses = reflection
            .server_reflection_info(tokio_stream::iter([request]))
            .await
            .unwrap()
            .into_inner();
        let response = responses.message().await.unwrap().unwrap();
        let list = match response.message_response {
            Some(MessageResponse::ListServicesResponse(list)) => list,
            other => panic!("unexpected reflection response: {other:?}"),
        };
        let services: Vec<_> = list.service.iter().map(|s| s.name.as_str()).collect();
        assert!(services.contains(&"glossary.GlossaryService"), "{services:?}");

        stop_tx.send(()).unwrap();
        server.await.unwrap().unwrap();
    }
}
