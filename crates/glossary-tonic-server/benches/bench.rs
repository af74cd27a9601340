use criterion::{Criterion, Throughput, criterion_group, criterion_main};
use futures::stream::{FuturesUnordered, StreamExt};
use glossary_tonic_core::proto::{
    GetTermRequest, ListTermsRequest, glossary_service_client::GlossaryServiceClient,
};
use std::{
    net::TcpStream,
    process::{Command, Stdio},
    thread,
    time::{Duration, Instant},
};
use tokio::runtime::Builder;
use tonic::transport::{Channel, Uri};

const PORT: &str = "50151";

#[derive(Clone, Copy, Debug)]
enum Call {
    GetTerm,
    ListTerms,
}

fn grpc_bench(c: &mut Criterion) {
    let uri = Uri::try_from(format!("http://127.0.0.1:{PORT}")).expect("Invalid URI");
    let data_dir = std::env::temp_dir().join(format!("glossary-bench-{}", std::process::id()));
    // Start the server. This may require a full compilation so set the timeout
    // high.
    let mut server = Command::new("cargo")
        .args(["run", "--bin", "glossary-tonic-server", "--release"])
        .env("GRPC_PORT", PORT)
        .env("GRPC_HOST", "127.0.0.1")
        .env("DB_PATH", data_dir.join("glossary.db"))
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit())
        .spawn()
        .expect("Failed to start glossary-tonic-server");
    wait_for_port(uri.authority().expect("missing authority").as_str(), 300);

    let rt = Builder::new_multi_thread().enable_all().build().unwrap();

    for call in [Call::GetTerm, Call::ListTerms] {
        for concurrency in [1, 8, 32] {
            let mut group = c.benchmark_group(format!("grpc/{call:?}"));
            group.throughput(Throughput::Elements(concurrency as u64));
            group.bench_function(format!("conc/{concurrency}"), |b| {
                b.to_async(&rt).iter_custom(|iters| {
                    let uri = uri.clone();
                    async move {
                        let channel = Channel::builder(uri)
                            .connect()
                            .await
                            .expect("Failed to connect to server");

                        let start = Instant::now();
                        for _ in 0..iters {
                            run_calls(&channel, call, concurrency).await;
                        }
                        start.elapsed()
                    }
                });
            });
            group.finish();
        }
    }

    if server.kill().is_err() {
        eprintln!("failed to kill server");
    }
    let _ = std::fs::remove_dir_all(&data_dir);
}

async fn run_calls(channel: &Channel, call: Call, concurrency: usize) {
    let mut tasks = FuturesUnordered::new();
    for _ in 0..concurrency {
        let mut client = GlossaryServiceClient::new(channel.clone());
        tasks.push(tokio::spawn(async move {
            match call {
                Call::GetTerm => {
                    client
                        .get_term(GetTermRequest {
                            keyword: "gof".into(),
                        })
                        .await
                        .expect("GetTerm failed");
                }
                Call::ListTerms => {
                    client
                        .list_terms(ListTermsRequest {
                            limit: 10,
                            offset: 0,
                        })
                        .await
                        .expect("ListTerms failed");
                }
            }
        }));
    }

    while let Some(res) = tasks.next().await {
        res.unwrap();
    }
}

pub fn wait_for_port(addr: &str, timeout_secs: u64) {
    let start = Instant::now();
    while start.elapsed().as_secs() < timeout_secs {
        if TcpStream::connect(addr).is_ok() {
            return;
        }
        thread::sleep(Duration::from_millis(100));
    }
    panic!("Server did not start listening on {}", addr);
}

criterion_group!(grpc_benches, grpc_bench);
criterion_main!(grpc_benches);
