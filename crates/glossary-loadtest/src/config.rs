use anyhow::{Context, bail};
use clap::Parser;
use glossary_tonic_core::types::DEFAULT_PORT;
use std::time::Duration;
use tonic::transport::Endpoint;

/// Runtime configuration for the `glossary-loadtest` binary.
#[derive(Parser, Debug, Clone)]
#[command(
    name = "glossary-loadtest",
    version,
    about = "Generates simulated user traffic against a glossary gRPC server"
)]
pub struct CliArgs {
    /// Server address. A bare `host:port` is treated as plaintext HTTP/2.
    ///
    /// Environment variable: `GLOSSARY_HOST`
    #[arg(long, env = "GLOSSARY_HOST", default_value_t = format!("http://127.0.0.1:{DEFAULT_PORT}"))]
    pub host: String,

    /// Number of simulated users to start.
    ///
    /// Environment variable: `USERS`
    #[arg(short, long, env = "USERS", default_value_t = 10)]
    pub users: usize,

    /// Users started per second until `users` are running.
    ///
    /// Environment variable: `SPAWN_RATE`
    #[arg(long, env = "SPAWN_RATE", default_value_t = 2.0)]
    pub spawn_rate: f64,

    /// Test duration in seconds, measured from the first spawned user.
    ///
    /// Environment variable: `RUN_TIME`
    #[arg(long, env = "RUN_TIME", default_value_t = 60)]
    pub run_time: u64,

    /// Relative share of users running the read/write `GlossaryUser` profile.
    #[arg(long, env = "GLOSSARY_WEIGHT", default_value_t = 1)]
    pub glossary_weight: u32,

    /// Relative share of users running the `ReadOnlyUser` profile.
    #[arg(long, env = "READ_ONLY_WEIGHT", default_value_t = 1)]
    pub read_only_weight: u32,

    /// Seed for the per-user random number generators. Omit for a random run.
    #[arg(long, env = "LOADTEST_SEED")]
    pub seed: Option<u64>,
}

#[derive(Debug, Clone)]
pub struct LoadTestConfig {
    pub endpoint: Endpoint,
    pub users: usize,
    pub spawn_interval: Duration,
    pub run_time: Duration,
    pub glossary_weight: u32,
    pub read_only_weight: u32,
    pub seed: Option<u64>,
}

impl TryFrom<CliArgs> for LoadTestConfig {
    type Error = anyhow::Error;

    fn try_from(args: CliArgs) -> Result<Self, Self::Error> {
        if args.users == 0 {
            bail!("USERS must be greater than 0");
        }

        if !args.spawn_rate.is_finite() || args.spawn_rate <= 0.0 {
            bail!("SPAWN_RATE must be a positive number");
        }

        if args.run_time == 0 {
            bail!("RUN_TIME must be greater than 0");
        }

        if args.glossary_weight == 0 && args.read_only_weight == 0 {
            bail!("at least one of GLOSSARY_WEIGHT and READ_ONLY_WEIGHT must be non-zero");
        }

        let host = if args.host.contains("://") {
            args.host
        } else {
            format!("http://{}", args.host)
        };
        let endpoint = Endpoint::from_shared(host.clone())
            .with_context(|| format!("invalid GLOSSARY_HOST ({host})"))?;

        Ok(Self {
            endpoint,
            users: args.users,
            spawn_interval: Duration::from_secs_f64(1.0 / args.spawn_rate),
            run_time: Duration::from_secs(args.run_time),
            glossary_weight: args.glossary_weight,
            read_only_weight: args.read_only_weight,
            seed: args.seed,
        })
    }
}
