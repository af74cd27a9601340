use anyhow::bail;
use clap::Parser;
use glossary_tonic_core::types::{DEFAULT_DB_PATH, DEFAULT_PORT};
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;

/// Runtime configuration for the `glossary-tonic-server` binary.
///
/// All values are parsed from CLI arguments or environment variables (a `.env`
/// file in the working directory is loaded first).
#[derive(Parser, Debug, Clone)]
#[command(
    name = "glossary-tonic-server",
    version,
    about = "A gRPC glossary service backed by SQLite"
)]
pub struct CliArgs {
    /// Port the gRPC server listens on.
    ///
    /// Environment variable: `GRPC_PORT`
    #[arg(long, env = "GRPC_PORT", default_value_t = DEFAULT_PORT)]
    pub port: u16,

    /// Interface to bind. The default accepts IPv6 and, on dual-stack hosts,
    /// IPv4 connections.
    ///
    /// Environment variable: `GRPC_HOST`
    #[arg(long, env = "GRPC_HOST", default_value_t = String::from("::"))]
    pub host: String,

    /// Path of the SQLite database file. Missing parent directories are
    /// created on startup.
    ///
    /// Environment variable: `DB_PATH`
    #[arg(long, env = "DB_PATH", default_value_t = String::from(DEFAULT_DB_PATH))]
    pub db_path: String,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub server_addr: SocketAddr,
    pub db_path: PathBuf,
}

impl TryFrom<CliArgs> for ServerConfig {
    type Error = anyhow::Error;

    fn try_from(args: CliArgs) -> Result<Self, Self::Error> {
        if args.db_path.trim().is_empty() {
            bail!("DB_PATH must not be empty");
        }

        let host: IpAddr = match args.host.parse() {
            Ok(host) => host,
            Err(_) => bail!("GRPC_HOST ({}) is not a valid IP address", args.host),
        };

        Ok(Self {
            server_addr: SocketAddr::new(host, args.port),
            db_path: PathBuf::from(args.db_path),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(host: &str, port: u16, db_path: &str) -> CliArgs {
        CliArgs {
            port,
            host: host.to_string(),
            db_path: db_path.to_string(),
        }
    }

    #[test]
    fn defaults_listen_on_all_interfaces() {
        let args = CliArgs::try_parse_from(["glossary-tonic-server"]).unwrap();
        let config = ServerConfig::try_from(args).unwrap();
        // Only meaningful when the environment does not override the port.
        if std::env::var_os("GRPC_PORT").is_none() {
            assert_eq!(config.server_addr.port(), DEFAULT_PORT);
        }
        if std::env::var_os("GRPC_HOST").is_none() {
            assert!(config.server_addr.ip().is_unspecified());
        }
    }

    #[test]
    fn builds_socket_addr_from_host_and_port() {
        let config = ServerConfig::try_from(args("127.0.0.1", 6000, "/tmp/g.db")).unwrap();
        assert_eq!(config.server_addr, "127.0.0.1:6000".parse().unwrap());
        assert_eq!(config.db_path, PathBuf::from("/tmp/g.db"));
    }

    #[test]
    fn rejects_empty_db_path() {
        let err = ServerConfig::try_from(args("::", 50051, "  ")).unwrap_err();
        assert!(err.to_string().contains("DB_PATH"));
    }

    #[test]
    fn rejects_unparsable_host() {
        let err = ServerConfig::try_from(args("not-an-ip", 50051, "/tmp/g.db")).unwrap_err();
        assert!(err.to_string().contains("GRPC_HOST"));
    }

    #[test]
    fn port_flag_overrides_default() {
        let args =
            CliArgs::try_parse_from(["glossary-tonic-server", "--port", "7001", "--host", "::1"])
                .unwrap();
        let config = ServerConfig::try_from(args).unwrap();
        assert_eq!(config.server_addr.port(), 7001);
        assert!(config.server_addr.ip().is_loopback());
    }
}
