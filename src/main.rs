use clap::Parser;
use proxyauth::base::error::ConfigError;
use proxyauth::config::{ProcessEnvironment, RuntimeConfig};
use std::process::ExitCode;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Answer a desktop runtime's proxy authentication challenge once.
///
/// Properties can also be set as environment variables:
/// `runtime.version` is read from `PROXYAUTH_RUNTIME_VERSION`, and so on.
#[derive(Debug, Parser)]
#[command(name = "proxyauth", version)]
struct Cli {
    /// Set a property, e.g. `-D runtime.version=stable`. Repeatable.
    ///
    /// Known properties: runtime.version (required), proxy.location,
    /// proxy.username, proxy.password, runtime.host, runtime.port,
    /// runtime.launcher, connect.timeout, app.url.
    #[arg(short = 'D', value_name = "KEY=VALUE")]
    define: Vec<String>,

    /// Log filter used when RUST_LOG is not set.
    #[arg(long, value_name = "DIRECTIVE", default_value = "info")]
    log_filter: String,
}

fn init_tracing(fallback: &str) {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(fallback))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false))
        .with(env_filter)
        .init();
}

fn load_config(cli: &Cli) -> Result<RuntimeConfig, ConfigError> {
    let env = ProcessEnvironment::from_env().with_definitions(&cli.define)?;
    RuntimeConfig::from_environment(&env)
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(&cli.log_filter);

    let config = match load_config(&cli) {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("{}", e);
            return ExitCode::from(2);
        }
    };
    tracing::info!(
        version = %config.runtime_version,
        args = %config.extra_args,
        url = %config.websocket_url(),
        "Starting"
    );

    proxyauth::run(&config).await;
    ExitCode::SUCCESS
}
