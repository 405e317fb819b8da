use anyhow::Result;
use clap::{Parser, Subcommand};
use http::{HeaderMap, HeaderValue, header};
use tracing::{Level, info};
use tracing_subscriber::EnvFilter;

use saas_gate::{EnvReport, Gate, GateConfig, GateRequest, start_gate_http};

#[derive(Parser)]
#[command(name = "saas-gate")]
#[command(about = "Locale, session and access gate for a SaaS web app")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the gated HTTP router
    Serve {
        /// Bind address, e.g. 0.0.0.0:3000
        #[arg(long, default_value = "127.0.0.1:3000", env = "GATE_BIND")]
        bind: String,
    },
    /// Validate the deployment environment
    CheckEnv,
    /// Print the gate's verdict for a request without serving it
    Decide {
        /// Request path, e.g. /zh/dashboard
        path: String,
        #[arg(long)]
        query: Option<String>,
        #[arg(long)]
        accept_language: Option<String>,
        /// Raw Cookie header
        #[arg(long)]
        cookie: Option<String>,
        /// Bearer token, without the scheme
        #[arg(long)]
        bearer: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("saas_gate=info".parse()?))
        .with_max_level(Level::INFO)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Serve { bind } => {
            let config = GateConfig::load()?;
            info!("Starting gate on {}", bind);
            start_gate_http(config, &bind).await?;
        }
        Commands::CheckEnv => {
            let report = EnvReport::from_process_env();
            print!("{}", report.render());
            if report.has_errors() {
                std::process::exit(1);
            }
        }
        Commands::Decide {
            path,
            query,
            accept_language,
            cookie,
            bearer,
        } => {
            let config = GateConfig::load()?;
            let gate = Gate::new(&config)?;

            let mut headers = HeaderMap::new();
            if let Some(lang) = accept_language {
                headers.insert(header::ACCEPT_LANGUAGE, HeaderValue::from_str(&lang)?);
            }
            if let Some(cookie) = cookie {
                headers.insert(header::COOKIE, HeaderValue::from_str(&cookie)?);
            }
            if let Some(token) = bearer {
                headers.insert(
                    header::AUTHORIZATION,
                    HeaderValue::from_str(&format!("Bearer {}", token))?,
                );
            }

            let verdict = gate.evaluate(&GateRequest::new(&path, query.as_deref(), &headers));
            println!("{}", serde_json::to_string_pretty(&verdict)?);
        }
    }

    Ok(())
}
