//! KyberLink command-line client.
//!
//! Sends one request through a gateway and prints the decrypted response.
//!
//! # Usage
//!
//! ```bash
//! # POST a JSON body to /test1 through the local gateway
//! kyberlink /test1 --data '{"x":1}'
//!
//! # GET through a remote gateway with a short timeout
//! kyberlink /status --method GET --gateway https://gw.example --timeout-secs 5
//! ```

use std::{
    io::{self, Write},
    time::Duration,
};

use clap::Parser;
use kyberlink_client::{ClientConfig, KyberLinkClient, ResponseBody};
use serde_json::Value;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// KyberLink client
#[derive(Parser, Debug)]
#[command(name = "kyberlink")]
#[command(about = "Send a request through a KyberLink gateway")]
#[command(version)]
struct Args {
    /// Backend API path, relative to the gateway's backend (e.g. /users)
    path: String,

    /// HTTP method for the backend request
    #[arg(short, long, default_value = "POST")]
    method: String,

    /// JSON body for the backend request
    #[arg(short, long, default_value = "null")]
    data: String,

    /// Gateway base URL (overrides KYBERLINK_GATEWAY_URL)
    #[arg(short, long)]
    gateway: Option<String>,

    /// Transport timeout in seconds (overrides KYBERLINK_TIMEOUT_SECS)
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
    timeout_secs: Option<u64>,

    /// Print the raw response message instead of the decrypted body
    #[arg(long)]
    envelope: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "warn")]
    log_level: String,
}

impl Args {
    /// Apply command-line overrides on top of `base`.
    fn client_config(&self, base: ClientConfig) -> ClientConfig {
        let mut config = base;
        if let Some(url) = &self.gateway {
            config = config.with_gateway_url(url.clone());
        }
        if let Some(secs) = self.timeout_secs {
            config = config.with_timeout(Duration::from_secs(secs));
        }
        config
    }

    fn body(&self) -> Result<Value, serde_json::Error> {
        serde_json::from_str(&self.data)
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    tracing_subscriber::registry().with(fmt::layer().with_writer(io::stderr)).with(filter).init();

    let config = args.client_config(ClientConfig::from_env()?);
    config.validate()?;
    let body = args.body()?;

    tracing::info!("Sending {} {} via {}", args.method, args.path, config.base_url());

    let client = KyberLinkClient::from_config(&config)?;
    let response = client.send(&args.path, &args.method, body).await?;

    let mut out = io::stdout().lock();
    if args.envelope {
        writeln!(out, "{}", response.original.to_json()?)?;
    } else {
        write_body(&mut out, &response.data)?;
    }

    Ok(())
}

fn write_body(out: &mut impl Write, body: &ResponseBody) -> io::Result<()> {
    match body {
        ResponseBody::Structured(value) => {
            let pretty = serde_json::to_string_pretty(value).map_err(io::Error::other)?;
            writeln!(out, "{pretty}")
        },
        ResponseBody::Raw(bytes) => {
            out.write_all(bytes)?;
            out.flush()
        },
    }
}
