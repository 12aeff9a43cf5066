//!
//! portcullis server binary
//! ------------------------
//! Command-line entry point for the guard demo server. Supports configuration
//! via CLI flags and environment variables; flags win.

use anyhow::Result;
use std::env;

use portcullis::config::{GuardConfig, DEFAULT_HTTP_PORT};

fn parse_port_arg(args: &[String], flag: &str) -> Option<u16> {
    parse_str_arg(args, flag).and_then(|v| v.parse::<u16>().ok())
}

fn parse_str_arg(args: &[String], flag: &str) -> Option<String> {
    let mut i = 0;
    while i < args.len() {
        if args[i] == flag
            && i + 1 < args.len() {
                return Some(args[i + 1].clone());
            }
        i += 1;
    }
    None
}

fn has_flag(args: &[String], flag: &str) -> bool {
    args.iter().any(|a| a == flag)
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing subscriber with env filter if provided
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();

    let args: Vec<String> = env::args().collect();

    if has_flag(&args, "--help") || has_flag(&args, "-h") {
        println!("portcullis Server\n\nUSAGE:\n  portcullis_server [--http-port N] [--claim-secret S] [--demo-token T]\n\nOPTIONS:\n  --http-port N       HTTP port (env: PORTCULLIS_HTTP_PORT, default {})\n  --claim-secret S    Claim cipher secret (env: PORTCULLIS_CLAIM_SECRET; required)\n  --demo-token T      Bearer token for the seeded demo admin (env: PORTCULLIS_DEMO_TOKEN; random if unset)\n", DEFAULT_HTTP_PORT);
        return Ok(());
    }

    // CLI arguments override environment
    let mut config = match parse_str_arg(&args, "--claim-secret") {
        Some(secret) => {
            let mut c = GuardConfig::new(secret);
            c.http_port = std::env::var("PORTCULLIS_HTTP_PORT")
                .ok()
                .and_then(|v| v.parse::<u16>().ok())
                .unwrap_or(DEFAULT_HTTP_PORT);
            c.demo_token = std::env::var("PORTCULLIS_DEMO_TOKEN")
                .ok()
                .filter(|v| !v.trim().is_empty());
            c
        }
        None => GuardConfig::from_env()?,
    };
    if let Some(port) = parse_port_arg(&args, "--http-port") {
        config.http_port = port;
    }
    if let Some(token) = parse_str_arg(&args, "--demo-token") {
        config.demo_token = Some(token);
    }

    portcullis::server::run_with_port(config).await
}
