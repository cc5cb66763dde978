// src/main.rs

//! # Anima Protocol - Command Line Entry Point
//!
//! Loads configuration and dispatches to the library services.
//!
//! ## Configuration
//! Read from `anima.toml` (or `--config <file>`) and `ANIMA_*` environment
//! variables; a `.env` file is loaded first.
//! - `ANIMA_PRIVATE_KEY`: issuer / verifier private key
//! - `ANIMA_RESPONDER_ADDRESS`: address the protocol signs its responses with
//! - `ANIMA_NETWORK`, `ANIMA_CHAIN`, `ANIMA_SECURE`: protocol endpoint selection

use anima_protocol::models::credential::IssueRequest;
use anima_protocol::settings::Settings;
use anima_protocol::transport::HttpConnector;
use anima_protocol::utils::crypto::hash;
use anima_protocol::utils::serialization::decode_base64;
use anima_protocol::{AuthorizationResolver, ChainRegistry, CredentialIssuer, GatewayContext};
use anyhow::Context;
use clap::{Parser, Subcommand};
use dotenv::dotenv;
use log::info;
use std::path::PathBuf;

/// Anima protocol client.
#[derive(Parser, Debug)]
#[command(name = "anima", version, about)]
struct Cli {
    /// Configuration file (defaults to ./anima.toml when present)
    #[arg(long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the content hash of a file.
    Hash { file: PathBuf },
    /// Print the address of the configured private key.
    Address,
    /// Verify an issuing authorization and print its decoded content.
    VerifyAuthorization {
        #[arg(long)]
        schema: String,
        /// base64 of the signed content
        #[arg(long)]
        content: String,
        #[arg(long)]
        signature: String,
    },
    /// Sign the credentials of an issuance request (JSON file) and submit it.
    Issue {
        request: PathBuf,
        /// Print the signed request instead of submitting it
        #[arg(long)]
        dry_run: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenv().ok();
    env_logger::init();

    let cli = Cli::parse();
    let settings = Settings::load(cli.config.as_deref()).context("failed to load configuration")?;

    match cli.command {
        Command::Hash { file } => {
            let content = std::fs::read(&file).with_context(|| format!("cannot read {}", file.display()))?;
            println!("{}", hash(&content));
        }
        Command::Address => {
            println!("{}", settings.signer()?.address());
        }
        Command::VerifyAuthorization {
            schema,
            content,
            signature,
        } => {
            let content = decode_base64(&content).context("authorization content is not base64")?;
            let chain = ChainRegistry::default().get(&settings.chain)?;
            let authorization =
                AuthorizationResolver::default().resolve(chain.as_ref(), &schema, &content, &signature)?;
            println!("{}", serde_json::to_string_pretty(&authorization)?);
        }
        Command::Issue { request, dry_run } => {
            let raw = std::fs::read(&request).with_context(|| format!("cannot read {}", request.display()))?;
            let request: IssueRequest = serde_json::from_slice(&raw).context("invalid issuance request")?;

            let signer = settings.signer()?;
            let issuer = settings.issuer(&signer);
            let protocol = settings.protocol()?;
            let issuer_service = CredentialIssuer::with_defaults();

            if dry_run {
                let signed = issuer_service.signer().sign(&protocol, &issuer, request, &signer).await?;
                println!("{}", serde_json::to_string_pretty(&signed)?);
                return Ok(());
            }

            let context = GatewayContext::new(HttpConnector);
            let signed = issuer_service
                .issue(&context, &protocol, &issuer, request, &signer)
                .await?;
            info!("issued resource {} to {}", signed.resource.id, protocol.network);
            println!("issued {} credentials", signed.attributes.len());
        }
    }

    Ok(())
}
