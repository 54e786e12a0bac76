//! Provisioning helper: key generation and user creation.

use std::sync::Arc;

use clap::{Parser, Subcommand};
use rand::RngCore;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use zeroize::Zeroizing;

use pat_vault::{
    auth::{AuthService, CredentialSigner},
    config::Config,
    db,
    error::AppError,
};

#[derive(Parser)]
#[command(name = "vault-admin", version, about = "PAT vault administration")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print a fresh base64 encryption key for ENCRYPTION_KEY
    GenerateKey,
    /// Create a user account in the configured store
    CreateUser {
        #[arg(long)]
        username: String,
        /// Read from VAULT_ADMIN_PASSWORD when omitted
        #[arg(long, env = "VAULT_ADMIN_PASSWORD", hide_env_values = true)]
        password: String,
    },
}

#[tokio::main]
async fn main() -> Result<(), AppError> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn,pat_vault=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::GenerateKey => {
            let mut key = Zeroizing::new([0u8; 32]);
            rand::rngs::OsRng.fill_bytes(&mut key[..]);
            println!("{}", base64_simd::STANDARD.encode_to_string(&key[..]));
        }
        Command::CreateUser { username, password } => {
            let config = Config::from_env()?;
            let store = db::connect(&config).await?;

            let signer = CredentialSigner::new(config.signing_secret.clone());
            let auth = AuthService::new(Arc::clone(&store), signer)?;
            let user = auth.provision_user(&username, &password).await?;

            println!("✅ Created user {} (id {})", user.username, user.id);
        }
    }

    Ok(())
}
