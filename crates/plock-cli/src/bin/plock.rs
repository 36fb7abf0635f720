//! Plockchain client - key management, project hashing and record deployment

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use plock_node::{deploy, ClientConfig};
use plock_record::project::{project_root, DirectoryLister};
use plock_record::signer::{Ed25519Signer, KeyDerivation, Signer};
use plock_record::Metadata;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "plock")]
#[command(about = "Plockchain client - sign and submit deployment records")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a new mnemonic phrase and print its address
    Keygen {
        /// How the key is derived from the phrase
        #[arg(long, value_enum, default_value_t = Derivation::Custom)]
        derivation: Derivation,
    },
    /// Print the address belonging to a mnemonic phrase
    Address {
        #[arg(long, env = "PLOCK_MNEMONIC", hide_env_values = true)]
        mnemonic: String,

        #[arg(long, value_enum, default_value_t = Derivation::Custom)]
        derivation: Derivation,
    },
    /// Print the Merkle root of a project directory
    Root {
        /// Project directory
        #[arg(default_value = ".")]
        path: PathBuf,
    },
    /// Sign a deployment record for a project and submit it
    Deploy(DeployArgs),
}

#[derive(clap::Args)]
struct DeployArgs {
    /// Project directory
    #[arg(long, default_value = ".")]
    path: PathBuf,

    /// Mnemonic phrase of the deploying identity
    #[arg(long, env = "PLOCK_MNEMONIC", hide_env_values = true)]
    mnemonic: String,

    #[arg(long, value_enum, default_value_t = Derivation::Custom)]
    derivation: Derivation,

    #[arg(long)]
    author: String,

    #[arg(long)]
    contact_info: String,

    #[arg(long)]
    software_name: String,

    /// Version of the deployed software
    #[arg(long = "software-version")]
    software_version: String,

    #[arg(long)]
    commit_hash: String,

    #[arg(long)]
    repository_url: String,

    /// Deployment time as ISO-8601; defaults to now in local time
    #[arg(long)]
    timestamp: Option<String>,

    /// Service address, overriding PLOCK_SERVICE_ADDRESS
    #[arg(long)]
    service: Option<String>,
}

#[derive(Clone, Copy, ValueEnum)]
enum Derivation {
    /// Seed bytes used directly as the secret key
    Custom,
    /// Seed restored as a wallet keypair
    Platform,
}

impl Derivation {
    fn with_phrase(self, phrase: String) -> KeyDerivation {
        match self {
            Derivation::Custom => KeyDerivation::MnemonicCustom(phrase),
            Derivation::Platform => KeyDerivation::MnemonicPlatform(phrase),
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    plock_cli::init_tracing();

    match cli.command {
        Commands::Keygen { derivation } => {
            let phrase = Ed25519Signer::generate_mnemonic()?;
            let signer = Ed25519Signer::derive(derivation.with_phrase(phrase.clone()))?;
            println!("mnemonic: {}", phrase);
            println!("address:  {}", signer.address());
        }
        Commands::Address {
            mnemonic,
            derivation,
        } => {
            let signer = Ed25519Signer::derive(derivation.with_phrase(mnemonic))
                .context("invalid mnemonic")?;
            println!("{}", signer.address());
        }
        Commands::Root { path } => {
            let (root, files) = project_root(&DirectoryLister, &path)
                .with_context(|| format!("cannot hash project at {}", path.display()))?;
            for file in &files {
                println!("{}", file.relative_path);
            }
            println!("merkle root: {}", root);
        }
        Commands::Deploy(args) => run_deploy(args).await?,
    }

    Ok(())
}

async fn run_deploy(args: DeployArgs) -> anyhow::Result<()> {
    let mut config = ClientConfig::from_env()?;
    if let Some(service) = args.service {
        config.service_address = service;
    }

    let timestamp = args
        .timestamp
        .unwrap_or_else(|| chrono::Local::now().format("%Y-%m-%dT%H:%M:%S").to_string());

    let metadata = Metadata {
        author: args.author,
        contact_info: args.contact_info,
        software_name: args.software_name,
        version: args.software_version,
        commit_hash: args.commit_hash,
        repository_url: args.repository_url,
        timestamp,
    };

    let receipt = deploy(
        &config,
        args.derivation.with_phrase(args.mnemonic),
        &DirectoryLister,
        &args.path,
        metadata,
    )
    .await?;

    println!("deployed to {}", config.service_address);
    println!("address:     {}", receipt.address);
    println!("merkle root: {}", receipt.merkle_root);
    println!("files:       {}", receipt.files);
    Ok(())
}
