use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use tracing::{debug, error, info, Level};
use tracing_subscriber::FmtSubscriber;

mod cli;

use aureus_node::{generate_sample_config, Event, Node, NodeConfig};
use aureus_store::{ChunkStore, FileStorage};
use cli::{Cli, Commands};

#[tokio::main]
async fn main() -> Result<()> {
    let _subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .with_target(false)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run { config } => {
            run_node(config).await?;
        }
        Commands::Init { output } => {
            init_config(output)?;
        }
        Commands::Keygen { output } => {
            generate_keypair(output)?;
        }
        Commands::Verify { file } => {
            verify_operation(file)?;
        }
        Commands::Chunks { config } => {
            list_chunks(config)?;
        }
    }

    Ok(())
}

/// Run an Aureus node
async fn run_node(config_path: PathBuf) -> Result<()> {
    info!("Loading configuration from {:?}", config_path);

    if !config_path.exists() {
        error!(
            "Configuration file not found: {:?}. Run 'aureus init' to create one.",
            config_path
        );
        return Err(anyhow::anyhow!("Configuration file not found"));
    }
    let config = NodeConfig::load(&config_path)?;

    let storage = FileStorage::new(config.data_dir.join("ledger.json"))?;
    let (event_tx, event_rx) = tokio::sync::mpsc::unbounded_channel();
    let (outbound_tx, mut outbound_rx) = tokio::sync::mpsc::unbounded_channel();

    let node = Node::new(&config, storage, outbound_tx)?;

    // Timer ticks are events like any other
    let ticker_tx = event_tx.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_millis(100));
        loop {
            interval.tick().await;
            if ticker_tx.send(Event::Tick).is_err() {
                break;
            }
        }
    });

    // Outbound messages belong to the transport collaborator; without one
    // configured we just drain and log them.
    tokio::spawn(async move {
        while let Some(signed) = outbound_rx.recv().await {
            debug!("outbound message from {:?}", signed.signer);
        }
    });

    node.run(event_rx).await
}

/// Initialize a new configuration file
fn init_config(output: PathBuf) -> Result<()> {
    info!("Generating sample configuration");

    let config = generate_sample_config();
    config.save(&output)?;

    println!("Configuration file created: {}", output.display());
    println!("Edit the file to configure your quorum slice.");
    println!("\nTo start the node, run:");
    println!("  aureus run --config {}", output.display());

    Ok(())
}

/// Generate a new keypair
fn generate_keypair(output: Option<PathBuf>) -> Result<()> {
    let keypair = aureus_core::KeyPair::generate();

    println!("Generated new keypair:");
    println!("  Address:     {}", keypair.address());
    println!("  Secret key:  {}", keypair.secret.to_hex());

    if let Some(path) = output {
        std::fs::write(&path, keypair.secret.to_hex())?;
        info!("Secret key saved to {:?}", path);
    }

    println!("\nWARNING: Keep your secret key safe! Do not share it with anyone.");

    Ok(())
}

/// Verify a signed operation file and print its fingerprint
fn verify_operation(file: PathBuf) -> Result<()> {
    let content = std::fs::read_to_string(&file)?;
    let operation: aureus_core::SignedOperation = serde_json::from_str(&content)?;

    if operation.verify() {
        println!("Signature: OK");
        println!("Signer:    {}", operation.operation.signer());
        println!("Sequence:  {}", operation.operation.sequence());
        println!("Fee:       {}", operation.operation.fee());
        println!("Digest:    {}", operation.fingerprint()?);
    } else {
        error!("Signature verification failed");
        return Err(anyhow::anyhow!("invalid signed operation"));
    }

    Ok(())
}

/// List stored chunks, recomputing each hash against its stored digest
fn list_chunks(config_path: PathBuf) -> Result<()> {
    let config = NodeConfig::load(&config_path)?;
    let storage = FileStorage::new(config.data_dir.join("ledger.json"))?;
    let store = ChunkStore::new(storage);

    let chunks = store.load_all()?;
    if chunks.is_empty() {
        println!("No chunks stored.");
        return Ok(());
    }
    for (slot, chunk) in chunks {
        println!(
            "slot {:>6}  txs {:>4}  accounts {:>4}  {}",
            slot,
            chunk.transactions.len(),
            chunk.state.len(),
            chunk.hash()?
        );
    }

    Ok(())
}
