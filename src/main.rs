//! murmur: an interactive gossip overlay node.

use std::{
    io::{self, Write},
    path::{Path, PathBuf},
    process::ExitCode,
    time::Duration,
};

use anyhow::Result;
use clap::Parser;
use murmur::{
    config::{self, Config},
    message::{NeighborStatus, Payload, PeerKey},
    tcp::Node,
};
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};
use tracing::{error, warn};
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "murmur")]
#[command(about = "A peer node for a flat gossip overlay")]
struct Args {
    /// The address and port this node listens on and advertises, e.g. 127.0.0.1:6000
    address: PeerKey,

    /// Path to the neighbor seed file, one <address>:<port> per line
    neighbors: PathBuf,

    /// Path to the shared directory
    shared_dir: PathBuf,

    /// Bound on connecting, sending and receiving a message, in milliseconds
    #[arg(long, default_value_t = 3000)]
    timeout_ms: u64,

    /// Largest message accepted or sent, in bytes
    #[arg(long, default_value_t = config::MAX_MESSAGE_LEN)]
    max_message_len: usize,

    /// Maximum number of inbound connections handled concurrently (unbounded by default)
    #[arg(long)]
    max_connections: Option<usize>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

type Input = Lines<BufReader<Stdin>>;

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    let default_level = if args.verbose { "debug" } else { "info" };
    fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_target(false)
        .init();

    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args) -> Result<()> {
    // Configuration errors are fatal, nothing is started before both checks pass.
    let shared_dir = config::validate_shared_dir(&args.shared_dir)?;
    let seeds = config::load_seed_file(&args.neighbors)?;

    let config = Config {
        local_key: args.address,
        timeout: Duration::from_millis(args.timeout_ms),
        max_message_len: args.max_message_len,
        max_connections: args.max_connections,
    };

    let node = Node::new(config).await?;
    for key in seeds {
        node.add_peer_from_seed(key);
    }

    let mut input = BufReader::new(tokio::io::stdin()).lines();
    menu(&node, &shared_dir, &mut input).await;

    // BYE goes out however the menu ended.
    node.broadcast_to_status(NeighborStatus::Online, Payload::Bye).await;
    node.shut_down();
    println!("Leaving...");

    Ok(())
}

/// Runs the menu until the user exits or the input ends. Failures of a single command are
/// reported and the menu carries on.
async fn menu(node: &Node, shared_dir: &Path, input: &mut Input) {
    loop {
        print_menu();

        let choice = match input.next_line().await {
            Ok(Some(choice)) => choice,
            Ok(None) => break,
            Err(e) => {
                warn!("couldn't read from standard input: {e}");
                break;
            }
        };

        let result = match choice.trim() {
            "1" => list_peers(node, input).await,
            "2" => {
                node.broadcast_to_all(Payload::GetPeers).await;
                Ok(())
            }
            "3" => list_local_files(shared_dir).await,
            "4" | "5" | "6" => {
                println!("File search, statistics and chunk size aren't supported.");
                Ok(())
            }
            "9" => break,
            _ => {
                println!("Invalid option!");
                Ok(())
            }
        };

        if let Err(e) = result {
            error!("{e:#}");
        }
    }
}

fn prompt() {
    print!("> ");
    let _ = io::stdout().flush();
}

fn print_menu() {
    println!();
    println!("Choose a command:");
    println!("    [1] List peers");
    println!("    [2] Get peers");
    println!("    [3] List local files");
    println!("    [4] Search files");
    println!("    [5] Show statistics");
    println!("    [6] Change chunk size");
    println!("    [9] Exit");
    prompt();
}

async fn list_peers(node: &Node, input: &mut Input) -> Result<()> {
    let peers = node.neighbors().snapshot_with_meta();

    println!("Peer list:");
    println!("    [0] Back to the previous menu");
    for (i, (key, meta)) in peers.iter().enumerate() {
        println!(
            "    [{}] {} {} (updated {})",
            i + 1,
            key,
            meta.status,
            meta.updated_at.time()
        );
    }
    prompt();

    let Some(choice) = input.next_line().await? else {
        return Ok(());
    };

    match choice.trim().parse::<usize>() {
        Ok(0) => {}
        Ok(i) if i <= peers.len() => {
            node.send_to(&peers[i - 1].0, Payload::Hello).await;
        }
        Ok(_) => println!("Invalid option!"),
        Err(_) => println!("Invalid input, enter a number!"),
    }

    Ok(())
}

async fn list_local_files(shared_dir: &Path) -> Result<()> {
    let mut entries = tokio::fs::read_dir(shared_dir).await?;
    let mut names = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        names.push(entry.file_name().to_string_lossy().into_owned());
    }
    names.sort();

    if names.is_empty() {
        println!("No files found in the shared directory");
    }
    for name in names {
        println!("{name}");
    }

    Ok(())
}
