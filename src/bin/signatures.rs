use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use signatures::*;

/// Canonical signatures for vertices and graphs
#[derive(Parser, Debug)]
#[command(name = "signatures")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Limit every vertex signature to this many layers below its root
    #[arg(long, global = true)]
    height: Option<usize>,

    /// Separator between the entries of the full signature string
    #[arg(long, global = true, default_value = " + ")]
    separator: String,

    /// One of error, warn, info, debug or trace
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Canonize every graph in a CSV file of `name,vertices,edges` rows and write the
    /// results to stdout
    Canonize {
        /// The CSV file to read
        csv: PathBuf,
    },
    /// Decode a signature string and rebuild the graph it describes
    Decode {
        /// The signature string, such as `[C]([C]([C,1])[C]([C,1]))`
        signature: String,
    },
}

fn canonize(csv: &Path, config: &SignatureConfig) -> Result<()> {
    let file = File::open(csv).with_context(|| format!("Failed to open {}", csv.display()))?;
    let records = read_graph_records(file);
    write_signatures(&records, config, io::stdout().lock())
        .with_context(|| format!("Failed to write signatures for {}", csv.display()))
}

fn decode(signature: &str) -> Result<()> {
    let tree = ColoredTree::parse(signature)
        .with_context(|| format!("Failed to decode signature {signature}"))?;
    let graph = tree.to_graph();
    println!(
        "tree: {} nodes, {} edges, height {}",
        tree.node_count(),
        tree.edge_count(),
        tree.height()
    );
    println!(
        "graph: {} vertices, {} edges",
        graph.vertex_count(),
        graph.edge_count()
    );
    println!(
        "canonical: {}",
        GraphSignature::new(&graph).to_canonical_string()
    );
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli.log_level);

    let config = SignatureConfig {
        height: cli.height,
        separator: cli.separator,
    };
    match cli.command {
        Command::Canonize { csv } => canonize(&csv, &config),
        Command::Decode { signature } => decode(&signature),
    }
}
