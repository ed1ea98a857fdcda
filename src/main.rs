//! asp-justify CLI: inspect stored justification graphs.

use std::collections::HashSet;
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use miette::{IntoDiagnostic, Result};

use asp_justify::graph::query::{self, SearchHit};
use asp_justify::graph::{Node, ReasonGraph};
use asp_justify::store::GraphStore;
use asp_justify::symbol::NodeId;

#[derive(Parser)]
#[command(name = "asp-justify", version, about = "Inspect justification graphs of stable models")]
struct Cli {
    /// Node-link JSON document written by `GraphStore::save`.
    graph: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Node and edge counts, the fact node and the stable models.
    Summary,

    /// Show one snapshot with its atoms grouped by signature.
    Node {
        /// Node id, e.g. "node:7" or "7".
        id: NodeId,
    },

    /// Show why each new atom of a snapshot holds.
    Explain {
        /// Node id, e.g. "node:7" or "7".
        id: NodeId,
    },

    /// Search signatures, snapshots and rules.
    Search {
        text: String,

        /// Maximum number of hits.
        #[arg(long, default_value = "10")]
        limit: usize,
    },

    /// List the transformations labeling the edges.
    Transformations,

    /// List visible edges.
    Edges {
        /// Only show these nodes (comma-separated ids); hidden ones are bridged.
        #[arg(long, value_delimiter = ',')]
        shown: Option<Vec<NodeId>>,

        /// Also list the internal edges of these recursive nodes.
        #[arg(long, value_delimiter = ',')]
        expand: Vec<NodeId>,
    },
}

fn main() -> Result<()> {
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .unicode(true)
                .context_lines(3)
                .build(),
        )
    }))
    .ok(); // Ignore error if hook already set (e.g., in tests)

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let graph = GraphStore::new(&cli.graph).load().into_diagnostic()?;
    if graph.is_empty() {
        miette::bail!("no graph stored at {}", cli.graph.display());
    }

    match cli.command {
        Commands::Summary => {
            println!(
                "Graph: {} nodes, {} edges",
                graph.node_count(),
                graph.edge_count()
            );
            match query::fact_node(&graph) {
                Some(facts) => println!("Facts: {facts}"),
                None => println!("Facts: (no unique fact node)"),
            }
            let leaves = query::leaves(&graph);
            println!("Stable models ({}):", leaves.len());
            for leaf in leaves {
                println!("  {leaf}");
            }
        }

        Commands::Node { id } => {
            let node = find(&graph, id)?;
            let kind = query::node_kind(&graph, id)
                .map(|k| k.to_string())
                .unwrap_or_default();
            println!("{node}");
            println!("  kind: {kind}");
            println!("  recursive: {}", node.recursive.is_recursive());
            if let Some(groups) = query::atoms_by_signature(&graph, id) {
                for (signature, atoms) in groups {
                    let atoms: Vec<String> = atoms.iter().map(ToString::to_string).collect();
                    println!("  {signature}: {}", atoms.join(" "));
                }
            }
        }

        Commands::Explain { id } => {
            let node = find(&graph, id)?;
            if node.reason.is_empty() {
                println!("{node} derives nothing new.");
            }
            for (atom, reasons) in &node.reason {
                let reasons: Vec<String> = reasons
                    .iter()
                    .map(|r| match r.occurrence {
                        Some(occurrence) => format!("{r} [{occurrence}]"),
                        None => r.to_string(),
                    })
                    .collect();
                if reasons.is_empty() {
                    println!("  {atom} holds unconditionally");
                } else {
                    println!("  {atom} because {}", reasons.join(", "));
                }
            }
            if let Some(trace) = node.recursive.subgraph() {
                println!("Recursion trace ({} steps):", trace.edge_count());
                for inner in trace.topological_order() {
                    if let Some(n) = trace.node(inner) {
                        println!("  {n}");
                    }
                }
            }
        }

        Commands::Search { text, limit } => {
            let hits = query::search(&graph, &text, limit);
            if hits.is_empty() {
                println!("No matches for \"{text}\".");
            }
            for hit in hits {
                match hit {
                    SearchHit::Signature(s) => println!("  signature {s}"),
                    SearchHit::Node(id) => println!("  node {id}"),
                    SearchHit::Transformation(id) => println!("  transformation #{id}"),
                }
            }
        }

        Commands::Transformations => {
            for t in query::transformations(&graph) {
                println!("#{}:", t.id);
                for rule in t.rule_texts() {
                    println!("  {rule}");
                }
            }
        }

        Commands::Edges { shown, expand } => {
            let shown: Option<HashSet<NodeId>> = shown.map(|ids| ids.into_iter().collect());
            for (source, target) in query::visible_edges(&graph, shown.as_ref(), &expand) {
                println!("{source} -> {target}");
            }
        }
    }

    Ok(())
}

fn find(graph: &ReasonGraph, id: NodeId) -> Result<&Node> {
    query::find_node(graph, id).ok_or_else(|| miette::miette!("no node with id {id}"))
}
