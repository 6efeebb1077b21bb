use tracing::level_filters::LevelFilter;

mod graph;
pub use graph::*;

mod invariants;
pub use invariants::*;

mod dag;
pub use dag::{Arc, Dag, Node, NodeId};

mod refine;
pub use refine::*;

mod vertex_signature;
pub use vertex_signature::*;

mod colored_tree;
pub use colored_tree::*;

mod parse;
pub use parse::*;

mod symmetry;
pub use symmetry::*;

mod quotient;
pub use quotient::*;

mod graph_signature;
pub use graph_signature::*;

mod batch;
pub use batch::*;

/// Opens the printed form of a vertex.
pub const START_NODE_SYMBOL: char = '[';
/// Closes the printed form of a vertex.
pub const END_NODE_SYMBOL: char = ']';
/// Opens the list of children below a vertex.
pub const START_BRANCH_SYMBOL: char = '(';
/// Closes the list of children below a vertex.
pub const END_BRANCH_SYMBOL: char = ')';
/// Separates a vertex symbol from its color tag.
pub const COLOR_SEPARATOR: char = ',';

/// Install a `tracing` subscriber at the given level ("error", "warn", "info", "debug", "trace").
///
/// Unknown levels fall back to `info`. Calling this more than once is harmless.
pub fn init_logging(level: &str) {
    let filter = level.parse::<LevelFilter>().unwrap_or(LevelFilter::INFO);
    let _ = tracing_subscriber::fmt()
        .with_max_level(filter)
        .with_target(false)
        .try_init();
}
