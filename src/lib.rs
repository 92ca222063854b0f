pub mod cancel;
pub mod cli;
pub mod collection;
pub mod config;
pub mod cosine;
pub mod error;
pub mod eval;
pub mod exact;
pub mod graph;
pub mod metrics;
pub mod snapshot;
pub mod store;
pub mod utils;

pub use cancel::CancelToken;
pub use collection::Collection;
pub use config::Opts;
pub use error::{Error, Result};
pub use eval::{EvalOptions, EvaluationReport, Embedder, PrecomputedEmbedder, evaluate};
pub use exact::{Hit, exact_search};
pub use graph::{BuildParams, GraphIndex, build_index};
pub use store::{DEFAULT_DIMENSION, ImagePayload, VectorStore, build_store};

/// 在已构建的索引上做近似搜索
pub fn approximate_search<'s, P>(
    index: &GraphIndex<'s, P>,
    query: &[f32],
    k: usize,
    ef_search: usize,
) -> Result<Vec<Hit<'s, P>>> {
    index.search(query, k, ef_search)
}
