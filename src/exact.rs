use std::time::Instant;

use log::debug;
use serde::Serialize;

use crate::cancel::CancelToken;
use crate::cosine::{Scored, TopK, dot, normalized};
use crate::error::{Error, Result};
use crate::metrics;
use crate::store::VectorStore;

/// 一条搜索结果
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Hit<'a, P> {
    pub id: usize,
    pub score: f32,
    pub payload: &'a P,
}

/// 把排好序的 ID 和分数附上 payload
pub(crate) fn to_hits<P>(store: &VectorStore<P>, scored: Vec<Scored>) -> Vec<Hit<'_, P>> {
    scored
        .into_iter()
        .map(|s| Hit { id: s.id, score: s.score, payload: store.payload(s.id) })
        .collect()
}

/// 暴力扫描整个存储，返回真实的 top-k
///
/// k 大于存储大小时返回全部记录
pub fn exact_search<'a, P>(
    store: &'a VectorStore<P>,
    query: &[f32],
    k: usize,
) -> Result<Vec<Hit<'a, P>>> {
    exact_search_with_cancel(store, query, k, &CancelToken::new())
}

pub fn exact_search_with_cancel<'a, P>(
    store: &'a VectorStore<P>,
    query: &[f32],
    k: usize,
    cancel: &CancelToken,
) -> Result<Vec<Hit<'a, P>>> {
    if k == 0 {
        return Err(Error::InvalidK);
    }
    let query = normalized(query, store.dimension())?;

    let start = Instant::now();
    let mut top = TopK::new(k.min(store.len()));
    for id in 0..store.len() {
        cancel.check()?;
        top.push(Scored { id, score: dot(&query, store.vector(id)) });
    }
    let elapsed = start.elapsed();
    debug!("精确搜索 {} 条记录，耗时 {:.2}ms", store.len(), elapsed.as_secs_f64() * 1000.);
    metrics::observe_search("exact", elapsed.as_secs_f64());

    Ok(to_hits(store, top.into_sorted_vec()))
}
