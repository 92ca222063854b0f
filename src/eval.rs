//! 近似搜索相对精确搜索的 precision@k 评估
//!
//! 这里衡量的是近似索引对精确结果的还原程度，而不是结果与查询语义的真实相关性。

use std::collections::HashMap;

use log::{debug, info};
use rayon::prelude::*;
use serde::Serialize;

use crate::error::{BoxError, Error, Result};
use crate::exact::exact_search;
use crate::graph::GraphIndex;
use crate::metrics;
use crate::store::VectorStore;

/// 文本到向量的嵌入函数，由调用方提供
pub trait Embedder: Sync {
    fn embed(&self, text: &str) -> Result<Vec<f32>, BoxError>;
}

impl<F> Embedder for F
where
    F: Fn(&str) -> Result<Vec<f32>, BoxError> + Sync,
{
    fn embed(&self, text: &str) -> Result<Vec<f32>, BoxError> {
        self(text)
    }
}

/// 预先计算好的查询向量，按查询文本查找
#[derive(Debug, Default, Clone)]
pub struct PrecomputedEmbedder {
    vectors: HashMap<String, Vec<f32>>,
}

impl PrecomputedEmbedder {
    pub fn new(pairs: impl IntoIterator<Item = (String, Vec<f32>)>) -> Self {
        Self { vectors: pairs.into_iter().collect() }
    }

    pub fn len(&self) -> usize {
        self.vectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vectors.is_empty()
    }
}

impl Embedder for PrecomputedEmbedder {
    fn embed(&self, text: &str) -> Result<Vec<f32>, BoxError> {
        self.vectors.get(text).cloned().ok_or_else(|| format!("没有查询 {text:?} 的向量").into())
    }
}

#[derive(Debug, Clone, Copy)]
pub struct EvalOptions {
    /// 每个查询比较的结果数量
    pub k: usize,
    /// 近似搜索的候选列表大小
    pub ef_search: usize,
}

impl Default for EvalOptions {
    fn default() -> Self {
        Self { k: 30, ef_search: 64 }
    }
}

/// 单个查询的评估结果
#[derive(Debug, Clone, Serialize)]
pub struct QueryEvaluation<P> {
    pub query: String,
    /// 近似搜索结果 ID，按排名顺序
    pub approximate: Vec<usize>,
    /// 精确搜索结果 ID，按排名顺序
    pub exact: Vec<usize>,
    /// 两者的交集，升序
    pub overlap: Vec<usize>,
    /// 交集对应的 payload，与 overlap 一一对应
    pub payloads: Vec<P>,
    pub precision: f64,
}

/// 整体评估结果
#[derive(Debug, Clone, Serialize)]
pub struct EvaluationReport<P> {
    /// 实际使用的 k（不超过记录数）
    pub k: usize,
    pub mean_precision: f64,
    pub queries: Vec<QueryEvaluation<P>>,
}

/// 有序 ID 列表求交集
fn sorted_intersection(a: &[usize], b: &[usize]) -> Vec<usize> {
    let (mut i, mut j) = (0, 0);
    let mut out = Vec::with_capacity(a.len().min(b.len()));
    while i < a.len() && j < b.len() {
        match a[i].cmp(&b[j]) {
            std::cmp::Ordering::Less => i += 1,
            std::cmp::Ordering::Greater => j += 1,
            std::cmp::Ordering::Equal => {
                out.push(a[i]);
                i += 1;
                j += 1;
            }
        }
    }
    out
}

fn sorted_ids(ids: &[usize]) -> Vec<usize> {
    let mut ids = ids.to_vec();
    ids.sort_unstable();
    ids
}

/// 所有查询 precision 的算术平均
pub fn mean_precision(values: &[f64]) -> Result<f64> {
    if values.is_empty() {
        return Err(Error::EmptyQuerySet);
    }
    Ok(values.iter().sum::<f64>() / values.len() as f64)
}

/// 对每个查询分别执行近似搜索和精确搜索，计算 precision@k
///
/// precision 的分母是实际使用的 k，即 `min(k, 记录数)`。查询并行执行，结果保持输入顺序。
/// `store` 必须是构建 `index` 时使用的那个存储，否则返回 `SnapshotMismatch`。
pub fn evaluate<P, E>(
    index: &GraphIndex<'_, P>,
    store: &VectorStore<P>,
    queries: &[String],
    embedder: &E,
    options: EvalOptions,
) -> Result<EvaluationReport<P>>
where
    P: Clone + Send + Sync,
    E: Embedder + ?Sized,
{
    if !std::ptr::eq(index.store(), store) {
        return Err(Error::SnapshotMismatch);
    }
    if queries.is_empty() {
        return Err(Error::EmptyQuerySet);
    }
    if options.k == 0 {
        return Err(Error::InvalidK);
    }
    let k = options.k.min(store.len());
    info!("评估 {} 个查询，k = {k}，ef_search = {}", queries.len(), options.ef_search);

    let results = queries
        .par_iter()
        .map(|query| {
            let vector = embedder
                .embed(query)
                .map_err(|source| Error::Embedding { query: query.clone(), source })?;

            let approximate: Vec<usize> =
                index.search(&vector, k, options.ef_search)?.iter().map(|h| h.id).collect();
            let exact: Vec<usize> =
                exact_search(store, &vector, k)?.iter().map(|h| h.id).collect();

            let overlap = sorted_intersection(&sorted_ids(&approximate), &sorted_ids(&exact));
            let precision = overlap.len() as f64 / k as f64;
            debug!("{query:?}: precision@{k} = {precision:.3}");

            let payloads = overlap.iter().map(|&id| store.get(id).map(|r| r.payload.clone()));
            let payloads = payloads.collect::<Result<Vec<_>>>()?;

            Ok(QueryEvaluation {
                query: query.clone(),
                approximate,
                exact,
                overlap,
                payloads,
                precision,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    let precisions: Vec<f64> = results.iter().map(|r| r.precision).collect();
    let mean_precision = mean_precision(&precisions)?;
    metrics::set_eval_precision(mean_precision);
    info!("平均 precision@{k} = {mean_precision:.4}");

    Ok(EvaluationReport { k, mean_precision, queries: results })
}
