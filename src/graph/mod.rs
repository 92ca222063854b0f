//! 单层近邻图索引
//!
//! 记录按存储顺序逐条插入：从入口节点出发做贪心束搜索，收集最多 `ef_construct` 个候选，
//! 取最相似的 `m` 个建立双向边；邻居的边数超过 `m` 时只保留与它最相似的 `m` 条。
//! 插入顺序和参数固定时，得到的图是确定的。

mod node;
mod visited;

use std::borrow::Cow;
use std::cmp::Reverse;
use std::collections::BinaryHeap;
use std::time::Instant;

use indicatif::ProgressBar;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

pub use self::node::{Neighbors, Node};
use self::visited::VisitedGuard;
use crate::cancel::CancelToken;
use crate::cosine::{Scored, TopK, dot, normalized};
use crate::error::{Error, Result};
use crate::exact::{Hit, to_hits};
use crate::metrics;
use crate::store::VectorStore;

/// 入口节点固定为第一条记录
const ENTRY_POINT: usize = 0;

/// 索引构建参数
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildParams {
    /// 每个节点最多保留的邻居数量
    ///
    /// m 很小（例如 1）时裁剪会把图切成许多短链，束搜索可能在找满 k 个结果之前耗尽可达节点，
    /// 此时返回的结果少于 k 个。
    pub m: usize,
    /// 插入节点时候选列表的大小
    pub ef_construct: usize,
}

impl Default for BuildParams {
    fn default() -> Self {
        Self { m: 16, ef_construct: 100 }
    }
}

impl BuildParams {
    pub fn new(m: usize, ef_construct: usize) -> Self {
        Self { m, ef_construct }
    }
}

/// 构建完成的图结构，不包含向量数据
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Graph {
    pub params: BuildParams,
    pub dimension: usize,
    pub nodes: Vec<Node>,
}

impl Graph {
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn stats(&self) -> GraphStats {
        let degrees = self.nodes.iter().map(Node::degree);
        let edges = degrees.clone().sum::<usize>();
        GraphStats {
            nodes: self.nodes.len(),
            edges,
            min_degree: degrees.clone().min().unwrap_or(0),
            max_degree: degrees.max().unwrap_or(0),
            mean_degree: edges as f64 / self.nodes.len().max(1) as f64,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct GraphStats {
    pub nodes: usize,
    /// 有向边数量
    pub edges: usize,
    pub min_degree: usize,
    pub max_degree: usize,
    pub mean_degree: f64,
}

/// 图索引，借用存储中的向量
///
/// 搜索只读取索引和存储，可以在多个线程中并发执行。
#[derive(Debug)]
pub struct GraphIndex<'s, P> {
    store: &'s VectorStore<P>,
    graph: Cow<'s, Graph>,
}

impl<'s, P> GraphIndex<'s, P> {
    /// 把已有的图绑定到存储上，图必须是由同一个存储构建的
    pub fn from_graph(store: &'s VectorStore<P>, graph: Graph) -> Result<Self> {
        check_graph(store, &graph)?;
        Ok(Self { store, graph: Cow::Owned(graph) })
    }

    /// 调用方需要保证图是由这个存储构建的
    pub(crate) fn borrowed(store: &'s VectorStore<P>, graph: &'s Graph) -> Self {
        Self { store, graph: Cow::Borrowed(graph) }
    }

    pub fn store(&self) -> &'s VectorStore<P> {
        self.store
    }

    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    pub fn into_graph(self) -> Graph {
        self.graph.into_owned()
    }

    pub fn params(&self) -> BuildParams {
        self.graph.params
    }

    pub fn len(&self) -> usize {
        self.graph.len()
    }

    pub fn is_empty(&self) -> bool {
        self.graph.is_empty()
    }

    /// 近似搜索最相似的 k 条记录
    ///
    /// `ef_search` 至少会取到 k；k 超过记录数时取记录数。
    /// 候选列表大小达到记录数时直接遍历所有节点，结果与精确搜索一致。
    pub fn search(&self, query: &[f32], k: usize, ef_search: usize) -> Result<Vec<Hit<'s, P>>> {
        if k == 0 {
            return Err(Error::InvalidK);
        }
        let query = normalized(query, self.store.dimension())?;

        let start = Instant::now();
        let n = self.graph.len();
        let k = k.min(n);
        let ef = ef_search.max(k);
        let scored = if ef >= n {
            let mut top = TopK::new(k);
            top.extend((0..n).map(|id| Scored { id, score: dot(&query, self.store.vector(id)) }));
            top.into_sorted_vec()
        } else {
            let mut scored = beam_search(self.store, &self.graph.nodes, &query, ef);
            scored.truncate(k);
            scored
        };
        metrics::observe_search("approximate", start.elapsed().as_secs_f64());

        Ok(to_hits(self.store, scored))
    }
}

/// 检查图能否与存储配合使用：节点数、维度一致，且所有边都指向已有节点
pub(crate) fn check_graph<P>(store: &VectorStore<P>, graph: &Graph) -> Result<()> {
    store.validate()?;
    if graph.is_empty() {
        return Err(Error::EmptyCorpus);
    }
    if graph.dimension != store.dimension() || graph.len() != store.len() {
        return Err(Error::SnapshotMismatch);
    }
    if graph.nodes.iter().flat_map(|n| &n.neighbors).any(|&id| id >= graph.len()) {
        return Err(Error::SnapshotMismatch);
    }
    Ok(())
}

/// 从入口节点出发的贪心束搜索，返回按结果顺序排列的最多 ef 个候选
///
/// `nodes` 可以只是图的前缀（构建过程中），向量从 `store` 中按下标读取。
fn beam_search<P>(
    store: &VectorStore<P>,
    nodes: &[Node],
    query: &[f32],
    ef: usize,
) -> Vec<Scored> {
    let mut visited = VisitedGuard::new(nodes.len());
    // 待扩展的候选，堆顶是最好的
    let mut candidates = BinaryHeap::with_capacity(ef);
    // 当前结果，堆顶是最差的
    let mut results: BinaryHeap<Reverse<Scored>> = BinaryHeap::with_capacity(ef + 1);

    let entry = Scored { id: ENTRY_POINT, score: dot(query, store.vector(ENTRY_POINT)) };
    visited.visit(ENTRY_POINT);
    candidates.push(entry);
    results.push(Reverse(entry));

    while let Some(current) = candidates.pop() {
        let exhausted =
            results.len() >= ef && results.peek().is_some_and(|Reverse(worst)| current < *worst);
        if exhausted {
            break;
        }

        for &id in &nodes[current.id].neighbors {
            if visited.is_visited(id) {
                continue;
            }
            visited.visit(id);

            let s = Scored { id, score: dot(query, store.vector(id)) };
            let promising =
                results.len() < ef || results.peek().is_some_and(|Reverse(worst)| s > *worst);
            if promising {
                candidates.push(s);
                results.push(Reverse(s));
                if results.len() > ef {
                    results.pop();
                }
            }
        }
    }

    results.into_sorted_vec().into_iter().map(|Reverse(s)| s).collect()
}

/// 索引构建器
pub struct GraphBuilder<'s, P> {
    store: &'s VectorStore<P>,
    params: BuildParams,
    cancel: CancelToken,
    progress: ProgressBar,
}

impl<'s, P> GraphBuilder<'s, P> {
    pub fn new(store: &'s VectorStore<P>, params: BuildParams) -> Self {
        Self { store, params, cancel: CancelToken::new(), progress: ProgressBar::hidden() }
    }

    pub fn cancel(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn progress(mut self, progress: ProgressBar) -> Self {
        self.progress = progress;
        self
    }

    pub fn build(self) -> Result<GraphIndex<'s, P>> {
        let store = self.store;
        if store.is_empty() {
            return Err(Error::EmptyCorpus);
        }
        store.validate()?;

        let BuildParams { m, ef_construct } = self.params;
        if m == 0 || ef_construct == 0 {
            warn!("m 和 ef_construct 必须为正数，将按 1 处理");
        }
        let (m, ef) = (m.max(1), ef_construct.max(1));
        if ef < m {
            debug!("ef_construct = {ef} 小于 m = {m}，召回率可能较低");
        }

        info!("开始构建索引：{} 条记录，m = {m}，ef_construct = {ef}", store.len());
        let start = Instant::now();
        self.progress.set_length(store.len() as u64);

        let mut nodes: Vec<Node> = Vec::with_capacity(store.len());
        for id in 0..store.len() {
            self.cancel.check()?;
            if id == ENTRY_POINT {
                nodes.push(Node::default());
                self.progress.inc(1);
                continue;
            }

            let vector = store.vector(id);
            let selected: Neighbors =
                beam_search(store, &nodes, vector, ef).into_iter().take(m).map(|s| s.id).collect();
            for &nb in &selected {
                connect(store, &mut nodes[nb], nb, id, m);
            }
            nodes.push(Node::new(selected));
            self.progress.inc(1);
        }
        self.progress.finish();

        let elapsed = start.elapsed();
        metrics::observe_build(elapsed.as_secs_f64());
        info!("索引构建完成，耗时 {:.2}s", elapsed.as_secs_f32());

        let graph = Graph { params: self.params, dimension: store.dimension(), nodes };
        Ok(GraphIndex { store, graph: Cow::Owned(graph) })
    }
}

/// 给节点 `owner` 添加指向 `new` 的边，超出 m 条时保留最相似的 m 条
fn connect<P>(store: &VectorStore<P>, owner: &mut Node, owner_id: usize, new: usize, m: usize) {
    if !owner.add_neighbor(new) || owner.degree() <= m {
        return;
    }
    let base = store.vector(owner_id);
    let mut scored: Vec<Scored> = owner
        .neighbors
        .iter()
        .map(|&id| Scored { id, score: dot(base, store.vector(id)) })
        .collect();
    scored.sort_unstable_by(|a, b| b.cmp(a));
    owner.neighbors = scored.into_iter().take(m).map(|s| s.id).collect();
}

/// 使用默认的构建选项（不显示进度，不可取消）构建索引
pub fn build_index<P>(store: &VectorStore<P>, params: BuildParams) -> Result<GraphIndex<'_, P>> {
    GraphBuilder::new(store, params).build()
}

pub fn build_index_with_cancel<'s, P>(
    store: &'s VectorStore<P>,
    params: BuildParams,
    cancel: &CancelToken,
) -> Result<GraphIndex<'s, P>> {
    GraphBuilder::new(store, params).cancel(cancel.clone()).build()
}
