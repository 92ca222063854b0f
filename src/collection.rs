use std::path::Path;

use indicatif::ProgressBar;
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::cancel::CancelToken;
use crate::error::{Error, Result};
use crate::eval::{EvalOptions, EvaluationReport, Embedder, evaluate};
use crate::exact::{Hit, exact_search_with_cancel};
use crate::graph::{BuildParams, Graph, GraphBuilder, GraphIndex, check_graph};
use crate::snapshot;
use crate::store::{ImagePayload, VectorRecord, VectorStore};

/// 一个向量集合：一份存储加上可选的已构建索引
///
/// 维度在创建时确定，相似度固定为余弦相似度。索引构建之后存储不能再修改，
/// 语料变化时需要创建新的集合重新构建。
#[derive(Debug, Clone)]
pub struct Collection<P = ImagePayload> {
    store: VectorStore<P>,
    graph: Option<Graph>,
}

impl<P> Collection<P> {
    pub fn new(dimension: usize) -> Result<Self> {
        Ok(Self::from_store(VectorStore::new(dimension)?))
    }

    pub fn from_store(store: VectorStore<P>) -> Self {
        Self { store, graph: None }
    }

    pub fn store(&self) -> &VectorStore<P> {
        &self.store
    }

    pub fn is_indexed(&self) -> bool {
        self.graph.is_some()
    }

    pub fn add(&mut self, vector: &[f32], payload: P) -> Result<usize> {
        if self.graph.is_some() {
            return Err(Error::StoreFrozen);
        }
        self.store.add(vector, payload)
    }

    pub fn get(&self, id: usize) -> Result<VectorRecord<'_, P>> {
        self.store.get(id)
    }

    /// 构建索引，已有索引时会被替换；失败时保持原状
    pub fn build_index(
        &mut self,
        params: BuildParams,
        cancel: &CancelToken,
        progress: ProgressBar,
    ) -> Result<()> {
        let graph = GraphBuilder::new(&self.store, params)
            .cancel(cancel.clone())
            .progress(progress)
            .build()?
            .into_graph();
        self.graph = Some(graph);
        Ok(())
    }

    pub fn index(&self) -> Result<GraphIndex<'_, P>> {
        match &self.graph {
            Some(graph) => Ok(GraphIndex::borrowed(&self.store, graph)),
            None => Err(Error::IndexNotBuilt),
        }
    }

    pub fn search(&self, query: &[f32], k: usize, ef_search: usize) -> Result<Vec<Hit<'_, P>>> {
        self.index()?.search(query, k, ef_search)
    }

    pub fn exact_search(
        &self,
        query: &[f32],
        k: usize,
        cancel: &CancelToken,
    ) -> Result<Vec<Hit<'_, P>>> {
        exact_search_with_cancel(&self.store, query, k, cancel)
    }

    pub fn evaluate<E: Embedder + ?Sized>(
        &self,
        queries: &[String],
        embedder: &E,
        options: EvalOptions,
    ) -> Result<EvaluationReport<P>>
    where
        P: Clone + Send + Sync,
    {
        evaluate(&self.index()?, &self.store, queries, embedder, options)
    }
}

impl<P: Serialize + DeserializeOwned> Collection<P> {
    /// 打开集合，索引文件不存在时集合处于未索引状态
    pub fn open(store_path: impl AsRef<Path>, index_path: impl AsRef<Path>) -> Result<Self> {
        let store = snapshot::load_store(store_path)?;
        let index_path = index_path.as_ref();
        let graph = if index_path.exists() {
            let graph = snapshot::load_graph(&store, index_path)?;
            check_graph(&store, &graph)?;
            Some(graph)
        } else {
            None
        };
        Ok(Self { store, graph })
    }

    pub fn save(&self, store_path: impl AsRef<Path>, index_path: impl AsRef<Path>) -> Result<()> {
        snapshot::save_store(&self.store, store_path)?;
        if self.graph.is_some() {
            snapshot::save_index(&self.index()?, index_path)?;
        }
        Ok(())
    }
}
