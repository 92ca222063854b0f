//! 存储和索引的快照文件
//!
//! 写入时先写临时文件再重命名，避免留下写了一半的快照。

use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use log::debug;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::graph::{Graph, GraphIndex};
use crate::store::VectorStore;

#[derive(Serialize, Deserialize)]
struct GraphSnapshot<G = Graph> {
    /// 构建索引时存储内容的摘要
    store_digest: [u8; 32],
    graph: G,
}

fn write_atomic<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let tmp_file = path.with_extension("tmp");
    {
        let mut writer = BufWriter::new(File::create(&tmp_file)?);
        bincode::serialize_into(&mut writer, value)?;
        writer.flush()?;
    }
    fs::rename(&tmp_file, path)?;
    debug!("已写入 {}", path.display());
    Ok(())
}

fn read<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let reader = BufReader::new(File::open(path)?);
    Ok(bincode::deserialize_from(reader)?)
}

pub fn save_store<P: Serialize>(store: &VectorStore<P>, path: impl AsRef<Path>) -> Result<()> {
    write_atomic(path.as_ref(), store)
}

pub fn load_store<P: DeserializeOwned>(path: impl AsRef<Path>) -> Result<VectorStore<P>> {
    let store: VectorStore<P> = read(path.as_ref())?;
    store.validate()?;
    Ok(store)
}

pub fn save_index<P: Serialize>(index: &GraphIndex<'_, P>, path: impl AsRef<Path>) -> Result<()> {
    let snapshot = GraphSnapshot {
        store_digest: *index.store().digest()?.as_bytes(),
        graph: index.graph(),
    };
    write_atomic(path.as_ref(), &snapshot)
}

/// 读取索引快照中的图，存储内容与构建时不同会返回 `SnapshotMismatch`
pub fn load_graph<P: Serialize>(store: &VectorStore<P>, path: impl AsRef<Path>) -> Result<Graph> {
    let snapshot: GraphSnapshot = read(path.as_ref())?;
    if snapshot.store_digest != *store.digest()?.as_bytes() {
        return Err(Error::SnapshotMismatch);
    }
    Ok(snapshot.graph)
}

/// 加载索引并绑定到存储上
pub fn load_index<'s, P: Serialize>(
    store: &'s VectorStore<P>,
    path: impl AsRef<Path>,
) -> Result<GraphIndex<'s, P>> {
    GraphIndex::from_graph(store, load_graph(store, path)?)
}
