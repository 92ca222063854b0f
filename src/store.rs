use bytemuck::cast_slice;
use serde::{Deserialize, Serialize};

use crate::cosine::normalized;
use crate::error::{Error, Result};

/// CLIP ViT-B/32 输出的向量维度
pub const DEFAULT_DIMENSION: usize = 512;

/// 图片记录的附加数据
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImagePayload {
    /// 图片路径
    pub path: String,
}

impl ImagePayload {
    pub fn new(path: impl Into<String>) -> Self {
        Self { path: path.into() }
    }
}

/// 存储中的一条记录
#[derive(Debug, Clone, Copy)]
pub struct VectorRecord<'a, P> {
    pub id: usize,
    /// 归一化后的向量
    pub vector: &'a [f32],
    pub payload: &'a P,
}

/// 只追加的向量存储
///
/// ID 按插入顺序从 0 开始分配，不会复用。所有向量维度相同，并在插入时归一化。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorStore<P = ImagePayload> {
    dimension: usize,
    /// 展平的 n * dimension 数组
    vectors: Vec<f32>,
    payloads: Vec<P>,
}

impl<P> VectorStore<P> {
    /// 创建指定维度的空存储，维度为 0 时返回 `ZeroDimension`
    pub fn new(dimension: usize) -> Result<Self> {
        if dimension == 0 {
            return Err(Error::ZeroDimension);
        }
        Ok(Self { dimension, vectors: vec![], payloads: vec![] })
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn len(&self) -> usize {
        self.payloads.len()
    }

    pub fn is_empty(&self) -> bool {
        self.payloads.is_empty()
    }

    /// 添加一条记录，返回分配的 ID
    ///
    /// 失败时存储保持不变
    pub fn add(&mut self, vector: &[f32], payload: P) -> Result<usize> {
        let vector = normalized(vector, self.dimension)?;
        let id = self.payloads.len();
        self.vectors.extend_from_slice(&vector);
        self.payloads.push(payload);
        Ok(id)
    }

    pub fn get(&self, id: usize) -> Result<VectorRecord<'_, P>> {
        if id >= self.len() {
            return Err(Error::NotFound(id));
        }
        Ok(self.record(id))
    }

    /// 按插入顺序返回所有记录的快照
    pub fn all(&self) -> Vec<VectorRecord<'_, P>> {
        (0..self.len()).map(|id| self.record(id)).collect()
    }

    /// 校验每条记录的向量长度都等于存储维度
    ///
    /// 通过 `add` 构建的存储总是满足这一点，反序列化得到的存储则不一定
    pub fn validate(&self) -> Result<()> {
        if self.dimension == 0 {
            return Err(Error::ZeroDimension);
        }
        let n = self.len();
        if self.vectors.len() != n * self.dimension {
            let actual = self.vectors.len().checked_div(n).unwrap_or(self.vectors.len());
            return Err(Error::DimensionMismatch { expected: self.dimension, actual });
        }
        Ok(())
    }

    /// 调用方需要保证 `id < len()`
    #[inline(always)]
    pub(crate) fn vector(&self, id: usize) -> &[f32] {
        &self.vectors[id * self.dimension..(id + 1) * self.dimension]
    }

    pub(crate) fn payload(&self, id: usize) -> &P {
        &self.payloads[id]
    }

    fn record(&self, id: usize) -> VectorRecord<'_, P> {
        VectorRecord { id, vector: self.vector(id), payload: &self.payloads[id] }
    }
}

impl<P: Serialize> VectorStore<P> {
    /// 存储内容的 blake3 摘要，用于确认索引快照属于这个存储
    pub fn digest(&self) -> Result<blake3::Hash> {
        let mut hasher = blake3::Hasher::new();
        hasher.update(&(self.dimension as u64).to_le_bytes());
        hasher.update(cast_slice(&self.vectors));
        hasher.update(&bincode::serialize(&self.payloads)?);
        Ok(hasher.finalize())
    }
}

/// 从 `(payload, vector)` 序列构建存储
pub fn build_store<P>(
    dimension: usize,
    rows: impl IntoIterator<Item = (P, Vec<f32>)>,
) -> Result<VectorStore<P>> {
    let mut store = VectorStore::new(dimension)?;
    for (payload, vector) in rows {
        store.add(&vector, payload)?;
    }
    Ok(store)
}
