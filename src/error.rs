use std::io;

/// 嵌入函数返回的错误类型
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// 索引与检索过程中可能出现的错误
///
/// 所有错误都只影响触发它的那一次操作，不会修改存储或索引的状态，也不会在内部重试。
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("向量维度必须大于 0")]
    ZeroDimension,

    #[error("向量维度不匹配：期望 {expected}，实际 {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("记录不存在：{0}")]
    NotFound(usize),

    #[error("向量集合为空，无法构建索引")]
    EmptyCorpus,

    #[error("查询列表为空，无法计算平均精度")]
    EmptyQuerySet,

    #[error("k 必须大于 0")]
    InvalidK,

    #[error("索引尚未构建")]
    IndexNotBuilt,

    #[error("向量包含非有限数值（第 {0} 维）")]
    InvalidVector(usize),

    #[error("索引构建后存储不可再修改")]
    StoreFrozen,

    #[error("操作已取消")]
    Cancelled,

    #[error("无法获取查询 {query:?} 的嵌入向量")]
    Embedding {
        query: String,
        #[source]
        source: BoxError,
    },

    #[error("索引快照与向量存储不一致")]
    SnapshotMismatch,

    #[error(transparent)]
    Io(#[from] io::Error),

    #[error(transparent)]
    Codec(#[from] bincode::Error),
}
