use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

/// 邻居列表，存放的是节点在 arena 中的下标（同时也是记录 ID）
pub type Neighbors = SmallVec<[usize; 16]>;

/// 图中的一个节点，节点下标与存储中的记录 ID 一一对应
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    pub neighbors: Neighbors,
}

impl Node {
    pub fn new(neighbors: Neighbors) -> Self {
        Self { neighbors }
    }

    pub fn degree(&self) -> usize {
        self.neighbors.len()
    }

    /// 添加一条边，已存在时忽略
    pub fn add_neighbor(&mut self, id: usize) -> bool {
        if self.neighbors.contains(&id) {
            return false;
        }
        self.neighbors.push(id);
        true
    }
}
