use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;

use crate::error::{Error, Result};

#[inline(always)]
pub fn dot(va: &[f32], vb: &[f32]) -> f32 {
    debug_assert_eq!(va.len(), vb.len());
    // 分成 8 路累加，方便 LLVM 自动向量化
    let mut acc = [0.0f32; 8];
    let (ca, ra) = va.as_chunks::<8>();
    let (cb, rb) = vb.as_chunks::<8>();
    for (a, b) in ca.iter().zip(cb) {
        for i in 0..8 {
            acc[i] += a[i] * b[i];
        }
    }
    let tail: f32 = ra.iter().zip(rb).map(|(a, b)| a * b).sum();
    acc.iter().sum::<f32>() + tail
}

/// 余弦相似度，任意一个向量为零向量时返回 0
pub fn cosine(va: &[f32], vb: &[f32]) -> f32 {
    let denom = dot(va, va).sqrt() * dot(vb, vb).sqrt();
    if denom == 0.0 { 0.0 } else { dot(va, vb) / denom }
}

/// 校验维度和数值，返回归一化后的向量
///
/// 归一化之后余弦相似度就等于点积。零向量保持不变。
pub fn normalized(v: &[f32], dimension: usize) -> Result<Vec<f32>> {
    if v.len() != dimension {
        return Err(Error::DimensionMismatch { expected: dimension, actual: v.len() });
    }
    if let Some(i) = v.iter().position(|x| !x.is_finite()) {
        return Err(Error::InvalidVector(i));
    }
    let norm = dot(v, v).sqrt();
    if norm == 0.0 || !norm.is_finite() {
        return Ok(v.to_vec());
    }
    Ok(v.iter().map(|x| x / norm).collect())
}

/// 带分数的记录 ID
///
/// 排序规则：分数越高越大，分数相同时 ID 越小越大。
/// 因此对 `Scored` 降序排列就是最终的结果顺序。
#[derive(Debug, Clone, Copy)]
pub struct Scored {
    pub id: usize,
    pub score: f32,
}

impl PartialEq for Scored {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Scored {}

impl Ord for Scored {
    fn cmp(&self, other: &Self) -> Ordering {
        self.score.total_cmp(&other.score).then_with(|| other.id.cmp(&self.id))
    }
}

impl PartialOrd for Scored {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// 保留最好的 k 个结果
pub struct TopK {
    heap: BinaryHeap<Reverse<Scored>>,
    k: usize,
}

impl TopK {
    pub fn new(k: usize) -> Self {
        Self { heap: BinaryHeap::with_capacity(k + 1), k }
    }

    pub fn push(&mut self, item: Scored) {
        if self.heap.len() < self.k {
            self.heap.push(Reverse(item));
        } else if self.heap.peek().is_some_and(|Reverse(worst)| item > *worst) {
            self.heap.pop();
            self.heap.push(Reverse(item));
        }
    }

    pub fn extend(&mut self, items: impl IntoIterator<Item = Scored>) {
        for item in items {
            self.push(item);
        }
    }

    /// 按结果顺序输出（分数降序，ID 升序）
    pub fn into_sorted_vec(self) -> Vec<Scored> {
        // Reverse 的升序就是 Scored 的降序
        self.heap.into_sorted_vec().into_iter().map(|Reverse(s)| s).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dot_tail() {
        let va: Vec<f32> = (0..11).map(|x| x as f32).collect();
        let vb = vec![1.0; 11];
        assert_eq!(dot(&va, &vb), 55.0);
    }

    #[test]
    fn test_cosine_zero_vector() {
        assert_eq!(cosine(&[0.0, 0.0], &[1.0, 0.0]), 0.0);
    }

    #[test]
    fn test_normalized() {
        let v = normalized(&[3.0, 4.0], 2).unwrap();
        assert!((v[0] - 0.6).abs() < 1e-6);
        assert!((v[1] - 0.8).abs() < 1e-6);
    }

    #[test]
    fn test_normalized_rejects() {
        assert!(matches!(
            normalized(&[1.0, 2.0, 3.0], 2),
            Err(Error::DimensionMismatch { expected: 2, actual: 3 })
        ));
        assert!(matches!(normalized(&[1.0, f32::NAN], 2), Err(Error::InvalidVector(1))));
    }

    #[test]
    fn test_scored_order() {
        let a = Scored { id: 3, score: 0.5 };
        let b = Scored { id: 1, score: 0.5 };
        let c = Scored { id: 0, score: 0.1 };
        // 同分时 ID 小的更好
        assert!(b > a);
        assert!(a > c);
    }

    #[test]
    fn test_topk_ties() {
        let mut top = TopK::new(2);
        top.extend([
            Scored { id: 4, score: 1.0 },
            Scored { id: 2, score: 1.0 },
            Scored { id: 0, score: 0.3 },
            Scored { id: 1, score: 1.0 },
        ]);
        let ids: Vec<_> = top.into_sorted_vec().iter().map(|s| s.id).collect();
        assert_eq!(ids, vec![1, 2]);
    }

    #[test]
    fn test_topk_fewer_than_k() {
        let mut top = TopK::new(5);
        top.push(Scored { id: 0, score: 0.2 });
        top.push(Scored { id: 1, score: 0.9 });
        let ids: Vec<_> = top.into_sorted_vec().iter().map(|s| s.id).collect();
        assert_eq!(ids, vec![1, 0]);
    }
}
