use std::collections::HashSet;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result, bail};
use indicatif::ProgressStyle;
use ndarray::Array2;
use ndarray_npy::read_npy;

pub fn pb_style() -> ProgressStyle {
    ProgressStyle::default_bar()
        .template("[{elapsed_precise}] {bar:40.cyan/blue} {pos:>7}/{len:7} {msg}")
        .expect("invalid progress bar template")
        .progress_chars("##-")
}

/// 读取 n * d 的 f32 矩阵
pub fn read_matrix(path: impl AsRef<Path>) -> Result<Array2<f32>> {
    let path = path.as_ref();
    let matrix: Array2<f32> =
        read_npy(path).with_context(|| format!("无法读取矩阵 {}", path.display()))?;
    Ok(matrix)
}

/// 读取文本文件，每行一项，忽略空白行
///
/// 行内容原样保留，只去掉行尾的换行符（包括 `\r\n`）。
pub fn read_lines(path: impl AsRef<Path>) -> Result<Vec<String>> {
    let path = path.as_ref();
    let text = fs::read_to_string(path).with_context(|| format!("无法读取 {}", path.display()))?;
    Ok(text.lines().filter(|l| !l.trim().is_empty()).map(String::from).collect())
}

/// 读取矩阵和对应的标签，二者行数必须一致
pub fn read_labeled_matrix(
    matrix: impl AsRef<Path>,
    labels: impl AsRef<Path>,
) -> Result<Vec<(String, Vec<f32>)>> {
    let matrix = read_matrix(matrix)?;
    let labels = read_lines(labels)?;
    if matrix.nrows() != labels.len() {
        bail!("向量数量 ({}) 与标签数量 ({}) 不一致", matrix.nrows(), labels.len());
    }
    Ok(labels.into_iter().zip(matrix.rows()).map(|(label, row)| (label, row.to_vec())).collect())
}

/// 读取查询向量和查询文本，查询文本不能重复
pub fn read_query_set(
    matrix: impl AsRef<Path>,
    labels: impl AsRef<Path>,
) -> Result<Vec<(String, Vec<f32>)>> {
    let pairs = read_labeled_matrix(matrix, labels)?;
    let mut seen = HashSet::with_capacity(pairs.len());
    for (i, (label, _)) in pairs.iter().enumerate() {
        if !seen.insert(label.as_str()) {
            bail!("第 {} 个查询 {label:?} 与之前的查询重复", i + 1);
        }
    }
    Ok(pairs)
}
