use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::Parser;
use log::{info, warn};
use tokio::task::block_in_place;

use crate::cli::SubCommandExtend;
use crate::config::Opts;
use crate::store::{ImagePayload, build_store};
use crate::{snapshot, utils};

#[derive(Parser, Debug, Clone)]
pub struct ImportCommand {
    /// 图片向量矩阵，n * d 的 f32 npy 文件
    pub embeddings: PathBuf,
    /// 图片路径列表，每行一个，与矩阵的行一一对应
    pub paths: PathBuf,
}

impl SubCommandExtend for ImportCommand {
    async fn run(&self, opts: &Opts) -> Result<()> {
        let rows = block_in_place(|| utils::read_labeled_matrix(&self.embeddings, &self.paths))?;
        let Some(dimension) = rows.first().map(|(_, v)| v.len()) else {
            bail!("{} 中没有向量", self.embeddings.display());
        };

        let store = build_store(dimension, rows.into_iter().map(|(p, v)| (ImagePayload::new(p), v)))
            .context("导入向量失败")?;

        fs::create_dir_all(opts.conf_dir.path())?;
        snapshot::save_store(&store, opts.conf_dir.store())?;

        // 旧索引和新存储不再匹配
        let index = opts.conf_dir.index();
        if index.exists() {
            warn!("删除过期的索引 {}", index.display());
            fs::remove_file(index)?;
        }

        info!("导入 {} 条记录，维度 {}", store.len(), store.dimension());
        Ok(())
    }
}
