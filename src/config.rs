use std::convert::Infallible;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::LazyLock;

use clap::{Parser, Subcommand, ValueEnum};
use directories::ProjectDirs;

use crate::cli::*;
use crate::graph::BuildParams;

static CONF_DIR: LazyLock<ConfDir> = LazyLock::new(|| {
    let proj_dirs =
        ProjectDirs::from("", "clipsearch", "clipsearch").expect("failed to get project dir");
    ConfDir { path: proj_dirs.config_dir().to_path_buf() }
});

fn default_config_dir() -> &'static str {
    CONF_DIR.path().to_str().unwrap_or(".")
}

#[derive(Parser, Debug, Clone)]
pub struct IndexOptions {
    /// 每个节点最多保留的邻居数量
    #[arg(short, long, value_name = "M", default_value_t = 16)]
    pub m: usize,
    /// 插入节点时候选列表的大小，建议不小于 m
    #[arg(long, value_name = "EF", default_value_t = 100)]
    pub ef_construct: usize,
}

impl From<&IndexOptions> for BuildParams {
    fn from(opts: &IndexOptions) -> Self {
        BuildParams::new(opts.m, opts.ef_construct)
    }
}

#[derive(Parser, Debug, Clone)]
pub struct SearchOptions {
    /// 每个查询返回的结果数量
    #[arg(short, value_name = "K", default_value_t = 5)]
    pub k: usize,
    /// 近似搜索时候选列表的大小，至少会取到 k
    #[arg(long, value_name = "EF", default_value_t = 64)]
    pub ef_search: usize,
}

#[derive(Parser, Debug, Clone)]
#[command(name = "clipsearch", version)]
pub struct Opts {
    #[command(subcommand)]
    pub subcmd: SubCommand,
    /// clipsearch 配置文件目录
    #[arg(short, long, default_value = default_config_dir())]
    pub conf_dir: ConfDir,
    /// 命令结束后将 prometheus 指标输出到 stderr
    #[arg(long, global = true)]
    pub metrics: bool,
}

#[derive(Subcommand, Debug, Clone)]
pub enum SubCommand {
    /// 从 npy 矩阵和路径列表导入图片向量
    Import(ImportCommand),
    /// 构建近似搜索索引
    Build(BuildCommand),
    /// 使用查询向量搜索图片
    Search(SearchCommand),
    /// 评估近似搜索相对精确搜索的 precision@k
    Evaluate(EvaluateCommand),
    /// 显示存储和索引的统计信息
    Show(ShowCommand),
}

#[derive(Debug, Clone)]
pub struct ConfDir {
    path: PathBuf,
}

impl ConfDir {
    pub fn path(&self) -> &Path {
        self.path.as_path()
    }

    /// 返回向量存储文件的路径
    pub fn store(&self) -> PathBuf {
        self.path.join("store.bin")
    }

    /// 返回索引文件的路径
    pub fn index(&self) -> PathBuf {
        self.path.join("index.bin")
    }
}

impl FromStr for ConfDir {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self { path: PathBuf::from(s) })
    }
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Json,
    Table,
}
