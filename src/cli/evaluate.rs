use std::fs::File;
use std::io::BufWriter;
use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use log::info;
use tokio::task::block_in_place;

use crate::cli::SubCommandExtend;
use crate::collection::Collection;
use crate::config::Opts;
use crate::eval::{EvalOptions, PrecomputedEmbedder};
use crate::utils;

#[derive(Parser, Debug, Clone)]
pub struct EvaluateCommand {
    /// 查询文本列表，每行一个且不能重复，与查询向量的行一一对应
    pub labels: PathBuf,
    /// 查询文本的向量，n * d 的 f32 npy 文件
    #[arg(long, value_name = "FILE")]
    pub queries: PathBuf,
    /// 每个查询比较的结果数量
    #[arg(short, value_name = "K", default_value_t = 30)]
    pub k: usize,
    /// 近似搜索时候选列表的大小
    #[arg(long, value_name = "EF", default_value_t = 64)]
    pub ef_search: usize,
    /// 将每个查询的评估结果以 JSON 格式写入该文件
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,
}

impl SubCommandExtend for EvaluateCommand {
    async fn run(&self, opts: &Opts) -> Result<()> {
        let pairs = block_in_place(|| utils::read_query_set(&self.queries, &self.labels))?;
        let queries: Vec<String> = pairs.iter().map(|(label, _)| label.clone()).collect();
        let embedder = PrecomputedEmbedder::new(pairs);

        let collection: Collection =
            Collection::open(opts.conf_dir.store(), opts.conf_dir.index())?;
        let options = EvalOptions { k: self.k, ef_search: self.ef_search };
        let report = block_in_place(|| collection.evaluate(&queries, &embedder, options))?;

        for query in &report.queries {
            println!("{:.2}\t{}", query.precision, query.query);
        }
        println!("precision@{}: {:.4}", report.k, report.mean_precision);

        if let Some(output) = &self.output {
            let writer = BufWriter::new(File::create(output)?);
            serde_json::to_writer_pretty(writer, &report)?;
            info!("评估结果已写入 {}", output.display());
        }
        Ok(())
    }
}
