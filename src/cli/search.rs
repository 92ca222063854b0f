use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use log::debug;
use tokio::task::block_in_place;

use crate::cancel::CancelToken;
use crate::cli::SubCommandExtend;
use crate::collection::Collection;
use crate::config::{Opts, OutputFormat, SearchOptions};
use crate::exact::Hit;
use crate::store::ImagePayload;
use crate::utils;

#[derive(Parser, Debug, Clone)]
pub struct SearchCommand {
    #[command(flatten)]
    pub search: SearchOptions,
    /// 查询向量，n * d 的 f32 npy 文件，每行一个查询
    pub queries: PathBuf,
    /// 不使用索引，遍历所有记录做精确搜索
    #[arg(long)]
    pub exact: bool,
    /// 输出格式
    #[arg(long, value_name = "FORMAT", default_value = "table")]
    pub output_format: OutputFormat,
}

impl SubCommandExtend for SearchCommand {
    async fn run(&self, opts: &Opts) -> Result<()> {
        let queries = block_in_place(|| utils::read_matrix(&self.queries))?;
        let collection: Collection =
            Collection::open(opts.conf_dir.store(), opts.conf_dir.index())?;
        let cancel = CancelToken::new();

        let mut results = Vec::with_capacity(queries.nrows());
        for (i, query) in queries.rows().into_iter().enumerate() {
            let query = query.to_vec();
            let hits = if self.exact {
                collection.exact_search(&query, self.search.k, &cancel)?
            } else {
                collection.search(&query, self.search.k, self.search.ef_search)?
            };
            debug!("查询 {i}: {} 条结果", hits.len());
            results.push(hits);
        }

        print_result(&results, self.output_format)
    }
}

fn print_result(results: &[Vec<Hit<'_, ImagePayload>>], format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(results)?)
        }
        OutputFormat::Table => {
            for (i, hits) in results.iter().enumerate() {
                if results.len() > 1 {
                    println!("# {i}");
                }
                for hit in hits {
                    println!("{:.2}\t{}", hit.score, hit.payload.path);
                }
            }
        }
    }
    Ok(())
}
