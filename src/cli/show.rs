use anyhow::Result;
use clap::Parser;

use crate::cli::SubCommandExtend;
use crate::collection::Collection;
use crate::config::Opts;

#[derive(Parser, Debug, Clone)]
pub struct ShowCommand {}

impl SubCommandExtend for ShowCommand {
    async fn run(&self, opts: &Opts) -> Result<()> {
        let collection: Collection =
            Collection::open(opts.conf_dir.store(), opts.conf_dir.index())?;
        let store = collection.store();

        println!("记录数量: {}", store.len());
        println!("向量维度: {}", store.dimension());

        match collection.index() {
            Ok(index) => {
                let params = index.params();
                let stats = index.graph().stats();
                println!("索引参数: m = {}, ef_construct = {}", params.m, params.ef_construct);
                println!("边数量  : {}", stats.edges);
                println!(
                    "节点度数: min = {}, max = {}, mean = {:.2}",
                    stats.min_degree, stats.max_degree, stats.mean_degree
                );
            }
            Err(_) => println!("索引    : 未构建"),
        }
        Ok(())
    }
}
