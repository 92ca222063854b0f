use anyhow::Result;
use clap::Parser;
use env_logger::Env;

use clipsearch::cli::SubCommandExtend;
use clipsearch::config::{Opts, SubCommand};
use clipsearch::metrics;

#[global_allocator]
static GLOBAL: tikv_jemallocator::Jemalloc = tikv_jemallocator::Jemalloc;

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let opts = Opts::parse();

    match &opts.subcmd {
        SubCommand::Import(config) => config.run(&opts).await?,
        SubCommand::Build(config) => config.run(&opts).await?,
        SubCommand::Search(config) => config.run(&opts).await?,
        SubCommand::Evaluate(config) => config.run(&opts).await?,
        SubCommand::Show(config) => config.run(&opts).await?,
    }

    if opts.metrics {
        eprint!("{}", metrics::gather_text()?);
    }
    Ok(())
}
