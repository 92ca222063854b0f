use anyhow::Result;
use clap::Parser;
use indicatif::ProgressBar;
use log::{info, warn};
use tokio::task::spawn_blocking;

use crate::cancel::CancelToken;
use crate::cli::SubCommandExtend;
use crate::collection::Collection;
use crate::config::{IndexOptions, Opts};
use crate::graph::BuildParams;
use crate::utils::pb_style;

#[derive(Parser, Debug, Clone)]
pub struct BuildCommand {
    #[command(flatten)]
    pub index: IndexOptions,
}

impl SubCommandExtend for BuildCommand {
    async fn run(&self, opts: &Opts) -> Result<()> {
        let mut collection: Collection =
            Collection::open(opts.conf_dir.store(), opts.conf_dir.index())?;
        if collection.is_indexed() {
            info!("已有索引，将重新构建");
        }

        let params = BuildParams::from(&self.index);
        let cancel = CancelToken::new();
        let pb = ProgressBar::no_length().with_style(pb_style());

        let mut task = spawn_blocking({
            let cancel = cancel.clone();
            move || -> crate::Result<Collection> {
                collection.build_index(params, &cancel, pb)?;
                Ok(collection)
            }
        });

        let collection = tokio::select! {
            result = &mut task => result??,
            _ = tokio::signal::ctrl_c() => {
                warn!("收到中断信号，正在取消构建");
                cancel.cancel();
                task.await??
            }
        };

        collection.save(opts.conf_dir.store(), opts.conf_dir.index())?;
        info!("构建索引成功");
        Ok(())
    }
}
