mod build;
mod evaluate;
mod import;
mod search;
mod show;

pub use build::*;
pub use evaluate::*;
pub use import::*;
pub use search::*;
pub use show::*;

use crate::config::Opts;

pub trait SubCommandExtend {
    fn run(&self, opts: &Opts) -> impl std::future::Future<Output = anyhow::Result<()>> + Send;
}
