mod git;
mod provider;
mod types;

pub use git::{GitCli, GitRunner};
pub use provider::HistoryProvider;
pub use types::{Commit, History, Tag};

#[cfg(test)]
pub(crate) use git::fake;
#[cfg(test)]
pub(crate) use types::fixtures;
