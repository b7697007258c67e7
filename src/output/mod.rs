mod progress;
mod styling;
mod summary;
mod tables;
pub(crate) mod writer;

pub use progress::{ConsoleReporter, Reporter};
pub use styling::{brand, failure, muted};
pub use summary::print_summary;
pub use writer::{Documentation, MarkdownWriter, OutputWriter, RunMetadata};

#[cfg(test)]
pub(crate) use progress::recording;

/// Prints the `repodoc` banner to stderr.
pub fn print_banner() {
    eprintln!(
        r"
{} {}
  {}
",
        brand("📚 repodoc"),
        muted(env!("CARGO_PKG_VERSION")),
        muted("Repository documentation and changelog generator")
    );
}
