use clap::{Args, Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(author, version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Download a book and save it as an EPUB archive.
    Fetch(FetchArgs),
    /// Render `toc.ncx` and `content.opf` from a saved TOC descriptor.
    Toc(TocArgs),
}

#[derive(Debug, Args)]
pub struct FetchArgs {
    /// Library-view URL of any page of the book.
    #[arg(long)]
    pub url: String,

    /// Output directory for the archive.
    #[arg(long, default_value = ".")]
    pub out: String,

    /// Backend origin (overrides BOOKPACK_ORIGIN).
    #[arg(long)]
    pub origin: Option<String>,

    /// Minimum delay between request starts (overrides BOOKPACK_INTERVAL_MS).
    #[arg(long)]
    pub interval_ms: Option<u64>,

    /// Maximum concurrent requests per batch; 0 means unbounded.
    #[arg(long)]
    pub max_in_flight: Option<usize>,

    /// Cover size segment of the cover URL (overrides BOOKPACK_COVER_SIZE).
    #[arg(long)]
    pub cover_size: Option<String>,

    /// Overwrite an existing archive.
    #[arg(long)]
    pub force: bool,
}

#[derive(Debug, Args)]
pub struct TocArgs {
    /// TOC descriptor JSON file.
    #[arg(long)]
    pub input: String,

    /// Output directory.
    #[arg(long)]
    pub out: String,

    /// Overwrite existing documents.
    #[arg(long)]
    pub force: bool,
}
