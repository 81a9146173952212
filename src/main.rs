mod dataset;
mod export;
mod feed;
mod fetch;

use std::path::Path;

use clap::Parser;
use tracing::info;

use dataset::Dataset;
use feed::HttpFeed;
use fetch::{fetch_new, FetchOptions};

const OUTPUT_DIR: &str = "output";

#[derive(Parser)]
#[command(
    name = "quiz_harvester",
    about = "Incrementally harvest BuzzFeed quizzes into a title corpus and JSON archive"
)]
struct Cli {
    /// First feed page to request
    #[arg(short = 's', long, default_value_t = 1)]
    start_page: u32,
    /// Last feed page to request (default: walk until the feed runs dry)
    #[arg(short = 'e', long)]
    end_page: Option<u32>,
    /// Maximum number of pages to request
    #[arg(short = 'm', long)]
    max_pages: Option<u32>,
    /// Discard the previous archive and start from scratch
    #[arg(short = 'r', long)]
    reset: bool,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let cli = Cli::parse();
    info!(
        "Getting quizzes from page {} to {} ({}) with{} reset",
        cli.start_page,
        cli.end_page.map_or("end".to_string(), |e| e.to_string()),
        cli.max_pages
            .map_or("no maximum".to_string(), |m| format!("maximum {m}")),
        if cli.reset { "" } else { "out" },
    );

    let out_dir = Path::new(OUTPUT_DIR);
    let mut dataset = if cli.reset {
        Dataset::default()
    } else {
        Dataset::load(&out_dir.join(export::ARCHIVE_FILE))?
    };

    let feed = HttpFeed::new()?;
    let opts = FetchOptions {
        start_page: cli.start_page,
        end_page: cli.end_page,
        max_pages: cli.max_pages,
    };
    let stats = fetch_new(&mut dataset, &feed, &opts)?;

    export::write_outputs(&dataset, out_dir)?;

    println!(
        "{} quizzes found, {} quizzes added to training set",
        stats.examined, stats.added
    );
    Ok(())
}
