use std::path::PathBuf;

use clap::Parser;

#[derive(Parser)]
#[command(
    name = "fbphotos-rs-cli",
    version,
    about = "Facebook export photo helper - restore dates, GPS and albums from archive manifests"
)]
struct Cli {
    /// Extracted Facebook export directory (must contain posts/)
    archive_dir: PathBuf,

    /// Output directory; album folders are created under it
    #[arg(short, long)]
    output: PathBuf,

    /// Durable geolocation cache file
    #[arg(long, default_value = fbphotos_core::GEO_CACHE_FILENAME)]
    geo_cache: PathBuf,

    /// Skip IP-based geolocation entirely
    #[arg(long)]
    skip_location: bool,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level))
        .format_timestamp(None)
        .init();

    let t_total = std::time::Instant::now();

    let options = fbphotos_core::ProcessOptions {
        archive_dir: cli.archive_dir,
        output: cli.output,
        geo_cache: cli.geo_cache,
        skip_location: cli.skip_location,
    };

    let result = fbphotos_core::process(&options, &|stage, current, total, message| {
        eprintln!("\r[{}] {}/{} {}", stage, current + 1, total, message);
    })?;

    eprintln!(
        "Done! {} posts, {} media files, {} written, {} with embedded metadata, {} located ({:.2}s)",
        result.posts_scanned,
        result.media_found,
        result.files_written,
        result.metadata_embedded,
        result.locations_resolved,
        t_total.elapsed().as_secs_f64()
    );

    Ok(())
}
