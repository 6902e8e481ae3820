use std::io::{self, Write};
use std::path::PathBuf;

use clap::Parser;
use env_logger::{Builder, Target};
use indicatif::{ProgressBar, ProgressStyle};
use log::LevelFilter;
use photosort_core::GeocodeOptions;

#[derive(Parser)]
#[command(
    name = "photosort",
    version,
    about = "Rename photos by date, place and camera, and sort them into dated folders"
)]
struct Cli {
    /// Folder scanned recursively for photos and videos
    source: PathBuf,

    /// Folder that receives the dated tree, videos/ and failed_renames/
    destination: PathBuf,

    /// JSON file with geocoder settings
    #[arg(long)]
    config: Option<PathBuf>,

    /// Never call the reverse-geocoding service
    #[arg(long)]
    no_geocode: bool,

    /// Reverse-geocoding endpoint
    #[arg(long)]
    geocode_url: Option<String>,

    /// User-Agent sent to the geocoding service
    #[arg(long)]
    user_agent: Option<String>,

    /// Minimum spacing between geocoding requests, in milliseconds
    #[arg(long)]
    geocode_interval_ms: Option<u64>,

    /// Log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

/// Stderr writer that hides the progress bar while a log record is written.
struct AboveBar(ProgressBar);

impl Write for AboveBar {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.suspend(|| io::stderr().write(buf))
    }

    fn flush(&mut self) -> io::Result<()> {
        io::stderr().flush()
    }
}

/// env_logger with "LEVEL<TAB>message" lines, printed above `pb`.
fn configure_logging(verbosity: u8, pb: &ProgressBar) {
    let level = match verbosity {
        0 => LevelFilter::Info,
        1 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };

    Builder::new()
        .filter_level(level)
        .target(Target::Pipe(Box::new(AboveBar(pb.clone()))))
        .format(|buf, record| {
            let style = buf.default_level_style(record.level());
            writeln!(buf, "{style}{}{style:#}\t{}", record.level(), record.args())
        })
        .init();
}

fn geocode_options(cli: &Cli) -> anyhow::Result<GeocodeOptions> {
    let mut options = match &cli.config {
        Some(path) => GeocodeOptions::load(path)?,
        None => GeocodeOptions::default(),
    };
    if cli.no_geocode {
        options.enabled = false;
    }
    if let Some(url) = &cli.geocode_url {
        options.endpoint = url.clone();
    }
    if let Some(ua) = &cli.user_agent {
        options.user_agent = ua.clone();
    }
    if let Some(ms) = cli.geocode_interval_ms {
        options.min_interval_ms = ms;
    }
    Ok(options)
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let pb = ProgressBar::new(0);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("[{bar:40}] {pos}/{len} {msg}")?,
    );
    configure_logging(cli.verbose, &pb);
    let t_total = std::time::Instant::now();

    let options = photosort_core::ProcessOptions {
        source: cli.source.clone(),
        destination: cli.destination.clone(),
        geocode: geocode_options(&cli)?,
    };

    let result = photosort_core::process(&options, &|progress| {
        pb.set_length(progress.total);
        pb.set_position(progress.current);
        pb.println(&progress.message);
    })?;
    pb.finish_and_clear();

    eprintln!(
        "Done! {} files: {} placed, {} moved to {}, {} left in place, {} geocode lookups ({:.2}s)",
        result.total_files,
        result.placed,
        result.rerouted,
        photosort_core::writer::FAILED_DIR,
        result.stranded,
        result.geocode_lookups,
        t_total.elapsed().as_secs_f64()
    );

    Ok(())
}
