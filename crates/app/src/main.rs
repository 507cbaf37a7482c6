use std::{
    io::{self, BufWriter},
    path::PathBuf,
    process,
};

use clap::{Parser, ValueEnum};
use ilda_player_core::{
    IldaError, PlaybackScheduler, PlayerConfig, PlottingSink, Show, TekSink, TraceSink,
};
use tracing_subscriber::EnvFilter;

fn main() {
    init_tracing();

    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => usage(err),
    };

    if let Err(err) = run(cli) {
        tracing::error!("{err}");
        process::exit(1);
    }
}

fn run(cli: Cli) -> ilda_player_core::Result<()> {
    tracing::info!(path = ?cli.path, delay_ms = cli.delay, "loading show");
    let show = Show::open(&cli.path)?;

    if cli.info {
        let summary = serde_json::to_string_pretty(&show.summary())
            .map_err(|err| IldaError::msg(err.to_string()))?;
        println!("{summary}");
        return Ok(());
    }

    let config = PlayerConfig::with_frame_millis(cli.delay);
    match cli.sink {
        SinkKind::Tek => {
            let stdout = BufWriter::new(io::stdout().lock());
            play(config, show, TekSink::new(stdout))
        }
        SinkKind::Trace => play(config, show, TraceSink::new()),
    }
}

fn play<S: PlottingSink>(config: PlayerConfig, show: Show, sink: S) -> ilda_player_core::Result<()> {
    // signals set the shutdown flag directly, so one thread is enough
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;

    let mut scheduler = PlaybackScheduler::new(config);
    runtime.block_on(scheduler.play(show, sink))?;
    Ok(())
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(io::stderr)
        .try_init();
}

/// Help, bad flags and a missing path all land here.
fn usage(err: clap::Error) -> ! {
    eprintln!("{}", err.render());
    process::exit(1);
}

#[derive(Parser, Debug)]
#[command(
    name = "ilda-player",
    author,
    version,
    about = "Play ILDA laser show files on a Tektronix 4014 terminal",
    long_about = None
)]
struct Cli {
    /// Delay between frames in milliseconds (default 25 frames per second).
    #[arg(short = 'd', value_name = "MSEC", default_value_t = 40)]
    delay: u64,
    /// Where plot commands go.
    #[arg(long, value_enum, default_value_t = SinkKind::Tek)]
    sink: SinkKind,
    /// Print a JSON summary of the show instead of playing it.
    #[arg(short, long)]
    info: bool,
    /// ILDA file to play.
    path: PathBuf,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum SinkKind {
    /// Tektronix 4014 vector graphics on stdout.
    Tek,
    /// Log each plot command instead of drawing it.
    Trace,
}
