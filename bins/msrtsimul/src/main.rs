mod cmd;

use clap::Parser;
use cmd::config::{Effective, PlaybackArgs};

const EXAMPLES: &str = "\
Examples:
  Play back miniSEED waveforms in real time with verbose output
    msrtsimul -v data.mseed

  Play back miniSEED waveforms in real time skipping the first 1.5 minutes
    msrtsimul -j 1.5 data.mseed";

/// Reads sorted (and possibly multiplexed) miniSEED and writes individual
/// records in pseudo-real-time. Output is
/// $SEISCOMP_ROOT/var/run/seedlink/mseedfifo unless --seedlink, --output or
/// -c is used.
#[derive(Parser)]
#[command(name = "msrtsimul", version, about = "miniSEED real-time playback and simulation", after_help = EXAMPLES)]
struct Cli {
    #[command(flatten)]
    args: PlaybackArgs,
}

#[tokio::main]
async fn main() {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            // help and version go to stdout and are not failures
            let code = if e.use_stderr() { 1 } else { 0 };
            let _ = e.print();
            std::process::exit(code);
        }
    };

    init_tracing(cli.args.verbose);

    let eff = match Effective::new(&cli.args) {
        Ok(e) => e,
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    };

    if let Err(e) = cmd::playback::run(&eff).await {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

/// Logs go to stderr; stdout may carry the record stream.
fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| level.into()),
        )
        .init();
}
