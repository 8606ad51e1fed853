use std::fs::File;
use std::io::{BufReader, Read};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use mseed_lite::MseedReader;
use rtsim_api::Timestamp;
use rtsim_engine::{PacingScheduler, PlaybackSummary, RecordStream, SystemClock};

use super::config::{Effective, InputSource};
use super::error::MsrtsimulError;
use super::{delays, sink};

/// How long a run may keep going after Ctrl+C (e.g. blocked reading stdin).
const INTERRUPT_GRACE: Duration = Duration::from_secs(2);

pub async fn run(eff: &Effective) -> Result<PlaybackSummary, MsrtsimulError> {
    // installed first: opening the SeedLink FIFO blocks until a reader attaches
    let token = CancellationToken::new();
    let watcher = cancel_on_interrupt(token.clone());
    let result = play(eff, &token).await;
    watcher.abort();
    result
}

async fn play(eff: &Effective, token: &CancellationToken) -> Result<PlaybackSummary, MsrtsimulError> {
    let input = open_input(&eff.input)?;
    let mut sink = sink::open(&eff.output)?;
    if token.is_cancelled() {
        tracing::info!("interrupted before playback started");
        return Ok(PlaybackSummary { interrupted: true, ..Default::default() });
    }
    let profile = delays::resolve(eff.delays_file.as_deref(), &eff.delays_inline);

    tracing::info!(
        start = %Timestamp::now(),
        output = %eff.output,
        mode = %eff.pacing.mode,
        speed = eff.pacing.speed,
        jump_min = eff.pacing.jump_minutes,
        reorder = profile.is_some(),
        margin = %eff.reorder.margin,
        "starting msrtsimul"
    );

    let reader = MseedReader::new(BufReader::new(input));
    let mut stream = RecordStream::new(reader, profile, eff.reorder);
    let mut scheduler = PacingScheduler::new(eff.pacing, SystemClock)?;
    let result = scheduler.run(&mut stream, sink.as_mut(), token).await;

    if let Some(stats) = stream.reorder_stats() {
        tracing::info!(
            pushed = stats.pushed,
            peak_pending = stats.peak_pending,
            forced_releases = stats.forced_releases,
            regressions = stats.regressions,
            "reorder stats"
        );
    }

    result.map_err(Into::into)
}

fn open_input(input: &InputSource) -> Result<Box<dyn Read>, MsrtsimulError> {
    match input {
        InputSource::Stdin => Ok(Box::new(std::io::stdin())),
        InputSource::File(path) => {
            let file = File::open(path).map_err(|source| MsrtsimulError::Input {
                path: path.display().to_string(),
                source,
            })?;
            Ok(Box::new(file))
        }
    }
}

/// Cancel `token` on Ctrl+C. Reads are blocking, so a run that does not
/// reach the next record within the grace period is ended here.
fn cancel_on_interrupt(token: CancellationToken) -> JoinHandle<()> {
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %e, "cannot listen for Ctrl+C");
            return;
        }
        tracing::info!("interrupted, stopping playback");
        token.cancel();

        tokio::time::sleep(INTERRUPT_GRACE).await;
        tracing::warn!("playback did not stop in time, exiting");
        std::process::exit(0);
    })
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;
    use crate::cmd::config::OutputTarget;

    fn effective(input: InputSource) -> Effective {
        Effective {
            input,
            output: OutputTarget::Discard,
            pacing: Default::default(),
            reorder: Default::default(),
            delays_file: None,
            delays_inline: Default::default(),
        }
    }

    #[tokio::test]
    async fn empty_input_plays_nothing() {
        let path = std::env::temp_dir().join(format!("msrtsimul-empty-{}.mseed", std::process::id()));
        std::fs::write(&path, b"").unwrap();
        let summary = run(&effective(InputSource::File(path.clone()))).await.unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(summary.read, 0);
        assert!(!summary.interrupted);
    }

    #[tokio::test]
    async fn missing_input_is_fatal() {
        let eff = effective(InputSource::File(PathBuf::from("/nonexistent/data.mseed")));
        let err = run(&eff).await.unwrap_err();
        assert!(err.to_string().starts_with("could not open input file '/nonexistent/data.mseed'"));
    }

    #[tokio::test]
    async fn garbage_input_is_fatal() {
        let path = std::env::temp_dir().join(format!("msrtsimul-garbage-{}.mseed", std::process::id()));
        std::fs::write(&path, vec![b'x'; 600]).unwrap();
        let err = run(&effective(InputSource::File(path.clone()))).await.unwrap_err();
        std::fs::remove_file(&path).ok();

        assert!(matches!(err, MsrtsimulError::Engine(rtsim_engine::EngineError::Source(_))));
    }

    #[tokio::test]
    async fn interrupt_while_opening_output_stops_cleanly() {
        let path = std::env::temp_dir().join(format!("msrtsimul-interrupted-{}.mseed", std::process::id()));
        std::fs::write(&path, vec![b'x'; 600]).unwrap();
        let token = CancellationToken::new();
        token.cancel();
        let summary = play(&effective(InputSource::File(path.clone())), &token).await.unwrap();
        std::fs::remove_file(&path).ok();

        assert!(summary.interrupted);
        assert_eq!(summary.read, 0);
    }
}
