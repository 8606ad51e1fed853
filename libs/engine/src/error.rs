use rtsim_api::ReplayError;

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("invalid playback config: {0}")]
    InvalidConfig(String),

    #[error("record source: {0}")]
    Source(ReplayError),

    #[error("sink: {0}")]
    Sink(ReplayError),
}
