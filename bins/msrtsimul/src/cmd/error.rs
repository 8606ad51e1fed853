use rtsim_engine::EngineError;

#[derive(Debug, thiserror::Error)]
pub enum MsrtsimulError {
    #[error("{0}")]
    Config(String),

    #[error("could not open input file '{path}' for reading: {source}")]
    Input {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Output target missing or unusable; the message is shown as is.
    #[error("{0}")]
    Output(String),

    #[error("{0}")]
    Engine(#[from] EngineError),
}
