use rtsim_api::ReplayError;

#[derive(Debug, thiserror::Error)]
pub enum MseedError {
    #[error("read: {0}")]
    Io(#[from] std::io::Error),

    #[error("truncated record at byte {offset}: needed {needed} bytes, got {got}")]
    Truncated { offset: u64, needed: usize, got: usize },

    #[error("bad record at byte {offset}: {detail}")]
    Format { offset: u64, detail: String },
}

impl MseedError {
    pub(crate) fn format(offset: u64, detail: impl Into<String>) -> Self {
        Self::Format { offset, detail: detail.into() }
    }
}

impl From<MseedError> for ReplayError {
    fn from(e: MseedError) -> Self {
        match e {
            MseedError::Io(e) => ReplayError::io(e.to_string()),
            other => ReplayError::format_err(other.to_string()),
        }
    }
}
