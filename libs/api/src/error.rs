/// Which side of a playback run an error came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Delay profile or playback settings rejected.
    Config,
    /// Reading records or writing them to the sink failed.
    Io,
    /// A record or a delay file line could not be decoded.
    Format,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorKind::Config => f.write_str("config"),
            ErrorKind::Io => f.write_str("io"),
            ErrorKind::Format => f.write_str("format"),
        }
    }
}

/// Error passed across the record source and sink seams.
#[derive(Clone)]
pub struct ReplayError {
    kind: ErrorKind,
    message: String,
}

impl ReplayError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self { kind: ErrorKind::Config, message: msg.into() }
    }

    pub fn io(msg: impl Into<String>) -> Self {
        Self { kind: ErrorKind::Io, message: msg.into() }
    }

    pub fn format_err(msg: impl Into<String>) -> Self {
        Self { kind: ErrorKind::Format, message: msg.into() }
    }

    /// Prefix the message with a location such as `line 3`. Kind is kept.
    pub fn context(self, at: impl std::fmt::Display) -> Self {
        Self { kind: self.kind, message: format!("{at}: {}", self.message) }
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl std::fmt::Debug for ReplayError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.kind, self.message)
    }
}

impl std::fmt::Display for ReplayError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for ReplayError {}

impl From<std::io::Error> for ReplayError {
    fn from(e: std::io::Error) -> Self {
        Self::io(e.to_string())
    }
}

impl From<std::num::ParseFloatError> for ReplayError {
    fn from(e: std::num::ParseFloatError) -> Self {
        Self::format_err(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn context_keeps_kind() {
        let e = ReplayError::config("negative delay").context("line 4");
        assert_eq!(e.kind(), ErrorKind::Config);
        assert_eq!(e.to_string(), "line 4: negative delay");
        assert_eq!(format!("{e:?}"), "[config] line 4: negative delay");
    }

    #[test]
    fn std_errors_take_their_kind() {
        let io: ReplayError = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "pipe closed").into();
        assert_eq!(io.kind(), ErrorKind::Io);

        let parse: ReplayError = "soon".parse::<f64>().unwrap_err().into();
        assert_eq!(parse.kind(), ErrorKind::Format);
    }
}
