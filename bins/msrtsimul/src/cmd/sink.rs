use std::ffi::OsStr;
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use mseed_lite::MseedRecord;
use rtsim_api::{PacedRecord, RecordSink, ReplayError};

use super::config::OutputTarget;
use super::error::MsrtsimulError;

pub type BoxedSink = Box<dyn RecordSink<MseedRecord>>;

// ═══════════════════════════════════════════════════════════════
//  Sinks
// ═══════════════════════════════════════════════════════════════

/// Writes the encoded bytes of each record to any `Write`.
pub struct StreamSink<W> {
    out: W,
}

impl<W: Write> StreamSink<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }
}

impl<R: PacedRecord, W: Write> RecordSink<R> for StreamSink<W> {
    fn write_record(&mut self, record: &R) -> Result<(), ReplayError> {
        self.out.write_all(record.as_bytes())?;
        Ok(())
    }

    fn flush(&mut self) -> Result<(), ReplayError> {
        self.out.flush()?;
        Ok(())
    }
}

/// Accepts and drops everything.
pub struct NullSink;

impl<R: PacedRecord> RecordSink<R> for NullSink {
    fn write_record(&mut self, _record: &R) -> Result<(), ReplayError> {
        Ok(())
    }
}

// ═══════════════════════════════════════════════════════════════
//  SeedLink FIFO
// ═══════════════════════════════════════════════════════════════

pub fn fifo_path(seiscomp_root: Option<&OsStr>, module: &str) -> Result<PathBuf, MsrtsimulError> {
    let root = seiscomp_root
        .filter(|r| !r.is_empty())
        .ok_or_else(|| MsrtsimulError::Output("SEISCOMP_ROOT environment variable is not set".into()))?;
    Ok(Path::new(root).join("var").join("run").join(module).join("mseedfifo"))
}

pub fn check_fifo(path: &Path) -> Result<(), MsrtsimulError> {
    let meta = match std::fs::metadata(path) {
        Ok(m) => m,
        Err(_) => {
            return Err(MsrtsimulError::Output(format!(
                "{} does not exist.\nIn order to push the records to SeedLink, \
                 it needs to run and must be configured for real-time playback.",
                path.display()
            )));
        }
    };
    if !is_fifo(&meta) {
        return Err(MsrtsimulError::Output(format!(
            "{} is not a named pipe\n\
             Check if SeedLink is running and configured for real-time playback.",
            path.display()
        )));
    }
    Ok(())
}

#[cfg(unix)]
fn is_fifo(meta: &std::fs::Metadata) -> bool {
    use std::os::unix::fs::FileTypeExt;
    meta.file_type().is_fifo()
}

#[cfg(not(unix))]
fn is_fifo(_meta: &std::fs::Metadata) -> bool {
    false
}

// ═══════════════════════════════════════════════════════════════
//  Open output target
// ═══════════════════════════════════════════════════════════════

pub fn open(target: &OutputTarget) -> Result<BoxedSink, MsrtsimulError> {
    let sink: BoxedSink = match target {
        OutputTarget::Stdout => Box::new(StreamSink::new(BufWriter::new(std::io::stdout()))),
        OutputTarget::File(path) => {
            let file = File::create(path)
                .map_err(|e| MsrtsimulError::Output(format!("cannot create {}: {e}", path.display())))?;
            Box::new(StreamSink::new(BufWriter::new(file)))
        }
        OutputTarget::SeedlinkFifo { module } => {
            let path = fifo_path(std::env::var_os("SEISCOMP_ROOT").as_deref(), module)?;
            tracing::info!(fifo = %path.display(), "output data to mseedfifo");
            check_fifo(&path)?;
            // blocks until SeedLink has the pipe open for reading
            let fifo = OpenOptions::new()
                .write(true)
                .open(&path)
                .map_err(|e| MsrtsimulError::Output(format!("{}: {e}", path.display())))?;
            Box::new(StreamSink::new(fifo))
        }
        OutputTarget::Discard => Box::new(NullSink),
    };
    Ok(sink)
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Blob(Vec<u8>);

    impl PacedRecord for Blob {
        fn source_key(&self) -> &str {
            "GE.APE..BHZ"
        }
        fn begin_time(&self) -> rtsim_api::Timestamp {
            rtsim_api::Timestamp::default()
        }
        fn set_begin_time(&mut self, _begin: rtsim_api::Timestamp) {}
        fn sample_count(&self) -> u32 {
            0
        }
        fn sample_rate(&self) -> f64 {
            0.0
        }
        fn byte_size(&self) -> usize {
            self.0.len()
        }
        fn as_bytes(&self) -> &[u8] {
            &self.0
        }
    }

    #[test]
    fn stream_sink_concatenates_records() {
        let mut buf = Vec::new();
        let mut sink = StreamSink::new(&mut buf);
        sink.write_record(&Blob(vec![1, 2, 3])).unwrap();
        sink.write_record(&Blob(vec![4])).unwrap();
        RecordSink::<Blob>::flush(&mut sink).unwrap();
        assert_eq!(buf, [1, 2, 3, 4]);
    }

    #[test]
    fn null_sink_accepts_anything() {
        let mut sink = NullSink;
        assert!(sink.write_record(&Blob(vec![0; 4096])).is_ok());
    }

    #[test]
    fn fifo_path_layout() {
        let p = fifo_path(Some(OsStr::new("/opt/seiscomp")), "seedlink2").unwrap();
        assert_eq!(p, Path::new("/opt/seiscomp/var/run/seedlink2/mseedfifo"));
    }

    #[test]
    fn missing_root_is_reported() {
        let err = fifo_path(None, "seedlink").unwrap_err();
        assert_eq!(err.to_string(), "SEISCOMP_ROOT environment variable is not set");
        assert!(fifo_path(Some(OsStr::new("")), "seedlink").is_err());
    }

    #[test]
    fn missing_fifo_is_reported() {
        let err = check_fifo(Path::new("/nonexistent/var/run/seedlink/mseedfifo")).unwrap_err();
        assert!(err.to_string().contains("does not exist"));
    }

    #[test]
    fn regular_file_is_not_a_fifo() {
        let path = std::env::temp_dir().join(format!("msrtsimul-notfifo-{}", std::process::id()));
        std::fs::write(&path, b"").unwrap();
        let err = check_fifo(&path).unwrap_err();
        std::fs::remove_file(&path).ok();
        assert!(err.to_string().contains("is not a named pipe"));
    }
}
