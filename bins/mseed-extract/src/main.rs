use std::collections::HashMap;
use std::fs::{File, OpenOptions};
use std::io::{BufReader, Write};
use std::path::{Path, PathBuf};

use clap::Parser;
use mseed_lite::{MseedError, MseedReader, MseedRecord};
use rtsim_api::{OrdinalTime, PacedRecord};

#[derive(Parser)]
#[command(name = "mseed-extract", about = "Split a miniSEED file into one file per channel")]
struct Cli {
    /// miniSEED input
    file: PathBuf,

    /// Directory for the per-channel files
    #[arg(short, long, default_value = ".")]
    out_dir: PathBuf,
}

#[derive(Debug, thiserror::Error)]
enum ExtractError {
    #[error("cannot open {path}: {source}")]
    Open {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{0}")]
    Read(#[from] MseedError),

    #[error("write {path}: {source}")]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

fn main() {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let code = if e.use_stderr() { 1 } else { 0 };
            let _ = e.print();
            std::process::exit(code);
        }
    };

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    if let Err(e) = extract(&cli.file, &cli.out_dir) {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

/// `STA.NET.LOC.CHA.D.YYYY.DDD.HHMM`, the time part from the first record
/// seen on that channel.
fn output_name(station: &str, network: &str, location: &str, channel: &str, t: &OrdinalTime) -> String {
    format!(
        "{station}.{network}.{location}.{channel}.D.{:04}.{:03}.{:02}{:02}",
        t.year, t.day_of_year, t.hour, t.minute
    )
}

fn channel_id(rec: &MseedRecord) -> String {
    format!("{}.{}.{}.{}", rec.station(), rec.network(), rec.location(), rec.channel())
}

fn extract(input: &Path, out_dir: &Path) -> Result<(), ExtractError> {
    let file = File::open(input).map_err(|source| ExtractError::Open {
        path: input.display().to_string(),
        source,
    })?;

    let mut outputs: HashMap<String, (PathBuf, File)> = HashMap::new();
    let mut records = 0u64;

    for rec in MseedReader::new(BufReader::new(file)) {
        let rec = rec?;
        let id = channel_id(&rec);
        if !outputs.contains_key(&id) {
            let t = rec.begin_time().to_ordinal();
            let path = out_dir.join(output_name(rec.station(), rec.network(), rec.location(), rec.channel(), &t));
            let out = OpenOptions::new()
                .create(true)
                .append(true)
                .open(&path)
                .map_err(|source| ExtractError::Open { path: path.display().to_string(), source })?;
            tracing::info!(channel = %id, file = %path.display(), "new output");
            outputs.insert(id.clone(), (path, out));
        }

        if let Some((path, out)) = outputs.get_mut(&id) {
            out.write_all(rec.as_bytes()).map_err(|source| ExtractError::Write {
                path: path.display().to_string(),
                source,
            })?;
        }
        records += 1;
    }

    tracing::info!(records, files = outputs.len(), "extraction finished");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn name_layout() {
        let t = OrdinalTime { year: 2020, day_of_year: 32, hour: 4, minute: 5, second: 59, micros: 0 };
        assert_eq!(output_name("APE", "GE", "", "BHZ", &t), "APE.GE..BHZ.D.2020.032.0405");
        assert_eq!(output_name("ANMO", "IU", "00", "LHZ", &t), "ANMO.IU.00.LHZ.D.2020.032.0405");
    }

    #[test]
    fn empty_input_creates_nothing() {
        let base = std::env::temp_dir().join(format!("mseed-extract-{}", std::process::id()));
        std::fs::create_dir_all(&base).unwrap();
        let input = base.join("empty.mseed");
        std::fs::write(&input, b"").unwrap();

        extract(&input, &base).unwrap();
        let entries = std::fs::read_dir(&base).unwrap().count();
        std::fs::remove_dir_all(&base).ok();
        assert_eq!(entries, 1);
    }

    #[test]
    fn missing_input_is_reported() {
        let err = extract(Path::new("/nonexistent/in.mseed"), Path::new(".")).unwrap_err();
        assert!(err.to_string().starts_with("cannot open /nonexistent/in.mseed"));
    }

    #[test]
    fn splits_by_channel_in_input_order() {
        use mseed_lite::synth::{Synth, synth};

        let bhz1 = synth(Synth::default());
        let anmo1 = synth(Synth { station: "ANMO", network: "IU", location: "00", channel: "LHZ", day: 33, hms: (11, 5, 0), ..Default::default() });
        let bhz2 = synth(Synth { hms: (10, 21, 0), ..Default::default() });
        let bhn = synth(Synth { channel: "BHN", hms: (10, 22, 0), ..Default::default() });
        let anmo2 = synth(Synth { station: "ANMO", network: "IU", location: "00", channel: "LHZ", day: 33, hms: (11, 6, 0), ..Default::default() });

        let base = std::env::temp_dir().join(format!("mseed-extract-split-{}", std::process::id()));
        let out = base.join("out");
        std::fs::create_dir_all(&out).unwrap();
        let input = base.join("mux.mseed");
        std::fs::write(&input, [&bhz1[..], &anmo1[..], &bhz2[..], &bhn[..], &anmo2[..]].concat()).unwrap();

        extract(&input, &out).unwrap();
        let read = |name: &str| std::fs::read(out.join(name)).unwrap();
        let mut names: Vec<String> = std::fs::read_dir(&out)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        let bhz = read("APE.GE..BHZ.D.2020.032.1020");
        let bhn_out = read("APE.GE..BHN.D.2020.032.1022");
        let lhz = read("ANMO.IU.00.LHZ.D.2020.033.1105");
        std::fs::remove_dir_all(&base).ok();

        assert_eq!(
            names,
            ["ANMO.IU.00.LHZ.D.2020.033.1105", "APE.GE..BHN.D.2020.032.1022", "APE.GE..BHZ.D.2020.032.1020"]
        );
        assert_eq!(bhz, [bhz1, bhz2].concat());
        assert_eq!(bhn_out, bhn);
        assert_eq!(lhz, [anmo1, anmo2].concat());
    }
}
