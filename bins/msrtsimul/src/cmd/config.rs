use std::collections::BTreeMap;
use std::path::PathBuf;

use clap::{ArgAction, Args};
use serde::Deserialize;

use rtsim_engine::{MarginPolicy, PacingConfig, ReorderConfig, TimeMode};

use super::error::MsrtsimulError;

// ═══════════════════════════════════════════════════════════════
//  Config file (TOML)
// ═══════════════════════════════════════════════════════════════

#[derive(Debug, Default, Deserialize)]
pub struct Config {
    pub speed: Option<f64>,
    pub jump: Option<f64>,
    pub mode: Option<TimeMode>,
    pub unlimited: Option<bool>,
    pub delays: Option<String>,
    pub seedlink: Option<String>,
    pub output: Option<String>,
    pub delay_margin: Option<MarginPolicy>,
    pub max_pending: Option<usize>,
    /// Delays keyed like the delay file; entries from `delays` win.
    #[serde(default)]
    pub delays_inline: BTreeMap<String, f64>,
}

pub fn load_config(path: &str) -> Result<Config, MsrtsimulError> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| MsrtsimulError::Config(format!("cannot read config {path}: {e}")))?;
    parse_config(&content).map_err(|e| MsrtsimulError::Config(format!("bad config {path}: {e}")))
}

fn parse_config(content: &str) -> Result<Config, toml::de::Error> {
    toml::from_str(content)
}

// ═══════════════════════════════════════════════════════════════
//  CLI args
// ═══════════════════════════════════════════════════════════════

#[derive(Args, Clone, Debug)]
pub struct PlaybackArgs {
    /// miniSEED input; standard input when absent or "-"
    #[arg(value_name = "FILE")]
    pub input: Option<String>,

    /// Optional TOML config; command-line flags take precedence
    #[arg(long, env = "MSRTSIMUL_CONFIG")]
    pub config: Option<String>,

    /// Verbose mode; repeat for per-record tracing
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,

    /// Minutes to skip
    #[arg(short, long, value_name = "MIN")]
    pub jump: Option<f64>,

    /// Write on standard output
    #[arg(short = 'c', long, conflicts_with = "output")]
    pub stdout: bool,

    /// Write to a regular file instead of the SeedLink FIFO
    #[arg(long, value_name = "PATH")]
    pub output: Option<String>,

    /// File of per-station artificial delays ("NET.STA: SECONDS")
    #[arg(short, long, value_name = "FILE")]
    pub delays: Option<String>,

    /// SeedLink module name; replaces 'seedlink' in the standard mseedfifo path
    #[arg(long, value_name = "NAME")]
    pub seedlink: Option<String>,

    /// 'realtime' shifts timestamps to now, 'historic' keeps them
    #[arg(short, long)]
    pub mode: Option<TimeMode>,

    /// Speed factor
    #[arg(short, long)]
    pub speed: Option<f64>,

    /// Test mode: pace and log, but write nothing
    #[arg(long)]
    pub test: bool,

    /// Allow miniSEED records which are not 512 bytes
    #[arg(short, long)]
    pub unlimited: bool,

    /// Reorder release margin: 'zero' or 'profile-min'
    #[arg(long, value_name = "POLICY")]
    pub delay_margin: Option<MarginPolicy>,

    /// Release early once this many records are held for reordering
    #[arg(long, value_name = "N")]
    pub max_pending: Option<usize>,
}

// ═══════════════════════════════════════════════════════════════
//  Effective: merged config
// ═══════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputSource {
    Stdin,
    File(PathBuf),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputTarget {
    Stdout,
    File(PathBuf),
    /// `$SEISCOMP_ROOT/var/run/<module>/mseedfifo`
    SeedlinkFifo { module: String },
    /// `--test`: nothing is written.
    Discard,
}

impl std::fmt::Display for OutputTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputTarget::Stdout => f.write_str("stdout"),
            OutputTarget::File(p) => write!(f, "{}", p.display()),
            OutputTarget::SeedlinkFifo { module } => write!(f, "{module} mseedfifo"),
            OutputTarget::Discard => f.write_str("nowhere (test mode)"),
        }
    }
}

/// Final configuration after merging: defaults < config.toml < env/CLI
#[derive(Debug, Clone)]
pub struct Effective {
    pub input: InputSource,
    pub output: OutputTarget,
    pub pacing: PacingConfig,
    pub reorder: ReorderConfig,
    pub delays_file: Option<String>,
    pub delays_inline: BTreeMap<String, f64>,
}

impl Effective {
    pub fn new(args: &PlaybackArgs) -> Result<Self, MsrtsimulError> {
        let cfg = match &args.config {
            Some(path) => load_config(path)?,
            None => Config::default(),
        };
        Self::merge(args, cfg)
    }

    fn merge(args: &PlaybackArgs, cfg: Config) -> Result<Self, MsrtsimulError> {
        let input = match args.input.as_deref() {
            None | Some("-") => InputSource::Stdin,
            Some(path) => InputSource::File(PathBuf::from(path)),
        };

        let output = if args.test {
            OutputTarget::Discard
        } else if args.stdout {
            OutputTarget::Stdout
        } else if let Some(path) = args.output.clone().or(cfg.output) {
            OutputTarget::File(PathBuf::from(path))
        } else {
            let module = args.seedlink.clone().or(cfg.seedlink).unwrap_or_else(|| "seedlink".into());
            if module.is_empty() || module.contains('/') {
                return Err(MsrtsimulError::Config(format!("invalid seedlink module name '{module}'")));
            }
            OutputTarget::SeedlinkFifo { module }
        };

        let pacing = PacingConfig {
            speed: args.speed.or(cfg.speed).unwrap_or(1.0),
            jump_minutes: args.jump.or(cfg.jump).unwrap_or(0.0),
            mode: args.mode.or(cfg.mode).unwrap_or_default(),
            allow_oversized: args.unlimited || cfg.unlimited.unwrap_or(false),
        };
        pacing.validate()?;

        let reorder = ReorderConfig {
            margin: args.delay_margin.or(cfg.delay_margin).unwrap_or_default(),
            max_pending: args.max_pending.or(cfg.max_pending),
        };
        if reorder.max_pending == Some(0) {
            return Err(MsrtsimulError::Config("max-pending must be at least 1".into()));
        }

        Ok(Self {
            input,
            output,
            pacing,
            reorder,
            delays_file: args.delays.clone().or(cfg.delays),
            delays_inline: cfg.delays_inline,
        })
    }
}
