use std::num::NonZeroUsize;
use std::path::PathBuf;

use clap::{ArgAction, Parser};
use vm::page_replacer::Algorithm;
use vm::VmError;

#[derive(Parser, Debug)]
#[command(name = "vmsim")]
#[command(about = "Replays a memory trace against a fixed number of page frames")]
#[command(version)]
pub struct Cli {
    /// Number of physical frames
    #[arg(short = 'n', long = "frames", value_name = "FRAMES")]
    pub frames: NonZeroUsize,

    /// Replacement algorithm: opt, nru or clock
    #[arg(short, long, value_name = "ALGORITHM")]
    pub algorithm: Algorithm,

    /// Reference-bit refresh period for nru, in accesses
    #[arg(short, long = "refresh", value_name = "REFRESH")]
    pub refresh: Option<NonZeroUsize>,

    /// Log per-access diagnostics (-v), or policy internals too (-vv)
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,

    /// Trace file, one access per line
    pub tracefile: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimConfig {
    pub frames: NonZeroUsize,
    pub algorithm: Algorithm,
    pub refresh_rate: Option<NonZeroUsize>,
    pub trace: PathBuf,
}

impl TryFrom<Cli> for SimConfig {
    type Error = VmError;

    fn try_from(cli: Cli) -> Result<Self, Self::Error> {
        if cli.algorithm.needs_refresh_rate() && cli.refresh.is_none() {
            return Err(VmError::Configuration(format!(
                "-r <REFRESH> is required with -a {}",
                cli.algorithm
            )));
        }

        Ok(SimConfig {
            frames: cli.frames,
            algorithm: cli.algorithm,
            refresh_rate: cli.refresh,
            trace: cli.tracefile,
        })
    }
}
