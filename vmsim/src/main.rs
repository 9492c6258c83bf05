mod cli;

use std::fs::File;
use std::io::{self, BufReader};
use std::process::ExitCode;

use clap::{CommandFactory, Parser};
use log::{info, LevelFilter};

use cli::{Cli, SimConfig};
use vm::{
    mmu::{Mmu, Stats},
    page_replacer::{PageReplacer, Policy},
    trace::read_trace,
    VmError,
};

fn init_logger(verbose: u8) {
    let level = match verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };

    env_logger::Builder::new()
        .filter_level(level)
        .format_timestamp(None)
        .parse_default_env()
        .init();
}

fn simulate(config: SimConfig) -> vm::Result<Stats> {
    let file = File::open(&config.trace).map_err(|e| {
        VmError::Io(io::Error::new(
            e.kind(),
            format!("cannot open {}: {}", config.trace.display(), e),
        ))
    })?;

    let trace = read_trace(BufReader::new(file))?;
    info!("vmsim: {} accesses read from {}", trace.len(), config.trace.display());

    let policy = Policy::build(config.algorithm, config.refresh_rate, &trace)?;
    info!("vmsim: {} with {} frames", policy.name(), config.frames);

    let mut mmu = Mmu::new(config.frames.get(), policy);

    mmu.run(&trace)
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    init_logger(cli.verbose);

    match SimConfig::try_from(cli).and_then(simulate) {
        Ok(stats) => {
            println!("{}", stats);
            ExitCode::SUCCESS
        }
        Err(err) => {
            eprintln!("vmsim: {}", err);

            if let VmError::Configuration(_) = err {
                eprintln!("{}", Cli::command().render_usage());
            }

            ExitCode::from(err.exit_code())
        }
    }
}
