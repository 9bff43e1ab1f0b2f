use std::{
    fs,
    io::{self, Write},
    path::PathBuf,
    process::ExitCode,
    time::Instant,
};

use cachesim::{Config, Hierarchy, Result, Trace};
use tracing_subscriber::EnvFilter;

enum ConfigSource {
    Inline(String),
    Path(PathBuf),
}

struct Args {
    config: ConfigSource,
    trace: Option<PathBuf>,
    stats: Option<PathBuf>,
    n_warm: u64,
    heartbeat_int: u64,
}

fn parse_args() -> Result<Args, pico_args::Error> {
    let mut args = pico_args::Arguments::from_env();
    let n_warm = args.opt_value_from_str("-w")?.unwrap_or(0);
    let heartbeat_int = args.opt_value_from_str("-h")?.unwrap_or(0);

    let config = match args.opt_value_from_str("--config")? {
        Some(config_str) => ConfigSource::Inline(config_str),
        None => ConfigSource::Path(args.value_from_str("-p")?),
    };
    let stats = args.opt_value_from_str("--json")?;
    let trace = args.opt_value_from_str("-t")?;

    let rest = args.finish();
    if !rest.is_empty() {
        return Err(pico_args::Error::ArgumentParsingFailed {
            cause: format!("unexpected arguments: {rest:?}"),
        });
    }

    Ok(Args {
        config,
        trace,
        stats,
        n_warm,
        heartbeat_int,
    })
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(io::stderr)
        .init();

    let args = match parse_args() {
        Ok(args) => args,
        Err(err) => {
            tracing::error!("{err}");
            eprintln!("usage: cachesim (--config <json> | -p <path>) [-t <trace>] [--json <out>] [-w <n>] [-h <n>]");
            return ExitCode::from(2);
        }
    };

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!("{err}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: Args) -> Result<()> {
    let config_str = match args.config {
        ConfigSource::Inline(config_str) => config_str,
        ConfigSource::Path(path) => fs::read_to_string(path)?,
    };
    let mut hierarchy = Hierarchy::from_config(Config::from_json(&config_str)?)?;

    let trace = match &args.trace {
        Some(path) => Trace::open(path)?,
        None => Trace::stdin(),
    };

    let mut warmup = args.n_warm > 0;
    let mut next_heartbeat = args.heartbeat_int;
    let mut replayed: u64 = 0;
    let mut skipped: u64 = 0;

    let start = Instant::now();
    for record in trace {
        let access = match record {
            Ok(access) => access,
            Err(err) if err.is_recoverable() => {
                tracing::warn!("skipping record: {err}");
                skipped += 1;
                continue;
            }
            Err(err) => return Err(err),
        };
        hierarchy.access(access);
        replayed += 1;

        if args.heartbeat_int != 0 && replayed >= next_heartbeat {
            tracing::info!(accesses = replayed, "heartbeat");
            next_heartbeat += args.heartbeat_int;
        }
        if warmup && replayed >= args.n_warm {
            hierarchy.clear_stats();
            warmup = false;
            tracing::info!(accesses = replayed, "finished warmup");
        }
    }
    hierarchy.finish();
    let report = hierarchy.report().timed(start.elapsed());
    tracing::info!(replayed, skipped, duration_ms = report.duration_ms, "trace finished");

    for level in &report.levels {
        tracing::info!(
            cache = %level.name,
            policy = level.policy,
            hits = level.hits,
            misses = level.misses,
            hit_rate = level.hit_rate,
            memory_accesses = level.memory_accesses,
            "level summary"
        );
    }

    match &args.stats {
        Some(path) => serde_json::to_writer_pretty(fs::File::create(path)?, &report)?,
        None => {
            let mut out = io::stdout().lock();
            serde_json::to_writer_pretty(&mut out, &report)?;
            writeln!(out)?;
        }
    }
    Ok(())
}
