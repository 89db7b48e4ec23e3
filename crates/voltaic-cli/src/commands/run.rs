use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::Args;
use voltaic_blocks::builtin_registry;
use voltaic_core::engine::Engine;
use voltaic_core::report::{Reporter, TickReport};
use voltaic_core::serialize::read_snapshot_header;
use voltaic_core::sim::RunOptions;

#[derive(Args, Debug, Clone)]
pub struct RunArgs {
    /// Number of ticks to simulate
    #[arg(short, long, default_value = "20")]
    pub ticks: u64,

    /// Run ticks back-to-back instead of at the configured rate
    #[arg(long)]
    pub fast: bool,

    /// Only print the final summary
    #[arg(short, long)]
    pub quiet: bool,

    /// Print one JSON object per tick instead of text
    #[arg(long)]
    pub json: bool,

    /// Write a snapshot of the final state to this file
    #[arg(long)]
    pub save: Option<PathBuf>,
}

/// Writes tick reports to an output stream. Keeps the first write error;
/// [`simulate`] checks it after every tick and stops.
struct PrintReporter<'a> {
    out: &'a mut dyn Write,
    json: bool,
    error: Option<io::Error>,
}

impl PrintReporter<'_> {
    fn write(&mut self, report: &TickReport) -> io::Result<()> {
        if self.json {
            serde_json::to_writer(&mut *self.out, report)?;
            writeln!(self.out)
        } else {
            write!(self.out, "{report}")
        }
    }
}

impl Reporter for PrintReporter<'_> {
    fn report(&mut self, report: &TickReport) {
        if self.error.is_none() {
            if let Err(e) = self.write(report) {
                self.error = Some(e);
            }
        }
    }
}

pub fn run(layout: &Path, args: &RunArgs, out: &mut dyn Write) -> anyhow::Result<()> {
    let mut engine = super::load_engine(layout)?;
    simulate(&mut engine, args, out)
}

pub fn resume(snapshot: &Path, args: &RunArgs, out: &mut dyn Write) -> anyhow::Result<()> {
    let data = fs::read(snapshot).with_context(|| format!("reading {}", snapshot.display()))?;
    let header = read_snapshot_header(&data)
        .with_context(|| format!("{} is not a snapshot", snapshot.display()))?;
    log::info!("resuming {} at tick {}", snapshot.display(), header.tick);

    let registry = builtin_registry().context("registering built-in blocks")?;
    let mut engine = Engine::deserialize(&data, registry)
        .with_context(|| format!("loading {}", snapshot.display()))?;
    simulate(&mut engine, args, out)
}

fn simulate(engine: &mut Engine, args: &RunArgs, out: &mut dyn Write) -> anyhow::Result<()> {
    let options = RunOptions::default()
        .ignore_speed(args.fast)
        .report(!args.quiet);
    let mut reporter = PrintReporter {
        out: &mut *out,
        json: args.json,
        error: None,
    };

    // One tick at a time so a closed output stops a paced run promptly.
    for _ in 0..args.ticks {
        let result = engine.run(1, options, &mut reporter);
        if let Some(e) = reporter.error.take() {
            return Err(e).context("writing report");
        }
        result.with_context(|| format!("simulation failed at tick {}", engine.clock()))?;
    }

    if !args.json {
        writeln!(
            out,
            "ran {} ticks, clock {}, {} blocks, state hash {:016x}",
            args.ticks,
            engine.clock(),
            engine.block_count(),
            engine.state_hash()
        )?;
    }

    if let Some(path) = &args.save {
        let bytes = engine.serialize().context("encoding snapshot")?;
        fs::write(path, bytes).with_context(|| format!("writing {}", path.display()))?;
        log::info!("saved snapshot to {}", path.display());
    }
    Ok(())
}
