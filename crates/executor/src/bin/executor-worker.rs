//! executor-worker -- synthetic workload driver for the quarry split executor.
//!
//! Generates a mix of short and long splits, runs them through the
//! multilevel feedback queue on a worker pool, and prints the final executor
//! status as JSON. Useful for eyeballing level demotion and the per-level
//! scheduled-time balance under different multipliers.

use std::thread;
use std::time::Duration;

use clap::Parser;
use tracing::info;

use quarry_core::{load_dotenv, QuarryError};
use quarry_executor::executor::{ExecutorConfig, SplitRunner, TaskExecutor};

// ── CLI ─────────────────────────────────────────────────────────────

/// Synthetic workload driver for the quarry split executor.
#[derive(Parser, Debug)]
#[command(name = "executor-worker", version, about)]
struct Cli {
    /// Worker threads (0 = available parallelism).
    #[arg(long, env = "EXECUTOR_WORKER_THREADS", default_value_t = 0)]
    workers: usize,

    /// Number of short (single-quantum) splits.
    #[arg(long, default_value_t = 32)]
    short_splits: usize,

    /// Number of long (multi-quantum) splits.
    #[arg(long, default_value_t = 4)]
    long_splits: usize,

    /// Quanta each long split needs.
    #[arg(long, default_value_t = 50)]
    long_quanta: usize,

    /// Simulated work per quantum in milliseconds.
    #[arg(long, default_value_t = 5)]
    work_ms: u64,

    /// Execution quantum in milliseconds.
    #[arg(long, env = "EXECUTOR_SPLIT_QUANTUM_MS", default_value_t = 20)]
    quantum_ms: u64,

    /// Drain levels strictly in order instead of balancing scheduled time.
    #[arg(long, env = "EXECUTOR_LEVEL_ABSOLUTE_PRIORITY")]
    absolute: bool,

    /// Target scheduled-time ratio between adjacent levels.
    #[arg(long, env = "EXECUTOR_LEVEL_TIME_MULTIPLIER", default_value_t = 2.0)]
    multiplier: f64,
}

// ── Synthetic splits ────────────────────────────────────────────────

/// Burns wall time for a fixed number of quanta.
struct SyntheticSplit {
    name: String,
    work: Duration,
    quanta_left: usize,
}

impl SyntheticSplit {
    fn new(name: String, work: Duration, quanta: usize) -> Self {
        Self {
            name,
            work,
            quanta_left: quanta,
        }
    }
}

impl SplitRunner for SyntheticSplit {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_finished(&self) -> bool {
        self.quanta_left == 0
    }

    fn process(&mut self, quantum: Duration) -> Result<(), QuarryError> {
        thread::sleep(self.work.min(quantum));
        self.quanta_left = self.quanta_left.saturating_sub(1);
        Ok(())
    }
}

// ── main ────────────────────────────────────────────────────────────

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    load_dotenv();
    let cli = Cli::parse();

    let config = ExecutorConfig {
        worker_threads: cli.workers,
        level_absolute_priority: cli.absolute,
        level_time_multiplier: cli.multiplier,
        split_quantum_ms: cli.quantum_ms,
    };

    let total_splits = cli.short_splits + cli.long_splits;
    info!(
        short = cli.short_splits,
        long = cli.long_splits,
        workers = config.resolved_worker_threads(),
        "starting synthetic workload"
    );

    let executor = TaskExecutor::new(config);
    executor.start();

    let task_id = uuid::Uuid::new_v4();
    let work = Duration::from_millis(cli.work_ms);
    for i in 0..cli.short_splits {
        executor.submit(
            task_id,
            Box::new(SyntheticSplit::new(format!("short-{i}"), work, 1)),
        );
    }
    for i in 0..cli.long_splits {
        executor.submit(
            task_id,
            Box::new(SyntheticSplit::new(format!("long-{i}"), work, cli.long_quanta)),
        );
    }

    // Wait for the workload to drain.
    loop {
        let metrics = executor.metrics();
        if (metrics.splits_completed + metrics.splits_failed) as usize >= total_splits {
            break;
        }
        thread::sleep(Duration::from_millis(20));
    }

    executor.shutdown();

    let status = executor.status();
    println!("{}", serde_json::to_string_pretty(&status)?);
    info!(
        completed = status.metrics.splits_completed,
        quanta = status.metrics.quanta_executed,
        "workload drained"
    );
    Ok(())
}
