use std::sync::Arc;

use timescope::{
    EmitText, FanoutSink, FileSink, MarkTimer, PrefixedSink, TimescopeConfig, TimingAccumulator,
    TracingSink,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod payload;
mod redis_client;
mod runner;

use runner::{BenchError, CacheBenchConfig};

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    println!();
    println!("╔══════════════════════════════════════════════════╗");
    println!("║   ⏱   CACHE SET / GET / MGET TIMESCOPE           ║");
    println!("╚══════════════════════════════════════════════════╝");
    println!();

    if let Err(e) = run().await {
        eprintln!("❌ {e}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), BenchError> {
    // ── 1. Load configuration ────────────────────────────────────
    let settings = TimescopeConfig::from_env()?;
    let config = CacheBenchConfig::from_env()?;

    // ── 2. Connect to Redis ──────────────────────────────────────
    println!("🔌 Connecting to Redis at {}...", config.redis_url);
    let mut conn = redis_client::connect(&config.redis_url).await?;
    println!("   ✓ connected");

    // ── 3. Build the per-run accumulator and report sink ─────────
    let mut timings = TimingAccumulator::from_config(&settings);
    let mut marks = MarkTimer::new().with_pad(settings.mark_pad);
    let sink = report_sink(&settings);

    // ── 4. Benchmark ─────────────────────────────────────────────
    let outcomes = runner::run(&mut conn, &config, &mut timings, &mut marks).await;

    // Whatever happened, the timings gathered so far are reported.
    let report = timings.finish(&sink, "CLI");

    let outcomes = outcomes?;
    let errors: usize = outcomes
        .iter()
        .map(|o| o.get.errors() + o.mget.errors())
        .sum();
    println!();
    for o in &outcomes {
        println!(
            "   {:>5} KB × {:<6} get errors: {:<4} mget errors: {}",
            o.spec.size_kb,
            o.spec.iterations,
            o.get.errors(),
            o.mget.errors(),
        );
    }
    println!("   Timed labels: {}", report.rows.len());
    println!("   Total integrity errors: {errors}");
    println!("   {}", marks.mark("done"));

    Ok(())
}

/// Tracing always; the log file too when `TIMESCOPE_LOG_FILE` is set.
fn report_sink(settings: &TimescopeConfig) -> FanoutSink {
    let mut sink = FanoutSink::new().with(Arc::new(TracingSink::info()));
    if let Some(file) = FileSink::from_config(settings) {
        tracing::info!(path = %file.path().display(), "also logging timings to file");
        let command_line = std::env::args().collect::<Vec<_>>().join(" ");
        let prefixed: Arc<dyn EmitText> =
            Arc::new(PrefixedSink::new(file, "cache-bench").with_context(command_line));
        sink.push(prefixed);
    }
    sink
}
