use rand::rngs::StdRng;
use rand::SeedableRng;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use serde::Deserialize;
use thiserror::Error;
use timescope::{Clock, MarkTimer, TimingAccumulator};

use crate::payload::{self, PayloadKind};

// ─── Config ──────────────────────────────────────────────────────

/// One size/iteration pair: `iterations` items of `size_kb` KiB each.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct RunSpec {
    pub size_kb: usize,
    pub iterations: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CacheBenchConfig {
    #[serde(default = "default_redis_url")]
    pub redis_url: String,

    /// Runs executed in order
    #[serde(default = "default_runs")]
    pub runs: Vec<RunSpec>,

    #[serde(default = "default_payload")]
    pub payload: PayloadKind,

    /// Expiry applied to every written key
    #[serde(default = "default_ttl_secs")]
    pub ttl_secs: u64,

    #[serde(default = "default_key_prefix")]
    pub key_prefix: String,

    /// Payload RNG seed, so re-runs write the same data
    #[serde(default = "default_payload_seed")]
    pub payload_seed: u64,
}

fn default_redis_url() -> String {
    "redis://127.0.0.1:6379/".into()
}
fn default_runs() -> Vec<RunSpec> {
    vec![
        RunSpec { size_kb: 1, iterations: 100 },
        RunSpec { size_kb: 10, iterations: 100 },
        RunSpec { size_kb: 100, iterations: 20 },
    ]
}
fn default_payload() -> PayloadKind {
    PayloadKind::Mixed
}
fn default_ttl_secs() -> u64 {
    600
}
fn default_key_prefix() -> String {
    "cache_bench:".into()
}
fn default_payload_seed() -> u64 {
    42
}

impl Default for CacheBenchConfig {
    fn default() -> Self {
        Self {
            redis_url: default_redis_url(),
            runs: default_runs(),
            payload: default_payload(),
            ttl_secs: default_ttl_secs(),
            key_prefix: default_key_prefix(),
            payload_seed: default_payload_seed(),
        }
    }
}

impl CacheBenchConfig {
    /// JSON from `CACHE_BENCH_CONFIG`, defaults when unset.
    pub fn from_env() -> Result<Self, BenchError> {
        match std::env::var("CACHE_BENCH_CONFIG") {
            Ok(json) => Self::from_json(&json),
            Err(_) => Ok(Self::default()),
        }
    }

    pub fn from_json(json: &str) -> Result<Self, BenchError> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| BenchError::BadConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), BenchError> {
        if self.runs.is_empty() {
            return Err(BenchError::BadConfig("at least one run is required".into()));
        }
        for run in &self.runs {
            if run.size_kb == 0 || run.size_kb > 1024 {
                return Err(BenchError::BadConfig(
                    "size_kb must be between 1 and 1024".into(),
                ));
            }
            if run.iterations == 0 || run.iterations > 100_000 {
                return Err(BenchError::BadConfig(
                    "iterations must be between 1 and 100000".into(),
                ));
            }
        }
        if self.ttl_secs == 0 {
            return Err(BenchError::BadConfig("ttl_secs must be positive".into()));
        }
        Ok(())
    }
}

// ─── Errors ──────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum BenchError {
    #[error("cannot connect to Redis at \"{url}\": {source}")]
    Connect {
        url: String,
        #[source]
        source: redis::RedisError,
    },

    #[error("Redis: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("invalid benchmark config: {0}")]
    BadConfig(String),

    #[error(transparent)]
    Timescope(#[from] timescope::Error),
}

// ─── Outcomes ────────────────────────────────────────────────────

/// Integrity tally for one read phase.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Integrity {
    pub missing: usize,
    pub mismatched: usize,
}

impl Integrity {
    pub fn errors(&self) -> usize {
        self.missing + self.mismatched
    }
}

#[derive(Debug, Clone, Copy)]
pub struct RunOutcome {
    pub spec: RunSpec,
    pub get: Integrity,
    pub mget: Integrity,
}

/// Compare what was read back against what was written, key by key.
pub fn verify(expected: &[(String, String)], retrieved: &[Option<String>]) -> Integrity {
    let mut tally = Integrity::default();
    for (i, (key, written)) in expected.iter().enumerate() {
        match retrieved.get(i).and_then(Option::as_ref) {
            None => {
                tracing::warn!(key = %key, "data not found");
                tally.missing += 1;
            }
            Some(read) if read != written => {
                tracing::warn!(key = %key, "data mismatch");
                tally.mismatched += 1;
            }
            Some(_) => {}
        }
    }
    tally
}

// ─── Runner ──────────────────────────────────────────────────────

/// Execute every configured run against Redis, timing each SET and GET and
/// one MGET per run under `set|get|mget <n>kb` labels.
pub async fn run<C: Clock, M: Clock>(
    conn: &mut ConnectionManager,
    config: &CacheBenchConfig,
    timings: &mut TimingAccumulator<C>,
    marks: &mut MarkTimer<M>,
) -> Result<Vec<RunOutcome>, BenchError> {
    let mut rng = StdRng::seed_from_u64(config.payload_seed);
    let mut outcomes = Vec::with_capacity(config.runs.len());

    for spec in &config.runs {
        // Payloads are built outside the timed sections.
        let items: Vec<(String, String)> = (0..spec.iterations)
            .map(|i| {
                let key = format!("{}{}_{}", config.key_prefix, spec.size_kb, i);
                let value = payload::generate(&mut rng, config.payload, spec.size_kb, i);
                (key, value)
            })
            .collect();
        let keys: Vec<&str> = items.iter().map(|(k, _)| k.as_str()).collect();
        tracing::debug!(size_kb = spec.size_kb, items = items.len(), "payloads ready");

        // ── SET ─────────────────────────────────────────────────
        let label = format!("set {}kb", spec.size_kb);
        for (key, value) in &items {
            timings.start(&label);
            let result: redis::RedisResult<()> = redis::cmd("SET")
                .arg(key)
                .arg(value)
                .arg("EX")
                .arg(config.ttl_secs)
                .query_async(conn)
                .await;
            timings.stop(&label);
            result?;
        }

        // ── GET ─────────────────────────────────────────────────
        let label = format!("get {}kb", spec.size_kb);
        let mut retrieved = Vec::with_capacity(items.len());
        for (key, _) in &items {
            timings.start(&label);
            let result: redis::RedisResult<Option<String>> = conn.get(key).await;
            timings.stop(&label);
            retrieved.push(result?);
        }
        let get = verify(&items, &retrieved);

        // ── MGET ────────────────────────────────────────────────
        let label = format!("mget {}kb", spec.size_kb);
        timings.start(&label);
        let result: redis::RedisResult<Vec<Option<String>>> =
            redis::cmd("MGET").arg(&keys).query_async(conn).await;
        timings.stop(&label);
        let mget = verify(&items, &result?);

        // ── Cleanup ─────────────────────────────────────────────
        let _: () = redis::cmd("DEL").arg(&keys).query_async(conn).await?;

        let line = marks.mark(&format!("{}kb x{}", spec.size_kb, spec.iterations));
        tracing::info!(
            get_errors = get.errors(),
            mget_errors = mget.errors(),
            "{line}"
        );

        outcomes.push(RunOutcome {
            spec: *spec,
            get,
            mget,
        });
    }

    Ok(outcomes)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn written() -> Vec<(String, String)> {
        vec![
            ("k0".into(), "\"a\"".into()),
            ("k1".into(), "\"b\"".into()),
            ("k2".into(), "\"c\"".into()),
        ]
    }

    #[test]
    fn verify_counts_missing_and_mismatched() {
        let read = vec![Some("\"a\"".to_string()), None, Some("\"x\"".to_string())];
        let tally = verify(&written(), &read);
        assert_eq!(tally, Integrity { missing: 1, mismatched: 1 });
        assert_eq!(tally.errors(), 2);
    }

    #[test]
    fn verify_treats_short_reads_as_missing() {
        let read = vec![Some("\"a\"".to_string())];
        assert_eq!(verify(&written(), &read).missing, 2);
    }

    #[test]
    fn empty_config_uses_defaults() {
        let config = CacheBenchConfig::from_json("{}").unwrap();
        assert_eq!(config.runs, default_runs());
        assert_eq!(config.payload, PayloadKind::Mixed);
        assert_eq!(config.ttl_secs, 600);
    }

    #[test]
    fn config_parses_runs_and_payload() {
        let config = CacheBenchConfig::from_json(
            r#"{"runs": [{"size_kb": 4, "iterations": 10}], "payload": "object"}"#,
        )
        .unwrap();
        assert_eq!(config.runs, vec![RunSpec { size_kb: 4, iterations: 10 }]);
        assert_eq!(config.payload, PayloadKind::Object);
    }

    #[test]
    fn config_rejects_out_of_range_runs() {
        let err = CacheBenchConfig::from_json(r#"{"runs": [{"size_kb": 0, "iterations": 1}]}"#)
            .unwrap_err();
        assert!(matches!(err, BenchError::BadConfig(_)));

        let err = CacheBenchConfig::from_json(r#"{"runs": []}"#).unwrap_err();
        assert!(err.to_string().contains("at least one run"));
    }
}
