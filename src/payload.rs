use rand::Rng;
use serde::Deserialize;
use serde_json::{Map, Value};

// ─── Constants ───────────────────────────────────────────────────

const ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ";

/// Field names inside array/object payloads.
const FIELD_KEY_LEN: usize = 16;

/// Largest single value inside an array/object payload.
const MAX_FIELD_BYTES: usize = 10 * 1024;

// ─── Payload kinds ───────────────────────────────────────────────

/// Shape of the synthetic value written to the cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PayloadKind {
    /// One flat random string
    String,
    /// A list of random strings
    Array,
    /// A map of random keys to random strings
    Object,
    /// Rotate string → array → object by item index
    Mixed,
}

impl PayloadKind {
    /// Concrete kind for the `i`-th item of a run.
    fn for_item(self, i: usize) -> Self {
        match self {
            Self::Mixed => [Self::String, Self::Array, Self::Object][i % 3],
            other => other,
        }
    }
}

// ─── Generators ──────────────────────────────────────────────────

/// Random alphanumeric string of exactly `len` bytes.
pub fn random_string<R: Rng>(rng: &mut R, len: usize) -> String {
    (0..len)
        .map(|_| ALPHABET[rng.gen_range(0..ALPHABET.len())] as char)
        .collect()
}

/// Build the `i`-th payload of roughly `size_kb` KiB and return it as the
/// JSON text that is stored in the cache.
pub fn generate<R: Rng>(rng: &mut R, kind: PayloadKind, size_kb: usize, i: usize) -> String {
    let target = size_kb * 1024;

    let value = match kind.for_item(i) {
        PayloadKind::Array => Value::Array(
            chunks(rng, target)
                .into_iter()
                .map(|(_, v)| Value::String(v))
                .collect(),
        ),
        PayloadKind::Object => {
            let map: Map<String, Value> = chunks(rng, target)
                .into_iter()
                .map(|(k, v)| (k, Value::String(v)))
                .collect();
            Value::Object(map)
        }
        _ => Value::String(random_string(rng, target)),
    };

    value.to_string()
}

/// Split `target` bytes into `(key, value)` pairs, each value capped at
/// `MAX_FIELD_BYTES`.
fn chunks<R: Rng>(rng: &mut R, target: usize) -> Vec<(String, String)> {
    let mut out = Vec::new();
    let mut total = 0;

    while total < target {
        let key = random_string(rng, FIELD_KEY_LEN);
        let remaining = target.saturating_sub(total + key.len());
        let value = random_string(rng, remaining.min(MAX_FIELD_BYTES));
        total += key.len() + value.len();
        out.push((key, value));
    }

    out
}
