use chrono::Utc;
use rand::Rng;
use std::sync::atomic::{AtomicU64, Ordering};

const ALPHABET: &[u8; 36] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ";

/// Issues human-facing booking references.
///
/// Format: `{prefix}-{base36 millis}-{base36 sequence}`. The sequence is
/// strictly increasing within a process, so two references issued by the
/// same generator never collide. Across processes the sequence starts at a
/// random offset and the store's unique index catches the rest.
#[derive(Debug)]
pub struct ReferenceGenerator {
    prefix: String,
    sequence: AtomicU64,
}

impl ReferenceGenerator {
    pub fn new(prefix: impl Into<String>) -> Self {
        let seed = rand::thread_rng().gen_range(0..36u64.pow(4));
        Self {
            prefix: prefix.into(),
            sequence: AtomicU64::new(seed),
        }
    }

    pub fn next_reference(&self) -> String {
        let seq = self.sequence.fetch_add(1, Ordering::Relaxed);
        let millis = u64::try_from(Utc::now().timestamp_millis()).unwrap_or_default();
        format!("{}-{}-{:0>4}", self.prefix, base36(millis), base36(seq))
    }
}

impl Default for ReferenceGenerator {
    fn default() -> Self {
        Self::new("BK")
    }
}

fn base36(mut value: u64) -> String {
    if value == 0 {
        return "0".to_string();
    }
    let mut digits = Vec::new();
    while value > 0 {
        digits.push(ALPHABET[(value % 36) as usize]);
        value /= 36;
    }
    digits.reverse();
    String::from_utf8_lossy(&digits).into_owned()
}
