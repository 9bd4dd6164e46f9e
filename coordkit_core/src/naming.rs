//! Display-name derivation and record identity.

use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use uuid::Uuid;

/// First free name among `base`, `base_2`, `base_3`, ...
///
/// `base` is trimmed; an empty base becomes `"1"`.
pub fn derive_unique_name(existing: &HashSet<String>, base: &str) -> String {
    let trimmed = base.trim();
    let base = if trimmed.is_empty() { "1" } else { trimmed };
    if !existing.contains(base) {
        return base.to_string();
    }
    let mut suffix: u64 = 2;
    loop {
        let candidate = format!("{base}_{suffix}");
        if !existing.contains(&candidate) {
            return candidate;
        }
        suffix += 1;
    }
}

/// Next purely numeric name: max existing numeric name + 1 (from 0),
/// made unique against `names`. Numbers of any length are compared exactly.
pub fn next_numeric_suggested_name<'a, I>(names: I) -> String
where
    I: IntoIterator<Item = &'a str>,
{
    let mut existing = HashSet::new();
    let mut max: &'a str = "0";
    for n in names {
        if !n.is_empty() && n.bytes().all(|b| b.is_ascii_digit()) {
            let digits = n.trim_start_matches('0');
            if (digits.len(), digits) > (max.len(), max) {
                max = digits;
            }
        }
        existing.insert(n.to_string());
    }
    derive_unique_name(&existing, &increment_decimal(max))
}

/// `digits + 1` for a non-empty string of ASCII digits.
fn increment_decimal(digits: &str) -> String {
    let mut out: Vec<u8> = digits.bytes().collect();
    for b in out.iter_mut().rev() {
        if *b == b'9' {
            *b = b'0';
        } else {
            *b += 1;
            return String::from_utf8_lossy(&out).into_owned();
        }
    }
    out.insert(0, b'1');
    String::from_utf8_lossy(&out).into_owned()
}

/// Opaque, immutable record identifier.
pub type RecordId = String;

static FALLBACK_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Random 128-bit identifier from the OS CSPRNG.
///
/// If the OS source fails, falls back to timestamp + process id + a
/// process-wide counter, which stays unique across rapid calls.
pub fn generate_id() -> RecordId {
    let mut bytes = [0u8; 16];
    match getrandom::getrandom(&mut bytes) {
        Ok(()) => uuid::Builder::from_random_bytes(bytes)
            .into_uuid()
            .to_string(),
        Err(e) => {
            tracing::warn!(error = %e, "OS random source unavailable; using fallback id");
            fallback_id()
        }
    }
}

fn fallback_id() -> RecordId {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or_default();
    let seq = FALLBACK_COUNTER.fetch_add(1, Ordering::Relaxed);
    format!("{nanos:x}-{:x}-{seq:x}", std::process::id())
}

/// True if `id` parses as a UUID (the normal, non-fallback form).
pub fn is_uuid(id: &str) -> bool {
    Uuid::parse_str(id).is_ok()
}
