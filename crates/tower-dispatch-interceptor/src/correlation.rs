//! Correlation identifiers attached to outbound requests.
//!
//! An id is `<milliseconds since epoch, base36>-<9 random base36 chars>`. It
//! only exists for tracing; it never affects routing or caching.

use rand::Rng;
use std::time::{SystemTime, UNIX_EPOCH};

/// Header carrying the correlation id unless configured otherwise.
pub const CORRELATION_HEADER: &str = "x-correlation-id";

const ALPHABET: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";
const SUFFIX_LEN: usize = 9;

/// Generates a fresh correlation id.
pub fn generate() -> String {
    let millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or_default();

    let mut id = to_base36(millis);
    id.push('-');

    let mut rng = rand::rng();
    id.extend((0..SUFFIX_LEN).map(|_| ALPHABET[rng.random_range(0..ALPHABET.len())] as char));
    id
}

fn to_base36(mut n: u128) -> String {
    if n == 0 {
        return "0".to_string();
    }
    let mut digits = Vec::new();
    while n > 0 {
        digits.push(ALPHABET[(n % 36) as usize]);
        n /= 36;
    }
    digits.iter().rev().map(|&b| b as char).collect()
}
