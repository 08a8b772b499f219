//! Content-addressed object keys.

use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};

/// Number of hex digits of the SHA-256 digest kept in a key.
const DIGEST_PREFIX_LEN: usize = 16;

/// Build `<prefix>/<YYYYmmdd_HHMMSS>_<sha256[..16]>.<ext>`.
///
/// Surrounding slashes on `prefix` are ignored; an empty prefix yields a
/// key at the bucket root.
pub fn object_key(prefix: &str, at: DateTime<Utc>, bytes: &[u8], extension: &str) -> String {
    let digest = format!("{:x}", Sha256::digest(bytes));
    let name = format!(
        "{}_{}.{}",
        at.format("%Y%m%d_%H%M%S"),
        &digest[..DIGEST_PREFIX_LEN],
        extension.trim_start_matches('.'),
    );

    match prefix.trim_matches('/') {
        "" => name,
        prefix => format!("{prefix}/{name}"),
    }
}
