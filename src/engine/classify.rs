//! Secret classification by pattern.
//!
//! Order matters: a 32-character lowercase hex string is always `md5`, even when it is really a
//! clear-text password. This is a heuristic, not a hash verification.

use regex::Regex;
use std::sync::LazyLock;

use crate::Category;

static MD5_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-f0-9]{32}$").expect("md5 pattern"));

/// Unanchored: any whole-word hex run of 5 to 40 digits counts.
static SHA1_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b[0-9a-f]{5,40}\b").expect("sha1 pattern"));

/// Map a secret to its category: md5, then sha1, then clear.
pub fn classify_secret(secret: &str) -> Category {
    if MD5_RE.is_match(secret) {
        Category::Md5
    } else if SHA1_RE.is_match(secret) {
        Category::Sha1
    } else {
        Category::Clear
    }
}
