//! Data-block naming rules shared by every host.
//!
//! Registries keep names unique by appending a three-digit counter
//! (`Body` → `Body.001`). Loading a file whose name is already taken goes
//! through the same rule, which is how stale images are detected later.

use std::sync::OnceLock;

use regex::Regex;

/// Longest name a data block may carry, in bytes.
pub const MAX_NAME_LEN: usize = 63;

const NUMERIC_SUFFIX_PATTERN: &str = r"^(?P<stem>.+)\.(?P<counter>\d{3,})$";

static NUMERIC_SUFFIX_REGEX: OnceLock<Regex> = OnceLock::new();

fn numeric_suffix_regex() -> &'static Regex {
    NUMERIC_SUFFIX_REGEX
        .get_or_init(|| Regex::new(NUMERIC_SUFFIX_PATTERN).expect("invalid regex pattern"))
}

/// Splits `Name.001` into `("Name", Some(1))`; names without a counter come
/// back unchanged with `None`.
pub fn split_numeric_suffix(name: &str) -> (&str, Option<u32>) {
    match numeric_suffix_regex().captures(name) {
        Some(caps) => {
            let stem = caps.name("stem").map_or(name, |m| m.as_str());
            let counter = caps.name("counter").and_then(|m| m.as_str().parse().ok());
            (stem, counter)
        }
        None => (name, None),
    }
}

/// Returns `base` if free, otherwise the first free `stem.NNN`.
pub fn unique_name(base: &str, taken: impl Fn(&str) -> bool) -> String {
    if !taken(base) {
        return base.to_string();
    }
    let (stem, _) = split_numeric_suffix(base);
    (1u32..)
        .map(|n| format!("{}.{:03}", stem, n))
        .find(|candidate| !taken(candidate))
        .unwrap_or_else(|| base.to_string())
}
