//! Lenient version parsing for version predicates.

use regex::Regex;
use semver::Version;
use std::sync::OnceLock;

fn version_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"(\d+)(?:\.(\d+))?(?:\.(\d+))?").expect("Invalid regex pattern")
    })
}

/// Parse a version as written in a descriptor.
///
/// Descriptors carry versions such as `1.5.97.0`, `0.9` or `v2`, none of
/// which are valid semver. The first one to three numeric components are
/// taken, missing ones default to zero, and anything after them (a fourth
/// component, build suffixes) is ignored.
///
/// Returns `None` when the text contains no digits or a component overflows.
pub(crate) fn parse_version(text: &str) -> Option<Version> {
    let caps = version_pattern().captures(text)?;
    let part = |i| match caps.get(i) {
        Some(m) => m.as_str().parse::<u64>().ok(),
        None => Some(0),
    };
    Some(Version::new(part(1)?, part(2)?, part(3)?))
}
