//! Serial Telemetry Line Parser
//!
//! The rig prints one reading per line as whitespace-separated `NAME: value`
//! tokens, e.g. `R: 12.5 MB: -3 MM:7 MT: 0 L: 5`. Channel order is not fixed,
//! any subset may appear, and firmware debug noise is interleaved freely.
//!
//! Parsing is best-effort: anything that does not look like `identifier:
//! number` is ignored and a line with no matches yields an empty mapping.

use regex::Regex;
use std::collections::HashMap;
use std::sync::OnceLock;

/// `identifier`, colon, optional whitespace, optionally-negative decimal.
const FIELD_PATTERN: &str = r"(\w+):\s*(-?\d+(?:\.\d+)?)";

fn field_regex() -> &'static Regex {
    static FIELD_RE: OnceLock<Regex> = OnceLock::new();
    FIELD_RE.get_or_init(|| {
        // The pattern is a compile-time constant; failure here is a programming error.
        #[allow(clippy::expect_used)]
        Regex::new(FIELD_PATTERN).expect("FIELD_PATTERN is a valid regex")
    })
}

/// Extract every `identifier: number` pair from `line`.
///
/// Keys are unique; when a name repeats the last occurrence wins. Tokens whose
/// number fails to convert are skipped rather than failing the line.
pub fn parse_line(line: &str) -> HashMap<String, f64> {
    let mut fields = HashMap::new();

    for caps in field_regex().captures_iter(line) {
        let (Some(name), Some(value)) = (caps.get(1), caps.get(2)) else {
            continue;
        };
        if let Ok(value) = value.as_str().parse::<f64>() {
            fields.insert(name.as_str().to_string(), value);
        }
    }

    fields
}
