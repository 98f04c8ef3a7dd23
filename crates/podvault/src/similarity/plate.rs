//! Vehicle registration plate validation.

use std::sync::LazyLock;

use regex::Regex;

/// The four accepted regional plate shapes, pre-compiled once.
///
/// - current: two letters, two digits, three letters (`GV66XRO`)
/// - prefix: one letter, one to three digits, three letters (`A123BCD`)
/// - dateless: one to three letters, one to four digits (`ABC1234`)
/// - reversed regional: one to four digits, one or two letters (`1234AB`)
static PLATE_FORMATS: LazyLock<[Regex; 4]> = LazyLock::new(|| {
    [
        Regex::new(r"^[A-Z]{2}[0-9]{2}[A-Z]{3}$").expect("valid plate pattern"),
        Regex::new(r"^[A-Z][0-9]{1,3}[A-Z]{3}$").expect("valid plate pattern"),
        Regex::new(r"^[A-Z]{1,3}[0-9]{1,4}$").expect("valid plate pattern"),
        Regex::new(r"^[0-9]{1,4}[A-Z]{1,2}$").expect("valid plate pattern"),
    ]
});

/// Uppercases and strips whitespace, then accepts the value only if it
/// matches one of the fixed regional formats.
pub fn parse_plate(s: &str) -> Option<String> {
    let cleaned: String = s
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect::<String>()
        .to_uppercase();

    if cleaned.is_empty() {
        return None;
    }

    PLATE_FORMATS
        .iter()
        .any(|re| re.is_match(&cleaned))
        .then_some(cleaned)
}
