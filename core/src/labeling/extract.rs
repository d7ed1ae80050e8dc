//! Label extraction — split an Item's raw text into period and time range.

use once_cell::sync::Lazy;
use regex::Regex;

// ASCII digits only; `\d` would also match digits from other scripts.
static TIME_RANGE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"([0-9]{1,2}:[0-9]{2})\s*-\s*([0-9]{1,2}:[0-9]{2})").expect("time range pattern compiles")
});

static TRAILING_SEPARATORS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[\s,|:\-–—]+$").expect("separator pattern compiles"));

static WHITESPACE_RUN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s+").expect("whitespace pattern compiles"));


/// The structured parts of an Item's text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ItemLabel {
    pub period_text: String,
    pub time_range: String,
}


/// Parse raw Item text.
///
/// The first `H:MM - H:MM` token becomes `time_range`, normalized to single
/// spaces around the dash. Everything before it, minus trailing separators
/// and with whitespace runs collapsed, becomes `period_text`. Without a
/// time range the whole trimmed input is the period.
pub fn parse(raw: &str) -> ItemLabel {
    let Some(caps) = TIME_RANGE.captures(raw) else {
        return ItemLabel {
            period_text: raw.trim().to_string(),
            time_range: String::new(),
        };
    };
    let time_range = format!("{} - {}", &caps[1], &caps[2]);
    let start = caps.get(0).map_or(0, |m| m.start());
    let left = raw[..start].trim();
    let left = TRAILING_SEPARATORS.replace(left, "");
    let period_text = WHITESPACE_RUN.replace_all(&left, " ").into_owned();
    ItemLabel {
        period_text,
        time_range,
    }
}
