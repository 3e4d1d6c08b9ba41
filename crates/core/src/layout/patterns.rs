//! Name heuristics for season and specials detection.

use once_cell::sync::Lazy;
use regex_lite::Regex;

use super::TargetFolder;

/// "Season 3", "Season_03", "season.2", "S03", "s3", "S01E05".
static SEASON: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)(?:^|[^a-z0-9])(?:season[ _.-]*(\d{1,2})|s(\d{1,2})(?:e\d{1,4}(?:v\d)?)?)(?:[^a-z0-9]|$)",
    )
    .expect("season pattern is valid")
});

/// "Specials", "SpecialEpisodes", "ExtrasBD", "OVA", "SP1", "NCED", "NCOP2".
///
/// The long tokens match as word prefixes; `ova` and `sp` must stand alone.
static SPECIALS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)(?:^|[^a-z])(?:special|extra|nced|ncop|(?:ova|sp)(?:s|\d+)?(?:[^a-z]|$))",
    )
    .expect("specials pattern is valid")
});

const FORBIDDEN_TITLE_CHARS: &[char] = &['\\', '/', ':', '*', '?', '"', '<', '>', '|'];

/// Make a library title safe to use as a folder name.
pub fn sanitize_title(title: &str) -> String {
    title
        .chars()
        .map(|c| if FORBIDDEN_TITLE_CHARS.contains(&c) { ' ' } else { c })
        .collect::<String>()
        .trim()
        .to_string()
}

/// Season number named by `name`, if any.
pub fn season_number(name: &str) -> Option<u32> {
    let caps = SEASON.captures(name)?;
    caps.get(1)
        .or_else(|| caps.get(2))
        .and_then(|m| m.as_str().parse().ok())
}

pub fn is_specials(name: &str) -> bool {
    SPECIALS.is_match(name)
}

/// Classify a single path component: season first, then specials.
///
/// Season 0 (`S00`) is reported as specials.
pub fn classify_name(name: &str) -> Option<TargetFolder> {
    if let Some(season) = season_number(name) {
        return Some(TargetFolder::season(season));
    }
    if is_specials(name) {
        return Some(TargetFolder::Specials);
    }
    None
}
