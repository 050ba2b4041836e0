//! Hashtag derivation and merging
//!
//! Announcements carry hashtags from three sources: the configured
//! defaults, tags derived from the committed lyrics, and caller extras.
//! Derivation scans a fixed keyword table so the same lyrics always
//! produce the same tags in the same order. Tags are stored bare; the
//! `#` prefix is a composition-time concern of the social client.

use rechat_common::model::Verse;
use std::collections::HashSet;

/// Lyric keyword to tag table, scanned in order
///
/// Battle-culture vocabulary; several keywords map to the same tag and
/// the scan deduplicates. Keywords are matched as lowercase substrings.
const KEYWORD_TAGS: &[(&str, &str)] = &[
    ("rap", "rapbattle"),
    ("rap", "hiphop"),
    ("rhyme", "rapbattle"),
    ("rhyme", "hiphop"),
    ("freestyle", "freestyle"),
    ("beat", "beatbattle"),
    ("bars", "bars"),
    ("flow", "spitfire"),
    ("professional", "professional"),
    ("expert", "professional"),
    ("beginner", "beginner"),
    ("learning", "beginner"),
];

/// Tags every battle announcement carries
const BASE_TAGS: &[&str] = &["battle", "cypher"];

/// Derive hashtags from the committed lyrics
///
/// Returns matched tags in table order followed by the base tags,
/// deduplicated.
pub fn hashtags_from_lyrics(verses: &[Verse]) -> Vec<String> {
    let lyrics = verses
        .iter()
        .map(|v| v.lyrics.to_lowercase())
        .collect::<Vec<_>>()
        .join(" ");

    let mut tags: Vec<String> = Vec::new();
    for (keyword, tag) in KEYWORD_TAGS {
        if lyrics.contains(keyword) && !tags.iter().any(|t| t == tag) {
            tags.push((*tag).to_string());
        }
    }
    for tag in BASE_TAGS {
        if !tags.iter().any(|t| t == tag) {
            tags.push((*tag).to_string());
        }
    }
    tags
}

/// Merge hashtags from all sources into one deduplicated list
///
/// Order is defaults, then derived, then extras. Leading `#` and
/// surrounding whitespace are stripped; duplicates compare
/// case-insensitively and the first casing wins; empties are dropped.
pub fn merge_hashtags(defaults: &[String], derived: &[String], extras: &[String]) -> Vec<String> {
    let mut merged: Vec<String> = Vec::new();
    let mut seen: HashSet<String> = HashSet::new();

    for tag in defaults.iter().chain(derived).chain(extras) {
        let bare = tag.trim().trim_start_matches('#');
        if bare.is_empty() {
            continue;
        }
        if seen.insert(bare.to_lowercase()) {
            merged.push(bare.to_string());
        }
    }
    merged
}
