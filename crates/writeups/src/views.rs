//! Derived views over a session collection.
//!
//! Every function here is pure: it reads a slice of write-ups (newest first)
//! and builds a fresh result. Output preserves input order; nothing is
//! re-sorted.

use std::collections::BTreeMap;
use std::sync::OnceLock;

use chrono::{Datelike, NaiveDate};
use regex::Regex;
use serde::Serialize;

use crate::fixtures::{platform_info, FALLBACK_ICON};
use crate::record::{Difficulty, Writeup};

/// Selector value meaning "no constraint".
pub const ALL: &str = "all";

/// Published write-ups sharing a platform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategoryGroup {
    /// Lower-case platform key.
    pub key: String,
    /// Display name.
    pub name: String,
    /// One-line description.
    pub description: String,
    /// Icon token.
    pub icon: String,
    /// Members, in collection order.
    pub writeups: Vec<Writeup>,
}

/// Counts shown on the home and admin pages.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Stats {
    /// Published write-ups.
    pub total_published: usize,
    /// Unpublished write-ups.
    pub drafts: usize,
    /// All write-ups.
    pub total: usize,
    /// Published write-ups per lower-case platform.
    pub per_platform: BTreeMap<String, usize>,
    /// Published write-ups dated in the current month.
    pub this_month: usize,
    /// Platforms with at least one published write-up.
    pub active_categories: usize,
}

/// Platform and difficulty selectors for the home page listing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Filter {
    /// Platform to match, ignoring case. `None` or `"all"` matches any.
    pub platform: Option<String>,
    /// Difficulty to match. `None` matches any.
    pub difficulty: Option<Difficulty>,
}

impl Filter {
    /// Build a filter from raw selector strings, where `"all"` means any.
    ///
    /// # Errors
    ///
    /// Returns an error if `difficulty` is neither `"all"` nor a known difficulty.
    pub fn from_selectors(platform: &str, difficulty: &str) -> Result<Self, String> {
        let platform = (!platform.eq_ignore_ascii_case(ALL)).then(|| platform.to_string());
        let difficulty = if difficulty.eq_ignore_ascii_case(ALL) {
            None
        } else {
            Some(difficulty.parse()?)
        };
        Ok(Self {
            platform,
            difficulty,
        })
    }

    /// Check if a write-up passes the selectors. Drafts never do.
    #[must_use]
    pub fn matches(&self, writeup: &Writeup) -> bool {
        writeup.published && self.matches_any_status(writeup)
    }

    /// Check the selectors alone, published or not.
    #[must_use]
    pub fn matches_any_status(&self, writeup: &Writeup) -> bool {
        let platform = match self.platform.as_deref() {
            None => true,
            Some(p) if p.eq_ignore_ascii_case(ALL) => true,
            Some(p) => writeup.platform.eq_ignore_ascii_case(p),
        };
        platform && self.difficulty.map_or(true, |d| writeup.difficulty == d)
    }
}

/// A markdown heading in a write-up body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Heading {
    /// Heading level, 1 to 3.
    pub level: u8,
    /// Heading text without the leading hashes.
    pub text: String,
    /// One-based line number.
    pub line: usize,
}

fn published(records: &[Writeup]) -> impl Iterator<Item = &Writeup> {
    records.iter().filter(|w| w.published)
}

/// Group published write-ups by lower-cased platform.
#[must_use]
pub fn group_by_platform(records: &[Writeup]) -> BTreeMap<String, CategoryGroup> {
    let mut groups: BTreeMap<String, CategoryGroup> = BTreeMap::new();
    for writeup in published(records) {
        let key = writeup.platform_key();
        groups
            .entry(key.clone())
            .or_insert_with(|| match platform_info(&key) {
                Some(info) => CategoryGroup {
                    key: key.clone(),
                    name: info.name.to_string(),
                    description: info.description.to_string(),
                    icon: info.icon.to_string(),
                    writeups: Vec::new(),
                },
                None => CategoryGroup {
                    name: key.clone(),
                    description: format!("{key} writeups"),
                    icon: FALLBACK_ICON.to_string(),
                    key: key.clone(),
                    writeups: Vec::new(),
                },
            })
            .writeups
            .push(writeup.clone());
    }
    groups
}

/// Compute counts, treating `today` as the current date.
#[must_use]
pub fn stats(records: &[Writeup], today: NaiveDate) -> Stats {
    let mut stats = Stats {
        total: records.len(),
        ..Stats::default()
    };
    for writeup in records {
        if !writeup.published {
            stats.drafts += 1;
            continue;
        }
        stats.total_published += 1;
        *stats.per_platform.entry(writeup.platform_key()).or_default() += 1;
        if writeup.date.year() == today.year() && writeup.date.month() == today.month() {
            stats.this_month += 1;
        }
    }
    stats.active_categories = stats.per_platform.len();
    stats
}

/// Published write-ups passing `filter`.
#[must_use]
pub fn filter(records: &[Writeup], filter: &Filter) -> Vec<Writeup> {
    records
        .iter()
        .filter(|w| filter.matches(w))
        .cloned()
        .collect()
}

/// Write-ups, drafts included, whose title or platform contains `query`,
/// ignoring case. An empty query matches everything.
#[must_use]
pub fn search(records: &[Writeup], query: &str) -> Vec<Writeup> {
    let query = query.trim().to_lowercase();
    records
        .iter()
        .filter(|w| {
            w.title.to_lowercase().contains(&query) || w.platform.to_lowercase().contains(&query)
        })
        .cloned()
        .collect()
}

/// The first published write-up with `slug`.
#[must_use]
pub fn find_published_by_slug<'a>(records: &'a [Writeup], slug: &str) -> Option<&'a Writeup> {
    published(records).find(|w| w.slug == slug)
}

/// Up to `limit` other published write-ups sharing a category or difficulty.
#[must_use]
pub fn related(records: &[Writeup], writeup: &Writeup, limit: usize) -> Vec<Writeup> {
    published(records)
        .filter(|w| {
            w.id != writeup.id
                && (w.category == writeup.category || w.difficulty == writeup.difficulty)
        })
        .take(limit)
        .cloned()
        .collect()
}

/// The first `n` published write-ups.
#[must_use]
pub fn recent(records: &[Writeup], n: usize) -> Vec<Writeup> {
    published(records).take(n).cloned().collect()
}

/// Level 1 to 3 headings in a markdown body, skipping fenced code blocks.
///
/// # Panics
///
/// Panics if the built-in heading pattern fails to compile.
#[must_use]
pub fn outline(content: &str) -> Vec<Heading> {
    static HEADING: OnceLock<Regex> = OnceLock::new();
    let heading =
        HEADING.get_or_init(|| Regex::new(r"^(#{1,3})\s+(.+?)\s*#*\s*$").expect("valid regex"));

    let mut in_fence = false;
    let mut headings = Vec::new();
    for (index, line) in content.lines().enumerate() {
        if line.trim_start().starts_with("```") {
            in_fence = !in_fence;
            continue;
        }
        if in_fence {
            continue;
        }
        if let Some(caps) = heading.captures(line) {
            headings.push(Heading {
                level: u8::try_from(caps[1].len()).unwrap_or(3),
                text: caps[2].to_string(),
                line: index + 1,
            });
        }
    }
    headings
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::fixture_writeups;
    use crate::record::NewWriteup;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn writeup(id: &str, platform: &str, difficulty: Difficulty, published: bool) -> Writeup {
        NewWriteup {
            platform: platform.to_string(),
            category: platform.to_lowercase(),
            difficulty,
            published,
            ..NewWriteup::new(format!("Box {id}"), "body", date(2025, 1, 10))
        }
        .into_writeup(id)
    }

    fn grouping_set() -> Vec<Writeup> {
        vec![
            writeup("1", "tryhackme", Difficulty::Easy, true),
            writeup("2", "tryhackme", Difficulty::Hard, true),
            writeup("3", "hackthebox", Difficulty::Hard, true),
            writeup("4", "ctf", Difficulty::Easy, true),
            writeup("5", "vulnhub", Difficulty::Easy, false),
        ]
    }

    #[test]
    fn test_group_by_platform_counts() {
        let groups = group_by_platform(&grouping_set());

        assert_eq!(groups.len(), 3);
        assert_eq!(groups["tryhackme"].writeups.len(), 2);
        assert_eq!(groups["hackthebox"].writeups.len(), 1);
        assert_eq!(groups["ctf"].writeups.len(), 1);
        assert!(!groups.contains_key("vulnhub"));
    }

    #[test]
    fn test_group_by_platform_keeps_order_and_metadata() {
        let groups = group_by_platform(&grouping_set());
        let thm = &groups["tryhackme"];

        assert_eq!(thm.name, "TryHackMe");
        assert_eq!(thm.icon, "Target");
        let ids: Vec<_> = thm.writeups.iter().map(|w| w.id.as_str()).collect();
        assert_eq!(ids, ["1", "2"]);
    }

    #[test]
    fn test_group_by_platform_merges_case() {
        let records = vec![
            writeup("1", "TryHackMe", Difficulty::Easy, true),
            writeup("2", "tryhackme", Difficulty::Easy, true),
        ];
        let groups = group_by_platform(&records);
        assert_eq!(groups.len(), 1);
        assert_eq!(groups["tryhackme"].writeups.len(), 2);
    }

    #[test]
    fn test_group_by_platform_unknown_platform() {
        let records = vec![writeup("1", "PicoCTF", Difficulty::Easy, true)];
        let groups = group_by_platform(&records);
        let group = &groups["picoctf"];

        assert_eq!(group.name, "picoctf");
        assert_eq!(group.icon, FALLBACK_ICON);
    }

    #[test]
    fn test_group_by_platform_empty() {
        assert!(group_by_platform(&[]).is_empty());
    }

    #[test]
    fn test_stats() {
        let mut records = grouping_set();
        records[0].date = date(2024, 1, 20);
        let stats = stats(&records, date(2025, 1, 31));

        assert_eq!(stats.total, 5);
        assert_eq!(stats.total_published, 4);
        assert_eq!(stats.drafts, 1);
        assert_eq!(stats.active_categories, 3);
        assert_eq!(stats.per_platform["tryhackme"], 2);
        assert_eq!(stats.per_platform.get("vulnhub"), None);
        // Same month a year earlier does not count.
        assert_eq!(stats.this_month, 3);
    }

    #[test]
    fn test_stats_empty() {
        assert_eq!(stats(&[], date(2025, 1, 1)), Stats::default());
    }

    #[test]
    fn test_filter_platform_ignores_case() {
        let records = vec![
            writeup("1", "tryhackme", Difficulty::Easy, true),
            writeup("2", "HackTheBox", Difficulty::Hard, true),
            writeup("3", "TRYHACKME", Difficulty::Hard, true),
            writeup("4", "hackthebox", Difficulty::Easy, true),
        ];
        let selectors = Filter::from_selectors("TryHackMe", "all").unwrap();

        let ids: Vec<_> = filter(&records, &selectors)
            .into_iter()
            .map(|w| w.id)
            .collect();
        assert_eq!(ids, ["1", "3"]);
    }

    #[test]
    fn test_filter_difficulty() {
        let selectors = Filter::from_selectors("all", "hard").unwrap();
        let ids: Vec<_> = filter(&grouping_set(), &selectors)
            .into_iter()
            .map(|w| w.id)
            .collect();
        assert_eq!(ids, ["2", "3"]);
    }

    #[test]
    fn test_filter_all_excludes_drafts() {
        let result = filter(&grouping_set(), &Filter::default());
        assert_eq!(result.len(), 4);
        assert!(result.iter().all(|w| w.published));
    }

    #[test]
    fn test_filter_any_status_includes_drafts() {
        let selectors = Filter::from_selectors("vulnhub", "all").unwrap();
        let records = grouping_set();
        assert!(filter(&records, &selectors).is_empty());
        assert!(selectors.matches_any_status(&records[4]));
    }

    #[test]
    fn test_filter_explicit_all_platform() {
        let selectors = Filter {
            platform: Some("ALL".to_string()),
            difficulty: None,
        };
        assert_eq!(filter(&grouping_set(), &selectors).len(), 4);
    }

    #[test]
    fn test_filter_from_selectors_rejects_unknown_difficulty() {
        assert!(Filter::from_selectors("all", "impossible").is_err());
    }

    #[test]
    fn test_search() {
        let records = grouping_set();
        assert_eq!(search(&records, "HACKTHE").len(), 1);
        assert_eq!(search(&records, "box 5").len(), 1);
        assert_eq!(search(&records, "").len(), 5);
        assert!(search(&records, "nothing").is_empty());
    }

    #[test]
    fn test_find_published_by_slug() {
        let mut records = grouping_set();
        records[4].slug = "hidden".to_string();
        records[1].slug = records[0].slug.clone();

        assert_eq!(
            find_published_by_slug(&records, &records[0].slug).map(|w| w.id.as_str()),
            Some("1")
        );
        assert!(find_published_by_slug(&records, "hidden").is_none());
    }

    #[test]
    fn test_related() {
        let records = grouping_set();
        let related = related(&records, &records[0], 3);
        let ids: Vec<_> = related.iter().map(|w| w.id.as_str()).collect();
        // Same category (tryhackme) or same difficulty (Easy), published only.
        assert_eq!(ids, ["2", "4"]);
    }

    #[test]
    fn test_related_limit() {
        let records = fixture_writeups();
        assert!(related(&records, &records[0], 1).len() <= 1);
    }

    #[test]
    fn test_recent() {
        let records = grouping_set();
        let ids: Vec<_> = recent(&records, 2).into_iter().map(|w| w.id).collect();
        assert_eq!(ids, ["1", "2"]);
        assert_eq!(recent(&records, 10).len(), 4);
    }

    #[test]
    fn test_outline() {
        let content = "# Title\n\nintro\n## Recon ##\n```\n# not a heading\n```\n### Root\n#### Deep\n#nospace";
        let headings = outline(content);

        assert_eq!(
            headings,
            vec![
                Heading {
                    level: 1,
                    text: "Title".to_string(),
                    line: 1
                },
                Heading {
                    level: 2,
                    text: "Recon".to_string(),
                    line: 4
                },
                Heading {
                    level: 3,
                    text: "Root".to_string(),
                    line: 8
                },
            ]
        );
    }

    #[test]
    fn test_outline_of_fixtures() {
        let records = fixture_writeups();
        assert!(records.iter().all(|w| !outline(&w.content).is_empty()));
    }
}
