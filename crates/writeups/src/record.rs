//! Core write-up types.
//!
//! A [`Writeup`] is a single published (or draft) article. New records are
//! described by [`NewWriteup`] before a store assigns an id, and edits are
//! described by [`WriteupPatch`], where every field is optional.

use std::sync::OnceLock;

use chrono::NaiveDate;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Platform assigned when none is given.
pub const DEFAULT_PLATFORM: &str = "tryhackme";

/// Difficulty rating of a challenge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub enum Difficulty {
    /// Beginner friendly.
    Easy,
    /// Intermediate.
    #[default]
    Medium,
    /// Advanced.
    Hard,
    /// Expert.
    Insane,
}

impl Difficulty {
    /// All difficulties, easiest first.
    pub const ALL: [Self; 4] = [Self::Easy, Self::Medium, Self::Hard, Self::Insane];

    /// The canonical name.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Easy => "Easy",
            Self::Medium => "Medium",
            Self::Hard => "Hard",
            Self::Insane => "Insane",
        }
    }
}

impl std::fmt::Display for Difficulty {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Difficulty {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|d| d.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown difficulty: {s}"))
    }
}

/// A single write-up.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Writeup {
    /// Opaque identifier, assigned by the store or synthesized locally.
    pub id: String,
    /// Article title.
    pub title: String,
    /// Short summary.
    #[serde(default)]
    pub description: String,
    /// Category tag.
    pub category: String,
    /// Challenge difficulty.
    pub difficulty: Difficulty,
    /// Platform tag, compared case-insensitively.
    pub platform: String,
    /// Publication date.
    pub date: NaiveDate,
    /// Free-text tags.
    #[serde(default)]
    pub tags: Vec<String>,
    /// Markdown body.
    pub content: String,
    /// Whether the write-up is visible to readers.
    pub published: bool,
    /// URL-safe identifier derived from the title.
    pub slug: String,
}

/// A write-up that has not been assigned an id yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewWriteup {
    /// Article title.
    pub title: String,
    /// Short summary.
    #[serde(default)]
    pub description: String,
    /// Category tag.
    pub category: String,
    /// Challenge difficulty.
    pub difficulty: Difficulty,
    /// Platform tag.
    pub platform: String,
    /// Publication date.
    pub date: NaiveDate,
    /// Free-text tags.
    #[serde(default)]
    pub tags: Vec<String>,
    /// Markdown body.
    pub content: String,
    /// Whether the write-up is visible to readers.
    #[serde(default)]
    pub published: bool,
    /// URL-safe identifier.
    pub slug: String,
}

/// A partial update. Absent fields are left alone by remote stores.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WriteupPatch {
    /// New title.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// New summary.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// New category.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    /// New difficulty.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub difficulty: Option<Difficulty>,
    /// New platform.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub platform: Option<String>,
    /// New publication date.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<NaiveDate>,
    /// Replacement tag list.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    /// New markdown body.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    /// New visibility.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub published: Option<bool>,
    /// New slug.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub slug: Option<String>,
}

impl NewWriteup {
    /// Start a new draft with the editor's defaults.
    #[must_use]
    pub fn new(title: impl Into<String>, content: impl Into<String>, today: NaiveDate) -> Self {
        let title = title.into();
        let slug = slugify(&title);
        Self {
            title,
            description: String::new(),
            category: DEFAULT_PLATFORM.to_string(),
            difficulty: Difficulty::default(),
            platform: DEFAULT_PLATFORM.to_string(),
            date: today,
            tags: Vec::new(),
            content: content.into(),
            published: false,
            slug,
        }
    }

    /// Check that required fields are filled in.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidRecord`] if the title or content is blank.
    pub fn validate(&self) -> Result<()> {
        if self.title.trim().is_empty() {
            return Err(Error::InvalidRecord { field: "title" });
        }
        if self.content.trim().is_empty() {
            return Err(Error::InvalidRecord { field: "content" });
        }
        Ok(())
    }

    /// Complete the record with the given id.
    #[must_use]
    pub fn into_writeup(self, id: impl Into<String>) -> Writeup {
        Writeup {
            id: id.into(),
            title: self.title,
            description: self.description,
            category: self.category,
            difficulty: self.difficulty,
            platform: self.platform,
            date: self.date,
            tags: self.tags,
            content: self.content,
            published: self.published,
            slug: self.slug,
        }
    }
}

impl WriteupPatch {
    /// Check if the patch carries no fields.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

impl From<NewWriteup> for WriteupPatch {
    fn from(new: NewWriteup) -> Self {
        Self {
            title: Some(new.title),
            description: Some(new.description),
            category: Some(new.category),
            difficulty: Some(new.difficulty),
            platform: Some(new.platform),
            date: Some(new.date),
            tags: Some(new.tags),
            content: Some(new.content),
            published: Some(new.published),
            slug: Some(new.slug),
        }
    }
}

impl Writeup {
    /// Build a complete record from a patch.
    ///
    /// Fields missing from the patch are taken from `base` when given, and
    /// otherwise default to: empty text, platform and category
    /// `tryhackme`, difficulty `Medium`, date `today`, no tags, unpublished.
    #[must_use]
    pub fn from_patch(
        id: impl Into<String>,
        base: Option<&Writeup>,
        patch: WriteupPatch,
        today: NaiveDate,
    ) -> Self {
        let text = |value: Option<String>, from_base: fn(&Writeup) -> &String, default: &str| {
            value
                .or_else(|| base.map(|b| from_base(b).clone()))
                .unwrap_or_else(|| default.to_string())
        };
        Self {
            id: id.into(),
            title: text(patch.title, |b| &b.title, ""),
            description: text(patch.description, |b| &b.description, ""),
            category: text(patch.category, |b| &b.category, DEFAULT_PLATFORM),
            difficulty: patch
                .difficulty
                .or_else(|| base.map(|b| b.difficulty))
                .unwrap_or_default(),
            platform: text(patch.platform, |b| &b.platform, DEFAULT_PLATFORM),
            date: patch.date.or_else(|| base.map(|b| b.date)).unwrap_or(today),
            tags: patch
                .tags
                .or_else(|| base.map(|b| b.tags.clone()))
                .unwrap_or_default(),
            content: text(patch.content, |b| &b.content, ""),
            published: patch
                .published
                .or_else(|| base.map(|b| b.published))
                .unwrap_or(false),
            slug: text(patch.slug, |b| &b.slug, ""),
        }
    }

    /// The platform key used for grouping.
    #[must_use]
    pub fn platform_key(&self) -> String {
        self.platform.to_lowercase()
    }
}

/// Derive a URL-safe slug from a title.
///
/// Lower-cases the title, drops anything other than ASCII letters, digits,
/// whitespace and hyphens, then joins words with single hyphens.
///
/// # Panics
///
/// Panics if the built-in patterns fail to compile.
#[must_use]
pub fn slugify(title: &str) -> String {
    static DISALLOWED: OnceLock<Regex> = OnceLock::new();
    static SEPARATORS: OnceLock<Regex> = OnceLock::new();

    let disallowed = DISALLOWED.get_or_init(|| Regex::new(r"[^a-z0-9\s-]").expect("valid regex"));
    let separators = SEPARATORS.get_or_init(|| Regex::new(r"[\s-]+").expect("valid regex"));

    let lowered = title.to_lowercase();
    let cleaned = disallowed.replace_all(&lowered, "");
    separators
        .replace_all(cleaned.trim(), "-")
        .trim_matches('-')
        .to_string()
}
