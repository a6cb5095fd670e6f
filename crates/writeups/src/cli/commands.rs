//! CLI command definitions.
//!
//! This module defines the structure of all CLI subcommands and how their
//! arguments become records and patches.

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Args, Subcommand, ValueEnum};

use crate::record::{Difficulty, NewWriteup, WriteupPatch};
use crate::views::{Filter, ALL};

/// List command arguments.
#[derive(Debug, Args)]
pub struct ListCommand {
    /// Only show this platform ("all" for any)
    #[arg(short, long, default_value = ALL)]
    pub platform: String,

    /// Only show this difficulty ("all" for any)
    #[arg(short, long, default_value = ALL)]
    pub difficulty: String,

    /// Include unpublished drafts
    #[arg(long, conflicts_with = "recent")]
    pub drafts: bool,

    /// Only show the most recent published write-ups
    #[arg(short, long)]
    pub recent: bool,

    /// Output format
    #[arg(short, long, value_enum, default_value = "table")]
    pub format: OutputFormat,
}

impl ListCommand {
    /// The selectors as a view filter.
    ///
    /// # Errors
    ///
    /// Returns an error if the difficulty is not recognized.
    pub fn filter(&self) -> Result<Filter, String> {
        Filter::from_selectors(&self.platform, &self.difficulty)
    }
}

/// Show command arguments.
#[derive(Debug, Args)]
pub struct ShowCommand {
    /// Slug of a published write-up
    pub slug: String,

    /// Output as JSON
    #[arg(short, long)]
    pub json: bool,
}

/// Search command arguments.
#[derive(Debug, Args)]
pub struct SearchCommand {
    /// Text to look for in titles and platforms
    pub query: String,

    /// Output format
    #[arg(short, long, value_enum, default_value = "table")]
    pub format: OutputFormat,
}

/// Stats command arguments.
#[derive(Debug, Args)]
pub struct StatsCommand {
    /// Output as JSON
    #[arg(short, long)]
    pub json: bool,
}

/// Categories command arguments.
#[derive(Debug, Args)]
pub struct CategoriesCommand {
    /// Output as JSON
    #[arg(short, long)]
    pub json: bool,
}

/// Optional record fields shared by `create` and `update`.
#[derive(Debug, Default, Args)]
pub struct FieldArgs {
    /// Short summary
    #[arg(long)]
    pub description: Option<String>,

    /// Category tag
    #[arg(long)]
    pub category: Option<String>,

    /// Platform tag (e.g. tryhackme, hackthebox)
    #[arg(long)]
    pub platform: Option<String>,

    /// Difficulty: Easy, Medium, Hard or Insane
    #[arg(long)]
    pub difficulty: Option<Difficulty>,

    /// Publication date (YYYY-MM-DD)
    #[arg(long)]
    pub date: Option<NaiveDate>,

    /// Tag to attach (repeatable)
    #[arg(long = "tag", value_name = "TAG")]
    pub tags: Vec<String>,

    /// URL slug (derived from the title when omitted)
    #[arg(long)]
    pub slug: Option<String>,
}

/// Create command arguments.
#[derive(Debug, Args)]
pub struct CreateCommand {
    /// Title
    #[arg(long)]
    pub title: String,

    /// Markdown file holding the body
    #[arg(long, value_name = "FILE")]
    pub content_file: PathBuf,

    #[command(flatten)]
    pub fields: FieldArgs,

    /// Publish immediately instead of saving a draft
    #[arg(long)]
    pub publish: bool,
}

impl CreateCommand {
    /// Build the new record from these arguments and the file's `content`.
    ///
    /// The category follows the platform unless given explicitly.
    #[must_use]
    pub fn to_new_writeup(&self, content: String, today: NaiveDate) -> NewWriteup {
        let mut record = NewWriteup::new(self.title.clone(), content, today);
        let fields = &self.fields;

        if let Some(platform) = &fields.platform {
            record.platform.clone_from(platform);
            record.category.clone_from(platform);
        }
        if let Some(category) = &fields.category {
            record.category.clone_from(category);
        }
        if let Some(description) = &fields.description {
            record.description.clone_from(description);
        }
        if let Some(difficulty) = fields.difficulty {
            record.difficulty = difficulty;
        }
        if let Some(date) = fields.date {
            record.date = date;
        }
        if let Some(slug) = &fields.slug {
            record.slug.clone_from(slug);
        }
        record.tags.clone_from(&fields.tags);
        record.published = self.publish;
        record
    }
}

/// Update command arguments.
#[derive(Debug, Args)]
pub struct UpdateCommand {
    /// Id of the write-up to change
    pub id: String,

    /// New title
    #[arg(long)]
    pub title: Option<String>,

    /// Markdown file holding the new body
    #[arg(long, value_name = "FILE")]
    pub content_file: Option<PathBuf>,

    #[command(flatten)]
    pub fields: FieldArgs,

    /// Remove all tags
    #[arg(long, conflicts_with = "tags")]
    pub clear_tags: bool,

    /// Mark as published
    #[arg(long, conflicts_with = "unpublish")]
    pub publish: bool,

    /// Mark as draft
    #[arg(long)]
    pub unpublish: bool,
}

impl UpdateCommand {
    /// Build a patch holding only the fields given on the command line.
    #[must_use]
    pub fn to_patch(&self, content: Option<String>) -> WriteupPatch {
        let fields = &self.fields;
        let tags = if self.clear_tags {
            Some(Vec::new())
        } else {
            (!fields.tags.is_empty()).then(|| fields.tags.clone())
        };
        let published = match (self.publish, self.unpublish) {
            (true, _) => Some(true),
            (_, true) => Some(false),
            _ => None,
        };

        WriteupPatch {
            title: self.title.clone(),
            description: fields.description.clone(),
            category: fields.category.clone(),
            difficulty: fields.difficulty,
            platform: fields.platform.clone(),
            date: fields.date,
            tags,
            content,
            published,
            slug: fields.slug.clone(),
        }
    }
}

/// Delete command arguments.
#[derive(Debug, Args)]
pub struct DeleteCommand {
    /// Id of the write-up to delete
    pub id: String,
}

/// Configuration commands.
#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Show current configuration
    Show {
        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Show the configuration file path
    Path,

    /// Validate configuration
    Validate {
        /// Path to configuration file to validate
        #[arg(short, long)]
        file: Option<PathBuf>,
    },
}

/// Output format for commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    /// One line per write-up
    Plain,
    /// Aligned columns
    #[default]
    Table,
    /// JSON output
    Json,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 2, 1).unwrap()
    }

    fn create(fields: FieldArgs, publish: bool) -> CreateCommand {
        CreateCommand {
            title: "Blue Room".to_string(),
            content_file: PathBuf::from("blue.md"),
            fields,
            publish,
        }
    }

    fn update(id: &str) -> UpdateCommand {
        UpdateCommand {
            id: id.to_string(),
            title: None,
            content_file: None,
            fields: FieldArgs::default(),
            clear_tags: false,
            publish: false,
            unpublish: false,
        }
    }

    #[test]
    fn test_create_defaults() {
        let record = create(FieldArgs::default(), false).to_new_writeup("# Blue".into(), today());

        assert_eq!(record.title, "Blue Room");
        assert_eq!(record.slug, "blue-room");
        assert_eq!(record.platform, "tryhackme");
        assert_eq!(record.category, "tryhackme");
        assert_eq!(record.difficulty, Difficulty::Medium);
        assert_eq!(record.date, today());
        assert!(!record.published);
        assert!(record.tags.is_empty());
    }

    #[test]
    fn test_create_category_follows_platform() {
        let fields = FieldArgs {
            platform: Some("hackthebox".to_string()),
            tags: vec!["smb".to_string()],
            ..FieldArgs::default()
        };
        let record = create(fields, true).to_new_writeup("body".into(), today());

        assert_eq!(record.platform, "hackthebox");
        assert_eq!(record.category, "hackthebox");
        assert_eq!(record.tags, ["smb"]);
        assert!(record.published);
    }

    #[test]
    fn test_create_explicit_fields_win() {
        let fields = FieldArgs {
            platform: Some("ctf".to_string()),
            category: Some("crypto".to_string()),
            slug: Some("custom".to_string()),
            difficulty: Some(Difficulty::Insane),
            ..FieldArgs::default()
        };
        let record = create(fields, false).to_new_writeup("body".into(), today());

        assert_eq!(record.category, "crypto");
        assert_eq!(record.slug, "custom");
        assert_eq!(record.difficulty, Difficulty::Insane);
    }

    #[test]
    fn test_update_empty_patch() {
        assert!(update("1").to_patch(None).is_empty());
    }

    #[test]
    fn test_update_publish_flags() {
        let mut cmd = update("1");
        cmd.publish = true;
        assert_eq!(cmd.to_patch(None).published, Some(true));

        let mut cmd = update("1");
        cmd.unpublish = true;
        assert_eq!(cmd.to_patch(None).published, Some(false));
    }

    #[test]
    fn test_update_tags() {
        let mut cmd = update("1");
        cmd.fields.tags = vec!["web".to_string()];
        assert_eq!(cmd.to_patch(None).tags, Some(vec!["web".to_string()]));

        let mut cmd = update("1");
        cmd.clear_tags = true;
        assert_eq!(cmd.to_patch(None).tags, Some(Vec::new()));
    }

    #[test]
    fn test_update_content() {
        let patch = update("1").to_patch(Some("new body".to_string()));
        assert_eq!(patch.content.as_deref(), Some("new body"));
        assert_eq!(patch.title, None);
    }

    #[test]
    fn test_list_filter() {
        let cmd = ListCommand {
            platform: "HackTheBox".to_string(),
            difficulty: "all".to_string(),
            drafts: false,
            recent: false,
            format: OutputFormat::Table,
        };
        let filter = cmd.filter().unwrap();
        assert_eq!(filter.platform.as_deref(), Some("HackTheBox"));
        assert_eq!(filter.difficulty, None);
    }

    #[test]
    fn test_output_format_default() {
        assert_eq!(OutputFormat::default(), OutputFormat::Table);
    }

    #[test]
    fn test_output_format_value_enum() {
        let variants = OutputFormat::value_variants();
        assert_eq!(variants.len(), 3);
        assert!(variants.contains(&OutputFormat::Plain));
        assert!(variants.contains(&OutputFormat::Json));
    }
}
