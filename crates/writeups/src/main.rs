//! `writeups` - CLI for the writeups library
//!
//! This binary lists, shows and edits write-ups in the configured store.

#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

use std::path::Path;

use anyhow::{bail, Context, Result};
use clap::Parser;

use writeups::cli::{
    CategoriesCommand, Cli, Command, ConfigCommand, CreateCommand, DeleteCommand, ListCommand,
    OutputFormat, SearchCommand, ShowCommand, StatsCommand, UpdateCommand,
};
use writeups::fixtures::platform_info;
use writeups::sync::{self, Snapshot};
use writeups::{init_logging, views, Config, Error, SyncLayer, Writeup};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbosity());

    if let Command::Config(cmd) = cli.command {
        return handle_config(cli.config, cmd);
    }

    let config = Config::load_from(cli.config.clone())?;
    let store = config.open_store().context("failed to open store")?;
    let session = SyncLayer::new(store, config.sync.clone());

    let snapshot = session.load().await?;
    if snapshot.is_fallback() {
        print_fallback_notice(&snapshot);
    }

    let result = run(&config, &session, &snapshot, cli.command).await;

    if !snapshot.is_fallback() && session.is_fallback() {
        print_fallback_notice(&session.snapshot());
    }
    session.close();
    result
}

async fn run(
    config: &Config,
    session: &SyncLayer,
    snapshot: &Snapshot,
    command: Command,
) -> Result<()> {
    let records = &snapshot.writeups;
    match command {
        Command::List(cmd) => handle_list(config, records, &cmd),
        Command::Show(cmd) => handle_show(config, records, &cmd),
        Command::Search(cmd) => handle_search(records, &cmd),
        Command::Stats(cmd) => handle_stats(records, &cmd),
        Command::Categories(cmd) => handle_categories(records, &cmd),
        Command::Create(cmd) => handle_create(session, &cmd).await,
        Command::Update(cmd) => handle_update(session, &cmd).await,
        Command::Delete(cmd) => handle_delete(session, &cmd).await,
        Command::Config(_) => Ok(()),
    }
}

fn print_fallback_notice(snapshot: &Snapshot) {
    let reason = snapshot
        .reason
        .as_ref()
        .map_or_else(String::new, |r| format!(" ({r})"));
    eprintln!("note: store unavailable{reason}; using sample data, changes will not be saved");
}

fn handle_list(config: &Config, records: &[Writeup], cmd: &ListCommand) -> Result<()> {
    let filter = cmd.filter().map_err(anyhow::Error::msg)?;
    let selected: Vec<Writeup> = if cmd.drafts {
        records
            .iter()
            .filter(|w| filter.matches_any_status(w))
            .cloned()
            .collect()
    } else {
        views::filter(records, &filter)
    };
    let selected = if cmd.recent {
        views::recent(&selected, config.views.recent_limit)
    } else {
        selected
    };

    print_writeups(&selected, cmd.format)?;
    if cmd.format != OutputFormat::Json {
        let published = records.iter().filter(|w| w.published).count();
        println!();
        println!("Showing {} of {published} writeups", selected.len());
    }
    Ok(())
}

fn handle_show(config: &Config, records: &[Writeup], cmd: &ShowCommand) -> Result<()> {
    let writeup = views::find_published_by_slug(records, &cmd.slug)
        .ok_or_else(|| Error::not_found(cmd.slug.clone()))?;
    let outline = views::outline(&writeup.content);
    let related = views::related(records, writeup, config.views.related_limit);

    if cmd.json {
        let detail = serde_json::json!({
            "writeup": writeup,
            "outline": outline,
            "related": related,
        });
        println!("{}", serde_json::to_string_pretty(&detail)?);
        return Ok(());
    }

    println!("{}", writeup.title);
    println!("{}", "=".repeat(writeup.title.chars().count()));
    println!(
        "{} | {} | {} | {}",
        platform_name(&writeup.platform),
        writeup.difficulty,
        writeup.category,
        writeup.date
    );
    if !writeup.tags.is_empty() {
        println!("Tags: {}", writeup.tags.join(", "));
    }
    if !writeup.description.is_empty() {
        println!();
        println!("{}", writeup.description);
    }
    if !outline.is_empty() {
        println!();
        println!("Contents");
        for heading in &outline {
            let indent = "  ".repeat(usize::from(heading.level.saturating_sub(1)));
            println!("  {indent}{}", heading.text);
        }
    }
    println!();
    println!("{}", writeup.content);
    if !related.is_empty() {
        println!();
        println!("Related");
        for other in &related {
            println!("  {} ({})", other.title, other.slug);
        }
    }
    Ok(())
}

fn handle_search(records: &[Writeup], cmd: &SearchCommand) -> Result<()> {
    let matches = views::search(records, &cmd.query);
    print_writeups(&matches, cmd.format)?;
    if matches.is_empty() && cmd.format != OutputFormat::Json {
        println!("No writeups match \"{}\".", cmd.query);
    }
    Ok(())
}

fn handle_stats(records: &[Writeup], cmd: &StatsCommand) -> Result<()> {
    let stats = views::stats(records, sync::today());
    if cmd.json {
        println!("{}", serde_json::to_string_pretty(&stats)?);
        return Ok(());
    }

    println!("Total writeups:     {}", stats.total_published);
    println!("Drafts:             {}", stats.drafts);
    println!("Categories:         {}", stats.active_categories);
    println!("This month:         {}", stats.this_month);
    println!();
    for (platform, count) in &stats.per_platform {
        println!("  {:<18}{count}", platform_name(platform));
    }
    Ok(())
}

fn handle_categories(records: &[Writeup], cmd: &CategoriesCommand) -> Result<()> {
    let groups = views::group_by_platform(records);
    if cmd.json {
        println!("{}", serde_json::to_string_pretty(&groups)?);
        return Ok(());
    }

    for group in groups.values() {
        println!("[{}] {} ({})", group.icon, group.name, group.writeups.len());
        for writeup in &group.writeups {
            println!("  {}  {}", writeup.date, writeup.title);
        }
    }
    Ok(())
}

async fn handle_create(session: &SyncLayer, cmd: &CreateCommand) -> Result<()> {
    let content = read_content(&cmd.content_file)?;
    let writeup = session
        .create(cmd.to_new_writeup(content, sync::today()))
        .await?;
    println!("Created {} ({})", writeup.id, writeup.slug);
    Ok(())
}

async fn handle_update(session: &SyncLayer, cmd: &UpdateCommand) -> Result<()> {
    let content = cmd.content_file.as_deref().map(read_content).transpose()?;
    let patch = cmd.to_patch(content);
    if patch.is_empty() {
        bail!("nothing to update; pass at least one field");
    }
    if session.get(&cmd.id).is_none() {
        return Err(Error::not_found(cmd.id.clone()).into());
    }

    let writeup = session.update(&cmd.id, patch).await?;
    let status = if writeup.published { "published" } else { "draft" };
    println!("Updated {} ({status})", writeup.id);
    Ok(())
}

async fn handle_delete(session: &SyncLayer, cmd: &DeleteCommand) -> Result<()> {
    if !session.delete(&cmd.id).await? {
        return Err(Error::not_found(cmd.id.clone()).into());
    }
    println!("Deleted {}", cmd.id);
    Ok(())
}

fn handle_config(path: Option<std::path::PathBuf>, cmd: ConfigCommand) -> Result<()> {
    match cmd {
        ConfigCommand::Show { json } => {
            let config = Config::load_from(path)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&config)?);
            } else {
                println!("Current Configuration");
                println!("=====================");
                println!();
                println!("[Store]");
                println!("  Backend:            {}", config.store.backend);
                println!(
                    "  URL:                {}",
                    config.store.url.as_deref().unwrap_or("(unset)")
                );
                println!(
                    "  API key:            {}",
                    if config.store.api_key.is_some() { "(set)" } else { "(unset)" }
                );
                println!("  Table:              {}", config.store.table);
                println!("  Timeout (secs):     {}", config.store.timeout_secs);
                println!("  Database path:      {}", config.database_path().display());
                println!("  Read only:          {}", config.store.read_only);
                println!();
                println!("[Sync]");
                println!(
                    "  Fallback on error:  {}",
                    config.sync.fallback_on_load_error
                );
                println!("  Start in fallback:  {}", config.sync.start_in_fallback);
                println!();
                println!("[Views]");
                println!("  Recent limit:       {}", config.views.recent_limit);
                println!("  Related limit:      {}", config.views.related_limit);
            }
        }
        ConfigCommand::Path => {
            println!(
                "{}",
                path.unwrap_or_else(Config::default_config_path).display()
            );
        }
        ConfigCommand::Validate { file } => {
            let path = file.or(path).unwrap_or_else(Config::default_config_path);
            println!("Validating configuration: {}", path.display());
            match Config::load_from(Some(path)) {
                Ok(_) => println!("Configuration is valid."),
                Err(e) => bail!("configuration error: {e}"),
            }
        }
    }
    Ok(())
}

fn read_content(path: &Path) -> Result<String> {
    std::fs::read_to_string(path)
        .with_context(|| format!("failed to read content from {}", path.display()))
}

fn platform_name(platform: &str) -> &str {
    platform_info(platform).map_or(platform, |info| info.name)
}

fn print_writeups(writeups: &[Writeup], format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(writeups)?),
        OutputFormat::Plain => {
            for w in writeups {
                println!(
                    "{}  {} [{}, {}]",
                    w.date,
                    w.title,
                    platform_name(&w.platform),
                    w.difficulty
                );
            }
        }
        OutputFormat::Table => {
            let id_width = writeups.iter().map(|w| w.id.len()).max().unwrap_or(0).max(2);
            let platform_width = writeups
                .iter()
                .map(|w| platform_name(&w.platform).len())
                .max()
                .unwrap_or(0)
                .max(8);
            println!(
                "{:<id_width$}  {:<10}  {:<platform_width$}  {:<10}  {:<9}  TITLE",
                "ID", "DATE", "PLATFORM", "DIFFICULTY", "STATUS"
            );
            for w in writeups {
                println!(
                    "{:<id_width$}  {:<10}  {:<platform_width$}  {:<10}  {:<9}  {}",
                    w.id,
                    w.date.to_string(),
                    platform_name(&w.platform),
                    w.difficulty.as_str(),
                    if w.published { "published" } else { "draft" },
                    w.title
                );
            }
        }
    }
    Ok(())
}
