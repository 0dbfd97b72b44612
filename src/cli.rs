use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use colored::*;

use crate::config::Config;
use crate::model::{AppSettings, GeneratedResult, Identity};
use crate::sheet::SheetFormatter;
use crate::store::{keys, Store};

#[derive(Parser)]
#[command(name = "aaruto", about = "AARUTO terminal summoning console", version)]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Override the data directory
    #[arg(long, global = true)]
    pub data_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Interactive summoning terminal (default)
    Shell,
    /// Show console status
    Status,
    /// List the temporal history
    History,
    /// List the eternal archive
    Archive,
}

fn open_store(data_dir: Option<PathBuf>) -> Result<Store> {
    let config = Config::new(data_dir)?;
    Ok(Store::new(config.data_dir))
}

pub async fn handle_status(data_dir: Option<PathBuf>) -> Result<()> {
    let store = open_store(data_dir)?;

    println!("{}", "aaruto Status".cyan().bold());
    match store.get::<Identity>(keys::IDENTITY) {
        Some(identity) => {
            let rank = if identity.is_admin {
                "MASTER ARCHITECT"
            } else {
                "SUMMONER"
            };
            println!("Identity: {} ({})", identity.email, rank);
        }
        None => println!("Identity: {}", "unsealed".yellow()),
    }

    let history: Vec<GeneratedResult> = store.get(keys::HISTORY).unwrap_or_default();
    let archive: Vec<GeneratedResult> = store.get(keys::ARCHIVE).unwrap_or_default();
    println!("History: {} | Archive: {}", history.len(), archive.len());

    let settings: AppSettings = store.get(keys::SETTINGS).unwrap_or_default();
    println!(
        "Settings: {} | {}px | {} | {}",
        if settings.auto_save {
            "autosave on"
        } else {
            "autosave off"
        },
        settings.resolution,
        settings.art_style,
        settings.lighting
    );

    match store.get::<GeneratedResult>(keys::DRAFT) {
        Some(draft) => println!(
            "Draft: {} — {} (stage {})",
            draft.design.name, draft.design.title, draft.design.evolution_stage
        ),
        None => println!("Draft: none"),
    }

    Ok(())
}

pub async fn handle_history(data_dir: Option<PathBuf>) -> Result<()> {
    let store = open_store(data_dir)?;
    let history: Vec<GeneratedResult> = store.get(keys::HISTORY).unwrap_or_default();
    let draft: Option<GeneratedResult> = store.get(keys::DRAFT);
    println!(
        "{}",
        SheetFormatter::format_history(&history, draft.map(|d| d.timestamp))
    );
    Ok(())
}

pub async fn handle_archive(data_dir: Option<PathBuf>) -> Result<()> {
    let store = open_store(data_dir)?;
    let archive: Vec<GeneratedResult> = store.get(keys::ARCHIVE).unwrap_or_default();
    println!("{}", SheetFormatter::format_archive(&archive));
    Ok(())
}
