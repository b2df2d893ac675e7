//! Command-line interface for the game store.

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;

use crate::config::Config;
use crate::db::Store;
use crate::services::{ImageService, access};

/// Game Store - inventory management for a game shop
#[derive(Parser)]
#[command(name = "game-store")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Read configuration from this file instead of the default locations
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the web server (default)
    Serve,

    /// Delete uploaded images that no game references
    SweepImages {
        /// Keep files younger than this many minutes
        #[arg(long)]
        grace_minutes: Option<u64>,
    },

    /// Write a default config file
    InitConfig {
        #[arg(long)]
        path: Option<PathBuf>,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },

    /// Print an argon2 hash for `security.admin_password_hash`
    HashPassword { password: String },
}

pub async fn cmd_sweep_images(config: &Config, grace_minutes: Option<u64>) -> Result<()> {
    let store = Store::new(&config.general.database_url).await?;
    let images = ImageService::new(&config.general.images_path, config.server.max_upload_bytes);
    let grace = grace_minutes.unwrap_or(config.maintenance.orphan_grace_minutes);

    let report = crate::scheduler::sweep_orphan_images(
        &store,
        &images,
        Duration::from_secs(grace * 60),
    )
    .await?;

    println!(
        "Scanned {} file(s) in {}, removed {} orphan(s)",
        report.scanned,
        images.root().display(),
        report.removed
    );
    Ok(())
}

pub fn cmd_init_config(path: Option<PathBuf>, force: bool) -> Result<()> {
    let path = path.unwrap_or_else(Config::default_config_path);

    if force {
        Config::default().save_to_path(&path)?;
        println!("Wrote default config to {}", path.display());
    } else if Config::create_default_if_missing(&path)? {
        println!("Created {}", path.display());
    } else {
        println!("{} already exists (use --force to overwrite)", path.display());
    }
    Ok(())
}

pub fn cmd_hash_password(password: &str) -> Result<()> {
    if password.is_empty() {
        anyhow::bail!("Password cannot be empty");
    }
    println!("{}", access::hash_password(password)?);
    Ok(())
}
