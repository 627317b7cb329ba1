//! Subcommand implementations.

use std::sync::Arc;

use anyhow::Result;
use social::SocialModule;
use social::password::Argon2Hasher;
use socialrecipe_sql::SqliteStore;
use tracing::info;

use crate::config::AdminConfig;

/// Open the store and initialize the schema.
pub fn open(config: &AdminConfig) -> Result<SocialModule> {
    let path = config.storage.resolve_sqlite_path();
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }

    let sql = Arc::new(
        SqliteStore::open(&path)
            .map_err(|e| anyhow::anyhow!("failed to open SQL store: {}", e))?,
    );
    let module = SocialModule::new(sql, Arc::new(Argon2Hasher), config.social.clone())
        .map_err(|e| anyhow::anyhow!("failed to initialize social module: {}", e))?;
    info!("Social store ready at {}", path.display());
    Ok(module)
}

pub fn init(config: &AdminConfig) -> Result<()> {
    println!(
        "Store initialized at {}",
        config.storage.resolve_sqlite_path().display()
    );
    Ok(())
}

pub fn audit(module: &SocialModule, json_output: bool) -> Result<()> {
    let audit = module.service().audit_counters()?;

    if json_output {
        println!("{}", serde_json::to_string_pretty(&audit)?);
    } else if audit.is_consistent() {
        println!("All counters consistent.");
    } else {
        println!("{:<34} {:<16} {:>8} {:>8}", "ID", "COUNTER", "STORED", "ACTUAL");
        for m in audit.users.iter().chain(audit.recipes.iter()) {
            println!("{:<34} {:<16} {:>8} {:>8}", m.id, m.counter, m.stored, m.actual);
        }
    }

    if !audit.is_consistent() {
        anyhow::bail!(
            "{} counter(s) out of step; run `socialrecipe repair`",
            audit.mismatch_count()
        );
    }
    Ok(())
}

pub fn repair(module: &SocialModule) -> Result<()> {
    let corrected = module.service().repair_counters()?;
    println!("Corrected {} counter(s).", corrected);
    Ok(())
}

pub fn stats(module: &SocialModule, json_output: bool) -> Result<()> {
    let stats = module.service().stats()?;
    if json_output {
        println!("{}", serde_json::to_string_pretty(&stats)?);
    } else {
        println!("users         {}", stats.users);
        println!("recipes       {}", stats.recipes);
        println!("follow_edges  {}", stats.follow_edges);
        println!("likes         {}", stats.likes);
        println!("favorites     {}", stats.favorites);
    }
    Ok(())
}
