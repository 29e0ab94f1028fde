//! `reactkit config` — Configuration management commands.

use std::path::Path;

use reactkit_config::AppConfig;

pub async fn validate() -> Result<(), Box<dyn std::error::Error>> {
    println!("🔍 Validating configuration...");

    match AppConfig::load() {
        Ok(config) => {
            println!("   ✅ Config parsed successfully");

            let mut warnings = Vec::new();

            if config.gateway.kind != "console" {
                warnings.push(format!(
                    "Gateway kind '{}' is not available from the CLI; console is used",
                    config.gateway.kind
                ));
            }

            if config.sessions.queue_capacity < 4 {
                warnings.push("queue_capacity below 4 may drop bursts of reactions".to_string());
            }

            if config.replies.timeout_secs > config.sessions.paged_ttl_secs {
                warnings.push("Reply timeout is longer than the paged session ttl".to_string());
            }

            if warnings.is_empty() {
                println!("   ✅ All checks passed");
            } else {
                println!();
                for w in &warnings {
                    println!("   ⚠️  {w}");
                }
            }

            let s = &config.sessions;
            println!();
            println!("   Gateway:   {} #{}", config.gateway.kind, config.gateway.channel);
            println!(
                "   Paged:     {} {} for {}s",
                s.controls.back, s.controls.forward, s.paged_ttl_secs
            );
            println!(
                "   Rating:    {} {} {} for {}s",
                s.controls.up, s.controls.down, s.controls.flag, s.rating_ttl_secs
            );
            println!("   Flag:      {} ({})", s.flag_delta, s.flag_note);
        }
        Err(e) => {
            println!("   ❌ Config error: {e}");
            return Err(e.into());
        }
    }

    Ok(())
}

pub async fn show() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}

pub async fn init(force: bool) -> Result<(), Box<dyn std::error::Error>> {
    let config_path = AppConfig::config_dir().join("config.toml");
    if write_default(&config_path, force)? {
        println!("✅ Wrote default config to {}", config_path.display());
    } else {
        println!("   Config already exists at {}", config_path.display());
        println!("   Use --force to overwrite it");
    }
    Ok(())
}

pub async fn path() -> Result<(), Box<dyn std::error::Error>> {
    let config_path = AppConfig::config_dir().join("config.toml");
    println!("{}", config_path.display());
    Ok(())
}

/// Write the default config to `path`. Returns `false` if a file was kept.
fn write_default(path: &Path, force: bool) -> std::io::Result<bool> {
    if path.exists() && !force {
        return Ok(false);
    }
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir)?;
    }
    std::fs::write(path, AppConfig::default_toml())?;
    Ok(true)
}
