use anyhow::{Context, Result};
use encore_etl::{config, Config};

fn mask(secret: Option<&str>) -> String {
    match secret {
        Some(s) if s.chars().count() > 8 => {
            let head: String = s.chars().take(4).collect();
            let tail: String = s.chars().skip(s.chars().count() - 4).collect();
            format!("{head}…{tail}")
        }
        Some(s) if !s.is_empty() => "****".to_string(),
        _ => "<not set>".to_string(),
    }
}

/// Show the current effective configuration.
pub fn show_config(config: &Config) -> Result<()> {
    println!("Current Configuration");
    println!("=====================\n");

    let path = config::config_file_path();
    println!("Config file: {}", path.display());
    println!(
        "File exists: {}\n",
        if path.exists() { "yes" } else { "no (using defaults)" }
    );

    let mut shown = config.clone();
    shown.setlistfm_api_key = Some(mask(config.setlistfm_api_key.as_deref()));
    shown.openai_api_key = Some(mask(config.openai_api_key.as_deref()));

    let rendered = toml::to_string_pretty(&shown).context("Failed to render configuration")?;
    println!("{rendered}");

    println!("Priority: CLI args > ENV vars (ENCORE_*) > Config file > Defaults");
    Ok(())
}

pub fn show_path() {
    println!("{}", config::config_file_path().display());
}

pub fn init_config() -> Result<()> {
    let path = config::config_file_path();
    if config::ensure_config_file()? {
        println!("✓ Created {}", path.display());
        println!("  Edit it to add your API keys.");
    } else {
        println!("Config file already exists: {}", path.display());
    }
    Ok(())
}

pub fn show_example() {
    print!("{}", config::example_config());
}
