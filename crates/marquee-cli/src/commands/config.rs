use anyhow::Result;
use std::path::{Path, PathBuf};

use marquee_etl::config;

use crate::services::load_config;

fn secret(value: Option<&str>) -> &'static str {
    match value.map(str::trim) {
        Some(v) if !v.is_empty() => "<set>",
        _ => "<not set>",
    }
}

/// Show the current effective configuration.
pub fn show_config(path: Option<&Path>) -> Result<()> {
    let config = load_config(path)?;
    let config_path = resolve_path(path);

    println!("Current Configuration");
    println!("=====================\n");

    println!("Config file: {}", config_path.display());
    let exists = config_path.exists();
    println!("File exists: {}\n", if exists { "yes" } else { "no (using defaults)" });

    println!("Providers:");
    println!("  openai_api_key: {}", secret(config.openai_api_key.as_deref()));
    println!("  openai_base_url: {}", config.openai_base_url);
    println!("  embedding_model: {}", config.embedding_model);
    println!("  pinecone_api_key: {}", secret(config.pinecone_api_key.as_deref()));
    println!(
        "  pinecone_environment: {}",
        config.pinecone_environment.as_deref().unwrap_or("<serverless>")
    );
    println!("  plex_url: {}", config.plex_url);
    println!("  plex_token: {}", secret(config.plex_token.as_deref()));

    println!("\nIndex:");
    println!("  index_name: {}", config.index_name);
    println!("  dimension: {}", config.dimension);
    println!("  metric: {}", config.metric);

    println!("\nPipelines:");
    println!("  batch_size: {}", config.batch_size);
    println!("  top_k: {}", config.top_k);
    println!("  max_retries: {}", config.max_retries);
    println!("  concurrency: {}", config.concurrency);
    println!("  request_timeout_secs: {}", config.request_timeout_secs);
    println!("  sections: {}", config.sections.join(", "));
    println!("  bind: {}", config.bind);

    println!("\nPriority: CLI args > ENV vars (MARQUEE_*) > Config file > Defaults");

    Ok(())
}

/// Show the config file path.
pub fn show_path(path: Option<&Path>) {
    println!("{}", resolve_path(path).display());
}

/// Show example configuration.
pub fn show_example() {
    print!("{}", config::example_config());
}

fn resolve_path(path: Option<&Path>) -> PathBuf {
    path.map_or_else(config::config_file_path, Path::to_path_buf)
}

/// Initialize the config file at `path`, or the default location.
pub fn init_config(path: Option<&Path>) -> Result<()> {
    let config_path = resolve_path(path);
    let created = config::ensure_config_file(&config_path)?;

    if created {
        println!("✓ Created config file: {}", config_path.display());
        println!("\nAdd your OpenAI, Pinecone, and Plex credentials to this file.");
    } else {
        println!("Config file already exists: {}", config_path.display());
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_secrets_are_masked() {
        assert_eq!(secret(Some("sk-live")), "<set>");
        assert_eq!(secret(Some("  ")), "<not set>");
        assert_eq!(secret(None), "<not set>");
    }

    #[test]
    fn test_init_honours_explicit_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("marquee.toml");

        init_config(Some(&path)).unwrap();

        assert!(path.exists());
        assert_eq!(resolve_path(Some(&path)), path);
        assert_eq!(resolve_path(None), config::config_file_path());
    }
}
