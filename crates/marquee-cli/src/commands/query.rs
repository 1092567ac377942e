use anyhow::Result;
use std::path::Path;

use crate::services::{load_config, Services};

pub async fn run_query(config_path: Option<&Path>, text: &str, model: Option<&str>) -> Result<()> {
    let config = load_config(config_path)?;
    let services = Services::from_config(&config, false)?;

    let result = services.query.answer(text, model).await?;

    println!("{}", result.answer);
    if !result.matches.is_empty() {
        println!("\nGrounded on:");
        for (rank, m) in result.matches.iter().enumerate() {
            println!("  {:>2}. {} (score {:.3})", rank + 1, m.id, m.score);
        }
    }

    Ok(())
}
