//! `poegen config`: effective configuration with the source of each value.

use anyhow::Result;

use crate::Config;

pub fn execute_config_command(config: &Config) -> Result<()> {
    println!("Effective configuration (root: {}):", config.root_dir.display());
    let entries = config.effective_config();
    let width = entries.keys().map(String::len).max().unwrap_or(0);
    for (key, (value, source)) in entries {
        println!("  {key:<width$} = {value}  [{source}]");
    }

    if let Err(err) = config.llm_settings() {
        println!();
        println!("⚠ {err}");
    }
    Ok(())
}
