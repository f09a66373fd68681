//! `poegen templates`: report which template files were found.

use anyhow::Result;

use crate::{Config, TemplateSet};

pub fn execute_templates_command(config: &Config) -> Result<()> {
    let paths = config.template_paths();
    let templates = TemplateSet::load(&paths.solution, &paths.pov, &paths.migration_header);

    println!("Templates:");
    for status in templates.statuses() {
        let (marker, note) = match (&status.problem, status.loaded) {
            (_, true) => ("✓", String::new()),
            (Some(problem), false) => ("✗", format!(" ({problem})")),
            (None, false) => ("✗", " (missing, defaults used)".to_string()),
        };
        println!(
            "  {marker} {:<17} {}{note}",
            status.name,
            status.path.display()
        );
    }
    println!(
        "  Migration header: {} columns",
        templates.migration_header().len()
    );
    Ok(())
}
