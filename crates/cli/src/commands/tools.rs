//! `parley tools` — List the registered tool catalogue.

use parley_config::AppConfig;

pub fn run(config: AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    let registry = parley_tools::default_registry(&config.extraction.base_url);
    let mut definitions = registry.definitions();
    definitions.sort_by(|a, b| a.name.cmp(&b.name));

    println!("{} tools registered:", definitions.len());
    for def in definitions {
        println!("  {:<20} {}", def.name, def.description);
    }
    Ok(())
}
