//! Modules command - list the probe catalog

use anyhow::Result;
use console::style;
use hostaudit::config::load_config;
use hostaudit::engine::ComplianceEngine;
use hostaudit::probes::default_query;
use serde::Serialize;
use std::path::Path;

#[derive(Serialize)]
struct ModuleInfo<'a> {
    name: &'a str,
    description: &'a str,
    enabled: bool,
}

pub(super) fn run(config_path: Option<&Path>, json: bool) -> Result<()> {
    let config = load_config(config_path, &std::env::current_dir()?)?;
    let mut engine = ComplianceEngine::with_default_probes(default_query(), config.policy);
    config.apply_module_flags(&mut engine);

    let modules: Vec<ModuleInfo> = engine
        .available_modules()
        .into_iter()
        .map(|name| ModuleInfo {
            name,
            description: engine.module_description(name).unwrap_or_default(),
            enabled: engine.is_module_enabled(name).unwrap_or(false),
        })
        .collect();

    if json {
        println!("{}", serde_json::to_string_pretty(&modules)?);
        return Ok(());
    }

    for m in &modules {
        let flag = if m.enabled {
            style("on ").green()
        } else {
            style("off").dim()
        };
        println!("{} {:<28} {}", flag, m.name, style(m.description).dim());
    }
    Ok(())
}
