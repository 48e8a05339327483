//! CLI subcommand handlers.

use crate::Commands;
use crate::ConfigAction;
use crate::ReportsAction;
use std::path::Path;
use std::sync::Arc;
use zscout_core::config::{default_config_toml, workspace_config_path};
use zscout_core::research::SubtopicResult;
use zscout_core::{GenerateOptions, Message, Report, ReportStore, ResearchEngine, ZScoutConfig};

/// Handle a CLI subcommand.
pub async fn handle_command(
    command: Commands,
    mut config: ZScoutConfig,
    workspace: &Path,
) -> anyhow::Result<()> {
    match command {
        Commands::Config { action } => handle_config(action, &config, workspace),
        Commands::Reports { action } => handle_reports(action, &config, workspace),
        Commands::Serve { host, port } => {
            if let Some(host) = host {
                config.server.host = host;
            }
            if let Some(port) = port {
                config.server.port = port;
            }
            let server = config.server.clone();
            let engine = build_engine(config, workspace)?;
            zscout_core::run_gateway(server, Arc::new(engine)).await?;
            Ok(())
        }
        Commands::Report {
            query,
            grounding,
            no_grounding,
            json,
            output,
            skip_quality_retry,
        } => {
            let engine = build_engine(config, workspace)?;
            let options = GenerateOptions {
                grounding: grounding_override(grounding, no_grounding),
                model: None,
                skip_quality_retry,
            };
            let generated = engine.generate_report(&query, &options).await?;
            eprintln!(
                "{} sections, {} references, {} characters ({} attempt{})",
                generated.quality.section_count,
                generated.quality.reference_count,
                generated.quality.total_chars,
                generated.attempts,
                if generated.attempts == 1 { "" } else { "s" }
            );
            let rendered = if json {
                serde_json::to_string_pretty(&generated)?
            } else {
                generated.report.to_markdown()
            };
            match output {
                Some(path) => {
                    std::fs::write(&path, rendered)?;
                    println!("Wrote report {} to {}", generated.id, path.display());
                }
                None => println!("{}", rendered),
            }
            Ok(())
        }
        Commands::Subtopics { query, max, report } => {
            let content = report
                .as_deref()
                .map(load_report_file)
                .transpose()?
                .map(|r| r.to_markdown());
            let engine = build_engine(config, workspace)?;
            let subtopics = engine
                .extract_subtopics(&query, content.as_deref(), max)
                .await?;
            for (i, subtopic) in subtopics.iter().enumerate() {
                println!("{}. {}", i + 1, subtopic);
            }
            Ok(())
        }
        Commands::Abstract { report, query } => {
            let stored_query = read_query(&report);
            let parsed = load_report_file(&report)?;
            let engine = build_engine(config, workspace)?;
            let text = engine
                .generate_abstract(
                    &parsed.title,
                    &parsed.sections,
                    query.or(stored_query).as_deref(),
                )
                .await?;
            println!("{}", text);
            Ok(())
        }
        Commands::Scrape {
            query,
            subtopics,
            json,
        } => {
            let engine = build_engine(config, workspace)?;
            let results = engine.scrape_subtopics(&query, &subtopics).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&results)?);
            } else {
                print!("{}", render_scrape(&results));
            }
            Ok(())
        }
        Commands::Chat {
            question,
            report,
            grounding,
        } => {
            let context = report.as_deref().map(load_report_file).transpose()?;
            let engine = build_engine(config, workspace)?;
            let reply = engine
                .chat(&[Message::user(question)], context.as_ref(), grounding)
                .await?;
            println!("{}", reply.reply);
            if !reply.sources.is_empty() {
                println!("\nSources:");
                for source in &reply.sources {
                    println!("  - {} <{}>", source.title, source.uri);
                }
            }
            Ok(())
        }
    }
}

/// Build the engine, attaching the report store when storage is enabled.
fn build_engine(config: ZScoutConfig, workspace: &Path) -> anyhow::Result<ResearchEngine> {
    let provider = zscout_core::create_provider(&config)?;
    let store = config
        .storage
        .enabled
        .then(|| ReportStore::new(config.storage.resolve_reports_dir(workspace)));
    let engine = ResearchEngine::new(provider, config);
    Ok(match store {
        Some(store) => engine.with_store(store),
        None => engine,
    })
}

fn grounding_override(grounding: bool, no_grounding: bool) -> Option<bool> {
    match (grounding, no_grounding) {
        (true, _) => Some(true),
        (_, true) => Some(false),
        _ => None,
    }
}

/// Read a report from a JSON file. Accepts a bare report or a stored generated report.
fn load_report_file(path: &Path) -> anyhow::Result<Report> {
    let data = std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("Failed to read {}: {}", path.display(), e))?;
    let report: Report = serde_json::from_str(&data)
        .map_err(|e| anyhow::anyhow!("{} is not a report: {}", path.display(), e))?;
    if report.is_empty() {
        anyhow::bail!("{} has no title and no sections", path.display());
    }
    Ok(report)
}

/// The `query` field of a stored generated report, if present.
fn read_query(path: &Path) -> Option<String> {
    let data = std::fs::read_to_string(path).ok()?;
    let value: serde_json::Value = serde_json::from_str(&data).ok()?;
    value["query"].as_str().map(str::to_string)
}

fn render_scrape(results: &[SubtopicResult]) -> String {
    let mut out = String::new();
    for result in results {
        out.push_str(&format!("## {}\n\n", result.subtopic));
        if let Some(error) = &result.error {
            out.push_str(&format!("Failed: {}\n\n", error));
            continue;
        }
        out.push_str(&format!("{}\n\n", result.summary));
        for finding in &result.key_findings {
            out.push_str(&format!("- {}\n", finding));
        }
        if !result.sources.is_empty() {
            out.push_str("\nSources:\n");
            for source in &result.sources {
                out.push_str(&format!("  - {} <{}>\n", source.title, source.url));
            }
        }
        out.push('\n');
    }
    out
}

fn handle_config(action: ConfigAction, config: &ZScoutConfig, workspace: &Path) -> anyhow::Result<()> {
    match action {
        ConfigAction::Init => {
            let config_path = workspace_config_path(workspace);
            if config_path.exists() {
                println!(
                    "Configuration file already exists at: {}",
                    config_path.display()
                );
                return Ok(());
            }
            if let Some(parent) = config_path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(&config_path, default_config_toml()?)?;
            println!(
                "Created default configuration at: {}",
                config_path.display()
            );
            Ok(())
        }
        ConfigAction::Show => {
            println!("{}", toml::to_string_pretty(&masked(config))?);
            Ok(())
        }
    }
}

/// A copy of `config` with secrets replaced for display.
fn masked(config: &ZScoutConfig) -> ZScoutConfig {
    let mut shown = config.clone();
    if let Some(key) = shown.gemini.api_key.as_mut().filter(|k| !k.is_empty()) {
        *key = "********".to_string();
    }
    shown.server.auth_tokens = shown
        .server
        .auth_tokens
        .iter()
        .map(|_| "********".to_string())
        .collect();
    shown
}

fn handle_reports(action: ReportsAction, config: &ZScoutConfig, workspace: &Path) -> anyhow::Result<()> {
    let store = ReportStore::new(config.storage.resolve_reports_dir(workspace));
    match action {
        ReportsAction::List => {
            let reports = store.list();
            if reports.is_empty() {
                println!("No stored reports in {}", store.dir().display());
                return Ok(());
            }
            println!("Stored reports ({}):", reports.len());
            for summary in &reports {
                println!(
                    "  {}  {}  {} ({} sections, {} references)",
                    summary.id,
                    summary.created_at.format("%Y-%m-%d %H:%M"),
                    summary.title,
                    summary.section_count,
                    summary.reference_count
                );
            }
            Ok(())
        }
        ReportsAction::Show { id, json } => {
            let uuid = uuid::Uuid::parse_str(&id)
                .map_err(|_| anyhow::anyhow!("'{}' is not a report ID", id))?;
            let Some(generated) = store.load(&uuid)? else {
                anyhow::bail!("Report {} not found in {}", id, store.dir().display());
            };
            if json {
                println!("{}", serde_json::to_string_pretty(&generated)?);
            } else {
                println!("{}", generated.report.to_markdown());
            }
            Ok(())
        }
        ReportsAction::Delete { id } => {
            let uuid = uuid::Uuid::parse_str(&id)
                .map_err(|_| anyhow::anyhow!("'{}' is not a report ID", id))?;
            if store.delete(&uuid)? {
                println!("Deleted report {}", id);
            } else {
                println!("No report with ID {}", id);
            }
            Ok(())
        }
    }
}
