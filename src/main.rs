//! docplan - document planning assistant
//!
//! CLI entry point. Drives a [`PlannerSession`] over a JSON-file document.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{CommandFactory, Parser};
use colored::Colorize;
use eyre::{Context, Result};
use tracing::{error, info};

use docplan::cli::{Cli, Command, OutputFormat};
use docplan::config::Config;
use docplan::document::{DocumentAdapter, MemoryDocument};
use docplan::domain::{Level, SectionStatus};
use docplan::error::PlannerError;
use docplan::merge::MergeMode;
use docplan::session::{Persisted, PlannerSession, StatsReport, StatsSource, SyncReport};
use docplan::store::DirectoryStore;

fn setup_logging(verbose: bool) -> Result<()> {
    // Create log directory
    let log_dir = dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("docplan")
        .join("logs");

    fs::create_dir_all(&log_dir).context("Failed to create log directory")?;

    // Write to a log file, never to stdout/stderr
    let level = if verbose { tracing::Level::DEBUG } else { tracing::Level::INFO };
    let log_file = fs::File::create(log_dir.join("docplan.log")).context("Failed to create log file")?;

    tracing_subscriber::fmt()
        .with_writer(log_file)
        .with_ansi(false)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .init();

    info!("Logging initialized (verbose: {})", verbose);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose).context("Failed to setup logging")?;

    let config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;
    config.validate()?;
    info!(
        "docplan loaded config: provider={}, model={}",
        config.llm.provider, config.llm.model
    );

    let Some(command) = cli.command else {
        Cli::command().print_help()?;
        println!();
        return Ok(());
    };

    let session = open_session(config, cli.document.as_deref())?;
    if let Some(source) = session.load().await {
        info!(?source, "restored saved plan");
    }

    match dispatch(&session, command).await {
        Ok(()) => Ok(()),
        Err(e) => {
            error!(error = %e, "command failed");
            match e.downcast_ref::<PlannerError>() {
                Some(planner) => eprintln!("{} {}", "Error:".red(), planner.user_message()),
                None => eprintln!("{} {:#}", "Error:".red(), e),
            }
            std::process::exit(1);
        }
    }
}

fn open_session(config: Config, document: Option<&Path>) -> Result<PlannerSession> {
    let cache = config.storage.cache_path();
    let store = DirectoryStore::open(&cache).context(format!("Failed to open cache at {}", cache.display()))?;

    let document: Option<Arc<dyn DocumentAdapter>> = match document {
        Some(path) => Some(Arc::new(
            MemoryDocument::open(path).context(format!("Failed to open document {}", path.display()))?,
        )),
        None => None,
    };

    Ok(PlannerSession::new(config, Arc::new(store), document))
}

async fn dispatch(session: &PlannerSession, command: Command) -> Result<()> {
    match command {
        Command::Template => cmd_template(session).await,
        Command::Generate { prompt, update } => cmd_generate(session, &prompt, update).await,
        Command::Sync => cmd_sync(session).await,
        Command::Stats => cmd_stats(session).await,
        Command::Add { title, level } => cmd_add(session, title.as_deref(), level).await,
        Command::Delete { id, outline } => {
            let persisted = if outline {
                session.delete_outline_item(id).await?
            } else {
                session.delete_item(id).await?
            };
            done(&format!("Deleted section {}", id), persisted);
            Ok(())
        }
        Command::Include { id } => {
            let persisted = session.include_item(id).await?;
            done(&format!("Added section {} to the plan", id), persisted);
            Ok(())
        }
        Command::Exclude { id } => {
            let persisted = session.exclude_item(id).await?;
            done(&format!("Removed section {} from the plan", id), persisted);
            Ok(())
        }
        Command::Status { id, status } => {
            let status: SectionStatus = status.parse().map_err(PlannerError::Validation)?;
            let persisted = session.update_status(id, status).await?;
            done(&format!("Section {} is now {}", id, status), persisted);
            Ok(())
        }
        Command::Comment { id, text } => {
            let persisted = session.update_comments(id, &text).await?;
            done(&format!("Updated comments of section {}", id), persisted);
            Ok(())
        }
        Command::Rename { id, title } => {
            let persisted = session.update_title(id, &title).await?;
            done(&format!("Renamed section {}", id), persisted);
            Ok(())
        }
        Command::Draft { id } => cmd_draft(session, id).await,
        Command::Show { format } => cmd_show(session, format),
        Command::ExportToc => {
            println!("{}", session.export_toc()?);
            Ok(())
        }
        Command::ImportToc { file } => {
            let json = read_file(&file)?;
            let persisted = session.import_toc(&json).await?;
            done(
                &format!("Imported {} outline entries (next id {})", session.toc().len(), session.next_id()),
                persisted,
            );
            Ok(())
        }
        Command::SavePlan => {
            println!("{}", session.save_plan_to_file()?);
            Ok(())
        }
        Command::LoadPlan { file } => {
            let json = read_file(&file)?;
            let persisted = session.load_plan_from_file(&json).await?;
            done(&format!("Loaded {} sections", session.plan().len()), persisted);
            Ok(())
        }
        Command::SetKey { key } => {
            session.set_api_key(&key)?;
            println!("{} API key stored", "✓".green());
            Ok(())
        }
        Command::Reset => {
            let persisted = session.reset().await;
            done("Plan cleared", persisted);
            Ok(())
        }
    }
}

fn read_file(path: &Path) -> Result<String> {
    fs::read_to_string(path).context(format!("Failed to read {}", path.display()))
}

/// Print a success line plus a notice when the save did not reach the document
fn done(message: &str, persisted: Persisted) {
    println!("{} {}", "✓".green(), message);
    notice(persisted);
}

fn notice(persisted: Persisted) {
    match persisted {
        Persisted::Saved => {}
        Persisted::LocalOnly => println!("  {}", "Saved locally only (not stored in the document)".dimmed()),
        Persisted::NotSaved => println!("  {}", "Warning: changes could not be saved".yellow()),
    }
}

async fn cmd_template(session: &PlannerSession) -> Result<()> {
    let persisted = session.create_template().await;
    done(&format!("Created template with {} sections", session.plan().len()), persisted);
    Ok(())
}

async fn cmd_generate(session: &PlannerSession, prompt: &str, update: bool) -> Result<()> {
    let mode = if update { MergeMode::Update } else { MergeMode::Replace };
    println!("Generating plan ({})...", mode);

    let report = session.generate_plan(prompt, mode).await?;
    done(
        &format!(
            "Plan has {} sections ({} new, {} matched)",
            report.sections, report.added, report.matched
        ),
        report.persisted,
    );
    Ok(())
}

async fn cmd_sync(session: &PlannerSession) -> Result<()> {
    match session.sync().await? {
        SyncReport::NothingToSync => {
            println!("{}", "No headings found in the document; nothing to sync".yellow());
        }
        SyncReport::Synced {
            additions_to_plan,
            additions_to_document,
            persisted,
            stats,
        } => {
            done(
                &format!(
                    "Synchronized: {} added to the plan, {} added to the document",
                    additions_to_plan, additions_to_document
                ),
                persisted,
            );
            print_stats(&stats);
        }
    }
    Ok(())
}

async fn cmd_stats(session: &PlannerSession) -> Result<()> {
    let report = session.refresh_statistics().await?;
    print_stats(&report);
    notice(report.persisted);
    Ok(())
}

fn print_stats(report: &StatsReport) {
    match report.source {
        StatsSource::Document => println!(
            "{} Statistics refreshed: {} sections matched, {} now created",
            "✓".green(),
            report.matched,
            report.promoted
        ),
        StatsSource::Simulated => println!("{}", "Statistics simulated (no document open)".yellow()),
        StatsSource::Unavailable => println!("{}", "Statistics unavailable; previous values kept".yellow()),
    }
}

async fn cmd_add(session: &PlannerSession, title: Option<&str>, level: u8) -> Result<()> {
    let level = Level::try_from(level).map_err(PlannerError::Validation)?;
    let (id, persisted) = session.add_item(title, level).await?;
    done(&format!("Added section {}", id), persisted);
    Ok(())
}

async fn cmd_draft(session: &PlannerSession, id: u32) -> Result<()> {
    println!("Drafting section {}...", id);
    let report = session.generate_section_content(id).await?;
    done(
        &format!("Drafted {} words; section {} is {}", report.words, report.id, report.status),
        report.persisted,
    );
    Ok(())
}

fn cmd_show(session: &PlannerSession, format: OutputFormat) -> Result<()> {
    let plan = session.plan();
    let summary = session.summary();

    match format {
        OutputFormat::Json => {
            let json = serde_json::json!({
                "completion": summary.completion,
                "words": summary.totals.words,
                "paragraphs": summary.totals.paragraphs,
                "tables": summary.totals.tables,
                "graphics": summary.totals.graphics,
                "nextId": session.next_id(),
                "planItems": plan,
            });
            println!("{}", serde_json::to_string_pretty(&json)?);
        }
        OutputFormat::Text => {
            if plan.is_empty() {
                println!("No plan yet. Run `dp template` or `dp generate <prompt>`.");
                return Ok(());
            }
            println!("{}", "Writing Plan".bold());
            println!("-----------------");
            for item in &plan {
                let indent = if item.level == Level::Subsection { "    " } else { "" };
                println!(
                    "{}{:>3}  {:<11} {}  {}",
                    indent,
                    item.id,
                    item.status.to_string().cyan(),
                    item.title,
                    format!("({} words)", item.words).dimmed()
                );
            }
            println!();
            println!(
                "Completion: {:.0}%  |  {} words, {} paragraphs, {} tables, {} graphics",
                summary.completion,
                summary.totals.words,
                summary.totals.paragraphs,
                summary.totals.tables,
                summary.totals.graphics
            );
        }
    }
    Ok(())
}
