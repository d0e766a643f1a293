//! Authorflow - book project workflow engine.
//!
//! Local command-line driver over a file-backed project store.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use authorflow::core::StoreBackend;
use authorflow::model::{
    Audience, ChapterId, ChapterStatus, Genre, NewProject, Phase, Platform, ProjectRecord,
};
use authorflow::workflow::{
    EditingPipeline, MarketingPipeline, PhaseController, ProjectCatalog, ProjectFilter,
    ResearchPipeline, WritingPipeline,
};
use authorflow::{Config, FileStore, MemoryStore, ProjectStore, SessionContext, WorkflowError};

/// Drive a book through research, writing, editing and marketing
#[derive(Parser)]
#[command(name = "authorflow")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Subcommand to run
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Use this config file instead of the default locations
    #[arg(short, long, global = true, env = "AUTHORFLOW_CONFIG")]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a new book project
    New {
        /// Working title
        title: String,

        /// Short description of the book
        #[arg(short, long)]
        description: String,

        /// Genre (fiction, non-fiction, mystery, science fiction, fantasy, ...)
        #[arg(short, long, default_value = "fiction")]
        genre: String,

        /// Target audience (children, young adult, adult, professional, academic, general)
        #[arg(short, long, default_value = "general")]
        audience: String,
    },

    /// List projects, most recently updated first
    List {
        /// Only projects whose title or description contains this text
        #[arg(short, long)]
        search: Option<String>,

        /// Only projects in this phase
        #[arg(short, long)]
        phase: Option<String>,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Show one project
    Show {
        /// Project id
        id: String,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Dashboard statistics over all projects
    Stats {
        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Select the active phase of a project
    Phase {
        /// Project id
        id: String,

        /// research, writing, editing or marketing
        phase: String,
    },

    /// Search competitor books and ask for a market analysis
    Research {
        /// Project id
        id: String,

        /// Search keyword
        keyword: String,

        /// Apply the suggested title, description and outline
        #[arg(long)]
        approve: bool,
    },

    /// Chapter operations
    Chapter {
        #[command(subcommand)]
        operation: ChapterOperation,
    },

    /// Print editing suggestions for a chapter
    Review {
        /// Project id
        id: String,

        /// Chapter id (`chapter-2` or `2`)
        chapter: String,
    },

    /// Marketing operations
    Market {
        #[command(subcommand)]
        operation: MarketOperation,
    },
}

#[derive(Subcommand)]
enum ChapterOperation {
    /// Append an empty chapter
    Add {
        /// Project id
        id: String,
    },

    /// Generate chapter content from the outline
    Generate {
        /// Project id
        id: String,

        /// Chapter id (`chapter-2` or `2`)
        chapter: String,
    },

    /// Replace chapter content
    Write {
        /// Project id
        id: String,

        /// Chapter id (`chapter-2` or `2`)
        chapter: String,

        /// New content; read from the file when `--file` is given
        #[arg(required_unless_present = "file")]
        content: Option<String>,

        /// Read content from this file
        #[arg(short, long)]
        file: Option<PathBuf>,
    },

    /// Rename a chapter
    Rename {
        /// Project id
        id: String,

        /// Chapter id (`chapter-2` or `2`)
        chapter: String,

        /// New title
        title: String,
    },

    /// Set chapter status (draft, review, complete)
    Status {
        /// Project id
        id: String,

        /// Chapter id (`chapter-2` or `2`)
        chapter: String,

        /// New status
        status: String,
    },
}

#[derive(Subcommand)]
enum MarketOperation {
    /// Draft promotional copy for a platform
    Copy {
        /// Project id
        id: String,

        /// website, twitter, instagram or facebook
        platform: String,
    },

    /// Schedule a promotional post
    Schedule {
        /// Project id
        id: String,

        /// website, twitter, instagram or facebook
        platform: String,

        /// Post content
        content: String,

        /// Date (YYYY-MM-DD)
        date: String,
    },

    /// Mark a scheduled post as published
    Publish {
        /// Project id
        id: String,

        /// Task id
        task: String,
    },

    /// Delete a scheduled post
    Delete {
        /// Project id
        id: String,

        /// Task id
        task: String,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // API keys may live in .env
    dotenvy::dotenv().ok();

    let config = match &cli.config {
        Some(path) => {
            let mut config = Config::load_from_file(path)?;
            config.apply_env();
            config
        }
        None => Config::load()?,
    };

    init_logging(&config, cli.verbose);

    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(run(cli.command, config))
}

fn init_logging(config: &Config, verbose: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if verbose {
            EnvFilter::new("debug")
        } else {
            EnvFilter::new(&config.logging.level)
        }
    });

    let registry = tracing_subscriber::registry().with(filter);
    if config.logging.json {
        registry.with(fmt::layer().json().with_writer(std::io::stderr)).init();
    } else {
        registry.with(fmt::layer().with_target(false).with_writer(std::io::stderr)).init();
    }
}

async fn open_session(config: &Config) -> Result<SessionContext> {
    let store: Arc<dyn ProjectStore> = match config.store.backend {
        StoreBackend::File => {
            let path = config.store_path();
            let store = FileStore::open(path.clone())
                .await
                .with_context(|| format!("Failed to open project store at {}", path.display()))?;
            Arc::new(store)
        }
        StoreBackend::Memory => Arc::new(MemoryStore::new()),
    };
    Ok(SessionContext::from_config(config, store))
}

/// Turn a workflow failure into the short message shown to the author.
fn report(error: WorkflowError) -> anyhow::Error {
    tracing::debug!(error = ?error, "Operation failed");
    anyhow::anyhow!(error.user_message())
}

fn parse_chapter(s: &str) -> Result<ChapterId> {
    if let Ok(n) = s.trim().parse::<u32>() {
        if n > 0 {
            return Ok(ChapterId::new(n));
        }
    }
    Ok(s.trim().parse()?)
}

async fn run(command: Commands, config: Config) -> Result<()> {
    let ctx = open_session(&config).await?;
    let catalog = ProjectCatalog::new(ctx.clone());

    match command {
        Commands::New { title, description, genre, audience } => {
            let genre: Genre = genre.parse()?;
            let audience: Audience = audience.parse()?;
            let record = catalog
                .create_project(NewProject::new(title, description, genre, audience))
                .await
                .map_err(report)?;
            println!("Created project: {}", record.id);
        }
        Commands::List { search, phase, format } => {
            let phase = phase.map(|p| p.parse::<Phase>()).transpose()?;
            let filter = ProjectFilter { search, phase };
            let records = catalog.list_projects(&filter).await.map_err(report)?;
            cmd_list(&records, &format)?;
        }
        Commands::Show { id, format } => {
            let record = catalog.load(&id).await.map_err(report)?;
            cmd_show(&record, &format)?;
        }
        Commands::Stats { format } => {
            let stats = catalog.stats().await.map_err(report)?;
            if format == "json" {
                println!("{}", serde_json::to_string_pretty(&stats)?);
            } else {
                println!("Projects:        {}", stats.total);
                for (phase, count) in &stats.per_phase {
                    println!("  {:<14} {count}", phase.label());
                }
                println!("Average progress: {:.0}%", stats.average_progress);
                println!("Words written:    {}", stats.total_words);
            }
        }
        Commands::Phase { id, phase } => {
            let phase: Phase = phase.parse()?;
            let mut record = catalog.load(&id).await.map_err(report)?;
            PhaseController::new(ctx).select(&mut record, phase).await.map_err(report)?;
            println!("Phase: {}", phase.label());
        }
        Commands::Research { id, keyword, approve } => {
            let mut record = catalog.load(&id).await.map_err(report)?;
            let mut research = ResearchPipeline::new(ctx);

            let books = research.search(&mut record, &keyword).await.map_err(report)?;
            println!("Found {} books for '{keyword}':", books.len());
            for book in books {
                println!("  - {} by {} ({}, BSR {})", book.title, book.author, book.price, book.bsr);
            }
            if books.is_empty() {
                return Ok(());
            }

            let suggestion = research.analyze_last_search(&record).await.map_err(report)?;
            println!("\nSuggested title: {}", suggestion.title);
            println!("Description: {}", suggestion.description);
            println!("Outline:");
            for line in &suggestion.outline {
                println!("  {line}");
            }

            if approve {
                research.approve_pending(&mut record).await.map_err(report)?;
                println!("\nSuggestion applied. Progress: {}%", record.progress);
            }
        }
        Commands::Chapter { operation } => cmd_chapter(ctx, &catalog, operation).await?,
        Commands::Review { id, chapter } => {
            let record = catalog.load(&id).await.map_err(report)?;
            let chapter = parse_chapter(&chapter)?;
            let mut editing = EditingPipeline::new(ctx);
            let batch = editing.request_suggestions(&record, chapter).await.map_err(report)?;
            for suggestion in batch {
                println!("[{}] @{}: {}", suggestion.kind, suggestion.position, suggestion.suggestion);
            }
        }
        Commands::Market { operation } => cmd_market(ctx, &catalog, operation).await?,
    }

    Ok(())
}

async fn cmd_chapter(ctx: SessionContext, catalog: &ProjectCatalog, operation: ChapterOperation) -> Result<()> {
    let mut writing = WritingPipeline::new(ctx);

    match operation {
        ChapterOperation::Add { id } => {
            let mut record = catalog.load(&id).await.map_err(report)?;
            let chapter = writing.add_chapter(&mut record).await.map_err(report)?;
            println!("Added {chapter}");
        }
        ChapterOperation::Generate { id, chapter } => {
            let mut record = catalog.load(&id).await.map_err(report)?;
            let chapter = parse_chapter(&chapter)?;
            let generated = writing.generate_content(&mut record, chapter).await.map_err(report)?;
            println!("{}", generated.content);
            println!("\n({} words)", generated.word_count);
        }
        ChapterOperation::Write { id, chapter, content, file } => {
            let mut record = catalog.load(&id).await.map_err(report)?;
            let chapter = parse_chapter(&chapter)?;
            let content = match file {
                Some(path) => std::fs::read_to_string(&path)
                    .with_context(|| format!("Failed to read {}", path.display()))?,
                None => content.unwrap_or_default(),
            };
            let words = writing.edit_content(&mut record, chapter, content).map_err(report)?;
            writing.commit(&mut record, chapter).await.map_err(report)?;
            println!("Saved {chapter} ({words} words)");
        }
        ChapterOperation::Rename { id, chapter, title } => {
            let mut record = catalog.load(&id).await.map_err(report)?;
            let chapter = parse_chapter(&chapter)?;
            writing.rename_chapter(&mut record, chapter, &title).await.map_err(report)?;
            println!("Renamed {chapter}");
        }
        ChapterOperation::Status { id, chapter, status } => {
            let mut record = catalog.load(&id).await.map_err(report)?;
            let chapter = parse_chapter(&chapter)?;
            let status: ChapterStatus = status.parse()?;
            writing.set_status(&mut record, chapter, status).await.map_err(report)?;
            println!("{chapter}: {status}");
        }
    }
    Ok(())
}

async fn cmd_market(ctx: SessionContext, catalog: &ProjectCatalog, operation: MarketOperation) -> Result<()> {
    let marketing = MarketingPipeline::new(ctx);

    match operation {
        MarketOperation::Copy { id, platform } => {
            let record = catalog.load(&id).await.map_err(report)?;
            let platform: Platform = platform.parse()?;
            let copy = marketing.generate_promotional_copy(&record, platform).await.map_err(report)?;
            println!("{copy}");
        }
        MarketOperation::Schedule { id, platform, content, date } => {
            let mut record = catalog.load(&id).await.map_err(report)?;
            let task = marketing
                .schedule_task(&mut record, &platform, &content, &date)
                .await
                .map_err(report)?;
            println!("Scheduled task: {}", task.id);
        }
        MarketOperation::Publish { id, task } => {
            let mut record = catalog.load(&id).await.map_err(report)?;
            if marketing.mark_published(&mut record, &task).await.map_err(report)? {
                println!("Published {task}");
            } else {
                println!("No task {task}");
            }
        }
        MarketOperation::Delete { id, task } => {
            let mut record = catalog.load(&id).await.map_err(report)?;
            if marketing.delete_task(&mut record, &task).await.map_err(report)? {
                println!("Deleted {task}");
            } else {
                println!("No task {task}");
            }
        }
    }
    Ok(())
}

fn record_json(record: &ProjectRecord) -> Result<serde_json::Value> {
    let mut value = serde_json::to_value(record)?;
    if let Some(object) = value.as_object_mut() {
        object.insert("id".to_string(), serde_json::Value::String(record.id.clone()));
    }
    Ok(value)
}

fn cmd_list(records: &[ProjectRecord], format: &str) -> Result<()> {
    match format {
        "json" => {
            let values = records.iter().map(record_json).collect::<Result<Vec<_>>>()?;
            println!("{}", serde_json::to_string_pretty(&values)?);
        }
        _ => {
            for record in records {
                println!(
                    "{}  {:<10} {:>3}%  {}",
                    record.id,
                    record.status.label(),
                    record.progress,
                    record.title
                );
            }
            println!("\nTotal: {} projects", records.len());
        }
    }
    Ok(())
}

fn cmd_show(record: &ProjectRecord, format: &str) -> Result<()> {
    if format == "json" {
        println!("{}", serde_json::to_string_pretty(&record_json(record)?)?);
        return Ok(());
    }

    println!("{} ({})", record.title, record.id);
    println!("{}", record.description);
    println!("Genre: {}  Audience: {}", record.genre, record.target_audience);
    println!("Phase: {}  Progress: {}%", record.status.label(), record.progress);

    if !record.outline.is_empty() {
        println!("\nOutline:");
        for line in &record.outline {
            println!("  {line}");
        }
    }

    if !record.chapters.is_empty() {
        println!("\nChapters ({} words):", record.total_words());
        for (id, chapter) in record.chapters_in_order() {
            println!("  {id}  {:<8} {:>6} words  {}", chapter.status, chapter.word_count, chapter.title);
        }
    }

    if !record.marketing.schedule.is_empty() {
        let (published, total) = MarketingPipeline::completion(record);
        println!("\nSchedule ({published}/{total} published):");
        for task in &record.marketing.schedule {
            println!(
                "  {}  {}  {:<9} {:<9} {}",
                task.id,
                task.scheduled_date,
                task.platform.label(),
                task.status,
                task.content
            );
        }
    }
    Ok(())
}
