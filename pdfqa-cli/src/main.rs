use anyhow::{Context, Result};
use clap::{ArgAction, Parser, Subcommand};
use colored::Colorize;
use pdfqa_core::{
    create_provider, document_stats, Answer, AnswerOutcome, Config, DocumentStats, ErrorKind,
    PdfExtractor, ProviderKind, RagEngine, RagError,
};
use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "pdfqa")]
#[command(about = "Ask questions about a PDF document", long_about = None)]
#[command(version)]
struct Cli {
    #[arg(short, long, default_value = "config.yaml")]
    config: PathBuf,

    #[arg(short, long, action = ArgAction::Count, help = "Increase log verbosity (-v info, -vv debug)")]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "Index a PDF and answer one question")]
    Ask {
        pdf: PathBuf,

        #[arg(required = true, num_args = 1.., help = "The question to ask")]
        question: Vec<String>,

        #[arg(long, help = "Print the answer as JSON")]
        json: bool,
    },

    #[command(about = "Index a PDF and answer questions interactively")]
    Chat { pdf: PathBuf },

    #[command(about = "Show text and chunking statistics for a PDF")]
    Inspect {
        pdf: PathBuf,

        #[arg(long, help = "Print the statistics as JSON")]
        json: bool,
    },

    #[command(about = "Summarize a PDF")]
    Summarize { pdf: PathBuf },

    #[command(about = "Configuration commands")]
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(Subcommand)]
enum ConfigCommands {
    #[command(about = "Show current configuration")]
    Show,

    #[command(about = "Write a default configuration file")]
    Init {
        #[arg(long, help = "Overwrite an existing file")]
        force: bool,
    },

    #[command(about = "Set the LLM model")]
    SetModel {
        #[arg(help = "Model name (e.g., 'llama3.2:latest')")]
        model: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Ask { pdf, question, json } => {
            ask(&cli.config, &pdf, &question.join(" "), json).await
        }
        Commands::Chat { pdf } => chat(&cli.config, &pdf).await,
        Commands::Inspect { pdf, json } => inspect(&cli.config, &pdf, json),
        Commands::Summarize { pdf } => summarize(&cli.config, &pdf).await,
        Commands::Config { command } => match command {
            ConfigCommands::Show => show_config(&cli.config),
            ConfigCommands::Init { force } => init_config(&cli.config, force),
            ConfigCommands::SetModel { model } => set_model(&cli.config, &model),
        },
    }
}

/// Logs go to stderr so `--json` output stays machine readable.
fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(format!("pdfqa_core={}", level)));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Loads the config file, falling back to defaults when it does not exist.
fn load_config(path: &Path) -> Result<Config> {
    if path.exists() {
        Config::load(path).with_context(|| format!("Failed to load config from {}", path.display()))
    } else {
        Ok(Config::default())
    }
}

fn read_pdf(path: &Path) -> Result<Vec<u8>> {
    let is_pdf = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"));
    if !is_pdf {
        anyhow::bail!("Only PDF files are supported: {}", path.display());
    }

    std::fs::read(path).with_context(|| format!("Failed to read {}", path.display()))
}

/// Attaches a hint for the user based on the error class.
fn explain(err: RagError) -> anyhow::Error {
    let hint = match err.kind() {
        ErrorKind::InvalidInput => "The input was rejected",
        ErrorKind::IndexNotBuilt => "No document is indexed yet",
        ErrorKind::DimensionMismatch => "Embedding dimensions do not match; check the embedding model",
        ErrorKind::UpstreamUnavailable => "The model service failed; is it running? Retrying may help",
    };
    anyhow::Error::new(err).context(hint)
}

async fn create_engine(config_path: &Path) -> Result<RagEngine> {
    let config = load_config(config_path)?;
    let provider = create_provider(&config.llm).context("Failed to create LLM provider")?;
    RagEngine::new(&config, provider).await.map_err(explain)
}

async fn index_pdf(engine: &RagEngine, pdf: &Path) -> Result<()> {
    let bytes = read_pdf(pdf)?;
    println!("{} Indexing {}...", "→".blue(), pdf.display());

    let summary = engine.build_index(&bytes).await.map_err(explain)?;
    println!(
        "{} Indexed {} chunks ({} dimensions)",
        "✓".green().bold(),
        summary.total_chunks,
        summary.embedding_dimension
    );
    println!();
    Ok(())
}

async fn ask(config_path: &Path, pdf: &Path, question: &str, json: bool) -> Result<()> {
    let engine = create_engine(config_path).await?;

    if json {
        let bytes = read_pdf(pdf)?;
        engine.build_index(&bytes).await.map_err(explain)?;
        let answer = engine.search(question).await.map_err(explain)?;
        println!("{}", serde_json::to_string_pretty(&answer)?);
        return Ok(());
    }

    index_pdf(&engine, pdf).await?;
    let answer = engine.search(question).await.map_err(explain)?;
    print_answer(&answer);
    Ok(())
}

async fn chat(config_path: &Path, pdf: &Path) -> Result<()> {
    let engine = create_engine(config_path).await?;
    index_pdf(&engine, pdf).await?;

    println!("Ask a question about the document. Type 'exit' to quit.");
    let stdin = std::io::stdin();
    let mut lines = stdin.lock().lines();

    loop {
        print!("{} ", ">".cyan().bold());
        std::io::stdout().flush()?;

        let Some(line) = lines.next() else { break };
        let question = line?;
        let question = question.trim();

        if question.is_empty() {
            continue;
        }
        if question == "exit" || question == "quit" {
            break;
        }

        match engine.search(question).await {
            Ok(answer) => print_answer(&answer),
            // Keep the session going; the document is still indexed.
            Err(err) => eprintln!("{} {:#}", "✗".red().bold(), explain(err)),
        }
        println!();
    }

    Ok(())
}

fn print_answer(answer: &Answer) {
    match answer.outcome {
        AnswerOutcome::Answered => println!("{}", answer.answer),
        AnswerOutcome::Declined | AnswerOutcome::NoRelevantContent => {
            println!("{}", answer.answer.yellow())
        }
    }

    if !answer.sources.is_empty() {
        println!();
        println!("{}", "Sources:".bold());
        for (i, source) in answer.sources.iter().enumerate() {
            println!("  {} {}", format!("[{}]", i + 1).cyan(), preview(source, 160).dimmed());
        }
    }
}

/// Statistics need no model, so no provider is created.
fn inspect(config_path: &Path, pdf: &Path, json: bool) -> Result<()> {
    let config = load_config(config_path)?;
    let bytes = read_pdf(pdf)?;
    let stats = document_stats(&config.rag, &PdfExtractor, &bytes).map_err(explain)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&stats)?);
    } else {
        print_stats(pdf, &stats);
    }
    Ok(())
}

fn print_stats(pdf: &Path, stats: &DocumentStats) {
    println!("{} {}", "Document:".bold().green(), pdf.display());
    println!();
    println!("  Characters: {}", stats.total_characters);
    println!("  Words:      {}", stats.total_words);
    println!("  Chunks:     {}", stats.total_chunks);

    if !stats.sample_chunks.is_empty() {
        println!();
        println!("{}", "Sample chunks:".bold());
        for (i, chunk) in stats.sample_chunks.iter().enumerate() {
            println!("  {} {}", format!("[{}]", i + 1).cyan(), preview(chunk, 300));
        }
    }
}

async fn summarize(config_path: &Path, pdf: &Path) -> Result<()> {
    let bytes = read_pdf(pdf)?;
    let engine = create_engine(config_path).await?;

    println!("{} Summarizing {}...", "→".blue(), pdf.display());
    let summary = engine.summarize(&bytes).await.map_err(explain)?;

    println!();
    println!("{}", "Summary:".bold().green());
    println!("{}", summary);
    Ok(())
}

fn show_config(config_path: &Path) -> Result<()> {
    let config = load_config(config_path)?;

    println!("{}", "Current Configuration:".bold().green());
    println!();
    println!("{}", "LLM:".bold());
    match &config.llm.provider {
        ProviderKind::Ollama { base_url } => {
            println!("  Provider:       ollama");
            println!("  Base URL:       {}", base_url);
        }
        ProviderKind::Openai { base_url, api_key_env } => {
            println!("  Provider:       openai");
            println!("  Base URL:       {}", base_url);
            println!("  API Key Env:    {}", api_key_env);
        }
    }
    println!("  Model:          {}", config.llm.model.cyan());
    println!("  Temperature:    {}", config.llm.temperature);
    println!("  Timeout:        {}s", config.llm.request_timeout_secs);
    println!();
    println!("{}", "RAG:".bold());
    println!("  Embedding Model: {}", config.rag.embedding_model.cyan());
    println!("  Chunk Size:      {}", config.rag.chunk_size);
    println!("  Chunk Overlap:   {}", config.rag.chunk_overlap);
    println!("  Top K:           {}", config.rag.top_k);
    println!("  Threshold:       {}", config.rag.similarity_threshold);

    Ok(())
}

fn init_config(config_path: &Path, force: bool) -> Result<()> {
    if config_path.exists() && !force {
        anyhow::bail!(
            "{} already exists; pass --force to overwrite",
            config_path.display()
        );
    }

    let contents = serde_yaml::to_string(&Config::default()).context("Failed to serialize config")?;
    std::fs::write(config_path, contents).context("Failed to write config file")?;

    println!(
        "{} Wrote default configuration to {}",
        "✓".green().bold(),
        config_path.display()
    );
    Ok(())
}

fn set_model(config_path: &Path, model: &str) -> Result<()> {
    let content = std::fs::read_to_string(config_path).context("Failed to read config file")?;
    let mut config: serde_yaml::Value =
        serde_yaml::from_str(&content).context("Failed to parse config")?;

    let root = config
        .as_mapping_mut()
        .context("Config file is not a YAML mapping")?;
    let llm = root
        .entry(serde_yaml::Value::String("llm".to_string()))
        .or_insert_with(|| serde_yaml::Value::Mapping(Default::default()));
    let llm_map = llm
        .as_mapping_mut()
        .context("The llm section is not a YAML mapping")?;
    llm_map.insert(
        serde_yaml::Value::String("model".to_string()),
        serde_yaml::Value::String(model.to_string()),
    );

    let updated = serde_yaml::to_string(&config).context("Failed to serialize config")?;
    std::fs::write(config_path, updated).context("Failed to write config file")?;

    println!("{} Model updated to: {}", "✓".green().bold(), model.cyan());
    Ok(())
}

/// First `max` characters of `text`, with an ellipsis when cut.
fn preview(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}
