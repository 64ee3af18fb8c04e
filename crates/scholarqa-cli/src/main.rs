use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use scholarqa_core::{
    Backoff, ChatService, CompletionClient, PaperCache, QaPipeline, RetryPolicy, ScholarQaConfig,
    SearchClient, SearchService,
};
use scholarqa_providers::{ArxivSearch, GroqChat};

/// scholarqa — retrieval-augmented Q&A over research papers.
///
/// Searches arXiv for papers relevant to a topic, assembles their metadata
/// into a prompt, and asks a Groq-hosted model to answer the question with
/// the papers as context, citing its sources.
#[derive(Parser, Debug)]
#[command(name = "scholarqa", version, about)]
struct Cli {
    /// Question to answer. Omit to start an interactive session.
    question: Option<String>,

    /// Research topic used as the search query (defaults to the question).
    #[arg(short, long)]
    topic: Option<String>,

    /// Maximum number of papers to retrieve per question.
    #[arg(long)]
    max_results: Option<usize>,

    /// Chat model identifier (overrides the config file).
    #[arg(long)]
    model: Option<String>,

    /// Increase logging verbosity (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging. Answers go to stdout, diagnostics to stderr.
    let filter = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(std::io::stderr)
        .init();

    // Load config.
    let config = ScholarQaConfig::load().unwrap_or_else(|e| {
        eprintln!("Warning: Failed to load config: {}. Using defaults.", e);
        ScholarQaConfig::default()
    });

    tracing::info!("Starting scholarqa v{}", env!("CARGO_PKG_VERSION"));

    // The credential must be resolvable before any component is built.
    let api_key = match config.resolve_groq_api_key() {
        Ok(key) => key,
        Err(e) => {
            anyhow::bail!("{e}");
        }
    };

    let model = cli
        .model
        .clone()
        .unwrap_or_else(|| config.generation.model.clone());
    let max_results = cli.max_results.unwrap_or(config.search.max_results);
    let policy = RetryPolicy::new(config.generation.max_retries, Backoff::None);

    let search = SearchClient::new(
        ArxivSearch::new(),
        policy,
        PaperCache::with_capacity(config.search.cache_capacity),
    );
    let chat = GroqChat::new(api_key, model)
        .with_sampling(config.generation.temperature, config.generation.max_tokens);
    let completion = CompletionClient::new(chat, policy);
    let mut qa = QaPipeline::new(search, completion)
        .with_strategy(config.search.query_strategy)
        .with_max_results(max_results);

    let topic = cli
        .topic
        .as_deref()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string);

    if let Some(ref question) = cli.question {
        println!("Searching and analyzing research papers...");
        let answer = qa.answer(question, topic.as_deref()).await?;
        println!("\nAnswer: {answer}");
        return Ok(());
    }

    interactive(&mut qa, topic).await
}

/// Prompt for a topic and question on stdin until the user quits.
async fn interactive<S, C>(qa: &mut QaPipeline<S, C>, default_topic: Option<String>) -> Result<()>
where
    S: SearchService,
    C: ChatService,
{
    use std::io::{BufRead, Write};

    println!("scholarqa interactive session. Submit an empty question to exit.");
    let stdin = std::io::stdin();
    let mut lines = stdin.lock().lines();

    loop {
        let topic_prompt = match default_topic.as_deref() {
            Some(t) => format!("Research topic [{t}]: "),
            None => "Research topic (optional): ".to_string(),
        };
        print!("{topic_prompt}");
        std::io::stdout().flush()?;
        let Some(line) = lines.next() else { break };
        let topic_line = line?.trim().to_string();
        let topic = if topic_line.is_empty() {
            default_topic.clone()
        } else {
            Some(topic_line)
        };

        print!("Question: ");
        std::io::stdout().flush()?;
        let Some(line) = lines.next() else { break };
        let question = line?.trim().to_string();
        if question.is_empty() {
            break;
        }

        println!("Searching and analyzing research papers...");
        match qa.answer(&question, topic.as_deref()).await {
            Ok(answer) => println!("\nAnswer: {answer}\n"),
            // Search faults are recoverable: report them and keep the
            // session alive.
            Err(e) => eprintln!("Error: {e}"),
        }
    }

    tracing::info!("scholarqa exited cleanly");
    Ok(())
}
