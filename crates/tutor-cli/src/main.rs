mod config;

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing::debug;

use tutor_chat::{Session, StdConsole};
use tutor_core::{
    KnowledgeBase, KnowledgeStore, LexiconNormalizer, Lookup, SimpleNormalizer, TextNormalizer,
};
use tutor_store::JsonFileStore;

use config::{Config, NormalizerKind};

#[derive(Parser)]
#[command(
    name = "tutor",
    version,
    about = "A question-answering bot that learns the answers it does not know"
)]
struct Cli {
    /// Path to the JSON knowledge base
    #[arg(long, global = true)]
    kb: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Interactive chat; unknown questions can be taught (default)
    Chat,

    /// Answer a single question without learning
    Ask {
        /// Question text
        question: String,
    },

    /// Teach a question/answer pair without the interactive loop
    Teach {
        /// Question text (stored normalized)
        #[arg(short, long)]
        question: String,

        /// Answer to give back
        #[arg(short, long)]
        answer: String,
    },

    /// List stored question/answer pairs in order
    List,

    /// Score the knowledge base against itself
    Eval,

    /// Create an empty knowledge base if none exists
    Init,

    /// Show current configuration
    Config,
}

fn default_kb_path() -> PathBuf {
    directories::ProjectDirs::from("dev", "tutor", "tutor")
        .map(|dirs| dirs.data_dir().join("knowledge_base.json"))
        .unwrap_or_else(|| PathBuf::from("knowledge_base.json"))
}

fn kb_path(flag: Option<PathBuf>, config: &Config) -> PathBuf {
    flag.or_else(|| config.store.path.as_ref().map(PathBuf::from))
        .unwrap_or_else(default_kb_path)
}

fn load_kb(store: &JsonFileStore) -> Result<KnowledgeBase> {
    store.load().with_context(|| {
        format!(
            "failed to load knowledge base {} (create one with `tutor init`)",
            store.path().display()
        )
    })
}

fn init_normalizer(config: &Config) -> Result<Box<dyn TextNormalizer>> {
    match config.normalizer.kind {
        NormalizerKind::Simple => Ok(Box::new(SimpleNormalizer)),
        NormalizerKind::Lexicon => {
            let lexicon = match &config.normalizer.lexicon {
                Some(path) => LexiconNormalizer::from_path(Path::new(path)),
                None => LexiconNormalizer::builtin(),
            }
            .context("failed to initialize text normalizer")?;
            Ok(Box::new(lexicon))
        }
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing_subscriber::filter::LevelFilter::WARN.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let cfg = config::load_config()?;
    let store = JsonFileStore::new(kb_path(cli.kb, &cfg));
    debug!("knowledge base: {}", store.path().display());

    match cli.command.unwrap_or(Commands::Chat) {
        Commands::Chat => cmd_chat(&store, &cfg),
        Commands::Ask { question } => cmd_ask(&store, &cfg, &question),
        Commands::Teach { question, answer } => cmd_teach(&store, &cfg, &question, &answer),
        Commands::List => cmd_list(&store),
        Commands::Eval => cmd_eval(&store, &cfg),
        Commands::Init => cmd_init(&store),
        Commands::Config => cmd_config(&store, &cfg),
    }
}

fn open_session<'a>(
    store: &'a JsonFileStore,
    normalizer: &'a dyn TextNormalizer,
    cfg: &Config,
) -> Result<Session<'a>> {
    let kb = load_kb(store)?;
    Ok(Session::new(kb, store, normalizer)
        .with_matcher(cfg.matcher()?)
        .with_save_retries(cfg.session.save_retries))
}

fn cmd_chat(store: &JsonFileStore, cfg: &Config) -> Result<()> {
    let normalizer = init_normalizer(cfg)?;
    let mut session = open_session(store, normalizer.as_ref(), cfg)?;
    let mut console = StdConsole::stdio();
    session.run(&mut console)?;
    Ok(())
}

fn cmd_ask(store: &JsonFileStore, cfg: &Config, question: &str) -> Result<()> {
    let normalizer = init_normalizer(cfg)?;
    let session = open_session(store, normalizer.as_ref(), cfg)?;
    match session.ask(question) {
        Lookup::Found { answer, .. } => println!("Bot: {answer}"),
        Lookup::NotFound => println!("Bot: Idk! teach me with `tutor teach`."),
    }
    Ok(())
}

fn cmd_teach(store: &JsonFileStore, cfg: &Config, question: &str, answer: &str) -> Result<()> {
    if answer.trim().is_empty() {
        bail!("answer must not be empty");
    }
    let normalizer = init_normalizer(cfg)?;
    let mut session = open_session(store, normalizer.as_ref(), cfg)?;
    let stored = session
        .learn(question, answer)
        .context("failed to save learned answer")?;
    println!("Learned: {stored}");
    Ok(())
}

fn cmd_list(store: &JsonFileStore) -> Result<()> {
    let kb = load_kb(store)?;
    if kb.is_empty() {
        println!("Knowledge base is empty.");
        return Ok(());
    }

    for (i, entry) in kb.entries().iter().enumerate() {
        println!("--- #{} ---", i + 1);
        println!("  question: {}", entry.question);
        println!("  answer:   {}", entry.answer);
        println!();
    }
    Ok(())
}

fn cmd_eval(store: &JsonFileStore, cfg: &Config) -> Result<()> {
    let normalizer = init_normalizer(cfg)?;
    let session = open_session(store, normalizer.as_ref(), cfg)?;
    let eval = session.evaluate();
    println!("{}", eval.metrics());
    println!();
    println!("Entries:         {}", eval.total);
    println!("Correct:         {}", eval.correct);
    println!("False positives: {}", eval.false_positives);
    println!("False negatives: {}", eval.false_negatives);
    Ok(())
}

fn cmd_init(store: &JsonFileStore) -> Result<()> {
    if store.init()? {
        println!("Created: {}", store.path().display());
    } else {
        println!("Already exists: {}", store.path().display());
    }
    Ok(())
}

fn cmd_config(store: &JsonFileStore, cfg: &Config) -> Result<()> {
    println!("Config: {}", config::show_config_path());
    println!("Knowledge base: {}", store.path().display());
    println!();
    println!("[store]");
    println!(
        "  path = {}",
        cfg.store
            .path
            .as_deref()
            .unwrap_or("(default platform path)")
    );
    println!();
    println!("[matcher]");
    println!("  cutoff = {}", cfg.matcher.cutoff);
    println!("  similarity = {}", cfg.matcher.similarity);
    println!();
    println!("[normalizer]");
    println!("  kind = {:?}", cfg.normalizer.kind);
    println!(
        "  lexicon = {}",
        cfg.normalizer.lexicon.as_deref().unwrap_or("(built-in)")
    );
    println!();
    println!("[session]");
    println!("  save_retries = {}", cfg.session.save_retries);
    Ok(())
}
