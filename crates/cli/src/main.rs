use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "unichat")]
#[command(about = "UniChat CLI", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Show version
    Version,

    /// Create the configuration directory and default config file.
    Init {
        /// Config file path (default: UNICHAT_CONFIG_PATH or ~/.unichat/config.json)
        #[arg(long, short, value_name = "PATH")]
        config: Option<std::path::PathBuf>,
    },

    /// Chat with the retrieval backend (interactive).
    Chat {
        /// Config file path (default: UNICHAT_CONFIG_PATH or ~/.unichat/config.json)
        #[arg(long, short, value_name = "PATH")]
        config: Option<std::path::PathBuf>,

        /// Optional existing session id to continue.
        #[arg(long, value_name = "ID")]
        session: Option<String>,
    },

    /// Show the provider/model catalog and the current selection.
    Models {
        /// Config file path (default: UNICHAT_CONFIG_PATH or ~/.unichat/config.json)
        #[arg(long, short, value_name = "PATH")]
        config: Option<std::path::PathBuf>,
    },

    /// Show the stored document list and system prompt.
    Documents {
        /// Config file path (default: UNICHAT_CONFIG_PATH or ~/.unichat/config.json)
        #[arg(long, short, value_name = "PATH")]
        config: Option<std::path::PathBuf>,
    },

    /// Apply a saved-but-not-yet-applied configuration change on the server.
    Apply {
        /// Config file path (default: UNICHAT_CONFIG_PATH or ~/.unichat/config.json)
        #[arg(long, short, value_name = "PATH")]
        config: Option<std::path::PathBuf>,
    },
}

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Version) => {
            println!("unichat {}", env!("CARGO_PKG_VERSION"));
        }
        Some(Commands::Init { config }) => {
            if let Err(e) = run_init(config) {
                log::error!("init failed: {}", e);
                std::process::exit(1);
            }
        }
        Some(Commands::Chat { config, session }) => {
            if let Err(e) = run_chat(config, session).await {
                log::error!("chat failed: {}", e);
                std::process::exit(1);
            }
        }
        Some(Commands::Models { config }) => {
            if let Err(e) = run_models(config).await {
                log::error!("models failed: {}", e);
                std::process::exit(1);
            }
        }
        Some(Commands::Documents { config }) => {
            if let Err(e) = run_documents(config).await {
                log::error!("documents failed: {}", e);
                std::process::exit(1);
            }
        }
        Some(Commands::Apply { config }) => {
            if let Err(e) = run_apply(config).await {
                log::error!("apply failed: {}", e);
                std::process::exit(1);
            }
        }
        None => {
            println!("Run with --help for usage");
        }
    }
}

fn run_init(config_path: Option<std::path::PathBuf>) -> anyhow::Result<()> {
    let path = config_path.unwrap_or_else(lib::config::default_config_path);
    let dir = lib::config::init_config_dir(&path)?;
    println!("initialized configuration at {}", dir.display());
    Ok(())
}

fn client_for(config_path: Option<std::path::PathBuf>) -> anyhow::Result<(lib::api::ApiClient, lib::config::Config)> {
    let (config, _) = lib::config::load_config(config_path)?;
    let client = lib::api::ApiClient::from_config(&config)?;
    Ok((client, config))
}

async fn run_chat(
    config_path: Option<std::path::PathBuf>,
    session: Option<String>,
) -> anyhow::Result<()> {
    use std::io::{self, Write};

    let (client, config) = client_for(config_path)?;
    let session_id = session.unwrap_or_else(|| lib::config::resolve_session_id(&config));
    log::info!("chat session {} against {}", session_id, client.base_url());

    let stdin = io::stdin();
    let mut stdout = io::stdout();

    loop {
        write!(stdout, "> ")?;
        stdout.flush()?;
        let mut line = String::new();
        if stdin.read_line(&mut line)? == 0 {
            break;
        }
        let input = line.trim();
        if input.is_empty() {
            continue;
        }
        if input.eq_ignore_ascii_case("/exit") || input.eq_ignore_ascii_case("/quit") {
            break;
        }

        match client.ask(input, session_id.as_str()).await {
            Ok(reply) => {
                if let Some(think) = reply.think.as_deref().filter(|t| !t.trim().is_empty()) {
                    for think_line in think.trim().lines() {
                        println!("  · {}", think_line);
                    }
                }
                println!("< {}", reply.answer.trim());
            }
            Err(e) => {
                eprintln!("chat error: {}", e);
            }
        }
    }

    Ok(())
}

async fn run_models(config_path: Option<std::path::PathBuf>) -> anyhow::Result<()> {
    let (client, _) = client_for(config_path)?;
    let catalog = client.fetch_models().await?;

    println!("current selection:");
    println!(
        "  llm: {} / {}",
        catalog.model_select.llm_provider, catalog.model_select.llm_model
    );
    println!(
        "  embedding: {} / {}",
        catalog.model_select.emb_provider, catalog.model_select.emb_model
    );
    println!("providers:");
    for entry in &catalog.model_support {
        println!("  {}", entry.provider);
        if !entry.llm_model.is_empty() {
            println!("    llm models: {}", entry.llm_model.join(", "));
        }
        if !entry.emb_model.is_empty() {
            println!("    embedding models: {}", entry.emb_model.join(", "));
        }
    }
    Ok(())
}

async fn run_documents(config_path: Option<std::path::PathBuf>) -> anyhow::Result<()> {
    let (client, _) = client_for(config_path)?;
    let documents = client.fetch_documents().await?;

    if documents.documents.is_empty() {
        println!("no documents stored");
    } else {
        println!("documents:");
        for name in &documents.documents {
            println!("  {}", name);
        }
    }
    println!("system prompt: {}", documents.system_prompt);
    Ok(())
}

async fn run_apply(config_path: Option<std::path::PathBuf>) -> anyhow::Result<()> {
    let (client, _) = client_for(config_path)?;

    if !client.fetch_suspense().await? {
        println!("no pending configuration change");
        return Ok(());
    }
    if client.apply_config().await? {
        println!("configuration applied");
    } else {
        anyhow::bail!("server refused to apply the pending configuration");
    }
    Ok(())
}
