use anyhow::{Context as _, Result};
use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use research_cards::config::{
    find_config_file, get_config, platform_config_path, write_config_file, Config,
    ConfigFileError, Credential, API_KEY_ENV_VARS, ENV_PREFIX,
};
use research_cards::llm::GeminiClient;
use research_cards::mcp::{ListResearchOptionsHandler, McpServer, ToolHandler};
use research_cards::models::{
    ComplexityLevel, Language, OptionValue, ResearchOptions, ResearchResponse, ResponseFormat,
    SearchFocus, SearchFocusSet,
};
use research_cards::research::ResearchService;
use research_cards::ui::{
    print_banner, print_response, print_section, print_status, Spinner, Status,
};
use research_cards::utils::{
    card_markdown, card_plain, is_terminal, response_markdown, response_plain, validate_endpoint,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Research Cards - grounded research organised into knowledge cards
#[derive(Parser, Debug)]
#[command(name = "research-cards")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(author = "hongkongkiwi")]
#[command(about = "Research a topic with a search-grounded model and get knowledge cards back", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose logging (can be used multiple times for more verbosity: -v, -vv)
    #[arg(long, short, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(long, short, global = true)]
    quiet: bool,

    /// Output format
    #[arg(long, short, value_enum, global = true, default_value_t = OutputFormat::Auto)]
    output: OutputFormat,

    /// Configuration file path
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Request timeout in seconds (overrides the configuration file)
    #[arg(long, global = true)]
    timeout: Option<u64>,

    /// Show all environment variables
    #[arg(long, global = true)]
    env: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Output format for results
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum OutputFormat {
    /// Automatic based on terminal (table if TTY, JSON otherwise)
    Auto,
    /// Table format (human-readable)
    Table,
    /// JSON format (machine-readable)
    Json,
    /// Plain text format
    Plain,
    /// Markdown document
    Markdown,
}

impl OutputFormat {
    fn resolve(self) -> Self {
        match self {
            OutputFormat::Auto if is_terminal() => OutputFormat::Table,
            OutputFormat::Auto => OutputFormat::Json,
            other => other,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Research a topic and print the resulting cards
    #[command(alias = "r")]
    Research {
        /// Topic or question to research
        topic: String,

        /// Complexity level (e.g. elementary, "high school", college, expert)
        #[arg(long, short)]
        level: Option<ComplexityLevel>,

        /// Response format (e.g. detailed, concise, "step by step")
        #[arg(long, short)]
        format: Option<ResponseFormat>,

        /// Language of the generated text
        #[arg(long)]
        language: Option<Language>,

        /// Favour a kind of source (repeatable: --focus academic --focus news)
        #[arg(long = "focus")]
        focus: Vec<SearchFocus>,

        /// Use the deep research model
        #[arg(long, short)]
        deep: bool,

        /// API key for this call (overrides the environment and config file)
        #[arg(long)]
        api_key: Option<String>,

        /// Print only the card with this ID, in full
        #[arg(long)]
        card: Option<String>,
    },

    /// List accepted values for every research option
    #[command(alias = "ls")]
    Options,

    /// Run the MCP server (for Claude Desktop and other MCP clients)
    Serve {
        /// Run in stdio mode (for MCP clients like Claude Desktop)
        #[arg(long, default_value_t = true)]
        stdio: bool,

        /// Run in streamable HTTP mode (overrides --stdio)
        #[arg(long)]
        http: bool,

        /// Port for HTTP mode
        #[arg(long, short, default_value_t = 3000)]
        port: u16,

        /// Host to bind to for HTTP mode
        #[arg(long, default_value = "127.0.0.1")]
        host: String,
    },

    /// Check configuration and credentials
    #[command(alias = "diag")]
    Doctor {
        /// Verify the API key against the model endpoint
        #[arg(long)]
        check_connectivity: bool,
    },

    /// Write a default configuration file
    Init {
        /// Where to write the file (default: platform config directory)
        #[arg(long)]
        path: Option<PathBuf>,

        /// Store this API key in the file
        #[arg(long)]
        api_key: Option<String>,

        /// Overwrite an existing file
        #[arg(long, short)]
        force: bool,
    },

    /// Generate shell completions
    Completions {
        /// Target shell
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

/// Print all available environment variables
fn print_env_vars() {
    println!("Research Cards - Environment Variables");
    println!();
    println!("API Keys:");
    println!("  API_KEY                     Gemini API key (checked first)");
    println!("  GEMINI_API_KEY              Gemini API key");
    println!();
    println!("Configuration Overrides ({}__<SECTION>__<KEY>):", ENV_PREFIX);
    println!("  {}__MODELS__FAST              Model for regular research", ENV_PREFIX);
    println!("  {}__MODELS__DEEP              Model for deep research", ENV_PREFIX);
    println!("  {}__MODELS__ENDPOINT          Generative language API base URL", ENV_PREFIX);
    println!("  {}__HTTP__TIMEOUT_SECONDS     Request timeout (default: 120)", ENV_PREFIX);
    println!("  {}__DEFAULTS__LANGUAGE        Default output language", ENV_PREFIX);
    println!("  {}__LOGGING__FORMAT           \"json\" for structured logs", ENV_PREFIX);
    println!();
    println!("Global Proxy Settings:");
    println!("  HTTP_PROXY                  HTTP proxy URL (e.g., http://proxy:8080)");
    println!("  HTTPS_PROXY                 HTTPS proxy URL (e.g., https://proxy:8080)");
    println!();
    println!("Other Settings:");
    println!("  RUST_LOG                    Rust logging level (e.g., debug, info, warn, error)");
    println!();
    println!("Example:");
    println!("  export GEMINI_API_KEY=\"your-key-here\"");
    println!("  export {}__DEFAULTS__LANGUAGE=\"English\"", ENV_PREFIX);
    std::process::exit(0);
}

fn init_tracing(cli: &Cli, config: &Config) {
    let level = if cli.quiet {
        "error".to_string()
    } else {
        match cli.verbose {
            0 => config.logging.level.clone(),
            1 => "debug".to_string(),
            _ => "trace".to_string(),
        }
    };

    let filter = tracing_subscriber::EnvFilter::new(
        std::env::var("RUST_LOG").unwrap_or_else(|_| format!("research_cards={}", level)),
    );

    let json = config.logging.is_json();
    tracing_subscriber::registry()
        .with(filter)
        .with(json.then(|| {
            tracing_subscriber::fmt::layer()
                .json()
                .with_writer(std::io::stderr)
        }))
        .with((!json).then(|| tracing_subscriber::fmt::layer().with_writer(std::io::stderr)))
        .init();
}

fn build_service(config: &Config) -> Result<ResearchService> {
    let client = GeminiClient::new(config.http_client(), &config.models.endpoint)
        .context("Invalid model endpoint")?;
    Ok(ResearchService::new(
        Arc::new(client),
        config.model_selection(),
        config.credentials(),
    ))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Show environment variables and exit if requested
    if cli.env {
        print_env_vars();
    }

    let mut config = get_config(cli.config.as_deref()).context("Failed to load configuration")?;
    if let Some(timeout) = cli.timeout {
        config.http.timeout_seconds = timeout;
    }

    init_tracing(&cli, &config);

    match cli.command {
        Some(Commands::Research {
            topic,
            level,
            format,
            language,
            focus,
            deep,
            api_key,
            card,
        }) => {
            let mut options = config.defaults.options_for(&topic)?;
            if let Some(level) = level {
                options = options.complexity_level(level);
            }
            if let Some(format) = format {
                options = options.response_format(format);
            }
            if let Some(language) = language {
                options = options.language(language);
            }
            if !focus.is_empty() {
                options = options.search_focus(SearchFocusSet::from_selection(focus));
            }
            if deep {
                options = options.deep_research(true);
            }

            let service = build_service(&config)?;
            let output = cli.output.resolve();
            let started = Instant::now();
            let response =
                run_research(&service, &options, api_key.as_deref(), output, cli.quiet).await?;

            match card {
                Some(id) => output_card(&response, &id, output)?,
                None => output_response(&response, output, started.elapsed())?,
            }
        }

        Some(Commands::Options) => match cli.output.resolve() {
            OutputFormat::Json => {
                let tables = ListResearchOptionsHandler
                    .execute(serde_json::json!({}))
                    .await?;
                println!("{}", serde_json::to_string_pretty(&tables)?);
            }
            _ => {
                print_option_table::<ComplexityLevel>("Complexity level (--level)");
                print_option_table::<ResponseFormat>("Response format (--format)");
                print_option_table::<Language>("Language (--language)");
                print_option_table::<SearchFocus>("Search focus (--focus)");
            }
        },

        Some(Commands::Serve {
            stdio,
            http,
            port,
            host,
        }) => {
            let service = build_service(&config)?;
            if !service.has_default_credential() {
                tracing::warn!(
                    "No API key configured; every tool call must pass an api_key argument"
                );
            }
            let server = McpServer::new(Arc::new(service), config.defaults.clone())?;

            // Use HTTP mode if --http flag is provided, otherwise use --stdio flag
            let use_http = http || !stdio;

            if use_http {
                let addr = format!("{}:{}", host, port);
                let (bound_addr, handle) = server.run_http(&addr).await?;
                tracing::info!("MCP server listening on {}", bound_addr);

                handle
                    .await
                    .map_err(|e| anyhow::anyhow!("Server task failed: {}", e))?;
            } else {
                server.run().await?;
            }
        }

        Some(Commands::Doctor { check_connectivity }) => {
            run_doctor(cli.config.as_deref(), &config, check_connectivity).await?;
        }

        Some(Commands::Init {
            path,
            api_key,
            force,
        }) => {
            let path = match path {
                Some(path) => path,
                None => platform_config_path().ok_or(ConfigFileError::NoConfigDir)?,
            };

            let mut new_config = Config::default();
            new_config.api_keys.gemini = api_key.filter(|k| !k.trim().is_empty());
            write_config_file(&new_config, &path, force)?;

            if !cli.quiet {
                print_status(
                    Status::Success,
                    &format!("Wrote configuration to {}", path.display()),
                );
            }
        }

        Some(Commands::Completions { shell }) => {
            let mut cmd = Cli::command();
            clap_complete::generate(shell, &mut cmd, "research-cards", &mut std::io::stdout());
        }

        None => {
            print_banner();
        }
    }

    Ok(())
}

async fn run_research(
    service: &ResearchService,
    options: &ResearchOptions,
    api_key: Option<&str>,
    output: OutputFormat,
    quiet: bool,
) -> Result<ResearchResponse> {
    let spinner = if output == OutputFormat::Table && !quiet {
        let tier = if options.deep_research { "Deep research" } else { "Researching" };
        Spinner::new(&format!("{} \"{}\"...", tier, options.topic()))
    } else {
        Spinner::hidden()
    };

    match service.perform_research(options, api_key).await {
        Ok(response) => {
            spinner.clear();
            Ok(response)
        }
        Err(e) => {
            spinner.finish_with_error(e.user_message());
            if e.needs_credential() && !quiet {
                print_status(
                    Status::Info,
                    &format!(
                        "Set {} or run `research-cards init --api-key <KEY>`",
                        API_KEY_ENV_VARS.join(" or ")
                    ),
                );
            }
            let message = e.user_message();
            Err(anyhow::Error::new(e).context(message))
        }
    }
}

fn output_response(response: &ResearchResponse, format: OutputFormat, elapsed: Duration) -> Result<()> {
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(response)?),
        OutputFormat::Markdown => print!("{}", response_markdown(response)),
        OutputFormat::Plain => print!("{}", response_plain(response)),
        OutputFormat::Table | OutputFormat::Auto => print_response(response, elapsed),
    }
    Ok(())
}

fn output_card(response: &ResearchResponse, id: &str, format: OutputFormat) -> Result<()> {
    let card = response.card(id).ok_or_else(|| {
        let ids: Vec<&str> = response.cards.iter().map(|c| c.id.as_str()).collect();
        anyhow::anyhow!("No card with ID '{}' (available: {})", id, ids.join(", "))
    })?;

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(card)?),
        OutputFormat::Markdown => print!("{}", card_markdown(card)),
        _ => print!("{}", card_plain(card)),
    }
    Ok(())
}

fn print_option_table<T: OptionValue>(title: &str) {
    use comfy_table::{Attribute, Cell, Table};

    print_section(title);
    let mut table = Table::new();
    table.load_preset(comfy_table::presets::UTF8_FULL);
    table.set_header(vec!["Value", "Label"]);
    for value in T::ALL {
        table.add_row(vec![
            Cell::new(value.wire_value()).add_attribute(Attribute::Bold),
            Cell::new(value.label()),
        ]);
    }
    println!("{table}");
}

async fn run_doctor(explicit: Option<&Path>, config: &Config, check_connectivity: bool) -> Result<()> {
    println!("Research Cards - Doctor");
    println!("================================");

    println!("\n[Configuration]");
    match find_config_file(explicit) {
        Some(path) => println!("  Config file: {}", path.display()),
        None => println!("  Config file: none (using defaults)"),
    }
    println!(
        "  Defaults: {} · {} · {} · deep research {}",
        config.defaults.language,
        config.defaults.complexity_level,
        config.defaults.response_format,
        if config.defaults.deep_research { "on" } else { "off" }
    );

    println!("\n[API Key]");
    let mut from_env = None;
    for var in API_KEY_ENV_VARS {
        let set = std::env::var(var).is_ok_and(|v| !v.trim().is_empty());
        println!("  - {}: {}", var, if set { "set" } else { "not set" });
        if set && from_env.is_none() {
            from_env = Some(var);
        }
    }
    println!(
        "  - Config file key: {}",
        if config.api_keys.gemini.is_some() { "set" } else { "not set" }
    );

    let credentials = config.credentials();
    let credential: Option<&Credential> = credentials.default_credential();
    match credential {
        Some(key) if key.has_expected_format() => {
            println!("  - Active key: {} (valid format)", from_env.unwrap_or("config file"));
        }
        Some(_) => println!("  - Active key: may be invalid (expected AIza... and over 30 characters)"),
        None => println!("  - Active key: none (MCP callers must pass api_key)"),
    }

    println!("\n[Models]");
    println!("  - Fast: {}", config.models.fast);
    println!("  - Deep: {}", config.models.deep);
    match validate_endpoint(&config.models.endpoint) {
        Ok(endpoint) => println!("  - Endpoint: {}", endpoint),
        Err(e) => println!("  - Endpoint: {} (ERROR: {})", config.models.endpoint, e),
    }
    println!(
        "  - Timeouts: {}s request, {}s connect",
        config.http.timeout_seconds, config.http.connect_timeout_seconds
    );

    if check_connectivity {
        println!("\n[Connectivity]");
        match credential {
            Some(key) => {
                let url = format!("{}/models", config.models.endpoint.trim_end_matches('/'));
                let result = config
                    .http_client()
                    .client()
                    .get(&url)
                    .header("x-goog-api-key", key.expose())
                    .send()
                    .await;
                match result {
                    Ok(resp) if resp.status().is_success() => {
                        println!("  - Endpoint: OK ({})", resp.status())
                    }
                    Ok(resp) => println!("  - Endpoint: ERROR ({})", resp.status()),
                    Err(e) => println!(
                        "  - Endpoint: ERROR ({})",
                        e.to_string().split(':').next().unwrap_or("unknown")
                    ),
                }
            }
            None => println!("  - Skipped: no API key"),
        }
    }

    println!("\n================================");
    println!("Doctor check complete.");
    Ok(())
}
