//! Research assistant binary - researches topics with a hosted assistant from the terminal.

use conf::Conf;
use research_assistant::{Assistant, AssistantProfile, ChatMessage, HostedAssistant, ToolRegistry};
use research_assistant_openai::{OpenAiClient, OpenAiConfig, OpenAiError};
use research_assistant_tools::{INSTRUCTIONS, ResearchTools, ResearchToolsConfig};
use std::{
    env, fs,
    io::{Write, stdout},
    path::PathBuf,
    sync::Arc,
};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

mod terminal;
use terminal::{TerminalRenderer, print_message};

/// Top-level configuration for the research assistant.
#[derive(Conf, Debug)]
#[conf(serde)]
pub struct Config {
    /// Path to a TOML config file (optional).
    /// This is parsed before other args, so config file values can be overridden by CLI args.
    #[allow(dead_code)] // Parsed early via find_parameter, kept here for --help
    #[conf(long)]
    config_file: Option<PathBuf>,
    /// If true, just validate config and don't start
    #[conf(long)]
    dry_run: bool,
    #[conf(flatten, serde(flatten))]
    openai: OpenAiConfig,
    #[conf(flatten, serde(flatten))]
    tools: ResearchToolsConfig,
}

fn init_logging() {
    // Build a default tracing subscriber, writing to STDERR
    // Uses RUST_LOG env var for filtering, defaults to "info" if not set
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_file(true)
        .with_line_number(true)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // load dotenv file
    match dotenvy::dotenv() {
        Ok(path) => info!("Read dotenv file from: {}", path.display()),
        Err(dotenvy::Error::Io(io_error)) => {
            if matches!(io_error.kind(), std::io::ErrorKind::NotFound) {
                info!("Couldn't find a dotenv file");
            } else {
                panic!("Io error when reading dot env file: {io_error}")
            }
        }
        Err(err) => {
            panic!("Error reading dotenv file: {err}")
        }
    }
}

fn load_config() -> Result<Config, String> {
    // Check for --config-file before the main parse, so we can load it and pass to conf
    let Some(config_path) = conf::find_parameter("config-file", env::args_os()) else {
        return Ok(Config::parse());
    };

    let path_display = config_path.to_string_lossy();
    let file_contents = fs::read_to_string(&config_path)
        .map_err(|err| format!("Could not open config file '{path_display}': {err}"))?;
    let doc: toml::Value = toml::from_str(&file_contents)
        .map_err(|err| format!("Config file '{path_display}' is not valid TOML: {err}"))?;
    info!("Loaded config file: {path_display}");
    Ok(Config::conf_builder().doc(path_display, doc).parse())
}

fn read_instructions(config: &OpenAiConfig) -> Result<String, String> {
    match &config.instructions_file {
        Some(path) => fs::read_to_string(path).map_err(|err| {
            format!("Could not read instructions file '{}': {err}", path.display())
        }),
        None => Ok(INSTRUCTIONS.to_owned()),
    }
}

async fn print_history(
    assistant: &mut dyn Assistant,
    out: &mut impl Write,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    for message in assistant.history().await? {
        print_message(out, &message)?;
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    init_logging();

    let config = load_config()?;

    info!("Config = {config:#?}");

    if config.dry_run {
        return Ok(());
    }

    let instructions = read_instructions(&config.openai)?;
    let client = OpenAiClient::new(&config.openai)?;

    match client.validate_credentials().await {
        Ok(()) => println!("Your API key is valid!"),
        Err(OpenAiError::Authentication(msg)) => {
            return Err(format!("Invalid OpenAI API key. Please check and try again. ({msg})").into());
        }
        Err(err) => return Err(err.into()),
    }

    let mut registry = ToolRegistry::new();
    registry.register(Arc::new(ResearchTools::new(config.tools)?))?;

    let profile = AssistantProfile {
        name: config.openai.assistant_name.clone(),
        instructions,
        model: config.openai.openai_model.clone(),
    };
    let mut assistant = HostedAssistant::new(
        client,
        registry,
        profile,
        config.openai.max_tool_rounds,
    );

    println!("{}", config.openai.assistant_name);
    println!(
        "This assistant uses DuckDuckGo and Wikipedia to research whatever you want to know. \
         It summarizes what it finds and saves a file with the details from the sources it used."
    );

    print_history(&mut assistant, &mut stdout()).await?;

    let token = CancellationToken::new();

    // Listen for ctrl-c
    let thread_token = token.clone();
    tokio::task::spawn(async move {
        tokio::signal::ctrl_c().await.unwrap();
        warn!("ctrl-c: Stop requested");
        thread_token.cancel();
    });

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("\nWrite down the topic you want to research: ");
        stdout().flush()?;

        let line = tokio::select! {
            line = lines.next_line() => line?,
            _ = token.cancelled() => break,
        };
        let Some(line) = line else {
            break;
        };

        let topic = line.trim();
        match topic {
            "" => continue,
            "/quit" | "/exit" => break,
            "/debug" => {
                assistant.debug_log();
                continue;
            }
            _ => {}
        }

        let mut renderer = TerminalRenderer::new(stdout());
        let result = tokio::select! {
            result = assistant.prompt(ChatMessage::user(topic), &mut renderer) => result,
            _ = token.cancelled() => break,
        };
        renderer.finish();

        match result {
            Ok(response) => {
                for path in &response.attachments {
                    println!("Research results saved: {}", path.display());
                }
            }
            Err(err) => {
                error!("Research turn failed: {err}");
                println!("Something went wrong. Please try again.");
                println!("{err}");
            }
        }
    }

    info!("Goodbye");
    Ok(())
}
