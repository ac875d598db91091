use std::error::Error;
use std::io::Write;
use std::path::PathBuf;

use anyhow::anyhow;
use dotenvy::dotenv;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tracing::{error, info, warn};

mod config;
mod handlers;
mod llm;
mod state;
mod utils;

use config::Config;
use handlers::commands::{self, parse_command, SessionCommand, HELP_TEXT};
use handlers::draw::{ConsoleProgress, DrawPipeline};
use llm::{DashScopeClient, ImageGenerator, PromptOptimizer};
use state::Session;
use utils::logging::init_logging;

type AppResult = Result<(), Box<dyn Error + Send + Sync>>;
type Pipeline = DrawPipeline<DashScopeClient, DashScopeClient>;

#[derive(Debug, Default, PartialEq)]
struct CliArgs {
    save_dir: Option<PathBuf>,
    prompt: Option<String>,
}

fn usage() -> &'static str {
    "Usage: paint_helper [--save-dir <dir>] [--prompt <text>]\n\n  --save-dir <dir>  save every generated image into <dir>\n  --prompt <text>   run a single request and exit\n\nRequires DASHSCOPE_API_KEY (in .env or the environment)."
}

fn parse_args(args: &[String]) -> anyhow::Result<Option<CliArgs>> {
    let mut parsed = CliArgs::default();
    let mut index = 1;
    while index < args.len() {
        match args[index].as_str() {
            "--save-dir" => {
                index += 1;
                let value = args
                    .get(index)
                    .ok_or_else(|| anyhow!("Missing value for --save-dir"))?;
                parsed.save_dir = Some(PathBuf::from(value));
            }
            "--prompt" => {
                index += 1;
                let value = args
                    .get(index)
                    .ok_or_else(|| anyhow!("Missing value for --prompt"))?;
                if value.trim().is_empty() {
                    return Err(anyhow!("--prompt must not be empty"));
                }
                parsed.prompt = Some(value.trim().to_string());
            }
            "--help" | "-h" => return Ok(None),
            other => {
                return Err(anyhow!("Unknown argument: {other}\n{}", usage()));
            }
        }
        index += 1;
    }
    Ok(Some(parsed))
}

#[tokio::main]
async fn main() -> AppResult {
    dotenv().ok();

    let args: Vec<String> = std::env::args().collect();
    let Some(cli) = parse_args(&args)? else {
        println!("{}", usage());
        return Ok(());
    };

    let config = Config::load();
    let log_level = config
        .as_ref()
        .map(|config| config.log_level.clone())
        .unwrap_or_else(|_| "info".to_string());
    let log_guards = init_logging(&log_level);

    let config = match config {
        Ok(config) => config,
        Err(err) => {
            error!("Configuration error: {err}");
            drop(log_guards);
            std::process::exit(1);
        }
    };
    config.log_summary();

    let client = DashScopeClient::new(&config);
    let auto_save_dir = cli.save_dir.clone();
    let pipeline = DrawPipeline::new(
        PromptOptimizer::new(client.clone(), &config),
        ImageGenerator::new(client, &config),
    )
    .with_auto_save(auto_save_dir);

    let mut session = Session::new();
    info!("Session started");

    if let Some(prompt) = cli.prompt.as_deref() {
        if !run_draw(&pipeline, &mut session, prompt).await {
            drop(log_guards);
            std::process::exit(1);
        }
        return Ok(());
    }

    run_interactive(&pipeline, &mut session, &config, &cli).await?;
    info!(
        "Session ended after {} request(s), {} recorded turn(s)",
        session.requests_started,
        session.log.len()
    );
    Ok(())
}

async fn run_draw(pipeline: &Pipeline, session: &mut Session, user_text: &str) -> bool {
    match pipeline.run(session, user_text, &mut ConsoleProgress).await {
        Ok(outcome) => {
            println!("\nOptimized prompt:\n{}\n", outcome.optimized_prompt);
            println!("Image: {}", outcome.image_url);
            if let Some(path) = outcome.saved_path {
                println!("Saved: {}", path.display());
            }
            true
        }
        Err(err) => {
            eprintln!("Error: {err}");
            false
        }
    }
}

#[derive(Debug, PartialEq)]
enum InputLine {
    Text(String),
    NotUtf8,
}

/// Reads one line without its terminator. `None` at end of input.
async fn read_input_line<R>(reader: &mut R) -> std::io::Result<Option<InputLine>>
where
    R: AsyncBufRead + Unpin,
{
    let mut buf = Vec::new();
    if reader.read_until(b'\n', &mut buf).await? == 0 {
        return Ok(None);
    }
    while matches!(buf.last(), Some(b'\n' | b'\r')) {
        buf.pop();
    }
    Ok(Some(match String::from_utf8(buf) {
        Ok(line) => InputLine::Text(line),
        Err(_) => InputLine::NotUtf8,
    }))
}

async fn run_interactive(
    pipeline: &Pipeline,
    session: &mut Session,
    config: &Config,
    cli: &CliArgs,
) -> anyhow::Result<()> {
    println!("AI drawing helper ({} + {})", config.optimizer_model, config.image_model);
    println!("{HELP_TEXT}\n");

    let mut input = BufReader::new(tokio::io::stdin());
    loop {
        print!("draw> ");
        std::io::stdout().flush()?;

        let line = match read_input_line(&mut input).await? {
            Some(InputLine::Text(line)) => line,
            Some(InputLine::NotUtf8) => {
                warn!("Skipped an input line that is not valid UTF-8");
                eprintln!("Input was not valid UTF-8; switch the terminal to UTF-8 and try again.");
                continue;
            }
            None => {
                println!();
                break;
            }
        };

        match parse_command(&line) {
            SessionCommand::Empty => {}
            SessionCommand::Help => println!("{HELP_TEXT}"),
            SessionCommand::History => println!("{}", commands::render_history(&session.log)),
            SessionCommand::Save(dir) => {
                let default_dir = cli.save_dir.as_deref().or(config.output_dir.as_deref());
                let dir = commands::resolve_save_dir(dir.as_deref(), default_dir);
                match commands::save_last_image(session, &dir).await {
                    Ok(path) => println!("Saved: {}", path.display()),
                    Err(err) => eprintln!("Error: {err:#}"),
                }
            }
            SessionCommand::Quit => break,
            SessionCommand::Unknown(name) => {
                println!("Unknown command {name}; type /help for the list.");
            }
            SessionCommand::Draw(text) => {
                run_draw(pipeline, session, &text).await;
            }
        }
    }
    Ok(())
}
