//! CLI for one-shot chat completions.

use crate::config::Config;
use crate::provider::{
    ChatCompletion, ChatCompletionRequest, ChatTransport, OpenAICompatClient, ReasoningEffort,
    RequestMessage,
};
use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use futures::StreamExt;
use std::io::{self, Read, Write};
use std::process::ExitCode;

/// OpenAI-compatible chat client for the Pollinations API
#[derive(Parser, Debug)]
#[command(name = "pollinations", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Send one chat prompt and print the reply
    Chat(ChatArgs),
}

#[derive(Parser, Debug)]
pub struct ChatArgs {
    /// The prompt to send (use "-" to read from stdin)
    #[arg(required = true)]
    pub prompt: String,

    /// Model to use (defaults to config `default_model`)
    #[arg(short, long)]
    pub model: Option<String>,

    /// System prompt
    #[arg(short, long)]
    pub system: Option<String>,

    /// Sampling temperature
    #[arg(short, long)]
    pub temperature: Option<f32>,

    /// Reasoning effort for models that support it
    #[arg(long, value_enum)]
    pub reasoning_effort: Option<EffortArg>,

    /// Print content as it streams
    #[arg(long)]
    pub stream: bool,

    /// Print the full completion as JSON (collected when streaming)
    #[arg(long)]
    pub json: bool,

    /// Verbose output
    #[arg(short, long)]
    pub verbose: bool,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
pub enum EffortArg {
    Low,
    Medium,
    High,
}

impl From<EffortArg> for ReasoningEffort {
    fn from(effort: EffortArg) -> Self {
        match effort {
            EffortArg::Low => Self::Low,
            EffortArg::Medium => Self::Medium,
            EffortArg::High => Self::High,
        }
    }
}

impl ChatArgs {
    /// Build the request from flags, falling back to config for the model.
    pub fn request(&self, prompt: String, config: &Config) -> ChatCompletionRequest {
        let mut messages = Vec::new();
        if let Some(system) = &self.system {
            messages.push(RequestMessage::system(system.clone()));
        }
        messages.push(RequestMessage::user(prompt));

        let model = self
            .model
            .clone()
            .unwrap_or_else(|| config.default_model.clone());
        let mut request = ChatCompletionRequest::new(messages).model(model);
        if let Some(temperature) = self.temperature {
            request = request.temperature(temperature);
        }
        if let Some(effort) = self.reasoning_effort {
            request = request.reasoning_effort(effort.into());
        }
        request
    }
}

/// Run a command and map failures to an exit code.
pub async fn run(command: Commands) -> ExitCode {
    let result = match command {
        Commands::Chat(args) => run_chat(args).await,
    };
    match result {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::from(1)
        }
    }
}

async fn run_chat(args: ChatArgs) -> Result<ExitCode> {
    if args.verbose {
        let _ = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_writer(std::io::stderr)
            .try_init();
    }

    let config = Config::load()?;
    let prompt = read_prompt(&args.prompt)?;
    if prompt.is_empty() {
        anyhow::bail!("Empty prompt");
    }

    let request = args.request(prompt, &config);
    let client = OpenAICompatClient::from_config(&config);
    respond(&client, &request, &args).await?;
    Ok(ExitCode::SUCCESS)
}

/// Send the request and print the reply in the selected format.
async fn respond<T: ChatTransport>(
    client: &OpenAICompatClient<T>,
    request: &ChatCompletionRequest,
    args: &ChatArgs,
) -> crate::error::Result<()> {
    if args.json {
        let completion = if args.stream {
            client.create_collected(request).await?
        } else {
            client.create(request).await?
        };
        println!("{}", serde_json::to_string_pretty(&completion)?);
        return Ok(());
    }

    if args.stream {
        let mut chunks = client.create_stream(request).await?;
        let mut stdout = io::stdout();
        while let Some(chunk) = chunks.next().await {
            if let Some(text) = chunk?.content() {
                print!("{text}");
                stdout.flush()?;
            }
        }
        println!();
        return Ok(());
    }

    let completion = client.create(request).await?;
    print_completion(&completion);
    Ok(())
}

/// Read the prompt, handling stdin with "-".
fn read_prompt(prompt: &str) -> Result<String> {
    if prompt == "-" {
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer)?;
        Ok(buffer.trim().to_string())
    } else {
        Ok(prompt.to_string())
    }
}

fn print_completion(completion: &ChatCompletion) {
    let Some(message) = completion.message() else {
        eprintln!("No choices in response");
        return;
    };
    if let Some(content) = &message.content {
        println!("{content}");
    }
    for call in message.tool_calls.iter().flatten() {
        eprintln!("> {}({})", call.function.name, call.function.arguments);
    }
}
