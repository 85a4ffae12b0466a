// SPDX-License-Identifier: MIT

use anyhow::Context;
use clap::{Args, Parser, Subcommand, ValueEnum};
use dotenv::dotenv;
use futures::StreamExt;
use langkit_rs::adk::agent::{Agent, LLMAgent};
use langkit_rs::adk::error::LangkitError;
use langkit_rs::adk::model::{create_model, Content, GenerationConfig, Model, ModelConfig};
use langkit_rs::adk::tool::Tool;
use langkit_rs::langkit::demos;
use langkit_rs::langkit::graph::{CompiledGraph, PartialUpdate};
use langkit_rs::langkit::registry::ToolRegistry;
use langkit_rs::langkit::tools::default_tools;
use std::io::Write;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Debug)]
struct ModelArgs {
    /// The model to use
    #[arg(short, long, default_value = "gemini-2.0-flash")]
    model: String,

    /// Provider override (openai, anthropic, gemini); inferred from the model otherwise
    #[arg(long)]
    provider: Option<String>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Send a single prompt and print the reply
    Chat {
        #[arg(short, long)]
        prompt: String,
        #[command(flatten)]
        model: ModelArgs,
    },
    /// Stream the reply to stdout as it is generated
    Stream {
        #[arg(short, long)]
        prompt: String,
        #[command(flatten)]
        model: ModelArgs,
    },
    /// Bind the demo tools and show which calls the model requests
    Tools {
        #[arg(short, long)]
        prompt: String,
        /// Also execute the requested calls once
        #[arg(long)]
        execute: bool,
        #[command(flatten)]
        model: ModelArgs,
    },
    /// Run the tool-calling agent loop
    Agent {
        #[arg(short, long)]
        prompt: String,
        #[arg(long, default_value_t = 10)]
        max_turns: u32,
        #[command(flatten)]
        model: ModelArgs,
    },
    /// Run one of the demo graphs
    Graph {
        #[arg(short, long, value_enum)]
        example: GraphExample,
        /// Name for `basics`, user message for `chatbot`
        #[arg(short, long)]
        input: Option<String>,
        /// Print the graph as a Mermaid flowchart instead of running it
        #[arg(long)]
        mermaid: bool,
        #[command(flatten)]
        model: ModelArgs,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum GraphExample {
    Basics,
    Chatbot,
}

fn load_model(args: &ModelArgs) -> anyhow::Result<Arc<dyn Model>> {
    let config = ModelConfig::from_env(&args.model, args.provider.as_deref())
        .context("failed to load model configuration")?;
    Ok(create_model(&config)?)
}

async fn run_graph(graph: &CompiledGraph, initial: Option<PartialUpdate>) -> anyhow::Result<()> {
    let (tx, rx) = mpsc::channel(16);
    let mut events = ReceiverStream::new(rx);

    let run = graph.run_stream(initial, tx);
    let print = async {
        while let Some(event) = events.next().await {
            println!(
                "[{}] {} -> {}",
                event.index,
                event.step,
                serde_json::to_string(&event.update).unwrap_or_default()
            );
        }
    };
    let (state, ()) = tokio::join!(run, print);
    let state = state?;

    println!("{}", serde_json::to_string_pretty(&state.to_json())?);
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    env_logger::init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Chat { prompt, model } => {
            let model = load_model(&model)?;
            let reply = model
                .generate_content(&[Content::user(prompt)], None, None)
                .await?;
            println!("{}", reply.text());
        }
        Commands::Stream { prompt, model } => {
            let model = load_model(&model)?;
            let mut stream = model.stream_content(&[Content::user(prompt)], None).await?;
            let mut stdout = std::io::stdout();
            while let Some(fragment) = stream.next().await {
                print!("{}", fragment?);
                stdout.flush()?;
            }
            println!();
        }
        Commands::Tools {
            prompt,
            execute,
            model,
        } => {
            let model = load_model(&model)?;
            let registry = ToolRegistry::with_tools(default_tools()).await;
            log::info!("Bound tools: {:?}", registry.names().await);

            for event in demos::invoke_with_tools(model, &registry, &prompt, execute).await? {
                println!("{}", event);
            }
        }
        Commands::Agent {
            prompt,
            max_turns,
            model,
        } => {
            let model = load_model(&model)?;
            let agent = LLMAgent::new(
                "assistant".to_string(),
                "Answers questions using the demo tools".to_string(),
                "You are a helpful assistant. Use the available tools when they help.".to_string(),
                model,
                default_tools(),
            )
            .with_max_turns(max_turns);

            let (tx, rx) = mpsc::channel(32);
            let mut events = ReceiverStream::new(rx);
            let run = agent.run_stream(prompt, tx);
            let print = async {
                while let Some(event) = events.next().await {
                    println!("{}", event);
                }
            };
            let (answer, ()) = tokio::join!(run, print);
            answer?;
        }
        Commands::Graph {
            example,
            input,
            mermaid,
            model,
        } => match example {
            GraphExample::Basics => {
                let graph = demos::build_basics_graph()?;
                if mermaid {
                    print!("{}", graph.to_mermaid());
                    return Ok(());
                }
                run_graph(&graph, demos::basics_input(input.as_deref())).await?;
            }
            GraphExample::Chatbot => {
                if mermaid {
                    // Rendering needs no credentials
                    let graph = demos::build_chatbot_graph(Arc::new(OfflineModel))?;
                    print!("{}", graph.to_mermaid());
                    return Ok(());
                }
                let graph = demos::build_chatbot_graph(load_model(&model)?)?;
                let message = input.unwrap_or_else(|| "Hello!".to_string());
                let reply = demos::chat_turn(&graph, &message).await?;
                println!("{}", reply);
            }
        },
    }

    Ok(())
}

/// Stand-in used only to draw the chatbot graph
struct OfflineModel;

#[async_trait::async_trait]
impl Model for OfflineModel {
    fn name(&self) -> &str {
        "offline"
    }

    async fn generate_content(
        &self,
        _history: &[Content],
        _config: Option<&GenerationConfig>,
        _tools: Option<&[Arc<dyn Tool>]>,
    ) -> langkit_rs::adk::error::Result<Content> {
        Err(LangkitError::other("offline model cannot generate content"))
    }
}
