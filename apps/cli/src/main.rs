use std::{
    io::{Read, Write},
    path::PathBuf,
};

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use tokio::sync::mpsc;

use docwright_core_sdk::prelude::*;

/**
 * \brief CLI entry: assemble a documentation prompt and send it to an LLM.
 */
#[derive(Parser, Debug)]
#[command(name = "docwright", version, about = "Technical documentation assistant")]
struct Cli {
    /// Log at debug level (RUST_LOG still wins)
    #[arg(long, global = true, default_value_t = false)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /**
     * \brief Generate a document and print (or save) the Markdown.
     */
    Generate {
        #[command(flatten)]
        form: FormArgs,
        #[arg(long, default_value = "gemini")]
        provider: String,
        #[arg(long)]
        api_key: Option<String>,
        /// Gemini only: attach Google Search grounding
        #[arg(long, default_value_t = false)]
        grounding: bool,
        #[arg(long)]
        azure_endpoint: Option<String>,
        #[arg(long)]
        azure_deployment: Option<String>,
        #[arg(long)]
        openai_model: Option<String>,
        /// Print tokens as they arrive
        #[arg(long, default_value_t = false)]
        stream: bool,
        /// Write the document to this file
        #[arg(long, conflicts_with = "save")]
        output: Option<PathBuf>,
        /// Write the document to a dated file named after the document type
        #[arg(long, default_value_t = false)]
        save: bool,
    },

    /**
     * \brief Print the assembled prompt without calling any provider.
     */
    Prompt {
        #[command(flatten)]
        form: FormArgs,
    },

    /// List built-in document types
    DocTypes,

    /**
     * \brief Start the local web UI.
     */
    Serve {
        #[arg(long, default_value = "127.0.0.1:5173")]
        addr: String,
        #[arg(long)]
        markdown_guide: Option<PathBuf>,
        #[arg(long)]
        writing_guide: Option<PathBuf>,
    },
}

#[derive(Args, Debug)]
struct FormArgs {
    #[arg(long, default_value = "how-to")]
    doc_type: String,
    /// Draft file, or `-` for stdin
    #[arg(long)]
    draft: String,
    #[arg(long, default_value = "")]
    instructions: String,
    /// Replace the built-in Markdown style guide
    #[arg(long)]
    markdown_guide: Option<PathBuf>,
    /// Replace the built-in general writing style guide
    #[arg(long)]
    writing_guide: Option<PathBuf>,
    /// Replace the selected document type's template
    #[arg(long)]
    template_file: Option<PathBuf>,
    /// Replace the selected document type's description
    #[arg(long)]
    description_file: Option<PathBuf>,
}

impl FormArgs {
    /**
     * \brief Load the draft and guides and build the prompt.
     */
    fn build_prompt(&self) -> Result<String> {
        let draft = read_draft(&self.draft)?;
        if draft.trim().is_empty() {
            bail!("Draft content cannot be empty.");
        }
        let mut session = Session::new();
        session
            .load_style_guides(self.markdown_guide.as_deref(), self.writing_guide.as_deref())
            .context("load style guides failed")?;
        if self.template_file.is_some() || self.description_file.is_some() {
            session
                .load_document_type_files(
                    &self.doc_type,
                    self.template_file.as_deref(),
                    self.description_file.as_deref(),
                )
                .context("load document type files failed")?;
        }
        prompt::build_prompt(&session, Some(&self.doc_type), &draft, &self.instructions)
            .with_context(|| {
                format!(
                    "unknown document type '{}', run: docwright doc-types",
                    self.doc_type
                )
            })
    }
}

fn read_draft(source: &str) -> Result<String> {
    if source == "-" {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("read draft from stdin failed")?;
        Ok(buf)
    } else {
        std::fs::read_to_string(source).with_context(|| format!("read draft {} failed", source))
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    telemetry::init(cli.verbose)?;

    match cli.command {
        Commands::Generate {
            form,
            provider,
            api_key,
            grounding,
            azure_endpoint,
            azure_deployment,
            openai_model,
            stream,
            output,
            save,
        } => {
            let provider: Provider = provider.parse()?;
            let prompt = form.build_prompt()?;
            let env = ProviderEnv::from_env();
            let mut options = GenerationOptions {
                use_grounding: grounding,
                azure_endpoint,
                azure_deployment_name: azure_deployment,
                openai_model_name: openai_model,
                on_stream_token: None,
            };

            let printer = if stream {
                let (tx, mut rx) = mpsc::unbounded_channel::<String>();
                options = options.with_stream_sink(tx);
                Some(tokio::spawn(async move {
                    let mut stdout = std::io::stdout();
                    while let Some(token) = rx.recv().await {
                        print!("{}", token);
                        stdout.flush().ok();
                    }
                }))
            } else {
                None
            };

            tracing::debug!(provider = provider.id(), "generate");
            let result = llm::generate(&env, provider, api_key.as_deref(), &prompt, &options).await;
            drop(options);
            let streamed = match printer {
                Some(handle) => {
                    handle.await.ok();
                    true
                }
                None => false,
            };
            let response = result.context("generation failed")?;

            if streamed {
                println!();
            } else {
                println!("{}", response.text);
            }
            print_citations(&response);

            let target = match (output, save) {
                (Some(path), _) => Some(path),
                (None, true) => {
                    let name = content::find_document_type(&form.doc_type).map(|dt| dt.name);
                    Some(PathBuf::from(content::download_file_name_today(name)))
                }
                (None, false) => None,
            };
            if let Some(path) = target {
                std::fs::write(&path, &response.text)
                    .with_context(|| format!("write {} failed", path.display()))?;
                eprintln!("Saved {}", path.display());
            }
        }
        Commands::Prompt { form } => {
            println!("{}", form.build_prompt()?);
        }
        Commands::DocTypes => {
            for dt in content::document_types() {
                let description = content::default_description(dt.id).unwrap_or_default();
                println!("{:<10} {:<10} {}", dt.id, dt.name, description);
            }
        }
        Commands::Serve {
            addr,
            markdown_guide,
            writing_guide,
        } => {
            let mut session = Session::new();
            session
                .load_style_guides(markdown_guide.as_deref(), writing_guide.as_deref())
                .context("load style guides failed")?;
            server::run(&addr, session).await?;
        }
    }

    Ok(())
}

fn print_citations(response: &GenerationResponse) {
    let Some(chunks) = &response.grounding_chunks else {
        return;
    };
    println!("\nGrounding sources (from Google Search):");
    for (i, c) in chunks.iter().enumerate() {
        let label = if c.title.is_empty() { &c.uri } else { &c.title };
        println!("  [{}] {} <{}>", i + 1, label, c.uri);
    }
}
