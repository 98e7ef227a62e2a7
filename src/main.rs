//! CLI entrypoint for the POPM exam practice shell.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use popm_exam::backend::{MockBackend, MockReply};
use popm_exam::config::{AppConfig, ConfigLoader, Provider};
use popm_exam::fallback::StaticQuestions;
use popm_exam::generator::{Generator, LlmGenerator};
use popm_exam::shell::{Shell, ShellDefaults};
use popm_exam::{logging, QuestionBank};
use tokio::io::BufReader;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "popm-exam")]
#[command(author, version, about = "Practice SAFe POPM exam questions, with LLM-generated question banks")]
struct Cli {
    /// Path to a TOML config file
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Ignore config files (environment variables still apply)
    #[arg(long)]
    no_config: bool,

    /// Override the configured provider (anthropic or ollama)
    #[arg(long, value_name = "PROVIDER")]
    provider: Option<Provider>,

    /// Override the configured model
    #[arg(short, long, value_name = "MODEL")]
    model: Option<String>,

    /// Never call a model; serve the built-in questions
    #[arg(long)]
    offline: bool,

    /// Print the resolved configuration and exit
    #[arg(long)]
    show_config: bool,

    /// Verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

impl Cli {
    fn load_config(&self) -> Result<AppConfig> {
        let mut config = if self.no_config {
            ConfigLoader::load_defaults()
        } else {
            ConfigLoader::load(self.config.as_deref())
        }
        .context("failed to load configuration")?;

        if let Some(provider) = self.provider {
            if provider != config.llm.provider {
                config.llm.base_url = None;
                config.llm.model = None;
            }
            config.llm.provider = provider;
        }
        if let Some(model) = &self.model {
            config.llm.model = Some(model.clone());
        }
        config.validate()?;
        Ok(config)
    }
}

fn build_generator(cli: &Cli, config: &AppConfig) -> Result<Arc<dyn Generator>> {
    if cli.offline {
        let offline = LlmGenerator::builder("offline")
            .backend(Arc::new(MockBackend::scripted(vec![MockReply::fail(
                "offline mode: generation disabled",
            )])))
            .build()?;
        return Ok(Arc::new(offline));
    }
    let generator = config
        .build_generator()
        .context("failed to set up the question generator")?;
    Ok(Arc::new(generator))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let log = logging::init(cli.verbose)?;

    let config = cli.load_config()?;
    if cli.show_config {
        let mut shown = config.clone();
        if shown.llm.api_key.is_some() {
            shown.llm.api_key = Some("<redacted>".into());
        }
        println!("{:#?}", shown);
        return Ok(());
    }

    let generator = build_generator(&cli, &config)?;
    info!("using {}", generator.describe());

    let bank = QuestionBank::new(generator, Arc::new(StaticQuestions))
        .with_prompt(config.exam.prompt())
        .with_batch_size(config.bank.batch_size)
        .with_batch_delay(config.bank.batch_delay());

    let mut shell = Shell::new(bank, log).with_defaults(ShellDefaults {
        exam_questions: config.exam.default_questions,
        refresh_count: config.exam.default_refresh,
    });

    let stdin = BufReader::new(tokio::io::stdin());
    let mut stdout = std::io::stdout();
    shell.run(stdin, &mut stdout).await?;
    Ok(())
}
