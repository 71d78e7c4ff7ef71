mod client;
mod commands;

use agentcheck_engine::ExecutorSettings;
use anyhow::Result;
use clap::{Parser, Subcommand};
use client::ApiClient;

#[derive(Parser)]
#[command(name = "agentcheck-cli")]
#[command(about = "agentcheck CLI - Run and inspect AI agent test executions", long_about = None)]
struct Cli {
    /// Base URL of the agentcheck API
    #[arg(long, env = "AGENTCHECK_API_URL", default_value = "http://localhost:8000")]
    api_url: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check that the API is up
    Health,

    /// List the test categories
    Categories,

    /// Show the predefined test cases per category
    Cases,

    /// Send a single prompt about a web page
    Quick {
        /// Prompt to send
        #[arg(short, long)]
        prompt: String,

        /// Web page the prompt refers to
        #[arg(short, long)]
        url: String,

        /// Model identifier (server default when omitted)
        #[arg(short, long)]
        model: Option<String>,

        /// Provider API key (server key when omitted)
        #[arg(long, env = "AGENTCHECK_API_KEY", hide_env_values = true)]
        api_key: Option<String>,
    },

    /// Execute a suite of test cases from a JSON file
    Run {
        /// Suite file: a list of test cases or an object with `test_cases`
        #[arg(short, long)]
        file: String,

        /// Model identifier (server default when omitted)
        #[arg(short, long)]
        model: Option<String>,

        /// Provider API key (server key when omitted)
        #[arg(long, env = "AGENTCHECK_API_KEY", hide_env_values = true)]
        api_key: Option<String>,
    },

    /// Check a suite file locally without running it
    Validate {
        #[arg(short, long)]
        file: String,

        /// Suite size limit; match the server's MAX_TEST_CASES
        #[arg(long, env = "MAX_TEST_CASES", default_value_t = ExecutorSettings::default().max_test_cases)]
        max_test_cases: usize,
    },

    /// Generate a suite from the predefined catalog
    Generate {
        /// Comma-separated categories, e.g. response_accuracy,performance
        #[arg(short, long, value_delimiter = ',', required = true)]
        categories: Vec<String>,

        /// Cases to take per category
        #[arg(short = 'n', long)]
        per_category: Option<usize>,

        /// Write the suite here instead of printing it
        #[arg(short, long)]
        output: Option<String>,
    },

    /// List recorded executions
    Executions,

    /// Show one execution with all of its results
    Show { execution_id: String },

    /// Show the report for one execution
    Report { execution_id: String },

    /// Show aggregate statistics
    Stats,

    /// Write the built-in catalog to a file for editing
    InitCatalog {
        #[arg(short, long, default_value = "config/test_cases.json")]
        path: String,

        /// Overwrite an existing file
        #[arg(long, default_value = "false")]
        force: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let client = ApiClient::new(&cli.api_url)?;

    match cli.command {
        Commands::Health => commands::health(&client).await?,
        Commands::Categories => commands::list_categories(&client).await?,
        Commands::Cases => commands::list_predefined_cases(&client).await?,
        Commands::Quick {
            prompt,
            url,
            model,
            api_key,
        } => {
            commands::quick_test(&client, &prompt, &url, model.as_deref(), api_key.as_deref())
                .await?;
        }
        Commands::Run {
            file,
            model,
            api_key,
        } => {
            commands::run_suite(&client, &file, model.as_deref(), api_key.as_deref()).await?;
        }
        Commands::Validate {
            file,
            max_test_cases,
        } => commands::validate_suite(&file, max_test_cases)?,
        Commands::Generate {
            categories,
            per_category,
            output,
        } => {
            commands::generate_suite(&client, &categories, per_category, output.as_deref())
                .await?;
        }
        Commands::Executions => commands::list_executions(&client).await?,
        Commands::Show { execution_id } => commands::show_execution(&client, &execution_id).await?,
        Commands::Report { execution_id } => commands::show_report(&client, &execution_id).await?,
        Commands::Stats => commands::show_stats(&client).await?,
        Commands::InitCatalog { path, force } => commands::init_catalog(&path, force)?,
    }

    Ok(())
}
