use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use reqwest::Client;
use token_broker::config::sources::{expand_scopes, BrokerConfig, Settings, TaskSettings};
use token_broker::observability::metrics::export_textfile;
use token_broker::tasks;
use token_broker::utils::config_loader;
use token_broker::utils::logging::{self, LogLevel};
use tracing::{debug, warn};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Broker config [default: ~/.token-broker/config.yaml when present]
    #[arg(short, long, env = "TOKEN_BROKER_CONFIG", global = true)]
    config: Option<String>,
    #[arg(long, env = "LOG_LEVEL", value_enum, global = true)]
    log_level: Option<LogLevel>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Fetch a token and print it
    Fetch(FetchArgs),
    /// Fetch a token and print it as an Authorization header
    Header(FetchArgs),
    /// Fetch a token and call a URL with it through curl
    Curl {
        #[command(flatten)]
        fetch: FetchArgs,
        /// Target URL
        #[arg(long)]
        url: String,
        /// curl binary override
        #[arg(long)]
        curlcli: Option<String>,
        /// Extra arguments passed to curl after `--`
        #[arg(last = true)]
        extra_args: Vec<String>,
    },
    /// Print the token info of a token
    Info { token: String },
    /// Test a token: prints and exits with 0 when valid, 1 otherwise
    Test { token: String },
    /// Clear the token cache
    Reset,
}

#[derive(clap::Args)]
struct FetchArgs {
    /// Credentials file (service account or authorized user JSON)
    #[arg(long, env = "TOKEN_BROKER_CREDENTIALS")]
    credentials: Option<PathBuf>,
    /// Scopes, repeatable or comma separated; short names are expanded
    #[arg(long)]
    scope: Vec<String>,
    /// Identity for the SSO delegate, used when no credentials are given
    #[arg(long)]
    email: Option<String>,
    #[arg(long)]
    audience: Option<String>,
    #[arg(long)]
    quota_project: Option<String>,
    /// Exchange the token through STS
    #[arg(long)]
    sts: bool,
    /// bare, header, json, json_compact or pretty
    #[arg(short, long, default_value = "bare")]
    format: String,
    /// SSO command override
    #[arg(long)]
    ssocli: Option<String>,
}

impl FetchArgs {
    async fn settings(&self) -> Result<Settings> {
        let credentials_json = match &self.credentials {
            Some(path) => Some(
                tokio::fs::read_to_string(path)
                    .await
                    .with_context(|| format!("failed to read credentials '{}'", path.display()))?,
            ),
            None => None,
        };
        Ok(Settings {
            credentials_json,
            email: self.email.clone(),
            scope: expand_scopes(&self.scope),
            audience: self.audience.clone(),
            quota_project: self.quota_project.clone(),
            sts: self.sts,
        })
    }

    fn task_settings(&self, config: &BrokerConfig) -> TaskSettings {
        let commands = &config.settings.commands;
        TaskSettings {
            format: self.format.clone(),
            sso_cli: self.ssocli.clone().unwrap_or_else(|| commands.sso_cli.clone()),
            curl_cli: commands.curl_cli.clone(),
            url: None,
            extra_args: Vec::new(),
        }
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // -------------------------------
    // 1. Load config, init logging
    // -------------------------------

    let args = Args::parse();
    let broker_config = config_loader::run(args.config.as_deref()).await?;
    logging::run(&broker_config, args.log_level)?;
    debug!("config loaded");

    // -------------------------------
    // 2. Run the command
    // -------------------------------

    let client = Client::new();
    let mut out = std::io::stdout();
    let code = match &args.command {
        Command::Fetch(fetch) => {
            let broker = tasks::build_broker(&broker_config, &client)?;
            let settings = fetch.settings().await?;
            tasks::fetch(&broker, &settings, &fetch.task_settings(&broker_config), &mut out).await?
        }
        Command::Header(fetch) => {
            let broker = tasks::build_broker(&broker_config, &client)?;
            let settings = fetch.settings().await?;
            tasks::header(&broker, &settings, &fetch.task_settings(&broker_config), &mut out).await?
        }
        Command::Curl { fetch, url, curlcli, extra_args } => {
            let broker = tasks::build_broker(&broker_config, &client)?;
            let settings = fetch.settings().await?;
            let mut task_settings = fetch.task_settings(&broker_config);
            task_settings.url = Some(url.clone());
            task_settings.extra_args = extra_args.clone();
            if let Some(curl_cli) = curlcli {
                task_settings.curl_cli = curl_cli.clone();
            }
            tasks::curl(&broker, &settings, &task_settings, &mut out).await?
        }
        Command::Info { token } => {
            let token_info = tasks::build_token_info_client(&broker_config, &client);
            tasks::info(&token_info, token, &mut out).await?
        }
        Command::Test { token } => {
            let token_info = tasks::build_token_info_client(&broker_config, &client);
            tasks::test(&token_info, token, &mut out).await?
        }
        Command::Reset => {
            let broker = tasks::build_broker(&broker_config, &client)?;
            tasks::reset(&broker, &mut out).await?
        }
    };

    // -------------------------------
    // 3. Export metrics
    // -------------------------------

    if let Some(path) = &broker_config.settings.metrics.textfile_path {
        if let Err(e) = export_textfile(Path::new(path)).await {
            warn!("metrics export failed: {:#}", e);
        }
    }

    if code != 0 {
        std::process::exit(code);
    }
    Ok(())
}
