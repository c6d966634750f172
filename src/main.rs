use std::path::{Path, PathBuf};

use anyhow::{Context, anyhow, bail};
use catalog_review::{
    ErrorContext, codec,
    config::{self, Config},
    notify::{LogNotifier, Notifier, webhook::WebhookNotifier},
    session::{ReviewSession, SessionOptions, SessionState},
    store::{
        BlobStore,
        s3::{Credentials, S3Store},
        sqlite::SqliteStore,
    },
    terminal,
};
use clap::{Parser, Subcommand};
use futures::future::try_join_all;
use indexmap::IndexMap;
use tracing::{error, info};

#[derive(Parser)]
struct Opts {
    #[clap(short, long, env = "CATALOG_REVIEW_CONFIG")]
    config: PathBuf,
    #[clap(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Review descriptions of one category interactively
    Review {
        #[clap(long)]
        category: String,
        /// Start at this position of the eligible set
        #[clap(long)]
        offset: Option<usize>,
        /// Stop after one batch
        #[clap(long)]
        once: bool,
        /// JSON file carrying the cursor between runs
        #[clap(long)]
        state: Option<PathBuf>,
    },
    /// Show progress of every category
    Status {
        #[clap(long)]
        json: bool,
    },
    /// Print prompts for every open record of a category
    Prompt {
        #[clap(long)]
        category: String,
    },
    /// Copy a local CSV file into the store
    Import { blob: String, file: PathBuf },
    /// Copy a blob from the store into a local file
    Export { blob: String, file: PathBuf },
}

async fn load_state(path: &Path) -> anyhow::Result<SessionState> {
    match tokio::fs::read_to_string(path).await {
        Ok(text) => serde_json::from_str(&text)
            .with_context(|| format!("parse session state from {}", path.display())),
        Err(error) if error.kind() == std::io::ErrorKind::NotFound => Ok(SessionState::default()),
        Err(error) => Err(error).with_context(|| format!("read {}", path.display())),
    }
}

async fn save_state(path: &Path, state: &SessionState) -> anyhow::Result<()> {
    tokio::fs::write(path, serde_json::to_string_pretty(state)?)
        .await
        .with_context(|| format!("write {}", path.display()))
}

fn options(config: &Config) -> SessionOptions {
    SessionOptions {
        batch_size: config.batch_size,
        merge_mode: config.merge_mode,
        write_back_base: config.write_back_base,
        topic: config.notify.topic.clone(),
    }
}

/// State that suppresses the exhaustion notification for read-only commands.
fn quiet_state(config: &Config) -> SessionState {
    SessionState {
        notified: config.categories.keys().cloned().collect(),
        ..Default::default()
    }
}

async fn execute<S, N>(store: &S, notifier: &N, config: &Config, command: Command) -> anyhow::Result<()>
where
    S: BlobStore + Sync,
    S::Error: std::error::Error + Send + Sync + 'static,
    N: Notifier + Sync,
    N::Error: std::fmt::Display,
{
    match command {
        Command::Review {
            category: name,
            offset,
            once,
            state: state_path,
        } => {
            let category = config.category(&name).map_err(|msg| anyhow!("{msg}"))?.clone();
            let mut state = match &state_path {
                Some(path) => load_state(path).await?,
                None => SessionState::default(),
            };
            if let Some(offset) = offset {
                state.offsets.insert(name.clone(), offset);
            }
            let mut session = ReviewSession::open(
                store,
                notifier,
                name,
                category,
                config.columns.clone(),
                options(config),
                state,
            )
            .await?;
            let result = terminal::review(&mut session, once).await;
            if let Some(path) = &state_path {
                save_state(path, session.state()).await?;
            }
            result?;
        }
        Command::Status { json } => {
            let sessions = try_join_all(config.categories.iter().map(|(name, category)| {
                ReviewSession::open(
                    store,
                    notifier,
                    name.clone(),
                    category.clone(),
                    config.columns.clone(),
                    options(config),
                    quiet_state(config),
                )
            }))
            .await?;
            if json {
                let summaries = sessions
                    .iter()
                    .map(|session| (session.name(), session.summary()))
                    .collect::<IndexMap<_, _>>();
                println!("{}", serde_json::to_string_pretty(&summaries)?);
            } else {
                for session in &sessions {
                    terminal::print_summary(
                        session.name(),
                        &session.category().label,
                        &session.summary(),
                    );
                }
            }
        }
        Command::Prompt { category: name } => {
            let category = config.category(&name).map_err(|msg| anyhow!("{msg}"))?.clone();
            let session = ReviewSession::open(
                store,
                notifier,
                name,
                category,
                config.columns.clone(),
                options(config),
                quiet_state(config),
            )
            .await?;
            for entry in session.eligible_entries() {
                terminal::print_entry(&entry);
            }
        }
        Command::Import { blob, file } => {
            let body = tokio::fs::read(&file)
                .await
                .with_context(|| format!("read {}", file.display()))?;
            let dataset = codec::decode(&ErrorContext::new(file.display().to_string()), &body)?;
            store.put(&blob, body.into()).await?;
            info!(%blob, rows = dataset.len(), "imported");
        }
        Command::Export { blob, file } => {
            let Some(body) = store.get(&blob).await? else {
                bail!("blob {blob} does not exist");
            };
            tokio::fs::write(&file, &body)
                .await
                .with_context(|| format!("write {}", file.display()))?;
            info!(%blob, bytes = body.len(), "exported");
        }
    }
    Ok(())
}

async fn with_store<S>(store: &S, config: &Config, command: Command) -> anyhow::Result<()>
where
    S: BlobStore + Sync,
    S::Error: std::error::Error + Send + Sync + 'static,
{
    match &config.notify.kind {
        config::Notify::Log => execute(store, &LogNotifier, config, command).await,
        config::Notify::Webhook { url } => {
            execute(store, &WebhookNotifier::new(url), config, command).await
        }
    }
}

async fn run(opts: Opts) -> anyhow::Result<()> {
    let config = tokio::fs::read_to_string(&opts.config)
        .await
        .with_context(|| "read config")?;
    let config: Config = serde_yaml::from_str(&config)
        .with_context(|| format!("parse config from {}", opts.config.display()))?;
    config.validate().map_err(|msg| anyhow!("{msg}"))?;
    match &config.store {
        config::Store::S3 {
            bucket,
            region,
            endpoint,
            access_key_id,
            secret_access_key,
        } => {
            let credentials = match (access_key_id, secret_access_key) {
                (Some(access_key_id), Some(secret_access_key)) => Some(Credentials {
                    access_key_id: access_key_id.clone(),
                    secret_access_key: secret_access_key.clone(),
                }),
                (None, None) => None,
                _ => bail!("access_key_id and secret_access_key must be given together"),
            };
            let store =
                S3Store::new(bucket.clone(), region.clone(), endpoint.clone(), credentials).await;
            with_store(&store, &config, opts.command).await
        }
        config::Store::Sqlite { url } => {
            let store = SqliteStore::open(url)
                .await
                .with_context(|| format!("open local store {url}"))?;
            with_store(&store, &config, opts.command).await
        }
    }
}

fn main() {
    let opts = Opts::parse();
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();
    let runtime = match tokio::runtime::Builder::new_multi_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(e) => {
            error!(?e, "failed to start runtime");
            std::process::exit(1);
        }
    };
    if let Err(e) = runtime.block_on(run(opts)) {
        error!(?e, "critical error");
        std::process::exit(1);
    }
}
