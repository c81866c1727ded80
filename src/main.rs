//! MediScan Portal command line.
//!
//! Drives the two engines against a live imaging API: submit one MRI scan
//! for analysis, or list a user's notifications with their deep links.

use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;

use mediscan_portal::intake::FileCandidate;
use mediscan_portal::models::{Filter, NotificationId};
use mediscan_portal::notifications::MarkReadOutcome;
use mediscan_portal::upload::SeverityTable;
use mediscan_portal::{config, Identity, NotificationStore, PortalClient, PortalConfig, UploadSession};

#[derive(Parser, Debug)]
#[command(name = "mediscan-portal")]
#[command(about = "MRI scan submission and notification routing for the clinical portal")]
#[command(version)]
struct Args {
    /// Imaging API base URL (overrides MEDISCAN_API_URL)
    #[arg(long, global = true)]
    api_url: Option<String>,

    /// Per-request timeout in seconds (overrides MEDISCAN_TIMEOUT_SECS)
    #[arg(long, global = true)]
    timeout: Option<u64>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Submit a JPEG or PNG scan for classification and segmentation
    Analyze {
        /// Scan image to upload
        path: PathBuf,
    },
    /// List notifications for a user
    Notifications {
        /// Role as issued at login (Patient, Doctor, Specialist, Radiologist, ...)
        #[arg(long)]
        role: String,

        /// User id
        #[arg(long, conflicts_with = "token", required_unless_present = "token")]
        user: Option<String>,

        /// Access token to read the user id from
        #[arg(long, env = "MEDISCAN_TOKEN")]
        token: Option<String>,

        /// all, unread or read
        #[arg(long, default_value = "all")]
        filter: String,

        /// Mark this notification read after loading
        #[arg(long)]
        mark_read: Option<NotificationId>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    mediscan_portal::init_tracing();
    let args = Args::parse();

    let config = PortalConfig::from_env()
        .context("Invalid MEDISCAN_* environment")?
        .with_overrides(args.api_url.as_deref(), args.timeout)
        .context("Invalid command-line option")?;

    info!("{} v{} using {}", config::APP_NAME, config::APP_VERSION, config.api_base_url);
    let client = Arc::new(PortalClient::from_config(&config).context("Failed to build HTTP client")?);

    match args.command {
        Command::Analyze { path } => analyze(&config, client, path).await,
        Command::Notifications {
            role,
            user,
            token,
            filter,
            mark_read,
        } => {
            let identity = match (user, token) {
                (Some(user), _) => Identity::from_role_str(user, &role),
                (None, Some(token)) => Identity::from_access_token(&token, &role)
                    .context("Could not read user id from access token")?,
                (None, None) => anyhow::bail!("either --user or --token is required"),
            };
            let filter = Filter::from_str(&filter).context("--filter must be all, unread or read")?;
            notifications(client, identity, filter, mark_read).await
        }
    }
}

async fn analyze(config: &PortalConfig, client: Arc<PortalClient>, path: PathBuf) -> Result<()> {
    let session = UploadSession::new(client);
    let candidate = FileCandidate::from_picker(&path)
        .await
        .with_context(|| format!("Could not read {}", path.display()))?;

    if let Err(e) = session.select_file(Some(candidate)) {
        anyhow::bail!("{e}");
    }

    match session.submit().await {
        Ok(result) => {
            let tier = SeverityTable::from_config(config).tier_for(&result.classification_label);
            println!("Classification: {} [{tier}]", result.classification_label);
            println!("Segmentation:   {}", result.segmentation_url(&config.api_base_url));
            Ok(())
        }
        Err(e) => {
            let message = session.snapshot().error.unwrap_or_else(|| e.to_string());
            anyhow::bail!("{message} ({e})")
        }
    }
}

async fn notifications(
    client: Arc<PortalClient>,
    identity: Identity,
    filter: Filter,
    mark_read: Option<NotificationId>,
) -> Result<()> {
    let store = NotificationStore::new(client);
    store.load(&identity).await?;

    if let Some(id) = mark_read {
        match store.mark_read(id).await? {
            MarkReadOutcome::Marked => println!("Marked {id} as read"),
            MarkReadOutcome::AlreadyRead => println!("{id} was already read"),
            MarkReadOutcome::NotFound => println!("No notification {id}"),
            MarkReadOutcome::PendingRetry(reason) => {
                println!("{id} marked read locally; server update failed: {reason}")
            }
        }
    }

    let items = store.filter(filter);
    println!("{} notification(s), {} unread", items.len(), store.unread_count());
    for item in items {
        let date = item
            .created_at
            .map(|ts| ts.format("%Y-%m-%d").to_string())
            .unwrap_or_else(|| "----------".into());
        let marker = if item.read { " " } else { "*" };
        let link = item.link.as_deref().unwrap_or("-");
        println!(
            "{marker} {:>5}  {date}  [{:<14}] {}  → {link}",
            item.id, item.category, item.display_text
        );
    }
    Ok(())
}
