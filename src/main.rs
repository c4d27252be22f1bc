use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use mailbox_sync::{
    init_logging, AccountId, ChangeQueryEntry, ConfiguredAccountService, FoldersController, JsonResponse,
    RequestContext,
};
use mailbox_sync::folders::changes::parse_entries;
use mailbox_sync::mail::AccountsConfig;

/// Mailbox folder sync for configured IMAP accounts
#[derive(Parser)]
#[command(name = "mailbox-sync")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Accounts configuration file (JSON)
    #[arg(long, global = true, env = "MAILBOX_SYNC_CONFIG", default_value = "accounts.json")]
    config: PathBuf,

    /// User owning the account
    #[arg(long, global = true, default_value = "default")]
    user: String,

    /// Account id
    #[arg(long, global = true, default_value_t = 1)]
    account: AccountId,
}

#[derive(Subcommand)]
enum Command {
    /// List folders with counts
    List,

    /// Create a folder
    Create {
        name: String,

        /// Identifier of the parent folder
        #[arg(long)]
        parent: Option<String>,
    },

    /// Delete a folder by identifier
    Delete { id: String },

    /// Detect changes against a JSON file of last-known folder states
    Detect { file: PathBuf },
}

#[tokio::main]
async fn main() {
    init_logging();
    let cli = Cli::parse();

    let config = match AccountsConfig::from_path(&cli.config) {
        Ok(config) => config,
        Err(e) => {
            log::error!("Failed to load {}: {}", cli.config.display(), e);
            eprintln!("FATAL: {}", e);
            std::process::exit(2);
        }
    };

    let accounts = ConfiguredAccountService::new(&config);
    log::info!("Loaded {} account(s) from {}", accounts.len(), cli.config.display());

    let controller = FoldersController::new(Arc::new(accounts), config.settings.clone());
    let ctx = RequestContext::new(cli.user.clone());

    let cancel = ctx.cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            log::warn!("Interrupted, cancelling");
            cancel.cancel();
        }
    });

    let response = match cli.command {
        Command::List => controller.index(&ctx, cli.account).await,
        Command::Create { name, parent: None } => controller.create(&ctx, cli.account, &name).await,
        Command::Create {
            name,
            parent: Some(parent),
        } => {
            controller
                .create_subfolder(&ctx, cli.account, &parent, &name)
                .await
        }
        Command::Delete { id } => controller.destroy(&ctx, cli.account, &id).await,
        Command::Detect { file } => match read_query(&file) {
            Ok(entries) => controller.detect_changes(&ctx, cli.account, entries).await,
            Err(e) => {
                eprintln!("FATAL: cannot read {}: {}", file.display(), e);
                std::process::exit(2);
            }
        },
    };

    print_response(&response);
    if response.status.code() >= 400 {
        std::process::exit(1);
    }
}

fn read_query(path: &Path) -> Result<Vec<ChangeQueryEntry>, Box<dyn std::error::Error>> {
    let raw = std::fs::read_to_string(path)?;
    Ok(parse_entries(&raw)?)
}

fn print_response(response: &JsonResponse) {
    println!("{}", response.status.code());
    if !response.body.is_null() {
        match serde_json::to_string_pretty(&response.body) {
            Ok(body) => println!("{}", body),
            Err(e) => log::error!("Failed to render response: {}", e),
        }
    }
}
