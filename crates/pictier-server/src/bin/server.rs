//! pictier server binary.
//!
//! Reads `config.toml` (or the path given with `--config`) overlaid with
//! `PICTIER_*` environment variables, opens the SQLite record store, and
//! serves the image API over HTTP. The other subcommands bootstrap accounts
//! and custom tiers.
//!
//! ```text
//! pictier generate-secret
//! pictier tier add --name Gold --sizes 100,500 --original
//! pictier account add --username alice --tier Gold
//! pictier serve
//! ```

use std::{
  path::{Path, PathBuf},
  sync::Arc,
};

use anyhow::Context as _;
use argon2::{Argon2, PasswordHasher, password_hash::SaltString};
use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use clap::{Parser, Subcommand};
use pictier_core::{
  account::NewAccount,
  store::{RecordStore, TierProvider},
  tier::{NewCustomTier, parse_sizes},
};
use pictier_server::{AppState, ServerConfig};
use pictier_store_sqlite::SqliteStore;
use rand_core::{OsRng, RngCore as _};
use tokio::net::TcpListener;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "pictier image server")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, global = true, default_value = "config.toml")]
  config: PathBuf,

  #[command(subcommand)]
  command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
  /// Serve the HTTP API (the default).
  Serve,
  /// Print the argon2 hash for a password entered on stdin.
  HashPassword,
  /// Print a fresh random signing secret.
  GenerateSecret,
  /// Manage accounts.
  Account {
    #[command(subcommand)]
    action: AccountCommand,
  },
  /// Manage custom tiers.
  Tier {
    #[command(subcommand)]
    action: TierCommand,
  },
}

#[derive(Subcommand)]
enum AccountCommand {
  /// Create an account; the password is read from stdin.
  Add {
    #[arg(long)]
    username: String,
    /// Built-in or custom tier name. Omit for `Basic`.
    #[arg(long)]
    tier:     Option<String>,
  },
  /// Change an account's tier. Omit `--tier` to clear it.
  SetTier {
    #[arg(long)]
    username: String,
    #[arg(long)]
    tier:     Option<String>,
  },
  /// Layer a custom tier on top of the account's tier. Omit `--name` to
  /// clear it.
  SetCustomTier {
    #[arg(long)]
    username: String,
    #[arg(long)]
    name:     Option<String>,
  },
  /// Delete an account and its image records.
  Delete {
    #[arg(long)]
    username: String,
  },
}

#[derive(Subcommand)]
enum TierCommand {
  /// Create a custom tier.
  Add {
    #[arg(long)]
    name:     String,
    /// Comma-separated thumbnail edge lengths, e.g. `100,500`.
    #[arg(long)]
    sizes:    String,
    /// Grant access to the original file.
    #[arg(long)]
    original: bool,
    /// Grant expiring links.
    #[arg(long)]
    expiring: bool,
  },
  /// Replace a custom tier's settings, optionally renaming it.
  Update {
    #[arg(long)]
    name:     String,
    #[arg(long)]
    rename:   Option<String>,
    #[arg(long)]
    sizes:    String,
    #[arg(long)]
    original: bool,
    #[arg(long)]
    expiring: bool,
  },
  /// List custom tiers.
  List,
  /// Delete a custom tier that no account names.
  Delete {
    #[arg(long)]
    name: String,
  },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  // Initialise tracing.
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();

  match cli.command.unwrap_or(Command::Serve) {
    Command::HashPassword => {
      let password = read_password()?;
      println!("{}", hash_password(&password)?);
      Ok(())
    }
    Command::GenerateSecret => {
      let mut secret = [0u8; 32];
      OsRng.fill_bytes(&mut secret);
      println!("{}", URL_SAFE_NO_PAD.encode(secret));
      Ok(())
    }
    Command::Serve => serve(load_config(&cli.config)?).await,
    Command::Account { action } => {
      let store = open_store(&load_config(&cli.config)?).await?;
      account(&store, action).await
    }
    Command::Tier { action } => {
      let store = open_store(&load_config(&cli.config)?).await?;
      tier(&store, action).await
    }
  }
}

// ─── Serve ───────────────────────────────────────────────────────────────────

async fn serve(mut cfg: ServerConfig) -> anyhow::Result<()> {
  cfg.media_root = expand_tilde(&cfg.media_root);
  std::fs::create_dir_all(&cfg.media_root)
    .with_context(|| format!("failed to create media root {:?}", cfg.media_root))?;

  let store = open_store(&cfg).await?;
  let address = format!("{}:{}", cfg.host, cfg.port);

  let state = AppState::new(Arc::new(store), cfg)
    .context("invalid signing_secret (generate one with `pictier generate-secret`)")?;
  let app = pictier_server::router(state);

  tracing::info!("Listening on http://{address}");
  let listener = TcpListener::bind(&address)
    .await
    .with_context(|| format!("failed to bind {address}"))?;

  axum::serve(listener, app).await.context("server error")?;

  Ok(())
}

// ─── Accounts ────────────────────────────────────────────────────────────────

async fn account(store: &SqliteStore, action: AccountCommand) -> anyhow::Result<()> {
  match action {
    AccountCommand::Add { username, tier } => {
      let password = read_password()?;
      let account = store
        .create_account(NewAccount {
          username,
          password_hash: hash_password(&password)?,
          account_tier: tier,
        })
        .await
        .context("failed to create account")?;
      println!("created account {} ({})", account.username, account.account_id);
    }
    AccountCommand::SetTier { username, tier } => {
      let account = find_account(store, &username).await?;
      let account = store
        .set_account_tier(account.account_id, tier)
        .await
        .context("failed to set tier")?;
      println!(
        "{} is now on tier {}",
        account.username,
        account.account_tier.as_deref().unwrap_or("Basic")
      );
    }
    AccountCommand::SetCustomTier { username, name } => {
      let account = find_account(store, &username).await?;
      let tier_id = match name {
        Some(name) => Some(
          store
            .find_custom_tier(&name)
            .await?
            .with_context(|| format!("no custom tier named {name:?}"))?
            .tier_id,
        ),
        None => None,
      };
      store
        .set_custom_tier(account.account_id, tier_id)
        .await
        .context("failed to set custom tier")?;
      println!("updated {username}");
    }
    AccountCommand::Delete { username } => {
      let account = find_account(store, &username).await?;
      store
        .delete_account(account.account_id)
        .await
        .context("failed to delete account")?;
      println!("deleted {username}");
    }
  }
  Ok(())
}

async fn find_account(
  store:    &SqliteStore,
  username: &str,
) -> anyhow::Result<pictier_core::account::Account> {
  store
    .find_account_by_username(username)
    .await?
    .with_context(|| format!("no account named {username:?}"))
}

// ─── Tiers ───────────────────────────────────────────────────────────────────

async fn tier(store: &SqliteStore, action: TierCommand) -> anyhow::Result<()> {
  match action {
    TierCommand::Add { name, sizes, original, expiring } => {
      check_sizes(&sizes)?;
      let record = store
        .create_custom_tier(NewCustomTier {
          name,
          thumbnail_sizes: sizes,
          original_file_link: original,
          expiring_links_enabled: expiring,
        })
        .await
        .context("failed to create tier")?;
      println!("created tier {} ({})", record.name, record.tier_id);
    }
    TierCommand::Update { name, rename, sizes, original, expiring } => {
      check_sizes(&sizes)?;
      let existing = store
        .find_custom_tier(&name)
        .await?
        .with_context(|| format!("no custom tier named {name:?}"))?;
      let record = store
        .update_custom_tier(existing.tier_id, NewCustomTier {
          name: rename.unwrap_or(name),
          thumbnail_sizes: sizes,
          original_file_link: original,
          expiring_links_enabled: expiring,
        })
        .await
        .context("failed to update tier")?;
      println!("updated tier {}", record.name);
    }
    TierCommand::List => {
      for t in store.list_custom_tiers().await? {
        println!(
          "{:<20} sizes={:<16} original={:<5} expiring={}",
          t.name, t.thumbnail_sizes, t.original_file_link, t.expiring_links_enabled
        );
      }
    }
    TierCommand::Delete { name } => {
      let existing = store
        .find_custom_tier(&name)
        .await?
        .with_context(|| format!("no custom tier named {name:?}"))?;
      store
        .delete_custom_tier(existing.tier_id)
        .await
        .context("failed to delete tier")?;
      println!("deleted tier {name}");
    }
  }
  Ok(())
}

/// Refuse size lists that would resolve to no thumbnails at all.
fn check_sizes(sizes: &str) -> anyhow::Result<()> {
  if parse_sizes(sizes).is_empty() {
    anyhow::bail!("--sizes must list at least one size between 1 and 4096, e.g. 100,500");
  }
  Ok(())
}

// ─── Helpers ─────────────────────────────────────────────────────────────────

fn load_config(path: &Path) -> anyhow::Result<ServerConfig> {
  let settings = config::Config::builder()
    .add_source(config::File::from(path.to_path_buf()).required(false))
    .add_source(config::Environment::with_prefix("PICTIER"))
    .build()
    .context("failed to read config file")?;

  settings
    .try_deserialize()
    .context("failed to deserialise ServerConfig")
}

async fn open_store(cfg: &ServerConfig) -> anyhow::Result<SqliteStore> {
  let store_path = expand_tilde(&cfg.store_path);
  SqliteStore::open(&store_path)
    .await
    .with_context(|| format!("failed to open store at {store_path:?}"))
}

fn hash_password(password: &str) -> anyhow::Result<String> {
  let salt = SaltString::generate(&mut OsRng);
  Ok(
    Argon2::default()
      .hash_password(password.as_bytes(), &salt)
      .map_err(|e| anyhow::anyhow!("argon2 error: {e}"))?
      .to_string(),
  )
}

/// Read one password line from stdin.
fn read_password() -> anyhow::Result<String> {
  use std::io::{self, BufRead, Write};
  let stdin = io::stdin();
  eprint!("Password: ");
  io::stderr().flush().ok();
  let mut line = String::new();
  stdin.lock().read_line(&mut line)?;
  let password = line
    .trim_end_matches('\n')
    .trim_end_matches('\r')
    .to_string();
  if password.is_empty() {
    anyhow::bail!("password must not be empty");
  }
  Ok(password)
}

/// Expand a leading `~` to the user's home directory.
fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}
