//! Command-line front end for a backend-managed data store.
//!
//! Talks to the data store backend over HTTP and, for commands that need an
//! account or a signature, to a local wallet bridge. The last known store
//! descriptor is kept in the state directory between invocations.

mod wallet_bridge;

use std::future::Future;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Context};
use clap::{Args, Parser, Subcommand};
use datalayer_client::backend::{DataLayerApi, HttpBackend};
use datalayer_client::config::ClientConfig;
use datalayer_client::connector::ConnectionState;
use datalayer_client::lifecycle::OperationOutcome;
use datalayer_client::persistence::{DescriptorStore, FileStore};
use datalayer_client::session::Session;
use datalayer_common::address::encode_address;
use datalayer_common::datastore::LayerKind;
use datalayer_common::role::{SpendAction, SpendRole};
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::wallet_bridge::BridgeWallet;

type CliSession = Session<HttpBackend, BridgeWallet, FileStore>;

#[derive(Parser)]
#[command(name = "datalayer-cli", about = "Mint, update and melt a delegated data store")]
struct Cli {
    /// Backend base URL.
    #[arg(long, env = "DATALAYER_API_BASE", default_value = "http://localhost:3030")]
    api_base: String,

    /// Shared secret sent as X-Secret.
    #[arg(long, env = "DATALAYER_SECRET", hide_env_values = true)]
    secret: Option<String>,

    /// Address prefix (e.g. "txch" for testnet, "xch" for mainnet).
    #[arg(long, env = "DATALAYER_NETWORK", default_value = "txch")]
    network: String,

    /// Wallet bridge URL.
    #[arg(long, env = "DATALAYER_WALLET_URL", default_value = "http://localhost:3040")]
    wallet_url: String,

    /// Directory holding the persisted store descriptor.
    #[arg(long, env = "DATALAYER_STATE_DIR")]
    state_dir: Option<PathBuf>,

    /// Seconds between confirmation polls.
    #[arg(long, default_value_t = 3)]
    poll_interval: u64,

    /// Give up waiting for confirmation after this many polls.
    #[arg(long, default_value_t = 400)]
    max_polls: u32,

    /// Fee in mojos.
    #[arg(long)]
    fee: Option<u64>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print the backend's info.
    Info,
    /// Encode a puzzle hash as an address.
    Address { puzzle_hash: String },
    /// Connect the wallet and print the account.
    Connect,
    /// Print the tracked store.
    Show,
    /// Mint a new store owned by the wallet account.
    Mint,
    /// Refresh the tracked store from chain.
    Sync,
    /// Spend the tracked store.
    Spend(SpendArgs),
}

#[derive(Args)]
struct SpendArgs {
    /// Role to spend as: admin, writer, oracle or owner.
    #[arg(long = "as", default_value = "admin")]
    role: SpendRole,

    /// update-metadata, update-ownership, oracle or burn. Defaults to the role's first action.
    #[arg(long)]
    action: Option<SpendAction>,

    #[arg(long)]
    root_hash: Option<String>,

    #[arg(long)]
    label: Option<String>,

    #[arg(long)]
    description: Option<String>,

    /// New owner for update-ownership. Defaults to the current owner.
    #[arg(long)]
    owner_puzzle_hash: Option<String>,

    /// Remove a default delegated layer (admin, writer, oracle). Repeatable.
    #[arg(long = "drop-layer")]
    drop_layers: Vec<LayerKind>,
}

impl Cli {
    fn config(&self) -> ClientConfig {
        let mut config = ClientConfig::new(&self.api_base);
        config.secret = self.secret.clone();
        config.network_prefix = self.network.clone();
        config.state_dir = self.state_dir.clone();
        config.poll.interval = Duration::from_secs(self.poll_interval);
        config.poll.max_attempts = Some(self.max_polls);
        if let Some(fee) = self.fee {
            config.fee = fee;
        }
        config
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let cli = Cli::parse();
    let config = cli.config();

    match &cli.command {
        Command::Info => {
            let info = HttpBackend::from_config(&config)
                .info()
                .await
                .context("fetching server info")?;
            print_json(&info)?;
        }
        Command::Address { puzzle_hash } => {
            println!("{}", encode_address(puzzle_hash, &config.network_prefix)?);
        }
        Command::Connect => {
            let mut session = start_session(&cli, config).await;
            let account = match session.account() {
                Some(account) => account.clone(),
                None => session.connect().await.context("connecting wallet")?,
            };
            println!("address:     {}", account.address);
            println!("puzzle hash: {}", account.puzzle_hash);
            println!(
                "public key:  {}",
                account.public_key.as_deref().unwrap_or("(none)")
            );
        }
        Command::Show => {
            let store = FileStore::new(config.state_dir());
            match store.get() {
                Some(descriptor) => print_json(descriptor.as_value())?,
                None => println!("no data store tracked ({})", store.path().display()),
            }
        }
        Command::Mint => {
            let mut session = start_session(&cli, config).await;
            ensure_connected(&mut session).await?;
            let outcome = until_interrupted(session.mint(), tokio::signal::ctrl_c()).await;
            hint_unconfirmed(&session);
            report(&outcome.context("minting data store")?)?;
        }
        Command::Sync => {
            let mut session = start_session(&cli, config).await;
            let descriptor = until_interrupted(session.sync(), tokio::signal::ctrl_c())
                .await
                .context("syncing data store")?;
            print_json(descriptor.as_value())?;
        }
        Command::Spend(args) => {
            let mut session = start_session(&cli, config).await;
            if session.descriptor().is_none() {
                bail!("no data store tracked; run `mint` first");
            }
            apply_spend_args(&mut session, args)?;
            if args.role == SpendRole::Owner {
                ensure_connected(&mut session).await?;
            }
            let outcome = until_interrupted(session.spend(), tokio::signal::ctrl_c()).await;
            hint_unconfirmed(&session);
            report(&outcome.context("spending data store")?)?;
        }
    }
    Ok(())
}

async fn start_session(cli: &Cli, config: ClientConfig) -> CliSession {
    let wallet = BridgeWallet::detect(&cli.wallet_url).await;
    let api = HttpBackend::from_config(&config);
    let store = FileStore::new(config.state_dir());
    Session::start(api, wallet, store, config).await
}

/// Fall back to an explicit connect when the eager one was not approved.
async fn ensure_connected(session: &mut CliSession) -> anyhow::Result<()> {
    match session.connector().state() {
        ConnectionState::Connected(_) => Ok(()),
        ConnectionState::NotInstalled => bail!("no wallet found; is the wallet bridge running?"),
        ConnectionState::Disconnected => {
            session.connect().await.context("connecting wallet")?;
            Ok(())
        }
    }
}

fn apply_spend_args(session: &mut CliSession, args: &SpendArgs) -> anyhow::Result<()> {
    let draft = session.draft_mut();
    draft.select_role(args.role);
    if let Some(action) = args.action {
        draft.select_action(action)?;
    }
    if let Some(root_hash) = &args.root_hash {
        draft.new_root_hash = root_hash.clone();
    }
    if let Some(label) = &args.label {
        draft.new_label = label.clone();
    }
    if let Some(description) = &args.description {
        draft.new_description = description.clone();
    }
    draft.new_owner_puzzle_hash = args.owner_puzzle_hash.clone();
    for kind in &args.drop_layers {
        draft.remove_layer(*kind);
    }
    Ok(())
}

/// Run `op` until it finishes or `signal` fires. An interrupted operation is
/// dropped at its current await point.
async fn until_interrupted<T, F, S>(op: F, signal: S) -> anyhow::Result<T>
where
    F: Future<Output = datalayer_client::Result<T>>,
    S: Future<Output = std::io::Result<()>>,
{
    tokio::select! {
        biased;
        result = op => Ok(result?),
        _ = signal => {
            info!("Interrupted");
            bail!("interrupted")
        }
    }
}

/// Print the descriptor of a transaction left unconfirmed, if any.
fn hint_unconfirmed(session: &CliSession) {
    if let Some(descriptor) = session.lifecycle().unconfirmed_descriptor() {
        eprintln!(
            "transaction broadcast but not confirmed; the store will be:\n{}",
            descriptor.as_value()
        );
    }
}

fn report(outcome: &OperationOutcome) -> anyhow::Result<()> {
    info!(
        polls = outcome.polls,
        signed = outcome.wallet_signed,
        coin = %outcome.confirmed_coin.parent_coin_info,
        "Confirmed"
    );
    match &outcome.descriptor {
        Some(descriptor) => print_json(descriptor.as_value()),
        None => {
            println!("data store melted");
            Ok(())
        }
    }
}

fn print_json<T: serde::Serialize + ?Sized>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
