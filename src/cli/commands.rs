//! CLI commands for the treasury toolkit
//!
//! Implements all command handlers for the CLI interface. Every command
//! runs as the operator wallet created by `init`; disk loads and saves go
//! through the retry helper.

use crate::config::{AppConfig, CONFIG_FILE};
use crate::contract::ContractError;
use crate::core::{Address, ChainState};
use crate::retry::retry;
use crate::storage::{Storage, StorageConfig, UserStore};
use crate::treasury::{RecipientOutcome, ShortfallReport};
use crate::wallet::WalletManager;
use std::path::{Path, PathBuf};

/// Result type for CLI operations
pub type CliResult<T> = Result<T, Box<dyn std::error::Error>>;

/// Label of the wallet that acts as deployer and controller
pub const OPERATOR_LABEL: &str = "operator";

/// Demo funds seeded into the operator account by `init`
pub const DEFAULT_INIT_FUNDS: u128 = 1_000_000;

/// Application state
pub struct AppState {
    pub chain: ChainState,
    pub storage: Storage,
    pub wallet_manager: WalletManager,
    pub users: UserStore,
    pub config: AppConfig,
    pub data_dir: PathBuf,
}

impl AppState {
    /// Load configuration and state from `data_dir`
    pub fn new(data_dir: PathBuf, config_path: Option<&Path>) -> CliResult<Self> {
        let config = AppConfig::load(config_path, &data_dir)?;
        let data_dir = config.resolve_data_dir(&data_dir);

        let storage = Storage::new(StorageConfig {
            data_dir: data_dir.clone(),
            ..Default::default()
        })?;
        let wallet_manager = WalletManager::new(&data_dir.join("wallets"))?;

        let chain = retry(&config.retry, "load chain state", || storage.load_or_default())?;
        let users_path = data_dir.join("users.json");
        let users = retry(&config.retry, "open user store", || UserStore::open(&users_path))?;

        Ok(Self {
            chain,
            storage,
            wallet_manager,
            users,
            config,
            data_dir,
        })
    }

    /// Save the current state
    pub fn save(&self) -> CliResult<()> {
        retry(&self.config.retry, "save chain state", || {
            self.storage.save(&self.chain)
        })?;
        Ok(())
    }

    /// Address of the operator wallet
    pub fn operator(&self) -> CliResult<Address> {
        match self.wallet_manager.find_by_label(OPERATOR_LABEL)? {
            Some(wallet) => Ok(wallet.address()),
            None => Err("No operator wallet found. Run `treasury init` first".into()),
        }
    }
}

fn parse_address(value: &str) -> CliResult<Address> {
    Ok(value.trim().parse()?)
}

/// Parse a comma-separated recipient list; `null` or an empty slot is kept
/// as a missing recipient
pub fn parse_recipients(list: &str) -> CliResult<Vec<Option<Address>>> {
    list.split(',')
        .map(str::trim)
        .map(|item| match item {
            "" | "null" => Ok(None),
            address => parse_address(address).map(Some),
        })
        .collect()
}

/// Create the operator wallet and seed its balance
pub fn cmd_init(state: &mut AppState, funds: Option<u128>) -> CliResult<()> {
    if let Some(existing) = state.wallet_manager.find_by_label(OPERATOR_LABEL)? {
        println!("⚠️  Already initialized at {:?}", state.data_dir);
        println!("   Operator: {}", existing.address());
        return Ok(());
    }

    let funds = funds.unwrap_or(DEFAULT_INIT_FUNDS);
    let operator = state.wallet_manager.create_wallet(Some(OPERATOR_LABEL))?;
    state.chain.allocate(&operator.address(), funds)?;
    state.save()?;

    let config_path = state.data_dir.join(CONFIG_FILE);
    if !config_path.exists() {
        state.config.save(&config_path)?;
        println!("   ⚙️  Config written to {:?}", config_path);
    }

    println!("✅ Treasury toolkit initialized!");
    println!("   📁 Data directory: {:?}", state.data_dir);
    println!("   👤 Operator: {}", operator.address());
    println!("   💰 Seeded balance: {}", funds);

    Ok(())
}

/// Deploy a treasury contract owned by the operator
pub fn cmd_deploy(state: &mut AppState, name: &str, symbol: &str) -> CliResult<()> {
    let operator = state.operator()?;
    let address = state.chain.deploy(&operator, name, symbol)?;
    state.save()?;

    println!("📜 Contract deployed!");
    println!("   ├─ Address: {}", address);
    println!("   ├─ Collection: {} ({})", name, symbol);
    println!("   └─ Controller: {}", operator);

    Ok(())
}

/// Deposit into the treasury
pub fn cmd_fund(state: &mut AppState, amount: u128, from: Option<&str>) -> CliResult<()> {
    let from = match from {
        Some(address) => parse_address(address)?,
        None => state.operator()?,
    };

    let event = state.chain.deposit(None, &from, amount)?;
    state.save()?;

    println!("🏦 Treasury funded");
    println!("   ├─ From: {}", from);
    println!("   ├─ Amount: {}", event.amount);
    println!("   └─ Treasury balance: {}", event.balance_after);

    Ok(())
}

/// Create child wallets of the operator
pub fn cmd_children(state: &mut AppState, count: usize, prefix: &str) -> CliResult<()> {
    let operator = state.operator()?;
    let children = state
        .wallet_manager
        .create_children(&operator, count, prefix)?;

    println!("👶 Created {} child wallet(s):", children.len());
    for child in &children {
        println!(
            "   └─ {} ({})",
            child.address(),
            child.label.as_deref().unwrap_or("-")
        );
    }

    Ok(())
}

/// Snapshot balances and run one disbursement batch
pub fn cmd_topup(
    state: &mut AppState,
    amount: Option<u128>,
    threshold: Option<u128>,
    recipients: Option<&str>,
) -> CliResult<()> {
    let operator = state.operator()?;
    let recipients = match recipients {
        Some(list) => parse_recipients(list)?,
        None => state
            .wallet_manager
            .children_of(&operator)?
            .iter()
            .map(|w| Some(w.address()))
            .collect(),
    };

    if recipients.is_empty() {
        println!("📭 No recipients. Create some with: treasury children --count 3");
        return Ok(());
    }

    let settings = state.config.topup.settings(amount, threshold);

    println!(
        "⛽ Topping up {} recipient(s): amount {}, threshold {}",
        recipients.len(),
        settings.amount,
        settings.threshold
    );

    let outcome = match state.chain.top_up(None, &operator, &recipients, settings) {
        Ok(outcome) => outcome,
        Err(err) => {
            if let ContractError::Treasury(inner) = &err {
                if let Some(report) = ShortfallReport::from_error(inner) {
                    println!("❌ Treasury cannot cover this batch; nothing was sent");
                    println!("   ├─ Required: {}", report.required);
                    println!("   ├─ Available: {}", report.available);
                    println!("   └─ Missing: {}", report.missing);
                    for line in report.lines() {
                        println!("      • {}", line);
                    }
                }
            }
            return Err(err.into());
        }
    };
    state.save()?;

    for entry in &outcome.outcomes {
        match entry {
            RecipientOutcome::Sent { recipient, amount } => {
                println!("   ✅ {} +{}", recipient, amount);
            }
            RecipientOutcome::Skipped { recipient, reason } => {
                let who = recipient
                    .map(|r| r.to_string())
                    .unwrap_or_else(|| "(none)".to_string());
                println!("   ⏭️  {} skipped: {:?}", who, reason);
            }
        }
    }
    println!(
        "\n💸 Sent {} in {} transfer(s); treasury {} → {}",
        outcome.total_sent,
        outcome.sent_count(),
        outcome.treasury_before,
        outcome.treasury_after
    );

    Ok(())
}

/// Sweep value out of the treasury
pub fn cmd_sweep(state: &mut AppState, to: &str, amount: u128) -> CliResult<()> {
    let operator = state.operator()?;
    let to = parse_address(to)?;

    let event = state.chain.sweep(None, &operator, &to, amount)?;
    state.save()?;

    println!("🧹 Swept {} to {}", event.amount, event.to);
    println!("   └─ Treasury balance: {}", event.balance_after);

    Ok(())
}

/// Grant the minter role
pub fn cmd_minter_add(state: &mut AppState, address: &str) -> CliResult<()> {
    let operator = state.operator()?;
    let minter = parse_address(address)?;

    if state.chain.add_minter(None, &operator, &minter)? {
        state.save()?;
        println!("🔑 {} is now a minter", minter);
    } else {
        println!("ℹ️  {} is already a minter", minter);
    }

    Ok(())
}

/// Revoke the minter role
pub fn cmd_minter_remove(state: &mut AppState, address: &str) -> CliResult<()> {
    let operator = state.operator()?;
    let minter = parse_address(address)?;

    state.chain.remove_minter(None, &operator, &minter)?;
    state.save()?;
    println!("🔒 {} is no longer a minter", minter);

    Ok(())
}

/// Mint a collection token as the operator
pub fn cmd_mint(state: &mut AppState, to: &str, uri: &str) -> CliResult<()> {
    let operator = state.operator()?;
    let to = parse_address(to)?;

    let event = state.chain.mint(None, &operator, &to, uri)?;
    state.save()?;

    println!("🎨 Minted token #{} to {}", event.token_id, event.to);
    println!("   └─ URI: {}", event.token_uri);

    Ok(())
}

/// Record a check-in for an address
pub fn cmd_check_in(state: &mut AppState, address: &str) -> CliResult<()> {
    let address = parse_address(address)?;

    let event = state.chain.check_in(None, &address)?;
    state.save()?;

    println!("📍 Check-in #{} recorded for {}", event.count, address);

    Ok(())
}

/// Ledger balance of an address
pub fn cmd_balance(state: &AppState, address: &str) -> CliResult<()> {
    let address = parse_address(address)?;
    println!("💰 Balance for {}", address);

    let roles = state
        .chain
        .contracts
        .latest()
        .and_then(|latest| state.chain.contracts.get(&latest))
        .map(|contract| contract.treasury.roles().roles_of(&address).names())
        .unwrap_or_default();
    if roles.is_empty() {
        println!("   └─ {}", state.chain.balance_of(&address));
    } else {
        println!("   ├─ {}", state.chain.balance_of(&address));
        println!("   └─ Roles: {}", roles.join(", "));
    }
    Ok(())
}

/// Treasury info for the latest deployment
pub fn cmd_treasury(state: &AppState) -> CliResult<()> {
    let address = state.chain.contracts.latest()?;
    let contract = state.chain.contracts.get(&address)?;
    let treasury = &contract.treasury;
    let stats = treasury.stats();

    println!("🏦 Treasury {}", address);
    println!("   ├─ Balance: {}", treasury.balance());
    println!("   ├─ Controller: {}", treasury.controller());
    println!("   ├─ Minters: {}", treasury.roles().minter_count());
    for minter in treasury.roles().minters() {
        println!("   │  └─ {}", minter);
    }
    println!(
        "   ├─ Collection: {} ({}), {} minted",
        contract.collection.name(),
        contract.collection.symbol(),
        contract.collection.total_supply()
    );
    println!("   ├─ Deposited: {}", stats.total_deposited);
    println!("   ├─ Disbursed: {} in {} batch(es)", stats.total_disbursed, stats.batches);
    println!("   └─ Swept: {}", stats.total_swept);

    Ok(())
}

/// List local wallets with their balances
pub fn cmd_wallets(state: &AppState) -> CliResult<()> {
    let wallets = state.wallet_manager.list()?;

    if wallets.is_empty() {
        println!("📭 No wallets found. Create some with: treasury init");
        return Ok(());
    }

    println!("📋 Wallets:");
    for wallet in &wallets {
        let address = wallet.address();
        let label = wallet.label.as_deref().unwrap_or("-");
        println!(
            "   {} ({}) - {}",
            address,
            label,
            state.chain.balance_of(&address)
        );
    }

    Ok(())
}

/// Export chain state to file
pub fn cmd_export(state: &AppState, path: &Path) -> CliResult<()> {
    crate::storage::save_to_file(&state.chain, path)?;
    println!("📦 Chain state exported to {:?}", path);
    Ok(())
}

/// List saved chain state backups, newest first
pub fn cmd_backups(state: &AppState) -> CliResult<()> {
    let backups = state.storage.list_backups();

    if backups.is_empty() {
        println!("📭 No backups yet. One is kept each time the chain state is saved");
        return Ok(());
    }

    println!("🗂️  Backups:");
    for index in backups {
        let stats = state.storage.restore_backup(index)?.stats();
        println!(
            "   #{} - {} account(s), {} contract(s)",
            index, stats.funded_accounts, stats.contracts
        );
    }

    Ok(())
}

/// Replace the chain state with a backup
pub fn cmd_restore(state: &mut AppState, index: usize) -> CliResult<()> {
    let restored = retry(&state.config.retry, "restore backup", || {
        state.storage.restore_backup(index)
    })?;
    state.chain = restored;
    state.save()?;

    let stats = state.chain.stats();
    println!("♻️  Restored backup #{}", index);
    println!("   ├─ Accounts: {}", stats.funded_accounts);
    println!("   └─ Contracts: {}", stats.contracts);

    Ok(())
}

/// Import chain state from file
pub fn cmd_import(state: &mut AppState, path: &Path) -> CliResult<()> {
    state.chain = crate::storage::load_from_file(path)?;
    state.save()?;

    let stats = state.chain.stats();
    println!("📥 Chain state imported from {:?}", path);
    println!("   ├─ Accounts: {}", stats.funded_accounts);
    println!("   └─ Contracts: {}", stats.contracts);

    Ok(())
}
