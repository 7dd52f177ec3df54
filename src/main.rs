//! Gas Treasury CLI Application
//!
//! Script-style commands for funding a treasury, topping up wallets and
//! serving the REST API.

use clap::{Parser, Subcommand};
use gas_treasury::api::{create_router, ApiState};
use gas_treasury::cli::{self, AppState};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "treasury")]
#[command(author = "Darshan")]
#[command(version = "0.1.0")]
#[command(about = "Gas treasury and wallet top-up toolkit", long_about = None)]
struct Cli {
    /// Data directory for chain state, wallets and users
    #[arg(short, long, default_value = ".treasury_data")]
    data_dir: PathBuf,

    /// Config file (defaults to <data-dir>/config.json)
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the operator wallet and seed its balance
    Init {
        /// Initial operator balance
        #[arg(short, long)]
        funds: Option<u128>,
    },

    /// Deploy a treasury contract with an NFT collection
    Deploy {
        #[arg(short, long)]
        name: String,

        #[arg(short, long)]
        symbol: String,
    },

    /// Deposit into the treasury
    Fund {
        #[arg(short, long)]
        amount: u128,

        /// Depositor address (defaults to the operator)
        #[arg(short, long)]
        from: Option<String>,
    },

    /// Create child wallets of the operator
    Children {
        #[arg(short, long)]
        count: usize,

        #[arg(short, long, default_value = "child")]
        prefix: String,
    },

    /// Top up every recipient below the threshold
    Topup {
        /// Amount sent to each eligible recipient
        #[arg(short, long)]
        amount: Option<u128>,

        /// Balance below which a recipient is topped up
        #[arg(short, long)]
        threshold: Option<u128>,

        /// Comma-separated recipients (defaults to all child wallets)
        #[arg(short, long)]
        recipients: Option<String>,
    },

    /// Send value out of the treasury regardless of thresholds
    Sweep {
        #[arg(short, long)]
        to: String,

        #[arg(short, long)]
        amount: u128,
    },

    /// Minter role management
    Minter {
        #[command(subcommand)]
        action: MinterCommands,
    },

    /// Mint a collection token
    Mint {
        #[arg(short, long)]
        to: String,

        #[arg(short, long)]
        uri: String,
    },

    /// Record a check-in
    CheckIn {
        #[arg(short, long)]
        address: String,
    },

    /// Show an address's ledger balance
    Balance {
        #[arg(short, long)]
        address: String,
    },

    /// Show treasury info
    Treasury,

    /// List local wallets
    Wallets,

    /// Export chain state to file
    Export {
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Import chain state from file
    Import {
        #[arg(short, long)]
        input: PathBuf,
    },

    /// List chain state backups
    Backups,

    /// Restore chain state from a backup
    Restore {
        /// Backup index (0 is the most recent)
        #[arg(short, long, default_value_t = 0)]
        backup: usize,
    },

    /// REST API server
    Api {
        #[command(subcommand)]
        action: ApiCommands,
    },
}

#[derive(Subcommand)]
enum MinterCommands {
    /// Grant the minter role
    Add {
        #[arg(short, long)]
        address: String,
    },

    /// Revoke the minter role
    Remove {
        #[arg(short, long)]
        address: String,
    },
}

#[derive(Subcommand)]
enum ApiCommands {
    /// Start the REST API server
    Start {
        /// Port to listen on (overrides config)
        #[arg(short, long)]
        port: Option<u16>,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logger
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let mut state = AppState::new(cli.data_dir.clone(), cli.config.as_deref())?;

    match cli.command {
        Commands::Init { funds } => cli::cmd_init(&mut state, funds)?,
        Commands::Deploy { name, symbol } => cli::cmd_deploy(&mut state, &name, &symbol)?,
        Commands::Fund { amount, from } => cli::cmd_fund(&mut state, amount, from.as_deref())?,
        Commands::Children { count, prefix } => cli::cmd_children(&mut state, count, &prefix)?,
        Commands::Topup {
            amount,
            threshold,
            recipients,
        } => cli::cmd_topup(&mut state, amount, threshold, recipients.as_deref())?,
        Commands::Sweep { to, amount } => cli::cmd_sweep(&mut state, &to, amount)?,
        Commands::Minter { action } => match action {
            MinterCommands::Add { address } => cli::cmd_minter_add(&mut state, &address)?,
            MinterCommands::Remove { address } => cli::cmd_minter_remove(&mut state, &address)?,
        },
        Commands::Mint { to, uri } => cli::cmd_mint(&mut state, &to, &uri)?,
        Commands::CheckIn { address } => cli::cmd_check_in(&mut state, &address)?,
        Commands::Balance { address } => cli::cmd_balance(&state, &address)?,
        Commands::Treasury => cli::cmd_treasury(&state)?,
        Commands::Wallets => cli::cmd_wallets(&state)?,
        Commands::Export { output } => cli::cmd_export(&state, &output)?,
        Commands::Import { input } => cli::cmd_import(&mut state, &input)?,
        Commands::Backups => cli::cmd_backups(&state)?,
        Commands::Restore { backup } => cli::cmd_restore(&mut state, backup)?,
        Commands::Api { action } => match action {
            ApiCommands::Start { port } => run_api_server(state, port)?,
        },
    }

    Ok(())
}

fn run_api_server(state: AppState, port: Option<u16>) -> Result<(), Box<dyn std::error::Error>> {
    let operator = state.operator()?;
    let mut config = state.config;
    if let Some(port) = port {
        config.api.port = port;
    }
    let addr = config.api.bind_addr();
    let port = config.api.port;

    let api_state = ApiState::new(
        state.chain,
        state.storage,
        state.users,
        state.wallet_manager,
        operator,
        config,
    );
    let shutdown_state = api_state.clone();
    let app = create_router(api_state);

    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(async {
        println!("🚀 REST API server starting on http://localhost:{}", port);
        println!("   👤 Operating as {}", operator);
        println!();
        println!("📖 Available endpoints:");
        println!("   GET    /health                         - Health check");
        println!("   GET    /ws                             - WebSocket updates");
        println!("   GET    /api/treasury                   - Treasury info");
        println!("   POST   /api/treasury/deposit           - Fund treasury");
        println!("   POST   /api/treasury/topup             - Top up wallets");
        println!("   POST   /api/treasury/sweep             - Sweep treasury");
        println!("   POST   /api/minters                    - Add minter");
        println!("   DELETE /api/minters/{{address}}          - Remove minter");
        println!("   GET    /api/users                      - List users");
        println!("   POST   /api/users                      - Register user");
        println!("   GET    /api/users/{{username}}           - User detail");
        println!("   POST   /api/users/{{username}}/mint      - Mint to user");
        println!("   POST   /api/users/{{username}}/checkin   - Check in");
        println!("   GET    /api/balances/{{address}}         - Balance");
        println!();

        // Handle Ctrl+C with graceful shutdown
        tokio::spawn(async move {
            tokio::signal::ctrl_c().await.ok();
            println!("\n📴 Shutting down API server...");

            let chain = shutdown_state.chain.read().await;
            match shutdown_state.storage.save(&chain) {
                Ok(()) => println!("✅ Chain state saved"),
                Err(e) => eprintln!("❌ Failed to save chain state: {}", e),
            }
            std::process::exit(0);
        });

        let listener = tokio::net::TcpListener::bind(&addr).await?;
        axum::serve(listener, app).await?;

        Ok::<(), Box<dyn std::error::Error>>(())
    })?;

    Ok(())
}
