//! Ledger CLI
//!
//! Command-line interface for the Ledger API.

use anyhow::Result;
use clap::{Parser, Subcommand};

use ledger_client::LedgerClient;
use ledger_types::{AccountId, TransactionId};

#[derive(Parser)]
#[command(name = "ledger")]
#[command(author, version, about = "Ledger API CLI client", long_about = None)]
struct Cli {
    /// Base URL of the Ledger API
    #[arg(long, env = "LEDGER_API_URL", default_value = "http://localhost:8080")]
    api_url: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Account operations
    Account {
        #[command(subcommand)]
        action: AccountCommands,
    },
    /// Move money between two accounts
    Transfer {
        #[arg(long)]
        from: AccountId,
        #[arg(long)]
        to: AccountId,
        /// Decimal amount, e.g. 100.25
        #[arg(long)]
        amount: String,
    },
    /// Recorded transfer lookup
    Transaction {
        #[command(subcommand)]
        action: TransactionCommands,
    },
    /// Check API health
    Health,
}

#[derive(Subcommand)]
enum AccountCommands {
    /// Open a new account
    Create {
        /// Account ID (positive integer, chosen by the caller)
        id: AccountId,
        /// Opening balance
        #[arg(long, default_value = "0")]
        balance: String,
    },
    /// Get account details
    Get { id: AccountId },
    /// List transfers touching the account, newest first
    History {
        id: AccountId,
        #[arg(long)]
        limit: Option<i64>,
        #[arg(long)]
        offset: Option<i64>,
    },
}

#[derive(Subcommand)]
enum TransactionCommands {
    /// Get transfer details
    Get { id: TransactionId },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let client = LedgerClient::new(&cli.api_url);

    match cli.command {
        Commands::Health => match client.health().await {
            Ok(health) => println!("✓ {} {} is {}", health.service, health.version, health.status),
            Err(e) => {
                println!("✗ API is not healthy: {e}");
                std::process::exit(1);
            }
        },

        Commands::Account { action } => match action {
            AccountCommands::Create { id, balance } => {
                let account = client.create_account(id, &balance).await?;
                println!("{}", serde_json::to_string_pretty(&account)?);
            }
            AccountCommands::Get { id } => {
                let account = client.get_account(id).await?;
                println!("{}", serde_json::to_string_pretty(&account)?);
            }
            AccountCommands::History { id, limit, offset } => {
                let transactions = client.list_transactions(id, limit, offset).await?;
                println!("{}", serde_json::to_string_pretty(&transactions)?);
            }
        },

        Commands::Transfer { from, to, amount } => {
            let tx = client.transfer(from, to, &amount).await?;
            println!("{}", serde_json::to_string_pretty(&tx)?);
        }

        Commands::Transaction { action } => match action {
            TransactionCommands::Get { id } => {
                let tx = client.get_transaction(id).await?;
                println!("{}", serde_json::to_string_pretty(&tx)?);
            }
        },
    }

    Ok(())
}
