//! Client example: runs the server on an in-memory store and drives it
//! through the SDK.
//!
//! Run with: cargo run -p ledger-app --example client_example --no-default-features

use std::sync::Arc;

use ledger_client::{ClientError, LedgerClient};
use ledger_hex::{
    TransferConfig,
    inbound::{AppState, HttpServer},
};
use ledger_repo::{StoreOptions, build_store};
use ledger_types::AccountId;
use tokio::net::TcpListener;
use tokio::sync::oneshot;

fn id(raw: i64) -> anyhow::Result<AccountId> {
    AccountId::new(raw).ok_or_else(|| anyhow::anyhow!("invalid account id {raw}"))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().with_env_filter("info").init();

    let store = build_store("memory://", &StoreOptions::default()).await?;
    let state = AppState::new(Arc::new(store), TransferConfig::default());

    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    let (stop_tx, stop_rx) = oneshot::channel::<()>();
    let server = tokio::spawn(HttpServer::new(state).serve(listener, async move {
        let _ = stop_rx.await;
    }));

    let client = LedgerClient::new(format!("http://{addr}"));
    println!("Server up at http://{addr}");
    let health = client.health().await?;
    println!("  health: {} ({})", health.status, health.version);

    // Two accounts, one transfer.
    let alice = client.create_account(id(1)?, "1000").await?;
    let bob = client.create_account(id(2)?, "500").await?;
    println!(
        "Opened accounts {} ({}) and {} ({})",
        alice.account_id, alice.balance, bob.account_id, bob.balance
    );

    let tx = client.transfer(id(1)?, id(2)?, "100.25").await?;
    println!(
        "Transfer #{} moved {} at {}",
        tx.transaction_id, tx.amount, tx.created_at
    );

    for raw in [1, 2] {
        let account = client.get_account(id(raw)?).await?;
        println!("  account {} balance {}", account.account_id, account.balance);
    }

    // Overdraw attempt fails without touching either balance.
    match client.transfer(id(2)?, id(1)?, "10000").await {
        Err(ClientError::Api {
            status,
            code,
            message,
        }) => {
            println!("Rejected as expected: {status} {code} ({message})")
        }
        other => anyhow::bail!("expected insufficient balance, got {other:?}"),
    }

    let history = client.list_transactions(id(1)?, Some(10), None).await?;
    println!("Account 1 history: {} transfer(s)", history.len());

    let _ = stop_tx.send(());
    server.await??;
    Ok(())
}
