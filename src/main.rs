//! stzeta-mint - sign and submit one mint transaction, then wait for it to be mined

use clap::Parser;
use std::process::ExitCode;
use tokio::signal;
use tokio::time::Instant;
use tracing::{error, info, warn};

use stzeta_mint::cli::Args;
use stzeta_mint::{ChainProvider, MintError, MintRequest, MintResult, MintSubmitter, Settings, TxSigner};

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let args = Args::parse();

    // Initialize logging
    init_logging(args.log_json);

    info!("Starting stzeta-mint v{}", env!("CARGO_PKG_VERSION"));

    let result = match args.resolve_settings() {
        Ok(settings) => run(&settings).await,
        Err(e) => Err(MintError::Config(format!("{:#}", e))),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            if let Some(tx_hash) = e.tx_hash() {
                warn!("Transaction {:?} was submitted; check it before retrying", tx_hash);
            }
            error!("{}", e);
            ExitCode::from(e.exit_code())
        }
    }
}

async fn run(settings: &Settings) -> MintResult<()> {
    let provider = ChainProvider::connect(&settings.rpc).await?;
    let signer = TxSigner::from_env(&settings.wallet.private_key_env)?;
    let request = MintRequest::from_settings(settings)?;

    let submitter = MintSubmitter::new(provider, signer, request, settings)?;
    let pending = submitter.submit().await?;

    println!("Mint transaction sent: {:?}", pending.tx_hash());

    let deadline = Instant::now() + settings.rpc.confirmation_timeout();
    let outcome = pending.wait(deadline, shutdown_signal()).await?;

    println!("Mint transaction mined in block {}", outcome.block_number);
    if let Some(gas_used) = outcome.gas_used {
        info!("Gas used: {}", gas_used);
    }

    Ok(())
}

fn init_logging(json: bool) {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,stzeta_mint=debug,hyper=warn,reqwest=warn"));

    // stdout carries the results; logs go to stderr
    let layer = fmt::layer().with_target(true).with_writer(std::io::stderr);

    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(layer.json())
            .init();
    } else {
        tracing_subscriber::registry().with(filter).with(layer).init();
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received, abandoning wait");
}
