// Sol TWAP CLI: wires configuration, logging, the vault and the HTTP
// collaborators to the library. No business logic lives here.

use clap::{CommandFactory, Parser, Subcommand};
use log::{debug, info};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use sol_twap::engine::swap::{
    base_units_to_amount, load_embedded_router, FetchEndpoints, QuoteFetcher, QuoteService, ReqwestBackend,
    RpcClient, SignerSelector, TwapScheduler,
};
use sol_twap::engine::vault::{FileVaultStore, KeyringVaultStore, VaultStore};
use sol_twap::{EngineError, EngineResult, KeyVault, SwapConfig, SwapIntent, SwapOrchestrator, TwapJob};

#[derive(Parser)]
#[command(name = "sol-twap")]
#[command(about = "Encrypted Solana wallet and swap executor", long_about = None)]
struct Cli {
    /// Config file (default: <config_dir>/sol-twap/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Vault passphrase; prompted without echo when absent
    #[arg(long, global = true, env = "SOL_TWAP_PASSPHRASE", hide_env_values = true)]
    passphrase: Option<String>,

    /// Store the encrypted wallet in the OS keychain instead of a file
    #[arg(long, global = true)]
    keychain: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show vault state
    Status,

    /// Create a new wallet (overwrites any stored wallet)
    Generate,

    /// Import a base58 secret key (overwrites any stored wallet)
    Import {
        /// Base58 secret: 64-byte keypair or 32-byte seed
        #[arg(long, env = "SOL_TWAP_SECRET", hide_env_values = true)]
        secret: String,
    },

    /// Check the passphrase and print the wallet address
    Unlock,

    /// Print the base58 secret key
    Export,

    /// Delete the stored wallet
    Wipe {
        /// Required; the wallet is unrecoverable afterwards
        #[arg(long)]
        yes: bool,
    },

    /// Fetch a raw quote from the REST quote service
    Quote(TradeArgs),

    /// Execute a swap
    Swap(TradeArgs),

    /// Register a TWAP job with the remote scheduler
    TwapRegister {
        input: String,
        output: String,
        /// Total amount to sell (UI units)
        #[arg(long)]
        total: f64,
        /// Amount per chunk (UI units)
        #[arg(long)]
        chunk: f64,
        /// Delay between chunks in milliseconds
        #[arg(long)]
        interval_ms: u64,
    },

    /// Print shell completions
    Completions {
        shell: clap_complete::Shell,
    },
}

#[derive(clap::Args)]
struct TradeArgs {
    /// Input token symbol or mint
    input: String,
    /// Output token symbol or mint
    output: String,
    /// Amount of the input token (UI units, e.g. 1.5)
    amount: String,
    /// Slippage as a fraction (0.03 = 3%); defaults to the configured value
    #[arg(long)]
    slippage: Option<f64>,
    /// Decimal exponent for the amount when the input mint is not a known token
    #[arg(long)]
    decimals: Option<u8>,
}

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {}", e);
            eprintln!("{}", e.user_message());
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> EngineResult<()> {
    if let Commands::Completions { shell } = &cli.command {
        clap_complete::generate(*shell, &mut Cli::command(), "sol-twap", &mut std::io::stdout());
        return Ok(());
    }

    let config = match &cli.config {
        Some(path) => SwapConfig::load(path)?,
        None => SwapConfig::load_default()?,
    };
    let vault = open_vault(&cli, &config)?;

    match &cli.command {
        Commands::Status => {
            println!("vault: {}", vault.state()?);
        }
        Commands::Generate => {
            let address = vault.generate(&new_passphrase(&cli)?)?;
            println!("{}", address);
        }
        Commands::Import { secret } => {
            let address = vault.import_base58(secret, &new_passphrase(&cli)?)?;
            println!("{}", address);
        }
        Commands::Unlock => {
            let address = vault.unlock(&passphrase(&cli)?)?;
            println!("{}", address);
        }
        Commands::Export => {
            let secret = vault.export_secret(&passphrase(&cli)?)?;
            println!("{}", secret.as_str());
        }
        Commands::Wipe { yes } => {
            if !yes {
                return Err(EngineError::InvalidInput("refusing to wipe without --yes".into()));
            }
            vault.wipe()?;
            println!("wallet wiped");
        }
        Commands::Quote(args) => {
            let intent = intent_from(args, &config)?;
            let fetcher = fetcher(&config)?;
            let body = fetcher.fetch_quote(&intent.quote_params()).await?;
            if let Some(out) = body.get("outAmount").and_then(|v| v.as_str()).and_then(|s| s.parse::<u64>().ok()) {
                info!("Quoted output: {} base units", out);
            }
            println!("{}", serde_json::to_string_pretty(&body)?);
        }
        Commands::Swap(args) => {
            let intent = intent_from(args, &config)?;
            vault.unlock(&passphrase(&cli)?)?;
            let vault = Arc::new(vault);

            let network = Arc::new(RpcClient::with_timeouts(
                &config.rpc_url,
                config.request_timeout(),
                config.confirm_timeout(),
            )?);
            let orchestrator = SwapOrchestrator::with_options(
                load_embedded_router(&config),
                Arc::new(fetcher(&config)?),
                network,
                SignerSelector::new(vault.clone(), None),
                config.commitment,
                config.timeouts(),
            );

            let mut progress = orchestrator.subscribe();
            let watcher = tokio::spawn(async move {
                while progress.changed().await.is_ok() {
                    let stage = *progress.borrow_and_update();
                    eprintln!("… {}", stage);
                }
            });

            let result = orchestrator.execute(&intent).await;
            vault.clear_memory();
            drop(orchestrator);
            if let Err(e) = watcher.await {
                debug!("progress watcher ended abnormally: {}", e);
            }

            let result = result?;
            println!(
                "{} ({} route, {} signer)",
                result.signature, result.route_source, result.signer
            );
            println!(
                "sold {} {}",
                base_units_to_amount(intent.amount_base_units(), intent.decimals()),
                intent.input_mint()
            );
        }
        Commands::TwapRegister { input, output, total, chunk, interval_ms } => {
            let (input_mint, _) = sol_twap::engine::swap::resolve_token(input)?;
            let (output_mint, _) = sol_twap::engine::swap::resolve_token(output)?;
            let job = TwapJob {
                input_mint,
                output_mint,
                total_amount: *total,
                chunk_size: *chunk,
                interval_ms: *interval_ms,
            };
            let registration = fetcher(&config)?.register(&job).await?;
            println!(
                "{} (HTTP {})",
                if registration.accepted { "registered" } else { "rejected" },
                registration.status
            );
            println!("{}", serde_json::to_string_pretty(&registration.body)?);
        }
        Commands::Completions { .. } => {}
    }
    Ok(())
}

fn open_vault(cli: &Cli, config: &SwapConfig) -> EngineResult<KeyVault<Box<dyn VaultStore>>> {
    let store: Box<dyn VaultStore> = if cli.keychain {
        Box::new(KeyringVaultStore::new()?)
    } else {
        Box::new(FileVaultStore::new(config.vault_path()?))
    };
    Ok(KeyVault::with_kdf(store, config.kdf_params()?))
}

fn fetcher(config: &SwapConfig) -> EngineResult<QuoteFetcher> {
    let endpoints: FetchEndpoints = config.fetch_endpoints()?;
    Ok(QuoteFetcher::spawn(Arc::new(ReqwestBackend::new(config.request_timeout())?), endpoints))
}

fn intent_from(args: &TradeArgs, config: &SwapConfig) -> EngineResult<SwapIntent> {
    SwapIntent::for_tokens(
        &args.input,
        &args.output,
        &args.amount,
        args.slippage.unwrap_or(config.default_slippage),
        args.decimals,
    )
}

fn passphrase(cli: &Cli) -> EngineResult<String> {
    if let Some(p) = &cli.passphrase {
        return Ok(p.clone());
    }
    Ok(rpassword::prompt_password("Passphrase: ")?)
}

/// Asked twice: a typo here seals the new wallet under an unknown passphrase.
fn new_passphrase(cli: &Cli) -> EngineResult<String> {
    if let Some(p) = &cli.passphrase {
        return Ok(p.clone());
    }
    let first = rpassword::prompt_password("New passphrase: ")?;
    let second = rpassword::prompt_password("Confirm passphrase: ")?;
    confirmed(first, &second)
}

fn confirmed(first: String, second: &str) -> EngineResult<String> {
    if first != second {
        return Err(EngineError::InvalidInput("passphrase confirmation mismatch".into()));
    }
    Ok(first)
}

#[cfg(test)]
mod tests {
    use super::*;
    use sol_twap::ErrorKind;

    #[test]
    fn mismatched_confirmation_is_rejected() {
        assert_eq!(confirmed("hunter2".into(), "hunter3").unwrap_err().kind(), ErrorKind::InvalidInput);
        assert_eq!(confirmed("hunter2".into(), "hunter2").unwrap(), "hunter2");
    }

    #[test]
    fn passphrase_flag_skips_the_prompt() {
        let cli = Cli::try_parse_from(["sol-twap", "--passphrase", "pw", "generate"]).unwrap();
        assert_eq!(new_passphrase(&cli).unwrap(), "pw");
        assert_eq!(passphrase(&cli).unwrap(), "pw");
    }
}
