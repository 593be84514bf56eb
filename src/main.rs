use color_eyre::eyre::{
    Result,
    eyre,
};
use lottery_tui::{
    chain_info,
    client,
};
use tracing_appender::rolling;
use tracing_subscriber::EnvFilter;

fn print_usage_and_exit() -> ! {
    println!(
        "Usage: lottery-tui [--rpc-url <url>] [--chain-id <id>] [--chain-info <dir>]\n\
         [--contract <name>] [--wallet <name>] [--wallet-dir <path>]\n\
         \n\
         Flags:\n\
           --rpc-url <url>     Ethereum JSON-RPC endpoint (default {})\n\
           --chain-id <id>     Refuse to start unless the node reports this chain id\n\
           --chain-info <dir>  Directory with contract artifacts and the deployment map\n\
                               (default {})\n\
           --contract <name>   Contract name to load from the chain-info directory\n\
                               (default {})\n\
           --wallet <name>     Keystore file to sign with (stem of the filename)\n\
           --wallet-dir <path> Override the keystore directory (defaults to ~/.ethereum/keystore)",
        client::DEFAULT_RPC_URL,
        chain_info::DEFAULT_CHAIN_INFO_DIR,
        client::DEFAULT_CONTRACT_NAME,
    );
    std::process::exit(0);
}

fn parse_cli_args() -> Result<client::AppConfig> {
    let mut args = std::env::args().skip(1);
    let mut config = client::AppConfig::default();
    let mut rpc_url: Option<String> = None;
    let mut chain_id: Option<u64> = None;
    let mut chain_info_dir: Option<String> = None;
    let mut contract_name: Option<String> = None;

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--rpc-url" => {
                let url = args
                    .next()
                    .ok_or_else(|| eyre!("--rpc-url requires a URL argument"))?;
                if rpc_url.is_some() {
                    return Err(eyre!("--rpc-url may only be specified once"));
                }
                rpc_url = Some(url);
            }
            "--chain-id" => {
                let raw = args
                    .next()
                    .ok_or_else(|| eyre!("--chain-id requires a numeric argument"))?;
                if chain_id.is_some() {
                    return Err(eyre!("--chain-id may only be specified once"));
                }
                chain_id = Some(
                    raw.parse()
                        .map_err(|_| eyre!("--chain-id expects a decimal chain id, got '{raw}'"))?,
                );
            }
            "--chain-info" => {
                let dir = args
                    .next()
                    .ok_or_else(|| eyre!("--chain-info requires a path argument"))?;
                if chain_info_dir.is_some() {
                    return Err(eyre!("--chain-info may only be specified once"));
                }
                chain_info_dir = Some(dir);
            }
            "--contract" => {
                let name = args
                    .next()
                    .ok_or_else(|| eyre!("--contract requires a contract name"))?;
                if contract_name.is_some() {
                    return Err(eyre!("--contract may only be specified once"));
                }
                contract_name = Some(name);
            }
            "--wallet" => {
                let name = args
                    .next()
                    .ok_or_else(|| eyre!("--wallet requires a wallet name"))?;
                if config.wallet_name.is_some() {
                    return Err(eyre!("--wallet may only be specified once"));
                }
                config.wallet_name = Some(name);
            }
            "--wallet-dir" => {
                let dir = args
                    .next()
                    .ok_or_else(|| eyre!("--wallet-dir requires a path argument"))?;
                if config.wallet_dir.is_some() {
                    return Err(eyre!("--wallet-dir may only be specified once"));
                }
                config.wallet_dir = Some(dir);
            }
            "--help" | "-h" => print_usage_and_exit(),
            other => return Err(eyre!("Unknown argument: {other}")),
        }
    }

    if let Some(url) = rpc_url {
        config.rpc_url = url;
    }
    config.expected_chain_id = chain_id;
    if let Some(dir) = chain_info_dir {
        config.chain_info_dir = dir;
    }
    if let Some(name) = contract_name {
        config.contract_name = name;
    }
    Ok(config)
}

/// Logs go to a daily-rolling file; the TUI owns stdout. The guard must stay
/// alive for the writer to flush.
fn init_tracing() -> tracing_appender::non_blocking::WorkerGuard {
    let file_appender = rolling::daily("./logs", "lottery-tui.log");
    let (writer, guard) = tracing_appender::non_blocking(file_appender);
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(writer)
        .with_ansi(false)
        .try_init();
    guard
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let _log_guard = init_tracing();
    let config = parse_cli_args()?;
    tracing::info!("starting lottery client against {}", config.rpc_url);

    // A chain-id change mid-session tears the client down and rebuilds it
    // against the new network.
    loop {
        match client::run_app(config.clone()).await? {
            client::Outcome::Quit => return Ok(()),
            client::Outcome::Reload => {
                tracing::info!("reloading client after chain change");
            }
        }
    }
}
