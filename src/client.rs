use crate::{
    chain_info::{
        ChainInfo,
        DEFAULT_CHAIN_INFO_DIR,
    },
    format::{
        self,
        LotteryPhase,
    },
    ui,
    wallets,
};
use alloy::{
    contract::{
        ContractInstance,
        Interface,
    },
    dyn_abi::DynSolValue,
    network::{
        Ethereum,
        EthereumWallet,
    },
    primitives::{
        Address,
        U256,
    },
    providers::{
        Identity,
        Provider,
        ProviderBuilder,
        RootProvider,
        fillers::{
            BlobGasFiller,
            ChainIdFiller,
            FillProvider,
            GasFiller,
            JoinFill,
            NonceFiller,
            WalletFiller,
        },
    },
    rpc::types::Filter,
};
use color_eyre::eyre::{
    Result,
    WrapErr,
    eyre,
};
use std::time::Duration;
use tokio::{
    sync::mpsc,
    task::JoinHandle,
    time,
};
use tracing::{
    error,
    info,
    warn,
};
use url::Url;

pub const DEFAULT_RPC_URL: &str = "http://localhost:8545";
pub const DEFAULT_CONTRACT_NAME: &str = "Lottery";
const COUNTDOWN_TICK: Duration = Duration::from_millis(250);
const CHAIN_WATCH_INTERVAL: Duration = Duration::from_secs(2);
const FINISHED_POLL_INTERVAL: Duration = Duration::from_secs(1);
const FINISHED_EVENT_SIGNATURE: &str = "LotteryFinished()";
const MAX_ERRORS: usize = 50;

/// The provider `ProviderBuilder::new().connect_http(...)` produces: nonce,
/// gas, and chain-id filling over a plain HTTP transport, no wallet.
pub type ReadProvider = FillProvider<
    JoinFill<
        Identity,
        JoinFill<GasFiller, JoinFill<BlobGasFiller, JoinFill<NonceFiller, ChainIdFiller>>>,
    >,
    RootProvider<Ethereum>,
    Ethereum,
>;

/// Same stack with a wallet filler on top, for submitting transactions.
pub type SignerProvider = FillProvider<
    JoinFill<
        JoinFill<
            Identity,
            JoinFill<GasFiller, JoinFill<BlobGasFiller, JoinFill<NonceFiller, ChainIdFiller>>>,
        >,
        WalletFiller<EthereumWallet>,
    >,
    RootProvider<Ethereum>,
    Ethereum,
>;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub rpc_url: String,
    pub expected_chain_id: Option<u64>,
    pub chain_info_dir: String,
    pub contract_name: String,
    pub wallet_name: Option<String>,
    pub wallet_dir: Option<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            rpc_url: DEFAULT_RPC_URL.to_string(),
            expected_chain_id: None,
            chain_info_dir: DEFAULT_CHAIN_INFO_DIR.to_string(),
            contract_name: DEFAULT_CONTRACT_NAME.to_string(),
            wallet_name: None,
            wallet_dir: None,
        }
    }
}

/// Why a state refresh was queued. `Dapp` re-reads the shared contract
/// fields (chaining the connected account's data when a session exists);
/// `User` re-reads only the connected account's entries and balance.
/// Confirmed entries queue `Dapp`: a purchase moves the prize pool and the
/// entry counter, not just the buyer's rows.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum RefreshScope {
    Dapp,
    User,
}

/// Which of the four action buttons are currently pressable.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct ActionButtons {
    pub connect: bool,
    pub start: bool,
    pub enter: bool,
    pub end: bool,
}

/// Button availability follows the round lifecycle: start only while closed,
/// enter only while open and before the deadline, end only once the deadline
/// has passed. Everything but connect requires a connected wallet.
pub fn action_buttons(
    phase: LotteryPhase,
    connected: bool,
    now: u64,
    deadline: u64,
) -> ActionButtons {
    let before_deadline = now < deadline;
    ActionButtons {
        connect: !connected,
        start: connected && phase == LotteryPhase::Closed,
        enter: connected && phase == LotteryPhase::Opened && before_deadline,
        end: connected && phase == LotteryPhase::Opened && !before_deadline,
    }
}

/// Everything the view needs to draw one frame.
#[derive(Clone, Debug, Default)]
pub struct DappSnapshot {
    pub account: Option<String>,
    pub chain_id: u64,
    pub contract_address: String,
    pub phase: LotteryPhase,
    pub deadline: u64,
    pub countdown: String,
    pub prize_pool: String,
    pub entry_fee_wei: U256,
    pub entry_fee: String,
    pub entry_count: u64,
    pub my_entries: Option<u64>,
    pub my_balance: Option<String>,
    pub winner: Option<String>,
    pub randomness: Option<String>,
    pub buttons: ActionButtons,
    pub status: String,
    pub errors: Vec<String>,
}

struct SignerSession {
    contract: ContractInstance<SignerProvider>,
    account: Address,
}

pub struct AppController {
    config: AppConfig,
    chain_id: u64,
    provider: ReadProvider,
    interface: Interface,
    contract_address: Address,
    read_contract: ContractInstance<ReadProvider>,
    session: Option<SignerSession>,
    phase: LotteryPhase,
    deadline: u64,
    prize_pool: U256,
    entry_fee: U256,
    entry_count: u64,
    my_entries: Option<u64>,
    my_balance: Option<U256>,
    winner: Option<Address>,
    randomness: Option<U256>,
    status: String,
    errors: Vec<String>,
    refresh_tx: mpsc::UnboundedSender<RefreshScope>,
    finished_watch: Option<JoinHandle<()>>,
}

impl AppController {
    pub async fn new(
        config: AppConfig,
        refresh_tx: mpsc::UnboundedSender<RefreshScope>,
    ) -> Result<Self> {
        let url: Url = config
            .rpc_url
            .parse()
            .wrap_err_with(|| format!("Invalid RPC URL '{}'", config.rpc_url))?;
        info!("Connecting to node at {url}");
        let provider = ProviderBuilder::new().connect_http(url);
        let chain_id = provider
            .get_chain_id()
            .await
            .wrap_err("Failed to query the node's chain id")?;
        if let Some(expected) = config.expected_chain_id
            && expected != chain_id
        {
            return Err(eyre!(
                "Node at {} reports chain id {chain_id}, expected {expected}",
                config.rpc_url
            ));
        }

        let chain_info = ChainInfo::new(&config.chain_info_dir);
        let artifact = chain_info.load_artifact(&config.contract_name)?;
        let map = chain_info.load_deployment_map()?;
        let contract_address = map.address_for(chain_id, &config.contract_name)?;
        info!(
            "Using {} at {contract_address} on chain {chain_id}",
            config.contract_name
        );

        let interface = Interface::new(artifact.abi);
        let read_contract =
            ContractInstance::new(contract_address, provider.clone(), interface.clone());

        let mut controller = Self {
            config,
            chain_id,
            provider,
            interface,
            contract_address,
            read_contract,
            session: None,
            phase: LotteryPhase::Closed,
            deadline: 0,
            prize_pool: U256::ZERO,
            entry_fee: U256::ZERO,
            entry_count: 0,
            my_entries: None,
            my_balance: None,
            winner: None,
            randomness: None,
            status: String::from("Ready"),
            errors: Vec::new(),
            refresh_tx,
            finished_watch: None,
        };
        controller.refresh_dapp_data().await?;
        Ok(controller)
    }

    pub fn chain_id(&self) -> u64 {
        self.chain_id
    }

    pub fn provider(&self) -> &ReadProvider {
        &self.provider
    }

    pub fn deadline(&self) -> u64 {
        self.deadline
    }

    pub fn connected_account(&self) -> Option<Address> {
        self.session.as_ref().map(|s| s.account)
    }

    fn set_status(&mut self, message: impl Into<String>) {
        self.status = message.into();
        self.errors.clear();
    }

    fn push_errors(&mut self, mut items: Vec<String>) {
        if items.is_empty() {
            return;
        }
        for item in &items {
            error!("{}", item);
        }
        self.errors.append(&mut items);
        if self.errors.len() > MAX_ERRORS {
            let drain = self.errors.len() - MAX_ERRORS;
            self.errors.drain(0..drain);
        }
    }

    /// Unlocks a keystore wallet and attaches a signing session. The terminal
    /// must be released before calling this; the password prompt writes to it
    /// directly. An empty password leaves the controller unchanged.
    pub async fn connect(&mut self) -> Result<()> {
        let dir = wallets::resolve_wallet_dir(self.config.wallet_dir.as_deref())?;
        let descriptor = wallets::find_wallet(&dir, self.config.wallet_name.as_deref())?;
        let Some(signer) = wallets::unlock_wallet(&descriptor)? else {
            info!("Wallet unlock declined for '{}'", descriptor.name);
            self.set_status("Connect cancelled");
            return Ok(());
        };

        let account = signer.address();
        let wallet = EthereumWallet::from(signer);
        let url: Url = self
            .config
            .rpc_url
            .parse()
            .wrap_err_with(|| format!("Invalid RPC URL '{}'", self.config.rpc_url))?;
        let provider = ProviderBuilder::new().wallet(wallet).connect_http(url);
        let contract =
            ContractInstance::new(self.contract_address, provider, self.interface.clone());
        self.session = Some(SignerSession { contract, account });
        info!("Connected account {account}");
        self.set_status(format!(
            "Connected {}",
            format::shorten_value(&account.to_string())
        ));
        queue_refresh(&self.refresh_tx, RefreshScope::User, "wallet connect");
        Ok(())
    }

    fn session(&self) -> Result<&SignerSession> {
        self.session
            .as_ref()
            .ok_or_else(|| eyre!("Connect a wallet first"))
    }

    async fn call_uint(&self, name: &str) -> Result<U256> {
        let values = self
            .read_contract
            .function(name, &[])?
            .call()
            .await
            .wrap_err_with(|| format!("{name} call failed"))?;
        first_uint(name, &values)
    }

    async fn call_address(&self, name: &str) -> Result<Address> {
        let values = self
            .read_contract
            .function(name, &[])?
            .call()
            .await
            .wrap_err_with(|| format!("{name} call failed"))?;
        first_address(name, &values)
    }

    /// Re-reads every shared contract field the view displays.
    pub async fn refresh_dapp_data(&mut self) -> Result<()> {
        let state_code: u8 = self
            .call_uint("lotteryState")
            .await?
            .try_into()
            .map_err(|_| eyre!("lotteryState does not fit in a u8"))?;
        self.phase = LotteryPhase::try_from(state_code)?;
        self.deadline = uint_to_u64(
            "lotteryDeadlineTimestamp",
            self.call_uint("lotteryDeadlineTimestamp").await?,
        )?;
        self.entry_fee = self.call_uint("getEntryFee").await?;
        self.entry_count = uint_to_u64("entryCounter", self.call_uint("entryCounter").await?)?;
        self.prize_pool = self
            .provider
            .get_balance(self.contract_address)
            .await
            .wrap_err("Failed to query the prize pool balance")?;
        self.randomness = match self.call_uint("randomness").await? {
            value if value.is_zero() => None,
            value => Some(value),
        };
        self.winner = match self.call_address("latestWinner").await? {
            addr if addr == Address::ZERO => None,
            addr => Some(addr),
        };
        if self.session.is_some() {
            self.refresh_user_data().await?;
        }
        Ok(())
    }

    /// Re-reads the connected account's entry count and balance. No-op
    /// without a wallet.
    pub async fn refresh_user_data(&mut self) -> Result<()> {
        let Some(session) = self.session.as_ref() else {
            self.my_entries = None;
            self.my_balance = None;
            return Ok(());
        };
        let account = session.account;
        let values = self
            .read_contract
            .function("participantEntries", &[DynSolValue::Address(account)])?
            .call()
            .await
            .wrap_err("participantEntries call failed")?;
        self.my_entries = Some(uint_to_u64(
            "participantEntries",
            first_uint("participantEntries", &values)?,
        )?);
        self.my_balance = Some(
            self.provider
                .get_balance(account)
                .await
                .wrap_err("Failed to query the account balance")?,
        );
        Ok(())
    }

    pub async fn start_lottery(&mut self) -> Result<()> {
        let session = self.session()?;
        let pending = session
            .contract
            .function("startLottery", &[])?
            .send()
            .await
            .wrap_err("startLottery submission failed")?;
        info!("startLottery submitted as {}", pending.tx_hash());
        let receipt = pending
            .get_receipt()
            .await
            .wrap_err("startLottery confirmation failed")?;
        if !receipt.status() {
            return Err(eyre!("startLottery transaction reverted"));
        }
        self.set_status("Lottery started");
        queue_refresh(&self.refresh_tx, RefreshScope::Dapp, "start receipt");
        Ok(())
    }

    pub async fn enter_lottery(&mut self, count: u64) -> Result<()> {
        if count == 0 {
            return Err(eyre!("Entry count must be at least 1"));
        }
        let cost = format::entry_cost(count, self.entry_fee)?;
        let session = self.session()?;
        let pending = session
            .contract
            .function("enterLottery", &[DynSolValue::Uint(U256::from(count), 256)])?
            .value(cost)
            .send()
            .await
            .wrap_err("enterLottery submission failed")?;
        info!("enterLottery submitted as {}", pending.tx_hash());
        let receipt = pending
            .get_receipt()
            .await
            .wrap_err("enterLottery confirmation failed")?;
        if !receipt.status() {
            return Err(eyre!("enterLottery transaction reverted"));
        }
        let label = if count == 1 { "entry" } else { "entries" };
        self.set_status(format!("Bought {count} {label}"));
        queue_refresh(&self.refresh_tx, RefreshScope::Dapp, "enter receipt");
        Ok(())
    }

    /// Ends the round. The contract flips to `Processing` until its randomness
    /// source answers, so beyond the receipt-driven refresh this also starts a
    /// watcher that refreshes again when the finish event lands. The watcher
    /// is armed as soon as the transaction is submitted: the round finishes
    /// on-chain whether or not this client's confirmation survives, and the
    /// round can even be ended by someone else while ours reverts.
    pub async fn end_lottery(&mut self) -> Result<()> {
        let session = self.session()?;
        let from_block = self
            .provider
            .get_block_number()
            .await
            .wrap_err("Failed to query the current block number")?;
        let pending = session
            .contract
            .function("endLottery", &[])?
            .send()
            .await
            .wrap_err("endLottery submission failed")?;
        info!("endLottery submitted as {}", pending.tx_hash());
        self.spawn_finished_watch(from_block);
        let receipt = pending
            .get_receipt()
            .await
            .wrap_err("endLottery confirmation failed")?;
        if !receipt.status() {
            return Err(eyre!("endLottery transaction reverted"));
        }
        self.set_status("Lottery ending, drawing a winner...");
        queue_refresh(&self.refresh_tx, RefreshScope::Dapp, "end receipt");
        Ok(())
    }

    fn spawn_finished_watch(&mut self, from_block: u64) {
        if let Some(old) = self.finished_watch.take() {
            old.abort();
        }
        let provider = self.provider.clone();
        let address = self.contract_address;
        let refresh_tx = self.refresh_tx.clone();
        self.finished_watch = Some(tokio::spawn(async move {
            let filter = Filter::new()
                .address(address)
                .event(FINISHED_EVENT_SIGNATURE)
                .from_block(from_block);
            let mut ticker = time::interval(FINISHED_POLL_INTERVAL);
            loop {
                ticker.tick().await;
                match provider.get_logs(&filter).await {
                    Ok(logs) if !logs.is_empty() => {
                        queue_refresh(&refresh_tx, RefreshScope::Dapp, "finish event");
                        return;
                    }
                    Ok(_) => {}
                    Err(err) => warn!(?err, "finish event poll failed"),
                }
            }
        }));
    }

    pub fn build_snapshot(&self, now: u64) -> DappSnapshot {
        DappSnapshot {
            account: self
                .session
                .as_ref()
                .map(|s| format::shorten_value(&s.account.to_string())),
            chain_id: self.chain_id,
            contract_address: format::shorten_value(&self.contract_address.to_string()),
            phase: self.phase,
            deadline: self.deadline,
            countdown: format::render_countdown(self.deadline, now),
            prize_pool: format::format_ether_short(self.prize_pool),
            entry_fee_wei: self.entry_fee,
            entry_fee: format::format_ether_short(self.entry_fee),
            entry_count: self.entry_count,
            my_entries: self.my_entries,
            my_balance: self.my_balance.map(format::format_ether_short),
            winner: self.winner.map(|w| format::shorten_value(&w.to_string())),
            randomness: self.randomness.map(|r| r.to_string()),
            buttons: action_buttons(self.phase, self.session.is_some(), now, self.deadline),
            status: self.status.clone(),
            errors: self.errors.clone(),
        }
    }
}

impl Drop for AppController {
    fn drop(&mut self) {
        if let Some(watch) = self.finished_watch.take() {
            watch.abort();
        }
    }
}

/// Records why a refresh was queued and hands it to the loop. Receipt
/// confirmation and the finish event each queue their own; a round that ends
/// therefore refreshes twice, once per signal.
fn queue_refresh(
    tx: &mpsc::UnboundedSender<RefreshScope>,
    scope: RefreshScope,
    source: &'static str,
) {
    info!("Queueing {scope:?} refresh ({source})");
    if tx.send(scope).is_err() {
        warn!("refresh receiver dropped, {source} refresh lost");
    }
}

fn first_uint(name: &str, values: &[DynSolValue]) -> Result<U256> {
    values
        .first()
        .and_then(DynSolValue::as_uint)
        .map(|(value, _)| value)
        .ok_or_else(|| eyre!("{name} did not return a uint"))
}

fn first_address(name: &str, values: &[DynSolValue]) -> Result<Address> {
    values
        .first()
        .and_then(DynSolValue::as_address)
        .ok_or_else(|| eyre!("{name} did not return an address"))
}

/// Contract values the client treats as counters or timestamps must fit in
/// a u64; anything wider surfaces as an error instead of a panic.
fn uint_to_u64(name: &str, value: U256) -> Result<u64> {
    value
        .try_into()
        .map_err(|_| eyre!("{name} does not fit in a u64"))
}

pub fn unix_now() -> u64 {
    chrono::Utc::now().timestamp().max(0) as u64
}

/// Wraps the redraw interval so each refresh owns exactly one ticker;
/// dropping the old one on replacement cancels it.
pub struct CountdownTicker {
    interval: time::Interval,
}

impl CountdownTicker {
    pub fn new() -> Self {
        let mut interval = time::interval(COUNTDOWN_TICK);
        interval.set_missed_tick_behavior(time::MissedTickBehavior::Skip);
        Self { interval }
    }

    pub async fn tick(&mut self) {
        self.interval.tick().await;
    }
}

impl Default for CountdownTicker {
    fn default() -> Self {
        Self::new()
    }
}

/// How a session ended: the user quit, or the node's chain changed under us
/// and the whole client should be rebuilt against the new network.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Outcome {
    Quit,
    Reload,
}

pub async fn run_app(config: AppConfig) -> Result<Outcome> {
    let (refresh_tx, refresh_rx) = mpsc::unbounded_channel();
    let mut controller = AppController::new(config, refresh_tx).await?;
    let mut ui_state = ui::UiState::default();
    let mut input_events = ui::input_event_stream();

    tracing::info!("Starting UI");
    ui::terminal_enter(&mut ui_state)?;
    tracing::info!("UI ready");
    let res = run_loop(&mut controller, &mut ui_state, &mut input_events, refresh_rx).await;
    ui::terminal_exit()?;
    res
}

async fn run_loop(
    controller: &mut AppController,
    ui_state: &mut ui::UiState,
    input_events: &mut ui::InputEventReceiver,
    mut refresh_rx: mpsc::UnboundedReceiver<RefreshScope>,
) -> Result<Outcome> {
    tracing::info!("Running app loop");
    let mut countdown = CountdownTicker::new();
    let mut chain_watch = time::interval(CHAIN_WATCH_INTERVAL);
    chain_watch.set_missed_tick_behavior(time::MissedTickBehavior::Skip);

    let mut snapshot = controller.build_snapshot(unix_now());
    ui::draw(ui_state, &snapshot).wrap_err("initial draw failed")?;

    loop {
        tokio::select! {
            _ = countdown.tick() => {
                let now = unix_now();
                snapshot.countdown = format::render_countdown(controller.deadline(), now);
                snapshot.buttons = action_buttons(
                    snapshot.phase,
                    controller.connected_account().is_some(),
                    now,
                    controller.deadline(),
                );
                ui::draw(ui_state, &snapshot).wrap_err("draw after tick failed")?;
            }
            maybe_scope = refresh_rx.recv() => {
                let Some(scope) = maybe_scope else {
                    return Err(eyre!("refresh channel closed"));
                };
                let result = match scope {
                    RefreshScope::Dapp => controller.refresh_dapp_data().await,
                    RefreshScope::User => controller.refresh_user_data().await,
                };
                if let Err(err) = result {
                    controller.push_errors(vec![format!("Refresh failed: {err}")]);
                }
                countdown = CountdownTicker::new();
                snapshot = controller.build_snapshot(unix_now());
                ui::draw(ui_state, &snapshot).wrap_err("draw after refresh failed")?;
            }
            _ = chain_watch.tick() => {
                match controller.provider().get_chain_id().await {
                    Ok(current) if current != controller.chain_id() => {
                        tracing::info!(
                            "Chain id changed from {} to {current}, reloading",
                            controller.chain_id()
                        );
                        return Ok(Outcome::Reload);
                    }
                    Ok(_) => {}
                    Err(err) => warn!(?err, "chain id poll failed"),
                }
            }
            _ = tokio::signal::ctrl_c() => {
                return Ok(Outcome::Quit);
            }
            raw_ev = ui::next_raw_event(input_events) => {
                let event = raw_ev?;
                let Some(ev) = ui::interpret_event(ui_state, event, snapshot.buttons) else {
                    ui::draw(ui_state, &snapshot).wrap_err("draw after modal input failed")?;
                    continue;
                };
                match ev {
                    ui::UserEvent::Quit => return Ok(Outcome::Quit),
                    ui::UserEvent::Redraw => {}
                    ui::UserEvent::Connect => {
                        // rpassword needs the raw terminal back for the prompt.
                        ui::terminal_exit()?;
                        let result = controller.connect().await;
                        ui::terminal_enter(ui_state)?;
                        if let Err(err) = result {
                            controller.push_errors(vec![format!("Connect failed: {err}")]);
                        }
                        snapshot = controller.build_snapshot(unix_now());
                    }
                    ui::UserEvent::StartLottery => {
                        controller.set_status("Starting lottery...");
                        snapshot = controller.build_snapshot(unix_now());
                        ui::draw(ui_state, &snapshot)
                            .wrap_err("draw while starting lottery failed")?;
                        if let Err(err) = controller.start_lottery().await {
                            controller.push_errors(vec![format!("Start failed: {err}")]);
                        }
                        snapshot = controller.build_snapshot(unix_now());
                    }
                    ui::UserEvent::ConfirmEnter { count } => {
                        controller.set_status(format!("Buying {count} entries..."));
                        snapshot = controller.build_snapshot(unix_now());
                        ui::draw(ui_state, &snapshot)
                            .wrap_err("draw while entering lottery failed")?;
                        if let Err(err) = controller.enter_lottery(count).await {
                            controller.push_errors(vec![format!("Enter failed: {err}")]);
                        }
                        snapshot = controller.build_snapshot(unix_now());
                    }
                    ui::UserEvent::EndLottery => {
                        controller.set_status("Ending lottery...");
                        snapshot = controller.build_snapshot(unix_now());
                        ui::draw(ui_state, &snapshot)
                            .wrap_err("draw while ending lottery failed")?;
                        if let Err(err) = controller.end_lottery().await {
                            controller.push_errors(vec![format!("End failed: {err}")]);
                        }
                        snapshot = controller.build_snapshot(unix_now());
                    }
                }
                ui::draw(ui_state, &snapshot).wrap_err("draw after user event failed")?;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(non_snake_case)]
    use super::*;

    const DEADLINE: u64 = 1_700_000_000;

    /// A controller wired to an unreachable node; nothing here touches the
    /// network at construction time.
    fn offline_controller(refresh_tx: mpsc::UnboundedSender<RefreshScope>) -> AppController {
        let chain_info = ChainInfo::new(concat!(env!("CARGO_MANIFEST_DIR"), "/chain-info"));
        let artifact = chain_info
            .load_artifact(DEFAULT_CONTRACT_NAME)
            .expect("shipped artifact loads");
        let interface = Interface::new(artifact.abi);
        let provider = ProviderBuilder::new()
            .connect_http("http://127.0.0.1:9".parse().expect("static url parses"));
        let contract_address = Address::repeat_byte(0x42);
        let read_contract =
            ContractInstance::new(contract_address, provider.clone(), interface.clone());
        AppController {
            config: AppConfig::default(),
            chain_id: 31337,
            provider,
            interface,
            contract_address,
            read_contract,
            session: None,
            phase: LotteryPhase::Closed,
            deadline: 0,
            prize_pool: U256::ZERO,
            entry_fee: U256::ZERO,
            entry_count: 0,
            my_entries: None,
            my_balance: None,
            winner: None,
            randomness: None,
            status: String::from("Ready"),
            errors: Vec::new(),
            refresh_tx,
            finished_watch: None,
        }
    }

    #[test]
    fn action_buttons__disconnected_only_offers_connect() {
        // given no wallet, any phase
        for phase in [
            LotteryPhase::Closed,
            LotteryPhase::Opened,
            LotteryPhase::Processing,
        ] {
            // when
            let buttons = action_buttons(phase, false, DEADLINE - 10, DEADLINE);

            // then
            assert!(buttons.connect);
            assert!(!buttons.start && !buttons.enter && !buttons.end);
        }
    }

    #[test]
    fn action_buttons__closed_round_offers_start_only() {
        let buttons = action_buttons(LotteryPhase::Closed, true, DEADLINE - 10, DEADLINE);

        assert_eq!(
            buttons,
            ActionButtons {
                connect: false,
                start: true,
                enter: false,
                end: false,
            }
        );
    }

    #[test]
    fn action_buttons__open_round_before_deadline_offers_enter() {
        let buttons = action_buttons(LotteryPhase::Opened, true, DEADLINE - 1, DEADLINE);

        assert!(buttons.enter);
        assert!(!buttons.end && !buttons.start);
    }

    #[test]
    fn action_buttons__open_round_past_deadline_offers_end() {
        // The boundary instant itself counts as past the deadline.
        let buttons = action_buttons(LotteryPhase::Opened, true, DEADLINE, DEADLINE);

        assert!(buttons.end);
        assert!(!buttons.enter && !buttons.start);
    }

    #[test]
    fn action_buttons__processing_round_offers_nothing_but_waiting() {
        let buttons = action_buttons(LotteryPhase::Processing, true, DEADLINE + 5, DEADLINE);

        assert!(!buttons.start && !buttons.enter && !buttons.end && !buttons.connect);
    }

    #[test]
    fn queue_refresh__receipt_and_finish_event_each_queue_a_reset() {
        // given the two independent end-of-round signals
        let (tx, mut rx) = mpsc::unbounded_channel();

        // when
        queue_refresh(&tx, RefreshScope::Dapp, "end receipt");
        queue_refresh(&tx, RefreshScope::Dapp, "finish event");

        // then: exactly two refreshes queued, one per signal
        assert!(matches!(rx.try_recv(), Ok(RefreshScope::Dapp)));
        assert!(matches!(rx.try_recv(), Ok(RefreshScope::Dapp)));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn queue_refresh__enter_receipt_resets_the_whole_dapp_view() {
        // given a confirmed entry purchase
        let (tx, mut rx) = mpsc::unbounded_channel();

        // when
        queue_refresh(&tx, RefreshScope::Dapp, "enter receipt");

        // then: the queued scope re-reads shared state (prize pool, entry
        // counter), not just the buyer's rows
        assert!(matches!(rx.try_recv(), Ok(RefreshScope::Dapp)));
    }

    #[tokio::test]
    async fn end_lottery__without_a_wallet_neither_submits_nor_watches() {
        // given no connected session
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut controller = offline_controller(tx);

        // when
        let err = controller.end_lottery().await.unwrap_err();

        // then: no event watcher is armed and no refresh queued
        assert!(err.to_string().contains("Connect a wallet"));
        assert!(controller.finished_watch.is_none());
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn spawn_finished_watch__replaces_and_cancels_the_previous_watcher() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let mut controller = offline_controller(tx);

        controller.spawn_finished_watch(1);
        let first = controller
            .finished_watch
            .as_ref()
            .expect("watcher spawned")
            .abort_handle();

        controller.spawn_finished_watch(2);

        time::sleep(Duration::from_millis(50)).await;
        assert!(first.is_finished());
        assert!(controller.finished_watch.is_some());
    }

    #[test]
    fn uint_to_u64__in_range_values_convert() {
        assert_eq!(
            uint_to_u64("entryCounter", U256::from(u64::MAX)).unwrap(),
            u64::MAX
        );
    }

    #[test]
    fn uint_to_u64__oversized_value_is_an_error_not_a_panic() {
        let err = uint_to_u64("lotteryDeadlineTimestamp", U256::MAX).unwrap_err();

        assert!(err.to_string().contains("does not fit"));
    }

    #[test]
    fn first_uint__extracts_the_leading_uint_return() {
        let values = vec![DynSolValue::Uint(U256::from(42u64), 256)];

        let value = first_uint("entryCounter", &values).unwrap();

        assert_eq!(value, U256::from(42u64));
    }

    #[test]
    fn first_uint__wrong_return_shape_is_an_error() {
        let values = vec![DynSolValue::Bool(true)];

        assert!(first_uint("entryCounter", &values).is_err());
        assert!(first_uint("entryCounter", &[]).is_err());
    }

    #[test]
    fn first_address__extracts_the_leading_address_return() {
        let addr = Address::repeat_byte(0x11);
        let values = vec![DynSolValue::Address(addr)];

        assert_eq!(first_address("latestWinner", &values).unwrap(), addr);
    }
}
