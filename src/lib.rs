pub mod chain_info;
pub mod client;
pub mod format;
pub mod ui;
pub mod wallets;
