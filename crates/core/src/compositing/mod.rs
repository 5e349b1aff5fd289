pub mod chain_config;
pub mod filter_chain;
