//! Runtime configuration for Liquidity Guard
//!
//! Per-chain RPC endpoints and contract addresses, the monitoring cadence and
//! the notification settings. Loaded from the environment (with `.env`
//! support) or from a TOML file.

use alloy_primitives::Address;
use eyre::Result;
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use crate::chain::{Chain, ChainContracts};

// ============================================
// CHAIN ENDPOINT
// ============================================

/// Everything needed to read one chain
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChainEndpoint {
    pub chain: Chain,

    /// JSON-RPC endpoint (Alchemy/Infura/public node)
    pub rpc_url: String,

    /// Uniswap V3 factory
    pub factory: Address,

    /// NonfungiblePositionManager
    pub position_manager: Address,
}

impl ChainEndpoint {
    pub fn contracts(&self) -> ChainContracts {
        ChainContracts {
            factory: self.factory,
            position_manager: self.position_manager,
        }
    }

    /// Build an endpoint from `{CHAIN}_RPC_URL` and the optional address overrides.
    ///
    /// Returns `None` when the chain has no RPC URL, or when it has no default
    /// deployment and the overrides are incomplete.
    fn from_vars<F>(chain: Chain, lookup: F) -> Option<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let prefix = chain.env_prefix();

        let rpc_url = lookup(&format!("{}_RPC_URL", prefix))
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())?;

        let parse_addr = |key: String| lookup(&key).and_then(|s| Address::from_str(s.trim()).ok());
        let factory_override = parse_addr(format!("{}_FACTORY_ADDRESS", prefix));
        let manager_override = parse_addr(format!("{}_POSITION_MANAGER_ADDRESS", prefix));

        let defaults = chain.default_contracts();
        let factory = factory_override.or(defaults.map(|c| c.factory))?;
        let position_manager = manager_override.or(defaults.map(|c| c.position_manager))?;

        Some(Self {
            chain,
            rpc_url,
            factory,
            position_manager,
        })
    }
}

// ============================================
// MAIN CONFIGURATION
// ============================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    // ========== Network Settings ==========
    /// Upper bound for a single chain read, in seconds
    pub rpc_timeout_secs: u64,

    // ========== Monitoring ==========
    /// Minutes between full sweeps
    pub check_interval_minutes: u64,

    /// Minutes between cooldown-map evictions
    pub cooldown_sweep_minutes: u64,

    // ========== Notifications ==========
    /// Telegram bot token; alerts are only logged when unset
    pub telegram_bot_token: Option<String>,

    /// Base URL for links in alert messages
    pub app_url: String,

    // ========== Chains ==========
    /// Chains with an RPC endpoint; others are disabled
    pub chains: Vec<ChainEndpoint>,
}

impl Config {
    /// Load configuration from environment variables and .env file
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let lookup = |key: &str| env::var(key).ok();

        Ok(Self {
            chains: Chain::ALL
                .iter()
                .filter_map(|chain| ChainEndpoint::from_vars(*chain, lookup))
                .collect(),
            rpc_timeout_secs: env::var("RPC_TIMEOUT_SECS")
                .unwrap_or_else(|_| "5".to_string())
                .parse()
                .unwrap_or(5),
            check_interval_minutes: env::var("CHECK_INTERVAL_MINUTES")
                .unwrap_or_else(|_| "5".to_string())
                .parse()
                .unwrap_or(5),
            cooldown_sweep_minutes: env::var("COOLDOWN_SWEEP_MINUTES")
                .unwrap_or_else(|_| "60".to_string())
                .parse()
                .unwrap_or(60),
            telegram_bot_token: env::var("TELEGRAM_BOT_TOKEN").ok().filter(|t| !t.is_empty()),
            app_url: env::var("APP_URL").unwrap_or_else(|_| "http://localhost:3000".to_string()),
        })
    }

    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to a TOML file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    pub fn endpoint(&self, chain: Chain) -> Option<&ChainEndpoint> {
        self.chains.iter().find(|e| e.chain == chain)
    }

    pub fn check_interval(&self) -> Duration {
        Duration::from_secs(self.check_interval_minutes * 60)
    }

    pub fn rpc_timeout(&self) -> Duration {
        Duration::from_secs(self.rpc_timeout_secs)
    }

    pub fn cooldown_sweep_interval(&self) -> Duration {
        Duration::from_secs(self.cooldown_sweep_minutes * 60)
    }

    /// Validate configuration before starting the monitor
    pub fn validate(&self) -> Result<()> {
        if self.chains.is_empty() {
            return Err(eyre::eyre!(
                "No chain configured - set at least one of BASE_RPC_URL, ETHEREUM_RPC_URL, ..."
            ));
        }

        for endpoint in &self.chains {
            if endpoint.rpc_url.contains("YOUR_API_KEY") || endpoint.rpc_url.contains("YOUR_KEY") {
                return Err(eyre::eyre!(
                    "Invalid {}_RPC_URL - replace the placeholder with a real endpoint",
                    endpoint.chain.env_prefix()
                ));
            }
            if endpoint.position_manager == Address::ZERO {
                return Err(eyre::eyre!(
                    "{} has no position manager address",
                    endpoint.chain
                ));
            }
        }

        // Sanity checks
        if self.check_interval_minutes == 0 {
            return Err(eyre::eyre!("CHECK_INTERVAL_MINUTES must be at least 1"));
        }
        if self.rpc_timeout_secs == 0 {
            return Err(eyre::eyre!("RPC_TIMEOUT_SECS must be at least 1"));
        }
        if self.cooldown_sweep_minutes == 0 {
            return Err(eyre::eyre!("COOLDOWN_SWEEP_MINUTES must be at least 1"));
        }

        Ok(())
    }

    /// Print configuration summary
    pub fn print_summary(&self) {
        println!("╔════════════════════════════════════════════════════════════╗");
        println!("║             LIQUIDITY GUARD - CONFIGURATION                ║");
        println!("╠════════════════════════════════════════════════════════════╣");
        println!("║ CHAINS                                                     ║");
        if self.chains.is_empty() {
            println!("║ • {:<56} ║", "none configured");
        }
        for endpoint in &self.chains {
            println!(
                "║ • {:<10} (id {:>6})  factory {:<24} ║",
                endpoint.chain.name(),
                endpoint.chain.chain_id(),
                short_address(&endpoint.factory)
            );
        }
        println!("╠════════════════════════════════════════════════════════════╣");
        println!("║ MONITORING                                                 ║");
        println!("║ • Check Interval:  {:>36} min ║", self.check_interval_minutes);
        println!("║ • RPC Timeout:     {:>38} s ║", self.rpc_timeout_secs);
        println!("║ • Cooldown Sweep:  {:>36} min ║", self.cooldown_sweep_minutes);
        println!("╠════════════════════════════════════════════════════════════╣");
        println!("║ NOTIFICATIONS                                              ║");
        println!(
            "║ • Telegram Bot:    {:^40} ║",
            if self.telegram_bot_token.is_some() { "✓ Configured" } else { "✗ Log only" }
        );
        println!("║ • App URL:         {:^40} ║", self.app_url);
        println!("╚════════════════════════════════════════════════════════════╝");
    }
}

fn short_address(address: &Address) -> String {
    let s = format!("{:?}", address);
    format!("{}…{}", &s[..6], &s[s.len() - 4..])
}

impl Default for Config {
    fn default() -> Self {
        Self {
            chains: vec![],
            rpc_timeout_secs: 5,
            check_interval_minutes: 5,
            cooldown_sweep_minutes: 60,
            telegram_bot_token: None,
            app_url: "http://localhost:3000".to_string(),
        }
    }
}

// ============================================
// TESTS
// ============================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    fn base_endpoint() -> ChainEndpoint {
        let env = vars(&[("BASE_RPC_URL", "https://mainnet.base.org")]);
        ChainEndpoint::from_vars(Chain::Base, |k| env.get(k).cloned()).unwrap()
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.check_interval_minutes, 5);
        assert_eq!(config.check_interval(), Duration::from_secs(300));
        assert_eq!(config.rpc_timeout(), Duration::from_secs(5));
        assert_eq!(config.app_url, "http://localhost:3000");
        assert!(config.chains.is_empty());
    }

    #[test]
    fn test_endpoint_uses_default_contracts() {
        let endpoint = base_endpoint();
        let defaults = Chain::Base.default_contracts().unwrap();
        assert_eq!(endpoint.contracts(), defaults);
    }

    #[test]
    fn test_endpoint_overrides() {
        let env = vars(&[
            ("BSC_RPC_URL", "https://bsc-dataseed.binance.org"),
            ("BSC_FACTORY_ADDRESS", "0xdB1d10011AD0Ff90774D0C6Bb92e5C5c8b4461F7"),
            ("BSC_POSITION_MANAGER_ADDRESS", "0x7b8A01B39D58278b5DE7e48c8449c9f4F5170613"),
        ]);
        let endpoint = ChainEndpoint::from_vars(Chain::Bsc, |k| env.get(k).cloned()).unwrap();
        assert_eq!(
            endpoint.factory,
            Address::from_str("0xdB1d10011AD0Ff90774D0C6Bb92e5C5c8b4461F7").unwrap()
        );

        // No default deployment and no overrides: chain stays disabled
        let partial = vars(&[("BSC_RPC_URL", "https://bsc-dataseed.binance.org")]);
        assert!(ChainEndpoint::from_vars(Chain::Bsc, |k| partial.get(k).cloned()).is_none());
    }

    #[test]
    fn test_missing_rpc_disables_chain() {
        let env = vars(&[("BASE_RPC_URL", "  ")]);
        assert!(ChainEndpoint::from_vars(Chain::Base, |k| env.get(k).cloned()).is_none());
    }

    #[test]
    fn test_validate() {
        let mut config = Config::default();
        assert!(config.validate().is_err());

        config.chains.push(base_endpoint());
        assert!(config.validate().is_ok());

        config.check_interval_minutes = 0;
        assert!(config.validate().is_err());
        config.check_interval_minutes = 5;

        config.chains[0].rpc_url = "https://base-mainnet.g.alchemy.com/v2/YOUR_API_KEY".into();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_toml_roundtrip() {
        let mut config = Config::default();
        config.chains.push(base_endpoint());
        config.telegram_bot_token = Some("123:abc".into());

        let text = toml::to_string_pretty(&config).unwrap();
        let parsed: Config = toml::from_str(&text).unwrap();
        assert_eq!(parsed.chains, config.chains);
        assert_eq!(parsed.telegram_bot_token.as_deref(), Some("123:abc"));
    }
}
