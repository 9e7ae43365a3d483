use anyhow::{Result, anyhow};
use serde::Serialize;
use std::env;
use std::path::{Path, PathBuf};
use sui::Network;
use url::Url;
use zklogin::OAuthConfig;

pub const DEFAULT_PROVER_URL: &str = "https://prover-dev.mystenlabs.com/v1";
pub const DEFAULT_CALLBACK_PORT: u16 = 3000;
pub const DEFAULT_MAX_EPOCH_OFFSET: u64 = 2;

#[derive(Debug, Clone, Serialize)]
pub struct Config {
    pub network: String,
    #[serde(skip)]
    pub chain: Network,
    pub rpc_url: Option<String>,
    pub google_client_id: String,
    pub redirect_uri_local: String,
    pub redirect_uri: String,
    pub prover_url: String,
    pub mock_prover: bool,
    pub max_epoch_offset: u64,
    pub callback_port: u16,
    pub data_dir: PathBuf,
}

fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("sui-zklogin-wallet")
}

fn local_redirect(port: u16) -> String {
    format!("http://localhost:{}/callback", port)
}

impl Default for Config {
    fn default() -> Self {
        Self {
            network: Network::Testnet.to_string(),
            chain: Network::Testnet,
            rpc_url: None,
            google_client_id: String::new(),
            redirect_uri_local: local_redirect(DEFAULT_CALLBACK_PORT),
            redirect_uri: local_redirect(DEFAULT_CALLBACK_PORT),
            prover_url: DEFAULT_PROVER_URL.to_string(),
            mock_prover: false,
            max_epoch_offset: DEFAULT_MAX_EPOCH_OFFSET,
            callback_port: DEFAULT_CALLBACK_PORT,
            data_dir: default_data_dir(),
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        // Load .env file if it exists
        if Path::new(".env").exists() {
            dotenvy::dotenv().ok();
        }
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from an arbitrary variable source; unset keys keep their defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Config::default();
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(chain) = var("SUI_CHAIN") {
            config.set_chain(&chain)?;
        }
        if let Some(url) = var("SUI_RPC_URL") {
            config.rpc_url = Some(url);
        }
        if let Some(client_id) = var("GOOGLE_CLIENT_ID") {
            config.google_client_id = client_id;
        }
        if let Some(port) = var("WALLET_CALLBACK_PORT") {
            config.set_callback_port(port.parse()?);
        }
        if let Some(uri) = var("ZKLOGIN_REDIRECT_URI_LOCAL") {
            config.redirect_uri_local = uri;
        }
        if let Some(uri) = var("ZKLOGIN_REDIRECT_URI") {
            config.redirect_uri = uri;
        }
        if let Some(url) = var("ZKLOGIN_PROVER_URL") {
            config.prover_url = url;
        }
        if let Some(mock) = var("ZKLOGIN_MOCK_PROVER") {
            config.mock_prover = mock.parse()?;
        }
        if let Some(offset) = var("ZKLOGIN_MAX_EPOCH_OFFSET") {
            config.max_epoch_offset = offset.parse()?;
        }
        if let Some(dir) = var("WALLET_DATA_DIR") {
            config.data_dir = PathBuf::from(dir);
        }

        Ok(config)
    }

    pub fn set_chain(&mut self, chain: &str) -> Result<()> {
        self.chain = chain.parse()?;
        self.network = self.chain.to_string();
        Ok(())
    }

    /// Change the listener port, moving default redirect URIs along with it.
    pub fn set_callback_port(&mut self, port: u16) {
        let old = local_redirect(self.callback_port);
        if self.redirect_uri_local == old {
            self.redirect_uri_local = local_redirect(port);
        }
        if self.redirect_uri == old {
            self.redirect_uri = local_redirect(port);
        }
        self.callback_port = port;
    }

    pub fn rpc_url(&self) -> &str {
        self.rpc_url.as_deref().unwrap_or_else(|| self.chain.rpc_url())
    }

    pub fn oauth(&self) -> OAuthConfig {
        OAuthConfig {
            client_id: self.google_client_id.clone(),
            redirect_uri_local: self.redirect_uri_local.clone(),
            redirect_uri: self.redirect_uri.clone(),
        }
    }

    /// Origin the login is started from, the local callback listener.
    pub fn origin(&self) -> Result<Url> {
        Ok(Url::parse(&format!("http://localhost:{}", self.callback_port))?)
    }

    pub fn validate(&self) -> Result<()> {
        if self.mock_prover && !self.chain.allows_mock_prover() {
            return Err(anyhow!("ZKLOGIN_MOCK_PROVER cannot be used on mainnet"));
        }
        if self.max_epoch_offset == 0 {
            return Err(anyhow!("ZKLOGIN_MAX_EPOCH_OFFSET must be at least 1"));
        }
        Ok(())
    }

    /// Checks needed only before starting an OAuth login.
    pub fn validate_login(&self) -> Result<()> {
        self.validate()?;
        if self.google_client_id.is_empty() {
            return Err(anyhow!("GOOGLE_CLIENT_ID is not set"));
        }
        Ok(())
    }
}
