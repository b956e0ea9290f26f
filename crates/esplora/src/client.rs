//! REST client for Esplora-compatible block explorers.

use crate::error::EsploraError;
use escrow_types::{
    AddressStats, AddressTx, BroadcastResult, EscrowError, FeeRecommendations, Network,
};
use reqwest::Client as HttpClient;
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Client for escrow address lookups, fee recommendations and broadcast.
#[derive(Clone)]
pub struct EsploraClient {
    base_url: String,
    client: HttpClient,
}

impl EsploraClient {
    /// Create a new client against `base_url` (for example `https://mempool.space/api`).
    pub fn new(base_url: impl Into<String>, timeout_secs: u64) -> Result<Self, EsploraError> {
        let client = HttpClient::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| EsploraError::Client(e.to_string()))?;

        let base_url = base_url.into().trim_end_matches('/').to_string();
        Ok(Self { base_url, client })
    }

    /// Client for the default public explorer of `network`.
    pub fn for_network(network: Network, timeout_secs: u64) -> Result<Self, EsploraError> {
        Self::new(Self::default_url(network), timeout_secs)
    }

    pub fn default_url(network: Network) -> &'static str {
        match network {
            Network::Mainnet => "https://mempool.space/api",
            Network::Testnet4 => "https://mempool.space/testnet4/api",
            Network::Signet => "https://mempool.space/signet/api",
            Network::Mutinynet => "https://mutinynet.com/api",
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Named fee tiers in sat/vB.
    ///
    /// Uses the mempool.space recommendation endpoint and falls back to
    /// the plain Esplora `/fee-estimates` targets when it is unavailable.
    pub async fn fee_recommendations(&self) -> Result<FeeRecommendations, EsploraError> {
        let url = format!("{}/v1/fees/recommended", self.base_url);

        match self.get_json::<FeeRecommendations>(&url).await {
            Ok(fees) => Ok(fees),
            Err(e) => {
                warn!(error = %e, "Fee recommendation endpoint failed, using fee-estimates");
                let targets = self.fee_estimates().await?;
                Ok(FeeRecommendations::from_targets(&targets))
            }
        }
    }

    /// Raw Esplora fee estimates (confirmation target -> sat/vB).
    pub async fn fee_estimates(&self) -> Result<HashMap<String, f64>, EsploraError> {
        let url = format!("{}/fee-estimates", self.base_url);
        self.get_json(&url).await
    }

    /// Funded and spent totals of `address`.
    pub async fn address_stats(&self, address: &str) -> Result<AddressStats, EsploraError> {
        let url = format!("{}/address/{}", self.base_url, address);
        self.get_json(&url).await
    }

    /// Confirmed balance of `address` in satoshis.
    pub async fn balance(&self, address: &str) -> Result<u64, EsploraError> {
        let stats = self.address_stats(address).await?;
        debug!(
            %address,
            confirmed = stats.confirmed_balance(),
            mempool = stats.mempool_balance(),
            "Address balance"
        );
        Ok(stats.confirmed_balance())
    }

    /// Txid of the transaction that funded an escrow address.
    ///
    /// An escrow address is funded once. No transactions, or more than one,
    /// is reported as `UnexpectedFundingCount`.
    pub async fn funding_txid(&self, address: &str) -> Result<String, EsploraError> {
        let url = format!("{}/address/{}/txs", self.base_url, address);
        let txs: Vec<AddressTx> = self.get_json(&url).await?;

        match txs.as_slice() {
            [tx] => {
                info!(%address, txid = %tx.txid, confirmed = tx.status.confirmed, "Found funding");
                Ok(tx.txid.clone())
            }
            _ => Err(EsploraError::UnexpectedFundingCount {
                address: address.to_string(),
                count: txs.len(),
            }),
        }
    }

    /// Broadcast a raw transaction.
    ///
    /// A non-success reply is returned as `BroadcastRejected` carrying the
    /// server's message verbatim.
    pub async fn broadcast(&self, tx_hex: &str) -> Result<BroadcastResult, EsploraError> {
        let url = format!("{}/tx", self.base_url);

        let response = self
            .client
            .post(&url)
            .body(tx_hex.trim().to_string())
            .send()
            .await
            .map_err(|e| EsploraError::Request {
                url: url.clone(),
                reason: e.to_string(),
            })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| EsploraError::Parse(format!("Failed to read broadcast reply: {}", e)))?;

        if !status.is_success() {
            warn!(status = status.as_u16(), reason = %body, "Broadcast rejected");
            return Err(EscrowError::BroadcastRejected(body).into());
        }

        // Response is just the txid as plain text
        let txid = body.trim().to_string();
        info!(%txid, "Transaction broadcast");
        Ok(BroadcastResult { txid })
    }

    async fn get_json<T>(&self, url: &str) -> Result<T, EsploraError>
    where
        T: serde::de::DeserializeOwned,
    {
        debug!(%url, "GET");
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| EsploraError::Request {
                url: url.to_string(),
                reason: e.to_string(),
            })?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(EsploraError::Api { status, body });
        }

        response
            .json::<T>()
            .await
            .map_err(|e| EsploraError::Parse(e.to_string()))
    }
}
