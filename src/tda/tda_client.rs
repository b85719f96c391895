use anyhow::{anyhow, Context, Result};
use chrono::NaiveDate;
use rand::{distributions::Alphanumeric, Rng};
use reqwest::{header, Client, StatusCode};
use std::collections::HashMap;
use std::time::Duration;
use tokio_retry::strategy::ExponentialBackoff;
use tokio_retry::Retry;
use tracing::{debug, info};

use super::config::{self, AppSettings};
use super::models::{
    Account, AccountDetailResponse, AccountInfo, ChainResponse, OptionSide, Quote, Token,
};

// -----------------------------------------------
// CLIENT WRAPPER
// -----------------------------------------------
pub struct TdaClient {
    client: Client,
}

impl TdaClient {
    pub fn new() -> Result<Self> {
        Ok(Self {
            client: build_client()?,
        })
    }

    /// Generic retry fetch: backs off on throttling and server errors,
    /// fails straight through on client errors.
    async fn fetch_json(&self, url: &str, bearer: Option<&str>) -> Result<String> {
        let backoff = ExponentialBackoff::from_millis(config::RETRY_BASE_DELAY_MS)
            .factor(config::RETRY_FACTOR)
            .max_delay(Duration::from_secs(config::RETRY_MAX_DELAY_SECS))
            .take(config::RETRY_MAX_ATTEMPTS);

        Retry::spawn(backoff, || async {
            let mut request = self.client.get(url);
            if let Some(token) = bearer {
                request = request.bearer_auth(token);
            }

            let res = request.send().await.context("Request send failed")?;
            let status = res.status();

            if status.is_success() {
                res.text().await.context("Failed to read body")
            } else if status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
                anyhow::bail!("Retryable error: {status}")
            } else {
                let body = res.text().await.unwrap_or_default();
                let preview: String = body.chars().take(200).collect();
                anyhow::bail!("Client error {status}: {preview}")
            }
        })
        .await
    }

    // -----------------------------------------------
    // MARKET DATA
    // -----------------------------------------------

    pub async fn fetch_option_chain(
        &self,
        symbol: &str,
        api_key: &str,
        side: OptionSide,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<ChainResponse> {
        let url = config::chain_url(symbol, api_key, side, from, to);
        debug!(symbol, side = side.as_str(), "fetching option chain");

        let text = self.fetch_json(&url, None).await?;
        let chain: ChainResponse =
            serde_json::from_str(&text).context("Failed to parse option chain")?;

        Ok(chain)
    }

    /// The quote endpoint wraps the quote in a map keyed by symbol.
    pub async fn fetch_quote(&self, symbol: &str, api_key: &str) -> Result<Quote> {
        let url = config::quote_url(symbol, api_key);
        let text = self.fetch_json(&url, None).await?;

        let mut quotes: HashMap<String, Quote> =
            serde_json::from_str(&text).context("Failed to parse quote response")?;

        quotes
            .remove(symbol)
            .ok_or_else(|| anyhow!("Quote response is missing symbol {symbol}"))
    }

    // -----------------------------------------------
    // ACCOUNT DATA (bearer-authorized)
    // -----------------------------------------------

    pub async fn fetch_accounts(&self, access_token: &str) -> Result<Vec<Account>> {
        let text = self
            .fetch_json(&config::accounts_url(), Some(access_token))
            .await?;

        serde_json::from_str(&text).context("Failed to parse accounts response")
    }

    pub async fn fetch_account_info(
        &self,
        account_id: &str,
        access_token: &str,
    ) -> Result<AccountInfo> {
        let url = config::account_url(account_id);
        let text = self.fetch_json(&url, Some(access_token)).await?;

        let detail: AccountDetailResponse =
            serde_json::from_str(&text).context("Failed to parse account info")?;

        Ok(AccountInfo {
            cash_available_for_trading: detail
                .securities_account
                .current_balances
                .cash_available_for_trading,
        })
    }

    // -----------------------------------------------
    // OAUTH CODE EXCHANGE
    // -----------------------------------------------

    pub async fn exchange_code(&self, code: &str, settings: &AppSettings) -> Result<Token> {
        let client_id = settings.oauth_client_id();
        let params = [
            ("grant_type", "authorization_code"),
            ("access_type", "offline"),
            ("client_id", client_id.as_str()),
            ("redirect_uri", settings.redirect_url.as_str()),
            ("code", code),
        ];

        let res = self
            .client
            .post(config::TDA_TOKEN_URL)
            .form(&params)
            .send()
            .await
            .context("Token exchange request failed")?;

        let status = res.status();
        if !status.is_success() {
            let body = res.text().await.unwrap_or_default();
            let preview: String = body.chars().take(200).collect();
            anyhow::bail!("Token exchange failed ({status}): {preview}");
        }

        let token: Token = res.json().await.context("Failed to parse token response")?;
        info!("exchanged authorization code for access token");
        Ok(token)
    }
}

/// Authorization URL for the login button, with a fresh random state.
pub fn authorize_url(settings: &AppSettings) -> (String, String) {
    let state: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(16)
        .map(char::from)
        .collect();

    let url = format!(
        "{}?response_type=code&access_type=offline&client_id={}&redirect_uri={}&state={}",
        config::TDA_AUTH_URL,
        urlencoding::encode(&settings.oauth_client_id()),
        urlencoding::encode(&settings.redirect_url),
        urlencoding::encode(&state),
    );

    (url, state)
}

// -----------------------------------------------
// HTTP CLIENT BUILDER
// -----------------------------------------------
fn build_client() -> Result<Client> {
    let mut headers = header::HeaderMap::new();
    headers.insert(header::ACCEPT, header::HeaderValue::from_static("*/*"));

    Client::builder()
        .default_headers(headers)
        .cookie_store(true)
        .user_agent(config::USER_AGENT)
        .timeout(config::HTTP_TIMEOUT)
        .build()
        .context("Failed to build HTTP client")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings() -> AppSettings {
        AppSettings {
            client_id: "CLIENT123".to_string(),
            redirect_url: "https://localhost/oauth".to_string(),
            api_key: "CLIENT123".to_string(),
        }
    }

    #[test]
    fn test_authorize_url_carries_suffixed_client_id() {
        let (url, _) = authorize_url(&settings());
        assert!(url.starts_with("https://auth.tdameritrade.com/auth?"));
        assert!(url.contains("client_id=CLIENT123%40AMER.OAUTHAP"));
        assert!(url.contains("redirect_uri=https%3A%2F%2Flocalhost%2Foauth"));
    }

    #[test]
    fn test_authorize_url_state_is_fresh() {
        let (_, first) = authorize_url(&settings());
        let (_, second) = authorize_url(&settings());
        assert_eq!(first.len(), 16);
        assert_ne!(first, second);
    }
}
