use crate::tda::config::{self, AppSettings, EngineConfig};
use crate::tda::models::{Contract, OptionSide, Quote};
use crate::tda::tda_client::{authorize_url, TdaClient};
use crate::tda::{flatten_chain, suggest};
use anyhow::{anyhow, Result};
use axum::{
    extract::{Query, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{Html, IntoResponse, Json, Redirect, Response},
    routing::get,
    Router,
};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use chrono::{Duration as ChronoDuration, Local};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use tower_http::cors::CorsLayer;
use tracing::{error, info, warn};

// -----------------------------------------------
// API REQUEST/RESPONSE MODELS
// -----------------------------------------------

#[derive(Debug, Deserialize)]
pub struct OverviewQuery {
    pub symbol: String,
}

#[derive(Debug, Deserialize)]
pub struct OauthQuery {
    pub code: String,
    #[serde(default)]
    pub state: String,
}

#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
    pub processing_time_ms: Option<u64>,
}

/// Everything the front page needs for one symbol: the quote, the cash
/// available to cover assignments, the full normalized PUT chain, and the
/// ranked suggestions.
#[derive(Debug, Serialize)]
pub struct OverviewResponse {
    pub quote: Quote,
    pub cash_available: f64,
    pub contracts: Vec<Contract>,
    pub suggestions: Vec<Contract>,
}

// -----------------------------------------------
// SESSION COOKIE
// -----------------------------------------------

const LOGIN_COOKIE: &str = "LOGIN";

/// Login state lives entirely in the cookie (no server-side store).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionData {
    #[serde(rename = "tda_account_id")]
    pub account_id: String,

    #[serde(rename = "access_token")]
    pub access_token: String,
}

fn encode_session(session: &SessionData) -> Result<String> {
    let bytes = serde_json::to_vec(session)?;
    Ok(BASE64.encode(bytes))
}

/// An absent, garbled, or truncated cookie all just mean "not logged in".
fn decode_session(headers: &HeaderMap) -> Option<SessionData> {
    let cookies = headers.get(header::COOKIE)?.to_str().ok()?;

    for pair in cookies.split(';') {
        if let Some((name, value)) = pair.trim().split_once('=') {
            if name == LOGIN_COOKIE {
                let bytes = BASE64.decode(value).ok()?;
                return serde_json::from_slice(&bytes).ok();
            }
        }
    }

    None
}

// -----------------------------------------------
// APPLICATION STATE
// -----------------------------------------------

#[derive(Clone)]
pub struct AppState {
    client: Arc<TdaClient>,
    settings: Arc<AppSettings>,
    engine: EngineConfig,
}

impl AppState {
    pub fn new(settings: AppSettings) -> Result<Self> {
        Ok(Self {
            client: Arc::new(TdaClient::new()?),
            settings: Arc::new(settings),
            engine: EngineConfig::default(),
        })
    }
}

// -----------------------------------------------
// API HANDLERS
// -----------------------------------------------

/// GET / - login status page
async fn main_page(State(app): State<AppState>, headers: HeaderMap) -> impl IntoResponse {
    // The body depends on the login state, so never let it cache.
    let mut response_headers = HeaderMap::new();
    response_headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-store"));

    let body = match decode_session(&headers) {
        Some(session) => {
            info!(account_id = %session.account_id, "authenticated visit");
            "<!DOCTYPE html>\n<div>Logged into TDA.</div>\n\
             <div>Try <code>/api/overview?symbol=MSFT</code></div>\n"
                .to_string()
        }
        None => {
            let (url, _state) = authorize_url(&app.settings);
            format!(
                "<!DOCTYPE html>\n<div>Not logged into TDA</div>\n\
                 <a href=\"{url}\"><button>Log in</button></a>\n"
            )
        }
    };

    (response_headers, Html(body))
}

/// GET /oauth?code=.. - authorization-code redirect target
async fn oauth_redirect(
    Query(query): Query<OauthQuery>,
    State(app): State<AppState>,
) -> Response {
    let cookie = match complete_login(&app, &query.code).await {
        Ok(cookie) => cookie,
        Err(e) => {
            error!(error = %e, "oauth code exchange failed");
            return (StatusCode::INTERNAL_SERVER_ERROR, "Internal Error").into_response();
        }
    };

    // Base64 payloads are always valid header values, but don't bet a
    // panic on it.
    match HeaderValue::from_str(&format!("{LOGIN_COOKIE}={cookie}; Path=/")) {
        Ok(value) => {
            let mut response = Redirect::to("/").into_response();
            response.headers_mut().insert(header::SET_COOKIE, value);
            response
        }
        Err(e) => {
            error!(error = %e, "session cookie is not a valid header value");
            (StatusCode::INTERNAL_SERVER_ERROR, "Internal Error").into_response()
        }
    }
}

async fn complete_login(app: &AppState, code: &str) -> Result<String> {
    let token = app.client.exchange_code(code, &app.settings).await?;

    let accounts = app.client.fetch_accounts(&token.access_token).await?;
    if accounts.len() > 1 {
        warn!(count = accounts.len(), "multiple accounts returned, using the first");
    }
    let account = accounts
        .first()
        .ok_or_else(|| anyhow!("No accounts linked to this login"))?;

    encode_session(&SessionData {
        account_id: account.securities_account.account_id.clone(),
        access_token: token.access_token,
    })
}

/// GET /api/overview?symbol=MSFT - quote + chain + ranked suggestions
async fn get_overview(
    Query(query): Query<OverviewQuery>,
    State(app): State<AppState>,
    headers: HeaderMap,
) -> (StatusCode, Json<ApiResponse<OverviewResponse>>) {
    let start_time = Instant::now();

    let Some(session) = decode_session(&headers) else {
        return (
            StatusCode::UNAUTHORIZED,
            Json(ApiResponse {
                success: false,
                data: None,
                error: Some("Not logged in".to_string()),
                processing_time_ms: Some(start_time.elapsed().as_millis() as u64),
            }),
        );
    };

    match build_overview(&app, &query.symbol, &session).await {
        Ok(data) => (
            StatusCode::OK,
            Json(ApiResponse {
                success: true,
                data: Some(data),
                error: None,
                processing_time_ms: Some(start_time.elapsed().as_millis() as u64),
            }),
        ),
        Err(e) => {
            error!(symbol = %query.symbol, error = %e, "overview failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ApiResponse {
                    success: false,
                    data: None,
                    error: Some(e.to_string()),
                    processing_time_ms: Some(start_time.elapsed().as_millis() as u64),
                }),
            )
        }
    }
}

async fn build_overview(
    app: &AppState,
    symbol: &str,
    session: &SessionData,
) -> Result<OverviewResponse> {
    let quote = app.client.fetch_quote(symbol, &app.settings.api_key).await?;

    let account = app
        .client
        .fetch_account_info(&session.account_id, &session.access_token)
        .await?;

    let today = Local::now().date_naive();
    let chain_response = app
        .client
        .fetch_option_chain(
            symbol,
            &app.settings.api_key,
            OptionSide::Put,
            today,
            today + ChronoDuration::days(config::CHAIN_WINDOW_DAYS),
        )
        .await?;

    let contracts = flatten_chain(&chain_response, OptionSide::Put, &app.engine)?;
    let suggestions = suggest(
        &chain_response,
        OptionSide::Put,
        account.cash_available_for_trading,
        quote.last_price,
        config::DEFAULT_SUGGESTION_COUNT,
        &app.engine,
    )?;

    info!(
        symbol,
        contracts = contracts.len(),
        suggestions = suggestions.len(),
        "overview built"
    );

    Ok(OverviewResponse {
        quote,
        cash_available: account.cash_available_for_trading,
        contracts,
        suggestions,
    })
}

// -----------------------------------------------
// SERVER SETUP
// -----------------------------------------------

pub async fn start_server(port: u16) -> Result<()> {
    let settings = AppSettings::from_env()?;
    let app_state = AppState::new(settings)?;

    let app = Router::new()
        .route("/", get(main_page))
        .route("/oauth", get(oauth_redirect))
        .route("/api/overview", get(get_overview))
        .layer(CorsLayer::permissive())
        .with_state(app_state);

    let addr = format!("127.0.0.1:{port}");
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    info!(%addr, "put-screener server listening");
    println!("Server running on http://{addr}");
    println!("Available endpoints:");
    println!("   GET  /");
    println!("   GET  /oauth?code=...");
    println!("   GET  /api/overview?symbol=MSFT");
    println!();

    axum::serve(listener, app).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_cookie_round_trip() {
        let session = SessionData {
            account_id: "123456789".to_string(),
            access_token: "token-abc".to_string(),
        };

        let encoded = encode_session(&session).unwrap();
        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            HeaderValue::from_str(&format!("other=1; {LOGIN_COOKIE}={encoded}")).unwrap(),
        );

        let decoded = decode_session(&headers).unwrap();
        assert_eq!(decoded.account_id, "123456789");
        assert_eq!(decoded.access_token, "token-abc");
    }

    #[test]
    fn test_garbled_cookie_means_logged_out() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            HeaderValue::from_static("LOGIN=not-base64!!!"),
        );
        assert!(decode_session(&headers).is_none());

        assert!(decode_session(&HeaderMap::new()).is_none());
    }
}
