use anyhow::Result;
use chrono::{Duration, Local};
use colored::Colorize;
use put_screener::api_server;
use put_screener::logging;
use put_screener::tda::config::{self, AppSettings, EngineConfig};
use put_screener::tda::{suggest, OptionSide, TdaClient};

/// Run API server mode
async fn run_server(port: u16) -> Result<()> {
    println!("{}", "=".repeat(60).blue());
    println!("{}", "Put Screener API Server".green().bold());
    println!("{}", "=".repeat(60).blue());
    println!();

    api_server::start_server(port).await
}

/// Fetch one symbol's chain and print the ranked suggestions. Uses the
/// API key only, so the budget comes from the environment instead of the
/// account balance.
async fn run_single(symbol: &str, budget: f64) -> Result<()> {
    println!("{}", "=".repeat(60).blue());
    println!("{}", "Put Screener Single Symbol".green().bold());
    println!("{}", "=".repeat(60).blue());
    println!();

    let settings = AppSettings::from_env()?;
    let client = TdaClient::new()?;
    let engine = EngineConfig::default();

    println!("{} Fetching quote for {}...", "→".cyan(), symbol.yellow());
    let quote = client.fetch_quote(symbol, &settings.api_key).await?;
    println!(
        "{} Last price: {:.2} ({})",
        "✓".green(),
        quote.last_price,
        quote.exchange
    );
    println!();

    println!("{} Fetching PUT chain...", "→".cyan());
    let today = Local::now().date_naive();
    let chain = client
        .fetch_option_chain(
            symbol,
            &settings.api_key,
            OptionSide::Put,
            today,
            today + Duration::days(config::CHAIN_WINDOW_DAYS),
        )
        .await?;

    let suggestions = suggest(
        &chain,
        OptionSide::Put,
        budget,
        quote.last_price,
        config::DEFAULT_SUGGESTION_COUNT,
        &engine,
    )?;

    println!("{}", "=".repeat(60).blue());
    println!("{}", "Suggestions".cyan().bold());
    println!("{}", "=".repeat(60).blue());
    println!("{} Budget: {:.2}", "ℹ".blue(), budget);

    if suggestions.is_empty() {
        println!("{} No eligible contracts found", "ℹ".blue());
    }
    for contract in &suggestions {
        println!(
            "{} {} strike {:.2} exp {} mark {:.2} ({} days, OI {})",
            "✓".green(),
            contract.symbol.yellow(),
            contract.strike_price,
            contract.expiration,
            contract.mark,
            contract.days_to_expiration,
            contract.open_interest,
        );
    }
    println!("{}", "=".repeat(60).blue());

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    logging::init_logging();

    let mode = config::get_execution_mode();

    match mode.as_str() {
        "server" => run_server(config::get_port()).await?,
        "single" => {
            run_single(&config::get_single_symbol(), config::get_single_budget()).await?
        }
        _ => {
            eprintln!("Invalid mode '{mode}'. Use 'server' or 'single'");
            eprintln!("Set SCREENER_MODE environment variable to control execution mode");
            eprintln!("Examples:");
            eprintln!("  SCREENER_MODE=server PORT=8080 cargo run");
            eprintln!("  SCREENER_MODE=single SCREENER_SYMBOL=MSFT SCREENER_BUDGET=10000 cargo run");
            std::process::exit(1);
        }
    }

    Ok(())
}
