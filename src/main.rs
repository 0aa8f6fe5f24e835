// src/main.rs

use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing::info;

use currency_lens::core::clock::{Clock, SystemClock};
use currency_lens::core::format::{age_label, summary_label};
use currency_lens::core::rates::RateStore;
use currency_lens::core::session::{
    ConversionSession, ConversionView, CurrencyPrompt, DismissReason, Presenter, SameCurrencyView,
    SessionOutcome,
};
use currency_lens::shared::settings::Settings;
use currency_lens::shared::types::CurrencyCode;
use currency_lens::{AppResult, HttpRateProvider};

#[derive(Parser)]
#[command(name = "currency-lens")]
#[command(author, version, about = "Detect prices in text and convert them to your currency", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Detect a price in TEXT and convert it to the target currency
    Convert {
        text: String,
        /// Source currency for bare amounts such as "42"
        #[arg(short, long)]
        from: Option<CurrencyCode>,
    },
    /// List cached exchange rates
    Rates,
    /// Re-fetch every cached rate
    Refresh,
    /// Drop every cached rate
    ClearCache,
    /// Show or change settings
    Settings {
        #[arg(short, long)]
        target: Option<CurrencyCode>,
        #[arg(long)]
        auto_detect: Option<bool>,
        /// Rate provider URL; empty restores the default
        #[arg(long)]
        api_url: Option<String>,
    },
}

/// Prints overlays to stdout.
struct ConsolePresenter;

impl ConsolePresenter {
    fn print_conversion(view: &ConversionView) {
        println!("{} = {}", view.original_label, view.converted_label);
        let provenance = view
            .provenance
            .map(|p| p.to_string())
            .unwrap_or_else(|| "unknown".to_string());
        println!("{} ({}, updated {})", view.rate_label, provenance, view.age_label);
    }
}

impl Presenter for ConsolePresenter {
    fn show_conversion(&self, view: &ConversionView) -> AppResult<()> {
        Self::print_conversion(view);
        Ok(())
    }

    fn update_conversion(&self, view: &ConversionView) -> AppResult<()> {
        Self::print_conversion(view);
        Ok(())
    }

    fn show_same_currency(&self, view: &SameCurrencyView) -> AppResult<()> {
        println!("{}", view.label);
        Ok(())
    }

    fn show_currency_selector(&self, prompt: &CurrencyPrompt) -> AppResult<()> {
        let choices: Vec<&str> = prompt.choices.iter().map(|c| c.as_str()).collect();
        println!(
            "Found {} but no currency. Pass --from with one of: {}",
            prompt.amount,
            choices.join(", ")
        );
        Ok(())
    }

    fn hide(&self) {}
}

#[tokio::main]
async fn main() -> AppResult<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let settings = Settings::load().await?;
    let store = RateStore::open_default()?;

    let session = ConversionSession::new(
        settings.clone(),
        Arc::new(HttpRateProvider::new()?),
        Arc::new(SystemClock),
        Arc::new(ConsolePresenter),
    );
    let restored = session.restore_cache(store.load()?).await;
    info!("Restored {} cached rates", restored);

    match cli.command {
        Commands::Convert { text, from } => {
            let outcome = session.handle_selection(&text).await;
            match (outcome, from) {
                (SessionOutcome::AwaitingCurrencyChoice(_), Some(code)) => {
                    session.choose_source_currency(code).await;
                }
                (SessionOutcome::NothingDetected, _) => println!("No price found in {:?}", text),
                _ => {}
            }
            session.dismiss(DismissReason::Close);
        }
        Commands::Rates => {
            let snapshot = session.cache_snapshot().await;
            println!("{}", summary_label(session.cache_summary().await.as_ref()));
            let now = SystemClock.now();
            for (key, entry) in &snapshot {
                println!(
                    "  {:<10} {:>14} {:<8} {}",
                    key,
                    entry.rate,
                    entry.provenance.to_string(),
                    age_label(entry.age(now))
                );
            }
            return Ok(());
        }
        Commands::Refresh => {
            let report = session.refresh_all().await;
            println!("Refreshed {}/{} exchange rates", report.refreshed, report.total);
        }
        Commands::ClearCache => {
            session.clear_cache().await;
            store.clear()?;
            println!("Rate cache cleared");
            return Ok(());
        }
        Commands::Settings { target, auto_detect, api_url } => {
            if target.is_none() && auto_detect.is_none() && api_url.is_none() {
                println!("{}", serde_json::to_string_pretty(&settings)?);
                return Ok(());
            }

            let updated = Settings {
                target_currency: target.unwrap_or(settings.target_currency),
                auto_detect_source: auto_detect.unwrap_or(settings.auto_detect_source),
                api_url: api_url.unwrap_or(settings.api_url),
            }
            .normalized();
            updated.save().await?;

            let report = session.apply_settings(updated).await;
            println!("Settings saved; refreshed {}/{} exchange rates", report.refreshed, report.total);
        }
    }

    store.save(&session.cache_snapshot().await)?;
    Ok(())
}
