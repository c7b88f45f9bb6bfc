use std::{path::PathBuf, process::ExitCode, sync::Arc};

use chrono::NaiveDate;
use clap::Parser;
use reservation_aggregator::{
    adapters::EnvTokenProvider,
    aggregator::ReservationAggregator,
    config::AggregatorConfig,
    entities::{FilterState, PropertyFilter, Reservation, ReservationView, SortBy, ViewStatus},
};
use serde_json::{json, Value};
use tracing::level_filters::LevelFilter;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "reservations")]
#[command(about = "Fetch, join and filter reservations for one view")]
struct Cli {
    /// RON config file; defaults apply when omitted
    #[arg(long, short)]
    config: Option<PathBuf>,

    /// Property id, or `all`
    #[arg(long, default_value = "all")]
    property: PropertyFilter,

    /// Keep reservations arriving on or after this day (YYYY-MM-DD)
    #[arg(long)]
    start_date: Option<NaiveDate>,

    /// Keep reservations arriving on or before this day (YYYY-MM-DD)
    #[arg(long)]
    end_date: Option<NaiveDate>,

    /// `date` or `revenue`
    #[arg(long, default_value = "date")]
    sort: SortBy,

    /// Fetch again after the first view, skipping whatever was cached
    #[arg(long)]
    refresh: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .from_env_lossy(),
        )
        .init();

    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => match AggregatorConfig::from_file(path) {
            Ok(config) => config,
            Err(e) => {
                tracing::error!(error = %e, "failed to load config");
                return ExitCode::FAILURE;
            }
        },
        None => AggregatorConfig::default(),
    }
    .with_env_overrides();

    let token_provider = Arc::new(EnvTokenProvider::new(config.token_env_var.clone()));
    let aggregator = match ReservationAggregator::new(config, token_provider) {
        Ok(aggregator) => aggregator,
        Err(e) => {
            tracing::error!(error = %e, "failed to build aggregator");
            return ExitCode::FAILURE;
        }
    };

    let filter = FilterState {
        property_filter: cli.property,
        start_date: cli.start_date,
        end_date: cli.end_date,
        sort_by: cli.sort,
    };
    let mut view = aggregator.load_view(filter).await;
    if cli.refresh {
        view = aggregator.refresh().await;
    }
    aggregator.dispose();

    println!("{:#}", view_json(&view));
    if view.status.error().is_some() {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}

fn view_json(view: &ReservationView) -> Value {
    let status = match &view.status {
        ViewStatus::Idle => "idle",
        ViewStatus::Loading => "loading",
        ViewStatus::Cached => "cached",
        ViewStatus::Fresh => "fresh",
        ViewStatus::Stale(_) => "stale",
        ViewStatus::Failed(_) => "failed",
    };
    json!({
        "status": status,
        "error": view.status.error().map(|e| e.to_string()),
        "reauthenticate": view.status.error().is_some_and(|e| e.is_unauthenticated()),
        "truncated": view.truncated,
        "summary": {
            "reservations": view.summary.reservation_count,
            "nights": view.summary.total_nights,
            "ownerPayout": view.summary.totals.owner_payout,
            "totalPrice": view.summary.totals.total_price,
            "averageNightlyPayout": view.summary.average_nightly_payout(),
            "missingFinancialData": view.summary.missing_financial_data,
        },
        "reservations": view.reservations.iter().map(reservation_json).collect::<Vec<_>>(),
    })
}

fn reservation_json(r: &Reservation) -> Value {
    json!({
        "id": r.id,
        "propertyId": r.property_id,
        "guestName": r.guest_name,
        "arrivalDate": r.arrival_date.map(|d| d.to_string()),
        "departureDate": r.departure_date.map(|d| d.to_string()),
        "nights": r.nights,
        "status": r.status.as_str(),
        "channel": r.channel.as_str(),
        "ownerPayout": r.financials.owner_payout,
        "totalPrice": r.financials.total_price,
        "hasFinancialData": r.financial_data.is_some(),
    })
}
