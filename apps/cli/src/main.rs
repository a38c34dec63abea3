#![deny(warnings)]

//! Headless driver: seeds a room from a country catalog, runs it and prints
//! per-country KPIs.

use anyhow::{Context, Result};
use persistence::SnapshotStore;
use sim_core::{CountryCatalog, CountryDefinition, EngineConfig, RoomName};
use sim_runtime::{
    BroadcastTransport, Collaborators, EconomyService, EngineEvent, OnlinePlayers, TradeBook,
};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast::error::RecvError;
use tracing::{info, warn, Level};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Default)]
struct Args {
    catalog: Option<PathBuf>,
    config: Option<PathBuf>,
    db: Option<String>,
    ticks: Option<u64>,
    room: Option<String>,
    live: bool,
}

fn parse_args() -> Args {
    let mut args = Args::default();
    let mut it = std::env::args().skip(1);
    while let Some(arg) = it.next() {
        match arg.as_str() {
            "--catalog" => args.catalog = it.next().map(PathBuf::from),
            "--config" => args.config = it.next().map(PathBuf::from),
            "--db" => args.db = it.next(),
            "--ticks" => args.ticks = it.next().and_then(|s| s.parse().ok()),
            "--room" => args.room = it.next(),
            "--live" => args.live = true,
            _ => {}
        }
    }
    args
}

fn load_catalog(path: &Path) -> Result<CountryCatalog> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("reading catalog {}", path.display()))?;
    let catalog = if path.extension().is_some_and(|e| e == "json") {
        serde_json::from_str(&raw)?
    } else {
        serde_yaml::from_str(&raw)?
    };
    Ok(catalog)
}

fn load_config(path: &Path) -> Result<EngineConfig> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("reading config {}", path.display()))?;
    Ok(serde_yaml::from_str(&raw)?)
}

fn default_catalog() -> CountryCatalog {
    let neutral = CountryDefinition::default();
    let indebted = CountryDefinition {
        gdp: Some(180.0),
        public_debt: Some(150.0),
        inflation: Some(0.07),
        interest_rate: Some(11.0),
        ..Default::default()
    };
    let exporter = CountryDefinition {
        gdp: Some(60.0),
        commodities: Some(55.0),
        manufactures: Some(15.0),
        services: Some(30.0),
        tax_burden: Some(30.0),
        ..Default::default()
    };
    [
        ("Aldoria".into(), neutral),
        ("Brennmark".into(), indebted),
        ("Castavia".into(), exporter),
    ]
    .into_iter()
    .collect()
}

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_max_level(Level::INFO)
        .init();

    let args = parse_args();
    info!(?args, build = env!("GIT_SHA"), "starting CLI");

    let config = match &args.config {
        Some(path) => load_config(path)?,
        None => EngineConfig::default(),
    };
    let catalog = match &args.catalog {
        Some(path) => load_catalog(path)?,
        None => default_catalog(),
    };
    let store = match &args.db {
        Some(url) => SnapshotStore::open(url).await?,
        None => SnapshotStore::memory(),
    };

    let online = Arc::new(OnlinePlayers::default());
    let transport = BroadcastTransport::default();
    let mut events = transport.subscribe();
    let notices = Arc::new(AtomicUsize::new(0));
    let counter = notices.clone();
    tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(EngineEvent::Notify { .. }) => {
                    counter.fetch_add(1, Ordering::Relaxed);
                }
                Ok(_) | Err(RecvError::Lagged(_)) => {}
                Err(RecvError::Closed) => break,
            }
        }
    });
    let service = EconomyService::new(
        config.clone(),
        Collaborators {
            presence: online.clone(),
            agreements: Arc::new(TradeBook::default()),
            transport: Arc::new(transport),
        },
        Some(store),
    )?;

    let room: RoomName = args.room.clone().unwrap_or_else(|| "cli".into()).into();
    service.initialize_room(room.clone(), &catalog).await?;
    for country in catalog.keys() {
        online.join(room.clone(), country.clone(), format!("cli-{country}").into());
    }

    let ticks = args.ticks.unwrap_or(config.monthly_period * 12);
    if args.live {
        service.start_persistence().await;
        service.start_room(&room).await?;
        tokio::time::sleep(Duration::from_millis(ticks * config.master_interval_ms)).await;
        service.stop_room(&room).await;
        service.stop_persistence().await;
    } else {
        let mut failures = 0;
        for _ in 0..ticks {
            if let Some(report) = service.tick_room(&room).await? {
                failures += report.failed.len();
            }
        }
        if failures > 0 {
            warn!(failures, "some country ticks were discarded");
        }
    }

    tokio::task::yield_now().await;
    let notices = notices.load(Ordering::Relaxed);

    let states = service.room_states(&room).await?;
    println!(
        "Room OK | room: {} | countries: {} | ticks: {} | notices: {}",
        room,
        states.len(),
        ticks,
        notices
    );
    for (country, s) in &states {
        println!(
            "KPI | {} | gdp: {:.2} | growth: {:.2}% | treasury: {:.2} | debt: {:.1}% | infl: {:.2}% | unemp: {:.1}% | pop: {:.1} | rating: {}{}",
            country,
            s.gdp,
            s.gdp_growth,
            s.treasury,
            s.debt_to_gdp() * 100.0,
            s.inflation * 100.0,
            s.unemployment,
            s.popularity,
            s.credit_rating,
            if s.debt_ceiling_locked { " (locked)" } else { "" }
        );
    }

    service.save_snapshot().await?;
    Ok(())
}
