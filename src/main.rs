use std::error::Error;
use std::sync::Arc;

use chrono::NaiveDate;
use serde_json::{json, Value};
use tracing::{info, warn};

use vacancy::config::Config;
use vacancy::engine::{Engine, EngineError};
use vacancy::model::{Category, Holder};
use vacancy::notify::NotifyHub;

const USAGE: &str = "usage: vacancy <command>

commands:
  capacity <category> [<units>]              show or set a category's baseline
  check <category> <date> [<end>]            units left on a night, or on every night up to <end>
  book <category> <start> <end> [<name> <contact>]
  count <category>                           distinct nights stored for a category
  report                                     named bookings ordered by check-in date
  compact                                    rewrite the log as a snapshot

categories: double, twin, queen, king; dates are YYYY-MM-DD";

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    // stdout carries the command's JSON
    tracing_subscriber::fmt().with_writer(std::io::stderr).init();

    let config = Config::from_env();
    vacancy::observability::init(config.metrics_port)?;

    let args: Vec<String> = std::env::args().skip(1).collect();
    if args.is_empty() || matches!(args[0].as_str(), "-h" | "--help" | "help") {
        println!("{USAGE}");
        return Ok(());
    }

    std::fs::create_dir_all(&config.data_dir)?;
    let engine = Engine::new(config.wal_path(), Arc::new(NotifyHub::new()))?;
    apply_configured_capacities(&engine, &config).await;

    let output = run(&engine, &args).await?;
    println!("{}", serde_json::to_string_pretty(&output)?);

    if engine.compact_if_due(config.compact_threshold).await? {
        info!("compacted {}", config.wal_path().display());
    }
    Ok(())
}

/// Push `VACANCY_CAPACITY_*` values into the engine. Values already in effect
/// are skipped so restarts don't grow the log.
async fn apply_configured_capacities(engine: &Engine, config: &Config) {
    for category in Category::ALL {
        let Some(units) = config.capacity(category) else {
            continue;
        };
        if engine.capacity(category).await.map(i64::from) == Some(units) {
            continue;
        }
        if let Err(e) = engine.set_capacity(category, units).await {
            warn!(%category, units, "ignoring configured capacity: {e}");
        }
    }
}

async fn run(engine: &Engine, args: &[String]) -> Result<Value, Box<dyn Error>> {
    let command = args[0].as_str();
    let rest = &args[1..];
    match (command, rest) {
        ("capacity", [category]) => {
            let category: Category = category.parse()?;
            let capacity = engine.capacity(category).await;
            Ok(json!({ "category": category.as_str(), "capacity": capacity }))
        }
        ("capacity", [category, units]) => {
            let category: Category = category.parse()?;
            let units: i64 = units.parse()?;
            let units = engine.set_capacity(category, units).await?;
            Ok(json!({ "category": category.as_str(), "capacity": units }))
        }
        ("check", [category, date]) => {
            let category: Category = category.parse()?;
            let date = parse_date(date)?;
            let available = engine.check_availability(category, date).await;
            Ok(json!({
                "category": category.as_str(),
                "date": date,
                "available": available,
            }))
        }
        ("check", [category, start, end]) => {
            let category: Category = category.parse()?;
            let (start, end) = (parse_date(start)?, parse_date(end)?);
            let nights: Vec<Value> = engine
                .availability_range(category, start, end)
                .await
                .into_iter()
                .map(|(date, available)| json!({ "date": date, "available": available }))
                .collect();
            Ok(json!({ "category": category.as_str(), "nights": nights }))
        }
        ("book", [category, start, end, holder @ ..]) if holder.is_empty() || holder.len() == 2 => {
            let category: Category = category.parse()?;
            let (start, end) = (parse_date(start)?, parse_date(end)?);
            let holder = match holder {
                [name, contact] => Some(Holder::new(name.as_str(), contact.as_str())),
                _ => None,
            };
            match engine.book_stay(category, start, end, holder).await {
                Ok(id) => Ok(json!({
                    "confirmed": true,
                    "id": id.to_string(),
                    "category": category.as_str(),
                    "start": start,
                    "end": end,
                })),
                Err(EngineError::Rejected(reason)) => Ok(json!({
                    "confirmed": false,
                    "category": category.as_str(),
                    "reason": reason.to_string(),
                })),
                Err(e) => Err(e.into()),
            }
        }
        ("count", [category]) => {
            let category: Category = category.parse()?;
            let nights = engine.num_bookings(category).await;
            Ok(json!({ "category": category.as_str(), "nights": nights }))
        }
        ("report", []) => {
            let records = engine.bookings_by_date().await;
            Ok(serde_json::to_value(records)?)
        }
        ("compact", []) => {
            engine.compact_wal().await?;
            Ok(json!({ "compacted": true }))
        }
        _ => Err(format!("unrecognized arguments: {}\n\n{USAGE}", args.join(" ")).into()),
    }
}

fn parse_date(s: &str) -> Result<NaiveDate, Box<dyn Error>> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").map_err(|e| format!("bad date {s:?}: {e}").into())
}
