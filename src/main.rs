use std::process::ExitCode;

use anyhow::{Context, Result, bail};
use skycast::models::SavedLocation;
use skycast::{
    Coordinates, ForecastClient, ForecastOrchestrator, ForecastSource, LocationStore,
    SkycastConfig, SkycastError, Store, UnitSystem, logging,
};
use tracing::info;

const USAGE: &str = "\
Usage:
  skycast weather <lat,lon> [metric|imperial|standard]
  skycast search <query>
  skycast save <query>
  skycast saved";

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            match e.downcast_ref::<SkycastError>() {
                Some(err) => eprintln!("{}", err.user_message()),
                None => eprintln!("Error: {e:#}"),
            }
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<()> {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let Some(command) = args.first() else {
        println!("{USAGE}");
        return Ok(());
    };

    let config = SkycastConfig::load()?;
    logging::init(&config.logging)?;
    info!("Skycast {} starting", skycast::VERSION);

    match command.as_str() {
        "weather" => weather(&config, &args[1..]),
        "search" => search(&config, &args[1..].join(" ")),
        "save" => save(&config, &args[1..].join(" ")),
        "saved" => saved(&config),
        other => bail!("Unknown command '{other}'\n{USAGE}"),
    }
}

fn weather(config: &SkycastConfig, args: &[String]) -> Result<()> {
    let Some(input) = args.first() else {
        bail!("Missing coordinates\n{USAGE}");
    };
    let coordinates = Coordinates::parse(input)?;
    let default_units = config.defaults.unit_system();
    let units = args
        .get(1)
        .map_or(default_units, |u| UnitSystem::parse_or(u, default_units));

    let store = Store::open(&config.cache.location)?;
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to start async runtime")?;
    let packet = runtime.block_on(async {
        let orchestrator = ForecastOrchestrator::from_config(config, &store).await?;
        orchestrator.fetch_weather(coordinates, units).await
    })?;

    let current = &packet.forecast.current;
    println!("{} ({})", packet.location_name, coordinates);
    println!(
        "  {} - {}, {:.1} (feels like {:.1}) [{}]",
        current.conditions.title,
        current.conditions.description,
        current.temperature,
        current.feels_like,
        units
    );
    println!(
        "  humidity {}%, pressure {} hPa, wind {:.1} from {:.0}°",
        current.humidity, current.pressure, current.wind_speed, current.wind_direction
    );
    for day in packet.forecast.daily.iter().take(5) {
        println!(
            "  {}  {:>6.1} / {:>6.1}  {}",
            day.conditions.time.format("%a %d.%m"),
            day.temperatures.min,
            day.temperatures.max,
            day.conditions.description
        );
    }
    println!(
        "  Photo by {} ({}), {}x{} px, from {:?}",
        packet.photo.photographer,
        packet.photo.page_url,
        packet.image.width(),
        packet.image.height(),
        packet.source
    );
    Ok(())
}

fn search(config: &SkycastConfig, query: &str) -> Result<()> {
    if query.trim().is_empty() {
        bail!("Missing search query\n{USAGE}");
    }
    let client = ForecastClient::new(&config.forecast)?;
    let candidates = client.search_locations(query)?;

    if candidates.is_empty() {
        println!("No locations found for '{query}'");
    }
    for candidate in candidates {
        println!(
            "{} ({}) at {}",
            candidate.name,
            candidate.country,
            candidate.coordinates()
        );
    }
    Ok(())
}

fn save(config: &SkycastConfig, query: &str) -> Result<()> {
    let client = ForecastClient::new(&config.forecast)?;
    let Some(candidate) = client.search_locations(query)?.into_iter().next() else {
        bail!("No locations found for '{query}'");
    };

    let store = Store::open(&config.cache.location)?;
    let location = SavedLocation::from(candidate);
    LocationStore::new(&store).add(location.clone())?;
    println!("Saved {} at {}", location.name, location.coordinates);
    Ok(())
}

fn saved(config: &SkycastConfig) -> Result<()> {
    let store = Store::open(&config.cache.location)?;
    let saved = LocationStore::new(&store).list()?;
    if saved.is_empty() {
        println!("No saved locations");
    }
    for location in saved {
        println!("{} ({}) at {}", location.name, location.country, location.coordinates);
    }
    Ok(())
}
