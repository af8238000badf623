//! `safewalk` - CLI for community safety votes
//!
//! This binary records votes, reads per-location counts, and plans walking
//! routes from the command line.

#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing::debug;

use safewalk::cli::{
    Cli, Command, ConfigCommand, FeedbackCommand, ListCommand, RouteCommand, StatusCommand,
    VoteCommand,
};
use safewalk::feedback::AggregateResponse;
use safewalk::routing::plan_walk;
use safewalk::{
    init_logging, Aggregate, Classification, Config, FeedbackApi, LatLng, LocationKey,
    OpenRouteService, SessionCache, SqliteVoteStore, Verdict,
};

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbosity());

    let config = Config::load_from(cli.config.clone())?;

    match cli.command {
        Command::Vote(cmd) => handle_vote(&config, &cmd),
        Command::Feedback(cmd) => handle_feedback(&config, &cmd),
        Command::List(cmd) => handle_list(&config, &cmd),
        Command::Route(cmd) => handle_route(&config, &cmd),
        Command::Status(cmd) => handle_status(&config, &cmd),
        Command::Config(cmd) => handle_config(&config, cmd),
    }
}

fn open_store(config: &Config) -> anyhow::Result<Arc<SqliteVoteStore>> {
    let path = config.database_path();
    debug!("Opening vote store at {}", path.display());
    let store = SqliteVoteStore::open(&path)
        .with_context(|| format!("could not open vote store at {}", path.display()))?;
    Ok(Arc::new(store))
}

fn open_api(config: &Config) -> anyhow::Result<FeedbackApi> {
    Ok(FeedbackApi::new(open_store(config)?))
}

fn print_aggregate(key: &LocationKey, aggregate: Aggregate, json: bool) -> anyhow::Result<()> {
    let verdict = Verdict::of(&aggregate);
    if json {
        let body = serde_json::json!({
            "latlngKey": key,
            "counts": AggregateResponse::from(aggregate),
            "verdict": verdict,
        });
        println!("{}", serde_json::to_string_pretty(&body)?);
    } else {
        println!(
            "{key}: {} safe, {} unsafe ({verdict})",
            aggregate.safe_count, aggregate.unsafe_count
        );
    }
    Ok(())
}

fn handle_vote(config: &Config, cmd: &VoteCommand) -> anyhow::Result<()> {
    let api = open_api(config)?;
    let mut session = SessionCache::new();

    let aggregate = session.vote(&api, cmd.lat, cmd.lng, cmd.classification.into())?;
    let key = LatLng::new(cmd.lat, cmd.lng)?.key();
    print_aggregate(&key, aggregate, cmd.json)
}

fn handle_feedback(config: &Config, cmd: &FeedbackCommand) -> anyhow::Result<()> {
    let api = open_api(config)?;
    let key = LocationKey::parse(&cmd.key)?;

    let aggregate = match cmd.classification {
        Some(classification) => {
            let classification = Classification::from(classification);
            api.submit_vote_by_key(key.as_str(), classification.as_str())?
        }
        None => SessionCache::new().sync(&api, &key)?,
    };
    print_aggregate(&key, aggregate, cmd.json)
}

fn handle_list(config: &Config, cmd: &ListCommand) -> anyhow::Result<()> {
    let votes = open_api(config)?.list_all_votes()?;

    if cmd.json {
        println!("{}", serde_json::to_string_pretty(&votes)?);
        return Ok(());
    }

    if votes.is_empty() {
        println!("No votes recorded.");
        return Ok(());
    }

    println!("{:>6}  {:<24}  {:<7}  RECORDED", "ID", "LOCATION", "VOTE");
    for vote in &votes {
        let id = vote.id.map_or_else(|| "-".to_string(), |id| id.to_string());
        println!(
            "{id:>6}  {:<24}  {:<7}  {}",
            vote.location_key.as_str(),
            vote.classification.as_str(),
            vote.recorded_at.to_rfc3339()
        );
    }
    println!();
    println!("{} vote(s)", votes.len());
    Ok(())
}

fn handle_route(config: &Config, cmd: &RouteCommand) -> anyhow::Result<()> {
    let provider = OpenRouteService::new(&config.routing)?;
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("could not start async runtime")?;

    let route = runtime.block_on(plan_walk(&provider, cmd.from(), cmd.to()))?;

    if cmd.json {
        println!("{}", serde_json::to_string_pretty(&route)?);
        return Ok(());
    }

    println!("Walking route ({} points)", route.points.len());
    if let Some(distance) = route.distance_meters {
        println!("  Distance: {distance:.0} m");
    }
    if let Some(duration) = route.duration_seconds {
        println!("  Duration: {:.0} min", duration / 60.0);
    }
    for point in &route.points {
        println!("  {:.5},{:.5}", point.lat, point.lng);
    }
    Ok(())
}

fn handle_status(config: &Config, cmd: &StatusCommand) -> anyhow::Result<()> {
    let store = open_store(config)?;
    let stats = store.stats()?;

    if cmd.json {
        let status = serde_json::json!({
            "database_path": store.path(),
            "stats": stats,
        });
        println!("{}", serde_json::to_string_pretty(&status)?);
    } else {
        println!("safewalk status");
        println!("---------------");
        println!("Database:      {}", store.path().display());
        println!("Size:          {} bytes", stats.db_size_bytes);
        println!("Votes:         {}", stats.total_votes);
        println!("  Safe:        {}", stats.safe_votes);
        println!("  Unsafe:      {}", stats.unsafe_votes);
        println!("Locations:     {}", stats.distinct_keys);
        if let (Some(oldest), Some(newest)) = (stats.oldest_vote, stats.newest_vote) {
            println!("Oldest:        {}", oldest.to_rfc3339());
            println!("Newest:        {}", newest.to_rfc3339());
        }
    }
    Ok(())
}

fn handle_config(config: &Config, cmd: ConfigCommand) -> anyhow::Result<()> {
    match cmd {
        ConfigCommand::Show { json } => {
            if json {
                let mut shown = config.clone();
                if shown.routing.api_key.is_some() {
                    shown.routing.api_key = Some("<redacted>".to_string());
                }
                println!("{}", serde_json::to_string_pretty(&shown)?);
            } else {
                println!("Current Configuration");
                println!("=====================");
                println!();
                println!("[Storage]");
                println!("  Database path:  {}", config.database_path().display());
                println!();
                println!("[Routing]");
                println!("  Base URL:       {}", config.routing.base_url);
                println!(
                    "  API key:        {}",
                    if config.routing.api_key.is_some() {
                        "set"
                    } else {
                        "not set"
                    }
                );
                println!("  Timeout (s):    {}", config.routing.timeout_secs);
            }
        }
        ConfigCommand::Path => {
            println!("{}", Config::default_config_path().display());
        }
        ConfigCommand::Validate { file } => {
            let path = file.unwrap_or_else(Config::default_config_path);
            println!("Validating configuration: {}", path.display());
            match Config::load_from(Some(path)) {
                Ok(_) => println!("Configuration is valid."),
                Err(e) => println!("Configuration error: {e}"),
            }
        }
    }
    Ok(())
}
