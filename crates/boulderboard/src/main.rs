//! `boulderboard` - CLI and web server for climbing competitions
//!
//! This binary runs the scoring server and gives staff terminal access to
//! competitors, results and the leaderboard.

#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

use std::path::PathBuf;

use anyhow::{bail, Context};
use clap::Parser;

use boulderboard::cli::{
    Cli, Command, CompetitorCommand, ConfigCommand, LeaderboardCommand, ResetCommand,
    ServeCommand,
};
use boulderboard::{
    build_leaderboard, init_logging, Category, Config, NewCompetitor, ScoringRules, Storage,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging based on verbosity
    init_logging(cli.verbosity());

    let config_path = cli.config;
    match cli.command {
        Command::Serve(serve_cmd) => handle_serve(load_config(config_path)?, serve_cmd).await,
        Command::Competitor(competitor_cmd) => {
            handle_competitor(&load_config(config_path)?, competitor_cmd)
        }
        Command::Leaderboard(leaderboard_cmd) => {
            handle_leaderboard(&load_config(config_path)?, &leaderboard_cmd)
        }
        Command::Reset(reset_cmd) => handle_reset(&load_config(config_path)?, &reset_cmd),
        Command::Status(status_cmd) => handle_status(&load_config(config_path)?, status_cmd.json),
        Command::Config(config_cmd) => handle_config(config_path, config_cmd),
    }
}

fn load_config(path: Option<PathBuf>) -> anyhow::Result<Config> {
    Config::load_from(path).context("failed to load configuration")
}

fn open_storage(config: &Config) -> anyhow::Result<Storage> {
    let path = config.database_path();
    Storage::open(&path).with_context(|| format!("failed to open database {}", path.display()))
}

async fn handle_serve(mut config: Config, cmd: ServeCommand) -> anyhow::Result<()> {
    if let Some(port) = cmd.port {
        config.server.port = port;
    }
    if let Some(host) = cmd.host {
        config.server.host = host;
    }
    config.validate()?;

    let storage = open_storage(&config)?;
    boulderboard::web::serve(&config, storage).await?;
    Ok(())
}

fn handle_competitor(config: &Config, cmd: CompetitorCommand) -> anyhow::Result<()> {
    let storage = open_storage(config)?;

    match cmd {
        CompetitorCommand::Add {
            name,
            number,
            category,
        } => {
            let new = NewCompetitor::new(number, &name, Category::from(category))?;
            let competitor = storage.create_competitor(&new)?;
            println!(
                "Registered {} as competitor #{} ({})",
                competitor.name,
                competitor.number,
                competitor.category.label()
            );
        }
        CompetitorCommand::List { json } => {
            let competitors = storage.list_competitors()?;
            if json {
                println!("{}", serde_json::to_string_pretty(&competitors)?);
            } else if competitors.is_empty() {
                println!("No competitors registered.");
            } else {
                println!("{:>6}  {:<30}  Category", "Number", "Name");
                for c in &competitors {
                    println!("{:>6}  {:<30}  {}", c.number, c.name, c.category.label());
                }
            }
        }
        CompetitorCommand::Show { number, json } => {
            let rules = ScoringRules::from(&config.scoring);
            let competitor = storage.require_competitor(number)?;
            let scores = storage.scores_for(number)?;
            let climbs = rules.scored_climbs(&scores);
            let total = rules.total_points(&scores);

            if json {
                let out = serde_json::json!({
                    "competitor": competitor,
                    "climbs": climbs,
                    "total_points": total,
                });
                println!("{}", serde_json::to_string_pretty(&out)?);
            } else {
                println!(
                    "#{} {} ({})",
                    competitor.number,
                    competitor.name,
                    competitor.category.label()
                );
                println!("Total points: {total}");
                println!();
                if climbs.is_empty() {
                    println!("No results yet.");
                }
                for climb in &climbs {
                    println!(
                        "  Climb {:>3}  attempts {:>2}  {:<6}  {} pts",
                        climb.climb_number,
                        climb.attempts,
                        if climb.topped { "top" } else { "-" },
                        climb.points
                    );
                }
            }
        }
        CompetitorCommand::Edit {
            number,
            name,
            category,
        } => {
            let existing = storage.require_competitor(number)?;
            let checked = NewCompetitor::new(
                Some(number),
                name.as_deref().unwrap_or(&existing.name),
                category.map_or(existing.category, Category::from),
            )?;
            storage.update_competitor(number, &checked.name, checked.category)?;
            println!(
                "Competitor #{number} is now {} ({})",
                checked.name,
                checked.category.label()
            );
        }
        CompetitorCommand::Remove { number } => {
            if !storage.delete_competitor(number)? {
                bail!("Competitor {number} not found");
            }
            println!("Competitor {number} and their scores have been deleted.");
        }
    }
    Ok(())
}

fn handle_leaderboard(config: &Config, cmd: &LeaderboardCommand) -> anyhow::Result<()> {
    let storage = open_storage(config)?;
    let rules = ScoringRules::from(&config.scoring);
    let competitors = storage.list_competitors()?;
    let scores = storage.all_scores()?;
    let board = build_leaderboard(
        &rules,
        &competitors,
        &scores,
        cmd.category.map(Category::from),
    );

    if cmd.json {
        println!("{}", serde_json::to_string_pretty(&board)?);
        return Ok(());
    }

    println!("Leaderboard: {}", board.category);
    println!();
    if board.rows.is_empty() {
        println!("No results yet.");
        return Ok(());
    }
    println!(
        "{:>4}  {:>6}  {:<30}  {:>7}  {:>4}  {:>8}",
        "Pos", "Number", "Name", "Points", "Tops", "Attempts"
    );
    for row in &board.rows {
        println!(
            "{:>4}  {:>6}  {:<30}  {:>7}  {:>4}  {:>8}",
            row.position,
            row.competitor_number,
            row.name,
            row.total_points,
            row.tops,
            row.attempts_on_tops
        );
    }
    Ok(())
}

fn handle_reset(config: &Config, cmd: &ResetCommand) -> anyhow::Result<()> {
    if !cmd.yes {
        println!("This deletes every competitor, result and section.");
        println!("Use --yes to confirm.");
        return Ok(());
    }

    let storage = open_storage(config)?;
    let summary = storage.delete_all()?;
    println!(
        "Deleted {} competitors, {} results, {} sections and {} section climbs.",
        summary.competitors, summary.scores, summary.sections, summary.section_climbs
    );
    Ok(())
}

fn handle_status(config: &Config, json: bool) -> anyhow::Result<()> {
    let storage = open_storage(config)?;
    let stats = storage.stats()?;
    let rules = ScoringRules::from(&config.scoring);
    let admin_enabled = config.admin.password.as_deref().is_some_and(|p| !p.is_empty());

    if json {
        let status = serde_json::json!({
            "database_path": storage.path(),
            "stats": stats,
            "climbs": rules.climb_numbers().count(),
            "count_best": rules.count_best(),
            "admin_enabled": admin_enabled,
        });
        println!("{}", serde_json::to_string_pretty(&status)?);
    } else {
        println!("boulderboard status");
        println!("-------------------");
        println!("Database:      {}", storage.path().display());
        println!("Size:          {} bytes", stats.db_size_bytes);
        println!("Competitors:   {}", stats.competitors);
        println!("Results:       {}", stats.scores);
        println!("Sections:      {}", stats.sections);
        println!("Climbs:        {}", rules.climb_numbers().count());
        println!(
            "Admin:         {}",
            if admin_enabled { "enabled" } else { "disabled" }
        );
    }
    Ok(())
}

fn handle_config(config_path: Option<PathBuf>, cmd: ConfigCommand) -> anyhow::Result<()> {
    match cmd {
        ConfigCommand::Show { json } => {
            let config = load_config(config_path)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&config)?);
            } else {
                println!("Current Configuration");
                println!("=====================");
                println!();
                println!("[Server]");
                println!("  Address:            {}:{}", config.server.host, config.server.port);
                println!();
                println!("[Storage]");
                println!("  Database path:      {}", config.database_path().display());
                println!();
                println!("[Scoring]");
                println!("  Climbs:             {}", config.scoring.climbs.len());
                println!("  Count best:         {}", config.scoring.count_best);
                println!(
                    "  Penalty cap:        {} attempts",
                    config.scoring.penalty_attempt_cap
                );
                println!("  Max attempts:       {}", config.scoring.max_attempts);
                println!();
                println!("[Admin]");
                println!(
                    "  Password:           {}",
                    if config.admin.password.is_some() {
                        "set"
                    } else {
                        "not set"
                    }
                );
            }
        }
        ConfigCommand::Path => {
            println!("{}", Config::default_config_path().display());
        }
        ConfigCommand::Validate { file } => {
            let path = file
                .or(config_path)
                .unwrap_or_else(Config::default_config_path);
            println!("Validating configuration: {}", path.display());
            match Config::load_from(Some(path)) {
                Ok(_) => println!("Configuration is valid."),
                Err(e) => bail!("Configuration error: {e}"),
            }
        }
    }
    Ok(())
}
