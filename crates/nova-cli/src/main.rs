//! Nova CLI - drive the agent core against a simulated world.
//!
//! Loads an agent configuration and a world scenario (both YAML), runs one
//! skill operation and prints the outcome:
//! - `nova goto 10 64 -3` - walk to a point
//! - `nova mine coal_ore --count 4` - mine nearby blocks
//! - `nova craft crafting_table` - craft through the ingredient chain
//! - `nova sleep` - sleep in the nearest bed
//! - `nova --json smelt raw_iron --count 8` - machine-readable output

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use serde_json::{json, Value};
use tracing_subscriber::{fmt, EnvFilter};

use nova::core::{AgentConfig, Inventory, SharedWorld, Vec3, WorldInterface};
use nova::sim::{Scenario, SimWorld};
use nova::Agent;

#[derive(Parser)]
#[command(name = "nova")]
#[command(about = "Autonomous block-world agent", version)]
struct Cli {
    /// Agent configuration (YAML); defaults apply when missing
    #[arg(short, long, global = true, default_value = "nova.yaml")]
    config: PathBuf,

    /// World scenario (YAML); an empty flat world when omitted
    #[arg(short, long, global = true)]
    scenario: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Print the outcome as JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Walk to a point
    Goto {
        x: f64,
        y: f64,
        z: f64,

        /// Arrival tolerance in blocks
        #[arg(long, default_value_t = 1.0)]
        range: f64,
    },

    /// Mine nearby blocks of one kind
    Mine {
        block: String,

        #[arg(long, default_value_t = 1)]
        count: u32,
    },

    /// Dig a two-high tunnel along the agent's heading
    Strip { length: u32 },

    /// Mine one block of each ore kind in range
    Ores {
        #[arg(long)]
        max: Option<u32>,
    },

    /// Craft an item, resolving its ingredients
    Craft {
        item: String,

        #[arg(long, default_value_t = 1)]
        count: u32,
    },

    /// Smelt items in a nearby furnace
    Smelt {
        item: String,

        #[arg(long, default_value_t = 1)]
        count: u32,
    },

    /// Run from nearby hostile mobs
    Flee,

    /// Eat the best food on hand
    Eat,

    /// Put on the best armor on hand
    Armor,

    /// Sleep in the nearest bed
    Sleep,
}

impl Commands {
    fn name(&self) -> &'static str {
        match self {
            Commands::Goto { .. } => "goto",
            Commands::Mine { .. } => "mine",
            Commands::Strip { .. } => "strip",
            Commands::Ores { .. } => "ores",
            Commands::Craft { .. } => "craft",
            Commands::Smelt { .. } => "smelt",
            Commands::Flee => "flee",
            Commands::Eat => "eat",
            Commands::Armor => "armor",
            Commands::Sleep => "sleep",
        }
    }
}

/// What one command did, printed as a line or as JSON.
#[derive(Serialize)]
struct Outcome {
    command: &'static str,
    ok: bool,
    summary: String,
    detail: Value,
    position: Vec3,
    inventory: Inventory,
    world_calls: usize,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let config = AgentConfig::load_or_default(&cli.config)?;
    let scenario = load_scenario(cli.scenario.as_deref())?;

    let world = SimWorld::new(scenario);
    let shared: SharedWorld = Arc::new(world.clone());
    let agent = Agent::new(shared, config);

    tracing::info!(command = cli.command.name(), "running");
    let outcome = run(&agent, &world, cli.command).await?;

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
    } else {
        let status = if outcome.ok { "ok" } else { "failed" };
        println!("{} {}: {}", outcome.command, status, outcome.summary);
        println!(
            "  position: {:.1} {:.1} {:.1}, world calls: {}",
            outcome.position.x, outcome.position.y, outcome.position.z, outcome.world_calls
        );
    }

    if outcome.ok {
        Ok(())
    } else {
        std::process::exit(1)
    }
}

fn load_scenario(path: Option<&Path>) -> Result<Scenario> {
    match path {
        Some(path) => Scenario::load(path)
            .with_context(|| format!("Failed to load scenario {}", path.display())),
        None => Ok(Scenario::default().with_ground(-1, "stone", 32)),
    }
}

async fn run(agent: &Agent, world: &SimWorld, command: Commands) -> Result<Outcome> {
    let name = command.name();
    let (ok, summary, detail) = match command {
        Commands::Goto { x, y, z, range } => {
            let reached = agent.pathfinding.goto(Vec3::new(x, y, z), range).await;
            let summary = if reached {
                format!("reached {x} {y} {z}")
            } else {
                format!("could not reach {x} {y} {z}")
            };
            (reached, summary, json!({ "reached": reached }))
        }
        Commands::Mine { block, count } => {
            let mined = agent.mining.mine_blocks(&block, count, true).await;
            (
                mined > 0 || count == 0,
                format!("mined {mined}/{count} {block}"),
                json!({ "block": block, "mined": mined, "requested": count }),
            )
        }
        Commands::Strip { length } => {
            let report = agent.mining.strip_mine(length).await;
            (
                true,
                format!("{} steps, {} blocks mined", report.steps, report.mined),
                serde_json::to_value(report)?,
            )
        }
        Commands::Ores { max } => {
            let max = max.unwrap_or(agent.config().mining.ore_max_blocks);
            let mined = agent.mining.mine_ores(max).await;
            (
                true,
                format!("mined {mined} ore blocks"),
                json!({ "mined": mined, "max": max }),
            )
        }
        Commands::Craft { item, count } => match agent.crafter.craft(&item, count).await {
            Ok(report) => {
                let summary = if report.was_on_hand() {
                    format!("{count} {} already on hand", report.item)
                } else {
                    let steps: Vec<String> = report
                        .steps
                        .iter()
                        .map(|s| format!("{} x{}", s.item, s.operations))
                        .collect();
                    format!("crafted {}", steps.join(" -> "))
                };
                (true, summary, serde_json::to_value(&report)?)
            }
            Err(err) => (
                false,
                err.to_string(),
                json!({ "error": err.to_string(), "missing": err.missing_item() }),
            ),
        },
        Commands::Smelt { item, count } => match agent.crafter.smelt(&item, count).await {
            Ok(taken) => (
                true,
                format!("smelted {count} {item}, took {taken}"),
                json!({ "input": item, "count": count, "taken": taken }),
            ),
            Err(err) => (false, err.to_string(), json!({ "error": err.to_string() })),
        },
        Commands::Flee => {
            let fled = agent.combat.flee().await;
            let summary = if fled {
                "escaped".to_string()
            } else {
                "nothing to flee from".to_string()
            };
            (fled, summary, json!({ "fled": fled }))
        }
        Commands::Eat => {
            let ate = agent.survival.eat().await;
            let vitals = agent.survival.vitals();
            let summary = if ate {
                format!("ate, food now {}", vitals.food)
            } else {
                "nothing eaten".to_string()
            };
            (ate, summary, json!({ "ate": ate, "vitals": vitals }))
        }
        Commands::Armor => {
            let equipped = agent.survival.equip_armor().await;
            (
                true,
                format!("equipped {equipped} armor pieces"),
                json!({ "equipped": equipped }),
            )
        }
        Commands::Sleep => {
            let slept = agent.survival.sleep().await;
            let summary = if slept {
                "sleeping".to_string()
            } else {
                "could not sleep".to_string()
            };
            (slept, summary, json!({ "slept": slept }))
        }
    };

    let calls = world.calls();
    tracing::debug!(
        actuations = calls.iter().filter(|c| c.is_actuation()).count(),
        "world calls issued"
    );

    Ok(Outcome {
        command: name,
        ok,
        summary,
        detail,
        position: world.position(),
        inventory: world.inventory(),
        world_calls: calls.len(),
    })
}
