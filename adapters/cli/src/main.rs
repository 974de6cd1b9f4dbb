#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Command-line adapter that drives a scripted skirmish through the authority
//! and checks that synchronizing consumers converge on its state.

mod script;

use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{bail, ensure, Context, Result};
use clap::{Args, Parser, Subcommand};
use skirmish_core::{catalog::demo_battle, ActionRequest, BattleId, BattlePhase, PlayerId};
use skirmish_replication::{Authority, ConnectionState, LoopbackLink, SkirmishConfig, SyncClient};
use skirmish_world::query;
use tracing_subscriber::EnvFilter;

use crate::script::ScriptStep;

const BATTLE_ID: BattleId = BattleId::new(1);

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Log level used when RUST_LOG is unset (error, warn, info, debug, trace)
    #[arg(long, global = true, default_value = "info")]
    log_level: String,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Play a JSON script of `{ "player", "action" }` steps on the demo battlefield
    Run {
        /// Path to the script
        #[arg(long)]
        script: PathBuf,

        #[command(flatten)]
        options: RunOptions,
    },
    /// Play the built-in demo script
    Demo {
        #[command(flatten)]
        options: RunOptions,
    },
}

#[derive(Args, Debug)]
struct RunOptions {
    /// TOML file overriding authority and sync settings
    #[arg(long)]
    config: Option<PathBuf>,

    /// Write the committed delta log to this JSON file
    #[arg(long)]
    export: Option<PathBuf>,
}

/// Entry point for the skirmish command-line interface.
fn main() -> Result<()> {
    let cli = Cli::parse();
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let (steps, options) = match cli.command {
        Command::Run { script, options } => (script::load(&script)?, options),
        Command::Demo { options } => (script::demo(), options),
    };
    let config = match &options.config {
        Some(path) => load_config(path)?,
        None => SkirmishConfig::default(),
    };

    let authority = play(&steps, config)?;
    if let Some(path) = &options.export {
        let json = serde_json::to_string_pretty(authority.log().deltas())
            .context("failed to encode delta log")?;
        fs::write(path, json)
            .with_context(|| format!("failed to write delta log to {}", path.display()))?;
        tracing::info!(path = %path.display(), "exported delta log");
    }
    print_summary(&authority);
    Ok(())
}

fn load_config(path: &Path) -> Result<SkirmishConfig> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("failed to read config {}", path.display()))?;
    toml::from_str(&text).with_context(|| format!("failed to parse config {}", path.display()))
}

fn access_token(player_id: PlayerId) -> String {
    format!("player-{player_id}")
}

/// Submits every step through the wire path while one consumer follows along
/// commit by commit; a second consumer joins at the end and must catch up.
fn play(steps: &[ScriptStep], config: SkirmishConfig) -> Result<Authority> {
    let mut authority = Authority::new(BATTLE_ID, config.authority, demo_battle());
    let players: Vec<PlayerId> = query::players(authority.battle())
        .iter()
        .map(|player| player.id)
        .collect();
    let Some(&observer) = players.first() else {
        bail!("battle has no players");
    };
    for &player_id in &players {
        let _ = authority.open_session(access_token(player_id), player_id);
    }

    let mut follower = SyncClient::new(access_token(observer), BATTLE_ID, config.sync);
    let mut rejected = 0_usize;
    for (index, step) in steps.iter().enumerate() {
        let request = ActionRequest {
            access_token: access_token(step.player),
            action: step.action.clone(),
        };
        match authority.handle_action(&request) {
            Ok(response) => tracing::debug!(
                step = index,
                previous_head = response.previous_head,
                deltas = response.deltas.len(),
                "committed"
            ),
            Err(error) => {
                rejected += 1;
                tracing::warn!(step = index, player = %step.player, %error, "step rejected");
            }
        }

        let state = follower.poll(&mut LoopbackLink::new(&authority));
        ensure!(
            state == ConnectionState::Connected,
            "follower lost the authority: {state:?}"
        );
        narrate(&mut follower);
    }

    let mut late = SyncClient::new(access_token(observer), BATTLE_ID, config.sync);
    while late.replica().head() < authority.log().head() {
        let state = late.poll(&mut LoopbackLink::new(&authority));
        ensure!(
            state == ConnectionState::Connected,
            "late joiner lost the authority: {state:?}"
        );
        narrate(&mut late);
    }

    let expected = authority.snapshot();
    ensure!(
        query::snapshot(follower.replica().battle()) == expected,
        "follower diverged from the authority"
    );
    ensure!(
        query::snapshot(late.replica().battle()) == expected,
        "late joiner diverged from the authority"
    );
    tracing::info!(
        steps = steps.len(),
        rejected,
        head = authority.log().head(),
        "consumers converged"
    );
    Ok(authority)
}

fn narrate(client: &mut SyncClient) {
    while let Some(delta) = client.replica_mut().next_playback() {
        tracing::trace!(kind = delta.type_tag(), "playback");
    }
}

fn print_summary(authority: &Authority) {
    let battle = authority.battle();
    let outcome = match (query::phase(battle), query::winner(battle)) {
        (BattlePhase::Finished, Some(winner)) => format!("won by player {winner}"),
        (BattlePhase::Finished, None) => "drawn".to_owned(),
        _ => "in progress".to_owned(),
    };
    println!(
        "battle {} after {} deltas: {outcome}",
        authority.battle_id(),
        authority.log().head()
    );
    for player in query::players(battle) {
        println!("player {}: {} gold", player.id, player.gold);
    }
    for unit in query::units(battle) {
        let status = if unit.dead { "dead" } else { "alive" };
        println!(
            "unit {} (player {}) at ({}, {}): {}/{} health, level {}, {status}",
            unit.id,
            unit.owner,
            unit.position.column(),
            unit.position.row(),
            unit.health,
            unit.max_health,
            unit.level,
        );
    }
}
