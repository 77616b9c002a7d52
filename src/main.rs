//! Glitch Lanes entry point
//!
//! The browser build is driven through `platform::web`. Natively this runs a
//! headless match with the scripted player and logs the result.

#[cfg(not(target_arch = "wasm32"))]
fn main() {
    use glitch_lanes::consts::SIM_DT;
    use glitch_lanes::leaderboard::Leaderboard;
    use glitch_lanes::settings::LevelConfig;
    use glitch_lanes::sim::{GameEvent, GamePhase, MatchState, TickInput, tick};

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    log::info!("Glitch Lanes (native) starting...");

    let mut args = std::env::args().skip(1);
    let level: u8 = args.next().and_then(|a| a.parse().ok()).unwrap_or(1);
    let seed: u64 = args
        .next()
        .and_then(|a| a.parse().ok())
        .unwrap_or_else(|| glitch_lanes::platform::storage::now_ms() as u64);

    let config = match LevelConfig::preset(level) {
        Ok(config) => config,
        Err(e) => {
            log::error!("{}", e);
            std::process::exit(2);
        }
    };

    let mut state = MatchState::new(config, seed);
    let mut leaderboard = Leaderboard::load();
    let input = TickInput {
        event: None,
        autoplay: true,
    };

    // Ten simulated minutes is far more than any match needs
    let max_ticks = 60 * 60 * 10;
    while state.phase != GamePhase::MatchResolved && state.time_ticks < max_ticks {
        tick(&mut state, &input, SIM_DT);
        for event in state.drain_events() {
            match event {
                GameEvent::RoundResolved(record) => println!(
                    "Round {}: {} - {} ({:?})",
                    record.round, record.player_score, record.enemy_score, record.outcome
                ),
                GameEvent::ThreatRevealed { enemy_spawns } => {
                    println!("Threat hash: {enemy_spawns} enemies this round")
                }
                GameEvent::Warning(violation) => log::warn!("{}", violation),
                _ => {}
            }
        }
    }

    let Some(summary) = state.summary else {
        log::error!("Match did not finish within {} ticks", max_ticks);
        std::process::exit(1);
    };
    println!(
        "Level {}: {:?} ({}-{}), {} units, {} abilities, {} points",
        level,
        summary.outcome,
        summary.player_wins,
        summary.enemy_wins,
        summary.units_used,
        summary.abilities_used,
        summary.points
    );

    if let Some(Ok(ack)) = state.submit_completion(&mut leaderboard) {
        println!("Best for level {}: {}", level, ack.best_points);
    }
}

#[cfg(target_arch = "wasm32")]
fn main() {
    // WASM entry point is platform::web::start, this is just to satisfy the compiler
}
