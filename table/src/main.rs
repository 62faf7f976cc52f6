//! Runs several bot peers around one loopback relay and prints the result.
//!
//! Usage: cargo run -- [OPTIONS]
//!
//! Options:
//!   --peers N       Number of peers at the table (default: 2)
//!   --duration S    Give up after S seconds (default: 30)
//!   --seed N        RNG seed for bots (default: 42)
//!   --latency T     Ownership grant latency in ticks (default: 3)
//!   --layout L      Rack layout, nine or eight (default: nine)

use billiards_shared::config::{BallPhysicsConfig, TableConfig};
use billiards_shared::protocol::{BallWire, PeerId, ScoreboardMsg};
use billiards_table::bot::{BotPersonality, BotShooter};
use billiards_table::config::{CueConfig, SessionConfig};
use billiards_table::game_loop::{run_peer_loop, PeerBroadcast, PeerCommand};
use billiards_table::hub::{HubStats, LoopbackHub};
use billiards_table::rack::RackLayout;
use billiards_table::session::PeerSession;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::Serialize;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc, oneshot};

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RunSummary {
    layout: RackLayout,
    winner: Option<PeerId>,
    scoreboards: Vec<ScoreboardMsg>,
    balls_left: Vec<BallWire>,
    hub: HubStats,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let args: Vec<String> = std::env::args().collect();
    let mut peers: usize = 2;
    let mut duration_secs: u64 = 30;
    let mut session_config = SessionConfig::default();
    let mut layout = RackLayout::NineBall;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--peers" => {
                i += 1;
                peers = args.get(i).and_then(|s| s.parse().ok()).unwrap_or(2);
            }
            "--duration" => {
                i += 1;
                duration_secs = args.get(i).and_then(|s| s.parse().ok()).unwrap_or(30);
            }
            "--seed" => {
                i += 1;
                session_config.rng_seed = args.get(i).and_then(|s| s.parse().ok()).unwrap_or(42);
            }
            "--latency" => {
                i += 1;
                session_config.ownership_latency_ticks =
                    args.get(i).and_then(|s| s.parse().ok()).unwrap_or(3);
            }
            "--layout" => {
                i += 1;
                match args.get(i).map(|s| s.parse::<RackLayout>()) {
                    Some(Ok(parsed)) => layout = parsed,
                    Some(Err(e)) => {
                        eprintln!("{}", e);
                        std::process::exit(1);
                    }
                    None => {}
                }
            }
            other => tracing::warn!("ignoring unknown argument {}", other),
        }
        i += 1;
    }

    let table_config = TableConfig::default();
    let physics = BallPhysicsConfig::default();
    let cue = CueConfig::default();

    // Validate configuration before starting
    let checks = [
        ("session", session_config.validate()),
        ("table", table_config.validate()),
        ("ball physics", physics.validate()),
        ("cue", cue.validate()),
    ];
    for (name, check) in checks {
        if let Err(e) = check {
            eprintln!("Invalid {} configuration: {}", name, e);
            std::process::exit(1);
        }
    }
    if peers == 0 {
        eprintln!("--peers must be at least 1");
        std::process::exit(1);
    }

    let hub = LoopbackHub::new(session_config.ownership_latency_ticks);
    let (broadcast_tx, mut broadcast_rx) = broadcast::channel::<PeerBroadcast>(256);
    let mut rng = ChaCha8Rng::seed_from_u64(session_config.rng_seed);

    let mut senders = Vec::with_capacity(peers);
    let mut handles = Vec::with_capacity(peers);
    for _ in 0..peers {
        let session = PeerSession::new(hub.connect(), session_config, table_config, physics);
        let personality = BotPersonality::random(&mut rng);
        tracing::info!("Peer {} plays with {:?} personality", session.peer(), personality);

        let (cmd_tx, cmd_rx) = mpsc::channel::<PeerCommand>(64);
        let bc_tx = broadcast_tx.clone();
        handles.push(tokio::spawn(async move {
            run_peer_loop(cmd_rx, bc_tx, session, Some(BotShooter::new(personality)), cue).await;
        }));
        senders.push(cmd_tx);
    }

    println!("=== Billiards Table ===");
    println!("Peers: {}", peers);
    println!("Layout: {:?}", layout);
    println!("Ownership latency: {} ticks", session_config.ownership_latency_ticks);
    println!();

    // First peer to connect owns the table
    if senders[0].send(PeerCommand::Rack { layout }).await.is_err() {
        eprintln!("Table owner loop exited before racking");
        std::process::exit(1);
    }

    let deadline = tokio::time::sleep(Duration::from_secs(duration_secs));
    tokio::pin!(deadline);
    let mut winner = None;
    loop {
        tokio::select! {
            _ = &mut deadline => {
                tracing::info!("Time limit reached");
                break;
            }
            msg = broadcast_rx.recv() => match msg {
                Ok(PeerBroadcast::Result { winner: w, .. }) => {
                    winner = w;
                    break;
                }
                Ok(PeerBroadcast::Event { .. }) => {}
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    tracing::warn!("Summary receiver lagged by {} messages", n);
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    }

    // Let the result reach every peer before reading scores
    tokio::time::sleep(Duration::from_millis(100)).await;

    let mut scoreboards = Vec::with_capacity(peers);
    let mut balls_left = Vec::new();
    for (index, tx) in senders.iter().enumerate() {
        let (response, rx) = oneshot::channel();
        if tx.send(PeerCommand::Scoreboard { response }).await.is_ok() {
            if let Ok(board) = rx.await {
                scoreboards.push(board);
            }
        }
        if index == 0 {
            let (response, rx) = oneshot::channel();
            if tx.send(PeerCommand::Snapshot { response }).await.is_ok() {
                if let Ok(snapshots) = rx.await {
                    balls_left = snapshots.iter().map(BallWire::from_snapshot).collect();
                }
            }
        }
    }

    drop(senders);
    for handle in handles {
        let _ = handle.await;
    }

    let summary = RunSummary {
        layout,
        winner,
        scoreboards,
        balls_left,
        hub: hub.stats(),
    };
    match serde_json::to_string_pretty(&summary) {
        Ok(json) => println!("{}", json),
        Err(e) => {
            eprintln!("Failed to encode summary: {}", e);
            std::process::exit(1);
        }
    }
}
