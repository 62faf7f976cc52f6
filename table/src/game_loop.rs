use billiards_shared::protocol::{BallSnapshot, EntityId, PeerId, ScoreboardMsg, TableEvent};
use billiards_shared::vec3::Vec3;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc, oneshot};

use crate::bot::BotShooter;
use crate::config::CueConfig;
use crate::cue::{ChargeShot, HandStrike};
use crate::rack::RackLayout;
use crate::session::PeerSession;

/// Commands from the input and UI collaborators to one peer's loop
pub enum PeerCommand {
    Rack {
        layout: RackLayout,
    },
    Hit {
        ball: EntityId,
        velocity: Vec3,
    },
    /// Thumbstick position, held until the next Stick command
    Stick {
        x: f64,
        y: f64,
    },
    /// Tracked hand position, held until the next Hand command
    Hand {
        position: Vec3,
    },
    Scoreboard {
        response: oneshot::Sender<ScoreboardMsg>,
    },
    Snapshot {
        response: oneshot::Sender<Vec<BallSnapshot>>,
    },
}

/// Notifications from a peer loop
#[derive(Debug, Clone, PartialEq)]
pub enum PeerBroadcast {
    /// A table event as observed by `peer`
    Event { peer: PeerId, event: TableEvent },
    /// Game over from `peer`'s point of view
    Result {
        peer: PeerId,
        winner: Option<PeerId>,
        won: bool,
    },
}

/// Drive one peer's session at its fixed tick rate until the command
/// channel closes.
pub async fn run_peer_loop(
    mut cmd_rx: mpsc::Receiver<PeerCommand>,
    broadcast_tx: broadcast::Sender<PeerBroadcast>,
    mut session: PeerSession,
    mut bot: Option<BotShooter>,
    cue: CueConfig,
) {
    let peer = session.peer();
    let config = *session.config();
    let dt = config.dt();
    let mut rng = ChaCha8Rng::seed_from_u64(config.rng_seed.wrapping_add(peer.0 as u64));

    let mut hand_strike = HandStrike::new(cue);
    let mut charge = ChargeShot::new(cue);
    let mut stick = (0.0, 0.0);
    let mut hand: Option<Vec3> = None;
    let mut game_over = false;

    let mut tick_interval = tokio::time::interval(Duration::from_secs_f64(dt));
    tick_interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = tick_interval.tick() => {
                if let Some(shot) = charge.update(stick, dt) {
                    session.hit_cue(shot);
                }
                let cue_position = session.table().cue_ball().map(|b| b.position);
                if let (Some(position), Some(cue_position)) = (hand, cue_position) {
                    if let Some(strike) = hand_strike.update(position, dt, cue_position) {
                        session.hit_cue(strike);
                    }
                }

                let report = session.tick();

                for event in report.events {
                    match &event {
                        TableEvent::Racked { .. } => game_over = false,
                        TableEvent::MoneyBallPotted { winner, .. } => {
                            game_over = true;
                            let won = *winner == Some(peer);
                            tracing::info!(%peer, ?winner, won, "game over");
                            let _ = broadcast_tx.send(PeerBroadcast::Result {
                                peer,
                                winner: *winner,
                                won,
                            });
                        }
                        _ => {}
                    }
                    let _ = broadcast_tx.send(PeerBroadcast::Event { peer, event });
                }

                if !game_over {
                    if let Some(bot) = bot.as_mut() {
                        if let Some(shot) = bot.tick(dt, session.table(), &mut rng) {
                            session.hit_cue(shot);
                        }
                    }
                }
            }

            cmd = cmd_rx.recv() => {
                let Some(cmd) = cmd else { break };
                match cmd {
                    PeerCommand::Rack { layout } => {
                        if session.rack(layout) {
                            hand_strike.reset();
                        }
                    }
                    PeerCommand::Hit { ball, velocity } => {
                        session.hit(ball, velocity, peer);
                    }
                    PeerCommand::Stick { x, y } => stick = (x, y),
                    PeerCommand::Hand { position } => hand = Some(position),
                    PeerCommand::Scoreboard { response } => {
                        let _ = response.send(session.scoreboard());
                    }
                    PeerCommand::Snapshot { response } => {
                        let _ = response.send(session.snapshots());
                    }
                }
            }
        }
    }

    tracing::info!(%peer, "peer loop ended");
}
