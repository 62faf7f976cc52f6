use billiards_shared::config::{BallPhysicsConfig, TableConfig};
use billiards_shared::protocol::{
    BallSnapshot, EntityId, PeerId, ScoreboardMsg, TableEvent, PROTOCOL_VERSION,
};
use billiards_shared::vec3::Vec3;

use crate::authority::ReplicationPrimitive;
use crate::ball::{Ball, HitOutcome};
use crate::config::SessionConfig;
use crate::hub::PeerLink;
use crate::pocket::PotOutcome;
use crate::rack::{self, RackLayout};
use crate::score::ScoreLedger;
use crate::table::{PairStats, Table};

/// What one tick did on this peer.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TickReport {
    pub tick: u64,
    /// Balls this peer integrated
    pub stepped: usize,
    pub hits_applied: usize,
    pub pairs: PairStats,
    /// Pots this peer resolved as table owner
    pub pots: Vec<PotOutcome>,
    /// Table events seen this tick, from whichever peer owns the table
    pub events: Vec<TableEvent>,
}

/// One peer's simulation of the shared table.
///
/// Holds the peer's link to the relay and its local copy of every ball.
/// `tick()` runs the fixed step: refresh from the relay, integrate owned
/// balls, resolve pairs, run the pockets when this peer owns the table, then
/// publish what it owns.
pub struct PeerSession {
    link: PeerLink,
    table: Table,
    ledger: ScoreLedger,
    config: SessionConfig,
    table_config: TableConfig,
    physics: BallPhysicsConfig,
    respawns_left: u32,
    tick: u64,
}

impl PeerSession {
    pub fn new(
        link: PeerLink,
        config: SessionConfig,
        table_config: TableConfig,
        physics: BallPhysicsConfig,
    ) -> Self {
        Self {
            link,
            table: Table::new(&table_config),
            ledger: ScoreLedger::new(),
            config,
            table_config,
            physics,
            respawns_left: config.cue_ball_respawns,
            tick: 0,
        }
    }

    pub fn peer(&self) -> PeerId {
        self.link.peer()
    }

    pub fn table(&self) -> &Table {
        &self.table
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn table_config(&self) -> &TableConfig {
        &self.table_config
    }

    pub fn owns_table(&self) -> bool {
        self.link.owns_table()
    }

    pub fn claim_table(&mut self) {
        self.link.claim_table();
    }

    /// Start a new game: clear the table and scores, then spawn a fresh rack.
    /// Table owner only. Balls appear on every peer from the next tick.
    pub fn rack(&mut self, layout: RackLayout) -> bool {
        if !self.link.owns_table() {
            tracing::debug!(peer = %self.peer(), "rack ignored, table owned elsewhere");
            return false;
        }

        self.link.reset_table();
        self.ledger.clear();
        let positions = rack::rack_positions(layout, &self.table_config, self.physics.radius);
        let spawned = positions
            .into_iter()
            .filter_map(|(number, position)| self.link.spawn_ball(number, position))
            .count();

        self.link.publish_scores(&self.ledger);
        self.link.emit(TableEvent::Racked {
            balls: spawned as u32,
        });
        tracing::info!(peer = %self.peer(), ?layout, balls = spawned, "table racked");
        true
    }

    /// Place one ball at rest. Table owner only.
    pub fn spawn_ball(&mut self, number: u8, position: Vec3) -> Option<EntityId> {
        self.link.spawn_ball(number, position)
    }

    /// Strike a ball. None if it is not on this peer's table.
    pub fn hit(&mut self, ball: EntityId, velocity: Vec3, hitter: PeerId) -> Option<HitOutcome> {
        let ttl = self.config.hit_request_ttl_ticks;
        self.table.hit(ball, velocity, hitter, &mut self.link, ttl)
    }

    /// Strike the cue ball on behalf of this peer.
    pub fn hit_cue(&mut self, velocity: Vec3) -> Option<HitOutcome> {
        let cue = self.table.cue_ball()?.id;
        let peer = self.peer();
        self.hit(cue, velocity, peer)
    }

    pub fn tick(&mut self) -> TickReport {
        let pump = self.link.pump();
        for id in &pump.despawned {
            self.table.unregister(*id);
        }
        for snapshot in &pump.spawned {
            self.table.register(Ball::from_snapshot(snapshot, self.physics));
        }

        // Non-owners follow the replicated ledger; the table owner writes it
        if !self.link.owns_table() || pump.gained.contains(&EntityId::TABLE) {
            self.ledger = self.link.scores().clone();
        }

        self.table.refresh_ownership(&self.link);
        let hits_applied = self.table.apply_pending_hits();
        let stepped = self.table.step_balls(
            self.config.dt(),
            &self.link,
            self.config.reconcile_blend,
            self.config.snap_tolerance,
        );
        let pairs = self.table.resolve_collisions(&mut self.link);

        let pots = if self.link.owns_table() {
            self.resolve_pockets()
        } else {
            Vec::new()
        };

        for ball in self.table.balls().iter().filter(|b| b.is_alive() && b.is_owned()) {
            self.link.publish(ball.snapshot());
        }

        let events = self.link.drain_events();
        for event in &events {
            match event {
                TableEvent::Racked { .. } => self.respawns_left = self.config.cue_ball_respawns,
                TableEvent::CueBallRespotted { respawns_left, .. } => {
                    self.respawns_left = *respawns_left
                }
                _ => {}
            }
        }

        self.tick += 1;
        TickReport {
            tick: self.tick,
            stepped,
            hits_applied,
            pairs,
            pots,
            events,
        }
    }

    fn resolve_pockets(&mut self) -> Vec<PotOutcome> {
        let respot = (self.respawns_left > 0).then(|| rack::head_spot(&self.table_config));
        let pots = self.table.resolve_pockets(&mut self.ledger, respot);

        for pot in &pots {
            if pot.respotted {
                self.respawns_left = self.respawns_left.saturating_sub(1);
                if let Some(ball) = self.table.ball(pot.ball) {
                    self.link.respawn(ball.snapshot());
                }
                self.link.emit(TableEvent::CueBallRespotted {
                    ball: pot.ball,
                    respawns_left: self.respawns_left,
                });
                continue;
            }

            self.link.despawn(pot.ball);
            self.link.emit(TableEvent::BallPotted {
                ball: pot.ball,
                number: pot.number,
                credited: pot.credited,
                points: pot.points,
            });
            if pot.number == self.config.money_ball {
                tracing::info!(number = pot.number, winner = ?pot.credited, "money ball potted");
                self.link.emit(TableEvent::MoneyBallPotted {
                    number: pot.number,
                    winner: pot.credited,
                });
            }
        }

        if !pots.is_empty() {
            self.link.publish_scores(&self.ledger);
        }
        pots
    }

    pub fn get_score(&self, peer: PeerId) -> u32 {
        self.ledger.get_score(peer)
    }

    pub fn ledger(&self) -> &ScoreLedger {
        &self.ledger
    }

    pub fn next_target_ball_number(&self) -> u8 {
        self.table.next_target_ball_number()
    }

    pub fn respawns_left(&self) -> u32 {
        self.respawns_left
    }

    pub fn at_rest(&self) -> bool {
        self.table.at_rest()
    }

    pub fn scoreboard(&self) -> ScoreboardMsg {
        ScoreboardMsg {
            protocol_version: PROTOCOL_VERSION,
            self_id: self.peer(),
            scores: self.ledger.to_entries(),
            next_target: self.next_target_ball_number(),
        }
    }

    pub fn snapshots(&self) -> Vec<BallSnapshot> {
        self.table
            .balls()
            .iter()
            .filter(|b| b.is_alive())
            .map(Ball::snapshot)
            .collect()
    }
}
