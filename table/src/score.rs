use billiards_shared::protocol::{PeerId, ScoreEntry};
use std::collections::BTreeMap;

/// Points per peer. Written only by the table owner, replicated to everyone.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScoreLedger {
    scores: BTreeMap<PeerId, u32>,
}

impl ScoreLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `points` to `peer` and return the new total.
    pub fn credit(&mut self, peer: PeerId, points: u32) -> u32 {
        let score = self.scores.entry(peer).or_insert(0);
        *score = score.saturating_add(points);
        *score
    }

    /// Score for `peer`, 0 if it never scored.
    pub fn get_score(&self, peer: PeerId) -> u32 {
        self.scores.get(&peer).copied().unwrap_or(0)
    }

    pub fn iter(&self) -> impl Iterator<Item = (PeerId, u32)> + '_ {
        self.scores.iter().map(|(&peer, &score)| (peer, score))
    }

    pub fn clear(&mut self) {
        self.scores.clear();
    }

    pub fn to_entries(&self) -> Vec<ScoreEntry> {
        self.iter()
            .map(|(peer, score)| ScoreEntry { peer, score })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_peer_scores_zero() {
        let ledger = ScoreLedger::new();
        assert_eq!(ledger.get_score(PeerId(9)), 0);
    }

    #[test]
    fn credit_accumulates() {
        let mut ledger = ScoreLedger::new();
        assert_eq!(ledger.credit(PeerId(2), 1), 1);
        assert_eq!(ledger.credit(PeerId(2), 3), 4);
        assert_eq!(ledger.credit(PeerId(1), 1), 1);
        assert_eq!(ledger.get_score(PeerId(2)), 4);
    }

    #[test]
    fn entries_are_ordered_by_peer() {
        let mut ledger = ScoreLedger::new();
        ledger.credit(PeerId(3), 1);
        ledger.credit(PeerId(1), 2);
        let peers: Vec<u32> = ledger.to_entries().iter().map(|e| e.peer.0).collect();
        assert_eq!(peers, vec![1, 3]);
    }
}
