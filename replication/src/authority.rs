//! The authoritative battle host.
//!
//! The authority is a step function: each accepted intent is authorized,
//! resolved with the host's seeded generator, collapsed into the host's own
//! battle and appended to the log before the next intent is looked at.

use std::collections::BTreeMap;

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use skirmish_core::{
    delta::GameOver, ActionError, ActionRequest, ActionResponse, BattleId, BattlePhase,
    BattleSnapshot, Delta, PlayerId, PullRequest, PullResponse, TurnAction,
};
use skirmish_system_authorization::authorize;
use skirmish_system_resolution::resolve;
use skirmish_world::{collapse, query, Battle, Collapse};

use crate::{config::AuthorityConfig, log::DeltaLog};

/// Owner of the canonical battle and its delta log.
#[derive(Debug)]
pub struct Authority {
    battle_id: BattleId,
    battle: Battle,
    log: DeltaLog,
    rng: ChaCha8Rng,
    sessions: BTreeMap<String, PlayerId>,
    max_pull_batch: u32,
}

impl Authority {
    /// Hosts a battle built from `setup` deltas, which become the head of the log.
    #[must_use]
    pub fn new(battle_id: BattleId, config: AuthorityConfig, setup: Vec<Delta>) -> Self {
        let mut authority = Self {
            battle_id,
            battle: Battle::new(),
            log: DeltaLog::new(),
            rng: ChaCha8Rng::seed_from_u64(config.seed),
            sessions: BTreeMap::new(),
            max_pull_batch: config.max_pull_batch.max(1),
        };
        let _ = authority.commit(setup);
        authority
    }

    /// Binds an access token to a player, returning the player it was bound to before.
    pub fn open_session(
        &mut self,
        access_token: impl Into<String>,
        player_id: PlayerId,
    ) -> Option<PlayerId> {
        self.sessions.insert(access_token.into(), player_id)
    }

    /// Identifier of the hosted battle.
    #[must_use]
    pub const fn battle_id(&self) -> BattleId {
        self.battle_id
    }

    /// Canonical battle state.
    #[must_use]
    pub const fn battle(&self) -> &Battle {
        &self.battle
    }

    /// Every committed delta.
    #[must_use]
    pub const fn log(&self) -> &DeltaLog {
        &self.log
    }

    /// Complete state at the current head.
    #[must_use]
    pub fn snapshot(&self) -> BattleSnapshot {
        query::snapshot(&self.battle)
    }

    /// Validates, resolves and commits one intent of `player_id`.
    ///
    /// Returns the committed batch. A batch that ends the battle is followed
    /// by a game over delta naming the winner.
    pub fn submit(
        &mut self,
        player_id: PlayerId,
        action: &TurnAction,
    ) -> Result<Vec<Delta>, ActionError> {
        let resolved = authorize(&self.battle, player_id, action)
            .and_then(|permission| resolve(&permission, &mut self.rng));
        let batch = match resolved {
            Ok(batch) => batch,
            Err(error) => {
                tracing::debug!(
                    player = %player_id,
                    action = action.type_tag(),
                    %error,
                    "rejected action"
                );
                return Err(error);
            }
        };
        Ok(self.commit(batch))
    }

    /// Serves an action submission from a client.
    pub fn handle_action(
        &mut self,
        request: &ActionRequest,
    ) -> Result<ActionResponse, ActionError> {
        let player_id = self.session(&request.access_token)?;
        let previous_head = self.log.head();
        let deltas = self.submit(player_id, &request.action)?;
        Ok(ActionResponse {
            previous_head,
            deltas,
        })
    }

    /// Serves a pull for the log suffix starting at `since_delta`.
    pub fn handle_pull(&self, request: &PullRequest) -> Result<PullResponse, ActionError> {
        let _ = self.session(&request.access_token)?;
        self.expect_battle(request.battle_id)?;
        Ok(PullResponse {
            deltas: self
                .log
                .since(request.since_delta, self.max_pull_batch)
                .to_vec(),
            head: self.log.head(),
        })
    }

    /// Serves a snapshot to a consumer that fell too far behind.
    pub fn handle_snapshot(
        &self,
        access_token: &str,
        battle_id: BattleId,
    ) -> Result<BattleSnapshot, ActionError> {
        let _ = self.session(access_token)?;
        self.expect_battle(battle_id)?;
        Ok(self.snapshot())
    }

    fn session(&self, access_token: &str) -> Result<PlayerId, ActionError> {
        self.sessions
            .get(access_token)
            .copied()
            .ok_or(ActionError::InvalidAccessToken)
    }

    fn expect_battle(&self, battle_id: BattleId) -> Result<(), ActionError> {
        if battle_id == self.battle_id {
            Ok(())
        } else {
            Err(ActionError::UnknownBattle)
        }
    }

    fn commit(&mut self, mut batch: Vec<Delta>) -> Vec<Delta> {
        let was_running = query::phase(&self.battle) == BattlePhase::InProgress;
        for delta in &batch {
            if let Collapse::Skipped(gap) = collapse(&mut self.battle, delta) {
                tracing::warn!(%gap, "authority skipped its own delta");
            }
        }

        if was_running && query::phase(&self.battle) == BattlePhase::Finished {
            let over = Delta::GameOver(GameOver {
                winner: query::winner(&self.battle),
            });
            let _ = collapse(&mut self.battle, &over);
            batch.push(over);
        }

        let previous_head = self.log.append(batch.iter().cloned());
        tracing::debug!(previous_head, deltas = batch.len(), "committed batch");
        batch
    }
}
