//! Polling consumer that keeps a replica in step with an authority.

use std::time::Duration;

use skirmish_core::{ActionError, BattleId, BattleSnapshot, PullRequest, PullResponse};
use thiserror::Error;

use crate::{authority::Authority, config::SyncConfig, replica::Replica};

/// Fault raised while talking to the authority.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The authority could not be reached.
    #[error("authority unreachable: {0}")]
    Unreachable(String),
    /// The authority answered with a refusal.
    #[error("authority refused the request: {0}")]
    Refused(#[from] ActionError),
    /// A payload failed to encode or decode.
    #[error("malformed payload: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// Request/response channel to an authority.
pub trait AuthorityLink {
    /// Fetches the log suffix starting at `request.since_delta`.
    fn pull(&mut self, request: &PullRequest) -> Result<PullResponse, TransportError>;

    /// Fetches the complete state at the authority's current head.
    fn snapshot(
        &mut self,
        access_token: &str,
        battle_id: BattleId,
    ) -> Result<BattleSnapshot, TransportError>;
}

/// In-process link that carries every message through its JSON wire form.
#[derive(Clone, Copy, Debug)]
pub struct LoopbackLink<'a> {
    authority: &'a Authority,
}

impl<'a> LoopbackLink<'a> {
    /// Link to `authority`.
    #[must_use]
    pub const fn new(authority: &'a Authority) -> Self {
        Self { authority }
    }
}

impl AuthorityLink for LoopbackLink<'_> {
    fn pull(&mut self, request: &PullRequest) -> Result<PullResponse, TransportError> {
        let request: PullRequest = serde_json::from_str(&serde_json::to_string(request)?)?;
        let response = self.authority.handle_pull(&request)?;
        Ok(serde_json::from_str(&serde_json::to_string(&response)?)?)
    }

    fn snapshot(
        &mut self,
        access_token: &str,
        battle_id: BattleId,
    ) -> Result<BattleSnapshot, TransportError> {
        let snapshot = self.authority.handle_snapshot(access_token, battle_id)?;
        Ok(serde_json::from_str(&serde_json::to_string(&snapshot)?)?)
    }
}

/// Health of a client's connection to the authority.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConnectionState {
    /// The last poll succeeded.
    Connected,
    /// The last poll failed; the caller should wait before polling again.
    Retrying {
        /// Consecutive failures so far.
        attempt: u32,
        /// Delay before the next attempt.
        retry_in: Duration,
    },
    /// Too many consecutive failures; polling stops until reconnected.
    Disconnected,
}

/// Replica plus the polling state needed to keep it current.
#[derive(Debug)]
pub struct SyncClient {
    access_token: String,
    battle_id: BattleId,
    config: SyncConfig,
    replica: Replica,
    state: ConnectionState,
    failures: u32,
}

impl SyncClient {
    /// Client for `battle_id` authenticating with `access_token`.
    #[must_use]
    pub fn new(access_token: impl Into<String>, battle_id: BattleId, config: SyncConfig) -> Self {
        Self {
            access_token: access_token.into(),
            battle_id,
            config,
            replica: Replica::with_playback_capacity(config.max_playback),
            state: ConnectionState::Connected,
            failures: 0,
        }
    }

    /// Local replica.
    #[must_use]
    pub const fn replica(&self) -> &Replica {
        &self.replica
    }

    /// Local replica, for draining its playback queue.
    pub fn replica_mut(&mut self) -> &mut Replica {
        &mut self.replica
    }

    /// Current connection state.
    #[must_use]
    pub const fn state(&self) -> ConnectionState {
        self.state
    }

    /// Pulls and merges the next log suffix.
    ///
    /// When the replica lags beyond the configured threshold it is replaced
    /// by a snapshot before merging. Failures back off exponentially and the
    /// client disconnects after `max_attempts` of them in a row.
    pub fn poll<L>(&mut self, link: &mut L) -> ConnectionState
    where
        L: AuthorityLink + ?Sized,
    {
        if self.state == ConnectionState::Disconnected {
            return self.state;
        }

        match self.sync(link) {
            Ok(applied) => {
                if self.state != ConnectionState::Connected {
                    tracing::info!(head = self.replica.head(), "connection restored");
                }
                tracing::debug!(applied, head = self.replica.head(), "poll merged deltas");
                self.failures = 0;
                self.state = ConnectionState::Connected;
            }
            Err(error) => {
                self.failures = self.failures.saturating_add(1);
                if self.failures >= self.config.max_attempts {
                    tracing::info!(failures = self.failures, %error, "disconnected");
                    self.state = ConnectionState::Disconnected;
                } else {
                    let retry_in = self.config.backoff(self.failures);
                    tracing::debug!(attempt = self.failures, ?retry_in, %error, "poll failed");
                    self.state = ConnectionState::Retrying {
                        attempt: self.failures,
                        retry_in,
                    };
                }
            }
        }
        self.state
    }

    /// Leaves the disconnected state so that polling resumes.
    pub fn reconnect(&mut self) {
        self.failures = 0;
        self.state = ConnectionState::Retrying {
            attempt: 0,
            retry_in: Duration::ZERO,
        };
    }

    fn sync<L>(&mut self, link: &mut L) -> Result<u32, TransportError>
    where
        L: AuthorityLink + ?Sized,
    {
        let since_delta = self.replica.head();
        let response = link.pull(&PullRequest {
            access_token: self.access_token.clone(),
            battle_id: self.battle_id,
            since_delta,
        })?;
        self.replica.observe_head(response.head);

        let mut applied = 0;
        if self
            .replica
            .needs_fast_forward(self.config.fast_forward_threshold)
        {
            let snapshot = link.snapshot(&self.access_token, self.battle_id)?;
            applied += self.replica.fast_forward(&snapshot);
        }
        applied += self.replica.merge(since_delta, &response.deltas);
        Ok(applied)
    }
}

#[cfg(test)]
mod tests {
    use skirmish_core::catalog::{demo_battle, DEMO_RED};

    use super::*;
    use crate::config::AuthorityConfig;

    struct Unplugged;

    impl AuthorityLink for Unplugged {
        fn pull(&mut self, _request: &PullRequest) -> Result<PullResponse, TransportError> {
            Err(TransportError::Unreachable("cable unplugged".to_owned()))
        }

        fn snapshot(
            &mut self,
            _access_token: &str,
            _battle_id: BattleId,
        ) -> Result<BattleSnapshot, TransportError> {
            Err(TransportError::Unreachable("cable unplugged".to_owned()))
        }
    }

    fn authority() -> Authority {
        let mut authority = Authority::new(
            BattleId::new(1),
            AuthorityConfig::default(),
            demo_battle(),
        );
        let _ = authority.open_session("red", DEMO_RED);
        authority
    }

    #[test]
    fn polling_catches_up_through_the_wire_form() {
        let authority = authority();
        let mut client = SyncClient::new("red", BattleId::new(1), SyncConfig::default());
        let state = client.poll(&mut LoopbackLink::new(&authority));
        assert_eq!(state, ConnectionState::Connected);
        assert_eq!(client.replica().head(), 12);
        assert_eq!(
            skirmish_world::query::snapshot(client.replica().battle()),
            authority.snapshot()
        );
    }

    #[test]
    fn repeated_failures_back_off_then_disconnect() {
        let config = SyncConfig {
            max_attempts: 3,
            ..SyncConfig::default()
        };
        let mut client = SyncClient::new("red", BattleId::new(1), config);
        let mut link = Unplugged;

        assert_eq!(
            client.poll(&mut link),
            ConnectionState::Retrying {
                attempt: 1,
                retry_in: Duration::from_millis(250),
            }
        );
        assert_eq!(
            client.poll(&mut link),
            ConnectionState::Retrying {
                attempt: 2,
                retry_in: Duration::from_millis(500),
            }
        );
        assert_eq!(client.poll(&mut link), ConnectionState::Disconnected);

        let authority = authority();
        assert_eq!(
            client.poll(&mut LoopbackLink::new(&authority)),
            ConnectionState::Disconnected
        );
        client.reconnect();
        assert_eq!(
            client.poll(&mut LoopbackLink::new(&authority)),
            ConnectionState::Connected
        );
        assert_eq!(client.replica().head(), 12);
    }

    #[test]
    fn refused_pulls_count_as_failures() {
        let authority = authority();
        let mut client = SyncClient::new("mallory", BattleId::new(1), SyncConfig::default());
        let state = client.poll(&mut LoopbackLink::new(&authority));
        assert!(matches!(state, ConnectionState::Retrying { attempt: 1, .. }));
        assert_eq!(client.replica().head(), 0);
    }
}
