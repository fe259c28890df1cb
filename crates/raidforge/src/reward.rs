//! Post-battle reward payout.
//!
//! Payout is fire-and-forget: one task per member, failures are logged
//! and dropped. Nothing is retried and teardown never waits on it.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use raidforge_protocol::{BattleStatus, RoomId, UserId};
use tokio::sync::Mutex;

/// The ledger refused or failed a grant.
#[derive(Debug, thiserror::Error)]
#[error("ledger grant failed: {0}")]
pub struct LedgerError(pub String);

/// Credits token rewards to users.
pub trait LedgerService: Send + Sync + 'static {
    fn grant(
        &self,
        user_id: UserId,
        amount: u64,
    ) -> impl Future<Output = Result<(), LedgerError>> + Send;
}

/// Reward amounts per member by outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RewardPolicy {
    pub win: u64,
    pub defeat: u64,
}

impl Default for RewardPolicy {
    fn default() -> Self {
        Self { win: 30, defeat: 10 }
    }
}

impl RewardPolicy {
    /// Amount for `outcome`, or `None` while the battle is running.
    pub fn amount(&self, outcome: BattleStatus) -> Option<u64> {
        match outcome {
            BattleStatus::Win => Some(self.win),
            BattleStatus::Defeat => Some(self.defeat),
            BattleStatus::Fighting => None,
        }
    }
}

/// Spawns one grant per member and returns without waiting.
pub struct RewardDispatcher<L> {
    ledger: Arc<L>,
    policy: RewardPolicy,
}

impl<L: LedgerService> RewardDispatcher<L> {
    pub fn new(ledger: Arc<L>, policy: RewardPolicy) -> Self {
        Self { ledger, policy }
    }

    /// Starts payouts for `members`. Returns how many grants were spawned
    /// (zero for a non-terminal outcome).
    pub fn dispatch(
        &self,
        room_id: &RoomId,
        members: &[UserId],
        outcome: BattleStatus,
    ) -> usize {
        let Some(amount) = self.policy.amount(outcome) else {
            return 0;
        };
        for &user_id in members {
            let ledger = Arc::clone(&self.ledger);
            let room_id = room_id.clone();
            tokio::spawn(async move {
                match ledger.grant(user_id, amount).await {
                    Ok(()) => tracing::info!(
                        %room_id,
                        %user_id,
                        amount,
                        %outcome,
                        "reward granted"
                    ),
                    Err(e) => tracing::warn!(
                        %room_id,
                        %user_id,
                        amount,
                        error = %e,
                        "reward grant failed"
                    ),
                }
            });
        }
        members.len()
    }
}

/// An in-memory ledger keeping balances per user.
#[derive(Debug, Default)]
pub struct MemoryLedger {
    balances: Mutex<HashMap<UserId, u64>>,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn balance(&self, user_id: UserId) -> u64 {
        self.balances
            .lock()
            .await
            .get(&user_id)
            .copied()
            .unwrap_or_default()
    }
}

impl LedgerService for MemoryLedger {
    async fn grant(&self, user_id: UserId, amount: u64) -> Result<(), LedgerError> {
        *self.balances.lock().await.entry(user_id).or_default() += amount;
        Ok(())
    }
}
