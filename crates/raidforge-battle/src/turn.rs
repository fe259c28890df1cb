//! Turn order and outcome rules.

use raidforge_protocol::{Actor, BattleState, BattleStatus};

/// Outcome implied by current hit points. Boss hp is checked first.
pub fn compute_status(state: &BattleState) -> BattleStatus {
    let boss_alive = state.boss().is_some_and(|b| b.is_alive());
    if !boss_alive {
        BattleStatus::Win
    } else if state.alive_players().is_empty() {
        BattleStatus::Defeat
    } else {
        BattleStatus::Fighting
    }
}

/// Who acts after `current`.
///
/// - after the boss: the first living player
/// - after the last living player: the boss, or the first living player
///   if the boss is down
/// - after any other living player: the next living player
/// - after a player who is no longer alive: the first living player
///   whose join order is greater, falling back as above
///
/// With no living players the boss is returned.
pub fn next_actor(state: &BattleState, current: Actor) -> Actor {
    let alive = state.alive_players();
    let Some(first) = alive.first().map(|p| p.actor()) else {
        return Actor::Boss;
    };
    let boss_alive = state.boss().is_some_and(|b| b.is_alive());
    let wrap = if boss_alive { Actor::Boss } else { first };

    match current {
        Actor::Boss => first,
        Actor::Player(_) => {
            if let Some(idx) = alive.iter().position(|p| p.actor() == current) {
                return alive.get(idx + 1).map(|p| p.actor()).unwrap_or(wrap);
            }
            let after = state
                .participant(current)
                .and_then(|p| p.join_order())
                .unwrap_or(0);
            alive
                .iter()
                .find(|p| p.join_order().is_some_and(|o| o > after))
                .map(|p| p.actor())
                .unwrap_or(wrap)
        }
    }
}
