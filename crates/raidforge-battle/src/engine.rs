//! Battle transitions.

use rand::Rng;
use raidforge_protocol::{
    Actor, BattleState, BattleStatus, ConnectionStatus, EventType, LastAction,
    OwnedPokemon, Participant, ParticipantRole, PokemonTemplate, RoomId,
    SkillCharge, SkillId, TargetMode, Turn, UserId,
};

use crate::{BattleError, compute_status, next_actor};

/// A player entering the battle with the pokemon they picked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayerSeat {
    pub user_id: UserId,
    pub join_order: u64,
    pub pokemon: OwnedPokemon,
}

/// Builds the opening state: players in join order, then the boss at
/// full hp with every skill at its maximum uses. Player 1 acts first.
pub fn start(
    room_id: RoomId,
    mut players: Vec<PlayerSeat>,
    boss: &PokemonTemplate,
) -> Result<BattleState, BattleError> {
    if players.is_empty() {
        return Err(BattleError::Malformed("no players".into()));
    }
    players.sort_by_key(|p| p.join_order);
    let first = Actor::Player(players[0].user_id);

    let mut participants: Vec<Participant> = players
        .into_iter()
        .map(|seat| Participant {
            role: ParticipantRole::Player {
                user_id: seat.user_id,
                join_order: seat.join_order,
                pokemon_id: seat.pokemon.pokemon_id,
            },
            hp: seat.pokemon.hp,
            connection_status: ConnectionStatus::On,
            skills: seat
                .pokemon
                .skills
                .iter()
                .map(|s| SkillCharge {
                    skill_id: s.skill_id,
                    remaining_uses: s.pp,
                })
                .collect(),
        })
        .collect();
    participants.push(Participant {
        role: ParticipantRole::Boss { pokemon_id: boss.id },
        hp: boss.hp,
        connection_status: ConnectionStatus::On,
        skills: boss
            .skills
            .iter()
            .map(|s| SkillCharge {
                skill_id: s.id,
                remaining_uses: s.max_uses,
            })
            .collect(),
    });

    let mut state = BattleState {
        room_id,
        participants,
        turn: Turn {
            count: 1,
            next: first,
        },
        last_action: None,
        status: BattleStatus::Fighting,
        event_type: EventType::StartRaid,
    };
    state.status = compute_status(&state);
    Ok(state)
}

/// A player uses one of their skills on the boss.
///
/// `pokemon` is the catalog template of the acting player's pokemon; it
/// supplies the skill's damage. A skill with no uses left still lands;
/// its counter stays at zero.
pub fn apply_player_action(
    state: &BattleState,
    user_id: UserId,
    skill_id: SkillId,
    pokemon: &PokemonTemplate,
) -> Result<BattleState, BattleError> {
    let actor = Actor::Player(user_id);
    ensure_fighting(state)?;
    ensure_turn(state, actor)?;

    let participant = state
        .participant(actor)
        .ok_or(BattleError::NotParticipant(user_id))?;
    participant
        .skill(skill_id)
        .ok_or(BattleError::SkillNotFound { actor, skill_id })?;
    let template = pokemon
        .skill(skill_id)
        .ok_or(BattleError::SkillNotFound { actor, skill_id })?;

    let mut next = state.clone();
    spend_use(&mut next, actor, skill_id);
    next.boss_mut()
        .ok_or_else(|| BattleError::Malformed("no boss".into()))?
        .take_damage(template.damage);

    finish_turn(&mut next, actor, skill_id, vec![Actor::Boss], EventType::Action);
    tracing::debug!(
        room_id = %next.room_id,
        %user_id,
        %skill_id,
        damage = template.damage,
        status = %next.status,
        "player action applied"
    );
    Ok(next)
}

/// The boss takes its turn.
///
/// A skill is drawn uniformly from those with uses left (from all of
/// them once everything is spent). A `SINGLE` skill hits one uniformly
/// chosen living player, an `ALL` skill hits every living player.
pub fn apply_boss_action<R: Rng + ?Sized>(
    state: &BattleState,
    boss_template: &PokemonTemplate,
    rng: &mut R,
) -> Result<BattleState, BattleError> {
    ensure_fighting(state)?;
    ensure_turn(state, Actor::Boss)?;

    let boss = state
        .boss()
        .ok_or_else(|| BattleError::Malformed("no boss".into()))?;
    let charged: Vec<SkillId> = boss
        .skills
        .iter()
        .filter(|s| s.remaining_uses > 0)
        .map(|s| s.skill_id)
        .collect();
    let pool: Vec<SkillId> = if charged.is_empty() {
        boss.skills.iter().map(|s| s.skill_id).collect()
    } else {
        charged
    };
    if pool.is_empty() {
        return Err(BattleError::Malformed("boss has no skills".into()));
    }
    let skill_id = pool[rng.random_range(0..pool.len())];
    let template = boss_template.skill(skill_id).ok_or(
        BattleError::SkillNotFound {
            actor: Actor::Boss,
            skill_id,
        },
    )?;

    let alive: Vec<Actor> =
        state.alive_players().iter().map(|p| p.actor()).collect();
    if alive.is_empty() {
        return Err(BattleError::Malformed("no living players".into()));
    }
    let targets = match template.target_mode {
        TargetMode::Single => vec![alive[rng.random_range(0..alive.len())]],
        TargetMode::All => alive,
    };

    let mut next = state.clone();
    spend_use(&mut next, Actor::Boss, skill_id);
    for target in &targets {
        if let Some(p) = next.participant_mut(*target) {
            p.take_damage(template.damage);
        }
    }

    finish_turn(&mut next, Actor::Boss, skill_id, targets, EventType::BossAction);
    tracing::debug!(
        room_id = %next.room_id,
        %skill_id,
        damage = template.damage,
        status = %next.status,
        "boss action applied"
    );
    Ok(next)
}

/// Removes a leaving player from the fight: hp drops to zero and the
/// connection is marked off. If it was their turn, the turn passes on.
pub fn forfeit(
    state: &BattleState,
    user_id: UserId,
) -> Result<BattleState, BattleError> {
    ensure_fighting(state)?;
    let actor = Actor::Player(user_id);

    let mut next = state.clone();
    let participant = next
        .participant_mut(actor)
        .ok_or(BattleError::NotParticipant(user_id))?;
    participant.hp = 0;
    participant.connection_status = ConnectionStatus::Off;

    next.status = compute_status(&next);
    next.event_type = EventType::LeaveRoom;
    if next.turn.next == actor {
        next.turn = Turn {
            count: next.turn.count + 1,
            next: next_actor(&next, actor),
        };
    }
    tracing::debug!(
        room_id = %next.room_id,
        %user_id,
        status = %next.status,
        "player forfeited"
    );
    Ok(next)
}

fn ensure_fighting(state: &BattleState) -> Result<(), BattleError> {
    if state.status.is_terminal() {
        return Err(BattleError::Terminal(state.status));
    }
    Ok(())
}

fn ensure_turn(state: &BattleState, actor: Actor) -> Result<(), BattleError> {
    if state.turn.next != actor {
        return Err(BattleError::Turn {
            actor,
            expected: state.turn.next,
        });
    }
    Ok(())
}

fn spend_use(state: &mut BattleState, actor: Actor, skill_id: SkillId) {
    if let Some(charge) = state
        .participant_mut(actor)
        .and_then(|p| p.skill_mut(skill_id))
    {
        charge.remaining_uses = charge.remaining_uses.saturating_sub(1);
    }
}

fn finish_turn(
    state: &mut BattleState,
    actor: Actor,
    skill_id: SkillId,
    targets: Vec<Actor>,
    event_type: EventType,
) {
    state.status = compute_status(state);
    state.turn = Turn {
        count: state.turn.count + 1,
        next: next_actor(state, actor),
    };
    state.last_action = Some(LastAction {
        actor,
        skill_id,
        targets,
    });
    state.event_type = event_type;
}

#[cfg(test)]
mod tests {
    use raidforge_protocol::{PokemonId, SkillLoadout, SkillTemplate};
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    use super::*;

    fn pikachu() -> PokemonTemplate {
        PokemonTemplate {
            id: PokemonId(25),
            name: "Pikachu".into(),
            hp: 50,
            skills: vec![SkillTemplate {
                id: SkillId(1),
                name: "Thunderbolt".into(),
                damage: 40,
                target_mode: TargetMode::Single,
                max_uses: 1,
            }],
        }
    }

    fn boss() -> PokemonTemplate {
        PokemonTemplate {
            id: PokemonId(150),
            name: "Mewtwo".into(),
            hp: 100,
            skills: vec![SkillTemplate {
                id: SkillId(9),
                name: "Psystrike".into(),
                damage: 40,
                target_mode: TargetMode::Single,
                max_uses: 5,
            }],
        }
    }

    fn seat(user: u64, order: u64) -> PlayerSeat {
        PlayerSeat {
            user_id: UserId(user),
            join_order: order,
            pokemon: OwnedPokemon::from(&pikachu()),
        }
    }

    #[test]
    fn test_start_orders_players_and_appends_boss() {
        let state =
            start(RoomId::new("r"), vec![seat(2, 5), seat(1, 3)], &boss())
                .unwrap();
        assert_eq!(state.player_ids(), vec![UserId(1), UserId(2)]);
        assert!(state.participants.last().unwrap().is_boss());
        assert_eq!(state.turn.next, Actor::Player(UserId(1)));
        assert_eq!(state.turn.count, 1);
        assert_eq!(state.status, BattleStatus::Fighting);
        assert_eq!(state.boss().unwrap().skills[0].remaining_uses, 5);
    }

    #[test]
    fn test_start_without_players_is_malformed() {
        let result = start(RoomId::new("r"), vec![], &boss());
        assert!(matches!(result, Err(BattleError::Malformed(_))));
    }

    #[test]
    fn test_out_of_turn_action_is_rejected() {
        let state =
            start(RoomId::new("r"), vec![seat(1, 1), seat(2, 2)], &boss())
                .unwrap();
        let err = apply_player_action(&state, UserId(2), SkillId(1), &pikachu())
            .unwrap_err();
        assert_eq!(
            err,
            BattleError::Turn {
                actor: Actor::Player(UserId(2)),
                expected: Actor::Player(UserId(1)),
            }
        );
    }

    #[test]
    fn test_unknown_skill_is_rejected() {
        let state =
            start(RoomId::new("r"), vec![seat(1, 1), seat(2, 2)], &boss())
                .unwrap();
        assert!(matches!(
            apply_player_action(&state, UserId(1), SkillId(77), &pikachu()),
            Err(BattleError::SkillNotFound { .. })
        ));
    }

    #[test]
    fn test_exhausted_skill_still_deals_damage() {
        let state =
            start(RoomId::new("r"), vec![seat(1, 1), seat(2, 2)], &boss())
                .unwrap();
        let mut drained = state.clone();
        drained.participants[0].skills[0].remaining_uses = 0;

        let next =
            apply_player_action(&drained, UserId(1), SkillId(1), &pikachu())
                .unwrap();
        assert_eq!(next.boss().unwrap().hp, 60);
        assert_eq!(next.participants[0].skills[0].remaining_uses, 0);
        assert_eq!(next.turn.next, Actor::Player(UserId(2)));
    }

    #[test]
    fn test_party_out_of_uses_can_still_finish_the_raid() {
        let mut state =
            start(RoomId::new("r"), vec![seat(1, 1), seat(2, 2)], &boss())
                .unwrap();
        let mut rng = StdRng::seed_from_u64(3);
        while state.status == BattleStatus::Fighting {
            state = match state.turn.next {
                Actor::Boss => {
                    apply_boss_action(&state, &boss(), &mut rng).unwrap()
                }
                Actor::Player(user_id) => {
                    apply_player_action(&state, user_id, SkillId(1), &pikachu())
                        .unwrap()
                }
            };
        }
        assert!(state.status.is_terminal());
        assert!(state.players().all(|p| p.skills[0].remaining_uses == 0));
    }

    #[test]
    fn test_player_action_spends_a_use_and_records_last_action() {
        let state =
            start(RoomId::new("r"), vec![seat(1, 1), seat(2, 2)], &boss())
                .unwrap();
        let next =
            apply_player_action(&state, UserId(1), SkillId(1), &pikachu())
                .unwrap();

        assert_eq!(next.participants[0].skills[0].remaining_uses, 0);
        assert_eq!(
            next.last_action,
            Some(LastAction {
                actor: Actor::Player(UserId(1)),
                skill_id: SkillId(1),
                targets: vec![Actor::Boss],
            })
        );
        assert_eq!(next.event_type, EventType::Action);
        // The input is untouched.
        assert_eq!(state.boss().unwrap().hp, 100);
    }

    #[test]
    fn test_forfeit_on_own_turn_passes_turn() {
        let state =
            start(RoomId::new("r"), vec![seat(1, 1), seat(2, 2)], &boss())
                .unwrap();
        let next = forfeit(&state, UserId(1)).unwrap();

        let p1 = next.participant(Actor::Player(UserId(1))).unwrap();
        assert_eq!(p1.hp, 0);
        assert_eq!(p1.connection_status, ConnectionStatus::Off);
        assert_eq!(next.turn.next, Actor::Player(UserId(2)));
        assert_eq!(next.turn.count, 2);
        assert_eq!(next.status, BattleStatus::Fighting);
    }

    #[test]
    fn test_forfeit_of_last_player_is_defeat() {
        let state =
            start(RoomId::new("r"), vec![seat(1, 1)], &boss()).unwrap();
        let next = forfeit(&state, UserId(1)).unwrap();
        assert_eq!(next.status, BattleStatus::Defeat);
        assert!(matches!(
            forfeit(&next, UserId(1)),
            Err(BattleError::Terminal(BattleStatus::Defeat))
        ));
    }

    #[test]
    fn test_forfeit_unknown_user() {
        let state =
            start(RoomId::new("r"), vec![seat(1, 1)], &boss()).unwrap();
        assert_eq!(
            forfeit(&state, UserId(9)),
            Err(BattleError::NotParticipant(UserId(9)))
        );
    }

    #[test]
    fn test_start_uses_owned_pp_not_template() {
        let mut owned = OwnedPokemon::from(&pikachu());
        owned.skills = vec![SkillLoadout {
            skill_id: SkillId(1),
            pp: 3,
        }];
        let seat = PlayerSeat {
            user_id: UserId(1),
            join_order: 1,
            pokemon: owned,
        };
        let state = start(RoomId::new("r"), vec![seat], &boss()).unwrap();
        assert_eq!(state.participants[0].skills[0].remaining_uses, 3);
    }
}
