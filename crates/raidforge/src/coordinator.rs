//! Raid coordinator: authorizes commands and drives rooms and battles.
//!
//! Every room is served by its own Tokio task (an actor) that owns a
//! bounded command queue. Commands for one room therefore run strictly
//! one after another in arrival order, which is what keeps join orders
//! unique and battle turns consistent. Different rooms never contend.
//!
//! ```text
//! handler ──► RaidCoordinator ──► RoomHandle ──mpsc──► RoomActor
//!                                                        │
//!                     RoomRegistry / BattleStateStore ◄──┤
//!                     BattleEngine (pure)             ◄──┤
//!                     Broadcaster / RewardDispatcher  ◄──┘
//! ```
//!
//! Handles are spawned lazily on first use. An actor that finds its
//! room gone after a command removes itself from the directory and
//! winds down once the last outstanding handle is dropped.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use rand::SeedableRng;
use rand::rngs::StdRng;
use raidforge_battle::{self as battle, BattleError, PlayerSeat};
use raidforge_protocol::{
    Actor, BattleState, BattleStatus, EventType, OwnedPokemon, PokemonId,
    PokemonTemplate, RoomId, RoomSnapshot, SkillId, UserId,
};
use raidforge_room::{BattleStateStore, RoomError, RoomRegistry};
use raidforge_session::SessionContext;
use raidforge_store::KvStore;
use tokio::sync::{Mutex, mpsc, oneshot};

use crate::RaidError;
use crate::broadcast::{Broadcaster, Outbound, OutboundSender};
use crate::catalog::UserCatalog;
use crate::config::CoordinatorConfig;
use crate::reward::{LedgerService, RewardDispatcher};

type Reply<T> = oneshot::Sender<Result<T, RaidError>>;

/// Commands accepted by a room actor.
enum RoomCommand {
    Create {
        ctx: SessionContext,
        boss_id: PokemonId,
        pokemon_id: PokemonId,
        sender: OutboundSender,
        reply: Reply<RoomSnapshot>,
    },
    Join {
        ctx: SessionContext,
        pokemon_id: PokemonId,
        sender: OutboundSender,
        reply: Reply<RoomSnapshot>,
    },
    Leave {
        user_id: UserId,
        reply: Reply<()>,
    },
    StartRaid {
        user_id: UserId,
        reply: Reply<BattleState>,
    },
    Action {
        user_id: UserId,
        skill_id: SkillId,
        reply: Reply<BattleState>,
    },
}

/// Handle to a running room actor. Cheap to clone.
#[derive(Clone)]
struct RoomHandle {
    room_id: RoomId,
    generation: u64,
    sender: mpsc::Sender<RoomCommand>,
}

impl RoomHandle {
    /// Sends a command and waits for its reply.
    async fn request<T>(
        &self,
        make: impl FnOnce(Reply<T>) -> RoomCommand,
    ) -> Result<T, RaidError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.sender
            .send(make(reply_tx))
            .await
            .map_err(|_| RaidError::Unavailable(self.room_id.clone()))?;
        reply_rx
            .await
            .map_err(|_| RaidError::Unavailable(self.room_id.clone()))?
    }
}

/// Coordinates raid rooms for one server process.
///
/// Cloning shares the same rooms, store, and broadcaster.
pub struct RaidCoordinator<S, U, L> {
    inner: Arc<Inner<S, U, L>>,
}

impl<S, U, L> Clone for RaidCoordinator<S, U, L> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

struct Inner<S, U, L> {
    rooms: RoomRegistry<S>,
    battles: BattleStateStore<S>,
    catalog: U,
    rewards: RewardDispatcher<L>,
    broadcaster: Broadcaster,
    config: CoordinatorConfig,
    directory: Mutex<HashMap<RoomId, RoomHandle>>,
    next_generation: AtomicU64,
}

impl<S, U, L> RaidCoordinator<S, U, L>
where
    S: KvStore + Clone,
    U: UserCatalog,
    L: LedgerService,
{
    pub fn new(
        store: S,
        catalog: U,
        ledger: Arc<L>,
        config: CoordinatorConfig,
    ) -> Self {
        let inner = Inner {
            rooms: RoomRegistry::new(store.clone()),
            battles: BattleStateStore::new(store),
            catalog,
            rewards: RewardDispatcher::new(ledger, config.rewards),
            broadcaster: Broadcaster::new(),
            config,
            directory: Mutex::new(HashMap::new()),
            next_generation: AtomicU64::new(1),
        };
        Self {
            inner: Arc::new(inner),
        }
    }

    pub fn broadcaster(&self) -> &Broadcaster {
        &self.inner.broadcaster
    }

    /// Opens a new room led by the caller, who is seated as member #1.
    pub async fn create_room(
        &self,
        ctx: &SessionContext,
        boss_id: PokemonId,
        pokemon_id: PokemonId,
        sender: OutboundSender,
    ) -> Result<RoomSnapshot, RaidError> {
        let room_id = RoomId::generate();
        let handle = self.inner.handle_for(&room_id).await;
        handle
            .request(|reply| RoomCommand::Create {
                ctx: ctx.clone(),
                boss_id,
                pokemon_id,
                sender,
                reply,
            })
            .await
    }

    pub async fn join_room(
        &self,
        ctx: &SessionContext,
        room_id: &RoomId,
        pokemon_id: PokemonId,
        sender: OutboundSender,
    ) -> Result<RoomSnapshot, RaidError> {
        let handle = self.inner.handle_for(room_id).await;
        handle
            .request(|reply| RoomCommand::Join {
                ctx: ctx.clone(),
                pokemon_id,
                sender,
                reply,
            })
            .await
    }

    /// Leaves a room. During a raid the leaver forfeits, which can hand
    /// the turn to the boss or end the raid.
    pub async fn leave_room(
        &self,
        ctx: &SessionContext,
        room_id: &RoomId,
    ) -> Result<(), RaidError> {
        let handle = self.inner.handle_for(room_id).await;
        handle
            .request(|reply| RoomCommand::Leave {
                user_id: ctx.user_id,
                reply,
            })
            .await
    }

    pub async fn start_raid(
        &self,
        ctx: &SessionContext,
        room_id: &RoomId,
    ) -> Result<BattleState, RaidError> {
        let handle = self.inner.handle_for(room_id).await;
        handle
            .request(|reply| RoomCommand::StartRaid {
                user_id: ctx.user_id,
                reply,
            })
            .await
    }

    /// Applies the caller's skill, then any boss turns that follow.
    /// Returns the state after the last applied transition.
    pub async fn action(
        &self,
        ctx: &SessionContext,
        room_id: &RoomId,
        skill_id: SkillId,
    ) -> Result<BattleState, RaidError> {
        let handle = self.inner.handle_for(room_id).await;
        handle
            .request(|reply| RoomCommand::Action {
                user_id: ctx.user_id,
                skill_id,
                reply,
            })
            .await
    }

    /// Implicit leave for whatever room the user is in. Calling it again
    /// (or for a user in no room) is a no-op.
    pub async fn disconnect(&self, ctx: &SessionContext) -> Result<(), RaidError> {
        let Some(room_id) = self.inner.rooms.user_room(ctx.user_id).await? else {
            return Ok(());
        };
        match self.leave_room(ctx, &room_id).await {
            Ok(()) => Ok(()),
            Err(RaidError::NotMember { .. })
            | Err(RaidError::Room(RoomError::NotFound(_))) => {
                self.inner.rooms.clear_user_room(ctx.user_id).await?;
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    /// Snapshots of every open room, tagged `http`.
    pub async fn list_rooms(&self) -> Result<Vec<RoomSnapshot>, RaidError> {
        let ids = self.inner.rooms.list_room_ids().await?;
        let mut snapshots = Vec::with_capacity(ids.len());
        for room_id in ids {
            match self.inner.rooms.snapshot(&room_id, EventType::Http).await {
                Ok(snapshot) => snapshots.push(snapshot),
                // Torn down between listing and reading.
                Err(RoomError::NotFound(_)) => {}
                Err(e) => return Err(e.into()),
            }
        }
        Ok(snapshots)
    }

    /// Current snapshot of one room.
    pub async fn room_snapshot(
        &self,
        room_id: &RoomId,
    ) -> Result<RoomSnapshot, RaidError> {
        Ok(self.inner.rooms.snapshot(room_id, EventType::Http).await?)
    }

    /// The persisted battle of a room, if one is running.
    pub async fn battle_state(
        &self,
        room_id: &RoomId,
    ) -> Result<Option<BattleState>, RaidError> {
        Ok(self.inner.battles.load(room_id).await?)
    }

    /// Number of live room actors.
    pub async fn active_rooms(&self) -> usize {
        self.inner.directory.lock().await.len()
    }
}

impl<S, U, L> Inner<S, U, L>
where
    S: KvStore + Clone,
    U: UserCatalog,
    L: LedgerService,
{
    /// Returns the room's actor handle, spawning one if needed.
    async fn handle_for(self: &Arc<Self>, room_id: &RoomId) -> RoomHandle {
        let mut directory = self.directory.lock().await;
        if let Some(handle) = directory.get(room_id) {
            if !handle.sender.is_closed() {
                return handle.clone();
            }
        }
        let generation = self.next_generation.fetch_add(1, Ordering::Relaxed);
        let handle = spawn_room(Arc::clone(self), room_id.clone(), generation);
        directory.insert(room_id.clone(), handle.clone());
        handle
    }

    /// Drops the directory entry if it still belongs to `generation`.
    async fn retire(&self, room_id: &RoomId, generation: u64) {
        let mut directory = self.directory.lock().await;
        if directory
            .get(room_id)
            .is_some_and(|h| h.generation == generation)
        {
            directory.remove(room_id);
            tracing::debug!(%room_id, "room actor retired");
        }
    }

    async fn create(
        &self,
        room_id: &RoomId,
        ctx: &SessionContext,
        boss_id: PokemonId,
        pokemon_id: PokemonId,
        sender: OutboundSender,
    ) -> Result<RoomSnapshot, RaidError> {
        let user_id = ctx.user_id;
        if let Some(current) = self.current_room(user_id).await? {
            return Err(RaidError::MembershipConflict {
                user_id,
                room_id: current,
            });
        }
        self.boss_template(boss_id).await?;
        self.owned(user_id, pokemon_id).await?;

        self.rooms.create_room(room_id, user_id, boss_id).await?;
        self.rooms.join(room_id, user_id, pokemon_id).await?;
        self.broadcaster.subscribe(room_id, user_id, outbound(ctx, sender));

        let snapshot = self.rooms.snapshot(room_id, EventType::CreateRoom).await?;
        self.broadcaster.room_update(&snapshot);
        Ok(snapshot)
    }

    async fn join(
        &self,
        room_id: &RoomId,
        ctx: &SessionContext,
        pokemon_id: PokemonId,
        sender: OutboundSender,
    ) -> Result<RoomSnapshot, RaidError> {
        let user_id = ctx.user_id;
        let count = self.rooms.member_count(room_id).await?;
        if self.battles.load(room_id).await?.is_some() {
            return Err(RaidError::Precondition(format!(
                "raid in room {room_id} already started"
            )));
        }
        if count >= self.config.max_members {
            return Err(RaidError::Capacity(room_id.clone()));
        }
        if let Some(current) = self.current_room(user_id).await? {
            return Err(RaidError::MembershipConflict {
                user_id,
                room_id: current,
            });
        }
        self.owned(user_id, pokemon_id).await?;

        self.rooms.join(room_id, user_id, pokemon_id).await?;
        self.broadcaster.subscribe(room_id, user_id, outbound(ctx, sender));

        let snapshot = self.rooms.snapshot(room_id, EventType::JoinRoom).await?;
        self.broadcaster.room_update(&snapshot);
        Ok(snapshot)
    }

    async fn leave(
        &self,
        room_id: &RoomId,
        user_id: UserId,
        rng: &mut StdRng,
    ) -> Result<(), RaidError> {
        if !self.rooms.is_member(room_id, user_id).await? {
            return Err(RaidError::NotMember {
                user_id,
                room_id: room_id.clone(),
            });
        }
        self.rooms.leave(room_id, user_id).await?;

        let snapshot = self.rooms.snapshot(room_id, EventType::LeaveRoom).await?;
        self.broadcaster.room_update(&snapshot);
        self.broadcaster.unsubscribe_user(room_id, user_id);

        if snapshot.members.is_empty() {
            self.rooms.remove_room(room_id).await?;
            self.broadcaster.close_room(room_id);
            tracing::info!(%room_id, "last member left, room destroyed");
            return Ok(());
        }

        if let Some(state) = self.battles.load(room_id).await? {
            let fighting = state.status == BattleStatus::Fighting;
            if fighting && state.participant(Actor::Player(user_id)).is_some() {
                let state = battle::forfeit(&state, user_id)?;
                self.commit(&state).await?;
                self.advance(state, rng).await?;
            }
        }
        Ok(())
    }

    async fn start(
        &self,
        room_id: &RoomId,
        user_id: UserId,
    ) -> Result<BattleState, RaidError> {
        let leader = self.rooms.get_leader(room_id).await?;
        if leader != user_id {
            return Err(RaidError::Permission(format!(
                "only the leader of room {room_id} can start the raid"
            )));
        }
        if self.battles.load(room_id).await?.is_some() {
            return Err(RaidError::Precondition(format!(
                "raid in room {room_id} already started"
            )));
        }
        let members = self.rooms.members(room_id).await?;
        if members.len() < self.config.min_members {
            return Err(RaidError::Precondition(format!(
                "need at least {} members, room has {}",
                self.config.min_members,
                members.len()
            )));
        }

        let boss = self.boss_template(self.rooms.get_boss(room_id).await?).await?;
        let mut seats = Vec::with_capacity(members.len());
        for member in &members {
            seats.push(PlayerSeat {
                user_id: member.user_id,
                join_order: member.order,
                pokemon: self.owned(member.user_id, member.pokemon_id).await?,
            });
        }

        let state = battle::start(room_id.clone(), seats, &boss)?;
        self.commit(&state).await?;
        tracing::info!(
            %room_id,
            players = members.len(),
            boss = %boss.id,
            "raid started"
        );
        Ok(state)
    }

    async fn action(
        &self,
        room_id: &RoomId,
        user_id: UserId,
        skill_id: SkillId,
        rng: &mut StdRng,
    ) -> Result<BattleState, RaidError> {
        let state = self.battles.require(room_id).await?;
        let Some(pokemon_id) = state
            .participant(Actor::Player(user_id))
            .map(|p| p.pokemon_id())
        else {
            return Err(BattleError::NotParticipant(user_id).into());
        };
        let pokemon = self.pokemon_template(pokemon_id).await?;

        let state =
            battle::apply_player_action(&state, user_id, skill_id, &pokemon)?;
        self.commit(&state).await?;
        self.advance(state, rng).await
    }

    /// Runs boss turns while the boss holds the turn, then finalizes if
    /// the raid ended.
    async fn advance(
        &self,
        mut state: BattleState,
        rng: &mut StdRng,
    ) -> Result<BattleState, RaidError> {
        while state.status == BattleStatus::Fighting
            && state.turn.next == Actor::Boss
        {
            let boss_id = state
                .boss()
                .map(|b| b.pokemon_id())
                .ok_or_else(|| BattleError::Malformed("no boss".into()))?;
            let boss = self.boss_template(boss_id).await?;
            state = battle::apply_boss_action(&state, &boss, rng)?;
            self.commit(&state).await?;
        }
        if state.status.is_terminal() {
            self.finalize(&state).await?;
        }
        Ok(state)
    }

    /// Tears the room down and pays out the members still seated.
    async fn finalize(&self, state: &BattleState) -> Result<(), RaidError> {
        let room_id = &state.room_id;
        let members = self.rooms.members(room_id).await?;

        self.battles.remove(room_id).await?;
        self.rooms.remove_room(room_id).await?;
        for member in &members {
            self.rooms.clear_user_room(member.user_id).await?;
        }
        self.broadcaster.close_room(room_id);

        let users: Vec<UserId> = members.iter().map(|m| m.user_id).collect();
        let rewarded = self.rewards.dispatch(room_id, &users, state.status);
        tracing::info!(
            %room_id,
            outcome = %state.status,
            turns = state.turn.count,
            rewarded,
            "raid finished"
        );
        Ok(())
    }

    async fn commit(&self, state: &BattleState) -> Result<(), RaidError> {
        self.battles.save(state).await?;
        self.broadcaster.change_turn(state);
        Ok(())
    }

    /// The user's room, ignoring a stale mapping to a room that is gone.
    async fn current_room(
        &self,
        user_id: UserId,
    ) -> Result<Option<RoomId>, RaidError> {
        let Some(room_id) = self.rooms.user_room(user_id).await? else {
            return Ok(None);
        };
        if self.rooms.exists(&room_id).await? {
            Ok(Some(room_id))
        } else {
            tracing::debug!(%user_id, %room_id, "clearing stale room mapping");
            self.rooms.clear_user_room(user_id).await?;
            Ok(None)
        }
    }

    async fn owned(
        &self,
        user_id: UserId,
        pokemon_id: PokemonId,
    ) -> Result<OwnedPokemon, RaidError> {
        self.catalog
            .owned_pokemon(user_id)
            .await?
            .into_iter()
            .find(|p| p.pokemon_id == pokemon_id)
            .ok_or_else(|| {
                RaidError::NotFound(format!("{pokemon_id} owned by {user_id}"))
            })
    }

    async fn boss_template(
        &self,
        boss_id: PokemonId,
    ) -> Result<PokemonTemplate, RaidError> {
        self.catalog
            .pokemon_with_skills(boss_id)
            .await?
            .ok_or_else(|| RaidError::NotFound(format!("boss {boss_id}")))
    }

    async fn pokemon_template(
        &self,
        pokemon_id: PokemonId,
    ) -> Result<PokemonTemplate, RaidError> {
        self.catalog
            .pokemon_with_skills(pokemon_id)
            .await?
            .ok_or_else(|| RaidError::NotFound(format!("pokemon {pokemon_id}")))
    }
}

fn outbound(ctx: &SessionContext, sender: OutboundSender) -> Outbound {
    Outbound {
        connection_id: ctx.connection_id,
        sender,
    }
}

/// The actor state for one room. Runs inside a Tokio task.
struct RoomActor<S, U, L> {
    room_id: RoomId,
    generation: u64,
    inner: Arc<Inner<S, U, L>>,
    receiver: mpsc::Receiver<RoomCommand>,
    rng: StdRng,
}

impl<S, U, L> RoomActor<S, U, L>
where
    S: KvStore + Clone,
    U: UserCatalog,
    L: LedgerService,
{
    async fn run(mut self) {
        tracing::debug!(room_id = %self.room_id, "room actor started");

        while let Some(cmd) = self.receiver.recv().await {
            self.handle(cmd).await;

            match self.inner.rooms.exists(&self.room_id).await {
                Ok(true) => {}
                Ok(false) => {
                    self.inner.retire(&self.room_id, self.generation).await;
                }
                Err(e) => tracing::warn!(
                    room_id = %self.room_id,
                    error = %e,
                    "room existence check failed"
                ),
            }
        }

        tracing::debug!(room_id = %self.room_id, "room actor stopped");
    }

    async fn handle(&mut self, cmd: RoomCommand) {
        let room_id = &self.room_id;
        let inner = &self.inner;
        match cmd {
            RoomCommand::Create {
                ctx,
                boss_id,
                pokemon_id,
                sender,
                reply,
            } => {
                let result =
                    inner.create(room_id, &ctx, boss_id, pokemon_id, sender).await;
                respond(room_id, "createRoom", ctx.user_id, reply, result);
            }
            RoomCommand::Join {
                ctx,
                pokemon_id,
                sender,
                reply,
            } => {
                let result = inner.join(room_id, &ctx, pokemon_id, sender).await;
                respond(room_id, "joinRoom", ctx.user_id, reply, result);
            }
            RoomCommand::Leave { user_id, reply } => {
                let result = inner.leave(room_id, user_id, &mut self.rng).await;
                respond(room_id, "leaveRoom", user_id, reply, result);
            }
            RoomCommand::StartRaid { user_id, reply } => {
                let result = inner.start(room_id, user_id).await;
                respond(room_id, "startRaid", user_id, reply, result);
            }
            RoomCommand::Action {
                user_id,
                skill_id,
                reply,
            } => {
                let result =
                    inner.action(room_id, user_id, skill_id, &mut self.rng).await;
                respond(room_id, "action", user_id, reply, result);
            }
        }
    }
}

/// Logs a rejection and hands the result back to the caller.
fn respond<T>(
    room_id: &RoomId,
    command: &str,
    user_id: UserId,
    reply: Reply<T>,
    result: Result<T, RaidError>,
) {
    if let Err(e) = &result {
        tracing::debug!(%room_id, %user_id, command, error = %e, "command rejected");
    }
    let _ = reply.send(result);
}

/// Spawns a room actor task and returns a handle to it.
fn spawn_room<S, U, L>(
    inner: Arc<Inner<S, U, L>>,
    room_id: RoomId,
    generation: u64,
) -> RoomHandle
where
    S: KvStore + Clone,
    U: UserCatalog,
    L: LedgerService,
{
    let (tx, rx) = mpsc::channel(inner.config.command_buffer.max(1));
    let rng = match inner.config.rng_seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_rng(&mut rand::rng()),
    };
    let actor = RoomActor {
        room_id: room_id.clone(),
        generation,
        inner,
        receiver: rx,
        rng,
    };
    tokio::spawn(actor.run());

    RoomHandle {
        room_id,
        generation,
        sender: tx,
    }
}
