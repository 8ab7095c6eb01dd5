//! Room actor: an isolated Tokio task that owns one match.
//!
//! Each room runs in its own task and is reached only through its mailbox,
//! so every mutation of the match [`State`] is serialized through one loop.
//! The loop merges three sources:
//!
//! ```text
//!          stop (watch) ─┐
//!  join/input/leave/info ─┼─→ select! ─→ step() ─→ snapshot ─→ outbox per client
//!   tick scheduler (40 Hz) ─┘
//! ```
//!
//! Outbound delivery never blocks the loop: each client gets a bounded
//! outbox drained by its own writer task. A client that cannot keep up is
//! evicted rather than waited for.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Duration;

use orbarena_protocol::{Codec, JsonCodec, ServerMessage, StateSnapshot, Welcome};
use orbarena_sim::{Input, PlayerId, State, step};
use orbarena_tick::{TickInfo, TickScheduler};
use orbarena_transport::ClientHandle;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, oneshot, watch};

use crate::{RoomCode, RoomConfig, RoomError, RoomStatus};

/// Longest display name kept, in characters.
const MAX_NAME_CHARS: usize = 24;

/// Bound on the final `terminate` call of a writer task.
const TERMINATE_TIMEOUT: Duration = Duration::from_secs(1);

/// An encoded message shared by every outbox it is queued on.
type Frame = Arc<[u8]>;

/// Commands sent to a room actor through its mailbox.
pub(crate) enum RoomCommand<C> {
    Join {
        client: Arc<C>,
        name: Option<String>,
        reply: oneshot::Sender<PlayerId>,
    },
    Input {
        player_id: PlayerId,
        input: Input,
    },
    Leave {
        player_id: PlayerId,
    },
    Info {
        reply: oneshot::Sender<RoomInfo>,
    },
}

/// Sent to the manager when a room loses its last client.
#[derive(Debug)]
pub(crate) struct EmptyNotice {
    pub(crate) code: RoomCode,
    pub(crate) instance: u64,
}

/// A snapshot of room metadata (not the match state itself).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoomInfo {
    pub code: RoomCode,
    pub status: RoomStatus,
    /// Connected clients, including eliminated players still watching.
    pub player_count: usize,
    /// Simulation tick of the match.
    pub tick: u64,
}

// ---------------------------------------------------------------------------
// Handle
// ---------------------------------------------------------------------------

/// Handle to a running room actor.
///
/// Cheap to clone. The room stops once [`stop`](Self::stop) is called or
/// every handle has been dropped.
pub struct RoomHandle<C> {
    code: RoomCode,
    instance: u64,
    sender: mpsc::Sender<RoomCommand<C>>,
    stop: Arc<watch::Sender<bool>>,
}

impl<C> Clone for RoomHandle<C> {
    fn clone(&self) -> Self {
        Self {
            code: self.code.clone(),
            instance: self.instance,
            sender: self.sender.clone(),
            stop: Arc::clone(&self.stop),
        }
    }
}

impl<C: ClientHandle> RoomHandle<C> {
    pub fn code(&self) -> &RoomCode {
        &self.code
    }

    /// Distinguishes rooms that reused the same code.
    pub(crate) fn instance(&self) -> u64 {
        self.instance
    }

    /// Joins a client to the room and returns its new player id.
    ///
    /// Waits for mailbox space. The room queues a `welcome` message as the
    /// client's first outbound message before replying.
    pub async fn join(
        &self,
        client: Arc<C>,
        name: Option<String>,
    ) -> Result<PlayerId, RoomError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.sender
            .send(RoomCommand::Join {
                client,
                name,
                reply: reply_tx,
            })
            .await
            .map_err(|_| self.unavailable())?;
        reply_rx.await.map_err(|_| self.unavailable())
    }

    /// Submits a player's input without waiting.
    ///
    /// Returns `Ok(false)` if the mailbox was full and the input was
    /// dropped; the next input replaces it anyway.
    pub fn submit_input(
        &self,
        player_id: PlayerId,
        input: Input,
    ) -> Result<bool, RoomError> {
        match self.sender.try_send(RoomCommand::Input { player_id, input }) {
            Ok(()) => Ok(true),
            Err(TrySendError::Full(_)) => {
                tracing::trace!(code = %self.code, %player_id, "mailbox full, input dropped");
                Ok(false)
            }
            Err(TrySendError::Closed(_)) => Err(self.unavailable()),
        }
    }

    /// Removes a player. Waits for mailbox space so a leave is never lost.
    pub async fn leave(&self, player_id: PlayerId) -> Result<(), RoomError> {
        self.sender
            .send(RoomCommand::Leave { player_id })
            .await
            .map_err(|_| self.unavailable())
    }

    /// Queries the room's metadata.
    pub async fn info(&self) -> Result<RoomInfo, RoomError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.sender
            .send(RoomCommand::Info { reply: reply_tx })
            .await
            .map_err(|_| self.unavailable())?;
        reply_rx.await.map_err(|_| self.unavailable())
    }

    /// Signals the room to stop. Idempotent.
    pub fn stop(&self) {
        self.stop.send_replace(true);
    }

    /// Returns `true` once the actor has exited.
    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }

    fn unavailable(&self) -> RoomError {
        RoomError::Unavailable(self.code.clone())
    }
}

// ---------------------------------------------------------------------------
// Actor
// ---------------------------------------------------------------------------

struct ClientEntry {
    outbox: mpsc::Sender<Frame>,
}

/// The internal room actor state. Runs inside a Tokio task.
struct RoomActor<C> {
    code: RoomCode,
    instance: u64,
    config: RoomConfig,
    status: RoomStatus,
    state: State,
    /// Latched input per player; replaced, never queued.
    inputs: HashMap<PlayerId, Input>,
    clients: BTreeMap<PlayerId, ClientEntry>,
    next_player_id: u64,
    /// Index into `state.eliminated` of the first entry not yet broadcast.
    eliminated_cursor: usize,
    codec: JsonCodec,
    scheduler: TickScheduler,
    mailbox: mpsc::Receiver<RoomCommand<C>>,
    stop: watch::Receiver<bool>,
    on_empty: Option<mpsc::UnboundedSender<EmptyNotice>>,
}

impl<C: ClientHandle> RoomActor<C> {
    /// Runs the actor loop until stopped or every handle is gone.
    async fn run(mut self) {
        tracing::info!(
            code = %self.code,
            tick_hz = self.scheduler.tick_rate_hz(),
            broadcast_hz = self.scheduler.broadcast_hz(),
            "room started"
        );

        loop {
            tokio::select! {
                biased;

                // Err means every handle is gone, which is a stop too.
                _ = self.stop.changed() => break,

                cmd = self.mailbox.recv() => match cmd {
                    Some(cmd) => self.handle_command(cmd),
                    None => break,
                },

                info = self.scheduler.wait_for_tick() => {
                    self.on_tick(&info);
                    self.scheduler.record_tick_end();
                }
            }
        }

        if self.status.can_transition_to(RoomStatus::Stopped) {
            self.status = RoomStatus::Stopped;
        }
        // Dropping the outboxes lets each writer drain and hang up.
        let remaining = self.clients.len();
        self.clients.clear();

        let metrics = self.scheduler.metrics();
        tracing::info!(
            code = %self.code,
            status = %self.status,
            clients = remaining,
            ticks = metrics.total_ticks,
            overruns = metrics.total_overruns,
            avg_tick_us = metrics.avg_tick_time.as_micros() as u64,
            "room stopped"
        );
    }

    fn handle_command(&mut self, cmd: RoomCommand<C>) {
        match cmd {
            RoomCommand::Join {
                client,
                name,
                reply,
            } => {
                let player_id = self.handle_join(client, name);
                let _ = reply.send(player_id);
            }
            RoomCommand::Input { player_id, input } => {
                if self.clients.contains_key(&player_id) {
                    self.inputs.insert(player_id, input);
                }
            }
            RoomCommand::Leave { player_id } => self.handle_leave(player_id),
            RoomCommand::Info { reply } => {
                let _ = reply.send(self.info());
            }
        }
    }

    fn handle_join(&mut self, client: Arc<C>, name: Option<String>) -> PlayerId {
        self.next_player_id += 1;
        let player_id = PlayerId(self.next_player_id);
        let name = display_name(name, player_id);

        let (outbox, rx) = mpsc::channel(self.config.outbox_capacity);
        tokio::spawn(write_loop(
            client,
            rx,
            self.config.delivery_timeout,
            self.code.clone(),
            player_id,
        ));

        let welcome = ServerMessage::Welcome(Welcome {
            player_id: player_id.to_string(),
            tick_hz: self.scheduler.tick_rate_hz(),
        });
        if let Some(frame) = self.encode(&welcome) {
            // Fresh queue: cannot be full.
            let _ = outbox.try_send(frame);
        }

        self.state.spawn_player(player_id, name.as_str());
        self.clients.insert(player_id, ClientEntry { outbox });

        tracing::info!(
            code = %self.code,
            %player_id,
            %name,
            players = self.clients.len(),
            "player joined"
        );
        player_id
    }

    fn handle_leave(&mut self, player_id: PlayerId) {
        let Some(entry) = self.clients.remove(&player_id) else {
            return;
        };
        self.inputs.remove(&player_id);
        self.state.remove_player(player_id);

        let farewell = ServerMessage::State(StateSnapshot::from_state(
            &self.state,
            self.eliminated_cursor,
        ));
        if let Some(frame) = self.encode(&farewell) {
            let _ = entry.outbox.try_send(frame);
        }
        // `entry` drops here: the writer delivers what is queued, then
        // terminates the connection.

        tracing::info!(
            code = %self.code,
            %player_id,
            players = self.clients.len(),
            "player left"
        );
        self.notify_if_empty();
    }

    fn on_tick(&mut self, info: &TickInfo) {
        step(&mut self.state, &self.inputs);
        if info.broadcast {
            self.broadcast();
        }
    }

    /// Queues one snapshot on every client's outbox, evicting clients
    /// whose outbox is full or whose writer has gone away.
    fn broadcast(&mut self) {
        let snapshot = StateSnapshot::from_state(&self.state, self.eliminated_cursor);
        self.eliminated_cursor = self.state.eliminated.len();

        let Some(frame) = self.encode(&ServerMessage::State(snapshot)) else {
            return;
        };

        let mut evicted = Vec::new();
        for (player_id, entry) in &self.clients {
            match entry.outbox.try_send(Arc::clone(&frame)) {
                Ok(()) => {}
                Err(TrySendError::Full(_)) => evicted.push((*player_id, "outbox full")),
                Err(TrySendError::Closed(_)) => evicted.push((*player_id, "writer closed")),
            }
        }
        for (player_id, reason) in evicted {
            self.evict(player_id, reason);
        }
    }

    fn evict(&mut self, player_id: PlayerId, reason: &'static str) {
        self.clients.remove(&player_id);
        self.inputs.remove(&player_id);
        self.state.remove_player(player_id);
        tracing::warn!(code = %self.code, %player_id, reason, "client evicted");
        self.notify_if_empty();
    }

    fn notify_if_empty(&self) {
        if !self.clients.is_empty() {
            return;
        }
        if let Some(on_empty) = &self.on_empty {
            let _ = on_empty.send(EmptyNotice {
                code: self.code.clone(),
                instance: self.instance,
            });
        }
    }

    fn encode(&self, msg: &ServerMessage) -> Option<Frame> {
        match self.codec.encode(msg) {
            Ok(bytes) => Some(bytes.into()),
            Err(e) => {
                tracing::error!(code = %self.code, error = %e, "failed to encode message");
                None
            }
        }
    }

    fn info(&self) -> RoomInfo {
        RoomInfo {
            code: self.code.clone(),
            status: self.status,
            player_count: self.clients.len(),
            tick: self.state.tick,
        }
    }
}

/// Falls back to `Player N` for a missing or blank name.
fn display_name(name: Option<String>, player_id: PlayerId) -> String {
    let trimmed: String = name
        .as_deref()
        .map(str::trim)
        .unwrap_or_default()
        .chars()
        .take(MAX_NAME_CHARS)
        .collect();
    if trimmed.is_empty() {
        format!("Player {}", player_id.0)
    } else {
        trimmed
    }
}

/// Delivers one client's queued frames in order.
///
/// Ends on the first failed or timed-out delivery, or once the room drops
/// the outbox and the queue is drained. Either way the connection is
/// terminated.
async fn write_loop<C: ClientHandle>(
    client: Arc<C>,
    mut outbox: mpsc::Receiver<Frame>,
    delivery_timeout: Duration,
    code: RoomCode,
    player_id: PlayerId,
) {
    while let Some(frame) = outbox.recv().await {
        match tokio::time::timeout(delivery_timeout, client.deliver(&frame)).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                tracing::debug!(%code, %player_id, error = %e, "delivery failed");
                break;
            }
            Err(_) => {
                tracing::warn!(%code, %player_id, ?delivery_timeout, "delivery timed out");
                break;
            }
        }
    }
    // Closing the receiver makes the room's next `try_send` fail, which
    // evicts this client if it is still registered.
    drop(outbox);

    match tokio::time::timeout(TERMINATE_TIMEOUT, client.terminate()).await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => tracing::trace!(%code, %player_id, error = %e, "terminate failed"),
        Err(_) => tracing::debug!(%code, %player_id, "terminate timed out"),
    }
}

/// Spawns a standalone room actor and returns a handle to it.
///
/// Must be called from within a Tokio runtime.
pub fn spawn_room<C: ClientHandle>(code: RoomCode, config: RoomConfig) -> RoomHandle<C> {
    spawn_room_inner(code, 0, config, None)
}

pub(crate) fn spawn_room_inner<C: ClientHandle>(
    code: RoomCode,
    instance: u64,
    config: RoomConfig,
    on_empty: Option<mpsc::UnboundedSender<EmptyNotice>>,
) -> RoomHandle<C> {
    let (tx, rx) = mpsc::channel(config.mailbox_capacity.max(1));
    let (stop_tx, stop_rx) = watch::channel(false);
    let scheduler = TickScheduler::new(config.tick.clone());

    let actor = RoomActor {
        code: code.clone(),
        instance,
        config,
        status: RoomStatus::Running,
        state: State::new(),
        inputs: HashMap::new(),
        clients: BTreeMap::new(),
        next_player_id: 0,
        eliminated_cursor: 0,
        codec: JsonCodec,
        scheduler,
        mailbox: rx,
        stop: stop_rx,
        on_empty,
    };

    tokio::spawn(actor.run());

    RoomHandle {
        code,
        instance,
        sender: tx,
        stop: Arc::new(stop_tx),
    }
}
