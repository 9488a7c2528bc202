//! The round controller.
//!
//! `Round` owns the whole client-side aggregate of one game: metadata, ply
//! history and cursor, clock, pending submission, queued premove and
//! berserk flags. Every entry point runs to completion synchronously and
//! leaves the effects it produced in an outbox the host drains with
//! [`Round::take_effects`].

use std::time::{Duration, Instant};

use thiserror::Error;
use tracing::{debug, info, warn};

use super::berserk::BerserkTracker;
use super::clock::{ClockSnapshot, ClockSync};
use super::config::{ConfigError, RoundConfig};
use super::effects::{BoardCommand, BoardConfig, Effect, Listener, Sound};
use super::event::{ClientMessage, Outbound, SendOptions};
use super::history::{HistoryError, JumpDirection, PlyHistory};
use super::host::Host;
use super::meta::GameMeta;
use super::premove::{PremoveReplay, Queued};
use super::snapshot::GameData;
use super::submission::{Gesture, MoveSubmission, PendingAction, Resolution};
use super::timers::{Scheduler, SettleToken, Task, TimerId};
use super::types::{parse_possible_moves, Color, Dests, Role, Square, Uci};

/// Errors building or reloading a round.
#[derive(Debug, Error)]
pub enum RoundError {
    #[error(transparent)]
    History(#[from] HistoryError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Timers and listeners registered while the round is loaded.
#[derive(Debug, Default)]
struct Registrations {
    active: bool,
    tournament: Option<TimerId>,
}

/// Client-side state of one game.
#[derive(Debug)]
pub struct Round<H: Host> {
    pub(super) host: H,
    pub(super) config: RoundConfig,
    pub(super) meta: GameMeta,
    pub(super) history: PlyHistory,
    pub(super) clock: ClockSync,
    pub(super) submission: MoveSubmission,
    pub(super) premoves: PremoveReplay,
    pub(super) berserk: BerserkTracker,
    pub(super) scheduler: Scheduler,
    registrations: Registrations,
    next_settle: u64,
    pub(super) effects: Vec<Effect>,
}

impl<H: Host> Round<H> {
    /// Build a round from its first snapshot and register its timers and
    /// listeners.
    pub fn new(
        data: GameData,
        config: RoundConfig,
        host: H,
        now: Instant,
    ) -> Result<Self, RoundError> {
        config.validate()?;
        let history = PlyHistory::new(data.steps)?;
        let meta = data.meta;
        let clock = ClockSync::new(
            data.clock.as_ref(),
            data.correspondence.as_ref(),
            meta.player.spectator,
            &config,
            now,
        );
        let berserk = BerserkTracker::new(
            meta.side(Color::White).berserk,
            meta.side(Color::Black).berserk,
            config.signal_throttle(),
        );

        let mut round = Self {
            host,
            config,
            meta,
            history,
            clock,
            submission: MoveSubmission::new(),
            premoves: PremoveReplay::new(),
            berserk,
            scheduler: Scheduler::new(),
            registrations: Registrations::default(),
            next_settle: 0,
            effects: Vec::new(),
        };
        round.setup(now);
        round.connect_socket();
        round.effects.push(Effect::KeepAwake);
        Ok(round)
    }

    // Accessors

    pub fn meta(&self) -> &GameMeta {
        &self.meta
    }

    pub fn history(&self) -> &PlyHistory {
        &self.history
    }

    pub fn clock(&self) -> &ClockSync {
        &self.clock
    }

    pub fn submission(&self) -> &MoveSubmission {
        &self.submission
    }

    pub fn premoves(&self) -> &PremoveReplay {
        &self.premoves
    }

    pub fn berserk(&self) -> &BerserkTracker {
        &self.berserk
    }

    pub fn config(&self) -> &RoundConfig {
        &self.config
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    pub fn is_loaded(&self) -> bool {
        self.registrations.active
    }

    /// Timers currently scheduled, including one-shots.
    pub fn pending_timers(&self) -> usize {
        self.scheduler.len()
    }

    /// Drain the effects produced since the last call.
    pub fn take_effects(&mut self) -> Vec<Effect> {
        std::mem::take(&mut self.effects)
    }

    // Lifecycle

    /// Register interval timers and listeners. No-op if already done.
    fn setup(&mut self, now: Instant) {
        if self.registrations.active {
            return;
        }
        if let Some((interval, task)) = self.clock.tick_schedule(&self.config) {
            self.scheduler.schedule_every(now, interval, task);
        }
        if self
            .meta
            .tournament
            .as_ref()
            .is_some_and(|t| t.seconds_to_finish > 0)
        {
            self.registrations.tournament = Some(self.scheduler.schedule_every(
                now,
                self.config.tournament_tick(),
                Task::TournamentTick,
            ));
        }
        self.effects.push(Effect::Listen(Listener::Resume));
        self.effects.push(Effect::Listen(Listener::SeekCanceled));
        self.registrations.active = true;
        info!(game = %self.meta.game.id, timers = self.scheduler.len(), "round loaded");
    }

    /// Release every timer, listener and pending action. Safe to call more
    /// than once.
    pub fn unload(&mut self) {
        if !self.registrations.active {
            return;
        }
        let prompted = self.submission.is_prompted();
        if self.submission.cancel() {
            debug!(game = %self.meta.game.id, "pending action dropped on unload");
        }
        self.release_back_handler(false);
        if prompted {
            self.effects.push(Effect::HideConfirm);
        }
        self.scheduler.clear();
        self.premoves.clear();
        self.registrations = Registrations::default();
        self.effects.push(Effect::Unlisten(Listener::Resume));
        self.effects.push(Effect::Unlisten(Listener::SeekCanceled));
        info!(game = %self.meta.game.id, "round unloaded");
    }

    fn connect_socket(&mut self) {
        if self.host.has_network() {
            self.effects.push(Effect::ConnectSocket);
        } else {
            debug!(game = %self.meta.game.id, "no network, socket not connected");
        }
    }

    /// A matchmaking seek was cancelled: reconnect the game socket,
    /// re-registering timers and listeners if they were released.
    pub fn on_seek_canceled(&mut self, now: Instant) {
        self.setup(now);
        self.connect_socket();
    }

    /// The app came back to the foreground.
    pub fn on_resume(&mut self) {
        self.effects.push(Effect::Reload);
    }

    /// Replace metadata and steps with a freshly fetched snapshot.
    ///
    /// The cursor only returns to the live ply if the steps changed.
    pub fn reload(&mut self, data: GameData, now: Instant) -> Result<(), RoundError> {
        let reset = self.history.reload(data.steps)?;
        self.meta = data.meta;

        if let Some(clock) = &data.clock {
            self.clock.sync_real_time(clock, now);
        }
        if let Some(corres) = &data.correspondence {
            if !self.clock.adopt_correspondence(corres, now) {
                self.clock.update(
                    ClockSnapshot {
                        white: corres.white,
                        black: corres.black,
                    },
                    now,
                );
            } else if self.registrations.active {
                if let Some((interval, task)) = self.clock.tick_schedule(&self.config) {
                    self.scheduler.schedule_every(now, interval, task);
                }
            }
        }
        for color in [Color::White, Color::Black] {
            if self.meta.side(color).berserk {
                self.berserk.set(color);
            }
        }

        info!(game = %self.meta.game.id, reset, ply = self.history.current_ply(), "round reloaded");
        if !self.replaying() {
            self.effects.push(Effect::Board(BoardCommand::Reload {
                fen: self.history.current().fen.clone(),
                turn_color: self.meta.game.player,
                dests: self.player_dests(),
            }));
        }
        Ok(())
    }

    /// Snapshot of the current state, as persisted offline.
    pub fn snapshot(&self) -> GameData {
        GameData {
            meta: self.meta.clone(),
            steps: self.history.steps().to_vec(),
            clock: self.clock.real_time().map(|c| c.to_data()),
            correspondence: self.clock.correspondence().map(|c| c.to_data()),
        }
    }

    // Navigation

    /// Viewer is browsing an earlier ply.
    pub fn replaying(&self) -> bool {
        !self.history.is_live()
    }

    pub fn can_drop(&self) -> bool {
        !self.replaying() && self.meta.is_player_playing()
    }

    /// Show the position at `ply`. Returns false, changing nothing, when
    /// `ply` is outside the history.
    pub fn jump(&mut self, ply: u32) -> bool {
        let direction = match self.history.jump(ply) {
            Ok(direction) => direction,
            Err(err) => {
                debug!(%err, "jump rejected");
                return false;
            }
        };
        let live = self.history.is_live();
        let step = self.history.current();
        let mut config = BoardConfig {
            fen: step.fen.clone(),
            last_move: step
                .uci
                .as_deref()
                .and_then(|u| Uci::parse(u).ok())
                .map(|u| u.last_move()),
            check: step.check,
            turn_color: Color::to_move_at(ply),
            movable_color: None,
            dests: None,
        };
        let feedback = match (&step.san, direction) {
            (Some(_), JumpDirection::Forward) if step.is_capture() => Some(Sound::Capture),
            (Some(_), JumpDirection::Forward) => Some(Sound::Move),
            _ => None,
        };
        if live {
            config.movable_color = self
                .meta
                .is_player_playing()
                .then_some(self.meta.player.color);
            config.dests = Some(parse_possible_moves(self.meta.possible_moves.as_ref()));
        }

        self.effects.push(Effect::Board(BoardCommand::Set(config)));
        if !live {
            self.effects.push(Effect::Board(BoardCommand::Stop));
        }
        if let Some(sound) = feedback {
            self.effects.push(Effect::Sound(sound));
        }
        true
    }

    pub fn jump_next(&mut self) -> bool {
        self.jump(self.history.current_ply() + 1)
    }

    pub fn jump_prev(&mut self) -> bool {
        match self.history.current_ply().checked_sub(1) {
            Some(ply) => self.jump(ply),
            None => false,
        }
    }

    pub fn jump_first(&mut self) -> bool {
        self.jump(self.history.first_ply())
    }

    pub fn jump_last(&mut self) -> bool {
        self.jump(self.history.last_ply())
    }

    // User gestures

    /// The user played a legal move on the board.
    pub fn user_move(
        &mut self,
        orig: Square,
        dest: Square,
        promotion: Option<Role>,
        premove: bool,
        now: Instant,
    ) {
        let action = PendingAction::Move {
            orig,
            dest,
            promotion,
        };
        self.submit_gesture(action, premove, now);
    }

    /// The user dropped a piece from the pocket.
    ///
    /// Invalid drops, or drops while browsing, revert the board.
    pub fn on_user_new_piece(&mut self, role: Role, square: Square, predrop: bool, now: Instant) {
        if !self.replaying() && self.host.is_valid_drop(&self.meta, role, square) {
            self.submit_gesture(PendingAction::Drop { role, square }, predrop, now);
        } else {
            self.jump(self.history.current_ply());
        }
    }

    fn submit_gesture(&mut self, action: PendingAction, speculative: bool, now: Instant) {
        if !self.registrations.active {
            debug!(game = %self.meta.game.id, "round unloaded, gesture ignored");
            return;
        }
        match self
            .submission
            .gesture(action, self.meta.pref.submit_move, speculative)
        {
            Gesture::Send(message) => self.send_action(message),
            Gesture::Defer { token } => {
                let delay = Duration::from_millis(self.meta.pref.animation_duration);
                self.scheduler
                    .schedule_once(now, delay, Task::ConfirmPrompt { token });
                debug!(token, "action awaiting confirmation");
            }
        }
    }

    /// Send a move or drop, warning the user if a correspondence move
    /// leaves while offline.
    fn send_action(&mut self, message: ClientMessage) {
        let options = SendOptions {
            ackable: true,
            with_lag: self.clock.is_real_time(),
        };
        debug!(kind = message.kind(), "sending action");
        self.effects.push(Effect::Send(Outbound { message, options }));
        if self.meta.is_correspondence() && !self.host.has_network() {
            warn!(game = %self.meta.game.id, "correspondence move sent while offline");
            self.effects.push(Effect::ConnectivityWarning);
        }
    }

    /// Confirm (`true`) or reject (`false`) the pending action.
    pub fn submit_move(&mut self, confirm: bool) {
        let prompted = self.submission.is_prompted();
        match self.submission.submit(confirm) {
            Resolution::Committed(message) => {
                self.release_back_handler(false);
                if prompted {
                    self.effects.push(Effect::HideConfirm);
                }
                self.send_action(message);
            }
            Resolution::Cancelled { .. } => self.finish_cancel(prompted, false),
        }
    }

    /// Drop the pending action and revert the board. Idempotent.
    pub fn cancel_move(&mut self, from_back_button: bool) {
        let prompted = self.submission.is_prompted();
        self.submission.cancel();
        self.finish_cancel(prompted, from_back_button);
    }

    fn finish_cancel(&mut self, prompted: bool, from_back_button: bool) {
        self.release_back_handler(from_back_button);
        if prompted {
            self.effects.push(Effect::HideConfirm);
        }
        self.jump(self.history.current_ply());
    }

    /// The back button pops its own handler, so nothing to pop then.
    fn release_back_handler(&mut self, from_back_button: bool) {
        if self.submission.release_back_handler() && !from_back_button {
            self.effects.push(Effect::PopBackHandler);
        }
    }

    // Board callbacks

    /// The board animated a move locally.
    pub fn on_board_move(&mut self, dest: Square, captured: bool) {
        if captured {
            if self.meta.game.variant.key.has_cascading_capture() {
                self.effects
                    .push(Effect::Board(BoardCommand::Explode { square: dest }));
                self.effects.push(Effect::Sound(Sound::Explosion));
            } else {
                self.effects.push(Effect::Sound(Sound::Capture));
            }
        } else {
            self.effects.push(Effect::Sound(Sound::Move));
        }
        if !self.meta.player.spectator {
            self.effects.push(Effect::Vibrate);
        }
    }

    /// The board placed a dropped piece locally.
    pub fn on_board_new_piece(&mut self) {
        self.effects.push(Effect::Sound(Sound::Move));
    }

    pub fn queue_premove(&mut self, orig: Square, dest: Square) {
        self.premoves.set_premove(orig, dest);
    }

    pub fn queue_predrop(&mut self, role: Role, square: Square) {
        self.premoves.set_predrop(role, square);
    }

    pub fn cancel_premove(&mut self) {
        self.premoves.clear();
        self.scheduler
            .cancel_where(|t| matches!(t, Task::PremoveReplay { .. }));
    }

    // Berserk

    /// The server confirmed `color` went berserk.
    pub fn set_berserk(&mut self, color: Color) {
        if !self.berserk.set(color) {
            return;
        }
        self.meta.side_mut(color).berserk = true;
        if color != self.meta.player.color {
            self.effects.push(Effect::Sound(Sound::Berserk));
        }
    }

    /// The local player asks to go berserk.
    pub fn go_berserk(&mut self, now: Instant) {
        if self.berserk.try_signal(now) {
            self.effects
                .push(Effect::Send(Outbound::plain(ClientMessage::Berserk)));
        }
        self.effects.push(Effect::Sound(Sound::Berserk));
    }

    // Timers

    /// Real-time clock counts down: it exists, the game is playable, and
    /// either two plies were played since it started or the server says it
    /// is running.
    pub fn is_clock_running(&self) -> bool {
        self.clock.real_time().is_some_and(|c| {
            self.meta.is_playable() && (self.meta.plies_since_clock_start() > 1 || c.running)
        })
    }

    /// Fire every timer due at `now`.
    pub fn poll(&mut self, now: Instant) {
        while let Some((_, task)) = self.scheduler.pop_due(now) {
            self.run_task(task, now);
        }
    }

    fn run_task(&mut self, task: Task, now: Instant) {
        match task {
            Task::ClockTick => {
                let running = self.is_clock_running();
                self.clock_tick(running, now);
            }
            Task::CorrespondenceTick => {
                let running = self.clock.is_correspondence() && self.meta.is_playable();
                self.clock_tick(running, now);
            }
            Task::TournamentTick => self.tournament_tick(),
            Task::PremoveReplay { after } => self.replay_premove(after),
            Task::ConfirmPrompt { token } => {
                if let Some(action) = self.submission.prompt(token) {
                    if self.submission.register_back_handler() {
                        self.effects.push(Effect::PushBackHandler);
                    }
                    self.effects.push(Effect::ShowConfirm(action));
                }
            }
        }
    }

    fn clock_tick(&mut self, running: bool, now: Instant) {
        let turn = self.meta.game.player;
        if self.clock.tick(turn, running, now) {
            info!(game = %self.meta.game.id, color = %turn, "out of time");
            self.effects
                .push(Effect::Send(Outbound::plain(ClientMessage::OutOfTime)));
        }
    }

    fn tournament_tick(&mut self) {
        let Some(tournament) = self.meta.tournament.as_mut() else {
            return;
        };
        if tournament.seconds_to_finish > 0 {
            tournament.seconds_to_finish -= 1;
            self.effects
                .push(Effect::TournamentCountdown(tournament.seconds_to_finish));
        } else if let Some(id) = self.registrations.tournament.take() {
            self.scheduler.cancel(id);
        }
    }

    pub(super) fn next_settle_token(&mut self) -> SettleToken {
        self.next_settle += 1;
        SettleToken(self.next_settle)
    }

    pub(super) fn schedule_premove_replay(&mut self, after: SettleToken, now: Instant) {
        if !self.registrations.active || !self.premoves.arm(after) {
            return;
        }
        let cascading = self.meta.game.variant.key.has_cascading_capture();
        let delay = self.config.premove_delay(cascading);
        self.scheduler
            .schedule_once(now, delay, Task::PremoveReplay { after });
        debug!(?delay, token = after.0, "premove replay scheduled");
    }

    fn replay_premove(&mut self, after: SettleToken) {
        match self.premoves.take_for(after) {
            Some(Queued::Premove { orig, dest }) => {
                self.effects
                    .push(Effect::Board(BoardCommand::PlayPremove { orig, dest }));
            }
            Some(Queued::Predrop { role, square }) => {
                if self.host.is_valid_drop(&self.meta, role, square) {
                    self.effects
                        .push(Effect::Board(BoardCommand::PlayPredrop { role, square }));
                } else {
                    debug!(?role, %square, "predrop no longer valid, discarded");
                }
            }
            None => {}
        }
    }

    /// Legal destinations for the local player, empty when not playing.
    pub(super) fn player_dests(&self) -> Dests {
        if self.meta.is_player_playing() {
            parse_possible_moves(self.meta.possible_moves.as_ref())
        } else {
            Dests::new()
        }
    }
}
