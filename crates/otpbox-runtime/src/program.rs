#![forbid(unsafe_code)]

//! Elm-style runtime for the OTP widget.
//!
//! The program owns a [`Model`], routes messages through
//! [`Model::update`], and executes the [`Cmd`]s it returns. Side effects the
//! model cannot perform itself go through collaborators owned by the
//! program: a [`ClipboardReader`] for clipboard text and a [`FocusHost`] for
//! focus.
//!
//! # Ordering
//!
//! Everything runs on the caller's thread in one cooperative loop:
//!
//! - `Cmd::Msg` and `Cmd::Inspect` are handled within the current turn, after
//!   the update that produced them has finished mutating state.
//! - `Cmd::Focus` and `Cmd::After(Duration::ZERO, _)` run on the *next* tick,
//!   i.e. the next [`Program::pump`] or [`Program::advance`].
//! - Clipboard reads complete asynchronously and are delivered on a later
//!   tick. Reads that complete after [`Program::teardown`] are dropped.
//!
//! # Time
//!
//! Time is virtual. [`Program::advance`] moves the clock forward and fires
//! deferred messages and subscription ticks in deadline order; interactive
//! hosts drive it from the wall clock with [`Program::run_until`].
//!
//! # Example
//!
//! ```ignore
//! let mut program = Program::new(widget, MemoryClipboard::new(), FocusTracker::new());
//! program.send(OtpMsg::Key { index: 0, key: KeyEvent::new(KeyCode::Char('4')) });
//! program.advance(Duration::from_secs(2));
//! ```

use std::collections::{BinaryHeap, VecDeque};
use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use otpbox_core::clipboard::{ClipboardError, ClipboardReader};
use otpbox_core::event::Event;
use otpbox_core::focus::{CellId, FocusHost, FocusSnapshot};

use crate::cancellation::{CancellationSource, CancellationToken};
use crate::effect_system::{record_stale_read, trace_command_effect};
use crate::subscription::{Subscription, SubscriptionManager};

/// Application state and behavior.
pub trait Model: Sized {
    /// The message type for this model.
    type Message: Send + 'static;

    /// Initialize the model with startup commands.
    ///
    /// Called once when the program mounts the model.
    fn init(&mut self) -> Cmd<Self::Message> {
        Cmd::none()
    }

    /// Update the model in response to a message.
    ///
    /// State must be fully mutated before this returns; the commands it
    /// returns run afterwards.
    fn update(&mut self, msg: Self::Message) -> Cmd<Self::Message>;

    /// Subscriptions that should be running in the current state.
    fn subscriptions(&self) -> Vec<Box<dyn Subscription<Self::Message>>> {
        Vec::new()
    }
}

/// Builds a message from a focus snapshot.
pub type InspectFn<M> = Box<dyn FnOnce(FocusSnapshot) -> M + Send>;

/// Builds a message from a clipboard read result.
pub type ReadFn<M> = Box<dyn FnOnce(Result<String, ClipboardError>) -> M + Send>;

/// Commands represent side effects to be executed by the runtime.
pub enum Cmd<M> {
    /// No operation.
    None,
    /// Execute several commands in order.
    Batch(Vec<Cmd<M>>),
    /// Send a message to the model within the current turn.
    Msg(M),
    /// Send a message after a delay. `Duration::ZERO` means next tick.
    After(Duration, M),
    /// Move host focus to a cell on the next tick.
    Focus(CellId),
    /// Query host focus and turn the answer into a message.
    Inspect(InspectFn<M>),
    /// Read the clipboard and turn the result into a message.
    ReadClipboard(ReadFn<M>),
}

impl<M> Cmd<M> {
    /// Create a no-op command.
    #[inline]
    pub fn none() -> Self {
        Self::None
    }

    /// Create a message command.
    #[inline]
    pub fn msg(m: M) -> Self {
        Self::Msg(m)
    }

    /// Create a delayed message command.
    #[inline]
    pub fn after(delay: Duration, m: M) -> Self {
        Self::After(delay, m)
    }

    /// Create a deferred focus command.
    #[inline]
    pub fn focus(cell: CellId) -> Self {
        Self::Focus(cell)
    }

    /// Create a focus query.
    pub fn inspect(f: impl FnOnce(FocusSnapshot) -> M + Send + 'static) -> Self {
        Self::Inspect(Box::new(f))
    }

    /// Create a clipboard read.
    pub fn read_clipboard(f: impl FnOnce(Result<String, ClipboardError>) -> M + Send + 'static) -> Self {
        Self::ReadClipboard(Box::new(f))
    }

    /// Combine commands, dropping no-ops.
    pub fn batch(cmds: Vec<Self>) -> Self {
        let mut cmds: Vec<Self> = cmds.into_iter().filter(|c| !c.is_none()).collect();
        match cmds.len() {
            0 => Self::None,
            1 => cmds.pop().unwrap_or(Self::None),
            _ => Self::Batch(cmds),
        }
    }

    /// Append another command.
    #[must_use]
    pub fn and(self, other: Self) -> Self {
        Self::batch(vec![self, other])
    }

    /// Whether this is a no-op.
    #[must_use]
    pub fn is_none(&self) -> bool {
        match self {
            Self::None => true,
            Self::Batch(cmds) => cmds.iter().all(Self::is_none),
            _ => false,
        }
    }

    /// Command kind label used in traces.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Batch(_) => "batch",
            Self::Msg(_) => "msg",
            Self::After(..) => "after",
            Self::Focus(_) => "focus",
            Self::Inspect(_) => "inspect",
            Self::ReadClipboard(_) => "read_clipboard",
        }
    }

    /// Flatten nested batches into a list of leaf commands.
    #[must_use]
    pub fn flatten(self) -> Vec<Self> {
        match self {
            Self::None => Vec::new(),
            Self::Batch(cmds) => cmds.into_iter().flat_map(Self::flatten).collect(),
            other => vec![other],
        }
    }
}

impl<M> Default for Cmd<M> {
    fn default() -> Self {
        Self::None
    }
}

impl<M: fmt::Debug> fmt::Debug for Cmd<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => write!(f, "None"),
            Self::Batch(cmds) => f.debug_tuple("Batch").field(cmds).finish(),
            Self::Msg(m) => f.debug_tuple("Msg").field(m).finish(),
            Self::After(d, m) => f.debug_tuple("After").field(d).field(m).finish(),
            Self::Focus(id) => f.debug_tuple("Focus").field(id).finish(),
            Self::Inspect(_) => write!(f, "Inspect(..)"),
            Self::ReadClipboard(_) => write!(f, "ReadClipboard(..)"),
        }
    }
}

/// Where clipboard reads run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReadMode {
    /// Read on the calling thread; deliver the result on the next tick.
    #[default]
    Inline,
    /// Read on a worker thread; deliver whenever it completes.
    Background,
}

/// Configuration for the program runtime.
#[derive(Debug, Clone)]
pub struct ProgramConfig {
    /// Where clipboard reads run.
    pub read_mode: ReadMode,
    /// Upper bound on messages handled per turn, guarding against
    /// models that keep emitting `Cmd::Msg`.
    pub max_messages_per_turn: usize,
}

impl Default for ProgramConfig {
    fn default() -> Self {
        Self {
            read_mode: ReadMode::Inline,
            max_messages_per_turn: 1024,
        }
    }
}

impl ProgramConfig {
    /// Set the read mode (builder).
    #[must_use]
    pub fn with_read_mode(mut self, mode: ReadMode) -> Self {
        self.read_mode = mode;
        self
    }
}

enum Deferred<M> {
    Msg(M),
    Focus(CellId),
}

struct Timer<M> {
    due: Duration,
    seq: u64,
    work: Deferred<M>,
}

impl<M> PartialEq for Timer<M> {
    fn eq(&self, other: &Self) -> bool {
        self.due == other.due && self.seq == other.seq
    }
}

impl<M> Eq for Timer<M> {}

impl<M> PartialOrd for Timer<M> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<M> Ord for Timer<M> {
    // Reversed so the BinaryHeap pops the earliest deadline, FIFO among equals.
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .due
            .cmp(&self.due)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

struct CompletedRead<M> {
    token: CancellationToken,
    msg: M,
}

/// The program runtime.
pub struct Program<M: Model, C: ClipboardReader + 'static, F: FocusHost> {
    model: M,
    clipboard: Arc<C>,
    focus: F,
    config: ProgramConfig,
    now: Duration,
    seq: u64,
    timers: BinaryHeap<Timer<M::Message>>,
    queue: VecDeque<M::Message>,
    subscriptions: SubscriptionManager<M::Message>,
    reads_tx: mpsc::Sender<CompletedRead<M::Message>>,
    reads_rx: mpsc::Receiver<CompletedRead<M::Message>>,
    in_flight: usize,
    liveness: CancellationSource,
    torn_down: bool,
}

impl<M, C, F> Program<M, C, F>
where
    M: Model,
    C: ClipboardReader + 'static,
    F: FocusHost,
{
    /// Mount `model` with default configuration.
    pub fn new(model: M, clipboard: C, focus: F) -> Self {
        Self::with_config(model, clipboard, focus, ProgramConfig::default())
    }

    /// Mount `model`, run its `init` commands and start its subscriptions.
    pub fn with_config(model: M, clipboard: C, focus: F, config: ProgramConfig) -> Self {
        let (reads_tx, reads_rx) = mpsc::channel();
        let mut program = Self {
            model,
            clipboard: Arc::new(clipboard),
            focus,
            config,
            now: Duration::ZERO,
            seq: 0,
            timers: BinaryHeap::new(),
            queue: VecDeque::new(),
            subscriptions: SubscriptionManager::new(),
            reads_tx,
            reads_rx,
            in_flight: 0,
            liveness: CancellationSource::new(),
            torn_down: false,
        };
        tracing::debug!(target: "otpbox.program", "mounting model");
        let cmd = program.model.init();
        program.execute(cmd);
        program.drain_queue();
        program.reconcile_subscriptions();
        program
    }

    /// The mounted model.
    pub fn model(&self) -> &M {
        &self.model
    }

    /// Mutable access to the model.
    ///
    /// Commands are not produced this way; prefer [`send`](Self::send).
    pub fn model_mut(&mut self) -> &mut M {
        &mut self.model
    }

    /// The focus host.
    pub fn focus(&self) -> &F {
        &self.focus
    }

    /// Mutable access to the focus host, e.g. to simulate the user clicking
    /// elsewhere.
    pub fn focus_mut(&mut self) -> &mut F {
        &mut self.focus
    }

    /// The clipboard reader.
    pub fn clipboard(&self) -> &C {
        &self.clipboard
    }

    /// Current virtual time since mount.
    pub fn now(&self) -> Duration {
        self.now
    }

    /// Number of deferred messages and focus moves not yet run.
    pub fn pending_timers(&self) -> usize {
        self.timers.len()
    }

    /// Number of running subscriptions.
    pub fn active_subscriptions(&self) -> usize {
        self.subscriptions.len()
    }

    /// Whether [`teardown`](Self::teardown) has run.
    pub fn is_torn_down(&self) -> bool {
        self.torn_down
    }

    /// Liveness token for effects that outlive a single turn.
    pub fn liveness(&self) -> CancellationToken {
        self.liveness.token()
    }

    /// Deliver a message and run the resulting turn.
    pub fn send(&mut self, msg: M::Message) {
        if self.torn_down {
            tracing::debug!(target: "otpbox.program", "ignoring message after teardown");
            return;
        }
        self.queue.push_back(msg);
        self.drain_queue();
        self.reconcile_subscriptions();
    }

    /// Deliver a host input event.
    pub fn handle_event(&mut self, event: Event)
    where
        M::Message: From<Event>,
    {
        self.send(M::Message::from(event));
    }

    /// Run work that is due now: deferred focus, zero-delay messages and
    /// completed clipboard reads.
    pub fn pump(&mut self) {
        self.advance(Duration::ZERO);
    }

    /// Move the virtual clock forward by `dt`, firing everything that falls
    /// due on the way in deadline order.
    ///
    /// A subscription fires at most once per call: deadlines it missed
    /// during a long jump are merged, the way a sleeping host wakes to a
    /// single timer callback.
    pub fn advance(&mut self, dt: Duration) {
        if self.torn_down {
            return;
        }
        let target = self.now + dt;
        loop {
            self.deliver_reads();
            if self.torn_down {
                return;
            }

            let timer_due = self.timers.peek().map(|t| t.due).filter(|d| *d <= target);
            let sub_due = self.subscriptions.next_due().filter(|d| *d <= target);

            match (timer_due, sub_due) {
                (Some(t), Some(s)) if s < t => self.fire_subscription(s, target),
                (Some(_), _) => {
                    if let Some(timer) = self.timers.pop() {
                        self.now = self.now.max(timer.due);
                        self.run_deferred(timer.work);
                    }
                }
                (None, Some(s)) => self.fire_subscription(s, target),
                (None, None) => break,
            }
        }
        self.now = target;
    }

    /// Block until a background clipboard read completes or `timeout`
    /// elapses, then deliver it. Returns `true` if something was delivered.
    pub fn wait_for_read(&mut self, timeout: Duration) -> bool {
        if self.torn_down || self.in_flight == 0 {
            return false;
        }
        match self.reads_rx.recv_timeout(timeout) {
            Ok(read) => {
                self.in_flight = self.in_flight.saturating_sub(1);
                self.accept_read(read);
                self.drain_queue();
                self.reconcile_subscriptions();
                true
            }
            Err(_) => false,
        }
    }

    /// Drive the program from the wall clock until `stop` is cancelled.
    pub fn run_until(&mut self, stop: &CancellationToken, tick: Duration) {
        let mut last = web_time::Instant::now();
        while !self.torn_down && !stop.wait_timeout(tick) {
            let now = web_time::Instant::now();
            self.advance(now.duration_since(last));
            last = now;
        }
    }

    /// Unmount: cancel in-flight work, stop subscriptions, drop timers.
    ///
    /// Idempotent; also runs on drop.
    pub fn teardown(&mut self) {
        if self.torn_down {
            return;
        }
        tracing::debug!(
            target: "otpbox.program",
            pending_timers = self.timers.len(),
            in_flight_reads = self.in_flight,
            "tearing down"
        );
        self.torn_down = true;
        self.liveness.cancel();
        self.subscriptions.stop_all();
        self.timers.clear();
        self.queue.clear();
        while let Ok(read) = self.reads_rx.try_recv() {
            drop(read);
            record_stale_read();
        }
    }

    fn fire_subscription(&mut self, due: Duration, horizon: Duration) {
        self.now = self.now.max(due);
        if let Some(msg) = self.subscriptions.fire_due(self.now, horizon) {
            self.queue.push_back(msg);
            self.drain_queue();
            self.reconcile_subscriptions();
        }
    }

    fn run_deferred(&mut self, work: Deferred<M::Message>) {
        match work {
            Deferred::Msg(msg) => {
                self.queue.push_back(msg);
                self.drain_queue();
                self.reconcile_subscriptions();
            }
            Deferred::Focus(cell) => {
                trace_command_effect("focus", || self.focus.focus(cell));
            }
        }
    }

    fn drain_queue(&mut self) {
        let mut handled = 0usize;
        while let Some(msg) = self.queue.pop_front() {
            if self.torn_down {
                self.queue.clear();
                return;
            }
            if handled >= self.config.max_messages_per_turn {
                tracing::warn!(
                    target: "otpbox.program",
                    dropped = self.queue.len() + 1,
                    "message budget for this turn exhausted"
                );
                self.queue.clear();
                return;
            }
            handled += 1;
            let cmd = self.model.update(msg);
            self.execute(cmd);
        }
    }

    fn reconcile_subscriptions(&mut self) {
        if self.torn_down {
            return;
        }
        let subs = self.model.subscriptions();
        self.subscriptions.reconcile(subs, self.now);
    }

    fn schedule(&mut self, delay: Duration, work: Deferred<M::Message>) {
        self.seq += 1;
        self.timers.push(Timer {
            due: self.now + delay,
            seq: self.seq,
            work,
        });
    }

    fn execute(&mut self, cmd: Cmd<M::Message>) {
        match cmd {
            Cmd::None => {}
            Cmd::Batch(cmds) => {
                for cmd in cmds {
                    self.execute(cmd);
                }
            }
            Cmd::Msg(msg) => self.queue.push_back(msg),
            Cmd::After(delay, msg) => {
                trace_command_effect("after", || self.schedule(delay, Deferred::Msg(msg)));
            }
            Cmd::Focus(cell) => self.schedule(Duration::ZERO, Deferred::Focus(cell)),
            Cmd::Inspect(f) => {
                let snapshot = self.focus.snapshot();
                self.queue.push_back(f(snapshot));
            }
            Cmd::ReadClipboard(f) => self.start_read(f),
        }
    }

    fn start_read(&mut self, f: ReadFn<M::Message>) {
        let token = self.liveness.token();
        self.in_flight += 1;
        match self.config.read_mode {
            ReadMode::Inline => {
                let result = trace_command_effect("read_clipboard", || self.clipboard.read_text());
                let _ = self.reads_tx.send(CompletedRead {
                    token,
                    msg: f(result),
                });
            }
            ReadMode::Background => {
                let clipboard = Arc::clone(&self.clipboard);
                let tx = self.reads_tx.clone();
                thread::spawn(move || {
                    let result = clipboard.read_text();
                    if token.is_cancelled() {
                        record_stale_read();
                        return;
                    }
                    let _ = tx.send(CompletedRead {
                        token,
                        msg: f(result),
                    });
                });
            }
        }
    }

    fn deliver_reads(&mut self) {
        let mut delivered = false;
        while let Ok(read) = self.reads_rx.try_recv() {
            self.in_flight = self.in_flight.saturating_sub(1);
            self.accept_read(read);
            delivered = true;
        }
        if delivered {
            self.drain_queue();
            self.reconcile_subscriptions();
        }
    }

    fn accept_read(&mut self, read: CompletedRead<M::Message>) {
        if read.token.is_cancelled() || self.torn_down {
            record_stale_read();
            return;
        }
        self.queue.push_back(read.msg);
    }
}

impl<M, C, F> Drop for Program<M, C, F>
where
    M: Model,
    C: ClipboardReader + 'static,
    F: FocusHost,
{
    fn drop(&mut self) {
        self.teardown();
    }
}
