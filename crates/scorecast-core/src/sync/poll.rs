// Live game polling.
//
// `PollMachine` is a pure state machine (Idle -> Polling -> Stopped) whose
// transitions emit timer side effects. `run_session` executes those side
// effects with a tokio interval and feeds the status observed in each
// refresh back into the machine. `LivePollController` is the process-wide
// registry that guarantees at most one session, and therefore at most one
// timer, per game.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{Instant, Interval, MissedTickBehavior};
use tracing::{debug, info, warn};

use super::store::ResourceHandle;
use crate::model::game::{GameDetail, GameId, GameStatus};

/// Refresh cadence while a game is in progress.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(45);

// ---------------------------------------------------------------------------
// State machine
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollState {
    Idle,
    Polling,
    Stopped,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PollEvent {
    /// A status was seen, either from the caller or in a refresh response.
    StatusObserved(GameStatus),
    /// The observer became visible or hidden.
    VisibilityChanged(bool),
    /// The observer went away.
    Teardown,
}

/// Side effect requested by a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerAction {
    /// Clear any existing timer and arm a new one.
    Arm,
    Clear,
    Keep,
}

#[derive(Debug, Clone)]
pub struct PollMachine {
    state: PollState,
    visible: bool,
    armed: bool,
}

impl PollMachine {
    pub fn new(visible: bool) -> Self {
        Self {
            state: PollState::Idle,
            visible,
            armed: false,
        }
    }

    pub fn state(&self) -> PollState {
        self.state
    }

    pub fn is_armed(&self) -> bool {
        self.armed
    }

    pub fn handle(&mut self, event: &PollEvent) -> TimerAction {
        if self.state == PollState::Stopped {
            return TimerAction::Keep;
        }
        match event {
            PollEvent::StatusObserved(status) if status.is_terminal() => self.stop(),
            PollEvent::StatusObserved(status) if status.is_live() => {
                self.state = PollState::Polling;
                self.arm_if_visible()
            }
            PollEvent::StatusObserved(_) => TimerAction::Keep,
            PollEvent::VisibilityChanged(visible) => {
                self.visible = *visible;
                if self.state != PollState::Polling {
                    TimerAction::Keep
                } else if *visible {
                    self.arm_if_visible()
                } else if self.armed {
                    self.armed = false;
                    TimerAction::Clear
                } else {
                    TimerAction::Keep
                }
            }
            PollEvent::Teardown => self.stop(),
        }
    }

    fn arm_if_visible(&mut self) -> TimerAction {
        if self.visible && !self.armed {
            self.armed = true;
            TimerAction::Arm
        } else {
            TimerAction::Keep
        }
    }

    fn stop(&mut self) -> TimerAction {
        self.state = PollState::Stopped;
        if self.armed {
            self.armed = false;
            TimerAction::Clear
        } else {
            TimerAction::Keep
        }
    }
}

// ---------------------------------------------------------------------------
// Session driver
// ---------------------------------------------------------------------------

/// Something a poll tick can silently refresh.
#[async_trait]
pub trait PollTarget: Send + Sync {
    /// Refetch without a loading indicator. Returns the status found in the
    /// response, or `None` if the refresh failed or was superseded.
    async fn refresh(&self) -> Option<GameStatus>;
}

#[async_trait]
impl PollTarget for ResourceHandle<GameId, GameDetail> {
    async fn refresh(&self) -> Option<GameStatus> {
        self.refresh_silently().await.map(|detail| detail.game.status)
    }
}

/// Drive one poll session until the machine reaches `Stopped`.
///
/// Events are preferred over ticks so a teardown or terminal status that
/// arrives while a refresh is pending is applied before another tick can
/// fire.
pub async fn run_session(
    subject: GameId,
    mut machine: PollMachine,
    initial: GameStatus,
    target: Arc<dyn PollTarget>,
    period: Duration,
    mut events: mpsc::UnboundedReceiver<PollEvent>,
    state_tx: watch::Sender<PollState>,
) {
    let mut timer: Option<Interval> = None;
    let action = machine.handle(&PollEvent::StatusObserved(initial));
    apply(&mut timer, action, period, subject);
    state_tx.send_replace(machine.state());

    while machine.state() != PollState::Stopped {
        tokio::select! {
            biased;

            event = events.recv() => {
                let event = event.unwrap_or(PollEvent::Teardown);
                debug!(subject, ?event, "poll event");
                let action = machine.handle(&event);
                apply(&mut timer, action, period, subject);
            }

            _ = next_tick(&mut timer) => {
                debug!(subject, "poll tick");
                if let Some(status) = target.refresh().await {
                    let action = machine.handle(&PollEvent::StatusObserved(status));
                    apply(&mut timer, action, period, subject);
                }
            }
        }
        state_tx.send_replace(machine.state());
    }

    info!(subject, "poll session stopped");
}

fn apply(timer: &mut Option<Interval>, action: TimerAction, period: Duration, subject: GameId) {
    match action {
        TimerAction::Arm => {
            let mut interval = tokio::time::interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // Assigning drops any previous interval, so at most one exists.
            *timer = Some(interval);
            debug!(subject, ?period, "poll timer armed");
        }
        TimerAction::Clear => {
            *timer = None;
            debug!(subject, "poll timer cleared");
        }
        TimerAction::Keep => {}
    }
}

async fn next_tick(timer: &mut Option<Interval>) {
    match timer {
        Some(interval) => {
            interval.tick().await;
        }
        None => std::future::pending::<()>().await,
    }
}

// ---------------------------------------------------------------------------
// Controller
// ---------------------------------------------------------------------------

struct Session {
    events: mpsc::UnboundedSender<PollEvent>,
    state: watch::Receiver<PollState>,
    task: JoinHandle<()>,
}

impl Session {
    fn is_finished(&self) -> bool {
        self.task.is_finished() || *self.state.borrow() == PollState::Stopped
    }
}

/// Process-wide registry of live poll sessions, one per game.
pub struct LivePollController {
    period: Duration,
    visible: AtomicBool,
    sessions: Mutex<HashMap<GameId, Session>>,
}

impl LivePollController {
    pub fn new(period: Duration) -> Self {
        Self {
            period,
            visible: AtomicBool::new(true),
            sessions: Mutex::new(HashMap::new()),
        }
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    /// Begin polling `subject` if `status` is in progress.
    ///
    /// If a session already exists the status is forwarded to it instead,
    /// so re-evaluating the same subject never creates a second timer.
    /// Returns true when a new session was spawned.
    pub fn start(&self, subject: GameId, status: GameStatus, target: Arc<dyn PollTarget>) -> bool {
        let mut sessions = self.sessions();
        sessions.retain(|_, session| !session.is_finished());

        if let Some(existing) = sessions.get(&subject) {
            let _ = existing.events.send(PollEvent::StatusObserved(status));
            return false;
        }
        if !status.is_live() {
            debug!(subject, %status, "not polling: game is not in progress");
            return false;
        }

        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let (state_tx, state_rx) = watch::channel(PollState::Idle);
        let machine = PollMachine::new(self.visible.load(Ordering::SeqCst));
        let task = tokio::spawn(run_session(
            subject,
            machine,
            status,
            target,
            self.period,
            events_rx,
            state_tx,
        ));
        sessions.insert(
            subject,
            Session {
                events: events_tx,
                state: state_rx,
                task,
            },
        );
        info!(subject, period = ?self.period, "live polling started");
        true
    }

    /// Forward a status seen outside the poll loop (e.g. a manual refetch).
    pub fn observe(&self, subject: GameId, status: GameStatus) {
        if let Some(session) = self.sessions().get(&subject) {
            let _ = session.events.send(PollEvent::StatusObserved(status));
        }
    }

    /// Tear down the session for `subject`, clearing its timer.
    pub fn stop(&self, subject: GameId) {
        if let Some(session) = self.sessions().remove(&subject) {
            if session.events.send(PollEvent::Teardown).is_err() {
                debug!(subject, "poll session already finished");
            }
        }
    }

    /// Pause (hidden) or resume (visible) every session.
    pub fn set_visible(&self, visible: bool) {
        self.visible.store(visible, Ordering::SeqCst);
        for (subject, session) in self.sessions().iter() {
            if session
                .events
                .send(PollEvent::VisibilityChanged(visible))
                .is_err()
            {
                warn!(subject, "failed to deliver visibility change");
            }
        }
    }

    /// `Idle` when no session exists for `subject`.
    pub fn state(&self, subject: GameId) -> PollState {
        self.sessions()
            .get(&subject)
            .map(|session| *session.state.borrow())
            .unwrap_or(PollState::Idle)
    }

    /// Follow the state of the session for `subject`, if one exists.
    pub fn watch_state(&self, subject: GameId) -> Option<watch::Receiver<PollState>> {
        self.sessions()
            .get(&subject)
            .map(|session| session.state.clone())
    }

    /// Number of sessions that have not stopped.
    pub fn active_sessions(&self) -> usize {
        self.sessions()
            .values()
            .filter(|session| !session.is_finished())
            .count()
    }

    /// Tear down every session.
    pub fn shutdown(&self) {
        for (_, session) in self.sessions().drain() {
            let _ = session.events.send(PollEvent::Teardown);
        }
    }

    fn sessions(&self) -> MutexGuard<'_, HashMap<GameId, Session>> {
        self.sessions
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Default for LivePollController {
    fn default() -> Self {
        Self::new(DEFAULT_POLL_INTERVAL)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::atomic::AtomicUsize;
    use tokio::sync::Notify;

    // -- State machine --

    #[test]
    fn in_progress_arms_once() {
        let mut m = PollMachine::new(true);
        assert_eq!(m.handle(&PollEvent::StatusObserved(GameStatus::InProgress)), TimerAction::Arm);
        assert_eq!(m.state(), PollState::Polling);
        assert_eq!(m.handle(&PollEvent::StatusObserved(GameStatus::InProgress)), TimerAction::Keep);
        assert!(m.is_armed());
    }

    #[test]
    fn pregame_stays_idle() {
        let mut m = PollMachine::new(true);
        assert_eq!(m.handle(&PollEvent::StatusObserved(GameStatus::Pregame)), TimerAction::Keep);
        assert_eq!(m.state(), PollState::Idle);
        assert!(!m.is_armed());
    }

    #[test]
    fn terminal_status_clears_and_stops() {
        let mut m = PollMachine::new(true);
        m.handle(&PollEvent::StatusObserved(GameStatus::InProgress));
        assert_eq!(m.handle(&PollEvent::StatusObserved(GameStatus::Final)), TimerAction::Clear);
        assert_eq!(m.state(), PollState::Stopped);
    }

    #[test]
    fn stopped_absorbs_everything() {
        let mut m = PollMachine::new(true);
        m.handle(&PollEvent::Teardown);
        assert_eq!(m.state(), PollState::Stopped);
        assert_eq!(m.handle(&PollEvent::StatusObserved(GameStatus::InProgress)), TimerAction::Keep);
        assert_eq!(m.handle(&PollEvent::VisibilityChanged(true)), TimerAction::Keep);
        assert_eq!(m.state(), PollState::Stopped);
    }

    #[test]
    fn hidden_pauses_without_leaving_polling() {
        let mut m = PollMachine::new(true);
        m.handle(&PollEvent::StatusObserved(GameStatus::InProgress));
        assert_eq!(m.handle(&PollEvent::VisibilityChanged(false)), TimerAction::Clear);
        assert_eq!(m.state(), PollState::Polling);
        assert_eq!(m.handle(&PollEvent::StatusObserved(GameStatus::InProgress)), TimerAction::Keep);
        assert_eq!(m.handle(&PollEvent::VisibilityChanged(true)), TimerAction::Arm);
    }

    #[test]
    fn starting_hidden_defers_arming() {
        let mut m = PollMachine::new(false);
        assert_eq!(m.handle(&PollEvent::StatusObserved(GameStatus::InProgress)), TimerAction::Keep);
        assert_eq!(m.state(), PollState::Polling);
        assert_eq!(m.handle(&PollEvent::VisibilityChanged(true)), TimerAction::Arm);
    }

    #[test]
    fn teardown_while_idle_stops_without_clear() {
        let mut m = PollMachine::new(true);
        assert_eq!(m.handle(&PollEvent::Teardown), TimerAction::Keep);
        assert_eq!(m.state(), PollState::Stopped);
    }

    // -- Driver & controller --

    /// Replays scripted statuses (the last one repeats) and counts refreshes.
    struct ScriptedTarget {
        refreshes: AtomicUsize,
        statuses: Mutex<VecDeque<GameStatus>>,
        gate: Option<Notify>,
    }

    impl ScriptedTarget {
        fn new(statuses: Vec<GameStatus>) -> Arc<Self> {
            Arc::new(Self {
                refreshes: AtomicUsize::new(0),
                statuses: Mutex::new(statuses.into()),
                gate: None,
            })
        }

        fn gated(statuses: Vec<GameStatus>) -> Arc<Self> {
            Arc::new(Self {
                refreshes: AtomicUsize::new(0),
                statuses: Mutex::new(statuses.into()),
                gate: Some(Notify::new()),
            })
        }

        fn count(&self) -> usize {
            self.refreshes.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl PollTarget for ScriptedTarget {
        async fn refresh(&self) -> Option<GameStatus> {
            self.refreshes.fetch_add(1, Ordering::SeqCst);
            if let Some(gate) = &self.gate {
                gate.notified().await;
            }
            let mut statuses = self.statuses.lock().unwrap();
            if statuses.len() > 1 {
                statuses.pop_front()
            } else {
                statuses.front().cloned()
            }
        }
    }

    fn secs(n: u64) -> Duration {
        Duration::from_secs(n)
    }

    #[tokio::test(start_paused = true)]
    async fn ticks_every_interval_while_live() {
        let controller = LivePollController::new(secs(45));
        let target = ScriptedTarget::new(vec![GameStatus::InProgress]);

        assert!(controller.start(1, GameStatus::InProgress, target.clone()));
        tokio::time::sleep(secs(44)).await;
        assert_eq!(target.count(), 0);
        tokio::time::sleep(secs(2)).await;
        assert_eq!(target.count(), 1);
        tokio::time::sleep(secs(45)).await;
        assert_eq!(target.count(), 2);
        assert_eq!(controller.state(1), PollState::Polling);

        controller.shutdown();
    }

    #[tokio::test(start_paused = true)]
    async fn restarting_does_not_add_a_second_timer() {
        let controller = LivePollController::new(secs(45));
        let target = ScriptedTarget::new(vec![GameStatus::InProgress]);

        assert!(controller.start(1, GameStatus::InProgress, target.clone()));
        tokio::time::sleep(secs(10)).await;
        assert!(!controller.start(1, GameStatus::InProgress, target.clone()));
        assert_eq!(controller.active_sessions(), 1);

        tokio::time::sleep(secs(36)).await;
        assert_eq!(target.count(), 1);
        tokio::time::sleep(secs(45)).await;
        assert_eq!(target.count(), 2);

        controller.shutdown();
    }

    #[tokio::test(start_paused = true)]
    async fn terminal_response_stops_ticking() {
        let controller = LivePollController::new(secs(45));
        let target = ScriptedTarget::new(vec![GameStatus::InProgress, GameStatus::Final]);

        controller.start(2, GameStatus::InProgress, target.clone());
        tokio::time::sleep(secs(100)).await;
        assert_eq!(target.count(), 2);
        assert_eq!(controller.state(2), PollState::Stopped);

        tokio::time::sleep(secs(600)).await;
        assert_eq!(target.count(), 2);
        assert_eq!(controller.active_sessions(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn terminal_during_pending_tick_ends_session() {
        let controller = LivePollController::new(secs(45));
        let target = ScriptedTarget::gated(vec![GameStatus::InProgress]);

        controller.start(3, GameStatus::InProgress, target.clone());
        tokio::time::sleep(secs(46)).await;
        assert_eq!(target.count(), 1);

        // The refresh is still waiting on its response.
        controller.observe(3, GameStatus::Final);
        if let Some(gate) = &target.gate {
            gate.notify_one();
        }

        tokio::time::sleep(secs(600)).await;
        assert_eq!(target.count(), 1);
        assert_eq!(controller.state(3), PollState::Stopped);
    }

    #[tokio::test(start_paused = true)]
    async fn hidden_observer_pauses_polling() {
        let controller = LivePollController::new(secs(45));
        let target = ScriptedTarget::new(vec![GameStatus::InProgress]);

        controller.start(4, GameStatus::InProgress, target.clone());
        tokio::time::sleep(secs(1)).await;
        controller.set_visible(false);
        tokio::time::sleep(secs(300)).await;
        assert_eq!(target.count(), 0);
        assert_eq!(controller.state(4), PollState::Polling);

        controller.set_visible(true);
        tokio::time::sleep(secs(46)).await;
        assert_eq!(target.count(), 1);

        controller.shutdown();
    }

    #[tokio::test(start_paused = true)]
    async fn stop_tears_down_session() {
        let controller = LivePollController::new(secs(45));
        let target = ScriptedTarget::new(vec![GameStatus::InProgress]);

        controller.start(5, GameStatus::InProgress, target.clone());
        tokio::time::sleep(secs(46)).await;
        controller.stop(5);
        tokio::time::sleep(secs(600)).await;

        assert_eq!(target.count(), 1);
        assert_eq!(controller.state(5), PollState::Idle);
        assert_eq!(controller.active_sessions(), 0);
    }

    #[tokio::test]
    async fn finished_games_never_start_a_session() {
        let controller = LivePollController::default();
        let target = ScriptedTarget::new(vec![GameStatus::Final]);

        assert!(!controller.start(6, GameStatus::Final, target.clone()));
        assert!(!controller.start(6, GameStatus::Scheduled, target));
        assert_eq!(controller.active_sessions(), 0);
        assert_eq!(controller.period(), DEFAULT_POLL_INTERVAL);
    }
}
