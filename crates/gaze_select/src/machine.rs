//! Selection state machine: reducer + subscribers + queued side effects
//!
//! `handle_action` runs in two phases. The synchronous phase reduces the
//! action, stores the new snapshot and notifies subscribers before returning.
//! The asynchronous phase is queued on the [`AsyncTaskQueue`]; once the
//! side effects resolve, their state is published and subscribers are
//! notified a second time.
//!
//! If a newer action changed the state while a side effect was running, the
//! effect's result is dropped and the newer state is re-published instead.
//!
//! Storing a state and notifying subscribers happen under one publish lock,
//! so listeners see states in the order they were stored even when the queue
//! worker runs on another thread. The lock is reentrant: a listener may
//! dispatch actions from inside its callback.

use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::{ReentrantMutex, RwLock};
use tracing::{debug, error, warn};

use crate::action::Action;
use crate::effects::{NoEffects, SideEffects};
use crate::error::{QueueError, TaskError};
use crate::state::{reduce, AppState};
use crate::task_queue::{AsyncTaskQueue, QueueStats};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Listener = Arc<dyn Fn(&AppState) + Send + Sync>;

struct Shared {
    /// Held from the state write through `notify`
    publish: ReentrantMutex<()>,
    state: RwLock<Arc<AppState>>,
    listeners: RwLock<Vec<(SubscriptionId, Listener)>>,
    next_subscription: AtomicU64,
}

impl Shared {
    /// Call every listener with `state`; callers hold the publish lock
    fn notify(&self, state: &AppState) {
        let listeners: Vec<Listener> = self
            .listeners
            .read()
            .iter()
            .map(|(_, listener)| Arc::clone(listener))
            .collect();

        for listener in listeners {
            if panic::catch_unwind(AssertUnwindSafe(|| listener(state))).is_err() {
                error!("state subscriber panicked");
            }
        }
    }
}

pub struct SelectionStateMachine<E: SideEffects = NoEffects> {
    shared: Arc<Shared>,
    effects: Arc<E>,
    queue: AsyncTaskQueue,
}

impl SelectionStateMachine<NoEffects> {
    /// Machine without side effects, queue on the current Tokio runtime
    pub fn new(initial: AppState) -> Result<Self, QueueError> {
        Self::with_effects(initial, NoEffects)
    }
}

impl<E: SideEffects> SelectionStateMachine<E> {
    pub fn with_effects(initial: AppState, effects: E) -> Result<Self, QueueError> {
        Ok(Self::with_queue(initial, effects, AsyncTaskQueue::new()?))
    }

    pub fn with_queue(initial: AppState, effects: E, queue: AsyncTaskQueue) -> Self {
        Self {
            shared: Arc::new(Shared {
                publish: ReentrantMutex::new(()),
                state: RwLock::new(Arc::new(initial)),
                listeners: RwLock::new(Vec::new()),
                next_subscription: AtomicU64::new(0),
            }),
            effects: Arc::new(effects),
            queue,
        }
    }

    /// Current state
    pub fn snapshot(&self) -> Arc<AppState> {
        Arc::clone(&*self.shared.state.read())
    }

    /// Register a callback invoked after every published state
    pub fn subscribe<F>(&self, listener: F) -> SubscriptionId
    where
        F: Fn(&AppState) + Send + Sync + 'static,
    {
        let id = SubscriptionId(self.shared.next_subscription.fetch_add(1, Ordering::Relaxed));
        self.shared.listeners.write().push((id, Arc::new(listener)));
        id
    }

    /// Returns `false` if `id` was not subscribed
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut listeners = self.shared.listeners.write();
        let before = listeners.len();
        listeners.retain(|(existing, _)| *existing != id);
        listeners.len() != before
    }

    /// Apply `action` and return the state published by the synchronous phase
    pub fn handle_action(&self, action: Action) -> Arc<AppState> {
        let publishing = self.shared.publish.lock();
        let next = {
            let mut state = self.shared.state.write();
            let next = Arc::new(reduce(&state, &action));
            *state = Arc::clone(&next);
            next
        };

        if !matches!(action, Action::Gazing { .. }) {
            debug!(action = action.kind(), state = ?next, "state transition");
        }

        self.shared.notify(&next);
        drop(publishing);

        self.enqueue_effects(action);
        next
    }

    /// Decode a JSON action and apply it; rejected input leaves the state alone
    pub fn handle_raw_action(&self, text: &str) -> Arc<AppState> {
        match Action::from_json(text) {
            Ok(action) => self.handle_action(action),
            Err(err) => {
                warn!(error = %err, "ignoring action");
                self.snapshot()
            }
        }
    }

    /// Wait until every side-effect phase queued so far has finished
    pub async fn flush(&self) -> Result<(), QueueError> {
        self.queue.flush().await
    }

    pub fn queue_stats(&self) -> QueueStats {
        self.queue.stats()
    }

    fn enqueue_effects(&self, action: Action) {
        let shared = Arc::clone(&self.shared);
        let effects = Arc::clone(&self.effects);
        let kind = action.kind();

        let phase = async move {
            let start = Arc::clone(&*shared.state.read());
            let produced = effects.apply(&action, AppState::clone(&start)).await?;

            // Never held across an await.
            let publishing = shared.publish.lock();
            let published = {
                let mut state = shared.state.write();
                if Arc::ptr_eq(&*state, &start) {
                    let produced = Arc::new(produced);
                    *state = Arc::clone(&produced);
                    produced
                } else {
                    debug!(action = kind, "state changed during side effect, keeping newer state");
                    Arc::clone(&*state)
                }
            };

            shared.notify(&published);
            drop(publishing);
            Ok::<(), TaskError>(())
        };

        if let Err(err) = self.queue.enqueue_labeled(kind, phase) {
            warn!(action = kind, error = %err, "side effects not scheduled");
        }
    }
}

impl<E: SideEffects> Clone for SelectionStateMachine<E> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
            effects: Arc::clone(&self.effects),
            queue: self.queue.clone(),
        }
    }
}

impl<E: SideEffects> std::fmt::Debug for SelectionStateMachine<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SelectionStateMachine")
            .field("state", &self.snapshot())
            .field("subscribers", &self.shared.listeners.read().len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::EffectError;
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use std::time::Duration;

    fn record<E: SideEffects>(machine: &SelectionStateMachine<E>) -> Arc<Mutex<Vec<AppState>>> {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        machine.subscribe(move |state| sink.lock().push(state.clone()));
        seen
    }

    /// Pauses the scene whenever a selection is made
    struct PauseOnSelection;

    #[async_trait]
    impl SideEffects for PauseOnSelection {
        async fn apply(&self, action: &Action, mut state: AppState) -> Result<AppState, EffectError> {
            if matches!(action, Action::Selection { .. }) {
                state.playing = false;
            }
            Ok(state)
        }
    }

    struct Failing;

    #[async_trait]
    impl SideEffects for Failing {
        async fn apply(&self, _action: &Action, _state: AppState) -> Result<AppState, EffectError> {
            Err(EffectError::Failed("storage offline".into()))
        }
    }

    /// Slow effect that would stop playback after session start
    struct SlowPause;

    #[async_trait]
    impl SideEffects for SlowPause {
        async fn apply(&self, action: &Action, mut state: AppState) -> Result<AppState, EffectError> {
            if *action == Action::AppInit {
                tokio::time::sleep(Duration::from_millis(10)).await;
                state.playing = false;
            }
            Ok(state)
        }
    }

    #[tokio::test]
    async fn test_app_init_from_initial_state() {
        let machine = SelectionStateMachine::new(AppState::new(false, false)).unwrap();
        let seen = record(&machine);

        let state = machine.handle_action(Action::AppInit);

        assert_eq!(*state, AppState::new(true, true));
        assert_eq!(seen.lock().len(), 1, "synchronous notification before return");

        machine.flush().await.unwrap();
        let seen = seen.lock();
        assert_eq!(seen.len(), 2);
        assert_eq!(seen[1], AppState::new(true, true));
    }

    #[tokio::test]
    async fn test_sync_notifications_follow_call_order() {
        let machine = SelectionStateMachine::new(AppState::new(true, true)).unwrap();
        let seen = record(&machine);

        machine.handle_action(Action::Pause);
        machine.handle_action(Action::select("earth"));

        let seen = seen.lock();
        assert!(!seen[0].playing);
        assert_eq!(seen[1].selected_target, Some("earth".into()));
    }

    #[tokio::test]
    async fn test_side_effect_result_is_published() {
        let machine =
            SelectionStateMachine::with_effects(AppState::new(true, true), PauseOnSelection).unwrap();
        let seen = record(&machine);

        let sync_state = machine.handle_action(Action::select("moon"));
        assert!(sync_state.playing);

        machine.flush().await.unwrap();
        assert!(!machine.snapshot().playing);
        let seen = seen.lock();
        assert_eq!(seen.len(), 2);
        assert!(!seen[1].playing);
        assert_eq!(seen[1].selected_target, Some("moon".into()));
    }

    #[tokio::test]
    async fn test_failed_side_effect_keeps_state() {
        let machine = SelectionStateMachine::with_effects(AppState::new(true, true), Failing).unwrap();
        let seen = record(&machine);

        machine.handle_action(Action::Pause);
        machine.handle_action(Action::Play);
        machine.flush().await.unwrap();

        assert_eq!(seen.lock().len(), 2, "failed phases publish nothing");
        assert!(machine.snapshot().playing);
        assert_eq!(machine.queue_stats().failed, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stale_side_effect_does_not_overwrite_newer_state() {
        let machine = SelectionStateMachine::with_effects(AppState::new(false, false), SlowPause).unwrap();
        let seen = record(&machine);

        machine.handle_action(Action::AppInit);
        // Let the worker start the slow phase.
        tokio::time::sleep(Duration::from_millis(1)).await;
        machine.handle_action(Action::select("earth"));
        machine.flush().await.unwrap();

        let state = machine.snapshot();
        assert!(state.playing);
        assert_eq!(state.selected_target, Some("earth".into()));
        assert_eq!(seen.lock().len(), 4);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_subscribers_never_see_older_state() {
        let machine = SelectionStateMachine::new(AppState::new(true, true)).unwrap();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        machine.subscribe(move |state| {
            if let Some(id) = &state.selected_target {
                sink.lock().push(id.as_str().parse::<u32>().unwrap());
            }
        });

        let mut next = 0u32;
        for _ in 0..20 {
            for _ in 0..500 {
                machine.handle_action(Action::select(next.to_string()));
                next += 1;
            }
            machine.flush().await.unwrap();
        }

        let seen = seen.lock();
        assert!(seen.len() >= next as usize);
        assert!(seen.windows(2).all(|pair| pair[0] <= pair[1]), "listeners saw an older state");
        assert_eq!(seen.last(), Some(&(next - 1)));
    }

    #[tokio::test]
    async fn test_subscriber_may_dispatch_actions() {
        let machine = SelectionStateMachine::new(AppState::new(true, true)).unwrap();
        let inner = machine.clone();
        machine.subscribe(move |state| {
            if state.selected_target.is_some() && state.playing {
                inner.handle_action(Action::Pause);
            }
        });
        let seen = record(&machine);

        machine.handle_action(Action::select("earth"));
        machine.flush().await.unwrap();

        let state = machine.snapshot();
        assert!(!state.playing);
        assert_eq!(state.selected_target, Some("earth".into()));
        assert!(!seen.lock().last().unwrap().playing);
    }

    #[tokio::test]
    async fn test_unsubscribe() {
        let machine = SelectionStateMachine::new(AppState::default()).unwrap();
        let count = Arc::new(AtomicU64::new(0));
        let counter = Arc::clone(&count);
        let id = machine.subscribe(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        machine.handle_action(Action::AppInit);
        assert!(machine.unsubscribe(id));
        assert!(!machine.unsubscribe(id));
        machine.handle_action(Action::Pause);
        machine.flush().await.unwrap();

        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_panicking_subscriber_is_contained() {
        let machine = SelectionStateMachine::new(AppState::default()).unwrap();
        machine.subscribe(|_| panic!("bad subscriber"));
        let seen = record(&machine);

        machine.handle_action(Action::AppInit);
        machine.flush().await.unwrap();

        assert_eq!(seen.lock().len(), 2);
    }

    #[tokio::test]
    async fn test_raw_actions() {
        let machine = SelectionStateMachine::new(AppState::new(true, true)).unwrap();
        let seen = record(&machine);

        let state = machine.handle_raw_action(r#"{"type": "session start", "payload": {}}"#);
        assert_eq!(*state, AppState::new(true, true));
        let state = machine.handle_raw_action(r#"{"type": "selection", "payload": {"planet": 3}}"#);
        assert_eq!(state.selected_target, None);
        assert!(seen.lock().is_empty());

        let state =
            machine.handle_raw_action(r#"{"type": "Gazing", "payload": {"planet": "sun", "fraction": 1.0}}"#);
        assert_eq!(state.selected_target, Some("sun".into()));
    }

    #[test]
    fn test_new_requires_runtime() {
        assert_eq!(
            SelectionStateMachine::new(AppState::default()).unwrap_err(),
            QueueError::NoRuntime
        );
    }
}
