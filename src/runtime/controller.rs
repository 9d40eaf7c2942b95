use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError, TryLockError};
use std::thread;

use generation::{
    CancelSignal, GenerationEvent, GenerationRequest, GenerationTransport, StreamId,
    TransportProfile,
};

use crate::conversation::{ConversationError, ConversationState, NodeId, Position, PromptPairIds};
use crate::markup::visible_text;
use crate::render::{branch_anchors, compute_layout, AnchorMatch, Layout, LayoutConfig};
use crate::runtime::observer::{ChangeEvent, ConversationObserver};
use crate::runtime::streaming::{StreamClose, StreamReport, StreamingCoordinator, Transition};

/// Ids assigned to one accepted submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Submission {
    pub user_id: NodeId,
    pub assistant_id: NodeId,
    pub stream_id: StreamId,
}

/// A parent's rendered text with its branch anchors resolved against it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedAnchors {
    pub text: String,
    pub matches: AnchorMatch,
}

struct ActiveStream {
    node_id: NodeId,
    cancel: CancelSignal,
}

#[derive(Default)]
struct StreamRegistry {
    active: BTreeMap<StreamId, ActiveStream>,
    /// Out of `active` but still announcing `StreamFinished`.
    closing: BTreeSet<StreamId>,
    finished: BTreeMap<StreamId, StreamReport>,
}

impl StreamRegistry {
    fn is_running(&self, stream_id: StreamId) -> bool {
        self.active.contains_key(&stream_id) || self.closing.contains(&stream_id)
    }

    fn is_idle(&self) -> bool {
        self.active.is_empty() && self.closing.is_empty()
    }
}

/// Sole owner of the conversation state.
///
/// Every mutation runs under one lock and replaces the snapshot atomically;
/// readers get cheap clones. Each submission streams on its own worker
/// thread, and streams never block or cancel one another. Observers are
/// notified after the lock is released, in commit order.
pub struct ConversationController {
    state: Mutex<ConversationState>,
    transport: Arc<dyn GenerationTransport>,
    layout_config: LayoutConfig,
    observers: Mutex<Vec<Arc<dyn ConversationObserver>>>,
    pending: Mutex<VecDeque<(ConversationState, ChangeEvent)>>,
    delivery: Mutex<()>,
    streams: Mutex<StreamRegistry>,
    stream_done: Condvar,
    next_stream_id: AtomicU64,
}

impl ConversationController {
    pub fn new(transport: Arc<dyn GenerationTransport>) -> Arc<Self> {
        Self::with_state(transport, ConversationState::default(), LayoutConfig::default())
    }

    /// Start from an existing snapshot, e.g. [`crate::conversation::sample_conversation`].
    pub fn with_state(
        transport: Arc<dyn GenerationTransport>,
        state: ConversationState,
        layout_config: LayoutConfig,
    ) -> Arc<Self> {
        Arc::new(Self {
            state: Mutex::new(state),
            transport,
            layout_config,
            observers: Mutex::new(Vec::new()),
            pending: Mutex::new(VecDeque::new()),
            delivery: Mutex::new(()),
            streams: Mutex::new(StreamRegistry::default()),
            stream_done: Condvar::new(),
            next_stream_id: AtomicU64::new(1),
        })
    }

    #[must_use]
    pub fn snapshot(&self) -> ConversationState {
        lock_unpoisoned(&self.state).clone()
    }

    #[must_use]
    pub fn layout(&self) -> Layout {
        compute_layout(&self.snapshot(), &self.layout_config)
    }

    #[must_use]
    pub fn layout_config(&self) -> &LayoutConfig {
        &self.layout_config
    }

    #[must_use]
    pub fn transport_profile(&self) -> TransportProfile {
        self.transport.profile()
    }

    pub fn subscribe(&self, observer: Arc<dyn ConversationObserver>) {
        lock_unpoisoned(&self.observers).push(observer);
    }

    /// Add a prompt and start streaming its reply.
    ///
    /// Structural errors are returned before anything changes. Once the
    /// pair is inserted the call succeeds; generation problems only show up
    /// in the reply's content and in the stream report.
    pub fn submit_prompt(
        self: &Arc<Self>,
        parent_id: Option<&NodeId>,
        prompt: &str,
        highlighted_text: Option<&str>,
    ) -> Result<Submission, ConversationError> {
        let ids = PromptPairIds::generate();
        let snapshot = self.commit(|state| {
            let next = state.with_prompt_pair(parent_id, prompt, highlighted_text, &ids)?;
            Ok(Some((
                next,
                ChangeEvent::NodesInserted {
                    user_id: ids.user.clone(),
                    assistant_id: ids.assistant.clone(),
                },
            )))
        })?;

        let stream_id = self.next_stream_id.fetch_add(1, Ordering::SeqCst);
        let request = GenerationRequest {
            stream_id,
            history: snapshot.history_to(&ids.user)?,
            highlighted_context: snapshot
                .node(&ids.user)
                .and_then(|node| node.highlighted_text.clone()),
        };
        tracing::debug!(
            stream_id,
            node_id = %ids.assistant,
            history_len = request.history.len(),
            branch = request.highlighted_context.is_some(),
            "submitting prompt"
        );
        self.spawn_stream(request, ids.assistant.clone());

        Ok(Submission {
            user_id: ids.user,
            assistant_id: ids.assistant,
            stream_id,
        })
    }

    /// Flip a node's collapse flag and return the new value.
    pub fn toggle_collapse(&self, id: &NodeId) -> Result<bool, ConversationError> {
        let snapshot = self.commit(|state| {
            let next = state.with_collapse_toggled(id)?;
            let collapsed = next.node(id).is_some_and(|node| node.is_collapsed);
            Ok(Some((
                next,
                ChangeEvent::CollapseToggled {
                    node_id: id.clone(),
                    collapsed,
                },
            )))
        })?;
        Ok(snapshot.node(id).is_some_and(|node| node.is_collapsed))
    }

    /// Anchor interaction: toggles the collapse state of branch node `branch_id`.
    pub fn activate_anchor(&self, branch_id: &NodeId) -> Result<bool, ConversationError> {
        self.toggle_collapse(branch_id)
    }

    pub fn move_node(&self, id: &NodeId, x: f64, y: f64) -> Result<(), ConversationError> {
        let position = Position::new(x, y);
        self.commit(|state| {
            let next = state.with_position(id, position)?;
            Ok(Some((
                next,
                ChangeEvent::NodeMoved {
                    node_id: id.clone(),
                    position,
                },
            )))
        })
        .map(|_| ())
    }

    pub fn clear_position(&self, id: &NodeId) -> Result<(), ConversationError> {
        self.commit(|state| {
            let next = state.without_position(id)?;
            Ok(Some((
                next,
                ChangeEvent::PositionCleared {
                    node_id: id.clone(),
                },
            )))
        })
        .map(|_| ())
    }

    /// Record a measured height. Returns false, without notifying anyone,
    /// when the height is unchanged.
    pub fn update_height(&self, id: &NodeId, height: f64) -> Result<bool, ConversationError> {
        let mut changed = false;
        self.commit(|state| {
            let next = state.with_height(id, height)?;
            if next.version() == state.version() {
                return Ok(None);
            }
            changed = true;
            Ok(Some((
                next,
                ChangeEvent::HeightChanged {
                    node_id: id.clone(),
                    height,
                },
            )))
        })?;
        Ok(changed)
    }

    /// Branch anchors of `parent_id`, matched against the text a reader sees:
    /// the rendered answer without its `<think>` section.
    pub fn branch_anchors(&self, parent_id: &NodeId) -> Result<RenderedAnchors, ConversationError> {
        let snapshot = self.snapshot();
        let parent = snapshot
            .node(parent_id)
            .ok_or_else(|| ConversationError::NodeNotFound(parent_id.clone()))?;
        let text = visible_text(&parent.content);
        let matches = branch_anchors(&snapshot, parent_id, &text);
        Ok(RenderedAnchors { text, matches })
    }

    /// Ask a stream to stop. Returns false when it is not running.
    pub fn cancel_stream(&self, stream_id: StreamId) -> bool {
        let streams = lock_unpoisoned(&self.streams);
        match streams.active.get(&stream_id) {
            Some(active) => {
                tracing::debug!(stream_id, node_id = %active.node_id, "cancelling stream");
                active.cancel.store(true, Ordering::SeqCst);
                true
            }
            None => false,
        }
    }

    #[must_use]
    pub fn active_streams(&self) -> Vec<StreamId> {
        lock_unpoisoned(&self.streams).active.keys().copied().collect()
    }

    /// Block until `stream_id` ends and take its report.
    ///
    /// Returns `None` for unknown streams and for reports already taken.
    pub fn join_stream(&self, stream_id: StreamId) -> Option<StreamReport> {
        let mut streams = lock_unpoisoned(&self.streams);
        while streams.is_running(stream_id) {
            streams = self
                .stream_done
                .wait(streams)
                .unwrap_or_else(PoisonError::into_inner);
        }
        streams.finished.remove(&stream_id)
    }

    /// Block until no stream is running and take every pending report.
    pub fn wait_idle(&self) -> Vec<StreamReport> {
        let mut streams = lock_unpoisoned(&self.streams);
        while !streams.is_idle() {
            streams = self
                .stream_done
                .wait(streams)
                .unwrap_or_else(PoisonError::into_inner);
        }
        std::mem::take(&mut streams.finished).into_values().collect()
    }

    fn spawn_stream(self: &Arc<Self>, request: GenerationRequest, node_id: NodeId) {
        let stream_id = request.stream_id;
        let cancel: CancelSignal = Arc::new(AtomicBool::new(false));

        let mut streams = lock_unpoisoned(&self.streams);
        streams.active.insert(
            stream_id,
            ActiveStream {
                node_id: node_id.clone(),
                cancel: Arc::clone(&cancel),
            },
        );

        let controller = Arc::clone(self);
        let worker_node = node_id.clone();
        let spawned = thread::Builder::new()
            .name(format!("chat-canvas-stream-{stream_id}"))
            .spawn(move || controller.run_stream(request, worker_node, cancel));

        if let Err(error) = spawned {
            streams.active.remove(&stream_id);
            drop(streams);
            tracing::error!(stream_id, node_id = %node_id, %error, "failed to spawn stream worker");

            let mut coordinator = StreamingCoordinator::new(stream_id, node_id);
            let message = format!("failed to start generation: {error}");
            self.commit_logged(|state| {
                coordinator.close(state, StreamClose::Returned(Err(message)))
            });
            self.finish_stream(&coordinator);
        }
    }

    fn run_stream(self: Arc<Self>, request: GenerationRequest, node_id: NodeId, cancel: CancelSignal) {
        let stream_id = request.stream_id;
        let mut coordinator = StreamingCoordinator::new(stream_id, node_id);
        let transport = Arc::clone(&self.transport);

        let returned = {
            let mut emit = |event: GenerationEvent| {
                self.commit_logged(|state| coordinator.apply(state, event));
            };
            catch_unwind(AssertUnwindSafe(|| {
                transport.generate(request, cancel, &mut emit)
            }))
        };

        let reason = match returned {
            Ok(result) => StreamClose::Returned(result),
            Err(_) => StreamClose::Panicked,
        };
        self.commit_logged(|state| coordinator.close(state, reason));
        self.finish_stream(&coordinator);
    }

    fn finish_stream(&self, coordinator: &StreamingCoordinator) {
        let report = coordinator.report();
        tracing::debug!(
            stream_id = report.stream_id,
            node_id = %report.node_id,
            fragments = report.fragments,
            outcome = ?report.outcome,
            "stream finished"
        );

        {
            let mut streams = lock_unpoisoned(&self.streams);
            streams.active.remove(&report.stream_id);
            streams.closing.insert(report.stream_id);
        }

        let event = ChangeEvent::StreamFinished {
            stream_id: report.stream_id,
            node_id: report.node_id.clone(),
            outcome: report.outcome.clone(),
        };
        self.commit_logged(|state| Ok(Some((state.clone(), event))));

        {
            let mut streams = lock_unpoisoned(&self.streams);
            streams.closing.remove(&report.stream_id);
            streams.finished.insert(report.stream_id, report);
        }
        self.stream_done.notify_all();
    }

    /// Apply one transition under the state lock, then notify observers.
    fn commit<F>(&self, change: F) -> Result<ConversationState, ConversationError>
    where
        F: FnOnce(&ConversationState) -> Result<Transition, ConversationError>,
    {
        let snapshot = {
            let mut state = lock_unpoisoned(&self.state);
            match change(&state)? {
                Some((next, event)) => {
                    *state = next.clone();
                    lock_unpoisoned(&self.pending).push_back((next.clone(), event));
                    next
                }
                None => return Ok(state.clone()),
            }
        };

        self.deliver_pending();
        Ok(snapshot)
    }

    fn commit_logged<F>(&self, change: F)
    where
        F: FnOnce(&ConversationState) -> Result<Transition, ConversationError>,
    {
        if let Err(error) = self.commit(change) {
            tracing::warn!(%error, "stream update rejected");
        }
    }

    /// Drain queued notifications. Only one thread delivers at a time;
    /// re-entrant commits from observers are picked up by the outer loop.
    fn deliver_pending(&self) {
        loop {
            let delivery = match self.delivery.try_lock() {
                Ok(guard) => guard,
                Err(TryLockError::Poisoned(poisoned)) => poisoned.into_inner(),
                Err(TryLockError::WouldBlock) => return,
            };

            loop {
                let next = lock_unpoisoned(&self.pending).pop_front();
                let Some((snapshot, event)) = next else {
                    break;
                };
                let observers = lock_unpoisoned(&self.observers).clone();
                for observer in observers {
                    let delivered =
                        catch_unwind(AssertUnwindSafe(|| observer.on_change(&snapshot, &event)));
                    if delivered.is_err() {
                        tracing::error!(node_id = %event.node_id(), "conversation observer panicked");
                    }
                }
            }

            drop(delivery);
            if lock_unpoisoned(&self.pending).is_empty() {
                return;
            }
        }
    }
}

fn lock_unpoisoned<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}
