//! Concurrent scheduler for async and parallel compositions
//!
//! Forcing a `Fork` node creates a [`SharedChannel`]. The channel owns:
//!
//! - a work queue of sub-streams that no worker has started yet
//! - a bounded output channel that workers push their events into
//! - one output slot per worker, in start order
//! - the handles of all live workers
//!
//! Workers evaluate a sub-stream node by node. When a worker meets a `Fork` of the
//! channel's own mode it pushes the right branch onto the work queue and continues
//! with the left one, so a whole tree of nested compositions shares one channel.
//! A `Fork` of the other mode gets a nested channel owned by that worker.
//!
//! The async controller forks on demand: only when the consumer would otherwise
//! block and fewer than `fork_threshold` values are buffered. The work queue is
//! popped newest first, which keeps the triggering order depth-first. Values are
//! emitted from the earliest started worker that has one.
//!
//! The parallel controller forks every queued branch as soon as it sees it and
//! emits round-robin over the worker slots.
//!
//! Dropping the channel stops the run: the work queue is closed, workers see the
//! stop flag before their next step and are aborted at their next suspension point.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use log::{debug, trace, warn};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::config::SchedulerConfig;
use crate::error::{StreamError, StreamResult};
use crate::stream::node::{Fork, ForkMode, Node};

pub(crate) type WorkerId = usize;

enum Event<T> {
    Yield(WorkerId, T),
    Done(WorkerId),
    Failed(WorkerId, StreamError),
    /// A worker queued new work; wakes the controller.
    Enqueued,
}

/// Sub-streams waiting for a worker, shared between the controller and workers.
struct WorkQueue<T> {
    pending: Mutex<VecDeque<Node<T>>>,
    stopped: AtomicBool,
}

impl<T> WorkQueue<T> {
    fn new() -> Self {
        Self {
            pending: Mutex::new(VecDeque::new()),
            stopped: AtomicBool::new(false),
        }
    }

    fn lock(&self) -> MutexGuard<'_, VecDeque<Node<T>>> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Queue `node` unless the run has been stopped.
    fn push(&self, node: Node<T>) {
        if !self.is_stopped() {
            self.lock().push_back(node);
        }
    }

    fn pop_latest(&self) -> Option<Node<T>> {
        self.lock().pop_back()
    }

    fn pop_oldest(&self) -> Option<Node<T>> {
        self.lock().pop_front()
    }

    fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn stop(&self) {
        self.stopped.store(true, Ordering::SeqCst);
        self.lock().clear();
    }

    fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }
}

struct Slot<T> {
    id: WorkerId,
    buffer: VecDeque<StreamResult<T>>,
    done: bool,
    handle: Option<JoinHandle<()>>,
}

/// Per-worker output buffers, kept in worker start order.
pub(crate) struct Slots<T> {
    slots: Vec<Slot<T>>,
    cursor: usize,
    buffered: usize,
    live: usize,
}

impl<T> Slots<T> {
    pub(crate) fn new() -> Self {
        Self {
            slots: Vec::new(),
            cursor: 0,
            buffered: 0,
            live: 0,
        }
    }

    pub(crate) fn register(&mut self, id: WorkerId) {
        self.slots.push(Slot {
            id,
            buffer: VecDeque::new(),
            done: false,
            handle: None,
        });
        self.live += 1;
    }

    fn attach(&mut self, id: WorkerId, handle: JoinHandle<()>) {
        if let Some(index) = self.index_of(id) {
            self.slots[index].handle = Some(handle);
        }
    }

    // Ids are handed out in increasing order and slots are only ever appended.
    fn index_of(&self, id: WorkerId) -> Option<usize> {
        self.slots.binary_search_by_key(&id, |slot| slot.id).ok()
    }

    pub(crate) fn push(&mut self, id: WorkerId, item: StreamResult<T>) {
        if let Some(index) = self.index_of(id) {
            self.slots[index].buffer.push_back(item);
            self.buffered += 1;
        }
    }

    pub(crate) fn finish(&mut self, id: WorkerId) {
        if let Some(index) = self.index_of(id) {
            let slot = &mut self.slots[index];
            if !slot.done {
                slot.done = true;
                slot.handle = None;
                self.live -= 1;
            }
            self.reap(index);
        }
    }

    /// Drop every slot except `id`, discarding what the others buffered.
    fn keep_only(&mut self, id: WorkerId) {
        self.slots.retain(|slot| slot.id == id);
        self.buffered = self.slots.iter().map(|slot| slot.buffer.len()).sum();
        self.live = self.slots.iter().filter(|slot| !slot.done).count();
        self.cursor = 0;
    }

    pub(crate) fn buffered(&self) -> usize {
        self.buffered
    }

    pub(crate) fn live(&self) -> usize {
        self.live
    }

    /// Earliest started worker with a buffered item.
    pub(crate) fn take_first(&mut self) -> Option<StreamResult<T>> {
        let index = self.slots.iter().position(|slot| !slot.buffer.is_empty())?;
        let item = self.slots[index].buffer.pop_front();
        self.buffered -= 1;
        self.reap(index);
        item
    }

    /// Next worker with a buffered item, starting at the cursor and wrapping.
    pub(crate) fn take_round_robin(&mut self) -> Option<StreamResult<T>> {
        let len = self.slots.len();
        for step in 0..len {
            let index = (self.cursor + step) % len;
            if let Some(item) = self.slots[index].buffer.pop_front() {
                self.buffered -= 1;
                self.cursor = index + 1;
                self.reap(index);
                return Some(item);
            }
        }
        None
    }

    fn reap(&mut self, index: usize) {
        let slot = &self.slots[index];
        if slot.done && slot.buffer.is_empty() {
            self.slots.remove(index);
            if index < self.cursor {
                self.cursor -= 1;
            }
        }
        if self.cursor >= self.slots.len() {
            self.cursor = 0;
        }
    }

    fn abort_all(&mut self) {
        for slot in &mut self.slots {
            if let Some(handle) = slot.handle.take() {
                handle.abort();
            }
        }
    }
}

/// Coordinates the workers of one concurrent composition and its consumer.
pub(crate) struct SharedChannel<T> {
    mode: ForkMode,
    config: SchedulerConfig,
    queue: Arc<WorkQueue<T>>,
    tx: mpsc::Sender<Event<T>>,
    rx: mpsc::Receiver<Event<T>>,
    slots: Slots<T>,
    next_id: WorkerId,
    /// Set by the first worker failure. Later events are discarded.
    failed: bool,
}

impl<T: Send + 'static> SharedChannel<T> {
    fn new(mode: ForkMode, config: &SchedulerConfig) -> Self {
        let config = config.normalized();
        let (tx, rx) = mpsc::channel(config.buffer_size);
        Self {
            mode,
            config,
            queue: Arc::new(WorkQueue::new()),
            tx,
            rx,
            slots: Slots::new(),
            next_id: 0,
            failed: false,
        }
    }

    /// Start evaluating a forced `Fork` node. The returned node drains the channel.
    pub(crate) fn launch(fork: Fork<T>) -> Node<T> {
        let mut channel = SharedChannel::new(fork.mode, &fork.config);
        debug!(
            "Creating {:?} channel (max_workers: {}, max_parallel_workers: {}, buffer_size: {})",
            channel.mode,
            channel.config.max_workers,
            channel.config.max_parallel_workers,
            channel.config.buffer_size
        );
        channel.queue.push(*fork.right);
        channel.spawn(*fork.left);
        channel.into_node()
    }

    fn into_node(mut self) -> Node<T> {
        Node::defer(move || async move {
            Ok(match self.next().await? {
                Some(value) => Node::cons(value, self.into_node()),
                None => Node::Nil,
            })
        })
    }

    async fn next(&mut self) -> StreamResult<Option<T>> {
        loop {
            self.drain_ready();

            match self.mode {
                _ if self.failed => {}
                ForkMode::Async => {
                    if self.slots.buffered() < self.config.fork_threshold {
                        self.fork_on_demand();
                    }
                }
                ForkMode::Parallel => self.fork_all()?,
            }

            let item = match self.mode {
                ForkMode::Async => self.slots.take_first(),
                ForkMode::Parallel => self.slots.take_round_robin(),
            };
            match item {
                Some(Ok(value)) => return Ok(Some(value)),
                Some(Err(err)) => {
                    debug!("{:?} channel surfacing worker failure: {}", self.mode, err);
                    self.shutdown();
                    return Err(err);
                }
                None => {}
            }

            if self.slots.live() == 0 && self.queue.is_empty() {
                debug!("{:?} channel drained", self.mode);
                return Ok(None);
            }

            // We hold a sender ourselves, so the channel never closes under us.
            match self.rx.recv().await {
                Some(event) => self.record(event),
                None => return Ok(None),
            }
        }
    }

    fn drain_ready(&mut self) {
        while self.slots.buffered() < self.config.buffer_size {
            match self.rx.try_recv() {
                Ok(event) => self.record(event),
                Err(_) => break,
            }
        }
    }

    fn record(&mut self, event: Event<T>) {
        if self.failed {
            trace!("{:?} channel discarding event after failure", self.mode);
            return;
        }
        match event {
            Event::Yield(id, value) => self.slots.push(id, Ok(value)),
            Event::Done(id) => self.slots.finish(id),
            Event::Failed(id, err) => {
                // Nothing a sibling produced from here on may reach the consumer.
                self.failed = true;
                self.shutdown();
                self.slots.keep_only(id);
                self.slots.push(id, Err(err));
                self.slots.finish(id);
            }
            Event::Enqueued => {}
        }
    }

    fn fork_on_demand(&mut self) {
        if self.slots.live() >= self.config.max_workers {
            return;
        }
        if let Some(node) = self.queue.pop_latest() {
            self.spawn(node);
        }
    }

    fn fork_all(&mut self) -> StreamResult<()> {
        while let Some(node) = self.queue.pop_oldest() {
            if self.slots.live() >= self.config.max_parallel_workers {
                let limit = self.config.max_parallel_workers;
                warn!("Refusing parallel fork: {} workers already live", limit);
                self.shutdown();
                return Err(StreamError::ResourceExhausted { limit });
            }
            self.spawn(node);
        }
        Ok(())
    }

    fn spawn(&mut self, node: Node<T>) {
        let id = self.next_id;
        self.next_id += 1;
        self.slots.register(id);
        debug!("{:?} channel forking worker {} ({} live)", self.mode, id, self.slots.live());

        let handle = tokio::spawn(worker(id, self.mode, node, self.queue.clone(), self.tx.clone()));
        self.slots.attach(id, handle);
    }

    fn shutdown(&mut self) {
        self.queue.stop();
        self.slots.abort_all();
    }
}

impl<T> Drop for SharedChannel<T> {
    fn drop(&mut self) {
        if self.slots.live() > 0 {
            debug!("{:?} channel dropped with {} live workers; cancelling", self.mode, self.slots.live());
        }
        self.queue.stop();
        self.slots.abort_all();
    }
}

async fn worker<T: Send + 'static>(
    id: WorkerId,
    mode: ForkMode,
    mut node: Node<T>,
    queue: Arc<WorkQueue<T>>,
    tx: mpsc::Sender<Event<T>>,
) {
    loop {
        if queue.is_stopped() {
            return;
        }
        node = match node {
            Node::Nil => match mode {
                // An async worker keeps going with the next queued branch.
                ForkMode::Async => match queue.pop_latest() {
                    Some(next) => next,
                    None => break,
                },
                ForkMode::Parallel => break,
            },
            Node::Yield(value, rest) => {
                if tx.send(Event::Yield(id, value)).await.is_err() {
                    return;
                }
                *rest
            }
            Node::Defer(thunk) => match thunk().await {
                Ok(next) => next,
                Err(err) => {
                    let _ = tx.send(Event::Failed(id, err)).await;
                    return;
                }
            },
            composed @ (Node::Append(..) | Node::Interleave(..)) => match composed.force().await {
                Ok(next) => next,
                Err(err) => {
                    let _ = tx.send(Event::Failed(id, err)).await;
                    return;
                }
            },
            Node::Fork(fork) if fork.mode == mode => {
                trace!("Worker {} queueing right branch", id);
                queue.push(*fork.right);
                // A full channel means the controller has events to wake up for anyway.
                let _ = tx.try_send(Event::Enqueued);
                *fork.left
            }
            Node::Fork(fork) => SharedChannel::launch(fork),
        };
    }
    let _ = tx.send(Event::Done(id)).await;
}
