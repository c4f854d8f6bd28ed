use std::any::Any;

use crossbeam_channel::{unbounded, Receiver, Sender, TryRecvError};

/// One unit of work executed on the render thread.
///
/// `run` consumes the box, so a task can run at most once and never needs
/// to free itself.
pub trait RenderTask: Send {
    fn run(self: Box<Self>);

    /// Short label used in traces.
    fn label(&self) -> &'static str {
        "task"
    }
}

#[derive(Debug, thiserror::Error)]
pub enum TaskQueueError {
    #[error("render thread task queue is closed")]
    Disconnected,
}

/// Closure adapter so ad-hoc work can be posted without a named type.
struct FnTask<F>(F);

impl<F> RenderTask for FnTask<F>
where
    F: FnOnce() + Send,
{
    fn run(self: Box<Self>) {
        (self.0)()
    }

    fn label(&self) -> &'static str {
        "closure"
    }
}

/// Drops one handle on the thread that drains the queue.
///
/// The handle typically is the last reference to something whose release
/// issues GL calls or whose count must only change on the render thread.
pub struct DeferredRelease<T: Send> {
    object: T,
}

impl<T: Send> DeferredRelease<T> {
    pub fn new(object: T) -> Self {
        Self { object }
    }
}

impl<T: Send> RenderTask for DeferredRelease<T> {
    fn run(self: Box<Self>) {
        let Self { object } = *self;
        drop(object);
        tracing::trace!(
            object = std::any::type_name::<T>(),
            "released object on render thread"
        );
    }

    fn label(&self) -> &'static str {
        "deferred-release"
    }
}

pub(crate) type StateCall = Box<dyn FnOnce(&mut dyn Any) + Send>;

pub(crate) enum Envelope {
    Task(Box<dyn RenderTask>),
    Call(StateCall),
    Shutdown,
}

/// Cloneable handle for submitting work to the render thread.
///
/// Submissions are FIFO and drained by a single consumer, so tasks run in
/// the order they were posted relative to everything else on the queue.
#[derive(Clone)]
pub struct TaskQueue {
    sender: Sender<Envelope>,
}

impl std::fmt::Debug for TaskQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskQueue")
            .field("pending", &self.sender.len())
            .finish()
    }
}

/// Creates a queue and the receiving end the owner thread drains.
pub fn task_queue() -> (TaskQueue, TaskReceiver) {
    let (sender, receiver) = unbounded();
    (TaskQueue { sender }, TaskReceiver { receiver })
}

impl TaskQueue {
    pub fn post(&self, task: impl RenderTask + 'static) -> Result<(), TaskQueueError> {
        self.post_boxed(Box::new(task))
    }

    pub fn post_boxed(&self, task: Box<dyn RenderTask>) -> Result<(), TaskQueueError> {
        self.send(Envelope::Task(task))
    }

    pub fn post_fn(&self, work: impl FnOnce() + Send + 'static) -> Result<(), TaskQueueError> {
        self.post(FnTask(work))
    }

    /// Marshals the release of `object` onto the render thread.
    ///
    /// Callable from any thread. If the render thread is already gone the
    /// object is leaked: releasing it here would run its drop on the wrong
    /// thread.
    pub fn schedule_release<T>(&self, object: T) -> Result<(), TaskQueueError>
    where
        T: Send + 'static,
    {
        let task: Box<dyn RenderTask> = Box::new(DeferredRelease::new(object));
        match self.sender.send(Envelope::Task(task)) {
            Ok(()) => Ok(()),
            Err(err) => {
                tracing::warn!(
                    object = std::any::type_name::<T>(),
                    "render thread queue closed; leaking object instead of releasing off-thread"
                );
                std::mem::forget(err.into_inner());
                Err(TaskQueueError::Disconnected)
            }
        }
    }

    /// Number of envelopes waiting to be drained.
    pub fn pending(&self) -> usize {
        self.sender.len()
    }

    pub(crate) fn send(&self, envelope: Envelope) -> Result<(), TaskQueueError> {
        self.sender
            .send(envelope)
            .map_err(|_| TaskQueueError::Disconnected)
    }
}

/// Consumer end of a [`TaskQueue`]. Owned by exactly one thread.
pub struct TaskReceiver {
    receiver: Receiver<Envelope>,
}

impl std::fmt::Debug for TaskReceiver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskReceiver")
            .field("pending", &self.receiver.len())
            .finish()
    }
}

impl TaskReceiver {
    /// Runs every task already queued, in order. Returns how many ran.
    pub fn drain(&self) -> usize {
        let mut ran = 0;
        loop {
            match self.receiver.try_recv() {
                Ok(Envelope::Task(task)) => {
                    run_task(task);
                    ran += 1;
                }
                Ok(Envelope::Call(_)) | Ok(Envelope::Shutdown) => {
                    tracing::warn!("control message on a bare task queue; ignoring");
                }
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => return ran,
            }
        }
    }

    pub(crate) fn recv(&self) -> Option<Envelope> {
        self.receiver.recv().ok()
    }

    pub(crate) fn try_recv(&self) -> Option<Envelope> {
        self.receiver.try_recv().ok()
    }
}

pub(crate) fn run_task(task: Box<dyn RenderTask>) {
    let label = task.label();
    tracing::trace!(label, "running render task");
    task.run();
}
