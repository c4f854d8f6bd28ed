use std::any::Any;
use std::marker::PhantomData;
use std::thread::{self, JoinHandle, ThreadId};

use anyhow::{anyhow, bail, Result};
use crossbeam_channel::{bounded, Sender};

use crate::task::{run_task, task_queue, Envelope, StateCall, TaskQueue, TaskReceiver};

/// Spawn options for a [`RenderThread`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderThreadOptions {
    /// OS thread name; shows up in wrong-thread panics and traces.
    pub name: String,
}

impl Default for RenderThreadOptions {
    fn default() -> Self {
        Self {
            name: "render-thread".to_string(),
        }
    }
}

/// Dedicated thread that owns a piece of render state and drains its queue.
///
/// The state is built on the thread itself, so everything it captures as
/// "owner" is the render thread. Other threads reach it only through the
/// [`TaskQueue`] or [`RenderThread::run_sync`].
pub struct RenderThread<S> {
    queue: TaskQueue,
    thread_id: ThreadId,
    join_handle: Option<JoinHandle<Result<()>>>,
    _state: PhantomData<fn() -> S>,
}

impl<S: 'static> RenderThread<S> {
    pub fn spawn<F>(options: &RenderThreadOptions, init: F) -> Result<Self>
    where
        F: FnOnce(TaskQueue) -> Result<S> + Send + 'static,
    {
        let (queue, receiver) = task_queue();
        let (ready_tx, ready_rx) = bounded(1);
        let thread_queue = queue.clone();
        let handle = thread::Builder::new()
            .name(options.name.clone())
            .spawn(move || run_render_thread(thread_queue, receiver, init, ready_tx))
            .map_err(|err| anyhow!("failed to spawn render thread: {err}"))?;
        let thread_id = handle.thread().id();

        let ready: Result<()> = ready_rx
            .recv()
            .map_err(|err| anyhow!("render thread exited before initialising: {err}"))
            .and_then(|ready| ready);
        if let Err(err) = ready {
            let _ = handle.join();
            return Err(err.context("render thread failed to initialise"));
        }

        tracing::debug!(name = %options.name, "render thread running");
        Ok(Self {
            queue,
            thread_id,
            join_handle: Some(handle),
            _state: PhantomData,
        })
    }

    /// Queue handle for posting tasks and releases from any thread.
    pub fn queue(&self) -> &TaskQueue {
        &self.queue
    }

    pub fn thread_id(&self) -> ThreadId {
        self.thread_id
    }

    /// Runs `work` against the state on the render thread and waits for it.
    ///
    /// Ordered after everything already on the queue.
    pub fn run_sync<R, F>(&self, work: F) -> Result<R>
    where
        F: FnOnce(&mut S) -> R + Send + 'static,
        R: Send + 'static,
    {
        if thread::current().id() == self.thread_id {
            bail!("run_sync called from the render thread itself");
        }

        let (reply_tx, reply_rx) = bounded(1);
        let call: StateCall = Box::new(move |state: &mut dyn Any| {
            match state.downcast_mut::<S>() {
                Some(state) => {
                    let _ = reply_tx.send(work(state));
                }
                None => tracing::error!(
                    expected = std::any::type_name::<S>(),
                    "render thread state has an unexpected type"
                ),
            }
        });
        self.queue
            .send(Envelope::Call(call))
            .map_err(|err| anyhow!("render thread is not accepting work: {err}"))?;
        reply_rx
            .recv()
            .map_err(|_| anyhow!("render thread dropped the request before replying"))
    }

    /// Stops the thread after the work already queued and joins it.
    pub fn shutdown(mut self) -> Result<()> {
        if let Some(handle) = self.join_handle.take() {
            let _ = self.queue.send(Envelope::Shutdown);
            handle
                .join()
                .map_err(|err| anyhow!("render thread panicked: {err:?}"))??;
        }
        Ok(())
    }
}

impl<S> std::fmt::Debug for RenderThread<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RenderThread")
            .field("thread_id", &self.thread_id)
            .field("queue", &self.queue)
            .field("running", &self.join_handle.is_some())
            .finish()
    }
}

impl<S> Drop for RenderThread<S> {
    fn drop(&mut self) {
        if let Some(handle) = self.join_handle.take() {
            let _ = self.queue.send(Envelope::Shutdown);
            let _ = handle.join();
        }
    }
}

fn run_render_thread<S, F>(
    queue: TaskQueue,
    receiver: TaskReceiver,
    init: F,
    ready_tx: Sender<Result<()>>,
) -> Result<()>
where
    S: 'static,
    F: FnOnce(TaskQueue) -> Result<S>,
{
    let mut state = match init(queue) {
        Ok(state) => state,
        Err(err) => {
            let _ = ready_tx.send(Err(err));
            return Ok(());
        }
    };
    let _ = ready_tx.send(Ok(()));

    let mut handled = 0usize;
    while let Some(envelope) = receiver.recv() {
        match envelope {
            Envelope::Task(task) => run_task(task),
            Envelope::Call(call) => call(&mut state),
            Envelope::Shutdown => break,
        }
        handled += 1;
    }

    // Releases posted after shutdown still have to happen on this thread.
    while let Some(envelope) = receiver.try_recv() {
        if let Envelope::Task(task) = envelope {
            run_task(task);
            handled += 1;
        }
    }
    drop(state);

    tracing::debug!(handled, "render thread exiting");
    Ok(())
}
