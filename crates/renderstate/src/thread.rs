use std::thread::{self, ThreadId};

/// Affinity token naming the single thread allowed to mutate render state.
///
/// The token is captured once and never re-targeted; there is no way to hand
/// ownership to another thread short of building a new coordinator there.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OwnerThread {
    id: ThreadId,
    name: Option<String>,
}

impl OwnerThread {
    /// Captures the calling thread as the owner.
    pub fn capture() -> Self {
        let current = thread::current();
        Self {
            id: current.id(),
            name: current.name().map(str::to_owned),
        }
    }

    pub fn id(&self) -> ThreadId {
        self.id
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn is_current(&self) -> bool {
        thread::current().id() == self.id
    }

    /// Panics unless called from the owner thread.
    #[track_caller]
    pub fn assert_current(&self) {
        if !self.is_current() {
            let current = thread::current();
            panic!(
                "wrong thread: render state owned by {:?} ({}) touched from {:?} ({})",
                self.id,
                self.name.as_deref().unwrap_or("<unnamed>"),
                current.id(),
                current.name().unwrap_or("<unnamed>"),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn owner_passes_on_its_own_thread() {
        let owner = OwnerThread::capture();
        assert!(owner.is_current());
        owner.assert_current();
    }

    #[test]
    fn other_thread_is_rejected() {
        let owner = OwnerThread::capture();
        let result = thread::Builder::new()
            .name("intruder".into())
            .spawn(move || owner.assert_current())
            .expect("spawn")
            .join();

        let payload = result.expect_err("assert must panic off-thread");
        let message = payload
            .downcast_ref::<String>()
            .cloned()
            .unwrap_or_default();
        assert!(message.contains("wrong thread"), "{message}");
        assert!(message.contains("intruder"), "{message}");
    }

    #[test]
    fn captures_thread_name() {
        let name = thread::Builder::new()
            .name("render".into())
            .spawn(|| OwnerThread::capture().name().map(str::to_owned))
            .expect("spawn")
            .join()
            .expect("join");
        assert_eq!(name.as_deref(), Some("render"));
    }
}
