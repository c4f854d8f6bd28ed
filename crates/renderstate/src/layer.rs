use std::sync::{Arc, Weak};

/// A layer owned outside the coordinator that holds GPU handles.
pub trait Layer: Send + Sync {
    /// The context is about to go away; every GPU handle the layer holds is
    /// about to become invalid and must be dropped without GL calls.
    fn on_context_lost(&self);
}

/// Non-owning registry of active layers, kept in registration order.
#[derive(Default)]
pub struct LayerRegistry {
    entries: Vec<Weak<dyn Layer>>,
}

impl std::fmt::Debug for LayerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LayerRegistry")
            .field("entries", &self.entries.len())
            .finish()
    }
}

impl LayerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `layer`. Returns `false` if it was already registered.
    pub fn register(&mut self, layer: &Arc<dyn Layer>) -> bool {
        if self.position(layer).is_some() {
            return false;
        }
        self.entries.push(Arc::downgrade(layer));
        true
    }

    /// Removes `layer`. Returns `false` if it was not registered.
    pub fn unregister(&mut self, layer: &Arc<dyn Layer>) -> bool {
        match self.position(layer) {
            Some(index) => {
                self.entries.remove(index);
                true
            }
            None => false,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Tells every live layer the context is gone, in registration order.
    ///
    /// Entries whose layer was dropped without unregistering are pruned.
    /// Returns how many layers were notified.
    pub fn notify_context_lost(&mut self) -> usize {
        let before = self.entries.len();
        let mut notified = 0;
        self.entries.retain(|entry| match entry.upgrade() {
            Some(layer) => {
                layer.on_context_lost();
                notified += 1;
                true
            }
            None => false,
        });
        let pruned = before - self.entries.len();
        if pruned > 0 {
            tracing::warn!(pruned, "dropped layers were still registered as active");
        }
        notified
    }

    fn position(&self, layer: &Arc<dyn Layer>) -> Option<usize> {
        let target = Arc::as_ptr(layer);
        self.entries
            .iter()
            .position(|entry| std::ptr::addr_eq(entry.as_ptr(), target))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    struct RecordingLayer {
        id: usize,
        log: Arc<Mutex<Vec<usize>>>,
        losses: AtomicUsize,
    }

    impl Layer for RecordingLayer {
        fn on_context_lost(&self) {
            self.losses.fetch_add(1, Ordering::SeqCst);
            self.log.lock().unwrap().push(self.id);
        }
    }

    fn layer(id: usize, log: &Arc<Mutex<Vec<usize>>>) -> Arc<RecordingLayer> {
        Arc::new(RecordingLayer {
            id,
            log: log.clone(),
            losses: AtomicUsize::new(0),
        })
    }

    #[test]
    fn notifies_in_registration_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let layers: Vec<Arc<RecordingLayer>> = (0..3).map(|id| layer(id, &log)).collect();
        let mut registry = LayerRegistry::new();
        for entry in [&layers[2], &layers[0], &layers[1]] {
            let entry: Arc<dyn Layer> = entry.clone();
            registry.register(&entry);
        }

        assert_eq!(registry.notify_context_lost(), 3);
        assert_eq!(*log.lock().unwrap(), vec![2, 0, 1]);
        for layer in &layers {
            assert_eq!(layer.losses.load(Ordering::SeqCst), 1);
        }
    }

    #[test]
    fn register_is_idempotent_and_unregister_removes() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let entry: Arc<dyn Layer> = layer(0, &log);
        let mut registry = LayerRegistry::new();
        assert!(registry.register(&entry));
        assert!(!registry.register(&entry));
        assert_eq!(registry.len(), 1);

        assert!(registry.unregister(&entry));
        assert!(!registry.unregister(&entry));
        assert_eq!(registry.notify_context_lost(), 0);
        assert!(log.lock().unwrap().is_empty());
    }

    #[test]
    fn dropped_layers_are_pruned_without_notification() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let kept: Arc<dyn Layer> = layer(1, &log);
        let mut registry = LayerRegistry::new();
        {
            let dropped: Arc<dyn Layer> = layer(0, &log);
            registry.register(&dropped);
        }
        registry.register(&kept);

        assert_eq!(registry.notify_context_lost(), 1);
        assert_eq!(registry.len(), 1);
        assert_eq!(*log.lock().unwrap(), vec![1]);
    }
}
