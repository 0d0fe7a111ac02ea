//! Per-key event serializer
//!
//! FIFO execution of async tasks keyed by an arbitrary identifier
//! (typically a display-message reference). Handlers touching the same key
//! run strictly one at a time in arrival order, so two near-simultaneous
//! interactions on one display can never interleave their effects on the
//! queue or controller.

use futures::future::BoxFuture;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use tracing::debug;

type Task = BoxFuture<'static, ()>;

/// Per-key FIFO task queues with one drain loop per live key
#[derive(Clone, Default)]
pub struct EventSerializer {
    queues: Arc<Mutex<HashMap<String, VecDeque<Task>>>>,
}

impl EventSerializer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `task` to the key's queue; if it is the only pending task,
    /// start draining the key immediately.
    pub fn enqueue<F>(&self, key: &str, task: F)
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let start_drain = {
            let mut queues = self.queues.lock().expect("serializer lock poisoned");
            match queues.get_mut(key) {
                Some(pending) => {
                    pending.push_back(Box::pin(task));
                    false
                }
                None => {
                    let mut pending = VecDeque::new();
                    pending.push_back(Box::pin(task) as Task);
                    queues.insert(key.to_string(), pending);
                    true
                }
            }
        };

        if start_drain {
            let queues = Arc::clone(&self.queues);
            let key = key.to_string();
            tokio::spawn(async move {
                loop {
                    // Pop under the lock; the key is removed only when its
                    // queue is empty, under the same lock, so no task can
                    // slip in between.
                    let task = {
                        let mut map = queues.lock().expect("serializer lock poisoned");
                        match map.get_mut(&key).and_then(|q| q.pop_front()) {
                            Some(task) => task,
                            None => {
                                map.remove(&key);
                                debug!("Serializer key drained: {}", key);
                                break;
                            }
                        }
                    };
                    task.await;
                }
            });
        }
    }

    /// Number of keys with pending or running tasks
    pub fn live_keys(&self) -> usize {
        self.queues.lock().expect("serializer lock poisoned").len()
    }
}
