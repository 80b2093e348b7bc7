use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::task::JoinHandle;

use crate::{EngineEvent, EventSink, TimerKey};

/// One-shot timers keyed by purpose. Starting a key that is already armed
/// replaces it.
#[derive(Default)]
pub(crate) struct Timers {
    armed: HashMap<TimerKey, JoinHandle<()>>,
}

impl Timers {
    pub(crate) fn start(
        &mut self,
        runtime: &Handle,
        key: TimerKey,
        after: Duration,
        sink: Arc<dyn EventSink>,
    ) {
        self.cancel(key);
        self.armed.retain(|_, handle| !handle.is_finished());
        let handle = runtime.spawn(async move {
            tokio::time::sleep(after).await;
            sink.emit(EngineEvent::TimerFired(key));
        });
        self.armed.insert(key, handle);
    }

    pub(crate) fn cancel(&mut self, key: TimerKey) -> bool {
        match self.armed.remove(&key) {
            Some(handle) => {
                handle.abort();
                true
            }
            None => false,
        }
    }

    pub(crate) fn cancel_all(&mut self) {
        for (_, handle) in self.armed.drain() {
            handle.abort();
        }
    }
}
