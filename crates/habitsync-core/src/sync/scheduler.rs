//! Single-slot cancellable task.
//!
//! A [`TaskSlot`] holds at most one pending task. Scheduling a new one aborts
//! whatever is pending. Once a delayed task's timer fires it detaches itself
//! from the slot, so a later `schedule` (for example a retry issued by the
//! task itself) never aborts the task that is already running.

use parking_lot::Mutex;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

#[derive(Default)]
struct SlotState {
    generation: u64,
    handle: Option<JoinHandle<()>>,
}

#[derive(Default, Clone)]
pub struct TaskSlot {
    inner: Arc<Mutex<SlotState>>,
}

impl TaskSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `task` after `delay`, superseding any pending task.
    pub fn schedule<F>(&self, delay: Duration, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let mut state = self.inner.lock();
        if let Some(previous) = state.handle.take() {
            previous.abort();
        }
        state.generation += 1;
        let generation = state.generation;
        let inner = Arc::clone(&self.inner);

        state.handle = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            {
                let mut state = inner.lock();
                if state.generation == generation {
                    state.handle = None;
                }
            }
            task.await;
        }));
    }

    /// Run a long-lived task (a loop) in the slot, superseding any pending
    /// task. It stays attached until cancelled or replaced.
    pub fn run<F>(&self, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let mut state = self.inner.lock();
        if let Some(previous) = state.handle.take() {
            previous.abort();
        }
        state.generation += 1;
        state.handle = Some(tokio::spawn(task));
    }

    /// Abort the pending task, if any. Returns whether one was pending.
    pub fn cancel(&self) -> bool {
        let mut state = self.inner.lock();
        state.generation += 1;
        match state.handle.take() {
            Some(handle) => {
                handle.abort();
                true
            }
            None => false,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.inner
            .lock()
            .handle
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }
}

impl Drop for SlotState {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counter_task(counter: &Arc<AtomicUsize>) -> impl Future<Output = ()> + Send + 'static {
        let counter = Arc::clone(counter);
        async move {
            counter.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn new_schedule_supersedes_pending() {
        let slot = TaskSlot::new();
        let fired = Arc::new(AtomicUsize::new(0));

        slot.schedule(Duration::from_millis(450), counter_task(&fired));
        tokio::time::sleep(Duration::from_millis(100)).await;
        slot.schedule(Duration::from_millis(450), counter_task(&fired));
        assert!(slot.is_pending());

        tokio::time::sleep(Duration::from_millis(400)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 0);

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 1);
        assert!(!slot.is_pending());
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_prevents_firing() {
        let slot = TaskSlot::new();
        let fired = Arc::new(AtomicUsize::new(0));
        slot.schedule(Duration::from_millis(200), counter_task(&fired));
        assert!(slot.cancel());
        assert!(!slot.cancel());
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn running_task_can_reschedule_itself() {
        let slot = TaskSlot::new();
        let fired = Arc::new(AtomicUsize::new(0));

        let inner_slot = slot.clone();
        let inner_fired = Arc::clone(&fired);
        slot.schedule(Duration::from_millis(100), async move {
            inner_slot.schedule(Duration::from_millis(100), counter_task(&inner_fired));
            // Still running after the reschedule.
            inner_fired.fetch_add(10, Ordering::SeqCst);
        });

        tokio::time::sleep(Duration::from_millis(150)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 10);
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 11);
    }
}
