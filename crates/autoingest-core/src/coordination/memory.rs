//! Process-local coordination service

use super::{CategoryNode, CoordinationError, CoordinationService, Interrupt, Lock, LockRelease};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

/// Upper bound on a single condvar wait so interrupts are noticed promptly
const WAKE_INTERVAL: Duration = Duration::from_millis(50);

type NodeKey = (CategoryNode, String);

#[derive(Default)]
struct State {
    held: HashSet<NodeKey>,
    data: HashMap<NodeKey, Vec<u8>>,
}

#[derive(Default)]
struct Shared {
    state: Mutex<State>,
    released: Condvar,
}

impl Shared {
    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Coordination for threads of a single process.
///
/// Locks are not reentrant: a second acquisition of a held node waits even
/// on the thread that holds it.
#[derive(Clone, Default)]
pub struct InMemoryCoordinationService {
    shared: Arc<Shared>,
    interrupt: Interrupt,
}

impl InMemoryCoordinationService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_interrupt(mut self, interrupt: Interrupt) -> Self {
        self.interrupt = interrupt;
        self
    }

    pub fn interrupt_handle(&self) -> Interrupt {
        self.interrupt.clone()
    }

    /// Whether some thread currently holds the lock on a node
    pub fn is_locked(&self, category: CategoryNode, node_path: &str) -> bool {
        self.shared
            .state()
            .held
            .contains(&(category, node_path.to_string()))
    }
}

struct MemoryLockRelease {
    shared: Arc<Shared>,
    key: NodeKey,
}

impl LockRelease for MemoryLockRelease {
    fn release(&mut self) -> Result<(), CoordinationError> {
        self.shared.state().held.remove(&self.key);
        self.shared.released.notify_all();
        Ok(())
    }
}

impl CoordinationService for InMemoryCoordinationService {
    fn try_exclusive_lock(
        &self,
        category: CategoryNode,
        node_path: &str,
        timeout: Duration,
    ) -> Result<Option<Lock>, CoordinationError> {
        let key: NodeKey = (category, node_path.to_string());
        // A timeout too large to represent waits forever
        let deadline = Instant::now().checked_add(timeout);
        let mut state = self.shared.state();

        loop {
            if self.interrupt.is_interrupted() {
                return Err(CoordinationError::Interrupted {
                    category,
                    node_path: node_path.to_string(),
                });
            }

            if !state.held.contains(&key) {
                state.held.insert(key.clone());
                return Ok(Some(Lock::new(
                    category,
                    node_path,
                    Box::new(MemoryLockRelease {
                        shared: self.shared.clone(),
                        key,
                    }),
                )));
            }

            let wait = match deadline {
                Some(deadline) => {
                    let now = Instant::now();
                    if now >= deadline {
                        return Ok(None);
                    }
                    (deadline - now).min(WAKE_INTERVAL)
                },
                None => WAKE_INTERVAL,
            };
            state = self
                .shared
                .released
                .wait_timeout(state, wait)
                .unwrap_or_else(PoisonError::into_inner)
                .0;
        }
    }

    fn node_data(&self, category: CategoryNode, node_path: &str) -> Result<Option<Vec<u8>>, CoordinationError> {
        Ok(self
            .shared
            .state()
            .data
            .get(&(category, node_path.to_string()))
            .cloned())
    }

    fn set_node_data(&self, category: CategoryNode, node_path: &str, data: &[u8]) -> Result<(), CoordinationError> {
        self.shared
            .state()
            .data
            .insert((category, node_path.to_string()), data.to_vec());
        Ok(())
    }

    fn delete_node_data(&self, category: CategoryNode, node_path: &str) -> Result<(), CoordinationError> {
        self.shared
            .state()
            .data
            .remove(&(category, node_path.to_string()));
        Ok(())
    }

    fn node_list(&self, category: CategoryNode) -> Result<Vec<String>, CoordinationError> {
        let mut paths: Vec<String> = self
            .shared
            .state()
            .data
            .keys()
            .filter(|(c, _)| *c == category)
            .map(|(_, p)| p.clone())
            .collect();
        paths.sort();
        Ok(paths)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_second_lock_times_out_while_held() {
        let service = InMemoryCoordinationService::new();
        let held = service
            .try_exclusive_lock(CategoryNode::Cases, "/cases/a/log", Duration::from_millis(10))
            .unwrap();
        assert!(held.is_some());

        let second = service
            .try_exclusive_lock(CategoryNode::Cases, "/cases/a/log", Duration::from_millis(20))
            .unwrap();
        assert!(second.is_none());

        drop(held);
        let third = service
            .try_exclusive_lock_now(CategoryNode::Cases, "/cases/a/log")
            .unwrap();
        assert!(third.is_some());
    }

    #[test]
    fn test_same_path_in_other_category_is_independent() {
        let service = InMemoryCoordinationService::new();
        let _cases = service.try_exclusive_lock_now(CategoryNode::Cases, "/x").unwrap().unwrap();
        let manifests = service.try_exclusive_lock_now(CategoryNode::Manifests, "/x").unwrap();
        assert!(manifests.is_some());
    }

    #[test]
    fn test_waiter_acquires_after_release() {
        let service = InMemoryCoordinationService::new();
        let held = service.try_exclusive_lock_now(CategoryNode::Cases, "/log").unwrap().unwrap();

        let waiter_service = service.clone();
        let waiter = thread::spawn(move || {
            waiter_service
                .try_exclusive_lock(CategoryNode::Cases, "/log", Duration::from_secs(5))
                .unwrap()
                .is_some()
        });

        thread::sleep(Duration::from_millis(50));
        drop(held);
        assert!(waiter.join().unwrap());
    }

    #[test]
    fn test_interrupt_aborts_wait() {
        let service = InMemoryCoordinationService::new();
        let _held = service.try_exclusive_lock_now(CategoryNode::Cases, "/log").unwrap().unwrap();
        let interrupt = service.interrupt_handle();

        let waiter_service = service.clone();
        let waiter = thread::spawn(move || {
            waiter_service.try_exclusive_lock(CategoryNode::Cases, "/log", Duration::from_secs(30))
        });

        thread::sleep(Duration::from_millis(50));
        interrupt.interrupt();
        let result = waiter.join().unwrap();
        assert!(matches!(result, Err(ref e) if e.is_interrupted()));
    }

    #[test]
    fn test_unrepresentable_timeout_waits_without_deadline() {
        let service = InMemoryCoordinationService::new();
        let lock = service
            .try_exclusive_lock(CategoryNode::Cases, "/log", Duration::MAX)
            .unwrap();
        assert!(lock.is_some());

        let interrupt = service.interrupt_handle();
        let waiter_service = service.clone();
        let waiter = thread::spawn(move || {
            waiter_service.try_exclusive_lock(CategoryNode::Cases, "/log", Duration::from_secs(u64::MAX))
        });

        thread::sleep(Duration::from_millis(50));
        interrupt.interrupt();
        assert!(waiter.join().unwrap().unwrap_err().is_interrupted());
    }

    #[test]
    fn test_node_data_round_trip_and_list() {
        let service = InMemoryCoordinationService::new();
        assert!(service.node_data(CategoryNode::Manifests, "/b").unwrap().is_none());

        service.set_node_data(CategoryNode::Manifests, "/b", &[1, 2, 3]).unwrap();
        service.set_node_data(CategoryNode::Manifests, "/a", &[4]).unwrap();
        service.set_node_data(CategoryNode::Cases, "/c", &[5]).unwrap();

        assert_eq!(service.node_data(CategoryNode::Manifests, "/b").unwrap(), Some(vec![1, 2, 3]));
        assert_eq!(service.node_list(CategoryNode::Manifests).unwrap(), vec!["/a", "/b"]);

        service.delete_node_data(CategoryNode::Manifests, "/b").unwrap();
        service.delete_node_data(CategoryNode::Manifests, "/b").unwrap();
        assert_eq!(service.node_list(CategoryNode::Manifests).unwrap(), vec!["/a"]);
    }
}
