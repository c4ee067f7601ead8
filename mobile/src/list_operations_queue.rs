pub use crate::list_operations_queue_stt::*;
use crate::package_list::{self, ListKey, PackageListStore};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl ListOperation {
    pub fn list(&self) -> ListKey {
        match self {
            ListOperation::Add { list, .. } | ListOperation::Remove { list, .. } => *list,
        }
    }

    pub fn package_name(&self) -> &str {
        match self {
            ListOperation::Add { package_name, .. } | ListOperation::Remove { package_name, .. } => {
                package_name
            }
        }
    }

    /// Identity used to skip duplicates, e.g. `add:flyme_vpp_frc_pkg_list:com.a`.
    pub fn key(&self) -> String {
        let verb = match self {
            ListOperation::Add { .. } => "add",
            ListOperation::Remove { .. } => "remove",
        };
        format!(
            "{}:{}:{}",
            verb,
            self.list().settings_key(),
            self.package_name()
        )
    }
}

impl Default for ListOperationsQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl ListOperationsQueue {
    pub fn new() -> Self {
        Self {
            queue: Arc::new(Mutex::new(VecDeque::new())),
            results: Arc::new(Mutex::new(HashMap::new())),
            is_running: Arc::new(Mutex::new(false)),
            progress: Arc::new(Mutex::new(None)),
            cancelled: Arc::new(Mutex::new(false)),
        }
    }

    /// Add an operation to the queue
    pub fn enqueue(&self, operation: ListOperation) {
        let key = operation.key();

        let mut queue = lock(&self.queue);
        let mut results = lock(&self.results);

        // Don't add if already in queue or being processed
        if !results.contains_key(&key) {
            queue.push_back(operation);
            results.insert(key, OperationStatus::Pending);
        } else {
            log::debug!("Skipping duplicate list operation {}", key);
        }
    }

    pub fn enqueue_batch(&self, operations: Vec<ListOperation>) {
        for operation in operations {
            self.enqueue(operation);
        }
    }

    pub fn get_status(&self, key: &str) -> Option<OperationStatus> {
        lock(&self.results).get(key).cloned()
    }

    pub fn status_of(&self, operation: &ListOperation) -> Option<OperationStatus> {
        self.get_status(&operation.key())
    }

    /// Number of pending operations
    pub fn queue_size(&self) -> usize {
        lock(&self.queue).len()
    }

    pub fn completed_count(&self) -> usize {
        lock(&self.results)
            .values()
            .filter(|status| matches!(status, OperationStatus::Success(_) | OperationStatus::Error(_)))
            .count()
    }

    pub fn progress(&self) -> Option<f32> {
        *lock(&self.progress)
    }

    pub fn is_running(&self) -> bool {
        *lock(&self.is_running)
    }

    /// Drop pending operations and forget them, so they can be queued again.
    /// Writes already issued stay in place.
    pub fn clear_queue(&self) {
        let mut queue = lock(&self.queue);
        let mut results = lock(&self.results);
        for operation in queue.drain(..) {
            results.remove(&operation.key());
        }
        drop(results);
        drop(queue);
        *lock(&self.cancelled) = true;
        log::info!("List operations queue cleared");
    }

    /// Forget finished results so the same operation can be queued again.
    pub fn clear_results(&self) {
        lock(&self.results).clear();
        log::info!("List operations results cleared");
    }

    /// Start the background worker thread.
    ///
    /// Returns `None` if a worker is already draining the queue.
    pub fn start_worker(&self, store: PackageListStore) -> Option<thread::JoinHandle<()>> {
        {
            let mut is_running = lock(&self.is_running);
            if *is_running {
                log::warn!("List operations worker already running");
                return None;
            }
            *is_running = true;
        }

        *lock(&self.progress) = Some(0.0);
        *lock(&self.cancelled) = false;

        let queue = self.queue.clone();
        let results = self.results.clone();
        let is_running = self.is_running.clone();
        let progress = self.progress.clone();
        let cancelled = self.cancelled.clone();

        let handle = thread::spawn(move || {
            log::info!("List operations worker thread started");

            loop {
                if *lock(&cancelled) {
                    log::info!("List operations cancelled");
                    break;
                }

                let total_count = lock(&results).len();

                let Some(operation) = lock(&queue).pop_front() else {
                    break;
                };

                let key = operation.key();
                lock(&results).insert(key.clone(), OperationStatus::Processing);

                let status = Self::process(&store, &operation);
                lock(&results).insert(key, status);

                if total_count > 0 {
                    let completed = lock(&results)
                        .values()
                        .filter(|status| {
                            matches!(status, OperationStatus::Success(_) | OperationStatus::Error(_))
                        })
                        .count();
                    *lock(&progress) = Some(completed as f32 / total_count as f32);
                }
            }

            *lock(&progress) = None;
            *lock(&is_running) = false;
            log::info!("List operations worker thread stopped");
        });

        Some(handle)
    }

    fn process(store: &PackageListStore, operation: &ListOperation) -> OperationStatus {
        match operation {
            ListOperation::Add { list, package_name } => {
                log::info!("Adding {} to {}", package_name, list.settings_key());
                // A failed read must not be mistaken for an empty list and overwritten.
                let current = match store.fetch(*list) {
                    Ok(current) => current,
                    Err(e) => return OperationStatus::Error(format!("Failed to read list: {}", e)),
                };
                if current.iter().any(|p| p == package_name) {
                    return OperationStatus::Success(current);
                }
                let Some(updated) = package_list::with_package(&current, package_name) else {
                    return OperationStatus::Error(format!(
                        "Invalid package identifier: {}",
                        package_name
                    ));
                };
                match store.save(*list, &updated) {
                    Ok(()) => OperationStatus::Success(updated),
                    Err(e) => {
                        log::error!("Failed to add {}: {}", package_name, e);
                        OperationStatus::Error(format!("Failed to write list: {}", e))
                    }
                }
            }
            ListOperation::Remove { list, package_name } => {
                log::info!("Removing {} from {}", package_name, list.settings_key());
                match store.try_remove(*list, package_name) {
                    Ok(updated) => OperationStatus::Success(updated),
                    Err(e) => {
                        log::error!("Failed to remove {}: {}", package_name, e);
                        OperationStatus::Error(format!("Failed to remove: {}", e))
                    }
                }
            }
        }
    }
}
