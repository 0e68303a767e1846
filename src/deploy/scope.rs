//! Instance scope with teardown hooks.
//!
//! Every deployment owns one scope. Factories register teardown work on it
//! (closing a pool, dropping caches) and the deployment machinery destroys it
//! when the instance is undeployed. Hooks run last-in-first-out, and
//! destruction happens exactly once no matter how calls interleave.

use std::sync::atomic::{AtomicBool, Ordering};

use futures_util::future::BoxFuture;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

type TeardownHook = Box<dyn FnOnce() -> BoxFuture<'static, ()> + Send>;

pub struct InstanceScope {
    scope_id: String,
    hooks: Mutex<Vec<TeardownHook>>,
    destroyed: AtomicBool,
}

impl std::fmt::Debug for InstanceScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InstanceScope")
            .field("scope_id", &self.scope_id)
            .field("destroyed", &self.is_destroyed())
            .finish_non_exhaustive()
    }
}

impl InstanceScope {
    /// Create a fresh scope.
    pub fn new() -> Self {
        Self {
            scope_id: format!("scope_{}", uuid::Uuid::new_v4().simple()),
            hooks: Mutex::new(Vec::new()),
            destroyed: AtomicBool::new(false),
        }
    }

    /// Identifier of this scope, for log correlation.
    pub fn scope_id(&self) -> &str {
        &self.scope_id
    }

    /// Check whether the scope has been destroyed.
    pub fn is_destroyed(&self) -> bool {
        self.destroyed.load(Ordering::SeqCst)
    }

    /// Number of teardown hooks currently registered.
    pub async fn pending_hooks(&self) -> usize {
        self.hooks.lock().await.len()
    }

    /// Register a teardown hook to run on scope destruction.
    ///
    /// Hooks registered after destruction do not get lost: they run right
    /// away on a spawned task, with a warning, so late registrations cannot
    /// leak resources.
    pub async fn on_destroy<F, Fut>(&self, hook: F)
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        if self.is_destroyed() {
            warn!(
                scope_id = %self.scope_id,
                "Teardown hook registered after scope destruction, running immediately"
            );
            tokio::spawn(hook());
            return;
        }

        let mut hooks = self.hooks.lock().await;
        // Re-check under the lock so a concurrent destroy cannot strand the hook
        if self.is_destroyed() {
            drop(hooks);
            warn!(
                scope_id = %self.scope_id,
                "Teardown hook registered during scope destruction, running immediately"
            );
            tokio::spawn(hook());
            return;
        }
        hooks.push(Box::new(move || Box::pin(hook())));
    }

    /// Destroy the scope, running all hooks last-in-first-out.
    ///
    /// Only the first call runs the hooks; later calls are no-ops.
    pub async fn destroy(&self) {
        if self.destroyed.swap(true, Ordering::SeqCst) {
            debug!(scope_id = %self.scope_id, "Scope already destroyed");
            return;
        }

        // Drain under the lock, run outside it
        let mut hooks = {
            let mut guard = self.hooks.lock().await;
            std::mem::take(&mut *guard)
        };

        info!(
            scope_id = %self.scope_id,
            hooks = hooks.len(),
            "Destroying instance scope"
        );
        while let Some(hook) = hooks.pop() {
            hook().await;
        }
    }
}

impl Default for InstanceScope {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    use tokio::sync::Notify;

    use super::*;

    #[tokio::test]
    async fn test_hooks_run_in_reverse_registration_order() {
        let scope = InstanceScope::new();
        let order = Arc::new(Mutex::new(Vec::new()));

        for n in 1..=3u32 {
            let order = Arc::clone(&order);
            scope
                .on_destroy(move || async move {
                    order.lock().await.push(n);
                })
                .await;
        }

        scope.destroy().await;
        assert_eq!(*order.lock().await, vec![3, 2, 1]);
    }

    #[tokio::test]
    async fn test_destroy_runs_hooks_exactly_once() {
        let scope = InstanceScope::new();
        let runs = Arc::new(AtomicUsize::new(0));
        let counted = Arc::clone(&runs);

        scope
            .on_destroy(move || async move {
                counted.fetch_add(1, Ordering::SeqCst);
            })
            .await;

        scope.destroy().await;
        scope.destroy().await;
        assert!(scope.is_destroyed());
        assert_eq!(runs.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_late_hook_still_runs() {
        let scope = InstanceScope::new();
        scope.destroy().await;

        let notify = Arc::new(Notify::new());
        let notified = Arc::clone(&notify);
        scope
            .on_destroy(move || async move {
                notified.notify_one();
            })
            .await;

        tokio::time::timeout(Duration::from_secs(1), notify.notified())
            .await
            .expect("late hook runs on a spawned task");
    }

    #[tokio::test]
    async fn test_pending_hooks_drained_by_destroy() {
        let scope = InstanceScope::new();
        scope.on_destroy(|| async {}).await;
        scope.on_destroy(|| async {}).await;
        assert_eq!(scope.pending_hooks().await, 2);

        scope.destroy().await;
        assert_eq!(scope.pending_hooks().await, 0);
    }
}
