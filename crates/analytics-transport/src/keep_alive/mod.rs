use std::fmt;

/// Callback that hands execution time back to the platform.
pub type Release = Box<dyn FnOnce() + Send>;

/// Platform hook for requesting extra execution time while an upload is in
/// flight (e.g. a background task on mobile OSes).
pub trait BackgroundTasks: Send + Sync {
    /// Start a background task. Returns the callback that ends it, or `None`
    /// when the platform has nothing to begin.
    fn begin(&self) -> Option<Release>;
}

/// Platforms without a suspension model.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoBackgroundTasks;

impl BackgroundTasks for NoBackgroundTasks {
    fn begin(&self) -> Option<Release> {
        None
    }
}

/// Holds a background task open until dropped. The release callback runs
/// exactly once, on whichever path drops the guard.
#[must_use = "the background task ends as soon as the guard is dropped"]
pub struct KeepAlive {
    release: Option<Release>,
}

impl KeepAlive {
    pub fn acquire(tasks: &dyn BackgroundTasks) -> Self {
        Self {
            release: tasks.begin(),
        }
    }

    pub fn is_held(&self) -> bool {
        self.release.is_some()
    }
}

impl Drop for KeepAlive {
    fn drop(&mut self) {
        if let Some(release) = self.release.take() {
            release();
        }
    }
}

impl fmt::Debug for KeepAlive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeepAlive")
            .field("held", &self.is_held())
            .finish()
    }
}
