use crate::cache::Retention;
use crate::marker::Markers;
use crate::reconcile::DEFAULT_DIFF_LIMIT;

/// Settings of a [`Stencil`](crate::Stencil) environment.
#[derive(Clone, Debug)]
pub struct StencilConfig {
    /// Largest interior (old plus new nodes) the reconciler diffs; bigger
    /// changes replace the interior wholesale.
    pub diff_limit: usize,
    pub retention: Retention,
    pub markers: Markers,
}

impl Default for StencilConfig {
    fn default() -> Self {
        Self {
            diff_limit: DEFAULT_DIFF_LIMIT,
            retention: Retention::Unbounded,
            markers: Markers::generate(),
        }
    }
}

impl StencilConfig {
    pub fn with_diff_limit(mut self, diff_limit: usize) -> Self {
        self.diff_limit = diff_limit;
        self
    }

    pub fn with_retention(mut self, retention: Retention) -> Self {
        self.retention = retention;
        self
    }

    pub fn with_markers(mut self, markers: Markers) -> Self {
        self.markers = markers;
        self
    }
}
