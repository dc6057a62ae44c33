//! Testing harness for Stencil renders.
//!
//! [`TestStencil`] renders into a `<div>` container with fixed markers, so
//! snapshots of the markup are deterministic.

use log::error;
use stencil_core::{
    BoundRender, Invocation, Markers, MutationStats, Namespace, NodeId, RenderError, Stencil,
    StencilConfig,
};

/// Marker uid used by every [`TestStencil`].
pub const TEST_UID: &str = "_stencil_test;";

pub struct TestStencil {
    stencil: Stencil,
    container: NodeId,
    bound: BoundRender,
}

impl TestStencil {
    pub fn new() -> Self {
        Self::with_config(StencilConfig::default())
    }

    pub fn with_config(config: StencilConfig) -> Self {
        let mut stencil = Stencil::with_config(config.with_markers(Markers::with_uid(TEST_UID)));
        let container = stencil
            .document_mut()
            .create_element("div", Namespace::Html);
        let bound = stencil.bind(container);
        Self {
            stencil,
            container,
            bound,
        }
    }

    pub fn stencil(&self) -> &Stencil {
        &self.stencil
    }

    pub fn stencil_mut(&mut self) -> &mut Stencil {
        &mut self.stencil
    }

    pub fn container(&self) -> NodeId {
        self.container
    }

    /// Renders `invocation` into the container.
    pub fn render(&mut self, invocation: Invocation) -> Result<(), RenderError> {
        self.bound.render(&mut self.stencil, invocation).map(|_| ())
    }

    /// Markup of the container's children, markers included.
    pub fn html(&self) -> String {
        self.stencil.document().inner_html(self.container)
    }

    pub fn children(&self) -> Vec<NodeId> {
        self.stencil.document().children(self.container).to_vec()
    }

    pub fn stats(&self) -> MutationStats {
        self.stencil.document().stats()
    }

    /// Mutations performed while `f` runs.
    pub fn measure<R>(&mut self, f: impl FnOnce(&mut Self) -> R) -> (R, MutationStats) {
        let before = self.stats();
        let result = f(self);
        let delta = self.stats().since(&before);
        (result, delta)
    }

    /// Applies resolved deferred values and stream emissions. Returns how
    /// many updates ran; failures are logged and count as none.
    pub fn flush(&mut self) -> usize {
        match self.stencil.flush_pending() {
            Ok(applied) => applied,
            Err(err) => {
                error!("flushing pending updates failed: {err}");
                0
            }
        }
    }
}

impl Default for TestStencil {
    fn default() -> Self {
        Self::new()
    }
}
