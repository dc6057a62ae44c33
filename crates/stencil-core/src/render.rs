//! Render entry points.
//!
//! [`Stencil`] owns the document and everything shared between call sites.
//! Render handles ([`BoundRender`], [`Wire`], [`AdoptedRender`]) are owned by
//! the caller and hold the per-container instances.

use std::rc::Rc;
use std::sync::Arc;

use indexmap::map::Entry;

use crate::blueprint::{Blueprint, Compiler};
use crate::cache::{BlueprintCache, CacheKey};
use crate::collections::{ordered_map, OrderedMap};
use crate::config::StencilConfig;
use crate::dom::{Document, Namespace, NodeId};
use crate::error::{NodeError, RenderError};
use crate::instance::TemplateInstance;
use crate::marker::Markers;
use crate::markup::{HtmlParser, MarkupParser};
use crate::platform::RuntimeScheduler;
use crate::runtime::{DefaultScheduler, Runtime, RuntimeHandle};
use crate::transform::{Transformer, Transformers};
use crate::value::{Invocation, Object, Value};

/// Borrowed view of a [`Stencil`] handed to updaters.
pub struct RenderContext<'a> {
    document: &'a mut Document,
    cache: &'a mut BlueprintCache,
    parser: &'a dyn MarkupParser,
    markers: &'a Markers,
    transformers: &'a Transformers,
    runtime: RuntimeHandle,
    diff_limit: usize,
}

impl<'a> RenderContext<'a> {
    pub fn document(&self) -> &Document {
        &*self.document
    }

    pub fn document_mut(&mut self) -> &mut Document {
        &mut *self.document
    }

    pub fn runtime(&self) -> &RuntimeHandle {
        &self.runtime
    }

    pub fn markers(&self) -> &Markers {
        self.markers
    }

    pub fn diff_limit(&self) -> usize {
        self.diff_limit
    }

    /// Cached blueprint of `invocation`'s static shape, compiled on first use.
    pub fn blueprint(&mut self, invocation: &Invocation) -> Result<Rc<Blueprint>, RenderError> {
        let compiler = Compiler::new(self.parser, self.markers);
        Ok(self.cache.get_or_compile(invocation, &compiler)?)
    }

    /// Parses `markup` into a detached fragment of the live document.
    pub fn parse_html(&mut self, markup: &str, namespace: Namespace) -> NodeId {
        self.parser
            .parse_fragment(&mut *self.document, markup, namespace)
    }

    pub fn transform(&self, object: &Object) -> Option<Value> {
        self.transformers.transform(object)
    }
}

pub struct Stencil {
    document: Document,
    cache: BlueprintCache,
    parser: Box<dyn MarkupParser>,
    transformers: Transformers,
    runtime: Runtime,
    config: StencilConfig,
}

impl Stencil {
    pub fn new() -> Self {
        Self::with_config(StencilConfig::default())
    }

    pub fn with_config(config: StencilConfig) -> Self {
        Self {
            document: Document::new(),
            cache: BlueprintCache::new(config.retention),
            parser: Box::new(HtmlParser),
            transformers: Transformers::new(),
            runtime: Runtime::new(Arc::new(DefaultScheduler)),
            config,
        }
    }

    pub fn with_parser(mut self, parser: impl MarkupParser + 'static) -> Self {
        self.parser = Box::new(parser);
        self
    }

    /// Replaces the runtime so `scheduler` hears about queued work. Work
    /// queued on the previous runtime is dropped.
    pub fn with_scheduler(mut self, scheduler: Arc<dyn RuntimeScheduler>) -> Self {
        self.runtime = Runtime::new(scheduler);
        self
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn document_mut(&mut self) -> &mut Document {
        &mut self.document
    }

    pub fn cache(&self) -> &BlueprintCache {
        &self.cache
    }

    pub fn config(&self) -> &StencilConfig {
        &self.config
    }

    pub fn runtime(&self) -> &Runtime {
        &self.runtime
    }

    /// Registers a transformer for object values carrying a `name` property.
    pub fn define(&mut self, name: impl Into<String>, transformer: impl Transformer + 'static) {
        self.transformers.define(name, transformer);
    }

    pub fn bind(&self, container: NodeId) -> BoundRender {
        BoundRender::new(container)
    }

    pub fn wire(&self) -> Wire {
        Wire::default()
    }

    pub fn adopt(&self, container: NodeId) -> AdoptedRender {
        AdoptedRender::new(container)
    }

    /// Renders `invocation` once into detached nodes.
    pub fn materialize(&mut self, invocation: Invocation) -> Result<Rendered, RenderError> {
        Wire::default().render(self, invocation)
    }

    /// Compiles `invocation`'s static shape, or returns the cached blueprint.
    pub fn blueprint(&mut self, invocation: &Invocation) -> Result<Rc<Blueprint>, RenderError> {
        self.context().blueprint(invocation)
    }

    /// Applies resolved deferred values and stream emissions. Returns how
    /// many queued updates ran.
    pub fn flush_pending(&mut self) -> Result<usize, RenderError> {
        let runtime = self.runtime.clone();
        let mut cx = self.context();
        runtime.flush(|command| command(&mut cx))
    }

    pub fn has_pending(&self) -> bool {
        self.runtime.has_pending() || self.runtime.has_updates()
    }

    pub(crate) fn context(&mut self) -> RenderContext<'_> {
        RenderContext {
            document: &mut self.document,
            cache: &mut self.cache,
            parser: self.parser.as_ref(),
            markers: &self.config.markers,
            transformers: &self.transformers,
            runtime: self.runtime.handle(),
            diff_limit: self.config.diff_limit,
        }
    }
}

impl Default for Stencil {
    fn default() -> Self {
        Self::new()
    }
}

/// Top-level result of a detached render.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Rendered {
    Single(NodeId),
    Many(Vec<NodeId>),
}

impl Rendered {
    fn from_nodes(mut nodes: Vec<NodeId>) -> Self {
        if nodes.len() == 1 {
            Rendered::Single(nodes.remove(0))
        } else {
            Rendered::Many(nodes)
        }
    }

    pub fn nodes(&self) -> Vec<NodeId> {
        match self {
            Rendered::Single(node) => vec![*node],
            Rendered::Many(nodes) => nodes.clone(),
        }
    }

    pub fn single(&self) -> Option<NodeId> {
        match self {
            Rendered::Single(node) => Some(*node),
            Rendered::Many(_) => None,
        }
    }
}

impl From<Rendered> for Value {
    fn from(rendered: Rendered) -> Self {
        match rendered {
            Rendered::Single(node) => Value::Node(node),
            Rendered::Many(nodes) => Value::List(nodes.into_iter().map(Value::Node).collect()),
        }
    }
}

/// Renders into a container, replacing its children whenever the template
/// shape changes and updating in place otherwise.
pub struct BoundRender {
    container: NodeId,
    instances: OrderedMap<CacheKey, TemplateInstance>,
    current: Option<CacheKey>,
}

impl BoundRender {
    pub fn new(container: NodeId) -> Self {
        Self {
            container,
            instances: ordered_map(),
            current: None,
        }
    }

    pub fn container(&self) -> NodeId {
        self.container
    }

    pub fn render(
        &mut self,
        stencil: &mut Stencil,
        invocation: Invocation,
    ) -> Result<NodeId, RenderError> {
        invocation.check_arity()?;
        let key = CacheKey::of(&invocation);
        let mut cx = stencil.context();
        let instance = match self.instances.entry(key.clone()) {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => {
                let blueprint = cx.blueprint(&invocation)?;
                entry.insert(TemplateInstance::instantiate(&mut cx, &blueprint)?)
            }
        };
        instance.update(&mut cx, invocation.into_values())?;
        if self.current.as_ref() != Some(&key) {
            replace_children(cx.document_mut(), self.container, &instance.content())?;
            self.current = Some(key);
        }
        Ok(self.container)
    }
}

/// Renders into detached nodes, reusing its instance while the template shape
/// stays the same.
#[derive(Default)]
pub struct Wire {
    current: Option<(CacheKey, TemplateInstance)>,
}

impl Wire {
    pub fn render(
        &mut self,
        stencil: &mut Stencil,
        invocation: Invocation,
    ) -> Result<Rendered, RenderError> {
        let nodes = self.render_nodes(&mut stencil.context(), invocation)?;
        Ok(Rendered::from_nodes(nodes))
    }

    pub(crate) fn render_nodes(
        &mut self,
        cx: &mut RenderContext<'_>,
        invocation: Invocation,
    ) -> Result<Vec<NodeId>, RenderError> {
        invocation.check_arity()?;
        let key = CacheKey::of(&invocation);
        let reusable = matches!(&self.current, Some((current, _)) if *current == key);
        if !reusable {
            let blueprint = cx.blueprint(&invocation)?;
            let instance = TemplateInstance::instantiate(cx, &blueprint)?;
            self.current = Some((key, instance));
        }
        let Some((_, instance)) = self.current.as_mut() else {
            return Ok(Vec::new());
        };
        instance.update(cx, invocation.into_values())?;
        Ok(instance.content())
    }
}

/// Takes over markup already present in a container on first render.
pub struct AdoptedRender {
    container: NodeId,
    current: Option<(CacheKey, TemplateInstance)>,
}

impl AdoptedRender {
    pub fn new(container: NodeId) -> Self {
        Self {
            container,
            current: None,
        }
    }

    pub fn render(
        &mut self,
        stencil: &mut Stencil,
        invocation: Invocation,
    ) -> Result<NodeId, RenderError> {
        invocation.check_arity()?;
        let key = CacheKey::of(&invocation);
        let mut cx = stencil.context();
        let mut attach = false;
        let reusable = matches!(&self.current, Some((current, _)) if *current == key);
        if !reusable {
            let blueprint = cx.blueprint(&invocation)?;
            let instance = if self.current.is_none() {
                TemplateInstance::adopt(&mut cx, &blueprint, self.container)?
            } else {
                attach = true;
                TemplateInstance::instantiate(&mut cx, &blueprint)?
            };
            self.current = Some((key, instance));
        }
        let Some((_, instance)) = self.current.as_mut() else {
            return Ok(self.container);
        };
        instance.update(&mut cx, invocation.into_values())?;
        if attach {
            replace_children(cx.document_mut(), self.container, &instance.content())?;
        }
        Ok(self.container)
    }
}

/// Swaps every child of `container` for `nodes` with a single insertion.
fn replace_children(
    document: &mut Document,
    container: NodeId,
    nodes: &[NodeId],
) -> Result<(), NodeError> {
    for child in document.children(container).to_vec() {
        document.remove_child(container, child)?;
    }
    let batch = document.scratch_fragment();
    for &node in nodes {
        document.append_child(batch, node)?;
    }
    document.append_child(container, batch)
}
