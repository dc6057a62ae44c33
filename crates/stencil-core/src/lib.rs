#![doc = r"Template rendering core for stencil: compiles tagged markup templates once and keeps the rendered document in sync with changing values."]

extern crate self as stencil_core;

pub mod binding;
pub mod blueprint;
pub mod cache;
pub mod collections;
pub mod config;
pub mod deferred;
pub mod diff;
pub mod dom;
pub mod error;
pub mod hash;
pub mod instance;
pub mod marker;
pub mod markup;
pub mod platform;
pub mod reconcile;
pub mod render;
pub mod runtime;
pub mod slot;
pub mod transform;
pub mod updater;
pub mod value;

pub use blueprint::{Address, Blueprint, Compiler, HoleKind, Note};
pub use cache::{BlueprintCache, CacheKey, Retention};
pub use config::StencilConfig;
pub use deferred::{Deferred, Resolver, Stream, StreamSink, Subscription};
pub use dom::{Document, Event, Listener, MutationStats, Namespace, NodeId, NodeKind};
pub use error::{ConstructionError, NodeError, RenderError};
pub use marker::Markers;
pub use markup::{HtmlParser, MarkupParser};
pub use platform::RuntimeScheduler;
pub use reconcile::{ManagedGroup, DEFAULT_DIFF_LIMIT};
pub use render::{AdoptedRender, BoundRender, RenderContext, Rendered, Stencil, Wire};
pub use runtime::{Command, DefaultScheduler, Runtime, RuntimeHandle};
pub use transform::{Transformer, Transformers};
pub use updater::Updater;
pub use value::{Invocation, Key, Object, Placeholder, Strings, Value};

pub use stencil_macros::{html, svg};
