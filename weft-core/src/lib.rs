//! Weft Core
//!
//! This crate provides an incremental UI reconciliation engine. Given a
//! description of the desired UI as a tree of [`Element`]s, it computes the
//! minimal set of mutations that bring a host tree up to date. It implements:
//!
//! - Element descriptions and JSON ingestion
//! - A fiber tree kept in a generational arena
//! - Positional child reconciliation with property diffing
//! - Interruptible, deadline-driven scheduling
//! - A single synchronous commit per pass
//!
//! The host tree lives behind the [`HostAdapter`] trait, so the engine never
//! depends on a concrete rendering target. [`MemoryHost`] is an in-memory
//! implementation used by tests and tooling.
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - `element`: Immutable element descriptions and their properties
//! - `fiber`: Fiber nodes and the arena that owns them
//! - `reconciler`: Unit of work, child matching and prop diffing
//! - `commit`: Applying a finished tree to the host
//! - `scheduler`: The engine, deadlines and the idle-time runtime
//! - `host`: The host adapter seam and the in-memory host
//!
//! # Example
//!
//! ```rust
//! use weft_core::{create_element, Engine, MemoryHost, Props};
//!
//! let mut host = MemoryHost::new();
//! let container = host.create_container("root");
//! let mut engine = Engine::new(host);
//!
//! // Describe the UI
//! let app = create_element(
//!     "h1",
//!     Props::new().with("title", "greeting"),
//!     vec!["hello".into()],
//! );
//!
//! // Reconcile and commit in one go
//! engine.render(app, container);
//! engine.flush_sync()?;
//!
//! assert_eq!(
//!     engine.host().serialize(container),
//!     "<root><h1 title=\"greeting\">hello</h1></root>"
//! );
//! # Ok::<(), weft_core::EngineError>(())
//! ```

pub mod commit;
pub mod config;
pub mod element;
pub mod error;
pub mod fiber;
pub mod host;
pub mod reconciler;
pub mod scheduler;

pub use commit::{CommitReport, CommittedEffect};
pub use config::{ConfigError, EngineConfig};
pub use element::{
    create_element, create_text_element, Element, ElementError, ElementType, EventHandler,
    PropValue, Props,
};
pub use error::EngineError;
pub use fiber::{EffectTag, FiberId};
pub use host::{Event, HostAdapter, HostError, MemoryHost, NodeHandle};
pub use scheduler::{
    Deadline, Engine, FixedDeadline, IdleHost, InstantDeadline, ManualIdleHost, Runtime,
    TickOutcome,
};
