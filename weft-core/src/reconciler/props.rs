//! Property Reconciliation
//!
//! Turns a pair of prop bags into the host mutations that move a node from
//! the first to the second.
//!
//! Keys starting with `on` are event keys (`onClick` binds `click`); every
//! other key except the reserved `children` is a plain attribute. The patch
//! is ordered in four groups:
//!
//! 1. unbind event handlers that disappeared or changed,
//! 2. clear attributes that disappeared,
//! 3. write attributes that are new or changed,
//! 4. bind event handlers that are new or changed.

use smallvec::SmallVec;
use tracing::warn;

use crate::element::{EventHandler, PropValue, Props, CHILDREN};
use crate::host::{HostAdapter, NodeHandle, Result};

/// Prefix marking an event key.
pub const EVENT_PREFIX: &str = "on";

/// How a prop key is treated by the diff.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PropKind {
    /// An event binding; holds the host event name.
    Event(String),
    /// A plain attribute.
    Plain,
    /// The reserved `children` key, never diffed.
    Reserved,
}

/// Classify a prop key.
pub fn classify(key: &str) -> PropKind {
    if key == CHILDREN {
        return PropKind::Reserved;
    }
    match key.strip_prefix(EVENT_PREFIX) {
        Some(event) if !event.is_empty() => PropKind::Event(event.to_lowercase()),
        _ => PropKind::Plain,
    }
}

/// One host mutation produced by a prop diff.
#[derive(Debug, Clone, PartialEq)]
pub enum PropMutation {
    RemoveEvent { key: String, event: String, handler: EventHandler },
    ClearAttribute { key: String },
    SetAttribute { key: String, value: PropValue },
    AddEvent { key: String, event: String, handler: EventHandler },
}

impl PropMutation {
    /// The prop key this mutation came from.
    pub fn key(&self) -> &str {
        match self {
            PropMutation::RemoveEvent { key, .. }
            | PropMutation::ClearAttribute { key }
            | PropMutation::SetAttribute { key, .. }
            | PropMutation::AddEvent { key, .. } => key,
        }
    }
}

/// Mutations for one node, in application order.
pub type PropPatch = SmallVec<[PropMutation; 4]>;

struct Classified<'a> {
    key: &'a str,
    kind: PropKind,
    value: &'a PropValue,
}

fn classify_all(props: &Props) -> SmallVec<[Classified<'_>; 8]> {
    props
        .iter()
        .map(|(key, value)| Classified {
            key,
            kind: classify(key),
            value,
        })
        .collect()
}

fn handler_of<'a>(key: &str, value: &'a PropValue) -> Option<&'a EventHandler> {
    let handler = value.as_handler();
    if handler.is_none() {
        warn!(key, kind = value.kind(), "event prop does not hold a handler, skipping");
    }
    handler
}

/// Compute the mutations turning `prev` into `next`.
pub fn diff_props(prev: &Props, next: &Props) -> PropPatch {
    let prev_keys = classify_all(prev);
    let next_keys = classify_all(next);
    let mut patch = PropPatch::new();

    // Stale handlers go first so a changed handler is never bound twice.
    for entry in &prev_keys {
        if let PropKind::Event(event) = &entry.kind {
            if next.get(entry.key) != Some(entry.value) {
                if let Some(handler) = handler_of(entry.key, entry.value) {
                    patch.push(PropMutation::RemoveEvent {
                        key: entry.key.to_string(),
                        event: event.clone(),
                        handler: handler.clone(),
                    });
                }
            }
        }
    }

    for entry in &prev_keys {
        if entry.kind == PropKind::Plain && !next.contains_key(entry.key) {
            patch.push(PropMutation::ClearAttribute {
                key: entry.key.to_string(),
            });
        }
    }

    for entry in &next_keys {
        if entry.kind == PropKind::Plain && prev.get(entry.key) != Some(entry.value) {
            patch.push(PropMutation::SetAttribute {
                key: entry.key.to_string(),
                value: entry.value.clone(),
            });
        }
    }

    for entry in &next_keys {
        if let PropKind::Event(event) = &entry.kind {
            if prev.get(entry.key) != Some(entry.value) {
                if let Some(handler) = handler_of(entry.key, entry.value) {
                    patch.push(PropMutation::AddEvent {
                        key: entry.key.to_string(),
                        event: event.clone(),
                        handler: handler.clone(),
                    });
                }
            }
        }
    }

    patch
}

/// Apply one mutation to `node`.
pub fn apply_mutation<H>(host: &mut H, node: NodeHandle, mutation: &PropMutation) -> Result<()>
where
    H: HostAdapter + ?Sized,
{
    match mutation {
        PropMutation::RemoveEvent { event, handler, .. } => {
            host.remove_event_binding(node, event, handler)
        }
        PropMutation::ClearAttribute { key } => host.clear_attribute(node, key),
        PropMutation::SetAttribute { key, value } => host.set_attribute(node, key, value),
        PropMutation::AddEvent { event, handler, .. } => {
            host.add_event_binding(node, event, handler)
        }
    }
}

/// Apply a patch to `node`, stopping at the first host failure.
pub fn apply_patch<H>(host: &mut H, node: NodeHandle, patch: &[PropMutation]) -> Result<()>
where
    H: HostAdapter + ?Sized,
{
    for mutation in patch {
        apply_mutation(host, node, mutation)?;
    }
    Ok(())
}

/// Fold mutations that reached the host back into the props they were
/// diffed from, so `props` describes the host node again.
pub fn replay_patch(props: &mut Props, patch: &[PropMutation]) {
    for mutation in patch {
        match mutation {
            PropMutation::RemoveEvent { key, .. } | PropMutation::ClearAttribute { key } => {
                props.remove(key);
            }
            PropMutation::SetAttribute { key, value } => {
                props.insert(key.as_str(), value.clone());
            }
            PropMutation::AddEvent { key, handler, .. } => {
                props.insert(key.as_str(), handler.clone());
            }
        }
    }
}
