//! In-memory host tree.
//!
//! `MemoryHost` keeps a real node tree (tags, attributes, listeners, ordered
//! children) and records every adapter call in order. Tests assert against
//! both: the call log for ordering properties, the tree for end state.

use std::collections::HashMap;
use std::fmt::Write as _;

use indexmap::IndexMap;
use tracing::trace;

use super::{Event, HostAdapter, HostError, NodeHandle, Result};
use crate::element::{EventHandler, PropValue, NODE_VALUE};

/// One recorded adapter call.
#[derive(Debug, Clone, PartialEq)]
pub enum HostCall {
    CreateNode { node: NodeHandle, tag: String },
    CreateTextNode { node: NodeHandle, text: String },
    SetAttribute { node: NodeHandle, key: String, value: PropValue },
    ClearAttribute { node: NodeHandle, key: String },
    AddEventBinding { node: NodeHandle, event: String },
    RemoveEventBinding { node: NodeHandle, event: String },
    AppendChild { parent: NodeHandle, child: NodeHandle },
    RemoveChild { parent: NodeHandle, child: NodeHandle },
    DiscardNode { node: NodeHandle },
}

impl HostCall {
    /// Whether the call creates a node (as opposed to mutating one).
    pub fn is_creation(&self) -> bool {
        matches!(self, HostCall::CreateNode { .. } | HostCall::CreateTextNode { .. })
    }

    /// Whether the call changes the shape of the host tree.
    pub fn is_structural(&self) -> bool {
        matches!(self, HostCall::AppendChild { .. } | HostCall::RemoveChild { .. })
    }
}

/// What a memory node is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MemoryNodeKind {
    Element(String),
    Text(String),
}

#[derive(Debug)]
struct MemoryNode {
    kind: MemoryNodeKind,
    attributes: IndexMap<String, PropValue>,
    listeners: Vec<(String, EventHandler)>,
    children: Vec<NodeHandle>,
    parent: Option<NodeHandle>,
}

impl MemoryNode {
    fn new(kind: MemoryNodeKind) -> Self {
        Self {
            kind,
            attributes: IndexMap::new(),
            listeners: Vec::new(),
            children: Vec::new(),
            parent: None,
        }
    }
}

/// A host adapter backed by an in-memory node tree.
#[derive(Debug, Default)]
pub struct MemoryHost {
    nodes: HashMap<NodeHandle, MemoryNode>,
    next_id: u64,
    calls: Vec<HostCall>,
    /// Number of further mutating calls allowed before the host starts
    /// rejecting them. `None` means unlimited.
    fail_after: Option<usize>,
}

impl MemoryHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a detached container node. Not recorded in the call log.
    pub fn create_container(&mut self, tag: &str) -> NodeHandle {
        self.alloc(MemoryNodeKind::Element(tag.to_string()))
    }

    /// Make the call after the next `calls` successful ones fail, once.
    pub fn fail_after(&mut self, calls: usize) {
        self.fail_after = Some(calls);
    }

    /// Cancel a pending injected failure.
    pub fn clear_failure(&mut self) {
        self.fail_after = None;
    }

    /// All recorded calls, oldest first.
    pub fn calls(&self) -> &[HostCall] {
        &self.calls
    }

    /// Drain the call log.
    pub fn take_calls(&mut self) -> Vec<HostCall> {
        std::mem::take(&mut self.calls)
    }

    /// Number of live nodes, containers included.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn contains(&self, node: NodeHandle) -> bool {
        self.nodes.contains_key(&node)
    }

    pub fn kind(&self, node: NodeHandle) -> Option<&MemoryNodeKind> {
        self.nodes.get(&node).map(|n| &n.kind)
    }

    pub fn children(&self, node: NodeHandle) -> Option<&[NodeHandle]> {
        self.nodes.get(&node).map(|n| n.children.as_slice())
    }

    pub fn parent(&self, node: NodeHandle) -> Option<NodeHandle> {
        self.nodes.get(&node).and_then(|n| n.parent)
    }

    pub fn attribute(&self, node: NodeHandle, key: &str) -> Option<&PropValue> {
        self.nodes.get(&node).and_then(|n| n.attributes.get(key))
    }

    /// Content of a text node.
    pub fn text(&self, node: NodeHandle) -> Option<&str> {
        match self.nodes.get(&node).map(|n| &n.kind) {
            Some(MemoryNodeKind::Text(text)) => Some(text),
            _ => None,
        }
    }

    /// Handlers registered for `event` on `node`, in registration order.
    pub fn listeners(&self, node: NodeHandle, event: &str) -> Vec<EventHandler> {
        self.nodes
            .get(&node)
            .map(|n| {
                n.listeners
                    .iter()
                    .filter(|(name, _)| name == event)
                    .map(|(_, handler)| handler.clone())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Invoke every handler registered for the event's kind on its target.
    ///
    /// Returns the number of handlers called. Handlers that need to call
    /// back into an engine holding this host must be invoked through
    /// [`MemoryHost::listeners`] instead, outside any borrow of the host.
    pub fn dispatch_event(&self, event: &Event) -> Result<usize> {
        if !self.nodes.contains_key(&event.target) {
            return Err(HostError::UnknownNode(event.target));
        }
        let handlers = self.listeners(event.target, &event.kind);
        for handler in &handlers {
            handler.call(event);
        }
        Ok(handlers.len())
    }

    /// First child element whose tag matches, searching depth-first.
    pub fn find_by_tag(&self, root: NodeHandle, tag: &str) -> Option<NodeHandle> {
        let mut stack = vec![root];
        while let Some(handle) = stack.pop() {
            let node = self.nodes.get(&handle)?;
            if handle != root && node.kind == MemoryNodeKind::Element(tag.to_string()) {
                return Some(handle);
            }
            stack.extend(node.children.iter().rev().copied());
        }
        None
    }

    /// Render the subtree below `node` as markup. Handlers are omitted.
    ///
    /// The node itself is included, so a container renders as its own tag
    /// wrapping the committed tree.
    pub fn serialize(&self, node: NodeHandle) -> String {
        let mut out = String::new();
        self.write_markup(node, &mut out);
        out
    }

    fn write_markup(&self, handle: NodeHandle, out: &mut String) {
        let Some(node) = self.nodes.get(&handle) else {
            return;
        };
        match &node.kind {
            MemoryNodeKind::Text(text) => out.push_str(text),
            MemoryNodeKind::Element(tag) => {
                out.push('<');
                out.push_str(tag);
                for (key, value) in &node.attributes {
                    let _ = write!(out, " {key}=\"{value}\"");
                }
                out.push('>');
                for child in &node.children {
                    self.write_markup(*child, out);
                }
                let _ = write!(out, "</{tag}>");
            }
        }
    }

    fn alloc(&mut self, kind: MemoryNodeKind) -> NodeHandle {
        self.next_id += 1;
        let handle = NodeHandle::from_raw(self.next_id);
        self.nodes.insert(handle, MemoryNode::new(kind));
        handle
    }

    fn check_budget(&mut self) -> Result<()> {
        match self.fail_after {
            Some(0) => {
                self.fail_after = None;
                Err(HostError::Rejected("injected failure".to_string()))
            }
            Some(ref mut remaining) => {
                *remaining -= 1;
                Ok(())
            }
            None => Ok(()),
        }
    }

    fn node_mut(&mut self, handle: NodeHandle) -> Result<&mut MemoryNode> {
        self.nodes
            .get_mut(&handle)
            .ok_or(HostError::UnknownNode(handle))
    }

    fn detach(&mut self, child: NodeHandle) {
        let parent = self.nodes.get(&child).and_then(|n| n.parent);
        if let Some(parent) = parent {
            if let Some(p) = self.nodes.get_mut(&parent) {
                p.children.retain(|c| *c != child);
            }
        }
        if let Some(c) = self.nodes.get_mut(&child) {
            c.parent = None;
        }
    }

    fn record(&mut self, call: HostCall) {
        trace!(?call, "host call");
        self.calls.push(call);
    }
}

impl HostAdapter for MemoryHost {
    fn create_node(&mut self, tag: &str) -> Result<NodeHandle> {
        self.check_budget()?;
        let node = self.alloc(MemoryNodeKind::Element(tag.to_string()));
        self.record(HostCall::CreateNode {
            node,
            tag: tag.to_string(),
        });
        Ok(node)
    }

    fn create_text_node(&mut self, text: &str) -> Result<NodeHandle> {
        self.check_budget()?;
        let node = self.alloc(MemoryNodeKind::Text(text.to_string()));
        self.record(HostCall::CreateTextNode {
            node,
            text: text.to_string(),
        });
        Ok(node)
    }

    fn set_attribute(&mut self, node: NodeHandle, key: &str, value: &PropValue) -> Result<()> {
        self.check_budget()?;
        let target = self.node_mut(node)?;
        match &mut target.kind {
            MemoryNodeKind::Text(text) if key == NODE_VALUE => *text = value.to_string(),
            _ => {
                target.attributes.insert(key.to_string(), value.clone());
            }
        }
        self.record(HostCall::SetAttribute {
            node,
            key: key.to_string(),
            value: value.clone(),
        });
        Ok(())
    }

    fn clear_attribute(&mut self, node: NodeHandle, key: &str) -> Result<()> {
        self.check_budget()?;
        let target = self.node_mut(node)?;
        match &mut target.kind {
            MemoryNodeKind::Text(text) if key == NODE_VALUE => text.clear(),
            _ => {
                target.attributes.shift_remove(key);
            }
        }
        self.record(HostCall::ClearAttribute {
            node,
            key: key.to_string(),
        });
        Ok(())
    }

    fn add_event_binding(
        &mut self,
        node: NodeHandle,
        event: &str,
        handler: &EventHandler,
    ) -> Result<()> {
        self.check_budget()?;
        self.node_mut(node)?
            .listeners
            .push((event.to_string(), handler.clone()));
        self.record(HostCall::AddEventBinding {
            node,
            event: event.to_string(),
        });
        Ok(())
    }

    fn remove_event_binding(
        &mut self,
        node: NodeHandle,
        event: &str,
        handler: &EventHandler,
    ) -> Result<()> {
        self.check_budget()?;
        let target = self.node_mut(node)?;
        if let Some(pos) = target
            .listeners
            .iter()
            .position(|(name, h)| name == event && h.ptr_eq(handler))
        {
            target.listeners.remove(pos);
        }
        self.record(HostCall::RemoveEventBinding {
            node,
            event: event.to_string(),
        });
        Ok(())
    }

    fn append_child(&mut self, parent: NodeHandle, child: NodeHandle) -> Result<()> {
        self.check_budget()?;
        if !self.nodes.contains_key(&child) {
            return Err(HostError::UnknownNode(child));
        }
        if let MemoryNodeKind::Text(_) = self.node_mut(parent)?.kind {
            return Err(HostError::TextNodeParent(parent));
        }
        self.detach(child);
        self.node_mut(parent)?.children.push(child);
        self.node_mut(child)?.parent = Some(parent);
        self.record(HostCall::AppendChild { parent, child });
        Ok(())
    }

    fn remove_child(&mut self, parent: NodeHandle, child: NodeHandle) -> Result<()> {
        self.check_budget()?;
        if !self.node_mut(parent)?.children.contains(&child) {
            return Err(HostError::NotAChild { parent, child });
        }
        self.detach(child);
        self.record(HostCall::RemoveChild { parent, child });
        Ok(())
    }

    fn discard_node(&mut self, node: NodeHandle) {
        if !self.nodes.contains_key(&node) {
            return;
        }
        self.detach(node);
        // Discarded subtrees are never reattached, drop the descendants too.
        let mut stack = vec![node];
        while let Some(handle) = stack.pop() {
            if let Some(removed) = self.nodes.remove(&handle) {
                stack.extend(removed.children);
            }
        }
        self.record(HostCall::DiscardNode { node });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn builds_and_serializes_tree() {
        let mut host = MemoryHost::new();
        let root = host.create_container("root");
        let div = host.create_node("div").unwrap();
        let text = host.create_text_node("hi").unwrap();

        host.set_attribute(div, "id", &PropValue::from("a")).unwrap();
        host.append_child(div, text).unwrap();
        host.append_child(root, div).unwrap();

        assert_eq!(host.serialize(root), "<root><div id=\"a\">hi</div></root>");
        assert_eq!(host.parent(div), Some(root));
        assert_eq!(host.calls().len(), 5);
    }

    #[test]
    fn node_value_updates_text_content() {
        let mut host = MemoryHost::new();
        let text = host.create_text_node("").unwrap();
        host.set_attribute(text, NODE_VALUE, &PropValue::from(5)).unwrap();
        assert_eq!(host.text(text), Some("5"));
        host.clear_attribute(text, NODE_VALUE).unwrap();
        assert_eq!(host.text(text), Some(""));
    }

    #[test]
    fn remove_child_requires_membership() {
        let mut host = MemoryHost::new();
        let a = host.create_node("a").unwrap();
        let b = host.create_node("b").unwrap();
        assert_eq!(
            host.remove_child(a, b),
            Err(HostError::NotAChild { parent: a, child: b })
        );
        assert_eq!(
            host.append_child(NodeHandle::from_raw(99), b),
            Err(HostError::UnknownNode(NodeHandle::from_raw(99)))
        );
    }

    #[test]
    fn text_nodes_reject_children() {
        let mut host = MemoryHost::new();
        let text = host.create_text_node("t").unwrap();
        let b = host.create_node("b").unwrap();
        assert_eq!(host.append_child(text, b), Err(HostError::TextNodeParent(text)));
    }

    #[test]
    fn append_moves_existing_child() {
        let mut host = MemoryHost::new();
        let a = host.create_node("a").unwrap();
        let b = host.create_node("b").unwrap();
        let c = host.create_node("c").unwrap();
        host.append_child(a, c).unwrap();
        host.append_child(b, c).unwrap();
        assert_eq!(host.children(a), Some(&[][..]));
        assert_eq!(host.children(b), Some(&[c][..]));
    }

    #[test]
    fn dispatch_invokes_matching_listeners() {
        let mut host = MemoryHost::new();
        let input = host.create_node("input").unwrap();
        let hits = Arc::new(AtomicUsize::new(0));
        let hits_clone = hits.clone();
        let handler = EventHandler::new(move |_| {
            hits_clone.fetch_add(1, Ordering::SeqCst);
        });

        host.add_event_binding(input, "input", &handler).unwrap();
        assert_eq!(host.dispatch_event(&Event::new("input", input)).unwrap(), 1);
        assert_eq!(host.dispatch_event(&Event::new("click", input)).unwrap(), 0);

        host.remove_event_binding(input, "input", &handler).unwrap();
        assert_eq!(host.dispatch_event(&Event::new("input", input)).unwrap(), 0);
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn injected_failure_fires_once_after_budget() {
        let mut host = MemoryHost::new();
        host.fail_after(1);
        assert!(host.create_node("a").is_ok());
        assert!(matches!(host.create_node("b"), Err(HostError::Rejected(_))));
        assert!(host.create_node("c").is_ok());

        host.fail_after(0);
        host.clear_failure();
        assert!(host.create_node("d").is_ok());
    }

    #[test]
    fn discard_drops_subtree() {
        let mut host = MemoryHost::new();
        let a = host.create_node("a").unwrap();
        let b = host.create_node("b").unwrap();
        host.append_child(a, b).unwrap();
        host.discard_node(a);
        assert!(!host.contains(a));
        assert!(!host.contains(b));
        assert_eq!(host.calls().last(), Some(&HostCall::DiscardNode { node: a }));
    }
}
