//! Rendering-surface capability interface.
//!
//! The engine never talks to a concrete rendering target; it drives the
//! [`Surface`] trait, which is exactly the set of low-level node operations
//! the commit protocol needs. The host environment supplies the
//! implementation and owns the container node the root renders into.
//!
//! [`MemorySurface`] is a complete in-memory implementation used by the
//! tests and the demonstration harness. Besides the mutable node tree it
//! keeps an ordered op log of every mutation, which is how the tests assert
//! that a commit performed exactly the expected set of surface operations.

use crate::element::{AttrValue, Event, Listener, TEXT_ATTR, TEXT_TAG};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Opaque handle to one rendering-surface node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NodeId(pub u64);

/// Low-level node operations consumed by the engine.
pub trait Surface {
    /// Create a detached node tagged with `tag`.
    fn create_node(&mut self, tag: &str) -> NodeId;

    /// Create a detached raw text node.
    fn create_text_node(&mut self) -> NodeId;

    /// Append `child` as the last child of `parent`.
    fn append_child(&mut self, parent: NodeId, child: NodeId);

    /// Detach `child` from `parent`.
    fn remove_child(&mut self, parent: NodeId, child: NodeId);

    /// Set a plain attribute.
    fn set_attribute(&mut self, node: NodeId, name: &str, value: &AttrValue);

    /// Clear a plain attribute.
    fn clear_attribute(&mut self, node: NodeId, name: &str);

    /// Attach a listener for `event`.
    fn add_listener(&mut self, node: NodeId, event: &str, listener: &Listener);

    /// Detach the listener for `event`.
    fn remove_listener(&mut self, node: NodeId, event: &str, listener: &Listener);
}

/// One recorded surface mutation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SurfaceOp {
    /// Node created
    Create {
        /// Created node
        node: NodeId,
        /// Kind tag
        tag: String,
    },
    /// Child appended
    Append {
        /// Parent node
        parent: NodeId,
        /// Appended child
        child: NodeId,
    },
    /// Child detached
    Remove {
        /// Parent node
        parent: NodeId,
        /// Detached child
        child: NodeId,
    },
    /// Attribute set
    SetAttr {
        /// Target node
        node: NodeId,
        /// Attribute name
        name: String,
    },
    /// Attribute cleared
    ClearAttr {
        /// Target node
        node: NodeId,
        /// Attribute name
        name: String,
    },
    /// Listener attached
    AddListener {
        /// Target node
        node: NodeId,
        /// Event name
        event: String,
    },
    /// Listener detached
    RemoveListener {
        /// Target node
        node: NodeId,
        /// Event name
        event: String,
    },
}

#[derive(Debug, Default)]
struct MemoryNode {
    tag: String,
    attrs: BTreeMap<String, AttrValue>,
    listeners: BTreeMap<String, Listener>,
    children: Vec<NodeId>,
    parent: Option<NodeId>,
}

/// In-memory [`Surface`] implementation.
#[derive(Debug, Default)]
pub struct MemorySurface {
    nodes: Vec<MemoryNode>,
    ops: Vec<SurfaceOp>,
}

impl MemorySurface {
    /// Create an empty surface.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Mint a detached container node for a render root.
    ///
    /// Container setup belongs to the host, so it is not recorded in the
    /// op log.
    pub fn create_root(&mut self) -> NodeId {
        self.push_node("#root")
    }

    fn push_node(&mut self, tag: &str) -> NodeId {
        let id = NodeId(self.nodes.len() as u64);
        self.nodes.push(MemoryNode {
            tag: tag.to_string(),
            ..MemoryNode::default()
        });
        id
    }

    fn node(&self, id: NodeId) -> &MemoryNode {
        self.nodes
            .get(id.0 as usize)
            .expect("unknown surface node handle")
    }

    fn node_mut(&mut self, id: NodeId) -> &mut MemoryNode {
        self.nodes
            .get_mut(id.0 as usize)
            .expect("unknown surface node handle")
    }

    /// The kind tag of a node.
    #[must_use]
    pub fn tag(&self, node: NodeId) -> &str {
        &self.node(node).tag
    }

    /// Look up a plain attribute.
    #[must_use]
    pub fn attr(&self, node: NodeId, name: &str) -> Option<&AttrValue> {
        self.node(node).attrs.get(name)
    }

    /// Number of plain attributes on a node.
    #[must_use]
    pub fn attr_count(&self, node: NodeId) -> usize {
        self.node(node).attrs.len()
    }

    /// Iterate over a node's plain attributes in name order.
    pub fn attrs(&self, node: NodeId) -> impl Iterator<Item = (&str, &AttrValue)> {
        self.node(node).attrs.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// The attached children, in order.
    #[must_use]
    pub fn children(&self, node: NodeId) -> &[NodeId] {
        &self.node(node).children
    }

    /// The parent a node is attached to, if any.
    #[must_use]
    pub fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.node(node).parent
    }

    /// Whether a listener is attached for `event`.
    #[must_use]
    pub fn has_listener(&self, node: NodeId, event: &str) -> bool {
        self.node(node).listeners.contains_key(event)
    }

    /// Fire the listener attached for `event.name`, if any.
    ///
    /// Returns whether a listener was invoked.
    #[must_use]
    pub fn dispatch(&self, node: NodeId, event: &Event) -> bool {
        match self.node(node).listeners.get(&event.name) {
            Some(listener) => {
                listener.call(event);
                true
            }
            None => false,
        }
    }

    /// The recorded mutations since the last [`Self::take_ops`].
    #[must_use]
    pub fn ops(&self) -> &[SurfaceOp] {
        &self.ops
    }

    /// Drain the recorded mutations.
    pub fn take_ops(&mut self) -> Vec<SurfaceOp> {
        std::mem::take(&mut self.ops)
    }

    /// JSON snapshot of the subtree rooted at `node`.
    ///
    /// Text nodes render as `{"text": ...}`; other nodes as
    /// `{"tag", "attrs", "children"}`.
    #[must_use]
    pub fn to_json(&self, node: NodeId) -> Value {
        let data = self.node(node);
        if data.tag == TEXT_TAG {
            let text = data
                .attrs
                .get(TEXT_ATTR)
                .map(ToString::to_string)
                .unwrap_or_default();
            return serde_json::json!({ "text": text });
        }

        let attrs: serde_json::Map<String, Value> = data
            .attrs
            .iter()
            .map(|(name, value)| (name.clone(), attr_to_json(value)))
            .collect();
        let children: Vec<Value> = data
            .children
            .iter()
            .map(|child| self.to_json(*child))
            .collect();
        serde_json::json!({
            "tag": data.tag,
            "attrs": attrs,
            "children": children,
        })
    }
}

fn attr_to_json(value: &AttrValue) -> Value {
    match value {
        AttrValue::Text(s) => Value::String(s.clone()),
        AttrValue::Number(n) => {
            serde_json::Number::from_f64(*n).map_or_else(|| Value::String(n.to_string()), Value::Number)
        }
        AttrValue::Bool(b) => Value::Bool(*b),
    }
}

impl Surface for MemorySurface {
    fn create_node(&mut self, tag: &str) -> NodeId {
        let id = self.push_node(tag);
        self.ops.push(SurfaceOp::Create {
            node: id,
            tag: tag.to_string(),
        });
        id
    }

    fn create_text_node(&mut self) -> NodeId {
        let id = self.push_node(TEXT_TAG);
        self.ops.push(SurfaceOp::Create {
            node: id,
            tag: TEXT_TAG.to_string(),
        });
        id
    }

    fn append_child(&mut self, parent: NodeId, child: NodeId) {
        self.node_mut(parent).children.push(child);
        self.node_mut(child).parent = Some(parent);
        self.ops.push(SurfaceOp::Append { parent, child });
    }

    fn remove_child(&mut self, parent: NodeId, child: NodeId) {
        self.node_mut(parent).children.retain(|c| *c != child);
        self.node_mut(child).parent = None;
        self.ops.push(SurfaceOp::Remove { parent, child });
    }

    fn set_attribute(&mut self, node: NodeId, name: &str, value: &AttrValue) {
        self.node_mut(node).attrs.insert(name.to_string(), value.clone());
        self.ops.push(SurfaceOp::SetAttr {
            node,
            name: name.to_string(),
        });
    }

    fn clear_attribute(&mut self, node: NodeId, name: &str) {
        self.node_mut(node).attrs.remove(name);
        self.ops.push(SurfaceOp::ClearAttr {
            node,
            name: name.to_string(),
        });
    }

    fn add_listener(&mut self, node: NodeId, event: &str, listener: &Listener) {
        self.node_mut(node)
            .listeners
            .insert(event.to_string(), listener.clone());
        self.ops.push(SurfaceOp::AddListener {
            node,
            event: event.to_string(),
        });
    }

    fn remove_listener(&mut self, node: NodeId, event: &str, _listener: &Listener) {
        self.node_mut(node).listeners.remove(event);
        self.ops.push(SurfaceOp::RemoveListener {
            node,
            event: event.to_string(),
        });
    }
}
