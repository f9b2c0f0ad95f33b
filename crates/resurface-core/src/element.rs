//! Declarative element model.
//!
//! Elements are immutable descriptions of what the surface tree should look
//! like after a render: a kind, an attribute map, listeners, and an ordered
//! children sequence. They are built fresh per render with the fluent
//! constructors and handed to [`Renderer::render`](crate::Renderer::render),
//! which only ever reads them.
//!
//! Raw text is represented as a host element with the reserved [`TEXT_TAG`]
//! kind carrying its content in the [`TEXT_ATTR`] attribute. Any primitive
//! with a `From` impl below is auto-wrapped as such a text element when used
//! as a child; children that are neither elements nor one of those primitives
//! are rejected by the type system at construction time.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

/// Reserved kind tag for raw text nodes.
pub const TEXT_TAG: &str = "#text";

/// Attribute under which a text element carries its content.
pub const TEXT_ATTR: &str = "text";

/// A plain attribute value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AttrValue {
    /// String value
    Text(String),
    /// Numeric value
    Number(f64),
    /// Boolean value
    Bool(bool),
}

impl fmt::Display for AttrValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(s) => f.write_str(s),
            Self::Number(n) => write!(f, "{n}"),
            Self::Bool(b) => write!(f, "{b}"),
        }
    }
}

impl From<&str> for AttrValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for AttrValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<f64> for AttrValue {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<i64> for AttrValue {
    fn from(value: i64) -> Self {
        Self::Number(value as f64)
    }
}

impl From<bool> for AttrValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

/// Payload handed to a listener when a surface fires an event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    /// Event name, e.g. `"click"`.
    pub name: String,
}

impl Event {
    /// Create an event payload.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

/// Shared handle to an event listener.
///
/// Listener identity is pointer identity: two handles compare equal only if
/// they were cloned from the same `Listener::new` call. The commit-time
/// listener diff relies on this to decide whether a listener changed between
/// renders, so callers that want a listener to survive re-renders unchanged
/// must reuse the same handle rather than wrapping a fresh closure each time.
#[derive(Clone)]
pub struct Listener(Rc<dyn Fn(&Event)>);

impl Listener {
    /// Wrap a closure as a listener.
    #[must_use]
    pub fn new<F: Fn(&Event) + 'static>(f: F) -> Self {
        Self(Rc::new(f))
    }

    /// Invoke the listener.
    pub fn call(&self, event: &Event) {
        (self.0)(event);
    }
}

impl PartialEq for Listener {
    fn eq(&self, other: &Self) -> bool {
        // Compare data pointers only; the vtable part of a fat pointer is
        // not stable across codegen units.
        std::ptr::eq(
            Rc::as_ptr(&self.0).cast::<u8>(),
            Rc::as_ptr(&other.0).cast::<u8>(),
        )
    }
}

impl fmt::Debug for Listener {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Listener({:p})", Rc::as_ptr(&self.0))
    }
}

/// Error produced by a failing component function.
pub type ComponentError = Box<dyn std::error::Error + Send + Sync>;

/// Result of invoking a component function.
pub type ComponentResult = Result<Element, ComponentError>;

/// Shared handle to a pure attributes-to-element mapping function.
///
/// A component produces no surface node of its own; during reconciliation it
/// is invoked with its props and the returned element becomes its sole child.
/// Like [`Listener`], identity is pointer identity, and a kind match across
/// renders requires the same handle.
#[derive(Clone)]
pub struct Component(Rc<dyn Fn(&Props) -> ComponentResult>);

impl Component {
    /// Wrap a fallible mapping function.
    #[must_use]
    pub fn new<F: Fn(&Props) -> ComponentResult + 'static>(f: F) -> Self {
        Self(Rc::new(f))
    }

    /// Wrap an infallible mapping function.
    #[must_use]
    pub fn pure<F: Fn(&Props) -> Element + 'static>(f: F) -> Self {
        Self::new(move |props| Ok(f(props)))
    }

    /// Invoke the mapping function.
    pub fn invoke(&self, props: &Props) -> ComponentResult {
        (self.0)(props)
    }
}

impl PartialEq for Component {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(
            Rc::as_ptr(&self.0).cast::<u8>(),
            Rc::as_ptr(&other.0).cast::<u8>(),
        )
    }
}

impl fmt::Debug for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Component({:p})", Rc::as_ptr(&self.0))
    }
}

/// What an element (or the work unit produced from it) renders as.
#[derive(Debug, Clone, PartialEq)]
pub enum ElementKind {
    /// Maps directly to a surface node tagged with the given kind.
    Host(String),
    /// Produces child elements by invocation; owns no surface node.
    Component(Component),
}

impl ElementKind {
    /// The host tag, if this is a host kind.
    #[must_use]
    pub fn tag(&self) -> Option<&str> {
        match self {
            Self::Host(tag) => Some(tag),
            Self::Component(_) => None,
        }
    }

    /// Whether this is the reserved text kind.
    #[must_use]
    pub fn is_text(&self) -> bool {
        matches!(self, Self::Host(tag) if tag == TEXT_TAG)
    }
}

/// An element's attribute mapping, listeners, and children sequence.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Props {
    pub(crate) attrs: BTreeMap<String, AttrValue>,
    pub(crate) listeners: BTreeMap<String, Listener>,
    pub(crate) children: Vec<Element>,
}

impl Props {
    /// Create an empty props set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a plain attribute.
    #[must_use]
    pub fn attr(&self, name: &str) -> Option<&AttrValue> {
        self.attrs.get(name)
    }

    /// Look up a listener by event name.
    #[must_use]
    pub fn listener(&self, event: &str) -> Option<&Listener> {
        self.listeners.get(event)
    }

    /// Iterate over plain attributes in name order.
    pub fn attrs(&self) -> impl Iterator<Item = (&str, &AttrValue)> {
        self.attrs.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// The ordered children sequence.
    #[must_use]
    pub fn children(&self) -> &[Element] {
        &self.children
    }
}

/// Immutable declarative description of one node of the desired tree.
#[derive(Debug, Clone, PartialEq)]
pub struct Element {
    pub(crate) kind: ElementKind,
    pub(crate) props: Props,
}

impl Element {
    /// Create a host element with the given kind tag.
    #[must_use]
    pub fn host(tag: impl Into<String>) -> Self {
        Self {
            kind: ElementKind::Host(tag.into()),
            props: Props::new(),
        }
    }

    /// Create a raw text element.
    #[must_use]
    pub fn text(value: impl fmt::Display) -> Self {
        Self::host(TEXT_TAG).with_attr(TEXT_ATTR, value.to_string())
    }

    /// Create a component element.
    #[must_use]
    pub fn component(component: Component) -> Self {
        Self {
            kind: ElementKind::Component(component),
            props: Props::new(),
        }
    }

    /// Set a plain attribute.
    #[must_use]
    pub fn with_attr(mut self, name: impl Into<String>, value: impl Into<AttrValue>) -> Self {
        self.props.attrs.insert(name.into(), value.into());
        self
    }

    /// Attach a listener for the given event name.
    #[must_use]
    pub fn on(mut self, event: impl Into<String>, listener: Listener) -> Self {
        self.props.listeners.insert(event.into(), listener);
        self
    }

    /// Append a child. Primitives are auto-wrapped as text elements.
    #[must_use]
    pub fn with_child(mut self, child: impl Into<Self>) -> Self {
        self.props.children.push(child.into());
        self
    }

    /// Append a sequence of children.
    #[must_use]
    pub fn with_children(mut self, children: impl IntoIterator<Item = Self>) -> Self {
        self.props.children.extend(children);
        self
    }

    /// This element's kind.
    #[must_use]
    pub fn kind(&self) -> &ElementKind {
        &self.kind
    }

    /// This element's props.
    #[must_use]
    pub fn props(&self) -> &Props {
        &self.props
    }
}

impl From<&str> for Element {
    fn from(value: &str) -> Self {
        Self::text(value)
    }
}

impl From<String> for Element {
    fn from(value: String) -> Self {
        Self::text(value)
    }
}

impl From<i64> for Element {
    fn from(value: i64) -> Self {
        Self::text(value)
    }
}

impl From<f64> for Element {
    fn from(value: f64) -> Self {
        Self::text(value)
    }
}

impl From<bool> for Element {
    fn from(value: bool) -> Self {
        Self::text(value)
    }
}
