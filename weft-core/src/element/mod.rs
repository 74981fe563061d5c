//! Virtual Tree
//!
//! An [`Element`] is an immutable description of one node of the desired UI:
//! a type, a bag of props, and an ordered list of child elements. A whole
//! render is described by a single root element.
//!
//! Elements are cheap, transient values. A render call consumes its element
//! tree; the reconciler moves the props and children into fibers as it goes,
//! so nothing of the virtual tree survives the pass that diffed it.
//!
//! # Text
//!
//! Raw text is not a separate child kind. Strings and numbers passed as
//! children are normalized into text elements at construction time: an
//! element of type [`ElementType::Text`] whose `nodeValue` prop holds the
//! text. This keeps the reconciler working on a single uniform node shape.

mod json;
mod props;

pub use json::ElementError;
pub use props::{EventHandler, PropValue, Props};

pub(crate) use props::format_number;

use std::fmt;

use tracing::warn;

/// Prop holding the content of a text element.
pub const NODE_VALUE: &str = "nodeValue";

/// Reserved prop name; children are never stored in the prop bag.
pub const CHILDREN: &str = "children";

/// The type of an element.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ElementType {
    /// A host element identified by its tag, e.g. `div`.
    Host(String),

    /// A text node.
    Text,
}

impl ElementType {
    /// Create a host element type.
    pub fn host(tag: impl Into<String>) -> Self {
        ElementType::Host(tag.into())
    }

    /// The host tag, or `None` for text.
    pub fn tag(&self) -> Option<&str> {
        match self {
            ElementType::Host(tag) => Some(tag),
            ElementType::Text => None,
        }
    }

    pub fn is_text(&self) -> bool {
        matches!(self, ElementType::Text)
    }
}

impl fmt::Display for ElementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ElementType::Host(tag) => f.write_str(tag),
            ElementType::Text => f.write_str("#text"),
        }
    }
}

impl From<&str> for ElementType {
    fn from(tag: &str) -> Self {
        ElementType::Host(tag.to_string())
    }
}

impl From<String> for ElementType {
    fn from(tag: String) -> Self {
        ElementType::Host(tag)
    }
}

/// A node of the virtual tree.
#[derive(Debug, Clone, PartialEq)]
pub struct Element {
    ty: ElementType,
    props: Props,
    children: Vec<Element>,
}

impl Element {
    /// Create an element with no props and no children.
    pub fn new(ty: impl Into<ElementType>) -> Self {
        Self {
            ty: ty.into(),
            props: Props::new(),
            children: Vec::new(),
        }
    }

    /// Create a text element.
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            ty: ElementType::Text,
            props: Props::new().with(NODE_VALUE, text.into()),
            children: Vec::new(),
        }
    }

    /// Builder-style prop insert.
    pub fn with_prop(mut self, key: impl Into<String>, value: impl Into<PropValue>) -> Self {
        let key = key.into();
        if key == CHILDREN {
            warn!("ignoring reserved `children` prop on <{}>", self.ty);
            return self;
        }
        self.props.insert(key, value);
        self
    }

    /// Builder-style child append.
    pub fn with_child(mut self, child: impl Into<Element>) -> Self {
        self.children.push(child.into());
        self
    }

    pub fn element_type(&self) -> &ElementType {
        &self.ty
    }

    pub fn props(&self) -> &Props {
        &self.props
    }

    pub fn children(&self) -> &[Element] {
        &self.children
    }

    /// The content of a text element.
    pub fn text_content(&self) -> Option<String> {
        if self.ty.is_text() {
            self.props.get(NODE_VALUE).map(ToString::to_string)
        } else {
            None
        }
    }

    /// Number of elements in this subtree, including `self`.
    pub fn subtree_len(&self) -> usize {
        1 + self.children.iter().map(Element::subtree_len).sum::<usize>()
    }

    pub(crate) fn into_parts(self) -> (ElementType, Props, Vec<Element>) {
        (self.ty, self.props, self.children)
    }
}

impl From<&str> for Element {
    fn from(text: &str) -> Self {
        Element::text(text)
    }
}

impl From<String> for Element {
    fn from(text: String) -> Self {
        Element::text(text)
    }
}

impl From<i64> for Element {
    fn from(value: i64) -> Self {
        Element::text(value.to_string())
    }
}

impl From<i32> for Element {
    fn from(value: i32) -> Self {
        Element::text(value.to_string())
    }
}

impl From<f64> for Element {
    fn from(value: f64) -> Self {
        Element::text(format_number(value))
    }
}

/// Build an element from a type, props and children.
///
/// A `children` entry in `props` is dropped; the `children` argument is the
/// only source of children.
///
/// ```rust
/// use weft_core::element::{create_element, Element, Props};
///
/// let tree = create_element(
///     "div",
///     Props::new().with("id", "app"),
///     vec![
///         create_element("h2", Props::new(), vec![Element::from("hello "), "world".into()]),
///     ],
/// );
/// assert_eq!(tree.subtree_len(), 4);
/// ```
pub fn create_element(
    ty: impl Into<ElementType>,
    mut props: Props,
    children: impl IntoIterator<Item = Element>,
) -> Element {
    let ty = ty.into();
    if props.remove(CHILDREN).is_some() {
        warn!("ignoring reserved `children` prop on <{}>", ty);
    }
    Element {
        ty,
        props,
        children: children.into_iter().collect(),
    }
}

/// Build a text element.
pub fn create_text_element(text: impl Into<String>) -> Element {
    Element::text(text)
}
