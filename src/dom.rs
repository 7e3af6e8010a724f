// src/dom.rs
//! A small element tree standing in for the rendered page.
//!
//! Elements carry attributes, a class list, text and a display style. Nodes are
//! addressed by [`NodeId`]; removed subtrees keep their slots but are no longer
//! reachable from the root.

use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Element {
    tag: String,
    attributes: BTreeMap<String, String>,
    classes: BTreeSet<String>,
    text: String,
    display: Option<String>,
}

impl Element {
    pub fn new(tag: &str) -> Self {
        Self { tag: tag.to_string(), ..Default::default() }
    }

    pub fn with_attr(mut self, name: &str, value: impl Into<String>) -> Self {
        self.attributes.insert(name.to_string(), value.into());
        self
    }

    pub fn with_class(mut self, class: &str) -> Self {
        self.classes.insert(class.to_string());
        self
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    pub fn with_display(mut self, display: &str) -> Self {
        self.display = Some(display.to_string());
        self
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    pub fn set_attr(&mut self, name: &str, value: impl Into<String>) {
        self.attributes.insert(name.to_string(), value.into());
    }

    /// `data-<identifier>-<key>`, the per-controller data map.
    pub fn data(&self, identifier: &str, key: &str) -> Option<&str> {
        self.attr(&data_attr(identifier, key))
    }

    pub fn set_data(&mut self, identifier: &str, key: &str, value: impl Into<String>) {
        self.set_attr(&data_attr(identifier, key), value);
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.classes.contains(class)
    }

    pub fn classes(&self) -> impl Iterator<Item = &str> {
        self.classes.iter().map(String::as_str)
    }

    pub fn toggle_class(&mut self, class: &str, on: bool) {
        if on {
            self.classes.insert(class.to_string());
        } else {
            self.classes.remove(class);
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn set_text(&mut self, text: impl Into<String>) {
        self.text = text.into();
    }

    pub fn display(&self) -> Option<&str> {
        self.display.as_deref()
    }

    pub fn set_display(&mut self, display: &str) {
        self.display = Some(display.to_string());
    }

    pub fn is_hidden(&self) -> bool {
        self.display.as_deref() == Some("none")
    }

    /// Whether `data-<identifier>-target` lists `name`.
    pub fn is_target(&self, identifier: &str, name: &str) -> bool {
        self.data(identifier, "target")
            .is_some_and(|targets| targets.split_whitespace().any(|t| t == name))
    }

    /// Controller identifiers from the `data-controller` attribute.
    pub fn controllers(&self) -> Vec<&str> {
        self.attr("data-controller").map(|c| c.split_whitespace().collect()).unwrap_or_default()
    }
}

pub fn data_attr(identifier: &str, key: &str) -> String {
    format!("data-{}-{}", identifier, key)
}

#[derive(Debug, Clone)]
struct Node {
    element: Element,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

#[derive(Debug, Clone)]
pub struct Document {
    nodes: Vec<Node>,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    pub fn new() -> Self {
        Self { nodes: vec![Node { element: Element::new("body"), parent: None, children: vec![] }] }
    }

    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    /// Appends `element` as the last child of `parent`.
    pub fn append(&mut self, parent: NodeId, element: Element) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node { element, parent: Some(parent), children: vec![] });
        if let Some(node) = self.nodes.get_mut(parent.0) {
            node.children.push(id);
        }
        id
    }

    /// Unlinks `id` (and its subtree) from its parent.
    pub fn remove(&mut self, id: NodeId) {
        let Some(parent) = self.nodes.get(id.0).and_then(|n| n.parent) else {
            return;
        };
        if let Some(node) = self.nodes.get_mut(parent.0) {
            node.children.retain(|c| *c != id);
        }
        if let Some(node) = self.nodes.get_mut(id.0) {
            node.parent = None;
        }
    }

    /// Whether `id` is still reachable from the root.
    pub fn is_connected(&self, id: NodeId) -> bool {
        let mut current = Some(id);
        while let Some(node_id) = current {
            if node_id == self.root() {
                return true;
            }
            current = self.nodes.get(node_id.0).and_then(|n| n.parent);
        }
        false
    }

    pub fn get(&self, id: NodeId) -> Option<&Element> {
        self.nodes.get(id.0).map(|n| &n.element)
    }

    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut Element> {
        self.nodes.get_mut(id.0).map(|n| &mut n.element)
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.nodes.get(id.0).map(|n| n.children.as_slice()).unwrap_or(&[])
    }

    /// Descendants of `scope` in document order, `scope` itself excluded.
    pub fn descendants(&self, scope: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self.children(scope).iter().rev().copied().collect();
        while let Some(id) = stack.pop() {
            out.push(id);
            stack.extend(self.children(id).iter().rev().copied());
        }
        out
    }

    /// All `data-<identifier>-target` elements named `name` under `scope`.
    pub fn targets(&self, scope: NodeId, identifier: &str, name: &str) -> Vec<NodeId> {
        self.descendants(scope)
            .into_iter()
            .filter(|id| self.get(*id).is_some_and(|el| el.is_target(identifier, name)))
            .collect()
    }

    pub fn target(&self, scope: NodeId, identifier: &str, name: &str) -> Option<NodeId> {
        self.targets(scope, identifier, name).into_iter().next()
    }

    /// Connected elements that declare `identifier` in `data-controller`, root included.
    pub fn controller_elements(&self, identifier: &str) -> Vec<NodeId> {
        std::iter::once(self.root())
            .chain(self.descendants(self.root()))
            .filter(|id| self.get(*id).is_some_and(|el| el.controllers().iter().any(|c| *c == identifier)))
            .collect()
    }
}
