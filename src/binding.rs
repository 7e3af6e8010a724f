// src/binding.rs
//! Attribute-driven wiring between the element tree and the components.
//!
//! Elements name their components in `data-controller`; the binder builds one component
//! per (element, identifier) pair and attaches it. Components find their own targets
//! through `data-<identifier>-target` attributes.

use crate::api::PersistenceApi;
use crate::bus::{ChangeEvent, EventBus};
use crate::dom::{Document, NodeId};
use crate::errors::ToggleError;
use crate::observer::{CalendarHighlighter, UnlistenedStats};
use crate::podcast::ItemId;
use crate::toggle::{ToggleController, ToggleKind, Trigger};
use log::{debug, warn};
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;
use std::sync::Arc;

/// Attach/detach lifecycle shared by every component.
pub trait Component {
    fn identifier(&self) -> &'static str;

    /// Element carrying the `data-controller` declaration.
    fn root(&self) -> NodeId;

    /// Starts reacting: renders or recomputes once and subscribes to what it needs.
    fn attach(&self);

    /// Stops reacting. Calling it twice is harmless.
    fn detach(&self);
}

/// What components need from the page: the element tree, the bus and the API.
#[derive(Clone)]
pub struct BindingContext {
    pub document: Rc<RefCell<Document>>,
    pub bus: Rc<EventBus>,
    pub api: Arc<dyn PersistenceApi>,
}

impl BindingContext {
    pub fn new(document: Document, api: Arc<dyn PersistenceApi>) -> Self {
        Self { document: Rc::new(RefCell::new(document)), bus: Rc::new(EventBus::new()), api }
    }
}

/// `event->identifier#method`, the value of a form's `data-action`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionDescriptor {
    pub event: Option<String>,
    pub identifier: String,
    pub method: String,
}

impl ActionDescriptor {
    pub fn new(event: &str, identifier: &str, method: &str) -> Self {
        Self {
            event: Some(event.to_string()),
            identifier: identifier.to_string(),
            method: method.to_string(),
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        let (event, target) = match raw.split_once("->") {
            Some((event, target)) => (Some(event.trim().to_string()), target.trim()),
            None => (None, raw),
        };
        let (identifier, method) = target.split_once('#')?;
        if identifier.is_empty() || method.is_empty() {
            return None;
        }
        Some(Self { event, identifier: identifier.to_string(), method: method.to_string() })
    }

    pub fn with_method(mut self, method: impl Into<String>) -> Self {
        self.method = method.into();
        self
    }
}

impl fmt::Display for ActionDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(event) = &self.event {
            write!(f, "{}->", event)?;
        }
        write!(f, "{}#{}", self.identifier, self.method)
    }
}

pub struct Binder;

impl Binder {
    /// Builds and attaches every component declared in the document. Elements whose
    /// markup is incomplete are skipped with a warning.
    pub fn bind(ctx: &BindingContext) -> Page {
        let mut page = Page { ctx: ctx.clone(), toggles: Vec::new(), observers: Vec::new() };

        let stats = ctx.document.borrow().controller_elements(UnlistenedStats::IDENTIFIER);
        for root in stats {
            page.observers.push(Rc::new(UnlistenedStats::new(root, ctx)));
        }
        let calendars = ctx.document.borrow().controller_elements(CalendarHighlighter::IDENTIFIER);
        for root in calendars {
            page.observers.push(Rc::new(CalendarHighlighter::new(root, ctx)));
        }

        for kind in [ToggleKind::Listen, ToggleKind::Subscription] {
            let roots = ctx.document.borrow().controller_elements(kind.identifier());
            for root in roots {
                match ToggleController::new(kind, root, ctx) {
                    Ok(controller) => page.toggles.push(Rc::new(controller)),
                    Err(e) => warn!("Binder: skipping {} controller: {}", kind.identifier(), e),
                }
            }
        }

        // Toggles render first; observers read the state attributes they write
        for toggle in &page.toggles {
            toggle.attach();
        }
        for observer in &page.observers {
            observer.attach();
        }
        debug!("Binder: {} toggle(s), {} observer(s) attached", page.toggles.len(), page.observers.len());
        page
    }
}

/// Components attached to one document.
pub struct Page {
    ctx: BindingContext,
    toggles: Vec<Rc<ToggleController>>,
    observers: Vec<Rc<dyn Component>>,
}

impl Page {
    pub fn context(&self) -> &BindingContext {
        &self.ctx
    }

    pub fn toggles(&self) -> &[Rc<ToggleController>] {
        &self.toggles
    }

    pub fn observers(&self) -> &[Rc<dyn Component>] {
        &self.observers
    }

    pub fn toggle(&self, kind: ToggleKind, id: &ItemId) -> Option<Rc<ToggleController>> {
        self.toggles.iter().find(|t| t.kind() == kind && t.item_id() == id).cloned()
    }

    /// The page's single subscription form, if it has one.
    pub fn subscription(&self) -> Option<Rc<ToggleController>> {
        self.toggles.iter().find(|t| t.kind() == ToggleKind::Subscription).cloned()
    }

    /// Runs the next action of the item's toggle, as a click on its button would.
    pub async fn trigger(&self, kind: ToggleKind, id: &ItemId) -> Option<Result<ChangeEvent, ToggleError>> {
        let controller = self.toggle(kind, id)?;
        Some(controller.perform(&mut Trigger::new()).await)
    }

    /// Removes `root` from the document and detaches every component bound inside it.
    pub fn remove_element(&mut self, root: NodeId) {
        self.ctx.document.borrow_mut().remove(root);
        let doc = self.ctx.document.borrow();
        self.toggles.retain(|t| {
            let keep = doc.is_connected(t.root());
            if !keep {
                t.detach();
            }
            keep
        });
        self.observers.retain(|o| {
            let keep = doc.is_connected(o.root());
            if !keep {
                o.detach();
            }
            keep
        });
    }

    pub fn detach_all(&mut self) {
        for toggle in self.toggles.drain(..) {
            toggle.detach();
        }
        for observer in self.observers.drain(..) {
            observer.detach();
        }
    }
}

impl Drop for Page {
    fn drop(&mut self) {
        self.detach_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn action_descriptor_parses_and_prints() {
        let action = ActionDescriptor::parse("submit->episode#listen").unwrap();
        assert_eq!(action, ActionDescriptor::new("submit", "episode", "listen"));
        assert_eq!(action.with_method("unlisten").to_string(), "submit->episode#unlisten");

        let bare = ActionDescriptor::parse("subscription#subscribe").unwrap();
        assert_eq!(bare.event, None);
        assert_eq!(bare.to_string(), "subscription#subscribe");

        assert_eq!(ActionDescriptor::parse("submit->episode"), None);
        assert_eq!(ActionDescriptor::parse("#listen"), None);
    }
}
