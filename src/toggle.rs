// src/toggle.rs
//! Toggle controllers: one per episode row or podcast subscription form.
//!
//! A controller owns the [`StateCell`] of a single item. Every action goes through the
//! persistence API first; only a confirmed success writes the cell, re-renders the
//! controller's own elements and publishes a [`ChangeEvent`]. Any failure leaves the
//! cell, the markup and the bus untouched.

use crate::api::PersistenceApi;
use crate::binding::{ActionDescriptor, BindingContext, Component};
use crate::bus::{Channel, ChangeEvent, EventBus};
use crate::dom::{Document, NodeId};
use crate::errors::{BindingError, ToggleError};
use crate::podcast::ItemId;
use crate::state_cell::{StateCell, encode_flag};
use log::{debug, error, info};
use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ToggleKind {
    /// Episode listened / unlistened.
    Listen,
    /// Podcast subscribed / unsubscribed.
    Subscription,
}

impl ToggleKind {
    pub fn identifier(&self) -> &'static str {
        match self {
            ToggleKind::Listen => "episode",
            ToggleKind::Subscription => "subscription",
        }
    }

    pub fn id_key(&self) -> &'static str {
        match self {
            ToggleKind::Listen => "id",
            ToggleKind::Subscription => "podcast-id",
        }
    }

    pub fn state_key(&self) -> &'static str {
        match self {
            ToggleKind::Listen => "listened",
            ToggleKind::Subscription => "subscribed",
        }
    }

    /// Button label for the current state; it names the action the button performs next.
    pub fn label(&self, active: bool) -> &'static str {
        match (self, active) {
            (ToggleKind::Listen, true) => "Unlisten",
            (ToggleKind::Listen, false) => "Listen",
            (ToggleKind::Subscription, true) => "Unsubscribe",
            (ToggleKind::Subscription, false) => "Subscribe",
        }
    }

    pub fn activate_method(&self) -> &'static str {
        match self {
            ToggleKind::Listen => "listen",
            ToggleKind::Subscription => "subscribe",
        }
    }

    pub fn deactivate_method(&self) -> &'static str {
        match self {
            ToggleKind::Listen => "unlisten",
            ToggleKind::Subscription => "unsubscribe",
        }
    }

    pub fn active_class(&self) -> Option<&'static str> {
        match self {
            ToggleKind::Listen => Some("episode--listened"),
            ToggleKind::Subscription => None,
        }
    }

    pub fn channel(&self) -> Channel {
        match self {
            ToggleKind::Listen => Channel::EpisodeUpdate,
            ToggleKind::Subscription => Channel::SubscriptionUpdate,
        }
    }

    pub fn from_identifier(identifier: &str) -> Option<Self> {
        match identifier {
            "episode" => Some(ToggleKind::Listen),
            "subscription" => Some(ToggleKind::Subscription),
            _ => None,
        }
    }

    /// The action the form triggers while the item is in state `active`.
    pub fn next_action(&self, active: bool) -> ActionDescriptor {
        let method = if active { self.deactivate_method() } else { self.activate_method() };
        ActionDescriptor::new("submit", self.identifier(), method)
    }
}

/// The user interaction that started an action (a form submission).
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Trigger {
    default_prevented: bool,
}

impl Trigger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn prevent_default(&mut self) {
        self.default_prevented = true;
    }

    pub fn default_prevented(&self) -> bool {
        self.default_prevented
    }
}

struct Targets {
    form: NodeId,
    button: NodeId,
    check: NodeId,
}

pub struct ToggleController {
    kind: ToggleKind,
    item_id: ItemId,
    root: NodeId,
    targets: Targets,
    cell: StateCell,
    document: Rc<RefCell<Document>>,
    bus: Rc<EventBus>,
    api: Arc<dyn PersistenceApi>,
    // Ticket of the most recently issued request
    latest_ticket: Cell<u64>,
    // Ticket of the newest request the server confirmed and the cell reflects
    confirmed_ticket: Cell<u64>,
    attached: Cell<bool>,
}

impl ToggleController {
    /// Reads the item id, the initial state and the targets from the markup under
    /// `root`. The state attribute is read here and never again.
    pub fn new(kind: ToggleKind, root: NodeId, ctx: &BindingContext) -> Result<Self, BindingError> {
        let identifier = kind.identifier();
        let (item_id, cell, targets) = {
            let doc = ctx.document.borrow();
            let element = doc.get(root).ok_or(BindingError::Detached)?;
            let item_id = element
                .data(identifier, kind.id_key())
                .filter(|id| !id.is_empty())
                .map(ItemId::new)
                .ok_or(BindingError::MissingData { identifier, key: kind.id_key() })?;
            let cell = StateCell::from_markup(element.data(identifier, kind.state_key()));
            let find = |target: &'static str| {
                doc.target(root, identifier, target)
                    .ok_or(BindingError::MissingTarget { identifier, target })
            };
            let targets = Targets { form: find("form")?, button: find("button")?, check: find("check")? };
            (item_id, cell, targets)
        };

        Ok(Self {
            kind,
            item_id,
            root,
            targets,
            cell,
            document: ctx.document.clone(),
            bus: ctx.bus.clone(),
            api: ctx.api.clone(),
            latest_ticket: Cell::new(0),
            confirmed_ticket: Cell::new(0),
            attached: Cell::new(false),
        })
    }

    pub fn kind(&self) -> ToggleKind {
        self.kind
    }

    pub fn item_id(&self) -> &ItemId {
        &self.item_id
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn is_active(&self) -> bool {
        self.cell.read()
    }

    pub fn is_attached(&self) -> bool {
        self.attached.get()
    }

    pub async fn activate(&self, trigger: &mut Trigger) -> Result<ChangeEvent, ToggleError> {
        self.transition(trigger, true).await
    }

    pub async fn deactivate(&self, trigger: &mut Trigger) -> Result<ChangeEvent, ToggleError> {
        self.transition(trigger, false).await
    }

    /// Runs whichever action the form currently points at.
    pub async fn perform(&self, trigger: &mut Trigger) -> Result<ChangeEvent, ToggleError> {
        let raw = self
            .document
            .borrow()
            .get(self.targets.form)
            .and_then(|form| form.attr("data-action").map(str::to_string))
            .unwrap_or_default();
        let action = ActionDescriptor::parse(&raw)
            .filter(|a| ToggleKind::from_identifier(&a.identifier) == Some(self.kind))
            .ok_or_else(|| ToggleError::UnknownAction(raw.clone()))?;

        if action.method == self.kind.activate_method() {
            self.activate(trigger).await
        } else if action.method == self.kind.deactivate_method() {
            self.deactivate(trigger).await
        } else {
            Err(ToggleError::UnknownAction(raw))
        }
    }

    async fn transition(
        &self,
        trigger: &mut Trigger,
        target: bool,
    ) -> Result<ChangeEvent, ToggleError> {
        trigger.prevent_default();
        let ticket = self.latest_ticket.get() + 1;
        self.latest_ticket.set(ticket);
        debug!(
            "ToggleController: {} {} -> {} (request #{})",
            self.kind.identifier(),
            self.item_id,
            target,
            ticket
        );

        let result = if target {
            self.api.set_active(self.kind, &self.item_id).await
        } else {
            self.api.set_inactive(self.kind, &self.item_id).await
        };

        let outcome = result.and_then(|response| match response.error_detail() {
            Some(detail) => Err(ToggleError::Rejected(detail)),
            None => Ok(()),
        });
        if let Err(e) = outcome {
            error!(
                "ToggleController: {} {} -> {} failed: {}",
                self.kind.identifier(),
                self.item_id,
                target,
                e
            );
            return Err(e);
        }

        // Only a newer confirmed request makes this one stale; a newer request that
        // failed decided nothing.
        let confirmed = self.confirmed_ticket.get();
        if ticket < confirmed {
            debug!("ToggleController: discarding stale response #{} (confirmed #{})", ticket, confirmed);
            return Err(ToggleError::Superseded { ticket, latest: confirmed });
        }
        if !self.attached.get() {
            debug!("ToggleController: {} {} detached, dropping response", self.kind.identifier(), self.item_id);
            return Err(ToggleError::Detached);
        }

        self.confirmed_ticket.set(ticket);
        self.cell.write(target);
        self.render();

        let event = ChangeEvent { item_id: self.item_id.clone(), new_state: target };
        self.bus.publish(self.kind.channel(), &event);
        info!("ToggleController: {} {} is now {}", self.kind.identifier(), self.item_id, target);
        Ok(event)
    }

    /// Brings the controller's elements in line with the cell. Idempotent.
    pub fn render(&self) {
        let active = self.cell.read();
        let kind = self.kind;
        let mut doc = self.document.borrow_mut();

        if let Some(root) = doc.get_mut(self.root) {
            if let Some(class) = kind.active_class() {
                root.toggle_class(class, active);
            }
            root.set_data(kind.identifier(), kind.state_key(), encode_flag(active));
        }
        if let Some(button) = doc.get_mut(self.targets.button) {
            button.set_text(kind.label(active));
        }
        if let Some(form) = doc.get_mut(self.targets.form) {
            let action = match form.attr("data-action").and_then(ActionDescriptor::parse) {
                Some(current) => current.with_method(kind.next_action(active).method),
                None => kind.next_action(active),
            };
            form.set_attr("data-action", action.to_string());
        }
        if let Some(check) = doc.get_mut(self.targets.check) {
            check.set_display(if active { "inline-block" } else { "none" });
        }
    }
}

impl Component for ToggleController {
    fn identifier(&self) -> &'static str {
        self.kind.identifier()
    }

    fn root(&self) -> NodeId {
        self.root
    }

    fn attach(&self) {
        self.attached.set(true);
        self.render();
    }

    fn detach(&self) {
        self.attached.set(false);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{ApiResponse, FakePersistenceApi, FakeReply};
    use crate::dom::Element;
    use std::time::Duration;

    struct Fixture {
        ctx: BindingContext,
        fake: Arc<FakePersistenceApi>,
        events: Rc<RefCell<Vec<ChangeEvent>>>,
    }

    fn fixture(fake: FakePersistenceApi) -> Fixture {
        let fake = Arc::new(fake);
        let ctx = BindingContext::new(Document::new(), fake.clone());
        let events = Rc::new(RefCell::new(Vec::new()));
        for channel in [Channel::EpisodeUpdate, Channel::SubscriptionUpdate] {
            let sink = events.clone();
            ctx.bus.subscribe(channel, move |e| sink.borrow_mut().push(e.clone()));
        }
        Fixture { ctx, fake, events }
    }

    fn episode_row(ctx: &BindingContext, id: &str, listened: bool) -> NodeId {
        let mut doc = ctx.document.borrow_mut();
        let root = doc.root();
        let row = doc.append(
            root,
            Element::new("li")
                .with_attr("data-controller", "episode")
                .with_attr("data-episode-id", id)
                .with_attr("data-episode-listened", encode_flag(listened)),
        );
        let form = doc.append(
            row,
            Element::new("form")
                .with_attr("data-episode-target", "form")
                .with_attr("data-action", "submit->episode#listen"),
        );
        doc.append(form, Element::new("button").with_attr("data-episode-target", "button"));
        doc.append(row, Element::new("span").with_attr("data-episode-target", "check"));
        row
    }

    fn subscription_form(ctx: &BindingContext, id: &str) -> NodeId {
        let mut doc = ctx.document.borrow_mut();
        let root = doc.root();
        let section = doc.append(
            root,
            Element::new("section")
                .with_attr("data-controller", "subscription")
                .with_attr("data-subscription-podcast-id", id)
                .with_attr("data-subscription-subscribed", "false"),
        );
        let form = doc.append(section, Element::new("form").with_attr("data-subscription-target", "form"));
        doc.append(form, Element::new("button").with_attr("data-subscription-target", "button"));
        doc.append(section, Element::new("span").with_attr("data-subscription-target", "check"));
        section
    }

    fn attached(kind: ToggleKind, root: NodeId, ctx: &BindingContext) -> ToggleController {
        let controller = ToggleController::new(kind, root, ctx).unwrap();
        controller.attach();
        controller
    }

    fn snapshot(ctx: &BindingContext) -> Vec<Element> {
        let doc = ctx.document.borrow();
        doc.descendants(doc.root()).into_iter().filter_map(|id| doc.get(id).cloned()).collect()
    }

    fn button_text(ctx: &BindingContext, controller: &ToggleController) -> String {
        let doc = ctx.document.borrow();
        doc.get(controller.targets.button).map(|b| b.text().to_string()).unwrap_or_default()
    }

    #[test]
    fn render_is_idempotent() {
        let f = fixture(FakePersistenceApi::new());
        for listened in [false, true] {
            let row = episode_row(&f.ctx, if listened { "2" } else { "1" }, listened);
            let controller = attached(ToggleKind::Listen, row, &f.ctx);

            let first = snapshot(&f.ctx);
            controller.render();
            assert_eq!(first, snapshot(&f.ctx));
        }
    }

    #[test]
    fn attach_renders_initial_state() {
        let f = fixture(FakePersistenceApi::new());
        let row = episode_row(&f.ctx, "5", true);
        let controller = attached(ToggleKind::Listen, row, &f.ctx);

        let doc = f.ctx.document.borrow();
        assert!(controller.is_active());
        assert!(doc.get(row).unwrap().has_class("episode--listened"));
        assert_eq!(doc.get(controller.targets.button).unwrap().text(), "Unlisten");
        assert_eq!(doc.get(controller.targets.check).unwrap().display(), Some("inline-block"));
        assert_eq!(
            doc.get(controller.targets.form).unwrap().attr("data-action"),
            Some("submit->episode#unlisten")
        );
    }

    #[tokio::test]
    async fn successful_activation_writes_renders_and_emits_once() {
        let f = fixture(FakePersistenceApi::new());
        let row = episode_row(&f.ctx, "7", false);
        let controller = attached(ToggleKind::Listen, row, &f.ctx);
        let mut trigger = Trigger::new();

        let event = controller.activate(&mut trigger).await.unwrap();

        assert!(trigger.default_prevented());
        assert_eq!(event, ChangeEvent { item_id: ItemId::new("7"), new_state: true });
        assert!(controller.is_active());
        assert_eq!(*f.events.borrow(), vec![event]);
        assert_eq!(button_text(&f.ctx, &controller), "Unlisten");
        let doc = f.ctx.document.borrow();
        assert_eq!(doc.get(row).unwrap().data("episode", "listened"), Some("true"));
    }

    #[tokio::test]
    async fn application_error_fails_closed() {
        let f = fixture(FakePersistenceApi::replying(vec![FakeReply::Body(ApiResponse::failed(
            "no such episode",
        ))]));
        let row = episode_row(&f.ctx, "7", false);
        let controller = attached(ToggleKind::Listen, row, &f.ctx);
        let before = snapshot(&f.ctx);

        let result = controller.activate(&mut Trigger::new()).await;

        assert!(matches!(result, Err(ToggleError::Rejected(ref d)) if d == "no such episode"));
        assert!(!controller.is_active());
        assert!(f.events.borrow().is_empty());
        assert_eq!(before, snapshot(&f.ctx));
    }

    #[tokio::test]
    async fn transport_failure_fails_closed() {
        let f = fixture(FakePersistenceApi::replying(vec![FakeReply::TransportFailure(
            "connection reset".to_string(),
        )]));
        let row = episode_row(&f.ctx, "7", true);
        let controller = attached(ToggleKind::Listen, row, &f.ctx);
        let before = snapshot(&f.ctx);

        let err = controller.deactivate(&mut Trigger::new()).await.unwrap_err();

        assert!(err.is_transport());
        assert!(controller.is_active());
        assert!(f.events.borrow().is_empty());
        assert_eq!(before, snapshot(&f.ctx));
    }

    #[tokio::test]
    async fn perform_alternates_between_actions() {
        let f = fixture(FakePersistenceApi::new());
        let row = episode_row(&f.ctx, "3", false);
        let controller = attached(ToggleKind::Listen, row, &f.ctx);

        controller.perform(&mut Trigger::new()).await.unwrap();
        controller.perform(&mut Trigger::new()).await.unwrap();
        controller.perform(&mut Trigger::new()).await.unwrap();

        let actives: Vec<bool> = f.fake.calls().iter().map(|c| c.active).collect();
        assert_eq!(actives, vec![true, false, true]);
        let states: Vec<bool> = f.events.borrow().iter().map(|e| e.new_state).collect();
        assert_eq!(states, vec![true, false, true]);
    }

    #[tokio::test]
    async fn rejected_subscribe_keeps_label() {
        let f = fixture(FakePersistenceApi::replying(vec![FakeReply::Body(ApiResponse::failed(
            "already subscribed",
        ))]));
        let section = subscription_form(&f.ctx, "1234");
        let controller = attached(ToggleKind::Subscription, section, &f.ctx);
        assert_eq!(button_text(&f.ctx, &controller), "Subscribe");

        let result = controller.perform(&mut Trigger::new()).await;

        assert!(matches!(result, Err(ToggleError::Rejected(_))));
        assert!(!controller.is_active());
        assert_eq!(button_text(&f.ctx, &controller), "Subscribe");
        assert_eq!(f.fake.calls()[0].kind, ToggleKind::Subscription);
    }

    #[tokio::test]
    async fn stale_response_is_discarded() {
        let fake = FakePersistenceApi::new();
        fake.push_reply(FakeReply::Body(ApiResponse::ok()), Duration::from_millis(60));
        fake.push_reply(FakeReply::Body(ApiResponse::ok()), Duration::from_millis(5));
        let f = fixture(fake);
        let row = episode_row(&f.ctx, "11", false);
        let controller = attached(ToggleKind::Listen, row, &f.ctx);

        let (mut first, mut second) = (Trigger::new(), Trigger::new());
        let (slow, fast) =
            futures::join!(controller.activate(&mut first), controller.deactivate(&mut second));

        assert!(matches!(slow, Err(ToggleError::Superseded { ticket: 1, latest: 2 })));
        assert!(!fast.unwrap().new_state);
        assert!(!controller.is_active());
        assert_eq!(f.events.borrow().len(), 1);
    }

    #[tokio::test]
    async fn older_success_applies_when_newer_request_fails() {
        let fake = FakePersistenceApi::new();
        fake.push_reply(FakeReply::Body(ApiResponse::ok()), Duration::from_millis(60));
        fake.push_reply(FakeReply::Body(ApiResponse::failed("boom")), Duration::from_millis(5));
        let f = fixture(fake);
        let row = episode_row(&f.ctx, "12", false);
        let controller = attached(ToggleKind::Listen, row, &f.ctx);

        let (mut first, mut second) = (Trigger::new(), Trigger::new());
        let (slow, fast) =
            futures::join!(controller.activate(&mut first), controller.deactivate(&mut second));

        assert!(matches!(fast, Err(ToggleError::Rejected(ref d)) if d == "boom"));
        assert!(slow.unwrap().new_state);
        assert!(controller.is_active());
        assert_eq!(*f.events.borrow(), vec![ChangeEvent { item_id: ItemId::new("12"), new_state: true }]);
        let doc = f.ctx.document.borrow();
        assert_eq!(doc.get(row).unwrap().data("episode", "listened"), Some("true"));
    }

    #[tokio::test]
    async fn detached_controller_drops_late_response() {
        let fake = FakePersistenceApi::new();
        fake.push_reply(FakeReply::Body(ApiResponse::ok()), Duration::from_millis(20));
        let f = fixture(fake);
        let row = episode_row(&f.ctx, "4", false);
        let controller = attached(ToggleKind::Listen, row, &f.ctx);

        let mut trigger = Trigger::new();
        let (result, ()) = futures::join!(controller.activate(&mut trigger), async {
            controller.detach();
        });

        assert!(matches!(result, Err(ToggleError::Detached)));
        assert!(!controller.is_active());
        assert!(f.events.borrow().is_empty());
    }

    #[test]
    fn missing_targets_refuse_to_bind() {
        let f = fixture(FakePersistenceApi::new());
        let root = {
            let mut doc = f.ctx.document.borrow_mut();
            let body = doc.root();
            doc.append(body, Element::new("li").with_attr("data-episode-id", "1"))
        };

        let err = ToggleController::new(ToggleKind::Listen, root, &f.ctx).err();
        assert_eq!(err, Some(BindingError::MissingTarget { identifier: "episode", target: "form" }));
    }
}
