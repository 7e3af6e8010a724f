// src/observer.rs
//! Views derived from many items that react to changes they did not make.

use crate::binding::{BindingContext, Component};
use crate::bus::{Channel, ChangeEvent, EventBus, SubscriptionId};
use crate::dom::{Document, NodeId};
use crate::state_cell::decode_flag;
use log::{debug, warn};
use std::cell::{Cell, RefCell};
use std::rc::Rc;

pub const CALENDAR_LISTENED_CLASS: &str = "Calendar__day__episode--listened";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UnlistenedSummary {
    pub count: usize,
    pub duration_secs: u64,
}

impl UnlistenedSummary {
    /// Folds `(listened, duration)` pairs.
    pub fn from_items(items: impl IntoIterator<Item = (bool, u64)>) -> Self {
        items.into_iter().filter(|(listened, _)| !listened).fold(
            Self::default(),
            |acc, (_, duration)| Self {
                count: acc.count + 1,
                duration_secs: acc.duration_secs.saturating_add(duration),
            },
        )
    }
}

/// `"1h 30m "` style; zero components are left out, so zero seconds is `""`.
pub fn human_duration(secs: u64) -> String {
    let hours = secs / 3600;
    let minutes = (secs - hours * 3600) / 60;
    let mut out = String::new();
    if hours > 0 {
        out.push_str(&format!("{}h ", hours));
    }
    if minutes > 0 {
        out.push_str(&format!("{}m ", minutes));
    }
    out
}

// =================================== Unlisted stats ==========================================

/// Keeps the "unlistened episodes" and "unlistened time" counters of a podcast page in
/// sync with the episode rows under it.
pub struct UnlistenedStats {
    root: NodeId,
    document: Rc<RefCell<Document>>,
    bus: Rc<EventBus>,
    subscription: Cell<Option<SubscriptionId>>,
}

impl UnlistenedStats {
    pub const IDENTIFIER: &'static str = "podcast";

    pub fn new(root: NodeId, ctx: &BindingContext) -> Self {
        Self { root, document: ctx.document.clone(), bus: ctx.bus.clone(), subscription: Cell::new(None) }
    }

    /// Full recomputation from the live episode targets. The event only matters for
    /// logging.
    pub fn on_items_changed(&self, event: Option<&ChangeEvent>) -> UnlistenedSummary {
        recompute_stats(&self.document, self.root, event)
    }

    pub fn summary(&self) -> UnlistenedSummary {
        scan_episodes(&self.document.borrow(), self.root)
    }
}

fn scan_episodes(doc: &Document, root: NodeId) -> UnlistenedSummary {
    let items = doc
        .targets(root, UnlistenedStats::IDENTIFIER, "episode")
        .into_iter()
        .filter_map(|id| doc.get(id))
        .map(|el| {
            let listened = decode_flag(el.data("episode", "listened"));
            let duration = match el.attr("data-duration").map(str::parse::<u64>) {
                Some(Ok(secs)) => secs,
                Some(Err(e)) => {
                    warn!("UnlistenedStats: bad data-duration on {:?}: {}", el.data("episode", "id"), e);
                    0
                }
                None => 0,
            };
            (listened, duration)
        });
    UnlistenedSummary::from_items(items.collect::<Vec<_>>())
}

fn recompute_stats(
    document: &RefCell<Document>,
    root: NodeId,
    event: Option<&ChangeEvent>,
) -> UnlistenedSummary {
    let mut doc = document.borrow_mut();
    let summary = scan_episodes(&doc, root);
    debug!(
        "UnlistenedStats: recomputed after {:?}: {} unlistened, {}s",
        event.map(|e| e.item_id.as_str()),
        summary.count,
        summary.duration_secs
    );

    let identifier = UnlistenedStats::IDENTIFIER;
    if let Some(el) = doc.target(root, identifier, "unlistenedEpisodes").and_then(|id| doc.get_mut(id)) {
        el.set_text(summary.count.to_string());
    }
    if let Some(el) = doc.target(root, identifier, "unlistenedTime").and_then(|id| doc.get_mut(id)) {
        el.set_text(human_duration(summary.duration_secs));
    }
    summary
}

impl Component for UnlistenedStats {
    fn identifier(&self) -> &'static str {
        Self::IDENTIFIER
    }

    fn root(&self) -> NodeId {
        self.root
    }

    fn attach(&self) {
        if self.subscription.get().is_some() {
            return;
        }
        let (document, root) = (self.document.clone(), self.root);
        let id = self.bus.subscribe(Channel::EpisodeUpdate, move |event| {
            recompute_stats(&document, root, Some(event));
        });
        self.subscription.set(Some(id));
        self.on_items_changed(None);
    }

    fn detach(&self) {
        if let Some(id) = self.subscription.take() {
            self.bus.unsubscribe(id);
        }
    }
}

// ===================================== Calendar ==============================================

/// Highlights the calendar cell of an episode when it becomes listened.
pub struct CalendarHighlighter {
    root: NodeId,
    document: Rc<RefCell<Document>>,
    bus: Rc<EventBus>,
    subscription: Cell<Option<SubscriptionId>>,
}

impl CalendarHighlighter {
    pub const IDENTIFIER: &'static str = "calendar";

    pub fn new(root: NodeId, ctx: &BindingContext) -> Self {
        Self { root, document: ctx.document.clone(), bus: ctx.bus.clone(), subscription: Cell::new(None) }
    }

    /// Returns whether a cell matched. No match is not an error: the calendar only
    /// shows a few months.
    pub fn on_items_changed(&self, event: &ChangeEvent) -> bool {
        highlight(&self.document, self.root, event)
    }
}

fn highlight(document: &RefCell<Document>, root: NodeId, event: &ChangeEvent) -> bool {
    let mut doc = document.borrow_mut();
    let cell = doc.targets(root, CalendarHighlighter::IDENTIFIER, "episode").into_iter().find(|id| {
        doc.get(*id).and_then(|el| el.attr("data-id")) == Some(event.item_id.as_str())
    });
    match cell.and_then(|id| doc.get_mut(id)) {
        Some(el) => {
            el.toggle_class(CALENDAR_LISTENED_CLASS, event.new_state);
            true
        }
        None => {
            debug!("CalendarHighlighter: no cell for episode {}", event.item_id);
            false
        }
    }
}

impl Component for CalendarHighlighter {
    fn identifier(&self) -> &'static str {
        Self::IDENTIFIER
    }

    fn root(&self) -> NodeId {
        self.root
    }

    fn attach(&self) {
        if self.subscription.get().is_some() {
            return;
        }
        let (document, root) = (self.document.clone(), self.root);
        let id = self.bus.subscribe(Channel::EpisodeUpdate, move |event| {
            highlight(&document, root, event);
        });
        self.subscription.set(Some(id));
    }

    fn detach(&self) {
        if let Some(id) = self.subscription.take() {
            self.bus.unsubscribe(id);
        }
    }
}
