use crate::binding::Page;
use crate::bus::ChangeEvent;
use crate::dom::{Document, NodeId};
use crate::errors::ToggleError;
use crate::observer::CALENDAR_LISTENED_CLASS;
use crate::podcast::ItemId;
use crate::toggle::{ToggleController, ToggleKind, Trigger};
use anyhow::Result;
use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEventKind},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use log::debug;
use ratatui::{Terminal, backend::Backend};
use std::io;
use std::rc::Rc;

// What the UI shows for one episode row, read back from the element tree
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EpisodeRow {
    pub id: ItemId,
    pub title: String,
    pub published: String,
    pub label: String,
    pub listened: bool,
    pub check_visible: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscriptionRow {
    pub name: String,
    pub label: String,
    pub check_visible: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CalendarEntry {
    pub date: String,
    pub title: String,
    pub listened: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CalendarMonthView {
    pub name: String,
    pub entries: Vec<CalendarEntry>,
}

pub struct App {
    pub should_quit: bool,
    pub page: Page,
    pub selected_episode_index: Option<usize>,
    pub status: String,
}

impl App {
    pub fn new(page: Page) -> App {
        let mut app = App {
            should_quit: false,
            page,
            selected_episode_index: None,
            status: "↑/↓ select · Enter listen/unlisten · s subscribe · q quit".to_string(),
        };
        app.select_initial_items();
        app
    }

    pub fn select_initial_items(&mut self) {
        self.selected_episode_index = if self.episode_toggles().is_empty() { None } else { Some(0) };
    }

    fn episode_toggles(&self) -> Vec<Rc<ToggleController>> {
        self.page.toggles().iter().filter(|t| t.kind() == ToggleKind::Listen).cloned().collect()
    }

    // ==================================== Scrolling EPISODEs =====================================
    pub fn select_next_episode(&mut self) {
        let len = self.episode_toggles().len();
        if len == 0 {
            self.selected_episode_index = None;
            return;
        }
        self.selected_episode_index = Some(self.selected_episode_index.map_or(0, |i| (i + 1) % len));
    }

    pub fn select_prev_episode(&mut self) {
        let len = self.episode_toggles().len();
        if len == 0 {
            self.selected_episode_index = None;
            return;
        }
        self.selected_episode_index =
            Some(self.selected_episode_index.map_or(len - 1, |i| (i + len - 1) % len));
    }

    pub fn selected_episode(&self) -> Option<Rc<ToggleController>> {
        self.selected_episode_index.and_then(|i| self.episode_toggles().get(i).cloned())
    }

    // ======================================= Actions =============================================
    pub async fn toggle_selected_episode(&mut self) {
        let Some(controller) = self.selected_episode() else {
            return;
        };
        let result = controller.perform(&mut Trigger::new()).await;
        self.report(ToggleKind::Listen, result);
    }

    pub async fn toggle_subscription(&mut self) {
        let Some(controller) = self.page.subscription() else {
            self.status = "This page has no podcast to subscribe to".to_string();
            return;
        };
        let result = controller.perform(&mut Trigger::new()).await;
        self.report(ToggleKind::Subscription, result);
    }

    fn report(&mut self, kind: ToggleKind, result: Result<ChangeEvent, ToggleError>) {
        self.status = match result {
            Ok(event) => {
                let verb = match (kind, event.new_state) {
                    (ToggleKind::Listen, true) => "Listened",
                    (ToggleKind::Listen, false) => "Unlistened",
                    (ToggleKind::Subscription, true) => "Subscribed",
                    (ToggleKind::Subscription, false) => "Unsubscribed",
                };
                format!("{} {}", verb, event.item_id)
            }
            Err(e) => format!("Failed: {}", e),
        };
    }

    // --- Key Handler ---
    pub async fn on_key(&mut self, key: KeyCode) {
        match key {
            KeyCode::Char('q') => self.should_quit = true,
            KeyCode::Down | KeyCode::Char('j') => self.select_next_episode(),
            KeyCode::Up | KeyCode::Char('k') => self.select_prev_episode(),
            KeyCode::Enter | KeyCode::Char(' ') | KeyCode::Char('l') => {
                self.toggle_selected_episode().await
            }
            KeyCode::Char('s') => self.toggle_subscription().await,
            _ => {}
        }
    }

    // ================================ Reading the element tree ===================================
    pub fn episode_rows(&self) -> Vec<EpisodeRow> {
        let doc = self.page.context().document.borrow();
        self.episode_toggles()
            .iter()
            .map(|t| {
                let root = t.root();
                let (title, published) = first_with_class(&doc, root, "episode__title")
                    .map(|el| (el.text().to_string(), el.attr("data-published").unwrap_or("").to_string()))
                    .unwrap_or_default();
                let (label, check_visible) = controls(&doc, root, "episode");
                EpisodeRow {
                    id: t.item_id().clone(),
                    title,
                    published,
                    label,
                    listened: doc.get(root).is_some_and(|el| el.has_class("episode--listened")),
                    check_visible,
                }
            })
            .collect()
    }

    pub fn subscription_row(&self) -> Option<SubscriptionRow> {
        let controller = self.page.subscription()?;
        let doc = self.page.context().document.borrow();
        let root = controller.root();
        let name = doc
            .children(root)
            .iter()
            .filter_map(|id| doc.get(*id))
            .find(|el| el.tag() == "h1")
            .map(|el| el.text().to_string())
            .unwrap_or_default();
        let (label, check_visible) = controls(&doc, root, "subscription");
        Some(SubscriptionRow { name, label, check_visible })
    }

    /// `(unlistened episodes, unlistened time)` as rendered by the stats observer.
    pub fn stats_text(&self) -> Option<(String, String)> {
        let doc = self.page.context().document.borrow();
        let main = *doc.controller_elements("podcast").first()?;
        let text = |name: &str| {
            doc.target(main, "podcast", name)
                .and_then(|id| doc.get(id))
                .map(|el| el.text().to_string())
                .unwrap_or_default()
        };
        Some((text("unlistenedEpisodes"), text("unlistenedTime")))
    }

    pub fn calendar_months(&self) -> Vec<CalendarMonthView> {
        let doc = self.page.context().document.borrow();
        let Some(calendar) = doc.controller_elements("calendar").first().copied() else {
            return Vec::new();
        };
        doc.children(calendar)
            .iter()
            .filter_map(|month| {
                let month_el = doc.get(*month)?;
                let entries = doc
                    .children(*month)
                    .iter()
                    .flat_map(|day| {
                        let date = doc.get(*day).and_then(|d| d.attr("data-date")).unwrap_or("").to_string();
                        doc.children(*day)
                            .iter()
                            .filter_map(|cell| doc.get(*cell))
                            .map(move |cell| CalendarEntry {
                                date: date.clone(),
                                title: cell.text().to_string(),
                                listened: cell.has_class(CALENDAR_LISTENED_CLASS),
                            })
                            .collect::<Vec<_>>()
                    })
                    .collect();
                Some(CalendarMonthView { name: month_el.text().to_string(), entries })
            })
            .collect()
    }
}

fn first_with_class<'a>(doc: &'a Document, root: NodeId, class: &str) -> Option<&'a crate::dom::Element> {
    doc.descendants(root).into_iter().filter_map(|id| doc.get(id)).find(|el| el.has_class(class))
}

// (button label, check visible)
fn controls(doc: &Document, root: NodeId, identifier: &str) -> (String, bool) {
    let label = doc
        .target(root, identifier, "button")
        .and_then(|id| doc.get(id))
        .map(|el| el.text().to_string())
        .unwrap_or_default();
    let check_visible = doc
        .target(root, identifier, "check")
        .and_then(|id| doc.get(id))
        .is_some_and(|el| !el.is_hidden());
    (label, check_visible)
}

pub async fn start_ui(app: App) -> Result<()> {
    // Set up the terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = ratatui::backend::CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let mut app = app;
    let res = run_app_loop(&mut terminal, &mut app).await;

    // Restore the terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen, DisableMouseCapture)?;
    terminal.show_cursor()?;

    app.page.detach_all();
    res
}

pub async fn run_app_loop<B: Backend>(terminal: &mut Terminal<B>, app: &mut App) -> Result<()> {
    while !app.should_quit {
        terminal.draw(|f| crate::ui::ui(f, app))?;

        if event::poll(std::time::Duration::from_millis(100))? {
            if let Event::Key(key_event) = event::read()? {
                if key_event.kind == KeyEventKind::Press {
                    debug!("run_app_loop: key {:?}", key_event.code);
                    app.on_key(key_event.code).await;
                }
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{ApiResponse, FakePersistenceApi, FakeReply};
    use crate::binding::{Binder, BindingContext};
    use crate::markup::{PageSnapshot, render_page};
    use std::sync::Arc;

    const PAGE: &str = r#"{
        "podcast": {"collection_id": 99, "name": "Rust Daily News", "subscribed": false},
        "episodes": [
            {"id": 1, "title": "First", "duration": 1200, "published_on": "2020-05-04T08:00:00Z", "listened": true},
            {"id": 2, "title": "Second", "duration": 3600, "published_on": "2020-05-11T08:00:00Z"}
        ],
        "calendar": {"year": 2020, "month": 5, "offset": 0}
    }"#;

    fn app_with(fake: FakePersistenceApi) -> App {
        let doc = render_page(&PageSnapshot::from_json(PAGE).unwrap()).unwrap();
        let ctx = BindingContext::new(doc, Arc::new(fake));
        App::new(Binder::bind(&ctx))
    }

    #[test]
    fn selection_wraps_around() {
        let mut app = app_with(FakePersistenceApi::new());
        assert_eq!(app.selected_episode_index, Some(0));

        app.select_prev_episode();
        assert_eq!(app.selected_episode_index, Some(1));
        app.select_next_episode();
        assert_eq!(app.selected_episode_index, Some(0));
    }

    #[tokio::test]
    async fn enter_listens_and_every_view_follows() {
        let mut app = app_with(FakePersistenceApi::new());
        app.on_key(KeyCode::Down).await;
        assert_eq!(app.stats_text(), Some(("1".to_string(), "1h ".to_string())));

        app.on_key(KeyCode::Enter).await;

        let row = &app.episode_rows()[1];
        assert!(row.listened);
        assert!(row.check_visible);
        assert_eq!(row.label, "Unlisten");
        assert_eq!(app.stats_text(), Some(("0".to_string(), String::new())));
        let calendar = app.calendar_months();
        assert!(calendar[0].entries.iter().all(|e| e.listened));
        assert_eq!(app.status, "Listened 2");
    }

    #[tokio::test]
    async fn failed_subscribe_reports_in_status_line() {
        let mut app = app_with(FakePersistenceApi::replying(vec![FakeReply::Body(
            ApiResponse::failed("already subscribed"),
        )]));

        app.on_key(KeyCode::Char('s')).await;

        let row = app.subscription_row().unwrap();
        assert_eq!(row.name, "Rust Daily News");
        assert_eq!(row.label, "Subscribe");
        assert!(!row.check_visible);
        assert_eq!(app.status, "Failed: API rejected the request: already subscribed");
    }
}
