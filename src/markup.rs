// src/markup.rs
//! Server-rendered page data and its initial markup.
//!
//! Every togglable item is rendered with its id and state as inert `data-*` attributes.
//! Components read them once when they attach.

use crate::calendar::{CalendarMonth, months_around};
use crate::dom::{Document, Element, NodeId};
use crate::errors::MarkupError;
use crate::observer::{CALENDAR_LISTENED_CLASS, UnlistenedSummary, human_duration};
use crate::podcast::{Episode, Podcast};
use crate::state_cell::encode_flag;
use crate::toggle::ToggleKind;
use log::info;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarSpec {
    pub year: i32,
    pub month: u32,
    #[serde(default)]
    pub offset: i32,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PageSnapshot {
    #[serde(default)]
    pub podcast: Option<Podcast>,
    #[serde(default)]
    pub episodes: Vec<Episode>,
    #[serde(default)]
    pub calendar: Option<CalendarSpec>,
}

impl PageSnapshot {
    pub fn from_json(json: &str) -> Result<Self, MarkupError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, MarkupError> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let snapshot = Self::from_json(&content)?;
        info!(
            "PageSnapshot: loaded {} episode(s) from {}",
            snapshot.episodes.len(),
            path.as_ref().display()
        );
        Ok(snapshot)
    }
}

pub fn render_page(snapshot: &PageSnapshot) -> Result<Document, MarkupError> {
    let mut doc = Document::new();
    let body = doc.root();

    if let Some(podcast) = &snapshot.podcast {
        render_subscription(&mut doc, body, podcast);
    }
    if !snapshot.episodes.is_empty() {
        render_episode_list(&mut doc, body, &snapshot.episodes);
    }
    if let Some(spec) = snapshot.calendar {
        let months = months_around(spec.year, spec.month, spec.offset)?;
        render_calendar(&mut doc, body, &months, &snapshot.episodes);
    }
    Ok(doc)
}

/// Form + button + check triple shared by both toggle kinds.
fn render_toggle_controls(doc: &mut Document, root: NodeId, kind: ToggleKind, active: bool) {
    let identifier = kind.identifier();
    let form = doc.append(
        root,
        Element::new("form")
            .with_attr(&format!("data-{}-target", identifier), "form")
            .with_attr("data-action", kind.next_action(active).to_string()),
    );
    doc.append(
        form,
        Element::new("button")
            .with_attr(&format!("data-{}-target", identifier), "button")
            .with_text(kind.label(active)),
    );
    doc.append(
        root,
        Element::new("span")
            .with_class("check")
            .with_attr(&format!("data-{}-target", identifier), "check")
            .with_text("✓")
            .with_display(if active { "inline-block" } else { "none" }),
    );
}

fn render_subscription(doc: &mut Document, body: NodeId, podcast: &Podcast) {
    let kind = ToggleKind::Subscription;
    let section = doc.append(
        body,
        Element::new("section")
            .with_class("podcast")
            .with_attr("data-controller", kind.identifier())
            .with_attr("data-subscription-podcast-id", podcast.collection_id().as_str())
            .with_attr("data-subscription-subscribed", encode_flag(podcast.subscribed())),
    );
    doc.append(section, Element::new("h1").with_text(podcast.name()));
    render_toggle_controls(doc, section, kind, podcast.subscribed());
}

fn render_episode_list(doc: &mut Document, body: NodeId, episodes: &[Episode]) {
    let summary = UnlistenedSummary::from_items(episodes.iter().map(|e| (e.listened(), e.duration())));
    let main = doc.append(body, Element::new("main").with_attr("data-controller", "podcast"));

    let stats = doc.append(main, Element::new("p").with_class("stats"));
    doc.append(
        stats,
        Element::new("span")
            .with_attr("data-podcast-target", "unlistenedEpisodes")
            .with_text(summary.count.to_string()),
    );
    doc.append(
        stats,
        Element::new("span")
            .with_attr("data-podcast-target", "unlistenedTime")
            .with_text(human_duration(summary.duration_secs)),
    );

    let list = doc.append(main, Element::new("ul").with_class("episodes"));
    for episode in episodes {
        let kind = ToggleKind::Listen;
        let mut row = Element::new("li")
            .with_class("episode")
            .with_attr("data-controller", kind.identifier())
            .with_attr("data-podcast-target", "episode")
            .with_attr("data-episode-id", episode.id().as_str())
            .with_attr("data-episode-listened", encode_flag(episode.listened()))
            .with_attr("data-duration", episode.duration().to_string());
        if episode.listened() {
            row = row.with_class("episode--listened");
        }
        let row = doc.append(list, row);
        doc.append(
            row,
            Element::new("span")
                .with_class("episode__title")
                .with_attr("data-published", episode.published_on().format("%d %b %Y").to_string())
                .with_text(episode.title()),
        );
        render_toggle_controls(doc, row, kind, episode.listened());
    }
}

fn render_calendar(doc: &mut Document, body: NodeId, months: &[CalendarMonth], episodes: &[Episode]) {
    let calendar = doc.append(
        body,
        Element::new("div").with_class("Calendar").with_attr("data-controller", "calendar"),
    );
    for month in months {
        let month_el = doc.append(
            calendar,
            Element::new("div")
                .with_class("Calendar__month")
                .with_attr("data-start-day", month.start_day.to_string())
                .with_text(month.name.as_str()),
        );
        for day in &month.days {
            let day_el = doc.append(
                month_el,
                Element::new("div")
                    .with_class("Calendar__day")
                    .with_attr("data-date", day.format("%Y-%m-%d").to_string()),
            );
            for episode in episodes.iter().filter(|e| e.published_on().date_naive() == *day) {
                let mut cell = Element::new("a")
                    .with_class("Calendar__day__episode")
                    .with_attr("data-calendar-target", "episode")
                    .with_attr("data-id", episode.id().as_str())
                    .with_text(episode.title());
                if episode.listened() {
                    cell = cell.with_class(CALENDAR_LISTENED_CLASS);
                }
                doc.append(day_el, cell);
            }
        }
    }
}
