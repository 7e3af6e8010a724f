// src/ui.rs
use crate::app::App;
use ratatui::{
    Frame,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, Paragraph, Wrap},
};
use std::rc::Rc;
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

pub struct LayoutChunks {
    pub header_chunk: Rect,
    pub episodes_chunk: Rect,
    pub calendar_chunk: Rect,
    pub stats_chunk: Rect,
    pub hint_chunk: Rect,
}

pub fn compute_layout(frame_size: Rect) -> LayoutChunks {
    let main_chunks: Rc<[Rect]> = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Podcast + subscription
            Constraint::Min(0),    // Episodes | Calendar
            Constraint::Length(3), // Unlistened stats
            Constraint::Length(1), // Status / hints
        ])
        .split(frame_size);

    let content_columns: Rc<[Rect]> = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
        .split(main_chunks[1]);

    LayoutChunks {
        header_chunk: main_chunks[0],
        episodes_chunk: content_columns[0],
        calendar_chunk: content_columns[1],
        stats_chunk: main_chunks[2],
        hint_chunk: main_chunks[3],
    }
}

/// Cuts `text` to at most `width` terminal columns, marking the cut with `…`.
pub fn fit_width(text: &str, width: usize) -> String {
    if text.width() <= width {
        return text.to_string();
    }
    let mut out = String::new();
    let mut used = 0;
    for ch in text.chars() {
        let w = ch.width().unwrap_or(0);
        if used + w + 1 > width {
            break;
        }
        out.push(ch);
        used += w;
    }
    out.push('…');
    out
}

pub fn ui(f: &mut Frame, app: &App) {
    let layout_chunks: LayoutChunks = compute_layout(f.size());

    let default_style: Style = Style::default().fg(Color::White);
    let listened_style: Style = Style::default().fg(Color::Green);
    let selected_item_style: Style = Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD);

    // ================================= Podcast header ============================================
    let header_text: Line = match app.subscription_row() {
        Some(row) => Line::from(vec![
            Span::styled(row.name, default_style.add_modifier(Modifier::BOLD)),
            Span::raw("  "),
            Span::styled(format!("[{}]", row.label), Style::default().fg(Color::Cyan)),
            Span::styled(if row.check_visible { " ✓" } else { "" }, listened_style),
        ]),
        None => Line::from("No podcast on this page"),
    };
    let header_widget = Paragraph::new(header_text)
        .block(Block::default().title("Podcast").borders(Borders::ALL));
    f.render_widget(header_widget, layout_chunks.header_chunk);

    // ================================== Episodes (Left) ==========================================
    let title_width = (layout_chunks.episodes_chunk.width as usize).saturating_sub(30);
    let episode_items: Vec<ListItem> = app
        .episode_rows()
        .into_iter()
        .enumerate()
        .map(|(i, row)| {
            let style = if Some(i) == app.selected_episode_index {
                selected_item_style
            } else if row.listened {
                listened_style
            } else {
                default_style
            };
            let line = format!(
                "{:<width$} {:>11} [{}]{}",
                fit_width(&row.title, title_width),
                row.published,
                row.label,
                if row.check_visible { " ✓" } else { "" },
                width = title_width
            );
            ListItem::new(line).style(style)
        })
        .collect();
    let episodes_widget = List::new(episode_items)
        .block(Block::default().title("Episodes").borders(Borders::ALL));
    f.render_widget(episodes_widget, layout_chunks.episodes_chunk);

    // ================================== Calendar (Right) =========================================
    let mut calendar_lines: Vec<Line> = Vec::new();
    for month in app.calendar_months() {
        calendar_lines.push(Line::styled(month.name, default_style.add_modifier(Modifier::BOLD)));
        if month.entries.is_empty() {
            calendar_lines.push(Line::styled("  no episodes", Style::default().fg(Color::DarkGray)));
        }
        for entry in month.entries {
            let style = if entry.listened { listened_style } else { default_style };
            calendar_lines.push(Line::styled(format!("  {} {}", entry.date, entry.title), style));
        }
    }
    let calendar_widget = Paragraph::new(calendar_lines)
        .wrap(Wrap { trim: true })
        .block(Block::default().title("Calendar").borders(Borders::ALL));
    f.render_widget(calendar_widget, layout_chunks.calendar_chunk);

    // =================================== Stats (Bottom) ==========================================
    let stats_text: String = match app.stats_text() {
        Some((count, time)) if time.is_empty() => format!("{} unlistened", count),
        Some((count, time)) => format!("{} unlistened · {}left", count, time),
        None => String::new(),
    };
    let stats_widget = Paragraph::new(stats_text)
        .block(Block::default().title("Unlistened").borders(Borders::ALL));
    f.render_widget(stats_widget, layout_chunks.stats_chunk);

    // =============================== Status / hint bar ===========================================
    let hint_widget: Paragraph = Paragraph::new(app.status.as_str())
        .style(Style::default().fg(Color::DarkGray))
        .alignment(ratatui::layout::Alignment::Center);
    f.render_widget(hint_widget, layout_chunks.hint_chunk);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fit_width_truncates_by_columns() {
        assert_eq!(fit_width("short", 10), "short");
        assert_eq!(fit_width("a longer title", 8), "a longe…");
        assert_eq!(fit_width("日本語タイトル", 5), "日本…");
    }

    #[test]
    fn layout_splits_content_columns() {
        let chunks = compute_layout(Rect::new(0, 0, 100, 40));
        assert_eq!(chunks.header_chunk.height, 3);
        assert_eq!(chunks.episodes_chunk.width, 60);
        assert_eq!(chunks.calendar_chunk.width, 40);
        assert_eq!(chunks.hint_chunk.height, 1);
    }
}
