use crate::model::InventoryEntry;
use crate::ui::app::{App, AppState};
use humansize::{BINARY, format_size};
use ratatui::{
    prelude::*,
    widgets::{Block, Borders, Clear, List, ListItem, Paragraph, Wrap},
};
use std::fmt::Write as _;
use std::sync::atomic::Ordering;

pub fn render_header(f: &mut Frame, app: &App, area: Rect) {
    let (apps, folders) = app.counts();
    let status = if app.loading { "Loading..." } else { "Ready" };
    let stats = app.icons.stats();
    let (_, memory_bytes) = app.icons.memory_usage();
    let disk_bytes = app.icon_disk_bytes.load(Ordering::Relaxed);

    let header_text = format!(
        "Launchdeck v{} | {apps} apps, {folders} folders | {status} | Icons: {} hits, {} misses ({:.0}%), {} in memory, {} on disk",
        env!("CARGO_PKG_VERSION"),
        stats.hits,
        stats.misses,
        stats.hit_rate() * 100.0,
        format_size(memory_bytes, BINARY),
        format_size(disk_bytes, BINARY)
    );

    let title = Paragraph::new(header_text).block(Block::default().borders(Borders::ALL));
    f.render_widget(title, area);
}

fn entry_line(entry: &InventoryEntry) -> String {
    match entry {
        InventoryEntry::App(app) => format!("  {:<32} {}", app.name, app.category.label()),
        InventoryEntry::Folder(folder) => format!(
            "▸ {:<32} {} ({} apps)",
            folder.name,
            folder.category.label(),
            folder.apps.len()
        ),
    }
}

pub fn render_entries(f: &mut Frame, app: &mut App, area: Rect) {
    let visible = app.visible();
    let items: Vec<ListItem> = visible
        .iter()
        .map(|entry| ListItem::new(entry_line(entry)))
        .collect();

    let title = match &app.open_folder {
        Some(folder) => format!("{} (Esc to go back)", folder.name),
        None => format!(
            "{} | Page {}/{}",
            app.filter.label(),
            app.page + 1,
            app.page_count()
        ),
    };

    let list = List::new(items)
        .block(Block::default().borders(Borders::ALL).title(title))
        .highlight_style(
            Style::default()
                .add_modifier(Modifier::BOLD)
                .fg(Color::Yellow),
        )
        .highlight_symbol("> ");
    f.render_stateful_widget(list, area, &mut app.list_state);
}

pub fn render_details(f: &mut Frame, app: &App, area: Rect) {
    let Some(entry) = app.selected() else {
        f.render_widget(
            Block::default().borders(Borders::ALL).title("Details"),
            area,
        );
        return;
    };

    let mut details_text = format!("Category: {}\n", entry.category().label());
    if let Some(path) = entry.path() {
        let _ = writeln!(details_text, "Path: {}", path.display());
    }
    match &entry {
        InventoryEntry::App(item) => {
            if !item.identifier.is_empty() {
                let _ = writeln!(details_text, "Identifier: {}", item.identifier);
            }
            // Loading happens on the warm-up thread; drawing only peeks.
            if let Some(path) = &item.path {
                let icon = app
                    .icons
                    .cached(path)
                    .map_or_else(|| "not loaded".to_string(), |i| format_size(i.cost(), BINARY));
                let _ = writeln!(details_text, "Icon: {icon}");
            }
        }
        InventoryEntry::Folder(folder) => {
            let _ = writeln!(details_text, "\n{} apps:", folder.apps.len());
            for item in &folder.apps {
                let _ = writeln!(details_text, " - {}", item.name);
            }
        }
    }

    let details = Paragraph::new(details_text)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(format!("Details: {}", entry.name())),
        )
        .wrap(Wrap { trim: false });
    f.render_widget(details, area);
}

pub fn render_footer(f: &mut Frame, app: &App, area: Rect) {
    let footer_text = match app.state {
        AppState::Searching => format!("Search: {}_ | [Enter/Esc] Done", app.query),
        _ if !app.query.is_empty() => format!(
            "Filter: \"{}\" | [/] Edit [Enter] Open [Tab] Category [r] Refresh [R] Rescan [q] Quit",
            app.query
        ),
        _ => "[Enter] Open [/] Search [Tab] Category [n/p] Page [r] Refresh [R] Rescan [q] Quit"
            .to_string(),
    };

    let footer = Paragraph::new(footer_text).block(Block::default().borders(Borders::ALL));
    f.render_widget(footer, area);
}

pub fn render_popup(f: &mut Frame, app: &App) {
    if let AppState::Message(ref msg) = app.state {
        let block = Block::default().title("Launch Failed").borders(Borders::ALL);
        let area = centered_rect(60, 20, f.area());
        f.render_widget(Clear, area);
        f.render_widget(
            Paragraph::new(msg.clone())
                .block(block)
                .wrap(Wrap { trim: true }),
            area,
        );
    }
}

fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}
