pub mod app;
pub mod components;

use crate::ui::app::{App, AppState};
use crate::ui::components::{
    render_details, render_entries, render_footer, render_header, render_popup,
};
use anyhow::Result;
use crossterm::event::{self, Event, KeyCode, KeyEventKind};
use ratatui::prelude::*;
use std::time::Duration;

pub fn ui(f: &mut Frame, app: &mut App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(0),
            Constraint::Length(3),
        ])
        .split(f.area());

    render_header(f, app, chunks[0]);

    let main_chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(55), Constraint::Percentage(45)])
        .split(chunks[1]);

    render_entries(f, app, main_chunks[0]);
    render_details(f, app, main_chunks[1]);

    render_footer(f, app, chunks[2]);
    render_popup(f, app);
}

pub fn run_app(
    terminal: &mut Terminal<CrosstermBackend<std::io::Stderr>>,
    app: &mut App,
) -> Result<()> {
    // The view appearing is what triggers a refresh.
    app.refresh();

    loop {
        app.check_inventory_updates();
        terminal.draw(|f| ui(f, app))?;

        if event::poll(Duration::from_millis(100))?
            && let Event::Key(key) = event::read()?
            && key.kind == KeyEventKind::Press
        {
            match app.state {
                AppState::Browsing => match key.code {
                    KeyCode::Char('q') => return Ok(()),
                    KeyCode::Down | KeyCode::Char('j') => app.next(),
                    KeyCode::Up | KeyCode::Char('k') => app.previous(),
                    KeyCode::Right | KeyCode::Char('n') => app.next_page(),
                    KeyCode::Left | KeyCode::Char('p') => app.previous_page(),
                    KeyCode::Enter => app.activate(),
                    KeyCode::Esc | KeyCode::Backspace => app.leave_folder(),
                    KeyCode::Tab => app.cycle_filter(),
                    KeyCode::Char('/') => app.state = AppState::Searching,
                    KeyCode::Char('r') => app.refresh(),
                    KeyCode::Char('R') => app.force_refresh(),
                    _ => {}
                },
                AppState::Searching => match key.code {
                    KeyCode::Enter | KeyCode::Esc => app.state = AppState::Browsing,
                    KeyCode::Backspace => app.pop_query(),
                    KeyCode::Char(c) => app.push_query(c),
                    _ => {}
                },
                AppState::Message(_) => match key.code {
                    KeyCode::Esc | KeyCode::Enter | KeyCode::Char(' ' | 'q') => {
                        app.state = AppState::Browsing;
                    }
                    _ => {}
                },
            }
        }
    }
}
