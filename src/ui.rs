use anyhow::Result;
use chrono::Local;
use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use noteparse::{
    export, table::format_amount, CellCoercion, Column, Config, DateInference, Dashboard, ExportFormat,
    ParsedTable, TableEdit,
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{BarChart, Block, Borders, Cell, Gauge, Paragraph, Row, Table, TableState},
    Frame, Terminal,
};
use std::io;
use std::path::PathBuf;
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Page {
    Table,
    Dashboard,
}

impl Page {
    pub fn next(&self) -> Self {
        match self {
            Page::Table => Page::Dashboard,
            Page::Dashboard => Page::Table,
        }
    }

    pub fn title(&self) -> &str {
        match self {
            Page::Table => "Editable Table",
            Page::Dashboard => "Expense Dashboard",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mode {
    Normal,
    /// Editing the selected cell; holds the text typed so far
    Editing(String),
}

pub struct App {
    pub table: ParsedTable,
    pub state: TableState,
    pub column: Column,
    pub page: Page,
    pub mode: Mode,
    pub message: Option<String>,
    coercion: CellCoercion,
    dates: DateInference,
    export_dir: PathBuf,
}

impl App {
    pub fn new(table: ParsedTable, config: &Config) -> Self {
        let mut state = TableState::default();
        if !table.is_empty() {
            state.select(Some(0));
        }

        Self {
            table,
            state,
            column: Column::Item,
            page: Page::Table,
            mode: Mode::Normal,
            message: None,
            coercion: config.cell_coercion(),
            dates: config.date_inference(),
            export_dir: config.export_dir.clone(),
        }
    }

    pub fn into_table(self) -> ParsedTable {
        self.table
    }

    pub fn dashboard(&self) -> Dashboard {
        Dashboard::from_table(&self.table, &self.dates)
    }

    pub fn next(&mut self) {
        let len = self.table.len();
        if len == 0 {
            return;
        }
        let i = match self.state.selected() {
            Some(i) if i >= len - 1 => 0,
            Some(i) => i + 1,
            None => 0,
        };
        self.state.select(Some(i));
    }

    pub fn previous(&mut self) {
        let len = self.table.len();
        if len == 0 {
            return;
        }
        let i = match self.state.selected() {
            Some(0) => len - 1,
            Some(i) => i - 1,
            None => 0,
        };
        self.state.select(Some(i));
    }

    pub fn begin_edit(&mut self) {
        if let Some(row) = self.state.selected() {
            let text = self.table.cell_text(row, self.column).unwrap_or_default();
            self.mode = Mode::Editing(text);
        }
    }

    pub fn cancel_edit(&mut self) {
        self.mode = Mode::Normal;
    }

    pub fn commit_edit(&mut self) {
        let Mode::Editing(value) = std::mem::replace(&mut self.mode, Mode::Normal) else {
            return;
        };
        let Some(row) = self.state.selected() else {
            return;
        };
        let edit = TableEdit::SetCell { row, column: self.column, value };
        if let Err(err) = self.table.apply(edit, &self.coercion) {
            warn!(error = %err, "edit rejected");
            self.message = Some(err.to_string());
        }
    }

    /// Blank row below the selection (or at the top of an empty table)
    pub fn insert_row(&mut self) {
        let at = self.state.selected().map(|i| i + 1).unwrap_or(0);
        if self.table.apply(TableEdit::InsertRow { at }, &self.coercion).is_ok() {
            self.state.select(Some(at));
        }
    }

    pub fn delete_row(&mut self) {
        let Some(row) = self.state.selected() else {
            return;
        };
        if self.table.apply(TableEdit::RemoveRow { row }, &self.coercion).is_ok() {
            let len = self.table.len();
            self.state.select(if len == 0 { None } else { Some(row.min(len - 1)) });
        }
    }

    pub fn export(&mut self) {
        let result = export(&self.table, ExportFormat::Xlsx, Local::now().naive_local())
            .map_err(anyhow::Error::from)
            .and_then(|file| Ok(file.write_to(&self.export_dir)?));

        self.message = Some(match result {
            Ok(path) => format!("Saved {}", path.display()),
            Err(err) => {
                warn!(error = %err, "export failed");
                format!("Export failed: {}", err)
            }
        });
    }
}

pub fn run_ui(app: &mut App) -> Result<()> {
    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    // Run the app
    let res = run_app(&mut terminal, app);

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    if let Err(err) = res {
        println!("Error: {:?}", err);
    }

    Ok(())
}

fn run_app<B: ratatui::backend::Backend>(terminal: &mut Terminal<B>, app: &mut App) -> io::Result<()> {
    loop {
        terminal.draw(|f| ui(f, app))?;

        let Event::Key(key) = event::read()? else {
            continue;
        };
        if key.kind != KeyEventKind::Press {
            continue;
        }

        if let Mode::Editing(buffer) = &mut app.mode {
            match key.code {
                KeyCode::Enter => app.commit_edit(),
                KeyCode::Esc => app.cancel_edit(),
                KeyCode::Backspace => {
                    buffer.pop();
                }
                KeyCode::Char(c) => buffer.push(c),
                _ => {}
            }
            continue;
        }

        app.message = None;
        match key.code {
            KeyCode::Char('q') | KeyCode::Esc => return Ok(()),
            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => return Ok(()),
            KeyCode::Tab | KeyCode::BackTab => app.page = app.page.next(),
            KeyCode::Char('x') => app.export(),
            _ if app.page == Page::Dashboard => {}
            KeyCode::Down | KeyCode::Char('j') => app.next(),
            KeyCode::Up | KeyCode::Char('k') => app.previous(),
            KeyCode::Right | KeyCode::Char('l') => app.column = app.column.next(),
            KeyCode::Left | KeyCode::Char('h') => app.column = app.column.previous(),
            KeyCode::Enter | KeyCode::Char('e') => app.begin_edit(),
            KeyCode::Char('a') => app.insert_row(),
            KeyCode::Char('d') | KeyCode::Delete => app.delete_row(),
            _ => {}
        }
    }
}

fn ui(f: &mut Frame, app: &mut App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Header with navigation
            Constraint::Min(0),    // Content area
            Constraint::Length(3), // Status bar
        ])
        .split(f.size());

    render_header(f, chunks[0], app);

    match app.page {
        Page::Table => render_table(f, chunks[1], app),
        Page::Dashboard => render_dashboard(f, chunks[1], app),
    }

    render_status_bar(f, chunks[2], app);
}

fn render_header(f: &mut Frame, area: Rect, app: &App) {
    let mut tab_spans = vec![];
    for (i, page) in [Page::Table, Page::Dashboard].iter().enumerate() {
        if i > 0 {
            tab_spans.push(Span::raw(" │ "));
        }

        let style = if *page == app.page {
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD | Modifier::UNDERLINED)
        } else {
            Style::default().fg(Color::DarkGray)
        };

        tab_spans.push(Span::styled(page.title().to_string(), style));
    }

    let total: f64 = app.table.iter().filter_map(|r| r.amount).sum();
    tab_spans.push(Span::raw("  |  "));
    tab_spans.push(Span::styled(
        format!("Rows: {}", app.table.len()),
        Style::default().fg(Color::White),
    ));
    tab_spans.push(Span::raw("  |  "));
    tab_spans.push(Span::styled(
        format!("Total: {}", format_amount(total)),
        Style::default().fg(Color::Green),
    ));

    let header = Paragraph::new(vec![Line::from(tab_spans)]).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Cyan))
            .title(" NoteParse "),
    );

    f.render_widget(header, area);
}

fn render_table(f: &mut Frame, area: Rect, app: &mut App) {
    let header_cells = Column::ALL.iter().map(|column| {
        let style = if *column == app.column {
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD | Modifier::UNDERLINED)
        } else {
            Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)
        };
        Cell::from(column.name()).style(style)
    });

    let header = Row::new(header_cells)
        .style(Style::default().bg(Color::DarkGray))
        .height(1);

    let selected = app.state.selected();
    let rows = app.table.iter().enumerate().map(|(i, record)| {
        let cells = Column::ALL.iter().map(|column| {
            let editing = match &app.mode {
                Mode::Editing(buffer) if selected == Some(i) && *column == app.column => Some(buffer),
                _ => None,
            };
            match editing {
                Some(buffer) => Cell::from(format!("{}▏", buffer))
                    .style(Style::default().fg(Color::Black).bg(Color::Yellow)),
                None => {
                    let text = noteparse::table::cell_text(record, *column);
                    let style = match column {
                        Column::Amount if record.amount.is_none() => Style::default().fg(Color::Red),
                        Column::Amount => Style::default().fg(Color::Green),
                        _ => Style::default(),
                    };
                    Cell::from(truncate(&text, 40)).style(style)
                }
            }
        });

        Row::new(cells.collect::<Vec<_>>()).height(1)
    });

    let table = Table::new(
        rows,
        [
            Constraint::Length(12),
            Constraint::Length(28),
            Constraint::Length(12),
            Constraint::Min(20),
        ],
    )
    .header(header)
    .block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::White))
            .title(" Parsed Notes "),
    )
    .highlight_style(Style::default().bg(Color::DarkGray).add_modifier(Modifier::BOLD))
    .highlight_symbol("→ ");

    f.render_stateful_widget(table, area, &mut app.state);
}

fn render_dashboard(f: &mut Frame, area: Rect, app: &App) {
    let dashboard = app.dashboard();

    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(55), Constraint::Percentage(45)])
        .split(area);

    // Bar chart values are whole units
    let labels: Vec<String> = dashboard
        .daily_totals
        .iter()
        .map(|d| d.date.format("%d %b").to_string())
        .collect();
    let bars: Vec<(&str, u64)> = labels
        .iter()
        .zip(&dashboard.daily_totals)
        .map(|(label, d)| (label.as_str(), d.total.max(0.0).round() as u64))
        .collect();

    let bar_chart = BarChart::default()
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(" Total Spend per Day "),
        )
        .data(bars.as_slice())
        .bar_width(7)
        .bar_gap(2)
        .bar_style(Style::default().fg(Color::Cyan))
        .value_style(Style::default().fg(Color::Black).bg(Color::Cyan));
    f.render_widget(bar_chart, chunks[0]);

    let shares_block = Block::default().borders(Borders::ALL).title(" Spend by Item ");
    let inner = shares_block.inner(chunks[1]);
    f.render_widget(shares_block, chunks[1]);

    if dashboard.item_shares.is_empty() {
        f.render_widget(Paragraph::new("No amounts to chart"), inner);
        return;
    }

    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints(
            dashboard
                .item_shares
                .iter()
                .map(|_| Constraint::Length(1))
                .chain(std::iter::once(Constraint::Min(0)))
                .collect::<Vec<_>>(),
        )
        .split(inner);

    for (share, row) in dashboard.item_shares.iter().zip(rows.iter()) {
        let gauge = Gauge::default()
            .gauge_style(Style::default().fg(Color::Magenta).bg(Color::Black))
            .ratio(share.share.clamp(0.0, 1.0))
            .label(format!(
                "{} {} ({:.1}%)",
                truncate(&share.item, 20),
                format_amount(share.total),
                share.share * 100.0
            ));
        f.render_widget(gauge, *row);
    }
}

fn render_status_bar(f: &mut Frame, area: Rect, app: &App) {
    let selected = app.state.selected().map(|i| i + 1).unwrap_or(0);

    let mut status_spans = vec![Span::styled(
        format!(" Row: {}/{} ", selected, app.table.len()),
        Style::default().fg(Color::Cyan),
    )];

    if let Some(message) = &app.message {
        status_spans.push(Span::raw(" | "));
        status_spans.push(Span::styled(message.clone(), Style::default().fg(Color::Green)));
    }

    let keys: &[(&str, &str)] = match app.mode {
        Mode::Editing(_) => &[("Enter", "Save"), ("Esc", "Cancel")],
        Mode::Normal => &[
            ("e", "Edit"),
            ("←/→", "Column"),
            ("a", "Add"),
            ("d", "Delete"),
            ("x", "Export"),
            ("Tab", "Page"),
            ("q", "Quit"),
        ],
    };
    for (key, label) in keys {
        status_spans.push(Span::raw(" | "));
        status_spans.push(Span::styled(*key, Style::default().fg(Color::Yellow)));
        status_spans.push(Span::raw(format!(" {}", label)));
    }

    let status_bar = Paragraph::new(vec![Line::from(status_spans)]).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::White)),
    );

    f.render_widget(status_bar, area);
}

fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let head: String = s.chars().take(max_len - 3).collect();
        format!("{}...", head)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn app() -> App {
        let config = Config {
            reference_year: Some(2026),
            ..Config::default()
        };
        let table = config.note_parser().parse("3rd Sept\nVegetables 40\nMilk 25");
        App::new(table, &config)
    }

    #[test]
    fn test_navigation_wraps() {
        let mut app = app();
        assert_eq!(app.state.selected(), Some(0));
        app.previous();
        assert_eq!(app.state.selected(), Some(1));
        app.next();
        assert_eq!(app.state.selected(), Some(0));
    }

    #[test]
    fn test_edit_amount_cell() {
        let mut app = app();
        app.column = Column::Amount;
        app.begin_edit();
        assert_eq!(app.mode, Mode::Editing("40".to_string()));

        app.mode = Mode::Editing("45.5".to_string());
        app.commit_edit();
        assert_eq!(app.mode, Mode::Normal);
        assert_eq!(app.table.records()[0].amount, Some(45.5));
    }

    #[test]
    fn test_cancel_edit_keeps_value() {
        let mut app = app();
        app.begin_edit();
        app.mode = Mode::Editing("Carrots".to_string());
        app.cancel_edit();
        assert_eq!(app.table.records()[0].item, "Vegetables");
    }

    #[test]
    fn test_insert_and_delete_rows() {
        let mut app = app();
        app.insert_row();
        assert_eq!(app.table.len(), 3);
        assert_eq!(app.state.selected(), Some(1));

        app.delete_row();
        app.delete_row();
        app.delete_row();
        assert!(app.table.is_empty());
        assert_eq!(app.state.selected(), None);

        app.insert_row();
        assert_eq!(app.table.len(), 1);
        assert_eq!(app.state.selected(), Some(0));
    }

    #[test]
    fn test_dashboard_follows_edits() {
        let mut app = app();
        assert_eq!(app.dashboard().grand_total, 65.0);
        app.column = Column::Amount;
        app.mode = Mode::Editing("n/a".to_string());
        app.commit_edit();
        assert_eq!(app.dashboard().grand_total, 25.0);
    }

    #[test]
    fn test_truncate_counts_chars() {
        assert_eq!(truncate("Snacks ₹120.50", 40), "Snacks ₹120.50");
        assert_eq!(truncate("₹₹₹₹₹₹₹₹", 6), "₹₹₹...");
    }
}
