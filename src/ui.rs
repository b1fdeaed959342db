use anyhow::Result;
use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ipo_allotment::presenter::COLUMNS;
use ipo_allotment::{
    Access, AllotmentChecker, CheckObserver, IdentifierReport, Ipo, IpoChoice, Level, Notice,
    Notifier, ReportOutcome, RowStyle, Selection,
};
use ratatui::{
    backend::{Backend, CrosstermBackend},
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, List, ListItem, ListState, Paragraph, Row, Table, Wrap},
    Frame, Terminal,
};
use std::io;

const IDENTIFIER_PLACEHOLDER: &str = "ABCDE1234F\nPQRST5678G\n...";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    Locked,
    Unavailable,
    Form,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Focus {
    IncludeAll,
    IpoList,
    Identifiers,
    CheckButton,
}

impl Focus {
    pub fn next(&self) -> Self {
        match self {
            Focus::IncludeAll => Focus::IpoList,
            Focus::IpoList => Focus::Identifiers,
            Focus::Identifiers => Focus::CheckButton,
            Focus::CheckButton => Focus::IncludeAll,
        }
    }

    pub fn previous(&self) -> Self {
        match self {
            Focus::IncludeAll => Focus::CheckButton,
            Focus::IpoList => Focus::IncludeAll,
            Focus::Identifiers => Focus::IpoList,
            Focus::CheckButton => Focus::Identifiers,
        }
    }
}

/// Everything drawn on screen. Lives apart from the checker so a running
/// check can redraw it between lookups.
pub struct View {
    pub screen: Screen,
    pub passcode_input: String,
    pub catalog: Vec<Ipo>,
    pub include_all: bool,
    pub chosen: Vec<bool>,
    pub ipo_state: ListState,
    pub identifiers: String,
    pub focus: Focus,
    pub notices: Vec<Notice>,
    pub reports: Vec<IdentifierReport>,
    pub progress: Option<String>,
    pub results_offset: usize,
}

impl View {
    fn new() -> Self {
        View {
            screen: Screen::Locked,
            passcode_input: String::new(),
            catalog: Vec::new(),
            include_all: false,
            chosen: Vec::new(),
            ipo_state: ListState::default(),
            identifiers: String::new(),
            focus: Focus::IncludeAll,
            notices: Vec::new(),
            reports: Vec::new(),
            progress: None,
            results_offset: 0,
        }
    }

    fn set_catalog(&mut self, catalog: Vec<Ipo>) {
        self.chosen = vec![false; catalog.len()];
        self.ipo_state.select(if catalog.is_empty() { None } else { Some(0) });
        self.catalog = catalog;
    }

    pub fn selection(&self) -> Selection {
        if self.include_all {
            return Selection::All;
        }
        let choices = self
            .catalog
            .iter()
            .zip(&self.chosen)
            .filter(|(_, chosen)| **chosen)
            .map(|(ipo, _)| IpoChoice::of(ipo))
            .collect();
        Selection::Chosen(choices)
    }

    fn next_ipo(&mut self) {
        let len = self.catalog.len();
        if len == 0 {
            return;
        }
        let i = match self.ipo_state.selected() {
            Some(i) if i >= len - 1 => 0,
            Some(i) => i + 1,
            None => 0,
        };
        self.ipo_state.select(Some(i));
    }

    fn previous_ipo(&mut self) {
        let len = self.catalog.len();
        if len == 0 {
            return;
        }
        let i = match self.ipo_state.selected() {
            Some(0) | None => len - 1,
            Some(i) => i - 1,
        };
        self.ipo_state.select(Some(i));
    }

    fn toggle_ipo(&mut self) {
        if self.include_all {
            return;
        }
        if let Some(chosen) = self.ipo_state.selected().and_then(|i| self.chosen.get_mut(i)) {
            *chosen = !*chosen;
        }
    }
}

/// Text input only takes keys without Ctrl or Alt held.
fn is_plain(key: &KeyEvent) -> bool {
    !key.modifiers.intersects(KeyModifiers::CONTROL | KeyModifiers::ALT)
}

pub struct App {
    checker: AllotmentChecker,
    access: Option<Access>,
    pub view: View,
    pub should_quit: bool,
}

impl App {
    pub fn new(checker: AllotmentChecker) -> Self {
        Self {
            checker,
            access: None,
            view: View::new(),
            should_quit: false,
        }
    }

    pub fn handle_key<B: Backend>(&mut self, key: KeyEvent, terminal: &mut Terminal<B>) {
        if key.code == KeyCode::Esc
            || (key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL))
        {
            self.should_quit = true;
            return;
        }

        match self.view.screen {
            Screen::Locked => match key.code {
                KeyCode::Enter => self.submit_passcode(terminal),
                KeyCode::Backspace => {
                    self.view.passcode_input.pop();
                }
                KeyCode::Char(c) if is_plain(&key) => self.view.passcode_input.push(c),
                _ => {}
            },
            Screen::Unavailable => {
                if key.code == KeyCode::Char('r') {
                    self.load_catalog(terminal);
                }
            }
            Screen::Form => self.handle_form_key(key, terminal),
        }
    }

    fn handle_form_key<B: Backend>(&mut self, key: KeyEvent, terminal: &mut Terminal<B>) {
        let submit = key.code == KeyCode::Char('r') && key.modifiers.contains(KeyModifiers::CONTROL)
            || self.view.focus == Focus::CheckButton && matches!(key.code, KeyCode::Char(' ') | KeyCode::Enter);
        if submit {
            self.run_check(terminal);
            return;
        }

        let view = &mut self.view;

        match key.code {
            KeyCode::Tab => view.focus = view.focus.next(),
            KeyCode::BackTab => view.focus = view.focus.previous(),
            KeyCode::PageDown => {
                if view.results_offset + 1 < view.reports.len() {
                    view.results_offset += 1;
                }
            }
            KeyCode::PageUp => view.results_offset = view.results_offset.saturating_sub(1),
            _ => match view.focus {
                Focus::IncludeAll => {
                    if matches!(key.code, KeyCode::Char(' ') | KeyCode::Enter) {
                        view.include_all = !view.include_all;
                    }
                }
                Focus::IpoList => match key.code {
                    KeyCode::Down | KeyCode::Char('j') => view.next_ipo(),
                    KeyCode::Up | KeyCode::Char('k') => view.previous_ipo(),
                    KeyCode::Char(' ') | KeyCode::Enter => view.toggle_ipo(),
                    _ => {}
                },
                Focus::Identifiers => match key.code {
                    KeyCode::Enter => view.identifiers.push('\n'),
                    KeyCode::Backspace => {
                        view.identifiers.pop();
                    }
                    KeyCode::Char(c) if is_plain(&key) => view.identifiers.push(c),
                    _ => {}
                },
                Focus::CheckButton => {}
            },
        }
    }

    fn submit_passcode<B: Backend>(&mut self, terminal: &mut Terminal<B>) {
        let attempt = std::mem::take(&mut self.view.passcode_input);
        match self.checker.unlock(&attempt) {
            Ok(access) => {
                self.access = Some(access);
                self.view.notices.clear();
                self.load_catalog(terminal);
            }
            Err(err) => {
                self.view.notices = vec![Notice::error(err.to_string())];
            }
        }
    }

    fn load_catalog<B: Backend>(&mut self, terminal: &mut Terminal<B>) {
        let Some(access) = self.access else {
            return;
        };
        self.view.notices.clear();

        let mut observer = LiveObserver {
            terminal,
            view: &mut self.view,
        };
        let loaded = self.checker.load_catalog(access, &mut observer);
        self.view.progress = None;

        match loaded {
            Ok(catalog) => {
                self.view.set_catalog(catalog);
                self.view.screen = Screen::Form;
            }
            Err(_) => self.view.screen = Screen::Unavailable,
        }
    }

    /// Same sequence as a form submit: reload the (cached) catalog, then
    /// check every identifier, redrawing after each one.
    fn run_check<B: Backend>(&mut self, terminal: &mut Terminal<B>) {
        let Some(access) = self.access else {
            return;
        };
        let selection = self.view.selection();
        let identifiers = self.view.identifiers.clone();
        self.view.notices.clear();
        self.view.reports.clear();
        self.view.results_offset = 0;

        let mut observer = LiveObserver {
            terminal,
            view: &mut self.view,
        };
        let outcome = match self.checker.load_catalog(access, &mut observer) {
            Ok(catalog) => self
                .checker
                .check(access, &catalog, &selection, &identifiers, &mut observer),
            Err(err) => Err(err),
        };
        self.view.progress = None;

        match outcome {
            Ok(count) => tracing::info!(identifiers = count, "check finished"),
            Err(err) => tracing::info!(error = %err, "check stopped"),
        }
    }
}

/// Pushes check output into the view and redraws immediately.
struct LiveObserver<'a, B: Backend> {
    terminal: &'a mut Terminal<B>,
    view: &'a mut View,
}

impl<B: Backend> LiveObserver<'_, B> {
    fn redraw(&mut self) {
        let view = &mut *self.view;
        if let Err(e) = self.terminal.draw(|f| ui(f, view)) {
            tracing::warn!(error = %e, "redraw failed");
        }
    }
}

impl<B: Backend> Notifier for LiveObserver<'_, B> {
    fn notify(&mut self, notice: Notice) {
        self.view.notices.push(notice);
        self.redraw();
    }
}

impl<B: Backend> CheckObserver for LiveObserver<'_, B> {
    fn progress(&mut self, message: &str) {
        self.view.progress = Some(message.to_string());
        self.redraw();
    }

    fn report(&mut self, report: IdentifierReport) {
        self.view.reports.push(report);
        self.redraw();
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

fn run_app<B: Backend>(terminal: &mut Terminal<B>, app: &mut App) -> io::Result<()> {
    loop {
        terminal.draw(|f| ui(f, &mut app.view))?;

        if let Event::Key(key) = event::read()? {
            if key.kind != KeyEventKind::Press {
                continue;
            }
            app.handle_key(key, terminal);
            if app.should_quit {
                return Ok(());
            }
        }
    }
}

// ============================================================================
// RENDERING
// ============================================================================

fn ui(f: &mut Frame, view: &mut View) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Title
            Constraint::Min(0),    // Content area
            Constraint::Length(3), // Status bar
        ])
        .split(f.size());

    render_header(f, chunks[0]);

    match view.screen {
        Screen::Locked => render_locked(f, chunks[1], view),
        Screen::Unavailable => render_unavailable(f, chunks[1], view),
        Screen::Form => render_form(f, chunks[1], view),
    }

    render_status_bar(f, chunks[2], view);
}

fn render_header(f: &mut Frame, area: Rect) {
    let title = Paragraph::new(Line::from(vec![Span::styled(
        "📊 IPO Allotment Checker",
        Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
    )]))
    .alignment(Alignment::Center)
    .block(Block::default().borders(Borders::ALL).border_style(Style::default().fg(Color::Cyan)));

    f.render_widget(title, area);
}

fn focused_border(focused: bool) -> Style {
    if focused {
        Style::default().fg(Color::Yellow)
    } else {
        Style::default().fg(Color::White)
    }
}

fn render_locked(f: &mut Frame, area: Rect, view: &View) {
    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage(25),
            Constraint::Percentage(50),
            Constraint::Percentage(25),
        ])
        .split(area);
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(1), Constraint::Length(9), Constraint::Min(0)])
        .split(columns[1]);

    let masked: String = "•".repeat(view.passcode_input.chars().count());
    let mut content = vec![
        Line::from(""),
        Line::from(Span::styled("  Enter Passcode", Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD))),
        Line::from(""),
        Line::from(vec![
            Span::raw("  "),
            Span::styled(format!("{}▏", masked), Style::default().fg(Color::White)),
        ]),
        Line::from(""),
    ];
    for notice in &view.notices {
        content.push(notice_line(notice));
    }

    let panel = Paragraph::new(content).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Yellow))
            .title(" 🔒 Access Control "),
    );
    f.render_widget(panel, rows[1]);
}

fn render_unavailable(f: &mut Frame, area: Rect, view: &View) {
    let mut content: Vec<Line> = view.notices.iter().map(notice_line).collect();
    content.push(Line::from(""));
    content.push(Line::from(Span::styled(
        "  Press r to retry",
        Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
    )));

    let panel = Paragraph::new(content)
        .wrap(Wrap { trim: false })
        .block(Block::default().borders(Borders::ALL).border_style(Style::default().fg(Color::Red)));
    f.render_widget(panel, area);
}

fn render_form(f: &mut Frame, area: Rect, view: &mut View) {
    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(40), Constraint::Percentage(60)])
        .split(area);

    let left = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Include-all checkbox
            Constraint::Min(5),    // IPO list
            Constraint::Length(8), // PAN numbers
            Constraint::Length(3), // Check button
        ])
        .split(columns[0]);

    render_include_all(f, left[0], view);
    render_ipo_list(f, left[1], view);
    render_identifiers(f, left[2], view);
    render_check_button(f, left[3], view);

    let notices_height = if view.notices.is_empty() {
        0
    } else {
        view.notices.len().min(6) as u16 + 2
    };
    let right = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(notices_height), Constraint::Min(0)])
        .split(columns[1]);

    if !view.notices.is_empty() {
        render_notices(f, right[0], view);
    }
    render_results(f, right[1], view);
}

fn render_include_all(f: &mut Frame, area: Rect, view: &View) {
    let mark = if view.include_all { "[x]" } else { "[ ]" };
    let checkbox = Paragraph::new(format!(" {} Include all IPOs?", mark)).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(focused_border(view.focus == Focus::IncludeAll))
            .title(" Select IPOs "),
    );
    f.render_widget(checkbox, area);
}

fn render_ipo_list(f: &mut Frame, area: Rect, view: &mut View) {
    let items: Vec<ListItem> = view
        .catalog
        .iter()
        .zip(&view.chosen)
        .map(|(ipo, chosen)| {
            let checked = view.include_all || *chosen;
            let mark = if checked { "[x]" } else { "[ ]" };
            let style = if view.include_all {
                Style::default().fg(Color::DarkGray)
            } else if checked {
                Style::default().fg(Color::Green)
            } else {
                Style::default().fg(Color::White)
            };
            ListItem::new(format!("{} {}", mark, IpoChoice::of(ipo).label())).style(style)
        })
        .collect();

    let title = if view.include_all {
        " Choose IPOs (all included) ".to_string()
    } else {
        let count = view.chosen.iter().filter(|c| **c).count();
        format!(" Choose IPOs ({}/{}) ", count, view.catalog.len())
    };

    let list = List::new(items)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(focused_border(view.focus == Focus::IpoList))
                .title(title),
        )
        .highlight_style(Style::default().add_modifier(Modifier::BOLD | Modifier::REVERSED))
        .highlight_symbol("→ ");

    f.render_stateful_widget(list, area, &mut view.ipo_state);
}

fn render_identifiers(f: &mut Frame, area: Rect, view: &View) {
    let focused = view.focus == Focus::Identifiers;
    let text = if view.identifiers.is_empty() && !focused {
        Paragraph::new(IDENTIFIER_PLACEHOLDER).style(Style::default().fg(Color::DarkGray))
    } else {
        let cursor = if focused { "▏" } else { "" };
        Paragraph::new(format!("{}{}", view.identifiers, cursor))
    };

    // Keep the last lines visible while typing.
    let inner_height = area.height.saturating_sub(2) as usize;
    let line_count = view.identifiers.split('\n').count();
    let scroll = line_count.saturating_sub(inner_height) as u16;

    let widget = text.scroll((scroll, 0)).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(focused_border(focused))
            .title(" Enter one PAN number per line "),
    );
    f.render_widget(widget, area);
}

fn render_check_button(f: &mut Frame, area: Rect, view: &View) {
    let focused = view.focus == Focus::CheckButton;
    let style = if focused {
        Style::default().fg(Color::Black).bg(Color::Yellow).add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)
    };
    let button = Paragraph::new(Span::styled(" Check Allotment ", style))
        .alignment(Alignment::Center)
        .block(Block::default().borders(Borders::ALL).border_style(focused_border(focused)));
    f.render_widget(button, area);
}

fn notice_line(notice: &Notice) -> Line<'_> {
    let (icon, color) = match notice.level {
        Level::Error => ("❌", Color::Red),
        Level::Warning => ("⚠️ ", Color::Yellow),
        Level::Info => ("ℹ️ ", Color::Cyan),
    };
    Line::from(vec![
        Span::raw("  "),
        Span::styled(format!("{} {}", icon, notice.message), Style::default().fg(color)),
    ])
}

fn render_notices(f: &mut Frame, area: Rect, view: &View) {
    // Most recent notices win when there are more than fit.
    let visible = area.height.saturating_sub(2) as usize;
    let skip = view.notices.len().saturating_sub(visible);
    let lines: Vec<Line> = view.notices.iter().skip(skip).map(notice_line).collect();

    let panel = Paragraph::new(lines).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::White))
            .title(" Messages "),
    );
    f.render_widget(panel, area);
}

fn report_height(report: &IdentifierReport) -> u16 {
    match &report.outcome {
        ReportOutcome::Table(table) => table.len() as u16 + 3,
        ReportOutcome::NoData { .. } => 3,
    }
}

fn render_results(f: &mut Frame, area: Rect, view: &View) {
    if view.reports.is_empty() {
        let hint = Paragraph::new(Line::from(Span::styled(
            "  Results appear here, one table per PAN.",
            Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
        )))
        .block(Block::default().borders(Borders::ALL).title(" Results "));
        f.render_widget(hint, area);
        return;
    }

    let mut constraints = Vec::new();
    let mut visible = Vec::new();
    let mut used = 0u16;
    for report in view.reports.iter().skip(view.results_offset) {
        let height = report_height(report);
        if used + height > area.height && !visible.is_empty() {
            break;
        }
        used = used.saturating_add(height);
        constraints.push(Constraint::Length(height));
        visible.push(report);
    }
    constraints.push(Constraint::Min(0));

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints(constraints)
        .split(area);

    for (report, chunk) in visible.into_iter().zip(chunks.iter()) {
        render_report(f, *chunk, report);
    }
}

fn render_report(f: &mut Frame, area: Rect, report: &IdentifierReport) {
    let title = format!(" 🔍 Results for PAN: {} ", report.identifier);

    match &report.outcome {
        ReportOutcome::NoData { message } => {
            let info = Paragraph::new(Line::from(vec![
                Span::raw("  "),
                Span::styled(format!("ℹ️  {}", message), Style::default().fg(Color::Cyan)),
            ]))
            .block(Block::default().borders(Borders::ALL).title(title));
            f.render_widget(info, area);
        }
        ReportOutcome::Table(table) => {
            let header_cells = std::iter::once("#")
                .chain(COLUMNS)
                .map(|h| Cell::from(h).style(Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)));
            let header = Row::new(header_cells).style(Style::default().bg(Color::DarkGray));

            let rows = table.rows.iter().map(|row| {
                let style = match row.style {
                    RowStyle::Allotted => Style::default().bg(Color::Green).fg(Color::Black),
                    RowStyle::Plain => Style::default(),
                };
                let mut cells = vec![Cell::from(row.index.to_string())];
                cells.extend(row.result.cells().into_iter().map(|c| Cell::from(c.to_string())));
                Row::new(cells).style(style)
            });

            let widths = [
                Constraint::Length(3),
                Constraint::Percentage(30),
                Constraint::Percentage(15),
                Constraint::Percentage(20),
                Constraint::Percentage(35),
            ];

            let widget = Table::new(rows, widths)
                .header(header)
                .block(Block::default().borders(Borders::ALL).title(title));
            f.render_widget(widget, area);
        }
    }
}

fn render_status_bar(f: &mut Frame, area: Rect, view: &View) {
    let key = |k: &'static str| Span::styled(k, Style::default().fg(Color::Yellow));

    let spans = if let Some(progress) = &view.progress {
        vec![Span::styled(format!("⏳ {}", progress), Style::default().fg(Color::Yellow))]
    } else {
        match view.screen {
            Screen::Locked => vec![key("Enter"), Span::raw(" unlock  "), key("Esc"), Span::raw(" quit")],
            Screen::Unavailable => vec![key("r"), Span::raw(" retry  "), key("Esc"), Span::raw(" quit")],
            Screen::Form => vec![
                key("Tab"),
                Span::raw(" next field  "),
                key("Space"),
                Span::raw(" toggle  "),
                key("↑/↓"),
                Span::raw(" move  "),
                key("Ctrl+R"),
                Span::raw(" check  "),
                key("PgUp/PgDn"),
                Span::raw(" results  "),
                Span::styled("Esc", Style::default().fg(Color::Red)),
                Span::raw(" quit"),
            ],
        }
    };

    let status = Paragraph::new(Line::from(spans)).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::White)),
    );
    f.render_widget(status, area);
}
