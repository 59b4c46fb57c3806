use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::{Backend, CrosstermBackend},
    layout::{Constraint, Direction, Layout},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Paragraph, Row, Table, TableState, Wrap},
    Frame, Terminal,
};
use std::io;
use std::time::Duration;

use crate::presenter::{FeedbackCard, RestaurantDetails};

/// Everything the dashboard shows, computed before the terminal is taken
/// over.
pub struct DashboardData {
    pub anchor: String,
    pub recommendations: Vec<(RestaurantDetails, f64)>,
    pub feedback: Vec<FeedbackCard>,
}

pub fn next_index(selected: Option<usize>, len: usize) -> Option<usize> {
    if len == 0 {
        return None;
    }
    Some(match selected {
        Some(i) if i + 1 < len => i + 1,
        _ => 0,
    })
}

pub fn previous_index(selected: Option<usize>, len: usize) -> Option<usize> {
    if len == 0 {
        return None;
    }
    Some(match selected {
        Some(i) if i > 0 => i - 1,
        Some(_) => len - 1,
        None => 0,
    })
}

pub fn run_dashboard(data: &DashboardData) -> anyhow::Result<()> {
    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = event_loop(&mut terminal, data);

    // Restore terminal
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;
    result
}

fn event_loop<B: Backend>(terminal: &mut Terminal<B>, data: &DashboardData) -> anyhow::Result<()> {
    let mut table_state = TableState::default();
    table_state.select(next_index(None, data.recommendations.len()));

    loop {
        terminal.draw(|f| ui(f, data, &mut table_state))?;

        if event::poll(Duration::from_millis(250))? {
            if let Event::Key(key) = event::read()? {
                if key.kind != KeyEventKind::Press {
                    continue;
                }
                let len = data.recommendations.len();
                match key.code {
                    KeyCode::Char('q') | KeyCode::Esc => return Ok(()),
                    KeyCode::Down | KeyCode::Char('j') => {
                        table_state.select(next_index(table_state.selected(), len));
                    }
                    KeyCode::Up | KeyCode::Char('k') => {
                        table_state.select(previous_index(table_state.selected(), len));
                    }
                    _ => {}
                }
            }
        }
    }
}

fn detail_lines(details: &RestaurantDetails) -> Vec<Line<'_>> {
    let label = Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD);
    let mut lines = vec![
        Line::from(Span::styled(details.name.as_str(), label.fg(Color::Yellow))),
        Line::from(vec![Span::styled("Rating: ", label), Span::raw(details.stars.as_str())]),
    ];
    if let Some(comment) = &details.comment {
        lines.push(Line::from(vec![
            Span::styled("Comments: ", label),
            Span::styled(comment.as_str(), Style::default().fg(Color::Yellow)),
        ]));
    }
    if let Some(category) = &details.category {
        lines.push(Line::from(vec![
            Span::styled("Category: ", label),
            Span::styled(category.as_str(), Style::default().fg(Color::Red)),
        ]));
    }
    lines.push(Line::from(vec![
        Span::styled("Address: ", label),
        Span::styled(details.address.as_str(), Style::default().fg(Color::Green)),
    ]));
    if let Some(contact) = &details.contact {
        lines.push(Line::from(vec![Span::styled("Contact: ", label), Span::raw(contact.as_str())]));
    }
    lines
}

fn ui(f: &mut Frame, data: &DashboardData, table_state: &mut TableState) {
    let rows_and_feedback = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Percentage(70), Constraint::Percentage(30)])
        .margin(1)
        .split(f.size());
    let top = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(55), Constraint::Percentage(45)])
        .split(rows_and_feedback[0]);

    let selected_style = Style::default().add_modifier(Modifier::REVERSED).fg(Color::Yellow);
    let normal_style = Style::default().fg(Color::White);
    let header_cells = ["Restaurant", "Similarity", "Rating"]
        .iter()
        .map(|h| Cell::from(*h).style(Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)));
    let header = Row::new(header_cells)
        .style(normal_style)
        .height(1)
        .bottom_margin(1);

    let rows = data.recommendations.iter().map(|(details, score)| {
        let cells = vec![
            Cell::from(details.name.clone()),
            Cell::from(format!("{:.3}", score)),
            Cell::from(details.stars.clone()),
        ];
        Row::new(cells).style(normal_style)
    });

    let col_widths = vec![
        Constraint::Min(20),    // Name
        Constraint::Length(10), // Similarity
        Constraint::Length(12), // Stars
    ];

    let table = Table::new(rows, col_widths)
        .header(header)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(format!("Top {} similar to {}", data.recommendations.len(), data.anchor)),
        )
        .highlight_style(selected_style)
        .highlight_symbol(">> ");
    f.render_stateful_widget(table, top[0], table_state);

    let details = table_state
        .selected()
        .and_then(|i| data.recommendations.get(i))
        .map(|(d, _)| detail_lines(d))
        .unwrap_or_else(|| vec![Line::from("No recommendation selected")]);
    let details = Paragraph::new(details)
        .wrap(Wrap { trim: true })
        .block(Block::default().borders(Borders::ALL).title("Details"));
    f.render_widget(details, top[1]);

    let feedback_lines: Vec<Line> = if data.feedback.is_empty() {
        vec![Line::from("No feedback yet.")]
    } else {
        data.feedback
            .iter()
            .map(|card| Line::from(format!("{}  {}", card.stars, card.comment)))
            .collect()
    };
    let feedback = Paragraph::new(feedback_lines)
        .wrap(Wrap { trim: true })
        .block(Block::default().borders(Borders::ALL).title("Recent Feedback (q to quit)"));
    f.render_widget(feedback, rows_and_feedback[1]);
}
