//! TUI Dashboard for real-time session monitoring

pub mod context;
pub mod layout;
pub mod state;
pub mod text;

use ratatui::{
    backend::{Backend, CrosstermBackend},
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame, Terminal,
};
use crossterm::{
    event::{self, Event, KeyEvent, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
    tty::IsTty,
};
use std::future::Future;
use std::io;
use std::time::Duration;
use anyhow::{bail, Result};
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;

use crate::progress::ProjectStatus;
use crate::sessions::EventReceiver;
use crate::workflow::SessionStatus;
use self::context::{DashboardContext, WorkflowPanel};
use self::layout::{allocate, panel_height, visible_log_lines, FOOTER_HEIGHT, HEADER_HEIGHT};
use self::state::action_for_key;
use self::text::render_log_line;

const INPUT_POLL: Duration = Duration::from_millis(100);

/// Why the dashboard loop ended
pub enum DashboardExit<T> {
    /// The supervised work finished; carries its output
    Finished(T),
    /// The user quit first
    Quit,
}

/// Dashboard for displaying live session output
pub struct Dashboard {
    terminal: Terminal<CrosstermBackend<io::Stdout>>,
    active: bool,
}

impl Dashboard {
    /// Take over the terminal. Fails without touching it when stdout is not
    /// a terminal.
    pub fn new() -> Result<Self> {
        if !io::stdout().is_tty() {
            bail!("the dashboard needs a terminal; pass --headless to run without one");
        }

        enable_raw_mode()?;
        let mut stdout = io::stdout();
        undo_on_err(execute!(stdout, EnterAlternateScreen), || {
            let _ = disable_raw_mode();
        })?;
        let terminal = undo_on_err(Terminal::new(CrosstermBackend::new(stdout)), || {
            let _ = execute!(io::stdout(), LeaveAlternateScreen);
            let _ = disable_raw_mode();
        })?;

        Ok(Self { terminal, active: true })
    }

    /// Redraw on every tick and key press until `done` resolves or the user
    /// quits. Never waits on the sessions themselves, only on `done`.
    pub async fn run<F, T>(
        &mut self,
        ctx: &mut DashboardContext,
        events: EventReceiver,
        done: F,
        tick: Duration,
    ) -> Result<DashboardExit<T>>
    where
        F: Future<Output = T>,
    {
        let (key_tx, key_rx) = mpsc::unbounded_channel();
        spawn_input_listener(key_tx);
        drive(&mut self.terminal, ctx, events, key_rx, done, tick).await
    }

    /// Restore the terminal. Safe to call more than once.
    pub fn cleanup(&mut self) -> Result<()> {
        if !self.active {
            return Ok(());
        }
        self.active = false;
        disable_raw_mode()?;
        execute!(self.terminal.backend_mut(), LeaveAlternateScreen)?;
        self.terminal.show_cursor()?;
        Ok(())
    }
}

impl Drop for Dashboard {
    fn drop(&mut self) {
        let _ = self.cleanup();
    }
}

/// The dashboard loop over any backend. Whichever of `done` and a quit key
/// comes first ends it.
pub async fn drive<B, F, T>(
    terminal: &mut Terminal<B>,
    ctx: &mut DashboardContext,
    mut events: EventReceiver,
    mut keys: mpsc::UnboundedReceiver<KeyEvent>,
    done: F,
    tick: Duration,
) -> Result<DashboardExit<T>>
where
    B: Backend,
    F: Future<Output = T>,
{
    tokio::pin!(done);
    let mut ticker = tokio::time::interval(tick);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            output = &mut done => {
                while let Ok(event) = events.try_recv() {
                    ctx.apply_event(event);
                }
                ctx.refresh();
                terminal.draw(|f| render(f, ctx))?;
                return Ok(DashboardExit::Finished(output));
            }
            Some(event) = events.recv() => ctx.apply_event(event),
            Some(key) = keys.recv() => {
                if let Some(action) = action_for_key(key) {
                    if ctx.state.apply(action) {
                        tracing::info!("Dashboard quit requested");
                        return Ok(DashboardExit::Quit);
                    }
                    terminal.draw(|f| render(f, ctx))?;
                }
            }
            _ = ticker.tick() => {
                ctx.refresh();
                terminal.draw(|f| render(f, ctx))?;
            }
        }
    }
}

fn render(f: &mut Frame, ctx: &DashboardContext) {
    let area = f.area();
    let panels = ctx.panels();
    let allocated = allocate(area.height, panels.len(), ctx.state.expanded_count());

    let mut constraints = Vec::with_capacity(panels.len() + 3);
    constraints.push(Constraint::Length(HEADER_HEIGHT));
    for panel in panels {
        let expanded = ctx.state.is_expanded(panel.workflow);
        constraints.push(Constraint::Length(panel_height(expanded, allocated)));
    }
    constraints.push(Constraint::Min(0));
    constraints.push(Constraint::Length(FOOTER_HEIGHT));

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints(constraints)
        .split(area);

    render_header(f, chunks[0], ctx);
    for (i, panel) in panels.iter().enumerate() {
        let selected = i == ctx.state.selected();
        let expanded = ctx.state.is_expanded(panel.workflow);
        render_panel(f, chunks[i + 1], panel, selected, expanded, allocated, area.width);
    }
    render_footer(f, chunks[chunks.len() - 1]);
}

fn render_header(f: &mut Frame, area: Rect, ctx: &DashboardContext) {
    let mut lines = vec![Line::from(vec![
        Span::styled("fixflow", Style::default().fg(Color::White).add_modifier(Modifier::BOLD)),
        Span::styled(
            format!(
                " - {} workflows across {} projects",
                ctx.panels().len(),
                ctx.projects().len()
            ),
            Style::default().fg(Color::Gray),
        ),
    ])];

    let mut counts = vec![
        Span::styled(
            format!("running {}", ctx.count(SessionStatus::Running)),
            status_style(SessionStatus::Running),
        ),
        Span::raw("  "),
        Span::styled(
            format!("completed {}", ctx.count(SessionStatus::Completed)),
            status_style(SessionStatus::Completed),
        ),
        Span::raw("  "),
        Span::styled(
            format!("failed {}", ctx.count(SessionStatus::Failed)),
            status_style(SessionStatus::Failed),
        ),
    ];

    let resumed = ctx.resumed();
    if !resumed.is_empty() {
        let names: Vec<&str> = resumed.iter().map(|w| w.as_str()).collect();
        counts.push(Span::raw("  "));
        counts.push(Span::styled(
            format!("resumed: {}", names.join(", ")),
            Style::default().fg(Color::Yellow),
        ));
    }
    lines.push(Line::from(counts));

    let header = Paragraph::new(lines).block(Block::default().borders(Borders::BOTTOM));
    f.render_widget(header, area);
}

fn render_panel(
    f: &mut Frame,
    area: Rect,
    panel: &WorkflowPanel,
    selected: bool,
    expanded: bool,
    allocated: u16,
    columns: u16,
) {
    let mut title = vec![
        Span::raw(if selected { "▶ " } else { "  " }),
        Span::styled(panel.status.symbol(), status_style(panel.status)),
        Span::raw(" "),
        Span::styled(panel.workflow.as_str(), Style::default().add_modifier(Modifier::BOLD)),
        Span::styled(format!(" · {}", panel.status), Style::default().fg(Color::Gray)),
    ];
    if panel.resumed {
        title.push(Span::styled(" (resumed)", Style::default().fg(Color::Yellow)));
    }
    title.push(Span::styled(
        if expanded { " [-] " } else { " [+] " },
        Style::default().fg(Color::DarkGray),
    ));

    let border = if selected {
        Style::default().fg(Color::Cyan)
    } else {
        Style::default().fg(Color::DarkGray)
    };
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(border)
        .title(Line::from(title));

    let mut lines = vec![project_summary(panel.summary())];
    if expanded {
        lines.push(Line::default());
        let tail = panel.tail(visible_log_lines(allocated));
        let newest = tail.len().saturating_sub(1);
        for (i, line) in tail.iter().enumerate() {
            lines.push(render_log_line(line, newest - i, columns));
        }
    }

    f.render_widget(Paragraph::new(lines).block(block), area);
}

fn render_footer(f: &mut Frame, area: Rect) {
    let help = Line::from(Span::styled(
        "↑/↓ select  enter toggle  ←/→ collapse/expand  a expand all  c collapse all  q quit",
        Style::default().fg(Color::DarkGray),
    ));
    f.render_widget(Paragraph::new(help), area);
}

/// Run `undo` if a setup step failed; `Drop` never runs for a half-built dashboard
fn undo_on_err<T>(result: io::Result<T>, undo: impl FnOnce()) -> io::Result<T> {
    if result.is_err() {
        undo();
    }
    result
}

/// Blocking key reader on its own thread; exits once the receiver is gone
fn spawn_input_listener(tx: mpsc::UnboundedSender<KeyEvent>) {
    std::thread::spawn(move || loop {
        match event::poll(INPUT_POLL) {
            Ok(true) => match event::read() {
                Ok(Event::Key(key)) if key.kind == KeyEventKind::Press => {
                    if tx.send(key).is_err() {
                        break;
                    }
                }
                Ok(_) => {}
                Err(_) => break,
            },
            Ok(false) => {
                if tx.is_closed() {
                    break;
                }
            }
            Err(_) => break,
        }
    });
}

fn status_style(status: SessionStatus) -> Style {
    let color = match status {
        SessionStatus::Pending => Color::Gray,
        SessionStatus::Running => Color::Yellow,
        SessionStatus::Completed => Color::Green,
        SessionStatus::Failed => Color::Red,
    };
    Style::default().fg(color)
}

fn project_style(status: ProjectStatus) -> Style {
    match status {
        ProjectStatus::Pass => Style::default().fg(Color::Green),
        ProjectStatus::Running => Style::default().fg(Color::Yellow),
        ProjectStatus::Pending => Style::default().fg(Color::DarkGray),
    }
}

/// One-line aggregate of per-project glyphs
fn project_summary(summary: &[(String, ProjectStatus)]) -> Line<'static> {
    let mut spans = Vec::with_capacity(summary.len() * 3);
    for (project, status) in summary {
        spans.push(Span::styled(status.symbol(), project_style(*status)));
        spans.push(Span::raw(format!(" {}", project)));
        spans.push(Span::raw("  "));
    }
    Line::from(spans)
}
