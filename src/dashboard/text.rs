//! Log line cleanup, colouring and width limits

use std::path::Path;
use std::sync::OnceLock;
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use regex::Regex;

/// Shown in place of a line that cannot be displayed
pub const MALFORMED_GLYPH: &str = "�";

/// Lines this close to the bottom of a panel keep full brightness
pub const RECENT_LINES: usize = 15;

const MIN_LINE_WIDTH: usize = 40;
const WIDTH_MARGIN: usize = 8;
const ELLIPSIS: char = '…';

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineTone {
    Error,
    Success,
    Warning,
    Progress,
    Plain,
}

impl LineTone {
    pub fn style(&self) -> Style {
        match self {
            LineTone::Error => Style::default().fg(Color::Red),
            LineTone::Success => Style::default().fg(Color::Green),
            LineTone::Warning => Style::default().fg(Color::Yellow),
            LineTone::Progress => Style::default().fg(Color::Cyan),
            LineTone::Plain => Style::default(),
        }
    }
}

fn ansi_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        // CSI sequences, OSC sequences, then any other two-byte escape
        Regex::new(r"\x1b\[[0-?]*[ -/]*[@-~]|\x1b\][^\x07\x1b]*(?:\x07|\x1b\\)?|\x1b[@-_]")
            .expect("valid regex")
    })
}

fn tone_patterns() -> &'static [(LineTone, Regex)] {
    static PATTERNS: OnceLock<Vec<(LineTone, Regex)>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        [
            (LineTone::Error, r"(?i)\b(error|errors|fail|failed|failing|failure|fatal|panic|panicked|exception)\b|✗"),
            (LineTone::Success, r"(?i)\b(success|successful|successfully|succeeded|pass|passed|passing|done|completed|fixed)\b|✓"),
            (LineTone::Warning, r"(?i)\b(warn|warning|warnings|deprecated)\b|⚠"),
            (LineTone::Progress, r"(?i)\b(running|starting|started|processing|checking|building|compiling|analyzing)\b"),
        ]
        .into_iter()
        .map(|(tone, pattern)| (tone, Regex::new(pattern).expect("valid regex")))
        .collect()
    })
}

/// Strip ANSI escapes and control characters (newline and tab survive),
/// then trim. `"\x1b[31merror\x1b[0m\r\n"` becomes `"error"`.
pub fn sanitize_line(raw: &str) -> String {
    let stripped = ansi_re().replace_all(raw, "");
    stripped
        .chars()
        .filter(|c| *c == '\n' || *c == '\t' || !c.is_control())
        .collect::<String>()
        .trim()
        .to_string()
}

/// Turn one raw log line into display text. Empty lines are dropped;
/// bytes that are not UTF-8 become the placeholder glyph.
pub fn decode_line(raw: &[u8]) -> Option<String> {
    match std::str::from_utf8(raw) {
        Ok(text) => Some(sanitize_line(text)).filter(|l| !l.is_empty()),
        Err(_) => Some(MALFORMED_GLYPH.to_string()),
    }
}

/// Read and clean a whole log file. A missing file has no lines.
pub fn read_log_lines(path: &Path) -> Vec<String> {
    match std::fs::read(path) {
        Ok(bytes) => bytes.split(|b| *b == b'\n').filter_map(decode_line).collect(),
        Err(_) => vec![],
    }
}

/// First matching tone wins: error, success, warning, progress
pub fn classify_line(line: &str) -> LineTone {
    tone_patterns()
        .iter()
        .find(|(_, re)| re.is_match(line))
        .map(|(tone, _)| *tone)
        .unwrap_or(LineTone::Plain)
}

/// Maximum characters shown per line for a terminal this wide
pub fn line_width(columns: u16) -> usize {
    (columns as usize).saturating_sub(WIDTH_MARGIN).max(MIN_LINE_WIDTH)
}

pub fn truncate_line(line: &str, width: usize) -> String {
    if line.chars().count() <= width {
        return line.to_string();
    }
    let mut out: String = line.chars().take(width.saturating_sub(1)).collect();
    out.push(ELLIPSIS);
    out
}

/// Style one log line. `from_bottom` is 0 for the newest line in the panel.
pub fn render_log_line(line: &str, from_bottom: usize, columns: u16) -> Line<'static> {
    if line == MALFORMED_GLYPH {
        return Line::from(Span::styled(MALFORMED_GLYPH, Style::default().fg(Color::DarkGray)));
    }

    let mut style = classify_line(line).style();
    if from_bottom >= RECENT_LINES {
        style = style.add_modifier(Modifier::DIM);
    }
    Line::from(Span::styled(truncate_line(line, line_width(columns)), style))
}
