use crate::state::{SessionState, TurnPhase};
use crate::types::{Language, Role};
use crate::ui::input_metrics::{
    cursor_row_col, display_width, truncate_to_display_width, wrap_input_lines, wrap_words,
};
use ratatui::{
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::Paragraph,
    Frame,
};

pub const ASSISTANT_NAME: &str = "Dr. Aisha";
const TITLE: &str = "Dr. Aisha · AI Medical Assistant";
const DISCLAIMER: &str = "AI medical assistant for guidance only. Always consult a real doctor.";
const KEY_HINTS: &str = "Enter send · F2 language · Ctrl+N new · Ctrl+C cancel";
const STREAMING_MARKER: &str = "▌";
const INDENT: &str = "  ";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ToastKind {
    Info,
    Error,
}

pub fn input_visual_rows(input: &str, width: usize) -> usize {
    wrap_input_lines(input, width).len().max(1)
}

/// Pre-wrapped transcript rows for `width` columns. An empty session shows
/// the welcome text for `language`.
pub fn transcript_lines(
    session: &SessionState,
    language: Language,
    width: usize,
    tick: u64,
) -> Vec<Line<'static>> {
    let body_width = width.saturating_sub(INDENT.len()).max(1);
    if session.is_empty() {
        return welcome_lines(language, body_width);
    }

    let mut lines = Vec::new();
    let streaming = session.streaming_index();
    for (index, message) in session.messages().iter().enumerate() {
        if index > 0 {
            lines.push(Line::default());
        }
        lines.push(speaker_line(message.role));

        let mut rows = wrap_words(&message.content, body_width);
        if streaming == Some(index) {
            if let Some(last) = rows.last_mut() {
                last.push_str(STREAMING_MARKER);
            }
        }
        let style = match message.role {
            Role::User => Style::default().fg(Color::White),
            Role::Assistant => Style::default().fg(Color::Gray),
        };
        lines.extend(
            rows.into_iter()
                .map(|row| Line::styled(format!("{INDENT}{row}"), style)),
        );
    }

    if session.awaiting_reply() {
        lines.push(Line::default());
        lines.push(speaker_line(Role::Assistant));
        let dots = ".".repeat((tick % 3) as usize + 1);
        lines.push(Line::styled(
            format!("{INDENT}typing{dots}"),
            Style::default()
                .fg(Color::DarkGray)
                .add_modifier(Modifier::ITALIC),
        ));
    }
    lines
}

fn speaker_line(role: Role) -> Line<'static> {
    match role {
        Role::User => Line::styled(
            "You",
            Style::default()
                .fg(Color::LightBlue)
                .add_modifier(Modifier::BOLD),
        ),
        Role::Assistant => Line::styled(
            ASSISTANT_NAME,
            Style::default()
                .fg(Color::LightGreen)
                .add_modifier(Modifier::BOLD),
        ),
    }
}

fn welcome_lines(language: Language, width: usize) -> Vec<Line<'static>> {
    let texts = language.texts();
    let mut lines = vec![
        Line::styled(
            format!("{INDENT}{}", texts.greeting),
            Style::default()
                .fg(Color::LightGreen)
                .add_modifier(Modifier::BOLD),
        ),
        Line::styled(
            format!("{INDENT}{}", texts.subtitle),
            Style::default().fg(Color::Gray),
        ),
        Line::default(),
    ];
    lines.extend(
        wrap_words(texts.description, width)
            .into_iter()
            .map(|row| Line::from(format!("{INDENT}{row}"))),
    );
    lines.push(Line::default());
    for feature in texts.features {
        lines.push(Line::styled(
            format!("{INDENT}• {feature}"),
            Style::default().fg(Color::Cyan),
        ));
    }
    lines.push(Line::default());
    lines.push(Line::styled(
        format!("{INDENT}{}", texts.prompt),
        Style::default().add_modifier(Modifier::BOLD),
    ));
    lines
}

pub fn render_header(frame: &mut Frame<'_>, area: Rect, language: Language, phase: TurnPhase) {
    if area.height == 0 || area.width == 0 {
        return;
    }
    let width = area.width as usize;
    let state = match phase {
        TurnPhase::Idle => "",
        TurnPhase::Sending => "sending ",
        TurnPhase::Streaming => "replying ",
        TurnPhase::Failed => "failed ",
    };
    let right = format!("{state}[F2] {language}");
    let right_width = display_width(&right);
    let left = truncate_line(TITLE, width.saturating_sub(right_width + 1));
    let pad = width.saturating_sub(display_width(&left) + right_width);

    let line = Line::from(vec![
        Span::styled(left, Style::default().add_modifier(Modifier::BOLD)),
        Span::raw(" ".repeat(pad)),
        Span::styled(right, Style::default().fg(Color::Cyan)),
    ]);
    frame.render_widget(
        Paragraph::new(line).style(Style::default().bg(Color::Rgb(24, 32, 40))),
        area,
    );
}

pub fn render_messages(
    frame: &mut Frame<'_>,
    area: Rect,
    lines: Vec<Line<'static>>,
    scroll: usize,
) {
    if area.height == 0 || area.width == 0 {
        return;
    }
    let scroll = u16::try_from(scroll).unwrap_or(u16::MAX);
    frame.render_widget(Paragraph::new(lines).scroll((scroll, 0)), area);
}

pub fn render_status_line(frame: &mut Frame<'_>, area: Rect, status: &str, kind: ToastKind) {
    if area.height == 0 || area.width == 0 {
        return;
    }
    let style = match kind {
        ToastKind::Info => Style::default().fg(Color::DarkGray),
        ToastKind::Error => Style::default()
            .fg(Color::LightRed)
            .add_modifier(Modifier::BOLD),
    };
    let text = truncate_line(status, area.width as usize);
    frame.render_widget(Paragraph::new(text).style(style), area);
}

pub fn render_input(
    frame: &mut Frame<'_>,
    area: Rect,
    input: &str,
    cursor_byte: usize,
    placeholder: &str,
) {
    if area.height == 0 || area.width <= 2 {
        return;
    }
    let base = Style::default().bg(Color::Rgb(24, 24, 24));

    if input.is_empty() {
        let hint = truncate_line(placeholder, area.width as usize - 2);
        frame.render_widget(
            Paragraph::new(Line::from(vec![
                Span::raw("> "),
                Span::styled(hint, Style::default().fg(Color::DarkGray)),
            ]))
            .style(base),
            area,
        );
        frame.set_cursor_position((area.x + 2, area.y));
        return;
    }

    let input_width = area.width.saturating_sub(2).max(1) as usize;
    let lines = wrap_input_lines(input, input_width);
    let (cursor_row, cursor_col) = cursor_row_col(input, cursor_byte, input_width);
    let visible_rows = area.height as usize;
    let window_start = cursor_row.saturating_add(1).saturating_sub(visible_rows);

    let rendered: Vec<Line<'static>> = (window_start..window_start + visible_rows)
        .map(|row| {
            let prefix = if row == 0 { "> " } else { "  " };
            let text = lines.get(row).map(String::as_str).unwrap_or_default();
            Line::from(format!("{prefix}{text}"))
        })
        .collect();
    frame.render_widget(
        Paragraph::new(rendered).style(base.fg(Color::White)),
        area,
    );

    let cursor_y = area.y.saturating_add((cursor_row - window_start) as u16);
    let cursor_x = area
        .x
        .saturating_add(2 + cursor_col as u16)
        .min(area.x.saturating_add(area.width.saturating_sub(1)));
    frame.set_cursor_position((cursor_x, cursor_y));
}

pub fn render_footer(frame: &mut Frame<'_>, area: Rect) {
    if area.height == 0 || area.width == 0 {
        return;
    }
    let width = area.width as usize;
    let full = format!("{DISCLAIMER}  {KEY_HINTS}");
    let text = if display_width(&full) <= width {
        full
    } else {
        truncate_line(DISCLAIMER, width)
    };
    frame.render_widget(
        Paragraph::new(text).style(
            Style::default()
                .fg(Color::DarkGray)
                .add_modifier(Modifier::ITALIC),
        ),
        area,
    );
}

fn truncate_line(input: &str, width: usize) -> String {
    if display_width(input) <= width {
        return input.to_string();
    }
    if width < 4 {
        return truncate_to_display_width(input, width);
    }
    let mut out = truncate_to_display_width(input, width - 3);
    out.push_str("...");
    out
}
