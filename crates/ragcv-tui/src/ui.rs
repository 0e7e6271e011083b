use ragcv_core::{OpKind, Tab};
use ratatui::{
    layout::{Constraint, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Tabs, Wrap},
    Frame,
};

use crate::app::{line_col, App, EditTarget, InputMode};

const SPINNER: [&str; 3] = [".  ", ".. ", "..."];

pub fn render(app: &mut App, frame: &mut Frame) {
    let [header_area, body_area, footer_area] = Layout::vertical([
        Constraint::Length(3),
        Constraint::Min(0),
        Constraint::Length(1),
    ])
    .areas(frame.area());

    render_header(app, frame, header_area);
    match app.active_tab() {
        Tab::Output => render_output(app, frame, body_area),
        Tab::Summary => render_summary(app, frame, body_area),
        Tab::Artifacts => render_artifacts(app, frame, body_area),
        Tab::Typeset => render_typeset(app, frame, body_area),
        Tab::Logs => render_logs(app, frame, body_area),
    }
    render_footer(app, frame, footer_area);
}

fn tab_kind(tab: Tab) -> Option<OpKind> {
    match tab {
        Tab::Output => Some(OpKind::Query),
        Tab::Typeset => Some(OpKind::Compile),
        Tab::Logs => Some(OpKind::LogFetch),
        Tab::Summary | Tab::Artifacts => None,
    }
}

fn render_header(app: &App, frame: &mut Frame, area: Rect) {
    let titles: Vec<Line> = Tab::all()
        .iter()
        .map(|tab| {
            let mut spans = vec![Span::raw(format!("{} {}", tab.index() + 1, tab.title()))];
            if let Some(kind) = tab_kind(*tab) {
                if app.session.is_loading(kind) {
                    spans.push(Span::styled(
                        format!(" {}", SPINNER[app.animation_frame % SPINNER.len()]),
                        Style::default().fg(Color::Yellow),
                    ));
                } else if app.session.error(kind).is_some() {
                    spans.push(Span::styled(" !", Style::default().fg(Color::Red)));
                }
            }
            Line::from(spans)
        })
        .collect();

    let tabs = Tabs::new(titles)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::DarkGray))
                .title(Span::styled(
                    " ragcv ",
                    Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
                ))
                .title(Span::styled(
                    format!(" {} ", app.base_url),
                    Style::default().fg(Color::DarkGray),
                )),
        )
        .select(app.active_tab().index())
        .style(Style::default().fg(Color::Gray))
        .highlight_style(
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD | Modifier::UNDERLINED),
        );

    frame.render_widget(tabs, area);
}

fn render_output(app: &mut App, frame: &mut Frame, area: Rect) {
    let [input_area, result_area] = Layout::vertical([
        Constraint::Length(3),
        Constraint::Min(0),
    ])
    .areas(area);

    let editing = app.input_mode == InputMode::Editing && app.edit_target == EditTarget::Query;
    let input_border = if editing { Color::Yellow } else { Color::DarkGray };
    let input = Paragraph::new(app.query_input.as_str()).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(input_border))
            .title(" Query "),
    );
    frame.render_widget(input, input_area);

    if editing {
        let cursor_x = app.query_cursor.min(input_area.width.saturating_sub(3) as usize) as u16;
        frame.set_cursor_position((input_area.x + cursor_x + 1, input_area.y + 1));
    }

    let session = &app.session;
    let mut lines: Vec<Line> = Vec::new();
    if session.is_loading(OpKind::Query) {
        lines.push(Line::styled(
            format!("Generating{}", SPINNER[app.animation_frame % SPINNER.len()]),
            Style::default().fg(Color::Yellow).add_modifier(Modifier::ITALIC),
        ));
    } else if let Some(error) = session.error(OpKind::Query) {
        lines.push(Line::styled(format!("Error: {}", error), Style::default().fg(Color::Red)));
    } else if let Some(result) = session.result() {
        lines.extend(result.result.lines().map(parse_markdown_line));
    } else {
        lines.push(Line::styled(
            "Press i to write a query, Enter to generate.",
            Style::default().fg(Color::DarkGray),
        ));
    }

    let title = match session.last_query() {
        Some(query) => format!(" Output: {} ", query),
        None => " Output ".to_string(),
    };
    let result = Paragraph::new(lines)
        .block(Block::default().borders(Borders::ALL).title(title))
        .wrap(Wrap { trim: false })
        .scroll((app.scroll(Tab::Output), 0));
    frame.render_widget(result, result_area);
}

fn render_summary(app: &App, frame: &mut Frame, area: Rect) {
    let lines: Vec<Line> = match app.session.tab_content(Tab::Summary) {
        Some(summary) => summary.lines().map(parse_markdown_line).collect(),
        None => vec![Line::styled("No summary.", Style::default().fg(Color::DarkGray))],
    };

    let paragraph = Paragraph::new(lines)
        .block(Block::default().borders(Borders::ALL).title(" Summary "))
        .wrap(Wrap { trim: false })
        .scroll((app.scroll(Tab::Summary), 0));
    frame.render_widget(paragraph, area);
}

fn render_artifacts(app: &App, frame: &mut Frame, area: Rect) {
    let artifacts = app
        .session
        .result()
        .map(|result| result.artifacts.as_slice())
        .unwrap_or_default();

    let mut lines: Vec<Line> = Vec::new();
    for (i, artifact) in artifacts.iter().enumerate() {
        lines.push(Line::from(vec![
            Span::styled(
                format!("[{}] ", i + 1),
                Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
            ),
            Span::styled(
                format!("score {:.3}", artifact.retrieval_score),
                Style::default().fg(Color::Green),
            ),
            Span::styled(
                format!("  {} tokens  ", artifact.chunk_length_tokens),
                Style::default().fg(Color::DarkGray),
            ),
            Span::raw(artifact.source.clone().unwrap_or_else(|| "unknown source".to_string())),
        ]));
        lines.extend(artifact.text.lines().map(|line| Line::raw(line.to_string())));
        lines.push(Line::default());
    }
    if lines.is_empty() {
        lines.push(Line::styled("No retrieved artifacts.", Style::default().fg(Color::DarkGray)));
    }

    let paragraph = Paragraph::new(lines)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(format!(" Artifacts ({}) ", artifacts.len())),
        )
        .wrap(Wrap { trim: false })
        .scroll((app.scroll(Tab::Artifacts), 0));
    frame.render_widget(paragraph, area);
}

fn render_typeset(app: &mut App, frame: &mut Frame, area: Rect) {
    let [source_area, preview_area] = Layout::horizontal([
        Constraint::Percentage(60),
        Constraint::Percentage(40),
    ])
    .areas(area);

    let editing = app.input_mode == InputMode::Editing && app.edit_target == EditTarget::Source;
    app.clamp_source_cursor();
    let (cursor_line, cursor_col) = line_col(app.session.source(), app.source_cursor);

    // Keep the cursor line on screen while editing
    let view_height = source_area.height.saturating_sub(2).max(1) as usize;
    let mut offset = app.scroll(Tab::Typeset) as usize;
    if editing {
        if cursor_line < offset {
            offset = cursor_line;
        } else if cursor_line >= offset + view_height {
            offset = cursor_line + 1 - view_height;
        }
        app.set_scroll(Tab::Typeset, offset as u16);
    }

    let mut title = " LaTeX source ".to_string();
    if app.session.is_manually_edited() {
        title.push_str("[edited] ");
    }
    let border = if editing { Color::Yellow } else { Color::DarkGray };
    let source = Paragraph::new(app.session.source())
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(border))
                .title(title),
        )
        .scroll((offset as u16, 0));
    frame.render_widget(source, source_area);

    if editing {
        let max_x = source_area.width.saturating_sub(3) as usize;
        let x = source_area.x + 1 + cursor_col.min(max_x) as u16;
        let y = source_area.y + 1 + (cursor_line - offset) as u16;
        frame.set_cursor_position((x, y));
    }

    render_preview(app, frame, preview_area);
}

fn render_preview(app: &App, frame: &mut Frame, area: Rect) {
    let session = &app.session;
    let label = Style::default().fg(Color::DarkGray);
    let mut lines: Vec<Line> = Vec::new();

    if session.is_loading(OpKind::Compile) {
        lines.push(Line::styled(
            format!("Compiling{}", SPINNER[app.animation_frame % SPINNER.len()]),
            Style::default().fg(Color::Yellow),
        ));
    } else if session.is_edit_pending() {
        lines.push(Line::styled("Waiting for edits to settle", Style::default().fg(Color::Yellow)));
    }

    if let Some(error) = session.error(OpKind::Compile) {
        lines.push(Line::styled("Compile failed:", Style::default().fg(Color::Red)));
        lines.extend(
            error
                .lines()
                .map(|line| Line::styled(line.to_string(), Style::default().fg(Color::Red))),
        );
        lines.push(Line::default());
    }

    match session.rendered() {
        Some(handle) => {
            lines.push(Line::from(vec![
                Span::styled("document  ", label),
                Span::raw(format!("#{}", handle.id())),
            ]));
            lines.push(Line::from(vec![
                Span::styled("size      ", label),
                Span::raw(format_size(handle.len())),
            ]));
            lines.push(Line::from(vec![
                Span::styled("file      ", label),
                Span::raw(handle.path().display().to_string()),
            ]));
            lines.push(Line::default());
            lines.push(Line::styled("Press o to open in a PDF viewer.", label));
        }
        None => lines.push(Line::styled("Nothing rendered yet.", label)),
    }

    let paragraph = Paragraph::new(lines)
        .block(Block::default().borders(Borders::ALL).title(" Rendered "))
        .wrap(Wrap { trim: false });
    frame.render_widget(paragraph, area);
}

fn render_logs(app: &App, frame: &mut Frame, area: Rect) {
    let session = &app.session;
    let mut lines: Vec<Line> = Vec::new();
    if let Some(error) = session.error(OpKind::LogFetch) {
        lines.push(Line::styled(format!("Error: {}", error), Style::default().fg(Color::Red)));
    }
    lines.extend(session.log_buffer().lines().map(|line| Line::raw(line.to_string())));
    if lines.is_empty() {
        lines.push(Line::styled(
            "No logs. Press r to toggle auto-refresh, R to fetch once.",
            Style::default().fg(Color::DarkGray),
        ));
    }

    let title = format!(
        " Logs (auto-refresh {}) ",
        if session.is_auto_refresh() { "on" } else { "off" }
    );
    let paragraph = Paragraph::new(lines)
        .block(Block::default().borders(Borders::ALL).title(title))
        .wrap(Wrap { trim: false })
        .scroll((app.scroll(Tab::Logs), 0));
    frame.render_widget(paragraph, area);
}

fn render_footer(app: &App, frame: &mut Frame, area: Rect) {
    let mode_style = match app.input_mode {
        InputMode::Normal => Style::default().bg(Color::Blue).fg(Color::White),
        InputMode::Editing => Style::default().bg(Color::Yellow).fg(Color::Black),
    };
    let mode_text = match (app.input_mode, app.edit_target) {
        (InputMode::Normal, _) => " NORMAL ",
        (InputMode::Editing, EditTarget::Query) => " QUERY ",
        (InputMode::Editing, EditTarget::Source) => " SOURCE ",
    };

    // Key style: dark background with bright text for visibility on both light/dark terminals
    let key_style = Style::default().bg(Color::DarkGray).fg(Color::White);
    let label_style = Style::default().fg(Color::Gray);

    let hints: &[(&str, &str)] = match (app.input_mode, app.edit_target) {
        (InputMode::Editing, EditTarget::Query) => &[("Enter", "generate"), ("Esc", "cancel")],
        (InputMode::Editing, EditTarget::Source) => &[("^S", "compile now"), ("Esc", "done")],
        (InputMode::Normal, _) => match app.active_tab() {
            Tab::Output => &[("i", "query"), ("Tab", "next"), ("c", "copy"), ("q", "quit")],
            Tab::Typeset => &[("i", "edit"), ("b", "compile"), ("o", "open"), ("c", "copy"), ("q", "quit")],
            Tab::Logs => &[("r", "auto-refresh"), ("R", "refresh"), ("c", "copy"), ("q", "quit")],
            Tab::Summary | Tab::Artifacts => &[("j/k", "scroll"), ("Tab", "next"), ("c", "copy"), ("q", "quit")],
        },
    };

    let mut spans = vec![Span::styled(mode_text, mode_style), Span::raw(" ")];
    for (key, label) in hints {
        spans.push(Span::styled(format!(" {} ", key), key_style));
        spans.push(Span::styled(format!(" {} ", label), label_style));
    }
    if let Some(status) = &app.status {
        spans.push(Span::styled(format!("  {}", status), Style::default().fg(Color::Cyan)));
    }

    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}

fn format_size(bytes: usize) -> String {
    if bytes < 1024 {
        format!("{} B", bytes)
    } else {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    }
}

/// Parse a line of markdown and return styled spans.
/// Handles **bold** text and `# ` headings; everything else is literal.
fn parse_markdown_line(text: &str) -> Line<'static> {
    if let Some(heading) = text.strip_prefix('#') {
        let heading = heading.trim_start_matches('#').trim_start();
        return Line::styled(
            heading.to_string(),
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
        );
    }

    let mut spans: Vec<Span<'static>> = Vec::new();
    let mut chars = text.chars().peekable();
    let mut current_text = String::new();

    while let Some(c) = chars.next() {
        if c != '*' || chars.peek() != Some(&'*') {
            current_text.push(c);
            continue;
        }
        chars.next();

        let mut bold_text = String::new();
        let mut found_close = false;
        while let Some(c) = chars.next() {
            if c == '*' && chars.peek() == Some(&'*') {
                chars.next();
                found_close = true;
                break;
            }
            bold_text.push(c);
        }

        if found_close && !bold_text.is_empty() {
            if !current_text.is_empty() {
                spans.push(Span::raw(std::mem::take(&mut current_text)));
            }
            spans.push(Span::styled(bold_text, Style::default().add_modifier(Modifier::BOLD)));
        } else {
            // Unclosed, keep the asterisks
            current_text.push_str("**");
            current_text.push_str(&bold_text);
            if found_close {
                current_text.push_str("**");
            }
        }
    }

    if !current_text.is_empty() {
        spans.push(Span::raw(current_text));
    }

    if spans.is_empty() {
        Line::default()
    } else {
        Line::from(spans)
    }
}
