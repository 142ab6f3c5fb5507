use ratatui::{
    layout::{Constraint, Layout, Rect},
    style::{Color, Modifier, Style, Stylize},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Clear, List, ListItem, Paragraph, Tabs, Wrap},
    Frame,
};

use nexora_core::{ChatRole, ImageDataUri, Provider};

use crate::app::{App, InputMode, Tab};

/// Parse a line of text and convert **bold** markdown to styled spans
fn parse_markdown_line(text: &str) -> Line<'static> {
    let mut spans: Vec<Span<'static>> = Vec::new();
    let mut chars = text.chars().peekable();
    let mut current_text = String::new();

    while let Some(c) = chars.next() {
        if c == '*' && chars.peek() == Some(&'*') {
            // Consume the second *
            chars.next();

            // Find closing **
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
                spans.push(Span::styled(
                    bold_text,
                    Style::default().add_modifier(Modifier::BOLD),
                ));
            } else {
                // Unclosed or empty, treat as literal
                current_text.push_str("**");
                current_text.push_str(&bold_text);
                if found_close {
                    current_text.push_str("**");
                }
            }
        } else {
            current_text.push(c);
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

/// One line per text line, and at least one so empty bodies keep their row.
fn markdown_lines(text: &str) -> Vec<Line<'static>> {
    let lines: Vec<_> = text.lines().map(parse_markdown_line).collect();
    if lines.is_empty() {
        vec![Line::default()]
    } else {
        lines
    }
}

fn plain_lines(text: &str) -> Vec<Line<'static>> {
    let lines: Vec<_> = text.lines().map(|l| Line::from(l.to_string())).collect();
    if lines.is_empty() {
        vec![Line::default()]
    } else {
        lines
    }
}

fn format_bytes(bytes: usize) -> String {
    match bytes {
        b if b >= 1024 * 1024 => format!("{:.1} MB", b as f64 / (1024.0 * 1024.0)),
        b if b >= 1024 => format!("{:.1} KB", b as f64 / 1024.0),
        b => format!("{} B", b),
    }
}

fn describe_image(image: &ImageDataUri) -> String {
    format!("{} · {}", image.mime_type(), format_bytes(image.decoded_len()))
}

fn dots(app: &App) -> String {
    ".".repeat(app.animation_frame as usize + 1)
}

pub fn render(app: &mut App, frame: &mut Frame) {
    let area = frame.area();

    let notice_height = if app.notice.is_some() { 1 } else { 0 };
    let [header_area, tabs_area, body_area, notice_area, footer_area] = Layout::vertical([
        Constraint::Length(1),
        Constraint::Length(1),
        Constraint::Min(0),
        Constraint::Length(notice_height),
        Constraint::Length(1),
    ])
    .areas(area);

    render_header(app, frame, header_area);
    render_tabs(app, frame, tabs_area);

    match app.tab {
        Tab::Reasoning => render_reasoning_tab(app, frame, body_area),
        Tab::ImageGen => render_image_tab(app, frame, body_area),
        Tab::Chat => render_chat_tab(app, frame, body_area),
    }

    if notice_height > 0 {
        render_notice(app, frame, notice_area);
    }
    render_footer(app, frame, footer_area);

    // Render popups (in order of priority)
    if app.show_api_key_input {
        render_api_key_input(app, frame, area);
    } else if app.show_attach_input {
        render_attach_input(app, frame, area);
    } else if app.show_provider_picker {
        render_provider_picker(app, frame, area);
    } else if app.show_model_picker {
        render_model_picker(app, frame, area);
    }
}

fn render_header(app: &App, frame: &mut Frame, area: Rect) {
    let title = Line::from(vec![
        Span::styled(" NEX", Style::default().fg(Color::Cyan).bold()),
        Span::styled("ora ", Style::default().fg(Color::White).bold()),
        Span::styled(
            format!("{}: {} ", app.current_provider.display_name(), app.model_label()),
            Style::default().fg(Color::Gray),
        ),
        Span::styled(
            format!("v{}", env!("CARGO_PKG_VERSION")),
            Style::default().fg(Color::Black),
        ),
    ]);

    let header = Paragraph::new(title).style(Style::default().bg(Color::DarkGray));
    frame.render_widget(header, area);
}

fn render_tabs(app: &App, frame: &mut Frame, area: Rect) {
    let titles = Tab::all().into_iter().map(|tab| {
        let busy = if app.is_loading(tab) { " •" } else { "" };
        format!(" {} {}{} ", tab.index() + 1, tab.title(), busy)
    });

    let tabs = Tabs::new(titles)
        .select(app.tab.index())
        .style(Style::default().fg(Color::DarkGray))
        .highlight_style(Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD))
        .divider("|");
    frame.render_widget(tabs, area);
}

/// Single-line input with horizontal scrolling that keeps the cursor visible.
fn render_input(app: &App, frame: &mut Frame, area: Rect, title: &str, placeholder: &str) {
    let editing = app.input_mode == InputMode::Editing && !app.show_popup();
    let border_color = if editing { Color::Yellow } else { Color::DarkGray };

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color))
        .title(format!(" {} ", title));

    // Inner width = total width - 2 (for borders)
    let inner_width = area.width.saturating_sub(2) as usize;
    let text = app.active_input();
    let cursor_pos = app.cursor.min(text.chars().count());

    let scroll_offset = if inner_width == 0 {
        0
    } else if cursor_pos >= inner_width {
        cursor_pos - inner_width + 1
    } else {
        0
    };

    let input = if text.is_empty() && !editing {
        Paragraph::new(Span::styled(placeholder.to_string(), Style::default().fg(Color::DarkGray)))
    } else {
        let visible_text: String = text.chars().skip(scroll_offset).take(inner_width).collect();
        Paragraph::new(visible_text).style(Style::default().fg(Color::Cyan))
    };
    frame.render_widget(input.block(block), area);

    if editing {
        let cursor_x = (cursor_pos - scroll_offset) as u16;
        frame.set_cursor_position((area.x + cursor_x + 1, area.y + 1));
    }
}

/// Attachment and capture status line under an input.
fn attachment_line(app: &App, tab: Tab) -> Line<'static> {
    let mut spans = Vec::new();
    if let Some(image) = app.attached_image(tab) {
        spans.push(Span::styled(
            format!(" [image: {}] ", describe_image(image)),
            Style::default().fg(Color::Green),
        ));
        spans.push(Span::styled("x to remove ", Style::default().fg(Color::DarkGray)));
    }
    if app.camera_task.as_ref().is_some_and(|(target, _)| *target == tab) {
        spans.push(Span::styled(
            format!(" Capturing photo{} ", dots(app)),
            Style::default().fg(Color::Magenta).add_modifier(Modifier::ITALIC),
        ));
    }
    if app.is_listening() && app.voice_target == tab {
        spans.push(Span::styled(
            format!(" Listening{} (v to stop) ", dots(app)),
            Style::default().fg(Color::Red).add_modifier(Modifier::ITALIC),
        ));
    }
    Line::from(spans)
}

fn error_panel(message: &str) -> Paragraph<'static> {
    Paragraph::new(message.to_string())
        .style(Style::default().fg(Color::Red))
        .wrap(Wrap { trim: true })
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::Red))
                .title(" Error "),
        )
}

fn render_reasoning_tab(app: &mut App, frame: &mut Frame, area: Rect) {
    let [input_area, status_area, answer_area] = Layout::vertical([
        Constraint::Length(3),
        Constraint::Length(1),
        Constraint::Min(0),
    ])
    .areas(area);

    render_input(app, frame, input_area, "Question", "Ask a question, or attach an image (a)...");
    frame.render_widget(Paragraph::new(attachment_line(app, Tab::Reasoning)), status_area);

    let tab = &app.reasoning;
    if let Some(error) = &tab.error {
        frame.render_widget(error_panel(error), answer_area);
        return;
    }

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray))
        .title(" Answer ");

    let text = if tab.loading {
        Text::from(Span::styled(
            format!("Nexora is thinking{}", dots(app)),
            Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
        ))
    } else if let Some(answer) = &tab.answer {
        Text::from(markdown_lines(answer))
    } else {
        Text::from(Span::styled(
            "Answers appear here.",
            Style::default().fg(Color::DarkGray),
        ))
    };

    let answer = Paragraph::new(text).block(block).wrap(Wrap { trim: true });
    frame.render_widget(answer, answer_area);
}

fn render_image_tab(app: &mut App, frame: &mut Frame, area: Rect) {
    let [input_area, status_area, panel_area] = Layout::vertical([
        Constraint::Length(3),
        Constraint::Length(1),
        Constraint::Min(0),
    ])
    .areas(area);

    render_input(app, frame, input_area, "Prompt", "Describe the image you want...");
    frame.render_widget(Paragraph::new(attachment_line(app, Tab::ImageGen)), status_area);

    let tab = &app.image_gen;
    if let Some(error) = &tab.error {
        frame.render_widget(error_panel(error), panel_area);
        return;
    }

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray))
        .title(" Image ");

    let label = Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD);
    let text = if tab.loading {
        Text::from(Span::styled(
            format!("Generating image{}", dots(app)),
            Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
        ))
    } else if let Some(image) = &tab.image {
        let mut lines = vec![
            Line::from(vec![Span::styled("Prompt: ", label), Span::raw(tab.generated_for.clone())]),
            Line::from(vec![Span::styled("Type:   ", label), Span::raw(image.mime_type().to_string())]),
            Line::from(vec![
                Span::styled("Size:   ", label),
                Span::raw(format_bytes(image.decoded_len())),
            ]),
            Line::default(),
        ];
        match &tab.saved_path {
            Some(path) => lines.push(Line::from(vec![
                Span::styled("Saved:  ", label),
                Span::styled(path.display().to_string(), Style::default().fg(Color::Green)),
            ])),
            None => lines.push(Line::from(Span::styled(
                "Press s to download",
                Style::default().fg(Color::DarkGray),
            ))),
        }
        Text::from(lines)
    } else {
        Text::from(Span::styled(
            "Your generated image will appear here.",
            Style::default().fg(Color::DarkGray),
        ))
    };

    let panel = Paragraph::new(text).block(block).wrap(Wrap { trim: true });
    frame.render_widget(panel, panel_area);
}

fn render_chat_tab(app: &mut App, frame: &mut Frame, area: Rect) {
    let error_height = if app.chat.error.is_some() { 3 } else { 0 };
    let [chat_area, error_area, status_area, input_area] = Layout::vertical([
        Constraint::Min(0),
        Constraint::Length(error_height),
        Constraint::Length(1),
        Constraint::Length(3),
    ])
    .areas(area);

    // Store dimensions for scroll calculations (inner size minus borders)
    app.chat_area = Some(chat_area);
    app.chat_height = chat_area.height.saturating_sub(2);
    app.chat_width = chat_area.width.saturating_sub(2);

    let (users, bots) = app.chat_counts();
    let chat_block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray))
        .title(format!(" Chat ({} sent, {} received) ", users, bots));

    let chat_text = if app.chat.entries.is_empty() && !app.chat.loading {
        Text::from(Span::styled(
            "Start a conversation...",
            Style::default().fg(Color::DarkGray),
        ))
    } else {
        let mut lines: Vec<Line> = Vec::new();

        for entry in &app.chat.entries {
            match entry.message.role {
                ChatRole::User => {
                    lines.push(Line::from(Span::styled(
                        "You:",
                        Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
                    )));
                    if let Some(image) = &entry.message.image {
                        lines.push(Line::from(Span::styled(
                            format!("[image: {}]", describe_image(image)),
                            Style::default().fg(Color::Green),
                        )));
                    }
                    lines.extend(plain_lines(entry.display_text()));
                }
                ChatRole::Bot => {
                    lines.push(Line::from(Span::styled(
                        "Nexora:",
                        Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
                    )));
                    if entry.message.is_error {
                        lines.extend(
                            plain_lines(entry.display_text())
                                .into_iter()
                                .map(|line| line.style(Style::default().fg(Color::Red))),
                        );
                    } else {
                        lines.extend(markdown_lines(entry.display_text()));
                    }
                }
            }
            lines.push(Line::default());
        }

        if app.chat.loading {
            lines.push(Line::from(Span::styled(
                "Nexora:",
                Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
            )));
            // Animated ellipsis: cycles through ".", "..", "..."
            lines.push(Line::from(Span::styled(
                format!("Thinking{}", dots(app)),
                Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
            )));
        }

        Text::from(lines)
    };

    let chat = Paragraph::new(chat_text)
        .block(chat_block)
        .wrap(Wrap { trim: true })
        .scroll((app.chat_scroll, 0));
    frame.render_widget(chat, chat_area);

    if let Some(error) = &app.chat.error {
        frame.render_widget(error_panel(error), error_area);
    }
    frame.render_widget(Paragraph::new(attachment_line(app, Tab::Chat)), status_area);
    render_input(app, frame, input_area, "Message", "Type a message...");
}

fn render_notice(app: &App, frame: &mut Frame, area: Rect) {
    if let Some(notice) = &app.notice {
        let line = Line::from(vec![
            Span::styled(
                format!(" {} ", notice.title),
                Style::default().bg(Color::Yellow).fg(Color::Black).bold(),
            ),
            Span::styled(format!(" {} ", notice.message), Style::default().fg(Color::Yellow)),
            Span::styled("(any key to dismiss)", Style::default().fg(Color::DarkGray)),
        ]);
        frame.render_widget(Paragraph::new(line), area);
    }
}

fn render_footer(app: &App, frame: &mut Frame, area: Rect) {
    let mode_style = match app.input_mode {
        InputMode::Normal => Style::default().bg(Color::Blue).fg(Color::White),
        InputMode::Editing => Style::default().bg(Color::Yellow).fg(Color::Black),
    };
    let mode_text = match app.input_mode {
        InputMode::Normal => " NORMAL ",
        InputMode::Editing => " EDIT ",
    };

    // Key style: dark background with bright text for visibility on both light/dark terminals
    let key_style = Style::default().bg(Color::DarkGray).fg(Color::White);
    let label_style = Style::default().bg(Color::Black).fg(Color::White);
    let hint = |key: &'static str, label: &'static str| {
        [Span::styled(key, key_style), Span::styled(label, label_style)]
    };

    let mut hints: Vec<Span> = Vec::new();
    match app.input_mode {
        InputMode::Editing => {
            hints.extend(hint(" Enter ", " send "));
            hints.extend(hint(" Esc ", " stop typing "));
        }
        InputMode::Normal => {
            hints.extend(hint(" i ", " edit "));
            hints.extend(hint(" 1-3 ", " tab "));
            if app.tab.accepts_images() {
                hints.extend(hint(" a ", " attach "));
                if app.has_camera() {
                    hints.extend(hint(" c ", " camera "));
                }
            }
            if app.has_voice() {
                hints.extend(hint(" v ", if app.is_listening() { " stop voice " } else { " voice " }));
            }
            match app.tab {
                Tab::ImageGen if app.image_gen.image.is_some() => hints.extend(hint(" s ", " save ")),
                Tab::Chat => {
                    hints.extend(hint(" j/k ", " scroll "));
                    if app.chat.is_revealing() {
                        hints.extend(hint(" Space ", " skip "));
                    }
                }
                _ => {}
            }
            hints.extend(hint(" P ", " provider "));
            hints.extend(hint(" M ", " model "));
            hints.extend(hint(" q ", " quit "));
        }
    }

    let footer_content = Line::from(
        vec![Span::styled(mode_text, mode_style), Span::styled(" ", label_style)]
            .into_iter()
            .chain(hints)
            .collect::<Vec<_>>(),
    );

    let footer = Paragraph::new(footer_content).style(Style::default().bg(Color::Black));
    frame.render_widget(footer, area);
}

fn centered(area: Rect, width: u16, height: u16) -> Rect {
    let width = width.min(area.width.saturating_sub(4));
    let height = height.min(area.height.saturating_sub(4));
    let x = area.x + (area.width.saturating_sub(width)) / 2;
    let y = area.y + (area.height.saturating_sub(height)) / 2;
    Rect::new(x, y, width, height)
}

fn render_model_picker(app: &mut App, frame: &mut Frame, area: Rect) {
    let popup_area = centered(area, 50, app.available_models.len().max(1) as u16 + 2);
    frame.render_widget(Clear, popup_area);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan))
        .title(" Select Model (Enter to select, Esc to cancel) ");

    if app.available_models.is_empty() {
        let empty = Paragraph::new(" No models found ")
            .style(Style::default().fg(Color::DarkGray))
            .block(block);
        frame.render_widget(empty, popup_area);
        return;
    }

    let current = app.backend.as_ref().map(|b| b.reasoning_model().to_string());
    let items: Vec<ListItem> = app
        .available_models
        .iter()
        .map(|model| {
            let style = if Some(model) == current.as_ref() {
                Style::default().fg(Color::Green).add_modifier(Modifier::BOLD)
            } else {
                Style::default()
            };
            ListItem::new(format!(" {} ", model)).style(style)
        })
        .collect();

    let list = List::new(items)
        .block(block)
        .highlight_style(
            Style::default()
                .bg(Color::Blue)
                .fg(Color::White)
                .add_modifier(Modifier::BOLD),
        )
        .highlight_symbol("> ");

    frame.render_stateful_widget(list, popup_area, &mut app.model_picker_state);
}

fn render_provider_picker(app: &mut App, frame: &mut Frame, area: Rect) {
    let providers = Provider::all();
    let popup_area = centered(area, 56, providers.len() as u16 + 2);
    frame.render_widget(Clear, popup_area);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan))
        .title(" Select Provider ");

    let items: Vec<ListItem> = providers
        .iter()
        .map(|provider| {
            let key_source = app.get_key_source(*provider);
            let is_current = *provider == app.current_provider;

            let status = match key_source {
                Some("env") => "(env var)",
                Some("config") => "(configured)",
                Some("local") => "(local)",
                _ => "(needs key)",
            };
            let images = if provider.supports_images() { "" } else { " text only" };
            let prefix = if is_current { "* " } else { "  " };

            let style = if is_current {
                Style::default().fg(Color::Green).add_modifier(Modifier::BOLD)
            } else if key_source.is_some() {
                Style::default()
            } else {
                Style::default().fg(Color::DarkGray)
            };

            ListItem::new(format!("{}{} {}{}", prefix, provider.display_name(), status, images))
                .style(style)
        })
        .collect();

    let list = List::new(items)
        .block(block)
        .highlight_style(
            Style::default()
                .bg(Color::Blue)
                .fg(Color::White)
                .add_modifier(Modifier::BOLD),
        )
        .highlight_symbol("> ");

    frame.render_stateful_widget(list, popup_area, &mut app.provider_picker_state);
}

/// Mask a key with asterisks, showing the last 4 chars
fn mask_key(key: &str) -> String {
    let len = key.chars().count();
    if len <= 4 {
        "*".repeat(len)
    } else {
        let last_four: String = key.chars().skip(len - 4).collect();
        format!("{}...{}", "*".repeat((len - 4).min(20)), last_four)
    }
}

fn render_api_key_input(app: &App, frame: &mut Frame, area: Rect) {
    let provider_name = app
        .api_key_target_provider
        .map(|p| p.display_name())
        .unwrap_or("Provider");

    let popup_area = centered(area, 60, 7);
    frame.render_widget(Clear, popup_area);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Yellow))
        .title(format!(" Enter API Key for {} ", provider_name));

    let inner = block.inner(popup_area);
    frame.render_widget(block, popup_area);

    let instructions = Paragraph::new("Paste your API key below. Press Enter to save, Esc to cancel.")
        .style(Style::default().fg(Color::DarkGray));
    frame.render_widget(instructions, Rect::new(inner.x, inner.y, inner.width, 1));

    let input_area = Rect::new(inner.x, inner.y + 2, inner.width, 1);
    let input = Paragraph::new(mask_key(&app.api_key_input)).style(Style::default().fg(Color::Cyan));
    frame.render_widget(input, input_area);

    let cursor_x = app.api_key_input_cursor.min(input_area.width as usize) as u16;
    frame.set_cursor_position((input_area.x + cursor_x, input_area.y));

    let status = Paragraph::new(format!("{} characters", app.api_key_input.chars().count()))
        .style(Style::default().fg(Color::DarkGray));
    frame.render_widget(status, Rect::new(inner.x, inner.y + 4, inner.width, 1));
}

fn render_attach_input(app: &App, frame: &mut Frame, area: Rect) {
    let popup_area = centered(area, 70, 7);
    frame.render_widget(Clear, popup_area);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Yellow))
        .title(format!(" Attach Image to {} ", app.tab.title()));

    let inner = block.inner(popup_area);
    frame.render_widget(block, popup_area);

    let instructions = Paragraph::new("Path to an image file (max 4MB). Enter to attach, Esc to cancel.")
        .style(Style::default().fg(Color::DarkGray));
    frame.render_widget(instructions, Rect::new(inner.x, inner.y, inner.width, 1));

    let input_area = Rect::new(inner.x, inner.y + 2, inner.width, 1);
    let width = input_area.width as usize;
    let offset = (app.attach_input_cursor + 1).saturating_sub(width);
    let visible: String = app.attach_input.chars().skip(offset).take(width).collect();
    frame.render_widget(
        Paragraph::new(visible).style(Style::default().fg(Color::Cyan)),
        input_area,
    );
    let cursor_x = app.attach_input_cursor.saturating_sub(offset) as u16;
    frame.set_cursor_position((input_area.x + cursor_x, input_area.y));
}
