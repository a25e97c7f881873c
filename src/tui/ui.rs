use ratatui::{
    Frame,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, Paragraph, Wrap},
};

use super::app::App;
use super::msg::ViewKind;
use crate::renderer::Segment;
use crate::timeutil::{human_bytes, human_time};
use crate::types::File;

const ACCENT: Color = Color::Magenta;
const PRIVATE_MARKER: &str = "(p)";

pub fn draw(frame: &mut Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1), // Title
            Constraint::Min(3),    // Current view
            Constraint::Length(1), // Help bar
        ])
        .split(frame.area());

    draw_title(frame, app, chunks[0]);
    match app.current_view() {
        ViewKind::Browser => draw_browser(frame, app, chunks[1]),
        ViewKind::Code => draw_code(frame, app, chunks[1]),
        ViewKind::Prompt => draw_prompt(frame, app, chunks[1]),
    }
    draw_help(frame, app, chunks[2]);
}

fn draw_title(frame: &mut Frame, app: &App, area: Rect) {
    let user = format!("u:{} ", app.user_id);
    let name = " snips.sh";
    let padding = usize::from(area.width).saturating_sub(name.len() + user.len());

    let title = Line::from(vec![
        Span::styled(name, Style::default().fg(ACCENT).add_modifier(Modifier::BOLD)),
        Span::raw(" ".repeat(padding)),
        Span::styled(user, Style::default().fg(Color::DarkGray)),
    ]);
    frame.render_widget(Paragraph::new(title), area);
}

fn border() -> Block<'static> {
    Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray))
}

fn draw_browser(frame: &mut Frame, app: &App, area: Rect) {
    let (list_area, side_area) = if app.show_details() {
        let columns = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(55), Constraint::Percentage(45)])
            .split(area);
        (columns[0], Some(columns[1]))
    } else {
        (area, None)
    };

    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(3), Constraint::Length(1)])
        .split(list_area);
    draw_file_list(frame, app, rows[0]);

    let footer = if app.browser.files.is_empty() {
        String::new()
    } else {
        format!(" {}/{} files", app.browser.selected + 1, app.browser.files.len())
    };
    frame.render_widget(
        Paragraph::new(Span::styled(footer, Style::default().fg(Color::DarkGray))),
        rows[1],
    );

    match (side_area, app.browser.selected_file()) {
        (Some(side), Some(file)) => {
            let options_height = app.browser.options().len() as u16 + 2;
            let parts = Layout::default()
                .direction(Direction::Vertical)
                .constraints([Constraint::Min(3), Constraint::Length(options_height)])
                .split(side);
            draw_details(frame, app, file, parts[0]);
            draw_options(frame, app, parts[1]);
        }
        (None, Some(_)) if app.browser.options_focused => {
            let options_height = app.browser.options().len() as u16 + 2;
            let overlay = Rect {
                y: area.bottom().saturating_sub(options_height),
                height: options_height.min(area.height),
                ..area
            };
            frame.render_widget(ratatui::widgets::Clear, overlay);
            draw_options(frame, app, overlay);
        }
        _ => {}
    }
}

fn file_row(file: &File, selected: bool) -> ListItem<'static> {
    let private = if file.private { PRIVATE_MARKER } else { "" };
    let text = format!(
        "{:<10} {:>9}  {:<16} {:<12} {}",
        file.id,
        human_bytes(file.size),
        human_time(file.updated_at),
        file.file_type,
        private
    );

    let style = if selected {
        Style::default().fg(Color::White).bg(ACCENT).add_modifier(Modifier::BOLD)
    } else {
        Style::default()
    };
    ListItem::new(Line::from(Span::styled(text, style)))
}

fn draw_file_list(frame: &mut Frame, app: &App, area: Rect) {
    let browser = &app.browser;

    if browser.files.is_empty() {
        let empty = Paragraph::new(vec![
            Line::from(""),
            Line::from(Span::styled("No files found", Style::default().fg(Color::DarkGray))),
            Line::from(""),
            Line::from(Span::styled(
                format!("Upload one with: echo hello | ssh {}", ssh_host(app)),
                Style::default().fg(Color::DarkGray),
            )),
        ])
        .block(border())
        .alignment(Alignment::Center);
        frame.render_widget(empty, area);
        return;
    }

    let header = format!(
        " {:<10} {:>9}  {:<16} {:<12} ",
        "ID", "Size", "Modified", "Type"
    );

    // Keep the selection on screen.
    let visible = usize::from(area.height.saturating_sub(2)).max(1);
    let start = browser.selected.saturating_sub(visible - 1);

    let items: Vec<ListItem> = browser
        .files
        .iter()
        .enumerate()
        .skip(start)
        .take(visible)
        .map(|(idx, file)| file_row(file, idx == browser.selected && !browser.options_focused))
        .collect();

    let list = List::new(items).block(border().title(Span::styled(
        header,
        Style::default().add_modifier(Modifier::BOLD),
    )));
    frame.render_widget(list, area);
}

fn ssh_host(app: &App) -> String {
    let host = app.config.ssh.external.host_str().unwrap_or("localhost");
    match app.config.ssh.external.port() {
        Some(port) if port != 22 => format!("{host} -p {port}"),
        _ => host.to_string(),
    }
}

fn detail(label: &str, value: String) -> Line<'static> {
    Line::from(vec![
        Span::styled(format!("{label:<11}"), Style::default().fg(Color::DarkGray)),
        Span::raw(value),
    ])
}

fn draw_details(frame: &mut Frame, app: &App, file: &File, area: Rect) {
    let url = if file.private {
        "<none> (requires a signed URL)".to_string()
    } else {
        app.config.http_address_for_file(&file.id).to_string()
    };

    let lines = vec![
        detail("ID", file.id.clone()),
        detail("Size", human_bytes(file.size)),
        detail("Created", human_time(file.created_at)),
        detail("Modified", human_time(file.updated_at)),
        detail("Type", file.file_type.clone()),
        detail("Visibility", file.visibility().to_string()),
        Line::from(""),
        detail("URL", url),
        detail("SSH", app.config.ssh_command_for_file(&file.id)),
    ];

    let details = Paragraph::new(lines)
        .block(border().title(" Details "))
        .wrap(Wrap { trim: false });
    frame.render_widget(details, area);
}

fn draw_options(frame: &mut Frame, app: &App, area: Rect) {
    let browser = &app.browser;
    let items: Vec<ListItem> = browser
        .options()
        .into_iter()
        .enumerate()
        .map(|(idx, option)| {
            let selected = browser.options_focused && idx == browser.option_index;
            let mut style = if option.is_dangerous() {
                Style::default().fg(Color::Red)
            } else {
                Style::default()
            };
            if selected {
                style = style.add_modifier(Modifier::REVERSED | Modifier::BOLD);
            }
            let cursor = if selected { "> " } else { "  " };
            ListItem::new(Span::styled(format!("{cursor}{}", option.label()), style))
        })
        .collect();

    let border_color = if browser.options_focused { ACCENT } else { Color::DarkGray };
    let list = List::new(items).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(border_color))
            .title(" Options "),
    );
    frame.render_widget(list, area);
}

fn to_span(segment: &Segment) -> Span<'static> {
    let mut style = Style::default();
    if let Some(fg) = segment.style.fg {
        style = style.fg(Color::Indexed(fg));
    }
    if let Some(bg) = segment.style.bg {
        style = style.bg(Color::Indexed(bg));
    }
    if segment.style.bold {
        style = style.add_modifier(Modifier::BOLD);
    }
    if segment.style.italic {
        style = style.add_modifier(Modifier::ITALIC);
    }
    if segment.style.underline {
        style = style.add_modifier(Modifier::UNDERLINED);
    }
    Span::styled(segment.text.clone(), style)
}

fn draw_code(frame: &mut Frame, app: &App, area: Rect) {
    let Some(code) = &app.code else {
        let loading = Paragraph::new(Span::styled("Loading...", Style::default().fg(Color::Yellow)))
            .block(border())
            .alignment(Alignment::Center);
        frame.render_widget(loading, area);
        return;
    };

    let gutter = code.lines.len().to_string().len();
    let visible = usize::from(area.height.saturating_sub(2));
    let lines: Vec<Line> = code
        .lines
        .iter()
        .enumerate()
        .skip(app.code_offset)
        .take(visible)
        .map(|(idx, segments)| {
            let mut spans = vec![Span::styled(
                format!("{:>gutter$} ", idx + 1),
                Style::default().fg(Color::DarkGray),
            )];
            spans.extend(segments.iter().map(to_span));
            Line::from(spans)
        })
        .collect();

    let title = format!(
        " {} · {} · {} ",
        code.file.id,
        code.file.file_type,
        human_bytes(code.file.size)
    );
    let style = if code.file.is_binary() {
        Style::default().fg(Color::DarkGray)
    } else {
        Style::default()
    };
    frame.render_widget(
        Paragraph::new(lines).style(style).block(border().title(title)),
        area,
    );

    if code.file.is_binary() && area.height > 4 {
        let hint = Rect {
            y: area.y + 2,
            height: 1,
            ..area.inner(ratatui::layout::Margin::new(1, 0))
        };
        frame.render_widget(
            Paragraph::new(Span::styled(
                "Use the web view or `cat` over ssh to download it.",
                Style::default().fg(Color::DarkGray),
            )),
            hint,
        );
    }
}

fn draw_prompt(frame: &mut Frame, app: &App, area: Rect) {
    let prompt = &app.prompt;
    let mut lines = vec![
        Line::from(Span::styled(
            prompt.question(),
            Style::default().add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
    ];

    if let Some(feedback) = &prompt.feedback {
        for line in feedback.lines() {
            lines.push(Line::from(Span::styled(
                line.to_string(),
                Style::default().fg(Color::Green),
            )));
        }
    } else {
        lines.push(Line::from(vec![
            Span::styled("> ", Style::default().fg(ACCENT)),
            Span::raw(prompt.input.clone()),
            Span::styled("█", Style::default().fg(Color::DarkGray)),
        ]));
    }

    if let Some(error) = &prompt.error {
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(
            error.clone(),
            Style::default().fg(Color::Red),
        )));
    }
    if prompt.pending {
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(
            "Working...",
            Style::default().fg(Color::Yellow),
        )));
    }

    let paragraph = Paragraph::new(lines)
        .block(border().title(" snips.sh "))
        .wrap(Wrap { trim: false });
    frame.render_widget(paragraph, area);
}

fn draw_help(frame: &mut Frame, app: &App, area: Rect) {
    let help = match app.current_view() {
        ViewKind::Browser if app.browser.options_focused => {
            "j/k: choose  enter: select  tab/esc: back  q: quit"
        }
        ViewKind::Browser => "j/k: move  h/l: page  enter: view  tab: options  q: quit",
        ViewKind::Code => "j/k: scroll  g/G: top/bottom  esc: back  q: quit",
        ViewKind::Prompt if app.prompt.finished => "enter: back  esc: back  ctrl+c: quit",
        ViewKind::Prompt => "enter: submit  esc: cancel  ctrl+c: quit",
    };
    frame.render_widget(
        Paragraph::new(Span::styled(format!(" {help}"), Style::default().fg(Color::DarkGray))),
        area,
    );
}
