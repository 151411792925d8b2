use anyhow::Result;
use ratatui::backend::Backend;
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::symbols::line::NORMAL as LINE;
use ratatui::text::{Line, Span, Text};
use ratatui::widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph, Wrap};
use ratatui::{Frame, Terminal};
// Use Popup from tui-widgets to render modals
use tui_widgets::popup::Popup;

use crate::config::RgbColor;
use crate::controller::{DetailState, FormMode, FormState};
use crate::model::{format_timestamp, Record};
use crate::notify::ToastKind;
use crate::remote::RecordStore;

use super::app::App;
use super::panes::Focus;

const LIST_HELP: &str = "/: search  Enter: view  a: add  e: edit  d: delete  r: refresh  ?: help  q: quit";
const SEARCH_HELP: &str = "Type to filter  Up/Down: move  Enter/Esc: back to list";
const FORM_HELP: &str = "Tab/Shift-Tab: field  Enter: save  Esc: cancel";
const DETAIL_HELP: &str = "e: edit  Esc/q: close";
const HELP_MODAL_FOOTER: &str = "j/k: scroll  Esc/q: close";
const NAME_WIDTH: usize = 32;
const FORM_LABEL_WIDTH: usize = 14;

pub fn render<B: Backend, S: RecordStore>(terminal: &mut Terminal<B>, app: &mut App<'_, S>) -> Result<()> {
    terminal.draw(|frame| draw_frame(frame, app))?;
    Ok(())
}

fn draw_frame<S: RecordStore>(frame: &mut Frame<'_>, app: &mut App<'_, S>) {
    let size = frame.area();
    let layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Min(0),
            Constraint::Length(1),
        ])
        .split(size);

    draw_header(frame, layout[0], app);
    draw_contacts(frame, layout[1], app);
    draw_footer(frame, layout[2], app);
    draw_detail_modal(frame, size, app);
    draw_form_modal(frame, size, app);
    draw_help_modal(frame, size, app);
    draw_toasts(frame, layout[1], app);
}

fn draw_header<S: RecordStore>(frame: &mut Frame<'_>, area: Rect, app: &App<'_, S>) {
    let header_style = header_text_style(app);
    let list = app.controller.list();
    let mut spans = vec![
        Span::styled(format!("ROLO://{}", app.base_url()), header_style),
        Span::raw("   "),
        Span::styled(
            format!("{}/{} contacts", list.view().len(), list.canonical().len()),
            header_style,
        ),
    ];

    if app.controller.is_loading() {
        spans.push(Span::raw("   "));
        spans.push(Span::styled("LOADING", selection_style(app)));
    } else if let Some(err) = app.controller.last_refresh_error() {
        spans.push(Span::raw("   "));
        spans.push(Span::styled(format!("OFFLINE: {}", err), error_style(app)));
    }

    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}

fn draw_contacts<S: RecordStore>(frame: &mut Frame<'_>, area: Rect, app: &App<'_, S>) {
    let title = Line::from(Span::styled(app.focus.title(), header_text_style(app)));
    let block = Block::default()
        .borders(Borders::ALL)
        .title(title)
        .border_style(border_style(app));
    let inner = block.inner(area);
    frame.render_widget(block, area);

    if inner.width == 0 || inner.height == 0 {
        return;
    }

    let layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(2), Constraint::Min(0)])
        .split(inner);

    draw_search_header(frame, layout[0], app, area.width);
    draw_contact_list(frame, layout[1], app);
}

fn draw_search_header<S: RecordStore>(frame: &mut Frame<'_>, area: Rect, app: &App<'_, S>, outer_width: u16) {
    if area.width == 0 || area.height == 0 {
        return;
    }

    let active = app.focus == Focus::Search
        && app.controller.form().is_none()
        && app.controller.detail().is_none()
        && app.help_modal.is_none();
    let label = "SEARCH: ";
    let value_style = if active {
        selection_style(app)
    } else {
        Style::default()
    };
    let line = Line::from(vec![
        Span::styled(label, header_text_style(app)),
        Span::styled(app.controller.list().query().to_string(), value_style),
    ]);

    let parts = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(1), Constraint::Length(1)])
        .split(area);

    frame.render_widget(Paragraph::new(line), parts[0]);

    if active {
        let column = Span::raw(label).width() + app.search_input.visual_cursor();
        let x = parts[0].x.saturating_add(column as u16);
        frame.set_cursor_position((x, parts[0].y));
    }

    // Build separator with connector characters: ├───┤
    let inner_width = outer_width.saturating_sub(2) as usize;
    let separator = format!(
        "{}{}{}",
        LINE.vertical_right,
        LINE.horizontal.to_string().repeat(inner_width),
        LINE.vertical_left
    );
    let separator_line = Line::from(Span::styled(separator, separator_style(app)));

    // Shifted left by 1 to start at the border
    let separator_area = Rect {
        x: parts[1].x.saturating_sub(1),
        y: parts[1].y,
        width: outer_width,
        height: 1,
    };
    frame.render_widget(Paragraph::new(separator_line), separator_area);
}

fn draw_contact_list<S: RecordStore>(frame: &mut Frame<'_>, area: Rect, app: &App<'_, S>) {
    let list = app.controller.list();
    let items: Vec<ListItem> = if list.view().is_empty() {
        let message = if app.controller.is_loading() {
            "Loading contacts..."
        } else if list.canonical().is_empty() {
            "No contacts"
        } else {
            "No matches"
        };
        vec![ListItem::new(Line::from(message))]
    } else {
        list.view()
            .iter()
            .map(|record| build_contact_item(record, app))
            .collect()
    };

    let mut state = ListState::default();
    state.select(list.selected());

    let list = List::new(items)
        .highlight_style(selection_style(app))
        .highlight_symbol(" ")
        .repeat_highlight_symbol(false);

    frame.render_stateful_widget(list, area, &mut state);
}

fn build_contact_item<S: RecordStore>(record: &Record, app: &App<'_, S>) -> ListItem<'static> {
    let name = format!("{:<width$}", record.display_name(), width = NAME_WIDTH);
    let mut spans = vec![
        Span::raw(name),
        Span::raw(record.email.clone().unwrap_or_default()),
    ];
    if app.controller.is_deleting(&record.id) {
        spans.push(Span::styled("  (deleting)", header_text_style(app)));
    }
    ListItem::new(Line::from(spans))
}

fn draw_footer<S: RecordStore>(frame: &mut Frame<'_>, area: Rect, app: &App<'_, S>) {
    let message: String = if app.help_modal.is_some() {
        HELP_MODAL_FOOTER.to_string()
    } else if app.controller.form().is_some() {
        FORM_HELP.to_string()
    } else if app.controller.detail().is_some() {
        DETAIL_HELP.to_string()
    } else if app.focus == Focus::Search {
        SEARCH_HELP.to_string()
    } else {
        match &app.status {
            Some(status) => format!("{}  |  {}", status, LIST_HELP),
            None => LIST_HELP.to_string(),
        }
    };
    let colors = app.ui_colors();
    let style = Style::default()
        .fg(color(colors.status_fg))
        .bg(color(colors.status_bg));

    let background = Block::default().style(Style::default().bg(color(colors.status_bg)));
    frame.render_widget(background, area);

    frame.render_widget(Paragraph::new(message).style(style), area);
}

// =============================================================================
// Modals
// =============================================================================

fn draw_detail_modal<S: RecordStore>(frame: &mut Frame<'_>, area: Rect, app: &mut App<'_, S>) {
    let Some(detail) = app.controller.detail() else {
        return;
    };

    let header_style = header_text_style(app);
    let lines: Vec<Line> = match detail {
        DetailState::Loading { id } => vec![Line::from(format!("Loading {}...", id))],
        DetailState::Loaded(record) => detail_lines(record, header_style),
        DetailState::Failed { message, .. } => vec![
            Line::from(Span::styled(
                format!("Could not load contact: {}", message),
                error_style(app),
            )),
        ],
    };

    let mut lines = lines;
    lines.push(Line::from(""));
    lines.push(Line::from(DETAIL_HELP));

    let title_line = Line::from(Span::styled("CONTACT", header_style));
    let popup = Popup::new(Text::from(lines))
        .title(title_line)
        .border_style(border_style(app));

    frame.render_stateful_widget_ref(popup, area, &mut app.modal_popup);
}

fn detail_lines(record: &Record, label_style: Style) -> Vec<Line<'static>> {
    let timestamp = |value: &Option<String>| {
        value
            .as_deref()
            .map(format_timestamp)
            .unwrap_or_default()
    };
    let name = match record.title.as_deref().filter(|title| !title.is_empty()) {
        Some(title) => format!("{} {}", title, record.display_name()),
        None => record.display_name(),
    };

    let rows = [
        ("Name", name),
        ("Email", record.email.clone().unwrap_or_default()),
        ("Phone", record.phone.clone().unwrap_or_default()),
        ("Picture", record.picture.clone().unwrap_or_default()),
        ("Registered", timestamp(&record.register_date)),
        ("Updated", timestamp(&record.updated_date)),
        ("Id", record.id.clone()),
    ];

    rows.into_iter()
        .map(|(label, value)| {
            Line::from(vec![
                Span::styled(format!("{:<12}", format!("{}:", label)), label_style),
                Span::raw(value),
            ])
        })
        .collect()
}

fn draw_form_modal<S: RecordStore>(frame: &mut Frame<'_>, area: Rect, app: &App<'_, S>) {
    let Some(form) = app.controller.form() else {
        return;
    };

    let field_count = form.fields().len() as u16;
    // Label line + error line per field, blank + help, borders
    let height = (field_count * 2 + 4).min(area.height);
    let width = area.width.saturating_mul(2).saturating_div(3).max(50).min(area.width);
    let x = area.x + (area.width.saturating_sub(width)) / 2;
    let y = area.y + (area.height.saturating_sub(height)) / 2;
    let modal_area = Rect::new(x, y, width, height);

    frame.render_widget(Clear, modal_area);

    let title = Line::from(Span::styled(form.mode.title().to_uppercase(), header_text_style(app)));
    let block = Block::default()
        .borders(Borders::ALL)
        .title(title)
        .border_style(border_style(app));
    let inner = block.inner(modal_area);
    frame.render_widget(block, modal_area);

    let (lines, cursor) = form_lines(form, app);
    frame.render_widget(Paragraph::new(lines), inner);

    if let Some((row, column)) = cursor {
        if row < inner.height {
            frame.set_cursor_position((inner.x.saturating_add(column as u16), inner.y + row));
        }
    }
}

/// Form body plus the (row, column) of the editing cursor.
fn form_lines<S: RecordStore>(form: &FormState, app: &App<'_, S>) -> (Vec<Line<'static>>, Option<(u16, usize)>) {
    let mut lines = Vec::new();
    let mut cursor = None;
    let focused = form.focused();

    for &field in form.fields() {
        let highlight = field == focused && !form.submitting();
        let label = format!(
            "{:width$} ",
            format!("{}:", field.label()),
            width = FORM_LABEL_WIDTH
        );
        let (label_style, value_style) = line_styles(app, highlight);

        let editing = highlight && app.editor.active && app.editor.target() == Some(field);
        let value = if editing {
            cursor = Some((
                lines.len() as u16,
                Span::raw(&label).width() + app.editor.visual_cursor(),
            ));
            app.editor.value().to_string()
        } else {
            form.value(field).to_string()
        };

        let mut spans = vec![
            Span::styled(label, label_style),
            Span::styled(value, value_style),
        ];
        if !form.is_editable(field) {
            spans.push(Span::styled(
                "  (read-only)",
                header_text_style(app).add_modifier(Modifier::DIM),
            ));
        }
        lines.push(Line::from(spans));

        let error = form.errors.get(field).unwrap_or("").to_string();
        lines.push(Line::from(Span::styled(
            format!("{:width$} {}", "", error, width = FORM_LABEL_WIDTH),
            error_style(app),
        )));
    }

    lines.push(Line::from(""));
    let footer = if form.submitting() {
        match form.mode {
            FormMode::Create => "Creating contact...",
            FormMode::Edit { .. } => "Updating contact...",
        }
    } else {
        FORM_HELP
    };
    lines.push(Line::from(Span::styled(footer, header_text_style(app))));

    (lines, cursor)
}

fn draw_help_modal<S: RecordStore>(frame: &mut Frame<'_>, area: Rect, app: &mut App<'_, S>) {
    if app.help_modal.is_none() {
        return;
    }

    let width = area.width.saturating_mul(2).saturating_div(3).max(40).min(area.width);
    let height = area.height.saturating_mul(4).saturating_div(5).max(10).min(area.height);
    let x = area.x + (area.width.saturating_sub(width)) / 2;
    let y = area.y + (area.height.saturating_sub(height)) / 2;
    let modal_area = Rect::new(x, y, width, height);

    frame.render_widget(Clear, modal_area);

    let header_style = header_text_style(app);
    let border = border_style(app);

    let sections = app.help_entries();
    let content_width = width.saturating_sub(4) as usize;
    let action_width = 20usize;
    let mut lines: Vec<Line> = Vec::new();

    for (section_idx, section) in sections.iter().enumerate() {
        let header_text = format!(" {} ", section.title);
        let padding_total = content_width.saturating_sub(header_text.len());
        let left_pad = padding_total / 2;
        let right_pad = padding_total - left_pad;
        let header_line = format!(
            "{}{}{}",
            LINE.horizontal.to_string().repeat(left_pad),
            header_text,
            LINE.horizontal.to_string().repeat(right_pad)
        );
        lines.push(Line::from(Span::styled(header_line, header_style)));

        for entry in &section.entries {
            lines.push(Line::from(vec![
                Span::raw(format!("{:<width$}", entry.action, width = action_width)),
                Span::styled(entry.keys, header_style),
            ]));
        }

        if section_idx + 1 < sections.len() {
            lines.push(Line::from(""));
        }
    }

    if let Some(path) = &app.log_path {
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(
            format!("Log file: {}", path.display()),
            header_style,
        )));
    }

    let total_lines = lines.len();
    // borders (2) + footer line (1)
    let inner_height = height.saturating_sub(3) as usize;

    let Some(modal) = app.help_modal.as_mut() else {
        return;
    };
    modal.total_lines = total_lines;
    modal.viewport_height = inner_height;
    let max_scroll = total_lines.saturating_sub(inner_height);
    if modal.scroll > max_scroll {
        modal.scroll = max_scroll;
    }

    let visible: Vec<Line> = lines
        .into_iter()
        .skip(modal.scroll)
        .take(inner_height)
        .collect();

    let block = Block::default()
        .borders(Borders::ALL)
        .title(Line::from(Span::styled("HELP", header_style)))
        .border_style(border);
    let inner = block.inner(modal_area);
    frame.render_widget(block, modal_area);

    let parts = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(0), Constraint::Length(1)])
        .split(inner);

    frame.render_widget(Paragraph::new(visible), parts[0]);
    frame.render_widget(
        Paragraph::new(HELP_MODAL_FOOTER)
            .style(header_style)
            .alignment(Alignment::Center),
        parts[1],
    );
}

/// Stack toasts in the top-right corner, oldest on top.
fn draw_toasts<S: RecordStore>(frame: &mut Frame<'_>, area: Rect, app: &App<'_, S>) {
    let toasts = app.controller.sink().visible();
    let width = area.width.saturating_div(2).max(30).min(area.width);
    let mut y = area.y;

    for toast in toasts {
        let height = 3;
        if y + height > area.y + area.height {
            break;
        }
        let toast_area = Rect::new(area.x + area.width - width, y, width, height);
        let accent = match toast.kind {
            ToastKind::Success => color(app.ui_colors().success),
            ToastKind::Error => color(app.ui_colors().error),
        };

        frame.render_widget(Clear, toast_area);
        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(accent));
        frame.render_widget(
            Paragraph::new(toast.message)
                .block(block)
                .style(Style::default().fg(accent))
                .wrap(Wrap { trim: true }),
            toast_area,
        );
        y += height;
    }
}

// =============================================================================
// Styles
// =============================================================================

fn line_styles<S: RecordStore>(app: &App<'_, S>, highlight: bool) -> (Style, Style) {
    if highlight {
        let style = selection_style(app);
        (style, style)
    } else {
        (header_text_style(app), Style::default())
    }
}

fn selection_style<S: RecordStore>(app: &App<'_, S>) -> Style {
    let colors = app.ui_colors();
    Style::default()
        .fg(color(colors.selection_fg))
        .bg(color(colors.selection_bg))
}

fn border_style<S: RecordStore>(app: &App<'_, S>) -> Style {
    Style::default().fg(color(app.ui_colors().border))
}

fn header_text_style<S: RecordStore>(app: &App<'_, S>) -> Style {
    Style::default().fg(color(app.ui_colors().separator))
}

fn separator_style<S: RecordStore>(app: &App<'_, S>) -> Style {
    Style::default().fg(color(app.ui_colors().separator))
}

fn error_style<S: RecordStore>(app: &App<'_, S>) -> Style {
    Style::default().fg(color(app.ui_colors().error))
}

fn color(rgb: RgbColor) -> Color {
    Color::Rgb(rgb.r, rgb.g, rgb.b)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detail_lines_format_dates() {
        let record = Record {
            id: "60d0fe4f5311236168a109ca".into(),
            title: Some("ms".into()),
            first_name: "Sara".into(),
            last_name: "Andersen".into(),
            email: Some("sara@x.com".into()),
            phone: None,
            picture: None,
            register_date: Some("2021-06-21T21:02:07.374Z".into()),
            updated_date: None,
        };
        let lines = detail_lines(&record, Style::default());
        let text: Vec<String> = lines.iter().map(|line| line.to_string()).collect();
        assert_eq!(text[0], "Name:       ms Sara Andersen");
        assert_eq!(text[4], "Registered: 2021-06-21 21:02 UTC");
        assert_eq!(text[6], "Id:         60d0fe4f5311236168a109ca");
    }
}
