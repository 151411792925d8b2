use std::io::stdout;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use crossterm::ExecutableCommand;
use ratatui::backend::CrosstermBackend;
use ratatui::Terminal;
use tokio::runtime::Handle;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::debug;
use tui_input::backend::crossterm::EventHandler;
use tui_input::Input;
use tui_widgets::popup::PopupState;

use crate::config::{Config, UiColors};
use crate::controller::{execute, Completion, OperationError, RecordListController, Request};
use crate::notify::Toasts;
use crate::remote::RecordStore;

use super::draw;
use super::edit::InlineEditor;
use super::panes::Focus;

const PAGE: isize = 10;

pub struct HelpModal {
    /// Line index at top of viewport
    pub scroll: usize,
    pub total_lines: usize,
    /// Set during rendering
    pub viewport_height: usize,
}

impl HelpModal {
    pub fn new(total_lines: usize) -> Self {
        Self {
            scroll: 0,
            total_lines,
            viewport_height: 10,
        }
    }

    pub fn scroll_down(&mut self, lines: usize) {
        let max_scroll = self.total_lines.saturating_sub(self.viewport_height);
        self.scroll = (self.scroll + lines).min(max_scroll);
    }

    pub fn scroll_up(&mut self, lines: usize) {
        self.scroll = self.scroll.saturating_sub(lines);
    }
}

pub struct HelpSection {
    pub title: &'static str,
    pub entries: Vec<HelpEntry>,
}

pub struct HelpEntry {
    pub action: &'static str,
    pub keys: &'static str,
}

pub struct App<'a, S: RecordStore + 'static> {
    config: &'a Config,
    pub controller: RecordListController<S, Toasts>,
    runtime: Handle,
    completions_tx: UnboundedSender<Completion>,
    completions_rx: UnboundedReceiver<Completion>,
    pub search_input: Input,
    pub focus: Focus,
    pub editor: InlineEditor,
    pub status: Option<String>,
    pub help_modal: Option<HelpModal>,
    // Popup state for the detail modal (tui-widgets popup)
    pub modal_popup: PopupState,
    pub log_path: Option<PathBuf>,
}

impl<'a, S: RecordStore + 'static> App<'a, S> {
    /// Build the app and issue the startup refresh.
    pub fn new(config: &'a Config, store: Arc<S>, runtime: Handle, log_path: Option<PathBuf>) -> Self {
        let toasts = Toasts::new(Duration::from_millis(config.toast_ms));
        let controller = RecordListController::new(
            store,
            toasts,
            config.page_size,
            config.default_picture.clone(),
        );
        let (completions_tx, completions_rx) = mpsc::unbounded_channel();

        let mut app = Self {
            config,
            controller,
            runtime,
            completions_tx,
            completions_rx,
            search_input: Input::default(),
            focus: Focus::List,
            editor: InlineEditor::default(),
            status: None,
            help_modal: None,
            modal_popup: PopupState::default(),
            log_path,
        };
        app.refresh();
        app
    }

    pub fn run(&mut self) -> Result<()> {
        enable_raw_mode()?;
        let mut stdout = stdout();
        stdout.execute(EnterAlternateScreen)?;
        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend)?;
        terminal.clear()?;

        let result = self.event_loop(&mut terminal);

        disable_raw_mode()?;
        terminal.backend_mut().execute(LeaveAlternateScreen)?;
        terminal.show_cursor()?;

        result
    }

    fn event_loop<B>(&mut self, terminal: &mut Terminal<B>) -> Result<()>
    where
        B: ratatui::backend::Backend,
    {
        loop {
            self.drain_completions();
            self.controller.sink().prune();
            draw::render(terminal, self)?;

            if event::poll(Duration::from_millis(100))? {
                match event::read()? {
                    Event::Key(key) if key.kind == KeyEventKind::Press => {
                        if self.handle_key(key)? {
                            break;
                        }
                    }
                    _ => {}
                }
            }
        }
        Ok(())
    }

    // =========================================================================
    // Store requests
    // =========================================================================

    /// Run `request` on the runtime; the completion comes back through the channel.
    fn dispatch(&self, request: Request) {
        debug!(?request, "dispatching");
        let store = Arc::clone(self.controller.store());
        let tx = self.completions_tx.clone();
        self.runtime.spawn(async move {
            let completion = execute(store.as_ref(), request).await;
            // Receiver is gone only after the UI exits.
            let _ = tx.send(completion);
        });
    }

    pub fn drain_completions(&mut self) {
        while let Ok(completion) = self.completions_rx.try_recv() {
            self.apply(completion);
        }
    }

    fn apply(&mut self, completion: Completion) {
        let settled = self.controller.complete(completion);
        if let Some(follow_up) = settled.follow_up {
            self.dispatch(follow_up);
        }
        if settled.result.is_ok() && self.controller.form().is_none() {
            self.editor.cancel();
        }
    }

    fn refresh(&mut self) {
        let request = self.controller.refresh_request();
        self.dispatch(request);
    }

    // =========================================================================
    // Key handling
    // =========================================================================

    fn handle_key(&mut self, key: KeyEvent) -> Result<bool> {
        // Ctrl+C always quits
        if key.modifiers.contains(KeyModifiers::CONTROL)
            && matches!(key.code, KeyCode::Char('c') | KeyCode::Char('C'))
        {
            return Ok(true);
        }

        if self.help_modal.is_some() {
            self.handle_help_modal_key(key);
            return Ok(false);
        }

        if self.controller.form().is_some() {
            self.handle_form_key(key);
            return Ok(false);
        }

        if self.controller.detail().is_some() {
            self.handle_detail_key(key);
            return Ok(false);
        }

        match self.focus {
            Focus::Search => {
                self.handle_search_key(key);
                Ok(false)
            }
            Focus::List => Ok(self.handle_list_key(key)),
        }
    }

    /// Returns true to quit.
    fn handle_list_key(&mut self, key: KeyEvent) -> bool {
        match key.code {
            KeyCode::Char('q') => return true,
            KeyCode::Char('/') | KeyCode::Tab => {
                self.focus = self.focus.toggle();
            }
            KeyCode::Esc => {
                if self.search_input.value().is_empty() {
                    self.controller.sink().dismiss_all();
                } else {
                    self.search_input.reset();
                    self.controller.set_query("");
                }
            }
            KeyCode::Char('j') | KeyCode::Down => self.controller.move_selection(1),
            KeyCode::Char('k') | KeyCode::Up => self.controller.move_selection(-1),
            KeyCode::PageDown => self.controller.move_selection(PAGE),
            KeyCode::PageUp => self.controller.move_selection(-PAGE),
            KeyCode::Home | KeyCode::Char('g') => self.controller.move_selection(isize::MIN / 2),
            KeyCode::End | KeyCode::Char('G') => self.controller.move_selection(isize::MAX / 2),
            KeyCode::Enter | KeyCode::Char('v') => self.view_selected(),
            KeyCode::Char('a') => self.open_create_form(),
            KeyCode::Char('e') => {
                if let Some(id) = self.selected_id() {
                    self.open_edit_form(&id);
                } else {
                    self.set_status("No contact selected");
                }
            }
            KeyCode::Char('d') => self.delete_selected(),
            KeyCode::Char('r') => {
                self.refresh();
                self.set_status("Refreshing contacts");
            }
            KeyCode::Char('?') => self.show_help(),
            _ => {}
        }
        false
    }

    fn handle_search_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Esc | KeyCode::Enter | KeyCode::Tab => {
                self.focus = self.focus.toggle();
            }
            KeyCode::Down => self.controller.move_selection(1),
            KeyCode::Up => self.controller.move_selection(-1),
            _ => {
                if let Some(change) = self.search_input.handle_event(&Event::Key(key)) {
                    if change.value {
                        self.controller.set_query(self.search_input.value());
                    }
                }
            }
        }
    }

    fn handle_detail_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Esc | KeyCode::Char('q') | KeyCode::Enter => {
                self.controller.close_detail();
            }
            KeyCode::Char('e') => {
                let id = self
                    .controller
                    .detail()
                    .map(|detail| detail.id().to_string());
                if let Some(id) = id {
                    self.controller.close_detail();
                    self.open_edit_form(&id);
                }
            }
            _ => {}
        }
    }

    fn handle_form_key(&mut self, key: KeyEvent) {
        let submitting = self.controller.form().is_some_and(|form| form.submitting());

        match key.code {
            KeyCode::Esc => {
                self.controller.close_form();
                self.editor.cancel();
                self.set_status("Cancelled");
            }
            KeyCode::Tab | KeyCode::Down => self.move_form_focus(true),
            KeyCode::BackTab | KeyCode::Up => self.move_form_focus(false),
            KeyCode::Enter => self.submit_form(),
            _ if submitting => {}
            _ => {
                if self.editor.handle_key_event(key) {
                    let value = self.editor.value().to_string();
                    if let (Some(field), Some(form)) = (self.editor.target(), self.controller.form_mut()) {
                        form.set_value(field, value);
                    }
                }
            }
        }
    }

    fn handle_help_modal_key(&mut self, key: KeyEvent) {
        if matches!(key.code, KeyCode::Esc | KeyCode::Char('q') | KeyCode::Char('?')) {
            self.help_modal = None;
            return;
        }

        let Some(modal) = self.help_modal.as_mut() else {
            return;
        };

        match key.code {
            KeyCode::Char('j') | KeyCode::Down => modal.scroll_down(1),
            KeyCode::Char('k') | KeyCode::Up => modal.scroll_up(1),
            KeyCode::PageDown => {
                let page = modal.viewport_height.saturating_sub(1).max(1);
                modal.scroll_down(page);
            }
            KeyCode::PageUp => {
                let page = modal.viewport_height.saturating_sub(1).max(1);
                modal.scroll_up(page);
            }
            _ => {}
        }
    }

    // =========================================================================
    // Actions
    // =========================================================================

    fn selected_id(&self) -> Option<String> {
        self.controller
            .list()
            .selected_record()
            .map(|record| record.id.clone())
    }

    fn view_selected(&mut self) {
        let Some(id) = self.selected_id() else {
            self.set_status("No contact selected");
            return;
        };
        self.modal_popup = PopupState::default();
        let request = self.controller.prepare_detail(&id);
        self.dispatch(request);
    }

    fn delete_selected(&mut self) {
        let Some(record) = self.controller.list().selected_record().cloned() else {
            self.set_status("No contact selected");
            return;
        };
        match self.controller.prepare_delete(&record.id) {
            Ok(request) => {
                self.dispatch(request);
                self.set_status(format!("Deleting {}", record.display_name()));
            }
            Err(OperationError::InFlight(_)) => self.set_status("Delete already in progress"),
            Err(err) => self.set_status(err.to_string()),
        }
    }

    fn open_create_form(&mut self) {
        self.controller.open_create_form();
        self.start_editing_focused();
        self.set_status("Add contact");
    }

    fn open_edit_form(&mut self, id: &str) {
        match self.controller.open_edit_form(id) {
            Ok(()) => {
                self.start_editing_focused();
                self.set_status("Edit contact");
            }
            Err(err) => self.set_status(err.to_string()),
        }
    }

    fn start_editing_focused(&mut self) {
        if let Some(form) = self.controller.form() {
            let field = form.focused();
            let value = form.value(field).to_string();
            self.editor.start(&value, field);
        }
    }

    fn move_form_focus(&mut self, forward: bool) {
        let Some(form) = self.controller.form_mut() else {
            return;
        };
        if forward {
            form.focus_next();
        } else {
            form.focus_prev();
        }
        self.start_editing_focused();
    }

    fn submit_form(&mut self) {
        match self.controller.submit_form() {
            Ok(request) => {
                self.dispatch(request);
                self.set_status("Saving contact");
            }
            Err(OperationError::Validation(errors)) => {
                self.set_status(format!("{} field(s) need attention", errors.len()));
            }
            Err(OperationError::Busy) => {}
            Err(err) => self.set_status(err.to_string()),
        }
    }

    fn show_help(&mut self) {
        let total_lines = self.help_entries().iter().map(|s| s.entries.len() + 2).sum();
        self.help_modal = Some(HelpModal::new(total_lines));
    }

    fn set_status<M: Into<String>>(&mut self, message: M) {
        self.status = Some(message.into());
    }

    pub fn ui_colors(&self) -> &UiColors {
        &self.config.ui.colors
    }

    pub fn base_url(&self) -> &str {
        &self.config.base_url
    }

    pub fn help_entries(&self) -> Vec<HelpSection> {
        vec![
            HelpSection {
                title: "Global",
                entries: vec![
                    HelpEntry { action: "Quit", keys: "q, Ctrl-C" },
                    HelpEntry { action: "Search", keys: "/" },
                    HelpEntry { action: "Help", keys: "?" },
                    HelpEntry { action: "Refresh", keys: "r" },
                ],
            },
            HelpSection {
                title: "Contacts",
                entries: vec![
                    HelpEntry { action: "Move", keys: "j/k, Up/Down, PgUp/PgDn, g/G" },
                    HelpEntry { action: "View", keys: "Enter, v" },
                    HelpEntry { action: "Add", keys: "a" },
                    HelpEntry { action: "Edit", keys: "e" },
                    HelpEntry { action: "Delete", keys: "d" },
                    HelpEntry { action: "Clear search", keys: "Esc" },
                ],
            },
            HelpSection {
                title: "Form",
                entries: vec![
                    HelpEntry { action: "Next field", keys: "Tab, Down" },
                    HelpEntry { action: "Previous field", keys: "Shift-Tab, Up" },
                    HelpEntry { action: "Save", keys: "Enter" },
                    HelpEntry { action: "Cancel", keys: "Esc" },
                ],
            },
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::DetailState;
    use crate::model::Record;
    use crate::remote::memory::MemoryStore;
    use crate::validate::Field;

    fn record(id: &str, first: &str, last: &str) -> Record {
        Record {
            id: id.into(),
            title: None,
            first_name: first.into(),
            last_name: last.into(),
            email: Some(format!("{}@x.com", first.to_lowercase())),
            phone: None,
            picture: None,
            register_date: None,
            updated_date: None,
        }
    }

    fn press(app: &mut App<'_, MemoryStore>, code: KeyCode) -> bool {
        app.handle_key(KeyEvent::new(code, KeyModifiers::NONE)).unwrap()
    }

    fn type_text(app: &mut App<'_, MemoryStore>, text: &str) {
        for c in text.chars() {
            press(app, KeyCode::Char(c));
        }
    }

    /// Block until one spawned request reports back, then apply it.
    fn settle(app: &mut App<'_, MemoryStore>) {
        let completion = app.completions_rx.blocking_recv().unwrap();
        app.apply(completion);
    }

    fn runtime() -> tokio::runtime::Runtime {
        tokio::runtime::Builder::new_multi_thread()
            .worker_threads(1)
            .enable_all()
            .build()
            .unwrap()
    }

    #[test]
    fn test_startup_refresh_and_search() {
        let rt = runtime();
        let config = Config::default();
        let store = Arc::new(MemoryStore::with_records(vec![
            record("1", "Sara", "Andersen"),
            record("2", "Roberto", "Vega"),
        ]));
        let mut app = App::new(&config, store, rt.handle().clone(), None);
        settle(&mut app);
        assert_eq!(app.controller.list().view().len(), 2);

        press(&mut app, KeyCode::Char('/'));
        assert_eq!(app.focus, Focus::Search);
        type_text(&mut app, "veg");
        assert_eq!(app.controller.list().query(), "veg");
        assert_eq!(app.controller.list().view()[0].id, "2");

        // 'q' while searching is text, not quit
        assert!(!press(&mut app, KeyCode::Char('q')));
        press(&mut app, KeyCode::Esc);
        assert_eq!(app.focus, Focus::List);
        press(&mut app, KeyCode::Esc);
        assert_eq!(app.controller.list().view().len(), 2);
        assert!(press(&mut app, KeyCode::Char('q')));
    }

    #[test]
    fn test_add_contact_through_form() {
        let rt = runtime();
        let config = Config::default();
        let store = Arc::new(MemoryStore::default());
        let mut app = App::new(&config, Arc::clone(&store), rt.handle().clone(), None);
        settle(&mut app);

        press(&mut app, KeyCode::Char('a'));
        assert_eq!(app.editor.target(), Some(Field::FirstName));
        type_text(&mut app, "Jo");
        press(&mut app, KeyCode::Tab);
        type_text(&mut app, "Ann");
        press(&mut app, KeyCode::Tab);

        // Missing email is caught locally
        press(&mut app, KeyCode::Enter);
        let form = app.controller.form().unwrap();
        assert_eq!(form.errors.get(Field::Email), Some("Email is required"));
        assert!(!form.submitting());

        type_text(&mut app, "jo@x.com");
        press(&mut app, KeyCode::Enter);
        assert!(app.controller.form().unwrap().submitting());

        settle(&mut app); // create
        assert!(app.controller.form().is_none());
        assert!(!app.editor.active);
        settle(&mut app); // follow-up refresh
        assert_eq!(app.controller.list().canonical().len(), 1);
        assert_eq!(store.records()[0].picture.as_deref(), Some(config.default_picture.as_str()));

        let toasts = app.controller.sink().visible();
        assert_eq!(toasts.last().unwrap().message, "Contact created successfully");
    }

    #[test]
    fn test_view_failure_can_be_closed() {
        let rt = runtime();
        let config = Config::default();
        let store = Arc::new(MemoryStore::with_records(vec![record("1", "Sara", "Andersen")]));
        let mut app = App::new(&config, Arc::clone(&store), rt.handle().clone(), None);
        settle(&mut app);

        store.set_offline(Some("connection reset"));
        press(&mut app, KeyCode::Enter);
        assert!(matches!(app.controller.detail(), Some(DetailState::Loading { .. })));
        settle(&mut app);
        assert!(matches!(app.controller.detail(), Some(DetailState::Failed { .. })));

        press(&mut app, KeyCode::Esc);
        assert!(app.controller.detail().is_none());
    }

    #[test]
    fn test_delete_selected_twice() {
        let rt = runtime();
        let config = Config::default();
        let store = Arc::new(MemoryStore::with_records(vec![
            record("1", "Sara", "Andersen"),
            record("2", "Bo", "Lind"),
        ]));
        let mut app = App::new(&config, Arc::clone(&store), rt.handle().clone(), None);
        settle(&mut app);

        press(&mut app, KeyCode::Char('d'));
        press(&mut app, KeyCode::Char('d'));
        assert_eq!(app.status.as_deref(), Some("Delete already in progress"));

        settle(&mut app); // delete
        settle(&mut app); // follow-up refresh
        let ids: Vec<&str> = app
            .controller
            .list()
            .canonical()
            .iter()
            .map(|r| r.id.as_str())
            .collect();
        assert_eq!(ids, vec!["2"]);
    }
}
