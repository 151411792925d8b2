use crossterm::event::{Event, KeyEvent};
use tui_input::backend::crossterm::EventHandler;
use tui_input::Input;

use crate::validate::Field;

/// Text input bound to one form field at a time.
#[derive(Default)]
pub struct InlineEditor {
    pub active: bool,
    target: Option<Field>,
    input: Input,
}

impl InlineEditor {
    pub fn start(&mut self, current: &str, target: Field) {
        self.active = true;
        self.target = Some(target);
        self.input = Input::new(current.to_string());
    }

    pub fn cancel(&mut self) {
        self.active = false;
        self.target = None;
        self.input.reset();
    }

    pub fn target(&self) -> Option<Field> {
        self.target
    }

    pub fn value(&self) -> &str {
        self.input.value()
    }

    pub fn visual_cursor(&self) -> usize {
        self.input.visual_cursor()
    }

    /// Returns true when the value changed.
    pub fn handle_key_event(&mut self, key: KeyEvent) -> bool {
        self.input
            .handle_event(&Event::Key(key))
            .is_some_and(|change| change.value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::{KeyCode, KeyModifiers};

    fn press(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    #[test]
    fn test_typing_updates_value() {
        let mut editor = InlineEditor::default();
        editor.start("Jo", Field::FirstName);
        assert!(editor.active);
        assert_eq!(editor.target(), Some(Field::FirstName));

        assert!(editor.handle_key_event(press(KeyCode::Char('e'))));
        assert_eq!(editor.value(), "Joe");
        assert_eq!(editor.visual_cursor(), 3);

        // Cursor movement is not a value change
        assert!(!editor.handle_key_event(press(KeyCode::Left)));

        editor.cancel();
        assert!(!editor.active);
        assert_eq!(editor.value(), "");
    }
}
