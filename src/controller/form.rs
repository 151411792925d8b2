use crate::model::{Record, RecordInput};
use crate::validate::{Field, ValidationErrors};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormMode {
    Create,
    Edit { id: String },
}

impl FormMode {
    pub fn title(&self) -> &'static str {
        match self {
            FormMode::Create => "Add Contact",
            FormMode::Edit { .. } => "Edit Contact",
        }
    }
}

/// The open add/edit form.
#[derive(Debug, Clone)]
pub struct FormState {
    pub mode: FormMode,
    pub input: RecordInput,
    pub errors: ValidationErrors,
    /// Ticket of the in-flight save started from this form.
    pub(super) submission: Option<u64>,
    focus: usize,
}

impl FormState {
    pub fn create() -> Self {
        Self {
            mode: FormMode::Create,
            input: RecordInput::default(),
            errors: ValidationErrors::default(),
            submission: None,
            focus: 0,
        }
    }

    pub fn edit(record: &Record) -> Self {
        Self {
            mode: FormMode::Edit {
                id: record.id.clone(),
            },
            input: RecordInput::from_record(record),
            errors: ValidationErrors::default(),
            submission: None,
            focus: 0,
        }
    }

    pub fn submitting(&self) -> bool {
        self.submission.is_some()
    }

    /// Every field shown by the form, in display order.
    pub fn fields(&self) -> &'static [Field] {
        &Field::ALL
    }

    /// Email is fixed once a record exists.
    pub fn is_editable(&self, field: Field) -> bool {
        !(field == Field::Email && matches!(self.mode, FormMode::Edit { .. }))
    }

    fn editable_fields(&self) -> Vec<Field> {
        self.fields()
            .iter()
            .copied()
            .filter(|field| self.is_editable(*field))
            .collect()
    }

    pub fn focused(&self) -> Field {
        let editable = self.editable_fields();
        editable[self.focus.min(editable.len() - 1)]
    }

    pub fn focus_next(&mut self) {
        let count = self.editable_fields().len();
        self.focus = (self.focus + 1) % count;
    }

    pub fn focus_prev(&mut self) {
        let count = self.editable_fields().len();
        self.focus = (self.focus + count - 1) % count;
    }

    pub fn value(&self, field: Field) -> &str {
        field.value(&self.input)
    }

    pub fn set_value(&mut self, field: Field, value: String) {
        if self.is_editable(field) {
            *field.value_mut(&mut self.input) = value;
        }
    }
}
