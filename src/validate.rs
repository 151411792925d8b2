//! Field rules for contact forms.
//!
//! These are the only rules the client enforces before a record reaches the
//! store. Each field reports at most one message: the first rule it breaks.

use std::fmt;
use std::sync::OnceLock;

use regex::Regex;

use crate::model::RecordInput;

const NAME_MIN: usize = 2;
const NAME_MAX: usize = 15;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    FirstName,
    LastName,
    Email,
    Phone,
    Picture,
}

impl Field {
    pub const ALL: [Field; 5] = [
        Field::FirstName,
        Field::LastName,
        Field::Email,
        Field::Phone,
        Field::Picture,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Field::FirstName => "First Name",
            Field::LastName => "Last Name",
            Field::Email => "Email",
            Field::Phone => "Phone Number",
            Field::Picture => "Picture URL",
        }
    }

    pub fn value(self, input: &RecordInput) -> &str {
        match self {
            Field::FirstName => &input.first_name,
            Field::LastName => &input.last_name,
            Field::Email => &input.email,
            Field::Phone => &input.phone,
            Field::Picture => &input.picture,
        }
    }

    pub fn value_mut(self, input: &mut RecordInput) -> &mut String {
        match self {
            Field::FirstName => &mut input.first_name,
            Field::LastName => &mut input.last_name,
            Field::Email => &mut input.email,
            Field::Phone => &mut input.phone,
            Field::Picture => &mut input.picture,
        }
    }
}

/// Whether email takes part in validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Create,
    Update,
}

impl Mode {
    pub fn fields(self) -> &'static [Field] {
        match self {
            Mode::Create => &Field::ALL,
            Mode::Update => &[Field::FirstName, Field::LastName, Field::Phone, Field::Picture],
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationErrors {
    errors: Vec<(Field, String)>,
}

impl ValidationErrors {
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn get(&self, field: Field) -> Option<&str> {
        self.errors
            .iter()
            .find(|(f, _)| *f == field)
            .map(|(_, message)| message.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (Field, &str)> {
        self.errors.iter().map(|(f, m)| (*f, m.as_str()))
    }

    fn push(&mut self, field: Field, message: String) {
        self.errors.push((field, message));
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let messages: Vec<&str> = self.errors.iter().map(|(_, m)| m.as_str()).collect();
        write!(f, "{}", messages.join("; "))
    }
}

/// Check every field that applies to `mode`.
pub fn validate(input: &RecordInput, mode: Mode) -> Result<(), ValidationErrors> {
    let mut errors = ValidationErrors::default();
    for &field in mode.fields() {
        if let Some(message) = check_field(field, field.value(input)) {
            errors.push(field, message);
        }
    }
    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// First broken rule for a single field, if any.
pub fn check_field(field: Field, value: &str) -> Option<String> {
    match field {
        Field::FirstName | Field::LastName => check_name(field.label(), value),
        Field::Email => check_email(value),
        Field::Phone => check_phone(value),
        Field::Picture => check_picture(value),
    }
}

fn check_name(label: &str, value: &str) -> Option<String> {
    if value.is_empty() {
        return Some(format!("{label} is required"));
    }
    let len = value.chars().count();
    if len < NAME_MIN {
        return Some(format!("{label} must be at least {NAME_MIN} characters"));
    }
    if len > NAME_MAX {
        return Some(format!("{label} must not exceed {NAME_MAX} characters"));
    }
    if !name_pattern().is_match(value) {
        return Some(format!("{label} can only contain letters and spaces"));
    }
    None
}

fn check_email(value: &str) -> Option<String> {
    if value.is_empty() {
        return Some("Email is required".to_string());
    }
    if !email_shape().is_match(value) || !email_pattern().is_match(value) {
        return Some("Invalid email format".to_string());
    }
    None
}

fn check_phone(value: &str) -> Option<String> {
    if value.is_empty() || phone_pattern().is_match(value) {
        None
    } else {
        Some("Invalid phone number format".to_string())
    }
}

fn check_picture(value: &str) -> Option<String> {
    if value.is_empty() {
        return None;
    }
    if !url_shape().is_match(value) {
        return Some("Must be a valid URL".to_string());
    }
    if !picture_pattern().is_match(value) {
        return Some("Invalid URL format".to_string());
    }
    None
}

fn name_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[A-Za-z\s]*$").expect("name pattern"))
}

/// Domain labels start and end with a letter or digit.
fn email_shape() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"^[a-zA-Z0-9.!#$%&'*+/=?^_`{|}~-]+@[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?(?:\.[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?)*$",
        )
        .expect("email shape")
    })
}

fn email_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)^[A-Z0-9._%+-]+@[A-Z0-9.-]+\.[A-Z]{2,}$").expect("email pattern")
    })
}

fn phone_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^[+]?[(]?[0-9]{3}[)]?[-\s.]?[0-9]{3}[-\s.]?[0-9]{4,6}$").expect("phone pattern")
    })
}

/// Absolute http(s) URL: dotted host of well-formed labels, optional port, no whitespace.
fn url_shape() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"(?i)^https?://(?:[a-z0-9](?:[a-z0-9-]*[a-z0-9])?\.)+[a-z]{2,}(?::[0-9]{1,5})?(?:[/?#]\S*)?$",
        )
        .expect("url shape")
    })
}

fn picture_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^(https?://)?([\da-z.-]+)\.([a-z.]{2,6})([/\w .-]*)*/?$")
            .expect("picture pattern")
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(first: &str, last: &str, email: &str) -> RecordInput {
        RecordInput {
            first_name: first.into(),
            last_name: last.into(),
            email: email.into(),
            ..Default::default()
        }
    }

    #[test]
    fn test_name_rules() {
        assert_eq!(
            check_field(Field::FirstName, "A").as_deref(),
            Some("First Name must be at least 2 characters")
        );
        assert_eq!(check_field(Field::FirstName, "Ann Marie"), None);
        assert_eq!(
            check_field(Field::LastName, "").as_deref(),
            Some("Last Name is required")
        );
        assert_eq!(
            check_field(Field::LastName, "Abcdefghijklmnop").as_deref(),
            Some("Last Name must not exceed 15 characters")
        );
        assert_eq!(
            check_field(Field::FirstName, "R2D2").as_deref(),
            Some("First Name can only contain letters and spaces")
        );
        // Accented letters are outside the allowed set
        assert!(check_field(Field::FirstName, "José").is_some());
    }

    #[test]
    fn test_email_rules() {
        assert_eq!(
            check_field(Field::Email, "not-an-email").as_deref(),
            Some("Invalid email format")
        );
        assert_eq!(
            check_field(Field::Email, "").as_deref(),
            Some("Email is required")
        );
        assert_eq!(check_field(Field::Email, "Jo.Ann+tag@Example.CO"), None);
        assert!(check_field(Field::Email, "jo@x.c").is_some());
        for bad in ["jo@x..com", "jo@-x.com", "jo@x-.com", "jo ann@x.com"] {
            assert_eq!(
                check_field(Field::Email, bad).as_deref(),
                Some("Invalid email format"),
                "{bad}"
            );
        }
        assert_eq!(check_field(Field::Email, "jo@mail.x-y.com"), None);
    }

    #[test]
    fn test_phone_rules() {
        assert_eq!(check_field(Field::Phone, ""), None);
        assert_eq!(check_field(Field::Phone, "555-123-4567"), None);
        assert_eq!(check_field(Field::Phone, "+(555) 123 456789"), None);
        assert_eq!(check_field(Field::Phone, "5551234567"), None);
        assert_eq!(
            check_field(Field::Phone, "12-34").as_deref(),
            Some("Invalid phone number format")
        );
    }

    #[test]
    fn test_picture_rules() {
        assert_eq!(check_field(Field::Picture, ""), None);
        assert_eq!(
            check_field(Field::Picture, "https://randomuser.me/api/portraits/women/58.jpg"),
            None
        );
        assert_eq!(
            check_field(Field::Picture, "example.com/a.png").as_deref(),
            Some("Must be a valid URL")
        );
        for bad in [
            "https://example.com/a b.png",
            "https://-example.com/a.png",
            "https://example..com/a.png",
            "ftp://example.com/a.png",
        ] {
            assert_eq!(
                check_field(Field::Picture, bad).as_deref(),
                Some("Must be a valid URL"),
                "{bad}"
            );
        }
        assert_eq!(check_field(Field::Picture, "http://img.example.com/a.png"), None);
        assert_eq!(
            check_field(Field::Picture, "https://example.com/a.png?size=2").as_deref(),
            Some("Invalid URL format")
        );
    }

    #[test]
    fn test_update_mode_skips_email() {
        let form = input("Bo", "Lind", "not-an-email");
        assert!(validate(&form, Mode::Update).is_ok());

        let errors = validate(&form, Mode::Create).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors.get(Field::Email), Some("Invalid email format"));
    }

    #[test]
    fn test_collects_one_message_per_field() {
        let errors = validate(&input("A", "", "x"), Mode::Create).unwrap_err();
        let fields: Vec<Field> = errors.iter().map(|(f, _)| f).collect();
        assert_eq!(fields, vec![Field::FirstName, Field::LastName, Field::Email]);
        assert_eq!(
            errors.to_string(),
            "First Name must be at least 2 characters; Last Name is required; Invalid email format"
        );
    }
}
