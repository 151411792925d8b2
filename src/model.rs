use serde::{Deserialize, Serialize};
use time::format_description::well_known::Rfc3339;
use time::macros::format_description;
use time::OffsetDateTime;

/// A contact as returned by the record store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Record {
    pub id: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub picture: Option<String>,
    #[serde(default)]
    pub register_date: Option<String>,
    #[serde(default)]
    pub updated_date: Option<String>,
}

impl Record {
    pub fn display_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

/// Raw form values. Empty strings mean "not provided".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordInput {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
    pub picture: String,
}

impl RecordInput {
    /// Pre-fill an edit form from an existing record.
    pub fn from_record(record: &Record) -> Self {
        Self {
            first_name: record.first_name.clone(),
            last_name: record.last_name.clone(),
            email: record.email.clone().unwrap_or_default(),
            phone: record.phone.clone().unwrap_or_default(),
            picture: record.picture.clone().unwrap_or_default(),
        }
    }

    pub fn to_new_record(&self, default_picture: &str) -> NewRecord {
        NewRecord {
            first_name: self.first_name.clone(),
            last_name: self.last_name.clone(),
            email: self.email.clone(),
            phone: self.phone.clone(),
            picture: resolve_picture(&self.picture, default_picture),
        }
    }

    /// Update payload. Email is immutable once created and is never sent.
    pub fn to_update(&self, default_picture: &str) -> RecordUpdate {
        RecordUpdate {
            first_name: self.first_name.clone(),
            last_name: self.last_name.clone(),
            phone: self.phone.clone(),
            picture: resolve_picture(&self.picture, default_picture),
        }
    }
}

fn resolve_picture(picture: &str, default_picture: &str) -> String {
    let trimmed = picture.trim();
    if trimmed.is_empty() {
        default_picture.to_string()
    } else {
        trimmed.to_string()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewRecord {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
    pub picture: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordUpdate {
    pub first_name: String,
    pub last_name: String,
    pub phone: String,
    pub picture: String,
}

/// Render a server timestamp for display, falling back to the raw value.
pub fn format_timestamp(raw: &str) -> String {
    let display = format_description!("[year]-[month]-[day] [hour]:[minute] UTC");
    OffsetDateTime::parse(raw, &Rfc3339)
        .ok()
        .and_then(|ts| ts.to_offset(time::UtcOffset::UTC).format(&display).ok())
        .unwrap_or_else(|| raw.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    const DEFAULT_PICTURE: &str = "https://example.com/avatar.jpg";

    #[test]
    fn test_record_decodes_camel_case() {
        let raw = r#"{
            "id": "60d0fe4f5311236168a109ca",
            "title": "ms",
            "firstName": "Sara",
            "lastName": "Andersen",
            "picture": "https://randomuser.me/api/portraits/women/58.jpg",
            "registerDate": "2021-06-21T21:02:07.374Z",
            "unknown": 1
        }"#;
        let record: Record = serde_json::from_str(raw).unwrap();
        assert_eq!(record.first_name, "Sara");
        assert_eq!(record.last_name, "Andersen");
        assert_eq!(record.email, None);
        assert_eq!(record.display_name(), "Sara Andersen");
    }

    #[test]
    fn test_update_payload_has_no_email() {
        let input = RecordInput {
            first_name: "Bo".into(),
            last_name: "Lind".into(),
            email: "new@x.com".into(),
            ..Default::default()
        };
        let value = serde_json::to_value(input.to_update(DEFAULT_PICTURE)).unwrap();
        let object = value.as_object().unwrap();
        assert!(!object.contains_key("email"));
        assert_eq!(object["firstName"], "Bo");
    }

    #[test]
    fn test_empty_picture_resolves_to_default() {
        let input = RecordInput {
            first_name: "Jo".into(),
            last_name: "Ann".into(),
            email: "jo@x.com".into(),
            picture: "  ".into(),
            ..Default::default()
        };
        let payload = input.to_new_record(DEFAULT_PICTURE);
        assert_eq!(payload.picture, DEFAULT_PICTURE);
        assert_eq!(payload.phone, "");
    }

    #[test]
    fn test_format_timestamp() {
        assert_eq!(
            format_timestamp("2021-06-21T21:02:07.374Z"),
            "2021-06-21 21:02 UTC"
        );
        assert_eq!(format_timestamp("yesterday"), "yesterday");
    }
}
