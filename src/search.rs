use crate::model::Record;

/// Normalize a string for case-insensitive matching.
pub fn normalize(s: &str) -> String {
    s.to_lowercase()
}

/// `None` means "no filter". The query is not trimmed: a space is a valid needle.
pub fn normalize_query(query: &str) -> Option<String> {
    if query.is_empty() {
        None
    } else {
        Some(normalize(query))
    }
}

pub fn matches(record: &Record, needle: &str) -> bool {
    normalize(&record.first_name).contains(needle) || normalize(&record.last_name).contains(needle)
}

/// Records whose first or last name contains `query`, in canonical order.
pub fn filter(records: &[Record], query: &str) -> Vec<Record> {
    match normalize_query(query) {
        Some(needle) => records
            .iter()
            .filter(|record| matches(record, &needle))
            .cloned()
            .collect(),
        None => records.to_vec(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: &str, first: &str, last: &str) -> Record {
        Record {
            id: id.into(),
            title: None,
            first_name: first.into(),
            last_name: last.into(),
            email: None,
            phone: None,
            picture: None,
            register_date: None,
            updated_date: None,
        }
    }

    fn sample() -> Vec<Record> {
        vec![
            record("1", "Sara", "Andersen"),
            record("2", "Edita", "Vestering"),
            record("3", "Adina", "Barbosa"),
            record("4", "Roberto", "Vega"),
        ]
    }

    #[test]
    fn test_empty_query_keeps_everything() {
        let records = sample();
        assert_eq!(filter(&records, ""), records);
    }

    #[test]
    fn test_matches_first_or_last_name_case_insensitively() {
        let ids: Vec<String> = filter(&sample(), "VE")
            .into_iter()
            .map(|r| r.id)
            .collect();
        assert_eq!(ids, vec!["2", "4"]);

        let ids: Vec<String> = filter(&sample(), "ad").into_iter().map(|r| r.id).collect();
        assert_eq!(ids, vec!["3"]);
    }

    #[test]
    fn test_preserves_canonical_order() {
        let ids: Vec<String> = filter(&sample(), "a").into_iter().map(|r| r.id).collect();
        assert_eq!(ids, vec!["1", "2", "3", "4"]);
    }

    #[test]
    fn test_no_match() {
        assert!(filter(&sample(), "zz").is_empty());
        // Whitespace is matched literally, not trimmed away
        assert!(filter(&sample(), " ").is_empty());
    }
}
