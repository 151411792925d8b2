/// Where key presses go when no modal is open
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Focus {
    /// Contact list: navigation and record actions
    List,
    /// Search line: typing edits the query
    Search,
}

impl Focus {
    pub fn title(self) -> &'static str {
        match self {
            Focus::List => "CONTACTS",
            Focus::Search => "SEARCH",
        }
    }

    pub fn toggle(self) -> Self {
        match self {
            Focus::List => Focus::Search,
            Focus::Search => Focus::List,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_toggle_round_trips() {
        assert_eq!(Focus::List.toggle(), Focus::Search);
        assert_eq!(Focus::List.toggle().toggle(), Focus::List);
        assert_eq!(Focus::Search.title(), "SEARCH");
    }
}
