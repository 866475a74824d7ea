/// Case-insensitive substring match over question title and content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextSearch {
    needle: String,
}

impl TextSearch {
    /// Blank queries mean "no filter".
    pub fn new(query: Option<&str>) -> Option<Self> {
        let trimmed = query?.trim();
        if trimmed.is_empty() {
            return None;
        }
        Some(Self { needle: trimmed.to_lowercase() })
    }

    pub fn matches(&self, haystack: &str) -> bool {
        haystack.to_lowercase().contains(&self.needle)
    }

    /// ILIKE pattern with LIKE metacharacters escaped (escape char is `\`).
    pub fn to_ilike_pattern(&self) -> String {
        let mut escaped = String::with_capacity(self.needle.len() + 2);
        escaped.push('%');
        for c in self.needle.chars() {
            if matches!(c, '%' | '_' | '\\') {
                escaped.push('\\');
            }
            escaped.push(c);
        }
        escaped.push('%');
        escaped
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_query_disables_search() {
        assert!(TextSearch::new(None).is_none());
        assert!(TextSearch::new(Some("   ")).is_none());
    }

    #[test]
    fn matches_case_insensitively() {
        let search = TextSearch::new(Some("Borrow")).unwrap();
        assert!(search.matches("Why does the BORROW checker complain?"));
        assert!(!search.matches("lifetimes"));
    }

    #[test]
    fn escapes_like_metacharacters() {
        let search = TextSearch::new(Some("100%_done")).unwrap();
        assert_eq!(search.to_ilike_pattern(), "%100\\%\\_done%");
    }
}
