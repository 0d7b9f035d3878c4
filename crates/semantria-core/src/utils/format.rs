/// Truncate a string to a maximum length, adding ellipsis if needed
pub fn truncate_string(s: &str, max_len: usize) -> String {
    if s.len() <= max_len {
        s.to_string()
    } else if max_len <= 3 {
        s.chars().take(max_len).collect()
    } else {
        let truncated: String = s.chars().take(max_len - 3).collect();
        format!("{}...", truncated)
    }
}

/// Loose check whether a login name is an email address.
/// The auth server only needs to know which field to look the user up by,
/// so this accepts anything shaped like `local@domain.tld`.
pub fn is_email(value: &str) -> bool {
    if value.chars().any(char::is_whitespace) {
        return false;
    }

    let mut parts = value.split('@');
    let (Some(local), Some(domain), None) = (parts.next(), parts.next(), parts.next()) else {
        return false;
    };

    !local.is_empty()
        && domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_string() {
        assert_eq!(truncate_string("Hello", 10), "Hello");
        assert_eq!(truncate_string("Hello World", 8), "Hello...");
        assert_eq!(truncate_string("Hi", 2), "Hi");
    }

    #[test]
    fn test_is_email() {
        assert!(is_email("bob@x.com"));
        assert!(is_email("first.last+tag@mail.example.org"));
        assert!(!is_email("bob"));
        assert!(!is_email("bob@localhost"));
        assert!(!is_email("@x.com"));
        assert!(!is_email("a@b@x.com"));
        assert!(!is_email("bob @x.com"));
        assert!(!is_email("bob@x."));
    }
}
