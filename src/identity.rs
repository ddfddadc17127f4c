pub const ANONYMOUS_AUTHOR: &str = "Anonymous";

/// The authenticated identity every read and write runs under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub uid: String,
    pub email: Option<String>,
    pub display_name: Option<String>,
}

impl Identity {
    pub fn new(uid: &str, email: Option<&str>, display_name: Option<&str>) -> Option<Self> {
        let uid = uid.trim();
        if uid.is_empty() {
            return None;
        }
        Some(Self {
            uid: uid.to_string(),
            email: non_empty(email),
            display_name: non_empty(display_name),
        })
    }

    /// Label stamped into `author`: email, then display name, then a
    /// placeholder.
    pub fn author_label(&self) -> String {
        self.email
            .clone()
            .or_else(|| self.display_name.clone())
            .unwrap_or_else(|| ANONYMOUS_AUTHOR.to_string())
    }
}

fn non_empty(raw: Option<&str>) -> Option<String> {
    let trimmed = raw?.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::Identity;

    #[test]
    fn blank_uid_is_not_an_identity() {
        assert!(Identity::new("  ", Some("qa@example.com"), None).is_none());
    }

    #[test]
    fn author_label_prefers_email_then_display_name() {
        let full = Identity::new("u1", Some("qa@example.com"), Some("QA")).expect("identity");
        assert_eq!(full.author_label(), "qa@example.com");

        let named = Identity::new("u1", Some(" "), Some("QA")).expect("identity");
        assert_eq!(named.author_label(), "QA");

        let bare = Identity::new("u1", None, None).expect("identity");
        assert_eq!(bare.author_label(), "Anonymous");
    }
}
