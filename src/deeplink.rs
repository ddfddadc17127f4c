use crate::domain::issue::Issue;

pub const ISSUE_FRAGMENT_PREFIX: &str = "#issue/";

/// Issue id named by an `#issue/<id>` fragment. Accepts the bare fragment or
/// a full link that ends in one.
pub fn parse_fragment(location: &str) -> Option<&str> {
    let start = location.find('#')?;
    let id = location[start..].strip_prefix(ISSUE_FRAGMENT_PREFIX)?.trim();
    if id.is_empty() {
        None
    } else {
        Some(id)
    }
}

/// The issue a link should select, if any.
///
/// Nothing is selected while the first snapshot is still loading, when the
/// issue is not part of the current view (filters are never cleared to
/// reveal it), or when it is already selected.
pub fn resolve<'a>(
    location: &str,
    view: &'a [Issue],
    loading: bool,
    selected: Option<&str>,
) -> Option<&'a Issue> {
    if loading || view.is_empty() {
        return None;
    }
    let id = parse_fragment(location)?;
    if selected == Some(id) {
        return None;
    }
    view.iter().find(|issue| issue.id == id)
}

pub fn issue_link(base: &str, id: &str) -> String {
    let base = match base.find('#') {
        Some(index) => &base[..index],
        None => base,
    };
    format!("{}{}{}", base, ISSUE_FRAGMENT_PREFIX, id)
}
