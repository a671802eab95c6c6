/// True when any non-empty deny-list entry occurs in `text`, ignoring case.
pub fn contains_blocked<S: AsRef<str>>(text: &str, deny_list: &[S]) -> bool {
    let haystack = text.to_lowercase();
    deny_list
        .iter()
        .map(|term| term.as_ref().trim())
        .filter(|term| !term.is_empty())
        .any(|term| haystack.contains(&term.to_lowercase()))
}
