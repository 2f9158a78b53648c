//! Entity tags: coarse label sets such as `"enemy:asteroid|large"`.

/// Iterate the labels of a tag. Labels are separated by `:` or `|`.
pub fn labels(tag: &str) -> impl Iterator<Item = &str> {
    tag.split([':', '|'])
        .map(str::trim)
        .filter(|label| !label.is_empty())
}

#[must_use]
pub fn has_label(tag: &str, label: &str) -> bool {
    labels(tag).any(|candidate| candidate == label)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_labels() {
        let found: Vec<_> = labels("enemy:asteroid|large").collect();
        assert_eq!(found, vec!["enemy", "asteroid", "large"]);
    }

    #[test]
    fn test_has_label() {
        assert!(has_label("player|ship", "ship"));
        assert!(!has_label("player|ship", "shi"));
        assert!(!has_label("", "ship"));
    }
}
