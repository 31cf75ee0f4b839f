//! Tag labels and comma-delimited tag lists.

use crate::error::TagIndexError;
use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt;

/// Separator for delimited tag lists. Labels cannot contain it; there is no
/// escaping.
pub const SEPARATOR: char = ',';

/// A single tag label.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Tag(String);

impl Tag {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for Tag {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for Tag {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<String> for Tag {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for Tag {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl PartialEq<str> for Tag {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for Tag {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

/// A non-empty, ordered list of tag labels.
///
/// Order and duplicates are preserved as given; labels are not trimmed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagList(Vec<Tag>);

impl TagList {
    /// Split a delimited list such as `"red,blue"`.
    pub fn parse(input: &str) -> Result<Self, TagIndexError> {
        if input.is_empty() {
            return Err(invalid(input, "tag list is empty"));
        }
        let tags: Vec<Tag> = input.split(SEPARATOR).map(Tag::from).collect();
        if tags.iter().any(|t| t.0.is_empty()) {
            return Err(invalid(input, "tag list contains an empty label"));
        }
        Ok(Self(tags))
    }

    /// Build a list from individual labels.
    pub fn from_labels<I, S>(labels: I) -> Result<Self, TagIndexError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let tags: Vec<Tag> = labels.into_iter().map(|s| Tag(s.into())).collect();
        let joined = || {
            tags.iter()
                .map(Tag::as_str)
                .collect::<Vec<_>>()
                .join(&*SEPARATOR.to_string())
        };
        if tags.is_empty() {
            return Err(invalid("", "tag list is empty"));
        }
        if tags.iter().any(|t| t.0.is_empty()) {
            return Err(invalid(&joined(), "tag list contains an empty label"));
        }
        if tags.iter().any(|t| t.0.contains(SEPARATOR)) {
            return Err(invalid(&joined(), "tag label contains the separator"));
        }
        Ok(Self(tags))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Tag> {
        self.0.iter()
    }
}

fn invalid(input: &str, reason: &'static str) -> TagIndexError {
    TagIndexError::InvalidTagList {
        input: input.to_string(),
        reason,
    }
}

impl fmt::Display for TagList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, tag) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, "{SEPARATOR}")?;
            }
            f.write_str(tag.as_str())?;
        }
        Ok(())
    }
}

impl<'a> IntoIterator for &'a TagList {
    type Item = &'a Tag;
    type IntoIter = std::slice::Iter<'a, Tag>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl TryFrom<&str> for TagList {
    type Error = TagIndexError;

    fn try_from(input: &str) -> Result<Self, Self::Error> {
        Self::parse(input)
    }
}

impl TryFrom<String> for TagList {
    type Error = TagIndexError;

    fn try_from(input: String) -> Result<Self, Self::Error> {
        Self::parse(&input)
    }
}

impl TryFrom<&String> for TagList {
    type Error = TagIndexError;

    fn try_from(input: &String) -> Result<Self, Self::Error> {
        Self::parse(input)
    }
}

impl TryFrom<&[&str]> for TagList {
    type Error = TagIndexError;

    fn try_from(labels: &[&str]) -> Result<Self, Self::Error> {
        Self::from_labels(labels.iter().copied())
    }
}

impl<const N: usize> TryFrom<[&str; N]> for TagList {
    type Error = TagIndexError;

    fn try_from(labels: [&str; N]) -> Result<Self, Self::Error> {
        Self::from_labels(labels)
    }
}

impl TryFrom<Vec<String>> for TagList {
    type Error = TagIndexError;

    fn try_from(labels: Vec<String>) -> Result<Self, Self::Error> {
        Self::from_labels(labels)
    }
}

impl TryFrom<&TagList> for TagList {
    type Error = TagIndexError;

    fn try_from(list: &TagList) -> Result<Self, Self::Error> {
        Ok(list.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_splits_on_comma_and_keeps_order() {
        let list = TagList::parse("red,blue,red").unwrap();
        let labels: Vec<&str> = list.iter().map(Tag::as_str).collect();
        assert_eq!(labels, ["red", "blue", "red"]);
        assert_eq!(list.to_string(), "red,blue,red");
    }

    #[test]
    fn parse_does_not_trim() {
        let list = TagList::parse("a, b").unwrap();
        assert_eq!(list.iter().nth(1).unwrap(), " b");
    }

    #[test]
    fn empty_input_and_empty_labels_are_rejected() {
        for input in ["", ",", "a,", ",a", "a,,b"] {
            assert!(
                matches!(
                    TagList::parse(input),
                    Err(TagIndexError::InvalidTagList { .. })
                ),
                "{input:?} should be rejected"
            );
        }
    }

    #[test]
    fn labels_cannot_contain_separator() {
        let err = TagList::from_labels(["a,b"]).unwrap_err();
        assert!(matches!(err, TagIndexError::InvalidTagList { .. }));
        assert!(TagList::from_labels(Vec::<String>::new()).is_err());
    }

    #[test]
    fn conversions_agree() {
        let a = TagList::try_from("x,y").unwrap();
        let b = TagList::try_from(["x", "y"]).unwrap();
        let c = TagList::try_from(vec!["x".to_string(), "y".to_string()]).unwrap();
        assert_eq!(a, b);
        assert_eq!(b, c);
    }
}
