//! # Trait Text
//!
//! Helpers for the `<Kind>#<field>#<field>...` text form of traits.
//!
//! Numbers are written with `to_string` and read with `str::parse`, which are
//! locale independent. Optional numbers use `-` for "none". Free text has `#`
//! replaced by `&` and newlines by `<br>` so it never splits a field.

use crate::{DelveError, DelveResult, ObjId};
use std::str::FromStr;

/// Separator between the kind tag and each field.
pub const FIELD_SEPARATOR: char = '#';

/// Separator between the elements of a list field.
pub const LIST_SEPARATOR: char = ',';

/// Placeholder for an absent optional value.
pub const NONE_MARKER: &str = "-";

/// Placeholder for the container object's id.
pub const OWNER_SENTINEL: &str = "owner";

const NEWLINE_TOKEN: &str = "<br>";

/// Escapes free text so it can be stored inside one field.
///
/// The mapping is lossy: a literal `&` or `<br>` already present in the
/// text comes back from [`unescape`] as `#` or a line break. Text equality
/// of traits is unaffected, since both sides escape the same way.
pub fn escape(text: &str) -> String {
    text.replace(FIELD_SEPARATOR, "&").replace('\n', NEWLINE_TOKEN)
}

/// Reverses [`escape`].
pub fn unescape(text: &str) -> String {
    text.replace(NEWLINE_TOKEN, "\n").replace('&', "#")
}

pub fn opt_to_text<T: ToString>(value: Option<T>) -> String {
    value
        .map(|v| v.to_string())
        .unwrap_or_else(|| NONE_MARKER.to_string())
}

/// Joins a kind tag and its fields.
pub fn join(kind: &str, fields: Vec<String>) -> String {
    let mut text = kind.to_string();
    for field in fields {
        text.push(FIELD_SEPARATOR);
        text.push_str(&field);
    }
    text
}

/// Positional reader over the fields of one trait text.
#[derive(Debug)]
pub struct Fields<'a> {
    text: &'a str,
    parts: Vec<&'a str>,
    cursor: usize,
    container: Option<ObjId>,
}

impl<'a> Fields<'a> {
    /// Splits a trait text into its kind tag and a reader over the rest.
    pub fn split(text: &'a str, container: Option<ObjId>) -> DelveResult<(&'a str, Fields<'a>)> {
        let mut parts: Vec<&str> = text.split(FIELD_SEPARATOR).collect();
        let kind = parts.remove(0);
        if kind.is_empty() {
            return Err(DelveError::trait_parse(text, "missing kind tag"));
        }
        Ok((
            kind,
            Fields {
                text,
                parts,
                cursor: 0,
                container,
            },
        ))
    }

    pub fn text(&self) -> &'a str {
        self.text
    }

    pub fn container(&self) -> Option<ObjId> {
        self.container
    }

    /// Number of fields not read yet.
    pub fn remaining(&self) -> usize {
        self.parts.len() - self.cursor
    }

    fn error(&self, reason: impl Into<String>) -> DelveError {
        DelveError::trait_parse(self.text, reason)
    }

    pub fn next_raw(&mut self) -> DelveResult<&'a str> {
        let part = self
            .parts
            .get(self.cursor)
            .copied()
            .ok_or_else(|| self.error(format!("expected field {}", self.cursor + 1)))?;
        self.cursor += 1;
        Ok(part)
    }

    pub fn next<T: FromStr>(&mut self) -> DelveResult<T> {
        let raw = self.next_raw()?;
        raw.parse::<T>()
            .map_err(|_| self.error(format!("bad value '{}' in field {}", raw, self.cursor)))
    }

    pub fn next_opt<T: FromStr>(&mut self) -> DelveResult<Option<T>> {
        let raw = self.next_raw()?;
        if raw == NONE_MARKER {
            return Ok(None);
        }
        raw.parse::<T>()
            .map(Some)
            .map_err(|_| self.error(format!("bad value '{}' in field {}", raw, self.cursor)))
    }

    /// Reads an owner id, resolving the `owner` sentinel to the container.
    pub fn next_owner(&mut self) -> DelveResult<Option<ObjId>> {
        let raw = self.next_raw()?;
        if raw == OWNER_SENTINEL {
            return self
                .container
                .map(Some)
                .ok_or_else(|| self.error("'owner' used without a container object"));
        }
        if raw == NONE_MARKER {
            return Ok(None);
        }
        raw.parse::<ObjId>()
            .map(Some)
            .map_err(|_| self.error(format!("bad owner '{}'", raw)))
    }

    /// Reads an owner that must be present.
    pub fn next_required_owner(&mut self) -> DelveResult<ObjId> {
        self.next_owner()?
            .ok_or_else(|| self.error(format!("field {} needs an owner", self.cursor)))
    }

    pub fn next_text(&mut self) -> DelveResult<String> {
        self.next_raw().map(unescape)
    }

    pub fn next_list<T: FromStr>(&mut self) -> DelveResult<Vec<T>> {
        let raw = self.next_raw()?;
        if raw.is_empty() {
            return Ok(Vec::new());
        }
        raw.split(LIST_SEPARATOR)
            .map(|item| {
                item.parse::<T>()
                    .map_err(|_| self.error(format!("bad list element '{}'", item)))
            })
            .collect()
    }

    /// Reads an optional trailing field, such as the granting source.
    pub fn next_trailing_opt<T: FromStr>(&mut self) -> DelveResult<Option<T>> {
        if self.remaining() == 0 {
            return Ok(None);
        }
        self.next_opt()
    }

    /// Every field not read yet, unescaped.
    pub fn rest_as_text(&mut self) -> Vec<String> {
        let rest = self.parts[self.cursor..].iter().map(|p| unescape(p)).collect();
        self.cursor = self.parts.len();
        rest
    }

    /// Fails if unread fields are left over.
    pub fn finish(self) -> DelveResult<()> {
        if self.remaining() > 0 {
            return Err(self.error(format!(
                "{} unexpected trailing field(s)",
                self.remaining()
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_round_trip() {
        let chant = "Praise #1\nthe deep";
        let escaped = escape(chant);
        assert!(!escaped.contains('#'));
        assert!(!escaped.contains('\n'));
        assert_eq!(unescape(&escaped), chant);
    }

    #[test]
    fn test_literal_ampersand_reads_back_as_separator() {
        assert_eq!(unescape(&escape("salt & ash")), "salt # ash");
        assert_eq!(unescape(&escape("a<br>b")), "a\nb");
        assert_eq!(escape("salt & ash"), escape("salt # ash"));
    }

    #[test]
    fn test_field_reader() {
        let (kind, mut fields) = Fields::split("Poisoned#12#3#-#owner", Some(9)).unwrap();
        assert_eq!(kind, "Poisoned");
        assert_eq!(fields.next::<i32>().unwrap(), 12);
        assert_eq!(fields.next::<u32>().unwrap(), 3);
        assert_eq!(fields.next_opt::<u64>().unwrap(), None);
        assert_eq!(fields.next_owner().unwrap(), Some(9));
        assert!(fields.finish().is_ok());
    }

    #[test]
    fn test_owner_sentinel_needs_container() {
        let (_, mut fields) = Fields::split("Rage#owner", None).unwrap();
        assert!(fields.next_owner().is_err());
    }

    #[test]
    fn test_missing_and_extra_fields() {
        let (_, mut fields) = Fields::split("Damage#1", None).unwrap();
        assert!(fields.next::<u32>().is_ok());
        assert!(fields.next::<u32>().is_err());

        let (_, mut fields) = Fields::split("Rage#3#4", None).unwrap();
        fields.next_owner().unwrap();
        assert!(fields.finish().is_err());
    }

    #[test]
    fn test_lists() {
        let (_, mut fields) = Fields::split("Worshipper#4,7", None).unwrap();
        assert_eq!(fields.next_list::<i32>().unwrap(), vec![4, 7]);
        assert_eq!(join("Worshipper", vec!["4,7".into()]), "Worshipper#4,7");
    }
}
