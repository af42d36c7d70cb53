use std::fmt;

use crate::error::{Result, StoreError};

pub const MAX_ROOM_NAME_LEN: usize = 48;
pub const MAX_FILE_NAME_LEN: usize = 255;

/// A room name that passed validation: 1..=48 chars of `[a-z0-9-]`.
///
/// The only way to get a room directory from the store is through this type,
/// so an unchecked name never reaches a path join.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RoomName(String);

impl RoomName {
    pub fn parse(raw: &str) -> Result<Self> {
        if raw.is_empty() || raw.len() > MAX_ROOM_NAME_LEN {
            return Err(StoreError::InvalidName(format!(
                "room name must be 1-{} characters",
                MAX_ROOM_NAME_LEN
            )));
        }
        if !raw
            .bytes()
            .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'-')
        {
            return Err(StoreError::InvalidName(
                "room name may only contain a-z, 0-9 and '-'".into(),
            ));
        }
        Ok(Self(raw.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RoomName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for RoomName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Reduce an untrusted file name to its last path segment.
///
/// Both `/` and `\` count as separators. Whatever is left must be a plain
/// entry name: not empty, not `.` or `..`, no NUL, at most 255 bytes.
pub fn sanitize_file_name(raw: &str) -> Result<String> {
    let last = raw.rsplit(['/', '\\']).next().unwrap_or_default();

    if last.is_empty() || last == "." || last == ".." {
        return Err(StoreError::InvalidName(format!("bad file name {:?}", raw)));
    }
    if last.contains('\0') || last.len() > MAX_FILE_NAME_LEN {
        return Err(StoreError::InvalidName("bad file name".into()));
    }
    Ok(last.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_simple_room_names() {
        let longest = "x".repeat(MAX_ROOM_NAME_LEN);
        for ok in ["photos", "a", "room-42", "0-0", longest.as_str()] {
            assert_eq!(RoomName::parse(ok).unwrap().as_str(), ok);
        }
    }

    #[test]
    fn rejects_bad_room_names() {
        let too_long = "x".repeat(MAX_ROOM_NAME_LEN + 1);
        for bad in [
            "",
            "../etc",
            "..",
            "Photos",
            "with space",
            "a/b",
            "a\\b",
            "a.b",
            "ünï",
            "a\0",
            too_long.as_str(),
        ] {
            assert!(
                matches!(RoomName::parse(bad), Err(StoreError::InvalidName(_))),
                "{:?} should be rejected",
                bad
            );
        }
    }

    #[test]
    fn file_names_keep_only_last_segment() {
        assert_eq!(sanitize_file_name("cat.png").unwrap(), "cat.png");
        assert_eq!(sanitize_file_name("../../etc/passwd").unwrap(), "passwd");
        assert_eq!(sanitize_file_name("..\\..\\boot.ini").unwrap(), "boot.ini");
        assert_eq!(sanitize_file_name("/abs/path/x.txt").unwrap(), "x.txt");
        assert_eq!(sanitize_file_name("a/./b").unwrap(), "b");
    }

    #[test]
    fn file_names_reject_dot_entries() {
        for bad in ["", ".", "..", "a/..", "dir/", "a\\.", "x\0y"] {
            assert!(sanitize_file_name(bad).is_err(), "{:?} should be rejected", bad);
        }
        assert!(sanitize_file_name(&"f".repeat(MAX_FILE_NAME_LEN + 1)).is_err());
    }
}
