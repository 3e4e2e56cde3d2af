//! Archive naming rules
//!
//! The archive store is a flat directory, so every name that reaches it must
//! be a single path component ending in `.wacz`.

use uuid::Uuid;

pub const ARCHIVE_EXTENSION: &str = "wacz";

/// Turns a user supplied name into an archive file name
///
/// Whitespace and path separators become `-`, and the `.wacz` extension is
/// appended unless already present.
pub fn sanitize_archive_name(name: &str) -> String {
    let cleaned: String = name
        .trim()
        .chars()
        .map(|c| {
            if c.is_whitespace() || c == '/' || c == '\\' {
                '-'
            } else {
                c
            }
        })
        .collect();

    if has_archive_extension(&cleaned) {
        cleaned
    } else {
        format!("{}.{}", cleaned, ARCHIVE_EXTENSION)
    }
}

/// Name under which a finished job's archive is stored
pub fn archive_file_name(name: Option<&str>, job_id: Uuid) -> String {
    match name.map(str::trim).filter(|n| !n.is_empty()) {
        Some(name) => sanitize_archive_name(name),
        None => format!("{}.{}", job_id, ARCHIVE_EXTENSION),
    }
}

pub fn has_archive_extension(name: &str) -> bool {
    name.strip_suffix(ARCHIVE_EXTENSION)
        .is_some_and(|stem| stem.ends_with('.') && stem.len() > 1)
}

/// Whether `name` can be used as-is inside the archive directory
pub fn is_safe_archive_name(name: &str) -> bool {
    !name.is_empty()
        && name != "."
        && name != ".."
        && !name.contains(['/', '\\', '\0'])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_replaces_spaces() {
        assert_eq!(sanitize_archive_name("my new name"), "my-new-name.wacz");
    }

    #[test]
    fn test_sanitize_keeps_extension() {
        assert_eq!(sanitize_archive_name("existing.wacz"), "existing.wacz");
        assert_eq!(sanitize_archive_name("new"), "new.wacz");
    }

    #[test]
    fn test_sanitize_flattens_paths() {
        let name = sanitize_archive_name("../etc/passwd");
        assert!(is_safe_archive_name(&name));
        assert_eq!(name, "..-etc-passwd.wacz");
    }

    #[test]
    fn test_archive_file_name_falls_back_to_job_id() {
        let id = Uuid::new_v4();
        assert_eq!(archive_file_name(None, id), format!("{}.wacz", id));
        assert_eq!(archive_file_name(Some("  "), id), format!("{}.wacz", id));
        assert_eq!(archive_file_name(Some("docs site"), id), "docs-site.wacz");
    }

    #[test]
    fn test_extension_check() {
        assert!(has_archive_extension("a.wacz"));
        assert!(!has_archive_extension(".wacz"));
        assert!(!has_archive_extension("awacz"));
        assert!(!has_archive_extension("a.zip"));
    }

    #[test]
    fn test_safe_names() {
        assert!(is_safe_archive_name("site.wacz"));
        assert!(!is_safe_archive_name(""));
        assert!(!is_safe_archive_name(".."));
        assert!(!is_safe_archive_name("a/b.wacz"));
        assert!(!is_safe_archive_name("a\\b.wacz"));
    }
}
