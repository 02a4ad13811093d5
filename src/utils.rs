use std::fs::create_dir_all;
use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use shellexpand::tilde;

use crate::constants::{APPLICATION, ORGANIZATION, QUALIFIER};
use crate::errors::{Result, generic_error};

pub(crate) fn find_project_folder() -> Result<ProjectDirs> {
    let folder = ProjectDirs::from(QUALIFIER, ORGANIZATION, APPLICATION)
        .ok_or_else(|| generic_error("Failed to determine project directories"))?;

    if !folder.config_dir().exists() {
        create_dir_all(folder.config_dir())?;
    }
    Ok(folder)
}

#[cfg(unix)]
pub(crate) fn is_hidden_file(path: &Path) -> bool {
    path.file_name()
        .and_then(|name| name.to_str())
        .is_some_and(|name| name.starts_with('.'))
}

#[cfg(windows)]
pub(crate) fn is_hidden_file(path: &Path) -> bool {
    use std::os::windows::fs::MetadataExt;

    if let Ok(metadata) = path.metadata() {
        metadata.file_attributes() & 0x2 != 0 // FILE_ATTRIBUTE_HIDDEN
    } else {
        false
    }
}

/// Expands `~` and turns a bare drive letter (`C:`) into a drive root
pub fn process_path<S: AsRef<str>>(path: S) -> String {
    let mut expanded = tilde(path.as_ref()).to_string();
    if expanded.ends_with(':') {
        expanded += "\\";
    }
    expanded
}

/// Appends one configured path segment, resolving `~`, `.` and `..`
pub(crate) fn add_segment_to_path(segment: &str, path: &mut PathBuf) {
    if segment.starts_with('~') {
        path.push(process_path(segment));
    } else if segment == "." {
        match std::env::current_dir() {
            Ok(current) => path.push(current),
            Err(_) => path.push(segment),
        }
    } else if segment == ".." {
        path.pop();
    } else {
        path.push(segment);
    }
}

/// Student id and name from a submission file name
///
/// Submissions are saved as `<id> <name>.ows`; the stem is split at the
/// first space. A stem without a space is all id.
pub fn parse_submission_name(path: &Path) -> (String, String) {
    let stem = path
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default();

    match stem.split_once(' ') {
        Some((id, name)) => (id.to_string(), name.trim().to_string()),
        None => (stem, String::new()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_submission_name() {
        assert_eq!(
            parse_submission_name(Path::new("/inbox/30101 Kim Minji.ows")),
            ("30101".to_string(), "Kim Minji".to_string())
        );
        assert_eq!(
            parse_submission_name(Path::new("30101.ows")),
            ("30101".to_string(), String::new())
        );
    }

    #[test]
    fn test_add_segment_to_path() {
        let mut path = PathBuf::from("/srv");
        add_segment_to_path("grading", &mut path);
        add_segment_to_path("inbox", &mut path);
        add_segment_to_path("..", &mut path);
        assert_eq!(path, PathBuf::from("/srv/grading"));
    }

    #[test]
    fn test_process_path_keeps_plain_paths() {
        assert_eq!(process_path("/srv/grading"), "/srv/grading");
        assert_eq!(process_path("C:"), "C:\\");
    }

    #[cfg(unix)]
    #[test]
    fn test_is_hidden_file() {
        assert!(is_hidden_file(Path::new("/inbox/.~lock.ows")));
        assert!(!is_hidden_file(Path::new("/inbox/30101 Kim.ows")));
    }
}
