//! Path manipulation utilities for docserve
//!
//! Paths are `/`-separated strings relative to a backend root. A path that
//! is empty or ends with `/` names a directory; the empty string is the root.

/// Whether `path` names a directory.
pub fn is_directory(path: &str) -> bool {
    path.is_empty() || path.ends_with('/')
}

/// Append a trailing `/` unless `path` already names a directory.
pub fn to_directory(path: &str) -> String {
    if is_directory(path) {
        path.to_string()
    } else {
        format!("{}/", path)
    }
}

/// Join a directory and a relative path, inserting a `/` where needed.
pub fn join(base: &str, rest: &str) -> String {
    if base.is_empty() {
        rest.to_string()
    } else if base.ends_with('/') {
        format!("{}{}", base, rest)
    } else {
        format!("{}/{}", base, rest)
    }
}

/// Split `path` into its parent directory and its final component.
///
/// The parent always names a directory (possibly the root `""`). The final
/// component keeps its trailing `/` when `path` is a directory.
///
/// ```
/// use docserve::path::split_parent;
/// assert_eq!(split_parent("a/b/c.txt"), ("a/b/", "c.txt"));
/// assert_eq!(split_parent("a/b/"), ("a/", "b/"));
/// assert_eq!(split_parent("c.txt"), ("", "c.txt"));
/// ```
pub fn split_parent(path: &str) -> (&str, &str) {
    let trimmed = path.strip_suffix('/').unwrap_or(path);
    match trimmed.rfind('/') {
        Some(index) => (&path[..=index], &path[index + 1..]),
        None => ("", path),
    }
}

/// Split off the extension of the final path component.
///
/// Leading dots of the final component are not treated as an extension
/// separator, so `".hidden"` has no extension.
///
/// ```
/// use docserve::path::split_extension;
/// assert_eq!(split_extension("api/page_action.json"), ("api/page_action", ".json"));
/// assert_eq!(split_extension("api/.hidden"), ("api/.hidden", ""));
/// assert_eq!(split_extension("dir.d/file"), ("dir.d/file", ""));
/// ```
pub fn split_extension(path: &str) -> (&str, &str) {
    let name_start = path.rfind('/').map(|i| i + 1).unwrap_or(0);
    let name = &path[name_start..];
    let leading_dots = name.len() - name.trim_start_matches('.').len();
    match name[leading_dots..].rfind('.') {
        Some(dot) => path.split_at(name_start + leading_dots + dot),
        None => (path, ""),
    }
}

/// Every ancestor directory of `path`, outermost first, excluding the root.
///
/// ```
/// use docserve::path::ancestor_directories;
/// assert_eq!(ancestor_directories("a/b/c.txt"), vec!["a/", "a/b/"]);
/// assert!(ancestor_directories("c.txt").is_empty());
/// ```
pub fn ancestor_directories(path: &str) -> Vec<&str> {
    let trimmed = path.strip_suffix('/').unwrap_or(path);
    trimmed
        .match_indices('/')
        .map(|(index, _)| &path[..=index])
        .collect()
}

/// Convert a display name such as `declarativeContent` or `app.window` into
/// the on-disk spelling `declarative_content` / `app_window`.
///
/// An underscore is inserted at each lower-to-upper transition and before
/// the last capital of an acronym that is followed by a lowercase letter.
/// Periods become underscores and everything is lowercased.
///
/// ```
/// use docserve::path::unix_name;
/// assert_eq!(unix_name("pageAction"), "page_action");
/// assert_eq!(unix_name("app.window"), "app_window");
/// assert_eq!(unix_name("fileSystemProvider"), "file_system_provider");
/// assert_eq!(unix_name("HTMLElement"), "html_element");
/// ```
pub fn unix_name(name: &str) -> String {
    let chars: Vec<char> = name.chars().collect();
    let mut unix = String::with_capacity(name.len() + 4);
    for (i, &c) in chars.iter().enumerate() {
        if c.is_uppercase() && i > 0 && chars[i - 1] != '_' {
            let previous_lower = chars[i - 1].is_lowercase();
            let next_lower = chars.get(i + 1).is_some_and(|n| n.is_lowercase());
            if previous_lower || next_lower {
                unix.push('_');
            }
        }
        if c == '.' {
            unix.push('_');
        } else {
            unix.extend(c.to_lowercase());
        }
    }
    unix
}
