//! Path Strings
//!
//! Paths cross the backend boundary as strings and may use either `/` or
//! `\`. Everything in the core compares and keys on the normalized form:
//! forward slashes, no trailing separator.

/// Forward slashes, no trailing separator (a bare "/" stays "/")
pub fn normalize(path: &str) -> String {
    let unified = path.replace('\\', "/");
    let trimmed = unified.trim_end_matches('/');
    if trimmed.is_empty() && unified.starts_with('/') {
        "/".to_string()
    } else {
        trimmed.to_string()
    }
}

pub fn same_path(a: &str, b: &str) -> bool {
    normalize(a) == normalize(b)
}

/// `path` relative to `root`, or `None` when it lies outside
///
/// Returns `Some("")` when both are the same folder.
pub fn relative_to(root: &str, path: &str) -> Option<String> {
    let root = normalize(root);
    let path = normalize(path);
    if root == "/" {
        return path.strip_prefix('/').map(str::to_string);
    }
    let rest = path.strip_prefix(root.as_str())?;
    if rest.is_empty() {
        Some(String::new())
    } else {
        rest.strip_prefix('/').map(str::to_string)
    }
}

/// Non-empty segments of a normalized relative path
pub fn segments(relative: &str) -> impl Iterator<Item = &str> {
    relative.split('/').filter(|s| !s.is_empty())
}

pub fn join(base: &str, name: &str) -> String {
    let base = normalize(base);
    if base == "/" {
        format!("/{}", name)
    } else {
        format!("{}/{}", base, name)
    }
}

/// Parent folder of a normalized path
pub fn parent(path: &str) -> Option<String> {
    let path = normalize(path);
    let idx = path.rfind('/')?;
    if idx == 0 {
        Some("/".to_string())
    } else {
        Some(path[..idx].to_string())
    }
}

/// Last segment of the path
pub fn file_name(path: &str) -> String {
    let path = normalize(path);
    match path.rfind('/') {
        Some(idx) => path[idx + 1..].to_string(),
        None => path,
    }
}

/// Filename without its extension
pub fn file_stem(path: &str) -> String {
    let name = file_name(path);
    match name.rfind('.') {
        Some(idx) if idx > 0 => name[..idx].to_string(),
        _ => name,
    }
}

pub fn extension(path: &str) -> Option<String> {
    let name = file_name(path);
    match name.rfind('.') {
        Some(idx) if idx > 0 && idx + 1 < name.len() => Some(name[idx + 1..].to_string()),
        _ => None,
    }
}

/// True when `path` is `folder` itself or anything below it
pub fn is_within(path: &str, folder: &str) -> bool {
    relative_to(folder, path).is_some()
}

/// Move `path` from under `old_prefix` to under `new_prefix`
pub fn rebase(path: &str, old_prefix: &str, new_prefix: &str) -> Option<String> {
    let rest = relative_to(old_prefix, path)?;
    if rest.is_empty() {
        Some(normalize(new_prefix))
    } else {
        Some(join(new_prefix, &rest))
    }
}
