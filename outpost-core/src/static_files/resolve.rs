use std::path::{Component, Path, PathBuf};

const INDEX_FILE: &str = "index.html";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolveError {
    NotFound,
    Forbidden,
    BadPath,
}

/// Map a request path onto a regular file below `root`.
///
/// Any segment starting with '.' is refused, which covers both traversal
/// (`..`) and hidden files such as `.git` or `.env`. Directories resolve to
/// their `index.html`.
pub fn resolve_static_path(root: &Path, request_path: &str) -> Result<PathBuf, ResolveError> {
    if !request_path.starts_with('/') {
        return Err(ResolveError::BadPath);
    }

    // Percent-decode ONCE
    let decoded = percent_encoding::percent_decode_str(request_path)
        .decode_utf8()
        .map_err(|_| ResolveError::BadPath)?;

    if decoded.contains('\0') {
        return Err(ResolveError::BadPath);
    }

    if decoded.split('/').any(|segment| segment.starts_with('.')) {
        return Err(ResolveError::Forbidden);
    }

    let decoded = decoded.trim_start_matches('/');
    let relative_path = if decoded.is_empty() {
        PathBuf::from(INDEX_FILE)
    } else {
        PathBuf::from(decoded)
    };

    // No traversal, no absolute paths
    if !relative_path
        .components()
        .all(|component| matches!(component, Component::Normal(_)))
    {
        return Err(ResolveError::Forbidden);
    }

    let root_canon = root.canonicalize().map_err(|_| ResolveError::Forbidden)?;
    let target_canon = root
        .join(&relative_path)
        .canonicalize()
        .map_err(|_| ResolveError::NotFound)?;

    // Symlinks may still point outside the root.
    if !target_canon.starts_with(&root_canon) {
        return Err(ResolveError::Forbidden);
    }

    if target_canon.is_dir() {
        let index = target_canon.join(INDEX_FILE);
        return if index.is_file() {
            Ok(index)
        } else {
            Err(ResolveError::Forbidden)
        };
    }

    if !target_canon.is_file() {
        return Err(ResolveError::NotFound);
    }

    Ok(target_canon)
}
