use crate::error::AppError;

pub const ROOT: &str = "/";

/// Normalize a virtual path: collapse repeated separators, strip the
/// trailing separator (except for root), and prefix a leading separator
/// when absent. Idempotent: `normalize(normalize(p)) == normalize(p)`.
pub fn normalize(path: &str) -> Result<String, AppError> {
    if path.is_empty() {
        return Err(AppError::InvalidPath("path is empty".to_string()));
    }
    if path.contains('\0') {
        return Err(AppError::InvalidPath(
            "path contains a NUL byte".to_string(),
        ));
    }

    let mut normalized = String::with_capacity(path.len() + 1);
    normalized.push('/');
    for segment in path.split('/').filter(|s| !s.is_empty()) {
        if segment == "." || segment == ".." {
            return Err(AppError::InvalidPath(format!(
                "relative segment not allowed: {segment}"
            )));
        }
        if !normalized.ends_with('/') {
            normalized.push('/');
        }
        normalized.push_str(segment);
    }

    Ok(normalized)
}

/// Parent of a normalized path; root's parent is root.
pub fn parent_of(path: &str) -> Result<String, AppError> {
    let path = normalize(path)?;
    if path == ROOT {
        return Ok(path);
    }

    match path.rfind('/') {
        Some(0) => Ok(ROOT.to_string()),
        Some(idx) => Ok(path[..idx].to_string()),
        None => Ok(ROOT.to_string()),
    }
}

/// Join a parent path and an entry name with a single separator.
pub fn join(parent_path: &str, name: &str) -> Result<String, AppError> {
    let parent = normalize(parent_path)?;
    validate_name(name)?;

    if parent == ROOT {
        Ok(format!("/{name}"))
    } else {
        Ok(format!("{parent}/{name}"))
    }
}

/// Final segment of a normalized path; empty for root.
pub fn file_name(path: &str) -> Result<String, AppError> {
    let path = normalize(path)?;
    if path == ROOT {
        return Ok(String::new());
    }
    Ok(path.rsplit('/').next().unwrap_or_default().to_string())
}

/// True when `candidate` lies strictly below `ancestor`. Used for cycle
/// checks: a folder may not move into itself or any of its descendants.
pub fn is_descendant(candidate: &str, ancestor: &str) -> Result<bool, AppError> {
    let candidate = normalize(candidate)?;
    let ancestor = normalize(ancestor)?;

    if candidate == ancestor {
        return Ok(false);
    }
    if ancestor == ROOT {
        return Ok(true);
    }

    Ok(candidate.starts_with(&format!("{ancestor}/")))
}

/// Entry names are single path segments: non-empty, no separator, no NUL,
/// no relative segments.
pub fn validate_name(name: &str) -> Result<(), AppError> {
    if name.is_empty() {
        return Err(AppError::InvalidPath("name is empty".to_string()));
    }
    if name.contains('/') || name.contains('\0') {
        return Err(AppError::InvalidPath(format!(
            "name contains forbidden character: {name}"
        )));
    }
    if name == "." || name == ".." {
        return Err(AppError::InvalidPath(format!(
            "name may not be a relative segment: {name}"
        )));
    }
    Ok(())
}

/// True when the input is already in normalized form.
pub fn is_normalized(path: &str) -> bool {
    matches!(normalize(path), Ok(normalized) if normalized == path)
}
