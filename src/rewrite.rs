use crate::error::ProxyError;

/// Lexically normalizes a rooted path.
///
/// Collapses repeated `/`, drops `.` segments and resolves `..` against the
/// preceding segment (`..` at the root is dropped). The result starts with `/`
/// and has no trailing `/` unless it is the root itself.
pub fn clean_path(raw: &str) -> String {
    let mut segments: Vec<&str> = Vec::new();

    for segment in raw.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            other => segments.push(other),
        }
    }

    let mut cleaned = String::with_capacity(raw.len());
    for segment in &segments {
        cleaned.push('/');
        cleaned.push_str(segment);
    }
    if cleaned.is_empty() {
        cleaned.push('/');
    }
    cleaned
}

/// Drops the routing prefix segment from an inbound path.
///
/// `/o/v1/models` becomes `/v1/models`. A path with nothing after the prefix
/// (`/c`, `/c/`, `/`) has no upstream path to map to and is rejected.
pub fn rewrite_path(raw: &str) -> Result<String, ProxyError> {
    let cleaned = clean_path(raw);

    let mut parts = cleaned.splitn(3, '/');
    let _leading = parts.next();
    let _prefix = parts.next();
    match parts.next() {
        Some(rest) => Ok(format!("/{}", rest)),
        None => Err(ProxyError::InvalidPath(raw.to_string())),
    }
}
