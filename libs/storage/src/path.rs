use std::path::Path;

/// Object key for a local file published under `prefix`.
/// Format: {prefix}/{basename}
pub fn remote_key(prefix: &str, local: &Path) -> Option<String> {
    let name = local.file_name()?.to_str()?;
    let prefix = prefix.trim_matches('/');
    if prefix.is_empty() {
        Some(name.to_string())
    } else {
        Some(format!("{}/{}", prefix, name))
    }
}

/// Validate storage path format
pub fn validate_path(path: &str) -> bool {
    !path.is_empty() && !path.contains("..") && !path.starts_with('/')
}
