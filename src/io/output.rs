use std::fs::Permissions;
use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Serialize;
use serde_json::ser::{PrettyFormatter, Serializer};
use tempfile::Builder;

/// Render JSON with a 4-space indent and non-ASCII characters kept as-is
pub fn to_pretty_json<T: Serialize>(value: &T) -> Result<String> {
    let mut buffer = Vec::new();
    let mut serializer = Serializer::with_formatter(&mut buffer, PrettyFormatter::with_indent(b"    "));
    value
        .serialize(&mut serializer)
        .context("Failed to serialize JSON")?;
    String::from_utf8(buffer).context("Serialized JSON is not valid UTF-8")
}

/// Write JSON to `path`
///
/// The document goes to a temporary file beside the destination first and is
/// renamed into place, so a failed run never leaves a half-written file.
/// An existing destination keeps its permissions; a new one gets the same
/// mode a plain create would give it under the current umask.
pub fn write_json_pretty<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let json = to_pretty_json(value)?;

    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut builder = Builder::new();
    if let Some(permissions) = new_file_permissions() {
        builder.permissions(permissions);
    }
    let mut file = builder
        .tempfile_in(dir)
        .with_context(|| format!("Failed to create file in {:?}", dir))?;
    file.write_all(json.as_bytes())
        .with_context(|| format!("Failed to write JSON for {:?}", path))?;

    if let Ok(existing) = std::fs::metadata(path) {
        file.as_file()
            .set_permissions(existing.permissions())
            .with_context(|| format!("Failed to copy permissions of {:?}", path))?;
    }
    file.persist(path)
        .with_context(|| format!("Failed to create file: {:?}", path))?;
    Ok(())
}

/// Mode requested at creation; the OS applies the umask to it
#[cfg(unix)]
fn new_file_permissions() -> Option<Permissions> {
    use std::os::unix::fs::PermissionsExt;
    Some(Permissions::from_mode(0o666))
}

#[cfg(not(unix))]
fn new_file_permissions() -> Option<Permissions> {
    None
}
