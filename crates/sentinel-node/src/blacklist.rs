use std::fs;
use std::io;
use std::path::Path;

use sentinel_core::BlacklistRecord;

/// Loads the JSON array at `path`. A missing or unparseable file is treated
/// as empty — the write path below always produces a well-formed file, so a
/// parse failure here only happens from external tampering or partial
/// writes from another process, and either way the safest recovery is to
/// start fresh rather than abort the tick.
pub fn load(path: &Path) -> Vec<BlacklistRecord> {
    match fs::read_to_string(path) {
        Ok(contents) => serde_json::from_str(&contents).unwrap_or_default(),
        Err(_) => Vec::new(),
    }
}

/// Writes `records` back to `path` atomically: serialize to a sibling temp
/// file, then rename over the target. A rename within the same directory is
/// atomic on the platforms this workspace targets, so a crash mid-write
/// never leaves a half-written blacklist behind.
pub fn save(path: &Path, records: &[BlacklistRecord]) -> io::Result<()> {
    let parent = path.parent().unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(parent)?;
    let tmp_path = parent.join(format!(
        ".{}.tmp",
        path.file_name().and_then(|n| n.to_str()).unwrap_or("blacklist")
    ));
    let json = serde_json::to_string_pretty(records).unwrap_or_else(|_| "[]".to_string());
    fs::write(&tmp_path, json)?;
    fs::rename(&tmp_path, path)?;
    Ok(())
}

/// Appends `record` to whatever is currently at `path`, writing back
/// atomically. This is the operation `Node::apply_accepted` drives.
pub fn append(path: &Path, record: BlacklistRecord) -> io::Result<()> {
    let mut records = load(path);
    records.push(record);
    save(path, &records)
}
