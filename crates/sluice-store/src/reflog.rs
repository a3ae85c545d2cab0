use std::io::Write;

use sluice_core::id::ObjectId;

use crate::layout::RepoLayout;
use crate::StoreError;

#[derive(Debug, Clone)]
pub struct RefLogLine {
    pub old: ObjectId,
    pub new: ObjectId,
    pub timestamp_ms: u64,
    pub author: String,
    pub message: String,
}

pub fn append_reflog(
    layout: &RepoLayout,
    ref_name: &str,
    old: &ObjectId,
    new: &ObjectId,
    author: &str,
    message: &str,
) -> Result<(), StoreError> {
    let path = layout.reflogs_dir().join(ref_name);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let timestamp_ms = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64;
    // Author is a single field; the message runs to end of line.
    let author: String = author
        .chars()
        .map(|c| if c.is_whitespace() { '_' } else { c })
        .collect();
    let message = message.replace('\n', " ");
    let line = format!(
        "{} {} {} {} {}\n",
        old.to_hex(),
        new.to_hex(),
        timestamp_ms,
        author,
        message
    );
    let mut file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)?;
    file.write_all(line.as_bytes())?;
    Ok(())
}

pub fn read_reflog(layout: &RepoLayout, ref_name: &str) -> Result<Vec<RefLogLine>, StoreError> {
    let path = layout.reflogs_dir().join(ref_name);
    if !path.exists() {
        return Ok(Vec::new());
    }
    let content = std::fs::read_to_string(&path)?;
    let mut entries = Vec::new();
    for line in content.lines() {
        let parts: Vec<&str> = line.splitn(5, ' ').collect();
        if parts.len() < 5 {
            continue;
        }
        let (Ok(old), Ok(new), Ok(timestamp_ms)) = (
            ObjectId::from_hex(parts[0]),
            ObjectId::from_hex(parts[1]),
            parts[2].parse::<u64>(),
        ) else {
            continue; // skip corrupt line
        };
        entries.push(RefLogLine {
            old,
            new,
            timestamp_ms,
            author: parts[3].to_string(),
            message: parts[4].to_string(),
        });
    }
    Ok(entries)
}
