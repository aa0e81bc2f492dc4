use std::fs;
use std::io;

use shared_resources::config::BACKUP_FILE;
use shared_resources::message::MasterData;

/// Best-effort snapshot to disk, once per tick. The in-memory state stays
/// authoritative when this fails.
pub fn save(data: &MasterData) -> io::Result<()> {
    let encoded = serde_json::to_string(data).map_err(io::Error::from)?;
    fs::write(BACKUP_FILE, encoded)
}

/// The recovery path when both the master and its designated backup are
/// lost. Unreadable or stale-format files are treated as absent.
pub fn load() -> Option<MasterData> {
    let contents = fs::read_to_string(BACKUP_FILE).ok()?;
    serde_json::from_str(&contents).ok()
}
