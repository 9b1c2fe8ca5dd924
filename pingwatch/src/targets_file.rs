//! Parses the `targets` file into resolved [`pingwatch_core::Target`]s.
//!
//! Format: one entry per line. Leading spaces set the entry's rank. A blank
//! line marks the following entry `detached`. The first token is a hostname
//! or literal address; the remainder of the line is a free-text annotation,
//! where a handful of punctuation characters double as box-drawing glyphs
//! in the map (handled by the renderer, not here).

use std::fmt;
use std::fs;
use std::net::IpAddr;
use std::path::Path;

use dns_lookup::lookup_host;
use pingwatch_core::Target;

const ID_SEQUENCE: &str = "ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
const MAX_ADDRS_PER_NAME: usize = 10;

/// Display id used once [`ID_SEQUENCE`] is exhausted, matching the
/// original's `IDSEQUENCE` overflow behavior rather than aborting startup.
const OVERFLOW_ID: char = '?';

#[derive(Debug, thiserror::Error)]
pub enum TargetsFileError {
    #[error("cannot read targets file {path}: {source}")]
    Read { path: String, source: std::io::Error },
    #[error("no resolvable targets in {path}")]
    Empty { path: String },
}

struct Entry {
    token: String,
    annotation: Option<String>,
    rank: u32,
    detached: bool,
}

fn parse_entries(contents: &str) -> Vec<Entry> {
    let mut entries = Vec::new();
    let mut pending_detached = false;

    for line in contents.lines() {
        if line.trim().is_empty() {
            pending_detached = true;
            continue;
        }
        let rank = line.chars().take_while(|c| *c == ' ').count() as u32;
        let trimmed = line.trim_start();
        let mut parts = trimmed.splitn(2, char::is_whitespace);
        let token = match parts.next() {
            Some(t) if !t.is_empty() => t.to_string(),
            _ => continue,
        };
        let annotation = parts.next().map(str::trim).filter(|s| !s.is_empty()).map(str::to_string);

        entries.push(Entry {
            token,
            annotation,
            rank,
            detached: pending_detached,
        });
        pending_detached = false;
    }
    entries
}

/// Resolves a hostname or literal address into up to [`MAX_ADDRS_PER_NAME`]
/// `IpAddr`s. Resolution failures are the caller's concern (logged to
/// stderr and skipped), not propagated as an error here.
fn resolve(token: &str) -> Vec<IpAddr> {
    if let Ok(addr) = token.parse::<IpAddr>() {
        return vec![addr];
    }
    match lookup_host(token) {
        Ok(addrs) => addrs.into_iter().take(MAX_ADDRS_PER_NAME).collect(),
        Err(e) => {
            eprintln!("warning: could not resolve '{token}': {e}");
            Vec::new()
        }
    }
}

/// Reads and resolves the targets file at `path`, producing a dense
/// `Target` vector with stable `num` indices in file order (a name that
/// resolves to several addresses yields consecutive targets sharing one
/// display id).
pub fn load(path: &Path) -> Result<Vec<Target>, TargetsFileError> {
    let contents = fs::read_to_string(path).map_err(|source| TargetsFileError::Read {
        path: path.display().to_string(),
        source,
    })?;

    let entries = parse_entries(&contents);
    let mut ids = ID_SEQUENCE.chars();
    let mut targets = Vec::new();

    for entry in entries {
        let addrs = resolve(&entry.token);
        if addrs.is_empty() {
            continue;
        }
        let id = ids.next().unwrap_or_else(|| {
            log::warn!("display id sequence exhausted ({} ids); '{OVERFLOW_ID}' assigned from here on", ID_SEQUENCE.len());
            OVERFLOW_ID
        });
        for addr in addrs {
            let num = targets.len();
            targets.push(Target::new(
                num,
                id,
                entry.token.clone(),
                addr.to_string(),
                addr,
                entry.rank,
                entry.detached,
                entry.annotation.clone(),
            ));
        }
    }

    if targets.is_empty() {
        return Err(TargetsFileError::Empty { path: path.display().to_string() });
    }
    Ok(targets)
}

impl fmt::Debug for Entry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Entry")
            .field("token", &self.token)
            .field("rank", &self.rank)
            .field("detached", &self.detached)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_fixture(contents: &str) -> NamedTempFile {
        let mut f = NamedTempFile::new().unwrap();
        f.write_all(contents.as_bytes()).unwrap();
        f
    }

    #[test]
    fn rank_follows_leading_spaces() {
        let entries = parse_entries("router\n  switch1 core switch\n    host1\n");
        assert_eq!(entries[0].rank, 0);
        assert_eq!(entries[1].rank, 2);
        assert_eq!(entries[1].annotation.as_deref(), Some("core switch"));
        assert_eq!(entries[2].rank, 4);
    }

    #[test]
    fn blank_line_marks_next_entry_detached() {
        let entries = parse_entries("router\n\nremote-host\n");
        assert!(!entries[0].detached);
        assert!(entries[1].detached);
    }

    #[test]
    fn literal_ip_resolves_without_dns() {
        let f = write_fixture("127.0.0.1 loopback\n");
        let targets = load(f.path()).unwrap();
        assert_eq!(targets.len(), 1);
        assert_eq!(targets[0].addr, IpAddr::V4(std::net::Ipv4Addr::LOCALHOST));
        assert_eq!(targets[0].annotation.as_deref(), Some("loopback"));
        assert_eq!(targets[0].id, 'A');
    }

    #[test]
    fn empty_file_is_an_error() {
        let f = write_fixture("\n\n");
        let err = load(f.path()).unwrap_err();
        assert!(matches!(err, TargetsFileError::Empty { .. }));
    }

    #[test]
    fn missing_file_is_an_error() {
        let err = load(Path::new("/nonexistent/targets")).unwrap_err();
        assert!(matches!(err, TargetsFileError::Read { .. }));
    }

    #[test]
    fn ids_assigned_in_file_order() {
        let f = write_fixture("127.0.0.1\n127.0.0.2\n");
        let targets = load(f.path()).unwrap();
        assert_eq!(targets[0].id, 'A');
        assert_eq!(targets[1].id, 'B');
        assert_eq!(targets[0].num, 0);
        assert_eq!(targets[1].num, 1);
    }

    #[test]
    fn exhausted_id_sequence_falls_back_to_placeholder_instead_of_erroring() {
        let mut contents = String::new();
        for n in 1..=(ID_SEQUENCE.len() + 4) {
            contents.push_str(&format!("127.0.{}.{}\n", n / 256, n % 256));
        }
        let f = write_fixture(&contents);
        let targets = load(f.path()).unwrap();
        assert_eq!(targets.len(), ID_SEQUENCE.len() + 4);
        assert_eq!(targets[ID_SEQUENCE.len() - 1].id, ID_SEQUENCE.chars().last().unwrap());
        assert_eq!(targets[ID_SEQUENCE.len()].id, OVERFLOW_ID);
        assert_eq!(targets.last().unwrap().id, OVERFLOW_ID);
    }
}
