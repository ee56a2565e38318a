//! Purpose: Keyed durable storage for player records.
//! Exports: `PlayerStore`, `FileStore`, `MemoryStore`.
//! Role: The only stateful collaborator; everything above it is pure.
//! Invariants: Ids are assigned once, monotonically, and never reused.
//! Invariants: `scan_all` preserves insertion order; no filtering happens here.
//! Invariants: File writes hold an exclusive lock across the whole
//! read-modify-write, giving single-key atomicity to concurrent processes.

use crate::core::error::{Error, ErrorKind};
use crate::core::player::Player;
use fs2::FileExt;
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

const FORMAT_VERSION: u32 = 1;

/// Record Store capability. Insert assigns the id; the store enforces none of
/// the field validity rules, so callers validate before writing.
pub trait PlayerStore {
    fn insert(&self, player: Player) -> Result<Player, Error>;
    fn replace(&self, player: &Player) -> Result<(), Error>;
    fn fetch(&self, id: i64) -> Result<Option<Player>, Error>;
    fn delete(&self, id: i64) -> Result<bool, Error>;
    fn scan_all(&self) -> Result<Vec<Player>, Error>;
}

#[derive(Debug, Serialize, Deserialize)]
struct RosterDoc {
    format: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    saved_at: Option<String>,
    next_id: i64,
    players: Vec<Player>,
}

impl RosterDoc {
    fn empty() -> Self {
        Self {
            format: FORMAT_VERSION,
            saved_at: None,
            next_id: 1,
            players: Vec::new(),
        }
    }

    fn insert(&mut self, mut player: Player) -> Player {
        player.id = self.next_id;
        self.next_id += 1;
        self.players.push(player.clone());
        player
    }

    fn replace(&mut self, player: &Player) -> bool {
        match self.players.iter_mut().find(|slot| slot.id == player.id) {
            Some(slot) => {
                *slot = player.clone();
                true
            }
            None => false,
        }
    }

    fn remove(&mut self, id: i64) -> bool {
        let before = self.players.len();
        self.players.retain(|player| player.id != id);
        self.players.len() != before
    }

    fn get(&self, id: i64) -> Option<&Player> {
        self.players.iter().find(|player| player.id == id)
    }
}

impl Default for RosterDoc {
    fn default() -> Self {
        Self::empty()
    }
}

/// Roster persisted as a single JSON document. A missing file reads as an
/// empty roster; the first write creates it.
#[derive(Clone, Debug)]
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_doc(&self) -> Result<RosterDoc, Error> {
        let mut file = match File::open(&self.path) {
            Ok(file) => file,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return Ok(RosterDoc::empty());
            }
            Err(err) => return Err(io_error("failed to open roster file", &self.path, err)),
        };
        FileExt::lock_shared(&file)
            .map_err(|err| io_error("failed to lock roster file", &self.path, err))?;
        let mut text = String::new();
        file.read_to_string(&mut text)
            .map_err(|err| io_error("failed to read roster file", &self.path, err))?;
        parse_doc(&text, &self.path)
    }

    fn mutate<T>(&self, apply: impl FnOnce(&mut RosterDoc) -> T) -> Result<T, Error> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .map_err(|err| io_error("failed to create roster directory", parent, err))?;
            }
        }
        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .open(&self.path)
            .map_err(|err| io_error("failed to open roster file", &self.path, err))?;
        FileExt::lock_exclusive(&file)
            .map_err(|err| io_error("failed to lock roster file", &self.path, err))?;

        let mut text = String::new();
        file.read_to_string(&mut text)
            .map_err(|err| io_error("failed to read roster file", &self.path, err))?;
        let mut doc = parse_doc(&text, &self.path)?;

        let out = apply(&mut doc);

        doc.saved_at = Some(now_rfc3339()?);
        let body = serde_json::to_string_pretty(&doc).map_err(|err| {
            Error::new(ErrorKind::Internal)
                .with_message("failed to encode roster document")
                .with_source(err)
        })?;
        file.seek(SeekFrom::Start(0))
            .map_err(|err| io_error("failed to rewind roster file", &self.path, err))?;
        file.set_len(0)
            .map_err(|err| io_error("failed to truncate roster file", &self.path, err))?;
        file.write_all(body.as_bytes())
            .map_err(|err| io_error("failed to write roster file", &self.path, err))?;
        file.write_all(b"\n")
            .map_err(|err| io_error("failed to write roster file", &self.path, err))?;
        file.flush()
            .map_err(|err| io_error("failed to flush roster file", &self.path, err))?;
        Ok(out)
    }
}

impl PlayerStore for FileStore {
    fn insert(&self, player: Player) -> Result<Player, Error> {
        self.mutate(|doc| doc.insert(player))
    }

    fn replace(&self, player: &Player) -> Result<(), Error> {
        let replaced = self.mutate(|doc| doc.replace(player))?;
        if replaced {
            Ok(())
        } else {
            Err(Error::new(ErrorKind::NotFound)
                .with_message("no stored player to replace")
                .with_id(player.id))
        }
    }

    fn fetch(&self, id: i64) -> Result<Option<Player>, Error> {
        Ok(self.read_doc()?.get(id).cloned())
    }

    fn delete(&self, id: i64) -> Result<bool, Error> {
        self.mutate(|doc| doc.remove(id))
    }

    fn scan_all(&self) -> Result<Vec<Player>, Error> {
        Ok(self.read_doc()?.players)
    }
}

/// In-process store for tests and ephemeral serving. Same id and ordering
/// semantics as `FileStore`, no durability.
#[derive(Debug, Default)]
pub struct MemoryStore {
    doc: Mutex<RosterDoc>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn doc(&self) -> MutexGuard<'_, RosterDoc> {
        self.doc.lock().unwrap_or_else(|poison| poison.into_inner())
    }
}

impl PlayerStore for MemoryStore {
    fn insert(&self, player: Player) -> Result<Player, Error> {
        Ok(self.doc().insert(player))
    }

    fn replace(&self, player: &Player) -> Result<(), Error> {
        if self.doc().replace(player) {
            Ok(())
        } else {
            Err(Error::new(ErrorKind::NotFound)
                .with_message("no stored player to replace")
                .with_id(player.id))
        }
    }

    fn fetch(&self, id: i64) -> Result<Option<Player>, Error> {
        Ok(self.doc().get(id).cloned())
    }

    fn delete(&self, id: i64) -> Result<bool, Error> {
        Ok(self.doc().remove(id))
    }

    fn scan_all(&self) -> Result<Vec<Player>, Error> {
        Ok(self.doc().players.clone())
    }
}

fn parse_doc(text: &str, path: &Path) -> Result<RosterDoc, Error> {
    if text.trim().is_empty() {
        return Ok(RosterDoc::empty());
    }
    let doc: RosterDoc = serde_json::from_str(text).map_err(|err| {
        Error::new(ErrorKind::Corrupt)
            .with_message("roster file is not valid json")
            .with_path(path)
            .with_source(err)
    })?;
    if doc.format != FORMAT_VERSION {
        return Err(Error::new(ErrorKind::Corrupt)
            .with_message("unsupported roster format version")
            .with_path(path)
            .with_hint("Recreate the data file or migrate it by hand."));
    }
    Ok(doc)
}

fn now_rfc3339() -> Result<String, Error> {
    OffsetDateTime::now_utc().format(&Rfc3339).map_err(|err| {
        Error::new(ErrorKind::Internal)
            .with_message("failed to format save timestamp")
            .with_source(err)
    })
}

fn io_error(message: &str, path: &Path, err: std::io::Error) -> Error {
    Error::new(ErrorKind::Io)
        .with_message(message)
        .with_path(path)
        .with_source(err)
}
