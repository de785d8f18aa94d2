//! Flat-file record store. There is no locking: two processes rewriting the
//! same file race on the swap and one set of changes is lost.

use std::ffi::OsString;
use std::fs::{self, File, OpenOptions};
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::codec::{self, BlockReader, CodecError, Segment, Segments};
use crate::models::SemesterRecord;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store file {path} is unavailable: {source}")]
    Unavailable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("store file {path} was removed but {temp} could not be moved into place: {source}")]
    SwapFailed {
        path: PathBuf,
        temp: PathBuf,
        #[source]
        source: io::Error,
    },
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum KeyPolicy {
    /// Exact, case-insensitive name match; appends of a known name are refused.
    #[default]
    Unique,
    /// Case-insensitive starts-with match on the `Name:` line.
    PerSemester,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SwapMode {
    /// A crash between the delete and the rename leaves no store file.
    #[default]
    DeleteThenRename,
    RenameOver,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Done,
    NotFound,
    Duplicate,
}

struct KeyMatcher {
    key: String,
    policy: KeyPolicy,
}

impl KeyMatcher {
    // Blank names match nothing.
    fn new(name: &str, policy: KeyPolicy) -> Option<Self> {
        let name = name.trim();
        if name.is_empty() {
            return None;
        }
        Some(Self {
            key: format!("{}{}", codec::NAME_PREFIX, name).to_lowercase(),
            policy,
        })
    }

    fn matches_line(&self, line: &str) -> bool {
        let line = line.trim().to_lowercase();
        match self.policy {
            KeyPolicy::Unique => line == self.key,
            KeyPolicy::PerSemester => line.starts_with(&self.key),
        }
    }
}

enum Decision {
    Keep,
    Replace(String),
    Drop,
}

#[derive(Debug, Clone)]
pub struct RecordStore {
    path: PathBuf,
    key_policy: KeyPolicy,
    swap_mode: SwapMode,
}

impl RecordStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            key_policy: KeyPolicy::default(),
            swap_mode: SwapMode::default(),
        }
    }

    pub fn with_key_policy(mut self, key_policy: KeyPolicy) -> Self {
        self.key_policy = key_policy;
        self
    }

    pub fn with_swap_mode(mut self, swap_mode: SwapMode) -> Self {
        self.swap_mode = swap_mode;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn key_policy(&self) -> KeyPolicy {
        self.key_policy
    }

    pub fn append(&self, record: &SemesterRecord) -> Result<Outcome, StoreError> {
        if self.key_policy == KeyPolicy::Unique && self.exists(&record.name) {
            info!(name = %record.name, "append refused, name already stored");
            return Ok(Outcome::Duplicate);
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|source| self.unavailable(source))?;
        file.write_all(codec::encode(record).as_bytes())
            .map_err(|source| self.unavailable(source))?;

        info!(name = %record.name, semester = %record.semester, "record appended");
        Ok(Outcome::Done)
    }

    pub fn exists(&self, name: &str) -> bool {
        let Some(matcher) = KeyMatcher::new(name, self.key_policy) else {
            return false;
        };
        let Some(reader) = self.open_for_read() else {
            return false;
        };
        for segment in Segments::new(reader) {
            match segment {
                Ok(segment) => {
                    if segment.key_line().is_some_and(|key| matcher.matches_line(key)) {
                        return true;
                    }
                }
                Err(err) => {
                    warn!(path = %self.path.display(), error = %err, "scan stopped on read error");
                    break;
                }
            }
        }
        false
    }

    /// Matches in file order. A matching block that fails to decode ends the
    /// search.
    pub fn find_all(&self, name: &str) -> Vec<SemesterRecord> {
        let Some(matcher) = KeyMatcher::new(name, self.key_policy) else {
            return Vec::new();
        };
        let Some(reader) = self.open_for_read() else {
            return Vec::new();
        };
        let mut found = Vec::new();

        for segment in Segments::new(reader) {
            let lines = match segment {
                Ok(Segment::Block(lines)) => lines,
                Ok(Segment::Loose(_)) => continue,
                Err(err) => {
                    warn!(path = %self.path.display(), error = %err, "scan stopped on read error");
                    break;
                }
            };
            if !matcher.matches_line(&lines[0]) {
                continue;
            }
            match codec::decode(&lines) {
                Ok(record) => found.push(record),
                Err(err) => {
                    warn!(name, error = %err, "matching block is unreadable, search stopped");
                    break;
                }
            }
            if self.key_policy == KeyPolicy::Unique {
                break;
            }
        }

        debug!(name, matches = found.len(), "search finished");
        found
    }

    pub fn find(&self, name: &str) -> Option<SemesterRecord> {
        self.find_all(name).into_iter().next()
    }

    /// Replaces the first match only. The file is rewritten even on a miss.
    pub fn update(&self, record: &SemesterRecord) -> Result<Outcome, StoreError> {
        let Some(matcher) = KeyMatcher::new(&record.name, self.key_policy) else {
            return Ok(Outcome::NotFound);
        };
        let block = codec::encode(record);
        let mut replaced = false;

        let touched = self.rewrite(|key| {
            if !replaced && matcher.matches_line(key) {
                replaced = true;
                Decision::Replace(block.clone())
            } else {
                Decision::Keep
            }
        })?;

        info!(name = %record.name, replaced = touched, "update finished");
        Ok(if touched > 0 {
            Outcome::Done
        } else {
            Outcome::NotFound
        })
    }

    pub fn delete(&self, name: &str) -> Result<Outcome, StoreError> {
        let Some(matcher) = KeyMatcher::new(name, self.key_policy) else {
            warn!("delete with blank name ignored");
            return Ok(Outcome::NotFound);
        };
        let dropped = self.rewrite(|key| {
            if matcher.matches_line(key) {
                Decision::Drop
            } else {
                Decision::Keep
            }
        })?;

        info!(name, dropped, "delete finished");
        Ok(if dropped > 0 {
            Outcome::Done
        } else {
            Outcome::NotFound
        })
    }

    pub fn list_all(&self) -> Records {
        match self.open_for_read() {
            Some(reader) => Records {
                reader: Some(BlockReader::new(reader)),
                available: true,
                halted: None,
            },
            None => Records {
                reader: None,
                available: false,
                halted: None,
            },
        }
    }

    pub fn read_text(&self) -> String {
        match fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(err) => {
                self.log_unreadable(&err);
                String::new()
            }
        }
    }

    fn open_for_read(&self) -> Option<BufReader<File>> {
        match File::open(&self.path) {
            Ok(file) => Some(BufReader::new(file)),
            Err(err) => {
                self.log_unreadable(&err);
                None
            }
        }
    }

    fn log_unreadable(&self, err: &io::Error) {
        if err.kind() == io::ErrorKind::NotFound {
            debug!(path = %self.path.display(), "store file missing, treating as empty");
        } else {
            warn!(path = %self.path.display(), error = %err, "store file unreadable, treating as empty");
        }
    }

    fn unavailable(&self, source: io::Error) -> StoreError {
        StoreError::Unavailable {
            path: self.path.clone(),
            source,
        }
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(OsString::from)
            .unwrap_or_else(|| OsString::from("store"));
        name.push(".tmp");
        self.path.with_file_name(name)
    }

    // Returns the number of blocks replaced or dropped.
    fn rewrite<F>(&self, decide: F) -> Result<usize, StoreError>
    where
        F: FnMut(&str) -> Decision,
    {
        let source = File::open(&self.path).map_err(|source| self.unavailable(source))?;
        let temp = self.temp_path();

        let touched = match copy_segments(BufReader::new(source), &temp, decide) {
            Ok(touched) => touched,
            Err(err) => {
                let _ = fs::remove_file(&temp);
                return Err(self.unavailable(err));
            }
        };

        self.install(&temp)?;
        debug!(path = %self.path.display(), touched, "store rewritten");
        Ok(touched)
    }

    fn install(&self, temp: &Path) -> Result<(), StoreError> {
        match self.swap_mode {
            SwapMode::DeleteThenRename => {
                if let Err(err) = fs::remove_file(&self.path) {
                    let _ = fs::remove_file(temp);
                    return Err(self.unavailable(err));
                }
                fs::rename(temp, &self.path).map_err(|source| {
                    error!(
                        path = %self.path.display(),
                        temp = %temp.display(),
                        error = %source,
                        "store removed but rewritten copy could not be renamed"
                    );
                    StoreError::SwapFailed {
                        path: self.path.clone(),
                        temp: temp.to_path_buf(),
                        source,
                    }
                })
            }
            SwapMode::RenameOver => fs::rename(temp, &self.path).map_err(|source| {
                let _ = fs::remove_file(temp);
                self.unavailable(source)
            }),
        }
    }
}

fn copy_segments<R, F>(source: R, temp: &Path, mut decide: F) -> io::Result<usize>
where
    R: BufRead,
    F: FnMut(&str) -> Decision,
{
    let mut out = BufWriter::new(File::create(temp)?);
    let mut touched = 0;

    for segment in Segments::new(source) {
        match segment? {
            Segment::Loose(line) => writeln!(out, "{line}")?,
            Segment::Block(lines) => match decide(&lines[0]) {
                Decision::Keep => {
                    for line in &lines {
                        writeln!(out, "{line}")?;
                    }
                }
                Decision::Replace(block) => {
                    out.write_all(block.as_bytes())?;
                    touched += 1;
                }
                Decision::Drop => touched += 1,
            },
        }
    }

    let file = out.into_inner().map_err(|err| err.into_error())?;
    file.sync_all()?;
    Ok(touched)
}

pub struct Records {
    reader: Option<BlockReader<BufReader<File>>>,
    available: bool,
    halted: Option<CodecError>,
}

impl Records {
    pub fn unavailable(&self) -> bool {
        !self.available
    }

    pub fn halted(&self) -> Option<&CodecError> {
        self.halted.as_ref()
    }
}

impl Iterator for Records {
    type Item = SemesterRecord;

    fn next(&mut self) -> Option<Self::Item> {
        match self.reader.as_mut()?.next() {
            Some(Ok(record)) => Some(record),
            Some(Err(err)) => {
                warn!(error = %err, "listing stopped at unreadable block");
                self.halted = Some(err);
                self.reader = None;
                None
            }
            None => {
                self.reader = None;
                None
            }
        }
    }
}
