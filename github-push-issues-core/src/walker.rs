//! Source walker: yields template files one directory group at a time.
//!
//! Three layouts are supported behind [`TemplateWalker`]:
//!   - a local directory tree ([`LocalWalker`]),
//!   - a `.tar.gz` or `.zip` archive, either a local file or fetched over
//!     HTTP(S) ([`ArchiveWalker`]).
//!
//! Keys are `/`-separated paths relative to the template root regardless of
//! the host's path conventions, and groups come out in a stable order so that
//! re-running against unchanged templates reproduces the same creation order.

use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{BufRead, BufReader, Cursor, Read};
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use flate2::read::GzDecoder;
use tracing::{debug, info, warn};

use crate::error::PushError;

/// Archive formats accepted for template roots.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveFormat {
    TarGz,
    Zip,
}

impl ArchiveFormat {
    /// Pick the format from a file name or URL path suffix.
    pub fn from_name(name: &str) -> Option<Self> {
        let lower = name.to_ascii_lowercase();
        if let Some(stem) = lower.strip_suffix(".gz") {
            return stem.ends_with(".tar").then_some(ArchiveFormat::TarGz);
        }
        if lower.ends_with(".tgz") {
            Some(ArchiveFormat::TarGz)
        } else if lower.ends_with(".zip") {
            Some(ArchiveFormat::Zip)
        } else {
            None
        }
    }
}

/// Where the templates live.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TemplateRoot {
    Directory(PathBuf),
    LocalArchive(PathBuf, ArchiveFormat),
    RemoteArchive(String, ArchiveFormat),
}

impl TemplateRoot {
    /// Classify a locator. Unsupported remote locators are rejected here,
    /// before anything is fetched.
    pub fn parse(locator: &str) -> Result<Self, PushError> {
        let config_error = |reason: String| PushError::Configuration {
            locator: locator.to_string(),
            reason,
        };

        if locator.contains("://") {
            let url = reqwest::Url::parse(locator).map_err(|e| config_error(e.to_string()))?;
            if !matches!(url.scheme(), "http" | "https") {
                return Err(config_error(format!(
                    "unsupported scheme {:?} (expected http or https)",
                    url.scheme()
                )));
            }
            let format = ArchiveFormat::from_name(url.path()).ok_or_else(|| {
                config_error("remote template roots must end in .tar.gz or .zip".to_string())
            })?;
            return Ok(TemplateRoot::RemoteArchive(locator.to_string(), format));
        }

        let path = PathBuf::from(locator);
        if path.is_file() {
            return match ArchiveFormat::from_name(locator) {
                Some(format) => Ok(TemplateRoot::LocalArchive(path, format)),
                None => Err(config_error(
                    "template root files must be .tar.gz or .zip archives".to_string(),
                )),
            };
        }
        Ok(TemplateRoot::Directory(path))
    }
}

/// Opens the template root and returns a walker over its groups.
pub async fn open_walker(
    root: &TemplateRoot,
    strip_components: usize,
) -> Result<Box<dyn TemplateWalker + Send>, PushError> {
    match root {
        TemplateRoot::Directory(dir) => Ok(Box::new(LocalWalker::new(dir))),
        TemplateRoot::LocalArchive(path, format) => {
            info!(path = %path.display(), ?format, "Reading local template archive");
            let bytes = fs::read(path)?;
            Ok(Box::new(ArchiveWalker::from_bytes(
                *format,
                bytes,
                strip_components,
            )?))
        }
        TemplateRoot::RemoteArchive(url, format) => {
            let bytes = fetch_archive(url).await?;
            Ok(Box::new(ArchiveWalker::from_bytes(
                *format,
                bytes,
                strip_components,
            )?))
        }
    }
}

/// Download an archive into memory.
pub async fn fetch_archive(url: &str) -> Result<Vec<u8>, PushError> {
    info!(url = %url, "Fetching template archive");
    let response = reqwest::get(url).await?;
    let status = response.status();
    if !status.is_success() {
        return Err(PushError::Transport(format!(
            "fetching {url} returned {status}"
        )));
    }
    let bytes = response.bytes().await?;
    info!(url = %url, size = bytes.len(), "Fetched template archive");
    Ok(bytes.to_vec())
}

/// Produces directory groups in a deterministic order.
pub trait TemplateWalker {
    /// The next group, or `None` when the walk is finished.
    fn next_group(&mut self) -> Result<Option<DirectoryGroup>, PushError>;
}

/// All files found directly in one directory, keyed by bare file name.
#[derive(Debug, Default)]
pub struct DirectoryGroup {
    directory: String,
    entries: BTreeMap<String, TemplateEntry>,
}

impl DirectoryGroup {
    pub fn new(directory: impl Into<String>) -> Self {
        Self {
            directory: directory.into(),
            entries: BTreeMap::new(),
        }
    }

    /// Relative directory; empty for the template root.
    pub fn directory(&self) -> &str {
        &self.directory
    }

    pub fn get(&self, file_name: &str) -> Option<&TemplateEntry> {
        self.entries.get(file_name)
    }

    /// File names in lexicographic order.
    pub fn file_names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn insert(&mut self, file_name: String, entry: TemplateEntry) {
        self.entries.insert(file_name, entry);
    }
}

/// A single template file whose content is opened on demand.
#[derive(Debug)]
pub struct TemplateEntry {
    path: String,
    source: EntrySource,
}

#[derive(Debug)]
enum EntrySource {
    File(PathBuf),
    Bytes(Vec<u8>),
    Zip { archive: Arc<[u8]>, index: usize },
}

impl TemplateEntry {
    /// Full `/`-separated path relative to the template root.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Open the content for reading. The reader should be dropped as soon
    /// as the template is parsed.
    pub fn open(&self) -> Result<Box<dyn BufRead + '_>, PushError> {
        match &self.source {
            EntrySource::File(path) => Ok(Box::new(BufReader::new(File::open(path)?))),
            EntrySource::Bytes(bytes) => Ok(Box::new(Cursor::new(bytes.as_slice()))),
            EntrySource::Zip { archive, index } => {
                let mut zip = zip::ZipArchive::new(Cursor::new(&archive[..]))
                    .map_err(|e| PushError::Archive(e.to_string()))?;
                let mut file = zip
                    .by_index(*index)
                    .map_err(|e| PushError::Archive(e.to_string()))?;
                let mut buf = Vec::with_capacity(file.size() as usize);
                file.read_to_end(&mut buf)?;
                Ok(Box::new(Cursor::new(buf)))
            }
        }
    }
}

/// Hidden templates are dropped loudly; other hidden entries quietly.
fn log_hidden(key: &str) {
    if key.ends_with(".md") {
        warn!(path = %key, "Skipping hidden template");
    } else {
        debug!(path = %key, "Skipping hidden entry");
    }
}

fn join_key(directory: &str, file_name: &str) -> String {
    if directory.is_empty() {
        file_name.to_string()
    } else {
        format!("{directory}/{file_name}")
    }
}

/// Walks a local directory tree depth-first: each directory's own group,
/// then its subdirectories in name order. Hidden files and directories are
/// skipped.
pub struct LocalWalker {
    pending: Vec<(PathBuf, String)>,
}

impl LocalWalker {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            pending: vec![(root.as_ref().to_path_buf(), String::new())],
        }
    }
}

impl TemplateWalker for LocalWalker {
    fn next_group(&mut self) -> Result<Option<DirectoryGroup>, PushError> {
        let Some((dir, relative)) = self.pending.pop() else {
            return Ok(None);
        };
        debug!(dir = %dir.display(), "Scanning template directory");

        let mut group = DirectoryGroup::new(relative.clone());
        let mut subdirs = Vec::new();
        for entry in fs::read_dir(&dir)? {
            let entry = entry?;
            let name = entry.file_name().to_string_lossy().into_owned();
            let key = join_key(&relative, &name);
            if name.starts_with('.') {
                log_hidden(&key);
                continue;
            }
            let path = entry.path();
            // `file_type` does not follow symlinks; directory links could loop.
            let file_type = entry.file_type()?;
            if file_type.is_dir() {
                subdirs.push((path, key));
            } else if file_type.is_symlink() && path.is_dir() {
                warn!(path = %key, "Skipping symlinked template directory");
            } else if path.is_file() {
                group.insert(
                    name,
                    TemplateEntry {
                        path: key,
                        source: EntrySource::File(path),
                    },
                );
            }
        }

        // Reverse order so the smallest name is popped first.
        subdirs.sort_by(|a, b| b.1.cmp(&a.1));
        self.pending.extend(subdirs);
        Ok(Some(group))
    }
}

/// Walks an in-memory archive, grouping members by directory and yielding
/// groups in the same pre-order as [`LocalWalker`]. Hidden members are
/// skipped.
pub struct ArchiveWalker {
    groups: std::collections::btree_map::IntoIter<Vec<String>, DirectoryGroup>,
}

impl ArchiveWalker {
    /// Index an archive. `strip_components` leading path segments are
    /// removed from every member, as with `tar --strip-components`.
    pub fn from_bytes(
        format: ArchiveFormat,
        bytes: Vec<u8>,
        strip_components: usize,
    ) -> Result<Self, PushError> {
        let members = match format {
            ArchiveFormat::TarGz => index_tar_gz(&bytes)?,
            ArchiveFormat::Zip => index_zip(bytes)?,
        };

        // Keyed by directory segments so "a/inner" sorts before "a-c".
        let mut groups: BTreeMap<Vec<String>, DirectoryGroup> = BTreeMap::new();
        for (member_path, source) in members {
            let Some(key) = strip(&member_path, strip_components) else {
                debug!(member = %member_path, "Skipping archive member above strip depth");
                continue;
            };
            if key.split('/').any(|segment| segment.starts_with('.')) {
                log_hidden(&key);
                continue;
            }
            let (directory, file_name) = match key.rsplit_once('/') {
                Some((dir, name)) => (dir.to_string(), name.to_string()),
                None => (String::new(), key.clone()),
            };
            let segments = if directory.is_empty() {
                Vec::new()
            } else {
                directory.split('/').map(str::to_string).collect()
            };
            groups
                .entry(segments)
                .or_insert_with(|| DirectoryGroup::new(directory))
                .insert(file_name, TemplateEntry { path: key, source });
        }
        info!(
            ?format,
            groups = groups.len(),
            "Indexed template archive"
        );
        Ok(Self {
            groups: groups.into_iter(),
        })
    }
}

impl TemplateWalker for ArchiveWalker {
    fn next_group(&mut self) -> Result<Option<DirectoryGroup>, PushError> {
        Ok(self.groups.next().map(|(_, group)| group))
    }
}

fn strip(member_path: &str, strip_components: usize) -> Option<String> {
    let segments: Vec<&str> = member_path.split('/').collect();
    if segments.len() <= strip_components {
        return None;
    }
    Some(segments[strip_components..].join("/"))
}

/// Convert an archive member path to a `/`-separated key, refusing
/// absolute paths and `..` segments.
fn member_key(path: &Path) -> Option<String> {
    let mut parts = Vec::new();
    for component in path.components() {
        match component {
            Component::Normal(part) => parts.push(part.to_str()?.to_string()),
            Component::CurDir => {}
            _ => return None,
        }
    }
    if parts.is_empty() {
        None
    } else {
        Some(parts.join("/"))
    }
}

fn index_tar_gz(bytes: &[u8]) -> Result<Vec<(String, EntrySource)>, PushError> {
    let archive_error = |e: std::io::Error| PushError::Archive(e.to_string());
    let mut archive = tar::Archive::new(GzDecoder::new(bytes));
    let mut members = Vec::new();
    for entry in archive.entries().map_err(archive_error)? {
        let mut entry = entry.map_err(archive_error)?;
        if !entry.header().entry_type().is_file() {
            continue;
        }
        let path = entry.path().map_err(archive_error)?.into_owned();
        let Some(key) = member_key(&path) else {
            warn!(member = %path.display(), "Skipping archive member with unusable path");
            continue;
        };
        let mut content = Vec::new();
        entry.read_to_end(&mut content).map_err(archive_error)?;
        members.push((key, EntrySource::Bytes(content)));
    }
    Ok(members)
}

fn index_zip(bytes: Vec<u8>) -> Result<Vec<(String, EntrySource)>, PushError> {
    let archive_error = |e: zip::result::ZipError| PushError::Archive(e.to_string());
    let shared: Arc<[u8]> = Arc::from(bytes);
    let mut archive = zip::ZipArchive::new(Cursor::new(&shared[..])).map_err(archive_error)?;
    let mut members = Vec::new();
    for index in 0..archive.len() {
        let file = archive.by_index(index).map_err(archive_error)?;
        if file.is_dir() {
            continue;
        }
        let Some(key) = file.enclosed_name().as_deref().and_then(member_key) else {
            warn!(member = %file.name(), "Skipping archive member with unusable path");
            continue;
        };
        members.push((
            key,
            EntrySource::Zip {
                archive: Arc::clone(&shared),
                index,
            },
        ));
    }
    Ok(members)
}
