//! Pack Discovery & Loading
//!
//! A pack is either a directory or a `.zip` archive with the manifest at its
//! root. The loader reads the manifest, then every shader the pipelines
//! reference, then (transitively) every file those shaders `#include`.
//!
//! Files that cannot be found are skipped here: a missing pipeline shader is
//! reported by the validator, a missing include by the preprocessor. The
//! loader itself only fails on unreadable manifests and archives.

use std::collections::VecDeque;
use std::fs;
use std::io::{Read, Seek};
use std::path::{Component, Path, PathBuf};

use log::{debug, error, info, warn};

use super::model::{PackDescriptor, PackManifest, SourceMap};
use crate::compiler::extract_includes;
use crate::errors::{Result, ShaderPackError};
use crate::settings::DEFAULT_MANIFEST_NAME;

/// Read access to the files of one pack.
pub trait PackReader {
    /// Reads a pack-relative text file. `Ok(None)` when it does not exist.
    fn read_text(&mut self, path: &str) -> Result<Option<String>>;

    /// Location used in logs and errors.
    fn location(&self) -> &Path;
}

/// Unpacked pack directory.
pub struct DirectoryReader {
    root: PathBuf,
}

impl DirectoryReader {
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl PackReader for DirectoryReader {
    fn read_text(&mut self, path: &str) -> Result<Option<String>> {
        if !is_pack_relative(path) {
            warn!("Ignoring path outside of pack {}: {path}", self.root.display());
            return Ok(None);
        }

        match fs::read_to_string(self.root.join(path)) {
            Ok(text) => Ok(Some(text)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn location(&self) -> &Path {
        &self.root
    }
}

/// `.zip` pack archive.
pub struct ArchiveReader<R: Read + Seek> {
    path: PathBuf,
    archive: zip::ZipArchive<R>,
}

impl ArchiveReader<fs::File> {
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let file = fs::File::open(&path)?;
        Self::new(path, file)
    }
}

impl<R: Read + Seek> ArchiveReader<R> {
    pub fn new(path: impl Into<PathBuf>, reader: R) -> Result<Self> {
        let path = path.into();
        let archive = zip::ZipArchive::new(reader).map_err(|source| ShaderPackError::Archive {
            path: path.clone(),
            source,
        })?;
        Ok(Self { path, archive })
    }
}

impl<R: Read + Seek> PackReader for ArchiveReader<R> {
    fn read_text(&mut self, path: &str) -> Result<Option<String>> {
        let mut file = match self.archive.by_name(path) {
            Ok(file) => file,
            Err(zip::result::ZipError::FileNotFound) => return Ok(None),
            Err(source) => {
                return Err(ShaderPackError::Archive {
                    path: self.path.clone(),
                    source,
                });
            }
        };

        let mut text = String::new();
        file.read_to_string(&mut text)?;
        Ok(Some(text))
    }

    fn location(&self) -> &Path {
        &self.path
    }
}

fn is_pack_relative(path: &str) -> bool {
    Path::new(path)
        .components()
        .all(|c| matches!(c, Component::Normal(_) | Component::CurDir))
}

// ─── Loader ───────────────────────────────────────────────────────────────────

/// Loads packs from disk.
#[derive(Debug, Clone)]
pub struct PackLoader {
    manifest_name: String,
}

impl Default for PackLoader {
    fn default() -> Self {
        Self::new(DEFAULT_MANIFEST_NAME)
    }
}

impl PackLoader {
    #[must_use]
    pub fn new(manifest_name: impl Into<String>) -> Self {
        Self {
            manifest_name: manifest_name.into(),
        }
    }

    /// Loads every pack found directly inside `dir`.
    ///
    /// The directory is created when missing. Entries are visited in name
    /// order; a pack that fails to load is logged and skipped. Returned packs
    /// are not validated yet.
    #[must_use]
    pub fn load_all(&self, dir: &Path) -> Vec<PackDescriptor> {
        if let Err(e) = fs::create_dir_all(dir) {
            error!("Failed to create shader pack directory {}: {e}", dir.display());
            return Vec::new();
        }

        let mut candidates: Vec<PathBuf> = match fs::read_dir(dir) {
            Ok(entries) => entries
                .filter_map(|entry| entry.ok().map(|e| e.path()))
                .filter(|path| self.is_pack_candidate(path))
                .collect(),
            Err(e) => {
                error!("Failed to list shader packs in {}: {e}", dir.display());
                return Vec::new();
            }
        };
        candidates.sort();

        let mut packs = Vec::with_capacity(candidates.len());
        for path in candidates {
            match self.load_path(&path) {
                Ok(pack) => {
                    info!("Loaded shader pack: {} v{}", pack.name(), pack.version());
                    packs.push(pack);
                }
                Err(e) => error!("Failed to load shader pack {}: {e}", path.display()),
            }
        }

        if packs.is_empty() {
            info!("No shader packs found in {}", dir.display());
        }

        packs
    }

    /// Loads a pack directory or `.zip` archive.
    pub fn load_path(&self, path: &Path) -> Result<PackDescriptor> {
        if path.is_dir() {
            self.load(&mut DirectoryReader::new(path))
        } else {
            self.load(&mut ArchiveReader::open(path)?)
        }
    }

    /// Loads a pack through any reader.
    pub fn load(&self, reader: &mut impl PackReader) -> Result<PackDescriptor> {
        let location = reader.location().to_path_buf();

        let json = reader
            .read_text(&self.manifest_name)?
            .ok_or_else(|| ShaderPackError::ManifestNotFound {
                path: location.clone(),
                manifest: self.manifest_name.clone(),
            })?;

        let manifest =
            PackManifest::from_json(&json).map_err(|source| ShaderPackError::Manifest {
                path: location.join(&self.manifest_name),
                source,
            })?;

        let sources = collect_sources(&manifest, reader)?;
        Ok(PackDescriptor::new(manifest, sources).with_origin(location))
    }

    fn is_pack_candidate(&self, path: &Path) -> bool {
        if path.is_dir() {
            return path.join(&self.manifest_name).is_file();
        }
        path.is_file()
            && path
                .extension()
                .is_some_and(|ext| ext.eq_ignore_ascii_case("zip"))
    }
}

/// Reads every declared shader and include, then follows `#include`
/// directives until no new path turns up.
fn collect_sources(manifest: &PackManifest, reader: &mut impl PackReader) -> Result<SourceMap> {
    let mut pending: VecDeque<String> = manifest
        .pipelines
        .values()
        .flat_map(|pipeline| {
            pipeline
                .shader_paths()
                .map(|(_, path)| path.to_string())
                .chain(pipeline.includes.iter().cloned())
                .collect::<Vec<_>>()
        })
        .collect();

    let mut sources = SourceMap::default();
    let mut missing = Vec::new();

    while let Some(path) = pending.pop_front() {
        if sources.contains_key(&path) || missing.contains(&path) {
            continue;
        }

        let Some(text) = reader.read_text(&path)? else {
            debug!("Shader file not found in {}: {path}", reader.location().display());
            missing.push(path);
            continue;
        };

        pending.extend(
            extract_includes(&text)
                .into_iter()
                .filter(|include| !sources.contains_key(*include))
                .map(str::to_string),
        );
        sources.insert(path, text);
    }

    Ok(sources)
}
