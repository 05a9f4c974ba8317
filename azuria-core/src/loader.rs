//! Turns unit files (JSON manifests) into live values.
//!
//! Every command and event on disk is a small JSON manifest. The manifest names
//! a factory, either explicitly through its `factory` field or implicitly
//! through the file name (`GuildLogger.json` -> `guild_logger`). Factories are
//! registered up front in a [`FactoryTable`]; the loader only looks them up and
//! calls them with the manifest and whatever argument the caller supplies.

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Deserialize;
use tracing::{debug, trace};
use twilight_model::application::command::CommandOption;

use azuria_common::models::CommandData;

use crate::Error;

pub const UNIT_EXTENSION: &str = "json";

/// Parsed contents of a unit file.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Manifest {
    pub factory: Option<String>,
    pub name: Option<String>,
    pub description: Option<String>,
    /// Gateway event name, for event units.
    pub event: Option<String>,
    pub ephemeral: bool,
    pub modal: bool,
    pub options: Vec<CommandOption>,
    /// Free-form settings for the factory.
    pub extra: serde_json::Value,
    #[serde(skip)]
    pub path: PathBuf,
}

impl Manifest {
    pub fn parse(path: &Path, raw: &str) -> Result<Self, Error> {
        let mut manifest: Manifest = serde_json::from_str(raw).map_err(|source| Error::Manifest {
            path: path.display().to_string(),
            source,
        })?;
        manifest.path = path.to_path_buf();
        Ok(manifest)
    }

    /// Factory id: the explicit `factory` field, else the snake_cased file stem.
    pub fn factory_id(&self) -> Option<String> {
        self.factory
            .clone()
            .filter(|f| !f.trim().is_empty())
            .or_else(|| factory_id_for(&self.path))
    }

    /// Command metadata declared by the manifest. A name is mandatory.
    pub fn command_data(&self) -> Result<CommandData, Error> {
        let name = self
            .name
            .clone()
            .ok_or_else(|| Error::Parse(format!("{} declares no command name", self.path.display())))?;
        Ok(CommandData {
            name,
            description: self.description.clone().unwrap_or_default(),
            options: self.options.clone(),
        })
    }

    /// Gateway event name declared by the manifest.
    pub fn event_name(&self) -> Result<String, Error> {
        self.event
            .clone()
            .filter(|e| !e.trim().is_empty())
            .ok_or_else(|| Error::Parse(format!("{} declares no event name", self.path.display())))
    }
}

/// Derives a factory id from a file path: `PingCommand.json` -> `ping_command`,
/// `member-join.json` -> `member_join`.
pub fn factory_id_for(path: &Path) -> Option<String> {
    let stem = path.file_stem()?.to_str()?;
    let mut id = String::with_capacity(stem.len() + 4);
    let mut prev_lower = false;
    for c in stem.chars() {
        if c == '-' || c == ' ' || c == '.' {
            if !id.ends_with('_') {
                id.push('_');
            }
            prev_lower = false;
        } else if c.is_uppercase() {
            if prev_lower && !id.ends_with('_') {
                id.push('_');
            }
            id.extend(c.to_lowercase());
            prev_lower = false;
        } else {
            id.push(c);
            prev_lower = c.is_lowercase() || c.is_ascii_digit();
        }
    }
    let id = id.trim_matches('_').to_string();
    (!id.is_empty()).then_some(id)
}

pub type Factory<T, A> = Arc<dyn Fn(&Manifest, &A) -> Result<T, Error> + Send + Sync>;

/// Startup-time lookup table from factory id to constructor.
pub struct FactoryTable<T, A> {
    factories: HashMap<String, Factory<T, A>>,
}

impl<T, A> FactoryTable<T, A> {
    pub fn new() -> Self {
        Self {
            factories: HashMap::new(),
        }
    }

    /// Registers `factory` under `id`, replacing any previous entry.
    pub fn register<F>(mut self, id: impl Into<String>, factory: F) -> Self
    where
        F: Fn(&Manifest, &A) -> Result<T, Error> + Send + Sync + 'static,
    {
        self.insert(id, factory);
        self
    }

    pub fn insert<F>(&mut self, id: impl Into<String>, factory: F)
    where
        F: Fn(&Manifest, &A) -> Result<T, Error> + Send + Sync + 'static,
    {
        self.factories.insert(id.into(), Arc::new(factory));
    }

    pub fn get(&self, id: &str) -> Option<&Factory<T, A>> {
        self.factories.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.factories.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.factories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }

    pub fn ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.factories.keys().cloned().collect();
        ids.sort();
        ids
    }
}

impl<T, A> Default for FactoryTable<T, A> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T, A> fmt::Debug for FactoryTable<T, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FactoryTable").field("ids", &self.ids()).finish()
    }
}

pub struct Loader<T, A> {
    table: Arc<FactoryTable<T, A>>,
}

impl<T, A> Loader<T, A> {
    pub fn new(table: FactoryTable<T, A>) -> Self {
        Self {
            table: Arc::new(table),
        }
    }

    /// Reads and parses `path`, then builds the unit it describes.
    ///
    /// Read and parse failures are errors. A well-formed file whose factory id
    /// is not registered yields `Ok(None)`; callers decide how loud to be.
    pub async fn load(&self, path: &Path, args: &A) -> Result<Option<T>, Error> {
        let raw = tokio::fs::read_to_string(path).await?;
        let manifest = Manifest::parse(path, &raw)?;

        let Some(id) = manifest.factory_id() else {
            debug!("No factory id derivable for {}", path.display());
            return Ok(None);
        };

        match self.table.get(&id) {
            Some(factory) => {
                trace!("Building {} with factory '{}'", path.display(), id);
                factory(&manifest, args).map(Some)
            }
            None => {
                debug!("No factory '{}' registered for {}", id, path.display());
                Ok(None)
            }
        }
    }
}

/// Lists the entries of `dir` in lexicographic order.
///
/// With `dirs == true` only subdirectories are returned, otherwise only unit
/// files (`*.json`); everything else is skipped.
pub async fn list_sorted(dir: &Path, dirs: bool) -> Result<Vec<PathBuf>, Error> {
    let mut entries = tokio::fs::read_dir(dir).await?;
    let mut out = Vec::new();

    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        let file_type = entry.file_type().await?;
        if dirs {
            if file_type.is_dir() {
                out.push(path);
            }
        } else if file_type.is_file() && is_unit_file(&path) {
            out.push(path);
        } else {
            debug!("Skipping non-unit entry {}", path.display());
        }
    }

    out.sort();
    Ok(out)
}

fn is_unit_file(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.eq_ignore_ascii_case(UNIT_EXTENSION))
        .unwrap_or(false)
}

/// File name for error messages.
pub fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn factory_ids_follow_file_names() {
        assert_eq!(factory_id_for(Path::new("ping.json")).as_deref(), Some("ping"));
        assert_eq!(factory_id_for(Path::new("a/GuildLogger.json")).as_deref(), Some("guild_logger"));
        assert_eq!(factory_id_for(Path::new("member-join.json")).as_deref(), Some("member_join"));
        assert_eq!(factory_id_for(Path::new("InteractionCreateEvent.json")).as_deref(), Some("interaction_create_event"));
        assert_eq!(factory_id_for(Path::new("ban2.json")).as_deref(), Some("ban2"));
    }

    #[test]
    fn explicit_factory_wins_over_file_name() {
        let manifest = Manifest::parse(Path::new("whatever.json"), r#"{"factory": "ping"}"#).unwrap();
        assert_eq!(manifest.factory_id().as_deref(), Some("ping"));

        let manifest = Manifest::parse(Path::new("whatever.json"), r#"{"factory": ""}"#).unwrap();
        assert_eq!(manifest.factory_id().as_deref(), Some("whatever"));
    }

    #[test]
    fn command_data_requires_a_name() {
        let manifest = Manifest::parse(Path::new("x.json"), r#"{"description": "nameless"}"#).unwrap();
        assert!(matches!(manifest.command_data(), Err(Error::Parse(_))));
    }

    #[tokio::test]
    async fn load_distinguishes_unknown_factory_from_bad_json() {
        let dir = tempfile::tempdir().unwrap();
        let known = dir.path().join("ping.json");
        let unknown = dir.path().join("mystery.json");
        let broken = dir.path().join("broken.json");
        fs::write(&known, r#"{"name": "ping"}"#).unwrap();
        fs::write(&unknown, r#"{"name": "mystery"}"#).unwrap();
        fs::write(&broken, "{ not json").unwrap();

        let loader: Loader<String, u32> = Loader::new(
            FactoryTable::new().register("ping", |m: &Manifest, n: &u32| {
                Ok(format!("{}#{}", m.name.clone().unwrap_or_default(), n))
            }),
        );

        assert_eq!(loader.load(&known, &7).await.unwrap().as_deref(), Some("ping#7"));
        assert!(loader.load(&unknown, &7).await.unwrap().is_none());
        assert!(matches!(loader.load(&broken, &7).await, Err(Error::Manifest { .. })));
        assert!(matches!(
            loader.load(&dir.path().join("absent.json"), &7).await,
            Err(Error::Io(_))
        ));
    }

    #[tokio::test]
    async fn listing_is_sorted_and_filtered() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("b.json"), "{}").unwrap();
        fs::write(dir.path().join("a.json"), "{}").unwrap();
        fs::write(dir.path().join("README.md"), "docs").unwrap();
        fs::create_dir(dir.path().join("zeta")).unwrap();
        fs::create_dir(dir.path().join("alpha")).unwrap();

        let files = list_sorted(dir.path(), false).await.unwrap();
        let names: Vec<String> = files.iter().map(|p| display_name(p)).collect();
        assert_eq!(names, vec!["a.json", "b.json"]);

        let dirs = list_sorted(dir.path(), true).await.unwrap();
        let names: Vec<String> = dirs.iter().map(|p| display_name(p)).collect();
        assert_eq!(names, vec!["alpha", "zeta"]);
    }
}
