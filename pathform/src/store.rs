//! Config file persistence.
//!
//! JSON files are written indented with four spaces and a trailing newline;
//! TOML files are written with `toml::to_string_pretty`.

use std::{
    fs,
    path::{Path, PathBuf},
    time::SystemTime,
};

use anyhow::{Context, bail};
use serde::Serialize;
use serde_json::{Value, ser::PrettyFormatter};

/// On-disk format of a config file, chosen by extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Json,
    Toml,
}

impl Format {
    pub fn from_path(path: &Path) -> anyhow::Result<Self> {
        let ext = path.extension().and_then(|s| s.to_str()).unwrap_or("");
        match ext {
            "json" => Ok(Format::Json),
            "toml" | "tml" => Ok(Format::Toml),
            _ => bail!("Unsupported config file extension: {ext:?}"),
        }
    }

    /// Parse file content into a JSON value.
    pub fn parse(&self, content: &str) -> anyhow::Result<Value> {
        let value = match self {
            Format::Json => serde_json::from_str(content)?,
            Format::Toml => {
                let v: toml::Value = toml::from_str(content)?;
                serde_json::to_value(v)?
            }
        };
        Ok(value)
    }

    /// Render a JSON value as file content.
    pub fn render(&self, value: &Value) -> anyhow::Result<String> {
        match self {
            Format::Json => {
                let mut out = Vec::new();
                let mut ser =
                    serde_json::Serializer::with_formatter(&mut out, PrettyFormatter::with_indent(b"    "));
                value.serialize(&mut ser)?;
                out.push(b'\n');
                Ok(String::from_utf8(out)?)
            }
            Format::Toml => Ok(toml::to_string_pretty(value)?),
        }
    }
}

/// A config file on disk.
#[derive(Debug, Clone)]
pub struct ConfigStore {
    path: PathBuf,
    format: Format,
    backup: bool,
}

impl ConfigStore {
    pub fn new(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref().to_path_buf();
        let format = Format::from_path(&path)?;
        Ok(Self {
            path,
            format,
            backup: false,
        })
    }

    /// Keep a timestamped copy of the previous file on every write.
    pub fn with_backup(mut self, backup: bool) -> Self {
        self.backup = backup;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn format(&self) -> Format {
        self.format
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Read and parse the file. An empty file reads as an empty object.
    pub fn read(&self) -> anyhow::Result<Value> {
        let content = fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read {}", self.path.display()))?;
        if content.trim().is_empty() {
            return Ok(Value::Object(Default::default()));
        }
        self.format
            .parse(&content)
            .with_context(|| format!("Failed to parse {}", self.path.display()))
    }

    /// Write `value`, creating missing parent directories.
    ///
    /// The file is replaced atomically.
    pub fn write(&self, value: &Value) -> anyhow::Result<()> {
        let content = self.format.render(value)?;

        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }

        if self.backup && self.path.exists() {
            let backup_path = self.backup_path()?;
            fs::copy(&self.path, &backup_path)?;
            debug!("backup written to {}", backup_path.display());
        }

        // Write aside and rename so readers never see a partial file.
        let staged = self.staged_path();
        fs::write(&staged, content)
            .with_context(|| format!("Failed to write {}", staged.display()))?;
        fs::rename(&staged, &self.path)
            .with_context(|| format!("Failed to replace {}", self.path.display()))?;
        Ok(())
    }

    fn staged_path(&self) -> PathBuf {
        let mut name = self.path.file_name().unwrap_or_default().to_os_string();
        name.push(".tmp");
        self.path.with_file_name(name)
    }

    fn backup_path(&self) -> anyhow::Result<PathBuf> {
        let ext = self
            .path
            .extension()
            .and_then(|s| s.to_str())
            .unwrap_or("");
        let secs = SystemTime::now()
            .duration_since(SystemTime::UNIX_EPOCH)?
            .as_secs();
        Ok(self.path.with_extension(format!("bk-{secs}.{ext}")))
    }
}

/// Derive the default schema path for a config path.
///
/// `dir/config.toml` maps to `dir/config-schema.json`.
pub fn default_schema_path(config: &Path) -> PathBuf {
    let binding = config
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    let mut name_split = binding.split('.').collect::<Vec<_>>();
    if name_split.len() > 1 {
        name_split.pop();
    }

    let name = format!("{}-schema.json", name_split.join("."));

    match config.parent() {
        Some(parent) => parent.join(name),
        None => PathBuf::from(name),
    }
}
