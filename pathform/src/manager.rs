//! Managed configuration: current value, persistence and change callbacks.

use std::{
    collections::HashMap,
    fmt,
    path::{Path, PathBuf},
    sync::{Arc, Mutex, PoisonError, RwLock},
};

use anyhow::Context;
use notify::{Event, RecommendedWatcher, RecursiveMode, Watcher};
use schemars::JsonSchema;
use serde::{Serialize, de::DeserializeOwned};
use serde_json::Value;

use crate::{
    data::{
        field::{Field, RawField},
        payload::flatten_value,
        schema::extract_fields,
    },
    store::ConfigStore,
};

/// Callback invoked with the old and new value of a changed field.
pub type ChangeCallback = Arc<dyn Fn(&Value, &Value) + Send + Sync>;

/// Hook run once with the first loaded value.
pub type LoadCallback = Box<dyn FnOnce(&Value) + Send>;

type Validator = Box<dyn Fn(Value) -> anyhow::Result<Value> + Send + Sync>;

/// Owner of one config document.
///
/// Readers always see a complete value: updates are validated and persisted
/// before they replace the current one.
pub struct ConfigManager {
    schema: Value,
    store: ConfigStore,
    current: RwLock<Value>,
    validator: Option<Validator>,
    callbacks: RwLock<HashMap<String, Vec<ChangeCallback>>>,
    // Serializes read-modify-write cycles of `apply` and `reload`.
    update_lock: Mutex<()>,
}

impl fmt::Debug for ConfigManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConfigManager")
            .field("store", &self.store)
            .field("schema", &self.schema)
            .field("typed", &self.validator.is_some())
            .finish_non_exhaustive()
    }
}

/// Options for opening a [`ConfigManager`].
pub struct ConfigManagerBuilder {
    path: PathBuf,
    backup: bool,
    on_load: Option<LoadCallback>,
}

impl ConfigManagerBuilder {
    /// Keep a timestamped copy of the previous file on every write.
    pub fn backup(mut self, backup: bool) -> Self {
        self.backup = backup;
        self
    }

    /// Run `callback` once, right after the first load.
    pub fn on_load(mut self, callback: impl FnOnce(&Value) + Send + 'static) -> Self {
        self.on_load = Some(Box::new(callback));
        self
    }

    /// Manage an existing config file of type `C`.
    pub fn for_type<C>(self) -> anyhow::Result<ConfigManager>
    where
        C: JsonSchema + Serialize + DeserializeOwned + 'static,
    {
        let store = self.store()?;
        if !store.exists() {
            anyhow::bail!("Config file not found: {}", store.path().display());
        }
        self.typed::<C>(store)
    }

    /// Manage a config file of type `C`, writing `initial` when it is missing.
    pub fn open_or_init<C>(self, initial: &C) -> anyhow::Result<ConfigManager>
    where
        C: JsonSchema + Serialize + DeserializeOwned + 'static,
    {
        let store = self.store()?;
        if !store.exists() {
            info!("Config file not found, saving an initial one");
            store.write(&serde_json::to_value(initial)?)?;
        }
        self.typed::<C>(store)
    }

    /// Manage an untyped config file described by `schema`.
    pub fn with_schema(self, schema: Value) -> anyhow::Result<ConfigManager> {
        let store = self.store()?;
        let current = if store.exists() {
            store.read()?
        } else {
            Value::Object(Default::default())
        };
        Ok(self.finish(schema, store, current, None))
    }

    fn store(&self) -> anyhow::Result<ConfigStore> {
        Ok(ConfigStore::new(&self.path)?.with_backup(self.backup))
    }

    fn typed<C>(self, store: ConfigStore) -> anyhow::Result<ConfigManager>
    where
        C: JsonSchema + Serialize + DeserializeOwned + 'static,
    {
        let schema = serde_json::to_value(schemars::schema_for!(C))?;
        let validator: Validator = Box::new(|value| {
            let typed: C = serde_json::from_value(value)?;
            Ok(serde_json::to_value(typed)?)
        });
        info!("Loading config file");
        let current = validator(store.read()?)
            .with_context(|| format!("Invalid config in {}", store.path().display()))?;
        Ok(self.finish(schema, store, current, Some(validator)))
    }

    fn finish(
        self,
        schema: Value,
        store: ConfigStore,
        current: Value,
        validator: Option<Validator>,
    ) -> ConfigManager {
        if let Some(on_load) = self.on_load {
            on_load(&current);
        }
        ConfigManager {
            schema,
            store,
            current: RwLock::new(current),
            validator,
            callbacks: RwLock::new(HashMap::new()),
            update_lock: Mutex::new(()),
        }
    }
}

impl ConfigManager {
    /// Start configuring a manager for the file at `path`.
    pub fn builder(path: impl AsRef<Path>) -> ConfigManagerBuilder {
        ConfigManagerBuilder {
            path: path.as_ref().to_path_buf(),
            backup: false,
            on_load: None,
        }
    }

    /// Manage an existing config file of type `C`.
    pub fn for_type<C>(path: impl AsRef<Path>) -> anyhow::Result<Self>
    where
        C: JsonSchema + Serialize + DeserializeOwned + 'static,
    {
        Self::builder(path).for_type::<C>()
    }

    /// Manage a config file of type `C`, writing `initial` when it is missing.
    pub fn open_or_init<C>(path: impl AsRef<Path>, initial: &C) -> anyhow::Result<Self>
    where
        C: JsonSchema + Serialize + DeserializeOwned + 'static,
    {
        Self::builder(path).open_or_init(initial)
    }

    /// Manage an untyped config file described by `schema`.
    pub fn with_schema(path: impl AsRef<Path>, schema: Value) -> anyhow::Result<Self> {
        Self::builder(path).with_schema(schema)
    }

    pub fn store(&self) -> &ConfigStore {
        &self.store
    }

    pub fn schema(&self) -> &Value {
        &self.schema
    }

    /// Snapshot of the current value.
    pub fn value(&self) -> Value {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Current value as a typed config.
    pub fn get<C: DeserializeOwned>(&self) -> anyhow::Result<C> {
        Ok(serde_json::from_value(self.value())?)
    }

    /// Editable fields of the current value, in schema order.
    pub fn fields(&self) -> anyhow::Result<Vec<Field>> {
        Ok(extract_fields(&self.schema, &self.value())?)
    }

    /// Fields in wire form.
    pub fn raw_fields(&self) -> anyhow::Result<Vec<RawField>> {
        Ok(self.fields()?.into_iter().map(RawField::from).collect())
    }

    /// Register a callback for changes of the field at `path`.
    ///
    /// Callbacks run before the triggering update returns and must not call
    /// [`ConfigManager::apply`] or [`ConfigManager::reload`].
    pub fn on_change(
        &self,
        path: impl Into<String>,
        callback: impl Fn(&Value, &Value) + Send + Sync + 'static,
    ) {
        self.callbacks
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(path.into())
            .or_default()
            .push(Arc::new(callback));
    }

    /// Merge `payload` over the current value, validate and persist it.
    ///
    /// On error the current value is left untouched.
    pub fn apply(&self, payload: Value) -> anyhow::Result<()> {
        let _guard = self.update_lock.lock().unwrap_or_else(PoisonError::into_inner);
        let mut merged = self.value();
        merge(&mut merged, payload);
        let new = self.validate(merged).context("Failed to update config")?;
        self.store.write(&new)?;
        self.replace(new);
        Ok(())
    }

    /// Re-read the config file and replace the current value.
    pub fn reload(&self) -> anyhow::Result<()> {
        let _guard = self.update_lock.lock().unwrap_or_else(PoisonError::into_inner);
        let new = self.validate(self.store.read()?)?;
        self.replace(new);
        Ok(())
    }

    fn validate(&self, value: Value) -> anyhow::Result<Value> {
        match &self.validator {
            Some(validate) => validate(value),
            None => Ok(value),
        }
    }

    fn replace(&self, new: Value) {
        let old = {
            let mut guard = self.current.write().unwrap_or_else(PoisonError::into_inner);
            std::mem::replace(&mut *guard, new.clone())
        };
        self.trigger_callbacks(&old, &new);
    }

    fn trigger_callbacks(&self, old: &Value, new: &Value) {
        let changes = diff(old, new);
        if changes.is_empty() {
            return;
        }
        // Clone out of the lock so a callback may register more callbacks.
        let pending: Vec<_> = {
            let callbacks = self.callbacks.read().unwrap_or_else(PoisonError::into_inner);
            changes
                .into_iter()
                .filter_map(|(path, o, n)| callbacks.get(&path).map(|cbs| (cbs.clone(), o, n)))
                .collect()
        };
        for (cbs, o, n) in pending {
            for cb in cbs {
                cb(&o, &n);
            }
        }
    }

    /// Reload the config whenever its file is created or modified.
    ///
    /// Watching stops when the returned watcher is dropped.
    pub fn watch_file(self: &Arc<Self>) -> anyhow::Result<RecommendedWatcher> {
        let path = self.store.path();
        let file_name = path
            .file_name()
            .map(ToOwned::to_owned)
            .with_context(|| format!("Config path has no file name: {}", path.display()))?;
        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };

        let manager = Arc::clone(self);
        let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| {
            let event = match res {
                Ok(event) => event,
                Err(e) => {
                    error!("watch error: {e}");
                    return;
                }
            };
            if !(event.kind.is_modify() || event.kind.is_create())
                || !event
                    .paths
                    .iter()
                    .any(|p| p.file_name() == Some(file_name.as_os_str()))
            {
                return;
            }
            info!("Config file was modified, reloading");
            if let Err(e) = manager.reload() {
                error!("reload failed: {e:#}");
            }
        })?;
        watcher
            .watch(&dir, RecursiveMode::NonRecursive)
            .with_context(|| format!("Failed to watch {}", dir.display()))?;
        Ok(watcher)
    }

    /// Reload the config whenever the process receives SIGHUP.
    ///
    /// Must be called within a tokio runtime.
    #[cfg(unix)]
    pub fn handle_sighup(self: &Arc<Self>) -> anyhow::Result<tokio::task::JoinHandle<()>> {
        use tokio::signal::unix::{SignalKind, signal};

        let mut hangup = signal(SignalKind::hangup())?;
        let manager = Arc::clone(self);
        Ok(tokio::spawn(async move {
            while hangup.recv().await.is_some() {
                info!("SIGHUP received, reloading config");
                if let Err(e) = manager.reload() {
                    error!("reload failed: {e:#}");
                }
            }
        }))
    }
}

/// Deep-merge `patch` into `base`: objects merge key by key, anything else replaces.
pub fn merge(base: &mut Value, patch: Value) {
    match (base, patch) {
        (Value::Object(base), Value::Object(patch)) => {
            for (key, value) in patch {
                match base.get_mut(&key) {
                    Some(slot) => merge(slot, value),
                    None => {
                        base.insert(key, value);
                    }
                }
            }
        }
        (base, patch) => *base = patch,
    }
}

/// Leaf paths whose value differs between `old` and `new`, with both sides
/// (missing leaves read as null).
pub fn diff(old: &Value, new: &Value) -> Vec<(String, Value, Value)> {
    let old = flatten_value(old);
    let new = flatten_value(new);
    let mut changes = Vec::new();

    for (path, n) in new.iter() {
        let o = old.get(path).cloned().unwrap_or(Value::Null);
        if &o != n {
            changes.push((path.to_string(), o, n.clone()));
        }
    }
    for (path, o) in old.iter() {
        if new.get(path).is_none() {
            changes.push((path.to_string(), o.clone(), Value::Null));
        }
    }
    changes
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::kind::FieldKind;
    use serde::Deserialize;
    use serde_json::json;
    use std::{sync::mpsc, time::Duration};

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
    struct TestConf {
        app_name: String,
        version: f32,
        database: TestDatabaseConf,
    }

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
    struct TestDatabaseConf {
        host: String,
        port: u16,
    }

    fn initial() -> TestConf {
        TestConf {
            app_name: "Confection".into(),
            version: 1.0,
            database: TestDatabaseConf {
                host: "localhost".into(),
                port: 3306,
            },
        }
    }

    #[test]
    fn test_merge() {
        let mut base = json!({"a": {"b": 1, "c": 2}, "d": [1, 2], "e": 5});
        merge(&mut base, json!({"a": {"b": 10}, "d": [3], "f": true}));
        assert_eq!(
            base,
            json!({"a": {"b": 10, "c": 2}, "d": [3], "e": 5, "f": true})
        );
    }

    #[test]
    fn test_diff() {
        let changes = diff(
            &json!({"a": 1, "b": {"c": 2, "d": 3}}),
            &json!({"a": 1, "b": {"c": 20}, "e": "new"}),
        );
        assert_eq!(
            changes,
            [
                ("b.c".to_string(), json!(2), json!(20)),
                ("e".to_string(), Value::Null, json!("new")),
                ("b.d".to_string(), json!(3), Value::Null),
            ]
        );
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(ConfigManager::for_type::<TestConf>(dir.path().join("config.json")).is_err());
    }

    #[test]
    fn test_open_or_init_and_fields() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        let manager = ConfigManager::open_or_init(&path, &initial()).unwrap();
        assert!(path.exists());
        assert_eq!(manager.get::<TestConf>().unwrap(), initial());

        let fields = manager.fields().unwrap();
        let summary: Vec<_> = fields.iter().map(|f| (f.path.as_str(), f.kind)).collect();
        assert_eq!(
            summary,
            [
                ("app_name", FieldKind::String),
                ("version", FieldKind::Float32),
                ("database.host", FieldKind::String),
                ("database.port", FieldKind::Uint16),
            ]
        );
        let raw = manager.raw_fields().unwrap();
        assert_eq!(raw[3].kind, "uint16");
        assert_eq!(raw[3].value, json!(3306));
    }

    #[test]
    fn test_apply_persists_and_notifies() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        let manager = ConfigManager::open_or_init(&path, &initial()).unwrap();

        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        manager.on_change("database.port", move |o, n| {
            sink.lock().unwrap().push((o.clone(), n.clone()));
        });
        let untouched = Arc::new(Mutex::new(0));
        let counter = Arc::clone(&untouched);
        manager.on_change("app_name", move |_, _| *counter.lock().unwrap() += 1);

        manager
            .apply(json!({"database": {"port": 5432}}))
            .unwrap();

        let conf: TestConf = manager.get().unwrap();
        assert_eq!(conf.database.port, 5432);
        assert_eq!(conf.database.host, "localhost");
        assert_eq!(*seen.lock().unwrap(), [(json!(3306), json!(5432))]);
        assert_eq!(*untouched.lock().unwrap(), 0);

        let on_disk = ConfigStore::new(&path).unwrap().read().unwrap();
        assert_eq!(on_disk["database"]["port"], json!(5432));
    }

    #[test]
    fn test_invalid_payload_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        let manager = ConfigManager::open_or_init(&path, &initial()).unwrap();

        let err = manager
            .apply(json!({"database": {"port": 70000}}))
            .unwrap_err();
        assert_eq!(err.to_string(), "Failed to update config");
        assert_eq!(manager.get::<TestConf>().unwrap(), initial());
        let on_disk = ConfigStore::new(&path).unwrap().read().unwrap();
        assert_eq!(on_disk["database"]["port"], json!(3306));
    }

    #[test]
    fn test_reload_picks_up_external_edits() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        let manager = ConfigManager::open_or_init(&path, &initial()).unwrap();

        let seen = Arc::new(Mutex::new(None));
        let sink = Arc::clone(&seen);
        manager.on_change("app_name", move |_, n| {
            *sink.lock().unwrap() = Some(n.clone());
        });

        let mut edited = initial();
        edited.app_name = "Secondly".into();
        ConfigStore::new(&path)
            .unwrap()
            .write(&serde_json::to_value(&edited).unwrap())
            .unwrap();

        manager.reload().unwrap();
        assert_eq!(manager.get::<TestConf>().unwrap(), edited);
        assert_eq!(*seen.lock().unwrap(), Some(json!("Secondly")));
    }

    #[test]
    fn test_untyped_manager() {
        let dir = tempfile::tempdir().unwrap();
        let schema = json!({
            "type": "object",
            "properties": {
                "server": {
                    "type": "object",
                    "properties": {
                        "port": {"type": "integer", "format": "int32", "title": "Port"},
                        "debug": {"type": "boolean", "title": "Debug"}
                    }
                }
            }
        });
        let manager = ConfigManager::with_schema(dir.path().join("config.toml"), schema).unwrap();
        assert_eq!(manager.value(), json!({}));
        assert_eq!(manager.fields().unwrap()[0].value, json!(0));

        manager
            .apply(json!({"server": {"port": 9090, "debug": true}}))
            .unwrap();
        let reopened = ConfigStore::new(dir.path().join("config.toml"))
            .unwrap()
            .read()
            .unwrap();
        assert_eq!(reopened, json!({"server": {"port": 9090, "debug": true}}));
    }

    #[test]
    fn test_on_load_runs_once() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        let loaded = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&loaded);
        let manager = ConfigManager::builder(&path)
            .on_load(move |value| sink.lock().unwrap().push(value["app_name"].clone()))
            .open_or_init(&initial())
            .unwrap();

        manager.apply(json!({"app_name": "Secondly"})).unwrap();
        manager.reload().unwrap();
        assert_eq!(*loaded.lock().unwrap(), [json!("Confection")]);
    }

    #[test]
    fn test_backup_on_apply() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        let manager = ConfigManager::builder(&path)
            .backup(true)
            .open_or_init(&initial())
            .unwrap();
        manager.apply(json!({"app_name": "Secondly"})).unwrap();

        let backups: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().starts_with("config.bk-"))
            .collect();
        assert_eq!(backups.len(), 1);
        let old = std::fs::read_to_string(backups[0].path()).unwrap();
        assert!(old.contains("Confection"));
    }

    #[test]
    fn test_debug_skips_callbacks() {
        let dir = tempfile::tempdir().unwrap();
        let manager =
            ConfigManager::open_or_init(dir.path().join("config.json"), &initial()).unwrap();
        manager.on_change("app_name", |_, _| {});
        let out = format!("{manager:?}");
        assert!(out.starts_with("ConfigManager {"), "{out}");
        assert!(out.contains("typed: true"), "{out}");
        assert!(!out.contains("callbacks"), "{out}");
    }

    #[test]
    fn test_watch_file_reloads() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        let manager = Arc::new(ConfigManager::open_or_init(&path, &initial()).unwrap());

        let (tx, rx) = mpsc::channel();
        manager.on_change("app_name", move |_, n| {
            let _ = tx.send(n.clone());
        });
        let _watcher = manager.watch_file().unwrap();

        let mut edited = initial();
        edited.app_name = "Watched".into();
        ConfigStore::new(&path)
            .unwrap()
            .write(&serde_json::to_value(&edited).unwrap())
            .unwrap();

        let changed = rx.recv_timeout(Duration::from_secs(10)).unwrap();
        assert_eq!(changed, json!("Watched"));
        assert_eq!(manager.get::<TestConf>().unwrap(), edited);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_sighup_reloads() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        let manager = Arc::new(ConfigManager::open_or_init(&path, &initial()).unwrap());

        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        manager.on_change("app_name", move |_, n| {
            let _ = tx.send(n.clone());
        });
        let task = manager.handle_sighup().unwrap();

        let mut edited = initial();
        edited.app_name = "Signalled".into();
        ConfigStore::new(&path)
            .unwrap()
            .write(&serde_json::to_value(&edited).unwrap())
            .unwrap();

        let status = std::process::Command::new("kill")
            .args(["-HUP", &std::process::id().to_string()])
            .status()
            .unwrap();
        assert!(status.success());

        let changed = tokio::time::timeout(Duration::from_secs(10), rx.recv())
            .await
            .unwrap();
        assert_eq!(changed, Some(json!("Signalled")));
        assert_eq!(manager.get::<TestConf>().unwrap(), edited);
        task.abort();
    }
}
