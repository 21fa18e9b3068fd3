use std::{path::Path, sync::Arc};

use anyhow::Context;
pub use cursive;
use cursive::{
    Cursive, CursiveExt,
    event::{Event, Key},
};
use schemars::JsonSchema;
use serde::{Serialize, de::DeserializeOwned};

use crate::{
    data::{
        payload::PayloadTree,
        row::{Row, group},
    },
    manager::ConfigManager,
    store::{ConfigStore, default_schema_path},
    sync::{self, LocalSyncClient, SyncClient},
    ui::{
        form::{SubmitFn, form_view, submit_callback},
        handle_quit,
    },
};

const DEFAULT_TITLE: &str = "Configuration";

/// Run the interactive editor against `client` until the user quits.
///
/// The form is rebuilt from a freshly fetched catalog; a failed fetch shows
/// an empty form. Each save is captured, coerced and submitted through
/// `client`, and the outcome is shown as a notice.
///
/// # Errors
///
/// Returns errors when the UI thread cannot be joined.
pub async fn run_editor(client: Arc<dyn SyncClient>, title: Option<&str>) -> anyhow::Result<()> {
    let catalog = sync::load_catalog(client.as_ref()).await;
    for d in &catalog.diagnostics {
        debug!("catalog diagnostic: {d}");
    }
    let rows = group(&catalog.fields);
    let title = title.unwrap_or(DEFAULT_TITLE).to_string();

    let handle = tokio::runtime::Handle::current();
    let on_submit: SubmitFn =
        Arc::new(move |tree: PayloadTree| handle.block_on(sync::submit(client.as_ref(), &tree)));

    tokio::task::spawn_blocking(move || run_form(&title, &rows, on_submit))
        .await
        .context("editor UI thread failed")?;
    Ok(())
}

fn run_form(title: &str, rows: &[Row], on_submit: SubmitFn) {
    #[cfg(feature = "logging")]
    {
        cursive::logger::init();
        cursive::logger::set_filter_levels_from_env();
    }
    let mut siv = Cursive::default();

    siv.add_global_callback(Key::Esc, handle_quit);
    siv.add_global_callback(Event::CtrlChar('q'), handle_quit);
    siv.add_global_callback(Event::CtrlChar('s'), submit_callback(rows, on_submit.clone()));
    siv.add_global_callback('~', Cursive::toggle_debug_console);

    siv.add_fullscreen_layer(form_view(title, rows, on_submit));
    siv.run();
}

/// Edit a local config file of type `C` in the terminal.
///
/// # Errors
///
/// Returns errors when the file cannot be loaded.
pub async fn edit_typed<C>(config_path: impl AsRef<Path>) -> anyhow::Result<()>
where
    C: JsonSchema + Serialize + DeserializeOwned + 'static,
{
    let manager = ConfigManager::for_type::<C>(config_path)?;
    let client = LocalSyncClient::new(Arc::new(manager));
    run_editor(Arc::new(client), None).await
}

/// Edit a local config file described by a JSON Schema file.
///
/// When `schema` is `None` the schema path is derived from the config path.
/// With `backup`, every save keeps a timestamped copy of the previous file.
///
/// # Errors
///
/// Returns errors when the schema cannot be read or parsed.
pub async fn edit_with_schema(
    config_path: impl AsRef<Path>,
    schema: Option<impl AsRef<Path>>,
    backup: bool,
) -> anyhow::Result<()> {
    let manager = Arc::new(open_with_schema(config_path, schema, backup).await?);
    let title = manager
        .schema()
        .get("title")
        .and_then(|t| t.as_str())
        .map(str::to_string);
    let client = LocalSyncClient::new(manager);
    run_editor(Arc::new(client), title.as_deref()).await
}

/// Open an untyped config with its schema file.
pub async fn open_with_schema(
    config_path: impl AsRef<Path>,
    schema: Option<impl AsRef<Path>>,
    backup: bool,
) -> anyhow::Result<ConfigManager> {
    let config_path = config_path.as_ref();
    // Validate the extension before touching the schema.
    ConfigStore::new(config_path)?;

    let schema_path = match schema {
        Some(s) => s.as_ref().to_path_buf(),
        None => default_schema_path(config_path),
    };
    let content = tokio::fs::read_to_string(&schema_path)
        .await
        .with_context(|| format!("Schema file does not exist: {}", schema_path.display()))?;
    let schema_json: serde_json::Value = serde_json::from_str(&content)
        .with_context(|| format!("Invalid schema in {}", schema_path.display()))?;

    ConfigManager::builder(config_path)
        .backup(backup)
        .with_schema(schema_json)
}
