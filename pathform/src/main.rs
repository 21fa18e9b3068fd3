use std::{path::PathBuf, sync::Arc};

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use log::warn;
use pathform::{
    data::{Row, group},
    open_with_schema, run_editor,
    sync::{self, HttpSyncClient, LocalSyncClient, SyncClient},
    ui::form::INDENT,
};

#[derive(Parser)]
#[command(name = "pathform", version, about = "Edit path-addressed configuration in the terminal")]
struct Cli {
    #[command(subcommand)]
    cmd: Cmd,
}

#[derive(Subcommand)]
enum Cmd {
    /// Open the interactive form
    Edit {
        #[command(flatten)]
        source: Source,
        /// Form title
        #[arg(long)]
        title: Option<String>,
    },
    /// Print the grouped rows without opening the form
    Rows {
        #[command(flatten)]
        source: Source,
    },
}

#[derive(Args)]
struct Source {
    /// Base URL of a config server
    #[arg(short, long, conflicts_with = "config")]
    url: Option<String>,
    /// Local TOML or JSON config file
    #[arg(short, long, required_unless_present = "url")]
    config: Option<PathBuf>,
    /// JSON Schema of the config file (default: `<config>-schema.json`)
    #[arg(short, long, requires = "config")]
    schema: Option<PathBuf>,
    /// Keep a timestamped copy of the config file before each save
    #[arg(long, requires = "config")]
    backup: bool,
}

impl Source {
    /// Client for the selected source and the title its schema suggests.
    async fn client(&self) -> anyhow::Result<(Arc<dyn SyncClient>, Option<String>)> {
        if let Some(url) = &self.url {
            let client = HttpSyncClient::new(url.as_str())?;
            return Ok((Arc::new(client), None));
        }
        let config = self
            .config
            .as_ref()
            .context("either --url or --config is required")?;
        let manager = open_with_schema(config, self.schema.as_ref(), self.backup).await?;
        let title = manager
            .schema()
            .get("title")
            .and_then(|t| t.as_str())
            .map(str::to_string);
        Ok((Arc::new(LocalSyncClient::new(Arc::new(manager))), title))
    }
}

fn init_env_logger() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    match cli.cmd {
        Cmd::Edit { source, title } => {
            // With `logging` the editor routes records to cursive's console.
            #[cfg(not(feature = "logging"))]
            init_env_logger();

            let (client, schema_title) = source.client().await?;
            run_editor(client, title.or(schema_title).as_deref()).await
        }
        Cmd::Rows { source } => {
            init_env_logger();
            let (client, _) = source.client().await?;
            let catalog = sync::load_catalog(client.as_ref()).await;
            for d in &catalog.diagnostics {
                warn!("{d}");
            }
            for row in group(&catalog.fields) {
                print_row(&row);
            }
            Ok(())
        }
    }
}

fn print_row(row: &Row) {
    let pad = " ".repeat(row.indent(INDENT));
    match row {
        Row::Section { .. } => println!("{pad}{}", row.heading().unwrap_or_default()),
        Row::Field { field, .. } => {
            println!("{pad}{} ({}) = {}", field.name, field.kind, field.value)
        }
    }
}
