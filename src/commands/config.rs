//! `zerocut config ...`

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde_json::Value;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::info;

use crate::cli::ConfigCommand;
use crate::config::{masked_document, ConfigStore, Region, KEY_API_KEY, KEY_PROJECT_DIR, KEY_REGION};
use crate::error::ZerocutError;
use crate::lifecycle::{Action, ExecutionContext};
use crate::Result;

/// Suggested project directory when prompting.
pub const DEFAULT_PROJECT_DIR: &str = "~/zerocut-projects/default";

/// Configuration management; never needs a session.
#[derive(Debug)]
pub struct ConfigAction {
    command: ConfigCommand,
}

impl ConfigAction {
    pub fn new(command: ConfigCommand) -> Self {
        Self { command }
    }

    /// Apply the command to `store`, returning what to print.
    ///
    /// Prompts on stdin when a value was omitted.
    pub async fn execute(&self, store: &ConfigStore) -> Result<Option<String>> {
        match &self.command {
            ConfigCommand::ApiKey(key) => {
                let value = match key {
                    Some(k) => k.trim().to_string(),
                    None => ask("Enter API key (get one at workspace.zerocut.art)", None).await?,
                };
                if value.is_empty() {
                    return Ok(None);
                }
                store.set(KEY_API_KEY, value).await?;
                Ok(Some("apiKey set".into()))
            }
            ConfigCommand::ProjectDir(dir) => {
                let value = match dir {
                    Some(d) => d.trim().to_string(),
                    None => ask("Enter project directory", Some(DEFAULT_PROJECT_DIR)).await?,
                };
                let target = absolute(&expand_home(&value))?;
                tokio::fs::create_dir_all(&target).await?;
                info!(path = %target.display(), "project directory ready");
                store.set(KEY_PROJECT_DIR, target.to_string_lossy().as_ref()).await?;
                Ok(Some("projectDir set".into()))
            }
            ConfigCommand::Region(region) => {
                let region: Region = region.as_deref().unwrap_or("us").parse()?;
                store.set(KEY_REGION, region.code()).await?;
                Ok(Some("region set".into()))
            }
            ConfigCommand::List => {
                let doc = store.load().await?;
                Ok(Some(serde_json::to_string_pretty(&masked_document(&doc))?))
            }
            ConfigCommand::Get(key) => match store.get(key).await? {
                Some(Value::String(s)) => Ok(Some(s)),
                Some(other) => Ok(Some(serde_json::to_string_pretty(&other)?)),
                None => Err(ZerocutError::InvalidArgument(format!("{key} is not set"))),
            },
            ConfigCommand::Set(key, raw) => {
                store.set(key, parse_value(raw)).await?;
                Ok(Some(format!("{key} set")))
            }
        }
    }
}

#[async_trait]
impl Action for ConfigAction {
    fn name(&self) -> &str {
        "config"
    }

    fn requires_session(&self) -> bool {
        false
    }

    fn check(&self) -> Result<()> {
        if let ConfigCommand::Region(Some(region)) = &self.command {
            region.parse::<Region>()?;
        }
        Ok(())
    }

    async fn run(&self, ctx: &ExecutionContext) -> Result<()> {
        if let Some(message) = self.execute(ctx.store()).await? {
            println!("{message}");
        }
        Ok(())
    }
}

/// Interpret a command-line value as JSON, falling back to a plain string.
pub fn parse_value(raw: &str) -> Value {
    serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}

/// Replace a leading `~` with the home directory.
pub fn expand_home(input: &str) -> PathBuf {
    match (input.strip_prefix('~'), dirs::home_dir()) {
        (Some(rest), Some(home)) => home.join(rest.trim_start_matches(['/', '\\'])),
        _ => PathBuf::from(input),
    }
}

fn absolute(path: &Path) -> Result<PathBuf> {
    if path.is_absolute() {
        Ok(path.to_path_buf())
    } else {
        Ok(std::env::current_dir()?.join(path))
    }
}

async fn ask(question: &str, default: Option<&str>) -> Result<String> {
    let prompt = match default {
        Some(d) => format!("{question} [{d}]: "),
        None => format!("{question}: "),
    };
    let mut stdout = tokio::io::stdout();
    stdout.write_all(prompt.as_bytes()).await?;
    stdout.flush().await?;

    let mut line = String::new();
    BufReader::new(tokio::io::stdin()).read_line(&mut line).await?;
    let answer = line.trim();
    Ok(if answer.is_empty() {
        default.unwrap_or_default().to_string()
    } else {
        answer.to_string()
    })
}
