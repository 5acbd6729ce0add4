//! Command actions run by the lifecycle.

pub mod config;
pub mod image;
pub mod output;
pub mod video;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use crate::cli::{self, Command, ImageCommand, VideoCommand};
use crate::error::ZerocutError;
use crate::lifecycle::{Action, ExecutionContext};
use crate::progress::{Spinner, INFERENCING};
use crate::session::Session;
use crate::Result;

pub use config::ConfigAction;
pub use image::{ImageCreate, ImageEdit};
pub use video::{VideoCreate, VideoEdit};

/// Build the action for a parsed command.
pub fn action_for(command: Command) -> Box<dyn Action> {
    match command {
        Command::Help => Box::new(Help),
        Command::Version => Box::new(Version),
        Command::Config(cmd) => Box::new(ConfigAction::new(cmd)),
        Command::Image(ImageCommand::Create(args)) => Box::new(ImageCreate::new(args)),
        Command::Image(ImageCommand::Edit) => Box::new(ImageEdit),
        Command::Video(VideoCommand::Create(args)) => Box::new(VideoCreate::new(args)),
        Command::Video(VideoCommand::Edit(args)) => Box::new(VideoEdit::new(args)),
    }
}

/// Print help or version text for commands that need no configuration.
///
/// Returns `false` when `command` has to go through the lifecycle.
pub fn run_standalone(command: &Command) -> bool {
    match command {
        Command::Help => cli::print_help(),
        Command::Version => cli::print_version(),
        _ => return false,
    }
    true
}

struct Help;

#[async_trait]
impl Action for Help {
    fn name(&self) -> &str {
        "help"
    }

    fn requires_session(&self) -> bool {
        false
    }

    async fn run(&self, _ctx: &ExecutionContext) -> Result<()> {
        cli::print_help();
        Ok(())
    }
}

struct Version;

#[async_trait]
impl Action for Version {
    fn name(&self) -> &str {
        "version"
    }

    fn requires_session(&self) -> bool {
        false
    }

    async fn run(&self, _ctx: &ExecutionContext) -> Result<()> {
        cli::print_version();
        Ok(())
    }
}

/// A required option, present and non-blank.
pub(crate) fn required(value: Option<&str>, option: &str) -> Result<String> {
    value
        .filter(|v| !v.trim().is_empty())
        .map(str::to_string)
        .ok_or_else(|| {
            ZerocutError::InvalidArgument(format!("Missing required option: --{option}"))
        })
}

/// An optional option restricted to `allowed`.
pub(crate) fn one_of(
    value: Option<&str>,
    allowed: &[&str],
    option: &str,
) -> Result<Option<String>> {
    match value.map(str::trim) {
        None => Ok(None),
        Some(v) if allowed.contains(&v) => Ok(Some(v.to_string())),
        Some(v) => Err(ZerocutError::InvalidArgument(format!(
            "Invalid value for --{option}: {v}. Allowed: {}",
            allowed.join("|")
        ))),
    }
}

/// Optional `--duration`, an integer from 1 to 16 seconds.
pub(crate) fn duration(value: Option<&str>) -> Result<Option<u32>> {
    let Some(raw) = value.map(str::trim).filter(|v| !v.is_empty()) else {
        return Ok(None);
    };
    match raw.parse::<u32>() {
        Ok(n) if (1..=16).contains(&n) => Ok(Some(n)),
        _ => Err(ZerocutError::InvalidArgument(
            "Invalid value for --duration: must be integer 1-16".into(),
        )),
    }
}

/// Optional integer `--seed`.
pub(crate) fn seed(value: Option<&str>) -> Result<Option<i64>> {
    value
        .map(|raw| {
            raw.trim()
                .parse()
                .map_err(|_| {
                    ZerocutError::InvalidArgument(format!("Invalid value for --seed: {raw}"))
                })
        })
        .transpose()
}

/// Run one generation call with the spinner drawn while waiting.
pub(crate) async fn generate<T: Serialize>(
    session: &Session,
    operation: &str,
    request: &T,
) -> Result<Value> {
    let params = serde_json::to_value(request)?;
    debug!(operation, %params, "invoking");

    let spinner = Spinner::new(INFERENCING);
    let tick: &(dyn Fn() + Send + Sync) = &|| spinner.tick();
    let result = session.invoke(operation, params, Some(tick)).await;
    spinner.finish();
    result
}

/// Save the result when `--output` was given, then print it.
pub(crate) async fn finish(
    ctx: &ExecutionContext,
    mut result: Value,
    output: Option<&str>,
) -> Result<Value> {
    if let Some(file) = output {
        let materials = ctx.settings()?.materials_dir();
        output::save_output(&mut result, &materials, file).await?;
    }
    Ok(result)
}

/// Print a command result as pretty JSON on stdout.
pub(crate) fn print_result(result: &Value) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(result)?);
    Ok(())
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_required() {
        assert_eq!(required(Some("a fox"), "prompt").unwrap(), "a fox");
        let err = required(Some("  "), "prompt").unwrap_err();
        assert_eq!(err.to_string(), "Missing required option: --prompt");
        assert!(required(None, "source").is_err());
    }

    #[test]
    fn test_one_of() {
        let allowed = ["edit", "extend"];
        assert_eq!(one_of(None, &allowed, "type").unwrap(), None);
        assert_eq!(one_of(Some(" extend "), &allowed, "type").unwrap().as_deref(), Some("extend"));
        let err = one_of(Some("cut"), &allowed, "type").unwrap_err();
        assert_eq!(err.to_string(), "Invalid value for --type: cut. Allowed: edit|extend");
    }

    #[test]
    fn test_duration_bounds() {
        assert_eq!(duration(None).unwrap(), None);
        assert_eq!(duration(Some("1")).unwrap(), Some(1));
        assert_eq!(duration(Some("16")).unwrap(), Some(16));
        for bad in ["0", "17", "-3", "five", "2.5"] {
            let err = duration(Some(bad)).unwrap_err();
            assert_eq!(err.to_string(), "Invalid value for --duration: must be integer 1-16");
        }
    }

    #[test]
    fn test_seed() {
        assert_eq!(seed(None).unwrap(), None);
        assert_eq!(seed(Some("42")).unwrap(), Some(42));
        assert!(seed(Some("x")).is_err());
    }

    #[test]
    fn test_run_standalone() {
        assert!(run_standalone(&Command::Help));
        assert!(run_standalone(&Command::Version));
        assert!(!run_standalone(&Command::Config(cli::ConfigCommand::List)));
        assert!(!run_standalone(&Command::Image(ImageCommand::Edit)));
    }

    #[test]
    fn test_action_for_exemptions() {
        assert!(!action_for(Command::Help).requires_session());
        assert!(!action_for(Command::Version).requires_session());
        assert!(!action_for(Command::Config(cli::ConfigCommand::List)).requires_session());
        assert!(!action_for(Command::Image(ImageCommand::Edit)).requires_session());
        let image_create = Command::Image(ImageCommand::Create(Default::default()));
        assert!(action_for(image_create).requires_session());
        let video_edit = Command::Video(VideoCommand::Edit(Default::default()));
        assert!(action_for(video_edit).requires_session());
    }
}
