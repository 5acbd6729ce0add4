//! Command-line interface for zerocut.
//!
//! Uses lexopt for minimal binary size overhead. Parsing is purely
//! syntactic; option values are validated by the commands themselves.

use std::collections::{HashMap, HashSet};
use std::ffi::OsString;

/// Options that never take a value.
const FLAGS: &[&str] = &["withAudio", "optimizeCameraMotion"];

/// Command-line arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Args {
    /// What to run.
    pub command: Command,
    /// Log level (error, warn, info, debug, trace).
    pub log_level: Option<String>,
}

/// Top-level command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Print help.
    Help,
    /// Print version.
    Version,
    /// Configuration management.
    Config(ConfigCommand),
    /// Image generation.
    Image(ImageCommand),
    /// Video generation.
    Video(VideoCommand),
}

/// `zerocut config ...`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigCommand {
    /// Set the API key, prompting when absent.
    ApiKey(Option<String>),
    /// Set the project directory, prompting when absent.
    ProjectDir(Option<String>),
    /// Set the region (default `us`).
    Region(Option<String>),
    /// Print the configuration with the key masked.
    List,
    /// Print one dotted key.
    Get(String),
    /// Store one dotted key.
    Set(String, String),
}

/// `zerocut image ...`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageCommand {
    Create(ImageCreateArgs),
    Edit,
}

/// `zerocut video ...`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VideoCommand {
    Create(VideoCreateArgs),
    Edit(VideoEditArgs),
}

/// Options of `image create`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImageCreateArgs {
    pub prompt: Option<String>,
    pub kind: Option<String>,
    pub size: Option<String>,
    pub refs: Vec<String>,
    pub output: Option<String>,
}

/// Options of `video create`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VideoCreateArgs {
    pub prompt: Option<String>,
    pub duration: Option<String>,
    pub kind: Option<String>,
    pub seed: Option<String>,
    pub first_frame: Option<String>,
    pub last_frame: Option<String>,
    pub refs: Vec<String>,
    pub resolution: Option<String>,
    pub aspect_ratio: Option<String>,
    pub with_audio: bool,
    pub optimize_camera_motion: bool,
    pub output: Option<String>,
}

/// Options of `video edit`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VideoEditArgs {
    pub source: Option<String>,
    pub prompt: Option<String>,
    pub kind: Option<String>,
    pub duration: Option<String>,
    pub resolution: Option<String>,
    pub refs: Vec<String>,
    pub output: Option<String>,
}

/// Split a comma-separated reference list, dropping empty entries.
pub fn split_refs(refs: Option<&str>) -> Vec<String> {
    refs.map(|r| {
        r.split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect()
    })
    .unwrap_or_default()
}

/// Parse command-line arguments.
pub fn parse_args() -> Result<Args, ArgsError> {
    parse_args_from(std::env::args_os())
}

/// Parse arguments from an iterator (for testing).
pub fn parse_args_from<I>(args: I) -> Result<Args, ArgsError>
where
    I: IntoIterator<Item = OsString>,
{
    use lexopt::prelude::*;

    let mut parser = lexopt::Parser::from_iter(args);
    let mut log_level = None;
    let mut help = false;
    let mut version = false;
    let mut words = Vec::new();
    let mut options = Options::default();

    while let Some(arg) = parser.next()? {
        match arg {
            Short('h') | Long("help") => {
                help = true;
            }
            Short('V') | Long("version") => {
                version = true;
            }
            Short('l') | Long("log-level") => {
                log_level = Some(parser.value()?.parse()?);
            }
            Long(name) if FLAGS.contains(&name) => {
                options.flags.insert(name.to_string());
            }
            Long(name) => {
                let name = name.to_string();
                let value: String = parser.value()?.parse()?;
                options.values.insert(name, value);
            }
            Value(val) => {
                words.push(val.string()?);
            }
            _ => return Err(arg.unexpected().into()),
        }
    }

    let command = if help {
        Command::Help
    } else if version {
        Command::Version
    } else {
        interpret(&words, &options)?
    };

    Ok(Args { command, log_level })
}

#[derive(Debug, Default)]
struct Options {
    values: HashMap<String, String>,
    flags: HashSet<String>,
}

impl Options {
    fn allow(
        &self,
        command: &'static str,
        values: &[&str],
        flags: &[&str],
    ) -> Result<(), ArgsError> {
        let unknown = self
            .values
            .keys()
            .find(|k| !values.contains(&k.as_str()))
            .or_else(|| self.flags.iter().find(|f| !flags.contains(&f.as_str())));
        match unknown {
            Some(name) => Err(ArgsError::UnknownOption(command, name.clone())),
            None => Ok(()),
        }
    }

    fn value(&self, name: &str) -> Option<String> {
        self.values.get(name).cloned()
    }

    fn flag(&self, name: &str) -> bool {
        self.flags.contains(name)
    }
}

fn interpret(words: &[String], options: &Options) -> Result<Command, ArgsError> {
    let words: Vec<&str> = words.iter().map(String::as_str).collect();

    match words.as_slice() {
        [] | ["help", ..] => {
            options.allow("help", &[], &[])?;
            Ok(Command::Help)
        }
        ["config", rest @ ..] => {
            options.allow("config", &[], &[])?;
            parse_config(rest).map(Command::Config)
        }
        ["image", "create"] => {
            options.allow("image create", &["prompt", "type", "size", "refs", "output"], &[])?;
            Ok(Command::Image(ImageCommand::Create(ImageCreateArgs {
                prompt: options.value("prompt"),
                kind: options.value("type"),
                size: options.value("size"),
                refs: split_refs(options.value("refs").as_deref()),
                output: options.value("output"),
            })))
        }
        ["image", "edit"] => {
            options.allow("image edit", &[], &[])?;
            Ok(Command::Image(ImageCommand::Edit))
        }
        ["video", "create"] => {
            options.allow(
                "video create",
                &[
                    "prompt",
                    "duration",
                    "type",
                    "seed",
                    "firstFrame",
                    "lastFrame",
                    "refs",
                    "resolution",
                    "aspectRatio",
                    "output",
                ],
                FLAGS,
            )?;
            Ok(Command::Video(VideoCommand::Create(VideoCreateArgs {
                prompt: options.value("prompt"),
                duration: options.value("duration"),
                kind: options.value("type"),
                seed: options.value("seed"),
                first_frame: options.value("firstFrame"),
                last_frame: options.value("lastFrame"),
                refs: split_refs(options.value("refs").as_deref()),
                resolution: options.value("resolution"),
                aspect_ratio: options.value("aspectRatio"),
                with_audio: options.flag("withAudio"),
                optimize_camera_motion: options.flag("optimizeCameraMotion"),
                output: options.value("output"),
            })))
        }
        ["video", "edit"] => {
            options.allow(
                "video edit",
                &["source", "prompt", "type", "duration", "resolution", "refs", "output"],
                &[],
            )?;
            Ok(Command::Video(VideoCommand::Edit(VideoEditArgs {
                source: options.value("source"),
                prompt: options.value("prompt"),
                kind: options.value("type"),
                duration: options.value("duration"),
                resolution: options.value("resolution"),
                refs: split_refs(options.value("refs").as_deref()),
                output: options.value("output"),
            })))
        }
        [group @ ("image" | "video")] => Err(ArgsError::MissingArgument(if *group == "image" {
            "image subcommand (create|edit)"
        } else {
            "video subcommand (create|edit)"
        })),
        [group @ ("image" | "video"), sub, ..] => {
            Err(ArgsError::UnknownCommand(format!("{group} {sub}")))
        }
        [other, ..] => Err(ArgsError::UnknownCommand(other.to_string())),
    }
}

const CONFIG_SUBCOMMANDS: &[&str] = &["apiKey", "projectDir", "region", "list", "get", "set"];

fn parse_config(words: &[&str]) -> Result<ConfigCommand, ArgsError> {
    let owned = |s: &&str| s.to_string();
    match words {
        ["apiKey"] | ["apiKey", _] => Ok(ConfigCommand::ApiKey(words.get(1).map(owned))),
        ["projectDir"] | ["projectDir", _] => {
            Ok(ConfigCommand::ProjectDir(words.get(1).map(owned)))
        }
        ["region"] | ["region", _] => Ok(ConfigCommand::Region(words.get(1).map(owned))),
        ["list"] => Ok(ConfigCommand::List),
        ["get", key] => Ok(ConfigCommand::Get(key.to_string())),
        ["get"] => Err(ArgsError::MissingArgument("config key")),
        ["set", key, value] => Ok(ConfigCommand::Set(key.to_string(), value.to_string())),
        ["set"] | ["set", _] => Err(ArgsError::MissingArgument("config key and value")),
        [] => Err(ArgsError::MissingArgument(
            "config subcommand (apiKey|projectDir|region|list|get|set)",
        )),
        [sub, rest @ ..] => match rest.first() {
            Some(extra) if CONFIG_SUBCOMMANDS.contains(sub) => {
                Err(ArgsError::UnexpectedArgument(extra.to_string()))
            }
            _ => Err(ArgsError::UnknownCommand(format!("config {sub}"))),
        },
    }
}

/// Print help message.
pub fn print_help() {
    let version = env!("CARGO_PKG_VERSION");
    println!(
        r#"zerocut {version}
Generate images and videos in a remote zerocut sandbox

USAGE:
    zerocut [OPTIONS] <COMMAND>

COMMANDS:
    config apiKey [key]         Set API key (get one at workspace.zerocut.art)
    config projectDir [dir]     Set project directory (created if missing)
    config region [us|cn]       Set region [default: us]
    config list                 List configuration with the API key masked
    config get <key>            Print a configuration value (dotted path)
    config set <key> <value>    Store a configuration value (dotted path)
    image create                Create an image; requires --prompt
    image edit                  Edit an existing image
    video create                Create a video; requires --prompt
    video edit                  Edit an existing video; requires --source and --prompt
    help                        Print help

IMAGE CREATE OPTIONS:
    --prompt <text>             Text prompt (required)
    --type <type>               seedream|seedream-pro|banana|banana-pro|wan
    --size <WxH>                Image size, e.g. 512x512
    --refs <a,b>                Reference images (material names or URLs)
    --output <file>             Save the result under <projectDir>/materials

VIDEO CREATE OPTIONS:
    --prompt <text>             Text prompt (required)
    --duration <secs>           1-16
    --type <type>               sora2|sora2-pro|veo3.1|veo3.1-pro|wan|vidu|vidu-pro|seedance|kling [default: vidu]
    --seed <n>                  Random seed
    --firstFrame <image>        First frame image
    --lastFrame <image>         Last frame image
    --refs <a,b>                Reference images/videos
    --resolution <res>          e.g. 720p
    --aspectRatio <ratio>       e.g. 16:9
    --withAudio                 Include audio track
    --optimizeCameraMotion      Optimize camera motion
    --output <file>             Save the result under <projectDir>/materials

VIDEO EDIT OPTIONS:
    --source <video>            Original video (required)
    --prompt <text>             Text prompt (required)
    --type <type>               edit|lipsync|extend|upscale [default: edit]
    --duration <secs>           1-16
    --resolution <res>          720p|1080p|2K|4K
    --refs <a,b>                Reference assets
    --output <file>             Save the result under <projectDir>/materials

OPTIONS:
    -l, --log-level <LVL>       Log level (error, warn, info, debug, trace)
    -h, --help                  Print help
    -V, --version               Print version

ENVIRONMENT VARIABLES:
    ZEROCUT_ENDPOINT            Sandbox API base URL (overrides config)
    ZEROCUT_LOG_LEVEL           Log level
    RUST_LOG                    Alternative log level setting

EXAMPLES:
    zerocut config apiKey sk-xxxx
    zerocut config projectDir ~/zerocut-projects/default
    zerocut image create --prompt "a red fox" --refs fox.png --output fox-out.png
    zerocut video create --prompt "waves" --firstFrame beach.png --duration 5
"#
    );
}

/// Print version.
pub fn print_version() {
    println!("zerocut {}", env!("CARGO_PKG_VERSION"));
}

/// Argument parsing errors.
#[derive(Debug)]
pub enum ArgsError {
    /// Lexopt parsing error.
    Lexopt(lexopt::Error),
    /// Unknown command or subcommand.
    UnknownCommand(String),
    /// Option not accepted by the command.
    UnknownOption(&'static str, String),
    /// Required positional argument is absent.
    MissingArgument(&'static str),
    /// Unexpected positional argument.
    UnexpectedArgument(String),
}

impl std::fmt::Display for ArgsError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Lexopt(e) => write!(f, "{}", e),
            Self::UnknownCommand(cmd) => write!(f, "unknown command: '{}'", cmd),
            Self::UnknownOption(cmd, name) => {
                write!(f, "unknown option for '{}': --{}", cmd, name)
            }
            Self::MissingArgument(what) => write!(f, "missing {}", what),
            Self::UnexpectedArgument(arg) => {
                write!(f, "unexpected argument: '{}'", arg)
            }
        }
    }
}

impl std::error::Error for ArgsError {}

impl From<lexopt::Error> for ArgsError {
    fn from(e: lexopt::Error) -> Self {
        Self::Lexopt(e)
    }
}
