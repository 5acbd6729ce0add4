//! `zerocut video ...`

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use super::{duration, finish, generate, one_of, print_result, required, seed};
use crate::cli::{VideoCreateArgs, VideoEditArgs};
use crate::error::ZerocutError;
use crate::lifecycle::{Action, ExecutionContext};
use crate::Result;

/// Accepted `video create --type` values.
pub const VIDEO_TYPES: &[&str] = &[
    "sora2",
    "sora2-pro",
    "veo3.1",
    "veo3.1-pro",
    "wan",
    "vidu",
    "vidu-pro",
    "seedance",
    "kling",
];

/// Generator used when `--type` is omitted.
pub const DEFAULT_VIDEO_TYPE: &str = "vidu";

/// Accepted `video edit --type` values.
pub const EDIT_TYPES: &[&str] = &["edit", "lipsync", "extend", "upscale"];

/// Accepted `video edit --resolution` values.
pub const EDIT_RESOLUTIONS: &[&str] = &["720p", "1080p", "2K", "4K"];

/// Service model name for a first-frame generation.
pub fn frames_model(kind: &str) -> Result<&str> {
    match kind {
        "sora2" => Err(ZerocutError::Unsupported(
            "sora2 does not support a first frame".into(),
        )),
        "wan" => Ok("wan-flash"),
        "seedance" => Ok("pro"),
        other => Ok(other),
    }
}

/// Service model name for a reference-driven generation.
pub fn references_model(kind: &str) -> &str {
    match kind {
        "seedance" => "pro",
        "kling" => "kling-o1",
        other => other,
    }
}

/// Body of a `framesToVideo` call.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FramesToVideoRequest {
    #[serde(rename = "type")]
    pub kind: String,
    pub prompt: String,
    pub start_frame: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_frame: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolution: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aspect_ratio: Option<String>,
    pub mute: bool,
    #[serde(rename = "optimizeCameraMotion", skip_serializing_if = "Option::is_none")]
    pub optimize_camera_motion: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<i64>,
}

/// Body of a `referencesToVideo` call.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReferencesToVideoRequest {
    #[serde(rename = "type")]
    pub kind: String,
    pub prompt: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolution: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aspect_ratio: Option<String>,
    pub mute: bool,
    #[serde(rename = "optimizeCameraMotion", skip_serializing_if = "Option::is_none")]
    pub optimize_camera_motion: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<i64>,
    pub reference_images: Vec<String>,
}

/// Validated `video create` options.
#[derive(Debug, Clone, PartialEq)]
struct CreatePlan {
    prompt: String,
    kind: String,
    duration: Option<u32>,
    seed: Option<i64>,
}

/// `video create`
#[derive(Debug)]
pub struct VideoCreate {
    args: VideoCreateArgs,
}

impl VideoCreate {
    pub fn new(args: VideoCreateArgs) -> Self {
        Self { args }
    }

    fn plan(&self) -> Result<CreatePlan> {
        let prompt = required(self.args.prompt.as_deref(), "prompt")?;
        let kind = one_of(self.args.kind.as_deref(), VIDEO_TYPES, "type")?
            .unwrap_or_else(|| DEFAULT_VIDEO_TYPE.to_string());
        let duration = duration(self.args.duration.as_deref())?;
        let seed = seed(self.args.seed.as_deref())?;
        if self.args.first_frame.is_some() {
            frames_model(&kind)?;
        }
        Ok(CreatePlan {
            prompt,
            kind,
            duration,
            seed,
        })
    }

    /// Resolve frames or references and run the generation.
    pub async fn execute(&self, ctx: &ExecutionContext) -> Result<Value> {
        let plan = self.plan()?;
        let session = ctx.session()?;
        let sync = ctx.synchronizer()?;
        let a = &self.args;
        let optimize = a.optimize_camera_motion.then_some(true);

        let result = match &a.first_frame {
            Some(first) => {
                let start_frame = sync.resolve(session, first).await?;
                let end_frame = match &a.last_frame {
                    Some(last) => Some(sync.resolve(session, last).await?),
                    None => None,
                };
                let request = FramesToVideoRequest {
                    kind: frames_model(&plan.kind)?.to_string(),
                    prompt: plan.prompt,
                    start_frame,
                    end_frame,
                    duration: plan.duration,
                    resolution: a.resolution.clone(),
                    aspect_ratio: a.aspect_ratio.clone(),
                    mute: !a.with_audio,
                    optimize_camera_motion: optimize,
                    seed: plan.seed,
                };
                generate(session, "framesToVideo", &request).await?
            }
            None => {
                let reference_images = sync.resolve_all(session, &a.refs).await?;
                let request = ReferencesToVideoRequest {
                    kind: references_model(&plan.kind).to_string(),
                    prompt: plan.prompt,
                    duration: plan.duration,
                    resolution: a.resolution.clone(),
                    aspect_ratio: a.aspect_ratio.clone(),
                    mute: !a.with_audio,
                    optimize_camera_motion: optimize,
                    seed: plan.seed,
                    reference_images,
                };
                generate(session, "referencesToVideo", &request).await?
            }
        };

        finish(ctx, result, a.output.as_deref()).await
    }
}

#[async_trait]
impl Action for VideoCreate {
    fn name(&self) -> &str {
        "video create"
    }

    fn check(&self) -> Result<()> {
        self.plan().map(drop)
    }

    async fn run(&self, ctx: &ExecutionContext) -> Result<()> {
        let result = self.execute(ctx).await?;
        print_result(&result)
    }
}

/// Kind of video edit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditKind {
    Edit,
    LipSync,
    Extend,
    Upscale,
}

impl EditKind {
    fn parse(value: Option<&str>) -> Result<Self> {
        Ok(match one_of(value, EDIT_TYPES, "type")?.as_deref() {
            None | Some("edit") => Self::Edit,
            Some("lipsync") => Self::LipSync,
            Some("extend") => Self::Extend,
            _ => Self::Upscale,
        })
    }
}

/// Default resolution and duration of an extension.
const EXTEND_RESOLUTION: &str = "720p";
const EXTEND_DURATION: u32 = 5;

#[derive(Debug, Clone, PartialEq)]
struct EditPlan {
    source: String,
    prompt: String,
    kind: EditKind,
    duration: Option<u32>,
    resolution: Option<String>,
}

/// `video edit`
#[derive(Debug)]
pub struct VideoEdit {
    args: VideoEditArgs,
}

impl VideoEdit {
    pub fn new(args: VideoEditArgs) -> Self {
        Self { args }
    }

    fn plan(&self) -> Result<EditPlan> {
        let source = required(self.args.source.as_deref(), "source")?.trim().to_string();
        let prompt = required(self.args.prompt.as_deref(), "prompt")?;
        let kind = EditKind::parse(self.args.kind.as_deref())?;
        let duration = duration(self.args.duration.as_deref())?;
        let resolution = one_of(self.args.resolution.as_deref(), EDIT_RESOLUTIONS, "resolution")?;

        match (kind, resolution.as_deref()) {
            (EditKind::Extend, Some("2K" | "4K")) => {
                return Err(ZerocutError::InvalidArgument(
                    "Extend type only supports 720p resolution or 1080p resolution".into(),
                ));
            }
            (EditKind::Upscale, Some("720p")) => {
                return Err(ZerocutError::InvalidArgument(
                    "720p resolution is not supported for upscale type".into(),
                ));
            }
            _ => {}
        }

        Ok(EditPlan {
            source,
            prompt,
            kind,
            duration,
            resolution,
        })
    }

    /// Resolve the source and references, then run the edit.
    pub async fn execute(&self, ctx: &ExecutionContext) -> Result<Value> {
        let plan = self.plan()?;
        let session = ctx.session()?;
        let sync = ctx.synchronizer()?;

        let refs = sync.resolve_all(session, &self.args.refs).await?;
        let video_url = sync.resolve(session, &plan.source).await?;

        let result = match plan.kind {
            EditKind::Edit => {
                generate(
                    session,
                    "editVideo",
                    &serde_json::json!({
                        "videoUrl": video_url,
                        "prompt": plan.prompt,
                        "referenceImages": refs,
                    }),
                )
                .await?
            }
            EditKind::LipSync => {
                let split = session
                    .invoke(
                        "splitVideoAndAudio",
                        serde_json::json!({ "videoUrl": video_url }),
                        None,
                    )
                    .await?;
                let audio_url = split
                    .get("audio")
                    .and_then(Value::as_str)
                    .ok_or_else(|| {
                        ZerocutError::Sandbox("splitVideoAndAudio returned no audio".into())
                    })?
                    .to_string();
                debug!(%audio_url, "audio track extracted");
                generate(
                    session,
                    "lipSync",
                    &serde_json::json!({
                        "videoUrl": video_url,
                        "audioUrl": audio_url,
                        "audioInMs": 0,
                        "pad_audio": false,
                    }),
                )
                .await?
            }
            EditKind::Extend => {
                let mut request = serde_json::json!({
                    "video_url": video_url,
                    "resolution": plan.resolution.as_deref().unwrap_or(EXTEND_RESOLUTION),
                    "prompt": plan.prompt,
                    "duration": plan.duration.unwrap_or(EXTEND_DURATION),
                });
                if let Some(end_frame) = refs.first() {
                    request["end_frame"] = Value::String(end_frame.clone());
                }
                generate(session, "extendVideo", &request).await?
            }
            EditKind::Upscale => {
                let mut request = serde_json::json!({ "video_url": video_url });
                if let Some(resolution) = &plan.resolution {
                    request["resolution"] = Value::String(resolution.clone());
                }
                generate(session, "upscaleVideo", &request).await?
            }
        };

        finish(ctx, result, self.args.output.as_deref()).await
    }
}

#[async_trait]
impl Action for VideoEdit {
    fn name(&self) -> &str {
        "video edit"
    }

    fn check(&self) -> Result<()> {
        self.plan().map(drop)
    }

    async fn run(&self, ctx: &ExecutionContext) -> Result<()> {
        let result = self.execute(ctx).await?;
        print_result(&result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::fixture::Fixture;
    use crate::testing::{MockCall, MockConnector};
    use serde_json::json;

    fn invocations(connector: &MockConnector) -> Vec<(String, Value)> {
        connector
            .calls()
            .into_iter()
            .filter_map(|c| match c {
                MockCall::Invoke { operation, params } => Some((operation, params)),
                _ => None,
            })
            .collect()
    }

    fn create(prompt: &str) -> VideoCreateArgs {
        VideoCreateArgs {
            prompt: Some(prompt.into()),
            ..Default::default()
        }
    }

    fn edit(kind: &str) -> VideoEditArgs {
        VideoEditArgs {
            source: Some("clip.mp4".into()),
            prompt: Some("make it rain".into()),
            kind: Some(kind.into()),
            ..Default::default()
        }
    }

    #[test]
    fn test_model_mappings() {
        assert_eq!(frames_model("wan").unwrap(), "wan-flash");
        assert_eq!(frames_model("seedance").unwrap(), "pro");
        assert_eq!(frames_model("kling").unwrap(), "kling");
        assert!(matches!(frames_model("sora2"), Err(ZerocutError::Unsupported(_))));
        assert_eq!(references_model("seedance"), "pro");
        assert_eq!(references_model("kling"), "kling-o1");
        assert_eq!(references_model("sora2"), "sora2");
    }

    #[test]
    fn test_create_checks() {
        assert!(VideoCreate::new(create("waves")).check().is_ok());
        assert!(VideoCreate::new(create("")).check().is_err());

        let sora_first_frame = VideoCreateArgs {
            kind: Some("sora2".into()),
            first_frame: Some("f.png".into()),
            ..create("waves")
        };
        assert!(VideoCreate::new(sora_first_frame).check().is_err());

        let long = VideoCreateArgs {
            duration: Some("20".into()),
            ..create("waves")
        };
        assert!(VideoCreate::new(long).check().is_err());
    }

    #[tokio::test]
    async fn test_create_with_references_defaults_to_vidu() {
        let fx = Fixture::new(MockConnector::new());
        fx.material("ref.png", b"ref");

        let action = VideoCreate::new(VideoCreateArgs {
            refs: vec!["ref.png".into()],
            seed: Some("7".into()),
            ..create("waves")
        });
        action.execute(&fx.ctx).await.unwrap();

        let calls = invocations(&fx.connector);
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].0, "referencesToVideo");
        assert_eq!(
            calls[0].1,
            json!({
                "type": "vidu",
                "prompt": "waves",
                "mute": true,
                "seed": 7,
                "reference_images": [Fixture::uri("ref.png")],
            })
        );
    }

    #[tokio::test]
    async fn test_create_kling_references_maps_model() {
        let fx = Fixture::new(MockConnector::new());
        let action = VideoCreate::new(VideoCreateArgs {
            kind: Some("kling".into()),
            with_audio: true,
            ..create("waves")
        });
        action.execute(&fx.ctx).await.unwrap();

        let calls = invocations(&fx.connector);
        assert_eq!(calls[0].1["type"], "kling-o1");
        assert_eq!(calls[0].1["mute"], false);
    }

    #[tokio::test]
    async fn test_create_with_frames() {
        let fx = Fixture::new(MockConnector::new());
        fx.material("first.png", b"1");

        let action = VideoCreate::new(VideoCreateArgs {
            kind: Some("wan".into()),
            first_frame: Some("first.png".into()),
            last_frame: Some("https://cdn.test/last.png".into()),
            duration: Some("5".into()),
            optimize_camera_motion: true,
            ..create("waves")
        });
        action.execute(&fx.ctx).await.unwrap();

        let calls = invocations(&fx.connector);
        assert_eq!(calls[0].0, "framesToVideo");
        assert_eq!(
            calls[0].1,
            json!({
                "type": "wan-flash",
                "prompt": "waves",
                "start_frame": Fixture::uri("first.png"),
                "end_frame": "https://cdn.test/last.png",
                "duration": 5,
                "mute": true,
                "optimizeCameraMotion": true,
            })
        );
    }

    #[test]
    fn test_edit_checks() {
        assert!(VideoEdit::new(edit("edit")).check().is_ok());
        assert!(VideoEdit::new(VideoEditArgs {
            source: None,
            ..edit("edit")
        })
        .check()
        .is_err());
        assert!(VideoEdit::new(edit("cut")).check().is_err());

        let extend_4k = VideoEditArgs {
            resolution: Some("4K".into()),
            ..edit("extend")
        };
        assert!(VideoEdit::new(extend_4k).check().is_err());

        let upscale_720 = VideoEditArgs {
            resolution: Some("720p".into()),
            ..edit("upscale")
        };
        let err = VideoEdit::new(upscale_720).check().unwrap_err();
        assert_eq!(err.to_string(), "720p resolution is not supported for upscale type");

        let unknown_res = VideoEditArgs {
            resolution: Some("8K".into()),
            ..edit("upscale")
        };
        assert!(VideoEdit::new(unknown_res).check().is_err());
    }

    #[tokio::test]
    async fn test_edit_defaults_to_edit_video() {
        let fx = Fixture::new(MockConnector::new());
        fx.material("clip.mp4", b"video");

        let action = VideoEdit::new(VideoEditArgs {
            kind: None,
            ..edit("edit")
        });
        action.execute(&fx.ctx).await.unwrap();

        let calls = invocations(&fx.connector);
        assert_eq!(calls[0].0, "editVideo");
        assert_eq!(calls[0].1["videoUrl"], Fixture::uri("clip.mp4"));
        assert_eq!(calls[0].1["referenceImages"], json!([]));
    }

    #[tokio::test]
    async fn test_edit_reference_images_are_refs_only() {
        let fx = Fixture::new(MockConnector::new());
        fx.material("clip.mp4", b"video");
        fx.material("style.png", b"style");

        let action = VideoEdit::new(VideoEditArgs {
            refs: vec!["style.png".into(), "https://cdn.test/mood.png".into()],
            ..edit("edit")
        });
        action.execute(&fx.ctx).await.unwrap();

        let calls = invocations(&fx.connector);
        assert_eq!(
            calls[0],
            (
                "editVideo".to_string(),
                json!({
                    "videoUrl": Fixture::uri("clip.mp4"),
                    "prompt": "make it rain",
                    "referenceImages": [Fixture::uri("style.png"), "https://cdn.test/mood.png"],
                })
            )
        );
    }

    #[tokio::test]
    async fn test_lipsync_splits_audio_first() {
        let connector = MockConnector::new()
            .with_result("splitVideoAndAudio", json!({"audio": "https://cdn.test/a.mp3"}));
        let fx = Fixture::new(connector);
        fx.material("clip.mp4", b"video");

        VideoEdit::new(edit("lipsync")).execute(&fx.ctx).await.unwrap();

        let calls = invocations(&fx.connector);
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].0, "splitVideoAndAudio");
        assert_eq!(calls[1].0, "lipSync");
        assert_eq!(
            calls[1].1,
            json!({
                "videoUrl": Fixture::uri("clip.mp4"),
                "audioUrl": "https://cdn.test/a.mp3",
                "audioInMs": 0,
                "pad_audio": false,
            })
        );
    }

    #[tokio::test]
    async fn test_lipsync_without_audio_fails() {
        let connector = MockConnector::new().with_result("splitVideoAndAudio", json!({}));
        let fx = Fixture::new(connector);
        fx.material("clip.mp4", b"video");

        let err = VideoEdit::new(edit("lipsync")).execute(&fx.ctx).await.unwrap_err();
        assert!(matches!(err, ZerocutError::Sandbox(_)));
    }

    #[tokio::test]
    async fn test_extend_defaults_and_end_frame() {
        let fx = Fixture::new(MockConnector::new());
        fx.material("clip.mp4", b"video");
        fx.material("end.png", b"end");

        let action = VideoEdit::new(VideoEditArgs {
            refs: vec!["end.png".into()],
            ..edit("extend")
        });
        action.execute(&fx.ctx).await.unwrap();

        let calls = invocations(&fx.connector);
        assert_eq!(calls[0].0, "extendVideo");
        assert_eq!(
            calls[0].1,
            json!({
                "video_url": Fixture::uri("clip.mp4"),
                "resolution": "720p",
                "prompt": "make it rain",
                "duration": 5,
                "end_frame": Fixture::uri("end.png"),
            })
        );
    }

    #[tokio::test]
    async fn test_extend_end_frame_takes_first_reference() {
        let fx = Fixture::new(MockConnector::new());
        fx.material("clip.mp4", b"video");
        fx.material("end.png", b"end");
        fx.material("extra.png", b"extra");

        let action = VideoEdit::new(VideoEditArgs {
            refs: vec!["end.png".into(), "extra.png".into()],
            resolution: Some("1080p".into()),
            duration: Some("8".into()),
            ..edit("extend")
        });
        action.execute(&fx.ctx).await.unwrap();

        let calls = invocations(&fx.connector);
        assert_eq!(calls[0].1["end_frame"], Fixture::uri("end.png"));
        assert_eq!(calls[0].1["video_url"], Fixture::uri("clip.mp4"));
        assert_eq!(calls[0].1["resolution"], "1080p");
        assert_eq!(calls[0].1["duration"], 8);
    }

    #[tokio::test]
    async fn test_extend_without_refs_omits_end_frame() {
        let fx = Fixture::new(MockConnector::new());
        fx.material("clip.mp4", b"video");

        VideoEdit::new(edit("extend")).execute(&fx.ctx).await.unwrap();

        let calls = invocations(&fx.connector);
        assert_eq!(calls[0].0, "extendVideo");
        assert!(calls[0].1.get("end_frame").is_none());
    }

    #[tokio::test]
    async fn test_upscale_passes_resolution() {
        let fx = Fixture::new(MockConnector::new());
        let action = VideoEdit::new(VideoEditArgs {
            source: Some("https://cdn.test/clip.mp4".into()),
            resolution: Some("4K".into()),
            ..edit("upscale")
        });
        action.execute(&fx.ctx).await.unwrap();

        let calls = invocations(&fx.connector);
        assert_eq!(
            calls[0],
            (
                "upscaleVideo".to_string(),
                json!({"video_url": "https://cdn.test/clip.mp4", "resolution": "4K"})
            )
        );
    }
}
