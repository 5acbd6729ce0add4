//! `zerocut image ...`

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;

use super::{finish, generate, one_of, print_result, required};
use crate::cli::ImageCreateArgs;
use crate::error::ZerocutError;
use crate::lifecycle::{Action, ExecutionContext};
use crate::Result;

/// Accepted `--type` values.
pub const IMAGE_TYPES: &[&str] = &["seedream", "seedream-pro", "banana", "banana-pro", "wan"];

/// Body of a `generateImage` call.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GenerateImageRequest {
    pub prompt: String,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<String>,
    pub image: Vec<String>,
}

/// `image create`
#[derive(Debug)]
pub struct ImageCreate {
    args: ImageCreateArgs,
}

impl ImageCreate {
    pub fn new(args: ImageCreateArgs) -> Self {
        Self { args }
    }

    /// Validated request with references still unresolved.
    fn request(&self) -> Result<GenerateImageRequest> {
        Ok(GenerateImageRequest {
            prompt: required(self.args.prompt.as_deref(), "prompt")?,
            kind: one_of(self.args.kind.as_deref(), IMAGE_TYPES, "type")?,
            size: self.args.size.clone(),
            image: Vec::new(),
        })
    }

    /// Resolve references, generate and optionally save the image.
    pub async fn execute(&self, ctx: &ExecutionContext) -> Result<Value> {
        let mut request = self.request()?;
        let session = ctx.session()?;
        request.image = ctx.synchronizer()?.resolve_all(session, &self.args.refs).await?;

        let result = generate(session, "generateImage", &request).await?;
        finish(ctx, result, self.args.output.as_deref()).await
    }
}

#[async_trait]
impl Action for ImageCreate {
    fn name(&self) -> &str {
        "image create"
    }

    fn check(&self) -> Result<()> {
        self.request().map(drop)
    }

    async fn run(&self, ctx: &ExecutionContext) -> Result<()> {
        let result = self.execute(ctx).await?;
        print_result(&result)
    }
}

/// `image edit`: not offered by the service yet.
#[derive(Debug)]
pub struct ImageEdit;

#[async_trait]
impl Action for ImageEdit {
    fn name(&self) -> &str {
        "image edit"
    }

    fn requires_session(&self) -> bool {
        false
    }

    async fn run(&self, _ctx: &ExecutionContext) -> Result<()> {
        Err(ZerocutError::Unsupported("image edit is not available yet".into()))
    }
}
