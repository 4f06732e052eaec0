use reqwest::multipart::{Form, Part};
use reqwest::{Client, Url};
use std::future::Future;
use std::path::Path;
use std::time::Duration;
use tracing::debug;

use crate::error::{LoopError, Result};
use crate::params::GenerationParameters;
use crate::types::GeneratedImage;

const GENERATE_PATH: &str = "/transforms/stable-diffusion";
const UPLOAD_PATH: &str = "/files/upload";

/// The remote generation capability the loop drives.
///
/// Implement this for any transport that can turn a prompt and a set of
/// parameters into a [`GeneratedImage`]. [`HttpGenerationClient`] is the
/// HTTP implementation.
///
/// # Example
///
/// ```ignore
/// use diffusion_loop::*;
///
/// struct Canned;
///
/// impl GenerationClient for Canned {
///     async fn generate(&self, prompt: &str, _params: &GenerationParameters) -> Result<GeneratedImage> {
///         Ok(GeneratedImage {
///             id: None,
///             src: format!("/output/{}.png", prompt.replace(' ', "_")),
///             alt: prompt.to_string(),
///             width: 512,
///             height: 512,
///             is_upload: false,
///             time: 0.0,
///             reference_image: None,
///         })
///     }
/// }
/// ```
pub trait GenerationClient: Send + Sync + 'static {
    /// Request one image for `prompt`.
    fn generate(
        &self,
        prompt: &str,
        params: &GenerationParameters,
    ) -> impl Future<Output = Result<GeneratedImage>> + Send;
}

fn normalize(endpoint: String) -> String {
    endpoint.trim_end_matches('/').to_string()
}

/// HTTP client for the Stable Diffusion web backend.
///
/// # Example
/// ```no_run
/// use diffusion_loop::{GenerationClient, GenerationParameters, HttpGenerationClient};
///
/// # async fn example() -> diffusion_loop::Result<()> {
/// let client = HttpGenerationClient::new("http://127.0.0.1:8000");
/// let image = client
///     .generate("a lighthouse in a storm", &GenerationParameters::default())
///     .await?;
/// println!("{}", client.image_url(&image));
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct HttpGenerationClient {
    http: Client,
    endpoint: String,
    api_prefix: String,
    timeout: Duration,
}

impl HttpGenerationClient {
    /// Create a client for the backend at `endpoint`.
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            http: Client::new(),
            endpoint: normalize(endpoint.into()),
            api_prefix: "/api".to_string(),
            timeout: Duration::from_secs(300),
        }
    }

    /// Use a custom `reqwest::Client` (for connection pooling, TLS).
    pub fn with_http_client(mut self, client: Client) -> Self {
        self.http = client;
        self
    }

    /// Per-request timeout. Generation with upscaling can take minutes.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Path prefix the backend routes are mounted under (default `/api`).
    pub fn with_api_prefix(mut self, prefix: impl Into<String>) -> Self {
        let prefix = prefix.into();
        let trimmed = prefix.trim_matches('/');
        self.api_prefix = if trimmed.is_empty() {
            String::new()
        } else {
            format!("/{}", trimmed)
        };
        self
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Build the generation URL for a prompt and parameter set.
    pub fn generate_url(&self, prompt: &str, params: &GenerationParameters) -> Result<Url> {
        let mut pairs = vec![("prompt", prompt.to_string())];
        pairs.extend(params.query_pairs());

        Url::parse_with_params(
            &format!("{}{}{}", self.endpoint, self.api_prefix, GENERATE_PATH),
            &pairs,
        )
        .map_err(|e| LoopError::InvalidConfig(format!("Bad generation URL: {}", e)))
    }

    /// Resolve an image's source locator against the backend endpoint.
    pub fn image_url(&self, image: &GeneratedImage) -> String {
        if image.src.starts_with("http://") || image.src.starts_with("https://") {
            image.src.clone()
        } else if image.src.starts_with('/') {
            format!("{}{}", self.endpoint, image.src)
        } else {
            format!("{}/{}", self.endpoint, image.src)
        }
    }

    // ── Upload ──────────────────────────────────────────────────────

    /// Upload image bytes for use as a style reference or mask.
    pub async fn upload_image(
        &self,
        filename: impl Into<String>,
        bytes: Vec<u8>,
    ) -> Result<GeneratedImage> {
        let filename = filename.into();
        let url = format!("{}{}{}", self.endpoint, self.api_prefix, UPLOAD_PATH);
        let form = Form::new().part("file", Part::bytes(bytes).file_name(filename.clone()));

        debug!(%filename, "uploading reference image");
        let resp = self
            .http
            .post(&url)
            .timeout(self.timeout)
            .multipart(form)
            .send()
            .await
            .map_err(|e| LoopError::Network {
                context: format!("Failed to upload {} to {}", filename, self.endpoint),
                source: e,
            })?;

        decode_image(resp, "upload").await
    }

    /// Read a local file and upload it.
    pub async fn upload_file(&self, path: impl AsRef<Path>) -> Result<GeneratedImage> {
        let path = path.as_ref();
        let bytes = tokio::fs::read(path).await?;
        let filename = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("upload.png")
            .to_string();
        self.upload_image(filename, bytes).await
    }
}

impl GenerationClient for HttpGenerationClient {
    async fn generate(&self, prompt: &str, params: &GenerationParameters) -> Result<GeneratedImage> {
        let url = self.generate_url(prompt, params)?;

        let resp = self
            .http
            .post(url)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| LoopError::Network {
                context: format!(
                    "Cannot connect to generation backend at {} \u{2014} is the service running?",
                    self.endpoint
                ),
                source: e,
            })?;

        decode_image(resp, "generation").await
    }
}

async fn decode_image(resp: reqwest::Response, what: &str) -> Result<GeneratedImage> {
    let status = resp.status();
    let body = resp.text().await.map_err(|e| LoopError::Network {
        context: format!("Failed to read {} response", what),
        source: e,
    })?;

    if !status.is_success() {
        return Err(LoopError::Http {
            status: status.as_u16(),
            body,
        });
    }

    parse_image(&body, what)
}

fn parse_image(body: &str, what: &str) -> Result<GeneratedImage> {
    serde_json::from_str(body)
        .map_err(|e| LoopError::InvalidResponse(format!("Unexpected {} response: {}", what, e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_endpoint() {
        assert_eq!(normalize("http://localhost:8000/".into()), "http://localhost:8000");
        assert_eq!(normalize("http://localhost:8000".into()), "http://localhost:8000");
        assert_eq!(normalize("http://host:8000///".into()), "http://host:8000");
    }

    #[test]
    fn test_client_builder() {
        let client = HttpGenerationClient::new("http://127.0.0.1:8000/")
            .with_timeout(Duration::from_secs(30));
        assert_eq!(client.endpoint(), "http://127.0.0.1:8000");
        assert_eq!(client.timeout(), Duration::from_secs(30));
    }

    #[test]
    fn test_generate_url_encodes_prompt() {
        let client = HttpGenerationClient::new("http://localhost:8000");
        let url = client
            .generate_url("a red & blue hat", &GenerationParameters::default())
            .unwrap();
        assert_eq!(url.path(), "/api/transforms/stable-diffusion");
        let pairs: Vec<_> = url.query_pairs().into_owned().collect();
        assert_eq!(pairs, vec![("prompt".to_string(), "a red & blue hat".to_string())]);
    }

    #[test]
    fn test_generate_url_includes_parameters() {
        let client = HttpGenerationClient::new("http://localhost:8000").with_api_prefix("");
        let params = GenerationParameters::default()
            .with_size(512, 768)
            .with_fix_faces(true);
        let url = client.generate_url("cat", &params).unwrap();
        assert_eq!(url.path(), "/transforms/stable-diffusion");
        let pairs: Vec<_> = url.query_pairs().into_owned().collect();
        assert_eq!(
            pairs,
            vec![
                ("prompt".to_string(), "cat".to_string()),
                ("width".to_string(), "512".to_string()),
                ("height".to_string(), "768".to_string()),
                ("fix_faces".to_string(), "true".to_string()),
            ]
        );
    }

    #[test]
    fn test_custom_api_prefix() {
        let client = HttpGenerationClient::new("http://localhost:8000").with_api_prefix("/v1/");
        let url = client
            .generate_url("cat", &GenerationParameters::default())
            .unwrap();
        assert_eq!(url.path(), "/v1/transforms/stable-diffusion");
    }

    #[test]
    fn test_image_url() {
        let client = HttpGenerationClient::new("http://localhost:8000");
        let mut image: GeneratedImage = serde_json::from_str(
            r#"{"src": "/output/cat.png", "width": 512, "height": 512}"#,
        )
        .unwrap();
        assert_eq!(client.image_url(&image), "http://localhost:8000/output/cat.png");

        image.src = "output/cat.png".into();
        assert_eq!(client.image_url(&image), "http://localhost:8000/output/cat.png");

        image.src = "https://cdn.example.com/cat.png".into();
        assert_eq!(client.image_url(&image), "https://cdn.example.com/cat.png");
    }

    #[test]
    fn test_parse_generation_response() {
        let image = parse_image(
            r#"{"src": "/output/cat.png", "alt": "cat", "width": 512, "height": 512,
                "isUpload": 0, "time": 1.0, "reference_image": -1}"#,
            "generation",
        )
        .unwrap();
        assert_eq!(image.alt, "cat");
    }

    #[test]
    fn test_parse_null_response() {
        let err = parse_image("null", "upload").unwrap_err();
        assert!(matches!(err, LoopError::InvalidResponse(ref m) if m.contains("upload")));
    }

    #[tokio::test]
    async fn test_upload_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let client = HttpGenerationClient::new("http://localhost:8000");
        let err = client
            .upload_file(dir.path().join("missing.png"))
            .await
            .unwrap_err();
        assert!(matches!(err, LoopError::Io(_)));
    }
}
