use serde::{Deserialize, Serialize};

use crate::types::GeneratedImage;

/// Side length the diffusion model is trained at.
pub const BASE_IMAGE_SIZE: u32 = 512;

/// Largest side the backend generates without an upscaler.
pub const MAX_IMAGE_SIZE: u32 = 1000;

/// Optional settings passed through to the generation backend.
///
/// Every field is optional; an absent field means "use the backend default".
/// The loop controller reads these at the moment each request is issued, so
/// changes apply to the very next request.
///
/// # Example
/// ```
/// use diffusion_loop::GenerationParameters;
///
/// let params = GenerationParameters::default()
///     .with_size(512, 768)
///     .with_fix_faces(true)
///     .with_guidance_scale(7.5);
///
/// let pairs = params.query_pairs();
/// assert_eq!(pairs[0], ("width", "512".to_string()));
/// assert!(pairs.contains(&("fix_faces", "true".to_string())));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationParameters {
    /// Source locator of a reference/style image.
    pub image_prompt: Option<String>,
    /// Source locator of an inpainting mask.
    pub mask_image: Option<String>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    /// Upscale factor applied after generation.
    pub upscale: Option<f64>,
    pub fix_faces: Option<bool>,
    pub inference_steps: Option<u32>,
    pub guidance_scale: Option<f64>,
    pub eta: Option<f64>,
    pub strength: Option<f64>,
}

impl GenerationParameters {
    /// Set the output dimensions.
    pub fn with_size(mut self, width: u32, height: u32) -> Self {
        self.width = Some(width);
        self.height = Some(height);
        self
    }

    /// Use an uploaded or previously generated image as the style reference.
    pub fn with_image_prompt(mut self, image: &GeneratedImage) -> Self {
        self.image_prompt = Some(image.src.clone());
        self
    }

    /// Use an image as the inpainting mask.
    pub fn with_mask_image(mut self, image: &GeneratedImage) -> Self {
        self.mask_image = Some(image.src.clone());
        self
    }

    pub fn with_upscale(mut self, factor: f64) -> Self {
        self.upscale = Some(factor);
        self
    }

    /// Restore faces after generation.
    pub fn with_fix_faces(mut self, fix: bool) -> Self {
        self.fix_faces = Some(fix);
        self
    }

    pub fn with_inference_steps(mut self, steps: u32) -> Self {
        self.inference_steps = Some(steps);
        self
    }

    pub fn with_guidance_scale(mut self, scale: f64) -> Self {
        self.guidance_scale = Some(scale);
        self
    }

    pub fn with_eta(mut self, eta: f64) -> Self {
        self.eta = Some(eta);
        self
    }

    pub fn with_strength(mut self, strength: f64) -> Self {
        self.strength = Some(strength);
        self
    }

    /// Set a target size, optionally reaching it through the upscaler.
    ///
    /// Without upscaling the size is used as is. With upscaling the smaller
    /// side is generated at [`BASE_IMAGE_SIZE`], the other side keeps the
    /// aspect ratio, and the upscale factor makes up the difference (never
    /// below 1).
    pub fn with_target_size(mut self, width: u32, height: u32, upscale: bool) -> Self {
        if !upscale || width == 0 || height == 0 {
            self.width = Some(width);
            self.height = Some(height);
            self.upscale = None;
            return self;
        }

        let base = f64::from(BASE_IMAGE_SIZE);
        let (w, h) = (f64::from(width), f64::from(height));
        if width > height {
            self.width = Some((w / h * base).round() as u32);
            self.height = Some(BASE_IMAGE_SIZE);
            self.upscale = Some((h / base).max(1.0));
        } else {
            self.width = Some(BASE_IMAGE_SIZE);
            self.height = Some((h / w * base).round() as u32);
            self.upscale = Some((w / base).max(1.0));
        }
        self
    }

    /// Whether the requested size is unusual enough to offer upscaling.
    pub fn is_irregular_size(&self) -> bool {
        let too_big = |side: Option<u32>| side.is_some_and(|s| s > MAX_IMAGE_SIZE);
        let off_base = match (self.width, self.height) {
            (Some(w), Some(h)) => w != BASE_IMAGE_SIZE && h != BASE_IMAGE_SIZE,
            _ => false,
        };
        self.upscale.is_some() || too_big(self.width) || too_big(self.height) || off_base
    }

    /// Present fields as backend query parameters, in a fixed order.
    ///
    /// Absent fields are omitted and `fix_faces` is only sent when true.
    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        let fields: [(&'static str, Option<String>); 10] = [
            ("img_prompt", self.image_prompt.clone()),
            ("img_mask", self.mask_image.clone()),
            ("width", self.width.map(|v| v.to_string())),
            ("height", self.height.map(|v| v.to_string())),
            ("upscale", self.upscale.map(|v| v.to_string())),
            (
                "fix_faces",
                self.fix_faces.filter(|&f| f).map(|_| "true".to_string()),
            ),
            ("num_inference_steps", self.inference_steps.map(|v| v.to_string())),
            ("guidance_scale", self.guidance_scale.map(|v| v.to_string())),
            ("eta", self.eta.map(|v| v.to_string())),
            ("strength", self.strength.map(|v| v.to_string())),
        ];

        fields
            .into_iter()
            .filter_map(|(name, value)| value.map(|v| (name, v)))
            .collect()
    }
}
