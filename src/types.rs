use serde::{Deserialize, Deserializer, Serialize};

/// An image returned by the generation backend (or by an upload).
///
/// Opaque to the loop beyond being appended to the result sequence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedImage {
    #[serde(default)]
    pub id: Option<i64>,
    /// Source locator, e.g. `/output/a_red_hat.png`.
    pub src: String,
    /// Display text; the prompt for generated images.
    #[serde(default)]
    pub alt: String,
    pub width: u32,
    pub height: u32,
    #[serde(default, deserialize_with = "flag")]
    pub is_upload: bool,
    /// Creation time in seconds since the Unix epoch.
    #[serde(default)]
    pub time: f64,
    /// Id of the image used as a style reference, if any.
    #[serde(default, alias = "reference_image", deserialize_with = "reference")]
    pub reference_image: Option<i64>,
}

/// Accepts `true`/`false` as well as the backend's `0`/`1`.
fn flag<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Flag {
        Bool(bool),
        Int(i64),
    }

    Ok(match Flag::deserialize(deserializer)? {
        Flag::Bool(b) => b,
        Flag::Int(i) => i != 0,
    })
}

/// The backend uses `-1` for "no reference image".
fn reference<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<i64>::deserialize(deserializer)?.filter(|&id| id >= 0))
}

/// Whether the loop is currently producing images.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LoopStatus {
    #[default]
    Idle,
    Running,
}

impl LoopStatus {
    pub fn as_str(&self) -> &str {
        match self {
            LoopStatus::Idle => "idle",
            LoopStatus::Running => "running",
        }
    }
}

/// One request the executor should issue next.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingRequest {
    /// Run the request belongs to.
    pub epoch: u64,
    /// Position in the enumeration.
    pub index: usize,
    pub prompt: String,
}

/// Read-only view of the loop for the UI.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoopSnapshot {
    pub status: LoopStatus,
    pub epoch: u64,
    /// Next index to request.
    pub cursor: usize,
    pub prompt_count: usize,
    pub results: Vec<GeneratedImage>,
    pub last_error: Option<String>,
}
