//! Generation records as served by the history backend.
//!
//! Records are immutable from the viewer's point of view. The wire format is
//! camelCase JSON; optional fields tolerate both absence and `null`.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Stable, unique identifier of a generation record.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(String);

impl RecordId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RecordId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// How the image was produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum GenerationMode {
    #[default]
    #[serde(rename = "t2i", alias = "text-to-image")]
    TextToImage,
    #[serde(rename = "i2i", alias = "image-to-image")]
    ImageToImage,
}

impl GenerationMode {
    pub fn label(&self) -> &'static str {
        match self {
            Self::TextToImage => "Text to Image",
            Self::ImageToImage => "Image to Image",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GenerationParams {
    pub width: u32,
    pub height: u32,
    pub steps: u32,
    pub guidance_scale: f32,
    pub seed: u64,
    pub strength: Option<f32>,
}

/// Where the generated image lives on the backend.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutputRef {
    pub path: String,
    #[serde(default)]
    pub format: Option<String>,
    #[serde(default)]
    pub width: Option<u32>,
    #[serde(default)]
    pub height: Option<u32>,
    #[serde(default)]
    pub size_bytes: Option<u64>,
}

/// An uploaded input image (image-to-image only).
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InputRef {
    #[serde(default)]
    pub path: String,
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationRecord {
    pub id: RecordId,
    #[serde(default)]
    pub mode: GenerationMode,
    /// RFC 3339 timestamp. Kept as text so a malformed value never rejects the record.
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub prompt: String,
    #[serde(default)]
    pub negative_prompt: Option<String>,
    #[serde(default)]
    pub params: GenerationParams,
    #[serde(default)]
    pub output: OutputRef,
    /// Legacy single-input field.
    #[serde(default)]
    pub input: Option<InputRef>,
    #[serde(default)]
    pub inputs: Option<Vec<InputRef>>,
    #[serde(default)]
    pub duration_ms: Option<u64>,
    #[serde(default)]
    pub provider: Option<String>,
}

impl GenerationRecord {
    /// Input images, falling back to the legacy `input` field.
    pub fn input_images(&self) -> &[InputRef] {
        match (&self.inputs, &self.input) {
            (Some(list), _) if !list.is_empty() => list,
            (_, Some(single)) => std::slice::from_ref(single),
            _ => &[],
        }
    }

    pub fn prompt_or_untitled(&self) -> &str {
        if self.prompt.trim().is_empty() {
            "Untitled prompt"
        } else {
            &self.prompt
        }
    }

    pub fn negative_prompt_text(&self) -> Option<&str> {
        self.negative_prompt
            .as_deref()
            .filter(|text| !text.trim().is_empty())
    }

    /// File name component of the output path.
    pub fn file_name(&self) -> Option<&str> {
        self.output
            .path
            .rsplit('/')
            .next()
            .filter(|name| !name.is_empty())
    }

    pub fn model_label(&self) -> String {
        crate::form::model_label(self.provider.as_deref())
    }

    pub fn size_label(&self) -> String {
        format!("{} x {}", self.params.width, self.params.height)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RECORD_JSON: &str = r#"{
        "id": "3f2a",
        "mode": "t2i",
        "createdAt": "2025-03-01T10:15:00+00:00",
        "prompt": "a lighthouse at dusk",
        "negativePrompt": "",
        "params": {
            "width": 1024, "height": 768, "steps": 9,
            "guidanceScale": 0.0, "seed": 42, "strength": null
        },
        "output": {
            "path": "/outputs/output-3f2a.png", "format": "png",
            "width": 1024, "height": 768, "sizeBytes": 1536
        },
        "input": null,
        "inputs": null,
        "durationMs": 850,
        "provider": "z-image-turbo"
    }"#;

    #[test]
    fn parses_backend_record() {
        let record: GenerationRecord = serde_json::from_str(RECORD_JSON).unwrap();
        assert_eq!(record.id.as_str(), "3f2a");
        assert_eq!(record.mode, GenerationMode::TextToImage);
        assert_eq!(record.params.width, 1024);
        assert_eq!(record.params.strength, None);
        assert_eq!(record.output.size_bytes, Some(1536));
        assert_eq!(record.duration_ms, Some(850));
        assert_eq!(record.negative_prompt_text(), None);
        assert_eq!(record.file_name(), Some("output-3f2a.png"));
        assert_eq!(record.model_label(), "Z-Image Turbo");
    }

    #[test]
    fn tolerates_sparse_legacy_record() {
        let json = r#"{"id": "old", "output": {"path": "/outputs/old.png"},
                       "provider": "legacy", "mode": "image-to-image",
                       "input": {"path": "/uploads/src.png"}}"#;
        let record: GenerationRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.mode, GenerationMode::ImageToImage);
        assert_eq!(record.prompt_or_untitled(), "Untitled prompt");
        assert_eq!(record.input_images().len(), 1);
        assert_eq!(record.input_images()[0].path, "/uploads/src.png");
        assert_eq!(record.model_label(), "Legacy");
        assert!(record.created_at.is_none());
    }

    #[test]
    fn input_list_wins_over_legacy_field() {
        let mut record: GenerationRecord = serde_json::from_str(RECORD_JSON).unwrap();
        record.input = Some(InputRef { path: "/uploads/a.png".into(), name: None });
        record.inputs = Some(vec![
            InputRef { path: "/uploads/b.png".into(), name: None },
            InputRef { path: "/uploads/c.png".into(), name: None },
        ]);
        let paths: Vec<_> = record.input_images().iter().map(|i| i.path.as_str()).collect();
        assert_eq!(paths, ["/uploads/b.png", "/uploads/c.png"]);
    }

    #[test]
    fn mode_serializes_to_wire_tag() {
        let json = serde_json::to_string(&GenerationMode::ImageToImage).unwrap();
        assert_eq!(json, "\"i2i\"");
    }
}
