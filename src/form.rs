//! Generation form state and model presets.

use rand::Rng;

use crate::api::GenerationRequest;

pub const DEFAULT_MODEL: &str = "z-image-turbo";
pub const SIZE_SHORTCUTS: [u32; 4] = [512, 768, 1024, 1536];
/// Output dimensions must be multiples of this.
pub const SIZE_STEP: u32 = 16;
const MAX_SEED: u32 = 1_000_000_000;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ModelPreset {
    pub id: &'static str,
    pub label: &'static str,
    pub steps: u32,
    pub guidance_scale: f32,
    pub hint: &'static str,
}

pub const MODEL_PRESETS: [ModelPreset; 2] = [
    ModelPreset {
        id: "z-image-turbo",
        label: "Z-Image Turbo",
        steps: 9,
        guidance_scale: 0.0,
        hint: "Turbo runs best around 9 steps with low guidance.",
    },
    ModelPreset {
        id: "z-image",
        label: "Z-Image",
        steps: 50,
        guidance_scale: 4.0,
        hint: "Recommended: 512-2048 px, steps 28-50, guidance 3-5.",
    },
];

pub fn preset(id: &str) -> Option<&'static ModelPreset> {
    MODEL_PRESETS.iter().find(|preset| preset.id == id)
}

/// Display label for a record's provider tag.
pub fn model_label(provider: Option<&str>) -> String {
    match provider.map(str::trim) {
        None | Some("") => MODEL_PRESETS[0].label.to_string(),
        Some("legacy") => "Legacy".to_string(),
        Some(tag) => preset(tag)
            .map(|preset| preset.label.to_string())
            .unwrap_or_else(|| tag.to_string()),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum FormError {
    #[error("Check resolution and required fields.")]
    InvalidResolution,
    #[error("Enter a prompt.")]
    MissingPrompt,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FormState {
    pub model: String,
    pub prompt: String,
    pub negative_prompt: String,
    pub width: u32,
    pub height: u32,
    pub steps: u32,
    pub guidance_scale: f32,
    /// Free text so an empty field means "random on the backend".
    pub seed: String,
}

impl Default for FormState {
    fn default() -> Self {
        let mut form = Self {
            model: DEFAULT_MODEL.to_string(),
            prompt: String::new(),
            negative_prompt: String::new(),
            width: 1024,
            height: 1024,
            steps: 0,
            guidance_scale: 0.0,
            seed: String::new(),
        };
        form.apply_preset(DEFAULT_MODEL);
        form
    }
}

impl FormState {
    /// Switch model and load its step and guidance defaults.
    pub fn apply_preset(&mut self, id: &str) {
        if let Some(preset) = preset(id) {
            self.model = preset.id.to_string();
            self.steps = preset.steps;
            self.guidance_scale = preset.guidance_scale;
        }
    }

    pub fn hint(&self) -> &'static str {
        preset(&self.model).map(|preset| preset.hint).unwrap_or("")
    }

    pub fn set_square(&mut self, size: u32) {
        self.width = size;
        self.height = size;
    }

    pub fn randomize_seed(&mut self) {
        self.randomize_seed_with(&mut rand::rng());
    }

    pub fn randomize_seed_with(&mut self, rng: &mut impl Rng) {
        self.seed = rng.random_range(0..MAX_SEED).to_string();
    }

    pub fn to_request(&self) -> Result<GenerationRequest, FormError> {
        let valid = |side: u32| side > 0 && side % SIZE_STEP == 0;
        if !valid(self.width) || !valid(self.height) {
            return Err(FormError::InvalidResolution);
        }
        if self.prompt.trim().is_empty() {
            return Err(FormError::MissingPrompt);
        }
        Ok(GenerationRequest {
            model: self.model.clone(),
            prompt: self.prompt.trim().to_string(),
            negative_prompt: self.negative_prompt.trim().to_string(),
            width: self.width,
            height: self.height,
            steps: self.steps,
            guidance_scale: self.guidance_scale,
            seed: self.seed.trim().to_string(),
        })
    }
}
