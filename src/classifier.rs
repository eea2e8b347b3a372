//! Material classification of waste photographs.
//!
//! A [`MaterialClassifier`] is built once at start-up and shared read-only.
//! It either wraps a trained model behind the [`InferenceModel`] trait or,
//! when no model artifact could be loaded, runs in degraded mode and returns
//! randomly drawn but well-formed predictions.

#[cfg(feature = "onnx")]
pub mod onnx;

use std::fmt;
use std::path::Path;

use image::imageops::FilterType;
use rand::seq::SliceRandom;
use rand::Rng;
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::ModelConfig;
use crate::models::{Category, Classification, ClassificationSource};
use crate::utils::round_to;

/// Confidence range, in percent, reported by degraded-mode predictions
pub const STUB_CONFIDENCE_RANGE: std::ops::RangeInclusive<f64> = 70.0..=95.0;

/// A forward pass over a preprocessed image.
///
/// `input` is one RGB image in height × width × channel order with values in
/// [0, 1]; the output holds one probability per [`Category`], in
/// [`Category::ALL`] order.
pub trait InferenceModel: Send + Sync {
    /// Run the model on a single image
    fn predict(&self, input: &[f32]) -> anyhow::Result<Vec<f32>>;
}

/// Why an image could not be classified
#[derive(Debug, Error)]
pub enum ClassifyError {
    /// The bytes are not a decodable raster image
    #[error("Failed to decode image: {0}")]
    Decode(#[from] image::ImageError),

    /// The model raised an error or produced unusable output
    #[error("Inference failed: {0}")]
    Inference(String),
}

/// Waste material classifier
pub struct MaterialClassifier {
    model: Option<Box<dyn InferenceModel>>,
    input_size: u32,
}

impl fmt::Debug for MaterialClassifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MaterialClassifier")
            .field("degraded", &self.is_degraded())
            .field("input_size", &self.input_size)
            .finish()
    }
}

impl MaterialClassifier {
    /// Load the model named in the configuration.
    ///
    /// Never fails: a missing or unloadable artifact leaves the classifier in
    /// degraded mode.
    #[must_use]
    pub fn load(config: &ModelConfig) -> Self {
        let path = Path::new(&config.path);

        if !path.exists() {
            warn!(path = %path.display(), "Model file not found, using mock classifications");
            return Self::degraded(config.input_size);
        }

        Self::load_artifact(path, config.input_size)
    }

    #[cfg(feature = "onnx")]
    fn load_artifact(path: &Path, input_size: u32) -> Self {
        match onnx::OnnxModel::load(path, input_size) {
            Ok(model) => {
                tracing::info!(path = %path.display(), input_size, "Model loaded successfully");
                Self::with_model(Box::new(model), input_size)
            }
            Err(e) => {
                tracing::error!(path = %path.display(), error = %e, "Error loading model, using mock classifications");
                Self::degraded(input_size)
            }
        }
    }

    #[cfg(not(feature = "onnx"))]
    fn load_artifact(path: &Path, input_size: u32) -> Self {
        warn!(
            path = %path.display(),
            "Built without the `onnx` feature, using mock classifications"
        );
        Self::degraded(input_size)
    }

    /// Classifier backed by a loaded model
    #[must_use]
    pub fn with_model(model: Box<dyn InferenceModel>, input_size: u32) -> Self {
        Self {
            model: Some(model),
            input_size,
        }
    }

    /// Classifier with no model, returning stub predictions
    #[must_use]
    pub const fn degraded(input_size: u32) -> Self {
        Self {
            model: None,
            input_size,
        }
    }

    /// True when predictions are stubbed rather than inferred
    #[must_use]
    pub const fn is_degraded(&self) -> bool {
        self.model.is_none()
    }

    /// Side length of the square model input
    #[must_use]
    pub const fn input_size(&self) -> u32 {
        self.input_size
    }

    /// Classify an encoded image
    pub fn classify(&self, image_bytes: &[u8]) -> Result<Classification, ClassifyError> {
        let Some(model) = &self.model else {
            // Degraded mode still rejects undecodable input.
            image::load_from_memory(image_bytes)?;
            let result = stub_prediction(&mut rand::thread_rng());
            debug!(category = %result.category, confidence = result.confidence, "Stub classification");
            return Ok(result);
        };

        let input = self.preprocess(image_bytes)?;
        let probabilities = model
            .predict(&input)
            .map_err(|e| ClassifyError::Inference(e.to_string()))?;

        top_prediction(&probabilities)
    }

    /// Decode, resize to the model input, force RGB and scale to [0, 1]
    pub fn preprocess(&self, image_bytes: &[u8]) -> Result<Vec<f32>, ClassifyError> {
        let image = image::load_from_memory(image_bytes)?;
        let rgb = image
            .resize_exact(self.input_size, self.input_size, FilterType::CatmullRom)
            .to_rgb8();

        Ok(rgb.as_raw().iter().map(|&v| f32::from(v) / 255.0).collect())
    }
}

/// Pick the most probable category; ties go to the earliest category
pub fn top_prediction(probabilities: &[f32]) -> Result<Classification, ClassifyError> {
    if probabilities.len() != Category::ALL.len() {
        return Err(ClassifyError::Inference(format!(
            "expected {} class scores, model returned {}",
            Category::ALL.len(),
            probabilities.len()
        )));
    }

    let mut best: Option<(usize, f32)> = None;
    for (index, &p) in probabilities.iter().enumerate() {
        if p.is_nan() {
            return Err(ClassifyError::Inference("model returned NaN".to_string()));
        }
        if best.map_or(true, |(_, top)| p > top) {
            best = Some((index, p));
        }
    }

    let (index, probability) =
        best.ok_or_else(|| ClassifyError::Inference("model returned no scores".to_string()))?;
    let category = Category::from_index(index)
        .ok_or_else(|| ClassifyError::Inference(format!("class index {index} out of range")))?;

    Ok(Classification {
        category,
        confidence: round_to((f64::from(probability) * 100.0).clamp(0.0, 100.0), 2),
        source: ClassificationSource::Model,
    })
}

/// Uniformly random category with a plausible confidence
pub fn stub_prediction<R: Rng>(rng: &mut R) -> Classification {
    let category = *Category::ALL.choose(rng).unwrap_or(&Category::Trash);
    let confidence = round_to(rng.gen_range(STUB_CONFIDENCE_RANGE), 2);

    Classification {
        category,
        confidence,
        source: ClassificationSource::Stub,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_top_prediction_picks_max() {
        let result = top_prediction(&[0.05, 0.1, 0.6, 0.1, 0.1, 0.05]).unwrap();
        assert_eq!(result.category, Category::Metal);
        assert!((result.confidence - 60.0).abs() < 1e-9);
        assert_eq!(result.source, ClassificationSource::Model);
    }

    #[test]
    fn test_top_prediction_tie_goes_first() {
        let result = top_prediction(&[0.3, 0.3, 0.1, 0.1, 0.1, 0.1]).unwrap();
        assert_eq!(result.category, Category::Cardboard);
    }

    #[test]
    fn test_top_prediction_rejects_wrong_width() {
        assert!(matches!(top_prediction(&[1.0; 5]), Err(ClassifyError::Inference(_))));
        assert!(matches!(top_prediction(&[]), Err(ClassifyError::Inference(_))));
    }

    #[test]
    fn test_top_prediction_clamps_confidence() {
        let result = top_prediction(&[0.0, 0.0, 0.0, 0.0, 0.0, 1.7]).unwrap();
        assert_eq!(result.category, Category::Trash);
        assert!((result.confidence - 100.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_stub_prediction_is_well_formed() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..200 {
            let result = stub_prediction(&mut rng);
            assert!(STUB_CONFIDENCE_RANGE.contains(&result.confidence));
            assert_eq!(result.source, ClassificationSource::Stub);
        }
    }
}
