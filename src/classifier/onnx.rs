//! ONNX inference backend built on `tract`.

use std::path::Path;

use anyhow::{Context, Result};
use tract_onnx::prelude::*;

use super::InferenceModel;

type Plan = TypedRunnableModel<TypedModel>;

/// Optimized ONNX graph taking a `[1, size, size, 3]` float tensor
pub struct OnnxModel {
    plan: Plan,
    input_size: usize,
}

impl OnnxModel {
    /// Load and optimize a model file
    pub fn load(path: &Path, input_size: u32) -> Result<Self> {
        let side = usize::try_from(input_size)?;

        let plan = tract_onnx::onnx()
            .model_for_path(path)
            .with_context(|| format!("Failed to read model {}", path.display()))?
            .with_input_fact(0, f32::fact([1, side, side, 3]).into())?
            .into_optimized()?
            .into_runnable()?;

        Ok(Self {
            plan,
            input_size: side,
        })
    }
}

impl InferenceModel for OnnxModel {
    fn predict(&self, input: &[f32]) -> Result<Vec<f32>> {
        let side = self.input_size;
        let tensor: Tensor = tract_ndarray::Array4::from_shape_vec((1, side, side, 3), input.to_vec())?.into();

        let outputs = self.plan.run(tvec!(tensor.into()))?;
        let scores = outputs
            .first()
            .context("Model produced no outputs")?
            .to_array_view::<f32>()?;

        Ok(scores.iter().copied().collect())
    }
}
