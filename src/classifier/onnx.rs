use std::path::Path;

use ndarray::Array4;
use tract_onnx::prelude::*;

use super::{check_input_shape, Classifier};
use crate::error::ClassifierError;
use crate::labels::{CHANNELS, IMAGE_SIZE};

type Plan = TypedRunnableModel<TypedModel>;

/// An ONNX export of the network (NHWC input, softmax output), optimized once at load.
pub struct OnnxClassifier {
    plan: Plan,
}

impl OnnxClassifier {
    pub fn load(path: &Path) -> Result<Self, ClassifierError> {
        let plan = build_plan(path).map_err(|e| ClassifierError::ModelLoad(e.to_string()))?;
        Ok(Self { plan })
    }

    fn run(&self, input: &Array4<f32>) -> TractResult<Vec<f32>> {
        let data: Vec<f32> = input.iter().copied().collect();
        let tensor =
            tract_ndarray::Array::from_shape_vec((1, IMAGE_SIZE, IMAGE_SIZE, CHANNELS), data)?
                .into_tensor();

        let outputs = self.plan.run(tvec!(tensor.into()))?;
        let probabilities = outputs[0].to_array_view::<f32>()?;

        Ok(probabilities.iter().copied().collect())
    }
}

fn build_plan(path: &Path) -> TractResult<Plan> {
    let input = InferenceFact::dt_shape(
        f32::datum_type(),
        tvec!(1, IMAGE_SIZE, IMAGE_SIZE, CHANNELS),
    );

    onnx()
        .model_for_path(path)?
        .with_input_fact(0, input)?
        .into_optimized()?
        .into_runnable()
}

impl Classifier for OnnxClassifier {
    fn probabilities(&self, input: &Array4<f32>) -> Result<Vec<f32>, ClassifierError> {
        check_input_shape(input)?;
        self.run(input)
            .map_err(|e| ClassifierError::Inference(e.to_string()))
    }
}
