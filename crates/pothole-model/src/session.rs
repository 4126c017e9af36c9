//! ONNX Runtime session wrapper.

use std::sync::Mutex;

use log::{debug, info};
use ndarray::{ArrayD, ArrayView4, IxDyn};
use ort::session::Session;
use ort::value::Tensor;
use pothole_seg::{BackendError, RawOutputs, SegmentationBackend};

use crate::{ModelConfig, ModelError, Result};

/// A loaded segmentation model.
///
/// The runtime needs exclusive access while running, so the session sits
/// behind a mutex; everything else is fixed at load time.
pub struct SegmentationModel {
    session: Mutex<Session>,
    input_name: String,
    output_names: Vec<String>,
    input_size: (u32, u32),
}

impl SegmentationModel {
    /// Build and optimise a session for `config.model_path`.
    pub fn load(config: &ModelConfig) -> Result<Self> {
        info!("loading model {:?}", config.model_path);
        let mut builder = Session::builder()?
            .with_optimization_level(config.graph_optimization_level())?;
        if let Some(threads) = config.intra_threads {
            builder = builder.with_intra_threads(threads)?;
        }
        let session = builder.commit_from_file(&config.model_path)?;

        let input_name = session
            .inputs
            .first()
            .map(|i| i.name.clone())
            .ok_or(ModelError::NoInputs)?;
        let output_names: Vec<String> = session.outputs.iter().map(|o| o.name.clone()).collect();
        if output_names.len() != 2 {
            return Err(ModelError::OutputCount(output_names.len()));
        }
        info!("model ready: input {input_name:?}, outputs {output_names:?}");

        Ok(Self {
            session: Mutex::new(session),
            input_name,
            output_names,
            input_size: config.input_size,
        })
    }

    pub fn input_name(&self) -> &str {
        &self.input_name
    }

    pub fn output_names(&self) -> &[String] {
        &self.output_names
    }

    /// `(height, width)` the model was exported at.
    pub fn input_size(&self) -> (u32, u32) {
        self.input_size
    }

    /// Run one `(1, 3, H, W)` tensor and copy both outputs out of the runtime.
    pub fn infer(&self, input: ArrayView4<f32>) -> Result<RawOutputs> {
        let (h, w) = self.input_size;
        if input.dim() != (1, 3, h as usize, w as usize) {
            return Err(ModelError::InputShape {
                expected_h: h,
                expected_w: w,
                found: input.shape().to_vec(),
            });
        }

        let tensor = Tensor::from_array(input.to_owned())?;
        let mut session = self.session.lock().map_err(|_| ModelError::SessionPoisoned)?;
        let outputs = session.run(ort::inputs![self.input_name.as_str() => tensor])?;

        let mut arrays = Vec::with_capacity(self.output_names.len());
        for name in &self.output_names {
            let (shape, data) = outputs[name.as_str()].try_extract_tensor::<f32>()?;
            let dims: Vec<usize> = shape.iter().map(|&d| d as usize).collect();
            debug!("output {name:?}: {dims:?}");
            arrays.push(ArrayD::from_shape_vec(IxDyn(&dims), data.to_vec())?);
        }

        let second = arrays.pop().ok_or(ModelError::OutputCount(0))?;
        let first = arrays.pop().ok_or(ModelError::OutputCount(1))?;
        Ok(RawOutputs(first, second))
    }
}

impl SegmentationBackend for SegmentationModel {
    fn infer(&self, input: ArrayView4<f32>) -> std::result::Result<RawOutputs, BackendError> {
        SegmentationModel::infer(self, input).map_err(Into::into)
    }
}

impl std::fmt::Debug for SegmentationModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SegmentationModel")
            .field("input_name", &self.input_name)
            .field("output_names", &self.output_names)
            .field("input_size", &self.input_size)
            .finish_non_exhaustive()
    }
}
