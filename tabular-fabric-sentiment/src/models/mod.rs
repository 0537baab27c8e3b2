pub mod distilbert;

use candle_core::Device;
use tracing::info;

use crate::errors::InferError;

/// Resolves the configured device name: `cpu`, `cuda`, or `auto` (CUDA when available).
pub fn device(name: &str) -> Result<Device, InferError> {
    match name.to_lowercase().as_str() {
        "cpu" => Ok(Device::Cpu),
        "cuda" => Ok(Device::new_cuda(0)?),
        "auto" => {
            let device = Device::cuda_if_available(0)?;
            if !device.is_cuda() {
                info!("Running on CPU, to run on GPU, build with `--features cuda`");
            }
            Ok(device)
        }
        other => Err(InferError::GenericError {
            msg: format!("device not supported: {}", other),
        }),
    }
}
