use crate::config::DevicePreference;
use crate::error::{Result, SpectroFeatError};
use candle_core::Device;
use std::fmt;

/// Where the network parameters live and the forward pass runs.
///
/// Resolved once at startup and handed to the extractor, so the extraction
/// path never probes hardware on its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComputeDevice {
    /// CUDA device with the given ordinal.
    Accelerator(usize),
    HostProcessor,
}

impl ComputeDevice {
    /// Accelerator 0 when the build has CUDA support and a device answers,
    /// host processor otherwise.
    pub fn detect() -> Self {
        if candle_core::utils::cuda_is_available() {
            match Device::new_cuda(0) {
                Ok(_) => {
                    tracing::info!("CUDA device 0 available");
                    return ComputeDevice::Accelerator(0);
                }
                Err(e) => {
                    tracing::debug!("CUDA not available: {}", e);
                }
            }
        }

        ComputeDevice::HostProcessor
    }

    pub fn resolve(preference: DevicePreference) -> Result<Self> {
        match preference {
            DevicePreference::Auto => Ok(Self::detect()),
            DevicePreference::Cpu => Ok(ComputeDevice::HostProcessor),
            DevicePreference::Cuda => match Self::detect() {
                ComputeDevice::Accelerator(ordinal) => Ok(ComputeDevice::Accelerator(ordinal)),
                ComputeDevice::HostProcessor => Err(SpectroFeatError::Device {
                    message: "CUDA was requested but no CUDA device is available".to_string(),
                }),
            },
        }
    }

    pub fn to_candle(self) -> Result<Device> {
        match self {
            ComputeDevice::HostProcessor => Ok(Device::Cpu),
            ComputeDevice::Accelerator(ordinal) => {
                Device::new_cuda(ordinal).map_err(|e| SpectroFeatError::Device {
                    message: format!("failed to open CUDA device {}: {}", ordinal, e),
                })
            }
        }
    }

    pub fn is_accelerator(&self) -> bool {
        matches!(self, ComputeDevice::Accelerator(_))
    }
}

impl fmt::Display for ComputeDevice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ComputeDevice::Accelerator(ordinal) => write!(f, "cuda:{}", ordinal),
            ComputeDevice::HostProcessor => write!(f, "cpu"),
        }
    }
}
