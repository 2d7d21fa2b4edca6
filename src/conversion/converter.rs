//! The conversion capability used by jobs.

use std::path::Path;

use async_trait::async_trait;
use batchjpg_core::config::ConversionConfig;
use batchjpg_core::{Error, Result};
use batchjpg_tools::{ToolConfig, ToolRegistry, CJPEG};

/// Turns one source image into a destination file.
///
/// Implementations either produce `destination` and return `Ok(())`, or fail
/// with an error and leave at most a partial destination behind.
#[async_trait]
pub trait Converter: Send + Sync {
    /// Short name used in log output.
    fn name(&self) -> &str;

    async fn convert(&self, source: &Path, destination: &Path) -> Result<()>;
}

/// Converter that shells out to `cjpeg` once per file.
#[derive(Debug, Clone)]
pub struct CjpegConverter {
    tool: ToolConfig,
    quality: u8,
}

impl CjpegConverter {
    pub fn new(tool: ToolConfig, quality: u8) -> Self {
        Self { tool, quality }
    }

    /// Resolve `cjpeg` from the registry.
    pub fn from_registry(registry: &ToolRegistry, conversion: &ConversionConfig) -> Result<Self> {
        let tool = registry.require(CJPEG)?.clone();
        Ok(Self::new(tool, conversion.quality))
    }

    pub fn quality(&self) -> u8 {
        self.quality
    }
}

#[async_trait]
impl Converter for CjpegConverter {
    fn name(&self) -> &str {
        &self.tool.name
    }

    async fn convert(&self, source: &Path, destination: &Path) -> Result<()> {
        batchjpg_tools::encode_jpeg(&self.tool, source, destination, self.quality)
            .await
            .map(|_| ())
            .map_err(|e| Error::conversion(source, e.to_string()))
    }
}
