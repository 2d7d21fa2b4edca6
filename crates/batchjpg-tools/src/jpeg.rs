//! JPEG encoding via `cjpeg`.

use std::ffi::OsString;
use std::path::Path;

use crate::command::{ToolCommand, ToolOutput};
use crate::tools::ToolConfig;

/// Build the `cjpeg` argument list for one conversion.
///
/// Paths are kept as raw OS strings; a lossy conversion would hand the
/// encoder a name that does not exist.
pub fn cjpeg_args(quality: u8, input: &Path, output: &Path) -> Vec<OsString> {
    vec![
        OsString::from("-quality"),
        OsString::from(quality.to_string()),
        OsString::from("-outfile"),
        output.as_os_str().to_os_string(),
        input.as_os_str().to_os_string(),
    ]
}

/// Encode `input` to a JPEG at `output`.
///
/// The encoder either writes `output` and exits successfully or fails with a
/// [`batchjpg_core::Error::Tool`]; a failed run may leave a partial file at
/// `output`.
pub async fn encode_jpeg(
    tool: &ToolConfig,
    input: &Path,
    output: &Path,
    quality: u8,
) -> batchjpg_core::Result<ToolOutput> {
    let args = cjpeg_args(quality, input, output);
    tracing::trace!(tool = %tool.path.display(), ?args, "Running encoder");

    let mut cmd = ToolCommand::new(tool.path.clone());
    cmd.args(args);
    cmd.execute().await
}
