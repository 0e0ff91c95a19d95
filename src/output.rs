//! Output writing.
//!
//! Writes the rendered document to a file or stdout, honoring the
//! overwrite safeguards selected on the command line.

use std::fs;
use std::io::{self, Write};
use std::path::Path;
use vtt_transcript::VttError;

/// What to do when the output file already exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Overwrite {
    /// Fail with `VttError::OutputExists`.
    Refuse,
    /// Replace the file.
    Force,
    /// Leave the file alone and report success.
    Skip,
}

/// Write `contents` to `path`, or to stdout when `path` is `None`.
///
/// Returns `false` if an existing file was skipped.
pub fn write_output(path: Option<&Path>, contents: &str, overwrite: Overwrite) -> Result<bool, VttError> {
    let Some(path) = path else {
        io::stdout().write_all(contents.as_bytes())?;
        return Ok(true);
    };

    if path.exists() {
        match overwrite {
            Overwrite::Skip => {
                log::info!("Output {} exists, skipping", path.display());
                return Ok(false);
            }
            Overwrite::Refuse => {
                return Err(VttError::OutputExists {
                    path: path.to_path_buf(),
                });
            }
            Overwrite::Force => {}
        }
    }

    fs::write(path, contents).map_err(|source| VttError::WriteError {
        path: path.to_path_buf(),
        source,
    })?;
    log::debug!("Wrote {} byte(s) to {}", contents.len(), path.display());
    Ok(true)
}
