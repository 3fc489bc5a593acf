//! Text recognition for imported images, delegated to the `tesseract` CLI.

use std::path::{Path, PathBuf};
use std::process::Command;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum OcrError {
    #[error("failed to run {binary}: {source}")]
    Spawn {
        binary: String,
        #[source]
        source: std::io::Error,
    },
    #[error("OCR exited with {status}: {stderr}")]
    Failed { status: String, stderr: String },
}

pub trait TextRecognizer: Send + Sync {
    /// Recognized text of the image at `path`.
    fn recognize(&self, path: &Path) -> Result<String, OcrError>;
}

/// Runs `<binary> <image> stdout` and returns what it prints.
#[derive(Debug, Clone)]
pub struct TesseractOcr {
    binary: PathBuf,
}

impl TesseractOcr {
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
        }
    }
}

impl Default for TesseractOcr {
    fn default() -> Self {
        Self::new("tesseract")
    }
}

impl TextRecognizer for TesseractOcr {
    fn recognize(&self, path: &Path) -> Result<String, OcrError> {
        tracing::debug!(binary = %self.binary.display(), image = %path.display(), "running OCR");

        let output = Command::new(&self.binary)
            .arg(path)
            .arg("stdout")
            .output()
            .map_err(|source| OcrError::Spawn {
                binary: self.binary.display().to_string(),
                source,
            })?;

        if !output.status.success() {
            return Err(OcrError::Failed {
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_binary() {
        let ocr = TesseractOcr::new("/nonexistent/tesseract");
        assert!(matches!(
            ocr.recognize(Path::new("scan.png")),
            Err(OcrError::Spawn { .. })
        ));
    }

    #[cfg(unix)]
    #[test]
    fn test_passes_image_and_stdout_target() {
        // `echo` stands in for the engine and prints its arguments back
        let ocr = TesseractOcr::new("echo");
        assert_eq!(ocr.recognize(Path::new("scan.png")).unwrap(), "scan.png stdout");
    }

    #[cfg(unix)]
    #[test]
    fn test_non_zero_exit() {
        let ocr = TesseractOcr::new("false");
        assert!(matches!(
            ocr.recognize(Path::new("scan.png")),
            Err(OcrError::Failed { .. })
        ));
    }
}
