use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// Runtime configuration, loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Path to the SQLite credential store.
    pub db_path: PathBuf,
    /// Instant-answer endpoint used when no keyword rule matches.
    pub answer_endpoint: String,
    /// Directory containing ONNX model files.
    pub model_dir: PathBuf,
    /// V4L2 device path (default: /dev/video0).
    pub camera_device: String,
    /// OCR executable for imported images.
    pub tesseract: PathBuf,
    /// Capture loop tick.
    pub capture_tick: Duration,
    /// Frame rate written into recordings.
    pub record_fps: f32,
    /// Buffers discarded after the camera starts streaming (AGC/AE settling).
    pub warmup_frames: usize,
}

impl Config {
    /// Load configuration from `BESO_*` environment variables with defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(var: impl Fn(&str) -> Option<String>) -> Self {
        let data_dir = var("XDG_DATA_HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|| {
                let home = var("HOME").unwrap_or_else(|| "/tmp".to_string());
                PathBuf::from(home).join(".local/share")
            })
            .join("beso");

        Self {
            db_path: var("BESO_DB_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|| data_dir.join("users.db")),
            answer_endpoint: var("BESO_ANSWER_ENDPOINT")
                .unwrap_or_else(|| beso_chat::answer::DEFAULT_ENDPOINT.to_string()),
            model_dir: var("BESO_MODEL_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| data_dir.join("models")),
            camera_device: var("BESO_CAMERA_DEVICE").unwrap_or_else(|| "/dev/video0".to_string()),
            tesseract: var("BESO_TESSERACT")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("tesseract")),
            capture_tick: Duration::from_millis(env_parsed(&var, "BESO_CAPTURE_TICK_MS").unwrap_or(10)),
            record_fps: env_parsed(&var, "BESO_RECORD_FPS")
                .filter(|fps: &f32| *fps > 0.0)
                .unwrap_or(beso_vision::recorder::DEFAULT_RECORD_FPS),
            warmup_frames: env_parsed(&var, "BESO_WARMUP_FRAMES").unwrap_or(2),
        }
    }

    /// Path to the SCRFD detection model.
    pub fn detection_model_path(&self) -> PathBuf {
        self.model_dir.join(beso_vision::DETECTION_MODEL_FILE)
    }
}

fn env_parsed<T: FromStr>(var: &impl Fn(&str) -> Option<String>, key: &str) -> Option<T> {
    var(key).and_then(|v| v.parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> Config {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let cfg = config(&[("HOME", "/home/ana")]);
        assert_eq!(cfg.db_path, PathBuf::from("/home/ana/.local/share/beso/users.db"));
        assert_eq!(cfg.model_dir, PathBuf::from("/home/ana/.local/share/beso/models"));
        assert_eq!(cfg.camera_device, "/dev/video0");
        assert_eq!(cfg.answer_endpoint, "https://api.duckduckgo.com/");
        assert_eq!(cfg.tesseract, PathBuf::from("tesseract"));
        assert_eq!(cfg.capture_tick, Duration::from_millis(10));
        assert_eq!(cfg.record_fps, 20.0);
        assert_eq!(cfg.warmup_frames, 2);
        assert_eq!(
            cfg.detection_model_path(),
            PathBuf::from("/home/ana/.local/share/beso/models/det_10g.onnx")
        );
    }

    #[test]
    fn test_overrides() {
        let cfg = config(&[
            ("XDG_DATA_HOME", "/data"),
            ("BESO_DB_PATH", "/srv/beso.db"),
            ("BESO_CAMERA_DEVICE", "/dev/video2"),
            ("BESO_CAPTURE_TICK_MS", "33"),
            ("BESO_RECORD_FPS", "30"),
            ("BESO_WARMUP_FRAMES", "0"),
        ]);
        assert_eq!(cfg.db_path, PathBuf::from("/srv/beso.db"));
        assert_eq!(cfg.model_dir, PathBuf::from("/data/beso/models"));
        assert_eq!(cfg.camera_device, "/dev/video2");
        assert_eq!(cfg.capture_tick, Duration::from_millis(33));
        assert_eq!(cfg.record_fps, 30.0);
        assert_eq!(cfg.warmup_frames, 0);
    }

    #[test]
    fn test_unparseable_numbers_fall_back() {
        let cfg = config(&[("BESO_CAPTURE_TICK_MS", "soon"), ("BESO_RECORD_FPS", "-5")]);
        assert_eq!(cfg.capture_tick, Duration::from_millis(10));
        assert_eq!(cfg.record_fps, 20.0);
    }
}
