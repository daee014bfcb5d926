use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::application::ports::ModelCatalogPort;
use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::model::{ModelFormat, ModelId, ResolvedModel};

/// Finds bundled model files on disk.
pub struct OnnxModelCatalog;

impl OnnxModelCatalog {
    pub fn new() -> Self { Self }
}

/// Candidate files for `model`, precompiled first.
fn candidates(model: &ModelId) -> Vec<(PathBuf, ModelFormat)> {
    let explicit = Path::new(&model.name);
    match explicit.extension().and_then(|e| e.to_str()) {
        Some("ort") => return vec![(explicit.to_path_buf(), ModelFormat::Compiled)],
        Some("onnx") => return vec![(explicit.to_path_buf(), ModelFormat::Source)],
        _ => {}
    }
    vec![
        (model.dir.join(format!("{}.ort", model.name)), ModelFormat::Compiled),
        (model.dir.join(format!("{}.onnx", model.name)), ModelFormat::Source),
    ]
}

fn labels_for(model_path: &Path) -> Option<PathBuf> {
    ["names", "txt"]
        .iter()
        .map(|ext| model_path.with_extension(ext))
        .find(|p| p.is_file())
}

#[async_trait]
impl ModelCatalogPort for OnnxModelCatalog {
    async fn resolve(&self, model: &ModelId) -> DomainResult<ResolvedModel> {
        if model.name.trim().is_empty() {
            return Err(DomainError::InvalidInput("model name empty".into()));
        }
        for (path, format) in candidates(model) {
            if path.is_file() {
                info!("Model {} resolved to {} ({:?})", model.name, path.display(), format);
                let labels_path = labels_for(&path);
                return Ok(ResolvedModel { path, format, labels_path });
            }
            debug!("Model candidate missing: {}", path.display());
        }
        Err(DomainError::NotFound(format!(
            "no .ort or .onnx file for model '{}' in {}",
            model.name,
            model.dir.display()
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn id(dir: &Path, name: &str) -> ModelId {
        ModelId { name: name.into(), dir: dir.to_path_buf() }
    }

    #[tokio::test]
    async fn prefers_compiled_model() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("yolo11n.onnx"), b"src").unwrap();
        fs::write(dir.path().join("yolo11n.ort"), b"bin").unwrap();

        let resolved = OnnxModelCatalog::new().resolve(&id(dir.path(), "yolo11n")).await.unwrap();
        assert_eq!(resolved.format, ModelFormat::Compiled);
        assert_eq!(resolved.path, dir.path().join("yolo11n.ort"));
        assert!(resolved.labels_path.is_none());
    }

    #[tokio::test]
    async fn falls_back_to_source_model_with_labels() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("yolo11n.onnx"), b"src").unwrap();
        fs::write(dir.path().join("yolo11n.names"), b"cat\ndog\n").unwrap();

        let resolved = OnnxModelCatalog::new().resolve(&id(dir.path(), "yolo11n")).await.unwrap();
        assert_eq!(resolved.format, ModelFormat::Source);
        assert_eq!(resolved.labels_path, Some(dir.path().join("yolo11n.names")));
    }

    #[tokio::test]
    async fn explicit_path_is_used_as_is() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("custom.onnx");
        fs::write(&path, b"src").unwrap();

        let model = id(Path::new("ignored"), path.to_str().unwrap());
        let resolved = OnnxModelCatalog::new().resolve(&model).await.unwrap();
        assert_eq!(resolved.path, path);
        assert_eq!(resolved.format, ModelFormat::Source);
    }

    #[tokio::test]
    async fn missing_model_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let err = OnnxModelCatalog::new().resolve(&id(dir.path(), "nope")).await.unwrap_err();
        assert!(matches!(err, DomainError::NotFound(_)));

        let err = OnnxModelCatalog::new().resolve(&id(dir.path(), " ")).await.unwrap_err();
        assert!(matches!(err, DomainError::InvalidInput(_)));
    }
}
