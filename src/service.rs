use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::Local;
use serde::Serialize;
use tracing::{info, warn};

use crate::classifier::{ClassifyError, MaterialClassifier};
use crate::error::Result;
use crate::logging::OperationTimer;
use crate::metrics::MetricsCollector;
use crate::models::{ClassificationRecord, NewClassification};
use crate::repository::RecordStore;
use crate::utils::timestamped_filename;
use crate::validation::{InputValidator, UploadRejection};

/// A file part received from the client
#[derive(Debug, Clone)]
pub struct UploadedFile {
    /// Filename as sent by the client, unsanitized
    pub filename: String,
    /// Raw file contents
    pub bytes: Vec<u8>,
}

/// How an upload ended, short of a storage fault
#[derive(Debug)]
pub enum UploadOutcome {
    /// Classified and recorded
    Classified(ClassificationRecord),
    /// Refused before anything was written
    Rejected(UploadRejection),
    /// Stored on disk but could not be classified; nothing recorded
    Failed {
        /// Where the file was written
        image_path: PathBuf,
        /// Classifier error
        error: ClassifyError,
    },
}

impl UploadOutcome {
    /// Short label for logs and metrics
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Classified(_) => "classified",
            Self::Rejected(_) => "rejected",
            Self::Failed { .. } => "failed",
        }
    }
}

/// Settings the pipeline needs from configuration
#[derive(Debug, Clone, Serialize)]
pub struct UploadPolicy {
    /// Directory images are written to
    pub directory: PathBuf,
    /// Lowercased allowed extensions
    pub allowed_extensions: Vec<String>,
    /// Request body cap in bytes
    pub max_bytes: u64,
}

/// Receives images, classifies them and records the results
pub struct UploadService {
    store: Arc<dyn RecordStore>,
    classifier: Arc<MaterialClassifier>,
    policy: UploadPolicy,
    metrics: MetricsCollector,
}

impl UploadService {
    /// Create the service, making sure the upload directory exists
    pub fn new(store: Arc<dyn RecordStore>, classifier: Arc<MaterialClassifier>, policy: UploadPolicy) -> Result<Self> {
        fs::create_dir_all(&policy.directory)?;
        Ok(Self {
            store,
            classifier,
            policy,
            metrics: MetricsCollector::default(),
        })
    }

    /// Upload settings in effect
    #[must_use]
    pub const fn policy(&self) -> &UploadPolicy {
        &self.policy
    }

    /// Shared classifier
    #[must_use]
    pub fn classifier(&self) -> &MaterialClassifier {
        &self.classifier
    }

    /// Validate, store, classify and record one upload.
    ///
    /// Validation happens before anything touches disk or the classifier. The
    /// image is written before classification and is left in place if
    /// classification fails. `Err` means a storage fault.
    pub fn handle_upload(&self, user_id: i64, upload: Option<UploadedFile>) -> Result<UploadOutcome> {
        let timer = OperationTimer::new("handle_upload");

        let outcome = self.process(user_id, upload);
        match &outcome {
            Ok(outcome) => self.metrics.record_upload(outcome.label()),
            Err(_) => {
                self.metrics.record_upload("error");
                self.metrics.record_error("storage", "handle_upload");
            }
        }

        timer.finish();
        outcome
    }

    fn process(&self, user_id: i64, upload: Option<UploadedFile>) -> Result<UploadOutcome> {
        let Some(upload) = upload else {
            return Ok(Self::reject(user_id, UploadRejection::MissingFile));
        };

        let extension =
            match InputValidator::validate_upload_filename(&upload.filename, &self.policy.allowed_extensions) {
                Ok(extension) => extension,
                Err(rejection) => return Ok(Self::reject(user_id, rejection)),
            };

        let image_path = self.store_image(&upload, &extension)?;

        let timer = OperationTimer::new("classify");
        let result = match self.classifier.classify(&upload.bytes) {
            Ok(result) => result,
            Err(error) => {
                warn!(user_id, path = %image_path.display(), %error, "Classification failed");
                self.metrics.record_error("classification", "classify");
                return Ok(UploadOutcome::Failed { image_path, error });
            }
        };
        self.metrics.record_classification(&result, timer.elapsed());
        timer.finish();

        let record = self.store.insert_classification(&NewClassification::from_result(
            user_id,
            image_path.to_string_lossy().into_owned(),
            &result,
        ))?;

        info!(
            user_id,
            record_id = record.id,
            category = %record.category,
            confidence = record.confidence,
            source = record.source.as_str(),
            "Recorded classification"
        );

        Ok(UploadOutcome::Classified(record))
    }

    fn reject(user_id: i64, rejection: UploadRejection) -> UploadOutcome {
        info!(user_id, reason = %rejection, "Upload rejected");
        UploadOutcome::Rejected(rejection)
    }

    fn store_image(&self, upload: &UploadedFile, extension: &str) -> Result<PathBuf> {
        let filename = timestamped_filename(
            &Local::now(),
            &InputValidator::storage_filename(&upload.filename, extension),
        );
        let path = Path::new(&self.policy.directory).join(filename);

        fs::write(&path, &upload.bytes)?;
        Ok(path)
    }
}
