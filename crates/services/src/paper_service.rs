use std::path::Path;
use std::sync::Arc;

use skilltwin_core::model::PaperAnalysis;

use crate::api::{PaperApi, PaperUpload};
use crate::context::AppContext;
use crate::error::PaperError;

/// Uploads question papers for topic and score analysis.
#[derive(Clone)]
pub struct PaperService {
    api: Arc<dyn PaperApi>,
    context: AppContext,
}

impl PaperService {
    #[must_use]
    pub fn new(api: Arc<dyn PaperApi>, context: AppContext) -> Self {
        Self { api, context }
    }

    /// Analyse a PDF on disk.
    ///
    /// # Errors
    ///
    /// Returns `PaperError::NotPdf` for other extensions, `PaperError::Read` or
    /// `PaperError::EmptyFile` for unusable files, and `PaperError::Api` if the
    /// upload fails. Nothing is sent for rejected files.
    pub async fn analyze_file(&self, path: &Path) -> Result<PaperAnalysis, PaperError> {
        let is_pdf = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"));
        if !is_pdf {
            return Err(PaperError::NotPdf(path.to_path_buf()));
        }

        let bytes = tokio::fs::read(path).await.map_err(|source| PaperError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        if bytes.is_empty() {
            return Err(PaperError::EmptyFile(path.to_path_buf()));
        }

        let file_name = path
            .file_name()
            .map_or_else(|| "paper.pdf".into(), |name| name.to_string_lossy().into_owned());
        tracing::info!(file = %file_name, size = bytes.len(), "uploading paper for analysis");

        let analysis = self
            .api
            .analyze_paper_file(PaperUpload {
                file_name,
                bytes,
                student: self.context.student_id(),
            })
            .await?;
        Ok(analysis)
    }

    /// Analyse pasted paper text.
    ///
    /// # Errors
    ///
    /// Returns `PaperError::EmptyText` for blank input or `PaperError::Api` if
    /// the request fails.
    pub async fn analyze_text(&self, text: &str) -> Result<PaperAnalysis, PaperError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(PaperError::EmptyText);
        }
        let student = self.context.student_id();
        Ok(self.api.analyze_paper_text(text, student.as_ref()).await?)
    }
}
