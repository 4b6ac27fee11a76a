//! Writing rendered documents to disk.
//!
//! Targets ending in `.pdf` are converted with `wkhtmltopdf` when it is on the
//! `PATH`. Without it, or when conversion fails, the HTML is written next to
//! the requested path with an `.html` extension so it can be printed from a
//! browser.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use serde::Serialize;
use tokio::process::Command;
use tracing::{error, info, warn};

use crate::error::InvoiceError;
use crate::formatter::Document;

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "format", content = "path", rename_all = "snake_case")]
pub enum WrittenDocument {
    Pdf(PathBuf),
    Html(PathBuf),
}

impl WrittenDocument {
    pub fn path(&self) -> &Path {
        match self {
            Self::Pdf(path) | Self::Html(path) => path,
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct DocumentWriter {
    wkhtmltopdf_path: Option<PathBuf>,
}

impl DocumentWriter {
    /// Looks up `wkhtmltopdf` on the `PATH`.
    pub fn detect() -> Self {
        let wkhtmltopdf_path = which::which("wkhtmltopdf").ok();
        match &wkhtmltopdf_path {
            Some(path) => info!(path = %path.display(), "wkhtmltopdf found"),
            None => warn!("wkhtmltopdf not found in PATH - PDF targets will be written as HTML"),
        }
        Self { wkhtmltopdf_path }
    }

    pub fn html_only() -> Self {
        Self { wkhtmltopdf_path: None }
    }

    pub fn can_convert(&self) -> bool {
        self.wkhtmltopdf_path.is_some()
    }

    pub async fn write(
        &self,
        document: &Document,
        path: &Path,
    ) -> Result<WrittenDocument, InvoiceError> {
        if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }

        if !is_pdf_target(path) {
            tokio::fs::write(path, &document.html).await?;
            info!(event_name = "invoice.written", path = %path.display(), format = "html");
            return Ok(WrittenDocument::Html(path.to_path_buf()));
        }

        if let Some(wkhtmltopdf) = &self.wkhtmltopdf_path {
            match convert_html_to_pdf(&document.html, wkhtmltopdf, path).await {
                Ok(()) => {
                    info!(event_name = "invoice.written", path = %path.display(), format = "pdf");
                    return Ok(WrittenDocument::Pdf(path.to_path_buf()));
                }
                Err(error) => {
                    warn!(error = %error, "PDF conversion failed, falling back to HTML");
                }
            }
        }

        let html_path = path.with_extension("html");
        tokio::fs::write(&html_path, &document.html).await?;
        info!(event_name = "invoice.written", path = %html_path.display(), format = "html");
        Ok(WrittenDocument::Html(html_path))
    }
}

fn is_pdf_target(path: &Path) -> bool {
    path.extension().and_then(|ext| ext.to_str()).is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"))
}

async fn convert_html_to_pdf(
    html: &str,
    wkhtmltopdf_path: &Path,
    pdf_path: &Path,
) -> Result<(), InvoiceError> {
    let html_path = std::env::temp_dir().join(format!("aquabill_{}.html", uuid::Uuid::new_v4()));
    tokio::fs::write(&html_path, html).await?;

    let output = Command::new(wkhtmltopdf_path)
        .arg("--page-size")
        .arg("A4")
        .arg("--margin-top")
        .arg("10mm")
        .arg("--margin-bottom")
        .arg("10mm")
        .arg("--margin-left")
        .arg("10mm")
        .arg("--margin-right")
        .arg("10mm")
        .arg("--encoding")
        .arg("utf-8")
        .arg("--quiet")
        .arg(&html_path)
        .arg(pdf_path)
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .await;

    let _ = tokio::fs::remove_file(&html_path).await;
    let output = output?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        error!(stderr = %stderr, "wkhtmltopdf failed");
        return Err(InvoiceError::Conversion(stderr.to_string()));
    }
    Ok(())
}
