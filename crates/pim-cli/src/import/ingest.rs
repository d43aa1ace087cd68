//! Result ingestion: fetch the artifact of a finished job and normalize it

use crate::api::types::ResultArtifactPayload;
use crate::error::{ImportError, Result};
use crate::import::ports::ResultSource;
use pim_common::types::{ProductRow, ResultArtifact};
use tracing::{info, instrument};

/// Parse a raw result artifact into a [`ResultArtifact`].
///
/// Product values that are `null` are treated as absent. Any other value that
/// is not text, a number, or a list of text is rejected, as is an attribute
/// that is not among the accepted headers.
pub fn parse_artifact(bytes: &[u8]) -> Result<ResultArtifact> {
    let payload: ResultArtifactPayload = serde_json::from_slice(bytes)
        .map_err(|e| ImportError::result_parse(format!("invalid JSON: {}", e)))?;

    let accepted_headers = payload
        .headers
        .or(payload.valid_headers)
        .unwrap_or_default();

    let accepted_rows = payload
        .products
        .iter()
        .enumerate()
        .map(|(index, product)| {
            ProductRow::from_json_object(product, &accepted_headers)
                .map_err(|e| ImportError::result_parse(format!("product {}: {}", index + 1, e)))
        })
        .collect::<Result<Vec<_>>>()?;

    let mut ignored_headers: Vec<String> = Vec::with_capacity(payload.ignored_headers.len());
    for header in payload.ignored_headers {
        if !ignored_headers.contains(&header) {
            ignored_headers.push(header);
        }
    }

    Ok(ResultArtifact {
        file_name: payload.file_name.unwrap_or_default(),
        original_headers: payload.original_headers,
        accepted_headers,
        ignored_headers,
        accepted_rows,
        validation_errors: payload.validation_errors,
        message: payload.message,
        total_rows_in_preview: payload.total_rows_in_preview,
    })
}

/// Downloads and parses the artifact of a successful job
pub struct ResultIngester<'a, R: ?Sized> {
    source: &'a R,
}

impl<'a, R: ResultSource + ?Sized> ResultIngester<'a, R> {
    pub fn new(source: &'a R) -> Self {
        Self { source }
    }

    #[instrument(skip_all)]
    pub async fn ingest(&self, result_url: Option<&str>) -> Result<ResultArtifact> {
        let url = result_url
            .filter(|url| !url.trim().is_empty())
            .ok_or_else(|| ImportError::result_fetch("job completed but no result download URL was provided"))?;

        let bytes = self.source.fetch_result(url).await?;
        let artifact = parse_artifact(&bytes)?;

        info!(
            accepted_rows = artifact.accepted_count(),
            issues = artifact.issue_count(),
            "Result ingested"
        );
        Ok(artifact)
    }
}
