//! Job initiation for an uploaded object

use crate::error::{ImportError, Result};
use crate::import::ports::JobInitiationService;
use pim_common::types::{JobId, ObjectKey};
use tracing::{info, instrument};

/// Asks the processing service to start exactly one job per call
pub struct JobInitiator<'a, J: ?Sized> {
    service: &'a J,
}

impl<'a, J: JobInitiationService + ?Sized> JobInitiator<'a, J> {
    pub fn new(service: &'a J) -> Self {
        Self { service }
    }

    #[instrument(skip(self))]
    pub async fn initiate(&self, bucket: &str, object_key: &ObjectKey) -> Result<JobId> {
        if bucket.trim().is_empty() {
            return Err(ImportError::initiation("no upload bucket configured"));
        }

        let job_id = self.service.initiate_job(bucket, object_key).await?;
        info!(job_id = %job_id, "Processing job created");
        Ok(job_id)
    }
}
