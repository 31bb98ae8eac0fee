//! Pipeline run API endpoints

use async_trait::async_trait;
use vigil_core::domain::pipeline::PipelineRunSnapshot;

use crate::DashboardClient;
use crate::error::Result;

/// Source of the initial snapshot of a pipeline run
#[async_trait]
pub trait SnapshotProvider: Send + Sync {
    /// Fetch the current snapshot of a pipeline run
    async fn fetch_snapshot(&self, pipeline_run_id: &str) -> Result<PipelineRunSnapshot>;
}

impl DashboardClient {
    // =============================================================================
    // Pipeline Runs
    // =============================================================================

    /// Get the status snapshot of a pipeline run
    ///
    /// # Arguments
    /// * `pipeline_run_id` - The pipeline run identifier
    ///
    /// # Returns
    /// The run as currently stored by the backend
    ///
    /// # Example
    /// ```no_run
    /// # use vigil_client::DashboardClient;
    /// # async fn example() -> anyhow::Result<()> {
    /// let client = DashboardClient::new("http://localhost:8080/api");
    /// let snapshot = client.get_pipeline_run_snapshot("run-1").await?;
    /// println!("created at {}", snapshot.created_at);
    /// # Ok(())
    /// # }
    /// ```
    pub async fn get_pipeline_run_snapshot(
        &self,
        pipeline_run_id: &str,
    ) -> Result<PipelineRunSnapshot> {
        let url = format!(
            "{}/v1/gitlab/pipeline-status/{}",
            self.base_url, pipeline_run_id
        );
        let response = self.authorize(self.client.get(&url)).send().await?;

        self.handle_response(response, pipeline_run_id).await
    }
}

#[async_trait]
impl SnapshotProvider for DashboardClient {
    async fn fetch_snapshot(&self, pipeline_run_id: &str) -> Result<PipelineRunSnapshot> {
        self.get_pipeline_run_snapshot(pipeline_run_id).await
    }
}
