use futures::TryStreamExt;
use log::{debug, info};
use std::collections::HashSet;
use std::pin::pin;

use super::run::{sort_by_recency, PipelineRun, PipelineTarget};
use crate::error::{Result, ToolboxError};
use crate::providers::AzureDevOpsClient;

/// Drains every page of runs for `target` into one list, most recent first.
///
/// Nothing is returned unless every page was fetched: a failed page turns
/// into `ToolboxError::Enumeration` and the pages already read are
/// dropped. Fatal errors such as credential rejection (`ToolboxError::Auth`)
/// are passed through unwrapped.
pub async fn enumerate_runs(
    client: &AzureDevOpsClient,
    target: &PipelineTarget,
) -> Result<Vec<PipelineRun>> {
    let mut pages = pin!(client.list_runs(target));
    let mut runs = Vec::new();
    let mut page = 0;

    loop {
        page += 1;
        let batch = match pages.try_next().await {
            Ok(Some(batch)) => batch,
            Ok(None) => break,
            Err(err) if err.is_fatal() => return Err(err),
            Err(err) => {
                return Err(ToolboxError::Enumeration {
                    pipeline_type: target.pipeline_type,
                    page,
                    source: Box::new(err),
                })
            }
        };

        debug!("Page {page}: {} run(s)", batch.len());
        runs.extend(batch);
    }

    sort_by_recency(&mut runs);

    let fetched = runs.len();
    let mut seen = HashSet::with_capacity(fetched);
    runs.retain(|run| seen.insert(run.run_id));
    if runs.len() < fetched {
        debug!("Dropped {} duplicate run(s) across pages", fetched - runs.len());
    }

    info!(
        "Enumerated {} {} run(s) for pipeline {}",
        runs.len(),
        target.pipeline_type,
        target.pipeline_id
    );

    Ok(runs)
}
