use crate::error::ReportError;
use crate::script::{ReportForm, ReportRow, ReportScript};
use indicatif::{ProgressBar, ProgressStyle};
use serde::{Deserialize, Serialize};
use sitewarden_scanner::{
    EnumerateOptions, Enumerator, NodeFailure, QuerySpec, Settled, SiteClient, Tally,
    run_sequential,
};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Callback for reporting execution progress
pub type ReportProgressCallback = Arc<dyn Fn(String) + Send + Sync>;

/// Rows and failures of one report run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReportOutcome {
    pub rows: Vec<ReportRow>,
    /// URLs that could not be enumerated or collected
    pub errors: Vec<NodeFailure>,
    pub nodes_visited: usize,
}

/// Run `script` over every URL of `form`.
///
/// Only an invalid form is an error. Unreachable webs and failed per-node
/// queries are returned in [`ReportOutcome::errors`] while the remaining
/// webs are still processed.
pub async fn execute_report(
    client: &SiteClient,
    script: Arc<dyn ReportScript>,
    form: &ReportForm,
    progress_callback: Option<ReportProgressCallback>,
    show_spinner: bool,
) -> Result<ReportOutcome, ReportError> {
    script.validate(form)?;

    let spinner = if show_spinner {
        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.cyan} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        pb.enable_steady_tick(Duration::from_millis(100));
        pb.set_message(format!("Enumerating {} site(s)...", form.urls.len()));
        Some(pb)
    } else {
        None
    };

    let report = |msg: String| {
        if let Some(ref pb) = spinner {
            pb.set_message(msg.clone());
        }
        if let Some(ref callback) = progress_callback {
            callback(msg);
        }
    };

    info!(
        "Running report '{}' over {} URL(s)",
        script.name(),
        form.urls.len()
    );

    let params = form.params.clone();
    let query_script = script.clone();
    let query_params = params.clone();
    let options = EnumerateOptions::recursive(params.recursive).with_query_build(Arc::new(
        move |query: &mut QuerySpec| query_script.customize_query(query, &query_params),
    ));

    let enumerator = Enumerator::new(client.clone());
    let enumeration = enumerator.enumerate_all(&form.urls, &options).await;
    report(format!(
        "Enumerated {} web(s), {} unreachable",
        enumeration.nodes.len(),
        enumeration.errors.len()
    ));

    let total = enumeration.nodes.len();
    let mut position = 0;
    let settled = run_sequential(enumeration.nodes.iter(), |node| {
        position += 1;
        if !script.applies_to(node, &params) {
            return None;
        }
        report(format!("[{}/{}] {}", position, total, node.url));
        let script = script.clone();
        let params = &params;
        Some(async move { script.collect(client, node, params).await })
    })
    .await;

    let tally = Tally::of(&settled);
    debug!(
        "{} node(s) collected, {} failed, {} not applicable",
        tally.completed, tally.failed, tally.skipped
    );

    let mut outcome = ReportOutcome {
        rows: Vec::new(),
        errors: enumeration.errors.clone(),
        nodes_visited: total,
    };

    for (node, result) in enumeration.nodes.iter().zip(settled) {
        match result {
            Settled::Completed(rows) => outcome.rows.extend(rows),
            Settled::Failed(e) => {
                warn!("Report '{}' failed on {}: {}", script.name(), node.url, e);
                outcome.errors.push(NodeFailure::new(node.url.clone(), e));
            }
            Settled::Skipped => {}
        }
    }

    let summary = format!(
        "Report '{}' complete: {} row(s), {} failure(s)",
        script.name(),
        outcome.rows.len(),
        outcome.errors.len()
    );
    info!("{}", summary);
    if let Some(pb) = spinner {
        pb.finish_and_clear();
    }
    if let Some(ref callback) = progress_callback {
        callback(summary);
    }

    Ok(outcome)
}
