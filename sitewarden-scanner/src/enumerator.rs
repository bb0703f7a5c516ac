use crate::client::SiteClient;
use crate::error::ScanError;
use crate::executor::{Settled, run_sequential};
use crate::node::{EnumerationResult, Node, NodeFailure};
use crate::query::QuerySpec;
use futures::future::{BoxFuture, FutureExt};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Extends the base query before each node request
pub type QueryBuildCallback = Arc<dyn Fn(&mut QuerySpec) + Send + Sync>;
/// Invoked with the failing URL and the error
pub type NodeErrorCallback = Arc<dyn Fn(&str, &ScanError) + Send + Sync>;

#[derive(Clone, Default)]
pub struct EnumerateOptions {
    /// Walk child webs depth first
    pub recursive: bool,
    pub on_query_build: Option<QueryBuildCallback>,
    pub on_node_error: Option<NodeErrorCallback>,
}

impl EnumerateOptions {
    pub fn recursive(recursive: bool) -> Self {
        Self {
            recursive,
            ..Self::default()
        }
    }

    pub fn with_query_build(mut self, callback: QueryBuildCallback) -> Self {
        self.on_query_build = Some(callback);
        self
    }

    pub fn with_node_error(mut self, callback: NodeErrorCallback) -> Self {
        self.on_node_error = Some(callback);
        self
    }

    fn build_query(&self) -> QuerySpec {
        let mut query = QuerySpec::for_web(self.recursive);
        if let Some(ref callback) = self.on_query_build {
            callback(&mut query);
        }
        query
    }
}

/// Resolves root URLs into flat, order-preserving node lists
pub struct Enumerator {
    client: SiteClient,
}

impl Enumerator {
    pub fn new(client: SiteClient) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &SiteClient {
        &self.client
    }

    /// Enumerate one root URL.
    ///
    /// Never fails as a whole: an unreachable node ends up in
    /// [`EnumerationResult::errors`] and only its own branch is abandoned.
    pub async fn enumerate(&self, root_url: &str, options: &EnumerateOptions) -> EnumerationResult {
        match self.walk(root_url.to_string(), options).await {
            Ok(result) => result,
            Err(failure) => EnumerationResult::failed(failure),
        }
    }

    /// Enumerate several roots one after another, results concatenated in
    /// input order. Duplicate URLs are queried (and reported) again.
    pub async fn enumerate_all(&self, urls: &[String], options: &EnumerateOptions) -> EnumerationResult {
        info!(
            "Enumerating {} root URL(s) (recursive: {})",
            urls.len(),
            options.recursive
        );

        let settled = run_sequential(urls.iter().cloned(), |url| Some(self.walk(url, options))).await;
        let result = merge(settled);

        info!(
            "Enumeration complete: {} node(s), {} failure(s)",
            result.nodes.len(),
            result.errors.len()
        );
        result
    }

    /// Query one node and, when recursive, its whole subtree. `Err` means
    /// the node itself could not be read.
    fn walk<'a>(
        &'a self,
        url: String,
        options: &'a EnumerateOptions,
    ) -> BoxFuture<'a, Result<EnumerationResult, NodeFailure>> {
        async move {
            let query = options.build_query();
            debug!("Visiting {}", url);

            let node = match self.fetch_node(&url, &query).await {
                Ok(node) => node,
                Err(e) => {
                    warn!("Failed to enumerate {}: {}", url, e);
                    if let Some(ref callback) = options.on_node_error {
                        callback(&url, &e);
                    }
                    return Err(NodeFailure::new(url, e));
                }
            };

            let children = if options.recursive {
                node.children.clone()
            } else {
                Vec::new()
            };

            let mut result = EnumerationResult::new();
            result.nodes.push(node);

            if !children.is_empty() {
                debug!("{} has {} child web(s)", url, children.len());
                let settled = run_sequential(children, |child| Some(self.walk(child, options))).await;
                result.extend(merge(settled));
            }

            Ok(result)
        }
        .boxed()
    }

    async fn fetch_node(&self, url: &str, query: &QuerySpec) -> Result<Node, ScanError> {
        let payload = self.client.get_web(url, query).await?;
        Node::from_payload(url, payload)
    }
}

fn merge(settled: Vec<Settled<EnumerationResult, NodeFailure>>) -> EnumerationResult {
    let mut merged = EnumerationResult::new();
    for outcome in settled {
        match outcome {
            Settled::Completed(result) => merged.extend(result),
            Settled::Failed(failure) => merged.errors.push(failure),
            Settled::Skipped => {}
        }
    }
    merged
}
