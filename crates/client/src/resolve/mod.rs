//! Transclusion: replacing content importers with the content they import.
//!
//! The resolver discovers every importer of a branch up front, requests all of
//! their exporting documents through the cache at once, and splices the
//! results in document order once they are in. Imported content is resolved
//! against its own location before it is spliced, so by the time it enters the
//! host tree it holds no unresolved importers of its own.

pub mod importer;
pub(crate) mod tree;

use ego_tree::NodeId;
use futures_util::FutureExt;
use futures_util::future::{LocalBoxFuture, try_join_all};
use scraper::Html;
use serde::Serialize;
use tokio::sync::oneshot;
use transclude_core::{AppConfig, Error, Reporter};
use url::Url;

pub use importer::{ImportFailure, ImportTarget, Importer, RELATION_TOKEN, discover, has_relation_token};

use crate::cache::DocumentCache;
use crate::fetch::FailureKind;
use importer::ImportReader;
use tree::Extract;

/// Default bound on how deeply imports may nest.
pub const DEFAULT_MAX_DEPTH: usize = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolveConfig {
    /// How many levels deep imports may nest; `None` for no bound.
    pub max_depth: Option<usize>,
}

impl Default for ResolveConfig {
    fn default() -> Self {
        Self { max_depth: Some(DEFAULT_MAX_DEPTH) }
    }
}

impl From<&AppConfig> for ResolveConfig {
    fn from(config: &AppConfig) -> Self {
        Self { max_depth: config.depth_limit() }
    }
}

/// Outcome counts of one resolution, nested imports included.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ResolveReport {
    /// Importers replaced by their content.
    pub imported: usize,
    /// Importers left in place with a failure marker.
    pub unresolved: usize,
}

impl ResolveReport {
    fn absorb(&mut self, nested: ResolveReport) {
        self.imported += nested.imported;
        self.unresolved += nested.unresolved;
    }
}

/// Content ready for splicing: resolved, and stripped of scripts.
struct Imported {
    extract: Extract,
    nested: ResolveReport,
}

/// Resolves the content importers of documents, one session at a time.
#[derive(Debug)]
pub struct Resolver {
    cache: DocumentCache,
    reporter: Reporter,
    config: ResolveConfig,
}

impl Resolver {
    pub fn new(cache: DocumentCache, reporter: Reporter, config: ResolveConfig) -> Self {
        Self { cache, reporter, config }
    }

    pub fn cache(&self) -> &DocumentCache {
        &self.cache
    }

    /// Resolves every importer in the `body` of a host document located at `location`.
    ///
    /// # Errors
    ///
    /// Returns `Error::NoContentRoot` if the document has no `body`, or an error
    /// from [`resolve_importers`](Self::resolve_importers).
    pub async fn resolve_document(&self, document: &mut Html, location: &Url) -> Result<ResolveReport, Error> {
        let body = tree::find_content_root(document).ok_or_else(|| Error::NoContentRoot(location.to_string()))?;
        self.resolve_importers(document, body, location).await
    }

    /// Resolves every importer below `branch`, which is not itself examined.
    ///
    /// Relative importer references resolve against `location`. A broken or
    /// unreachable importer is reported and marked, never fatal to the rest.
    ///
    /// # Errors
    ///
    /// Returns the cache's error if it refuses a location outright.
    pub async fn resolve_importers(
        &self,
        document: &mut Html,
        branch: NodeId,
        location: &Url,
    ) -> Result<ResolveReport, Error> {
        self.resolve_branch(document, branch, location, 0).await
    }

    fn resolve_branch<'a>(
        &'a self,
        document: &'a mut Html,
        branch: NodeId,
        location: &'a Url,
        depth: usize,
    ) -> LocalBoxFuture<'a, Result<ResolveReport, Error>> {
        async move {
            let importers = importer::discover(document, branch, location);
            let mut report = ResolveReport::default();
            if importers.is_empty() {
                return Ok(report);
            }
            tracing::debug!(location = %location, depth, count = importers.len(), "resolving content importers");

            let outcomes = try_join_all(importers.iter().map(|importer| self.import(importer, depth))).await?;

            for (importer, outcome) in importers.iter().zip(outcomes) {
                match outcome {
                    Ok(Imported { extract, nested }) => {
                        tree::splice_children_before(document, importer.node, &extract.document, extract.element);
                        tree::remove(document, importer.node);
                        report.imported += 1;
                        report.absorb(nested);
                    }
                    Err(failure) => {
                        self.report_failure(importer, &failure);
                        tree::insert_failure_marker(document, importer.node);
                        report.unresolved += 1;
                    }
                }
            }
            Ok(report)
        }
        .boxed_local()
    }

    async fn import(&self, importer: &Importer, depth: usize) -> Result<Result<Imported, ImportFailure>, Error> {
        if let Some(max_depth) = self.config.max_depth
            && depth >= max_depth
        {
            return Ok(Err(ImportFailure::DepthExceeded(max_depth)));
        }

        let (sender, receiver) = oneshot::channel();
        let reader = ImportReader::new(importer.target.clone(), sender);
        self.cache
            .request_document(importer.exporting_location.as_str(), Box::new(reader))
            .await?;

        let mut extract = match receiver.await {
            Ok(Ok(extract)) => extract,
            Ok(Err(failure)) => return Ok(Err(failure)),
            Err(_) => return Ok(Err(ImportFailure::Fetch(FailureKind::Aborted))),
        };

        let nested = self
            .resolve_branch(&mut extract.document, extract.element, &importer.exporting_location, depth + 1)
            .await?;

        let stripped = tree::strip_scripts(&mut extract.document, extract.element);
        if stripped > 0 {
            tracing::debug!(href = %importer.href, stripped, "removed scripts from imported content");
        }

        Ok(Ok(Imported { extract, nested }))
    }

    fn report_failure(&self, importer: &Importer, failure: &ImportFailure) {
        let href = &importer.href;
        match failure {
            ImportFailure::BrokenFragment(_) => {
                self.reporter
                    .malformed(&format!("Broken content importer at '#': No such id: {href}"));
            }
            ImportFailure::BrokenContainer => {
                self.reporter
                    .malformed(&format!("Broken content importer: No body element: {href}"));
            }
            ImportFailure::DepthExceeded(max_depth) => {
                self.reporter.malformed(&format!(
                    "Broken content importer: Imports nested more than {max_depth} deep: {href}"
                ));
            }
            ImportFailure::Fetch(kind) => {
                self.reporter.warn(&format!(
                    "Unable to import content from {}: document request {kind}",
                    importer.exporting_location
                ));
            }
        }
    }
}
