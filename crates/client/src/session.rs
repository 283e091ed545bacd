//! One-shot transclusion sessions.
//!
//! A session owns a fresh cache and resolver for a single host document and
//! discards them when the document is resolved.

use scraper::Html;
use transclude_core::{AppConfig, DiagnosticSink, Error, Reporter};
use url::Url;

use crate::cache::DocumentCache;
use crate::fetch::{DocumentFetcher, FetchConfig, HttpFetcher};
use crate::location;
use crate::resolve::{ResolveConfig, ResolveReport, Resolver};

/// A host document with its importers resolved.
#[derive(Debug, Clone)]
pub struct Transcluded {
    /// Location of the host document, without fragment.
    pub location: Url,
    /// Serialized markup of the resolved document.
    pub html: String,
    pub report: ResolveReport,
}

/// Whether the requester of `location` is taken to be the author of its content.
///
/// The configured override wins; otherwise documents read from the local
/// filesystem are taken to be under the requester's authorship.
pub fn author_mode(config: &AppConfig, location: &Url) -> bool {
    config.author_mode.unwrap_or_else(|| location::is_local(location))
}

/// Fetches the document at `location` and resolves its importers.
///
/// # Errors
///
/// Returns `Error::InvalidUrl` if `location` is not an absolute URI,
/// `Error::FetchFailed` if the host document cannot be retrieved, or any
/// error from [`transclude_document`].
pub async fn transclude_location(
    config: &AppConfig,
    location: &str,
    sink: Box<dyn DiagnosticSink>,
) -> Result<Transcluded, Error> {
    let location = parse_location(location)?;
    let fetcher = HttpFetcher::new(FetchConfig::from(config))?;

    let host = fetcher
        .fetch(&location)
        .await
        .map_err(|failure| Error::FetchFailed(format!("{location}: {failure}")))?;

    transclude_document(config, host, location, fetcher, sink).await
}

/// Resolves the importers of caller-supplied markup, taken to be located at `base`.
///
/// # Errors
///
/// Returns `Error::InvalidInput` for empty markup, `Error::InvalidUrl` if
/// `base` is not an absolute URI, or any error from [`transclude_document`].
pub async fn transclude_html(
    config: &AppConfig,
    html: &str,
    base: &str,
    sink: Box<dyn DiagnosticSink>,
) -> Result<Transcluded, Error> {
    if html.trim().is_empty() {
        return Err(Error::InvalidInput("html must not be empty".into()));
    }

    let location = parse_location(base)?;
    let fetcher = HttpFetcher::new(FetchConfig::from(config))?;

    transclude_document(config, Html::parse_document(html), location, fetcher, sink).await
}

/// Resolves the importers of a parsed host document, fetching through `fetcher`.
///
/// # Errors
///
/// Returns `Error::NoContentRoot` if the document has no `body`, or
/// `Error::AbnormalLocation` if constraint enforcement is on and an importer
/// names a location not in normal form.
pub async fn transclude_document(
    config: &AppConfig,
    mut host: Html,
    location: Url,
    fetcher: impl DocumentFetcher + 'static,
    sink: Box<dyn DiagnosticSink>,
) -> Result<Transcluded, Error> {
    let location = location::defragmented(&location);
    let author_mode = author_mode(config, &location);
    let enforce = config.enforce_constraints.unwrap_or(author_mode);

    let cache = DocumentCache::new(fetcher)
        .with_host_document(&location, host.clone())
        .enforce_constraints(enforce);
    let resolver = Resolver::new(cache, Reporter::new(sink, author_mode), ResolveConfig::from(config));

    let report = resolver.resolve_document(&mut host, &location).await?;
    tracing::info!(
        location = %location,
        imported = report.imported,
        unresolved = report.unresolved,
        fetched = resolver.cache().len().saturating_sub(1),
        "transclusion complete"
    );

    Ok(Transcluded { location, html: host.html(), report })
}

fn parse_location(location: &str) -> Result<Url, Error> {
    location::normalize(location, None).map_err(|e| Error::InvalidUrl(e.to_string()))
}
