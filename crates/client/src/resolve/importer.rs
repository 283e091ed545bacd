//! Content importers: discovery, and the reader that extracts their content.
//!
//! A content importer is an HTML `a` element whose `rel` attribute carries the
//! `content-repository` token. Its `href` names the exporting document, and
//! optionally, by fragment, the element within it whose content is imported.

use std::rc::Rc;

use ego_tree::{NodeId, NodeRef};
use scraper::{Html, Node};
use tokio::sync::oneshot;
use url::Url;

use super::tree::{self, Extract};
use crate::cache::{CacheEntry, DocumentReader};
use crate::fetch::FailureKind;
use crate::location;

/// The link type marking an `a` element as a content importer.
pub const RELATION_TOKEN: &str = "content-repository";

/// Whether a `rel` attribute value carries the importer token.
pub fn has_relation_token(rel: &str) -> bool {
    rel.split_ascii_whitespace()
        .any(|token| token.eq_ignore_ascii_case(RELATION_TOKEN))
}

/// Why an importer could not be replaced by its content.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ImportFailure {
    #[error("no element with id '{0}'")]
    BrokenFragment(String),

    #[error("no body element")]
    BrokenContainer,

    #[error("document request {0}")]
    Fetch(FailureKind),

    #[error("imports nested more than {0} deep")]
    DepthExceeded(usize),
}

/// Which part of the exporting document an importer takes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImportTarget {
    /// The content of the element with this identifier.
    Fragment(String),
    /// The content of the `body` element.
    WholeBody,
}

impl ImportTarget {
    /// Deep-copies the targeted element out of the exporting document.
    pub(crate) fn extract(&self, document: &Html) -> Result<Extract, ImportFailure> {
        let element = match self {
            ImportTarget::Fragment(id) => {
                tree::find_by_id(document, id).ok_or_else(|| ImportFailure::BrokenFragment(id.clone()))?
            }
            ImportTarget::WholeBody => tree::find_content_root(document).ok_or(ImportFailure::BrokenContainer)?,
        };
        tree::extract(document, element).ok_or(ImportFailure::BrokenContainer)
    }
}

/// A content importer found in a document.
#[derive(Debug, Clone)]
pub struct Importer {
    /// The importer element in its host document.
    pub node: NodeId,
    /// The `href` as written.
    pub href: String,
    /// Canonical location of the exporting document, without fragment.
    pub exporting_location: Url,
    pub target: ImportTarget,
}

impl Importer {
    fn recognize(node: NodeRef<'_, Node>, base: &Url) -> Option<Self> {
        let element = node.value().as_element()?;
        if element.name() != "a" {
            return None;
        }
        if !element.attr("rel").is_some_and(has_relation_token) {
            return None;
        }
        if !tree::is_html_element(node.value(), "a") {
            return None;
        }

        let href = element.attr("href").filter(|href| !href.trim().is_empty())?;
        let link = match location::normalize(href, Some(base)) {
            Ok(link) => link,
            Err(e) => {
                tracing::debug!(href, "ignoring content importer with malformed href: {}", e);
                return None;
            }
        };

        let (exporting_location, fragment) = location::split_fragment(link);
        let target = fragment.map_or(ImportTarget::WholeBody, ImportTarget::Fragment);

        Some(Self { node: node.id(), href: href.to_string(), exporting_location, target })
    }
}

/// Finds the content importers below `branch`, in document order.
///
/// `branch` itself is not considered. Relative references resolve against `base`,
/// the location of the document the branch came from.
pub fn discover(document: &Html, branch: NodeId, base: &Url) -> Vec<Importer> {
    let Some(branch) = document.tree.get(branch) else {
        return Vec::new();
    };

    branch
        .descendants()
        .skip(1)
        .filter_map(|node| Importer::recognize(node, base))
        .collect()
}

pub(crate) type ImportResult = Result<Extract, ImportFailure>;

/// Single-use reader that extracts an importer's content from the exporting document.
///
/// The outcome is sent to the waiting resolver when the reader is closed.
pub(crate) struct ImportReader {
    target: ImportTarget,
    extracted: Option<ImportResult>,
    sender: oneshot::Sender<ImportResult>,
}

impl ImportReader {
    pub(crate) fn new(target: ImportTarget, sender: oneshot::Sender<ImportResult>) -> Self {
        Self { target, extracted: None, sender }
    }
}

impl DocumentReader for ImportReader {
    fn read(&mut self, _entry: &CacheEntry, document: &Rc<Html>) {
        self.extracted = Some(self.target.extract(document));
    }

    fn close(self: Box<Self>, entry: &CacheEntry) {
        let reader = *self;
        let outcome = reader.extracted.unwrap_or_else(|| {
            let kind = entry.failure().map_or(FailureKind::Aborted, |failure| failure.kind);
            Err(ImportFailure::Fetch(kind))
        });

        if reader.sender.send(outcome).is_err() {
            tracing::debug!(location = %entry.location(), "import abandoned before its document arrived");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HOST: &str = "https://example.com/lex/host.html";

    fn discover_all(markup: &str) -> Vec<Importer> {
        let document = Html::parse_document(markup);
        let body = tree::find_content_root(&document).unwrap();
        discover(&document, body, &Url::parse(HOST).unwrap())
    }

    #[test]
    fn test_has_relation_token() {
        assert!(has_relation_token("content-repository"));
        assert!(has_relation_token("nofollow  content-repository\tnoopener"));
        assert!(has_relation_token("Content-Repository"));
        assert!(!has_relation_token("content-repository-x"));
        assert!(!has_relation_token("x-content-repository"));
        assert!(!has_relation_token(""));
    }

    #[test]
    fn test_discover_fragment_and_whole_body() {
        let importers = discover_all(
            r#"<body>
                <a rel="content-repository" href="d.html#sec1">one</a>
                <a rel="content-repository" href="../other/d2.html">two</a>
                <a rel="content-repository" href="d.html#">three</a>
            </body>"#,
        );

        assert_eq!(importers.len(), 3);
        assert_eq!(importers[0].exporting_location.as_str(), "https://example.com/lex/d.html");
        assert_eq!(importers[0].target, ImportTarget::Fragment("sec1".into()));
        assert_eq!(importers[1].exporting_location.as_str(), "https://example.com/other/d2.html");
        assert_eq!(importers[1].target, ImportTarget::WholeBody);
        assert_eq!(importers[2].target, ImportTarget::WholeBody);
        assert_eq!(importers[0].href, "d.html#sec1");
    }

    #[test]
    fn test_discover_ignores_non_importers() {
        let importers = discover_all(
            r#"<body>
                <a href="d.html">plain link</a>
                <a rel="content-repository">no href</a>
                <a rel="content-repository" href="">empty href</a>
                <a rel="content-repository" href="http://[::1">malformed</a>
                <span rel="content-repository" href="d.html">not an anchor</span>
                <svg><a rel="content-repository" href="d.html">svg anchor</a></svg>
            </body>"#,
        );

        assert!(importers.is_empty());
    }

    #[test]
    fn test_discover_skips_branch_element() {
        let document = Html::parse_document(r#"<body><a id="x" rel="content-repository" href="d.html">x</a></body>"#);
        let branch = tree::find_by_id(&document, "x").unwrap();

        let importers = discover(&document, branch, &Url::parse(HOST).unwrap());

        assert!(importers.is_empty());
    }

    #[test]
    fn test_extract_fragment_target() {
        let document = Html::parse_document(r#"<body><div id="sec1"><p>One</p></div></body>"#);

        let extract = ImportTarget::Fragment("sec1".into()).extract(&document).unwrap();
        let element = extract.document.tree.get(extract.element).unwrap();

        assert_eq!(element.value().as_element().unwrap().id(), Some("sec1"));
        assert_eq!(
            ImportTarget::Fragment("missing".into()).extract(&document).unwrap_err(),
            ImportFailure::BrokenFragment("missing".into())
        );
    }

    #[test]
    fn test_extract_whole_body_without_body() {
        let document = Html::parse_fragment("<p>No body here</p>");
        assert_eq!(ImportTarget::WholeBody.extract(&document).unwrap_err(), ImportFailure::BrokenContainer);
    }
}
