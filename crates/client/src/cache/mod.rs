//! Document cache with request coalescing.
//!
//! Each distinct document location is fetched at most once per cache. While a
//! fetch is in flight, further readers of the same location queue behind it;
//! when it completes, every queued reader is notified in registration order
//! and the entry becomes terminal.
//!
//! | State    | document | waiters |
//! |----------|----------|---------|
//! | Pending  | absent   | queued  |
//! | Resolved | present  | absent  |
//! | Failed   | absent   | absent  |

pub mod reader;

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use ego_tree::NodeId;
use scraper::{Html, Node};
use transclude_core::Error;
use url::Url;

pub use reader::DocumentReader;

use crate::fetch::{DocumentFetcher, FetchFailure};
use crate::location;

/// Lifecycle state of a cache entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryState {
    /// No request was ever made for the location.
    Unseen,
    /// A fetch is in flight.
    Pending,
    /// The document is stored.
    Resolved,
    /// The fetch failed; it is never retried.
    Failed,
}

/// The cache's record of one document location.
pub struct CacheEntry {
    location: Url,
    document: Option<Rc<Html>>,
    failure: Option<FetchFailure>,
    waiters: Option<Vec<Box<dyn DocumentReader>>>,
}

impl CacheEntry {
    fn pending(location: Url, reader: Box<dyn DocumentReader>) -> Self {
        Self { location, document: None, failure: None, waiters: Some(vec![reader]) }
    }

    fn resolved(location: Url, document: Rc<Html>) -> Self {
        Self { location, document: Some(document), failure: None, waiters: None }
    }

    /// The document location in normal form, without fragment.
    pub fn location(&self) -> &Url {
        &self.location
    }

    /// The stored document, or `None` while pending or after failure.
    pub fn document(&self) -> Option<&Rc<Html>> {
        self.document.as_ref()
    }

    /// Why the fetch failed, if it did.
    pub fn failure(&self) -> Option<&FetchFailure> {
        self.failure.as_ref()
    }

    pub fn state(&self) -> EntryState {
        match (&self.waiters, &self.document) {
            (Some(_), _) => EntryState::Pending,
            (None, Some(_)) => EntryState::Resolved,
            (None, None) => EntryState::Failed,
        }
    }

    /// Copy of a terminal entry, handed to readers while the table is not borrowed.
    fn terminal_view(&self) -> CacheEntry {
        CacheEntry {
            location: self.location.clone(),
            document: self.document.clone(),
            failure: self.failure.clone(),
            waiters: None,
        }
    }
}

impl fmt::Debug for CacheEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheEntry")
            .field("location", &self.location.as_str())
            .field("state", &self.state())
            .field("waiters", &self.waiters.as_ref().map_or(0, Vec::len))
            .field("failure", &self.failure)
            .finish()
    }
}

/// Store of documents for one resolution session.
pub struct DocumentCache {
    fetcher: Box<dyn DocumentFetcher>,
    entries: RefCell<HashMap<String, CacheEntry>>,
    enforce_constraints: bool,
}

impl DocumentCache {
    /// Create an empty cache that retrieves documents through `fetcher`.
    pub fn new(fetcher: impl DocumentFetcher + 'static) -> Self {
        Self { fetcher: Box::new(fetcher), entries: RefCell::new(HashMap::new()), enforce_constraints: false }
    }

    /// Store the host document, so that requests for its location are answered without a fetch.
    ///
    /// The cache keeps its own copy: later changes to the caller's tree are not seen by readers.
    pub fn with_host_document(self, location: &Url, document: Html) -> Self {
        let location = location::defragmented(location);
        self.entries
            .borrow_mut()
            .insert(location.as_str().to_owned(), CacheEntry::resolved(location, Rc::new(document)));
        self
    }

    /// Whether to check that every requested location is in normal form.
    pub fn enforce_constraints(mut self, enforce: bool) -> Self {
        self.enforce_constraints = enforce;
        self
    }

    /// The state of the entry for a location; a fragment is ignored.
    pub fn state(&self, location: &str) -> EntryState {
        let Ok(location) = Url::parse(location) else {
            return EntryState::Unseen;
        };
        let location = location::defragmented(&location);
        self.entries
            .borrow()
            .get(location.as_str())
            .map_or(EntryState::Unseen, CacheEntry::state)
    }

    /// Number of locations the cache has an entry for.
    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }

    /// Gives the indicated document to the reader.
    ///
    /// If the entry is terminal, the reader is notified before this returns. If a
    /// fetch is pending, the reader joins its queue and this returns at once.
    /// Otherwise this future performs the fetch and notifies every reader queued
    /// meanwhile, in order.
    ///
    /// # Errors
    ///
    /// Returns `Error::AbnormalLocation` if constraint enforcement is on and
    /// `location` is not in normal form, or `Error::InvalidUrl` if it is not an
    /// absolute URI.
    pub async fn request_document(&self, location: &str, reader: Box<dyn DocumentReader>) -> Result<(), Error> {
        if self.enforce_constraints && location::is_abnormal(location) {
            return Err(Error::AbnormalLocation(location.to_string()));
        }

        let location = location::normalize(location, None).map_err(|e| Error::InvalidUrl(e.to_string()))?;
        let location = location::defragmented(&location);
        let key = location.as_str().to_owned();

        let answered = {
            let mut entries = self.entries.borrow_mut();
            match entries.get_mut(&key) {
                Some(entry) => match entry.waiters.as_mut() {
                    Some(waiters) => {
                        waiters.push(reader);
                        tracing::trace!(location = %key, queued = waiters.len(), "joined pending document request");
                        return Ok(());
                    }
                    None => Some((reader, entry.terminal_view())),
                },
                None => {
                    entries.insert(key, CacheEntry::pending(location.clone(), reader));
                    None
                }
            }
        };

        match answered {
            Some((reader, entry)) => reader::notify(reader, &entry),
            None => self.fetch_and_notify(location).await,
        }

        Ok(())
    }

    async fn fetch_and_notify(&self, location: Url) {
        tracing::debug!(location = %location, "requesting document");
        let outcome = self.fetcher.fetch(&location).await;

        let (waiters, view) = {
            let mut entries = self.entries.borrow_mut();
            let Some(entry) = entries.get_mut(location.as_str()) else {
                return;
            };
            match outcome {
                Ok(mut document) => {
                    let rewritten = absolutize_hrefs(&mut document, &location);
                    tracing::trace!(location = %location, rewritten, "normalized href attributes");
                    entry.document = Some(Rc::new(document));
                }
                Err(failure) => {
                    tracing::warn!(
                        location = %location,
                        kind = %failure.kind,
                        "document request failed: {}",
                        failure.detail
                    );
                    entry.failure = Some(failure);
                }
            }
            (entry.waiters.take().unwrap_or_default(), entry.terminal_view())
        };

        for reader in waiters {
            reader::notify(reader, &view);
        }
    }
}

/// Rewrites every `href` attribute of a fetched document into normal form, resolved against its location.
///
/// Content copied out of the document then keeps pointing at the same targets.
/// Values that do not normalize are left as written. Returns how many changed.
fn absolutize_hrefs(document: &mut Html, location: &Url) -> usize {
    let elements: Vec<NodeId> = document
        .tree
        .root()
        .descendants()
        .filter(|node| node.value().is_element())
        .map(|node| node.id())
        .collect();

    let mut rewritten = 0;
    for id in elements {
        let Some(mut node) = document.tree.get_mut(id) else {
            continue;
        };
        let Node::Element(element) = node.value() else {
            continue;
        };
        for (name, value) in element.attrs.iter_mut() {
            if &*name.local != "href" || !name.ns.is_empty() {
                continue;
            }
            let Ok(normalized) = location::normalize(&**value, Some(location)) else {
                continue;
            };
            if normalized.as_str() != &**value {
                *value = normalized.as_str().into();
                rewritten += 1;
            }
        }
    }
    rewritten
}

impl fmt::Debug for DocumentCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DocumentCache")
            .field("entries", &self.entries.borrow().values().collect::<Vec<_>>())
            .field("enforce_constraints", &self.enforce_constraints)
            .finish_non_exhaustive()
    }
}
