//! In-memory fetcher and readers for tests.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use async_trait::async_trait;
use scraper::Html;
use url::Url;

use crate::cache::{CacheEntry, DocumentReader};
use crate::fetch::{DocumentFetcher, FailureKind, FetchFailure};

enum Response {
    Document(String),
    /// Parsed as a fragment, so the tree has no `body`.
    Fragment(String),
    Failure(FailureKind),
}

/// Fetcher serving canned markup, recording every location it is asked for.
///
/// Each fetch yields once before completing, so concurrent requests get the
/// chance to queue behind it.
pub(crate) struct MockFetcher {
    responses: HashMap<String, Response>,
    requests: Rc<RefCell<Vec<String>>>,
}

impl MockFetcher {
    pub(crate) fn new() -> Self {
        Self { responses: HashMap::new(), requests: Rc::default() }
    }

    pub(crate) fn with_document(mut self, location: &str, markup: &str) -> Self {
        self.responses
            .insert(location.to_string(), Response::Document(markup.to_string()));
        self
    }

    pub(crate) fn with_fragment(mut self, location: &str, markup: &str) -> Self {
        self.responses
            .insert(location.to_string(), Response::Fragment(markup.to_string()));
        self
    }

    pub(crate) fn with_failure(mut self, location: &str, kind: FailureKind) -> Self {
        self.responses.insert(location.to_string(), Response::Failure(kind));
        self
    }

    /// Handle on the log of requested locations.
    pub(crate) fn requests(&self) -> Rc<RefCell<Vec<String>>> {
        Rc::clone(&self.requests)
    }
}

#[async_trait(?Send)]
impl DocumentFetcher for MockFetcher {
    async fn fetch(&self, location: &Url) -> Result<Html, FetchFailure> {
        self.requests.borrow_mut().push(location.to_string());
        tokio::task::yield_now().await;

        match self.responses.get(location.as_str()) {
            Some(Response::Document(markup)) => Ok(Html::parse_document(markup)),
            Some(Response::Fragment(markup)) => Ok(Html::parse_fragment(markup)),
            Some(Response::Failure(kind)) => Err(FetchFailure::new(*kind, "canned failure")),
            None => Err(FetchFailure::new(FailureKind::NetworkError, "status 404")),
        }
    }
}

/// Shared record of what a group of [`RecordingReader`]s observed.
#[derive(Clone, Default)]
pub(crate) struct ReaderLog {
    events: Rc<RefCell<Vec<String>>>,
    documents: Rc<RefCell<Vec<Rc<Html>>>>,
    failures: Rc<RefCell<Vec<Option<FailureKind>>>>,
}

impl ReaderLog {
    pub(crate) fn events(&self) -> Vec<String> {
        self.events.borrow().clone()
    }

    pub(crate) fn documents(&self) -> Vec<Rc<Html>> {
        self.documents.borrow().clone()
    }

    /// Failure kind seen by each reader that closed without reading.
    pub(crate) fn failures(&self) -> Vec<Option<FailureKind>> {
        self.failures.borrow().clone()
    }
}

pub(crate) struct RecordingReader {
    name: &'static str,
    log: ReaderLog,
    did_read: bool,
}

impl RecordingReader {
    pub(crate) fn log() -> ReaderLog {
        ReaderLog::default()
    }

    pub(crate) fn boxed(name: &'static str, log: &ReaderLog) -> Box<dyn DocumentReader> {
        Box::new(Self { name, log: log.clone(), did_read: false })
    }
}

impl DocumentReader for RecordingReader {
    fn read(&mut self, _entry: &CacheEntry, document: &Rc<Html>) {
        self.did_read = true;
        self.log.events.borrow_mut().push(format!("{} read", self.name));
        self.log.documents.borrow_mut().push(Rc::clone(document));
    }

    fn close(self: Box<Self>, entry: &CacheEntry) {
        self.log.events.borrow_mut().push(format!("{} close", self.name));
        if !self.did_read {
            self.log
                .failures
                .borrow_mut()
                .push(entry.failure().map(|f| f.kind));
        }
    }
}
