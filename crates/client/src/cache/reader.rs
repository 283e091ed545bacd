//! The reader protocol by which consumers receive documents from the cache.

use std::rc::Rc;

use scraper::Html;

use super::CacheEntry;

/// A pending consumer of one cached document.
///
/// The cache calls [`read`](DocumentReader::read) only when the document was
/// retrieved, and then always calls [`close`](DocumentReader::close), which
/// consumes the reader. A reader is therefore read at most once and closed
/// exactly once.
pub trait DocumentReader {
    /// Reads the document. The document may be shared with other readers and must not be mutated.
    fn read(&mut self, entry: &CacheEntry, document: &Rc<Html>);

    /// Closes this reader, whether or not the document was read.
    fn close(self: Box<Self>, entry: &CacheEntry);
}

/// Gives a terminal entry to a reader.
pub(crate) fn notify(mut reader: Box<dyn DocumentReader>, entry: &CacheEntry) {
    if let Some(document) = entry.document() {
        reader.read(entry, document);
    }
    reader.close(entry);
}
