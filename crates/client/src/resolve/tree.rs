//! Element-tree surgery on scraper documents.
//!
//! scraper keeps every document in an `ego_tree` arena. Nodes cannot move
//! between arenas, so content crosses documents by deep copy. Detached nodes
//! stay in their arena but are unreachable from the root, so they neither
//! serialize nor match selectors run from the root element.

use ego_tree::iter::Edge;
use ego_tree::{NodeId, NodeRef, Tree};
use scraper::{Html, Node};

/// The XML namespace of HTML.
pub const NS_HTML: &str = "http://www.w3.org/1999/xhtml";

const FAILURE_MARKER: &str = r#"<p> <em style="margin-left: 1em">Unable to import content, attempt failed</em></p>"#;

/// A deep copy of one element, held in a document of its own.
#[derive(Debug)]
pub(crate) struct Extract {
    pub(crate) document: Html,
    pub(crate) element: NodeId,
}

/// Whether the node is an HTML element with the given local name.
pub(crate) fn is_html_element(node: &Node, local_name: &str) -> bool {
    node.as_element()
        .is_some_and(|element| element.name() == local_name && &*element.name.ns == NS_HTML)
}

/// Depth-first search for the document's `body` element.
pub(crate) fn find_content_root(document: &Html) -> Option<NodeId> {
    document
        .tree
        .root()
        .descendants()
        .find(|node| is_html_element(node.value(), "body"))
        .map(|node| node.id())
}

pub(crate) fn find_by_id(document: &Html, id: &str) -> Option<NodeId> {
    document
        .tree
        .root()
        .descendants()
        .find(|node| node.value().as_element().and_then(|element| element.id()) == Some(id))
        .map(|node| node.id())
}

/// Copies `source` and all its descendants into `dest` as a detached subtree.
///
/// Walks the source with an explicit stack of copied ancestors, so nesting
/// depth is bounded by the heap and not by the thread's stack.
pub(crate) fn copy_subtree(source: NodeRef<'_, Node>, dest: &mut Tree<Node>) -> NodeId {
    let root = dest.orphan(source.value().clone()).id();
    let mut parents = vec![root];

    // The first edge opens `source` itself, which is already copied.
    for edge in source.traverse().skip(1) {
        match edge {
            Edge::Open(node) => {
                let id = dest.orphan(node.value().clone()).id();
                if let Some(mut parent) = parents.last().and_then(|&parent| dest.get_mut(parent)) {
                    parent.append_id(id);
                }
                parents.push(id);
            }
            Edge::Close(_) => {
                parents.pop();
            }
        }
    }
    root
}

/// Copies an element of `source` into a fresh fragment document, leaving `source` untouched.
pub(crate) fn extract(source: &Html, element: NodeId) -> Option<Extract> {
    let element = source.tree.get(element)?;
    let mut document = Html::new_fragment();
    let copy = copy_subtree(element, &mut document.tree);
    document.tree.root_mut().append_id(copy);
    Some(Extract { document, element: copy })
}

/// Removes every `script` element below `branch`. Returns how many were removed.
pub(crate) fn strip_scripts(document: &mut Html, branch: NodeId) -> usize {
    let scripts: Vec<NodeId> = match document.tree.get(branch) {
        Some(branch) => branch
            .descendants()
            .skip(1)
            .filter(|node| node.value().as_element().is_some_and(|e| e.name() == "script"))
            .map(|node| node.id())
            .collect(),
        None => return 0,
    };

    for id in &scripts {
        if let Some(mut script) = document.tree.get_mut(*id) {
            script.detach();
        }
    }
    scripts.len()
}

/// Copies the children of `container` into `host`, immediately before `anchor`.
pub(crate) fn splice_children_before(host: &mut Html, anchor: NodeId, content: &Html, container: NodeId) {
    let Some(container) = content.tree.get(container) else {
        return;
    };
    if !has_parent(host, anchor) {
        return;
    }

    for child in container.children() {
        let copy = copy_subtree(child, &mut host.tree);
        if let Some(mut anchor) = host.tree.get_mut(anchor) {
            anchor.insert_id_before(copy);
        }
    }
}

pub(crate) fn remove(document: &mut Html, node: NodeId) {
    if let Some(mut node) = document.tree.get_mut(node) {
        node.detach();
    }
}

/// Inserts the visible notice of a failed import right after the importer.
pub(crate) fn insert_failure_marker(host: &mut Html, importer: NodeId) {
    if !has_parent(host, importer) {
        return;
    }

    let marker = Html::parse_fragment(FAILURE_MARKER);
    let Some(paragraph) = marker
        .tree
        .root()
        .descendants()
        .find(|node| is_html_element(node.value(), "p"))
    else {
        return;
    };

    let mut anchor = importer;
    for child in paragraph.children() {
        let copy = copy_subtree(child, &mut host.tree);
        if let Some(mut node) = host.tree.get_mut(anchor) {
            node.insert_id_after(copy);
        }
        anchor = copy;
    }
}

fn has_parent(document: &Html, node: NodeId) -> bool {
    document.tree.get(node).and_then(|node| node.parent()).is_some()
}
