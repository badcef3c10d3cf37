//! Depth ladders for quote, list and indent nesting.
//!
//! Nested containers are built in an arena and addressed by index handles, so
//! a production can keep appending to any open level without back-pointers.
//! [`DepthLadder`] tracks which container receives content at the current
//! marker depth. [`Arena::finish`] turns the drafts into owned [`Node`]s.

use crate::ast::{ListMarker, Node};

/// Index of a container draft in an [`Arena`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Handle(usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ContainerKind {
    Quote,
    List(ListMarker),
    ListItem(ListMarker),
    Indent,
}

#[derive(Debug)]
enum Slot {
    Node(Node),
    Container(Handle),
}

#[derive(Debug)]
struct Draft {
    kind: ContainerKind,
    depth: usize,
    start: Option<u32>,
    children: Vec<Slot>,
}

#[derive(Debug, Default)]
pub(crate) struct Arena {
    drafts: Vec<Draft>,
}

impl Arena {
    /// Open a detached container.
    pub(crate) fn open(&mut self, kind: ContainerKind, depth: usize) -> Handle {
        self.drafts.push(Draft {
            kind,
            depth,
            start: None,
            children: Vec::new(),
        });
        Handle(self.drafts.len() - 1)
    }

    /// Append `child` as the last child of `parent`.
    pub(crate) fn attach(&mut self, parent: Handle, child: Handle) {
        self.drafts[parent.0].children.push(Slot::Container(child));
    }

    pub(crate) fn push(&mut self, parent: Handle, node: Node) {
        self.drafts[parent.0].children.push(Slot::Node(node));
    }

    pub(crate) fn extend(&mut self, parent: Handle, nodes: Vec<Node>) {
        self.drafts[parent.0]
            .children
            .extend(nodes.into_iter().map(Slot::Node));
    }

    /// The last list item directly under `list`, if any.
    pub(crate) fn last_item(&self, list: Handle) -> Option<Handle> {
        self.drafts[list.0]
            .children
            .iter()
            .rev()
            .find_map(|slot| match slot {
                Slot::Container(h) if matches!(self.drafts[h.0].kind, ContainerKind::ListItem(_)) => {
                    Some(*h)
                }
                _ => None,
            })
    }

    pub(crate) fn set_start(&mut self, list: Handle, start: u32) {
        self.drafts[list.0].start = Some(start);
    }

    /// Build the finished tree rooted at `root`.
    pub(crate) fn finish(mut self, root: Handle) -> Node {
        self.build(root)
    }

    fn build(&mut self, handle: Handle) -> Node {
        let slots = std::mem::take(&mut self.drafts[handle.0].children);
        let children = slots
            .into_iter()
            .map(|slot| match slot {
                Slot::Node(node) => node,
                Slot::Container(child) => self.build(child),
            })
            .collect();

        let draft = &self.drafts[handle.0];
        let depth = draft.depth;
        match draft.kind {
            ContainerKind::Quote => Node::BlockQuote { depth, children },
            ContainerKind::List(marker) => Node::List {
                depth,
                marker,
                start: draft.start,
                children,
            },
            ContainerKind::ListItem(marker) => Node::ListItem { marker, children },
            ContainerKind::Indent => Node::Indent { depth, children },
        }
    }
}

/// Stack of `(container, depth)` pairs for one nesting construct.
///
/// The root sits at depth 1. Deeper markers open one container per missing
/// level. Shallower markers return to the nearest container recorded at
/// `depth - 1`, or to the root when there is none.
#[derive(Debug)]
pub(crate) struct DepthLadder {
    stack: Vec<(Handle, usize)>,
    depth: usize,
}

impl DepthLadder {
    pub(crate) fn new(root: Handle) -> Self {
        Self {
            stack: vec![(root, 1)],
            depth: 1,
        }
    }

    #[inline]
    pub(crate) fn depth(&self) -> usize {
        self.depth
    }

    /// Container receiving content at the current depth.
    #[inline]
    pub(crate) fn current(&self) -> Handle {
        self.stack[self.stack.len() - 1].0
    }

    /// Move to `target` depth and return the container for it.
    pub(crate) fn climb(
        &mut self,
        arena: &mut Arena,
        target: usize,
        kind: ContainerKind,
    ) -> Handle {
        let target = target.max(1);
        if target > self.depth {
            for level in self.depth + 1..=target {
                let child = arena.open(kind, level);
                arena.attach(self.current(), child);
                self.stack.push((child, level));
            }
        } else if target < self.depth {
            let keep = self
                .stack
                .iter()
                .rposition(|&(_, level)| level == target - 1)
                .map_or(1, |idx| idx + 1);
            self.stack.truncate(keep);
        }
        self.depth = target;
        self.current()
    }
}
