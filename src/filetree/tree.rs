//! The layered filesystem tree and its diff algorithms.
//!
//! A `FileTree` is built once per image layer by repeated path insertion,
//! then composed with other layers by stacking (applying additions and
//! whiteouts in place) and annotated by compare-and-mark (per-node
//! `DiffType` relative to the previous state).

use super::diff::DiffType;
use super::error::{PathAction, PathError, TreeError, TreeResult};
use super::info::FileInfo;
use super::node::{FileNode, NodeId, ViewInfo};
use super::order::SortOrder;
use super::{OPAQUE_WHITEOUT_PREFIX, WHITEOUT_PREFIX};

/// A rooted n-ary tree keyed by path segment.
///
/// Nodes live in an index-addressed arena owned by the tree; removal
/// tombstones the slot so ids stay stable for the tree's lifetime.
#[derive(Debug)]
pub struct FileTree {
    nodes: Vec<Option<FileNode>>,
    root: NodeId,
    count: usize,
    file_size: u64,
    sort_order: SortOrder,
}

/// A recorded annotation from compare-and-mark, applied after traversal.
enum CompareMark {
    /// The node was created by this comparison; annotation is definitive.
    Final { node: NodeId, upper: NodeId },
    /// The node pre-existed; annotation is derived from it and its children.
    Tentative { node: NodeId, upper: NodeId, diff: DiffType },
}

impl FileTree {
    /// Creates an empty tree holding only the synthetic root directory.
    pub fn new() -> Self {
        let root = FileNode::new(None, String::new(), FileInfo::default());
        Self { nodes: vec![Some(root)], root: 0, count: 0, file_size: 0, sort_order: SortOrder::default() }
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Number of non-root nodes.
    pub fn count(&self) -> usize {
        self.count
    }

    /// Sum of the intrinsic sizes of all non-root nodes.
    pub fn file_size(&self) -> u64 {
        self.file_size
    }

    pub fn sort_order(&self) -> SortOrder {
        self.sort_order
    }

    pub fn set_sort_order(&mut self, order: SortOrder) {
        self.sort_order = order;
    }

    /// Borrows a node. The id must have been issued by this tree and still
    /// be live; anything else is a caller bug and fails fast.
    pub fn node(&self, id: NodeId) -> &FileNode {
        self.nodes[id].as_ref().expect("node id is not live in this tree")
    }

    fn node_mut(&mut self, id: NodeId) -> &mut FileNode {
        self.nodes[id].as_mut().expect("node id is not live in this tree")
    }

    pub fn info(&self, id: NodeId) -> &FileInfo {
        &self.node(id).info
    }

    pub fn diff_type(&self, id: NodeId) -> DiffType {
        self.node(id).diff_type
    }

    pub fn view_info(&self, id: NodeId) -> ViewInfo {
        self.node(id).view_info
    }

    pub fn set_view_info(&mut self, id: NodeId, view: ViewInfo) {
        self.node_mut(id).view_info = view;
    }

    // ---- path operations ----

    /// Fetches the node at a slash-delimited absolute path.
    pub fn get(&self, path: &str) -> TreeResult<NodeId> {
        let mut current = self.root;
        for segment in path.split('/').filter(|s| !s.is_empty()) {
            match self.node(current).children.get(segment).copied() {
                Some(child) => current = child,
                None => return Err(TreeError::PathNotFound(path.to_string())),
            }
        }
        Ok(current)
    }

    /// Inserts a path, creating intermediate directories with a synthetic
    /// empty payload, and attaches `info` to the terminal node.
    ///
    /// Paths containing an opaque-directory segment (`.wh..wh..` prefix) are
    /// dropped whole: nothing is created and the returned node is `None`.
    /// Returns the terminal node and the nodes created by this call, in
    /// root-to-leaf order.
    pub fn add(&mut self, path: &str, info: FileInfo) -> TreeResult<(Option<NodeId>, Vec<NodeId>)> {
        let segments = clean_path(path)?;
        if segments.iter().any(|s| s.starts_with(OPAQUE_WHITEOUT_PREFIX)) {
            return Ok((None, Vec::new()));
        }

        let mut current = self.root;
        let mut created = Vec::new();
        for segment in segments {
            let existing = self.node(current).children.get(&segment).copied();
            match existing {
                Some(child) => current = child,
                None => {
                    let child = self.attach_child(current, segment);
                    created.push(child);
                    current = child;
                }
            }
        }

        self.attach_payload(current, info);
        Ok((Some(current), created))
    }

    /// Removes the node at `path` together with its entire subtree.
    pub fn remove(&mut self, path: &str) -> TreeResult<()> {
        let id = self.get(path)?;
        if id == self.root {
            return Err(TreeError::RootViolation);
        }
        self.remove_subtree(id);
        Ok(())
    }

    fn attach_child(&mut self, parent: NodeId, name: String) -> NodeId {
        let id = self.nodes.len();
        self.nodes.push(Some(FileNode::new(Some(parent), name.clone(), FileInfo::default())));
        self.node_mut(parent).children.insert(name, id);
        self.count += 1;
        self.invalidate_size_upward(parent);
        id
    }

    /// Replaces a node's payload, keeping children, and fixes bookkeeping.
    fn attach_payload(&mut self, id: NodeId, info: FileInfo) {
        let old_size = self.node(id).info.size;
        let new_size = info.size;
        {
            let node = self.node_mut(id);
            node.info = info;
            // A leaf's size is its payload; a directory must be re-derived
            // from children on the next size query.
            let memo = if node.children.is_empty() { Some(new_size) } else { None };
            node.cached_size.set(memo);
        }
        self.file_size = self.file_size - old_size + new_size;
        if let Some(parent) = self.node(id).parent {
            self.invalidate_size_upward(parent);
        }
    }

    fn remove_subtree(&mut self, id: NodeId) {
        let parent = self.node(id).parent;
        let name = self.node(id).name.clone();

        let mut stack = vec![id];
        let mut doomed = Vec::new();
        while let Some(current) = stack.pop() {
            doomed.push(current);
            stack.extend(self.node(current).children.values().copied());
        }

        if let Some(parent) = parent {
            self.node_mut(parent).children.remove(&name);
            self.invalidate_size_upward(parent);
        }
        for current in doomed {
            if let Some(node) = self.nodes[current].take() {
                self.count -= 1;
                self.file_size -= node.info.size;
            }
        }
    }

    // ---- paths and sizes ----

    /// Canonical absolute path of a node, cached after first computation.
    /// The whiteout prefix is stripped from the leaf segment only, so
    /// callers see the logical target path of a whiteout marker.
    pub fn path(&self, id: NodeId) -> String {
        self.node(id)
            .cached_path
            .get_or_init(|| {
                let mut segments: Vec<&str> = Vec::new();
                let mut current = id;
                while let Some(parent) = self.node(current).parent {
                    let name = self.node(current).name.as_str();
                    let name = if current == id {
                        name.strip_prefix(WHITEOUT_PREFIX).unwrap_or(name)
                    } else {
                        name
                    };
                    segments.push(name);
                    current = parent;
                }
                segments.reverse();
                format!("/{}", segments.join("/"))
            })
            .clone()
    }

    /// Recursive size in bytes, memoized per node.
    ///
    /// A `Removed` child under a live parent is excluded from the parent's
    /// total; querying a `Removed` node directly reports the accumulated
    /// size of the removed subtree.
    pub fn size_of(&self, id: NodeId) -> u64 {
        let node = self.node(id);
        if let Some(size) = node.cached_size.get() {
            return size;
        }

        let size = if node.is_leaf() {
            node.info.size
        } else {
            let mut total = node.info.size;
            for &child in node.children.values() {
                let child_node = self.node(child);
                if child_node.diff_type == DiffType::Removed && node.diff_type != DiffType::Removed
                {
                    continue;
                }
                total += self.size_of(child);
            }
            total
        };
        node.cached_size.set(Some(size));
        size
    }

    fn invalidate_size_upward(&self, mut id: NodeId) {
        loop {
            let node = self.node(id);
            node.cached_size.set(None);
            match node.parent {
                Some(parent) => id = parent,
                None => break,
            }
        }
    }

    // ---- copying ----

    /// Deep clone. Diff annotations and view flags are preserved; memoized
    /// sizes and cached paths are reset on the clone.
    pub fn copy(&self) -> FileTree {
        let mut copied = FileTree::new();
        copied.sort_order = self.sort_order;
        copied.count = self.count;
        copied.file_size = self.file_size;
        {
            let source_root = self.node(self.root);
            let info = source_root.info.clone();
            let diff = source_root.diff_type;
            let view = source_root.view_info;
            let root = copied.root;
            let target_root = copied.node_mut(root);
            target_root.info = info;
            target_root.diff_type = diff;
            target_root.view_info = view;
        }
        let target_root = copied.root;
        self.copy_children_into(self.root, &mut copied, target_root);
        copied
    }

    fn copy_children_into(&self, source: NodeId, target_tree: &mut FileTree, target: NodeId) {
        for (name, &child_id) in &self.node(source).children {
            let child = self.node(child_id);
            let id = target_tree.nodes.len();
            target_tree
                .nodes
                .push(Some(FileNode::new(Some(target), name.clone(), child.info.clone())));
            {
                let copied_child = target_tree.node_mut(id);
                copied_child.diff_type = child.diff_type;
                copied_child.view_info = child.view_info;
            }
            target_tree.node_mut(target).children.insert(name.clone(), id);
            self.copy_children_into(child_id, target_tree, id);
        }
    }

    /// Structural equality on names, payloads, diff annotations and view
    /// flags; ignores ids and caches.
    pub fn structurally_equals(&self, other: &FileTree) -> bool {
        self.nodes_equal(self.root, other, other.root)
    }

    fn nodes_equal(&self, a: NodeId, other: &FileTree, b: NodeId) -> bool {
        let left = self.node(a);
        let right = other.node(b);
        if left.name != right.name
            || left.info != right.info
            || left.diff_type != right.diff_type
            || left.view_info != right.view_info
            || left.children.len() != right.children.len()
        {
            return false;
        }
        left.children.iter().all(|(name, &child_a)| match right.children.get(name) {
            Some(&child_b) => self.nodes_equal(child_a, other, child_b),
            None => false,
        })
    }

    // ---- traversal ----

    /// Children of `id` in the active sort order. Traversals capture this
    /// snapshot at the moment recursion into the node begins.
    pub fn ordered_children(&self, id: NodeId) -> Vec<NodeId> {
        self.sort_order.order_children(self, id)
    }

    /// Depth-first, deepest nodes first (visit on the way back up). The
    /// evaluator filters visits only; a visitor error aborts the traversal.
    pub fn visit_depth_child_first(
        &self,
        visitor: &mut dyn FnMut(&FileTree, NodeId) -> TreeResult<()>,
        evaluator: Option<&dyn Fn(&FileTree, NodeId) -> bool>,
    ) -> TreeResult<()> {
        self.walk_child_first(self.root, visitor, evaluator)
    }

    /// Depth-first, shallowest nodes first (visit on the way down). A node
    /// rejected by the evaluator prunes its whole subtree; a visitor error
    /// aborts the traversal.
    pub fn visit_depth_parent_first(
        &self,
        visitor: &mut dyn FnMut(&FileTree, NodeId) -> TreeResult<()>,
        evaluator: Option<&dyn Fn(&FileTree, NodeId) -> bool>,
    ) -> TreeResult<()> {
        self.walk_parent_first(self.root, visitor, evaluator)
    }

    fn walk_child_first(
        &self,
        id: NodeId,
        visitor: &mut dyn FnMut(&FileTree, NodeId) -> TreeResult<()>,
        evaluator: Option<&dyn Fn(&FileTree, NodeId) -> bool>,
    ) -> TreeResult<()> {
        for child in self.ordered_children(id) {
            self.walk_child_first(child, visitor, evaluator)?;
        }
        if evaluator.map_or(true, |admit| admit(self, id)) {
            visitor(self, id)?;
        }
        Ok(())
    }

    fn walk_parent_first(
        &self,
        id: NodeId,
        visitor: &mut dyn FnMut(&FileTree, NodeId) -> TreeResult<()>,
        evaluator: Option<&dyn Fn(&FileTree, NodeId) -> bool>,
    ) -> TreeResult<()> {
        if !evaluator.map_or(true, |admit| admit(self, id)) {
            return Ok(());
        }
        visitor(self, id)?;
        for child in self.ordered_children(id) {
            self.walk_parent_first(child, visitor, evaluator)?;
        }
        Ok(())
    }

    // ---- diff annotation ----

    /// Assigns a diff annotation. `Removed` propagates to every descendant.
    pub fn assign_diff_type(&mut self, id: NodeId, diff: DiffType) {
        self.set_diff(id, diff);
        self.invalidate_size_upward(id);
    }

    fn set_diff(&mut self, id: NodeId, diff: DiffType) {
        {
            let node = self.node_mut(id);
            node.diff_type = diff;
            node.cached_size.set(None);
        }
        if diff == DiffType::Removed {
            let children: Vec<NodeId> = self.node(id).children.values().copied().collect();
            for child in children {
                self.set_diff(child, DiffType::Removed);
            }
        }
    }

    /// Annotates the node at `path` (and its subtree) as `Removed`.
    pub fn mark_removed(&mut self, path: &str) -> TreeResult<()> {
        let id = self.get(path)?;
        if id == self.root {
            return Err(TreeError::RootViolation);
        }
        self.assign_diff_type(id, DiffType::Removed);
        Ok(())
    }

    /// Settles the annotation of a pre-existing node from its tentative
    /// comparison result and the annotations of its children. Any
    /// child-level change means this node's contents changed.
    fn derive_diff_type(&mut self, id: NodeId, tentative: DiffType) {
        let mut aggregate = DiffType::Unmodified;
        for &child in self.node(id).children.values() {
            aggregate = aggregate.merge(self.node(child).diff_type);
        }
        let derived = if aggregate == DiffType::Unmodified {
            tentative
        } else {
            tentative.merge(DiffType::Modified)
        };
        self.assign_diff_type(id, derived);
    }

    fn compare_with(
        &self,
        lower: NodeId,
        upper_tree: &FileTree,
        upper: NodeId,
    ) -> TreeResult<DiffType> {
        let upper_node = upper_tree.node(upper);
        if upper_node.is_whiteout() {
            return Ok(DiffType::Removed);
        }
        let lower_node = self.node(lower);
        if lower_node.name != upper_node.name {
            return Err(TreeError::MismatchedCompare {
                left: lower_node.name.clone(),
                right: upper_node.name.clone(),
            });
        }
        Ok(lower_node.info.compare(&upper_node.info))
    }

    // ---- layered composition ----

    /// Applies `upper` onto this tree in place: whiteouts remove their
    /// target path, everything else is added or overwritten. Individual
    /// path failures are collected, never fatal.
    pub fn stack(&mut self, upper: &FileTree) -> Vec<PathError> {
        let mut failed = Vec::new();
        let walk = upper.visit_depth_child_first(
            &mut |upper_tree, upper_id| {
                if upper_id == upper_tree.root() {
                    return Ok(());
                }
                let target = upper_tree.path(upper_id);
                if upper_tree.node(upper_id).is_whiteout() {
                    if let Err(error) = self.remove(&target) {
                        failed.push(PathError::new(&target, PathAction::Remove, error));
                    }
                } else if let Err(error) =
                    self.add(&target, upper_tree.node(upper_id).info.clone())
                {
                    failed.push(PathError::new(&target, PathAction::Add, error));
                }
                Ok(())
            },
            None,
        );
        debug_assert!(walk.is_ok());
        if !failed.is_empty() {
            tracing::warn!(failures = failed.len(), "stack completed with path failures");
        }
        failed
    }

    /// Combines a range of layer trees into one: deep-copies the base tree
    /// (`trees[0]`), then stacks `trees[start..=stop]` on top of it.
    pub fn stack_range(trees: &[&FileTree], start: usize, stop: usize) -> (FileTree, Vec<PathError>) {
        let mut failed = Vec::new();
        let Some(base) = trees.first() else {
            return (FileTree::new(), failed);
        };
        let mut tree = base.copy();
        for idx in start..=stop {
            match trees.get(idx) {
                Some(upper) => failed.extend(tree.stack(upper)),
                None => break,
            }
        }
        (tree, failed)
    }

    /// Annotates this (lower) tree with per-node diff types describing the
    /// transition to `lower ⊕ upper`, and overwrites payloads with the
    /// upper layer's metadata.
    ///
    /// Fails fast only on invariant violations (`MismatchedCompare`);
    /// per-path problems are collected and returned.
    pub fn compare_and_mark(&mut self, upper: &FileTree) -> TreeResult<Vec<PathError>> {
        let mut marks: Vec<CompareMark> = Vec::new();
        let mut failed = Vec::new();

        // Leaves first, so parent annotations can be derived from children.
        upper.visit_depth_child_first(
            &mut |upper_tree, upper_id| {
                if upper_id == upper_tree.root() {
                    return Ok(());
                }
                let target = upper_tree.path(upper_id);

                if upper_tree.node(upper_id).is_whiteout() {
                    if let Err(error) = self.mark_removed(&target) {
                        failed.push(PathError::new(&target, PathAction::Remove, error));
                    }
                    return Ok(());
                }

                match self.get(&target) {
                    Err(_) => match self.add(&target, upper_tree.node(upper_id).info.clone()) {
                        Ok((_, created)) => {
                            // Record leaf-first so leaves are annotated
                            // before any parent derivation runs.
                            for &node in created.iter().rev() {
                                marks.push(CompareMark::Final { node, upper: upper_id });
                            }
                        }
                        Err(error) => failed.push(PathError::new(&target, PathAction::Add, error)),
                    },
                    Ok(lower) => {
                        let diff = self.compare_with(lower, upper_tree, upper_id)?;
                        marks.push(CompareMark::Tentative { node: lower, upper: upper_id, diff });
                    }
                }
                Ok(())
            },
            None,
        )?;

        for mark in marks {
            match mark {
                CompareMark::Final { node, upper: upper_id } => {
                    self.assign_diff_type(node, DiffType::Added);
                    self.attach_payload(node, upper.node(upper_id).info.clone());
                }
                CompareMark::Tentative { node, upper: upper_id, diff } => {
                    if self.node(node).diff_type == DiffType::Unmodified {
                        self.derive_diff_type(node, diff);
                    }
                    self.attach_payload(node, upper.node(upper_id).info.clone());
                }
            }
        }

        if !failed.is_empty() {
            tracing::warn!(failures = failed.len(), "compare-and-mark completed with path failures");
        }
        Ok(failed)
    }
}

impl Default for FileTree {
    fn default() -> Self {
        Self::new()
    }
}

fn clean_path(path: &str) -> TreeResult<Vec<String>> {
    if path.is_empty() {
        return Err(TreeError::InvalidPath("empty path".to_string()));
    }
    if !path.starts_with('/') {
        return Err(TreeError::InvalidPath(format!("relative path '{path}'")));
    }
    let segments: Vec<String> =
        path.split('/').filter(|s| !s.is_empty()).map(str::to_string).collect();
    if segments.is_empty() {
        return Err(TreeError::InvalidPath(format!("no segments left in '{path}'")));
    }
    if segments.iter().any(|s| s == "." || s == "..") {
        return Err(TreeError::InvalidPath(format!("relative segment in '{path}'")));
    }
    Ok(segments)
}
