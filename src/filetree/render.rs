//! Rendering surface for external viewers.
//!
//! The engine exposes plain strings and per-node diff annotations; mapping
//! them to colors or widgets is the renderer's job.

use super::node::NodeId;
use super::tree::FileTree;

const NO_BRANCH_SPACE: &str = "    ";
const BRANCH_SPACE: &str = "│   ";
const MIDDLE_ITEM: &str = "├─";
const LAST_ITEM: &str = "└─";
const UNCOLLAPSED_ITEM: &str = "─ ";
const COLLAPSED_ITEM: &str = "⊕ ";

/// Ordered metadata columns for one node row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetadataColumns {
    pub dir_flag: char,
    pub mode: String,
    pub owner: String,
    pub size: String,
}

impl std::fmt::Display for MetadataColumns {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}{} {:>11} {:>10} ", self.dir_flag, self.mode, self.owner, self.size)
    }
}

impl FileTree {
    /// Base name, with the link target appended for symlinks and hardlinks.
    pub fn display_name(&self, id: NodeId) -> String {
        let node = self.node(id);
        if node.info().type_flag.is_link() && !node.info().link_name.is_empty() {
            format!("{} → {}", node.name(), node.info().link_name)
        } else {
            node.name().to_string()
        }
    }

    pub fn metadata_columns(&self, id: NodeId) -> MetadataColumns {
        let info = self.info(id);
        MetadataColumns {
            dir_flag: if info.type_flag.is_dir() { 'd' } else { '-' },
            mode: mode_string(info.mode),
            owner: format!("{}:{}", info.uid, info.gid),
            size: human_size(self.size_of(id)),
        }
    }

    pub fn metadata_string(&self, id: NodeId) -> String {
        self.metadata_columns(id).to_string()
    }

    /// Number of nodes a renderer would currently show: hidden subtrees
    /// contribute nothing, a collapsed directory contributes itself but not
    /// its children. The root is not counted.
    pub fn visible_size(&self) -> usize {
        self.count_visible(self.root())
    }

    fn count_visible(&self, id: NodeId) -> usize {
        let mut total = 0;
        for child in self.visible_children(id) {
            total += 1;
            if !self.node(child).view_info().collapsed {
                total += self.count_visible(child);
            }
        }
        total
    }

    /// Flat `(node, depth)` list over the whole tree in active sort order,
    /// root excluded, ignoring view flags. Suitable for table consumers.
    pub fn sorted_nodes(&self) -> Vec<(NodeId, usize)> {
        let mut rows = Vec::new();
        self.flatten(self.root(), 0, &mut rows);
        rows
    }

    fn flatten(&self, id: NodeId, depth: usize, rows: &mut Vec<(NodeId, usize)>) {
        for child in self.ordered_children(id) {
            rows.push((child, depth + 1));
            self.flatten(child, depth + 1, rows);
        }
    }

    /// Renders the whole visible tree, one line per node.
    pub fn render_all(&self, show_attributes: bool) -> String {
        self.render_between(0, self.count(), show_attributes)
    }

    /// Renders visible rows with indices in `[start, stop]`, counted over
    /// visible nodes with the root excluded.
    pub fn render_between(&self, start: usize, stop: usize, show_attributes: bool) -> String {
        let mut rows = Vec::new();
        self.collect_rows(self.root(), "", &mut rows);

        let mut out = String::new();
        for (index, (id, prefix, collapsed)) in rows.iter().enumerate() {
            if index < start || index > stop {
                continue;
            }
            if show_attributes {
                out.push_str(&self.metadata_string(*id));
            }
            out.push_str(prefix);
            out.push_str(if *collapsed { COLLAPSED_ITEM } else { UNCOLLAPSED_ITEM });
            out.push_str(&self.display_name(*id));
            out.push('\n');
        }
        out
    }

    fn visible_children(&self, id: NodeId) -> Vec<NodeId> {
        self.ordered_children(id)
            .into_iter()
            .filter(|&child| !self.node(child).view_info().hidden)
            .collect()
    }

    fn collect_rows(&self, id: NodeId, indent: &str, rows: &mut Vec<(NodeId, String, bool)>) {
        let children = self.visible_children(id);
        let last_index = children.len().saturating_sub(1);
        for (idx, child) in children.into_iter().enumerate() {
            let is_last = idx == last_index;
            let branch = if is_last { LAST_ITEM } else { MIDDLE_ITEM };
            let node = self.node(child);
            let collapsed = node.view_info().collapsed && !node.is_leaf();
            rows.push((child, format!("{indent}{branch}"), collapsed));
            if !node.view_info().collapsed {
                let next_indent =
                    format!("{indent}{}", if is_last { NO_BRANCH_SPACE } else { BRANCH_SPACE });
                self.collect_rows(child, &next_indent, rows);
            }
        }
    }
}

/// SI-style human readable byte count.
pub fn human_size(bytes: u64) -> String {
    const UNITS: [&str; 7] = ["B", "kB", "MB", "GB", "TB", "PB", "EB"];
    if bytes < 1000 {
        return format!("{bytes} B");
    }
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1000.0 && unit < UNITS.len() - 1 {
        value /= 1000.0;
        unit += 1;
    }
    if value >= 100.0 {
        format!("{:.0} {}", value, UNITS[unit])
    } else {
        format!("{:.1} {}", value, UNITS[unit])
    }
}

/// 9-character permission string with setuid/setgid/sticky overlays.
pub fn mode_string(mode: u32) -> String {
    const BITS: [(u32, char); 9] = [
        (0o400, 'r'),
        (0o200, 'w'),
        (0o100, 'x'),
        (0o040, 'r'),
        (0o020, 'w'),
        (0o010, 'x'),
        (0o004, 'r'),
        (0o002, 'w'),
        (0o001, 'x'),
    ];

    let mut out = String::with_capacity(9);
    for (slot, (bit, symbol)) in BITS.iter().enumerate() {
        let mut ch = if mode & bit != 0 { *symbol } else { '-' };
        match slot {
            2 if mode & 0o4000 != 0 => ch = if mode & 0o100 != 0 { 's' } else { 'S' },
            5 if mode & 0o2000 != 0 => ch = if mode & 0o010 != 0 { 's' } else { 'S' },
            8 if mode & 0o1000 != 0 => ch = if mode & 0o001 != 0 { 't' } else { 'T' },
            _ => {}
        }
        out.push(ch);
    }
    out
}
