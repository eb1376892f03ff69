use log;

const INDENT: &str = "  ";

/// Node of the derived project tree. Files and directories are not
/// distinguished: a node is just a path segment with its children.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeNode {
    pub name: String,
    pub children: Vec<TreeNode>,
}

/// Builds a tree from forward-slash relative paths. Children are kept sorted
/// by name, so the result does not depend on input order.
pub fn build_tree_from_paths<'a, I>(paths: I) -> Vec<TreeNode>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut roots: Vec<TreeNode> = Vec::new();
    let mut count = 0usize;
    for path in paths {
        let components: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
        if !components.is_empty() {
            insert_node(&mut roots, &components);
            count += 1;
        }
    }
    log::debug!("Built project tree from {} paths", count);
    roots
}

fn insert_node(level: &mut Vec<TreeNode>, components: &[&str]) {
    let Some((name, rest)) = components.split_first() else {
        return;
    };
    let index = match level.binary_search_by(|node| node.name.as_str().cmp(name)) {
        Ok(index) => index,
        Err(insertion_point) => {
            level.insert(
                insertion_point,
                TreeNode {
                    name: (*name).to_string(),
                    children: Vec::new(),
                },
            );
            insertion_point
        }
    };
    insert_node(&mut level[index].children, rest);
}

/// Indentation-only text rendering, two spaces per depth level.
pub fn render_tree(nodes: &[TreeNode]) -> String {
    let mut out = String::new();
    render_level(nodes, 0, &mut out);
    out
}

fn render_level(nodes: &[TreeNode], depth: usize, out: &mut String) {
    for node in nodes {
        out.push_str(&INDENT.repeat(depth));
        out.push_str(&node.name);
        out.push('\n');
        render_level(&node.children, depth + 1, out);
    }
}

pub fn render_paths<'a, I>(paths: I) -> String
where
    I: IntoIterator<Item = &'a str>,
{
    render_tree(&build_tree_from_paths(paths))
}
