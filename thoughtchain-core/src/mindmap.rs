//! Indentation-structured text to a nested outline.
//!
//! Lossy: every two columns of leading whitespace is one level, odd widths
//! round down and jumps are not repaired.

use std::fmt;

/// One non-blank line of the source text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MindMapNode {
    /// Leading whitespace width in characters
    pub indent: usize,
    pub depth: usize,
    pub label: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MindMap {
    nodes: Vec<MindMapNode>,
}

impl MindMap {
    /// Build an outline from indented text. Never fails.
    pub fn build(text: &str) -> Self {
        let nodes = text
            .lines()
            .filter(|line| !line.trim().is_empty())
            .map(|line| {
                let label = line.trim_start();
                let width = line.chars().count() - label.chars().count();
                MindMapNode {
                    indent: width,
                    depth: width / 2,
                    label: label.trim_end().to_string(),
                }
            })
            .collect();

        Self { nodes }
    }

    pub fn nodes(&self) -> &[MindMapNode] {
        &self.nodes
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

impl fmt::Display for MindMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, node) in self.nodes.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            if node.indent == 0 {
                write!(f, "• {}", node.label)?;
            } else {
                write!(f, "{}└─ {}", "  ".repeat(node.depth), node.label)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nested_outline() {
        let map = MindMap::build("Root\n  Child A\n  Child B\n    Grandchild");

        let depths: Vec<usize> = map.nodes().iter().map(|n| n.depth).collect();
        assert_eq!(depths, vec![0, 1, 1, 2]);
        assert_eq!(map.nodes()[0].label, "Root");
        assert_eq!(map.nodes()[3].label, "Grandchild");

        assert_eq!(
            map.to_string(),
            "• Root\n  └─ Child A\n  └─ Child B\n    └─ Grandchild"
        );
    }

    #[test]
    fn test_blank_lines_skipped() {
        let map = MindMap::build("\nRoot\n   \n\n  Child\n");
        assert_eq!(map.len(), 2);
    }

    #[test]
    fn test_odd_and_jumping_indentation_degrade() {
        let map = MindMap::build("Root\n   three\n        eight\n x");
        let depths: Vec<usize> = map.nodes().iter().map(|n| n.depth).collect();
        assert_eq!(depths, vec![0, 1, 4, 0]);
        // indented by one column: a child marker without nesting
        assert!(map.to_string().ends_with("\n└─ x"));
    }

    #[test]
    fn test_empty_text() {
        let map = MindMap::build("");
        assert!(map.is_empty());
        assert_eq!(map.to_string(), "");
    }
}
