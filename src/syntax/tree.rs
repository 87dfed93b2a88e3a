//! Syntax tree built from the matcher's token log.
//!
//! Tokens arrive in post-order: a rule's token is logged after the tokens of everything it
//! matched. Reduction keeps a stack of finished nodes; each new token pops every node whose
//! span it contains, adopts them as children in source order, and is pushed in turn. Once the
//! log is exhausted the last pushed node is the root.

use std::io;

use serde::Serialize;

use super::{Rule, Span, Token};

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    pub rule: Rule,
    pub span: Span,
    pub first_child: Option<NodeId>,
    pub next_sibling: Option<NodeId>,
}

#[derive(Debug, Clone, Default)]
pub struct SyntaxTree {
    nodes: Vec<Node>,
    root: Option<NodeId>,
}

impl SyntaxTree {
    pub fn build(tokens: &[Token]) -> Self {
        let mut nodes: Vec<Node> = Vec::with_capacity(tokens.len());
        let mut stack: Vec<NodeId> = Vec::new();

        for token in tokens.iter().filter(|t| !t.span.is_empty()) {
            let id = NodeId(nodes.len());
            nodes.push(Node {
                rule: token.rule,
                span: token.span,
                first_child: None,
                next_sibling: None,
            });

            while let Some(&top) = stack.last() {
                if !token.span.contains(&nodes[top.0].span) {
                    break;
                }
                stack.pop();
                // Popped in reverse source order, so each one goes to the front.
                nodes[top.0].next_sibling = nodes[id.0].first_child;
                nodes[id.0].first_child = Some(top);
            }
            stack.push(id);
        }

        SyntaxTree {
            root: stack.last().copied(),
            nodes,
        }
    }

    pub fn root(&self) -> Option<NodeId> {
        self.root
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    pub fn rule(&self, id: NodeId) -> Rule {
        self.nodes[id.0].rule
    }

    pub fn span(&self, id: NodeId) -> Span {
        self.nodes[id.0].span
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn children(&self, id: NodeId) -> Children<'_> {
        Children {
            tree: self,
            next: self.nodes[id.0].first_child,
        }
    }

    /// The first child of `id` whose rule is not `Spacing`.
    pub fn first_significant_child(&self, id: NodeId) -> Option<NodeId> {
        self.children(id).find(|child| self.rule(*child) != Rule::Spacing)
    }

    /// The span of `id` without the `Spacing` (blanks and comments) that opens or closes it,
    /// however deeply nested.
    pub fn significant_span(&self, id: NodeId) -> Span {
        let Span { mut start, mut end } = self.span(id);

        let mut node = id;
        while let Some(first) = self.node(node).first_child {
            if self.span(first).start != start {
                break;
            }
            if self.rule(first) == Rule::Spacing {
                start = self.span(first).end;
                break;
            }
            node = first;
        }

        let mut node = id;
        while let Some(last) = self.children(node).last() {
            if self.span(last).end != end {
                break;
            }
            if self.rule(last) == Rule::Spacing {
                end = self.span(last).start;
                break;
            }
            node = last;
        }

        Span::new(start, end.max(start))
    }

    pub fn text<'s>(&self, id: NodeId, source: &'s str) -> &'s str {
        let span = self.span(id);
        &source[span.start..span.end]
    }

    /// Visits every node in pre-order along with its depth (the root is depth 0).
    pub fn walk(&self, mut visit: impl FnMut(NodeId, &Node, usize)) {
        let Some(root) = self.root else {
            return;
        };
        let mut pending = vec![(root, 0usize)];
        while let Some((id, depth)) = pending.pop() {
            visit(id, self.node(id), depth);
            let children: Vec<NodeId> = self.children(id).collect();
            pending.extend(children.into_iter().rev().map(|child| (child, depth + 1)));
        }
    }

    /// Writes one line per node: indentation by depth, the rule name and the quoted text.
    pub fn write_to<W: io::Write>(&self, source: &str, out: &mut W) -> io::Result<()> {
        let mut result = Ok(());
        self.walk(|id, node, depth| {
            if result.is_ok() {
                result = writeln!(
                    out,
                    "{:indent$}{} {:?}",
                    "",
                    node.rule,
                    self.text(id, source),
                    indent = depth
                );
            }
        });
        result
    }

    pub fn to_pretty_string(&self, source: &str) -> String {
        let mut buf = Vec::new();
        // Writing into a Vec cannot fail.
        let _ = self.write_to(source, &mut buf);
        String::from_utf8_lossy(&buf).into_owned()
    }

    /// An owned, serializable copy of the tree rooted at `id`.
    pub fn dump(&self, id: NodeId, source: &str) -> TreeDump {
        TreeDump {
            rule: self.rule(id),
            text: self.text(id, source).to_string(),
            span: self.span(id),
            children: self
                .children(id)
                .map(|child| self.dump(child, source))
                .collect(),
        }
    }
}

pub struct Children<'t> {
    tree: &'t SyntaxTree,
    next: Option<NodeId>,
}

impl Iterator for Children<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let current = self.next?;
        self.next = self.tree.node(current).next_sibling;
        Some(current)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TreeDump {
    pub rule: Rule,
    pub text: String,
    pub span: Span,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<TreeDump>,
}
