use crate::RBTree;
use crate::node::{Link, Node};
use crate::utils::Side;
use core::fmt;
use core::fmt::Write;
use core::ptr::NonNull;

/// Renders an [`RBTree`] in [graphviz format](https://graphviz.org/doc/info/lang.html).
///
/// Nodes are filled with their color, empty children of inner nodes are drawn as small black
/// points so the shape of the tree stays visible.
pub struct Dot<'a, K, C> {
    pub(crate) tree: &'a RBTree<K, C>,
}

/// A graphviz identifier derived from a node's address.
///
/// Identifiers must not start with a digit, empty-child markers append their side to it.
#[derive(Clone, Copy)]
struct NodeId(usize);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "n{:x}", self.0)
    }
}

fn node_id<K>(node: NonNull<Node<K>>) -> NodeId {
    NodeId(node.as_ptr().addr())
}

impl<K: fmt::Debug, C> Dot<'_, K, C> {
    #[allow(
        clippy::only_used_in_recursion,
        reason = "need to ensure tree is borrowed for the entire time we operate on it"
    )]
    fn node_fmt(&self, f: &mut fmt::Formatter<'_>, node: NonNull<Node<K>>) -> fmt::Result {
        // Safety: nodes reachable from the root are live while the tree is borrowed
        let (node_links, key) = unsafe { (Node::links(node), Node::key(node)) };
        let id = node_id(node);

        writeln!(
            f,
            r#"    {id} [label="{}", style=filled, fillcolor={color}, fontcolor={font}];"#,
            Label(key),
            color = node_links.color(),
            font = if node_links.is_red() { "black" } else { "white" },
        )?;

        if node_links.is_leaf() {
            return Ok(());
        }

        let mut print_side = |side: Side, child: Link<K>| -> fmt::Result {
            if let Some(child) = child {
                writeln!(f, r#"    {id} -> {} [label="{side}"];"#, node_id(child))?;
                self.node_fmt(f, child)
            } else {
                writeln!(f, "    {id}{side} [shape=point];")?;
                writeln!(f, r#"    {id} -> {id}{side} [label="{side}"];"#)
            }
        };
        print_side(Side::Left, node_links.left())?;
        print_side(Side::Right, node_links.right())
    }
}

/// The `Debug` output of a key with double quotes and backslashes escaped, so it can be used as
/// a graphviz label.
struct Label<'a, K>(&'a K);

impl<K: fmt::Debug> fmt::Display for Label<'_, K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        struct EscapeWriter<'a, 'b>(&'a mut fmt::Formatter<'b>);

        impl fmt::Write for EscapeWriter<'_, '_> {
            fn write_str(&mut self, s: &str) -> fmt::Result {
                for c in s.chars() {
                    if matches!(c, '"' | '\\') {
                        self.0.write_char('\\')?;
                    }
                    self.0.write_char(c)?;
                }
                Ok(())
            }
        }

        write!(EscapeWriter(f), "{:?}", self.0)
    }
}

impl<K: fmt::Debug, C> fmt::Display for Dot<'_, K, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "digraph {{")?;
        if let Some(root) = self.tree.root {
            self.node_fmt(f, root)?;
        }
        f.write_str("}")
    }
}

impl<K: fmt::Debug, C> fmt::Debug for Dot<'_, K, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}
