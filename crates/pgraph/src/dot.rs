use std::io::{self, Write};

use crate::{Graph, Identity};

/// Writes a deterministic GraphViz DOT rendering of `graph`: vertices in sorted-identity order,
/// edges grouped by their source vertex (also sorted), so two runs over an equal graph byte-for-
/// byte agree (§6). HTML-escapes identities the way GraphViz expects for a DOT label.
pub fn write_dot<V: Identity, E>(graph: &Graph<V, E>, w: &mut impl Write) -> io::Result<()> {
    writeln!(w, "digraph {} {{", escape(graph.name()))?;
    for id in graph.vertices_sorted() {
        let label = graph.vertex(id).expect("id from vertices_sorted()").identity();
        writeln!(w, "    \"{}\";", escape(&label))?;
    }
    for id in graph.vertices_sorted() {
        let from = graph.vertex(id).expect("id from vertices_sorted()").identity();
        let mut edges = graph.outgoing_edges(id);
        edges.sort_by_key(|e| {
            let (_, to) = graph.lookup_edge(*e).expect("edge from outgoing_edges()");
            graph.vertex(to).expect("endpoint vertex").identity()
        });
        for e in edges {
            let (_, to) = graph.lookup_edge(e).expect("edge from outgoing_edges()");
            let to_label = graph.vertex(to).expect("endpoint vertex").identity();
            writeln!(w, "    \"{}\" -> \"{}\";", escape(&from), escape(&to_label))?;
        }
    }
    writeln!(w, "}}")
}

fn escape(s: &str) -> String {
    s.replace('\\', "\\\\").replace('"', "\\\"")
}
