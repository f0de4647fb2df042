use super::*;

impl Identity for String {
    fn identity(&self) -> String {
        self.clone()
    }
}

fn linear_graph() -> (Graph<String, String>, VertexId, VertexId, VertexId) {
    let mut g = Graph::new("g").unwrap();
    let a = g.add_vertex("a".to_string());
    let b = g.add_vertex("b".to_string());
    let c = g.add_vertex("c".to_string());
    g.add_edge(a, b, "e1".to_string()).unwrap();
    g.add_edge(b, c, "e2".to_string()).unwrap();
    (g, a, b, c)
}

#[test]
fn rejects_empty_name() {
    assert!(matches!(
        Graph::<String, String>::new(""),
        Err(GraphError::EmptyName)
    ));
}

#[test]
fn add_vertex_replaces_same_identity() {
    let mut g: Graph<String, String> = Graph::new("g").unwrap();
    let a1 = g.add_vertex("a".to_string());
    let a2 = g.add_vertex("a".to_string());
    assert_eq!(a1, a2);
    assert_eq!(g.len(), 1);
}

#[test]
fn add_edge_rejects_self_edge() {
    let mut g: Graph<String, String> = Graph::new("g").unwrap();
    let a = g.add_vertex("a".to_string());
    assert!(matches!(
        g.add_edge(a, a, "e".to_string()),
        Err(GraphError::SelfEdge(_))
    ));
}

#[test]
fn add_edge_overwrites_parallel_edge() {
    let mut g: Graph<String, String> = Graph::new("g").unwrap();
    let a = g.add_vertex("a".to_string());
    let b = g.add_vertex("b".to_string());
    g.add_edge(a, b, "first".to_string()).unwrap();
    g.add_edge(a, b, "second".to_string()).unwrap();
    assert_eq!(g.out_degree(a), 1);
    let e = g.find_edge(a, b).unwrap();
    assert_eq!(g.edge(e).unwrap(), "second");
}

#[test]
fn topological_sort_respects_edges_and_is_deterministic() {
    let (g, a, b, c) = linear_graph();
    let order = topo::topological_sort(&g).unwrap();
    let pos = |id: VertexId| order.iter().position(|x| *x == id).unwrap();
    assert!(pos(a) < pos(b));
    assert!(pos(b) < pos(c));

    // Two independent zero-in-degree vertices must always come out name-sorted.
    let mut h: Graph<String, String> = Graph::new("h").unwrap();
    h.add_vertex("zed".to_string());
    h.add_vertex("alpha".to_string());
    let order1 = topo::topological_sort(&h).unwrap();
    let order2 = topo::topological_sort(&h).unwrap();
    assert_eq!(order1, order2);
    let first = h.vertex(order1[0]).unwrap();
    assert_eq!(first, "alpha");
}

#[test]
fn topological_sort_detects_cycle() {
    let mut g: Graph<String, String> = Graph::new("g").unwrap();
    let a = g.add_vertex("a".to_string());
    let b = g.add_vertex("b".to_string());
    g.add_edge(a, b, "e1".to_string()).unwrap();
    g.add_edge(b, a, "e2".to_string()).unwrap();
    assert!(matches!(topo::topological_sort(&g), Err(GraphError::Cyclic)));
}

#[test]
fn reachability_returns_shortest_path() {
    let (g, a, _b, c) = linear_graph();
    let path = reach::reachability(&g, a, c).unwrap();
    assert_eq!(path, vec![a, g.find_vertex("b").unwrap(), c]);
}

#[test]
fn reachability_empty_when_unreachable() {
    let mut g: Graph<String, String> = Graph::new("g").unwrap();
    let a = g.add_vertex("a".to_string());
    let b = g.add_vertex("b".to_string());
    assert_eq!(reach::reachability(&g, a, b).unwrap(), Vec::new());
}

#[test]
fn dfs_visits_reachable_vertices_in_sorted_order() {
    let (g, a, _b, _c) = linear_graph();
    let order = walk::dfs(&g, a);
    let labels: Vec<_> = order.iter().map(|id| g.vertex(*id).unwrap().clone()).collect();
    assert_eq!(labels, vec!["a", "b", "c"]);
}

#[test]
fn disconnected_components_groups_by_weak_connectivity() {
    let mut g: Graph<String, String> = Graph::new("g").unwrap();
    let a = g.add_vertex("a".to_string());
    let b = g.add_vertex("b".to_string());
    g.add_edge(a, b, "e".to_string()).unwrap();
    g.add_vertex("z".to_string());
    let components = walk::disconnected_components(&g);
    assert_eq!(components.len(), 2);
    assert_eq!(components[0].len(), 2);
    assert_eq!(components[1].len(), 1);
}

#[test]
fn vertex_merge_rehomes_edges_and_unions_payload() {
    // x -> v2 -> y, plus a standalone v1; merging v2 into v1 should leave x -> v1 -> y.
    let mut g: Graph<String, String> = Graph::new("g").unwrap();
    let x = g.add_vertex("x".to_string());
    let v1 = g.add_vertex("v1".to_string());
    let v2 = g.add_vertex("v2".to_string());
    let y = g.add_vertex("y".to_string());
    g.add_edge(x, v2, "e1".to_string()).unwrap();
    g.add_edge(v2, y, "e2".to_string()).unwrap();

    merge::vertex_merge(
        &mut g,
        v1,
        v2,
        merge::MergeFns {
            absorb: |a: &mut String, b: String| *a = format!("{a},{b}"),
            edge_merge_fn: |a: &String, b: &String| format!("{a}+{b}"),
        },
    )
    .unwrap();

    assert_eq!(g.vertex(v1).unwrap(), "v1,v2");
    assert!(g.find_vertex("v2").is_none());
    assert!(g.find_edge(x, v1).is_some());
    assert!(g.find_edge(v1, y).is_some());
}

#[test]
fn vertex_merge_rejects_cycle() {
    // a -> b -> a would become a cycle once merged with a third vertex forced into the loop.
    let mut g: Graph<String, String> = Graph::new("g").unwrap();
    let a = g.add_vertex("a".to_string());
    let b = g.add_vertex("b".to_string());
    let c = g.add_vertex("c".to_string());
    g.add_edge(a, b, "e1".to_string()).unwrap();
    g.add_edge(b, c, "e2".to_string()).unwrap();
    g.add_edge(c, a, "e3".to_string()).unwrap();

    let before = g.len();
    let result = merge::vertex_merge(
        &mut g,
        a,
        b,
        merge::MergeFns {
            vertex_merge_fn: |x: &String, y: &String| format!("{x},{y}"),
            edge_merge_fn: |x: &String, y: &String| format!("{x}+{y}"),
        },
    );
    assert!(matches!(result, Err(GraphError::WouldCreateCycle)));
    // graph must be untouched on rejection
    assert_eq!(g.len(), before);
    assert!(g.find_vertex("a").is_some());
    assert!(g.find_vertex("b").is_some());
}

#[test]
fn write_dot_is_deterministic() {
    let (g, ..) = linear_graph();
    let mut out1 = Vec::new();
    let mut out2 = Vec::new();
    dot::write_dot(&g, &mut out1).unwrap();
    dot::write_dot(&g, &mut out2).unwrap();
    assert_eq!(out1, out2);
    let text = String::from_utf8(out1).unwrap();
    assert!(text.contains("\"a\" -> \"b\";"));
}

#[test]
fn compare_detects_structural_equality() {
    let (g1, ..) = linear_graph();
    let (g2, ..) = linear_graph();
    assert!(g1.compare(&g2, |a, b| a == b, |a, b| a == b));

    let mut g3: Graph<String, String> = Graph::new("g").unwrap();
    let a = g3.add_vertex("a".to_string());
    g3.add_vertex("b".to_string());
    let _ = a;
    assert!(!g1.compare(&g3, |a, b| a == b, |a, b| a == b));
}
