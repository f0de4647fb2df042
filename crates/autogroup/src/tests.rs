use std::any::Any;

use async_trait::async_trait;
use resource::{CheckApplyOutcome, Groupable, Meta, Resource, ResourceError, ResourceGraph, Vertex, WatchEvent};
use tokio::sync::mpsc;

use crate::{auto_group, non_reachable_pairs};

struct LeadingChar(char);

impl Groupable for LeadingChar {
    fn kind(&self) -> &str {
        "leading-char"
    }
    fn as_any(&self) -> &dyn Any {
        self
    }
    fn compare(&self, other: &dyn Groupable) -> bool {
        other.as_any().downcast_ref::<LeadingChar>().map(|o| o.0 == self.0).unwrap_or(false)
    }
}

struct Groupee {
    name: String,
    meta: Meta,
    key: LeadingChar,
}

impl Groupee {
    fn new(name: &str) -> Self {
        let key = LeadingChar(name.chars().next().expect("non-empty name"));
        Self { name: name.to_string(), meta: Meta::default(), key }
    }
}

#[async_trait]
impl Resource for Groupee {
    fn name(&self) -> &str {
        &self.name
    }
    fn meta(&self) -> &Meta {
        &self.meta
    }
    async fn watch(&mut self, _events: mpsc::Sender<WatchEvent>) -> Result<(), ResourceError> {
        std::future::pending().await
    }
    async fn check_apply(&mut self, _apply: bool) -> Result<CheckApplyOutcome, ResourceError> {
        Ok(CheckApplyOutcome::UpToDate)
    }
    fn groupable(&self) -> Option<&dyn Groupable> {
        Some(&self.key)
    }
}

fn add(graph: &mut ResourceGraph, name: &str) -> pgraph::VertexId {
    graph.add_vertex(Vertex::new(Groupee::new(name)))
}

#[test]
fn s1_groups_two_unconnected_same_kind_vertices() {
    let mut g = ResourceGraph::new("g").unwrap();
    add(&mut g, "a1");
    add(&mut g, "a2");

    let merges = auto_group(&mut g, non_reachable_pairs);
    assert_eq!(merges, 1);
    assert_eq!(g.len(), 1);
    let only = g.vertices()[0];
    assert_eq!(g.vertex(only).unwrap().resource.name(), "a1,a2");
}

#[test]
fn s2_groups_sources_sharing_a_sink() {
    let mut g = ResourceGraph::new("g").unwrap();
    let a1 = add(&mut g, "a1");
    let a2 = add(&mut g, "a2");
    let b1 = add(&mut g, "b1");
    g.add_edge(a1, b1, resource::Edge::new("e1")).unwrap();
    g.add_edge(a2, b1, resource::Edge::new("e2")).unwrap();

    let merges = auto_group(&mut g, non_reachable_pairs);
    assert_eq!(merges, 1);
    assert_eq!(g.len(), 2);

    let merged = g.find_vertex("a1,a2").expect("a1 and a2 fused");
    let edge = g.find_edge(merged, b1).expect("fused edge to b1");
    assert_eq!(g.edge(edge).unwrap().name, "e1,e2");
}

#[test]
fn s3_groups_a_shared_middle_layer() {
    let mut g = ResourceGraph::new("g").unwrap();
    let a1 = add(&mut g, "a1");
    let b1 = add(&mut g, "b1");
    let b2 = add(&mut g, "b2");
    let c1 = add(&mut g, "c1");
    g.add_edge(a1, b1, resource::Edge::new("e1")).unwrap();
    g.add_edge(a1, b2, resource::Edge::new("e2")).unwrap();
    g.add_edge(b1, c1, resource::Edge::new("e3")).unwrap();
    g.add_edge(b2, c1, resource::Edge::new("e4")).unwrap();

    let merges = auto_group(&mut g, non_reachable_pairs);
    assert_eq!(merges, 1);
    assert_eq!(g.len(), 3);

    let merged = g.find_vertex("b1,b2").expect("b1 and b2 fused");
    let in_edge = g.find_edge(a1, merged).expect("a1 -> merged");
    let out_edge = g.find_edge(merged, c1).expect("merged -> c1");
    assert_eq!(g.edge(in_edge).unwrap().name, "e1,e2");
    assert_eq!(g.edge(out_edge).unwrap().name, "e3,e4");
}

#[test]
fn s4_groups_sources_merged_through_an_existing_path() {
    let mut g = ResourceGraph::new("g").unwrap();
    let a1 = add(&mut g, "a1");
    let a2 = add(&mut g, "a2");
    let b1 = add(&mut g, "b1");
    let c1 = add(&mut g, "c1");
    g.add_edge(a1, b1, resource::Edge::new("e1")).unwrap();
    g.add_edge(b1, c1, resource::Edge::new("e2")).unwrap();
    g.add_edge(a2, c1, resource::Edge::new("e3")).unwrap();

    let merges = auto_group(&mut g, non_reachable_pairs);
    assert_eq!(merges, 1);
    assert_eq!(g.len(), 3);

    let merged = g.find_vertex("a1,a2").expect("a1 and a2 fused");
    let first = g.find_edge(merged, b1).expect("merged -> b1");
    let second = g.find_edge(b1, c1).expect("b1 -> c1");
    assert_eq!(g.edge(first).unwrap().name, "e1,e3");
    assert_eq!(g.edge(second).unwrap().name, "e2,e3");
}

#[test]
fn never_groups_across_existing_dependency() {
    let mut g = ResourceGraph::new("g").unwrap();
    // both leading-char 'a' but directly dependent: must never merge (non_reachable_pairs skips).
    let a1 = add(&mut g, "a1");
    let a2 = add(&mut g, "a2");
    g.add_edge(a1, a2, resource::Edge::new("e1")).unwrap();

    let merges = auto_group(&mut g, non_reachable_pairs);
    assert_eq!(merges, 0);
    assert_eq!(g.len(), 2);
}
