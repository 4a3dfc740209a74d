//! Whole-pipeline tests over hand-built reference graphs.

mod scenarios;

use crate::analysis;
use crate::ir::ReferenceGraph;

#[test]
fn graphs_round_trip_through_json() {
    let mut graph = ReferenceGraph::new();
    let m = graph.new_method("A.foo(O)V", false);
    let p = graph.new_parameter(m, "p").unwrap();
    let f = graph.new_field("A.f");
    let v = graph.new_local(m, "v").unwrap();
    graph.field_write(m, p, f, v).unwrap();

    let text = graph.to_json().unwrap();
    let back = ReferenceGraph::from_json(&text).unwrap();
    assert_eq!(graph, back);
}

#[test]
fn tags_survive_serialization() {
    let mut graph = ReferenceGraph::new();
    let m = graph.new_method("A.foo(O)V", false);
    let p = graph.new_parameter(m, "p").unwrap();
    let f = graph.new_field("A.f");
    let v = graph.new_local(m, "v").unwrap();
    graph.field_write(m, p, f, v).unwrap();
    analysis::infer(&mut graph).unwrap();

    let text = graph.to_json().unwrap();
    let back = ReferenceGraph::from_json(&text).unwrap();
    assert_eq!(graph, back);
    assert_eq!(graph.tag(p), back.tag(p));
}
