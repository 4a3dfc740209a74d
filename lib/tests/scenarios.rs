//! End-to-end inference over small translated programs.

use crate::analysis::{infer, infer_with, Options};
use crate::ir::{Mutability, ReferenceGraph};
use crate::summary::Summary;

/// class C { Date a;
///   void foo() { Date b = new Date(); this.a = b; b.hour = 1; }
///   Date read() { return this.a; } }
fn aliased_field_program() -> ReferenceGraph {
    let mut graph = ReferenceGraph::new();
    let a = graph.new_field("C.a");
    let hour = graph.new_field("Date.hour");

    let foo = graph.new_method("C.foo()V", false);
    let this_foo = graph.method(foo).unwrap().receiver().unwrap();
    let b = graph.new_local(foo, "b").unwrap();
    let date = graph.new_instantiation(foo, "new Date()").unwrap();
    let one = graph.new_literal(foo, "1").unwrap();
    graph.assign(foo, b, date).unwrap();
    graph.field_write(foo, this_foo, a, b).unwrap();
    graph.field_write(foo, b, hour, one).unwrap();

    let read = graph.new_method("C.read()LDate;", false);
    let this_read = graph.method(read).unwrap().receiver().unwrap();
    let ret = graph.new_return(read, "ret").unwrap();
    graph.field_read(read, ret, this_read, a).unwrap();

    graph
}

#[test]
fn aliased_then_mutated_field_ends_polyread() {
    let mut graph = aliased_field_program();
    let inference = infer(&mut graph).unwrap();

    let a = graph
        .sites()
        .find(|site| site.name() == "C.a")
        .unwrap()
        .index();
    let hour = graph
        .sites()
        .find(|site| site.name() == "Date.hour")
        .unwrap()
        .index();
    // the alias is mutated after the store, so a cannot be READONLY;
    // the int field only ever receives fresh values
    assert_eq!(graph.tag(a), Some(Mutability::Polyread));
    assert_eq!(graph.tag(hour), Some(Mutability::Readonly));

    // the plain reader pays nothing for foo's mutation
    let read = graph
        .methods()
        .find(|method| method.signature() == "C.read()LDate;")
        .unwrap();
    assert_eq!(graph.tag(read.receiver().unwrap()), Some(Mutability::Readonly));
    assert!(inference.is_pure(read.index()));
}

/// class A { B g;
///   void foo1(B p1, B p2) { p1.h = v1; }
///   void foo2(B q1, B q2) { q2.h = v2; }
///   void bar1() { B fresh = new B(); B t = this.g; this.foo1(fresh, t); }
///   void bar2() { B fresh = new B(); B t = this.g; this.foo2(fresh, t); } }
fn parameter_mutation_program(swap_edge_order: bool) -> ReferenceGraph {
    let mut graph = ReferenceGraph::new();
    let g = graph.new_field("A.g");
    let h = graph.new_field("B.h");

    let foo1 = graph.new_method("A.foo1(BB)V", false);
    let p1 = graph.new_parameter(foo1, "p1").unwrap();
    graph.new_parameter(foo1, "p2").unwrap();
    let v1 = graph.new_local(foo1, "v1").unwrap();

    let foo2 = graph.new_method("A.foo2(BB)V", false);
    graph.new_parameter(foo2, "q1").unwrap();
    let q2 = graph.new_parameter(foo2, "q2").unwrap();
    let v2 = graph.new_local(foo2, "v2").unwrap();

    let bar1 = graph.new_method("A.bar1()V", false);
    let this_bar1 = graph.method(bar1).unwrap().receiver().unwrap();
    let fresh1 = graph.new_instantiation(bar1, "new B()").unwrap();
    let t1 = graph.new_local(bar1, "t").unwrap();
    let call1 = graph
        .new_call("A.foo1(BB)V", Some(this_bar1), vec![fresh1, t1], vec![foo1])
        .unwrap();

    let bar2 = graph.new_method("A.bar2()V", false);
    let this_bar2 = graph.method(bar2).unwrap().receiver().unwrap();
    let fresh2 = graph.new_instantiation(bar2, "new B()").unwrap();
    let t2 = graph.new_local(bar2, "t").unwrap();
    let call2 = graph
        .new_call("A.foo2(BB)V", Some(this_bar2), vec![fresh2, t2], vec![foo2])
        .unwrap();

    if swap_edge_order {
        graph.call(bar2, None, call2).unwrap();
        graph.field_read(bar2, t2, this_bar2, g).unwrap();
        graph.call(bar1, None, call1).unwrap();
        graph.field_read(bar1, t1, this_bar1, g).unwrap();
        graph.field_write(foo2, q2, h, v2).unwrap();
        graph.field_write(foo1, p1, h, v1).unwrap();
    } else {
        graph.field_write(foo1, p1, h, v1).unwrap();
        graph.field_write(foo2, q2, h, v2).unwrap();
        graph.field_read(bar1, t1, this_bar1, g).unwrap();
        graph.call(bar1, None, call1).unwrap();
        graph.field_read(bar2, t2, this_bar2, g).unwrap();
        graph.call(bar2, None, call2).unwrap();
    }
    graph
}

fn receiver_of(graph: &ReferenceGraph, signature: &str) -> usize {
    graph
        .methods()
        .find(|method| method.signature() == signature)
        .unwrap()
        .receiver()
        .unwrap()
}

#[test]
fn only_the_field_mutating_call_costs_its_receiver() {
    let mut graph = parameter_mutation_program(false);
    let inference = infer(&mut graph).unwrap();

    let this_bar1 = receiver_of(&graph, "A.bar1()V");
    let this_bar2 = receiver_of(&graph, "A.bar2()V");
    // bar1 hands the callee a fresh object to mutate
    assert_eq!(graph.tag(this_bar1), Some(Mutability::Readonly));
    // bar2 hands it an alias of this.g
    assert!(matches!(
        graph.tag(this_bar2),
        Some(Mutability::Polyread) | Some(Mutability::Mutable)
    ));

    let bar1 = graph
        .methods()
        .find(|method| method.signature() == "A.bar1()V")
        .unwrap()
        .index();
    let bar2 = graph
        .methods()
        .find(|method| method.signature() == "A.bar2()V")
        .unwrap()
        .index();
    assert!(inference.is_pure(bar1));
    assert!(!inference.is_pure(bar2));
}

#[test]
fn edge_insertion_order_does_not_change_tags() {
    let mut forward = parameter_mutation_program(false);
    let mut reversed = parameter_mutation_program(true);
    infer(&mut forward).unwrap();
    infer(&mut reversed).unwrap();
    assert_eq!(forward.tags(), reversed.tags());
}

#[test]
fn rerunning_inference_is_stable() {
    let mut graph = parameter_mutation_program(false);
    infer(&mut graph).unwrap();
    let first = graph.tags().clone();
    infer(&mut graph).unwrap();
    assert_eq!(&first, graph.tags());
}

#[test]
fn rounds_stay_within_the_shrink_budget() {
    let mut graph = parameter_mutation_program(false);
    let inference = infer(&mut graph).unwrap();
    let sites = graph.sites().count();
    assert!(inference.rounds() <= 3 * sites + 1);
}

#[test]
fn static_writes_pin_methods_mutable() {
    /* class A { static B S; B local()
     *   { B x = new B(); S = x; return x; } } */
    let mut graph = ReferenceGraph::new();
    let s = graph.new_static_field("A.S");
    let m = graph.new_method("A.local()LB;", false);
    let x = graph.new_local(m, "x").unwrap();
    let fresh = graph.new_instantiation(m, "new B()").unwrap();
    let ret = graph.new_return(m, "ret").unwrap();
    graph.assign(m, x, fresh).unwrap();
    graph.static_write(m, s, x).unwrap();
    graph.assign(m, ret, x).unwrap();

    let inference = infer(&mut graph).unwrap();
    assert_eq!(graph.tag(m), Some(Mutability::Mutable));
    assert!(!inference.is_pure(m));
}

#[test]
fn constant_returning_method_is_pure() {
    /* int answer() { return 42; } */
    let mut graph = ReferenceGraph::new();
    let m = graph.new_method("A.answer()I", false);
    let ret = graph.new_return(m, "ret").unwrap();
    let forty_two = graph.new_literal(m, "42").unwrap();
    graph.assign(m, ret, forty_two).unwrap();

    let inference = infer(&mut graph).unwrap();
    assert!(inference.is_pure(m));
}

#[test]
fn closed_runs_never_leave_untyped_sites() {
    for mut graph in [
        aliased_field_program(),
        parameter_mutation_program(false),
    ] {
        let inference = infer(&mut graph).unwrap();
        assert!(inference.untyped().is_empty());
        assert!(inference.is_sane());
    }
}

#[test]
fn a_run_seeded_with_its_own_summary_reproduces_itself() {
    let mut graph = parameter_mutation_program(false);
    let inference = infer(&mut graph).unwrap();
    let tags = graph.tags().clone();

    let text = inference.summary().to_string();
    let seeds = vec![Summary::parse(&text).unwrap()];
    let mut reseeded = parameter_mutation_program(false);
    infer_with(&mut reseeded, &seeds, &Options::new()).unwrap();
    assert_eq!(&tags, reseeded.tags());
}
