//! Integration Tests for the Reactive Runtime
//!
//! These tests drive tracked state, effects, computed values and both
//! structural bindings together through the public API, against an
//! in-memory host tree and a manually ticked frame host.

use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::time::Duration;

use serde_json::json;
use trellis_core::dom::{Host, ManualFrames, MemoryDom, NodeId, Transition, TransitionPhase};
use trellis_core::reactive::{Component, EffectGroup, Plain, Runtime, Tracked, Value};
use trellis_core::reconcile::{
    bind_for, bind_if, expression, template, ForBinding, IfBinding, Scope,
};
use trellis_core::{ReactiveError, RuntimeConfig};

fn setup() -> (Runtime, Rc<ManualFrames>, Rc<MemoryDom>, NodeId) {
    let frames = ManualFrames::new();
    let rt = Runtime::new(frames.clone());
    let dom = MemoryDom::new();
    let anchor = dom.create_comment("anchor");
    dom.append_child(dom.root(), anchor);
    (rt, frames, dom, anchor)
}

/// `<li>` per item showing the item's `name` field through its own effect.
fn named_rows(rt: &Runtime, dom: &Rc<MemoryDom>, list: &Value) -> ForBinding {
    let list = list.clone();
    let dom = dom.clone();
    let rt = rt.clone();
    ForBinding::new(
        "item",
        expression(move |_| Ok(list.clone())),
        template(move |scope| {
            let li = dom.create_element("li");
            let text = dom.create_text("");
            dom.append_child(li, text);
            let scope = scope.clone();
            let dom = dom.clone();
            rt.create_effect(move || {
                let name = match scope.get("item") {
                    Some(Value::Object(item)) => item.get("name").to_display_string(),
                    Some(other) => other.to_display_string(),
                    None => String::new(),
                };
                dom.set_text(text, &name);
            });
            Ok(vec![li])
        }),
    )
}

/// Test that repeated writes before a frame schedule each reader once.
#[test]
fn writes_before_a_frame_coalesce_into_one_run() {
    let (rt, frames, _, _) = setup();
    let state = rt.tracked(json!({"first": "Ada", "last": "Lovelace"})).unwrap();
    let runs = Rc::new(Cell::new(0));

    let s = state.clone();
    let r = runs.clone();
    rt.create_effect(move || {
        s.get("first");
        s.get("last");
        r.set(r.get() + 1);
    });

    state.set("first", "Grace").unwrap();
    state.set("last", "Hopper").unwrap();
    state.set("first", "Alan").unwrap();
    assert_eq!(runs.get(), 1);

    frames.tick();
    assert_eq!(runs.get(), 2);
    assert_eq!(frames.tick(), 0);
}

/// Test that identical writes never notify.
#[test]
fn same_value_writes_do_not_notify() {
    let (rt, frames, _, _) = setup();
    let shared = rt.tracked(json!({"tags": []})).unwrap();
    let state = rt.tracked(json!({"n": 1, "label": "x"})).unwrap();
    state.set("ref", shared.clone()).unwrap();

    let s = state.clone();
    rt.define_computed("reads_all", move || {
        Value::from(s.get("n").as_number().unwrap_or(0.0) + s.len() as f64)
    });
    rt.define_computed("constant", || Value::from(42));
    rt.computed("reads_all").unwrap();
    rt.computed("constant").unwrap();

    assert!(!state.set("n", 1).unwrap());
    assert!(!state.set("label", "x").unwrap());
    assert!(!state.set("ref", shared).unwrap());
    assert!(!rt.has_pending());

    rt.computed("reads_all").unwrap();
    rt.computed("constant").unwrap();
    assert_eq!(rt.computed_evaluations("reads_all"), 1);
    assert_eq!(rt.computed_evaluations("constant"), 1);
    assert_eq!(frames.pending_frames(), 0);
}

/// Test that a computed is derived once per version of its inputs.
#[test]
fn computed_derives_once_per_input_version() {
    let (rt, frames, _, _) = setup();
    let cart = rt
        .tracked(json!({"items": [{"price": 3, "qty": 1}, {"price": 5, "qty": 2}]}))
        .unwrap();

    let c = cart.clone();
    rt.define_computed("total", move || {
        let items = c.get("items");
        let total: f64 = items
            .as_object()
            .map(|list| {
                list.items()
                    .iter()
                    .filter_map(|row| row.as_object().cloned())
                    .map(|row| {
                        row.get("price").as_number().unwrap_or(0.0)
                            * row.get("qty").as_number().unwrap_or(0.0)
                    })
                    .sum()
            })
            .unwrap_or(0.0);
        Value::from(total)
    });

    for _ in 0..10 {
        assert_eq!(rt.computed("total").unwrap(), Value::from(13));
    }
    assert_eq!(rt.computed_evaluations("total"), 1);

    let first_row = cart.get("items").as_object().unwrap().at(0);
    first_row.as_object().unwrap().set("qty", 4).unwrap();
    for _ in 0..10 {
        assert_eq!(rt.computed("total").unwrap(), Value::from(22));
    }
    assert_eq!(rt.computed_evaluations("total"), 2);

    cart.get("items").as_object().unwrap().push(json!({"price": 1, "qty": 1})).unwrap();
    assert_eq!(rt.computed("total").unwrap(), Value::from(23));
    assert_eq!(rt.computed_evaluations("total"), 3);
    assert_eq!(frames.pending_frames(), 0);
}

/// Test the `[a, b, c, d] -> [a, c, b, d]` reorder moves one instance.
#[test]
fn swapping_two_neighbours_moves_one_instance() {
    let (rt, frames, dom, anchor) = setup();
    let list = rt.wrap(json!([
        {"name": "a"}, {"name": "b"}, {"name": "c"}, {"name": "d"}
    ]));
    let handle = bind_for(&rt, dom.clone(), anchor, &Scope::new(), named_rows(&rt, &dom, &list));
    assert_eq!(dom.text_content(dom.root()), "abcd");
    let nodes = handle.nodes();
    dom.reset_stats();

    let items = list.as_object().unwrap();
    let b: Tracked = items.peek_at(1).as_object().cloned().unwrap();
    let c: Tracked = items.peek_at(2).as_object().cloned().unwrap();
    items.splice(1, 2, vec![c, b]).unwrap();
    frames.tick();

    assert_eq!(dom.text_content(dom.root()), "acbd");
    let report = handle.last_report();
    assert_eq!((report.created, report.removed, report.reused), (0, 0, 4));
    assert_eq!(report.moved, 1);
    assert_eq!(dom.stats().moves, 1);
    assert_eq!(dom.stats().inserts + dom.stats().removes, 0);
    assert_eq!(handle.nodes(), vec![nodes[0], nodes[2], nodes[1], nodes[3]]);
}

/// Test that re-rendering an unchanged list touches nothing.
#[test]
fn unchanged_source_rerender_is_a_no_op() {
    let (rt, _, dom, anchor) = setup();
    let list = rt.wrap(json!([{"name": "a"}, {"name": "b"}, "plain", 7]));
    let handle = bind_for(&rt, dom.clone(), anchor, &Scope::new(), named_rows(&rt, &dom, &list));
    let nodes = handle.nodes();
    let effects = rt.effect_count();
    dom.reset_stats();

    assert!(handle.effect().run_now());

    let report = handle.last_report();
    assert_eq!(report.reused, 4);
    assert_eq!(report.created + report.removed + report.moved + report.refreshed, 0);
    assert_eq!(dom.stats().total(), 0);
    assert_eq!(handle.nodes(), nodes);
    assert_eq!(rt.effect_count(), effects);
}

/// Test the id-keyed reverse scenario.
#[test]
fn reversing_an_id_keyed_list_is_one_move() {
    let (rt, frames, dom, anchor) = setup();
    let state = rt
        .tracked(json!({"rows": [{"id": 1, "name": "x"}, {"id": 2, "name": "y"}]}))
        .unwrap();

    let s = state.clone();
    let binding = ForBinding {
        source: expression(move |_| Ok(s.get("rows"))),
        ..named_rows(&rt, &dom, &Value::Undefined)
    }
    .key(expression(|scope| {
        let item = scope.lookup("item")?;
        Ok(item.as_object().map(|row| row.get("id")).unwrap_or_default())
    }));
    let handle = bind_for(&rt, dom.clone(), anchor, &Scope::new(), binding);
    assert_eq!(dom.text_content(dom.root()), "xy");
    dom.reset_stats();

    // Fresh objects with the same ids: matched by key, not identity.
    state
        .set("rows", json!([{"id": 2, "name": "y"}, {"id": 1, "name": "x"}]))
        .unwrap();
    frames.tick();

    let report = handle.last_report();
    assert_eq!(report.created, 0);
    assert_eq!(report.removed, 0);
    assert_eq!(report.moved, 1);
    assert_eq!(dom.stats().moves, 1);
    assert_eq!(dom.text_content(dom.root()), "yx");
}

/// Test that reused rows pick up a replaced item.
#[test]
fn reused_instance_refreshes_when_its_item_changes() {
    let (rt, frames, dom, anchor) = setup();
    let list = rt.wrap(json!([{"id": 1, "name": "old"}]));
    let handle = bind_for(&rt, dom.clone(), anchor, &Scope::new(), named_rows(&rt, &dom, &list));

    list.as_object()
        .unwrap()
        .set_at(0, json!({"id": 1, "name": "new"}))
        .unwrap();
    frames.tick();

    let report = handle.last_report();
    assert_eq!((report.reused, report.refreshed), (1, 1));
    assert_eq!(dom.text_content(dom.root()), "new");
}

/// Test that removed rows are torn down with their components.
#[test]
fn removed_rows_destroy_their_components() {
    struct Row(Rc<RefCell<Vec<String>>>, String);
    impl Component for Row {
        fn destroy(&self) {
            self.0.borrow_mut().push(format!("destroy {}", self.1));
        }
    }

    let (rt, frames, dom, anchor) = setup();
    let log = Rc::new(RefCell::new(Vec::new()));
    let list = rt.wrap(json!(["a", "b"]));
    let l = list.clone();
    let d = dom.clone();
    let lg = log.clone();
    let binding = ForBinding::new(
        "item",
        expression(move |_| Ok(l.clone())),
        template(move |scope| {
            let name = scope.lookup("item")?.to_display_string();
            if let Some(group) = EffectGroup::current() {
                group.adopt_component(Rc::new(Row(lg.clone(), name.clone())));
            }
            Ok(vec![d.create_text(&name)])
        }),
    );
    bind_for(&rt, dom.clone(), anchor, &Scope::new(), binding);

    list.as_object().unwrap().remove(0).unwrap();
    frames.tick();
    assert_eq!(*log.borrow(), vec!["destroy a".to_string()]);
    assert_eq!(dom.text_content(dom.root()), "b");
}

/// Test that multi-root templates move as one unit.
#[test]
fn multi_root_instances_move_together() {
    let (rt, frames, dom, anchor) = setup();
    let list = rt.wrap(json!(["a", "b"]));
    let l = list.clone();
    let d = dom.clone();
    let binding = ForBinding::new(
        "item",
        expression(move |_| Ok(l.clone())),
        template(move |scope| {
            let name = scope.lookup("item")?.to_display_string();
            Ok(vec![d.create_text(&name), d.create_text(&name.to_uppercase())])
        }),
    );
    bind_for(&rt, dom.clone(), anchor, &Scope::new(), binding);
    assert_eq!(dom.text_content(dom.root()), "aAbB");

    list.as_object().unwrap().reverse().unwrap();
    frames.tick();
    assert_eq!(dom.text_content(dom.root()), "bBaA");
}

/// Test branch exclusivity and suspend/resume across an A -> B -> A toggle.
#[test]
fn toggling_back_resumes_the_original_branch() {
    #[derive(Default)]
    struct Panel {
        mounted: Cell<usize>,
        unmounted: Cell<usize>,
        destroyed: Cell<bool>,
    }
    impl Component for Panel {
        fn mounted(&self) {
            self.mounted.set(self.mounted.get() + 1);
        }
        fn unmounted(&self) {
            self.unmounted.set(self.unmounted.get() + 1);
        }
        fn destroy(&self) {
            self.destroyed.set(true);
        }
    }

    let (rt, frames, dom, anchor) = setup();
    let state = rt.tracked(json!({"show": true, "label": "hello"})).unwrap();
    let panel = Rc::new(Panel::default());
    let builds = Rc::new(Cell::new(0));
    let label_runs = Rc::new(Cell::new(0));

    let s = state.clone();
    let d = dom.clone();
    let r = rt.clone();
    let p = panel.clone();
    let b = builds.clone();
    let lr = label_runs.clone();
    let on_branch = template(move |_| {
        b.set(b.get() + 1);
        let div = d.create_element("div");
        let text = d.create_text("");
        d.append_child(div, text);
        let (s, d, lr) = (s.clone(), d.clone(), lr.clone());
        r.create_effect(move || {
            lr.set(lr.get() + 1);
            d.set_text(text, &s.get("label").to_display_string());
        });
        if let Some(group) = EffectGroup::current() {
            group.adopt_component(p.clone());
        }
        Ok(vec![div])
    });
    let d = dom.clone();
    let off_branch = template(move |_| Ok(vec![d.create_text("off")]));

    let s = state.clone();
    let binding = IfBinding::new()
        .when(expression(move |_| Ok(s.get("show"))), on_branch)
        .otherwise(off_branch);
    let handle = bind_if(&rt, dom.clone(), anchor, &Scope::new(), binding);
    let original = handle.nodes();
    assert_eq!(dom.text_content(dom.root()), "hello");

    // A -> B, and the hidden branch's state changes meanwhile.
    state.set("show", false).unwrap();
    frames.tick();
    assert_eq!(handle.active(), Some(1));
    assert_eq!(dom.text_content(dom.root()), "off");
    assert_eq!(panel.unmounted.get(), 1);

    state.set("label", "world").unwrap();
    frames.tick();
    assert_eq!(label_runs.get(), 1);

    // B -> A: same node, not rebuilt, stale effect caught up.
    state.set("show", true).unwrap();
    frames.tick();
    assert_eq!(handle.active(), Some(0));
    assert_eq!(handle.nodes(), original);
    assert_eq!(builds.get(), 1);
    assert_eq!(label_runs.get(), 2);
    assert_eq!(panel.mounted.get(), 2);
    assert_eq!(dom.text_content(dom.root()), "world");
    let element_children = dom.element_children(dom.root());
    assert_eq!(element_children.len(), 1);

    handle.dispose();
    assert!(panel.destroyed.get());
}

/// Transition that holds leaving nodes until told to finish.
#[derive(Default)]
struct HeldLeave {
    pending: RefCell<Vec<Box<dyn FnOnce()>>>,
    phases: RefCell<Vec<TransitionPhase>>,
}

impl HeldLeave {
    fn finish_all(&self) {
        let pending: Vec<_> = self.pending.borrow_mut().drain(..).collect();
        for done in pending {
            done();
        }
    }
}

impl Transition for HeldLeave {
    fn run(&self, _nodes: &[NodeId], phase: TransitionPhase, on_done: Box<dyn FnOnce()>) {
        self.phases.borrow_mut().push(phase);
        match phase {
            TransitionPhase::Enter => on_done(),
            TransitionPhase::Leave => self.pending.borrow_mut().push(on_done),
        }
    }
}

fn transition_fixture(
    config: RuntimeConfig,
) -> (Runtime, Rc<ManualFrames>, Rc<MemoryDom>, Tracked, Rc<HeldLeave>, trellis_core::reconcile::IfHandle) {
    let frames = ManualFrames::new();
    let rt = Runtime::with_config(config, frames.clone());
    let dom = MemoryDom::new();
    let anchor = dom.create_comment("if");
    dom.append_child(dom.root(), anchor);
    let state = rt.tracked(json!({"on": true})).unwrap();
    let transition = Rc::new(HeldLeave::default());

    let s = state.clone();
    let d1 = dom.clone();
    let d2 = dom.clone();
    let binding = IfBinding::new()
        .when(
            expression(move |_| Ok(s.get("on"))),
            template(move |_| Ok(vec![d1.create_text("on")])),
        )
        .otherwise(template(move |_| Ok(vec![d2.create_text("off")])))
        .transition(transition.clone());
    let handle = bind_if(&rt, dom.clone(), anchor, &Scope::new(), binding);
    (rt, frames, dom, state, transition, handle)
}

/// Test that a leave transition defers node removal until done.
#[test]
fn leave_transition_defers_removal() {
    let (_rt, frames, dom, state, transition, _handle) =
        transition_fixture(RuntimeConfig::default());

    state.set("on", false).unwrap();
    frames.tick();
    assert_eq!(dom.text_content(dom.root()), "onoff");

    transition.finish_all();
    assert_eq!(dom.text_content(dom.root()), "off");
    assert!(transition.phases.borrow().contains(&TransitionPhase::Leave));

    // The safety timeout firing later is harmless.
    frames.advance(Duration::from_secs(5));
    assert_eq!(dom.text_content(dom.root()), "off");
}

/// Test the safety timeout for transitions that never finish.
#[test]
fn leave_transition_times_out() {
    let config = RuntimeConfig {
        transition_timeout_ms: 200,
        ..RuntimeConfig::default()
    };
    let (_rt, frames, dom, state, _transition, _handle) = transition_fixture(config);

    state.set("on", false).unwrap();
    frames.tick();
    frames.advance(Duration::from_millis(199));
    assert_eq!(dom.text_content(dom.root()), "onoff");
    frames.advance(Duration::from_millis(1));
    assert_eq!(dom.text_content(dom.root()), "off");
}

/// Test that coming back during a pending leave cancels the removal.
#[test]
fn reactivating_during_leave_keeps_the_nodes() {
    let (_rt, frames, dom, state, transition, handle) =
        transition_fixture(RuntimeConfig::default());
    let original = handle.nodes();

    state.set("on", false).unwrap();
    frames.tick();
    state.set("on", true).unwrap();
    frames.tick();

    transition.finish_all();
    frames.advance(Duration::from_secs(5));
    assert_eq!(handle.nodes(), original);
    assert!(dom.parent(original[0]).is_some());
    assert!(dom.text_content(dom.root()).starts_with("on"));
}

/// Test that nested lists inside branches follow suspend and dispose.
#[test]
fn list_inside_branch_is_suspended_with_it() {
    let (rt, frames, dom, anchor) = setup();
    let state = rt.tracked(json!({"open": true, "rows": ["a"]})).unwrap();

    let s = state.clone();
    let d = dom.clone();
    let r = rt.clone();
    let branch = template(move |scope| {
        let ul = d.create_element("ul");
        let inner = d.create_comment("for");
        d.append_child(ul, inner);
        let s = s.clone();
        let d2 = d.clone();
        let binding = ForBinding::new(
            "row",
            expression(move |_| Ok(s.get("rows"))),
            template(move |scope| Ok(vec![d2.create_text(&scope.lookup("row")?.to_display_string())])),
        );
        bind_for(&r, d.clone() as Rc<dyn Host>, inner, scope, binding);
        Ok(vec![ul])
    });
    let s = state.clone();
    let handle = bind_if(
        &rt,
        dom.clone(),
        anchor,
        &Scope::new(),
        IfBinding::new().when(expression(move |_| Ok(s.get("open"))), branch),
    );
    assert_eq!(dom.text_content(dom.root()), "a");

    state.set("open", false).unwrap();
    frames.tick();
    state
        .get("rows")
        .as_object()
        .unwrap()
        .push("b")
        .unwrap();
    frames.tick();
    assert_eq!(dom.text_content(dom.root()), "");

    state.set("open", true).unwrap();
    frames.tick();
    assert_eq!(dom.text_content(dom.root()), "ab");

    handle.dispose();
    assert_eq!(rt.effect_count(), 0);
}

/// Test that a frozen owner rejects writes from anywhere.
#[test]
fn frozen_owner_rejects_writes_through_nested_containers() {
    let (rt, _, _, _) = setup();
    let state = rt
        .wrap_with_hint(json!({"todos": [{"done": false}]}), "state")
        .as_object()
        .cloned()
        .unwrap();
    let todo = state.get("todos").as_object().unwrap().at(0);

    rt.freeze();
    let err = todo.as_object().unwrap().set("done", true).unwrap_err();
    assert_eq!(
        err,
        ReactiveError::Frozen {
            key: "state.todos.[].done".into()
        }
    );
    rt.unfreeze();
    assert!(todo.as_object().unwrap().set("done", true).unwrap());
}

/// Test that wrapped values round-trip back to plain data.
#[test]
fn unwrap_recovers_plain_data() {
    let (rt, _, _, _) = setup();
    let value = rt.wrap(json!({"a": [1, "two", null, {"b": true}]}));
    let again = rt.wrap(value.clone());
    assert!(again.same(&value));
    assert_eq!(
        rt.unwrap(&value).to_json(),
        json!({"a": [1, "two", null, {"b": true}]})
    );

    // Opaque values pass through untouched.
    let opaque = rt.wrap(Plain::opaque(vec![1u8, 2, 3]));
    assert!(matches!(opaque, Value::Opaque(_)));
}

/// Test that child runtimes observe parent state.
#[test]
fn child_runtime_reads_parent_state() {
    let (parent, frames, _, _) = setup();
    let child = parent.child();
    let theme = parent.tracked(json!({"dark": false})).unwrap();
    let seen = Rc::new(Cell::new(false));

    let t = theme.clone();
    let s = seen.clone();
    child.create_effect(move || s.set(t.get("dark").is_truthy()));

    theme.set("dark", true).unwrap();
    frames.tick();
    assert!(seen.get());
}
