use std::cell::Cell;
use std::rc::Rc;

use stencil_core::{
    html, svg, ConstructionError, Invocation, Namespace, NodeId, Object, RenderError, Rendered,
    StencilConfig, Strings, Value,
};
use stencil_testing::TestStencil;

const M: &str = "<!--_stencil_test;-->";

fn paragraph(value: Value) -> Invocation {
    html!("<p>{}</p>", value)
}

fn row(id: u32) -> Invocation {
    html!(key = id, "<li data-id={}></li>", id)
}

fn rows(ids: &[u32]) -> Invocation {
    let items: Vec<Invocation> = ids.iter().map(|&id| row(id)).collect();
    html!("<ul>{}</ul>", items)
}

fn list_items(harness: &TestStencil) -> Vec<NodeId> {
    let ul = harness.children()[0];
    harness
        .stencil()
        .document()
        .children(ul)
        .iter()
        .copied()
        .filter(|&node| harness.stencil().document().is_element(node))
        .collect()
}

fn data_ids(harness: &TestStencil) -> Vec<String> {
    let document = harness.stencil().document();
    list_items(harness)
        .into_iter()
        .filter_map(|li| document.attribute(li, "data-id").map(str::to_string))
        .collect()
}

#[test]
fn number_renders_as_text() {
    let mut harness = TestStencil::new();
    harness.render(paragraph(Value::from(123))).unwrap();

    assert_eq!(harness.html(), format!("<p>123{M}</p>"));
}

#[test]
fn rendering_the_same_values_again_touches_nothing() {
    let mut harness = TestStencil::new();
    harness.render(paragraph(Value::from("same"))).unwrap();
    let first = harness.children();

    let (result, stats) = harness.measure(|h| h.render(paragraph(Value::from("same"))));

    result.unwrap();
    assert!(stats.is_empty(), "unexpected mutations: {stats:?}");
    assert_eq!(harness.children(), first);
}

#[test]
fn text_updates_in_place() {
    let mut harness = TestStencil::new();
    harness.render(paragraph(Value::from("foo"))).unwrap();
    let p = harness.children()[0];
    let text = harness.stencil().document().children(p)[0];

    let (_, stats) = harness.measure(|h| h.render(paragraph(Value::from("bar"))));

    assert_eq!(harness.stencil().document().children(p)[0], text);
    assert_eq!(harness.stencil().document().text(text), Some("bar"));
    assert_eq!(stats.tree_operations(), 0);
    assert_eq!(stats.text_writes, 1);
}

#[test]
fn primitive_lists_join_and_empty_lists_clear() {
    let mut harness = TestStencil::new();
    harness
        .render(paragraph(Value::from(vec!["a", "b", "c"])))
        .unwrap();
    assert_eq!(harness.html(), format!("<p>abc{M}</p>"));

    harness
        .render(paragraph(Value::from(Vec::<Value>::new())))
        .unwrap();
    assert_eq!(harness.html(), format!("<p>{M}</p>"));
}

#[test]
fn attribute_values_write_remove_and_settle() {
    let mut harness = TestStencil::new();
    let view = |value: Value| html!("<div title$={}></div>", value);

    harness.render(view(Value::from("v1"))).unwrap();
    assert_eq!(harness.html(), r#"<div title="v1"></div>"#);

    harness.render(view(Value::Null)).unwrap();
    assert_eq!(harness.html(), "<div></div>");

    let (_, stats) = harness.measure(|h| h.render(view(Value::from("v2"))));
    assert_eq!(harness.html(), r#"<div title="v2"></div>"#);
    assert_eq!(stats.attribute_writes, 1);

    let (_, stats) = harness.measure(|h| h.render(view(Value::from("v2"))));
    assert!(stats.is_empty());

    harness.render(view(Value::from(true))).unwrap();
    assert_eq!(harness.html(), r#"<div title=""></div>"#);
}

#[test]
fn unknown_names_fall_back_to_attributes() {
    let mut harness = TestStencil::new();
    harness
        .render(html!("<div class={} aria-label={}></div>", "box", "Box"))
        .unwrap();

    assert_eq!(harness.html(), r#"<div class="box" aria-label="Box"></div>"#);
}

#[test]
fn node_lists_keep_identity() {
    let mut harness = TestStencil::new();
    let document = harness.stencil_mut().document_mut();
    let [a, b, c] = ["a", "b", "c"].map(|label| {
        let node = document.create_element("i", Namespace::Html);
        let text = document.create_text(label);
        document.append_child(node, text).unwrap();
        node
    });
    let view = |nodes: [NodeId; 3]| html!("<p>{}</p>", Value::List(nodes.map(Value::node).to_vec()));

    harness.render(view([a, b, c])).unwrap();
    let (_, stats) = harness.measure(|h| h.render(view([a, b, c])));
    assert!(stats.is_empty());

    let (_, stats) = harness.measure(|h| h.render(view([c, a, b])));
    let p = harness.children()[0];
    assert_eq!(&harness.stencil().document().children(p)[..3], &[c, a, b]);
    assert_eq!(stats.insertions, 1);
    assert_eq!(stats.removals, 0);
}

#[test]
fn literal_attribute_suffix_skips_properties() {
    let mut harness = TestStencil::new();
    harness
        .render(html!("<input value$={}>", "typed"))
        .unwrap();

    assert_eq!(harness.html(), r#"<input value="typed">"#);
}

#[test]
fn known_properties_are_assigned_not_written() {
    let mut harness = TestStencil::new();
    harness.render(html!("<input value={}>", "typed")).unwrap();
    let input = harness.children()[0];

    assert_eq!(harness.html(), "<input>");
    assert!(matches!(
        harness.stencil().document().property(input, "value"),
        Some(Value::Str(text)) if text == "typed"
    ));
}

#[test]
fn event_holes_attach_and_detach_listeners() {
    let mut harness = TestStencil::new();
    let clicks = Rc::new(Cell::new(0));
    let counter = clicks.clone();
    let on_click = Value::listener(move |_| counter.set(counter.get() + 1));
    let view = |handler: Value| html!("<button onClick={}>go</button>", handler);

    harness.render(view(on_click.clone())).unwrap();
    let button = harness.children()[0];
    assert_eq!(harness.html(), "<button>go</button>");
    harness.stencil().document().dispatch_event(button, "click");
    assert_eq!(clicks.get(), 1);

    harness.render(view(on_click)).unwrap();
    assert_eq!(harness.stencil().document().listener_count(button, "click"), 1);

    harness.render(view(Value::Null)).unwrap();
    assert_eq!(harness.stencil().document().listener_count(button, "click"), 0);
}

#[test]
fn keyed_rows_keep_identity_when_reordered() {
    let mut harness = TestStencil::new();
    harness.render(rows(&[1, 2, 3, 4])).unwrap();
    let before = list_items(&harness);

    let (_, stats) = harness.measure(|h| h.render(rows(&[4, 3, 2, 1])));

    let after = list_items(&harness);
    assert_eq!(after, vec![before[3], before[2], before[1], before[0]]);
    assert_eq!(data_ids(&harness), ["4", "3", "2", "1"]);
    assert_eq!(stats.removals, 0);
}

#[test]
fn appending_a_row_is_one_insertion() {
    let mut harness = TestStencil::new();
    harness.render(rows(&[1, 2, 3])).unwrap();

    let (_, stats) = harness.measure(|h| h.render(rows(&[1, 2, 3, 4])));

    assert_eq!(stats.insertions, 1);
    assert_eq!(stats.removals, 0);
    assert_eq!(data_ids(&harness), ["1", "2", "3", "4"]);
}

#[test]
fn prepending_a_row_is_one_insertion() {
    let mut harness = TestStencil::new();
    harness.render(rows(&[1, 2, 3])).unwrap();
    let before = list_items(&harness);

    let (_, stats) = harness.measure(|h| h.render(rows(&[0, 1, 2, 3])));

    assert_eq!(stats.insertions, 1);
    assert_eq!(stats.removals, 0);
    assert_eq!(&list_items(&harness)[1..], before.as_slice());
}

#[test]
fn truncating_rows_is_one_removal() {
    let mut harness = TestStencil::new();
    harness.render(rows(&[1, 2, 3, 4])).unwrap();

    let (_, stats) = harness.measure(|h| h.render(rows(&[1, 2, 3])));

    assert_eq!(stats.removals, 1);
    assert_eq!(stats.insertions, 0);
    assert_eq!(data_ids(&harness), ["1", "2", "3"]);
}

#[test]
fn large_reorders_fall_back_to_replacing() {
    let mut harness = TestStencil::with_config(StencilConfig::default().with_diff_limit(2));
    harness.render(rows(&[1, 2, 3, 4])).unwrap();
    let before = list_items(&harness);

    let (_, stats) = harness.measure(|h| h.render(rows(&[1, 3, 2, 4])));

    assert_eq!(list_items(&harness), vec![before[0], before[2], before[1], before[3]]);
    assert_eq!(stats.removals, 2);
    assert_eq!(stats.insertions, 1);
}

#[test]
fn explicit_key_selects_the_nested_instance() {
    let mut harness = TestStencil::new();
    let badge = |key: u32, label: &str| html!(key = key, "<b>{}</b>", label);
    let view = |inner: Invocation| html!("<div>{}</div>", inner);

    harness.render(view(badge(1, "one"))).unwrap();
    let div = harness.children()[0];
    let first = harness.stencil().document().children(div)[0];

    harness.render(view(badge(1, "uno"))).unwrap();
    assert_eq!(harness.stencil().document().children(div)[0], first);

    harness.render(view(badge(2, "two"))).unwrap();
    assert_ne!(harness.stencil().document().children(div)[0], first);
    assert_eq!(harness.html(), format!("<div><b>two{M}</b>{M}</div>"));
}

#[test]
fn nested_top_level_hole_swaps_nodes() {
    let mut harness = TestStencil::new();
    let view = |value: Value| html!("<div>{}</div>", value);
    let inner = |value: Value| html!("{}", value);
    let document = harness.stencil_mut().document_mut();
    let italic = document.create_element("i", Namespace::Html);
    let bold = document.create_element("b", Namespace::Html);

    harness
        .render(view(inner(Value::node(italic)).into()))
        .unwrap();
    assert_eq!(harness.html(), format!("<div><i></i>{M}{M}</div>"));

    harness
        .render(view(inner(Value::node(bold)).into()))
        .unwrap();
    assert_eq!(harness.html(), format!("<div><b></b>{M}{M}</div>"));
    assert_eq!(harness.stencil().document().parent(italic), None);

    harness.render(view(Value::from("plain"))).unwrap();
    assert_eq!(harness.html(), format!("<div>plain{M}</div>"));
}

#[test]
fn nested_top_level_hole_clears() {
    let mut harness = TestStencil::new();
    let view = |value: Value| html!("<div>{}</div>", value);
    let inner = |value: Value| html!("<em>x</em>{}", value);

    harness
        .render(view(inner(Value::html("<i>a</i>")).into()))
        .unwrap();
    assert_eq!(harness.html(), format!("<div><em>x</em><i>a</i>{M}{M}</div>"));

    harness
        .render(view(inner(Value::List(Vec::new())).into()))
        .unwrap();
    assert_eq!(harness.html(), format!("<div><em>x</em>{M}{M}</div>"));

    harness.render(view(Value::from("plain"))).unwrap();
    assert_eq!(harness.html(), format!("<div>plain{M}</div>"));
}

#[test]
fn keyed_row_hole_changes_kind() {
    let mut harness = TestStencil::new();
    let view = |value: Value| html!("<div>{}</div>", value);
    let cell = |key: u32, value: Value| html!(key = key, "{}", value);

    harness
        .render(view(Value::from(vec![
            cell(1, Value::from("a")),
            cell(2, Value::from("b")),
        ])))
        .unwrap();
    assert_eq!(harness.html(), format!("<div>a{M}b{M}{M}</div>"));

    harness
        .render(view(Value::from(vec![
            cell(1, Value::html("<i>A</i>")),
            cell(2, Value::from("b")),
        ])))
        .unwrap();
    assert_eq!(harness.html(), format!("<div><i>A</i>{M}b{M}{M}</div>"));

    harness.render(view(Value::from("plain"))).unwrap();
    assert_eq!(harness.html(), format!("<div>plain{M}</div>"));
}

#[test]
fn switching_template_shape_replaces_content() {
    let mut harness = TestStencil::new();
    harness.render(paragraph(Value::from("a"))).unwrap();
    harness.render(html!("<span>{}</span>", "b")).unwrap();
    assert_eq!(harness.html(), format!("<span>b{M}</span>"));

    harness.render(paragraph(Value::from("c"))).unwrap();
    assert_eq!(harness.html(), format!("<p>c{M}</p>"));
}

#[test]
fn nodes_and_markup_are_inserted() {
    let mut harness = TestStencil::new();
    let node = harness
        .stencil_mut()
        .document_mut()
        .create_element("hr", Namespace::Html);

    harness.render(paragraph(Value::node(node))).unwrap();
    assert_eq!(harness.html(), format!("<p><hr>{M}</p>"));

    harness
        .render(paragraph(Value::html("<i>x</i><b>y</b>")))
        .unwrap();
    assert_eq!(harness.html(), format!("<p><i>x</i><b>y</b>{M}</p>"));

    harness
        .render(paragraph(Value::text("<i>x</i>")))
        .unwrap();
    assert_eq!(harness.html(), format!("<p>&lt;i&gt;x&lt;/i&gt;{M}</p>"));
}

#[test]
fn nested_lists_are_flattened() {
    let mut harness = TestStencil::new();
    let nested = Value::List(vec![
        Value::from(vec![row(1), row(2)]),
        Value::from(vec![row(3)]),
    ]);
    harness.render(html!("<ul>{}</ul>", nested)).unwrap();

    assert_eq!(data_ids(&harness), ["1", "2", "3"]);
}

#[test]
fn raw_text_holes_write_text() {
    let mut harness = TestStencil::new();
    let view = |color: &str| html!("<style>p {{ color: {} }}</style>", color);

    harness.render(view("red")).unwrap();
    assert_eq!(harness.html(), "<style>p { color: red }</style>");

    let (_, stats) = harness.measure(|h| h.render(view("blue")));
    assert_eq!(harness.html(), "<style>p { color: blue }</style>");
    assert_eq!(stats.tree_operations(), 0);
    assert_eq!(stats.text_writes, 1);
}

#[test]
fn svg_templates_keep_case_and_namespace() {
    let mut harness = TestStencil::new();
    harness
        .render(svg!("<circle cx={} viewBox=\"0 0 2 2\"/>", 1))
        .unwrap();
    let circle = harness.children()[0];
    let element = harness.stencil().document().element(circle).unwrap();

    assert_eq!(element.namespace(), Namespace::Svg);
    assert_eq!(element.attribute("viewBox"), Some("0 0 2 2"));
    assert_eq!(element.attribute("cx"), Some("1"));
}

#[test]
fn transformers_render_matching_objects() {
    let mut harness = TestStencil::new();
    harness
        .stencil_mut()
        .define("upper", |payload: &Value, _: &Object| {
            Value::from(payload.as_text().unwrap_or_default().to_uppercase())
        });

    harness
        .render(paragraph(Value::from(Object::new().with("upper", "hi"))))
        .unwrap();

    assert_eq!(harness.html(), format!("<p>HI{M}</p>"));
}

#[test]
fn unmatched_objects_are_unsupported() {
    let mut harness = TestStencil::new();
    let err = harness
        .render(paragraph(Value::from(Object::new().with("x", 1))))
        .unwrap_err();

    assert_eq!(
        err,
        RenderError::UnsupportedValue {
            kind: "object",
            position: "node"
        }
    );
}

#[test]
fn listeners_in_attribute_holes_are_unsupported() {
    let mut harness = TestStencil::new();
    let err = harness
        .render(html!("<div class={}></div>", Value::listener(|_| {})))
        .unwrap_err();

    assert!(matches!(err, RenderError::UnsupportedValue { kind: "listener", .. }));
}

#[test]
fn hole_without_attribute_name_fails_to_compile() {
    let mut harness = TestStencil::new();
    let err = harness
        .render(html!("<p class=\"x\" {}></p>", 1))
        .unwrap_err();

    assert!(matches!(
        err,
        RenderError::Construction(ConstructionError::AttributeName { .. })
    ));
}

#[test]
fn mismatched_value_count_is_an_arity_error() {
    let mut harness = TestStencil::new();
    let invocation = Invocation::new(
        Strings::shared(["<p>", "</p>"]),
        vec![Value::from(1), Value::from(2)],
        Namespace::Html,
    );

    assert_eq!(
        harness.render(invocation).unwrap_err(),
        RenderError::Arity {
            fragments: 2,
            values: 2
        }
    );
}

#[test]
fn blueprints_compile_once_per_call_site() {
    let mut harness = TestStencil::new();
    for value in 0..5 {
        harness.render(paragraph(Value::from(value))).unwrap();
    }
    let stencil = harness.stencil_mut();
    stencil.materialize(paragraph(Value::from("detached"))).unwrap();

    assert_eq!(stencil.cache().compilations(), 1);
}

#[test]
fn runtime_strings_share_blueprints_by_content() {
    let mut harness = TestStencil::new();
    let build = || {
        Invocation::new(
            Strings::shared(["<em>", "</em>"]),
            vec![Value::from("x")],
            Namespace::Html,
        )
    };
    harness.render(build()).unwrap();
    harness.render(build()).unwrap();

    assert_eq!(harness.stencil().cache().compilations(), 1);
}

#[test]
fn materialize_returns_detached_nodes() {
    let mut harness = TestStencil::new();
    let stencil = harness.stencil_mut();

    let single = stencil.materialize(html!("<p>{}</p>", 1)).unwrap();
    let many = stencil.materialize(html!("<dt>{}</dt><dd>x</dd>", 2)).unwrap();

    assert!(matches!(single, Rendered::Single(_)));
    let p = single.single().expect("one node");
    assert_eq!(stencil.document().outer_html(p), format!("<p>1{M}</p>"));
    assert_eq!(many.nodes().len(), 2);
}
