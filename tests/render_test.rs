use std::collections::HashMap;
use uliquid::{Bindings, Engine, NodeKind, Value, bindings};

fn render(src: &str, bindings: &Bindings) -> String {
    Engine::new().parse_and_render(src, bindings).unwrap()
}

#[test]
fn test_static_text_round_trips() {
    for src in [
        "",
        "plain text",
        "  leading and trailing  \n",
        "line one\nline two\r\n\ttabbed",
        "braces { } and % signs } {",
        "unicode: héllo wörld ✓",
    ] {
        assert_eq!(render(src, &Bindings::new()), src);
    }
}

#[test]
fn test_whitespace_trim_markers() {
    let src = "a  \n  {{- 'b' -}}  \n  c";
    assert_eq!(render(src, &Bindings::new()), "abc");

    let src = "<ul>\n  {%- for i in (1..2) -%}\n  <li>{{ i }}</li>\n  {%- endfor -%}\n</ul>";
    assert_eq!(render(src, &Bindings::new()), "<ul><li>1</li><li>2</li></ul>");

    let src = "x {%- comment -%} y {%- endcomment %} z";
    assert_eq!(render(src, &Bindings::new()), "x z");
}

#[test]
fn test_missing_variable_renders_empty() {
    assert_eq!(render("[{{ undefined_var }}]", &Bindings::new()), "[]");
    assert_eq!(render("[{{ a.b.c }}]", &bindings! { "a" => 1 }), "[]");
    assert_eq!(render("[{{ list[5] }}]", &bindings! { "list" => vec![1] }), "[]");
}

#[test]
fn test_missing_variable_is_falsy() {
    assert_eq!(
        render("{% if undefined_var %}A{% else %}B{% endif %}", &Bindings::new()),
        "B"
    );
}

#[test]
fn test_zero_empty_string_and_empty_containers_are_truthy() {
    let src = "{% if v %}T{% else %}F{% endif %}";
    let empty_map: HashMap<String, i32> = HashMap::new();
    let empty_list: Vec<i32> = Vec::new();
    assert_eq!(render(src, &bindings! { "v" => 0 }), "T");
    assert_eq!(render(src, &bindings! { "v" => 0.0 }), "T");
    assert_eq!(render(src, &bindings! { "v" => "" }), "T");
    assert_eq!(render(src, &bindings! { "v" => empty_list }), "T");
    assert_eq!(render(src, &bindings! { "v" => empty_map }), "T");
    assert_eq!(render(src, &bindings! { "v" => false }), "F");
    assert_eq!(render(src, &bindings! { "v" => Value::Nil }), "F");
}

#[test]
fn test_canonical_string_conversion() {
    let mut m = HashMap::new();
    m.insert("b".to_string(), 2);
    m.insert("a".to_string(), 1);
    let b = bindings! {
        "n" => 42,
        "f" => 3.0,
        "g" => 2.5,
        "t" => true,
        "l" => vec!["x", "y"],
        "m" => m,
        "nil" => Value::Nil,
    };
    assert_eq!(
        render("{{ n }}|{{ f }}|{{ g }}|{{ t }}|{{ l }}|{{ m }}|{{ nil }}", &b),
        "42|3|2.5|true|xy|{a: 1, b: 2}|"
    );
}

#[test]
fn test_decimal_and_date_values() {
    use rust_decimal::Decimal;
    use std::str::FromStr;

    let d = Decimal::from_str("12.50").unwrap();
    let day = chrono::NaiveDate::from_ymd_opt(2024, 2, 29).unwrap();
    let b = bindings! { "price" => d, "day" => day };
    assert_eq!(render("{{ price }} {{ day }}", &b), "12.5 2024-02-29");
    assert_eq!(render("{% if price > 12 %}dear{% endif %}", &b), "dear");
    assert_eq!(render("{{ day | date: '%d.%m.%Y' }}", &b), "29.02.2024");
}

#[test]
fn test_nested_paths_and_indices() {
    let mut user = HashMap::new();
    user.insert("name".to_string(), Value::Str("Ana".to_string()));
    user.insert(
        "tags".to_string(),
        Value::List(vec![Value::Str("x".into()), Value::Str("y".into())]),
    );
    let b = bindings! { "user" => Value::Map(user), "key" => "name", "i" => 1 };
    assert_eq!(
        render("{{ user.name }} {{ user[key] }} {{ user.tags[i] }} {{ user.tags[-2] }} {{ user.tags.size }}", &b),
        "Ana Ana y x 2"
    );
}

#[test]
fn test_rendering_is_idempotent() {
    let engine = Engine::new();
    let tpl = engine
        .parse("{% for x in xs %}{% assign y = x | times: 2 %}{{ y }},{% endfor %}{{ y }}")
        .unwrap();
    let b = bindings! { "xs" => vec![1, 2, 3] };
    let first = engine.render(&tpl, &b).unwrap();
    let second = engine.render(&tpl, &b).unwrap();
    assert_eq!(first, "2,4,6,");
    assert_eq!(first, second);
}

#[test]
fn test_bindings_are_not_mutated() {
    let engine = Engine::new();
    let b = bindings! { "x" => 1 };
    let out = engine
        .parse_and_render("{% assign x = 5 %}{{ x }}", &b)
        .unwrap();
    assert_eq!(out, "5");
    assert_eq!(b.get("x"), Some(&Value::Int(1)));
}

#[test]
fn test_template_inspection() {
    let engine = Engine::new();
    let tpl = engine
        .parse("hi {{ name }}{% assign a = 1 %}{% if a %}x{% else %}y{% endif %}")
        .unwrap();
    let kinds: Vec<NodeKind> = tpl.root().children().iter().map(|n| n.kind()).collect();
    assert_eq!(
        kinds,
        vec![NodeKind::Text, NodeKind::Object, NodeKind::Tag, NodeKind::Block]
    );
    match &tpl.root().children()[3] {
        uliquid::Node::Block(block) => {
            assert_eq!(block.name(), "if");
            assert_eq!(block.args(), "a");
            assert_eq!(block.clauses().len(), 1);
            assert_eq!(block.clauses()[0].name(), "else");
        }
        _ => panic!("Expected a block node"),
    }
}
