use std::sync::Arc;
use uliquid::{Bindings, Engine, Error, Kwargs, Object, Thunk, Value, bindings};

fn render(engine: &Engine, src: &str, bindings: &Bindings) -> Result<String, Error> {
    engine.parse_and_render(src, bindings)
}

#[test]
fn test_pipeline_applies_left_to_right() {
    let engine = Engine::new();
    engine
        .register_filter("f", |s: String, a: String| format!("f({},{})", s, a))
        .unwrap();
    engine
        .register_filter("g", |s: String, b: String| format!("g({},{})", s, b))
        .unwrap();
    let out = render(&engine, "{{ x | f: 'a' | g: 'b' }}", &bindings! { "x" => "x" }).unwrap();
    assert_eq!(out, "g(f(x,a),b)");
}

#[test]
fn test_coercion_by_declared_type() {
    let engine = Engine::new();
    engine.register_filter("twice", |n: i64| n * 2).unwrap();
    engine.register_filter("half", |n: f64| n / 2.0).unwrap();
    engine.register_filter("flag", |b: bool| if b { "on" } else { "off" }).unwrap();
    engine.register_filter("text", |s: String| s.len()).unwrap();

    let b = bindings! { "s" => " 21 ", "f" => 2.9, "zero" => 0 };
    assert_eq!(render(&engine, "{{ s | twice }}", &b).unwrap(), "42");
    assert_eq!(render(&engine, "{{ f | twice }}", &b).unwrap(), "4");
    assert_eq!(render(&engine, "{{ '3' | half }}", &b).unwrap(), "1.5");
    assert_eq!(render(&engine, "{{ missing | twice }}", &b).unwrap(), "0");
    assert_eq!(render(&engine, "{{ zero | flag }}", &b).unwrap(), "on");
    assert_eq!(render(&engine, "{{ missing | flag }}", &b).unwrap(), "off");
    assert_eq!(render(&engine, "{{ 12345 | text }}", &b).unwrap(), "5");
}

#[test]
fn test_argument_type_error() {
    let engine = Engine::new();
    engine.register_filter("twice", |n: i64| n * 2).unwrap();
    let err = render(&engine, "{{ 'abc' | twice }}", &Bindings::new()).unwrap_err();
    match err.root_cause() {
        Error::ArgumentType {
            filter,
            index,
            value,
        } => {
            assert_eq!(filter, "twice");
            assert_eq!(*index, 0);
            assert!(value.contains("abc"));
        }
        other => panic!("Expected ArgumentType, got {:?}", other),
    }
}

#[test]
fn test_out_of_range_argument_is_type_error() {
    let engine = Engine::new();
    let err = render(&engine, "{{ 'abcdef' | truncate: -1 }}", &Bindings::new()).unwrap_err();
    assert!(matches!(
        err.root_cause(),
        Error::ArgumentType { filter, index: 1, value } if filter == "truncate" && value.contains("-1")
    ));
}

#[test]
fn test_non_numeric_math_operand_is_type_error() {
    let engine = Engine::new();
    let err = render(&engine, "{{ 'abc' | plus: 1 }}", &Bindings::new()).unwrap_err();
    assert!(matches!(
        err.root_cause(),
        Error::ArgumentType { filter, index: 0, .. } if filter == "plus"
    ));
    let err = render(&engine, "{{ 2 | divided_by: 'x' }}", &Bindings::new()).unwrap_err();
    assert!(matches!(
        err.root_cause(),
        Error::ArgumentType { filter, index: 1, .. } if filter == "divided_by"
    ));
}

#[test]
fn test_argument_count_error() {
    let engine = Engine::new();
    let err = render(&engine, "{{ 'a' | append }}", &Bindings::new()).unwrap_err();
    assert!(matches!(
        err.root_cause(),
        Error::ArgumentCount { filter, got: 0, .. } if filter == "append"
    ));

    let err = render(&engine, "{{ 'a' | upcase: 1, 2 }}", &Bindings::new()).unwrap_err();
    assert!(matches!(
        err.root_cause(),
        Error::ArgumentCount { filter, got: 2, .. } if filter == "upcase"
    ));
}

#[test]
fn test_unknown_filter_aborts_render() {
    let engine = Engine::new();
    let err = render(&engine, "before {{ x | nope }} after", &Bindings::new()).unwrap_err();
    match &err {
        Error::Render { node, pos, source } => {
            assert_eq!(node, "x | nope");
            assert_eq!(pos.offset, 7);
            assert!(matches!(source.as_ref(), Error::UnknownFilter(name) if name == "nope"));
        }
        other => panic!("Expected Render, got {:?}", other),
    }
}

#[test]
fn test_thunk_reports_whether_supplied() {
    let engine = Engine::new();
    engine
        .register_filter("mark", |s: String, suffix: Thunk<String>| {
            if suffix.is_supplied() {
                format!("{}{}", s, suffix.call(String::new()))
            } else {
                format!("{}?", s)
            }
        })
        .unwrap();
    assert_eq!(
        render(&engine, "{{ 'a' | mark }}{{ 'b' | mark: '' }}", &Bindings::new()).unwrap(),
        "a?b"
    );
}

#[test]
fn test_named_arguments() {
    let engine = Engine::new();
    engine
        .register_filter("greet", |name: String, opts: Kwargs| {
            let greeting = opts
                .get("greeting")
                .map(|v| v.to_string())
                .unwrap_or_else(|| "Hello".to_string());
            format!("{}, {}", greeting, name)
        })
        .unwrap();
    let b = bindings! { "who" => "Ana" };
    assert_eq!(render(&engine, "{{ who | greet }}", &b).unwrap(), "Hello, Ana");
    assert_eq!(
        render(&engine, "{{ who | greet: greeting: 'Hi' }}", &b).unwrap(),
        "Hi, Ana"
    );

    let err = render(&engine, "{{ who | upcase: loud: true }}", &b).unwrap_err();
    assert!(matches!(err.root_cause(), Error::ArgumentCount { .. }));
}

#[test]
fn test_fallible_filter_is_wrapped() {
    let engine = Engine::new();
    engine
        .register_filter("fail", |_v: Value| -> uliquid::Result<Value> {
            Err(Error::custom("boom"))
        })
        .unwrap();
    let err = render(&engine, "{{ 1 | fail }}", &Bindings::new()).unwrap_err();
    assert!(matches!(err, Error::Render { .. }));
    assert!(matches!(err.root_cause(), Error::Custom(msg) if msg == "boom"));
}

#[test]
fn test_reregistration_replaces_filter() {
    let engine = Engine::new();
    engine.register_filter("upcase", |s: String| format!("<{}>", s)).unwrap();
    assert_eq!(render(&engine, "{{ 'a' | upcase }}", &Bindings::new()).unwrap(), "<a>");
}

#[test]
fn test_standard_string_filters() {
    let engine = Engine::new();
    let b = Bindings::new();
    let cases = [
        ("{{ ' a b ' | strip }}", "a b"),
        ("{{ 'Abc' | downcase }}", "abc"),
        ("{{ 'abc' | prepend: '>' }}", ">abc"),
        ("{{ 'a-b-c' | replace: '-', '+' }}", "a+b+c"),
        ("{{ 'a-b-c' | remove: '-' }}", "abc"),
        ("{{ 'a,b,c' | split: ',' | join: '|' }}", "a|b|c"),
        ("{{ 'a,b,c' | split: ',' | size }}", "3"),
        ("{{ 'a,b,c' | split: ',' | reverse | first }}", "c"),
        ("{{ 'c,a,b,a' | split: ',' | sort | uniq | join }}", "a b c"),
        ("{{ 'hello world' | truncate: 8 }}", "hello..."),
    ];
    for (src, expected) in cases {
        assert_eq!(render(&engine, src, &b).unwrap(), expected, "{}", src);
    }
}

#[test]
fn test_standard_math_filters() {
    let engine = Engine::new();
    let b = bindings! { "n" => "7" };
    let cases = [
        ("{{ n | plus: 1 }}", "8"),
        ("{{ n | minus: 10 }}", "-3"),
        ("{{ n | times: 1.5 }}", "10.5"),
        ("{{ n | divided_by: 2 }}", "3"),
        ("{{ n | divided_by: 2.0 }}", "3.5"),
        ("{{ n | modulo: 4 }}", "3"),
        ("{{ -4 | abs }}", "4"),
    ];
    for (src, expected) in cases {
        assert_eq!(render(&engine, src, &b).unwrap(), expected, "{}", src);
    }
    assert!(render(&engine, "{{ n | divided_by: 0 }}", &b).is_err());
}

#[test]
fn test_default_filter() {
    let engine = Engine::new();
    let b = bindings! { "empty" => "", "zero" => 0 };
    assert_eq!(render(&engine, "{{ missing | default: 'x' }}", &b).unwrap(), "x");
    assert_eq!(render(&engine, "{{ empty | default: 'x' }}", &b).unwrap(), "x");
    assert_eq!(render(&engine, "{{ zero | default: 'x' }}", &b).unwrap(), "0");
}

#[test]
fn test_date_filter() {
    let engine = Engine::new();
    let b = bindings! { "d" => "2017-07-09 15:04:05" };
    assert_eq!(
        render(&engine, "{{ d | date: '%Y/%m/%d %H:%M' }}", &b).unwrap(),
        "2017/07/09 15:04"
    );
    assert_eq!(render(&engine, "{{ d | date }}", &b).unwrap(), "Sun, Jul 09, 17");
    let err = render(&engine, "{{ 'soon' | date }}", &b).unwrap_err();
    assert!(matches!(err.root_cause(), Error::ArgumentType { filter, .. } if filter == "date"));
}

#[derive(Debug)]
struct Counter(usize);

impl Object for Counter {
    fn get(&self, key: &str) -> Option<Value> {
        match key {
            "count" => Some(Value::Int(self.0 as i64)),
            _ => None,
        }
    }

    fn size(&self) -> Option<usize> {
        Some(self.0)
    }
}

#[test]
fn test_drops_reach_filters() {
    let engine = Engine::new();
    let b = bindings! { "c" => Arc::new(Counter(4)) };
    assert_eq!(render(&engine, "{{ c.count | plus: 1 }}", &b).unwrap(), "5");
    assert_eq!(render(&engine, "{{ c | size }}", &b).unwrap(), "4");
    assert_eq!(render(&engine, "{{ c.size }}", &b).unwrap(), "4");
    assert_eq!(render(&engine, "{{ c.other }}", &b).unwrap(), "");
}
