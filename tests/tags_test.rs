use uliquid::{Bindings, Config, Engine, Value, bindings};

fn render(src: &str, bindings: &Bindings) -> String {
    Engine::new().parse_and_render(src, bindings).unwrap()
}

#[test]
fn test_if_elsif_else() {
    let src = "{% if n > 10 %}big{% elsif n > 5 %}mid{% else %}small{% endif %}";
    assert_eq!(render(src, &bindings! { "n" => 20 }), "big");
    assert_eq!(render(src, &bindings! { "n" => 7 }), "mid");
    assert_eq!(render(src, &bindings! { "n" => 1 }), "small");
}

#[test]
fn test_if_with_logic() {
    let src = "{% if a and b or c %}yes{% else %}no{% endif %}";
    assert_eq!(render(src, &bindings! { "a" => true, "b" => false, "c" => false }), "no");
    assert_eq!(render(src, &bindings! { "a" => true, "b" => 0, "c" => false }), "yes");
    assert_eq!(render(src, &bindings! { "c" => "x" }), "yes");
}

#[test]
fn test_unless() {
    let src = "{% unless done %}todo{% else %}done{% endunless %}";
    assert_eq!(render(src, &Bindings::new()), "todo");
    assert_eq!(render(src, &bindings! { "done" => true }), "done");
}

#[test]
fn test_for_loop_and_forloop() {
    let src = "{% for x in xs %}{{ forloop.index }}:{{ x }}{% if forloop.last %}.{% else %},{% endif %}{% endfor %}";
    assert_eq!(
        render(src, &bindings! { "xs" => vec!["a", "b", "c"] }),
        "1:a,2:b,3:c."
    );
}

#[test]
fn test_for_range_reversed_and_else() {
    assert_eq!(render("{% for i in (1..4) reversed %}{{ i }}{% endfor %}", &Bindings::new()), "4321");
    assert_eq!(
        render("{% for x in missing %}{{ x }}{% else %}empty{% endfor %}", &Bindings::new()),
        "empty"
    );
}

#[test]
fn test_for_over_map_yields_pairs() {
    let mut m = std::collections::HashMap::new();
    m.insert("b".to_string(), 2);
    m.insert("a".to_string(), 1);
    assert_eq!(
        render("{% for p in m %}{{ p[0] }}={{ p[1] }};{% endfor %}", &bindings! { "m" => m }),
        "a=1;b=2;"
    );
}

#[test]
fn test_nested_loops_shadow_and_restore() {
    let src = "{% for x in outer %}[{% for x in inner %}{{ x }}{% endfor %}{{ x }}]{% endfor %}";
    let out = render(
        src,
        &bindings! { "outer" => vec![1, 2], "inner" => vec!["a", "b"] },
    );
    assert_eq!(out, "[ab1][ab2]");
}

#[test]
fn test_case_when() {
    let src = "{% case c %}{% when 'r', 'red' %}R{% when 'g' %}G{% else %}?{% endcase %}";
    assert_eq!(render(src, &bindings! { "c" => "red" }), "R");
    assert_eq!(render(src, &bindings! { "c" => "g" }), "G");
    assert_eq!(render(src, &bindings! { "c" => "b" }), "?");
}

#[test]
fn test_assign_and_capture() {
    let src = "{% assign name = 'World' | upcase %}{% capture greeting %}Hello {{ name }}{% endcapture %}{{ greeting }}!";
    assert_eq!(render(src, &Bindings::new()), "Hello WORLD!");
}

#[test]
fn test_assign_at_top_level_shadows_bindings() {
    let src = "{{ x }}{% assign x = 2 %}{{ x }}";
    assert_eq!(render(src, &bindings! { "x" => 1 }), "12");
}

#[test]
fn test_assign_inside_loop_body_stays_in_loop_frame() {
    let src = "{% for i in (1..2) %}{% assign last = i %}{{ last }}{% endfor %}[{{ last }}]";
    assert_eq!(render(src, &Bindings::new()), "12[]");
}

#[test]
fn test_assign_inside_if_reaches_enclosing_frame() {
    let src = "{% if true %}{% assign seen = 'yes' %}{% endif %}{{ seen }}";
    assert_eq!(render(src, &Bindings::new()), "yes");
}

#[test]
fn test_comment_emits_nothing() {
    assert_eq!(render("a{% comment %}{{ x }}{% endcomment %}b", &Bindings::new()), "ab");
}

#[test]
fn test_apostrophes_in_raw_tag_args() {
    let engine = Engine::new();
    engine.register_tag("echo", |ctx| Ok(ctx.tag_args().to_string()));
    assert_eq!(
        engine
            .parse_and_render("{% echo don't %}|{% echo won't %}", &Bindings::new())
            .unwrap(),
        "don't|won't"
    );
}

#[test]
fn test_context_write_precedes_returned_text() {
    let engine = Engine::new();
    engine.register_tag("both", |ctx| {
        ctx.write("written-");
        Ok("returned".to_string())
    });
    assert_eq!(
        engine.parse_and_render("{% both %}", &Bindings::new()).unwrap(),
        "written-returned"
    );
}

#[test]
fn test_block_renders_body_with_frame() {
    let engine = Engine::new();
    engine.register_block("with_name", |ctx| {
        let mut frame = Bindings::new();
        frame.insert("name".to_string(), ctx.evaluate(ctx.tag_args())?);
        ctx.render_body_with(frame)
    });
    let out = engine
        .parse_and_render(
            "{{ name }}|{% with_name 'inner' | upcase %}{{ name }}{% endwith_name %}|{{ name }}",
            &bindings! { "name" => "outer" },
        )
        .unwrap();
    assert_eq!(out, "outer|INNER|outer");
}

#[test]
fn test_block_clauses_are_exposed() {
    let engine = Engine::new();
    engine.register_block_with_clauses("pick", &["option"], |ctx| {
        let index = ctx.evaluate(ctx.tag_args())?;
        let wanted = match index {
            Value::Int(n) => n as usize,
            _ => 0,
        };
        let names: Vec<String> = ctx.clauses().iter().map(|c| c.args().to_string()).collect();
        let body = ctx.render_clause(wanted)?;
        Ok(format!("{}:{}", names.join("/"), body))
    });
    let out = engine
        .parse_and_render(
            "{% pick 1 %}ignored{% option a %}A{% option b %}B{% endpick %}",
            &Bindings::new(),
        )
        .unwrap();
    assert_eq!(out, "a/b:B");
}

#[test]
fn test_block_methods_are_empty_for_inline_tags() {
    let engine = Engine::new();
    engine.register_tag("probe", |ctx| {
        let inner = ctx.inner_string()?;
        Ok(format!("[{}]{}", inner, ctx.clauses().len()))
    });
    assert_eq!(engine.parse_and_render("{% probe %}", &Bindings::new()).unwrap(), "[]0");
}

#[test]
fn test_reregistration_replaces_tag() {
    let engine = Engine::empty();
    engine.register_tag("t", |_ctx| Ok("one".to_string()));
    engine.register_tag("t", |_ctx| Ok("two".to_string()));
    assert_eq!(engine.parse_and_render("{% t %}", &Bindings::new()).unwrap(), "two");
}

#[test]
fn test_custom_delimiters() {
    let engine = Engine::with_config(Config::default().delims("[[", "]]", "[%", "%]"));
    let out = engine
        .parse_and_render("[% for i in (1..3) %][[ i ]][% endfor %] {{ raw }}", &Bindings::new())
        .unwrap();
    assert_eq!(out, "123 {{ raw }}");
}
