use serde_json::json;
use weft::{
    Delimiters, Map, ReindentPolicy, RenderOptions, Value, WeftError, render,
    render_with_delimiters,
};

fn env(value: serde_json::Value) -> Map {
    match Value::from(value) {
        Value::Map(map) => map,
        _ => panic!("test environment must be an object"),
    }
}

fn items() -> Map {
    env(json!({"items": [{"name": "a", "qty": 1}, {"name": "b", "qty": 2}]}))
}

#[test]
fn test_substitution_leaves_other_text_identical() {
    let variables = env(json!({"x": "value"}));
    let template = "pre {{x}} mid { x } {{y}} {{x}} post\n";
    let result = render(template, &variables, &RenderOptions::default()).unwrap();
    assert_eq!(result, "pre value mid { x } {{y}} value post\n");
}

#[test]
fn test_loop_expansion_with_qualified_key() {
    let template = "(items)[\n  {{items_name}}\n]";
    let result = render(template, &items(), &RenderOptions::strict()).unwrap();
    assert_eq!(result, "a\nb");
    assert!(!result.contains("(items)"));
}

#[test]
fn test_loop_expansion_with_bare_key() {
    let template = "before\n(items)[\n  {{name}}={{qty}}\n]\nafter";
    let result = render(template, &items(), &RenderOptions::strict()).unwrap();
    assert_eq!(result, "before\na=1\nb=2\nafter");
}

#[test]
fn test_loop_joiner() {
    let template = "values: [\n  (items)(,)[\n    {{name}}\n  ]\n]";
    let result = render(template, &items(), &RenderOptions::strict()).unwrap();
    assert_eq!(result, "values: [\n  a,\n  b\n]");
}

#[test]
fn test_two_loops_do_not_collide() {
    let variables = env(json!({
        "xs": [{"v": "x0"}, {"v": "x1"}],
        "ys": [{"v": "y0"}]
    }));
    let template = "(xs)[\n{{v}}\n]\n--\n(ys)[\n{{v}}\n]";
    let result = render(template, &variables, &RenderOptions::strict()).unwrap();
    assert_eq!(result, "x0\nx1\n--\ny0");
}

#[test]
fn test_idempotent_on_rendered_output() {
    let variables = env(json!({"x": "1", "y": "2"}));
    let once = render("{{x}} and {{y}}", &variables, &RenderOptions::strict()).unwrap();
    let twice = render(&once, &variables, &RenderOptions::strict()).unwrap();
    assert_eq!(once, "1 and 2");
    assert_eq!(once, twice);
}

#[test]
fn test_strict_mode_boundary() {
    let result = render("{{missing}}", &Map::new(), &RenderOptions::strict());
    assert!(matches!(
        result,
        Err(WeftError::MissingVariable { ref name }) if name == "missing"
    ));

    let result = render("{{missing}}", &Map::new(), &RenderOptions::default()).unwrap();
    assert_eq!(result, "{{missing}}");
}

#[test]
fn test_multi_character_delimiter_safety() {
    let variables = env(json!({"a}b": "first", "c": "second"}));
    let result = render_with_delimiters(
        "#{a}b}# / #{c}#",
        &variables,
        "#{",
        "}#",
        "",
        "",
        "",
        "",
        true,
    )
    .unwrap();
    assert_eq!(result, "first / second");
}

#[test]
fn test_custom_delimiters_for_every_role() {
    let variables = env(json!({"rows": [{"v": 1}, {"v": 2}], "t": "T"}));
    let template = "<%t%>\n<<rows>><<, >>[[\n  <%v%>\n]]\n{{untouched}}";
    let options = RenderOptions {
        delimiters: Delimiters::new("<%", "%>", "<<", ">>", "[[", "]]"),
        strict: true,
        ..RenderOptions::default()
    };
    let result = render(template, &variables, &options).unwrap();
    assert_eq!(result, "T\n1, \n2\n{{untouched}}");
}

#[test]
fn test_reindentation_to_tag_offset() {
    let template = "root:\n  (items)[\n    - {{name}}\n      qty: {{qty}}\n  ]\nend";
    let result = render(template, &items(), &RenderOptions::strict()).unwrap();
    assert_eq!(
        result,
        "root:\n  - a\n    qty: 1\n  - b\n    qty: 2\nend"
    );
}

#[test]
fn test_reindent_underflow_policies() {
    let template = "    (items)[\n  {{name}}\n    ]";

    let preserved = render(template, &items(), &RenderOptions::default()).unwrap();
    assert_eq!(preserved, "  a\n  b");

    let padded = render(
        template,
        &items(),
        &RenderOptions {
            reindent: ReindentPolicy::Pad,
            ..RenderOptions::default()
        },
    )
    .unwrap();
    assert_eq!(padded, "    a\n    b");

    let failed = render(
        template,
        &items(),
        &RenderOptions {
            reindent: ReindentPolicy::Fail,
            ..RenderOptions::default()
        },
    );
    assert!(matches!(
        failed,
        Err(WeftError::ReindentUnderflow { offset: 4, indent: 2, .. })
    ));
}

#[test]
fn test_absent_array_renders_empty_but_missing_scalar_fails() {
    let template = "(nothing)[\n  {{name}}\n]\n{{title}}";
    let variables = env(json!({"title": "T"}));
    let result = render(template, &variables, &RenderOptions::strict()).unwrap();
    assert_eq!(result, "\nT");

    let result = render("{{title}}", &Map::new(), &RenderOptions::strict());
    assert!(matches!(result, Err(WeftError::MissingVariable { .. })));
}

#[test]
fn test_crlf_template() {
    let template = "(items)[\r\n  {{name}}\r\n]\r\nend";
    let result = render(template, &items(), &RenderOptions::strict()).unwrap();
    assert_eq!(result, "a\r\nb\r\nend");

    let template = "(items)(;)[\r\n  {{name}}\r\n]";
    let result = render(template, &items(), &RenderOptions::strict()).unwrap();
    assert_eq!(result, "a;\r\nb");
}

#[test]
fn test_element_key_shaped_like_qualified_key() {
    let variables = env(json!({"row": [{"id": "A", "row_id": "RID"}]}));
    let template = "(row)[\n{{id}} {{row_id}}\n]";
    let result = render(template, &variables, &RenderOptions::strict()).unwrap();
    assert_eq!(result, "A RID");
}

#[test]
fn test_body_opening_with_blank_line_aligns_to_tag() {
    let variables = env(json!({"items": [{"n": "a"}, {"n": "b"}]}));
    let template = "  (items)[\n\n      {{n}}\n  ]";
    let options = RenderOptions {
        reindent: ReindentPolicy::Fail,
        ..RenderOptions::strict()
    };
    let result = render(template, &variables, &options).unwrap();
    assert_eq!(result, "\n  a\n\n  b");
}

#[test]
fn test_multibyte_text_and_offsets() {
    let template = "  (items)[\n      ünï {{name}} ✓\n  ]";
    let result = render(template, &items(), &RenderOptions::strict()).unwrap();
    assert_eq!(result, "  ünï a ✓\n  ünï b ✓");
}

#[test]
fn test_values_stringification() {
    let variables = env(json!({"n": 1.5, "b": false, "z": null, "l": [1, "x"]}));
    let result = render("{{n}}|{{b}}|{{z}}|{{l}}", &variables, &RenderOptions::strict()).unwrap();
    assert_eq!(result, r#"1.5|false||[1,"x"]"#);
}

#[test]
fn test_top_level_variable_wins_over_synthetic_name() {
    let variables = env(json!({
        "items": [{"name": "a"}],
        "items_name_0": "override"
    }));
    let result = render("(items)[\n{{name}}\n]", &variables, &RenderOptions::strict()).unwrap();
    assert_eq!(result, "override");
}

#[test]
fn test_independent_calls_on_threads() {
    let handles: Vec<_> = (0..4)
        .map(|i| {
            std::thread::spawn(move || {
                let variables = env(json!({"items": [{"name": i}]}));
                render("(items)[\n{{name}}\n]", &variables, &RenderOptions::strict())
            })
        })
        .collect();

    for (i, handle) in handles.into_iter().enumerate() {
        assert_eq!(handle.join().unwrap().unwrap(), i.to_string());
    }
}
