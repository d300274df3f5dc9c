// Copyright 2019-2026 Maravilla Labs, operated by SOLUTAS GmbH, Switzerland
// SPDX-License-Identifier: Apache-2.0
// SPDX-License-Identifier: MIT

use crate::*;
use std::fs;
use std::sync::Arc;
use tempfile::TempDir;

// Helper function to build a loader over an in-memory template map
fn memory_loader(templates: &[(&str, &str)]) -> Loader {
    let source: MemorySource = templates.iter().copied().collect();
    Loader::builder().source(source).build()
}

fn site_loader() -> Loader {
    memory_loader(&[
        ("base.html", "<html><head>{{ head }}</head><body>{{ body }}</body></html>"),
        ("include1.html", "<div>{{ content}}</div>"),
        ("include2.html", "<div>hello</div>"),
        ("include3.html", "<body>{% include 'include1.html' %}</body>"),
        ("include4.html", "<body>{% include 'include2.html' %}</body>"),
    ])
}

#[cfg(test)]
mod render_tests {
    use super::*;

    #[test]
    fn test_literal_text_renders_unchanged() {
        for text in ["hello\tworld\n中文", "", "a < b & c > d", "{ not a tag }", "}} %} #}"] {
            assert_eq!(render(text, params! {}).unwrap(), text);
        }
    }

    #[test]
    fn test_comments_are_dropped() {
        assert_eq!(render("text{# this is a comment #}", params! {}).unwrap(), "text");
        assert_eq!(render("{# multi\nline\ncomment #}", params! {}).unwrap(), "");
    }

    #[test]
    fn test_expression_tags() {
        assert_eq!(render("{{'hello'}}", params! {}).unwrap(), "hello");
        assert_eq!(render("{{('hello '\n'world')}}", params! {}).unwrap(), "hello world");
        assert_eq!(render("{{ hello }}", params! { "hello" => "world" }).unwrap(), "world");
        assert_eq!(render("{{ 1 / 2 }} {{ None }} {{ 1 == 1 }}", params! {}).unwrap(), "0.5 None True");
        assert_eq!(render("{{ {'a': [1, 'b']} }}", params! {}).unwrap(), "{'a': [1, 'b']}");
    }

    #[test]
    fn test_empty_tags_render_nothing() {
        assert_eq!(render("a{{ }}b{%  %}c", params! {}).unwrap(), "abc");
    }

    #[test]
    fn test_if_selection() {
        let template = compile(
            "{% if test == 'foo' %}foo{% elif test == 'bar' %}bar{% elif test == 'foobar' %}foobar{% endif %}",
        )
        .unwrap();
        assert_eq!(template.render(params! { "test" => "foo" }).unwrap(), "foo");
        assert_eq!(template.render(params! { "test" => "bar" }).unwrap(), "bar");
        assert_eq!(template.render(params! { "test" => "foobar" }).unwrap(), "foobar");
        assert_eq!(template.render(params! { "test" => "no" }).unwrap(), "");

        let template = compile("{% if test == 'foo' %}foo{% else %}bar{% endif %}").unwrap();
        assert_eq!(template.render(params! { "test" => "foo" }).unwrap(), "foo");
        assert_eq!(template.render(params! { "test" => "x" }).unwrap(), "bar");
    }

    #[test]
    fn test_if_compile_errors() {
        for source in [
            "{% if True %}",
            "{% if True %}{% else %}{% elif True %}{% endif %}",
            "{% if True %}{% else %}{% else %}{% endif %}",
        ] {
            assert!(
                matches!(compile(source), Err(TemplateError::Compile { .. })),
                "{source:?} should not compile"
            );
        }
    }

    #[test]
    fn test_for_loops() {
        assert_eq!(render("{% for i in range(5) %}{{ i }}{% endfor %}", params! {}).unwrap(), "01234");
        assert_eq!(
            render(
                "{% for n in range(2) %}<img src=\"/img/{{n}}.jpg\" />{% endfor %}",
                params! {}
            )
            .unwrap(),
            "<img src=\"/img/0.jpg\" /><img src=\"/img/1.jpg\" />"
        );
        assert_eq!(
            render("{% for n in range(5) %}{% if n > 2 %}{{ n }}{% endif %}{% endfor %}", params! {}).unwrap(),
            "34"
        );
        assert!(matches!(compile("{% for n in range(0, 3) %}"), Err(TemplateError::Compile { .. })));
    }

    #[test]
    fn test_for_unpacking_errors_are_render_errors() {
        let template = compile("{% for n, m in value %}{{ n }}{{ m }}{% endfor %}").unwrap();
        let pair = |items: Vec<&str>| params! { "value" => Value::List(vec![Value::from(items)]) };

        assert_eq!(template.render(pair(vec!["foo", "bar"])).unwrap(), "foobar");
        assert!(matches!(template.render(pair(vec!["foo"])), Err(TemplateError::Render { .. })));
        assert!(matches!(
            template.render(pair(vec!["foo", "bar", "foobar"])),
            Err(TemplateError::Render { .. })
        ));
    }

    #[test]
    fn test_for_over_map_items() {
        let mut scores = Map::new();
        scores.insert("ada".to_string(), Value::Int(3));
        scores.insert("alan".to_string(), Value::Int(5));
        let out = render(
            "{% for name, score in scores.items() %}{{ name }}:{{ score }};{% endfor %}",
            params! { "scores" => scores },
        )
        .unwrap();
        assert_eq!(out, "ada:3;alan:5;");
    }

    #[test]
    fn test_loop_variables_remain_bound() {
        let out = render("{% for x in ['a', 'b'] %}{% endfor %}{{ x }}", params! {}).unwrap();
        assert_eq!(out, "b");
    }

    #[test]
    fn test_include_template_value() {
        let template1 = compile("template1").unwrap();
        let template2 = compile("template2 include {% include t1 %}").unwrap();
        assert_eq!(
            template2.render(params! { "t1" => template1 }).unwrap(),
            "template2 include template1"
        );
    }

    #[test]
    fn test_oversized_repetition_is_a_render_error() {
        match render("ok\n{{ 'ab' * 9223372036854775807 }}", params! {}) {
            Err(TemplateError::Render { message, name, line }) => {
                assert_eq!(message, "integer overflow");
                assert_eq!(name, "__string__");
                assert_eq!(line, 2);
            }
            other => panic!("expected render error, got {other:?}"),
        }
    }

    #[test]
    fn test_render_error_location() {
        let source = "line one\n{% for i in items %}\n  {{ i.missing }}\n{% endfor %}";
        let mut item = Map::new();
        item.insert("present".to_string(), Value::Int(1));
        let err = compile(source)
            .unwrap()
            .render(params! { "items" => vec![Value::Map(item)] })
            .unwrap_err();
        match err {
            TemplateError::Render { message, name, line } => {
                assert_eq!(message, "'dict' object has no attribute 'missing'");
                assert_eq!(name, "__string__");
                assert_eq!(line, 3);
            }
            other => panic!("expected render error, got {other:?}"),
        }
    }

    #[test]
    fn test_compile_error_snippet() {
        let err = compile("<ul>\n{% for item %}\n</ul>").unwrap_err();
        let text = err.to_string();
        assert!(text.starts_with("{% for item %} is not a recognized tag. [__string__ on line 2]"));
        assert!(text.contains(" >   2 | {% for item %}"));
    }

    #[test]
    fn test_template_defaults_and_globals() {
        let meta = Meta::default()
            .with_global("site", "typhoon")
            .with_global("shout", Function::new("shout", |args| {
                Ok(Value::from(format!("{}!", args.first().cloned().unwrap_or_default())))
            }));
        let template = Parser::new()
            .compile("{{ shout(greeting) }} from {{ site }}", "page.txt", params! { "greeting" => "hi" }, meta)
            .unwrap();
        assert_eq!(template.render(params! {}).unwrap(), "hi! from typhoon");
        assert_eq!(template.render(params! { "greeting" => "bye" }).unwrap(), "bye! from typhoon");
        assert_eq!(template.render(params! { "site" => "mine" }).unwrap(), "hi! from mine");
    }

    #[test]
    fn test_rendering_is_repeatable() {
        let template = compile("{% for i in range(n) %}{{ i * i }},{% endfor %}").unwrap();
        let first = template.render(params! { "n" => 4 }).unwrap();
        let second = template.render(params! { "n" => 4 }).unwrap();
        assert_eq!(first, "0,1,4,9,");
        assert_eq!(first, second);
    }
}

#[cfg(test)]
mod lexer_tests {
    use super::*;

    #[test]
    fn test_tokens_partition_the_source() {
        let source = "a {{ x }}\n{% if y %}b{# c\n #}{% endif %}\ntail";
        let tokens: Vec<Token> = tokenize(source).collect();

        let mut covered = 0;
        for token in &tokens {
            assert!(token.span.start >= covered);
            if token.kind == TokenKind::Text {
                assert_eq!(&source[token.span.clone()], token.content);
            }
            covered = token.span.end;
        }
        assert_eq!(covered, source.len());

        let lines: Vec<usize> = tokens.iter().map(|t| t.line).collect();
        assert_eq!(lines, vec![1, 1, 1, 2, 2, 3, 3]);
    }
}

#[cfg(test)]
mod escape_tests {
    use super::*;

    #[test]
    fn test_html_templates_escape_expression_output() {
        let parser = Parser::new();
        let html = parser.compile("<p>{{ \"<b>\" }}</p>", "page.html", params! {}, Meta::default()).unwrap();
        assert_eq!(html.render(params! {}).unwrap(), "<p>&lt;b&gt;</p>");

        let plain = parser.compile_str("<p>{{ \"<b>\" }}</p>").unwrap();
        assert_eq!(plain.render(params! {}).unwrap(), "<p><b></p>");
    }

    #[test]
    fn test_included_template_uses_its_own_escaping() {
        let loader = memory_loader(&[
            ("page.html", "{{ v }}|{% include 'note.txt' %}"),
            ("note.txt", "{{ v }}"),
        ]);
        assert_eq!(loader.render("page.html", params! { "v" => "<i>" }).unwrap(), "&lt;i&gt;|<i>");
    }
}

#[cfg(test)]
mod loader_tests {
    use super::*;

    #[test]
    fn test_load() {
        let loader = site_loader();
        assert_eq!(loader.load("base.html").unwrap().name(), "base.html");
    }

    #[test]
    fn test_render_by_name() {
        let loader = site_loader();
        assert_eq!(
            loader.render("base.html", params! { "head" => "hello", "body" => "world" }).unwrap(),
            "<html><head>hello</head><body>world</body></html>"
        );
    }

    #[test]
    fn test_include_by_name() {
        let loader = site_loader();
        assert_eq!(
            loader.render("include3.html", params! { "content" => "world" }).unwrap(),
            "<body><div>world</div></body>"
        );
        assert_eq!(loader.render("include4.html", params! {}).unwrap(), "<body><div>hello</div></body>");
        assert!(loader.is_cached("include2.html"));
    }

    #[test]
    fn test_cache_identity_and_clear() {
        let loader = site_loader();
        let first = loader.load("base.html").unwrap();
        let second = loader.load("base.html").unwrap();
        assert!(Arc::ptr_eq(&first, &second));

        loader.clear_cache().unwrap();
        let third = loader.load("base.html").unwrap();
        assert!(!Arc::ptr_eq(&first, &third));
    }

    #[test]
    fn test_missing_include_is_a_render_error() {
        let loader = memory_loader(&[("page.html", "a\n{% include 'gone.html' %}")]);
        match loader.render("page.html", params! {}) {
            Err(TemplateError::Render { message, name, line }) => {
                assert_eq!(message, "could not find template 'gone.html'");
                assert_eq!(name, "page.html");
                assert_eq!(line, 2);
            }
            other => panic!("expected render error, got {other:?}"),
        }
    }

    #[test]
    fn test_nested_include_errors_keep_innermost_location() {
        let loader = memory_loader(&[
            ("outer.txt", "{% include 'inner.txt' %}"),
            ("inner.txt", "\n\n{{ nope }}"),
        ]);
        let err = loader.render("outer.txt", params! {}).unwrap_err();
        assert_eq!(err.to_string(), "name 'nope' is not defined [inner.txt on line 3]");
    }

    #[cfg(feature = "filesystem")]
    #[test]
    fn test_directory_source() {
        let temp_dir = TempDir::new().unwrap();
        fs::create_dir_all(temp_dir.path().join("partials")).unwrap();
        fs::write(temp_dir.path().join("index.html"), "<main>{% include 'partials/item.html' %}</main>").unwrap();
        fs::write(temp_dir.path().join("partials/item.html"), "{{ item }}").unwrap();

        let loader = Loader::builder()
            .source(MemorySource::new().with_template("partials/item.html", "memory wins: {{ item }}"))
            .source(DirectorySource::new(temp_dir.path()))
            .build();
        assert_eq!(
            loader.render("index.html", params! { "item" => "a&b" }).unwrap(),
            "<main>memory wins: a&amp;b</main>"
        );
    }

    #[test]
    fn test_concurrent_loads_share_one_template() {
        let loader = site_loader();
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let loader = loader.clone();
                std::thread::spawn(move || loader.load("base.html").unwrap())
            })
            .collect();
        let templates: Vec<Arc<Template>> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert!(templates.windows(2).all(|pair| Arc::ptr_eq(&pair[0], &pair[1])));
    }
}
