/*
 * render.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! End-to-end rendering of document parts.

use std::collections::HashMap;
use std::io::Cursor;

use pretty_assertions::assert_eq;
use serde_json::json;
use wordmerge_template::{
    Callable, Context, DocumentPart, FieldCache, PartKind, RenderEnv, RenderOptions,
    TemplateError, Value,
};

fn field(expr: &str) -> String {
    format!(
        r#"<w:fldSimple w:instr=" MERGEFIELD {} \* MERGEFORMAT "><w:r><w:t>«{}»</w:t></w:r></w:fldSimple>"#,
        expr, expr
    )
}

fn complex_field(expr: &str) -> String {
    format!(
        r#"<w:r><w:fldChar w:fldCharType="begin"/></w:r><w:r><w:instrText xml:space="preserve"> MERGEFIELD {} \* MERGEFORMAT </w:instrText></w:r><w:r><w:fldChar w:fldCharType="separate"/></w:r><w:r><w:t>«{}»</w:t></w:r><w:r><w:fldChar w:fldCharType="end"/></w:r>"#,
        expr, expr
    )
}

fn run(text: &str) -> String {
    if text.starts_with(' ') || text.ends_with(' ') {
        format!(r#"<w:r><w:t xml:space="preserve">{}</w:t></w:r>"#, text)
    } else {
        format!("<w:r><w:t>{}</w:t></w:r>", text)
    }
}

fn p(inner: &str) -> String {
    format!("<w:p>{}</w:p>", inner)
}

fn document(body: &str) -> String {
    format!("<w:document><w:body>{}</w:body></w:document>", body)
}

fn render(xml: &str, context: &Context) -> Result<String, TemplateError> {
    render_with(xml, context, &mut RenderEnv::new(), &RenderOptions::default())
}

fn render_with(
    xml: &str,
    context: &Context,
    env: &mut RenderEnv,
    options: &RenderOptions,
) -> Result<String, TemplateError> {
    let mut part = DocumentPart::parse(xml, PartKind::Document)?;
    part.render(context, env, options)?;
    Ok(part.to_xml())
}

fn people() -> Context {
    Context::from_json(json!({
        "people": [{"name": "Ada"}, {"name": "Grace"}],
        "nobody": [],
    }))
    .unwrap()
}

#[test]
fn test_paragraph_loop() {
    let xml = document(&[
        p(&field("people:each(person)")),
        p(&format!("{}{}", run("Name: "), field("=person.name"))),
        p(&field("people:endEach")),
    ]
    .concat());

    assert_eq!(
        render(&xml, &people()).unwrap(),
        document(&[
            p(&format!("{}{}", run("Name: "), run("Ada"))),
            p(&format!("{}{}", run("Name: "), run("Grace"))),
        ]
        .concat())
    );
}

#[test]
fn test_row_loop() {
    let row = |cell: &str| format!("<w:tr><w:tc>{}</w:tc></w:tr>", p(cell));
    let xml = document(&format!(
        "<w:tbl>{}{}{}{}</w:tbl>",
        row(&run("Header")),
        row(&field("people:each(person)")),
        row(&field("=person.name")),
        row(&field("people:endEach")),
    ));

    assert_eq!(
        render(&xml, &people()).unwrap(),
        document(&format!(
            "<w:tbl>{}{}{}</w:tbl>",
            row(&run("Header")),
            row(&run("Ada")),
            row(&run("Grace")),
        ))
    );
}

#[test]
fn test_nested_loops() {
    let context = Context::from_json(json!({
        "groups": [
            {"name": "A", "items": [1, 2]},
            {"name": "B", "items": [3]},
        ]
    }))
    .unwrap();
    let xml = document(&[
        p(&field("groups:each(group)")),
        p(&field("=group.name")),
        p(&field("group.items:each(item)")),
        p(&field("=item")),
        p(&field("group.items:endEach")),
        p(&field("groups:endEach")),
    ]
    .concat());

    let expected: String = ["A", "1", "2", "B", "3"].iter().map(|t| p(&run(t))).collect();
    assert_eq!(render(&xml, &context).unwrap(), document(&expected));
}

#[test]
fn test_loop_over_empty_list_removes_block() {
    let xml = document(&[
        p(&run("before")),
        p(&field("nobody:each(person)")),
        p(&field("=person.name")),
        p(&field("nobody:endEach")),
        p(&run("after")),
    ]
    .concat());

    assert_eq!(
        render(&xml, &people()).unwrap(),
        document(&[p(&run("before")), p(&run("after"))].concat())
    );
}

#[test]
fn test_row_loop_over_empty_list_keeps_other_rows() {
    let row = |cell: &str| format!("<w:tr><w:tc>{}</w:tc></w:tr>", p(cell));
    let xml = document(&format!(
        "<w:tbl>{}{}{}{}</w:tbl>",
        row(&run("Header")),
        row(&field("nobody:each(person)")),
        row(&field("=person.name")),
        row(&field("nobody:endEach")),
    ));

    assert_eq!(
        render(&xml, &people()).unwrap(),
        document(&format!("<w:tbl>{}</w:tbl>", row(&run("Header"))))
    );
}

#[test]
fn test_nested_loops_over_the_same_list() {
    let context = Context::from_json(json!({"items": ["a", "b"]})).unwrap();
    let xml = document(&[
        p(&field("items:each(x)")),
        p(&field("items:each(y)")),
        p(&format!("{}{}", field("=x"), field("=y"))),
        p(&field("items:endEach")),
        p(&field("items:endEach")),
        p(&run("after")),
    ]
    .concat());

    let mut expected: String = [("a", "a"), ("a", "b"), ("b", "a"), ("b", "b")]
        .iter()
        .map(|(x, y)| p(&format!("{}{}", run(x), run(y))))
        .collect();
    expected.push_str(&p(&run("after")));
    assert_eq!(render(&xml, &context).unwrap(), document(&expected));
}

#[test]
fn test_false_insertion_removes_field() {
    let context = Context::from_json(json!({"flag": false})).unwrap();
    let xml = document(&p(&format!("{}{}", run("Hello"), field("=flag"))));
    assert_eq!(
        render(&xml, &context).unwrap(),
        document(&p(&run("Hello")))
    );
}

#[test]
fn test_nil_insertion_removes_field() {
    let context = Context::from_json(json!({"greeting": null})).unwrap();
    let xml = document(&p(&format!("{}{}", run("Hello"), field("=greeting"))));
    assert_eq!(
        render(&xml, &context).unwrap(),
        document(&p(&run("Hello")))
    );
}

#[test]
fn test_complex_field_insertion() {
    let context = Context::from_json(json!({"name": "Ada"})).unwrap();
    let xml = document(&p(&complex_field("=name")));
    assert_eq!(render(&xml, &context).unwrap(), document(&p(&run("Ada"))));
}

#[test]
fn test_condition_on_empty_list_removes_block() {
    let xml = document(&[
        p(&run("before")),
        p(&field("nobody:if")),
        p(&run("hidden")),
        p(&field("nobody:endIf")),
        p(&run("after")),
    ]
    .concat());

    assert_eq!(
        render(&xml, &people()).unwrap(),
        document(&[p(&run("before")), p(&run("after"))].concat())
    );
}

#[test]
fn test_condition_with_predicate() {
    let xml = document(&[
        p(&field("people:if(any?)")),
        p(&run("some")),
        p(&field("people:endIf")),
        p(&field("people:if(empty?)")),
        p(&run("none")),
        p(&field("people:endIf")),
    ]
    .concat());

    assert_eq!(render(&xml, &people()).unwrap(), document(&p(&run("some"))));
}

#[test]
fn test_inline_condition_keeps_paragraph() {
    let context = Context::from_json(json!({"flag": true, "off": false})).unwrap();
    let xml = document(&p(&[
        run("a"),
        field("flag:if"),
        run("b"),
        field("flag:endIf"),
        field("off:if"),
        run("c"),
        field("off:endIf"),
    ]
    .concat()));

    assert_eq!(
        render(&xml, &context).unwrap(),
        document(&p(&format!("{}{}", run("a"), run("b"))))
    );
}

#[test]
fn test_comment_block_is_dropped() {
    let xml = document(&[
        p(&field("comment")),
        p(&field("=never.evaluated")),
        p(&field("endComment")),
        p(&run("kept")),
    ]
    .concat());

    assert_eq!(render(&xml, &Context::new()).unwrap(), document(&p(&run("kept"))));
}

#[test]
fn test_nested_comment_blocks_are_dropped() {
    let xml = document(&[
        p(&field("comment")),
        p(&field("comment")),
        p(&run("inner")),
        p(&field("endComment")),
        p(&run("outer")),
        p(&field("endComment")),
        p(&run("after")),
    ]
    .concat());

    assert_eq!(render(&xml, &Context::new()).unwrap(), document(&p(&run("after"))));
}

#[test]
fn test_call_block_renders_body_with_call_context() {
    let mut context = people();
    context.insert(
        "letter",
        Callable::new(|scope, body, args| {
            let who = args.first().cloned().unwrap_or_default();
            let mut nodes = Vec::new();
            for &node in body {
                let copy = scope.document().deep_clone(node);
                scope.render(copy, who.clone())?;
                nodes.push(copy);
            }
            Ok(nodes)
        }),
    );

    let xml = document(&[
        p(&field("people:each(person)")),
        p(&field("letter:call(=person)")),
        p(&format!("{}{}", run("Dear "), field("=call_context.name"))),
        p(&field("letter:endCall")),
        p(&field("people:endEach")),
    ]
    .concat());

    assert_eq!(
        render(&xml, &context).unwrap(),
        document(&[
            p(&format!("{}{}", run("Dear "), run("Ada"))),
            p(&format!("{}{}", run("Dear "), run("Grace"))),
        ]
        .concat())
    );
}

#[test]
fn test_call_on_non_callable_fails() {
    let xml = document(&[p(&field("people:call")), p(&field("people:endCall"))].concat());
    let err = render(&xml, &people()).unwrap_err();
    assert!(matches!(err, TemplateError::NotCallable { .. }), "{:?}", err);
}

#[test]
fn test_loop_over_scalar_fails() {
    let context = Context::from_json(json!({"name": "Ada"})).unwrap();
    let xml = document(&[p(&field("name:each(c)")), p(&field("name:endEach"))].concat());
    let err = render(&xml, &context).unwrap_err();
    assert_eq!(
        err.to_string(),
        r#"The expression «name» should evaluate to an enumerable but was: "Ada""#
    );
}

#[test]
fn test_unmatched_block_fails() {
    let xml = document(&[p(&field("people:each(person)")), p(&field("=person.name"))].concat());
    let err = render(&xml, &people()).unwrap_err();
    assert!(matches!(err, TemplateError::UnmatchedBlock { .. }), "{:?}", err);
}

#[test]
fn test_empty_cells_get_a_paragraph() {
    let xml = document(&format!(
        "<w:tbl><w:tr><w:tc>{}</w:tc><w:tc>{}</w:tc></w:tr></w:tbl>",
        field("=missing"),
        p(&run("x"))
    ));
    assert_eq!(
        render(&xml, &Context::new()).unwrap(),
        document(&format!(
            "<w:tbl><w:tr><w:tc>{}</w:tc><w:tc>{}</w:tc></w:tr></w:tbl>",
            "<w:p/>",
            p(&run("x"))
        ))
    );
}

#[test]
fn test_start_page_number_option() {
    let xml = document(&format!("{}<w:sectPr/>", p(&run("x"))));
    let options = RenderOptions {
        start_page_number: Some(3),
        ..Default::default()
    };
    let rendered = render_with(&xml, &Context::new(), &mut RenderEnv::new(), &options).unwrap();
    assert_eq!(
        rendered,
        document(&format!(
            r#"{}<w:sectPr><w:pgNumType w:start="3"/></w:sectPr>"#,
            p(&run("x"))
        ))
    );
}

fn png(width: u32, height: u32) -> Vec<u8> {
    let mut bytes = Vec::new();
    image::DynamicImage::new_rgb8(width, height)
        .write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png)
        .unwrap();
    bytes
}

fn picture(expr: &str) -> String {
    format!(
        r#"<w:r><w:drawing><wp:inline><wp:extent cx="914400" cy="914400"/><a:graphic><a:graphicData><pic:pic><pic:nvPicPr><pic:cNvPr id="0" name="{}"/></pic:nvPicPr><pic:blipFill><a:blip r:embed="rId99"/></pic:blipFill><pic:spPr><a:xfrm><a:ext cx="914400" cy="914400"/></a:xfrm></pic:spPr></pic:pic></a:graphicData></a:graphic></wp:inline></w:drawing></w:r>"#,
        expr
    )
}

#[test]
fn test_images_in_loop_get_distinct_relationships() {
    let person = |name: &str, bytes: Vec<u8>| {
        let mut map = HashMap::new();
        map.insert("name".to_string(), Value::from(name));
        map.insert("photo".to_string(), Value::Bytes(bytes.into()));
        Value::from(map)
    };
    let mut context = Context::new();
    context.insert(
        "people",
        vec![person("Ada", png(2, 1)), person("Grace", png(1, 2))],
    );

    let xml = document(&[
        p(&field("people:each(person)")),
        p(&picture("=person.photo")),
        p(&field("people:endEach")),
    ]
    .concat());

    let mut env = RenderEnv::new();
    let rendered =
        render_with(&xml, &context, &mut env, &RenderOptions::default()).unwrap();

    assert!(rendered.contains(r#"r:embed="rId1""#), "{}", rendered);
    assert!(rendered.contains(r#"r:embed="rId2""#), "{}", rendered);
    assert!(!rendered.contains("rId99"), "{}", rendered);
    // Wide image fits the box horizontally, tall image vertically.
    assert!(rendered.contains(r#"<wp:extent cx="914400" cy="457200"/>"#), "{}", rendered);
    assert!(rendered.contains(r#"<wp:extent cx="457200" cy="914400"/>"#), "{}", rendered);

    let entries: Vec<String> = env
        .resources
        .media_entries()
        .into_iter()
        .map(|(path, _)| path)
        .collect();
    assert_eq!(
        entries,
        vec!["word/media/autorid1.png", "word/media/autorid2.png"]
    );
}

#[test]
fn test_cached_discovery_renders_identically() {
    let dir = tempfile::tempdir().unwrap();
    let options = RenderOptions {
        cache_dir: Some(dir.path().to_path_buf()),
        ..Default::default()
    };
    let xml = document(&[
        p(&field("people:each(person)")),
        p(&complex_field("=person.name")),
        p(&field("people:endEach")),
    ]
    .concat());

    let uncached = render(&xml, &people()).unwrap();
    let first = render_with(&xml, &people(), &mut RenderEnv::new(), &options).unwrap();
    let entry = dir
        .path()
        .join(format!("{}.json", FieldCache::fingerprint(&xml)));
    assert!(entry.exists());

    let second = render_with(&xml, &people(), &mut RenderEnv::new(), &options).unwrap();
    assert_eq!(first, uncached);
    assert_eq!(second, uncached);
}
