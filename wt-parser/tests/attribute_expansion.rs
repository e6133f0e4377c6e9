//! End-to-end attribute expansion through the standard pipeline

use std::cell::RefCell;
use std::rc::Rc;
use wt_parser::wt::env::ParseEnv;
use wt_parser::wt::formats::to_json;
use wt_parser::wt::testing::factories::{close, kv, open, self_closing, template};
use wt_parser::wt::testing::{assert_tokens, TemplateStub};
use wt_parser::wt::token::{detokenize, ContentType, Kv, Token};
use wt_parser::wt::transforms::standard::{pipeline_with, standard_pipeline};
use wt_parser::wt::transforms::{
    Completion, ExpansionOptions, Pipeline, Runnable, TransformError,
};

fn templates() -> TemplateStub {
    TemplateStub::new()
        .with_template("T", "b")
        .with_template("Title", "Hello")
        .with_template("Class", "wide")
        .with_template("GetStyle", "style=\"color:red\"")
}

fn pipeline(options: ExpansionOptions) -> Pipeline {
    let pipeline = standard_pipeline(options);
    templates().register(&pipeline);
    pipeline
}

type Outcome = Rc<RefCell<Option<Result<Vec<Token>, TransformError>>>>;

fn start(pipeline: &Pipeline, tokens: Vec<Token>) -> Outcome {
    let outcome: Outcome = Rc::new(RefCell::new(None));
    let sink = Rc::clone(&outcome);
    pipeline.process(
        tokens,
        Completion::new(move |result| *sink.borrow_mut() = Some(result)),
    );
    outcome
}

#[test]
fn test_template_value_end_to_end() {
    let div = open("div", vec![kv("k1", "a"), Kv::new("k2", vec![template("T")])]);
    let out = pipeline(ExpansionOptions::default()).run(vec![div]).unwrap();

    insta::assert_snapshot!(
        detokenize(&out),
        @r##"<meta typeof="mw:objectAttrVal" property="k2" about="#mwt2"/><div k1="a" k2="b" about="#mwt2" typeof="mw:ExpandedAttrs/Template">"##
    );
}

#[test]
fn test_markers_share_one_id_per_tag() {
    let div = open(
        "div",
        vec![
            Kv::new("title", vec![template("Title")]),
            kv("id", "x"),
            Kv::new("class", vec![template("Class")]),
        ],
    );
    let out = pipeline(ExpansionOptions::default()).run(vec![div]).unwrap();

    assert_tokens(&out)
        .count(3)
        .token(0, |t| {
            t.assert_marker()
                .content_type(ContentType::ObjectAttrVal)
                .key("title")
                .value("Hello");
        })
        .token(1, |t| {
            t.assert_marker().key("class").value("wide");
        })
        .token(2, |t| {
            t.assert_tag("div")
                .keys(&["title", "id", "class", "about", "typeof"])
                .attribute("title", "Hello")
                .attribute("class", "wide");
        })
        .share_about();
}

#[test]
fn test_each_tag_gets_its_own_id() {
    let tokens = vec![
        open("div", vec![Kv::new("title", vec![template("T")])]),
        Token::text("x"),
        close("div"),
        self_closing("img", vec![Kv::new("alt", vec![template("T")])]),
    ];
    let out = pipeline(ExpansionOptions::default()).run(tokens).unwrap();

    insta::assert_snapshot!(
        detokenize(&out),
        @r##"<meta typeof="mw:objectAttrVal" property="title" about="#mwt2"/><div title="b" about="#mwt2" typeof="mw:ExpandedAttrs/Template">x</div><meta typeof="mw:objectAttrVal" property="alt" about="#mwt4"/><img alt="b" about="#mwt4" typeof="mw:ExpandedAttrs/Template"/>"##
    );
}

#[test]
fn test_key_value_fragment_from_template() {
    let div = open("div", vec![Kv::new(vec![template("GetStyle")], "")]);
    let out = pipeline(ExpansionOptions::default()).run(vec![div]).unwrap();

    assert_tokens(&out)
        .count(2)
        .token(0, |t| {
            t.assert_marker()
                .content_type(ContentType::ObjectAttr)
                .key("style");
        })
        .token(1, |t| {
            t.assert_tag("div").attribute("style", "color:red");
        });
}

#[test]
fn test_deferred_completion_in_any_order() {
    let pipeline = standard_pipeline(ExpansionOptions::default());
    let stub = templates().deferred().register(&pipeline);
    let tokens = vec![
        open("div", vec![Kv::new("title", vec![template("Title")])]),
        Token::text("between"),
        open("span", vec![Kv::new("class", vec![template("Class")])]),
    ];

    let outcome = start(&pipeline, tokens);
    assert!(outcome.borrow().is_none());
    assert_eq!(stub.pending(), 2);

    stub.flush_reversed();
    let out = outcome.borrow_mut().take().unwrap().unwrap();

    assert_tokens(&out)
        .count(5)
        .token(0, |t| {
            t.assert_marker().key("title");
        })
        .token(1, |t| {
            t.assert_tag("div").attribute("title", "Hello");
        })
        .token(2, |t| t.assert_text("between"))
        .token(3, |t| {
            t.assert_marker().key("class");
        })
        .token(4, |t| {
            t.assert_tag("span").attribute("class", "wide");
        });
}

#[test]
fn test_unknown_template_fails_the_run() {
    let tokens = vec![
        open("div", vec![kv("id", "ok")]),
        open("div", vec![Kv::new("title", vec![template("Nope")])]),
    ];
    let err = pipeline(ExpansionOptions::default())
        .run(tokens)
        .unwrap_err();

    assert!(matches!(err, TransformError::TokenFailed { ref tag, .. } if tag == "div"));
    assert_eq!(
        err.to_string(),
        "attribute expansion of <div> failed (source None)"
    );
}

#[test]
fn test_unwrapped_run_produces_plain_attributes() {
    let div = open("div", vec![kv("k1", "a"), Kv::new("k2", vec![template("T")])]);
    let out = pipeline(ExpansionOptions {
        wrap_templates: false,
    })
    .run(vec![div])
    .unwrap();

    insta::assert_snapshot!(detokenize(&out), @r#"<div k1="a" k2="b">"#);
}

#[test]
fn test_sessions_do_not_share_ids() {
    let first = pipeline_with(Rc::new(ParseEnv::new()), ExpansionOptions::default(), 1.12);
    let second = pipeline_with(Rc::new(ParseEnv::new()), ExpansionOptions::default(), 1.12);
    templates().register(&first);
    templates().register(&second);

    for pipeline in [first, second] {
        let out = pipeline
            .run(vec![open("div", vec![Kv::new("k", vec![template("T")])])])
            .unwrap();
        assert_tokens(&out).token(1, |t| {
            t.assert_tag("div").attribute("about", "#mwt2");
        });
    }
}

#[test]
fn test_expanded_stream_as_json() {
    let div = open("div", vec![Kv::new("k2", vec![template("T")])]);
    let out = pipeline(ExpansionOptions::default()).run(vec![div]).unwrap();
    let json = to_json(&out).unwrap();

    assert_eq!(json[0]["type"], "meta");
    assert_eq!(json[0]["data"]["about"], "#mwt2");
    assert_eq!(json[1]["type"], "tag_open");
    assert_eq!(json[1]["data"]["attribs"][0]["v"], "b");
}
