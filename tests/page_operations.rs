//! Behavior of the built-in operations, driven through the executor against
//! the in-memory page

use dom_scripts::overlay::{ELEMENT_HIGHLIGHT_CLASS, ERROR_MESSAGE_CLASS, INJECTED_CLASS};
use dom_scripts::{
    bindings, Bindings, ExecuteError, ExecutionOutcome, JavascriptExecutor, MemoryPage, Region,
};
use pretty_assertions::assert_eq;

const BANNER: &str = ".webdriver-test-error-message";
const HIGHLIGHT: &str = ".webdriver-element-highlight";

fn executor(html: &str) -> JavascriptExecutor<MemoryPage> {
    JavascriptExecutor::new(MemoryPage::from_html(html))
}

#[test]
fn test_banner_is_a_singleton_until_deleted() {
    let mut exec = executor("<main><p>content</p></main>");
    for message in ["first", "second", "third"] {
        exec.inject_message(message).unwrap();
        assert_eq!(exec.transport().count(BANNER), 1);
    }
    assert_eq!(exec.transport().text(BANNER).as_deref(), Some("third"));

    exec.delete_elements(&format!(".{}", ERROR_MESSAGE_CLASS)).unwrap();
    assert_eq!(exec.transport().count(BANNER), 0);
    assert_eq!(exec.transport().count("main p"), 1);
}

#[test]
fn test_banner_presentation() {
    let mut exec = executor("");
    exec.inject_message("Login button not found").unwrap();
    let page = exec.transport();
    assert_eq!(page.style(BANNER, "position").as_deref(), Some("fixed"));
    assert_eq!(page.style(BANNER, "zIndex").as_deref(), Some("2147483647"));
    assert_eq!(page.style(BANNER, "color").as_deref(), Some("red"));
    assert_eq!(page.style(BANNER, "fontFamily").as_deref(), Some("Arial"));
    assert_eq!(page.count("body > span.webdriver-test-error-message"), 1);
}

#[test]
fn test_banner_shows_markup_as_text() {
    let mut exec = executor("");
    exec.inject_message("expected <b>Save</b> & 'Close'").unwrap();
    let page = exec.transport();
    assert_eq!(
        page.text(BANNER).as_deref(),
        Some("expected <b>Save</b> & 'Close'")
    );
    assert_eq!(page.count("b"), 0);
}

#[test]
fn test_banner_replaces_banners_anywhere() {
    let mut exec = executor(
        r#"<div><span class="webdriver-test-error-message">stale</span></div>
           <span class="webdriver-test-error-message other">stale too</span>"#,
    );
    exec.inject_message("fresh").unwrap();
    assert_eq!(exec.transport().count(BANNER), 1);
    assert_eq!(exec.transport().text(BANNER).as_deref(), Some("fresh"));
}

#[test]
fn test_highlight_twice_keeps_the_latest_region() {
    let mut exec = executor("");
    exec.highlight_element(Region::new(10.0, 20.0, 100.0, 50.0))
        .unwrap();
    exec.highlight_element(Region::new(5.0, 6.0, 7.5, 8.0)).unwrap();

    let page = exec.transport();
    assert_eq!(page.count(HIGHLIGHT), 1);
    assert_eq!(page.style(HIGHLIGHT, "left").as_deref(), Some("5px"));
    assert_eq!(page.style(HIGHLIGHT, "top").as_deref(), Some("6px"));
    assert_eq!(page.style(HIGHLIGHT, "width").as_deref(), Some("7.5px"));
    assert_eq!(page.style(HIGHLIGHT, "height").as_deref(), Some("8px"));
    assert_eq!(page.style(HIGHLIGHT, "border").as_deref(), Some("3px dotted red"));
    assert_eq!(page.style(HIGHLIGHT, "zIndex").as_deref(), Some("2147483647"));
}

#[test]
fn test_overlays_are_independent() {
    let mut exec = executor("");
    exec.inject_message("m").unwrap();
    exec.highlight_element(Region::new(0.0, 0.0, 1.0, 1.0))
        .unwrap();
    exec.inject_css("p { color: red; }").unwrap();
    exec.delete_elements(&format!(".{}", ELEMENT_HIGHLIGHT_CLASS))
        .unwrap();

    let page = exec.transport();
    assert_eq!(page.count(BANNER), 1);
    assert_eq!(page.count(HIGHLIGHT), 0);
    assert_eq!(page.count(&format!("head > style.{}", INJECTED_CLASS)), 1);
}

#[test]
fn test_stylesheet_is_replaced() {
    let mut exec = executor("");
    exec.inject_css("p { color: red; }").unwrap();
    exec.inject_css("p { color: blue; }").unwrap();
    let page = exec.transport();
    assert_eq!(page.count("style"), 1);
    assert_eq!(page.text("style").as_deref(), Some("p { color: blue; }"));
    assert_eq!(page.count("style[type='text/css']"), 1);
}

#[test]
fn test_set_attribute_scenario() {
    let mut exec = executor(r#"<form><input id="email" type="text"></form>"#);
    let input = exec.transport().handle("#email").expect("input");

    exec.set_attribute(&input, "data-test", "ok").unwrap();
    assert_eq!(
        exec.transport().attribute(&input, "data-test").as_deref(),
        Some("ok")
    );

    exec.set_attribute(&input, "data-test", "it's \"quoted\"")
        .unwrap();
    assert_eq!(
        exec.transport().attribute(&input, "data-test").as_deref(),
        Some("it's \"quoted\"")
    );
    assert_eq!(exec.transport().count("[data-test]"), 1);
}

#[test]
fn test_click_through_query_handles() {
    let mut exec = executor(r#"<button class="go">A</button><button class="go">B</button>"#);
    let buttons = exec.get_elements("button.go").unwrap();
    assert_eq!(buttons.len(), 2);
    exec.click(&buttons[1]).unwrap();
    assert_eq!(exec.transport().click_count(&buttons[0]), 0);
    assert_eq!(exec.transport().click_count(&buttons[1]), 1);
}

#[test]
fn test_get_elements_may_be_empty() {
    let mut exec = executor("<p></p>");
    assert!(exec.get_elements(".missing").unwrap().is_empty());
}

#[test]
fn test_text_without_whitespace_keeps_order() {
    let mut exec = executor(
        "<ul><li> Total:\n 1 200 </li><li>\tEUR\u{a0}</li></ul><li>ignored</li>",
    );
    assert_eq!(exec.get_text_no_whitespace("ul li").unwrap(), "Total:1200EUR");
    assert_eq!(exec.get_text_no_whitespace(".none").unwrap(), "");
}

#[test]
fn test_waiting_for_user_truth_table() {
    let mut exec = executor("<p>no radio</p>");
    assert!(exec.is_waiting_for_user().unwrap());

    let mut exec = executor(r#"<input type="radio" id="webdriver-resume-radio">"#);
    assert!(exec.is_waiting_for_user().unwrap());

    exec.transport_mut().set_checked("#webdriver-resume-radio", true);
    assert!(!exec.is_waiting_for_user().unwrap());

    let mut exec = executor(r#"<input type="radio" id="webdriver-resume-radio" checked>"#);
    assert!(!exec.is_waiting_for_user().unwrap());
}

#[test]
fn test_resume_by_clicking_the_radio() {
    let mut exec = executor(r#"<input type="radio" id="webdriver-resume-radio">"#);
    let radio = exec.transport().handle("#webdriver-resume-radio").unwrap();
    exec.click(&radio).unwrap();
    assert!(!exec.is_waiting_for_user().unwrap());
}

#[test]
fn test_inject_html_appends_to_first_match() {
    let mut exec = executor(r#"<div class="slot">a</div><div class="slot">b</div>"#);
    exec.inject_html(".slot", "<em id='new'>x</em>").unwrap();
    let page = exec.transport();
    assert_eq!(page.count("div > em#new"), 1);
    assert_eq!(page.text(".slot").as_deref(), Some("ax"));
}

#[test]
fn test_delete_without_matches_is_done() {
    let mut exec = executor("<p></p>");
    let outcome = exec
        .execute("delete-elements", &bindings([("selector", ".absent")]), None)
        .unwrap();
    assert_eq!(outcome, ExecutionOutcome::Done);
    assert_eq!(exec.transport().count("p"), 1);
}

#[test]
fn test_failures_are_exclusive_outcomes() {
    let mut exec = executor("<p></p>");
    let outcome = exec
        .execute(
            "inject-html",
            &bindings([("selector", "#absent"), ("html", "<b>x</b>")]),
            None,
        )
        .unwrap();

    let failure = outcome.failure().expect("failure").clone();
    assert_eq!(failure.name, "TypeError");
    assert!(!outcome.is_success());
    assert_eq!(outcome.into_result(), Err(failure));
    assert_eq!(exec.transport().count("b"), 0);
}

#[test]
fn test_invalid_selector_is_an_operation_failure() {
    let mut exec = executor("<p></p>");
    match exec.delete_elements("p:nth-child(2n") {
        Err(ExecuteError::Operation { failure, template }) => {
            assert_eq!(template, "delete-elements");
            assert_eq!(failure.name, "SyntaxError");
        }
        other => panic!("expected an operation failure, got {:?}", other),
    }
    assert_eq!(exec.transport().count("p"), 1);
}

#[test]
fn test_stale_handle_fails_inside_the_page() {
    let mut exec = executor("<p></p>");
    let stale = dom_scripts::ElementHandle::new("node-4242");
    let ok = exec.run("click", &Bindings::new(), Some(&stale)).unwrap();
    assert!(!ok);
}

#[test]
fn test_every_execution_is_recorded() {
    let mut exec = executor("");
    exec.inject_css("a {}").unwrap();
    exec.is_waiting_for_user().unwrap();
    assert_eq!(
        exec.transport().executed(),
        &["inject-css".to_string(), "is-waiting-for-user".to_string()]
    );
}
