//! End-to-end tests for the `docserve model` and `docserve resolve`
//! commands.

mod common;

use common::prelude::*;

#[test]
fn test_model_summary() {
    let fixture = TestFixture::new().with_docs_site();
    fixture
        .command()
        .arg("model")
        .arg("tabs")
        .assert()
        .success()
        .stdout(predicate::str::contains("namespace: tabs"))
        .stdout(predicate::str::contains("type (2):"))
        .stdout(predicate::str::contains("method (1):"))
        .stdout(predicate::str::contains("onUpdated"));
}

#[test]
fn test_model_platform_flag_prunes() {
    let fixture = TestFixture::new().with_docs_site();
    fixture
        .command()
        .arg("model")
        .arg("tabs")
        .arg("--platform")
        .arg("chromeos")
        .assert()
        .success()
        .stdout(predicate::str::contains("type (1):"))
        .stdout(predicate::str::contains("MutedInfo").not());
}

#[test]
fn test_model_found_through_candidates() {
    let fixture = TestFixture::new().with_docs_site();
    fixture
        .command()
        .arg("model")
        .arg("pageAction")
        .arg("--json")
        .assert()
        .success()
        .stdout(predicate::str::contains("\"name\": \"pageAction\""));
}

#[test]
fn test_model_candidates_listing() {
    let fixture = TestFixture::new();
    fixture
        .command()
        .arg("model")
        .arg("pageAction")
        .arg("--candidates")
        .assert()
        .success()
        .stdout(predicate::str::starts_with(
            "chrome/common/extensions/api/page_action.json\n",
        ))
        .stdout(predicate::str::contains("extensions/common/api/pageAction.idl"));
}

#[test]
fn test_model_not_found() {
    let fixture = TestFixture::new().with_docs_site();
    fixture
        .command()
        .arg("model")
        .arg("bookmarks")
        .assert()
        .failure()
        .stderr(predicate::str::contains("No model for \"bookmarks\""));
}

#[test]
fn test_resolve_aliased_reference() {
    let fixture = TestFixture::new().with_docs_site();
    fixture
        .command()
        .arg("resolve")
        .arg("foo.bar.qux")
        .assert()
        .success()
        .stdout(predicate::str::contains("\"href\": \"foo_guide#property-Baz-qux\""))
        .stdout(predicate::str::contains("\"name\": \"qux\""));
}

#[test]
fn test_resolve_relative_to_namespace() {
    let fixture = TestFixture::new().with_docs_site();
    fixture
        .command()
        .arg("resolve")
        .arg("Tab")
        .arg("--namespace")
        .arg("tabs")
        .assert()
        .success()
        .stdout(predicate::str::contains("\"href\": \"tabs#type-Tab\""));
}

#[test]
fn test_resolve_unresolvable_still_prints_link() {
    let fixture = TestFixture::new().with_docs_site();
    fixture
        .command()
        .arg("resolve")
        .arg("tabs.Missing")
        .assert()
        .success()
        .stdout(predicate::str::contains("\"name\": \"tabs.Missing\""))
        .stderr(predicate::str::contains("Could not resolve"));
}

#[test]
fn test_resolve_markup() {
    let fixture = TestFixture::new().with_docs_site();
    fixture
        .command()
        .arg("resolve")
        .arg("--markup")
        .arg("--namespace")
        .arg("tabs")
        .arg("See $(ref:onUpdated the event).")
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "See <a href=\"tabs#event-onUpdated\">the event</a>.",
        ));
}
