//! # Reference Resolution
//!
//! Turns dotted references such as `tabs.Tab`, `tabs.onUpdated` or
//! `runtime.lastError.message` into links to the documentation page and
//! anchor that describes them.
//!
//! ## Algorithm
//!
//! A reference `a.b.c.d` is split at every possible point: `a` + `b.c.d`,
//! then `a.b` + `c.d`, and so on. Each prefix that names a known API is
//! loaded and the remainder is looked up in its tree, descending group by
//! group (types, functions, events, properties). When a lookup fails and the
//! remainder starts with one of the API's properties that refers to a type,
//! the property is swapped for that type and the lookup is retried once, so
//! `foo.bar.qux` finds `qux` on `Baz` when property `bar` is a `Baz`. The
//! swap applies to the anchor and the link text alike (`foo.Baz.qux`). A
//! reference that names an API outright links to the API's page.
//!
//! With a current namespace, the reference is first tried as written and
//! then relative to that namespace.
//!
//! Resolved links are kept in an [`ObjectStore`] under the reference and
//! namespace. [`ReferenceResolver::safe_get_link`] never fails: an
//! unresolvable reference is logged and still produces a link.

use std::sync::Arc;

use log::{debug, warn};
use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};

use crate::api_models::{ApiModels, RECOVERABLE};
use crate::error::Result;
use crate::object_store::{bounded_key, ObjectStore};
use crate::schema::{Node, NodeGroups, NodeKind};

/// `$(ref:target)` with an optional whitespace-separated title.
const MARKER_PATTERN: &str = r"\$\(ref:([^\s)]+)(?:\s+([^)]*))?\)";

/// A resolved reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Link {
    /// Page and anchor, relative to the documentation root.
    pub href: String,
    /// Text to display.
    pub text: String,
    /// Name of the node the link points at.
    pub name: String,
}

/// Resolves dotted references against API models.
pub struct ReferenceResolver {
    models: Arc<ApiModels>,
    store: Arc<dyn ObjectStore>,
}

impl ReferenceResolver {
    pub fn new(models: Arc<ApiModels>, store: Arc<dyn ObjectStore>) -> Self {
        Self { models, store }
    }

    /// Resolve `reference`, optionally relative to `namespace`. A `title`
    /// replaces the link text.
    ///
    /// Returns `Ok(None)` when nothing matches. Errors other than a missing
    /// or invalid model propagate.
    pub fn get_link(&self, reference: &str, namespace: Option<&str>, title: Option<&str>) -> Result<Option<Link>> {
        let key = bounded_key(&format!("{}.{}", namespace.unwrap_or(""), reference));
        let cached = match self.store.get(&key)? {
            Some(json) => serde_json::from_str::<Link>(&json).ok(),
            None => None,
        };

        let link = match cached {
            Some(link) => Some(link),
            None => {
                let resolved = self.resolve(reference, namespace)?;
                if let Some(link) = &resolved {
                    self.store.set(&key, serde_json::to_string(link)?)?;
                }
                resolved
            }
        };

        Ok(link.map(|mut link| {
            if let Some(title) = title {
                link.text = title.to_string();
            }
            link
        }))
    }

    /// Like [`ReferenceResolver::get_link`], but always produces a link.
    ///
    /// An unresolvable reference (or a lookup failure) is logged and linked
    /// to an anchor built from its final segment, keeping the full reference
    /// as the link's name.
    pub fn safe_get_link(&self, reference: &str, namespace: Option<&str>, title: Option<&str>) -> Link {
        match self.get_link(reference, namespace, title) {
            Ok(Some(link)) => return link,
            Ok(None) => warn!(
                "Could not resolve $(ref:{}) in namespace {}",
                reference,
                namespace.unwrap_or("<none>")
            ),
            Err(error) => warn!("Failed to resolve $(ref:{}): {}", reference, error),
        }
        let last = reference.rsplit('.').next().unwrap_or(reference);
        Link {
            href: format!("#type-{}", last),
            text: title.unwrap_or(last).to_string(),
            name: reference.to_string(),
        }
    }

    /// Replace every `$(ref:target)` or `$(ref:target Some title)` marker in
    /// `text` with an anchor element. `relative_to` is prepended to each
    /// href. Unterminated markers are left untouched.
    pub fn resolve_all_links(&self, text: &str, relative_to: &str, namespace: Option<&str>) -> Result<String> {
        if !text.contains("$(ref:") {
            return Ok(text.to_string());
        }
        let marker = Regex::new(MARKER_PATTERN)?;
        Ok(marker
            .replace_all(text, |caps: &Captures| {
                let title = caps.get(2).map(|m| m.as_str().trim()).filter(|t| !t.is_empty());
                let link = self.safe_get_link(&caps[1], namespace, title);
                format!("<a href=\"{}{}\">{}</a>", relative_to, link.href, link.text)
            })
            .into_owned())
    }

    fn resolve(&self, reference: &str, namespace: Option<&str>) -> Result<Option<Link>> {
        if let Some(link) = self.resolve_absolute(reference, namespace)? {
            return Ok(Some(link));
        }
        match namespace {
            Some(namespace) => self.resolve_absolute(&format!("{}.{}", namespace, reference), Some(namespace)),
            None => Ok(None),
        }
    }

    fn resolve_absolute(&self, reference: &str, namespace: Option<&str>) -> Result<Option<Link>> {
        let features = self.models.features();
        let parts: Vec<&str> = reference.split('.').collect();

        for split in 1..parts.len() {
            let api_name = parts[..split].join(".");
            if !features.contains(&api_name) {
                continue;
            }
            let model = match self.models.get_model(&api_name).get() {
                Ok(model) => model,
                Err(error) if error.is_any_of(RECOVERABLE) => {
                    debug!("no model for {}: {}", api_name, error);
                    continue;
                }
                Err(error) => return Err(error),
            };

            let mut name = parts[split..].join(".");
            let mut full = reference.to_string();
            let mut found = classify(&name, &model.members);
            if found.is_none() {
                if let Some((aliased, classified)) = classify_through_property(&name, model.properties(), &model.members) {
                    // The type name replaces the property in both href and text.
                    full = format!("{}.{}", api_name, aliased);
                    name = aliased;
                    found = Some(classified);
                }
            }
            let Some((kind, node_name)) = found else {
                continue;
            };

            let text = namespace
                .and_then(|ns| full.strip_prefix(&format!("{}.", ns)))
                .unwrap_or(&full);
            return Ok(Some(Link {
                href: format!(
                    "{}#{}-{}",
                    model.documentation_page(),
                    kind.category(),
                    name.replace('.', "-")
                ),
                text: text.to_string(),
                name: node_name,
            }));
        }

        if features.contains(reference) {
            return Ok(Some(Link {
                href: reference.to_string(),
                text: reference.to_string(),
                name: reference.to_string(),
            }));
        }
        Ok(None)
    }
}

/// Find the node a dotted `name` refers to below `groups`, returning its kind
/// and simple name.
fn classify(name: &str, groups: &NodeGroups) -> Option<(NodeKind, String)> {
    let (head, rest) = match name.split_once('.') {
        Some((head, rest)) => (head, Some(rest)),
        None => (name, None),
    };
    for (kind, nodes) in groups.groups() {
        for node in nodes.iter().filter(|node| node.name == head) {
            match rest {
                None => return Some((kind, head.to_string())),
                Some(rest) => {
                    if let Some(found) = classify(rest, &node.members) {
                        return Some(found);
                    }
                }
            }
        }
    }
    None
}

/// Retry [`classify`] with a leading property segment replaced by the type
/// the property refers to. Returns the rewritten name with the result.
fn classify_through_property(
    name: &str,
    properties: &[Node],
    groups: &NodeGroups,
) -> Option<(String, (NodeKind, String))> {
    let (head, rest) = name.split_once('.').unwrap_or((name, ""));
    properties
        .iter()
        .filter(|property| property.name == head)
        .filter_map(|property| property.ref_type.as_deref())
        .find_map(|ref_type| {
            let aliased = if rest.is_empty() {
                ref_type.to_string()
            } else {
                format!("{}.{}", ref_type, rest)
            };
            classify(&aliased, groups).map(|found| (aliased, found))
        })
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::api_models::ApiFeatures;
    use crate::cache::CompiledCacheFactory;
    use crate::filesystem::MemoryFS;
    use crate::object_store::MemoryObjectStore;
    use crate::schema::JsonSchemaParser;

    const FOO: &str = r#"[{
        "namespace": "foo",
        "types": [
            {"id": "Baz", "type": "object", "properties": {"qux": {"type": "string"}}}
        ],
        "properties": {"bar": {"$ref": "Baz"}},
        "functions": [{"name": "doThing"}],
        "events": [{"name": "onThing"}]
    }]"#;

    const TABS: &str = r#"[{
        "namespace": "tabs",
        "documentation_options": {"documented_in": "tabs_overview"},
        "types": [{"id": "Tab", "type": "object"}]
    }]"#;

    fn resolver() -> (ReferenceResolver, Arc<MemoryObjectStore>) {
        let fs = Arc::new(MemoryFS::with_files([("api/foo.json", FOO), ("api/tabs.json", TABS)]).unwrap());
        let models = ApiModels::new(
            fs,
            &CompiledCacheFactory::new(),
            Arc::new(JsonSchemaParser),
            ApiFeatures::from_names(["foo", "tabs", "bookmarks"]),
            None,
        )
        .with_roots(vec!["api/".to_string()]);
        let store = Arc::new(MemoryObjectStore::new());
        (ReferenceResolver::new(Arc::new(models), store.clone()), store)
    }

    fn link(href: &str, text: &str, name: &str) -> Link {
        Link {
            href: href.to_string(),
            text: text.to_string(),
            name: name.to_string(),
        }
    }

    #[test]
    fn test_classifies_each_group() {
        let (resolver, _) = resolver();
        assert_eq!(
            resolver.get_link("foo.Baz", None, None).unwrap(),
            Some(link("foo#type-Baz", "foo.Baz", "Baz"))
        );
        assert_eq!(
            resolver.get_link("foo.doThing", None, None).unwrap(),
            Some(link("foo#method-doThing", "foo.doThing", "doThing"))
        );
        assert_eq!(
            resolver.get_link("foo.onThing", None, None).unwrap(),
            Some(link("foo#event-onThing", "foo.onThing", "onThing"))
        );
        assert_eq!(
            resolver.get_link("foo.bar", None, None).unwrap(),
            Some(link("foo#property-bar", "foo.bar", "bar"))
        );
    }

    #[test]
    fn test_nested_reference() {
        let (resolver, _) = resolver();
        assert_eq!(
            resolver.get_link("foo.Baz.qux", None, None).unwrap(),
            Some(link("foo#property-Baz-qux", "foo.Baz.qux", "qux"))
        );
    }

    #[test]
    fn test_property_aliases_its_type() {
        let (resolver, _) = resolver();
        assert_eq!(
            resolver.get_link("foo.bar.qux", None, None).unwrap(),
            Some(link("foo#property-Baz-qux", "foo.Baz.qux", "qux"))
        );
        assert_eq!(
            resolver.get_link("bar.qux", Some("foo"), None).unwrap(),
            Some(link("foo#property-Baz-qux", "Baz.qux", "qux"))
        );
    }

    #[test]
    fn test_documented_in_and_namespace_relative() {
        let (resolver, _) = resolver();
        assert_eq!(
            resolver.get_link("Tab", Some("tabs"), None).unwrap(),
            Some(link("tabs_overview#type-Tab", "Tab", "Tab"))
        );
        assert_eq!(
            resolver.get_link("tabs.Tab", Some("tabs"), None).unwrap(),
            Some(link("tabs_overview#type-Tab", "Tab", "Tab"))
        );
        assert_eq!(
            resolver.get_link("tabs.Tab", Some("foo"), None).unwrap(),
            Some(link("tabs_overview#type-Tab", "tabs.Tab", "Tab"))
        );
    }

    #[test]
    fn test_api_level_fallback() {
        let (resolver, _) = resolver();
        assert_eq!(
            resolver.get_link("tabs", None, None).unwrap(),
            Some(link("tabs", "tabs", "tabs"))
        );
        // Known feature without a description file still links to its page.
        assert_eq!(
            resolver.get_link("bookmarks", None, None).unwrap(),
            Some(link("bookmarks", "bookmarks", "bookmarks"))
        );
    }

    #[test]
    fn test_unresolvable_reference() {
        let (resolver, store) = resolver();
        assert_eq!(resolver.get_link("foo.nothing", None, None).unwrap(), None);
        assert_eq!(resolver.get_link("unknown.Thing", None, None).unwrap(), None);
        assert!(store.is_empty());
    }

    #[test]
    fn test_title_applies_per_lookup_and_shares_cache() {
        let (resolver, store) = resolver();
        let titled = resolver.get_link("foo.Baz", None, Some("the Baz")).unwrap().unwrap();
        assert_eq!(titled.text, "the Baz");
        let untitled = resolver.get_link("foo.Baz", None, None).unwrap().unwrap();
        assert_eq!(untitled.text, "foo.Baz");
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_safe_get_link_is_total() {
        testing_logger::setup();
        let (resolver, _) = resolver();
        let link = resolver.safe_get_link("foo.missing.Thing", None, None);
        assert_eq!(link.name, "foo.missing.Thing");
        assert_eq!(link.text, "Thing");
        assert_eq!(link.href, "#type-Thing");
        testing_logger::validate(|logs| {
            assert!(logs
                .iter()
                .any(|log| log.level == log::Level::Warn && log.body.contains("foo.missing.Thing")));
        });

        let titled = resolver.safe_get_link("nope", None, Some("Nope"));
        assert_eq!(titled.text, "Nope");
        assert_eq!(titled.name, "nope");
    }

    #[test]
    fn test_resolve_all_links() {
        let (resolver, _) = resolver();
        let text = "See $(ref:foo.Baz) and $(ref:tabs.Tab the tab type).";
        assert_eq!(
            resolver.resolve_all_links(text, "../", None).unwrap(),
            "See <a href=\"../foo#type-Baz\">foo.Baz</a> and \
             <a href=\"../tabs_overview#type-Tab\">the tab type</a>."
        );
    }

    #[test]
    fn test_resolve_all_links_leaves_unterminated_markers() {
        let (resolver, _) = resolver();
        let text = "Broken $(ref:foo.Baz and no close";
        assert_eq!(resolver.resolve_all_links(text, "", None).unwrap(), text);
        assert_eq!(resolver.resolve_all_links("no markers", "", None).unwrap(), "no markers");
    }
}
