//! # API Schema Model
//!
//! The typed tree an API description file is parsed into. A [`Namespace`]
//! owns four groups of [`Node`]s (types, functions, events, properties) and
//! every node owns its own nested groups by value, so a tree can be pruned
//! into a new tree without touching the one it came from.
//!
//! Parsing goes through the [`SchemaParser`] trait. [`JsonSchemaParser`]
//! handles `.json` descriptions (with `//` and `/* */` comments, which API
//! description files routinely carry); anything else is rejected with a
//! validation error so candidate search moves on to the next file.

use crate::error::{Error, Result};
use crate::path::split_extension;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// What a schema node describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    Type,
    Function,
    Event,
    Property,
}

impl NodeKind {
    /// The anchor prefix used for this kind in generated links.
    pub fn category(&self) -> &'static str {
        match self {
            NodeKind::Type => "type",
            NodeKind::Function => "method",
            NodeKind::Event => "event",
            NodeKind::Property => "property",
        }
    }
}

/// The four member groups of a namespace or node, in lookup order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct NodeGroups {
    pub types: Vec<Node>,
    pub functions: Vec<Node>,
    pub events: Vec<Node>,
    pub properties: Vec<Node>,
}

impl NodeGroups {
    /// Groups paired with their kind: types, functions, events, properties.
    pub fn groups(&self) -> [(NodeKind, &[Node]); 4] {
        [
            (NodeKind::Type, &self.types),
            (NodeKind::Function, &self.functions),
            (NodeKind::Event, &self.events),
            (NodeKind::Property, &self.properties),
        ]
    }

    /// The first member called `name`, searching groups in lookup order.
    pub fn find(&self, name: &str) -> Option<&Node> {
        self.groups()
            .into_iter()
            .flat_map(|(_, nodes)| nodes.iter())
            .find(|node| node.name == name)
    }

    pub fn is_empty(&self) -> bool {
        self.groups().iter().all(|(_, nodes)| nodes.is_empty())
    }

    fn pruned(&self, platform: Option<&str>) -> NodeGroups {
        let keep = |nodes: &[Node]| -> Vec<Node> {
            nodes
                .iter()
                .filter(|node| node.applies_to(platform))
                .map(|node| node.pruned(platform))
                .collect()
        };
        NodeGroups {
            types: keep(&self.types),
            functions: keep(&self.functions),
            events: keep(&self.events),
            properties: keep(&self.properties),
        }
    }
}

/// A named member of an API.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Node {
    pub name: String,
    pub kind: NodeKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Name of the type this node refers to via `$ref`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ref_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub platforms: Option<Vec<String>>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub nodoc: bool,
    pub members: NodeGroups,
}

impl Node {
    /// Whether this node survives pruning for `platform`.
    fn applies_to(&self, platform: Option<&str>) -> bool {
        if self.nodoc {
            return false;
        }
        match (platform, &self.platforms) {
            (Some(platform), Some(platforms)) => platforms.iter().any(|p| p == platform),
            _ => true,
        }
    }

    fn pruned(&self, platform: Option<&str>) -> Node {
        Node {
            members: self.members.pruned(platform),
            ..self.clone()
        }
    }
}

/// A parsed API description.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Namespace {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub platforms: Option<Vec<String>>,
    /// Page the API is documented on, when it is not its own.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub documented_in: Option<String>,
    pub members: NodeGroups,
}

impl Namespace {
    /// A copy of this namespace without `nodoc` members and without members
    /// whose `platforms` exclude `platform`, applied at every depth.
    pub fn pruned_for(&self, platform: Option<&str>) -> Namespace {
        Namespace {
            members: self.members.pruned(platform),
            ..self.clone()
        }
    }

    /// The page name links into this namespace should point at.
    pub fn documentation_page(&self) -> &str {
        self.documented_in.as_deref().unwrap_or(&self.name)
    }

    /// The namespace's properties.
    pub fn properties(&self) -> &[Node] {
        &self.members.properties
    }
}

/// Turns the raw bytes of an API description into a [`Namespace`].
pub trait SchemaParser: Send + Sync {
    fn parse(&self, path: &str, content: &[u8]) -> Result<Namespace>;
}

/// Parser for `.json` API descriptions.
///
/// The document is an array whose first element describes the namespace.
/// An empty array is a validation error.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonSchemaParser;

impl SchemaParser for JsonSchemaParser {
    fn parse(&self, path: &str, content: &[u8]) -> Result<Namespace> {
        let (_, extension) = split_extension(path);
        if extension != ".json" {
            return Err(Error::validation(
                path,
                format!("no parser for \"{}\" descriptions", extension),
            ));
        }
        let text = std::str::from_utf8(content).map_err(|e| Error::validation(path, e.to_string()))?;
        let documents: Vec<RawNamespace> =
            serde_json::from_str(&strip_comments(text)).map_err(|e| Error::validation(path, e.to_string()))?;
        let raw = documents
            .into_iter()
            .next()
            .ok_or_else(|| Error::validation(path, "schema is empty"))?;
        raw.into_namespace(path)
    }
}

/// Remove `//` and `/* */` comments outside of string literals.
pub fn strip_comments(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();
    let mut in_string = false;

    while let Some(c) = chars.next() {
        if in_string {
            out.push(c);
            match c {
                '\\' => {
                    if let Some(escaped) = chars.next() {
                        out.push(escaped);
                    }
                }
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match (c, chars.peek()) {
            ('"', _) => {
                in_string = true;
                out.push(c);
            }
            ('/', Some('/')) => {
                for skipped in chars.by_ref() {
                    if skipped == '\n' {
                        out.push('\n');
                        break;
                    }
                }
            }
            ('/', Some('*')) => {
                chars.next();
                let mut previous = '\0';
                for skipped in chars.by_ref() {
                    if previous == '*' && skipped == '/' {
                        break;
                    }
                    previous = skipped;
                }
            }
            _ => out.push(c),
        }
    }
    out
}

#[derive(Debug, Deserialize)]
struct DocumentationOptions {
    #[serde(default)]
    documented_in: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawNamespace {
    namespace: String,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    platforms: Option<Vec<String>>,
    #[serde(default)]
    documentation_options: Option<DocumentationOptions>,
    #[serde(flatten)]
    members: RawMembers,
}

#[derive(Debug, Default, Deserialize)]
struct RawMembers {
    #[serde(default)]
    types: Vec<RawNode>,
    #[serde(default)]
    functions: Vec<RawNode>,
    #[serde(default)]
    events: Vec<RawNode>,
    #[serde(default)]
    properties: BTreeMap<String, RawNode>,
}

#[derive(Debug, Deserialize)]
struct RawNode {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(rename = "$ref", default)]
    reference: Option<String>,
    #[serde(default)]
    platforms: Option<Vec<String>>,
    #[serde(default)]
    nodoc: bool,
    #[serde(flatten)]
    members: RawMembers,
}

impl RawNamespace {
    fn into_namespace(self, path: &str) -> Result<Namespace> {
        if self.namespace.is_empty() {
            return Err(Error::validation(path, "namespace has no name"));
        }
        Ok(Namespace {
            name: self.namespace,
            description: self.description,
            platforms: self.platforms,
            documented_in: self.documentation_options.and_then(|options| options.documented_in),
            members: self.members.into_groups(path)?,
        })
    }
}

impl RawMembers {
    fn into_groups(self, path: &str) -> Result<NodeGroups> {
        let convert = |nodes: Vec<RawNode>, kind: NodeKind| -> Result<Vec<Node>> {
            nodes
                .into_iter()
                .map(|node| {
                    let name = match kind {
                        NodeKind::Type => node.id.clone().or_else(|| node.name.clone()),
                        _ => node.name.clone(),
                    };
                    let name = name.ok_or_else(|| {
                        Error::validation(path, format!("{} without a name", kind.category()))
                    })?;
                    node.into_node(name, kind, path)
                })
                .collect()
        };
        Ok(NodeGroups {
            types: convert(self.types, NodeKind::Type)?,
            functions: convert(self.functions, NodeKind::Function)?,
            events: convert(self.events, NodeKind::Event)?,
            properties: self
                .properties
                .into_iter()
                .map(|(name, node)| node.into_node(name, NodeKind::Property, path))
                .collect::<Result<_>>()?,
        })
    }
}

impl RawNode {
    fn into_node(self, name: String, kind: NodeKind, path: &str) -> Result<Node> {
        Ok(Node {
            name,
            kind,
            description: self.description,
            ref_type: self.reference,
            platforms: self.platforms,
            nodoc: self.nodoc,
            members: self.members.into_groups(path)?,
        })
    }
}
