//! # API Model Lookup
//!
//! Locates and parses the description file behind a logical API name such as
//! `pageAction` or `app.window`.
//!
//! File names do not match API names directly (`pageAction` lives in
//! `page_action.json`, devtools APIs live under `devtools/` without their
//! prefix) and a description may sit under any of several roots with any of
//! several extensions. [`candidate_paths`] enumerates every hypothesis in a
//! fixed order; [`ApiModels::get_model`] races them through the compiled
//! cache, so the first file that exists and parses wins. A missing file or a
//! file that fails validation means "try the next candidate"; any other
//! failure ends the search.
//!
//! Parsed models are pruned for the configured platform before they are
//! cached, so every consumer sees the same filtered tree.

use std::collections::BTreeMap;
use std::sync::Arc;

use log::debug;
use serde::Deserialize;

use crate::cache::{CompiledCache, CompiledCacheFactory};
use crate::defaults;
use crate::error::{Error, ErrorKind, Result};
use crate::filesystem::StorageBackend;
use crate::future::{all_except, race, Future};
use crate::path::{join, split_extension, split_parent, unix_name};
use crate::schema::{Namespace, SchemaParser, strip_comments};

/// Error kinds that make candidate search and refresh skip an entry.
pub const RECOVERABLE: &[ErrorKind] = &[ErrorKind::NotFound, ErrorKind::Validation];

/// Enumerate the paths an API description for `name` may live at.
///
/// If `name` already carries one of `extensions`, only that extension is
/// tried; if it already starts with one of `roots`, only that root is tried.
/// The remaining stem is spelled in its on-disk form (see
/// [`unix_name`]) and, when different, as given. Candidates are ordered by
/// extension, then root, then spelling, without duplicates.
///
/// ```
/// use docserve::api_models::candidate_paths;
/// let roots = vec!["a/".to_string(), "b/".to_string()];
/// let extensions = vec![".json".to_string()];
/// assert_eq!(
///     candidate_paths("pageAction", &roots, &extensions),
///     vec!["a/page_action.json", "a/pageAction.json", "b/page_action.json", "b/pageAction.json"],
/// );
/// ```
pub fn candidate_paths(name: &str, roots: &[String], extensions: &[String]) -> Vec<String> {
    let (stem, extension) = split_extension(name);
    let (stem, extensions) = match extensions.iter().find(|ext| ext.as_str() == extension) {
        Some(ext) => (stem, vec![ext.clone()]),
        None => (name, extensions.to_vec()),
    };

    let (stem, roots) = match roots.iter().find(|root| stem.starts_with(root.as_str())) {
        Some(root) => (&stem[root.len()..], vec![root.clone()]),
        None => (stem, roots.to_vec()),
    };

    let mut spellings = vec![file_stem(stem)];
    if spellings[0] != stem {
        spellings.push(stem.to_string());
    }

    let mut candidates: Vec<String> = Vec::new();
    for extension in &extensions {
        for root in &roots {
            for spelling in &spellings {
                let candidate = format!("{}{}", join(root, spelling), extension);
                if !candidates.contains(&candidate) {
                    candidates.push(candidate);
                }
            }
        }
    }
    candidates
}

/// On-disk stem for an API name: `devtools_`-prefixed files live in a
/// `devtools/` directory without the prefix.
fn file_stem(name: &str) -> String {
    let unix = unix_name(name);
    let (parent, base) = split_parent(&unix);
    if base.contains("devtools_") {
        format!("devtools/{}{}", parent, base.replace("devtools_", ""))
    } else {
        unix
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
struct FeatureDescriptor {
    #[serde(default)]
    noparent: bool,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawFeature {
    Single(FeatureDescriptor),
    Complex(Vec<FeatureDescriptor>),
}

/// The feature dataset: every API name with whether it opts out of having
/// a parent.
#[derive(Debug, Clone, Default)]
pub struct ApiFeatures {
    noparent: BTreeMap<String, bool>,
}

impl ApiFeatures {
    /// Parse an `_api_features.json`-style document. A feature given as a
    /// list of descriptors is `noparent` if any of them is.
    pub fn from_json(json: &str) -> Result<Self> {
        let raw: BTreeMap<String, RawFeature> = serde_json::from_str(&strip_comments(json))?;
        let noparent = raw
            .into_iter()
            .map(|(name, feature)| {
                let noparent = match feature {
                    RawFeature::Single(descriptor) => descriptor.noparent,
                    RawFeature::Complex(descriptors) => descriptors.iter().any(|d| d.noparent),
                };
                (name, noparent)
            })
            .collect();
        Ok(Self { noparent })
    }

    /// Load the dataset at `path` from `backend`.
    pub fn load(backend: &dyn StorageBackend, path: &str) -> Result<Self> {
        let bytes = backend.read_single(path)?.into_bytes(path)?;
        let text = String::from_utf8(bytes).map_err(|e| Error::validation(path, e.to_string()))?;
        Self::from_json(&text)
    }

    /// A dataset of plain names, none of which declares `noparent`.
    pub fn from_names<'a>(names: impl IntoIterator<Item = &'a str>) -> Self {
        Self {
            noparent: names.into_iter().map(|name| (name.to_string(), false)).collect(),
        }
    }

    /// Whether `name` is a feature at all.
    pub fn contains(&self, name: &str) -> bool {
        self.noparent.contains_key(name)
    }

    /// The feature `name` is nested under, if any.
    ///
    /// `app.window` has parent `app` when `app` is itself a feature and
    /// `app.window` does not declare `noparent`.
    pub fn parent_of(&self, name: &str) -> Option<&str> {
        if self.noparent.get(name).copied().unwrap_or(false) {
            return None;
        }
        let (parent, _) = name.rsplit_once('.')?;
        self.noparent.get_key_value(parent).map(|(key, _)| key.as_str())
    }

    /// Names of every top-level feature, sorted.
    pub fn top_level_names(&self) -> Vec<String> {
        self.noparent
            .keys()
            .filter(|name| self.parent_of(name).is_none())
            .cloned()
            .collect()
    }
}

/// Resolves API names to parsed, platform-pruned [`Namespace`]s.
pub struct ApiModels {
    features: ApiFeatures,
    roots: Vec<String>,
    extensions: Vec<String>,
    cache: CompiledCache<Arc<Namespace>>,
}

impl ApiModels {
    /// Look models up in `source`, parsing with `parser` and pruning for
    /// `platform` (no pruning by platform when `None`; `nodoc` members are
    /// always dropped).
    pub fn new(
        source: Arc<dyn StorageBackend>,
        factory: &CompiledCacheFactory,
        parser: Arc<dyn SchemaParser>,
        features: ApiFeatures,
        platform: Option<&str>,
    ) -> Self {
        let category = format!("api-models:{}", platform.unwrap_or("*"));
        let platform = platform.map(str::to_string);
        let cache = factory.create(source, &category, move |path, content| {
            let bytes = content.into_bytes(path)?;
            let namespace = parser.parse(path, &bytes)?;
            Ok(Arc::new(namespace.pruned_for(platform.as_deref())))
        });
        Self {
            features,
            roots: defaults::api_roots(),
            extensions: defaults::schema_extensions(),
            cache,
        }
    }

    /// Search `roots` instead of the default API roots.
    pub fn with_roots(mut self, roots: Vec<String>) -> Self {
        self.roots = roots;
        self
    }

    /// The candidate paths for `name` under this lookup's roots and
    /// extensions.
    pub fn candidates(&self, name: &str) -> Vec<String> {
        candidate_paths(name, &self.roots, &self.extensions)
    }

    /// The model for `name`: the first candidate file that exists and
    /// parses. Fails with `NotFound` when no candidate does.
    pub fn get_model(&self, name: &str) -> Future<Arc<Namespace>> {
        let attempts = self
            .candidates(name)
            .into_iter()
            .map(|path| {
                let cache = self.cache.clone();
                Future::new(move || {
                    debug!("trying model candidate {}", path);
                    cache.get_from_file(&path).get()
                })
            })
            .collect();
        let name = name.to_string();
        race(attempts, RECOVERABLE).then_or_else(Ok, move |error| match error {
            Error::NotFound { .. } => Err(Error::not_found(name)),
            other => Err(other),
        })
    }

    /// Names of every top-level API in the feature dataset.
    pub fn get_names(&self) -> Vec<String> {
        self.features.top_level_names()
    }

    /// The feature dataset this lookup was built with.
    pub fn features(&self) -> &ApiFeatures {
        &self.features
    }

    /// Load every model named by [`ApiModels::get_names`]. Names without a
    /// usable description leave a `None` slot.
    pub fn refresh(&self) -> Future<Vec<Option<Arc<Namespace>>>> {
        let futures = self.get_names().iter().map(|name| self.get_model(name)).collect();
        all_except(futures, RECOVERABLE)
    }

    /// Lazily load each named model in turn, skipping names without a
    /// usable description.
    pub fn iter_models(&self) -> ModelIter<'_> {
        ModelIter {
            models: self,
            names: self.get_names().into_iter(),
        }
    }
}

/// Iterator returned by [`ApiModels::iter_models`].
pub struct ModelIter<'a> {
    models: &'a ApiModels,
    names: std::vec::IntoIter<String>,
}

impl Iterator for ModelIter<'_> {
    type Item = Result<(String, Arc<Namespace>)>;

    fn next(&mut self) -> Option<Self::Item> {
        for name in self.names.by_ref() {
            match self.models.get_model(&name).get() {
                Ok(model) => return Some(Ok((name, model))),
                Err(error) if error.is_any_of(RECOVERABLE) => {
                    debug!("skipping model {}: {}", name, error);
                }
                Err(error) => return Some(Err(error)),
            }
        }
        None
    }
}
