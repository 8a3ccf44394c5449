//! Owns merged trees per tag-set and publishes them copy-on-write.
//!
//! Every rebuild constructs a complete [`TreeState`] off to the side and
//! atomically swaps one published reference; in-flight reads always observe
//! a fully formed tree and never block the writer.

pub(crate) mod builder;

use crate::error::{ConfigError, ValidationError};
use crate::ext::ReloadListener;
use crate::lexer::PathLexer;
use crate::node::ConfigNode;
use crate::resolve;
use crate::source::ConfigSource;
use crate::tag::Tags;
use arc_swap::ArcSwap;
use log::{debug, info, warn};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

/// One fully built generation of merged trees.
#[derive(Debug, Default)]
pub struct TreeState {
    /// Merged root per distinct tag-set observed across sources (plus the
    /// default empty tag-set).
    roots: HashMap<Tags, Arc<ConfigNode>>,
    /// Per tag-set, paths of leaves still carrying a lazy marker.
    lazy_paths: HashMap<Tags, Vec<String>>,
    /// Bumped on every successful load/reload; keys the memo cache.
    generation: u64,
    loaded: bool,
}

impl TreeState {
    /// The generation this state was published at.
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

/// A source together with its most recently fetched raw tree.
struct RegisteredSource {
    source: Arc<dyn ConfigSource>,
    tags: Tags,
    tree: ConfigNode,
}

/// Holds registered sources and the published tree snapshot.
pub struct TreeService {
    lexer: PathLexer,
    sources: Mutex<Vec<RegisteredSource>>,
    state: ArcSwap<TreeState>,
    listeners: Mutex<Vec<Arc<dyn ReloadListener>>>,
}

impl TreeService {
    /// An empty service; nothing is readable until sources are registered
    /// and [`TreeService::load`] runs.
    pub fn new(lexer: PathLexer) -> Self {
        Self {
            lexer,
            sources: Mutex::new(Vec::new()),
            state: ArcSwap::from_pointee(TreeState::default()),
            listeners: Mutex::new(Vec::new()),
        }
    }

    /// Fetch a source's pairs, build its raw tree, and append it to the
    /// registration-ordered source list. Per-pair problems are returned for
    /// the caller to surface; they do not fail registration.
    pub fn register_source(
        &self,
        source: Arc<dyn ConfigSource>,
    ) -> Result<Vec<ValidationError>, ConfigError> {
        let pairs = source.pairs()?;
        let (tree, errors) = builder::build_tree(&pairs, &self.lexer);
        let tags = source.tags();
        info!(
            "registered config source '{}' (format={}, tags={}, pairs={})",
            source.name(),
            source.format(),
            tags,
            pairs.len()
        );
        for error in &errors {
            warn!("source '{}': {error}", source.name());
        }
        self.sources.lock().push(RegisteredSource {
            source,
            tags,
            tree,
        });
        Ok(errors)
    }

    /// Build one merged tree per distinct tag-set and publish the result.
    ///
    /// Structural failure when no sources are registered.
    pub fn load(&self) -> Result<Vec<ValidationError>, ConfigError> {
        let sources = self.sources.lock();
        if sources.is_empty() {
            return Err(ConfigError::NoSources);
        }
        let errors = self.publish(&sources);
        Ok(errors)
    }

    /// Re-fetch every source and rebuild, then notify reload listeners.
    pub fn reload(&self) -> Result<Vec<ValidationError>, ConfigError> {
        let mut sources = self.sources.lock();
        if sources.is_empty() {
            return Err(ConfigError::NoSources);
        }
        let mut errors = Vec::new();
        for registered in sources.iter_mut() {
            let pairs = registered.source.pairs()?;
            let (tree, build_errors) = builder::build_tree(&pairs, &self.lexer);
            errors.extend(build_errors);
            registered.tree = tree;
        }
        errors.extend(self.publish(&sources));
        drop(sources);
        self.notify_listeners();
        Ok(errors)
    }

    /// Re-fetch a single source by name and rebuild.
    ///
    /// Reloading a source that was never registered is a structural error.
    pub fn reload_source(&self, name: &str) -> Result<Vec<ValidationError>, ConfigError> {
        let mut sources = self.sources.lock();
        let registered = sources
            .iter_mut()
            .find(|registered| registered.source.name() == name)
            .ok_or_else(|| ConfigError::UnknownSource(name.to_string()))?;
        let pairs = registered.source.pairs()?;
        let (tree, mut errors) = builder::build_tree(&pairs, &self.lexer);
        registered.tree = tree;
        errors.extend(self.publish(&sources));
        drop(sources);
        self.notify_listeners();
        Ok(errors)
    }

    /// Register a listener invoked after every successful reload swap.
    pub fn add_listener(&self, listener: Arc<dyn ReloadListener>) {
        self.listeners.lock().push(listener);
    }

    /// The current published snapshot.
    pub fn snapshot(&self) -> Arc<TreeState> {
        self.state.load_full()
    }

    /// The merged root for `tags`: exact tag-set match, falling back to the
    /// default (empty) tag-set root.
    pub fn root_for(&self, tags: &Tags) -> Result<Arc<ConfigNode>, ConfigError> {
        let state = self.state.load();
        if !state.loaded {
            return Err(ConfigError::NotLoaded);
        }
        state
            .roots
            .get(tags)
            .or_else(|| state.roots.get(&Tags::none()))
            .cloned()
            .ok_or(ConfigError::NotLoaded)
    }

    /// Whether results at `path` under `tags` must bypass the cache because
    /// a lazy placeholder is reachable through them.
    pub fn is_lazy_tainted(&self, tags: &Tags, path: &str) -> bool {
        let state = self.state.load();
        let lazy = state
            .lazy_paths
            .get(tags)
            .or_else(|| state.lazy_paths.get(&Tags::none()));
        let Some(lazy) = lazy else {
            return false;
        };
        lazy.iter().any(|lazy_path| paths_overlap(path, lazy_path))
    }

    /// Current tree generation; bumped on every publish.
    pub fn generation(&self) -> u64 {
        self.state.load().generation
    }

    /// The lexer shared by every path-handling component.
    pub fn lexer(&self) -> &PathLexer {
        &self.lexer
    }

    /// Build the new state from raw source trees and swap it in.
    fn publish(&self, sources: &[RegisteredSource]) -> Vec<ValidationError> {
        let mut tag_sets = vec![Tags::none()];
        for registered in sources {
            if !tag_sets.contains(&registered.tags) {
                tag_sets.push(registered.tags.clone());
            }
        }

        let mut roots = HashMap::with_capacity(tag_sets.len());
        let mut lazy_paths = HashMap::new();
        let mut errors = Vec::new();

        for tag_set in tag_sets {
            let mut merged = ConfigNode::map();
            for registered in sources {
                if registered.tags.is_subset_of(&tag_set) {
                    merged = crate::node::merge(&merged, &registered.tree);
                }
            }
            let resolved = resolve::resolve_tree_eager(&merged, &self.lexer);
            for error in &resolved.errors {
                warn!("substitution under tags {tag_set}: {error}");
            }
            errors.extend(resolved.errors);
            if !resolved.lazy_paths.is_empty() {
                debug!(
                    "tags {tag_set}: {} lazy-tainted path(s) will bypass the cache",
                    resolved.lazy_paths.len()
                );
                lazy_paths.insert(tag_set.clone(), resolved.lazy_paths);
            }
            roots.insert(tag_set, Arc::new(resolved.root));
        }

        let generation = self.state.load().generation + 1;
        info!(
            "published config generation {generation} ({} tag-set root(s))",
            roots.len()
        );
        self.state.store(Arc::new(TreeState {
            roots,
            lazy_paths,
            generation,
            loaded: true,
        }));
        errors
    }

    /// Invoke listeners in registration order on the caller's thread. The
    /// swap is already complete, so a panicking listener cannot undo it.
    fn notify_listeners(&self) {
        let listeners = self.listeners.lock().clone();
        for listener in listeners {
            listener.on_reload();
        }
    }
}

/// Whether either path is a prefix of the other along token boundaries.
fn paths_overlap(a: &str, b: &str) -> bool {
    if a.is_empty() || b.is_empty() || a == b {
        return true;
    }
    let (short, long) = if a.len() <= b.len() { (a, b) } else { (b, a) };
    long.strip_prefix(short)
        .is_some_and(|rest| rest.starts_with('.') || rest.starts_with('['))
}
