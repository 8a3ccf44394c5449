//! The layered-configuration facade.

use crate::cache::ResultCache;
use crate::decode::{Decoder, DecoderContext, DecoderRegistry, FromConfig, TypeDescriptor, downcast};
use crate::error::{ConfigError, ErrorPolicy, Severity, ValidationError};
use crate::ext::{ObservationRecorder, ReloadListener, ResultProcessor, SecretMasker, events};
use crate::lexer::PathLexer;
use crate::resolve;
use crate::result::{AnyValue, ConfigResult};
use crate::source::ConfigSource;
use crate::tag::Tags;
use crate::tree::TreeService;
use log::{debug, warn};
use std::sync::Arc;

/// Layered configuration: tagged sources merged into copy-on-write trees,
/// read through typed, memoized lookups.
///
/// Construction wires the collaborators; nothing is readable until
/// [`Strata::load`] publishes the first tree. Every lookup runs the same
/// pipeline: tokenize, pick the tag-set's root, probe the memo cache
/// (unless the path is lazy-tainted), substitute lazy placeholders,
/// decode through the registry, run the result processors, record
/// observations, and finally apply the call's error policy.
pub struct Strata {
    sources: Vec<Arc<dyn ConfigSource>>,
    service: TreeService,
    registry: DecoderRegistry,
    cache: ResultCache,
    policy: ErrorPolicy,
    masker: Option<Arc<dyn SecretMasker>>,
    processors: Vec<Arc<dyn ResultProcessor>>,
    observer: Option<Arc<dyn ObservationRecorder>>,
}

impl Strata {
    /// Wire a facade over the given sources, in precedence order (later
    /// sources override earlier ones). At least one source is required.
    ///
    /// Sources are fetched and their raw trees built here; call
    /// [`Strata::load`] to merge and publish them.
    pub fn new(sources: Vec<Arc<dyn ConfigSource>>) -> Result<Self, ConfigError> {
        if sources.is_empty() {
            return Err(ConfigError::NoSources);
        }
        let service = TreeService::new(PathLexer::default());
        for source in &sources {
            service.register_source(source.clone())?;
        }
        Ok(Self {
            sources,
            service,
            registry: DecoderRegistry::with_defaults(),
            cache: ResultCache::new(),
            policy: ErrorPolicy::standard(),
            masker: None,
            processors: Vec::new(),
            observer: None,
        })
    }

    /// Replace the path lexer. Re-registers every source, since raw trees
    /// are built from tokenized keys.
    pub fn with_lexer(mut self, lexer: PathLexer) -> Result<Self, ConfigError> {
        let service = TreeService::new(lexer);
        for source in &self.sources {
            service.register_source(source.clone())?;
        }
        self.service = service;
        Ok(self)
    }

    /// Replace the default policy applied to required lookups.
    pub fn with_policy(mut self, policy: ErrorPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Mask sensitive values in diagnostics.
    pub fn with_masker(mut self, masker: Arc<dyn SecretMasker>) -> Self {
        self.masker = Some(masker);
        self
    }

    /// Append a result processor; processors run in registration order.
    pub fn with_processor(mut self, processor: Arc<dyn ResultProcessor>) -> Self {
        self.processors.push(processor);
        self
    }

    /// Record observation events to the given recorder.
    pub fn with_observer(mut self, observer: Arc<dyn ObservationRecorder>) -> Self {
        self.observer = Some(observer);
        self
    }

    /// Replace the decoder registry wholesale.
    pub fn with_registry(mut self, registry: DecoderRegistry) -> Self {
        self.registry = registry;
        self
    }

    /// Append a decoder after the built-ins.
    pub fn with_decoder(mut self, decoder: Arc<dyn Decoder>) -> Self {
        self.registry.push(decoder);
        self
    }

    /// Merge and publish the registered sources. Returned validation errors
    /// are substitution problems; they do not prevent the publish.
    pub fn load(&self) -> Result<Vec<ValidationError>, ConfigError> {
        let errors = self.service.load()?;
        self.observe(events::RELOAD, self.service.generation() as f64, &Tags::none());
        Ok(errors)
    }

    /// Re-fetch every source, rebuild, swap, and notify reload listeners.
    /// Memoized results from the previous generation are dropped on the
    /// next probe.
    pub fn reload(&self) -> Result<Vec<ValidationError>, ConfigError> {
        let errors = self.service.reload()?;
        self.observe(events::RELOAD, self.service.generation() as f64, &Tags::none());
        Ok(errors)
    }

    /// Re-fetch a single source by name and rebuild.
    pub fn reload_source(&self, name: &str) -> Result<Vec<ValidationError>, ConfigError> {
        let errors = self.service.reload_source(name)?;
        self.observe(events::RELOAD, self.service.generation() as f64, &Tags::none());
        Ok(errors)
    }

    /// Register a further source and record it; call [`Strata::reload`] (or
    /// [`Strata::load`] if never loaded) to publish it.
    pub fn add_source(&mut self, source: Arc<dyn ConfigSource>) -> Result<(), ConfigError> {
        self.service.register_source(source.clone())?;
        self.observe(events::SOURCE_ADDED, 1.0, &source.tags());
        self.sources.push(source);
        Ok(())
    }

    /// Invoke `listener` after every successful reload swap.
    pub fn on_reload(&self, listener: Arc<dyn ReloadListener>) {
        self.service.add_listener(listener);
    }

    /// Required lookup under the default (empty) tag-set.
    pub fn get<T: FromConfig>(&self, path: &str) -> Result<T, ConfigError> {
        self.get_with_tags(path, &Tags::none())
    }

    /// Required lookup under `tags`. Problems the configured policy
    /// escalates, or the absence of any usable value, fail the call with
    /// the full accumulated error list.
    pub fn get_with_tags<T: FromConfig>(&self, path: &str, tags: &Tags) -> Result<T, ConfigError> {
        let ty = T::descriptor();
        let result = self.lookup(path, tags, &ty)?;

        if let Some(error) = result.errors.iter().find(|e| self.policy.escalates(e.severity)) {
            debug!("lookup '{path}' escalated on {error}");
            return Err(ConfigError::ResultsFailed {
                path: path.to_string(),
                errors: result.errors,
            });
        }
        match result.value {
            Some(value) => extract::<T>(path, &value, result.errors),
            None => Err(ConfigError::MissingValue {
                path: path.to_string(),
                details: render_details(&result.errors),
            }),
        }
    }

    /// Optional lookup under the default tag-set: absence is `Ok(None)` and
    /// nothing escalates. Structural failures (bad path, no decoder) still
    /// fail.
    pub fn get_optional<T: FromConfig>(&self, path: &str) -> Result<Option<T>, ConfigError> {
        self.get_optional_with_tags(path, &Tags::none())
    }

    /// Optional lookup under `tags`.
    pub fn get_optional_with_tags<T: FromConfig>(
        &self,
        path: &str,
        tags: &Tags,
    ) -> Result<Option<T>, ConfigError> {
        let ty = T::descriptor();
        let result = self.lookup(path, tags, &ty)?;
        match result.value {
            Some(value) => extract::<T>(path, &value, result.errors).map(Some),
            None => Ok(None),
        }
    }

    /// Lookup that can never raise: any failure, structural included,
    /// yields `default`.
    pub fn get_or_default<T: FromConfig>(&self, path: &str, default: T) -> T {
        self.get_or_default_with_tags(path, &Tags::none(), default)
    }

    /// Defaulted lookup under `tags`.
    pub fn get_or_default_with_tags<T: FromConfig>(
        &self,
        path: &str,
        tags: &Tags,
        default: T,
    ) -> T {
        match self.get_optional_with_tags::<T>(path, tags) {
            Ok(Some(value)) => value,
            Ok(None) => default,
            Err(error) => {
                warn!("defaulted lookup '{path}' failed structurally: {error}");
                default
            }
        }
    }

    /// The current tree generation, for diagnostics.
    pub fn generation(&self) -> u64 {
        self.service.generation()
    }

    /// The shared read pipeline up to (but excluding) policy application.
    fn lookup(
        &self,
        path: &str,
        tags: &Tags,
        ty: &TypeDescriptor,
    ) -> Result<ConfigResult<AnyValue>, ConfigError> {
        let tokens = self.service.lexer().tokenize(path)?;
        let root = self.service.root_for(tags)?;
        let generation = self.service.generation();
        let cacheable = !self.service.is_lazy_tainted(tags, path);

        if cacheable {
            if let Some(hit) = self.cache.get(path, ty, tags, generation) {
                self.observe(events::CACHE_HIT, 1.0, tags);
                return Ok(hit);
            }
        }

        let mut result = match root.navigate(&tokens) {
            Ok(node) => {
                // Lazy markers and escaped sigils survive the eager pass;
                // both are unwound here, against the live tree.
                let lookup = |key: &str| -> Option<String> {
                    let tokens = self.service.lexer().tokenize(key).ok()?;
                    root.navigate(&tokens).ok()?.value().map(str::to_string)
                };
                let mut resolved = resolve::resolve_node_lazy(node, path, &lookup);
                let node = resolved.value.take().unwrap_or_else(|| node.clone());
                let ctx = DecoderContext {
                    registry: &self.registry,
                    lexer: self.service.lexer(),
                    masker: self.masker.as_deref(),
                };
                let mut decoded = self.registry.decode(path, tags, &node, ty, &ctx)?;
                decoded.push_errors(resolved.errors);
                decoded
            }
            Err(missing) => ConfigResult::err(ValidationError::missing(path, missing.to_string())),
        };

        for processor in &self.processors {
            result = processor.process(path, ty, result);
        }

        if result.has_errors_at(Severity::Error) {
            self.observe(events::DECODE_ERROR, result.errors.len() as f64, tags);
        } else if !result.errors.is_empty() {
            self.observe(events::DECODE_WARNING, result.errors.len() as f64, tags);
        }
        if result.has_value() {
            self.observe(events::GET_OK, 1.0, tags);
        }

        if cacheable {
            self.cache.store(path, ty, tags, generation, result.clone());
        }
        Ok(result)
    }

    fn observe(&self, name: &str, value: f64, tags: &Tags) {
        if let Some(observer) = &self.observer {
            observer.record(name, value, tags);
        }
    }
}

/// Pull the typed value back out of the erased result.
fn extract<T: FromConfig>(
    path: &str,
    value: &AnyValue,
    errors: Vec<ValidationError>,
) -> Result<T, ConfigError> {
    match downcast::<T>(value) {
        Some(typed) => Ok(typed),
        None => {
            let mut errors = errors;
            errors.push(ValidationError::decode(
                path,
                "decoded value did not have the requested type",
            ));
            Err(ConfigError::ResultsFailed {
                path: path.to_string(),
                errors,
            })
        }
    }
}

fn render_details(errors: &[ValidationError]) -> String {
    if errors.is_empty() {
        return "no configuration found".to_string();
    }
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}
