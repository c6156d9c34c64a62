//! Per-aggregate-type event dispatch.
//!
//! Each aggregate type declares its event handlers through a
//! [`HandlerRegistry`]: one plain function per event type, taking the entity
//! and one owned event value and returning nothing. The registry erases the
//! event type behind a payload-decoding closure, and the dispatcher holds the
//! resulting table immutably once built.
//!
//! [`DispatcherProvider`] builds one dispatcher per aggregate type on first
//! use and caches it behind a bounded LRU with an optional TTL. Eviction only
//! costs a rebuild, never a wrong answer.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::num::NonZeroUsize;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use lru::LruCache;
use parking_lot::Mutex;
use serde::de::DeserializeOwned;

use crate::aggregate::EventSourced;
use crate::error::DispatchError;
use crate::event::EventType;

type HandlerFn<T> = Box<dyn Fn(&mut T, &serde_json::Value) -> Result<(), serde_json::Error> + Send + Sync>;

/// One (event type → behavior) binding declared by an aggregate type.
pub struct HandlerDef<T> {
    event_type: String,
    handler: HandlerFn<T>,
}

/// Collects the handler definitions of one aggregate type.
pub struct HandlerRegistry<T> {
    defs: Vec<HandlerDef<T>>,
}

impl<T: 'static> Default for HandlerRegistry<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: 'static> HandlerRegistry<T> {
    /// Creates an empty registry.
    #[must_use]
    pub const fn new() -> Self {
        Self { defs: Vec::new() }
    }

    /// Registers a handler for `E` under its declared event type tag.
    ///
    /// The handler must be a plain function of exactly the entity and one
    /// owned event value, returning nothing; anything else is rejected by the
    /// compiler.
    pub fn on<E>(&mut self, handler: fn(&mut T, E))
    where
        E: EventType + DeserializeOwned + 'static,
    {
        self.on_tag(E::EVENT_TYPE, handler);
    }

    /// Registers a handler under an explicit event type tag. Useful when an
    /// aggregate consumes events declared by another bounded context.
    pub fn on_tag<E>(&mut self, event_type: impl Into<String>, handler: fn(&mut T, E))
    where
        E: DeserializeOwned + 'static,
    {
        self.defs.push(HandlerDef {
            event_type: event_type.into(),
            handler: Box::new(move |entity, payload| {
                let event: E = serde_json::from_value(payload.clone())?;
                handler(entity, event);
                Ok(())
            }),
        });
    }

    pub(crate) fn into_defs(self) -> Vec<HandlerDef<T>> {
        self.defs
    }
}

/// How a dispatcher treats malformed handler definitions and repeat builds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchMode {
    /// Malformed definitions abort construction; building twice fails with
    /// `AlreadyInitialized`.
    Strict,
    /// Malformed definitions are silently skipped; repeat builds are no-ops.
    /// Used when registering handlers from loosely-curated types.
    Quiet,
}

/// Immutable (event type → handler) table for one aggregate type.
pub struct EventHandlerDispatcher<T> {
    aggregate_kind: String,
    mode: DispatchMode,
    handlers: HashMap<String, HandlerFn<T>>,
    built: bool,
}

impl<T> EventHandlerDispatcher<T> {
    /// Creates an empty, not-yet-built dispatcher.
    #[must_use]
    pub fn new(aggregate_kind: impl Into<String>, mode: DispatchMode) -> Self {
        Self {
            aggregate_kind: aggregate_kind.into(),
            mode,
            handlers: HashMap::new(),
            built: false,
        }
    }

    /// Builds the handler table from `defs`, validating each definition.
    ///
    /// A definition is well-formed when its event type tag is non-blank and
    /// contains no whitespace. Duplicate tags fail in both modes.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::AlreadyInitialized`] on a second strict-mode
    /// build, [`DispatchError::InvalidHandlerSignature`] for a malformed
    /// definition in strict mode, and [`DispatchError::DuplicateHandler`]
    /// when one event type is bound twice.
    pub fn build(&mut self, defs: Vec<HandlerDef<T>>) -> Result<(), DispatchError> {
        if self.built {
            return match self.mode {
                DispatchMode::Strict => Err(DispatchError::AlreadyInitialized {
                    aggregate_kind: self.aggregate_kind.clone(),
                }),
                DispatchMode::Quiet => Ok(()),
            };
        }

        let mut handlers = HashMap::with_capacity(defs.len());
        for def in defs {
            if def.event_type.trim().is_empty()
                || def.event_type.chars().any(char::is_whitespace)
            {
                match self.mode {
                    DispatchMode::Strict => {
                        return Err(DispatchError::InvalidHandlerSignature {
                            aggregate_kind: self.aggregate_kind.clone(),
                            reason: format!("event type tag {:?} is blank or contains whitespace", def.event_type),
                        });
                    }
                    DispatchMode::Quiet => {
                        tracing::debug!(
                            aggregate_kind = %self.aggregate_kind,
                            event_type = %def.event_type,
                            "skipping malformed handler definition"
                        );
                        continue;
                    }
                }
            }
            if handlers.insert(def.event_type.clone(), def.handler).is_some() {
                return Err(DispatchError::DuplicateHandler {
                    aggregate_kind: self.aggregate_kind.clone(),
                    event_type: def.event_type,
                });
            }
        }

        self.handlers = handlers;
        self.built = true;
        tracing::debug!(
            aggregate_kind = %self.aggregate_kind,
            handler_count = self.handlers.len(),
            "dispatcher built"
        );
        Ok(())
    }

    /// Applies one recorded event to the entity.
    ///
    /// An event type with no registered handler is a valid no-op (not every
    /// aggregate reacts to every event type its history may contain); the
    /// return value reports whether a handler ran.
    ///
    /// # Errors
    ///
    /// Returns a `serde_json` error if the payload cannot be decoded into the
    /// handler's event type.
    pub fn apply(
        &self,
        entity: &mut T,
        event_type: &str,
        payload: &serde_json::Value,
    ) -> Result<bool, serde_json::Error> {
        match self.handlers.get(event_type) {
            Some(handler) => {
                handler(entity, payload)?;
                Ok(true)
            }
            None => {
                tracing::trace!(
                    aggregate_kind = %self.aggregate_kind,
                    event_type,
                    "no handler registered; ignoring event"
                );
                Ok(false)
            }
        }
    }

    /// Returns whether a handler is registered for `event_type`.
    #[must_use]
    pub fn handles(&self, event_type: &str) -> bool {
        self.handlers.contains_key(event_type)
    }

    /// Returns the number of registered handlers.
    #[must_use]
    pub fn handler_count(&self) -> usize {
        self.handlers.len()
    }
}

struct CacheEntry {
    dispatcher: Arc<dyn Any + Send + Sync>,
    built_at: Instant,
}

/// Lazily builds and caches one dispatcher per aggregate type.
///
/// Capacity and TTL are policy parameters, not correctness requirements:
/// evicting an entry only means the next lookup rebuilds it. Lookups and
/// builds run under one cache lock, so a dispatcher is built at most once per
/// type even under concurrent first access.
pub struct DispatcherProvider {
    cache: Mutex<LruCache<TypeId, CacheEntry>>,
    ttl: Option<Duration>,
    mode: DispatchMode,
    builds: AtomicU64,
}

impl DispatcherProvider {
    /// Creates a provider with the given cache capacity, strict build mode,
    /// and no TTL.
    #[must_use]
    pub fn new(capacity: NonZeroUsize) -> Self {
        Self {
            cache: Mutex::new(LruCache::new(capacity)),
            ttl: None,
            mode: DispatchMode::Strict,
            builds: AtomicU64::new(0),
        }
    }

    /// Sets a time-to-live after which cached dispatchers are rebuilt.
    #[must_use]
    pub const fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = Some(ttl);
        self
    }

    /// Sets the build mode used for dispatchers constructed by this provider.
    #[must_use]
    pub const fn with_mode(mut self, mode: DispatchMode) -> Self {
        self.mode = mode;
        self
    }

    /// Returns the cached dispatcher for `T`, building it on first access or
    /// after eviction/expiry.
    ///
    /// # Errors
    ///
    /// Returns a [`DispatchError`] if `T`'s handler registration is
    /// malformed.
    pub fn dispatcher_for<T>(&self) -> Result<Arc<EventHandlerDispatcher<T>>, DispatchError>
    where
        T: EventSourced + 'static,
    {
        let key = TypeId::of::<T>();
        let mut cache = self.cache.lock();

        if let Some(entry) = cache.get(&key) {
            let expired = self.ttl.is_some_and(|ttl| entry.built_at.elapsed() >= ttl);
            if !expired {
                let dispatcher = entry
                    .dispatcher
                    .clone()
                    .downcast::<EventHandlerDispatcher<T>>()
                    .map_err(|_| DispatchError::InvalidHandlerSignature {
                        aggregate_kind: T::KIND.to_owned(),
                        reason: "cached dispatcher has unexpected type".to_owned(),
                    })?;
                tracing::trace!(aggregate_kind = T::KIND, "dispatcher cache hit");
                return Ok(dispatcher);
            }
            tracing::debug!(aggregate_kind = T::KIND, "dispatcher cache entry expired");
        }

        let mut dispatcher = EventHandlerDispatcher::new(T::KIND, self.mode);
        let mut registry = HandlerRegistry::new();
        T::register_handlers(&mut registry);
        dispatcher.build(registry.into_defs())?;
        self.builds.fetch_add(1, Ordering::Relaxed);

        let dispatcher = Arc::new(dispatcher);
        cache.put(
            key,
            CacheEntry {
                dispatcher: dispatcher.clone(),
                built_at: Instant::now(),
            },
        );
        tracing::debug!(aggregate_kind = T::KIND, "dispatcher built and cached");
        Ok(dispatcher)
    }

    /// Number of dispatcher builds performed since construction (cache hits
    /// excluded).
    #[must_use]
    pub fn build_count(&self) -> u64 {
        self.builds.load(Ordering::Relaxed)
    }
}

impl Default for DispatcherProvider {
    fn default() -> Self {
        Self::new(const { NonZeroUsize::new(64).unwrap() })
    }
}
