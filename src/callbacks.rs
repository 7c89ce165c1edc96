//! User callbacks for lifecycle events.
//!
//! Handlers come from a [`CallbackLoader`] as a [`HandlerSet`]; the listener
//! narrows that set to the requested event types with
//! [`CallbackRegistry::new`] and calls [`CallbackRegistry::dispatch`] for each
//! event.

use std::collections::BTreeMap;
use std::panic::AssertUnwindSafe;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use futures::FutureExt;
use futures::future::BoxFuture;

use crate::api::Aria2Api;
use crate::error::{Error, Result};
use crate::events::{EventKind, LifecycleEvent};
use crate::gid::Gid;

/// A handler invoked for one kind of lifecycle event.
#[async_trait]
pub trait Callback: Send + Sync {
    /// Handles an event for `gid`. `api` may be used to act on the download.
    async fn call(&self, api: &dyn Aria2Api, gid: &Gid) -> Result<()>;
}

/// Adapts an async closure into a [`Callback`].
///
/// The closure returns a boxed future so it can await `api` calls:
///
/// ```no_run
/// use ariactl::{EventKind, FnCallback, HandlerSet};
/// use futures::FutureExt;
///
/// let pause_on_start = FnCallback::new(|api, gid| {
///     async move {
///         let download = api.get_download(gid).await?;
///         api.pause(&download, false).await
///     }
///     .boxed()
/// });
/// let handlers = HandlerSet::new().with(EventKind::Started, pause_on_start);
/// ```
pub struct FnCallback<F> {
    f: F,
}

impl<F> FnCallback<F>
where
    F: for<'a> Fn(&'a dyn Aria2Api, &'a Gid) -> BoxFuture<'a, Result<()>> + Send + Sync,
{
    pub const fn new(f: F) -> Self {
        Self { f }
    }
}

#[async_trait]
impl<F> Callback for FnCallback<F>
where
    F: for<'a> Fn(&'a dyn Aria2Api, &'a Gid) -> BoxFuture<'a, Result<()>> + Send + Sync,
{
    async fn call(&self, api: &dyn Aria2Api, gid: &Gid) -> Result<()> {
        (self.f)(api, gid).await
    }
}

/// Runs an external command for each event.
///
/// `{gid}` and `{event}` in the arguments are replaced, and the command gets
/// `ARIACTL_GID` and `ARIACTL_EVENT` in its environment. Standard streams are
/// inherited.
#[derive(Debug, Clone)]
pub struct CommandCallback {
    kind: EventKind,
    program: String,
    args: Vec<String>,
}

impl CommandCallback {
    /// Builds a callback from `argv`; the first element is the program.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] if `argv` is empty.
    pub fn new(kind: EventKind, argv: Vec<String>) -> Result<Self> {
        let mut argv = argv.into_iter();
        let program = argv.next().filter(|p| !p.is_empty()).ok_or_else(|| {
            Error::InvalidArgument(format!("{}: empty command", kind.handler_name()))
        })?;
        Ok(Self {
            kind,
            program,
            args: argv.collect(),
        })
    }

    fn expand(&self, arg: &str, gid: &Gid) -> String {
        arg.replace("{gid}", gid.as_str())
            .replace("{event}", self.kind.name())
    }

    fn failure(&self, message: String) -> Error {
        Error::Handler {
            handler: self.kind.handler_name().to_string(),
            message,
        }
    }
}

#[async_trait]
impl Callback for CommandCallback {
    async fn call(&self, _api: &dyn Aria2Api, gid: &Gid) -> Result<()> {
        let status = tokio::process::Command::new(&self.program)
            .args(self.args.iter().map(|a| self.expand(a, gid)))
            .env("ARIACTL_GID", gid.as_str())
            .env("ARIACTL_EVENT", self.kind.name())
            .status()
            .await
            .map_err(|e| self.failure(format!("cannot run {}: {e}", self.program)))?;

        if status.success() {
            Ok(())
        } else {
            Err(self.failure(format!("{} exited with {status}", self.program)))
        }
    }
}

/// Handlers grouped by event kind, in registration order.
#[derive(Default, Clone)]
pub struct HandlerSet {
    handlers: BTreeMap<EventKind, Vec<Arc<dyn Callback>>>,
}

impl HandlerSet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a handler for `kind` after any already registered.
    #[must_use]
    pub fn with(mut self, kind: EventKind, callback: impl Callback + 'static) -> Self {
        self.register(kind, Arc::new(callback));
        self
    }

    pub fn register(&mut self, kind: EventKind, callback: Arc<dyn Callback>) {
        self.handlers.entry(kind).or_default().push(callback);
    }

    /// Event kinds with at least one handler.
    pub fn kinds(&self) -> impl Iterator<Item = EventKind> + '_ {
        self.handlers.keys().copied()
    }
}

/// Source of handlers, resolved once when a listener starts.
pub trait CallbackLoader {
    /// Loads every handler the source defines.
    ///
    /// # Errors
    ///
    /// Returns an error if the source cannot be read or is malformed.
    fn load(&self) -> Result<HandlerSet>;
}

/// Loads [`CommandCallback`]s from a TOML hooks file:
///
/// ```toml
/// on_download_start = ["echo", "started", "{gid}"]
/// on_download_complete = ["notify-send", "aria2", "{gid} finished"]
/// ```
#[derive(Debug, Clone)]
pub struct HookFileLoader {
    path: PathBuf,
}

impl HookFileLoader {
    #[must_use]
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }
}

impl CallbackLoader for HookFileLoader {
    fn load(&self) -> Result<HandlerSet> {
        let content = std::fs::read_to_string(&self.path)?;
        let table: BTreeMap<String, Vec<String>> = toml::from_str(&content)?;

        let mut set = HandlerSet::new();
        for (name, argv) in table {
            let Some(kind) = EventKind::from_handler_name(&name) else {
                log::warn!("{}: ignoring unknown hook {name}", self.path.display());
                continue;
            };
            set.register(kind, Arc::new(CommandCallback::new(kind, argv)?));
        }
        log::debug!(
            "Loaded hooks for {:?} from {}",
            set.kinds().map(EventKind::name).collect::<Vec<_>>(),
            self.path.display()
        );
        Ok(set)
    }
}

/// Counts from dispatching one event.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Dispatch {
    /// Handlers run for the event.
    pub invoked: usize,
    /// Handlers among them that returned an error or panicked.
    pub failed: usize,
}

/// Handlers for the event kinds a listen session asked for.
///
/// Immutable once built.
pub struct CallbackRegistry {
    handlers: BTreeMap<EventKind, Vec<Arc<dyn Callback>>>,
}

impl CallbackRegistry {
    /// Keeps the handlers of `available` whose kind is in `requested`.
    ///
    /// Requested kinds with no handler are skipped.
    #[must_use]
    pub fn new(available: HandlerSet, requested: &[EventKind]) -> Self {
        let mut handlers = available.handlers;
        handlers.retain(|kind, _| requested.contains(kind));
        for kind in requested {
            if !handlers.contains_key(kind) {
                log::debug!("No {} handler defined, skipping {kind} events", kind.handler_name());
            }
        }
        Self { handlers }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    pub fn kinds(&self) -> impl Iterator<Item = EventKind> + '_ {
        self.handlers.keys().copied()
    }

    /// Runs every handler registered for `event.kind`, one after another.
    ///
    /// A failing or panicking handler is logged and does not prevent the
    /// next handler from running.
    pub async fn dispatch(&self, api: &dyn Aria2Api, event: &LifecycleEvent) -> Dispatch {
        let mut result = Dispatch::default();
        let Some(handlers) = self.handlers.get(&event.kind) else {
            return result;
        };

        for handler in handlers {
            result.invoked += 1;
            let call = AssertUnwindSafe(handler.call(api, &event.gid)).catch_unwind();
            let failure = match call.await {
                Ok(Ok(())) => continue,
                Ok(Err(e)) => e.to_string(),
                Err(_) => format!("{} panicked", event.kind.handler_name()),
            };
            result.failed += 1;
            log::error!("{} for GID {}: {failure}", event.kind.handler_name(), event.gid);
        }
        result
    }
}
