//! Route table hot reload.
//!
//! # Data Flow
//! ```text
//! notify event (modify/create)
//!     → Reloader::check
//!         ├─ content unchanged since last reload → ignored
//!         ├─ parse + validate fails              → logged, ignored
//!         ├─ route names do not resolve          → logged, ignored
//!         └─ ok → AppConfig sent to the server, which swaps the table
//! ```

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;

use crate::config::loader::{parse_config, ConfigError};
use crate::config::schema::AppConfig;
use crate::dispatch::Router;

/// Reads the config file and accepts it only if every route builds.
struct Reloader {
    path: PathBuf,
    router: Arc<Router>,
    last: Option<String>,
}

impl Reloader {
    /// `Ok(None)` when the file content has not changed since the last accepted reload.
    fn check(&mut self) -> Result<Option<AppConfig>, ConfigError> {
        let content = fs::read_to_string(&self.path)?;
        if self.last.as_deref() == Some(content.as_str()) {
            return Ok(None);
        }

        let config = parse_config(&content)?;
        // Resolve every name against the container without touching the live table.
        self.router.build_routes(&config.routes)?;
        self.last = Some(content);
        Ok(Some(config))
    }
}

/// Watches the configuration file and forwards route tables that resolve.
pub struct ConfigWatcher {
    reloader: Reloader,
    update_tx: mpsc::UnboundedSender<AppConfig>,
}

impl ConfigWatcher {
    /// Returns the watcher and a receiver for accepted configuration updates.
    pub fn new(path: &Path, router: Arc<Router>) -> (Self, mpsc::UnboundedReceiver<AppConfig>) {
        let (update_tx, update_rx) = mpsc::unbounded_channel();
        let reloader = Reloader {
            path: path.to_path_buf(),
            router,
            last: fs::read_to_string(path).ok(),
        };
        (Self { reloader, update_tx }, update_rx)
    }

    /// Start watching the file. The returned handle must be kept alive.
    pub fn run(self) -> Result<RecommendedWatcher, notify::Error> {
        let Self {
            mut reloader,
            update_tx,
        } = self;
        let path = reloader.path.clone();

        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) if event.kind.is_modify() || event.kind.is_create() => match reloader.check() {
                    Ok(Some(config)) => {
                        tracing::info!(path = ?reloader.path, routes = config.routes.len(), "Config reloaded");
                        if update_tx.send(config).is_err() {
                            tracing::debug!("Config receiver dropped, ignoring reload");
                        }
                    }
                    Ok(None) => tracing::trace!(path = ?reloader.path, "Config unchanged"),
                    Err(e) => {
                        tracing::error!(error = %e, "Rejected config reload, keeping current routes");
                    }
                },
                Ok(_) => {}
                Err(e) => tracing::error!(error = ?e, "Watch error"),
            },
            Config::default().with_poll_interval(Duration::from_secs(2)),
        )?;

        watcher.watch(&path, RecursiveMode::NonRecursive)?;

        tracing::info!(path = ?path, "Config watcher started");
        Ok(watcher)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::register_builtins;
    use crate::container::Container;

    struct TempConfig(PathBuf);

    impl TempConfig {
        fn new() -> Self {
            Self(std::env::temp_dir().join(format!("dispatch-core-{}.toml", uuid::Uuid::new_v4())))
        }

        fn write(&self, content: &str) {
            fs::write(&self.0, content).unwrap();
        }
    }

    impl Drop for TempConfig {
        fn drop(&mut self) {
            let _ = fs::remove_file(&self.0);
        }
    }

    fn reloader(path: &Path) -> Reloader {
        let mut container = Container::new();
        register_builtins(&mut container);
        Reloader {
            path: path.to_path_buf(),
            router: Arc::new(Router::new(Arc::new(container))),
            last: None,
        }
    }

    #[test]
    fn test_accepts_resolvable_routes_once() {
        let file = TempConfig::new();
        file.write("[[routes]]\npath = \"/echo\"\ncontrollers = [\"echo\"]\n");
        let mut reloader = reloader(&file.0);

        let config = reloader.check().unwrap().unwrap();
        assert_eq!(config.routes.len(), 1);
        assert!(reloader.check().unwrap().is_none());
        assert!(reloader.router.list_routes().is_empty());
    }

    #[test]
    fn test_rejects_unknown_names() {
        let file = TempConfig::new();
        file.write("[[routes]]\npath = \"/x\"\ncontrollers = [\"missing\"]\n");
        let mut reloader = reloader(&file.0);

        let err = reloader.check().unwrap_err();
        assert!(matches!(err, ConfigError::UnknownType { .. }));

        // A fixed file is picked up on the next change.
        file.write("[[routes]]\npath = \"/x\"\ncontrollers = [\"echo\"]\n");
        assert!(reloader.check().unwrap().is_some());
    }

    #[test]
    fn test_rejects_capability_mismatch() {
        let file = TempConfig::new();
        file.write("[[routes]]\npath = \"/x\"\nmiddlewares = [\"echo\"]\n");
        let mut reloader = reloader(&file.0);

        let err = reloader.check().unwrap_err();
        assert!(matches!(err, ConfigError::Route(_)));
    }
}
