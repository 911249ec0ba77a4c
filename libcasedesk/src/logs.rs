use std::collections::BTreeMap;
use std::sync::{Mutex, PoisonError};

use eyre::Result;
use tracing::{
    Level,
    field::{Field, Visit},
};
use tracing_subscriber::{EnvFilter, Layer};

use crate::config::LoggingConfig;

static DIAGNOSTICS: Mutex<Vec<Diagnostic>> = Mutex::new(vec![]);

#[macro_export]
macro_rules! try_log_error {
    ($expr:expr, $what:expr $(,)?) => {
        if let Err(e) = $expr {
            tracing::error!("{}: {}", $what, e)
        }
    };
}

/// One recorded log event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub name: String,
    pub msg: String,
    pub level: Level,
}

/// Removes and returns everything recorded since the last call.
pub fn take_diagnostics() -> Vec<Diagnostic> {
    std::mem::take(&mut *DIAGNOSTICS.lock().unwrap_or_else(PoisonError::into_inner))
}

struct DiagnosticsLayer {}

struct FieldVisitor<'a>(&'a mut BTreeMap<String, String>);

impl Visit for FieldVisitor<'_> {
    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        self.0
            .insert(field.name().to_string(), format!("{value:?}"));
    }
}

impl<S> Layer<S> for DiagnosticsLayer
where
    S: tracing::Subscriber,
{
    fn on_event(
        &self,
        event: &tracing::Event<'_>,
        _ctx: tracing_subscriber::layer::Context<'_, S>,
    ) {
        let mut fields = BTreeMap::new();
        event.record(&mut FieldVisitor(&mut fields));

        DIAGNOSTICS
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Diagnostic {
                name: event.metadata().module_path().unwrap_or("-").to_string(),
                msg: fields.remove("message").unwrap_or_else(|| "-".to_string()),
                level: *event.metadata().level(),
            });
    }
}

/// `RUST_LOG` when set, else the configured directives.
#[cfg(not(target_arch = "wasm32"))]
fn env_filter(config: &LoggingConfig) -> Result<EnvFilter> {
    match EnvFilter::try_from_default_env() {
        Ok(filter) => Ok(filter),
        Err(_) => Ok(EnvFilter::try_new(&config.filter)?),
    }
}

/// Installs the global subscriber: formatted output on stdout and, if enabled, the
/// diagnostics list behind [`take_diagnostics`]. Fails if a subscriber is already set.
#[cfg(not(target_arch = "wasm32"))]
pub fn start_logging(config: &LoggingConfig) -> Result<()> {
    use std::io::stdout;

    use tracing_subscriber::{Registry, fmt, layer::SubscriberExt};

    let diagnostics = if config.diagnostics {
        Some(DiagnosticsLayer {}.with_filter(env_filter(config)?))
    } else {
        None
    };
    let subscriber = Registry::default()
        .with(
            fmt::layer()
                .without_time()
                .with_writer(stdout)
                .with_filter(env_filter(config)?),
        )
        .with(diagnostics);

    tracing::subscriber::set_global_default(subscriber)?;
    tracing::info!("Logging started with filter {}", config.filter);
    Ok(())
}

/// The page has no stdout or environment, only the diagnostics list is kept.
#[cfg(target_arch = "wasm32")]
pub fn start_logging(config: &LoggingConfig) -> Result<()> {
    use tracing_subscriber::{Registry, layer::SubscriberExt};

    let subscriber = Registry::default()
        .with(DiagnosticsLayer {}.with_filter(EnvFilter::try_new(&config.filter)?));
    tracing::subscriber::set_global_default(subscriber)?;
    Ok(())
}
