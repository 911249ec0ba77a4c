//! Spawning of background work on the platform's executor.
//!
//! Natively tasks go to the ambient tokio runtime; in the browser they run on the
//! page's event loop.
use crate::spawn;

#[cfg(target_arch = "wasm32")]
pub trait SpawnableFuture: Future<Output = ()> + 'static {}
#[cfg(target_arch = "wasm32")]
impl<F> SpawnableFuture for F where F: Future<Output = ()> + 'static {}

#[cfg(not(target_arch = "wasm32"))]
pub trait SpawnableFuture: Future<Output = ()> + Send + 'static {}
#[cfg(not(target_arch = "wasm32"))]
impl<F> SpawnableFuture for F where F: Future<Output = ()> + Send + 'static {}

// NOTE: wasm32 does not require a Send bound, but not-wasm32 does.
pub fn perform_async_work<F>(f: F)
where
    F: SpawnableFuture,
{
    spawn!(f);
}

#[macro_export]
macro_rules! spawn {
    ($task:expr) => {
        #[cfg(not(target_arch = "wasm32"))]
        tokio::spawn($task);
        #[cfg(target_arch = "wasm32")]
        wasm_bindgen_futures::spawn_local($task);
    };
}
