pub mod logging;

use std::future::Future;
use std::pin::Pin;

/// Boxed `Send` future, used where trait objects need async methods.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;
