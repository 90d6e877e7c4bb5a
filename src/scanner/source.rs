use std::future::Future;
use std::sync::Arc;

use anyhow::Result;

use crate::models::CapturedFrame;
use crate::utils::BoxFuture;

/// Takes a photo and resolves to its URI.
pub trait PhotoSource: Send + Sync {
    fn take_photo(&self) -> BoxFuture<'_, Result<String>>;
}

impl<F, Fut> PhotoSource for F
where
    F: Fn() -> Fut + Send + Sync,
    Fut: Future<Output = Result<String>> + Send + 'static,
{
    fn take_photo(&self) -> BoxFuture<'_, Result<String>> {
        Box::pin(self())
    }
}

/// Invoked after each frame the ticker appends.
pub type FrameCallback = Arc<dyn Fn(&CapturedFrame) + Send + Sync>;
