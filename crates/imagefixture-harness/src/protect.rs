//! Registry of images that test-run cleanup must not remove.

use std::collections::BTreeSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use imagefixture_common::types::ImageTag;

/// Shared set of protected image references (`name:tag`).
///
/// Clones share the same underlying set.
#[derive(Debug, Clone, Default)]
pub struct ProtectedImages {
    inner: Arc<Mutex<BTreeSet<String>>>,
}

impl ProtectedImages {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks `image` as protected. Bare names are stored as `name:latest`.
    pub fn protect(&self, image: &ImageTag) {
        let reference = image.qualified();
        if self.lock().insert(reference.clone()) {
            tracing::debug!(image = %reference, "image protected");
        }
    }

    /// Whether `reference` is protected, qualifying bare names first.
    #[must_use]
    pub fn is_protected(&self, reference: &str) -> bool {
        self.lock().contains(&ImageTag::new(reference).qualified())
    }

    /// Protected references in sorted order.
    #[must_use]
    pub fn snapshot(&self) -> Vec<String> {
        self.lock().iter().cloned().collect()
    }

    fn lock(&self) -> MutexGuard<'_, BTreeSet<String>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Registers protection for an image when dropped, so every exit path of
/// the enclosing scope protects it.
#[derive(Debug)]
pub struct ProtectGuard<'a> {
    registry: &'a ProtectedImages,
    image: ImageTag,
}

impl<'a> ProtectGuard<'a> {
    /// Arms a guard for `image`.
    #[must_use]
    pub const fn new(registry: &'a ProtectedImages, image: ImageTag) -> Self {
        Self { registry, image }
    }
}

impl Drop for ProtectGuard<'_> {
    fn drop(&mut self) {
        self.registry.protect(&self.image);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn protect_qualifies_bare_name() {
        let registry = ProtectedImages::new();
        registry.protect(&ImageTag::new("httpserver"));
        assert!(registry.is_protected("httpserver:latest"));
        assert!(registry.is_protected("httpserver"));
        assert!(!registry.is_protected("httpserver:v2"));
    }

    #[test]
    fn protect_twice_keeps_single_entry() {
        let registry = ProtectedImages::new();
        registry.protect(&ImageTag::new("httpserver"));
        registry.protect(&ImageTag::new("httpserver:latest"));
        assert_eq!(registry.snapshot(), vec!["httpserver:latest"]);
    }

    #[test]
    fn clones_share_state() {
        let registry = ProtectedImages::new();
        let clone = registry.clone();
        clone.protect(&ImageTag::new("busybox"));
        assert!(registry.is_protected("busybox"));
    }

    #[test]
    fn guard_protects_on_drop() {
        let registry = ProtectedImages::new();
        {
            let _guard = ProtectGuard::new(&registry, ImageTag::new("httpserver"));
            assert!(registry.snapshot().is_empty());
        }
        assert!(registry.is_protected("httpserver"));
    }

    #[test]
    fn guard_protects_on_early_return() {
        fn failing_step(registry: &ProtectedImages, fail: bool) -> Result<(), &'static str> {
            let _guard = ProtectGuard::new(registry, ImageTag::new("httpserver"));
            if fail {
                return Err("copy failed");
            }
            Ok(())
        }

        let registry = ProtectedImages::new();
        assert!(failing_step(&registry, true).is_err());
        assert!(registry.is_protected("httpserver:latest"));
    }
}
