//! Asset provider interface and the providers shipped with the core.
//!
//! The core never decodes pixels: an [`Image`] only carries the intrinsic
//! size the geometry is derived from. Fetching, decoding and caching belong to
//! the host, which plugs in through [`AssetProvider`].

use std::collections::HashMap;
use std::future::Future;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::error::{AssetError, ConfigError};

/// A resolved raster image, reduced to what layout needs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Image {
    pub path: String,
    pub width: f32,
    pub height: f32,
}

impl Image {
    pub fn new(path: impl Into<String>, width: f32, height: f32) -> Self {
        Self {
            path: path.into(),
            width,
            height,
        }
    }

    pub fn size(&self) -> [f32; 2] {
        [self.width, self.height]
    }

    /// Both dimensions are finite and positive.
    pub fn has_valid_size(&self) -> bool {
        self.width.is_finite() && self.height.is_finite() && self.width > 0.0 && self.height > 0.0
    }
}

/// Source of images, addressed by path or URL.
///
/// Fetches run on the host's tokio runtime, so returned futures must be `Send`.
/// Repeated fetches of the same path are expected to be cheap.
pub trait AssetProvider: Send + Sync + 'static {
    fn fetch_image(&self, path: &str) -> impl Future<Output = Result<Image, AssetError>> + Send;
}

/// Memoizes successful fetches of an inner provider by path.
#[derive(Debug)]
pub struct CachedAssetProvider<P> {
    inner: P,
    cache: Mutex<HashMap<String, Image>>,
}

impl<P: AssetProvider> CachedAssetProvider<P> {
    pub fn new(inner: P) -> Self {
        Self {
            inner,
            cache: Mutex::new(HashMap::new()),
        }
    }

    pub fn cached_len(&self) -> usize {
        self.cache.lock().len()
    }

    pub fn clear(&self) {
        self.cache.lock().clear();
    }
}

impl<P: AssetProvider> AssetProvider for CachedAssetProvider<P> {
    async fn fetch_image(&self, path: &str) -> Result<Image, AssetError> {
        if let Some(image) = self.cache.lock().get(path) {
            return Ok(image.clone());
        }
        let image = self.inner.fetch_image(path).await?;
        self.cache.lock().insert(path.to_string(), image.clone());
        Ok(image)
    }
}

/// In-memory provider backed by a path → size manifest.
#[derive(Debug, Clone, Default)]
pub struct StaticAssetProvider {
    sizes: HashMap<String, [f32; 2]>,
}

impl StaticAssetProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses a manifest of the form `{ "rings/basic.png": [60, 60], ... }`.
    pub fn from_manifest_json(json: &str) -> Result<Self, ConfigError> {
        let sizes: HashMap<String, [f32; 2]> = serde_json::from_str(json)?;
        Ok(Self { sizes })
    }

    pub fn with_image(mut self, path: impl Into<String>, size: [f32; 2]) -> Self {
        self.sizes.insert(path.into(), size);
        self
    }

    pub fn len(&self) -> usize {
        self.sizes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sizes.is_empty()
    }
}

impl AssetProvider for StaticAssetProvider {
    async fn fetch_image(&self, path: &str) -> Result<Image, AssetError> {
        let [width, height] = self
            .sizes
            .get(path)
            .copied()
            .ok_or_else(|| AssetError::NotFound(path.to_string()))?;
        let image = Image::new(path, width, height);
        if !image.has_valid_size() {
            return Err(AssetError::Invalid {
                path: path.to_string(),
                reason: format!("bad size {width}x{height}"),
            });
        }
        Ok(image)
    }
}
