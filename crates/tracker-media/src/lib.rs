//! Image uploads for order thumbnails.
//!
//! Uploads go through two stages. [`prepare_image`] is a pure function that
//! decodes the input, shrinks it to fit the configured bound and re-encodes
//! it as JPEG. The result is then written to an object store backend that
//! returns a publicly fetchable URL. Nothing is written when processing
//! fails.

use async_trait::async_trait;
use image::{codecs::jpeg::JpegEncoder, imageops::FilterType};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracker_types::{current_timestamp_millis, ImplementationRegistry};

/// Re-export implementations
pub mod implementations {
	pub mod http;
	pub mod local;
	pub mod memory;
}

pub const JPEG_CONTENT_TYPE: &str = "image/jpeg";

/// Errors raised while processing or storing an upload. Messages tell the
/// uploader what to try next.
#[derive(Debug, Error)]
pub enum MediaError {
	#[error("Unsupported image: {0}. Upload a JPEG, PNG, GIF or WebP file")]
	UnsupportedFormat(String),
	#[error("Image processing timed out after {0:?}. Try a smaller image")]
	Timeout(Duration),
	#[error("Failed to encode image: {0}")]
	Encode(String),
	#[error("Failed to store image: {0}. Try again later")]
	Store(String),
	#[error("Configuration error: {0}")]
	Configuration(String),
}

/// Resize bound and output quality.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageOptions {
	/// Longest edge of the output, in pixels.
	pub max_dimension: u32,
	/// JPEG quality, 1 to 100.
	pub jpeg_quality: u8,
}

impl Default for ImageOptions {
	fn default() -> Self {
		Self {
			max_dimension: 800,
			jpeg_quality: 70,
		}
	}
}

/// Decodes `bytes`, shrinks the image so its longest edge is at most
/// `max_dimension` (never enlarging, aspect ratio kept) and re-encodes it
/// as JPEG.
pub fn prepare_image(bytes: &[u8], options: &ImageOptions) -> Result<Vec<u8>, MediaError> {
	let format = image::guess_format(bytes)
		.map_err(|_| MediaError::UnsupportedFormat("unrecognized file contents".into()))?;
	// Any decode failure, truncated input included, is the uploader's to fix.
	let decoded = image::load_from_memory_with_format(bytes, format)
		.map_err(|e| MediaError::UnsupportedFormat(e.to_string()))?;

	let bound = options.max_dimension;
	let resized = if decoded.width() > bound || decoded.height() > bound {
		decoded.resize(bound, bound, FilterType::Triangle)
	} else {
		decoded
	};

	// JPEG carries no alpha channel.
	let rgb = resized.to_rgb8();
	let mut out = Vec::new();
	JpegEncoder::new_with_quality(&mut out, options.jpeg_quality.clamp(1, 100))
		.encode_image(&rgb)
		.map_err(|e| MediaError::Encode(e.to_string()))?;
	Ok(out)
}

/// `{prefix}/{millis}_{stem}.jpg`, where `stem` is the original file name
/// without directories or extension and with everything outside
/// `[A-Za-z0-9_-]` replaced by `_`.
pub fn object_name(prefix: &str, original: &str, millis: u128) -> String {
	let file = original.rsplit(['/', '\\']).next().unwrap_or(original);
	let stem = match file.rsplit_once('.') {
		Some((stem, _)) if !stem.is_empty() => stem,
		_ => file,
	};
	let mut sanitized: String = stem
		.chars()
		.map(|c| {
			if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
				c
			} else {
				'_'
			}
		})
		.collect();
	if sanitized.is_empty() {
		sanitized.push_str("image");
	}
	format!("{}/{}_{}.jpg", prefix.trim_matches('/'), millis, sanitized)
}

/// Interface for object storage backends.
#[async_trait]
pub trait ObjectStoreInterface: Send + Sync {
	/// Writes `bytes` under `name` and returns a public URL for it.
	async fn put(&self, name: &str, bytes: Vec<u8>, content_type: &str)
		-> Result<String, MediaError>;
}

/// Type alias for object store factory functions.
pub type ObjectStoreFactory =
	fn(&toml::Value) -> Result<Box<dyn ObjectStoreInterface>, MediaError>;

/// Registry trait for object store implementations.
pub trait ObjectStoreRegistry: ImplementationRegistry<Factory = ObjectStoreFactory> {}

/// Get all registered object store implementations.
pub fn get_all_implementations() -> Vec<(&'static str, ObjectStoreFactory)> {
	use implementations::{http, local, memory};

	vec![
		(http::Registry::NAME, http::Registry::factory()),
		(local::Registry::NAME, local::Registry::factory()),
		(memory::Registry::NAME, memory::Registry::factory()),
	]
}

/// Processing settings of the media service.
#[derive(Debug, Clone)]
pub struct MediaSettings {
	pub image: ImageOptions,
	pub path_prefix: String,
	pub processing_timeout: Duration,
}

/// Processes uploads and writes them through the primary object store.
pub struct MediaService {
	implementations: HashMap<String, Arc<dyn ObjectStoreInterface>>,
	primary_implementation: String,
	settings: MediaSettings,
}

impl MediaService {
	pub fn new(
		implementations: HashMap<String, Arc<dyn ObjectStoreInterface>>,
		primary_implementation: String,
		settings: MediaSettings,
	) -> Result<Self, MediaError> {
		if !implementations.contains_key(&primary_implementation) {
			return Err(MediaError::Configuration(format!(
				"Primary implementation '{}' not found in available implementations",
				primary_implementation
			)));
		}
		Ok(Self {
			implementations,
			primary_implementation,
			settings,
		})
	}

	/// Processes and stores one image. Returns its public URL.
	#[tracing::instrument(skip_all, fields(file = %original_name, size = bytes.len()))]
	pub async fn upload(&self, original_name: &str, bytes: Vec<u8>) -> Result<String, MediaError> {
		let options = self.settings.image;
		let processed = with_timeout(self.settings.processing_timeout, move || {
			prepare_image(&bytes, &options)
		})
		.await
		.inspect_err(|e| tracing::warn!(error = %e, "Rejected upload"))?;

		let name = object_name(
			&self.settings.path_prefix,
			original_name,
			current_timestamp_millis(),
		);
		let store = self.implementations.get(&self.primary_implementation).ok_or_else(|| {
			MediaError::Configuration(format!(
				"Primary implementation '{}' not available",
				self.primary_implementation
			))
		})?;
		let url = store
			.put(&name, processed, JPEG_CONTENT_TYPE)
			.await
			.inspect_err(|e| tracing::error!(object = %name, error = %e, "Failed to store upload"))?;

		tracing::info!(object = %name, "Stored upload");
		Ok(url)
	}
}

/// Runs CPU-bound work on the blocking pool, giving up after `timeout`.
async fn with_timeout<F, T>(timeout: Duration, work: F) -> Result<T, MediaError>
where
	F: FnOnce() -> Result<T, MediaError> + Send + 'static,
	T: Send + 'static,
{
	match tokio::time::timeout(timeout, tokio::task::spawn_blocking(work)).await {
		Err(_) => Err(MediaError::Timeout(timeout)),
		Ok(Err(join)) => Err(MediaError::Encode(format!("Processing task failed: {}", join))),
		Ok(Ok(result)) => result,
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use image::{DynamicImage, ImageFormat, RgbaImage};
	use implementations::memory::MemoryObjectStore;
	use std::io::Cursor;

	pub(crate) fn png(width: u32, height: u32) -> Vec<u8> {
		let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(
			width,
			height,
			image::Rgba([200, 120, 40, 255]),
		));
		let mut out = Cursor::new(Vec::new());
		img.write_to(&mut out, ImageFormat::Png).unwrap();
		out.into_inner()
	}

	fn dimensions(jpeg: &[u8]) -> (u32, u32) {
		let img = image::load_from_memory_with_format(jpeg, ImageFormat::Jpeg).unwrap();
		(img.width(), img.height())
	}

	#[test]
	fn test_large_image_is_bounded_with_aspect_kept() {
		let out = prepare_image(&png(1600, 800), &ImageOptions::default()).unwrap();
		assert_eq!(image::guess_format(&out).unwrap(), ImageFormat::Jpeg);
		assert_eq!(dimensions(&out), (800, 400));

		let tall = prepare_image(&png(300, 1200), &ImageOptions::default()).unwrap();
		assert_eq!(dimensions(&tall), (200, 800));
	}

	#[test]
	fn test_small_image_is_not_enlarged() {
		let out = prepare_image(&png(120, 90), &ImageOptions::default()).unwrap();
		assert_eq!(dimensions(&out), (120, 90));
	}

	#[test]
	fn test_garbage_is_unsupported() {
		assert!(matches!(
			prepare_image(b"definitely not an image", &ImageOptions::default()),
			Err(MediaError::UnsupportedFormat(_))
		));
	}

	#[test]
	fn test_truncated_image_is_unsupported() {
		// Valid PNG signature with the body cut off mid-header.
		let mut broken = png(10, 10);
		broken.truncate(20);
		let err = prepare_image(&broken, &ImageOptions::default()).unwrap_err();
		assert!(matches!(err, MediaError::UnsupportedFormat(_)), "got {:?}", err);
		assert!(err.to_string().contains("Upload a JPEG"));
	}

	#[test]
	fn test_object_name() {
		assert_eq!(
			object_name("uploads", "My Photo (1).PNG", 1700000000000),
			"uploads/1700000000000_My_Photo__1_.jpg"
		);
		assert_eq!(
			object_name("/uploads/", "C:\\tmp\\cat.webp", 5),
			"uploads/5_cat.jpg"
		);
		assert_eq!(object_name("uploads", ".jpg", 5), "uploads/5__jpg.jpg");
		assert_eq!(object_name("uploads", "", 5), "uploads/5_image.jpg");
	}

	#[tokio::test]
	async fn test_slow_processing_times_out() {
		let result = with_timeout(Duration::from_millis(20), || {
			std::thread::sleep(Duration::from_millis(500));
			Ok(())
		})
		.await;
		assert!(matches!(result, Err(MediaError::Timeout(_))));
	}

	fn service(store: Arc<MemoryObjectStore>) -> MediaService {
		let store: Arc<dyn ObjectStoreInterface> = store;
		MediaService::new(
			HashMap::from([("memory".to_string(), store)]),
			"memory".into(),
			MediaSettings {
				image: ImageOptions::default(),
				path_prefix: "uploads".into(),
				processing_timeout: Duration::from_secs(30),
			},
		)
		.unwrap()
	}

	#[tokio::test]
	async fn test_upload_stores_processed_jpeg() {
		let store = Arc::new(MemoryObjectStore::new());
		let svc = service(store.clone());

		let url = svc.upload("thumb.png", png(1000, 1000)).await.unwrap();
		assert!(url.starts_with("memory://uploads/"));
		assert!(url.ends_with("_thumb.jpg"));

		let names = store.names().await;
		assert_eq!(names.len(), 1);
		let stored = store.get(&names[0]).await.unwrap();
		assert_eq!(dimensions(&stored), (800, 800));
	}

	#[tokio::test]
	async fn test_failed_processing_writes_nothing() {
		let store = Arc::new(MemoryObjectStore::new());
		let svc = service(store.clone());

		assert!(svc.upload("x.bmp", b"BM not really".to_vec()).await.is_err());
		assert!(store.names().await.is_empty());
	}
}
