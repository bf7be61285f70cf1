//! Extracted image objects.

pub mod image;

pub use image::ImageObject;
