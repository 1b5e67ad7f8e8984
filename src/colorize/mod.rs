//! Field → color → raster image.

pub mod colormap;
pub mod raster;
