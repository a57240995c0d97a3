pub mod observation;
pub mod raster;
