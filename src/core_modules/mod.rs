pub mod arena;
pub mod blob;
pub mod blob_part;
pub mod error;
pub mod image_view;
pub mod region_detector;
pub(crate) mod region_graph;
pub mod scan_line;
