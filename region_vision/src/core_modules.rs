pub mod annotator;
pub mod dataset;
pub mod preprocess;
pub mod region;
pub mod region_extractor;
pub mod tracker;
