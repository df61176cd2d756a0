//! Storage backends and file formats.

pub mod cloud;
pub mod glob;
pub mod parquet;
pub mod storage;
