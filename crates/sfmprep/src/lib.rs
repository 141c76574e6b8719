//! Prepare photogrammetry exports for COLMAP and run reconstruction pipelines.
//!
//! - [`colmap`] converts a RealityCapture `bundle.out` export into a COLMAP text model.
//! - [`pipeline`] runs a list of external programs with templated arguments.

#[doc(inline)]
pub use sfmprep_colmap as colmap;

#[doc(inline)]
pub use sfmprep_pipeline as pipeline;
