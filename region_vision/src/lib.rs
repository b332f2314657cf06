// THEORY:
// This file is the entry point for the `region_vision` library crate. It exposes
// the per-frame `RegionPipeline` and the directory-driven `Session` as the
// high-level interface, while the building blocks (extraction, tracking,
// annotation, dataset recording) stay reachable under `core_modules` for
// callers that want to assemble their own loop.

pub mod core_modules;
pub mod pipeline;
pub mod session;
