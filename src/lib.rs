mod voxelidx;
pub use voxelidx::VoxelIdx;
mod config;
pub use config::*;
mod lattice;
pub use lattice::Lattice;
mod boxmap;
pub use boxmap::BoxMap;
mod boxset;
pub use boxset::BoxSet;
mod tiling;
pub use tiling::PeriodicLozengeTiling;
mod export;
pub use export::*;
