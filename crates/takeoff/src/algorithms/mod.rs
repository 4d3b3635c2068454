pub mod geometry;
pub mod normalize;
pub mod region;
pub mod area;
pub mod assignment;
pub mod decoding;
pub mod preprocessing;
pub mod extraction;
pub mod simplification;

pub use geometry::*;
pub use normalize::*;
pub use region::*;
pub use area::*;
pub use assignment::*;
pub use decoding::decode_mask;
pub use preprocessing::*;
pub use extraction::*;
pub use simplification::*;
