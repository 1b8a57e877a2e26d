//! # Hollowmere Common
//!
//! Common types, utilities, and shared abstractions for Hollowmere.
//!
//! This crate provides foundational types used across all Hollowmere crates:
//! - Coordinate types (world pixels, tile grid)
//! - ID types (EntityId and its allocator)
//! - Version information for save schemas
//! - Common error types
//! - Prelude for convenient imports

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod coords;
pub mod error;
pub mod ids;
pub mod version;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::coords::*;
    pub use crate::error::*;
    pub use crate::ids::*;
    pub use crate::version::*;
}

pub use prelude::*;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tile_coord_conversion() {
        let tile = TileCoord::from_world(glam::Vec2::new(40.0, 17.0));
        assert_eq!(tile, TileCoord::new(2, 1));
        assert_eq!(tile.center(), glam::Vec2::new(40.0, 24.0));
    }

    #[test]
    fn test_entity_id_allocation() {
        let mut ids = IdAllocator::new();
        let id1 = ids.allocate();
        let id2 = ids.allocate();
        assert_ne!(id1, id2);
        assert!(id1.is_valid());
    }

    #[test]
    fn test_version_compatibility() {
        let v1 = SchemaVersion::new(1, 0, 0);
        let v2 = SchemaVersion::new(1, 1, 0);
        let v3 = SchemaVersion::new(2, 0, 0);

        // v2 can read v1 data (newer version reading older data)
        assert!(v2.is_compatible_with(&v1));
        // Different major versions are incompatible
        assert!(!v1.is_compatible_with(&v3));
    }
}
