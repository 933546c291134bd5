#![warn(missing_docs)]

//! Ray casting against triangle meshes.
//!
//! This crate provides the geometry index used by the visibility analyses:
//! a bounding volume hierarchy over a mesh's triangles that answers
//! nearest-hit, any-hit and all-hits queries.
//!
//! # Architecture
//!
//! - [`Ray`] - Ray representation with origin and direction
//! - [`RayHit`] - Intersection result with the hit face
//! - [`Aabb3`] - Axis-aligned bounding boxes
//! - [`triangle`] - Ray-triangle intersection
//! - [`bvh`] - Bounding volume hierarchy for acceleration
//!
//! # Example
//!
//! ```
//! use meshvis_math::{Point3, Vec3};
//! use meshvis_mesh::shapes::cube;
//! use meshvis_raytrace::{Bvh, Ray};
//!
//! let mesh = cube(2.0);
//! let bvh = Bvh::build(&mesh);
//!
//! let ray = Ray::new(Point3::new(-5.0, 0.2, 0.3), Vec3::new(1.0, 0.0, 0.0));
//! let hit = bvh.nearest_hit(&ray, 0.0, None).unwrap();
//! assert!((hit.t - 4.0).abs() < 1e-9);
//! ```

mod aabb;
mod ray;
pub mod bvh;
pub mod triangle;

pub use aabb::Aabb3;
pub use bvh::Bvh;
pub use ray::{Ray, RayHit};
