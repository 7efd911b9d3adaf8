//! The supported binary formats for reading and writing.
//! All the formats except [texture] are sections of a moby model container.

pub mod animation;
pub mod attachment;
pub mod mesh;
pub mod moby;
pub mod skeleton;
pub mod texture;
