//! Media lookup and image decoding.

/// Image decoding via the `image` crate.
pub mod decode;
/// Media reference to local path resolution.
pub mod resolve;
