// src/content/mod.rs
// =============================================================================
// Content processing: bytes in, PageResult out.
//
// Submodules:
// - decode: bytes -> text, degrading instead of failing
// - fingerprint: SHA-256 digest of the raw bytes
// - html: title + link extraction
//
// Everything here is pure per call, so workers can run it concurrently
// without any locking.
// =============================================================================

mod decode;
mod fingerprint;
mod html;

pub use decode::{decode_body, declared_charset, Decoded};
pub use fingerprint::Fingerprint;
pub use html::{process, DiscoveredLink, PageResult, UNTITLED};
