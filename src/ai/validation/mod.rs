//! AI Response Validation
//!
//! Turns raw model text into JSON objects. Recovery is limited to fence
//! stripping and object-span extraction; anything else is a
//! `MalformedResponse` for the caller to handle.

mod normalizer;

pub use normalizer::ResponseNormalizer;
