//! # exifmark
//!
//! Batch EXIF watermarking for photographs. Point it at a directory and it
//! writes a copy of every photo with a text strip built from the camera's
//! metadata (model, lens, exposure, date, location), optionally a maker
//! logo, a white margin, a drop shadow, or padding back to the original
//! aspect ratio.
//!
//! # Architecture: Chain + Pool
//!
//! A run has two halves that meet at the [`container::ImageContainer`]:
//!
//! ```text
//! config.toml ─► build_chain ─► ProcessorChain (shared, read-only)
//!                                     │
//! input/ ─► list_images ─► scheduler ─┼─► worker: open → chain → save → close
//!                                     ├─► worker: ...
//!                                     └─► worker: ...      ─► output/
//! ```
//!
//! - The **chain** is built once per run from an immutable [`config::Config`]
//!   snapshot. Its components hold no per-image state, which is what lets
//!   every worker use the same instance without locking.
//! - The **scheduler** keeps at most `max_workers` files in flight, refills
//!   slots as soon as they free up, streams statistics after every state
//!   change, and stops dispatching when cancelled.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`config`] | `exifmark.toml` loading, validation, merging over stock defaults |
//! | [`imaging`] | Codec backend, EXIF extraction, layout geometry, text drawing |
//! | [`container`] | One photo in flight: pixels, EXIF, derived display text |
//! | [`pipeline`] | Chain components, layout registry, chain construction |
//! | [`scan`] | Input directory enumeration |
//! | [`scheduler`] | Bounded worker pool, run statistics, cancellation |
//! | [`types`] | Corner and text-field vocabulary shared by config and pipeline |
//! | [`output`] | CLI output formatting |
//!
//! # Design Decisions
//!
//! ## Per-File Isolation
//!
//! A photo that fails to decode, compose, or encode is reported with its
//! file name and cause, and the run moves on. Only problems that make the
//! whole run meaningless (unreadable input directory, uncreatable output
//! directory) abort, and they do so before any work is dispatched.
//!
//! ## Atomic Output
//!
//! Encoders write into a temp file next to the target and rename it into
//! place, so an interrupted or failed save never leaves a truncated photo
//! in the output directory.
//!
//! ## Pure-Rust Imaging
//!
//! Decoding, compositing and encoding use the `image` and `imageproc`
//! crates; EXIF comes from `kamadak-exif`. No system libraries are needed.

pub mod config;
pub mod container;
pub mod imaging;
pub mod output;
pub mod pipeline;
pub mod scan;
pub mod scheduler;
pub mod types;

#[cfg(test)]
pub(crate) mod test_helpers;
