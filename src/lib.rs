//! Confidence-gated recyclable / organic image classification.
//!
//! An image goes through [`image_classifier::preprocess`] into a model
//! ([`image_classifier::interface::ImageClassifier`]), its logits are ranked by
//! [`sorter::score`], and [`sorter::decision`] turns the ranking into a
//! [`sorter::decision::Decision`]. [`sorter::main::WasteSorter`] wires the
//! steps together.

pub mod config;
pub mod error;
pub mod image_classifier;
pub mod library;
pub mod sorter;

pub use error::{Error, Result};
