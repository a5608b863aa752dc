// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Layered document generation.
//!
//! Documents, e.g., application pages, are assembled from three ordered
//! kinds of __layer__: core defaults, project overrides, and any number of
//! plugins. Each layer may ship structured __descriptors__ and templates.
//! Generating a document means folding every layer's copy of its descriptor
//! into one merged context, then rendering that context through the right
//! templates.
//!
//! # Pipeline
//!
//! 1. [`path`] discovers plugin layers, and [`layer`] opens them.
//! 2. [`layer::resolve`] folds descriptors across layers with [`merge`].
//! 3. [`document`] composes the merged context into finished text through a
//!    [`render::Renderer`].
//! 4. [`generate`] runs all of the above for every document, and hands the
//!    result to an [`output::OutputSink`] only once everything succeeded.

pub mod config;
pub mod document;
pub mod generate;
pub mod layer;
pub mod merge;
pub mod output;
pub mod path;
pub mod render;
