//! `formgen_core` turns a GUI design into C++ source and header files and
//! merges hand edits of the generated source back into the design.
//!
//! ## Pipeline
//!
//! ```text
//! design.json
//!   → Design (flattened, depth-annotated nodes with stable 16-bit ids)
//!   → write_code (static code, then structural code per top-level node)
//!   → CodeWriter (indentation, unique identifiers, once-only declarations,
//!                 C literals, CRC-32 tags closing every generated block)
//!   → editor.cxx / editor.h
//!
//! editor.cxx (edited by hand)
//!   → merge_back (recompute every block checksum, compare with its tag)
//!   → code and callback edits copied into the design
//! ```
//!
//! ## Modules
//!
//! - [`config`]: `formgen.toml` project settings, including i18n.
//! - [`design`]: the JSON design document and its code emission.
//! - [`writer`]: the checksummed body/header writer.
//! - [`merge`]: merge-back of edited blocks.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::path::Path;
//!
//! use formgen_core::Design;
//! use formgen_core::GenerateOptions;
//! use formgen_core::MergeMode;
//! use formgen_core::NoopHost;
//! use formgen_core::ProjectSettings;
//! use formgen_core::merge_back;
//! use formgen_core::write_code;
//!
//! let settings = ProjectSettings::load_or_default(Path::new(".")).unwrap();
//! let mut design = Design::load(&settings.design).unwrap();
//! let source = settings.source_file();
//! let header = settings.header_file();
//!
//! write_code(
//! 	&design,
//! 	&settings,
//! 	Some(Path::new(&source)),
//! 	Some(Path::new(&header)),
//! 	GenerateOptions::default(),
//! )
//! .unwrap();
//!
//! // later, after the source was edited
//! let outcome = merge_back(
//! 	Path::new(&source),
//! 	&mut design,
//! 	&settings,
//! 	MergeMode::Check,
//! 	&mut NoopHost,
//! )
//! .unwrap();
//! println!("{outcome:?}");
//! ```

pub use checksum::*;
pub use config::*;
pub use design::*;
pub use error::*;
pub use escape::*;
pub use generate::*;
pub use ident::*;
pub use merge::*;
pub use node::*;
pub use registry::*;
pub use strings::*;
pub use writer::*;

mod checksum;
pub mod config;
pub mod design;
#[allow(unused_assignments)]
mod error;
mod escape;
mod generate;
mod ident;
pub mod merge;
mod node;
mod registry;
mod strings;
pub mod writer;

#[cfg(test)]
mod __fixtures;
