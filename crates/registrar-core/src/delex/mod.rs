//! Query delexicalization
//!
//! Rewrites a natural-language query into a reusable template plus a plan
//! whose entity values are replaced by placeholders, so that queries that
//! differ only in named entities share one cache key.
//!
//! The pipeline runs in a fixed order:
//!
//! 1. **Lexicon**: known program names, whole-word and case-insensitive.
//! 2. **Pattern**: year levels such as "3rd year" or a bare digit.
//! 3. **Statistical**: person names from a [`NameModel`] loaded at startup.
//!    Without a model this stage is skipped.
//!
//! Running the pipeline over its own output changes nothing.
//!
//! ## Example
//!
//! ```rust,ignore
//! use registrar_core::delex::{Delexicalizer, QueryPlan};
//!
//! let delex = Delexicalizer::standard(["Computer Science"], ["year_level"], None, "name")?;
//! let plan = QueryPlan::new().with("program", "Computer Science");
//! let result = delex.delexicalize("How many Computer Science students are there?", &plan);
//! assert_eq!(result.template, "How many <PROGRAM> students are there?");
//! ```

mod delexicalizer;
mod extractor;
mod lexicon;
mod model;
mod pattern;
mod person;
mod plan;
mod slot;

pub use delexicalizer::Delexicalizer;
pub use extractor::EntityExtractor;
pub use lexicon::LexiconExtractor;
pub use model::{NameModel, NameSpan, load_name_model};
pub use pattern::{DEFAULT_YEAR_KEYS, YearLevelExtractor};
pub use person::{DEFAULT_NAME_KEY_SIGNAL, PersonNameExtractor};
pub use plan::{DelexicalizedResult, QueryPlan};
pub use slot::SlotKind;
