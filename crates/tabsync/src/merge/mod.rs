//! Record merging under append / update / replace strategies.
//!
//! `update` matches records through an identifier field. Unless one is given
//! explicitly, the first name from [`IDENTIFIER_PRIORITY`] present in the
//! first existing record is used; when none is present the merge appends and
//! reports [`MergeWarning::IdentifierNotFound`].

mod merger;
mod records;
mod strategy;

pub use merger::{merge, MergeOutcome, MergeWarning, RecordMerger};
pub use records::{record_from_object, records_from_value};
pub use strategy::{IDENTIFIER_PRIORITY, MergeOptions, MergeStrategy};
