#![deny(clippy::all, warnings)]
#![allow(
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::must_use_candidate
)]

pub mod imports;
pub mod names;
pub mod partition;
pub mod requirements;
pub mod snapshot;

pub use imports::{scan_source, ImportSet, ScanError, ScanErrorKind};
pub use names::{
    find_collisions, hyphenate, AliasError, AliasTable, NameCollision, NameNormalizer,
    BUILTIN_ALIASES,
};
pub use partition::{classify, partition, Bucket, Partition};
pub use requirements::{
    render_requirements, rewrite, ConstraintOp, ConstraintPolicy, RequirementEntry,
    RequirementSets,
};
pub use snapshot::{
    canonical_dist_name, parse_freeze, parse_freeze_line, EnvironmentSnapshot, FreezeLineError,
    FreezeListing, PackageRecord, SkippedLine, FREEZE_SKIP,
};
