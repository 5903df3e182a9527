//! Release coordination
//!
//! Releases run in two phases against an already checked-out package:
//!
//! 1. **prepare** checks the working tree, works out the release tag,
//!    updates the changelog (and optionally pins dependencies in the
//!    manifest) and persists a [`ReleaseIntent`] under the package's
//!    `target/repoman/` directory.
//! 2. **perform** reads the intent back, commits the prepared changes,
//!    creates the annotated tag, pushes it, and tags every dependency listed
//!    in the package manifest with the same tag.
//!
//! Both phases hold an exclusive lock on the package's release directory.
//! Once the tag exists, perform refuses to run again, so a release is never
//! performed twice from the same intent.
//!
//! Tags are `<package>-MM-mm-pp`, e.g. `astro-01-02-04`.

pub mod changelog;
mod coordinator;
mod intent;
mod lock;
mod version;

pub use coordinator::{PrepareRequest, ReleaseCoordinator, ReleaseOutcome};
pub use intent::{IntentId, ReleaseIntent, release_tag};
pub use lock::ReleaseLock;
pub use version::{ReleaseVersion, VersionBump, resolve_next_version};
