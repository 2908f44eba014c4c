//! CLI exit code registry.
//!
//! Single source of truth for all exit codes. Exit codes are part of
//! the shell contract — scripts rely on them.
//!
//! | Code | Meaning                                                   |
//! |------|-----------------------------------------------------------|
//! | 0    | Success                                                   |
//! | 1    | General error (unspecified)                               |
//! | 2    | Usage error (bad arguments; emitted by clap)              |
//! | 3    | Invalid config or override file                           |
//! | 4    | Runtime error (file IO, catalog loading, gateway setup)   |
//! | 5    | Invariant breach in the final registry                    |
//!
//! Dirty source data alone never produces a non-zero exit: quarantined
//! records are reported and persisted, and the run still succeeds.

/// Success - command completed without errors.
pub const EXIT_SUCCESS: u8 = 0;

/// General error - unspecified failure.
/// Avoid using this; prefer a specific error code.
pub const EXIT_ERROR: u8 = 1;

/// Usage error - bad arguments, missing required options.
pub const EXIT_USAGE: u8 = 2;

/// Config or override file failed to parse or validate.
pub const EXIT_INVALID_CONFIG: u8 = 3;

/// Runtime failure: unreadable input file, catalog loading error,
/// gateway construction or artifact writing failure.
pub const EXIT_RUNTIME: u8 = 4;

/// Duplicate canonical keys reached the registry builder. Indicates an
/// engine defect, not dirty data.
pub const EXIT_INVARIANT: u8 = 5;
