//! CLI Exit Code Registry
//!
//! Single source of truth for all `ordercash` exit codes.
//! Exit codes are part of the shell contract; month-end scripts rely on them.
//!
//! | Code | Meaning                                                  |
//! |------|----------------------------------------------------------|
//! | 0    | Success                                                  |
//! | 1    | General error (unspecified)                              |
//! | 2    | Usage error (bad args, unreadable config path)           |
//! | 3    | Invalid config (TOML parse or validation failure)        |
//! | 4    | Input acquisition failure (missing file, bad column/value) |
//! | 5    | Output write failure                                     |
//! | 6    | Empty extract with `--fail-on-empty`                     |

/// Success - command completed without errors.
pub const EXIT_SUCCESS: u8 = 0;

/// General error - unspecified failure.
/// Avoid using this; prefer a specific error code.
pub const EXIT_ERROR: u8 = 1;

/// Usage error - bad arguments, missing required options.
pub const EXIT_USAGE: u8 = 2;

/// Config could not be parsed or failed validation.
pub const EXIT_INVALID_CONFIG: u8 = 3;

/// A source table could not be read or parsed.
pub const EXIT_INPUT: u8 = 4;

/// An output file or directory could not be written.
pub const EXIT_OUTPUT: u8 = 5;

/// The window selected no orders and `--fail-on-empty` was given.
pub const EXIT_EMPTY: u8 = 6;
