//! CMR-STAC CLI library.
//!
//! Argument helpers, output formatting and subcommand handlers shared by the
//! `cmr-stac-cli` binary and its integration tests.

pub mod commands;
pub mod input;
pub mod output;

use cmr_stac_lib::Error as LibError;

/// Exit status for requests the caller got wrong.
pub const EXIT_CLIENT_ERROR: u8 = 2;
/// Exit status for every other failure, including invalid documents.
pub const EXIT_FAILURE: u8 = 1;

/// Map a failure to the process exit status. Client errors anywhere in the
/// cause chain win over the outer context.
pub fn exit_code(err: &anyhow::Error) -> u8 {
    let client_error = err
        .chain()
        .filter_map(|cause| cause.downcast_ref::<LibError>())
        .any(LibError::is_client_error);
    if client_error {
        EXIT_CLIENT_ERROR
    } else {
        EXIT_FAILURE
    }
}
