//! Process exit codes. Part of the CLI contract.

pub const EXIT_SUCCESS: i32 = 0;
pub const EXIT_VERIFY_FAILED: i32 = 1; // Bundle contents differ from manifest
pub const EXIT_INVALID_INPUT: i32 = 2; // Bad options, layout, or manifest
pub const EXIT_INTERNAL_ERROR: i32 = 3; // I/O or unexpected failure

/// Map an error chain to an exit code.
pub fn for_error(err: &anyhow::Error) -> i32 {
    err.chain()
        .find_map(|e| e.downcast_ref::<mindpack::PackError>())
        .map(|e| e.exit_code())
        .unwrap_or(EXIT_INTERNAL_ERROR)
}
