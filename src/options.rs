//! Decoder configuration.

/// Knobs for [`crate::decode_with`] and [`crate::nex::NexFile::parse_with`].
///
/// Options that affect deferred nodes are copied into those nodes when they
/// are created, so changing them later has no effect on an existing tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodeOptions {
    /// Fold runs of identical full rows in memory dumps into one row.
    pub collapse_repeated_rows: bool,
    /// Longest included-bank list shown as the BANKS value before it is
    /// shortened to `"..."`.
    pub bank_summary_limit: usize,
    /// Compute the CRC-32C of files that declare one and note whether it
    /// matches. Informational only.
    pub verify_checksum: bool,
}

impl Default for DecodeOptions {
    fn default() -> Self {
        Self {
            collapse_repeated_rows: true,
            bank_summary_limit: 15,
            verify_checksum: true,
        }
    }
}
