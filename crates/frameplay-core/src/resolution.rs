//! Snapping of requested dimensions onto the supported resolution table.

/// Supported frame dimensions, ascending.
pub const RESOLUTION_TABLE: [u32; 4] = [1080, 1920, 2160, 3480];

/// Returns the smallest table entry that is `>= value`.
///
/// Values above the largest entry have no supported resolution and yield
/// `None`; callers keep whatever dimension they had before.
pub fn normalize(value: u32) -> Option<u32> {
    let idx = RESOLUTION_TABLE.partition_point(|&entry| entry < value);
    RESOLUTION_TABLE.get(idx).copied()
}

/// Returns true if `value` is exactly one of the supported dimensions.
pub fn is_supported(value: u32) -> bool {
    RESOLUTION_TABLE.binary_search(&value).is_ok()
}
