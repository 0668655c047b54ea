use crate::error::{with_last_error_mut, CloudtrackError, CloudtrackErrorCode, DefaultCloudtrackError};
use cloudtrack_core::SegmentationError;
use std::ffi::CString;

/// Set the thread-local error message and code.
/// Accepts any type implementing `CloudtrackError` trait.
pub(crate) fn set_last_error(error: &impl CloudtrackError) {
    with_last_error_mut(|(cstring, code)| {
        *cstring = CString::new(error.msg()).ok();
        *code = error.code();
    });
}

/// Track an error by setting it in thread-local storage and returning its code.
#[inline]
pub(crate) fn track_error(error: &impl CloudtrackError) -> CloudtrackErrorCode {
    set_last_error(error);
    error.code()
}

/// Record a core library error, if any, and reduce it to its code.
pub(crate) fn track_result<T>(
    result: Result<T, SegmentationError>,
) -> Result<T, CloudtrackErrorCode> {
    result.map_err(|err| track_error(&DefaultCloudtrackError::from(&err)))
}

/// Clear the thread-local error message and code.
/// Called on successful operations.
pub(crate) fn clear_last_error() {
    with_last_error_mut(|(cstring, code)| {
        *cstring = None;
        *code = CloudtrackErrorCode::Ok;
    });
}
