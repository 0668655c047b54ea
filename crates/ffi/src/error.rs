use cloudtrack_core::SegmentationError;
use std::cell::RefCell;
use std::ffi::CString;
use std::os::raw::c_char;
use std::ptr;

/// Common interface for FFI error types.
///
/// # Design
/// - `code()` - Returns the error code to be passed across FFI boundary
/// - `msg()` - Returns the error message for diagnostic purposes
pub(crate) trait CloudtrackError {
    /// Returns the error code to be returned across the FFI boundary.
    fn code(&self) -> CloudtrackErrorCode;

    /// Returns the human-readable error message.
    fn msg(&self) -> &str;
}

/// Default implementation of `CloudtrackError` for errors raised at the boundary
/// or converted from the core library.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct DefaultCloudtrackError {
    code: CloudtrackErrorCode,
    msg: String,
}

impl DefaultCloudtrackError {
    /// Create error for null pointer passed where non-null required.
    ///
    /// # Arguments
    /// * `param_name` - The name of the parameter that was null (e.g., `"field"`, `"out_labels"`)
    pub fn null_pointer(param_name: &str) -> Self {
        Self {
            code: CloudtrackErrorCode::NullPointer,
            msg: format!("Parameter '{param_name}' cannot be null"),
        }
    }

    /// Create error for an unusable argument.
    ///
    /// # Arguments
    /// * `param_name` - The name of the invalid parameter (e.g., `"target"`, `"nx"`)
    /// * `message` - A description of the validation error
    pub fn invalid_argument(param_name: &str, message: &str) -> Self {
        Self {
            code: CloudtrackErrorCode::InvalidArgument,
            msg: format!("Parameter '{param_name}': {message}"),
        }
    }
}

impl From<&SegmentationError> for DefaultCloudtrackError {
    fn from(error: &SegmentationError) -> Self {
        let code = match error {
            SegmentationError::InvalidArgument { .. } => CloudtrackErrorCode::InvalidArgument,
            SegmentationError::OutOfRange { .. } | SegmentationError::FrameOutOfRange { .. } => {
                CloudtrackErrorCode::OutOfRange
            }
            SegmentationError::ShapeMismatch { .. } => CloudtrackErrorCode::ShapeMismatch,
            SegmentationError::SolverFailed { .. } => CloudtrackErrorCode::SolverFailed,
        };
        Self {
            code,
            msg: error.to_string(),
        }
    }
}

impl CloudtrackError for DefaultCloudtrackError {
    fn code(&self) -> CloudtrackErrorCode {
        self.code
    }

    fn msg(&self) -> &str {
        &self.msg
    }
}

/// FFI error codes returned by segmentation functions.
/// Follows standard C convention: 0 = success, non-zero = error.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloudtrackErrorCode {
    /// Operation completed successfully.
    Ok = 0,

    /// Invalid pointer: null pointer passed where non-null required.
    NullPointer = 1,

    /// A parameter, tag or track row was not acceptable.
    InvalidArgument = 2,

    /// A track coordinate fell outside the grid.
    OutOfRange = 3,

    /// Array dimensions do not agree.
    ShapeMismatch = 4,

    /// The random-walker linear solve did not converge.
    SolverFailed = 5,
}

thread_local! {
    /// Thread-local storage for the most recent FFI error (C string, error code).
    /// The CString is stored to keep the pointer handed out by `cloudtrack_get_last_error` alive.
    static LAST_ERROR: RefCell<(Option<CString>, CloudtrackErrorCode)> = const { RefCell::new((None, CloudtrackErrorCode::Ok)) };
}

/// Internal helper to read `LAST_ERROR` thread-local storage (cstring, code).
pub(crate) fn with_last_error<F, R>(f: F) -> R
where
    F: FnOnce(&(Option<CString>, CloudtrackErrorCode)) -> R,
{
    LAST_ERROR.with_borrow(f)
}

/// Internal helper to mutate `LAST_ERROR` thread-local storage (cstring, code).
pub(crate) fn with_last_error_mut<F, R>(f: F) -> R
where
    F: FnOnce(&mut (Option<CString>, CloudtrackErrorCode)) -> R,
{
    LAST_ERROR.with_borrow_mut(f)
}

/// Retrieve the most recent FFI error message as a null-terminated C string.
///
/// Returns:
/// - A borrowed pointer to the error message if the last call on this thread failed.
/// - `null` if the last call succeeded or the message cannot be converted to a C string.
///
/// # Lifetime
/// The returned pointer is valid until the next FFI call on this thread.
///
/// **DO NOT FREE THIS POINTER** - it is managed internally.
///
/// Example:
/// ```c
/// CloudtrackErrorCode err = cloudtrack_segment(field, nt, 0, ny, nx, rows, n, &params, labels);
/// if (err != Ok) {
///     const char* error = cloudtrack_get_last_error();
///     if (error) {
///         fprintf(stderr, "Segmentation failed: %s\n", error);
///     }
/// }
/// ```
#[no_mangle]
pub extern "C" fn cloudtrack_get_last_error() -> *const c_char {
    with_last_error(|(cstring, _code)| cstring.as_ref().map_or(ptr::null(), |cs| cs.as_ptr()))
}

/// Retrieve the most recent FFI error code.
///
/// Returns `CloudtrackErrorCode::Ok` (0) if the last call on this thread succeeded,
/// otherwise the code of the failure.
#[no_mangle]
pub extern "C" fn cloudtrack_get_last_error_code() -> CloudtrackErrorCode {
    with_last_error(|(_cstring, code)| *code)
}
