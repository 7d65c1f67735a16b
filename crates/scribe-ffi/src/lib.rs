//! # scribe-ffi
//!
//! C ABI bindings for scribe-core.
//!
//! This crate exposes the model/stream session layer to C, C++, and any
//! language that can consume a C library.
//!
//! ## Usage
//!
//! Build the library:
//! ```sh
//! cargo build -p scribe-ffi --release
//! ```
//!
//! The output will be:
//! - macOS: `libscribe_ffi.dylib` (dynamic) and `libscribe_ffi.a` (static)
//! - Linux: `libscribe_ffi.so` (dynamic) and `libscribe_ffi.a` (static)
//! - Windows: `scribe_ffi.dll` (dynamic) and `scribe_ffi.lib` (static)
//!
//! Include the generated C header (`include/scribe.h`) in your C/C++ project.
//!
//! ## Conventions
//!
//! - Every fallible operation reports status as `i32`: `0` (`SCRIBE_OK`) on
//!   success, a non-zero `SCRIBE_ERR_*` code on failure. Factory operations
//!   return a null handle and write the status to an out-parameter.
//! - Strings returned as `*mut c_char` are owned by the caller and must be
//!   released with `scribe_free_string`. Strings returned as `*const c_char`
//!   are borrowed and must NOT be freed.
//! - Result handles own their candidate/token metadata; `scribe_result_free`
//!   releases all of it at once.

#![allow(clippy::missing_safety_doc)]

use std::cell::RefCell;
use std::ffi::{c_char, c_void, CStr, CString};
use std::sync::OnceLock;

use scribe_core::engine::Engine;
use scribe_core::{
    ErrorCode, ModelOptions, ModelSession, ScribeError, StreamSession, TranscriptSet,
};

// ============================================================================
// Status Codes
// ============================================================================

/// Success.
pub const SCRIBE_OK: i32 = 0x0000;
/// Model or scorer artifact missing, unreadable, or incompatible.
pub const SCRIBE_ERR_LOAD: i32 = 0x1000;
/// Out-of-range configuration value.
pub const SCRIBE_ERR_INVALID_PARAMETER: i32 = 0x2000;
/// Scorer configuration failure.
pub const SCRIBE_ERR_SCORER: i32 = 0x3000;
/// Engine-internal decode failure.
pub const SCRIBE_ERR_DECODE: i32 = 0x4000;
/// Operation on a finished stream or closed model.
pub const SCRIBE_ERR_USE_AFTER_FINISH: i32 = 0x5000;

// ============================================================================
// Engine Installation
// ============================================================================
//
// The C surface is engine-agnostic: the embedding application installs one
// backend at startup, before any scribe_* call. Calls made with no engine
// installed fail with SCRIBE_ERR_LOAD.

static ENGINE: OnceLock<Box<dyn Engine>> = OnceLock::new();

/// Install the engine backend used by every subsequent C ABI call.
///
/// Returns `false` if a backend was already installed; the first one wins.
/// This is a Rust-level entry point for the embedding application, not part
/// of the C surface.
pub fn install_engine(engine: Box<dyn Engine>) -> bool {
    ENGINE.set(engine).is_ok()
}

fn engine() -> Option<&'static dyn Engine> {
    ENGINE.get().map(|e| e.as_ref())
}

// ============================================================================
// Opaque Handle Types
// ============================================================================
//
// These opaque handles allow C consumers to hold references to Rust objects
// without knowing their internal structure. Each handle wraps a raw pointer
// to a boxed Rust type.
//
// Safety: Handles must be:
// - Created via the corresponding scribe_* factory functions
// - Freed via the corresponding scribe_*_free functions
// - Not used after being freed
// - Not shared across threads without synchronization

/// Opaque handle to an open model session.
///
/// Created by `scribe_model_new` or `scribe_model_new_with_options` and
/// freed with `scribe_model_free`.
#[repr(C)]
pub struct ScribeModelHandle(*mut c_void);

/// Opaque handle to an in-progress streaming decode.
///
/// Created by `scribe_model_new_stream` and freed with `scribe_stream_free`.
#[repr(C)]
pub struct ScribeStreamHandle(*mut c_void);

/// Opaque handle to a transcription result with candidate/token metadata.
///
/// Created by the `*_with_candidates` functions and freed with
/// `scribe_result_free`.
#[repr(C)]
pub struct ScribeResultHandle(*mut c_void);

/// Model options for `scribe_model_new_with_options`.
///
/// A zeroed struct selects engine defaults throughout.
#[repr(C)]
pub struct ScribeModelOptions {
    /// Decode beam width; `0` keeps the engine default.
    pub beam_width: u32,
    /// Path to an external scorer artifact, or null for none.
    pub scorer_path: *const c_char,
    /// Whether `scorer_alpha`/`scorer_beta` are set.
    pub has_scorer_weights: bool,
    /// Language model weight. Ignored unless `has_scorer_weights`.
    pub scorer_alpha: f32,
    /// Word insertion weight. Ignored unless `has_scorer_weights`.
    pub scorer_beta: f32,
}

/// Type alias for a boxed model session.
pub(crate) type BoxedModel = Box<ModelSession>;

/// Type alias for a boxed stream session.
pub(crate) type BoxedStream = Box<StreamSession>;

/// Type alias for a boxed transcript set.
pub(crate) type BoxedResult = Box<TranscriptSet>;

// ============================================================================
// Handle Conversion Utilities
// ============================================================================
//
// These functions convert between opaque handles and boxed types.
// They are used internally by the C ABI functions.

impl ScribeModelHandle {
    /// Create a handle from a boxed session (takes ownership).
    pub(crate) fn from_boxed(model: BoxedModel) -> *mut Self {
        let ptr = Box::into_raw(model) as *mut c_void;
        Box::into_raw(Box::new(ScribeModelHandle(ptr)))
    }

    /// Convert handle back to boxed session (takes ownership of handle).
    ///
    /// # Safety
    /// The handle must be valid and not already freed.
    pub(crate) unsafe fn into_boxed(handle: *mut Self) -> Option<BoxedModel> {
        if handle.is_null() {
            return None;
        }
        let wrapper = Box::from_raw(handle);
        if wrapper.0.is_null() {
            return None;
        }
        Some(Box::from_raw(wrapper.0 as *mut ModelSession))
    }

    /// Borrow the session from a handle.
    ///
    /// # Safety
    /// The handle must be valid and not already freed.
    pub(crate) unsafe fn as_ref<'a>(handle: *mut Self) -> Option<&'a ModelSession> {
        if handle.is_null() {
            return None;
        }
        let wrapper = &*handle;
        if wrapper.0.is_null() {
            return None;
        }
        Some(&*(wrapper.0 as *const ModelSession))
    }

    /// Mutably borrow the session from a handle.
    ///
    /// # Safety
    /// The handle must be valid and not already freed.
    pub(crate) unsafe fn as_mut<'a>(handle: *mut Self) -> Option<&'a mut ModelSession> {
        if handle.is_null() {
            return None;
        }
        let wrapper = &*handle;
        if wrapper.0.is_null() {
            return None;
        }
        Some(&mut *(wrapper.0 as *mut ModelSession))
    }
}

impl ScribeStreamHandle {
    /// Create a handle from a boxed stream (takes ownership).
    pub(crate) fn from_boxed(stream: BoxedStream) -> *mut Self {
        let ptr = Box::into_raw(stream) as *mut c_void;
        Box::into_raw(Box::new(ScribeStreamHandle(ptr)))
    }

    /// Convert handle back to boxed stream (takes ownership of handle).
    ///
    /// # Safety
    /// The handle must be valid and not already freed.
    pub(crate) unsafe fn into_boxed(handle: *mut Self) -> Option<BoxedStream> {
        if handle.is_null() {
            return None;
        }
        let wrapper = Box::from_raw(handle);
        if wrapper.0.is_null() {
            return None;
        }
        Some(Box::from_raw(wrapper.0 as *mut StreamSession))
    }

    /// Mutably borrow the stream from a handle.
    ///
    /// # Safety
    /// The handle must be valid and not already freed.
    pub(crate) unsafe fn as_mut<'a>(handle: *mut Self) -> Option<&'a mut StreamSession> {
        if handle.is_null() {
            return None;
        }
        let wrapper = &*handle;
        if wrapper.0.is_null() {
            return None;
        }
        Some(&mut *(wrapper.0 as *mut StreamSession))
    }
}

impl ScribeResultHandle {
    /// Create a handle from a boxed transcript set (takes ownership).
    pub(crate) fn from_boxed(result: BoxedResult) -> *mut Self {
        let ptr = Box::into_raw(result) as *mut c_void;
        Box::into_raw(Box::new(ScribeResultHandle(ptr)))
    }

    /// Convert handle back to boxed transcript set (takes ownership of handle).
    ///
    /// # Safety
    /// The handle must be valid and not already freed.
    pub(crate) unsafe fn into_boxed(handle: *mut Self) -> Option<BoxedResult> {
        if handle.is_null() {
            return None;
        }
        let wrapper = Box::from_raw(handle);
        if wrapper.0.is_null() {
            return None;
        }
        Some(Box::from_raw(wrapper.0 as *mut TranscriptSet))
    }

    /// Borrow the transcript set from a handle.
    ///
    /// # Safety
    /// The handle must be valid and not already freed.
    pub(crate) unsafe fn as_ref<'a>(handle: *mut Self) -> Option<&'a TranscriptSet> {
        if handle.is_null() {
            return None;
        }
        let wrapper = &*handle;
        if wrapper.0.is_null() {
            return None;
        }
        Some(&*(wrapper.0 as *const TranscriptSet))
    }
}

/// Library version string.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// ============================================================================
// Thread-Local Error Storage
// ============================================================================
//
// Thread-local storage for the last error message. This allows C consumers
// to retrieve error details after a function returns an error status.

thread_local! {
    /// Set by C ABI functions when an error occurs; retrieved by
    /// `scribe_last_error()`.
    static LAST_ERROR: RefCell<Option<CString>> = const { RefCell::new(None) };
}

/// Set the last error message.
fn set_last_error(message: &str) {
    LAST_ERROR.with(|e| {
        *e.borrow_mut() = CString::new(message).ok();
    });
}

/// Clear the last error message.
fn clear_last_error() {
    LAST_ERROR.with(|e| {
        *e.borrow_mut() = None;
    });
}

/// Record the error and produce its status code.
fn report(err: ScribeError) -> i32 {
    let code = err.code() as i32;
    set_last_error(&err.to_string());
    code
}

/// Write a status code through an optional out-parameter.
unsafe fn write_status(status: *mut i32, code: i32) {
    if !status.is_null() {
        *status = code;
    }
}

/// Convert a C string argument, naming the parameter in the error message.
unsafe fn c_str_arg(ptr: *const c_char, name: &str) -> Result<String, String> {
    if ptr.is_null() {
        return Err(format!("{name} is null"));
    }
    match CStr::from_ptr(ptr).to_str() {
        Ok(s) => Ok(s.to_string()),
        Err(_) => Err(format!("{name} is not valid UTF-8")),
    }
}

/// Reassemble an audio slice from raw parts. Null with non-zero length is an
/// error; null with zero length is an empty slice.
unsafe fn audio_arg<'a>(audio: *const i16, len: usize) -> Result<&'a [i16], String> {
    if len == 0 {
        return Ok(&[]);
    }
    if audio.is_null() {
        return Err("audio is null but len is non-zero".to_string());
    }
    Ok(std::slice::from_raw_parts(audio, len))
}

// ============================================================================
// C ABI Utility Functions
// ============================================================================

/// Get the engine version string.
///
/// Returns a pointer to a null-terminated string that the caller must free
/// with `scribe_free_string()`. Returns the library's own version if no
/// engine backend is installed.
///
/// # Example (C)
///
/// ```c
/// char* version = scribe_version();
/// printf("scribe: %s\n", version);
/// scribe_free_string(version);
/// ```
#[no_mangle]
pub extern "C" fn scribe_version() -> *mut c_char {
    let version = match engine() {
        Some(e) => e.version(),
        None => VERSION.to_string(),
    };
    match CString::new(version) {
        Ok(cstr) => cstr.into_raw(),
        Err(_) => std::ptr::null_mut(),
    }
}

/// Get the human-readable message for a status code.
///
/// Returns a pointer to a null-terminated string that the caller must free
/// with `scribe_free_string()`. Unknown codes produce a generic message
/// rather than null.
///
/// # Example (C)
///
/// ```c
/// int32_t status;
/// ScribeModelHandle* model = scribe_model_new("model.bin", &status);
/// if (model == NULL) {
///     char* msg = scribe_error_message(status);
///     fprintf(stderr, "open failed: %s\n", msg);
///     scribe_free_string(msg);
/// }
/// ```
#[no_mangle]
pub extern "C" fn scribe_error_message(status: i32) -> *mut c_char {
    let message = match ErrorCode::from_i32(status) {
        Some(code) => code.message(),
        None => "unknown error code",
    };
    match CString::new(message) {
        Ok(cstr) => cstr.into_raw(),
        Err(_) => std::ptr::null_mut(),
    }
}

/// Get the last error message on this thread.
///
/// Returns a borrowed pointer valid until the next scribe function call on
/// the same thread, or null if no error has occurred. Do NOT free it.
#[no_mangle]
pub extern "C" fn scribe_last_error() -> *const c_char {
    LAST_ERROR.with(|e| match e.borrow().as_ref() {
        Some(cstr) => cstr.as_ptr(),
        None => std::ptr::null(),
    })
}

/// Free a string allocated by the library.
///
/// Use this for every `*mut c_char` the library returns. Do NOT use it on
/// the borrowed pointer from `scribe_last_error()`.
///
/// # Safety
///
/// The pointer must be a string previously returned by a scribe function,
/// or null. Passing any other pointer causes undefined behavior.
#[no_mangle]
pub unsafe extern "C" fn scribe_free_string(s: *mut c_char) {
    if !s.is_null() {
        let _ = CString::from_raw(s);
    }
}

// ============================================================================
// C ABI Model Functions
// ============================================================================

/// Open a model with engine-default configuration.
///
/// # Parameters
///
/// - `model_path`: Null-terminated path to the model artifact.
/// - `status`: Out-parameter for the status code. May be null.
///
/// # Returns
///
/// A model handle, or null on failure with `status` set and
/// `scribe_last_error()` populated. Free with `scribe_model_free`.
///
/// # Example (C)
///
/// ```c
/// int32_t status;
/// ScribeModelHandle* model = scribe_model_new("model.bin", &status);
/// if (model == NULL) {
///     fprintf(stderr, "failed: %s\n", scribe_last_error());
///     return 1;
/// }
/// // Use model...
/// scribe_model_free(model);
/// ```
#[no_mangle]
pub unsafe extern "C" fn scribe_model_new(
    model_path: *const c_char,
    status: *mut i32,
) -> *mut ScribeModelHandle {
    scribe_model_new_with_options(model_path, std::ptr::null(), status)
}

/// Open a model with explicit options.
///
/// # Parameters
///
/// - `model_path`: Null-terminated path to the model artifact.
/// - `options`: Options struct, or null for engine defaults throughout.
/// - `status`: Out-parameter for the status code. May be null.
///
/// # Returns
///
/// A model handle, or null on failure. No partially configured model
/// survives a failed open. Free with `scribe_model_free`.
#[no_mangle]
pub unsafe extern "C" fn scribe_model_new_with_options(
    model_path: *const c_char,
    options: *const ScribeModelOptions,
    status: *mut i32,
) -> *mut ScribeModelHandle {
    clear_last_error();

    let path = match c_str_arg(model_path, "model_path") {
        Ok(p) => p,
        Err(msg) => {
            set_last_error(&msg);
            write_status(status, SCRIBE_ERR_INVALID_PARAMETER);
            return std::ptr::null_mut();
        }
    };

    let mut opts = ModelOptions::new();
    if !options.is_null() {
        let raw = &*options;
        if raw.beam_width != 0 {
            opts.beam_width = Some(raw.beam_width);
        }
        if !raw.scorer_path.is_null() {
            match c_str_arg(raw.scorer_path, "scorer_path") {
                Ok(p) => opts.scorer_path = Some(p),
                Err(msg) => {
                    set_last_error(&msg);
                    write_status(status, SCRIBE_ERR_INVALID_PARAMETER);
                    return std::ptr::null_mut();
                }
            }
        }
        if raw.has_scorer_weights {
            opts.scorer_weights = Some((raw.scorer_alpha, raw.scorer_beta));
        }
    }

    let backend = match engine() {
        Some(e) => e,
        None => {
            set_last_error("no engine backend installed");
            write_status(status, SCRIBE_ERR_LOAD);
            return std::ptr::null_mut();
        }
    };

    match ModelSession::open_with(backend, &path, &opts) {
        Ok(session) => {
            write_status(status, SCRIBE_OK);
            ScribeModelHandle::from_boxed(Box::new(session))
        }
        Err(e) => {
            write_status(status, report(e));
            std::ptr::null_mut()
        }
    }
}

/// Get the model's current decode beam width.
///
/// # Returns
///
/// `SCRIBE_OK` with the width written to `out_beam_width`, or an error code.
#[no_mangle]
pub unsafe extern "C" fn scribe_model_beam_width(
    handle: *mut ScribeModelHandle,
    out_beam_width: *mut u32,
) -> i32 {
    clear_last_error();

    let session = match ScribeModelHandle::as_ref(handle) {
        Some(s) => s,
        None => {
            set_last_error("model handle is null");
            return SCRIBE_ERR_INVALID_PARAMETER;
        }
    };
    if out_beam_width.is_null() {
        set_last_error("out_beam_width is null");
        return SCRIBE_ERR_INVALID_PARAMETER;
    }

    match session.beam_width() {
        Ok(width) => {
            *out_beam_width = width;
            SCRIBE_OK
        }
        Err(e) => report(e),
    }
}

/// Set the model's decode beam width. Zero is rejected.
///
/// Applies to decodes and streams started after this call.
#[no_mangle]
pub unsafe extern "C" fn scribe_model_set_beam_width(
    handle: *mut ScribeModelHandle,
    beam_width: u32,
) -> i32 {
    clear_last_error();

    let session = match ScribeModelHandle::as_mut(handle) {
        Some(s) => s,
        None => {
            set_last_error("model handle is null");
            return SCRIBE_ERR_INVALID_PARAMETER;
        }
    };

    match session.set_beam_width(beam_width) {
        Ok(()) => SCRIBE_OK,
        Err(e) => report(e),
    }
}

/// Get the sample rate (Hz) the model expects its input audio in.
#[no_mangle]
pub unsafe extern "C" fn scribe_model_sample_rate(
    handle: *mut ScribeModelHandle,
    out_sample_rate: *mut u32,
) -> i32 {
    clear_last_error();

    let session = match ScribeModelHandle::as_ref(handle) {
        Some(s) => s,
        None => {
            set_last_error("model handle is null");
            return SCRIBE_ERR_INVALID_PARAMETER;
        }
    };
    if out_sample_rate.is_null() {
        set_last_error("out_sample_rate is null");
        return SCRIBE_ERR_INVALID_PARAMETER;
    }

    match session.sample_rate() {
        Ok(rate) => {
            *out_sample_rate = rate;
            SCRIBE_OK
        }
        Err(e) => report(e),
    }
}

/// Enable an external scorer from the given artifact path.
#[no_mangle]
pub unsafe extern "C" fn scribe_model_enable_scorer(
    handle: *mut ScribeModelHandle,
    scorer_path: *const c_char,
) -> i32 {
    clear_last_error();

    let session = match ScribeModelHandle::as_mut(handle) {
        Some(s) => s,
        None => {
            set_last_error("model handle is null");
            return SCRIBE_ERR_INVALID_PARAMETER;
        }
    };
    let path = match c_str_arg(scorer_path, "scorer_path") {
        Ok(p) => p,
        Err(msg) => {
            set_last_error(&msg);
            return SCRIBE_ERR_INVALID_PARAMETER;
        }
    };

    match session.enable_scorer(&path) {
        Ok(()) => SCRIBE_OK,
        Err(e) => report(e),
    }
}

/// Disable the external scorer.
#[no_mangle]
pub unsafe extern "C" fn scribe_model_disable_scorer(handle: *mut ScribeModelHandle) -> i32 {
    clear_last_error();

    let session = match ScribeModelHandle::as_mut(handle) {
        Some(s) => s,
        None => {
            set_last_error("model handle is null");
            return SCRIBE_ERR_INVALID_PARAMETER;
        }
    };

    match session.disable_scorer() {
        Ok(()) => SCRIBE_OK,
        Err(e) => report(e),
    }
}

/// Set scorer weights (language model weight alpha, word insertion weight
/// beta). Fails unless a scorer is enabled.
#[no_mangle]
pub unsafe extern "C" fn scribe_model_set_scorer_weights(
    handle: *mut ScribeModelHandle,
    alpha: f32,
    beta: f32,
) -> i32 {
    clear_last_error();

    let session = match ScribeModelHandle::as_mut(handle) {
        Some(s) => s,
        None => {
            set_last_error("model handle is null");
            return SCRIBE_ERR_INVALID_PARAMETER;
        }
    };

    match session.set_scorer_weights(alpha, beta) {
        Ok(()) => SCRIBE_OK,
        Err(e) => report(e),
    }
}

/// One-shot transcription of a complete buffer.
///
/// # Parameters
///
/// - `handle`: Model handle.
/// - `audio`: Signed 16-bit samples at the model's sample rate. May be null
///   if `len` is 0.
/// - `len`: Number of samples.
///
/// # Returns
///
/// The best transcript as a string the caller must free with
/// `scribe_free_string()`, or null on failure with `scribe_last_error()`
/// populated. The model stays open either way.
///
/// # Example (C)
///
/// ```c
/// char* text = scribe_model_transcribe(model, samples, num_samples);
/// if (text == NULL) {
///     fprintf(stderr, "failed: %s\n", scribe_last_error());
/// } else {
///     printf("%s\n", text);
///     scribe_free_string(text);
/// }
/// ```
#[no_mangle]
pub unsafe extern "C" fn scribe_model_transcribe(
    handle: *mut ScribeModelHandle,
    audio: *const i16,
    len: usize,
) -> *mut c_char {
    clear_last_error();

    let session = match ScribeModelHandle::as_ref(handle) {
        Some(s) => s,
        None => {
            set_last_error("model handle is null");
            return std::ptr::null_mut();
        }
    };
    let samples = match audio_arg(audio, len) {
        Ok(s) => s,
        Err(msg) => {
            set_last_error(&msg);
            return std::ptr::null_mut();
        }
    };

    match session.transcribe(samples) {
        Ok(text) => match CString::new(text) {
            Ok(cstr) => cstr.into_raw(),
            Err(_) => {
                set_last_error("transcript contains null bytes");
                std::ptr::null_mut()
            }
        },
        Err(e) => {
            report(e);
            std::ptr::null_mut()
        }
    }
}

/// One-shot transcription with candidate and token metadata.
///
/// `num_candidates` bounds how many alternates are produced; `0` means the
/// engine default. The result handle must be freed with
/// `scribe_result_free`; freeing it releases every candidate and token in
/// one call.
#[no_mangle]
pub unsafe extern "C" fn scribe_model_transcribe_with_candidates(
    handle: *mut ScribeModelHandle,
    audio: *const i16,
    len: usize,
    num_candidates: u32,
    status: *mut i32,
) -> *mut ScribeResultHandle {
    clear_last_error();

    let session = match ScribeModelHandle::as_ref(handle) {
        Some(s) => s,
        None => {
            set_last_error("model handle is null");
            write_status(status, SCRIBE_ERR_INVALID_PARAMETER);
            return std::ptr::null_mut();
        }
    };
    let samples = match audio_arg(audio, len) {
        Ok(s) => s,
        Err(msg) => {
            set_last_error(&msg);
            write_status(status, SCRIBE_ERR_INVALID_PARAMETER);
            return std::ptr::null_mut();
        }
    };

    match session.transcribe_with_candidates(samples, num_candidates) {
        Ok(set) => {
            write_status(status, SCRIBE_OK);
            ScribeResultHandle::from_boxed(Box::new(set))
        }
        Err(e) => {
            write_status(status, report(e));
            std::ptr::null_mut()
        }
    }
}

/// Start an incremental decode with the model's current configuration.
///
/// The stream is independent of later configuration changes and of other
/// streams. Free the returned handle with `scribe_stream_free` after
/// finishing or discarding it.
#[no_mangle]
pub unsafe extern "C" fn scribe_model_new_stream(
    handle: *mut ScribeModelHandle,
    status: *mut i32,
) -> *mut ScribeStreamHandle {
    clear_last_error();

    let session = match ScribeModelHandle::as_ref(handle) {
        Some(s) => s,
        None => {
            set_last_error("model handle is null");
            write_status(status, SCRIBE_ERR_INVALID_PARAMETER);
            return std::ptr::null_mut();
        }
    };

    match session.new_stream() {
        Ok(stream) => {
            write_status(status, SCRIBE_OK);
            ScribeStreamHandle::from_boxed(Box::new(stream))
        }
        Err(e) => {
            write_status(status, report(e));
            std::ptr::null_mut()
        }
    }
}

/// Close the model.
///
/// The handle stays allocated so later calls fail cleanly with
/// `SCRIBE_ERR_USE_AFTER_FINISH` instead of dereferencing freed state; a
/// second close fails the same way. Call `scribe_model_free` to release the
/// handle itself.
#[no_mangle]
pub unsafe extern "C" fn scribe_model_close(handle: *mut ScribeModelHandle) -> i32 {
    clear_last_error();

    let session = match ScribeModelHandle::as_mut(handle) {
        Some(s) => s,
        None => {
            set_last_error("model handle is null");
            return SCRIBE_ERR_INVALID_PARAMETER;
        }
    };

    match session.close() {
        Ok(()) => SCRIBE_OK,
        Err(e) => report(e),
    }
}

/// Free a model handle.
///
/// Releases the model if it is still open. After this call the handle is no
/// longer valid. May be passed null (no-op).
#[no_mangle]
pub unsafe extern "C" fn scribe_model_free(handle: *mut ScribeModelHandle) {
    if !handle.is_null() {
        let _ = ScribeModelHandle::into_boxed(handle);
    }
}

// ============================================================================
// C ABI Stream Functions
// ============================================================================

/// Append audio samples to a stream. Any chunk size is accepted, including
/// zero.
#[no_mangle]
pub unsafe extern "C" fn scribe_stream_feed(
    handle: *mut ScribeStreamHandle,
    audio: *const i16,
    len: usize,
) -> i32 {
    clear_last_error();

    let stream = match ScribeStreamHandle::as_mut(handle) {
        Some(s) => s,
        None => {
            set_last_error("stream handle is null");
            return SCRIBE_ERR_INVALID_PARAMETER;
        }
    };
    let samples = match audio_arg(audio, len) {
        Ok(s) => s,
        Err(msg) => {
            set_last_error(&msg);
            return SCRIBE_ERR_INVALID_PARAMETER;
        }
    };

    match stream.feed(samples) {
        Ok(()) => SCRIBE_OK,
        Err(e) => report(e),
    }
}

/// Decode everything fed so far and return the best text.
///
/// Non-destructive: the stream stays live. The returned string must be
/// freed with `scribe_free_string()`; null means failure.
#[no_mangle]
pub unsafe extern "C" fn scribe_stream_intermediate(handle: *mut ScribeStreamHandle) -> *mut c_char {
    clear_last_error();

    let stream = match ScribeStreamHandle::as_mut(handle) {
        Some(s) => s,
        None => {
            set_last_error("stream handle is null");
            return std::ptr::null_mut();
        }
    };

    match stream.intermediate() {
        Ok(text) => match CString::new(text) {
            Ok(cstr) => cstr.into_raw(),
            Err(_) => {
                set_last_error("transcript contains null bytes");
                std::ptr::null_mut()
            }
        },
        Err(e) => {
            report(e);
            std::ptr::null_mut()
        }
    }
}

/// Like `scribe_stream_intermediate` but returns candidate/token metadata.
/// `num_candidates` of `0` means the engine default.
#[no_mangle]
pub unsafe extern "C" fn scribe_stream_intermediate_with_candidates(
    handle: *mut ScribeStreamHandle,
    num_candidates: u32,
    status: *mut i32,
) -> *mut ScribeResultHandle {
    clear_last_error();

    let stream = match ScribeStreamHandle::as_mut(handle) {
        Some(s) => s,
        None => {
            set_last_error("stream handle is null");
            write_status(status, SCRIBE_ERR_INVALID_PARAMETER);
            return std::ptr::null_mut();
        }
    };

    match stream.intermediate_with_candidates(num_candidates) {
        Ok(set) => {
            write_status(status, SCRIBE_OK);
            ScribeResultHandle::from_boxed(Box::new(set))
        }
        Err(e) => {
            write_status(status, report(e));
            std::ptr::null_mut()
        }
    }
}

/// Complete the decode and return the final best text.
///
/// Terminal: every later call on this stream fails with
/// `SCRIBE_ERR_USE_AFTER_FINISH`, even if this call itself failed. The
/// handle must still be released with `scribe_stream_free`. The returned
/// string must be freed with `scribe_free_string()`.
#[no_mangle]
pub unsafe extern "C" fn scribe_stream_finish(handle: *mut ScribeStreamHandle) -> *mut c_char {
    clear_last_error();

    let stream = match ScribeStreamHandle::as_mut(handle) {
        Some(s) => s,
        None => {
            set_last_error("stream handle is null");
            return std::ptr::null_mut();
        }
    };

    match stream.finish() {
        Ok(text) => match CString::new(text) {
            Ok(cstr) => cstr.into_raw(),
            Err(_) => {
                set_last_error("transcript contains null bytes");
                std::ptr::null_mut()
            }
        },
        Err(e) => {
            report(e);
            std::ptr::null_mut()
        }
    }
}

/// Like `scribe_stream_finish` but returns candidate/token metadata.
/// Terminal.
#[no_mangle]
pub unsafe extern "C" fn scribe_stream_finish_with_candidates(
    handle: *mut ScribeStreamHandle,
    num_candidates: u32,
    status: *mut i32,
) -> *mut ScribeResultHandle {
    clear_last_error();

    let stream = match ScribeStreamHandle::as_mut(handle) {
        Some(s) => s,
        None => {
            set_last_error("stream handle is null");
            write_status(status, SCRIBE_ERR_INVALID_PARAMETER);
            return std::ptr::null_mut();
        }
    };

    match stream.finish_with_candidates(num_candidates) {
        Ok(set) => {
            write_status(status, SCRIBE_OK);
            ScribeResultHandle::from_boxed(Box::new(set))
        }
        Err(e) => {
            write_status(status, report(e));
            std::ptr::null_mut()
        }
    }
}

/// Abandon a stream without producing a transcript. Terminal.
///
/// The handle must still be released with `scribe_stream_free`.
#[no_mangle]
pub unsafe extern "C" fn scribe_stream_discard(handle: *mut ScribeStreamHandle) -> i32 {
    clear_last_error();

    let stream = match ScribeStreamHandle::as_mut(handle) {
        Some(s) => s,
        None => {
            set_last_error("stream handle is null");
            return SCRIBE_ERR_INVALID_PARAMETER;
        }
    };

    match stream.discard() {
        Ok(()) => SCRIBE_OK,
        Err(e) => report(e),
    }
}

/// Free a stream handle.
///
/// Discards the stream if it is still live. After this call the handle is
/// no longer valid. May be passed null (no-op).
#[no_mangle]
pub unsafe extern "C" fn scribe_stream_free(handle: *mut ScribeStreamHandle) {
    if !handle.is_null() {
        let _ = ScribeStreamHandle::into_boxed(handle);
    }
}

// ============================================================================
// C ABI Result Functions
// ============================================================================
//
// Result handles are read-only snapshots; every accessor borrows from the
// handle, and scribe_result_free releases the whole candidate/token tree.

/// Number of candidates in a result. Returns 0 for a null/invalid handle.
#[no_mangle]
pub unsafe extern "C" fn scribe_result_num_candidates(handle: *mut ScribeResultHandle) -> u32 {
    match ScribeResultHandle::as_ref(handle) {
        Some(set) => set.candidates.len() as u32,
        None => 0,
    }
}

/// Full text of one candidate.
///
/// The caller must free the returned string with `scribe_free_string()`.
/// Returns null if the handle or index is invalid.
#[no_mangle]
pub unsafe extern "C" fn scribe_result_text(
    handle: *mut ScribeResultHandle,
    candidate: u32,
) -> *mut c_char {
    clear_last_error();

    let set = match ScribeResultHandle::as_ref(handle) {
        Some(s) => s,
        None => {
            set_last_error("result handle is null");
            return std::ptr::null_mut();
        }
    };
    let transcript = match set.candidates.get(candidate as usize) {
        Some(t) => t,
        None => {
            set_last_error("candidate index out of range");
            return std::ptr::null_mut();
        }
    };

    match CString::new(transcript.text()) {
        Ok(cstr) => cstr.into_raw(),
        Err(_) => {
            set_last_error("transcript contains null bytes");
            std::ptr::null_mut()
        }
    }
}

/// Text of the best candidate, or an empty string if there are none.
///
/// The caller must free the returned string with `scribe_free_string()`.
/// Returns null only for a null/invalid handle.
#[no_mangle]
pub unsafe extern "C" fn scribe_result_best_text(handle: *mut ScribeResultHandle) -> *mut c_char {
    clear_last_error();

    let set = match ScribeResultHandle::as_ref(handle) {
        Some(s) => s,
        None => {
            set_last_error("result handle is null");
            return std::ptr::null_mut();
        }
    };

    match CString::new(set.best_text()) {
        Ok(cstr) => cstr.into_raw(),
        Err(_) => {
            set_last_error("transcript contains null bytes");
            std::ptr::null_mut()
        }
    }
}

/// Confidence of one candidate. Returns 0.0 for an invalid handle or index.
#[no_mangle]
pub unsafe extern "C" fn scribe_result_confidence(
    handle: *mut ScribeResultHandle,
    candidate: u32,
) -> f64 {
    match ScribeResultHandle::as_ref(handle) {
        Some(set) => set
            .candidates
            .get(candidate as usize)
            .map(|t| t.confidence)
            .unwrap_or(0.0),
        None => 0.0,
    }
}

/// Number of tokens in one candidate. Returns 0 for an invalid handle or
/// index.
#[no_mangle]
pub unsafe extern "C" fn scribe_result_num_tokens(
    handle: *mut ScribeResultHandle,
    candidate: u32,
) -> u32 {
    match ScribeResultHandle::as_ref(handle) {
        Some(set) => set
            .candidates
            .get(candidate as usize)
            .map(|t| t.tokens.len() as u32)
            .unwrap_or(0),
        None => 0,
    }
}

/// Text of one token. The caller must free the returned string with
/// `scribe_free_string()`. Returns null if any index is invalid.
#[no_mangle]
pub unsafe extern "C" fn scribe_result_token_text(
    handle: *mut ScribeResultHandle,
    candidate: u32,
    token: u32,
) -> *mut c_char {
    clear_last_error();

    let set = match ScribeResultHandle::as_ref(handle) {
        Some(s) => s,
        None => {
            set_last_error("result handle is null");
            return std::ptr::null_mut();
        }
    };
    let tok = match set
        .candidates
        .get(candidate as usize)
        .and_then(|t| t.tokens.get(token as usize))
    {
        Some(tok) => tok,
        None => {
            set_last_error("token index out of range");
            return std::ptr::null_mut();
        }
    };

    match CString::new(tok.text.as_str()) {
        Ok(cstr) => cstr.into_raw(),
        Err(_) => {
            set_last_error("token contains null bytes");
            std::ptr::null_mut()
        }
    }
}

/// Engine timestep of one token. Returns 0 if any index is invalid.
#[no_mangle]
pub unsafe extern "C" fn scribe_result_token_timestep(
    handle: *mut ScribeResultHandle,
    candidate: u32,
    token: u32,
) -> u32 {
    ScribeResultHandle::as_ref(handle)
        .and_then(|set| set.candidates.get(candidate as usize))
        .and_then(|t| t.tokens.get(token as usize))
        .map(|tok| tok.timestep)
        .unwrap_or(0)
}

/// Start time in seconds of one token. Returns 0.0 if any index is invalid.
#[no_mangle]
pub unsafe extern "C" fn scribe_result_token_start_time(
    handle: *mut ScribeResultHandle,
    candidate: u32,
    token: u32,
) -> f32 {
    ScribeResultHandle::as_ref(handle)
        .and_then(|set| set.candidates.get(candidate as usize))
        .and_then(|t| t.tokens.get(token as usize))
        .map(|tok| tok.start_time)
        .unwrap_or(0.0)
}

/// Free a result handle and every candidate and token it owns.
///
/// May be passed null (no-op). Strings previously returned by the accessors
/// are independent copies and are unaffected.
#[no_mangle]
pub unsafe extern "C" fn scribe_result_free(handle: *mut ScribeResultHandle) {
    if !handle.is_null() {
        let _ = ScribeResultHandle::into_boxed(handle);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scribe_core::engine::fake::{burst_audio, FakeEngine};
    use std::io::Write;
    use tempfile::NamedTempFile;

    /// Install the fake backend once for the whole test binary.
    fn ensure_engine() {
        let _ = install_engine(Box::new(FakeEngine::new()));
    }

    fn artifact() -> NamedTempFile {
        let mut f = NamedTempFile::new().unwrap();
        f.write_all(b"weights").unwrap();
        f
    }

    fn c_path(file: &NamedTempFile) -> CString {
        CString::new(file.path().to_str().unwrap()).unwrap()
    }

    unsafe fn take_string(ptr: *mut c_char) -> String {
        assert!(!ptr.is_null());
        let s = CStr::from_ptr(ptr).to_str().unwrap().to_string();
        scribe_free_string(ptr);
        s
    }

    #[test]
    fn test_version_and_error_message() {
        ensure_engine();
        unsafe {
            let version = take_string(scribe_version());
            assert!(!version.is_empty());

            let msg = take_string(scribe_error_message(SCRIBE_ERR_USE_AFTER_FINISH));
            assert!(msg.contains("finished"));

            let unknown = take_string(scribe_error_message(0x7777));
            assert_eq!(unknown, "unknown error code");
        }
    }

    #[test]
    fn test_model_open_failure_sets_status_and_error() {
        ensure_engine();
        unsafe {
            let path = CString::new("/no/such/model.bin").unwrap();
            let mut status = SCRIBE_OK;
            let model = scribe_model_new(path.as_ptr(), &mut status);
            assert!(model.is_null());
            assert_eq!(status, SCRIBE_ERR_LOAD);
            assert!(!scribe_last_error().is_null());
        }
    }

    #[test]
    fn test_null_path_is_invalid_parameter() {
        ensure_engine();
        unsafe {
            let mut status = SCRIBE_OK;
            let model = scribe_model_new(std::ptr::null(), &mut status);
            assert!(model.is_null());
            assert_eq!(status, SCRIBE_ERR_INVALID_PARAMETER);
        }
    }

    #[test]
    fn test_transcribe_round_trip() {
        ensure_engine();
        let file = artifact();
        unsafe {
            let mut status = -1;
            let model = scribe_model_new(c_path(&file).as_ptr(), &mut status);
            assert_eq!(status, SCRIBE_OK);
            assert!(!model.is_null());

            let audio = burst_audio(2);
            let text = take_string(scribe_model_transcribe(model, audio.as_ptr(), audio.len()));
            assert_eq!(text, "the quick");

            scribe_model_free(model);
        }
    }

    #[test]
    fn test_options_struct_applies_at_open() {
        ensure_engine();
        let file = artifact();
        let scorer = artifact();
        let scorer_path = c_path(&scorer);
        unsafe {
            let opts = ScribeModelOptions {
                beam_width: 128,
                scorer_path: scorer_path.as_ptr(),
                has_scorer_weights: true,
                scorer_alpha: 0.75,
                scorer_beta: 1.85,
            };
            let mut status = -1;
            let model =
                scribe_model_new_with_options(c_path(&file).as_ptr(), &opts, &mut status);
            assert_eq!(status, SCRIBE_OK);

            let mut beam = 0u32;
            assert_eq!(scribe_model_beam_width(model, &mut beam), SCRIBE_OK);
            assert_eq!(beam, 128);

            scribe_model_free(model);
        }
    }

    #[test]
    fn test_config_mutators_and_validation() {
        ensure_engine();
        let file = artifact();
        unsafe {
            let mut status = -1;
            let model = scribe_model_new(c_path(&file).as_ptr(), &mut status);

            assert_eq!(scribe_model_set_beam_width(model, 64), SCRIBE_OK);
            assert_eq!(
                scribe_model_set_beam_width(model, 0),
                SCRIBE_ERR_INVALID_PARAMETER
            );
            assert_eq!(
                scribe_model_set_scorer_weights(model, 0.5, 0.5),
                SCRIBE_ERR_SCORER
            );

            let mut rate = 0u32;
            assert_eq!(scribe_model_sample_rate(model, &mut rate), SCRIBE_OK);
            assert_eq!(rate, 16_000);

            scribe_model_free(model);
        }
    }

    #[test]
    fn test_close_then_use_fails_cleanly() {
        ensure_engine();
        let file = artifact();
        unsafe {
            let mut status = -1;
            let model = scribe_model_new(c_path(&file).as_ptr(), &mut status);

            assert_eq!(scribe_model_close(model), SCRIBE_OK);
            assert_eq!(scribe_model_close(model), SCRIBE_ERR_USE_AFTER_FINISH);

            let text = scribe_model_transcribe(model, std::ptr::null(), 0);
            assert!(text.is_null());

            let mut stream_status = SCRIBE_OK;
            let stream = scribe_model_new_stream(model, &mut stream_status);
            assert!(stream.is_null());
            assert_eq!(stream_status, SCRIBE_ERR_USE_AFTER_FINISH);

            scribe_model_free(model);
        }
    }

    #[test]
    fn test_stream_lifecycle() {
        ensure_engine();
        let file = artifact();
        unsafe {
            let mut status = -1;
            let model = scribe_model_new(c_path(&file).as_ptr(), &mut status);
            let stream = scribe_model_new_stream(model, &mut status);
            assert_eq!(status, SCRIBE_OK);

            let audio = burst_audio(2);
            for chunk in audio.chunks(700) {
                assert_eq!(
                    scribe_stream_feed(stream, chunk.as_ptr(), chunk.len()),
                    SCRIBE_OK
                );
            }

            let partial = take_string(scribe_stream_intermediate(stream));
            assert_eq!(partial, "the quick");

            let final_text = take_string(scribe_stream_finish(stream));
            assert_eq!(final_text, "the quick");

            // Terminal: every later call fails.
            assert_eq!(
                scribe_stream_feed(stream, std::ptr::null(), 0),
                SCRIBE_ERR_USE_AFTER_FINISH
            );
            assert!(scribe_stream_intermediate(stream).is_null());
            assert_eq!(scribe_stream_discard(stream), SCRIBE_ERR_USE_AFTER_FINISH);

            scribe_stream_free(stream);
            scribe_model_free(model);
        }
    }

    #[test]
    fn test_discard_is_terminal() {
        ensure_engine();
        let file = artifact();
        unsafe {
            let mut status = -1;
            let model = scribe_model_new(c_path(&file).as_ptr(), &mut status);
            let stream = scribe_model_new_stream(model, &mut status);

            assert_eq!(scribe_stream_discard(stream), SCRIBE_OK);
            assert!(scribe_stream_finish(stream).is_null());

            scribe_stream_free(stream);
            scribe_model_free(model);
        }
    }

    #[test]
    fn test_result_metadata_accessors() {
        ensure_engine();
        let file = artifact();
        unsafe {
            let mut status = -1;
            let model = scribe_model_new(c_path(&file).as_ptr(), &mut status);

            let audio = burst_audio(3);
            let result = scribe_model_transcribe_with_candidates(
                model,
                audio.as_ptr(),
                audio.len(),
                3,
                &mut status,
            );
            assert_eq!(status, SCRIBE_OK);
            assert!(!result.is_null());

            let num = scribe_result_num_candidates(result);
            assert!(num >= 1 && num <= 3);

            let best = take_string(scribe_result_text(result, 0));
            assert_eq!(best, "the quick brown");
            assert_eq!(take_string(scribe_result_best_text(result)), best);

            // Candidates are ordered best-first.
            for i in 1..num {
                assert!(
                    scribe_result_confidence(result, i - 1)
                        >= scribe_result_confidence(result, i)
                );
            }

            let tokens = scribe_result_num_tokens(result, 0);
            assert!(tokens > 0);
            let first = take_string(scribe_result_token_text(result, 0, 0));
            assert_eq!(first, "t");
            assert!(scribe_result_token_start_time(result, 0, tokens - 1) >= 0.0);

            // Out-of-range indices fail without touching valid state.
            assert!(scribe_result_text(result, num).is_null());
            assert_eq!(scribe_result_num_tokens(result, num), 0);

            scribe_result_free(result);
            scribe_model_free(model);
        }
    }

    #[test]
    fn test_token_text_error_messages_distinguish_cause() {
        ensure_engine();
        let file = artifact();
        unsafe {
            assert!(scribe_result_token_text(std::ptr::null_mut(), 0, 0).is_null());
            let msg = CStr::from_ptr(scribe_last_error()).to_str().unwrap();
            assert!(msg.contains("handle is null"));

            let mut status = -1;
            let model = scribe_model_new(c_path(&file).as_ptr(), &mut status);
            let audio = burst_audio(1);
            let result = scribe_model_transcribe_with_candidates(
                model,
                audio.as_ptr(),
                audio.len(),
                1,
                &mut status,
            );

            assert!(scribe_result_token_text(result, 99, 0).is_null());
            let msg = CStr::from_ptr(scribe_last_error()).to_str().unwrap();
            assert!(msg.contains("out of range"));

            scribe_result_free(result);
            scribe_model_free(model);
        }
    }

    #[test]
    fn test_free_functions_tolerate_null() {
        ensure_engine();
        unsafe {
            scribe_free_string(std::ptr::null_mut());
            scribe_model_free(std::ptr::null_mut());
            scribe_stream_free(std::ptr::null_mut());
            scribe_result_free(std::ptr::null_mut());
        }
    }
}
