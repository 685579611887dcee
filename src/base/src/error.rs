//
// Copyright 2025 the Mica developers, all rights reserved.
//
// This source code is a part of Mica.
//
//! The error type shared by all backends.
use std::error::Error as StdError;
use std::fmt;

/// Generic error causes.
///
/// These are *kinds*, not types: a backend maps whatever its native API
/// reports onto the closest kind and attaches the native detail as the
/// source error. Invalid-usage conditions that indicate a bug in the caller
/// (use-after-free, unbalanced begin/end, handles from a foreign device) are
/// deliberately not represented here — they are escalated to `panic!` so the
/// failure points at the offending call site.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub enum ErrorKind {
    /// The backend cannot realize the requested combination: an unsupported
    /// format, a missing queue type, a root-signature budget overflow.
    Unsupported,

    /// Allocator exhaustion: descriptor heap full, device memory exhausted,
    /// descriptor pool out of space. Callers may retry after freeing.
    OutOfMemory,

    /// An invalid argument that is diagnosable by value: an unknown binding
    /// name, an element index out of range, a view of the wrong resource
    /// type. The operation had no effect.
    Validation,

    /// The device became lost due to hardware/software errors, execution
    /// timeouts, or other reasons. Subsequent calls are permitted to no-op
    /// and return this kind again.
    DeviceLost,

    /// An error reported by the underlying native API that fits none of the
    /// above. The native detail is logged verbatim and attached as source.
    Backend,
}

impl ErrorKind {
    fn as_str(&self) -> &'static str {
        match *self {
            ErrorKind::Unsupported => "unsupported capability",
            ErrorKind::OutOfMemory => "out of memory",
            ErrorKind::Validation => "validation failure",
            ErrorKind::DeviceLost => "device lost",
            ErrorKind::Backend => "backend error",
        }
    }
}

/// The generic error type used by Mica backends.
#[derive(Debug)]
pub struct Error {
    kind: ErrorKind,
    error: Option<Box<dyn StdError + Send + Sync>>,
}

impl Error {
    pub fn new(kind: ErrorKind) -> Self {
        Self { kind, error: None }
    }

    pub fn with_detail<E>(kind: ErrorKind, error: E) -> Self
    where
        E: Into<Box<dyn StdError + Send + Sync>>,
    {
        Self {
            kind,
            error: Some(error.into()),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn get_ref(&self) -> Option<&(dyn StdError + Send + Sync + 'static)> {
        self.error.as_deref()
    }
}

impl fmt::Display for Error {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(ref error) = self.error {
            write!(fmt, "{}: {}", self.kind.as_str(), error)
        } else {
            write!(fmt, "{}", self.kind.as_str())
        }
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.error
            .as_ref()
            .map(|x| &**x as &(dyn StdError + 'static))
    }
}

impl From<ErrorKind> for Error {
    fn from(kind: ErrorKind) -> Self {
        Error::new(kind)
    }
}

pub type Result<T> = std::result::Result<T, Error>;
