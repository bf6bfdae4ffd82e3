use std::fmt;
use crate::core::types::DocId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Io,
    Parse,
    CorruptRecord,
    UndefinedVariable,
    VariableReused,
    UnsupportedField,
    EmptyOperandSet,
    InvalidArgument,
    InvalidInput,
    InvalidState,
}

#[derive(Debug)]
pub struct Error {
    pub kind: ErrorKind,
    pub context: String,
    pub doc_id: Option<DocId>,
}

impl Error {
    pub fn new(kind: ErrorKind, context: String) -> Self {
        Error { kind, context, doc_id: None }
    }

    pub fn corrupt(context: impl Into<String>) -> Self {
        Error::new(ErrorKind::CorruptRecord, context.into())
    }

    pub fn invalid_argument(context: impl Into<String>) -> Self {
        Error::new(ErrorKind::InvalidArgument, context.into())
    }

    pub fn invalid_state(context: impl Into<String>) -> Self {
        Error::new(ErrorKind::InvalidState, context.into())
    }

    /// Attach the document being traversed when the error surfaced.
    /// An id that is already set is kept.
    pub fn with_doc(mut self, doc_id: DocId) -> Self {
        if self.doc_id.is_none() {
            self.doc_id = Some(doc_id);
        }
        self
    }

    pub fn is_corrupt(&self) -> bool {
        self.kind == ErrorKind::CorruptRecord
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.doc_id {
            Some(doc_id) => write!(f, "{:?} (doc {}): {}", self.kind, doc_id.0, self.context),
            None => write!(f, "{:?}: {}", self.kind, self.context),
        }
    }
}

impl std::error::Error for Error {}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::new(ErrorKind::Io, err.to_string())
    }
}

impl From<bincode::Error> for Error {
    fn from(err: bincode::Error) -> Self {
        Error::new(ErrorKind::Parse, err.to_string())
    }
}

impl From<fst::Error> for Error {
    fn from(err: fst::Error) -> Self {
        Error::new(ErrorKind::Parse, format!("FST error: {}", err))
    }
}

impl From<regex::Error> for Error {
    fn from(err: regex::Error) -> Self {
        Error::new(ErrorKind::InvalidArgument, format!("Invalid pattern: {}", err))
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::new(ErrorKind::Parse, format!("Config error: {}", err))
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn doc_id_is_attached_once() {
        let err = Error::corrupt("bad flags").with_doc(DocId(3)).with_doc(DocId(9));
        assert_eq!(err.doc_id, Some(DocId(3)));
        assert!(err.is_corrupt());
        assert_eq!(err.to_string(), "CorruptRecord (doc 3): bad flags");
    }

    #[test]
    fn io_errors_convert() {
        let io = std::io::Error::new(std::io::ErrorKind::UnexpectedEof, "short read");
        let err: Error = io.into();
        assert_eq!(err.kind, ErrorKind::Io);
        assert!(err.doc_id.is_none());
    }
}
