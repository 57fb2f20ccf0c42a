//! Newtype domain identifiers.
//!
//! Every identity that crosses a crate boundary is a distinct newtype so that a
//! [`ProjectName`] can never be passed where a [`ClientName`] is expected, even
//! though both wrap a `String`.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Macro for String-wrapped newtypes.
// Generates: struct, new() returning Option<Self>, as_str(), Display.
// ---------------------------------------------------------------------------
macro_rules! string_id {
    (
        $(#[$attr:meta])*
        $name:ident
    ) => {
        $(#[$attr])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub struct $name(String);

        impl $name {
            /// Creates a new identifier, returning `None` if the value is empty
            /// or whitespace only.
            pub fn new(value: impl Into<String>) -> Option<Self> {
                let v = value.into();
                if v.trim().is_empty() { None } else { Some(Self(v)) }
            }

            /// Returns the identifier as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

// ---------------------------------------------------------------------------
// Identifiers: integer-backed (assigned by the document store)
// ---------------------------------------------------------------------------

/// Identifies a source document as assigned by the persistence collaborator.
///
/// The pipeline never allocates these; they are carried through so analysis
/// records can be correlated with the stored document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DocumentId(u64);

impl DocumentId {
    /// Creates a new identifier from a raw integer.
    pub fn new(value: u64) -> Self {
        Self(value)
    }

    /// Returns the underlying integer value.
    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for DocumentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Identifiers: UUID-backed (internally generated)
// ---------------------------------------------------------------------------

/// Identifies a single pipeline execution (one document analysis).
///
/// Generated fresh for every run; recorded on the `analysis_run` span so all
/// provider calls made for one document can be correlated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AnalysisRunId(Uuid);

impl AnalysisRunId {
    /// Generates a new random run identifier.
    pub fn new_random() -> Self {
        Self(Uuid::new_v4())
    }
}

impl std::fmt::Display for AnalysisRunId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Identifiers: String-backed
// ---------------------------------------------------------------------------

string_id! {
    /// Identifies the text-generation model (e.g. `"gpt-3.5-turbo"`).
    ///
    /// Fixed per deployment; every request made by one provider uses the same model.
    ModelId
}

string_id! {
    /// Name of the engagement the analysed document belongs to.
    ProjectName
}

string_id! {
    /// Name of the client company whose earnings are being analysed.
    ClientName
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_string_id_rejects_blank_values() {
        assert!(ModelId::new("").is_none());
        assert!(ProjectName::new("   ").is_none());
        assert_eq!(ClientName::new("Acme").unwrap().as_str(), "Acme");
    }

    #[test]
    fn test_run_ids_are_unique() {
        let a = AnalysisRunId::new_random();
        let b = AnalysisRunId::new_random();
        assert_ne!(a, b);
    }

    #[test]
    fn test_document_id_display() {
        assert_eq!(DocumentId::new(42).to_string(), "42");
    }
}
