//! Error types for `mardi-core`.

use thiserror::Error;

use crate::{claim::ValueKind, entity::LocalId};

#[derive(Debug, Error)]
pub enum Error {
  /// The store declared a datatype outside the closed [`ValueKind`] set.
  #[error("unsupported datatype: {0}")]
  UnsupportedDatatype(String),

  /// A value that had to name an existing entity could not be resolved.
  #[error("could not find entity for: {0}")]
  EntityNotFound(String),

  /// A label matched more than one entity where exactly one was required.
  #[error("label {label:?} is ambiguous: {candidates:?}")]
  AmbiguousValue {
    label:      String,
    candidates: Vec<LocalId>,
  },

  /// A claim was rendered for writing without a resolved property.
  #[error("claim of kind {0} has no resolved property")]
  UnresolvedProperty(ValueKind),

  /// An update was refused because of a label+description conflict.
  #[error("writing {entity} conflicts with existing entity {existing}")]
  WriteConflict {
    entity:   LocalId,
    existing: LocalId,
  },

  #[error("store returned an entity without an id")]
  MissingId,

  #[error("invalid identifier: {0:?}")]
  InvalidIdentifier(String),

  /// A claim payload does not have the shape its value kind requires.
  #[error("payload shape does not match value kind {0}")]
  PayloadMismatch(ValueKind),

  /// The merge primitive reported a different ordering than requested.
  #[error(
    "merge primitive reordered entities: requested {expected_from} -> \
     {expected_to}, got {from} -> {to}"
  )]
  MergeMismatch {
    expected_from: LocalId,
    expected_to:   LocalId,
    from:          LocalId,
    to:            LocalId,
  },

  #[error("catalog claim {property} on {entity} carries no string value")]
  MissingCatalogValue {
    entity:   LocalId,
    property: LocalId,
  },

  /// Failure reported by an external collaborator (store, pages, merge).
  #[error("backend error: {0}")]
  Backend(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl Error {
  /// Wrap a collaborator error.
  pub fn backend<E>(err: E) -> Self
  where
    E: std::error::Error + Send + Sync + 'static,
  {
    Self::Backend(Box::new(err))
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
