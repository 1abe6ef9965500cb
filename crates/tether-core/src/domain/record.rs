//! Visitor record: the payload captured by the client and delivered remotely.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Errors raised while building a [`VisitorRecord`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RecordError {
    #[error("field `{0}` must not be empty")]
    EmptyField(&'static str),

    #[error("invalid date {0:?}: expected YYYY-MM-DD")]
    InvalidDate(String),

    #[error("visitor counters overflow")]
    CounterOverflow,
}

/// One visitor entry.
///
/// Field names match the remote `visitantes` collection, so the record is
/// delivered as-is.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VisitorRecord {
    /// Visit date, serialized as `YYYY-MM-DD`.
    pub fecha: NaiveDate,
    pub nombre: String,
    pub localidad: String,
    pub adultos: u32,
    pub menores: u32,
    pub jubi_pens: u32,
    /// Always `adultos + menores + jubi_pens` for records built via [`VisitorRecord::new`].
    pub total: u32,
}

impl VisitorRecord {
    /// Build a record, trimming text fields and deriving `total`.
    pub fn new(
        fecha: NaiveDate,
        nombre: &str,
        localidad: &str,
        adultos: u32,
        menores: u32,
        jubi_pens: u32,
    ) -> Result<Self, RecordError> {
        let nombre = nombre.trim();
        if nombre.is_empty() {
            return Err(RecordError::EmptyField("nombre"));
        }
        let localidad = localidad.trim();
        if localidad.is_empty() {
            return Err(RecordError::EmptyField("localidad"));
        }
        let total = adultos
            .checked_add(menores)
            .and_then(|n| n.checked_add(jubi_pens))
            .ok_or(RecordError::CounterOverflow)?;

        Ok(Self {
            fecha,
            nombre: nombre.to_string(),
            localidad: localidad.to_string(),
            adultos,
            menores,
            jubi_pens,
            total,
        })
    }

    /// Parse a `YYYY-MM-DD` date the way the capture form accepts it.
    pub fn parse_fecha(s: &str) -> Result<NaiveDate, RecordError> {
        NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
            .map_err(|_| RecordError::InvalidDate(s.to_string()))
    }
}
