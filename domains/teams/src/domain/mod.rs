//! Teams domain layer: entities and business-rule checks

pub mod entities;
pub mod validation;
