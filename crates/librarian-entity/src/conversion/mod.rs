//! Conversion tracking entities: persisted requests and reported results.

pub mod request;
pub mod result;

pub use request::{
    ConversionRequest, NewConversionRequest, PRINCIPAL_DELIMITER, TierMapping, join_principals,
    split_principals,
};
pub use result::{ConversionResult, ConversionStatus, ConversionSubject};
