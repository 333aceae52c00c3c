//! Platform-agnostic protocol types for the Bio-Guard water analyzer.
//!
//! This crate holds everything about the analyzer that does not need a
//! Bluetooth stack: the advertised name and GATT identifiers, the reading
//! text protocol, and the contamination classification.
//!
//! # Example
//!
//! ```
//! use bioguard_types::{Reading, StyleBucket};
//!
//! let reading = Reading::decode(
//!     "Cor: Vermelho | Contaminação: Muito Escuro | Intensidade Luz: 45%".as_bytes(),
//! )
//! .unwrap();
//! assert_eq!(reading.fill_percent(), Some(100));
//! assert_eq!(reading.bucket(), Some(StyleBucket::Alta));
//! ```

pub mod error;
pub mod types;
pub mod uuid;

pub use error::{DecodeResult, DecodeWarning};
pub use types::{ContaminationLevel, Reading, StyleBucket};
pub use uuid as uuids;
