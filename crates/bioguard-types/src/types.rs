//! Reading types and the delimited text protocol spoken by the analyzer.
//!
//! The peripheral sends one UTF-8 line per reading:
//!
//! ```text
//! Cor: Vermelho Muito Escuro | Contaminação: Alta | Intensidade Luz: 45%
//! ```
//!
//! Fields are joined by [`FIELD_DELIMITER`] in a fixed order (color,
//! contamination, light). There is no length prefix, checksum or version byte.

use core::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::{DecodeResult, DecodeWarning};

/// Separator between payload fields.
pub const FIELD_DELIMITER: &str = " | ";

/// Minimum number of fields a payload must carry.
pub const MIN_FIELDS: usize = 3;

/// Label in front of the color field.
pub const COLOR_PREFIX: &str = "Cor: ";

/// Label in front of the contamination field.
pub const CONTAMINATION_PREFIX: &str = "Contaminação: ";

/// Label in front of the light-intensity field.
pub const LIGHT_PREFIX: &str = "Intensidade Luz: ";

/// Visual style applied to the fill gauge.
///
/// Exactly one bucket is applied at a time; renderers clear all of
/// [`StyleBucket::ALL`] before applying a new one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum StyleBucket {
    /// Low contamination (yellow).
    Baixa,
    /// Medium contamination (orange).
    Media,
    /// High contamination (intense red).
    Alta,
}

impl StyleBucket {
    /// Every bucket, in ascending severity.
    pub const ALL: [StyleBucket; 3] = [StyleBucket::Baixa, StyleBucket::Media, StyleBucket::Alta];

    /// Short bucket name.
    pub fn as_str(&self) -> &'static str {
        match self {
            StyleBucket::Baixa => "baixa",
            StyleBucket::Media => "media",
            StyleBucket::Alta => "alta",
        }
    }

    /// Style class name, as used by the original web front end.
    pub fn class_name(&self) -> &'static str {
        match self {
            StyleBucket::Baixa => "level-baixa",
            StyleBucket::Media => "level-media",
            StyleBucket::Alta => "level-alta",
        }
    }
}

impl fmt::Display for StyleBucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Contamination level derived from the reading text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum ContaminationLevel {
    /// Very light water color.
    Low,
    /// Normal water color.
    Medium,
    /// Very dark water color.
    High,
    /// None of the known markers matched.
    #[default]
    Unknown,
}

impl ContaminationLevel {
    /// Ordered marker table; the first contained marker wins.
    const MARKERS: [(&'static str, ContaminationLevel); 3] = [
        ("muito escuro", ContaminationLevel::High),
        ("normal", ContaminationLevel::Medium),
        ("muito claro", ContaminationLevel::Low),
    ];

    /// Classify a label by case-insensitive substring match.
    ///
    /// # Examples
    ///
    /// ```
    /// use bioguard_types::ContaminationLevel;
    ///
    /// assert_eq!(ContaminationLevel::classify("Muito Escuro"), ContaminationLevel::High);
    /// assert_eq!(ContaminationLevel::classify("normal"), ContaminationLevel::Medium);
    /// assert_eq!(ContaminationLevel::classify("MUITO CLARO"), ContaminationLevel::Low);
    /// assert_eq!(ContaminationLevel::classify("???"), ContaminationLevel::Unknown);
    /// ```
    #[must_use]
    pub fn classify(label: &str) -> Self {
        let label = label.to_lowercase();
        Self::MARKERS
            .iter()
            .find(|(marker, _)| label.contains(marker))
            .map(|(_, level)| *level)
            .unwrap_or(ContaminationLevel::Unknown)
    }

    /// Gauge height in percent, or `None` to leave the gauge untouched.
    pub fn fill_percent(&self) -> Option<u8> {
        match self {
            ContaminationLevel::High => Some(100),
            ContaminationLevel::Medium => Some(66),
            ContaminationLevel::Low => Some(33),
            ContaminationLevel::Unknown => None,
        }
    }

    /// Style bucket for the gauge, or `None` when no bucket applies.
    pub fn bucket(&self) -> Option<StyleBucket> {
        match self {
            ContaminationLevel::High => Some(StyleBucket::Alta),
            ContaminationLevel::Medium => Some(StyleBucket::Media),
            ContaminationLevel::Low => Some(StyleBucket::Baixa),
            ContaminationLevel::Unknown => None,
        }
    }

    /// Whether a known marker matched.
    pub fn is_known(&self) -> bool {
        *self != ContaminationLevel::Unknown
    }
}

impl fmt::Display for ContaminationLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ContaminationLevel::Low => "low",
            ContaminationLevel::Medium => "medium",
            ContaminationLevel::High => "high",
            ContaminationLevel::Unknown => "unknown",
        };
        f.write_str(s)
    }
}

/// One decoded reading from the analyzer.
///
/// Readings are transient: they live for a single decode-and-render pass.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Reading {
    /// Color field as displayed, including its `"Cor: "` label.
    pub color_label: String,
    /// Contamination field as displayed, including its label.
    pub contamination_label: String,
    /// Light intensity with the label stripped (e.g. `"45%"`).
    pub light_label: String,
    /// Derived contamination level.
    pub level: ContaminationLevel,
}

impl Reading {
    /// Decode a raw characteristic value.
    ///
    /// Invalid UTF-8 sequences are replaced rather than rejected.
    pub fn decode(raw: &[u8]) -> DecodeResult<Self> {
        Self::parse(&String::from_utf8_lossy(raw))
    }

    /// Parse one payload line.
    ///
    /// Segments beyond the third are ignored.
    ///
    /// # Examples
    ///
    /// ```
    /// use bioguard_types::{ContaminationLevel, Reading};
    ///
    /// let reading = Reading::parse("Cor: Azul | Contaminação: Normal | Intensidade Luz: 10%").unwrap();
    /// assert_eq!(reading.color_label, "Cor: Azul");
    /// assert_eq!(reading.light_label, "10%");
    /// assert_eq!(reading.level, ContaminationLevel::Medium);
    ///
    /// assert!(Reading::parse("only one segment").is_err());
    /// ```
    pub fn parse(text: &str) -> DecodeResult<Self> {
        let parts: Vec<&str> = text.split(FIELD_DELIMITER).collect();
        if parts.len() < MIN_FIELDS {
            return Err(DecodeWarning::TooFewSegments {
                expected: MIN_FIELDS,
                actual: parts.len(),
                payload: text.to_string(),
            });
        }

        let color_label = parts[0];
        let contamination_label = parts[1];
        let light_label = parts[2];

        let level = ContaminationLevel::classify(&strip_label(contamination_label, CONTAMINATION_PREFIX));

        Ok(Self {
            color_label: color_label.to_string(),
            contamination_label: contamination_label.to_string(),
            light_label: strip_label(light_label, LIGHT_PREFIX),
            level,
        })
    }

    /// Numeric light intensity, if the light field is a plain percentage.
    pub fn light_percent(&self) -> Option<u8> {
        self.light_label
            .trim()
            .strip_suffix('%')
            .and_then(|v| v.trim().parse().ok())
    }

    /// Gauge height for this reading. See [`ContaminationLevel::fill_percent`].
    pub fn fill_percent(&self) -> Option<u8> {
        self.level.fill_percent()
    }

    /// Gauge style for this reading. See [`ContaminationLevel::bucket`].
    pub fn bucket(&self) -> Option<StyleBucket> {
        self.level.bucket()
    }
}

/// Remove the first occurrence of a field label.
fn strip_label(field: &str, label: &str) -> String {
    field.replacen(label, "", 1)
}
