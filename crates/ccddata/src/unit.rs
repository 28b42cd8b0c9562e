//! Physical units of CCD pixel values.
//!
//! Units form a closed set compared by value. Parsing accepts the common
//! `BUNIT` spellings case-insensitively; [`Unit::to_string`] yields the
//! canonical spelling written back to `BUNIT`.

use strum_macros::{AsRefStr, Display, EnumIter, EnumString};

/// Physical unit attached to a pixel array.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Display, EnumString, AsRefStr, EnumIter,
)]
#[strum(ascii_case_insensitive)]
pub enum Unit {
    /// No physical unit.
    #[default]
    #[strum(to_string = "dimensionless", serialize = "")]
    Dimensionless,
    /// Raw analog-to-digital units straight off the converter.
    #[strum(to_string = "adu", serialize = "dn")]
    Adu,
    #[strum(to_string = "count", serialize = "counts", serialize = "ct")]
    Count,
    /// Electron counts, i.e. ADU already multiplied by the gain.
    #[strum(to_string = "electron", serialize = "electrons", serialize = "e-")]
    Electron,
    #[strum(to_string = "photon", serialize = "photons", serialize = "ph")]
    Photon,
    #[strum(
        to_string = "electron / s",
        serialize = "electron/s",
        serialize = "e-/s"
    )]
    ElectronPerSecond,
    #[strum(to_string = "count / s", serialize = "count/s", serialize = "counts/s")]
    CountPerSecond,
}

impl Unit {
    /// Parse a `BUNIT` header string, returning `None` for unknown units.
    pub fn from_bunit(bunit: &str) -> Option<Unit> {
        bunit.trim().parse().ok()
    }

    /// `BUNIT` value for this unit, or `None` when the image is unitless.
    pub fn bunit(self) -> Option<String> {
        match self {
            Unit::Dimensionless => None,
            other => Some(other.to_string()),
        }
    }

    pub fn is_dimensionless(self) -> bool {
        self == Unit::Dimensionless
    }
}
