//! Parse configuration.
//!
//! `ParseOptions` collects the knobs that change how an input is read and
//! when the lookup index is built. Defaults suit interactive inspection of
//! ordinary binaries.

use crate::io::IOLimits;
use serde::{Deserialize, Serialize};

/// Options controlling a single parse.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParseOptions {
    /// Size and read-budget limits applied to the input.
    pub limits: IOLimits,
    /// Build the lookup index during construction instead of on first query.
    pub eager_index: bool,
    /// Decode the program header table when the file declares one.
    pub parse_program_headers: bool,
    /// Report the model as valid even when parsing failed.
    ///
    /// Test-only escape hatch. The failure message and stage are still
    /// recorded; only `is_valid()` is affected. Set it through
    /// [`ParseOptions::force_valid_for_testing`]; serialized configs never
    /// carry it.
    #[serde(skip)]
    force_valid_for_testing: bool,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            limits: IOLimits::default(),
            eager_index: false,
            parse_program_headers: true,
            force_valid_for_testing: false,
        }
    }
}

impl ParseOptions {
    /// Options with eager index construction enabled.
    pub fn eager() -> Self {
        Self {
            eager_index: true,
            ..Self::default()
        }
    }

    /// Options whose models always claim validity. Intended for test harnesses
    /// that want to exercise query paths on inputs that fail to parse.
    pub fn force_valid_for_testing() -> Self {
        Self {
            force_valid_for_testing: true,
            ..Self::default()
        }
    }

    pub fn with_limits(mut self, limits: IOLimits) -> Self {
        self.limits = limits;
        self
    }

    pub fn forces_valid(&self) -> bool {
        self.force_valid_for_testing
    }
}
