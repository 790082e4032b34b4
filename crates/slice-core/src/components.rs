//! Component selection.
//!
//! Operations only touch the parts of a slice the operator selected:
//! the static `kikimr` process (with `bin` / `cfg` sub-parts) and the
//! dynamic slots.

use std::str::FromStr;

use crate::error::ConfigError;

/// Sub-parts of the static process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct KikimrParts {
    pub bin: bool,
    pub cfg: bool,
}

impl KikimrParts {
    pub fn all() -> Self {
        Self { bin: true, cfg: true }
    }
}

/// The selected components for one invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Components {
    pub kikimr: Option<KikimrParts>,
    pub dynamic_slots: bool,
}

impl Components {
    /// Everything: static binary and config, plus dynamic slots.
    pub fn all() -> Self {
        Self {
            kikimr: Some(KikimrParts::all()),
            dynamic_slots: true,
        }
    }

    pub fn has_kikimr(&self) -> bool {
        self.kikimr.is_some()
    }

    pub fn has_kikimr_bin(&self) -> bool {
        self.kikimr.is_some_and(|k| k.bin)
    }

    pub fn has_kikimr_cfg(&self) -> bool {
        self.kikimr.is_some_and(|k| k.cfg)
    }

    pub fn has_dynamic_slots(&self) -> bool {
        self.dynamic_slots
    }

    /// Parse a list of selectors such as `kikimr:bin`, `dynamic_slots`.
    ///
    /// An empty list selects everything.
    pub fn from_selectors<S: AsRef<str>>(selectors: &[S]) -> Result<Self, ConfigError> {
        if selectors.is_empty() {
            return Ok(Self::all());
        }
        let mut components = Self::default();
        for selector in selectors {
            components.merge(selector.as_ref().parse()?);
        }
        Ok(components)
    }

    fn merge(&mut self, other: Components) {
        self.dynamic_slots |= other.dynamic_slots;
        if let Some(parts) = other.kikimr {
            let current = self.kikimr.get_or_insert_with(KikimrParts::default);
            current.bin |= parts.bin;
            current.cfg |= parts.cfg;
        }
    }
}

impl FromStr for Components {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (name, parts) = match s.split_once(':') {
            Some((name, parts)) => (name, Some(parts)),
            None => (s, None),
        };

        match name {
            "all" if parts.is_none() => Ok(Self::all()),
            "dynamic_slots" if parts.is_none() => Ok(Self {
                kikimr: None,
                dynamic_slots: true,
            }),
            "kikimr" => {
                let kikimr = match parts {
                    None => KikimrParts::all(),
                    Some(list) => {
                        let mut selected = KikimrParts::default();
                        for part in list.split(',') {
                            match part.trim() {
                                "bin" => selected.bin = true,
                                "cfg" => selected.cfg = true,
                                _ => return Err(ConfigError::InvalidComponent(s.to_string())),
                            }
                        }
                        selected
                    }
                };
                Ok(Self {
                    kikimr: Some(kikimr),
                    dynamic_slots: false,
                })
            }
            _ => Err(ConfigError::InvalidComponent(s.to_string())),
        }
    }
}
