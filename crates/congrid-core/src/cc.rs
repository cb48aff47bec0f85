//! The congestion-control registry: a fixed mapping from variant names to
//! opaque handles understood by the simulation runtime's socket factory.

use std::fmt;
use std::str::FromStr;

/// A recognized congestion-control variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum CcVariant {
    /// Delay-based.
    Vegas,
    /// Loss-based with a vegas-like delay fallback.
    Veno,
    /// Bandwidth-estimation.
    WestwoodPlus,
    /// Bandwidth-and-RTT probing.
    Bbr,
    /// Throughput-optimizing loss-based.
    Cubic,
}

impl CcVariant {
    /// Every supported variant, in the grid's declared order.
    pub const ALL: [CcVariant; 5] = [
        CcVariant::Vegas,
        CcVariant::WestwoodPlus,
        CcVariant::Bbr,
        CcVariant::Cubic,
        CcVariant::Veno,
    ];

    /// The variant's registry name.
    pub fn name(&self) -> &'static str {
        match self {
            CcVariant::Vegas => "TcpVegas",
            CcVariant::Veno => "TcpVeno",
            CcVariant::WestwoodPlus => "TcpWestwoodPlus",
            CcVariant::Bbr => "TcpBbr",
            CcVariant::Cubic => "TcpCubic",
        }
    }

    /// The opaque handle installed on the runtime's socket factory.
    pub fn handle(&self) -> CcHandle {
        CcHandle(self.name())
    }
}

impl fmt::Display for CcVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for CcVariant {
    type Err = CcError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        resolve(s)
    }
}

/// Maps a variant name to its handle-bearing variant. Unknown names are a
/// configuration error and must abort the batch before any run starts.
pub fn resolve(name: &str) -> Result<CcVariant, CcError> {
    CcVariant::ALL
        .iter()
        .find(|v| v.name() == name)
        .copied()
        .ok_or_else(|| CcError::UnknownVariant(name.to_owned()))
}

/// An opaque algorithm handle consumed by the simulation runtime. The handle
/// only affects the runtime's behavior; the registry holds no mutable state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize)]
pub struct CcHandle(&'static str);

impl CcHandle {
    pub fn as_str(&self) -> &'static str {
        self.0
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CcError {
    #[error("unknown congestion-control variant: {0}")]
    UnknownVariant(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_names_resolve() {
        for variant in CcVariant::ALL {
            assert_eq!(resolve(variant.name()).unwrap(), variant);
        }
    }

    #[test]
    fn unknown_name_fails() {
        assert!(matches!(
            resolve("TcpFoo"),
            Err(CcError::UnknownVariant(name)) if name == "TcpFoo"
        ));
    }

    #[test]
    fn from_str_round_trips() {
        let variant: CcVariant = "TcpBbr".parse().unwrap();
        assert_eq!(variant, CcVariant::Bbr);
        assert_eq!(variant.handle().as_str(), "TcpBbr");
    }
}
