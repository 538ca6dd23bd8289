use std::str::FromStr;

use bitflags::bitflags;
use thiserror::Error;

bitflags! {
    /// Post-processing steps requested from the external importer.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ImportFlags: u32 {
        /// Split every polygon, strip and fan into triangles.
        const TRIANGULATE = 1 << 0;
        /// Merge vertices whose attributes are all identical.
        const JOIN_IDENTICAL_VERTICES = 1 << 1;
        /// Generate flat normals for meshes without any.
        const GEN_NORMALS = 1 << 2;
        /// Generate tangents and bitangents for meshes without any.
        const CALC_TANGENT_SPACE = 1 << 3;
        /// Flip the V texture coordinate once more.
        const FLIP_UVS = 1 << 4;
    }
}

impl ImportFlags {
    /// Always requested by the loader, callers can only add to it.
    pub const BASELINE: Self = Self::TRIANGULATE.union(Self::JOIN_IDENTICAL_VERTICES);
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown import flag '{0}'")]
pub struct UnknownFlag(pub String);

impl FromStr for ImportFlags {
    type Err = UnknownFlag;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('_', "-").as_str() {
            "triangulate" => Ok(Self::TRIANGULATE),
            "join-identical-vertices" => Ok(Self::JOIN_IDENTICAL_VERTICES),
            "gen-normals" => Ok(Self::GEN_NORMALS),
            "calc-tangent-space" => Ok(Self::CALC_TANGENT_SPACE),
            "flip-uvs" => Ok(Self::FLIP_UVS),
            _ => Err(UnknownFlag(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_baseline_contains_triangulate_and_join() {
        assert!(ImportFlags::BASELINE.contains(ImportFlags::TRIANGULATE));
        assert!(ImportFlags::BASELINE.contains(ImportFlags::JOIN_IDENTICAL_VERTICES));
        assert!(!ImportFlags::BASELINE.contains(ImportFlags::FLIP_UVS));
    }

    #[test]
    fn test_parse_flag_names() {
        assert_eq!("gen-normals".parse(), Ok(ImportFlags::GEN_NORMALS));
        assert_eq!("CALC_TANGENT_SPACE".parse(), Ok(ImportFlags::CALC_TANGENT_SPACE));
        assert_eq!(
            "wobble".parse::<ImportFlags>(),
            Err(UnknownFlag("wobble".to_string()))
        );
    }
}
