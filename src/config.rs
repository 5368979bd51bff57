//! JSON requests for the command line and for callers embedding the crate.

use crate::assembly::ReportParams;
use crate::error::{Result, SaberPlishError};
use crate::probe::ProbeParams;
use saberplish_render::DrawOptions;
use saberplish_thermo::Strand;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fs;

pub const DEFAULT_IS_BRIDGE_NAME: &str = "IS bridge";
pub const DEFAULT_SF_BRIDGE_NAME: &str = "SF bridge";

/// A bridge given either as a bare sequence or as `{"name", "sequence"}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BridgeInput {
    Named(Strand),
    Sequence(String),
}

impl BridgeInput {
    pub fn sequence(&self) -> &str {
        match self {
            Self::Named(strand) => strand.sequence(),
            Self::Sequence(seq) => seq.as_str(),
        }
    }

    pub fn to_strand(&self, default_name: &str) -> Result<Strand> {
        match self {
            Self::Named(strand) => Ok(strand.clone()),
            Self::Sequence(seq) => Strand::new(seq, default_name)
                .map_err(|e| SaberPlishError::InvalidSequence(e.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProbeRequest {
    pub is_bridge: BridgeInput,
    pub sf_bridge: BridgeInput,
    #[serde(default)]
    pub primer: String,
    #[serde(flatten)]
    pub params: ProbeParams,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportRequest {
    pub is_bridge: BridgeInput,
    pub sf_bridge: BridgeInput,
    #[serde(default)]
    pub primer: String,
    #[serde(flatten)]
    pub params: ReportParams,
    /// Only used when drawing.
    #[serde(default)]
    pub draw: DrawOptions,
}

impl ReportRequest {
    pub fn bridges(&self) -> Result<(Strand, Strand)> {
        Ok((
            self.is_bridge.to_strand(DEFAULT_IS_BRIDGE_NAME)?,
            self.sf_bridge.to_strand(DEFAULT_SF_BRIDGE_NAME)?,
        ))
    }
}

/// Inline JSON, or the contents of a file when prefixed with `@`.
pub fn load_json_arg(value: &str) -> Result<String> {
    match value.strip_prefix('@') {
        Some(path) => Ok(fs::read_to_string(path)?),
        None => Ok(value.to_string()),
    }
}

pub fn parse_request<T: DeserializeOwned>(value: &str) -> Result<T> {
    Ok(serde_json::from_str(&load_json_arg(value)?)?)
}
