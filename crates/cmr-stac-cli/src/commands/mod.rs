// Subcommand handlers.
//
// Each module handles one CLI subcommand; main.rs parses arguments and
// dispatches here.

pub mod catalog;
pub mod collection;
pub mod collections;
pub mod search;
pub mod translate;
pub mod validate;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Args, ValueEnum};

use cmr_stac_lib::{Params, Vocabulary};

use crate::input::{build_params, parse_key_value};

/// Inbound parameter vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum VocabularyArg {
    /// STAC search body (JSON values).
    StacSearch,
    /// STAC query string (string values).
    StacQuery,
    /// WFS 3 query string.
    Wfs,
}

impl From<VocabularyArg> for Vocabulary {
    fn from(arg: VocabularyArg) -> Self {
        match arg {
            VocabularyArg::StacSearch => Vocabulary::StacSearch,
            VocabularyArg::StacQuery => Vocabulary::StacQuery,
            VocabularyArg::Wfs => Vocabulary::Wfs,
        }
    }
}

/// Request parameters shared by the subcommands that talk to CMR.
#[derive(Args, Debug, Clone, Default)]
pub struct RequestArgs {
    /// Request parameter; repeat a key to pass a list.
    #[arg(long = "param", value_name = "KEY=VALUE", value_parser = parse_key_value)]
    pub params: Vec<(String, String)>,

    /// JSON object file used as the request body. `--param` flags override it.
    #[arg(long, value_name = "FILE")]
    pub body: Option<PathBuf>,
}

impl RequestArgs {
    pub fn to_params(&self) -> Result<Params> {
        build_params(self.body.as_deref(), &self.params)
    }
}
