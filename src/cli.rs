// src/cli.rs
use crate::settings::DEFAULT_SECTION;
use clap::{Parser, ValueEnum};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Example to run; repeat to run several in order
    #[arg(long = "example", value_enum)]
    pub examples: Vec<Example>,

    /// Run every example, including the ones that write
    #[arg(long, conflicts_with = "examples")]
    pub all: bool,

    /// Secrets file (YAML or JSON)
    #[arg(long)]
    pub secrets: Option<PathBuf>,

    /// Configuration section holding cluster, user and password
    #[arg(long, default_value = DEFAULT_SECTION)]
    pub section: String,

    #[arg(long, default_value = "blog")]
    pub db: String,

    #[arg(long, default_value = "posts")]
    pub collection: String,

    #[arg(long)]
    pub debug: bool,
}

impl Cli {
    /// Examples to run, in order. Without `--example` or `--all` this is the
    /// read-only walkthrough.
    pub fn selected(&self) -> Vec<Example> {
        if self.all {
            Example::value_variants().to_vec()
        } else if self.examples.is_empty() {
            DEFAULT_SEQUENCE.to_vec()
        } else {
            self.examples.clone()
        }
    }
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Example {
    ListDatabases,
    Insert,
    InsertAsync,
    InsertMany,
    Find,
    FindList,
    Update,
    Delete,
    Transaction,
    InsertAccount,
    AggregationMatch,
    AggregationGroup,
    AggregationSort,
    AggregationProjection,
}

pub const DEFAULT_SEQUENCE: [Example; 6] = [
    Example::ListDatabases,
    Example::FindList,
    Example::AggregationMatch,
    Example::AggregationGroup,
    Example::AggregationSort,
    Example::AggregationProjection,
];
