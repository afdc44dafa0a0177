// Library exports for tabgraph

pub mod chart;
pub mod config;
pub mod data;
pub mod dispatch;
pub mod error;
pub mod export;
pub mod ingest;
pub mod render;
pub mod session;
pub mod stats;

pub use chart::Chart;
pub use config::Config;
pub use data::{Preview, Table};
pub use dispatch::{dispatch, PlotRequest, PlotType};
pub use error::{DispatchError, IngestError};
pub use ingest::{resolve, FileKind, Resolution};
pub use session::Session;

use serde::Deserialize;

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RenderOptions {
    #[serde(default = "default_width")]
    pub width: u32,
    #[serde(default = "default_height")]
    pub height: u32,
}

fn default_width() -> u32 { 800 }
fn default_height() -> u32 { 600 }

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            width: 800,
            height: 600,
        }
    }
}
