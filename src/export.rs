use crate::chart::Chart;
use crate::RenderOptions;
use anyhow::Result;
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;

/// File name offered by the download link
pub const DOWNLOAD_FILE_NAME: &str = "graph.png";

const PNG_MAGIC: [u8; 8] = [137, 80, 78, 71, 13, 10, 26, 10];

/// Render a chart and encode it as PNG. Errors propagate unchanged.
pub fn export(chart: &Chart, options: &RenderOptions) -> Result<Vec<u8>> {
    chart.serialize_png(options)
}

pub fn to_base64(bytes: &[u8]) -> String {
    STANDARD.encode(bytes)
}

pub fn data_uri(png: &[u8]) -> String {
    format!("data:file/png;base64,{}", to_base64(png))
}

/// HTML anchor that downloads the image as `graph.png`
pub fn download_link(png: &[u8]) -> String {
    format!(
        "<a href=\"{}\" download=\"{}\">Download Graph</a>",
        data_uri(png),
        DOWNLOAD_FILE_NAME
    )
}

pub fn is_png(bytes: &[u8]) -> bool {
    bytes.len() > PNG_MAGIC.len() && bytes[..PNG_MAGIC.len()] == PNG_MAGIC
}
