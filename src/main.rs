use anyhow::{Context, Result};
use clap::Parser;
use std::fs;
use std::io::{self, Write};
use std::path::PathBuf;
use tabgraph::{Config, IngestError, PlotRequest, PlotType, Session};

#[derive(Parser, Debug)]
#[command(name = "tabgraph")]
#[command(about = "Plot columns of a CSV or spreadsheet file as a PNG chart", long_about = None)]
struct Args {
    /// Input file (.csv, .xlsx, .xls, .xlsm or .ods)
    file: PathBuf,

    /// Zero-indexed row holding the column names (0-100)
    #[arg(long, value_parser = clap::value_parser!(u8).range(0..=100))]
    header_row: Option<u8>,

    /// X axis column (repeat for several)
    #[arg(short = 'x', long = "x")]
    x_columns: Vec<String>,

    /// Y axis column (repeat for several)
    #[arg(short = 'y', long = "y")]
    y_columns: Vec<String>,

    /// Line Plot, Scatter Plot, Bar Plot, Histogram, Box Plot or 3D Scatter Plot
    #[arg(short = 't', long, default_value = "Line Plot")]
    plot_type: PlotType,

    /// Write the PNG here instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Print the first rows and the column names as JSON
    #[arg(long)]
    preview: bool,

    /// Print an HTML download link with the image as a data URI
    #[arg(long)]
    data_uri: bool,

    /// JSON configuration file
    #[arg(long)]
    config: Option<PathBuf>,
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };
    let mut session = Session::new(config);

    let bytes = fs::read(&args.file)
        .with_context(|| format!("Failed to read '{}'", args.file.display()))?;
    let file_name = args.file.to_string_lossy();

    let loaded = match session.load(&file_name, &bytes, args.header_row.map(usize::from)) {
        Ok(loaded) => loaded,
        Err(e) => {
            if let IngestError::Exhausted { attempts } = &e {
                for failed in attempts {
                    eprintln!("{}", failed);
                }
            }
            return Err(anyhow::Error::new(e).context("Failed to load input file"));
        }
    };
    for failed in &loaded.failed_attempts {
        eprintln!("{}", failed);
    }

    let stdout = io::stdout();
    let mut handle = stdout.lock();

    if args.preview {
        let json = serde_json::to_string_pretty(&loaded.preview)
            .context("Failed to serialize preview")?;
        writeln!(handle, "{}", json).context("Failed to write preview")?;
        if args.x_columns.is_empty() && args.y_columns.is_empty() {
            return Ok(());
        }
    }

    let request = PlotRequest::new(args.x_columns, args.y_columns, args.plot_type);
    let generated = session
        .generate(&request)
        .context("Failed to generate plot")?;

    if let Some(path) = &args.output {
        fs::write(path, &generated.png)
            .with_context(|| format!("Failed to write '{}'", path.display()))?;
        log::info!("Wrote {} bytes to {}", generated.png.len(), path.display());
    }

    if args.data_uri {
        writeln!(handle, "{}", generated.download_link).context("Failed to write download link")?;
    } else if args.output.is_none() {
        handle
            .write_all(&generated.png)
            .context("Failed to write PNG to stdout")?;
    }
    handle.flush().context("Failed to flush stdout")?;

    Ok(())
}
