//! LoanLens CLI: run an evidence capture session from the terminal.
//!
//! Storage, sink and watermark settings come from the environment (see
//! `loanlens_core::Config`). The "camera" is an existing image file.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context};
use chrono::Utc;
use chrono_tz::Tz;
use clap::{Args, Parser, Subcommand};
use loanlens_capture::{
    CaptureOutcome, Collaborators, ConfirmOutcome, EvidencePipeline, FsMediaStore,
    WatermarkComposer,
};
use loanlens_cli::create_sink;
use loanlens_cli::devices::{DirectoryGallery, FileCamera, FixedLocation};
use loanlens_core::models::{CaptureRequest, GeoFix, SessionContext};
use loanlens_core::{CaptureError, Config, ErrorMetadata};
use loanlens_infra::telemetry::init_telemetry;
use loanlens_processing::{
    decode_oriented, encode_jpeg, watermark_lines, WatermarkConfig, WatermarkRenderer,
};
use loanlens_storage::create_storage;
use serde::Serialize;

#[derive(Parser)]
#[command(name = "loanlens", about = "Loan evidence capture CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct RequestArgs {
    /// Loan the evidence belongs to
    #[arg(long)]
    loan_id: Option<String>,
    #[arg(long)]
    requirement_id: Option<String>,
    /// Shown on the watermark and used as the asset name
    #[arg(long)]
    requirement_name: Option<String>,
    /// Signed-in user; anonymous when omitted
    #[arg(long)]
    user: Option<String>,
}

impl RequestArgs {
    fn into_request(self) -> CaptureRequest {
        let session = match self.user {
            Some(user) => SessionContext::new(user),
            None => SessionContext::anonymous(),
        };
        let request = CaptureRequest::new(&session)
            .with_requirement(self.requirement_id, self.requirement_name);
        match self.loan_id {
            Some(loan_id) => request.with_loan(loan_id),
            None => request,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Capture, watermark, upload and submit one photo
    Capture {
        /// Image file standing in for the camera
        #[arg(long)]
        photo: PathBuf,
        #[arg(long, allow_hyphen_values = true)]
        lat: Option<f64>,
        #[arg(long, allow_hyphen_values = true)]
        lon: Option<f64>,
        /// Refuse location access
        #[arg(long)]
        deny_location: bool,
        /// Directory acting as the device gallery
        #[arg(long)]
        gallery_dir: Option<PathBuf>,
        /// Temp media directory
        #[arg(long)]
        media_dir: Option<PathBuf>,
        #[command(flatten)]
        request: RequestArgs,
    },
    /// Render the evidence watermark onto an image without uploading
    Watermark {
        #[arg(long)]
        photo: PathBuf,
        #[arg(long)]
        out: PathBuf,
        #[arg(long, allow_hyphen_values = true)]
        lat: f64,
        #[arg(long, allow_hyphen_values = true)]
        lon: f64,
        /// Fix time in epoch milliseconds (default: now)
        #[arg(long)]
        timestamp_millis: Option<i64>,
        /// TTF/OTF font (default: WATERMARK_FONT_PATH, then the bundled font)
        #[arg(long)]
        font: Option<PathBuf>,
        /// IANA timezone for the time line (default: WATERMARK_TIMEZONE, then local)
        #[arg(long)]
        timezone: Option<String>,
        #[command(flatten)]
        request: RequestArgs,
    },
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CaptureReport<'a> {
    submission_id: &'a str,
    uploaded_uri: &'a str,
    watermarked: bool,
    submission: &'a loanlens_core::models::EvidenceSubmission,
}

fn print_json(value: &impl Serialize) -> anyhow::Result<()> {
    let out = serde_json::to_string_pretty(value).context("Serialize output")?;
    println!("{}", out);
    Ok(())
}

/// Log a user-facing pipeline error and turn it into a CLI failure.
fn report(error: CaptureError) -> anyhow::Error {
    tracing::error!(code = error.error_code(), "{}", error.alert_title());
    anyhow::anyhow!(error.client_message())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env().context("Failed to load configuration")?;
    if let Err(e) = init_telemetry("loanlens", config.log_format) {
        eprintln!("Failed to initialize telemetry: {}", e);
    }

    let cli = Cli::parse();

    match cli.command {
        Commands::Capture {
            photo,
            lat,
            lon,
            deny_location,
            gallery_dir,
            media_dir,
            request,
        } => {
            config.validate()?;

            let media_dir = media_dir.unwrap_or_else(|| std::env::temp_dir().join("loanlens-media"));
            let media_store = Arc::new(FsMediaStore::new(media_dir).await?);
            let position = lat.zip(lon);

            let collaborators = Collaborators {
                camera: Arc::new(FileCamera::new(photo, media_store.clone())),
                media_library: Arc::new(DirectoryGallery::new(gallery_dir)),
                location: Arc::new(FixedLocation::new(position, !deny_location)),
                storage: create_storage(&config).await?,
                sink: create_sink(&config).await?,
                composer: Arc::new(WatermarkComposer::from_config(&config, media_store.clone())),
                media_store,
            };

            let pipeline = EvidencePipeline::new(request.into_request(), collaborators)
                .with_key_prefix(config.evidence_key_prefix.clone());

            let init = pipeline.initialize().await.map_err(report)?;
            for advisory in &init.advisories {
                tracing::warn!(title = advisory.title(), "{}", advisory.message());
            }
            if init.camera_blocked() {
                return Err(report(CaptureError::CameraPermissionDenied));
            }

            match pipeline.capture().await.map_err(report)? {
                CaptureOutcome::Captured { photo, .. } => {
                    tracing::info!(
                        raw_uri = %photo.raw_uri,
                        location = %pipeline.location_status(),
                        "Preview ready"
                    );
                }
                CaptureOutcome::Ignored => bail!("Capture already in progress"),
            }

            match pipeline.confirm().await.map_err(report)? {
                ConfirmOutcome::Completed {
                    receipt,
                    submission,
                    uploaded_photo,
                } => print_json(&CaptureReport {
                    submission_id: &receipt.submission_id,
                    uploaded_uri: uploaded_photo.upload_uri(),
                    watermarked: uploaded_photo.composed_uri.is_some(),
                    submission: &submission,
                })?,
                ConfirmOutcome::Ignored => bail!("Upload already in progress"),
            }
        }
        Commands::Watermark {
            photo,
            out,
            lat,
            lon,
            timestamp_millis,
            font,
            timezone,
            request,
        } => {
            let renderer = match font.or_else(|| config.watermark_font_path.clone()) {
                Some(path) => WatermarkRenderer::from_font_file(&path, WatermarkConfig::default())?,
                None => WatermarkRenderer::bundled(WatermarkConfig::default())?,
            };

            let fix = GeoFix::new(
                lat,
                lon,
                timestamp_millis.unwrap_or_else(|| Utc::now().timestamp_millis()),
            );
            let timezone = match timezone {
                Some(name) => Some(
                    name.parse::<Tz>()
                        .map_err(|e| anyhow::anyhow!("Unknown timezone {}: {}", name, e))?,
                ),
                None => config.watermark_timezone,
            };
            let lines = watermark_lines(&fix, &request.into_request(), timezone);

            let raw = tokio::fs::read(&photo)
                .await
                .with_context(|| format!("Failed to read {}", photo.display()))?;
            let quality = config.watermark_jpeg_quality;
            let encoded = tokio::task::spawn_blocking(move || -> anyhow::Result<Vec<u8>> {
                let img = decode_oriented(&raw)?;
                Ok(encode_jpeg(&renderer.render(img, &lines), quality)?)
            })
            .await??;

            tokio::fs::write(&out, encoded)
                .await
                .with_context(|| format!("Failed to write {}", out.display()))?;
            print_json(&serde_json::json!({ "output": out.display().to_string() }))?;
        }
    }

    Ok(())
}
