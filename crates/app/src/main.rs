use std::io::Write;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use medbill_ocr::{
    BillAnalysisResult, BillPipeline, CommandLayoutBackend, CommandRecognizer, LayoutPolicy,
    MockRecognizer, OcrBackend, OcrBackendKind, PipelineConfig,
};

#[derive(Parser, Debug)]
#[command(name = "medbill")]
#[command(version, about = "Extract procedures and costs from a scanned medical bill", long_about = None)]
struct Cli {
    /// Bill image (PNG, JPEG, …)
    image: PathBuf,

    /// Pipeline configuration (TOML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Print the full analysis as JSON
    #[arg(long)]
    json: bool,

    /// Rebuild reading order before pairing
    #[arg(long)]
    reading_order: bool,

    /// Abort when layout classification fails
    #[arg(long)]
    strict_layout: bool,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => PipelineConfig::load(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => PipelineConfig::default(),
    };
    if cli.reading_order {
        config.reading_order = true;
    }
    if cli.strict_layout {
        config.layout_policy = LayoutPolicy::Strict;
    }

    let recognizer = build_recognizer(&config)?;
    let layout = config
        .layout
        .as_ref()
        .map(|l| CommandLayoutBackend::new(&l.program, l.args.clone()));

    let mut pipeline = BillPipeline::new(recognizer, config);
    if let Some(backend) = layout {
        pipeline = pipeline.with_layout(Box::new(backend));
    }

    let result = pipeline
        .process(&cli.image)
        .with_context(|| format!("could not process {}", cli.image.display()))?;

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        write_listing(&mut std::io::stdout().lock(), &result)?;
    }
    Ok(())
}

fn build_recognizer(config: &PipelineConfig) -> Result<Box<dyn OcrBackend>> {
    let ocr = &config.ocr;
    match ocr.backend {
        OcrBackendKind::Command => Ok(Box::new(
            CommandRecognizer::new(&ocr.program, ocr.args.clone(), &ocr.lang)
                .with_angle_cls(ocr.use_angle_cls),
        )),
        OcrBackendKind::Mock => {
            tracing::warn!("Using mock OCR backend; no text will be recognized");
            Ok(Box::new(MockRecognizer::empty()))
        }
        #[cfg(feature = "tesseract")]
        OcrBackendKind::Tesseract => Ok(Box::new(
            medbill_ocr::recognizer::tesseract_backend::TesseractRecognizer::new(&ocr.lang),
        )),
        #[cfg(not(feature = "tesseract"))]
        OcrBackendKind::Tesseract => Err(medbill_ocr::OcrError::NotAvailable.into()),
    }
}

fn write_listing(out: &mut impl Write, result: &BillAnalysisResult) -> std::io::Result<()> {
    writeln!(out, "\nExtracted Procedures and Costs:")?;
    for item in &result.procedures_costs {
        writeln!(out, "Procedure: {}", item.procedure)?;
        writeln!(out, "Cost: {}\n", item.cost)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use medbill_ocr::{LayoutOutcome, ProcedureCostPair};

    fn result_with(pairs: &[(&str, &str)]) -> BillAnalysisResult {
        BillAnalysisResult {
            source_sha256: String::new(),
            text_blocks: vec![],
            procedures_costs: pairs
                .iter()
                .map(|(procedure, cost)| ProcedureCostPair {
                    procedure: procedure.to_string(),
                    cost: cost.to_string(),
                    amount: None,
                })
                .collect(),
            layout: LayoutOutcome::Skipped,
        }
    }

    fn listing(result: &BillAnalysisResult) -> String {
        let mut buf = Vec::new();
        write_listing(&mut buf, result).unwrap();
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn listing_prints_each_pair_then_blank_line() {
        let result = result_with(&[("X-Ray", "$150.00"), ("Consultation", "$75")]);
        assert_eq!(
            listing(&result),
            "\nExtracted Procedures and Costs:\n\
             Procedure: X-Ray\nCost: $150.00\n\n\
             Procedure: Consultation\nCost: $75\n\n"
        );
    }

    #[test]
    fn listing_with_no_pairs_is_header_only() {
        assert_eq!(listing(&result_with(&[])), "\nExtracted Procedures and Costs:\n");
    }
}
