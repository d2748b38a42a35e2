use clap::{Arg, Command};
use log::LevelFilter;
use replycut::signature::classifier::{parse_training_data, TrainingOptions};
use replycut::{
    ExtractionConfig, ExtractionResult, LinearClassifier, QuotationExtractor, SharedClassifier,
    SignatureExtractor,
};
use serde::Serialize;
use std::io::Read;
use std::process;

#[derive(Serialize)]
struct Output {
    #[serde(flatten)]
    result: ExtractionResult,
    #[serde(skip_serializing_if = "Option::is_none")]
    quotation_markers: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    signature_markers: Option<String>,
}

fn main() {
    let matches = Command::new("replycut")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Extracts the latest reply and its signature from a plain-text email body")
        .arg(
            Arg::new("input")
                .value_name("FILE")
                .help("Message body to process, stdin when absent or '-'"),
        )
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("Configuration file path"),
        )
        .arg(
            Arg::new("generate-config")
                .long("generate-config")
                .value_name("FILE")
                .help("Generate a default configuration file")
                .action(clap::ArgAction::Set),
        )
        .arg(
            Arg::new("test-config")
                .long("test-config")
                .help("Validate the configuration and compile extra splitters")
                .action(clap::ArgAction::SetTrue),
        )
        .arg(
            Arg::new("sender")
                .long("sender")
                .value_name("ADDR")
                .help("Sender of the message, e.g. 'John Doe <john@example.com>'")
                .default_value(""),
        )
        .arg(
            Arg::new("quotation-only")
                .long("quotation-only")
                .help("Only strip quoted replies")
                .action(clap::ArgAction::SetTrue)
                .conflicts_with("signature-only"),
        )
        .arg(
            Arg::new("signature-only")
                .long("signature-only")
                .help("Only extract the signature")
                .action(clap::ArgAction::SetTrue),
        )
        .arg(
            Arg::new("model")
                .long("model")
                .value_name("FILE")
                .help("Load line classifier weights")
                .action(clap::ArgAction::Set)
                .conflicts_with("train"),
        )
        .arg(
            Arg::new("train")
                .long("train")
                .value_name("FILE")
                .help("Train the line classifier from comma-separated feature rows")
                .action(clap::ArgAction::Set),
        )
        .arg(
            Arg::new("save-model")
                .long("save-model")
                .value_name("FILE")
                .help("Write the line classifier weights")
                .action(clap::ArgAction::Set),
        )
        .arg(
            Arg::new("markers")
                .long("markers")
                .help("Print the per-line markers of both passes")
                .action(clap::ArgAction::SetTrue),
        )
        .arg(
            Arg::new("json")
                .long("json")
                .help("Print the result as JSON")
                .action(clap::ArgAction::SetTrue),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .help("Enable verbose logging of extraction decisions")
                .action(clap::ArgAction::SetTrue),
        )
        .get_matches();

    let log_level = if matches.get_flag("verbose") {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };

    env_logger::Builder::from_default_env()
        .filter_level(log_level)
        .init();

    if let Some(generate_path) = matches.get_one::<String>("generate-config") {
        generate_default_config(generate_path);
        return;
    }

    let config = match load_config(matches.get_one::<String>("config")) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error loading configuration: {e}");
            process::exit(1);
        }
    };

    let quotation = match QuotationExtractor::new(config.clone()) {
        Ok(extractor) => extractor,
        Err(e) => {
            eprintln!("Invalid configuration: {e}");
            process::exit(1);
        }
    };

    if matches.get_flag("test-config") {
        println!("Configuration is valid.");
        println!("  signature_max_lines: {}", config.signature_max_lines);
        println!("  too_long_signature_line: {}", config.too_long_signature_line);
        println!("  splitter_max_lines: {}", config.splitter_max_lines);
        println!("  max_lines_count: {}", config.max_lines_count);
        println!("Splitters ({}):", quotation.cascade().patterns().len());
        for pattern in quotation.cascade().patterns() {
            println!("  {}: {}", pattern.priority + 1, pattern.name);
        }
        return;
    }

    let model = match load_model(
        matches.get_one::<String>("model"),
        matches.get_one::<String>("train"),
    ) {
        Ok(model) => model,
        Err(e) => {
            eprintln!("Error preparing line classifier: {e}");
            process::exit(1);
        }
    };

    if let Some(model_path) = matches.get_one::<String>("save-model") {
        match model.to_file(model_path) {
            Ok(()) => println!("Model written to: {model_path}"),
            Err(e) => {
                eprintln!("Error writing model file: {e}");
                process::exit(1);
            }
        }
        if matches.get_one::<String>("input").is_none() {
            return;
        }
    }

    let body = match read_input(matches.get_one::<String>("input")) {
        Ok(body) => body,
        Err(e) => {
            eprintln!("Error reading input: {e}");
            process::exit(1);
        }
    };

    let classifier = SharedClassifier::with_model(model);
    let signature = match SignatureExtractor::new(config) {
        Ok(extractor) => extractor,
        Err(e) => {
            eprintln!("Invalid configuration: {e}");
            process::exit(1);
        }
    };
    let sender = matches
        .get_one::<String>("sender")
        .map(String::as_str)
        .unwrap_or("");
    let show_markers = matches.get_flag("markers");

    let mut output = Output {
        result: ExtractionResult {
            text: body.clone(),
            signature: String::new(),
        },
        quotation_markers: None,
        signature_markers: None,
    };

    if !matches.get_flag("signature-only") {
        if show_markers {
            output.quotation_markers = Some(quotation.markers(&body).to_string());
        }
        output.result.text = quotation.extract(&body);
    }

    if !matches.get_flag("quotation-only") {
        let text = output.result.text.clone();
        if show_markers {
            match signature.markers(&text, sender, &classifier) {
                Ok(markers) => output.signature_markers = Some(markers.to_string()),
                Err(e) => {
                    eprintln!("Error marking signature lines: {e}");
                    process::exit(1);
                }
            }
        }
        match signature.extract(&text, sender, &classifier) {
            Ok(result) => output.result = result,
            Err(e) => {
                eprintln!("Error extracting signature: {e}");
                process::exit(1);
            }
        }
    }

    if matches.get_flag("json") {
        match serde_json::to_string_pretty(&output) {
            Ok(json) => println!("{json}"),
            Err(e) => {
                eprintln!("Error serializing result: {e}");
                process::exit(1);
            }
        }
    } else {
        print_output(&output);
    }
}

fn load_config(path: Option<&String>) -> anyhow::Result<ExtractionConfig> {
    match path {
        Some(path) if std::path::Path::new(path).exists() => Ok(ExtractionConfig::from_file(path)?),
        Some(path) => {
            log::warn!("Configuration file '{path}' not found, using default configuration");
            Ok(ExtractionConfig::default())
        }
        None => Ok(ExtractionConfig::default()),
    }
}

fn generate_default_config(path: &str) {
    let config = ExtractionConfig::default();
    match config.to_file(path) {
        Ok(()) => {
            println!("Default configuration written to: {path}");
            println!("Please edit the configuration file to suit your needs.");
        }
        Err(e) => {
            eprintln!("Error writing configuration file: {e}");
            process::exit(1);
        }
    }
}

fn load_model(model: Option<&String>, train: Option<&String>) -> anyhow::Result<LinearClassifier> {
    if let Some(data_path) = train {
        let samples = parse_training_data(&std::fs::read_to_string(data_path)?)?;
        log::info!("Training line classifier on {} samples from {data_path}", samples.len());
        return Ok(LinearClassifier::train(&samples, &TrainingOptions::default())?);
    }
    match model {
        Some(model_path) => Ok(LinearClassifier::from_file(model_path)?),
        None => Ok(LinearClassifier::default()),
    }
}

fn read_input(path: Option<&String>) -> std::io::Result<String> {
    match path.map(String::as_str) {
        Some(path) if path != "-" => std::fs::read_to_string(path),
        _ => {
            let mut body = String::new();
            std::io::stdin().read_to_string(&mut body)?;
            Ok(body)
        }
    }
}

fn print_output(output: &Output) {
    if let Some(markers) = &output.quotation_markers {
        println!("quotation markers: {markers}");
    }
    if let Some(markers) = &output.signature_markers {
        println!("signature markers: {markers}");
    }
    println!("{}", output.result.text);
    if output.result.has_signature() {
        println!();
        println!("-- signature --");
        println!("{}", output.result.signature);
    }
}
