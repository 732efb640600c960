use clap::Parser;
use spectrofeat::{Cli, OutputFormatter, OutputMode, SpectroFeat, SpectroFeatError, UserFriendlyError};
use std::io::IsTerminal;
use std::process;
use tracing_subscriber::EnvFilter;

fn main() {
    let exit_code = run();
    process::exit(exit_code);
}

fn run() -> i32 {
    // Parse CLI arguments
    let cli = Cli::parse();
    setup_logging(cli.verbosity_level());

    // Handle special commands first
    if cli.generate_config {
        return handle_generate_config(&cli);
    }

    let app = match SpectroFeat::from_cli(&cli) {
        Ok(app) => app,
        Err(e) => {
            print_startup_error(&e, cli.output_format.into());
            return exit_code_for(&e);
        }
    };

    if cli.dry_run {
        return handle_dry_run(&app);
    }

    app.output_formatter()
        .print_header(&format!("SpectroFeat {}", spectrofeat::version_info()));

    let extractor = match app.load_extractor() {
        Ok(extractor) => extractor,
        Err(e) => {
            app.handle_error(&e);
            return exit_code_for(&e);
        }
    };

    match app.run(&extractor) {
        Ok(reports) => {
            if reports.iter().any(|r| r.has_warnings()) {
                2 // Tables written, but some images failed or a table is empty
            } else {
                0
            }
        }
        Err(e) => {
            app.handle_error(&e);
            exit_code_for(&e)
        }
    }
}

fn exit_code_for(error: &SpectroFeatError) -> i32 {
    match error {
        SpectroFeatError::Cancelled => 130, // Interrupted (SIGINT)
        SpectroFeatError::InvalidPath { .. } => 3,
        SpectroFeatError::ModelLoad { .. } | SpectroFeatError::Device { .. } => 4,
        SpectroFeatError::InvalidClassFolder { .. } => 5,
        SpectroFeatError::Config { .. } => 6,
        _ => 1, // General error
    }
}

/// Diagnostic events go to stderr; `RUST_LOG` wins over `-v`.
fn setup_logging(verbosity: u8) {
    let default_directive = match verbosity {
        0 => "spectrofeat=warn",
        1 => "spectrofeat=info",
        _ => "spectrofeat=debug",
    };

    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive)),
        )
        .with_writer(std::io::stderr)
        .with_ansi(std::io::stderr().is_terminal())
        .with_target(false)
        .try_init();
}

fn handle_generate_config(cli: &Cli) -> i32 {
    let config_path = cli
        .config
        .as_ref()
        .map(|p| p.to_string_lossy().to_string())
        .unwrap_or_else(|| "spectrofeat.toml".to_string());

    match SpectroFeat::generate_sample_config(&config_path) {
        Ok(()) => {
            println!("Generated sample configuration file: {}", config_path);
            println!("\nTo use this configuration:");
            println!("  spectrofeat --config {}", config_path);
            println!("\nEdit the file to point at your spectrograms and model weights.");
            0
        }
        Err(e) => {
            eprintln!("Failed to generate configuration file: {}", e.user_message());
            if let Some(suggestion) = e.suggestion() {
                eprintln!("Suggestion: {}", suggestion);
            }
            1
        }
    }
}

fn handle_dry_run(app: &SpectroFeat) -> i32 {
    let formatter = app.output_formatter();

    formatter.info("DRY RUN MODE - the model will not be loaded and no tables written");
    formatter.print_separator();

    let config = app.config();
    formatter.info("Configuration that would be used:");
    println!("  Spectrogram root: {}", config.dataset.spectrogram_dir.display());
    println!("  Modalities: {}", config.dataset.modalities.join(", "));
    println!("  Image extension: .{}", config.dataset.image_extension);
    println!("  Model: {} ({})", config.model.architecture, config.model.weights.display());
    println!("  Input size: {}x{}", config.model.image_size, config.model.image_size);
    println!("  Device: {:?}", config.model.device);

    if !config.model.weights.is_file() {
        formatter.warning(&format!(
            "Weights file not found: {}",
            config.model.weights.display()
        ));
    }

    formatter.print_separator();

    let plans = match app.plan() {
        Ok(plans) => plans,
        Err(e) => {
            formatter.print_user_friendly_error(&e);
            return exit_code_for(&e);
        }
    };

    formatter.info("Extraction plan:");
    for plan in &plans {
        println!("  {}: {}", plan.modality, plan.input_root.display());
        print!("{}", indent(&plan.statistics.display_summary(), "    "));
        println!("    Output: {}", plan.output_path.display());
        if !plan.malformed_folders.is_empty() {
            formatter.warning(&format!(
                "Would skip folders without a class label: {}",
                plan.malformed_folders.join(", ")
            ));
        }
    }

    formatter.print_separator();
    formatter.success("Dry run completed successfully");
    formatter.info("Run without --dry-run to extract features");

    0
}

fn indent(text: &str, prefix: &str) -> String {
    text.lines()
        .map(|line| format!("{}{}\n", prefix, line))
        .collect()
}

fn print_startup_error(error: &SpectroFeatError, mode: OutputMode) {
    // Create a basic formatter for startup errors
    let formatter = OutputFormatter::new(mode, 0, false);
    formatter.print_user_friendly_error(error);
}
