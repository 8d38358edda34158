use clap::Parser;
use mesh2glb::domain::ports::ConfigProvider;
use mesh2glb::utils::{logger, validation::Validate};
use mesh2glb::{
    CliConfig, ConversionDriver, ConversionReport, ConversionRequest, LocalStorage, NativeHost,
    Result, Scene, TomlConfig,
};

fn main() {
    let cli = CliConfig::parse();
    let settings = cli.load_settings();

    // 配置載入失敗時仍以命令列旗標初始化日誌
    let (json_logs, verbose) = match &settings {
        Ok(settings) => (settings.logging.json, settings.logging.verbose),
        Err(_) => (cli.json_logs, cli.verbose),
    };
    if json_logs {
        logger::init_json_logger(verbose);
    } else {
        logger::init_cli_logger(verbose);
    }

    tracing::info!("Starting mesh2glb");
    if verbose {
        tracing::debug!("CLI config: {:?}", cli);
    }

    let exit_code = match settings.and_then(|settings| convert(&cli, &settings)) {
        Ok(report) => {
            tracing::info!("✅ Conversion completed: {}", report);
            println!("✅ {}", report);
            0
        }
        Err(e) => {
            tracing::error!(
                "❌ Conversion failed: {} (Category: {:?}, Severity: {:?})",
                e,
                e.category(),
                e.severity()
            );
            tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());

            eprintln!("❌ {}", e.user_friendly_message());
            eprintln!("💡 {}", e.recovery_suggestion());
            e.exit_code()
        }
    };

    std::process::exit(exit_code);
}

fn convert(cli: &CliConfig, settings: &TomlConfig) -> Result<ConversionReport> {
    settings.validate().map_err(|e| {
        tracing::error!("❌ Configuration validation failed: {}", e);
        e
    })?;

    let request = ConversionRequest::from_args(cli.paths.as_slice())?;

    if settings.monitoring_enabled() {
        tracing::info!("🔍 System monitoring enabled");
    }

    let host = NativeHost::new(LocalStorage::default(), settings);
    let mut driver = ConversionDriver::new_with_monitoring(host, settings.monitoring_enabled());
    let mut scene = Scene::default();

    driver.run(&mut scene, &request)
}
