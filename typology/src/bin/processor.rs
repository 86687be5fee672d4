use std::{error::Error, path::Path, sync::Arc, time::Duration};

use typology::{
    dispatch::HttpDispatcher,
    executable_utils::{initialize_executable, install_metrics_exporter, run_processor},
    processor::TypologyProcessor,
    scorers::ExpressionBasedScorer,
    storage::{InMemoryAccumulator, InMemoryTypologyRepository},
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error + Send + Sync>> {
    let config = initialize_executable()?;

    if let Some(address) = &config.processor.metrics_address {
        install_metrics_exporter(address)?;
    }

    // Typology definitions
    let repository = Arc::new(InMemoryTypologyRepository::from_file(Path::new(
        &config.processor.typologies_path,
    ))?);

    // Downstream channels
    let dispatcher = Arc::new(HttpDispatcher::new(&config.processor.channels)?);

    // Interim rule results
    let store = Arc::new(match config.processor.accumulator_ttl_secs {
        Some(secs) => InMemoryAccumulator::with_ttl(Duration::from_secs(secs)),
        None => InMemoryAccumulator::new(),
    });

    let processor = Arc::new(TypologyProcessor::new(
        ExpressionBasedScorer::new(),
        store,
        repository,
        dispatcher,
        config.processor.channels.interdiction_name.clone(),
    ));

    run_processor(config.processor, processor).await
}
