mod batch;
mod deepseek;
mod isolate;
mod traits;

pub use batch::split_batches;
pub use deepseek::DeepSeekTranslator;
pub use isolate::SpanVault;
pub use traits::{Translator, TranslatorInfo};

use crate::config::TranslatorConfig;
use crate::error::Result;
use std::sync::Arc;

/// Create a translator from configuration
pub fn create_translator(config: &TranslatorConfig) -> Result<Arc<dyn Translator>> {
    Ok(Arc::new(DeepSeekTranslator::new(config.clone())))
}
