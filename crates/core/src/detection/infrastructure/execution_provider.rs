use crate::detection::domain::detector_options::Delegate;

/// Execution providers for the requested delegate.
///
/// `Gpu` picks the platform's accelerated provider; an empty list means
/// ONNX Runtime's default CPU provider.
pub fn execution_providers_for(
    delegate: Delegate,
) -> Vec<ort::execution_providers::ExecutionProviderDispatch> {
    match delegate {
        Delegate::Cpu => Vec::new(),
        Delegate::Gpu => preferred_execution_providers(),
    }
}

fn preferred_execution_providers() -> Vec<ort::execution_providers::ExecutionProviderDispatch> {
    #[cfg(target_os = "macos")]
    {
        vec![ort::execution_providers::CoreMLExecutionProvider::default().build()]
    }
    #[cfg(target_os = "windows")]
    {
        vec![ort::execution_providers::DirectMLExecutionProvider::default().build()]
    }
    #[cfg(not(any(target_os = "macos", target_os = "windows")))]
    {
        log::debug!("No accelerated execution provider on this platform, using CPU");
        vec![]
    }
}
