#[derive(Clone)]
struct AppState {
    inner: std::sync::Arc<Mutex<ServerInner>>,
}

impl AppState {
    fn new() -> Self {
        Self {
            inner: std::sync::Arc::new(Mutex::new(ServerInner::default())),
        }
    }
}

/// One active run per process; POST /runs replaces it. The whole engine
/// sits behind the run lock, so advancement is serialized per process.
#[derive(Debug, Default)]
struct ServerInner {
    engine: Option<EngineApi>,
}

fn require_run<'a>(
    inner: &'a ServerInner,
    run_id: &str,
) -> Result<&'a EngineApi, HttpApiError> {
    match inner.engine.as_ref() {
        Some(engine) if engine.run_id() == run_id => Ok(engine),
        Some(engine) => Err(HttpApiError::run_not_found(run_id, Some(engine.run_id()))),
        None => Err(HttpApiError::run_not_found(run_id, None)),
    }
}

fn require_run_mut<'a>(
    inner: &'a mut ServerInner,
    run_id: &str,
) -> Result<&'a mut EngineApi, HttpApiError> {
    match inner.engine.as_mut() {
        Some(engine) if engine.run_id() == run_id => Ok(engine),
        Some(engine) => {
            let active = engine.run_id().to_string();
            Err(HttpApiError::run_not_found(run_id, Some(&active)))
        }
        None => Err(HttpApiError::run_not_found(run_id, None)),
    }
}
