use crate::model::Regressor;
use crossbeam::channel::{self, Receiver, Sender};
use fish_core::{NUM_FEATURES, PredictorError, PredictorResult};
use log::{debug, info};
use onnxruntime::environment::Environment;
use onnxruntime::ndarray::Array2;
use onnxruntime::session::Session;
use onnxruntime::tensor::OrtOwnedTensor;
use onnxruntime::{GraphOptimizationLevel, LoggingLevel};
use std::path::{Path, PathBuf};
use std::thread;

struct Job {
    row: [f32; NUM_FEATURES],
    reply: Sender<Result<f64, String>>,
}

/// ONNX graph evaluated on a dedicated thread that owns the session.
pub struct OnnxRegressor {
    jobs: Sender<Job>,
}

impl OnnxRegressor {
    /// Blocks until the session thread has loaded the graph or failed to.
    pub fn spawn(path: &Path, threads: i16) -> PredictorResult<Self> {
        let (job_tx, job_rx) = channel::unbounded();
        let (ready_tx, ready_rx) = channel::bounded(1);
        let model_path = path.to_path_buf();

        thread::Builder::new()
            .name("onnx-session".to_string())
            .spawn(move || run_session(model_path, threads, job_rx, ready_tx))
            .map_err(|e| {
                PredictorError::ArtifactCorrupt(format!("cannot start ONNX session thread: {}", e))
            })?;

        match ready_rx.recv() {
            Ok(Ok(())) => Ok(Self { jobs: job_tx }),
            Ok(Err(msg)) => Err(PredictorError::ArtifactCorrupt(msg)),
            Err(_) => Err(PredictorError::ArtifactCorrupt(
                "ONNX session thread exited while loading".to_string(),
            )),
        }
    }
}

impl Regressor for OnnxRegressor {
    fn predict(&self, row: &[f64; NUM_FEATURES]) -> PredictorResult<f64> {
        let (reply_tx, reply_rx) = channel::bounded(1);
        let job = Job {
            row: row.map(|v| v as f32),
            reply: reply_tx,
        };

        self.jobs
            .send(job)
            .map_err(|_| PredictorError::InferenceError("ONNX session thread has stopped".to_string()))?;

        match reply_rx.recv() {
            Ok(result) => result.map_err(PredictorError::InferenceError),
            Err(_) => Err(PredictorError::InferenceError(
                "ONNX session dropped the request".to_string(),
            )),
        }
    }

    fn kind(&self) -> &str {
        "onnx"
    }
}

fn run_session(
    model_path: PathBuf,
    threads: i16,
    jobs: Receiver<Job>,
    ready: Sender<Result<(), String>>,
) {
    let environment = match Environment::builder()
        .with_name("fish_price_inference")
        .with_log_level(LoggingLevel::Warning)
        .build()
    {
        Ok(environment) => environment,
        Err(e) => {
            let _ = ready.send(Err(format!("ONNX environment: {}", e)));
            return;
        }
    };

    let session = environment
        .new_session_builder()
        .and_then(|builder| builder.with_optimization_level(GraphOptimizationLevel::All))
        .and_then(|builder| builder.with_number_threads(threads))
        .and_then(|builder| builder.with_model_from_file(model_path.clone()));

    let mut session = match session {
        Ok(session) => session,
        Err(e) => {
            let _ = ready.send(Err(format!("cannot load ONNX graph: {}", e)));
            return;
        }
    };

    info!("ONNX session ready for {}", model_path.display());
    if ready.send(Ok(())).is_err() {
        return;
    }

    while let Ok(job) = jobs.recv() {
        let result = run_row(&mut session, job.row);
        debug!("ONNX row {:?} -> {:?}", job.row, result);
        let _ = job.reply.send(result);
    }

    debug!("ONNX session thread exiting");
}

fn run_row(session: &mut Session<'_>, row: [f32; NUM_FEATURES]) -> Result<f64, String> {
    let input = Array2::from_shape_vec((1, NUM_FEATURES), row.to_vec()).map_err(|e| e.to_string())?;

    let outputs: Vec<OrtOwnedTensor<f32, _>> = session.run(vec![input]).map_err(|e| e.to_string())?;
    let tensor = outputs.first().ok_or("model produced no outputs")?;

    tensor
        .iter()
        .next()
        .map(|value| f64::from(*value))
        .ok_or_else(|| "model produced an empty tensor".to_string())
}
