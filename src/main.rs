//! Training job service demonstration
//!
//! Runs a simulated computation engine through the three ways of using a
//! training service: synchronous training, asynchronous training polled until
//! completion, and asynchronous training terminated early.

use serde_json::json;
use std::thread;
use std::time::Duration;
use threaded_train_jobs::request::{DeleteRequest, PollRequest};
use threaded_train_jobs::{
    ApiData, EngineOutput, ServiceConfig, TrainContext, TrainOutcome,
    TrainRequest, TrainingService,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};


/// Simulated engine, whose loss decays geometrically over `iterations`
/// iterations of `step_ms` milliseconds each
fn simulated_engine(params: &ApiData, ctx: &mut TrainContext) -> EngineOutput {
    let mllib = params.get("parameters")
                      .and_then(|p| p.get("mllib"));
    let setting = |key: &str, default: u64| {
        mllib.and_then(|m| m.get(key))
             .and_then(|v| v.as_u64())
             .unwrap_or(default)
    };
    let iterations = setting("iterations", 20);
    let step = Duration::from_millis(setting("step_ms", 50));

    let mut loss = 1.0;
    let mut done = 0;
    while done < iterations && ctx.keep_running() {
        thread::sleep(step);
        loss *= 0.8;
        ctx.report_loss(loss);
        done += 1;
    }

    let mut result = ApiData::new();
    result.insert("iterations".into(), done.into());
    EngineOutput::with_result(0, result)
}


fn launch<E: threaded_train_jobs::TrainingEngine>(
    service: &TrainingService<E>,
    request: &TrainRequest,
) -> anyhow::Result<threaded_train_jobs::JobId> {
    match service.train(request)? {
        TrainOutcome::Launched(id) => Ok(id),
        TrainOutcome::Completed { .. } => {
            anyhow::bail!("asynchronous training ran synchronously")
        }
    }
}


fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "threaded_train_jobs=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let service = TrainingService::new(ServiceConfig::from_env(),
                                       simulated_engine);
    println!("{}", serde_json::to_string(&service.info())?);

    // Synchronous training
    let request = TrainRequest::from_api(&json!({
        "parameters": {
            "mllib": {"iterations": 5, "step_ms": 10},
            "output": {"loss_hist": true},
        },
    }))?;
    if let TrainOutcome::Completed { code, result } = service.train(&request)? {
        println!("synchronous training: code {} {}", code, json!(result));
    }

    // Asynchronous training, polled until completion
    let request = TrainRequest::from_api(&json!({"async": true}))?;
    let id = launch(&service, &request)?;
    loop {
        let poll = PollRequest::from_api(&json!({"job": id, "timeout": 1}))?;
        let report = service.job_status(poll.job,
                                         poll.timeout,
                                         poll.loss_history)?;
        println!("job {}: {}", id, serde_json::to_string(&report)?);
        if report.status.is_terminal() {
            break;
        }
    }

    // Asynchronous training, terminated early
    let request = TrainRequest::from_api(&json!({
        "async": true,
        "parameters": {"mllib": {"iterations": 1000}},
    }))?;
    let id = launch(&service, &request)?;
    thread::sleep(Duration::from_millis(200));
    println!("{}", serde_json::to_string(&service.status())?);
    let delete = DeleteRequest::from_api(&json!({"job": id}))?;
    let report = service.delete_job(delete.job)?;
    println!("job {}: {}", id, serde_json::to_string(&report)?);

    service.shutdown();
    Ok(())
}
