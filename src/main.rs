use std::{collections::HashMap, path::PathBuf, sync::Arc};

use argh::FromArgs;
use curb_sign::{
    AnalysisResult, PipelineConfig, PromptSet, SignAnalysisPipeline,
    api::{self, AppState},
    config,
};

// defaults for the server
const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PROMPTS_DIR: &str = "prompts";

#[derive(FromArgs)]
/// Reads curb-regulation signs with a remote multimodal model.
struct CurbSignArgs {
    #[argh(subcommand)]
    command: Commands,
}

#[derive(FromArgs)]
#[argh(subcommand)]
enum Commands {
    Serve(ServeCommand),
    Analyze(AnalyzeCommand),
}

#[derive(FromArgs)]
/// Run the HTTP server
#[argh(subcommand, name = "serve")]
struct ServeCommand {
    /// the host to run the server on
    #[argh(option, short = 'h', default = "DEFAULT_HOST.to_string()")]
    host: String,

    /// the port to run the server on (defaults to $PORT, then 8080)
    #[argh(option, short = 'p', default = "config::port_from_env()")]
    port: u16,

    /// directory holding the prompt stage files
    #[argh(option, default = "PathBuf::from(DEFAULT_PROMPTS_DIR)")]
    prompts: PathBuf,
}

#[derive(FromArgs)]
/// Analyze a local image and print each stage's answer
#[argh(subcommand, name = "analyze")]
struct AnalyzeCommand {
    /// the path to the sign image
    #[argh(option, short = 'i')]
    image: PathBuf,

    /// directory holding the prompt stage files
    #[argh(option, default = "PathBuf::from(DEFAULT_PROMPTS_DIR)")]
    prompts: PathBuf,

    /// vehicle type substituted into the prompts
    #[argh(option)]
    vehicle_type: Option<String>,

    /// date substituted into the prompts
    #[argh(option)]
    date: Option<String>,

    /// time substituted into the prompts
    #[argh(option)]
    time: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv::dotenv().ok();
    env_logger::init();
    let args: CurbSignArgs = argh::from_env();

    let config = PipelineConfig::from_env()?;
    log::debug!("Using {config:?}");
    let pipeline = SignAnalysisPipeline::from_config(&config);

    match args.command {
        Commands::Serve(cmd) => serve(cmd, pipeline).await,
        Commands::Analyze(cmd) => analyze(cmd, pipeline).await,
    }
}

async fn serve(
    cmd: ServeCommand,
    pipeline: SignAnalysisPipeline,
) -> Result<(), Box<dyn std::error::Error>> {
    let prompts = PromptSet::load(&cmd.prompts)?;
    let stages = prompts.len();
    let app = api::router(Arc::new(AppState::new(pipeline, prompts)));

    // format the host and port
    let addr = format!("{}:{}", cmd.host, cmd.port);

    log::info!("🚀 Starting the server with {stages} prompt stage(s)");
    log::info!("🔥 Listening on: {}", addr);
    log::info!("🔧 Press Ctrl+C to stop the server");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

async fn analyze(
    cmd: AnalyzeCommand,
    pipeline: SignAnalysisPipeline,
) -> Result<(), Box<dyn std::error::Error>> {
    let prompts = PromptSet::load(&cmd.prompts)?;

    let variables: HashMap<String, String> = [
        ("vehicle_type", cmd.vehicle_type),
        ("date", cmd.date),
        ("time", cmd.time),
    ]
    .into_iter()
    .filter_map(|(name, value)| value.map(|v| (name.to_string(), v)))
    .collect();

    match pipeline.analyze(&cmd.image, &prompts.bind(&variables)).await {
        AnalysisResult::Success(responses) => {
            for (n, response) in responses.iter().enumerate() {
                println!("{}", "=".repeat(50));
                println!("STAGE {} RESULT ({:?}):", n + 1, response.duration);
                println!("{}", "=".repeat(50));
                println!("{}\n", response.text);
            }
            Ok(())
        }
        AnalysisResult::Error(err) => {
            log::error!("Stage {} failed during {}", err.stage + 1, err.step);
            Err(err.into())
        }
    }
}
