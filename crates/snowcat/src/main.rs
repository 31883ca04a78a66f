//! snowcat: API Blueprint toolkit.
//!
//! Renders blueprints to HTML, JSON or expanded blueprint text, rebuilds on
//! change, serves the rendered page, and runs a mock server from the
//! declared example responses.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::{Arc, OnceLock};

use anyhow::{bail, Context};
use clap::{Args, Parser as _, Subcommand};

use snowcat_blueprint::{BlueprintParser, Document, Parser};
use snowcat_lib::config::{parse_bind_addr, WatchConfig};
use snowcat_lib::lint::{format_report, lint};
use snowcat_lib::pipeline::{Output, Pipeline};
use snowcat_lib::render::{Format, TemplateSource};
use snowcat_lib::serve::{self, mock_router, route_lines, static_router};
use snowcat_lib::watch::{ConsoleSink, RebuildCoordinator, RebuildSink, WatchSession};
use snowcat_router::{merge, Dispatcher};
use snowcat_telemetry::{log_shutdown, log_startup, LogFormat, TelemetryConfig};

/// Output file for `html` when watching or serving without `-o`.
const DEFAULT_HTML_OUTPUT: &str = "index.html";

fn version() -> &'static str {
    static VERSION: OnceLock<String> = OnceLock::new();
    VERSION.get_or_init(|| {
        format!(
            "{} (parser: {})",
            env!("CARGO_PKG_VERSION"),
            BlueprintParser::new().version()
        )
    })
}

#[derive(clap::Parser, Debug)]
#[command(name = "snowcat", about = "API Blueprint toolkit", version = version())]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Watch the input, its includes and the template, rebuilding on change.
    #[arg(short, long, global = true)]
    watch: bool,

    /// Poll for changes at this interval (e.g. 100ms, 1s) instead of using
    /// file-system notifications.
    #[arg(short = 'n', long, global = true, value_name = "DURATION")]
    watch_interval: Option<String>,

    /// Log level (overridden by RUST_LOG).
    #[arg(long, global = true, env = "SNOWCAT_LOG_LEVEL", default_value = "warn")]
    log_level: String,

    /// Log format (pretty or json).
    #[arg(long, global = true, env = "SNOWCAT_LOG_FORMAT", default_value_t = LogFormat::Pretty)]
    log_format: LogFormat,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Validate a blueprint and print its annotations.
    Lint {
        input: PathBuf,
    },

    /// Render HTML documentation.
    Html {
        input: PathBuf,

        #[command(flatten)]
        output: OutputArgs,

        /// Built-in template name (alpha, plain) or template file path.
        #[arg(short, long, default_value = "alpha")]
        template: String,

        /// Serve the rendered file over HTTP.
        #[arg(short = 's', long = "server")]
        server: bool,

        /// Listen address for the HTTP server.
        #[arg(short, long, default_value = ":8088")]
        bind: String,
    },

    /// Render the include-expanded blueprint.
    Apib {
        input: PathBuf,

        #[command(flatten)]
        output: OutputArgs,
    },

    /// Render the document model as JSON.
    Json {
        input: PathBuf,

        #[command(flatten)]
        output: OutputArgs,
    },

    /// List the mockable routes of one or more blueprints.
    List {
        #[arg(required = true, num_args = 1..)]
        inputs: Vec<PathBuf>,
    },

    /// Run a mock server answering with the declared example responses.
    Mock {
        #[arg(required = true, num_args = 1..)]
        inputs: Vec<PathBuf>,

        /// Listen address.
        #[arg(short, long, default_value = ":8087")]
        bind: String,
    },
}

#[derive(Args, Debug)]
struct OutputArgs {
    /// Output file (default: stdout).
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Suppress "has been generated!" notices.
    #[arg(short, long)]
    quiet: bool,
}

/// Everything a render command needs.
struct RenderJob {
    input: PathBuf,
    format: Format,
    output: OutputArgs,
    template: Option<String>,
    serve: Option<String>,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let telemetry = TelemetryConfig::new()
        .with_log_level(&cli.log_level)
        .with_log_format(cli.log_format);
    if let Err(e) = snowcat_telemetry::init(&telemetry) {
        eprintln!("error: {e}");
        return ExitCode::from(1);
    }

    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::from(1)
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<ExitCode> {
    let parser: Arc<dyn Parser> = Arc::new(BlueprintParser::new());
    let watch = if cli.watch {
        let config = WatchConfig::from_flag(cli.watch_interval.as_deref())
            .context("invalid value for --watch-interval")?;
        Some(config)
    } else {
        None
    };

    log_startup!(
        version = env!("CARGO_PKG_VERSION"),
        parser = parser.version(),
        "snowcat starting"
    );

    match cli.command {
        Command::Lint { input } => run_lint(&input, parser.as_ref()),
        Command::Html {
            input,
            output,
            template,
            server,
            bind,
        } => {
            let job = RenderJob {
                input,
                format: Format::Html,
                output,
                template: Some(template),
                serve: server.then_some(bind),
            };
            run_render(job, watch, parser).await
        }
        Command::Apib { input, output } => {
            let job = RenderJob {
                input,
                format: Format::Apib,
                output,
                template: None,
                serve: None,
            };
            run_render(job, watch, parser).await
        }
        Command::Json { input, output } => {
            let job = RenderJob {
                input,
                format: Format::Json,
                output,
                template: None,
                serve: None,
            };
            run_render(job, watch, parser).await
        }
        Command::List { inputs } => {
            let documents = load_all(&inputs, parser.as_ref())?;
            for line in route_lines(&merge(&documents)) {
                println!("{line}");
            }
            Ok(ExitCode::SUCCESS)
        }
        Command::Mock { inputs, bind } => run_mock(&inputs, &bind, parser.as_ref()).await,
    }
}

fn run_lint(input: &Path, parser: &dyn Parser) -> anyhow::Result<ExitCode> {
    let report = lint(input, parser)?;
    if report.is_empty() {
        println!("OK");
        return Ok(ExitCode::SUCCESS);
    }
    print!("{}", format_report(&report));
    Ok(ExitCode::from(1))
}

/// Render once, then optionally watch and/or serve the output until Ctrl-C.
async fn run_render(
    job: RenderJob,
    watch: Option<WatchConfig>,
    parser: Arc<dyn Parser>,
) -> anyhow::Result<ExitCode> {
    let long_running = watch.is_some() || job.serve.is_some();

    let output = match job.output.output {
        Some(path) => Output::File(path),
        None if long_running && job.format == Format::Html => {
            Output::File(PathBuf::from(DEFAULT_HTML_OUTPUT))
        }
        None => Output::Stdout,
    };

    let mut pipeline = Pipeline::new(&job.input, job.format, parser).with_output(output);
    if let Some(name) = &job.template {
        pipeline = pipeline.with_template(TemplateSource::resolve(name)?);
    }
    let sink = ConsoleSink::new(job.output.quiet);

    // A failed first render only aborts when there is no watch session to
    // pick up the fix.
    match pipeline.run() {
        Err(e) if watch.is_none() => return Err(e.into()),
        outcome => sink.report(&outcome),
    }

    let serve_addr = job.serve.as_deref().map(parse_bind_addr).transpose()?;
    let served_file = pipeline.output().path().map(Path::to_path_buf);
    let input = pipeline.input().to_path_buf();
    let template = pipeline.template_path().map(Path::to_path_buf);

    let session = match watch {
        Some(config) => {
            let coordinator = RebuildCoordinator::new(Arc::new(pipeline), Arc::new(sink))
                .with_interval(config.interval);
            let session = WatchSession::start(
                &config,
                &input,
                template.as_deref(),
                snowcat_blueprint::seeds,
                coordinator,
            )?;
            Some(session)
        }
        None => None,
    };

    let server = match (serve_addr, served_file) {
        (Some(addr), Some(file)) => {
            let shown = job.serve.as_deref().unwrap_or_default();
            Some(start_static(addr, shown, file).await?)
        }
        (Some(_), None) => bail!("serving requires an output file"),
        (None, _) => None,
    };

    match (session, server) {
        (Some(session), Some(server)) => {
            tokio::select! {
                _ = session.run() => {}
                result = server => result?,
            }
        }
        (Some(session), None) => {
            tokio::select! {
                _ = session.run() => {}
                _ = tokio::signal::ctrl_c() => {
                    log_shutdown!("interrupted");
                }
            }
        }
        (None, Some(server)) => server.await?,
        (None, None) => {}
    }

    Ok(ExitCode::SUCCESS)
}

/// Bind the static server and return its serve future.
async fn start_static(
    addr: SocketAddr,
    shown: &str,
    file: PathBuf,
) -> anyhow::Result<impl std::future::Future<Output = Result<(), serve::ServeError>>> {
    let listener = serve::bind(addr).await?;
    println!("snowcat: listening on {shown}");
    Ok(serve::serve(listener, static_router(file)))
}

async fn run_mock(inputs: &[PathBuf], bind: &str, parser: &dyn Parser) -> anyhow::Result<ExitCode> {
    let addr = parse_bind_addr(bind)?;
    let documents = load_all(inputs, parser)?;
    let table = merge(&documents);

    let listener = serve::bind(addr).await?;
    println!("Mock server is ready. Use {}", listener.local_addr()?);
    println!("Available Routes:");
    for line in route_lines(&table) {
        println!("{line}");
    }

    let router = mock_router(Arc::new(Dispatcher::new(table)));
    serve::serve(listener, router).await?;
    Ok(ExitCode::SUCCESS)
}

fn load_all(inputs: &[PathBuf], parser: &dyn Parser) -> anyhow::Result<Vec<Document>> {
    inputs
        .iter()
        .map(|path| {
            snowcat_blueprint::load(path, parser)
                .with_context(|| format!("failed to load {}", path.display()))
        })
        .collect()
}
