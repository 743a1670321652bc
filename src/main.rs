use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use ssot_forge::api::{self, GatewayState, LoginState};
use ssot_forge::auth::{self, TokenIssuer};
use ssot_forge::config::{AuthConfig, GatewayConfig, GeneratorConfig, LoginConfig};
use ssot_forge::db::Database;
use ssot_forge::generate::{CodeGenerator, GenMode, Scope, SpecDocGenerator, SsotKind};
use ssot_forge::llm::OpenAiClient;
use ssot_forge::models::{CreateAccountInput, DEFAULT_ROLE};
use ssot_forge::ssot::lint::{self, CheckOutcome, FeatureLintReport};
use ssot_forge::ssot::SsotIndex;

#[derive(Parser)]
#[command(name = "ssot")]
#[command(about = "Generate code and SSOT documents from feature specifications")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate code artifacts from the SSOT index
    Generate {
        /// Feature id from the index
        feature: Option<String>,

        /// Generate every feature in the index
        #[arg(long, conflicts_with = "feature")]
        all: bool,

        /// Modes to generate (default: all)
        #[arg(long, num_args = 1.., value_enum)]
        modes: Vec<GenMode>,

        /// Directory holding ssot_index.yaml
        #[arg(long)]
        base_dir: Option<PathBuf>,

        /// Root for generated artifacts
        #[arg(long)]
        output_dir: Option<PathBuf>,
    },
    /// Generate SSOT documents from a feature specification
    SsotDocs {
        /// Feature id
        feature: String,

        /// Document kinds to generate (default: all)
        #[arg(long, num_args = 1.., value_enum)]
        kinds: Vec<SsotKind>,

        /// Feature specification path (default: <specs-dir>/<feature>_feature_spec.yaml)
        #[arg(long)]
        spec: Option<PathBuf>,
    },
    /// Check SSOT index paths and field consistency
    Lint {
        /// Directory holding ssot_index.yaml
        #[arg(long)]
        base_dir: Option<PathBuf>,

        /// Print reports as JSON
        #[arg(long)]
        json: bool,
    },
    /// Run one of the HTTP services
    Serve {
        service: Service,

        #[arg(long, default_value = "127.0.0.1")]
        host: String,

        /// Port (default depends on the service)
        #[arg(short, long)]
        port: Option<u16>,

        /// Create the demonstration account if missing (login only)
        #[arg(long)]
        seed_demo: bool,

        /// Sign tokens with a fixed development secret when JWT_SECRET_KEY is unset
        #[arg(long)]
        dev_secret: bool,
    },
    /// Manage login accounts
    Account {
        #[command(subcommand)]
        command: AccountCommand,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum Service {
    Recommend,
    Gateway,
    Login,
}

impl Service {
    fn default_port(&self) -> u16 {
        match self {
            Self::Recommend => 8000,
            Self::Gateway => 5000,
            Self::Login => 8001,
        }
    }
}

#[derive(Subcommand)]
enum AccountCommand {
    /// Create an account
    Create {
        #[arg(long)]
        user_id: String,
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
        #[arg(long, default_value = DEFAULT_ROLE)]
        role: String,
    },
    /// Clear the lock and failure counter of an account
    Unlock { email: String },
}

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::new(
        std::env::var("RUST_LOG").unwrap_or_else(|_| "ssot_forge=debug,tower_http=debug".into()),
    );

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn generator_config(base_dir: Option<PathBuf>) -> GeneratorConfig {
    match base_dir {
        Some(dir) => GeneratorConfig::with_base_dir(dir),
        None => GeneratorConfig::from_env(),
    }
}

fn open_login_db(config: &LoginConfig) -> anyhow::Result<Database> {
    let db = Database::open_or_default(config.db_path.clone())?;
    db.migrate()?;
    Ok(db)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let cli = Cli::parse();

    match cli.command {
        Commands::Generate {
            feature,
            all,
            modes,
            base_dir,
            output_dir,
        } => {
            let scope = match (feature, all) {
                (_, true) => Scope::All,
                (Some(id), false) => Scope::Feature(id),
                (None, false) => anyhow::bail!("Specify a feature id or --all"),
            };
            let modes = if modes.is_empty() {
                GenMode::ALL.to_vec()
            } else {
                modes
            };

            let mut config = generator_config(base_dir);
            if let Some(dir) = output_dir {
                config.output_dir = dir;
            }

            let index = SsotIndex::load(&config.index_path())?;
            let llm = OpenAiClient::from_env()?;
            let generator = CodeGenerator::new(index, &config.output_dir, Box::new(llm));

            let written = generator.run(&scope, &modes).await?;
            for path in written {
                println!("{}", path.display());
            }
        }
        Commands::SsotDocs {
            feature,
            kinds,
            spec,
        } => {
            let kinds = if kinds.is_empty() {
                SsotKind::ALL.to_vec()
            } else {
                kinds
            };

            let config = GeneratorConfig::from_env();
            let llm = OpenAiClient::from_env()?;
            let generator = SpecDocGenerator::new(
                &config.specs_dir,
                &config.auto_features_dir,
                Box::new(llm),
            );

            let written = generator
                .generate(&feature, spec.as_deref(), &kinds)
                .await?;
            for path in written {
                println!("{}", path.display());
            }
        }
        Commands::Lint { base_dir, json } => {
            let config = generator_config(base_dir);
            let index = SsotIndex::load(&config.index_path())?;
            let reports = lint::lint_index(&index);

            if json {
                println!("{}", serde_json::to_string_pretty(&reports)?);
            } else {
                for report in &reports {
                    print_lint_report(report);
                }
            }
        }
        Commands::Serve {
            service,
            host,
            port,
            seed_demo,
            dev_secret,
        } => {
            let port = port.unwrap_or_else(|| service.default_port());
            let tokens = TokenIssuer::new(&AuthConfig::from_env(dev_secret)?);

            let app = match service {
                Service::Recommend => api::recommend_router(tokens),
                Service::Gateway => {
                    api::gateway_router(GatewayState::new(tokens, GatewayConfig::from_env()))
                }
                Service::Login => {
                    let config = LoginConfig::from_env();
                    let db = open_login_db(&config)?;
                    if seed_demo && auth::seed_demo_account(&db, config.bcrypt_cost)? {
                        tracing::info!("Seeded demonstration account {}", auth::DEMO_EMAIL);
                    }
                    api::login_router(LoginState { db, tokens, config })
                }
            };

            let addr = format!("{}:{}", host, port);
            let listener = tokio::net::TcpListener::bind(&addr)
                .await
                .with_context(|| format!("Failed to bind {}", addr))?;
            tracing::info!("Listening on http://{}", addr);

            axum::serve(listener, app).await?;
        }
        Commands::Account { command } => {
            let config = LoginConfig::from_env();
            let db = open_login_db(&config)?;

            match command {
                AccountCommand::Create {
                    user_id,
                    email,
                    password,
                    role,
                } => {
                    let input = CreateAccountInput {
                        user_id,
                        email,
                        password,
                        role,
                    };
                    let account = auth::create_account(&db, &input, config.bcrypt_cost)?;
                    println!("Created account {} ({})", account.user_id, account.email);
                }
                AccountCommand::Unlock { email } => {
                    if !db.unlock_account(&email)? {
                        anyhow::bail!("No account with email {}", email);
                    }
                    println!("Unlocked {}", email);
                }
            }
        }
    }

    Ok(())
}

fn print_lint_report(report: &FeatureLintReport) {
    println!("== {} ==", report.feature_id);

    for check in &report.paths {
        match (&check.path, check.exists) {
            (Some(path), true) => println!("  [ok]      {}: {}", check.label, path.display()),
            (Some(path), false) => println!("  [missing] {}: {}", check.label, path.display()),
            (None, _) => println!("  [missing] {}: not declared", check.label),
        }
    }

    match &report.api_vs_validation {
        CheckOutcome::Compared(diff) => {
            println!("  api vs validation ({}):", diff.api_path);
            println!("    only in api: {:?}", diff.only_in_api);
            println!("    only in validation: {:?}", diff.only_in_other);
        }
        other => print_outcome("api vs validation", other),
    }

    match &report.api_vs_testcases {
        CheckOutcome::Compared((api_path, cases)) => {
            println!("  api vs testcases ({}):", api_path);
            for case in cases {
                println!(
                    "    {}: missing {:?}, extra {:?}",
                    case.id, case.missing_fields, case.extra_fields
                );
            }
        }
        other => print_outcome("api vs testcases", other),
    }

    println!(
        "  result: {}",
        if report.is_clean() { "clean" } else { "issues found" }
    );
}

fn print_outcome<T>(label: &str, outcome: &CheckOutcome<T>) {
    match outcome {
        CheckOutcome::NoApiPaths => println!("  {}: api spec has no paths", label),
        CheckOutcome::Skipped => println!("  {}: skipped", label),
        CheckOutcome::Failed(reason) => println!("  {}: failed ({})", label, reason),
        CheckOutcome::Compared(_) => {}
    }
}
