use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use clinic_admin::auth::{
    Authenticator, FileTokenStore, LoginOutcome, Session, SessionStatus, TokenStore,
};
use clinic_admin::config::Config;
use clinic_admin::gateway::{GatewayClient, NewAppointment, NewUser, Payload};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "clinic-admin")]
#[command(about = "admin client for the clinic platform: keycloak login + api gateway calls")]
struct Args {
    #[command(flatten)]
    config: Config,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Log in with username/password (keycloak password grant)
    Login {
        #[arg(short, long)]
        username: String,
        #[arg(short, long)]
        password: String,
    },
    /// Print the authorization-code login URL (optionally open a browser)
    LoginUrl {
        /// Open the URL in the system browser
        #[arg(long)]
        open: bool,
    },
    /// Clear stored tokens
    Logout,
    /// Show authentication status and decoded token claims
    Status,
    /// Manually store an access token (testing escape hatch)
    SetToken { token: String },
    /// Probe the gateway's health endpoint (no auth required)
    Health,
    /// User management
    Users {
        #[command(subcommand)]
        command: UsersCommand,
    },
    /// Appointment management
    Appointments {
        #[command(subcommand)]
        command: AppointmentsCommand,
    },
    /// Image management
    Images {
        #[command(subcommand)]
        command: ImagesCommand,
    },
}

#[derive(Subcommand, Debug)]
enum UsersCommand {
    /// List all users
    List,
    /// Show (and create on first contact) the logged-in user
    Me,
    /// Create a user
    Create {
        #[arg(long)]
        name: String,
        #[arg(long)]
        email: String,
        #[arg(long, default_value = "PATIENT")]
        role: String,
    },
}

#[derive(Subcommand, Debug)]
enum AppointmentsCommand {
    /// List all appointments
    List,
    /// Create an appointment
    Create {
        #[arg(long)]
        patient_id: String,
        #[arg(long)]
        patient_name: String,
        #[arg(long)]
        doctor_id: String,
        #[arg(long)]
        doctor_name: String,
        #[arg(long)]
        specialty: String,
        /// ISO-8601 date/time, e.g. 2026-09-01T10:30
        #[arg(long)]
        date: String,
        #[arg(long, default_value = "")]
        description: String,
    },
}

#[derive(Subcommand, Debug)]
enum ImagesCommand {
    /// List uploaded images
    List,
    /// Upload an image file (multipart)
    Upload { file: PathBuf },
    /// Download an image by id
    Get {
        id: String,
        /// Write the bytes here instead of just summarising them
        #[arg(long)]
        out: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file if present
    let _ = dotenvy::dotenv();

    let args = Args::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "clinic_admin=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let token_path = match &args.config.token_file {
        Some(path) => path.clone(),
        None => FileTokenStore::default_path()?,
    };
    let store: Arc<dyn TokenStore> = Arc::new(FileTokenStore::new(token_path));

    let gateway = GatewayClient::new(&args.config.gateway_url, store.clone());

    match args.command {
        Command::Login { username, password } => {
            let auth = Authenticator::new(args.config, store);
            match auth.login_with_password(&username, &password).await {
                LoginOutcome::Success(token) => {
                    println!("Logged in as {}", username);
                    if let Some(expires_in) = token.expires_in {
                        println!("Token expires in {} seconds", expires_in);
                    }
                }
                LoginOutcome::Failure { message } => bail!("Login failed: {}", message),
            }
        }
        Command::LoginUrl { open } => {
            let auth = Authenticator::new(args.config, store);
            let url = auth.authorize_url()?;
            println!("{}", url);
            if open {
                open::that(url.as_str()).context("failed to open browser")?;
            }
        }
        Command::Logout => {
            Session::new(store).logout()?;
            println!("Logged out");
        }
        Command::Status => {
            print_status(&Session::new(store));
        }
        Command::SetToken { token } => {
            store.save(&token, None, None)?;
            println!("Token stored");
        }
        Command::Health => {
            let health = gateway.health().await?;
            println!("{}", serde_json::to_string_pretty(&health)?);
        }
        Command::Users { command } => match command {
            UsersCommand::List => {
                ensure_user_exists(&gateway).await;
                print_payload(gateway.list_users().await?)?;
            }
            UsersCommand::Me => {
                print_payload(gateway.current_user().await?)?;
            }
            UsersCommand::Create { name, email, role } => {
                let user = NewUser { name, email, role };
                print_payload(gateway.create_user(&user).await?)?;
            }
        },
        Command::Appointments { command } => match command {
            AppointmentsCommand::List => {
                ensure_user_exists(&gateway).await;
                print_payload(gateway.list_appointments().await?)?;
            }
            AppointmentsCommand::Create {
                patient_id,
                patient_name,
                doctor_id,
                doctor_name,
                specialty,
                date,
                description,
            } => {
                let appointment = NewAppointment {
                    patient_id,
                    patient_name,
                    doctor_id,
                    doctor_name,
                    specialty,
                    appointment_date: date,
                    description,
                };
                print_payload(gateway.create_appointment(&appointment).await?)?;
            }
        },
        Command::Images { command } => match command {
            ImagesCommand::List => {
                ensure_user_exists(&gateway).await;
                print_payload(gateway.list_images().await?)?;
            }
            ImagesCommand::Upload { file } => {
                let bytes = std::fs::read(&file)
                    .with_context(|| format!("failed to read {}", file.display()))?;
                let name = file
                    .file_name()
                    .and_then(|n| n.to_str())
                    .unwrap_or("upload")
                    .to_string();
                let content_type = guess_image_type(&file);
                print_payload(gateway.upload_image(&name, content_type, bytes).await?)?;
            }
            ImagesCommand::Get { id, out } => match gateway.fetch_image(&id).await? {
                Payload::Binary {
                    content_type,
                    bytes,
                } => {
                    if let Some(path) = out {
                        std::fs::write(&path, &bytes)
                            .with_context(|| format!("failed to write {}", path.display()))?;
                        println!("Wrote {} bytes to {}", bytes.len(), path.display());
                    } else {
                        println!("{} ({} bytes)", content_type, bytes.len());
                    }
                }
                other => print_payload(other)?,
            },
        },
    }

    Ok(())
}

/// GET /api/users/me before list operations so the gateway materialises the
/// user record on first contact. Best effort: a failure is logged, the main
/// call proceeds anyway.
async fn ensure_user_exists(gateway: &GatewayClient) {
    if let Err(e) = gateway.current_user().await {
        tracing::warn!("Could not verify user record: {}", e);
    }
}

fn print_status(session: &Session) {
    match session.status() {
        SessionStatus::Authenticated { claims, expiry_ms } => {
            println!("Authenticated");
            match claims {
                Some(claims) => match serde_json::to_string_pretty(&claims) {
                    Ok(pretty) => println!("{}", pretty),
                    Err(_) => println!("Token present (claims not printable)"),
                },
                None => println!("Token present (not a decodable JWT)"),
            }
            if let Some(ms) = expiry_ms {
                if let Some(when) = chrono::DateTime::from_timestamp_millis(ms as i64) {
                    println!("Stored expiry: {}", when.to_rfc3339());
                }
            }
        }
        SessionStatus::Anonymous => {
            println!("Not authenticated - run `clinic-admin login` first");
        }
    }
}

fn print_payload(payload: Payload) -> Result<()> {
    match payload {
        Payload::Json(value) => println!("{}", serde_json::to_string_pretty(&value)?),
        Payload::Text(text) => println!("{}", text),
        Payload::Binary {
            content_type,
            bytes,
        } => println!("{} ({} bytes)", content_type, bytes.len()),
    }
    Ok(())
}

fn guess_image_type(path: &Path) -> &'static str {
    match path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .as_deref()
    {
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        _ => "application/octet-stream",
    }
}
