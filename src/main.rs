use clap::{Parser, Subcommand};
use image_barn::approval::{ApprovalPolicy, ApprovedUsers};
use image_barn::config::{self, BarnConfig};
use image_barn::imaging::RustBackend;
use image_barn::pool::TranscodePool;
use image_barn::store::{ImageStore, StoreError};
use image_barn::upload::{ContentType, Uploader};
use image_barn::{output, select};
use std::fs::File;
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "image-barn")]
#[command(about = "Per-user image store with draw-once semantics")]
#[command(long_about = "\
Per-user image store with draw-once semantics

Approved users keep up to five images each. Uploads are resized and stored
as lossy WebP. A draw serves one random image from any user and marks it
as a ghost so it is never drawn again.

Store layout:

  imagebarn.toml                  # Config (optional)
  approved-users.json             # {\"email\": true|false}
  images/
  ├── 15#ada@example.com/         # <len>#<email>
  │   ├── 13#sunset.jpg.webp      # <len>#<filename>
  │   └── 19#dawn.jpg.webp.ghost  # already drawn
  └── 15#bob@example.com/

Run 'image-barn gen-config' to generate a documented imagebarn.toml.")]
#[command(version)]
struct Cli {
    /// Directory holding imagebarn.toml; relative config paths resolve here
    #[arg(long, default_value = ".", global = true)]
    config_dir: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Approve a user and create their image directory
    Approve { email: String },
    /// Revoke a user and delete their image directory
    Disapprove { email: String },
    /// List the registry, or one user's images
    List { email: Option<String> },
    /// Store and transcode an image for a user
    Upload {
        email: String,
        file: PathBuf,
        /// MIME type; guessed from the file extension when omitted
        #[arg(long)]
        content_type: Option<String>,
    },
    /// Draw one random image and consume it
    Draw {
        /// Write the drawn image here instead of discarding the bytes
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Print the change fingerprint of a user's directory
    Fingerprint { email: String },
    /// Report whether every image in a user's directory has been drawn
    Exhausted { email: String },
    /// Retry transcoding raw uploads left by earlier failures
    Reprocess,
    /// Print a stock imagebarn.toml with all options documented
    GenConfig,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    if let Command::GenConfig = cli.command {
        print!("{}", config::stock_config_toml());
        return Ok(());
    }

    let config = config::load_startup_config(&cli.config_dir)?;
    let store = ImageStore::new(config.resolve(&cli.config_dir, &config.images_root));
    let registry_path = config.resolve(&cli.config_dir, &config.approved_users_file);
    let registry = ApprovedUsers::load(&registry_path, config.admin())?;

    match cli.command {
        Command::Approve { email } => {
            registry.approve(&email);
            let dir = store.create(&email)?;
            registry.save(&registry_path)?;
            info!(email, dir = %dir.display(), "approved");
        }
        Command::Disapprove { email } => {
            registry.disapprove(&email);
            store.delete(&email)?;
            registry.save(&registry_path)?;
            info!(email, "disapproved");
        }
        Command::List { email: None } => {
            for (email, approved) in registry.snapshot() {
                println!("{} {}", if approved { "approved" } else { "pending " }, email);
            }
        }
        Command::List { email: Some(email) } => {
            let entries = store.list(&email)?;
            output::print_lines(&output::format_listing(&email, &entries));
        }
        Command::Upload {
            email,
            file,
            content_type,
        } => {
            let approved = registry.is_approved(&email);
            // An unknown email is now recorded as pending.
            registry.save(&registry_path)?;
            if !approved {
                return Err(StoreError::Unauthorized(email).into());
            }
            let content_type = resolve_content_type(content_type, &file)?;
            let filename = file
                .file_name()
                .and_then(|n| n.to_str())
                .ok_or_else(|| format!("{} has no usable file name", file.display()))?
                .to_string();

            let uploader = uploader(&config, store)?;
            let path = uploader.upload(&email, &filename, &content_type, File::open(&file)?)?;
            println!("Stored {}", path.display());
            let user = uploader.store().auth_user(&email, &registry);
            output::print_lines(&output::format_user(&user));
        }
        Command::Draw { out } => {
            let mut rng = rand::thread_rng();
            let drawn = select::serve_and_consume(&store, &mut rng, config.ghosting.strategy)?;
            if let Some(out) = out {
                std::fs::write(&out, &drawn.bytes)?;
            }
            output::print_lines(&output::format_draw(&drawn));
        }
        Command::Fingerprint { email } => {
            println!("{}", output::format_fingerprint(&email, store.fingerprint(&email)));
        }
        Command::Exhausted { email } => {
            println!("{}", store.is_exhausted(&email));
        }
        Command::Reprocess => {
            let uploader = uploader(&config, store)?;
            let results = uploader.reprocess_pending()?;
            output::print_lines(&output::format_reprocess(&results));
        }
        // Printed before the config was loaded.
        Command::GenConfig => {}
    }

    Ok(())
}

/// Build the uploader with a pool sized from config.
///
/// The rayon global pool gets the same width so `reprocess` does not queue
/// more work than the transcode pool admits.
fn uploader(config: &BarnConfig, store: ImageStore) -> Result<Uploader<RustBackend>, String> {
    let width = NonZeroUsize::new(config.workers())
        .ok_or_else(|| "transcode.workers must be at least 1".to_string())?;
    rayon::ThreadPoolBuilder::new()
        .num_threads(width.get())
        .build_global()
        .ok();
    Ok(Uploader::new(
        store,
        Arc::new(TranscodePool::new(width)),
        RustBackend::new(),
    ))
}

/// Use the explicit content type, or guess one from `file`'s extension.
fn resolve_content_type(explicit: Option<String>, file: &Path) -> Result<String, String> {
    match explicit {
        Some(content_type) => Ok(content_type),
        None => ContentType::from_extension(file)
            .map(|ct| ct.mime().to_string())
            .ok_or_else(|| {
                warn!(file = %file.display(), "unknown extension");
                format!(
                    "cannot guess the content type of {}; pass --content-type",
                    file.display()
                )
            }),
    }
}
