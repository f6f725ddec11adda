use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use memora_core::{Gallery, PersonDirectory, PersonRecord, RecognitionResult};
use std::path::{Path, PathBuf};

const DEFAULT_URL: &str = "http://127.0.0.1:8000";

#[derive(Parser)]
#[command(name = "memora", about = "Memora face recognition CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Send a photo to memorad and print who it is
    Scan {
        /// Image file to upload
        image: PathBuf,
        /// Base URL of the memorad server
        #[arg(long, default_value = DEFAULT_URL)]
        url: String,
    },
    /// Check that memorad is up
    Status {
        /// Base URL of the memorad server
        #[arg(long, default_value = DEFAULT_URL)]
        url: String,
    },
    /// Validate a person table and list its records
    People {
        /// Person table to check (default: the built-in table)
        #[arg(short, long)]
        file: Option<PathBuf>,
    },
    /// List reference photos in scan order with the record each resolves to
    Gallery {
        /// Reference photo directory
        dir: PathBuf,
        /// Person table to resolve against (default: the built-in table)
        #[arg(short, long)]
        file: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Scan { image, url } => scan(&image, &url).await?,
        Commands::Status { url } => status(&url).await?,
        Commands::People { file } => {
            let people = load_people(file.as_deref())?;
            println!("{} people", people.len());
            for (key, record) in people.iter() {
                println!("  {key:<12} {:<16} {}", record.relation, record.note);
            }
        }
        Commands::Gallery { dir, file } => {
            let people = load_people(file.as_deref())?;
            let rows = gallery_rows(&Gallery::new(&dir), &people)?;
            if rows.is_empty() {
                println!("No reference photos in {}", dir.display());
            }
            for row in rows {
                let marker = if row.listed { ' ' } else { '*' };
                println!("{marker} {:<12} {:<16} {}", row.name, row.record.relation, row.record.note);
            }
        }
    }

    Ok(())
}

fn load_people(file: Option<&Path>) -> Result<PersonDirectory> {
    match file {
        Some(path) => PersonDirectory::load(path)
            .with_context(|| format!("person table {}", path.display())),
        None => Ok(PersonDirectory::builtin()?),
    }
}

/// One reference photo and the record a match on it would report.
#[derive(Debug)]
struct GalleryRow {
    name: String,
    record: PersonRecord,
    /// False when the record is the FRIEND fallback.
    listed: bool,
}

/// Reference photos in scan order, resolved against `people`.
fn gallery_rows(gallery: &Gallery, people: &PersonDirectory) -> Result<Vec<GalleryRow>> {
    Ok(gallery
        .entries()?
        .into_iter()
        .map(|entry| GalleryRow {
            record: people.resolve(&entry.name),
            listed: people.get(&entry.name).is_some(),
            name: entry.name,
        })
        .collect())
}

/// Upload `image` as the `file` field, the way the browser client does.
async fn scan(image: &Path, url: &str) -> Result<()> {
    let bytes = std::fs::read(image).with_context(|| format!("reading {}", image.display()))?;
    let file_name = image
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "scan.jpg".to_string());
    tracing::debug!(file = %file_name, bytes = bytes.len(), "uploading");

    let form = reqwest::multipart::Form::new()
        .part("file", reqwest::multipart::Part::bytes(bytes).file_name(file_name));
    let result: RecognitionResult = reqwest::Client::new()
        .post(format!("{}/recognize", url.trim_end_matches('/')))
        .multipart(form)
        .send()
        .await
        .with_context(|| format!("contacting memorad at {url}"))?
        .error_for_status()?
        .json()
        .await
        .context("decoding recognition result")?;

    match &result {
        RecognitionResult::Success { name, relation, note } => {
            println!("{name}: {relation}");
            println!("{note}");
        }
        RecognitionResult::Unknown => println!("Unknown person"),
        RecognitionResult::NoFace => println!("No face detected; try another photo"),
        RecognitionResult::Error { message } => println!("Error: {message}"),
    }
    tracing::debug!(json = %serde_json::to_string(&result)?, "raw result");
    Ok(())
}

async fn status(url: &str) -> Result<()> {
    let body: serde_json::Value = reqwest::get(format!("{}/", url.trim_end_matches('/')))
        .await
        .with_context(|| format!("memorad not reachable at {url}"))?
        .error_for_status()?
        .json()
        .await?;
    println!(
        "memorad: {}",
        body.get("message").and_then(|m| m.as_str()).unwrap_or("unexpected response")
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_scan_defaults_to_local_server() {
        let cli = Cli::try_parse_from(["memora", "scan", "face.jpg"]).unwrap();
        let Commands::Scan { image, url } = cli.command else {
            panic!("expected scan");
        };
        assert_eq!(image, PathBuf::from("face.jpg"));
        assert_eq!(url, DEFAULT_URL);
    }

    #[test]
    fn test_gallery_rows_mark_fallback() {
        let tmp = tempfile::tempdir().unwrap();
        for f in ["shrey.jpg", "Stranger.png", "Aditya.jpeg", "notes.txt"] {
            std::fs::write(tmp.path().join(f), b"").unwrap();
        }
        let people = load_people(None).unwrap();
        let rows = gallery_rows(&Gallery::new(tmp.path()), &people).unwrap();

        let summary: Vec<_> = rows
            .iter()
            .map(|r| (r.name.as_str(), r.record.relation.as_str(), r.listed))
            .collect();
        assert_eq!(
            summary,
            vec![
                ("Aditya", "YOUR GRANDSON", true),
                ("Stranger", "FRIEND", false),
                ("shrey", "CHESS PARTNER", true),
            ]
        );
        assert_eq!(rows[1].record, PersonRecord::fallback());
    }

    #[test]
    fn test_gallery_rows_missing_dir() {
        let people = load_people(None).unwrap();
        assert!(gallery_rows(&Gallery::new("/nonexistent/known_faces"), &people).is_err());
    }

    #[test]
    fn test_load_builtin_people() {
        assert_eq!(load_people(None).unwrap().len(), 7);
    }
}
