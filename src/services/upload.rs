//! Copy the generated artifacts to object storage under a data row prefix.

use crate::client::{DirectoryStore, GcsClient, ObjectStore};
use crate::config::Config;
use log::{info, warn};
use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

pub const FOLDERS: [&str; 3] = ["data", "outputs", "scripts"];
pub const ALLOWED_EXTENSIONS: [&str; 5] = ["py", "html", "csv", "png", "npy"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedUpload {
    pub local_path: PathBuf,
    pub object_name: String,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct UploadReport {
    pub uploaded: usize,
    pub failed: Vec<String>,
}

/// A data row id starts with `cm` and is otherwise alphanumeric.
pub fn validate_prefix(prefix: &str) -> Result<(), String> {
    if prefix.starts_with("cm") && prefix.chars().all(|c| c.is_ascii_alphanumeric()) {
        Ok(())
    } else {
        Err(format!(
            "invalid data row id {:?}: it must start with 'cm' and contain only letters and numbers",
            prefix
        ))
    }
}

pub fn is_allowed(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| ALLOWED_EXTENSIONS.iter().any(|a| a.eq_ignore_ascii_case(e)))
        .unwrap_or(false)
}

/// Every allow-listed file under `base_dir/{data,outputs,scripts}`, as `<prefix>/<folder>/<relative path>`.
pub fn plan(base_dir: &Path, prefix: &str) -> Result<Vec<PlannedUpload>, String> {
    let mut planned = Vec::new();
    for folder in FOLDERS {
        let root = base_dir.join(folder);
        if !root.is_dir() {
            warn!("Upload: {} does not exist, skipping", root.display());
            continue;
        }
        for entry in WalkDir::new(&root).sort_by_file_name() {
            let entry = entry.map_err(|e| format!("walking {} failed: {}", root.display(), e))?;
            if !entry.file_type().is_file() || !is_allowed(entry.path()) {
                continue;
            }
            let relative = entry
                .path()
                .strip_prefix(&root)
                .map_err(|e| format!("{}: {}", entry.path().display(), e))?;
            let relative = relative
                .components()
                .map(|c| c.as_os_str().to_string_lossy())
                .collect::<Vec<_>>()
                .join("/");
            planned.push(PlannedUpload {
                local_path: entry.path().to_path_buf(),
                object_name: format!("{}/{}/{}", prefix, folder, relative),
            });
        }
    }
    Ok(planned)
}

pub fn content_type(path: &Path) -> &'static str {
    match path.extension().and_then(|e| e.to_str()).map(|e| e.to_ascii_lowercase()).as_deref() {
        Some("html") => "text/html; charset=utf-8",
        Some("csv") => "text/csv",
        Some("png") => "image/png",
        Some("py") => "text/x-python",
        _ => "application/octet-stream",
    }
}

/// Upload each planned file; failures are logged and collected rather than aborting the batch.
pub fn execute(store: &dyn ObjectStore, planned: &[PlannedUpload]) -> UploadReport {
    let mut report = UploadReport::default();
    for item in planned {
        let result = std::fs::read(&item.local_path)
            .map_err(|e| e.to_string())
            .and_then(|bytes| {
                store
                    .put_object(&item.object_name, &bytes, content_type(&item.local_path))
                    .map_err(|e| e.to_string())
            });
        match result {
            Ok(()) => {
                info!("Uploaded: {} -> {}", item.local_path.display(), store.uri(&item.object_name));
                report.uploaded += 1;
            }
            Err(e) => {
                warn!("Upload of {} failed: {}", item.local_path.display(), e);
                report.failed.push(item.object_name.clone());
            }
        }
    }
    report
}

fn prompt(input: &mut impl BufRead, output: &mut impl Write, question: &str) -> Result<String, String> {
    write!(output, "{}", question).and_then(|_| output.flush()).map_err(|e| e.to_string())?;
    let mut line = String::new();
    let read = input
        .read_line(&mut line)
        .map_err(|e| format!("reading stdin failed: {}", e))?;
    if read == 0 {
        return Err("stdin closed before an answer was given".to_string());
    }
    Ok(line.trim().to_string())
}

fn ask_prefix(input: &mut impl BufRead, output: &mut impl Write) -> Result<String, String> {
    loop {
        let answer = prompt(input, output, "Enter the Data Row ID (example: cmab3kuzr208x5641vpld9tq42): ")?;
        match validate_prefix(&answer) {
            Ok(()) => return Ok(answer),
            Err(e) => writeln!(output, "{}", e).map_err(|e| e.to_string())?,
        }
    }
}

pub fn run(cfg: &Config, assume_yes: bool) -> Result<(), String> {
    let mut input = std::io::stdin().lock();
    let mut output = std::io::stdout();
    let prefix = match cfg.upload.prefix.clone() {
        Some(p) => {
            validate_prefix(&p)?;
            p
        }
        None if assume_yes => return Err("FLEET_UPLOAD_PREFIX is required with --yes".to_string()),
        None => ask_prefix(&mut input, &mut output)?,
    };

    if !assume_yes {
        println!("\nPlease confirm that all files in your 'data', 'outputs', and 'scripts' folders are correct.");
        println!("Once uploaded, you will NOT be able to update or replace them.");
        let answer = prompt(
            &mut input,
            &mut output,
            "Type 'yes' to continue with the upload, or anything else to cancel: ",
        )?;
        if !answer.eq_ignore_ascii_case("yes") {
            info!("Upload cancelled");
            return Ok(());
        }
    }

    let store: Box<dyn ObjectStore> = match &cfg.upload.local_dir {
        Some(dir) => {
            info!("Upload: writing to local directory {}", dir.display());
            Box::new(DirectoryStore::new(dir.clone()))
        }
        None => Box::new(
            GcsClient::new(&cfg.upload.endpoint, &cfg.upload.bucket, cfg.upload.resolve_token()?)
                .map_err(|e| format!("storage client setup failed: {}", e))?,
        ),
    };

    let planned = plan(&cfg.base_dir, &prefix)?;
    info!("Upload: {} file(s) selected under {}", planned.len(), cfg.base_dir.display());
    let report = execute(store.as_ref(), &planned);
    if !report.failed.is_empty() {
        return Err(format!(
            "{} of {} upload(s) failed: {}",
            report.failed.len(),
            planned.len(),
            report.failed.join(", ")
        ));
    }

    println!("\nCopy-paste the following into the Labelbox editor:\n");
    println!("Generated Data URI: {}", store.uri(&format!("{}/data/", prefix)));
    println!("Scripts URI: {}", store.uri(&format!("{}/scripts/", prefix)));
    println!("Outputs URI: {}", store.uri(&format!("{}/outputs/", prefix)));
    info!("Upload: complete ({} file(s))", report.uploaded);
    Ok(())
}
