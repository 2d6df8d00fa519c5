use std::env;
use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process;

use hashline::{annotate_lines, apply_hashline_edits, HashlineEdit};

fn usage() {
    eprintln!(
        "Usage: hashline [--dry-run] [--stdin] <file|-> [edits.json]\n\n\
         Applies a JSON batch of hash-anchored edits to <file> in place.\n\
         The batch is an array of objects:\n\
           {{\"op\": \"replace\", \"pos\": \"12#QK\", \"end\": \"14#VR\", \"lines\": \"...\"}}\n\
           {{\"op\": \"append\",  \"pos\": \"3#MZ\",  \"lines\": [\"...\"]}}\n\
           {{\"op\": \"prepend\", \"lines\": \"...\"}}\n\
         If edits.json is omitted, the batch is read from stdin.\n\n\
         With --dry-run, no file is written; stdout shows the annotated result.\n\
         With --stdin, <file> must be '-' and the file content is read from\n\
         stdin (edits.json is then required); output is the annotated result.\n"
    );
}

fn is_binary(bytes: &[u8]) -> bool {
    bytes.iter().any(|&b| b == 0)
}

fn write_atomic(path: &Path, content: &str) -> io::Result<()> {
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let file_name = path
        .file_name()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "file".to_string());

    let perms = fs::metadata(path).map(|m| m.permissions()).ok();

    let pid = process::id();
    let mut attempt: u64 = 0;
    let tmp_path: PathBuf;
    loop {
        let candidate = dir.join(format!(".{file_name}.hashline.tmp.{pid}.{attempt}"));
        match fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&candidate)
        {
            Ok(mut f) => {
                use std::io::Write;
                f.write_all(content.as_bytes())?;
                f.sync_all()?;
                if let Some(p) = perms.clone() {
                    let _ = fs::set_permissions(&candidate, p);
                }
                tmp_path = candidate;
                break;
            }
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                attempt += 1;
                continue;
            }
            Err(e) => return Err(e),
        }
    }

    fs::rename(&tmp_path, path)?;
    Ok(())
}

fn read_batch(source: Option<&str>) -> Result<Vec<HashlineEdit>, String> {
    let json = match source {
        Some(path) => fs::read_to_string(path)
            .map_err(|e| format!("failed to read {path}: {e}"))?,
        None => {
            let mut buf = String::new();
            io::stdin()
                .read_to_string(&mut buf)
                .map_err(|e| format!("failed to read stdin: {e}"))?;
            buf
        }
    };
    serde_json::from_str(&json).map_err(|e| format!("invalid edit batch JSON: {e}"))
}

fn main() {
    let args: Vec<String> = env::args().collect();

    let mut dry_run = false;
    let mut stdin_mode = false;

    let mut idx = 1;
    while idx < args.len() {
        match args[idx].as_str() {
            "--dry-run" => {
                dry_run = true;
                idx += 1;
            }
            "--stdin" => {
                stdin_mode = true;
                idx += 1;
            }
            "--help" | "-h" => {
                usage();
                return;
            }
            s if s.starts_with('-') && s.len() > 1 => {
                eprintln!("error: unknown flag {s}");
                usage();
                process::exit(2);
            }
            _ => break,
        }
    }

    if idx >= args.len() {
        usage();
        process::exit(2);
    }

    let file = args[idx].clone();
    idx += 1;
    let batch_arg = args.get(idx).cloned();

    if args.len() > idx + 1 {
        usage();
        process::exit(2);
    }

    if stdin_mode {
        if file != "-" {
            eprintln!("error: with --stdin, file must be '-' (got '{file}')");
            process::exit(2);
        }
        // Stdin carries the file content, so the batch must come from a file.
        let Some(batch_path) = batch_arg.as_deref() else {
            eprintln!("error: --stdin requires an edits.json argument");
            process::exit(2);
        };

        let mut input = String::new();
        if let Err(e) = io::stdin().read_to_string(&mut input) {
            eprintln!("error: failed to read stdin: {e}");
            process::exit(1);
        }

        let edits = match read_batch(Some(batch_path)) {
            Ok(b) => b,
            Err(e) => {
                eprintln!("error: {e}");
                process::exit(2);
            }
        };

        let report = match apply_hashline_edits(&input, &edits) {
            Ok(r) => r,
            Err(e) => {
                eprintln!("error: {e}");
                process::exit(2);
            }
        };

        println!("{}", annotate_lines(&report.content));
        return;
    }

    // File mode.
    let bytes = match fs::read(&file) {
        Ok(b) => b,
        Err(e) => {
            eprintln!("error: failed to read {file}: {e}");
            process::exit(1);
        }
    };

    if is_binary(&bytes) {
        eprintln!("error: binary file rejected (NUL byte found)");
        process::exit(1);
    }

    let text = match String::from_utf8(bytes) {
        Ok(s) => s,
        Err(_) => {
            eprintln!("error: non-UTF8 file rejected");
            process::exit(1);
        }
    };

    let edits = match read_batch(batch_arg.as_deref()) {
        Ok(b) => b,
        Err(e) => {
            eprintln!("error: {e}");
            process::exit(2);
        }
    };

    let report = match apply_hashline_edits(&text, &edits) {
        Ok(r) => r,
        Err(e) => {
            eprintln!("error: {e}");
            process::exit(2);
        }
    };

    if dry_run {
        println!("{}", annotate_lines(&report.content));
        return;
    }

    if let Err(e) = write_atomic(Path::new(&file), &report.content) {
        eprintln!("error: failed to write {file}: {e}");
        process::exit(1);
    }

    let applied = edits.len() - report.noop_edits - report.deduplicated_edits;
    println!(
        "{} edit(s) applied, {} no-op(s), {} deduplicated",
        applied, report.noop_edits, report.deduplicated_edits
    );
}
