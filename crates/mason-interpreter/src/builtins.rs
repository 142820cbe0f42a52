//! Host-provided builtin functions.
//!
//! A fixed table seeded before execution: filesystem probes, shell capture,
//! platform introspection and string/array helpers. A user-defined function
//! with the same name shadows its builtin from the definition onward.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use log::warn;
use walkdir::WalkDir;

use crate::value::Value;
use mason_syntax::error::{runtime_err, Result};

const NAMES: &[&str] = &[
    "glob",
    "file_exists",
    "read_file",
    "write_file",
    "dirname",
    "basename",
    "extension",
    "platform",
    "arch",
    "env",
    "shell",
    "run",
    "len",
    "join",
    "split",
    "contains",
    "print",
    "warning",
    "error",
    "find_package",
    "find_library",
];

pub(crate) fn is_builtin(name: &str) -> bool {
    NAMES.contains(&name)
}

/// Invoke a builtin. `warnings` collects messages from the `warning`
/// builtin for the caller's sink.
pub(crate) fn call(name: &str, args: &[Value], warnings: &mut Vec<String>) -> Result<Value> {
    match name {
        "glob" => Ok(Value::Array(match args.first() {
            Some(Value::Str(pattern)) => expand_glob(pattern)
                .into_iter()
                .map(Value::Str)
                .collect(),
            _ => Vec::new(),
        })),
        "file_exists" => {
            let path = want_str(name, args, 0, "a path")?;
            Ok(Value::Bool(Path::new(path).exists()))
        }
        "read_file" => {
            let path = want_str(name, args, 0, "a path")?;
            Ok(Value::Str(fs::read_to_string(path).unwrap_or_default()))
        }
        "write_file" => {
            let path = want_str(name, args, 0, "a path")?;
            let content = want_str(name, args, 1, "the content")?;
            Ok(Value::Bool(fs::write(path, content).is_ok()))
        }
        "dirname" => {
            let path = want_str(name, args, 0, "a path")?;
            let dir = Path::new(path)
                .parent()
                .map(|p| p.to_string_lossy().into_owned())
                .unwrap_or_default();
            Ok(Value::Str(dir))
        }
        "basename" => {
            let path = want_str(name, args, 0, "a path")?;
            let file = Path::new(path)
                .file_name()
                .map(|p| p.to_string_lossy().into_owned())
                .unwrap_or_default();
            Ok(Value::Str(file))
        }
        "extension" => {
            let path = want_str(name, args, 0, "a path")?;
            let ext = Path::new(path)
                .extension()
                .map(|e| format!(".{}", e.to_string_lossy()))
                .unwrap_or_default();
            Ok(Value::Str(ext))
        }
        "platform" => Ok(Value::Str(host_platform().to_string())),
        "arch" => Ok(Value::Str(host_arch().to_string())),
        "env" => {
            let key = want_str(name, args, 0, "a variable name")?;
            Ok(Value::Str(std::env::var(key).unwrap_or_default()))
        }
        "shell" => {
            let cmd = want_str(name, args, 0, "a command")?;
            Ok(Value::Str(shell_output(cmd)))
        }
        "run" => {
            let cmd = want_str(name, args, 0, "a command")?;
            Ok(Value::Number(run_status(cmd)))
        }
        "len" => match args.first() {
            Some(Value::Str(s)) => Ok(Value::Number(s.chars().count() as f64)),
            Some(Value::Array(items)) => Ok(Value::Number(items.len() as f64)),
            _ => runtime_err("len() expects a string or an array"),
        },
        "join" => {
            let items = match args.first() {
                Some(Value::Array(items)) => items,
                _ => return runtime_err("join() expects an array and a separator"),
            };
            let sep = want_str(name, args, 1, "a separator")?;
            let joined: Vec<String> = items.iter().map(|v| v.to_string()).collect();
            Ok(Value::Str(joined.join(sep)))
        }
        "split" => {
            let s = want_str(name, args, 0, "a string")?;
            let sep = want_str(name, args, 1, "a separator")?;
            Ok(Value::Array(split_string(s, sep)))
        }
        "contains" => {
            let items = match args.first() {
                Some(Value::Array(items)) => items,
                _ => return runtime_err("contains() expects an array and an element"),
            };
            let needle = args.get(1).map(|v| v.to_string()).unwrap_or_default();
            Ok(Value::Bool(items.iter().any(|v| v.to_string() == needle)))
        }
        "print" => {
            let line: Vec<String> = args.iter().map(|v| v.to_string()).collect();
            println!("{}", line.join(" "));
            Ok(Value::Nil)
        }
        "warning" => {
            if let Some(msg) = args.first() {
                let msg = msg.to_string();
                warn!("{}", msg);
                warnings.push(msg);
            }
            Ok(Value::Nil)
        }
        "error" => {
            let msg = args
                .first()
                .map(|v| v.to_string())
                .unwrap_or_else(|| "Build error".to_string());
            runtime_err(msg)
        }
        "find_package" => {
            let pkg = want_str(name, args, 0, "a package name")?;
            Ok(find_package(pkg))
        }
        "find_library" => {
            let lib = want_str(name, args, 0, "a library name")?;
            Ok(find_library(lib))
        }
        _ => runtime_err(format!("Unknown function: {}", name)),
    }
}

fn want_str<'a>(fn_name: &str, args: &'a [Value], index: usize, what: &str) -> Result<&'a str> {
    match args.get(index) {
        Some(Value::Str(s)) => Ok(s),
        _ => runtime_err(format!("{}() expects {} string", fn_name, what)),
    }
}

pub(crate) fn host_platform() -> &'static str {
    if cfg!(target_os = "windows") {
        "windows"
    } else if cfg!(target_os = "macos") {
        "macos"
    } else if cfg!(target_os = "linux") {
        "linux"
    } else if cfg!(target_os = "freebsd") {
        "freebsd"
    } else {
        "unix"
    }
}

pub(crate) fn host_arch() -> &'static str {
    if cfg!(target_arch = "x86_64") {
        "x86_64"
    } else if cfg!(target_arch = "x86") {
        "x86"
    } else if cfg!(target_arch = "aarch64") {
        "arm64"
    } else if cfg!(target_arch = "arm") {
        "arm"
    } else {
        "unknown"
    }
}

// Splits on the separator; an empty trailing piece is dropped, an empty
// separator leaves the string whole.
fn split_string(s: &str, sep: &str) -> Vec<Value> {
    if s.is_empty() {
        return Vec::new();
    }
    if sep.is_empty() {
        return vec![Value::Str(s.to_string())];
    }
    let mut parts: Vec<&str> = s.split(sep).collect();
    if parts.last() == Some(&"") {
        parts.pop();
    }
    parts
        .into_iter()
        .map(|p| Value::Str(p.to_string()))
        .collect()
}

fn shell_output(cmd: &str) -> String {
    let merged = format!("{} 2>&1", cmd);
    let result = if cfg!(windows) {
        Command::new("cmd").arg("/C").arg(&merged).output()
    } else {
        Command::new("sh").arg("-c").arg(&merged).output()
    };
    match result {
        Ok(out) => {
            let mut s = String::from_utf8_lossy(&out.stdout).into_owned();
            if s.ends_with('\n') {
                s.pop();
            }
            s
        }
        Err(_) => String::new(),
    }
}

fn run_status(cmd: &str) -> f64 {
    let result = if cfg!(windows) {
        Command::new("cmd").arg("/C").arg(cmd).status()
    } else {
        Command::new("sh").arg("-c").arg(cmd).status()
    };
    match result {
        Ok(status) => status.code().unwrap_or(-1) as f64,
        Err(_) => -1.0,
    }
}

fn find_package(pkg: &str) -> Value {
    let found = Command::new("pkg-config")
        .arg("--exists")
        .arg(pkg)
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false);
    if found {
        Value::Map(vec![
            ("name".to_string(), Value::Str(pkg.to_string())),
            ("found".to_string(), Value::Bool(true)),
        ])
    } else {
        Value::Nil
    }
}

fn find_library(lib: &str) -> Value {
    let search_paths = [
        "/usr/lib",
        "/usr/local/lib",
        "/usr/lib/x86_64-linux-gnu",
        "/lib",
        "/lib64",
    ];
    for dir in search_paths {
        let shared = Path::new(dir).join(format!("lib{}.so", lib));
        let archive = Path::new(dir).join(format!("lib{}.a", lib));
        if shared.exists() || archive.exists() {
            return Value::Map(vec![
                ("name".to_string(), Value::Str(lib.to_string())),
                ("found".to_string(), Value::Bool(true)),
                ("path".to_string(), Value::Str(dir.to_string())),
            ]);
        }
    }
    Value::Nil
}

// glob expansion
//
// `*` matches within one path segment, `?` matches one character, a segment
// of `**` matches zero or more directories (and every file below when it is
// the final segment). Expansion is eager and results are sorted per
// directory, so output is stable for a given tree.

fn expand_glob(pattern: &str) -> Vec<String> {
    if pattern.is_empty() {
        return Vec::new();
    }
    let absolute = pattern.starts_with('/');
    let segments: Vec<&str> = pattern.split('/').filter(|s| !s.is_empty()).collect();
    let mut base = PathBuf::from(if absolute { "/" } else { "." });
    let mut rest = &segments[..];
    while let Some((seg, tail)) = rest.split_first() {
        if seg.contains('*') || seg.contains('?') {
            break;
        }
        if tail.is_empty() {
            // fully literal pattern: the file itself
            let path = base.join(*seg);
            return if path.is_file() {
                vec![path_string(&path)]
            } else {
                Vec::new()
            };
        }
        base = base.join(*seg);
        rest = tail;
    }
    if rest.is_empty() {
        return Vec::new();
    }
    let mut out = Vec::new();
    walk(&base, rest, &mut out);
    // overlapping `**` arms can visit a file twice
    let mut seen = HashSet::new();
    out.retain(|p| seen.insert(p.clone()));
    out
}

fn walk(dir: &Path, segments: &[&str], out: &mut Vec<String>) {
    let Some((seg, rest)) = segments.split_first() else {
        return;
    };
    if *seg == "**" {
        if rest.is_empty() {
            for entry in WalkDir::new(dir)
                .sort_by_file_name()
                .into_iter()
                .filter_map(|e| e.ok())
            {
                if entry.file_type().is_file() {
                    out.push(path_string(entry.path()));
                }
            }
            return;
        }
        // zero directories consumed
        walk(dir, rest, out);
        // or descend while still matching `**`
        for sub in sorted_entries(dir) {
            if sub.is_dir() {
                walk(&sub, segments, out);
            }
        }
    } else if rest.is_empty() {
        for entry in sorted_entries(dir) {
            if entry.is_file() && name_matches(seg, &entry) {
                out.push(path_string(&entry));
            }
        }
    } else {
        for entry in sorted_entries(dir) {
            if entry.is_dir() && name_matches(seg, &entry) {
                walk(&entry, rest, out);
            }
        }
    }
}

fn sorted_entries(dir: &Path) -> Vec<PathBuf> {
    let mut entries: Vec<PathBuf> = fs::read_dir(dir)
        .map(|rd| rd.filter_map(|e| e.ok()).map(|e| e.path()).collect())
        .unwrap_or_default();
    entries.sort();
    entries
}

fn name_matches(pattern: &str, path: &Path) -> bool {
    let name = match path.file_name() {
        Some(n) => n.to_string_lossy(),
        None => return false,
    };
    let pat: Vec<char> = pattern.chars().collect();
    let text: Vec<char> = name.chars().collect();
    match_component(&pat, &text)
}

fn match_component(pat: &[char], text: &[char]) -> bool {
    match pat.first() {
        None => text.is_empty(),
        Some('*') => {
            match_component(&pat[1..], text)
                || (!text.is_empty() && match_component(pat, &text[1..]))
        }
        Some('?') => !text.is_empty() && match_component(&pat[1..], &text[1..]),
        Some(&c) => text.first() == Some(&c) && match_component(&pat[1..], &text[1..]),
    }
}

fn path_string(path: &Path) -> String {
    let s = path.to_string_lossy();
    match s.strip_prefix("./") {
        Some(stripped) => stripped.to_string(),
        None => s.into_owned(),
    }
}
