//! Subcommand implementations: each one runs the lex/parse/interpret
//! pipeline over `mason.build` and presents the result.

use std::fs;
use std::path::Path;

use owo_colors::OwoColorize;

use mason_core::{emit, BuildConfig, Graph};
use mason_interpreter::Interpreter;
use mason_lexer::Lexer;
use mason_parser::Parser;
use mason_syntax::error::Error;

use crate::{Cli, Command};

const BUILD_FILE: &str = "mason.build";

pub fn dispatch(cli: &Cli) -> i32 {
    match &cli.command {
        Command::Setup {
            source_dir,
            backend,
        } => cmd_setup(cli, source_dir, backend),
        Command::Graph { source_dir, format } => cmd_graph(cli, source_dir, format),
        Command::Tasks { source_dir } => cmd_tasks(cli, source_dir),
        Command::Task { name, source_dir } => cmd_task(cli, source_dir, name),
        Command::Info { source_dir } => cmd_info(cli, source_dir),
    }
}

fn render_error(kind: &str, source: &str, err: &Error) {
    eprintln!("{}: {}", kind.red().bold(), err.message().red());
    if let Some((line, col)) = err.position() {
        if let Some(src_line) = source.lines().nth(line - 1) {
            eprintln!("  {}", src_line.bright_black());
            let mut marker = String::new();
            if col > 1 {
                marker.push_str(&" ".repeat(col - 1));
            }
            marker.push('^');
            eprintln!("  {}", marker.red());
        } else {
            eprintln!("  at {}:{}", line, col);
        }
    }
}

fn fail(message: &str) -> i32 {
    eprintln!("{}: {}", "error".red().bold(), message.red());
    1
}

fn hint(message: &str) {
    eprintln!("  {}", message.bright_black());
}

/// Run the whole pipeline over `<source_dir>/mason.build`. Errors are
/// rendered here; the caller just propagates the exit code.
fn load(cli: &Cli, source_dir: &Path) -> Result<(BuildConfig, Interpreter), i32> {
    let build_file = source_dir.join(BUILD_FILE);
    if !build_file.exists() {
        let code = fail(&format!("No {} found in {}", BUILD_FILE, source_dir.display()));
        hint("Create a mason.build file describing your project");
        return Err(code);
    }
    let src = match fs::read_to_string(&build_file) {
        Ok(s) => s,
        Err(e) => {
            return Err(fail(&format!(
                "Failed to read {}: {}",
                build_file.display(),
                e
            )))
        }
    };

    let tokens = match Lexer::new(&src).tokenize() {
        Ok(t) => t,
        Err(e) => {
            render_error(e.label(), &src, &e);
            return Err(1);
        }
    };
    let program = match Parser::new(tokens).parse_program() {
        Ok(p) => p,
        Err(e) => {
            render_error(e.label(), &src, &e);
            return Err(1);
        }
    };

    let mut interp = Interpreter::new();
    interp.set_variable("builddir", &cli.builddir);
    interp.set_variable("buildtype", &cli.buildtype);
    interp.set_variable("prefix", &cli.prefix);
    match interp.execute(&program) {
        Ok(config) => Ok((config, interp)),
        Err(e) => {
            render_error(e.label(), &src, &e);
            Err(1)
        }
    }
}

fn cmd_setup(cli: &Cli, source_dir: &Path, backend: &str) -> i32 {
    let (config, _) = match load(cli, source_dir) {
        Ok(loaded) => loaded,
        Err(code) => return code,
    };

    let graph = Graph::from_config(&config);
    if let Err(e) = graph.validate() {
        render_error(e.label(), "", &e);
        return 1;
    }

    let contents = match backend {
        "ninja" => emit::generate_ninja(&config),
        "make" => emit::generate_makefile(&config),
        other => return fail(&format!("Unknown backend '{}', expected ninja or make", other)),
    };
    let file_name = if backend == "ninja" {
        "build.ninja"
    } else {
        "Makefile"
    };

    let build_dir = Path::new(&cli.builddir);
    if let Err(e) = fs::create_dir_all(build_dir) {
        return fail(&format!("Failed to create {}: {}", build_dir.display(), e));
    }
    let out_path = build_dir.join(file_name);
    if let Err(e) = fs::write(&out_path, contents) {
        return fail(&format!("Failed to write {}: {}", out_path.display(), e));
    }

    println!(
        "{} configured project {}",
        "ok".green().bold(),
        config.project_name.bold()
    );
    println!(
        "  {} target(s), wrote {}",
        config.targets.len(),
        out_path.display()
    );
    0
}

fn cmd_graph(cli: &Cli, source_dir: &Path, format: &str) -> i32 {
    let (config, _) = match load(cli, source_dir) {
        Ok(loaded) => loaded,
        Err(code) => return code,
    };
    let graph = Graph::from_config(&config);
    match format {
        "dot" => print!("{}", graph.to_dot()),
        "json" => println!("{}", graph.to_json()),
        other => return fail(&format!("Unknown format '{}', expected dot or json", other)),
    }
    0
}

fn cmd_tasks(cli: &Cli, source_dir: &Path) -> i32 {
    let (config, _) = match load(cli, source_dir) {
        Ok(loaded) => loaded,
        Err(code) => return code,
    };
    if config.tasks.is_empty() {
        println!("no tasks defined");
    } else {
        for name in &config.tasks {
            println!("{}", name);
        }
    }
    0
}

fn cmd_task(cli: &Cli, source_dir: &Path, name: &str) -> i32 {
    let (_, mut interp) = match load(cli, source_dir) {
        Ok(loaded) => loaded,
        Err(code) => return code,
    };
    match interp.run_task(name) {
        Ok(()) => {
            println!("{} task {}", "ok".green().bold(), name.bold());
            0
        }
        Err(e) => {
            render_error(e.label(), "", &e);
            1
        }
    }
}

fn cmd_info(cli: &Cli, source_dir: &Path) -> i32 {
    let (config, _) = match load(cli, source_dir) {
        Ok(loaded) => loaded,
        Err(code) => return code,
    };
    println!("{} {}", "project".bold(), config.project_name);
    if !config.version.is_empty() {
        println!("  version:  {}", config.version);
    }
    if !config.language.is_empty() {
        println!("  language: {}", config.language);
    }
    if !config.standard.is_empty() {
        println!("  standard: {}", config.standard);
    }
    if !config.license.is_empty() {
        println!("  license:  {}", config.license);
    }
    if !config.global_flags.is_empty() {
        println!("  flags:    {}", config.global_flags.join(" "));
    }
    println!("{}", "targets".bold());
    for target in &config.targets {
        println!(
            "  {} ({}, {} source(s))",
            target.name,
            target.kind.label(),
            target.sources.len()
        );
        if !target.dependencies.is_empty() {
            println!("    deps: {}", target.dependencies.join(", "));
        }
    }
    if !config.dependencies.is_empty() {
        println!("{}", "dependencies".bold());
        for dep in &config.dependencies {
            if dep.version.is_empty() {
                println!("  {}", dep.name);
            } else {
                println!("  {} {}", dep.name, dep.version);
            }
        }
    }
    if !config.tasks.is_empty() {
        println!("{}", "tasks".bold());
        for task in &config.tasks {
            println!("  {}", task);
        }
    }
    0
}
