//! Backend build-file emission: ninja and make renderings of a BuildConfig.
//!
//! The emitted files are consumed by an external runner; Mason itself never
//! spawns compile jobs.

use std::collections::BTreeMap;

use crate::config::{BuildConfig, Target, TargetType};
use crate::graph::Graph;

/// Pick the compile driver: explicit overrides win, otherwise the project
/// language decides.
fn compiler_for(config: &BuildConfig) -> String {
    if let Some(cxx) = &config.cxx {
        return cxx.clone();
    }
    if let Some(cc) = &config.cc {
        return cc.clone();
    }
    if config.language == "c" {
        "cc".to_string()
    } else {
        "c++".to_string()
    }
}

fn define_flags(defines: &BTreeMap<String, String>) -> Vec<String> {
    defines
        .iter()
        .map(|(k, v)| {
            if v.is_empty() {
                format!("-D{}", k)
            } else {
                format!("-D{}={}", k, v)
            }
        })
        .collect()
}

fn global_compile_flags(config: &BuildConfig) -> Vec<String> {
    let mut flags = Vec::new();
    if !config.standard.is_empty() {
        flags.push(format!("-std={}", config.standard));
    }
    flags.extend(config.global_flags.iter().cloned());
    flags.extend(config.global_includes.iter().map(|d| format!("-I{}", d)));
    flags.extend(define_flags(&config.global_defines));
    flags
}

fn target_compile_flags(config: &BuildConfig, target: &Target) -> String {
    let mut flags = global_compile_flags(config);
    flags.extend(target.flags.iter().cloned());
    flags.extend(target.includes.iter().map(|d| format!("-I{}", d)));
    flags.extend(define_flags(&target.defines));
    flags.join(" ")
}

fn object_path(target: &Target, source: &str) -> String {
    let stem = source.replace('/', "_").replace('\\', "_");
    format!("obj/{}/{}.o", target.name, stem)
}

fn output_path(target: &Target) -> String {
    match target.kind {
        TargetType::Executable => target.name.clone(),
        TargetType::StaticLibrary => format!("lib{}.a", target.name),
        TargetType::SharedLibrary => format!("lib{}.so", target.name),
        TargetType::Object | TargetType::Custom => format!("{}.out", target.name),
    }
}

fn dependency_outputs(config: &BuildConfig, target: &Target) -> Vec<String> {
    target
        .dependencies
        .iter()
        .filter_map(|dep| config.target(dep).map(output_path))
        .collect()
}

/// Targets in build order (dependencies first); on cyclic input falls back
/// to declaration order so the runner can still report the problem.
fn ordered_targets<'a>(config: &'a BuildConfig) -> Vec<&'a Target> {
    let graph = Graph::from_config(config);
    let order = graph.topological_sort();
    if order.len() == config.targets.len() {
        order
            .iter()
            .filter_map(|name| config.target(name))
            .collect()
    } else {
        config.targets.iter().collect()
    }
}

/// Render a `build.ninja` for the given configuration.
pub fn generate_ninja(config: &BuildConfig) -> String {
    let cc = compiler_for(config);
    let mut out = String::new();
    out.push_str("# generated by mason, do not edit\n");
    out.push_str("ninja_required_version = 1.5\n\n");
    out.push_str(&format!("cc = {}\n", cc));
    out.push_str(&format!("cflags = {}\n\n", global_compile_flags(config).join(" ")));

    out.push_str("rule compile\n");
    out.push_str("  command = $cc $cflags $extra -c $in -o $out\n");
    out.push_str("  description = CC $out\n\n");
    out.push_str("rule link\n");
    out.push_str("  command = $cc $in -o $out $ldflags\n");
    out.push_str("  description = LINK $out\n\n");
    out.push_str("rule archive\n");
    out.push_str("  command = ar rcs $out $in\n");
    out.push_str("  description = AR $out\n\n");
    out.push_str("rule shared\n");
    out.push_str("  command = $cc -shared $in -o $out $ldflags\n");
    out.push_str("  description = SHLIB $out\n\n");

    for target in ordered_targets(config) {
        let mut extra = Vec::new();
        extra.extend(target.flags.iter().cloned());
        extra.extend(target.includes.iter().map(|d| format!("-I{}", d)));
        extra.extend(define_flags(&target.defines));
        if target.kind == TargetType::SharedLibrary {
            extra.push("-fPIC".to_string());
        }
        let extra = extra.join(" ");

        let mut objects = Vec::new();
        for source in &target.sources {
            let obj = object_path(target, source);
            out.push_str(&format!("build {}: compile {}\n", obj, source));
            if !extra.is_empty() {
                out.push_str(&format!("  extra = {}\n", extra));
            }
            objects.push(obj);
        }

        let inputs: Vec<String> = objects
            .iter()
            .cloned()
            .chain(dependency_outputs(config, target))
            .collect();
        let output = output_path(target);
        let rule = match target.kind {
            TargetType::StaticLibrary => "archive",
            TargetType::SharedLibrary => "shared",
            _ => "link",
        };
        out.push_str(&format!("build {}: {} {}\n", output, rule, inputs.join(" ")));
        if rule != "archive" && !target.link_flags.is_empty() {
            out.push_str(&format!("  ldflags = {}\n", target.link_flags.join(" ")));
        }
        out.push('\n');
    }

    let outputs: Vec<String> = config.targets.iter().map(output_path).collect();
    if !outputs.is_empty() {
        out.push_str(&format!("default {}\n", outputs.join(" ")));
    }
    out
}

/// Render a `Makefile` for the given configuration.
pub fn generate_makefile(config: &BuildConfig) -> String {
    let cc = compiler_for(config);
    let mut out = String::new();
    out.push_str("# generated by mason, do not edit\n");
    out.push_str(&format!("CC := {}\n", cc));
    out.push_str(&format!("CFLAGS := {}\n\n", global_compile_flags(config).join(" ")));

    let outputs: Vec<String> = config.targets.iter().map(output_path).collect();
    out.push_str(&format!(".PHONY: all\nall: {}\n\n", outputs.join(" ")));

    for target in ordered_targets(config) {
        let flags = target_compile_flags(config, target);
        let mut objects = Vec::new();
        for source in &target.sources {
            let obj = object_path(target, source);
            out.push_str(&format!("{}: {}\n", obj, source));
            out.push_str("\t@mkdir -p $(dir $@)\n");
            out.push_str(&format!("\t$(CC) {} -c $< -o $@\n\n", flags));
            objects.push(obj);
        }

        let deps = dependency_outputs(config, target);
        let output = output_path(target);
        let inputs: Vec<String> = objects.iter().cloned().chain(deps).collect();
        out.push_str(&format!("{}: {}\n", output, inputs.join(" ")));
        match target.kind {
            TargetType::StaticLibrary => {
                out.push_str("\tar rcs $@ $^\n\n");
            }
            TargetType::SharedLibrary => {
                out.push_str(&format!(
                    "\t$(CC) -shared $^ -o $@ {}\n\n",
                    target.link_flags.join(" ")
                ));
            }
            _ => {
                out.push_str(&format!(
                    "\t$(CC) $^ -o $@ {}\n\n",
                    target.link_flags.join(" ")
                ));
            }
        }
    }
    out
}
