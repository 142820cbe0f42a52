//! Tree-walking evaluator and build-model accumulator.

use std::collections::HashMap;

use log::debug;

use crate::builtins;
use crate::env::Env;
use crate::flow::Flow;
use crate::value::{value_to_string_list, Value};
use mason_core::{BuildConfig, DependencyInfo, Target, TargetType};
use mason_syntax::ast::{BinOp, Expr, Program, Stmt, TargetKind, UnOp};
use mason_syntax::error::{runtime_err, Result};

#[derive(Clone)]
struct UserFunction {
    params: Vec<String>,
    body: Vec<Stmt>,
}

/// Evaluates a parsed build file against the host environment.
///
/// One interpreter handles one run: seed variables with
/// [`Interpreter::set_variable`], call [`Interpreter::execute`], then
/// optionally invoke tasks. The first evaluation error aborts the run and
/// the partially accumulated model must be discarded.
pub struct Interpreter {
    env: Env,
    functions: HashMap<String, UserFunction>,
    tasks: HashMap<String, Vec<Stmt>>,
    config: BuildConfig,
    warnings: Vec<String>,
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new()
    }
}

impl Interpreter {
    pub fn new() -> Self {
        Self {
            env: Env::new(),
            functions: HashMap::new(),
            tasks: HashMap::new(),
            config: BuildConfig::default(),
            warnings: Vec::new(),
        }
    }

    /// Define a caller-provided variable (conventionally `builddir`,
    /// `buildtype`, `prefix`) as a string in the global frame.
    pub fn set_variable(&mut self, name: &str, value: &str) {
        self.env.define(name, Value::Str(value.to_string()));
    }

    /// Read a variable back as its stringification.
    pub fn get_variable(&self, name: &str) -> Option<String> {
        self.env.get(name).map(|v| v.to_string())
    }

    /// Messages emitted through the `warning` builtin, in order.
    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    /// Run the program and return the frozen build model.
    pub fn execute(&mut self, program: &Program) -> Result<BuildConfig> {
        self.env
            .define("platform", Value::Str(builtins::host_platform().to_string()));
        self.env
            .define("arch", Value::Str(builtins::host_arch().to_string()));
        for stmt in &program.statements {
            if let Flow::Return(_) = self.exec_stmt(stmt)? {
                return runtime_err("'return' outside of function");
            }
        }
        Ok(self.config.clone())
    }

    /// Run a task declared in the build file. Task bodies execute in a
    /// fresh child of the global frame and honor `return`.
    pub fn run_task(&mut self, name: &str) -> Result<()> {
        let body = match self.tasks.get(name) {
            Some(body) => body.clone(),
            None => return runtime_err(format!("Unknown task: {}", name)),
        };
        self.env.push_detached();
        let result = self.exec_body(&body);
        self.env.pop();
        result.map(|_| ())
    }

    fn exec_body(&mut self, body: &[Stmt]) -> Result<Flow> {
        for stmt in body {
            if let Flow::Return(v) = self.exec_stmt(stmt)? {
                return Ok(Flow::Return(v));
            }
        }
        Ok(Flow::Normal)
    }

    fn exec_stmt(&mut self, stmt: &Stmt) -> Result<Flow> {
        match stmt {
            Stmt::Project { name, body } => self.exec_project(name, body),
            Stmt::Target { kind, name, body } => self.exec_target(*kind, name, body),
            Stmt::Compiler { body } => self.exec_compiler(body),
            Stmt::Dependency { name, body } => self.exec_dependency(name, body),
            Stmt::Task { name, body } => {
                if self.tasks.insert(name.clone(), body.clone()).is_none() {
                    self.config.tasks.push(name.clone());
                }
                debug!("registered task '{}'", name);
                Ok(Flow::Normal)
            }
            // conditional bodies run in the current frame so their
            // assignments stay visible to an enclosing configuration block
            Stmt::If {
                condition,
                then_body,
                else_body,
            } => {
                if self.eval_expr(condition)?.is_truthy() {
                    self.exec_body(then_body)
                } else if let Some(else_body) = else_body {
                    self.exec_body(else_body)
                } else {
                    Ok(Flow::Normal)
                }
            }
            Stmt::Unless { condition, body } => {
                if !self.eval_expr(condition)?.is_truthy() {
                    self.exec_body(body)
                } else {
                    Ok(Flow::Normal)
                }
            }
            Stmt::For {
                variable,
                iterable,
                body,
            } => {
                let items = match self.eval_expr(iterable)? {
                    Value::Array(items) => items,
                    _ => return runtime_err("For loop requires an array"),
                };
                self.env.push();
                for item in items {
                    self.env.define(variable.clone(), item);
                    if let Flow::Return(v) = self.exec_body(body)? {
                        self.env.pop();
                        return Ok(Flow::Return(v));
                    }
                }
                self.env.pop();
                Ok(Flow::Normal)
            }
            Stmt::FunctionDef { name, params, body } => {
                self.functions.insert(
                    name.clone(),
                    UserFunction {
                        params: params.clone(),
                        body: body.clone(),
                    },
                );
                Ok(Flow::Normal)
            }
            Stmt::Assignment { name, value } => {
                let value = self.eval_expr(value)?;
                self.env.set(name, value);
                Ok(Flow::Normal)
            }
            Stmt::Return(value) => {
                let value = match value {
                    Some(expr) => self.eval_expr(expr)?,
                    None => Value::Nil,
                };
                Ok(Flow::Return(value))
            }
            Stmt::ExprStmt(expr) => {
                self.eval_expr(expr)?;
                Ok(Flow::Normal)
            }
        }
    }

    fn exec_project(&mut self, name: &str, body: &[Stmt]) -> Result<Flow> {
        self.config.project_name = name.to_string();
        self.env.push();
        let flow = self.exec_body(body)?;
        if let Some(version) = self.read_key("version") {
            self.config.version = version;
        }
        if let Some(lang) = self.read_key("lang") {
            if !matches!(lang.as_str(), "c" | "cpp" | "mixed") {
                return runtime_err(format!(
                    "Invalid project language '{}', expected \"c\", \"cpp\" or \"mixed\"",
                    lang
                ));
            }
            self.config.language = lang;
        }
        if let Some(std) = self.read_key("std") {
            self.config.standard = std;
        }
        if let Some(license) = self.read_key("license") {
            self.config.license = license;
        }
        self.env.pop();
        debug!("project '{}' configured", name);
        Ok(flow)
    }

    fn exec_target(&mut self, kind: TargetKind, name: &str, body: &[Stmt]) -> Result<Flow> {
        if self.config.has_target(name) {
            return runtime_err(format!("Duplicate target name '{}'", name));
        }
        let mut target = Target {
            name: name.to_string(),
            kind: match kind {
                TargetKind::Executable => TargetType::Executable,
                TargetKind::Library | TargetKind::StaticLibrary => TargetType::StaticLibrary,
                TargetKind::SharedLibrary => TargetType::SharedLibrary,
            },
            ..Target::default()
        };
        self.env.push();
        let flow = self.exec_body(body)?;
        target.sources = self.read_list("sources");
        target.includes = self.read_list("includes");
        target.flags = self.read_list("flags");
        target.link_flags = self.read_list("link_flags");
        target.dependencies = self.read_list("deps");
        for define in self.read_list("defines") {
            match define.split_once('=') {
                Some((key, value)) => {
                    target.defines.insert(key.to_string(), value.to_string());
                }
                None => {
                    target.defines.insert(define, String::new());
                }
            }
        }
        self.env.pop();
        debug!(
            "registered target '{}' with {} sources",
            target.name,
            target.sources.len()
        );
        self.config.targets.push(target);
        Ok(flow)
    }

    fn exec_compiler(&mut self, body: &[Stmt]) -> Result<Flow> {
        self.env.push();
        let flow = self.exec_body(body)?;
        let mut flags = self.read_list("flags");
        flags.extend(self.read_list("warnings"));
        self.config.global_flags.extend(flags);
        if let Some(cc) = self.read_key("cc") {
            self.config.cc = Some(cc);
        }
        if let Some(cxx) = self.read_key("cxx") {
            self.config.cxx = Some(cxx);
        }
        self.env.pop();
        Ok(flow)
    }

    fn exec_dependency(&mut self, name: &str, body: &[Stmt]) -> Result<Flow> {
        self.env.push();
        let flow = self.exec_body(body)?;
        let dep = DependencyInfo {
            name: name.to_string(),
            version: self.read_key("version").unwrap_or_default(),
            kind: self.read_key("kind").unwrap_or_default(),
            include_dirs: self.read_list("include_dirs"),
            link_dirs: self.read_list("link_dirs"),
            libraries: self.read_list("libraries"),
        };
        self.env.pop();
        debug!("registered dependency '{}'", dep.name);
        self.config.dependencies.push(dep);
        Ok(flow)
    }

    // recognized keys are read from the block's own frame only
    fn read_key(&self, key: &str) -> Option<String> {
        self.env.get_here(key).map(|v| v.to_string())
    }

    fn read_list(&self, key: &str) -> Vec<String> {
        self.env
            .get_here(key)
            .map(value_to_string_list)
            .unwrap_or_default()
    }

    fn eval_expr(&mut self, expr: &Expr) -> Result<Value> {
        match expr {
            Expr::StringLit(s) => Ok(Value::Str(s.clone())),
            Expr::NumberLit { value, .. } => Ok(Value::Number(*value)),
            Expr::BoolLit(b) => Ok(Value::Bool(*b)),
            Expr::NilLit => Ok(Value::Nil),
            // a symbol is its bare name at the value layer
            Expr::Symbol(name) => Ok(Value::Str(name.clone())),
            Expr::Ident(name) => {
                if let Some(v) = self.env.get(name) {
                    return Ok(v.clone());
                }
                if self.is_callable(name) {
                    return Ok(Value::FuncRef(name.clone()));
                }
                Ok(Value::Nil)
            }
            Expr::ArrayLit(elements) => {
                let mut items = Vec::with_capacity(elements.len());
                for e in elements {
                    items.push(self.eval_expr(e)?);
                }
                Ok(Value::Array(items))
            }
            Expr::MapLit(entries) => {
                let mut pairs = Vec::with_capacity(entries.len());
                for (key_expr, value_expr) in entries {
                    let key = self.eval_expr(key_expr)?.to_string();
                    let value = self.eval_expr(value_expr)?;
                    Value::map_insert(&mut pairs, key, value);
                }
                Ok(Value::Map(pairs))
            }
            Expr::Binary { op, left, right } => {
                let left = self.eval_expr(left)?;
                let right = self.eval_expr(right)?;
                self.eval_binary(*op, left, right)
            }
            Expr::Unary { op, operand } => {
                let operand = self.eval_expr(operand)?;
                match op {
                    UnOp::Neg => Ok(Value::Number(-operand.as_number()?)),
                    UnOp::Not => Ok(Value::Bool(!operand.is_truthy())),
                }
            }
            Expr::Call { name, args } => {
                let mut values = Vec::with_capacity(args.len());
                for arg in args {
                    values.push(self.eval_expr(arg)?);
                }
                self.call_function(name, values)
            }
            Expr::Member { object, name } => {
                let object = self.eval_expr(object)?;
                Ok(eval_member(&object, name))
            }
            Expr::Index { object, index } => {
                let object = self.eval_expr(object)?;
                let index = self.eval_expr(index)?;
                eval_index(&object, &index)
            }
        }
    }

    fn eval_binary(&mut self, op: BinOp, left: Value, right: Value) -> Result<Value> {
        match op {
            BinOp::Add => match (left, right) {
                (Value::Array(mut a), Value::Array(b)) => {
                    a.extend(b);
                    Ok(Value::Array(a))
                }
                (l, r) if matches!(l, Value::Str(_)) || matches!(r, Value::Str(_)) => {
                    Ok(Value::Str(format!("{}{}", l, r)))
                }
                (l, r) => Ok(Value::Number(l.as_number()? + r.as_number()?)),
            },
            BinOp::Sub => Ok(Value::Number(left.as_number()? - right.as_number()?)),
            BinOp::Mul => Ok(Value::Number(left.as_number()? * right.as_number()?)),
            BinOp::Div => {
                let divisor = right.as_number()?;
                if divisor == 0.0 {
                    return runtime_err("Division by zero");
                }
                Ok(Value::Number(left.as_number()? / divisor))
            }
            BinOp::Rem => {
                let l = left.as_number()?.trunc() as i64;
                let r = right.as_number()?.trunc() as i64;
                if r == 0 {
                    return runtime_err("Division by zero");
                }
                Ok(Value::Number((l % r) as f64))
            }
            BinOp::Eq => Ok(Value::Bool(values_equal(&left, &right))),
            BinOp::Ne => Ok(Value::Bool(!values_equal(&left, &right))),
            BinOp::Lt => Ok(Value::Bool(left.as_number()? < right.as_number()?)),
            BinOp::Gt => Ok(Value::Bool(left.as_number()? > right.as_number()?)),
            BinOp::Le => Ok(Value::Bool(left.as_number()? <= right.as_number()?)),
            BinOp::Ge => Ok(Value::Bool(left.as_number()? >= right.as_number()?)),
            // both operands are already evaluated; the result is a plain bool
            BinOp::And => Ok(Value::Bool(left.is_truthy() && right.is_truthy())),
            BinOp::Or => Ok(Value::Bool(left.is_truthy() || right.is_truthy())),
        }
    }

    fn call_function(&mut self, name: &str, args: Vec<Value>) -> Result<Value> {
        if let Some(func) = self.functions.get(name).cloned() {
            // missing arguments stay unbound, extra arguments are dropped
            self.env.push_detached();
            for (param, value) in func.params.iter().zip(args.into_iter()) {
                self.env.define(param.clone(), value);
            }
            let flow = self.exec_body(&func.body);
            self.env.pop();
            return Ok(match flow? {
                Flow::Return(v) => v,
                Flow::Normal => Value::Nil,
            });
        }
        if let Some(task) = name.strip_prefix("task_") {
            if self.tasks.contains_key(task) {
                let task = task.to_string();
                self.run_task(&task)?;
                return Ok(Value::Nil);
            }
        }
        if builtins::is_builtin(name) {
            return builtins::call(name, &args, &mut self.warnings);
        }
        runtime_err(format!("Unknown function: {}", name))
    }

    fn is_callable(&self, name: &str) -> bool {
        self.functions.contains_key(name)
            || name
                .strip_prefix("task_")
                .map_or(false, |t| self.tasks.contains_key(t))
            || builtins::is_builtin(name)
    }
}

fn values_equal(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::Str(a), Value::Str(b)) => a == b,
        (Value::Number(a), Value::Number(b)) => a == b,
        (Value::Bool(a), Value::Bool(b)) => a == b,
        // mixed types compare by stringification
        _ => left.to_string() == right.to_string(),
    }
}

fn eval_member(object: &Value, name: &str) -> Value {
    match object {
        Value::Map(_) => object.map_get(name).cloned().unwrap_or(Value::Nil),
        Value::Array(items) => match name {
            "length" | "size" => Value::Number(items.len() as f64),
            "empty" => Value::Bool(items.is_empty()),
            "first" => items.first().cloned().unwrap_or(Value::Nil),
            "last" => items.last().cloned().unwrap_or(Value::Nil),
            _ => Value::Nil,
        },
        Value::Str(s) => match name {
            "length" | "size" => Value::Number(s.chars().count() as f64),
            "empty" => Value::Bool(s.is_empty()),
            "upper" => Value::Str(s.to_uppercase()),
            "lower" => Value::Str(s.to_lowercase()),
            _ => Value::Nil,
        },
        _ => Value::Nil,
    }
}

fn eval_index(object: &Value, index: &Value) -> Result<Value> {
    match (object, index) {
        (Value::Array(items), Value::Number(n)) => {
            let idx = normalize_index(*n, items.len());
            Ok(idx.and_then(|i| items.get(i)).cloned().unwrap_or(Value::Nil))
        }
        (Value::Map(_), Value::Str(key)) => {
            Ok(object.map_get(key).cloned().unwrap_or(Value::Nil))
        }
        (Value::Str(s), Value::Number(n)) => {
            let chars: Vec<char> = s.chars().collect();
            let idx = normalize_index(*n, chars.len());
            Ok(idx
                .and_then(|i| chars.get(i))
                .map(|c| Value::Str(c.to_string()))
                .unwrap_or(Value::Nil))
        }
        _ => Ok(Value::Nil),
    }
}

// negative indices count from the end; out of range is None
fn normalize_index(n: f64, len: usize) -> Option<usize> {
    let mut idx = n.trunc() as i64;
    if idx < 0 {
        idx += len as i64;
    }
    if idx >= 0 && (idx as usize) < len {
        Some(idx as usize)
    } else {
        None
    }
}
