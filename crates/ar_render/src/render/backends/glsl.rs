//! Minimal GLSL front end for the headless backend
//!
//! Enough of a compiler to catch the mistakes that matter without a GPU:
//! a missing `#version` line, a missing `main`, unbalanced conditionals,
//! unknown uniform types and uniforms declared differently in the two
//! stages. Conditional compilation is honored, so a uniform that only
//! exists under `#if USE_OCCLUSION` is absent from a program compiled with
//! `USE_OCCLUSION 0`, as it would be after a real driver's dead-code
//! elimination.

use std::collections::HashMap;

use crate::render::api::{UniformDecl, UniformKind};

/// Which stage a source belongs to (for error messages)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Vertex shader
    Vertex,
    /// Fragment shader
    Fragment,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Stage::Vertex => f.write_str("vertex"),
            Stage::Fragment => f.write_str("fragment"),
        }
    }
}

/// Compile one stage and return its active uniform declarations
pub fn compile_stage(source: &str, stage: Stage) -> Result<Vec<UniformDecl>, String> {
    let stripped = strip_comments(source);
    let first = stripped.lines().map(str::trim).find(|l| !l.is_empty());
    if !first.is_some_and(|l| l.starts_with("#version")) {
        return Err(format!("{} shader: first directive must be #version", stage));
    }

    let (code, defines) = preprocess(&stripped).map_err(|e| format!("{} shader: {}", stage, e))?;
    if !has_main(&code) {
        return Err(format!("{} shader: no entry point 'void main()'", stage));
    }
    scan_uniforms(&code, &defines).map_err(|e| format!("{} shader: {}", stage, e))
}

/// Merge the uniforms of both stages into one program interface
pub fn link(vertex: Vec<UniformDecl>, fragment: Vec<UniformDecl>) -> Result<Vec<UniformDecl>, String> {
    let mut merged = vertex;
    for decl in fragment {
        match merged.iter().find(|d| d.name == decl.name) {
            Some(existing) if existing != &decl => {
                return Err(format!("uniform '{}' declared with different types across stages", decl.name));
            }
            Some(_) => {}
            None => merged.push(decl),
        }
    }
    Ok(merged)
}

fn strip_comments(source: &str) -> String {
    let mut out = String::with_capacity(source.len());
    let mut chars = source.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '/' {
            match chars.peek() {
                Some('/') => {
                    for n in chars.by_ref() {
                        if n == '\n' {
                            out.push('\n');
                            break;
                        }
                    }
                    continue;
                }
                Some('*') => {
                    chars.next();
                    let mut prev = '\0';
                    for n in chars.by_ref() {
                        if n == '\n' {
                            out.push('\n');
                        }
                        if prev == '*' && n == '/' {
                            break;
                        }
                        prev = n;
                    }
                    out.push(' ');
                    continue;
                }
                _ => {}
            }
        }
        out.push(c);
    }
    out
}

struct Branch {
    parent_active: bool,
    taken: bool,
    active: bool,
}

/// Resolve `#define`/`#if` directives, returning active code and final defines
fn preprocess(source: &str) -> Result<(String, HashMap<String, String>), String> {
    let mut defines: HashMap<String, String> = HashMap::new();
    let mut stack: Vec<Branch> = Vec::new();
    let mut code = String::new();

    for line in source.lines() {
        let trimmed = line.trim();
        let active = stack.last().map_or(true, |b| b.active);

        let Some(directive) = trimmed.strip_prefix('#') else {
            if active {
                code.push_str(line);
                code.push('\n');
            }
            continue;
        };

        let directive = directive.trim_start();
        let (keyword, rest) = directive
            .split_once(char::is_whitespace)
            .map_or((directive, ""), |(k, r)| (k, r.trim()));

        match keyword {
            "define" if active => {
                let (name, value) = rest
                    .split_once(char::is_whitespace)
                    .map_or((rest, ""), |(n, v)| (n, v.trim()));
                if name.is_empty() {
                    return Err("#define without a name".to_string());
                }
                defines.insert(name.to_string(), value.to_string());
            }
            "undef" if active => {
                defines.remove(rest);
            }
            "if" | "ifdef" | "ifndef" => {
                let condition = match keyword {
                    "ifdef" => defines.contains_key(rest),
                    "ifndef" => !defines.contains_key(rest),
                    _ => active && evaluate(rest, &defines)?,
                };
                let taken = active && condition;
                stack.push(Branch { parent_active: active, taken, active: taken });
            }
            "elif" => {
                let branch = stack.last_mut().ok_or("#elif without #if")?;
                let condition = !branch.taken && branch.parent_active && evaluate(rest, &defines)?;
                branch.active = condition;
                branch.taken |= condition;
            }
            "else" => {
                let branch = stack.last_mut().ok_or("#else without #if")?;
                branch.active = branch.parent_active && !branch.taken;
                branch.taken = true;
            }
            "endif" => {
                stack.pop().ok_or("#endif without #if")?;
            }
            "error" if active => return Err(format!("#error {}", rest)),
            // #version, #extension, #pragma and inactive directives
            _ => {}
        }
    }

    if !stack.is_empty() {
        return Err("unterminated #if".to_string());
    }
    Ok((code, defines))
}

/// Evaluate a preprocessor condition: `||` of `&&` of optionally negated terms
fn evaluate(expr: &str, defines: &HashMap<String, String>) -> Result<bool, String> {
    if expr.is_empty() {
        return Err("#if with no expression".to_string());
    }
    for alternative in expr.split("||") {
        let mut all = true;
        for term in alternative.split("&&") {
            all &= evaluate_term(term.trim(), defines)?;
        }
        if all {
            return Ok(true);
        }
    }
    Ok(false)
}

fn evaluate_term(term: &str, defines: &HashMap<String, String>) -> Result<bool, String> {
    if let Some(inner) = term.strip_prefix('!') {
        return evaluate_term(inner.trim(), defines).map(|v| !v);
    }
    if let Some(inner) = term.strip_prefix('(').and_then(|t| t.strip_suffix(')')) {
        return evaluate(inner.trim(), defines);
    }
    if let Some(name) = term.strip_prefix("defined") {
        let name = name.trim().trim_start_matches('(').trim_end_matches(')').trim();
        return Ok(defines.contains_key(name));
    }
    if let Some((lhs, rhs)) = term.split_once("==") {
        return Ok(integer_value(lhs.trim(), defines)? == integer_value(rhs.trim(), defines)?);
    }
    if let Some((lhs, rhs)) = term.split_once("!=") {
        return Ok(integer_value(lhs.trim(), defines)? != integer_value(rhs.trim(), defines)?);
    }
    Ok(integer_value(term, defines)? != 0)
}

fn integer_value(token: &str, defines: &HashMap<String, String>) -> Result<i64, String> {
    if let Ok(value) = token.parse::<i64>() {
        return Ok(value);
    }
    if !is_identifier(token) {
        return Err(format!("cannot evaluate '{}'", token));
    }
    // Undefined identifiers evaluate to 0, as in C
    match defines.get(token) {
        Some(value) if value.is_empty() => Ok(0),
        Some(value) => value
            .trim()
            .parse::<i64>()
            .map_err(|_| format!("macro '{}' is not an integer", token)),
        None => Ok(0),
    }
}

fn is_identifier(token: &str) -> bool {
    let mut chars = token.chars();
    chars.next().is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn has_main(code: &str) -> bool {
    let compact: String = code.split_whitespace().collect::<Vec<_>>().join(" ");
    compact.contains("void main(") || compact.contains("void main (")
}

fn scan_uniforms(code: &str, defines: &HashMap<String, String>) -> Result<Vec<UniformDecl>, String> {
    let mut uniforms = Vec::new();
    for statement in code.split(|c| c == ';' || c == '{' || c == '}') {
        let mut tokens = statement.split_whitespace();
        if tokens.next() != Some("uniform") {
            continue;
        }
        let mut ty = tokens.next().ok_or("uniform without a type")?;
        if matches!(ty, "lowp" | "mediump" | "highp") {
            ty = tokens.next().ok_or("uniform without a type")?;
        }
        let kind = UniformKind::from_glsl(ty).ok_or_else(|| format!("unsupported uniform type '{}'", ty))?;

        let names: String = tokens.collect::<Vec<_>>().join("");
        for declarator in names.split(',').filter(|d| !d.is_empty()) {
            let (name, array_len) = match declarator.split_once('[') {
                Some((name, size)) => {
                    let size = size.trim_end_matches(']');
                    let len = integer_value(size, defines)?;
                    if len <= 0 {
                        return Err(format!("uniform '{}' has invalid array size", name));
                    }
                    (name, Some(len as usize))
                }
                None => (declarator, None),
            };
            if !is_identifier(name) {
                return Err(format!("invalid uniform name '{}'", name));
            }
            if uniforms.iter().any(|u: &UniformDecl| u.name == name) {
                return Err(format!("uniform '{}' redeclared", name));
            }
            uniforms.push(UniformDecl { name: name.to_string(), kind, array_len });
        }
    }
    Ok(uniforms)
}
