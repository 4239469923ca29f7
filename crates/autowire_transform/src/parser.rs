use log::{debug, trace};
use oxc_allocator::Allocator;
use oxc_ast::ast::*;
use oxc_ast_visit::{Visit, walk};
use oxc_parser::{Parser as OxcParser, ParserReturn};
use oxc_span::SourceType;
use oxc_syntax::scope::{ScopeFlags, ScopeId};
use std::{cell::Cell, collections::HashSet, path::Path};

use autowire_core::{AutowireError, Result};

/// Names a script refers to and names it binds.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ScriptAnalysis {
    /// Identifier references not bound by a function or block scope of the
    /// script itself, including `store` for every `$store`.
    pub references: HashSet<String>,
    /// Local names of import declarations.
    pub imported: HashSet<String>,
    /// Every other program-scope binding (variables, functions, classes).
    pub declared: HashSet<String>,
    /// Parameters of the script's leading function, if it starts with one.
    /// Markup blocks pass their bindings this way.
    pub parameters: HashSet<String>,
}

impl ScriptAnalysis {
    pub fn is_bound(&self, name: &str) -> bool {
        self.imported.contains(name) || self.declared.contains(name)
    }
}

/// Parses `src` and records its references and bindings into `analysis`.
pub fn analyze_script(
    src: &str,
    source_type: SourceType,
    path: &Path,
    analysis: &mut ScriptAnalysis,
) -> Result<()> {
    trace!("Parsing script of {} ({} bytes)", path.display(), src.len());
    let allocator = Allocator::default();
    let ParserReturn { program, errors, panicked, .. } =
        OxcParser::new(&allocator, src, source_type).parse();

    if panicked || !errors.is_empty() {
        let message = errors
            .first()
            .map(|e| e.to_string())
            .unwrap_or_else(|| "parser aborted".to_string());
        return Err(AutowireError::Parse { path: path.to_path_buf(), message });
    }

    for stmt in &program.body {
        if let Statement::ImportDeclaration(decl) = stmt
            && let Some(specifiers) = &decl.specifiers
        {
            for spec in specifiers {
                let local = match spec {
                    ImportDeclarationSpecifier::ImportSpecifier(s) => &s.local,
                    ImportDeclarationSpecifier::ImportDefaultSpecifier(s) => &s.local,
                    ImportDeclarationSpecifier::ImportNamespaceSpecifier(s) => &s.local,
                };
                trace!("Found import binding '{}' in {}", local.name, path.display());
                analysis.imported.insert(local.name.to_string());
            }
        }
    }

    let leading_function = match program.body.first() {
        Some(Statement::FunctionDeclaration(_)) => true,
        Some(Statement::ExpressionStatement(stmt)) => {
            matches!(stmt.expression.without_parentheses(), Expression::FunctionExpression(_))
        }
        _ => false,
    };

    let mut collector = NameCollector::default();
    collector.visit_program(&program);
    collector.finish(analysis, leading_function);
    debug!(
        "Script of {} has {} free references and {} imports",
        path.display(),
        analysis.references.len(),
        analysis.imported.len()
    );
    Ok(())
}

struct Scope {
    parent: Option<usize>,
    /// Function-like scopes receive hoisted `var` bindings.
    hoists_var: bool,
    names: HashSet<String>,
}

/// Records bindings per scope and references with the scope they occur in.
/// Scope 0 is the program.
#[derive(Default)]
struct NameCollector {
    scopes: Vec<Scope>,
    stack: Vec<usize>,
    references: Vec<(String, usize)>,
    /// The next binding identifier was already recorded.
    skip_binding: bool,
    /// Scope of the `var` declarator whose names are being visited.
    var_declarator: Option<usize>,
}

impl NameCollector {
    fn current(&self) -> Option<usize> {
        self.stack.last().copied()
    }

    fn var_scope(&self, mut scope: usize) -> usize {
        while !self.scopes[scope].hoists_var {
            match self.scopes[scope].parent {
                Some(parent) => scope = parent,
                None => break,
            }
        }
        scope
    }

    /// Scope that binds `name` as seen from `scope`.
    fn resolve(&self, name: &str, scope: usize) -> Option<usize> {
        let mut scope = Some(scope);
        while let Some(idx) = scope {
            if self.scopes[idx].names.contains(name) {
                return Some(idx);
            }
            scope = self.scopes[idx].parent;
        }
        None
    }

    fn finish(self, analysis: &mut ScriptAnalysis, leading_function: bool) {
        for (name, scope) in &self.references {
            // Program-scope bindings are left to the caller, which also
            // knows about other scripts of the same component.
            if matches!(self.resolve(name, *scope), None | Some(0)) {
                analysis.references.insert(name.clone());
            }
        }
        if let Some(program) = self.scopes.first() {
            analysis.declared.extend(program.names.iter().cloned());
        }
        if leading_function && let Some(first) = self.scopes.get(1) {
            analysis.parameters.extend(first.names.iter().cloned());
        }
    }
}

impl<'a> Visit<'a> for NameCollector {
    fn enter_scope(&mut self, flags: ScopeFlags, _scope_id: &Cell<Option<ScopeId>>) {
        self.scopes.push(Scope {
            parent: self.current(),
            hoists_var: flags.is_var(),
            names: HashSet::new(),
        });
        self.stack.push(self.scopes.len() - 1);
    }

    fn leave_scope(&mut self) {
        self.stack.pop();
    }

    fn visit_identifier_reference(&mut self, it: &IdentifierReference<'a>) {
        let Some(scope) = self.current() else { return };
        let name = it.name.as_str();
        // `$store` auto-subscribes to `store`
        if let Some(store) = name.strip_prefix('$')
            && !store.is_empty()
            && !store.starts_with('$')
        {
            self.references.push((store.to_string(), scope));
        }
        self.references.push((name.to_string(), scope));
    }

    fn visit_binding_identifier(&mut self, it: &BindingIdentifier<'a>) {
        if std::mem::take(&mut self.skip_binding) {
            return;
        }
        let Some(current) = self.current() else { return };
        let target =
            if self.var_declarator == Some(current) { self.var_scope(current) } else { current };
        self.scopes[target].names.insert(it.name.to_string());
    }

    fn visit_function(&mut self, it: &Function<'a>, flags: ScopeFlags) {
        // A declaration binds its name in the enclosing scope, but the walk
        // visits the name after entering the function's own scope.
        if it.is_declaration()
            && let Some(id) = &it.id
            && let Some(current) = self.current()
        {
            self.scopes[current].names.insert(id.name.to_string());
            self.skip_binding = true;
        }
        walk::walk_function(self, it, flags);
    }

    fn visit_variable_declarator(&mut self, it: &VariableDeclarator<'a>) {
        let outer = self.var_declarator;
        if it.kind.is_var() {
            self.var_declarator = self.current();
        }
        self.visit_binding_pattern(&it.id);
        self.var_declarator = outer;
        if let Some(init) = &it.init {
            self.visit_expression(init);
        }
    }
}

/// Source type for a standalone script module, keyed by extension.
pub fn source_type_for(path: &Path) -> SourceType {
    let ext = path.extension().and_then(|e| e.to_str());

    let mut st = SourceType::default()
        .with_jsx(matches!(ext, Some("tsx") | Some("jsx")))
        .with_typescript(matches!(ext, Some("ts") | Some("tsx") | Some("mts") | Some("cts")));

    // Anything but explicit CommonJS is treated as an ES module.
    if !matches!(ext, Some("cjs") | Some("cts")) {
        st = st.with_module(true);
    }

    st
}

/// Source type for a `<script>` block of a component.
pub fn component_source_type(typescript: bool) -> SourceType {
    SourceType::default().with_typescript(typescript).with_module(true)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn analyze(src: &str, st: SourceType) -> ScriptAnalysis {
        let mut analysis = ScriptAnalysis::default();
        analyze_script(src, st, Path::new("/p/test.js"), &mut analysis).unwrap();
        analysis
    }

    #[test]
    fn test_references_and_imports() {
        let a = analyze(
            "import Button from './Button.svelte';\nimport { a as b } from 'x';\nimport * as ns from 'y';\nconsole.log(debounce, Button);",
            component_source_type(false),
        );
        assert!(a.references.contains("debounce"));
        assert!(a.references.contains("console"));
        assert!(a.imported.contains("Button"));
        assert!(a.imported.contains("b"));
        assert!(a.imported.contains("ns"));
        assert!(!a.imported.contains("a"));
        assert!(a.is_bound("Button"));
        assert!(!a.is_bound("debounce"));
    }

    #[test]
    fn test_declarations_are_bound() {
        let a = analyze(
            "let count = 0; function inc(step) { count += step; } class Store {}",
            component_source_type(false),
        );
        for name in ["count", "inc", "Store"] {
            assert!(a.declared.contains(name), "missing binding {}", name);
        }
        assert!(!a.declared.contains("step"));
        assert!(a.references.contains("count"));
        assert!(!a.references.contains("step"));
    }

    #[test]
    fn test_nested_bindings_do_not_leak() {
        let a = analyze(
            "const items = [1].map((Button) => Button * 2);\n\
             function outer() { function inner() {} let local = 1; return inner(local); }\n\
             try { run(); } catch (err) { report(err); }",
            component_source_type(false),
        );
        for name in ["items", "outer"] {
            assert!(a.declared.contains(name), "missing binding {}", name);
        }
        for name in ["Button", "inner", "local", "err"] {
            assert!(!a.declared.contains(name), "leaked binding {}", name);
            assert!(!a.references.contains(name), "shadowed reference {}", name);
        }
        assert!(a.references.contains("run"));
        assert!(a.references.contains("report"));
    }

    #[test]
    fn test_var_hoists_to_program() {
        let a = analyze(
            "if (ready) { var hoisted = 1; let scoped = 2; }\nfunction f() { var inside = hoisted; }",
            component_source_type(false),
        );
        assert!(a.declared.contains("hoisted"));
        assert!(!a.declared.contains("scoped"));
        assert!(!a.declared.contains("inside"));
    }

    #[test]
    fn test_function_expression_name_is_local() {
        let a = analyze("const f = function helper() { return helper; };", component_source_type(false));
        assert!(a.declared.contains("f"));
        assert!(!a.declared.contains("helper"));
        assert!(!a.references.contains("helper"));
    }

    #[test]
    fn test_leading_function_parameters() {
        let a = analyze(
            "(function ({ id, label }, i) {(id);});(items);",
            component_source_type(false),
        );
        let mut params: Vec<&str> = a.parameters.iter().map(String::as_str).collect();
        params.sort();
        assert_eq!(params, vec!["i", "id", "label"]);
        assert!(a.references.contains("items"));
        assert!(!a.references.contains("id"));

        let a = analyze("(items.some((x) => x.ok));", component_source_type(false));
        assert!(a.parameters.is_empty());
    }

    #[test]
    fn test_store_subscription() {
        let a = analyze("console.log($session, $$props);", component_source_type(false));
        assert!(a.references.contains("$session"));
        assert!(a.references.contains("session"));
        assert!(!a.references.contains("$props"));
    }

    #[test]
    fn test_typescript_script() {
        let a = analyze(
            "export let size: number = 1;\nconst fmt = (v: number): string => format(v);",
            component_source_type(true),
        );
        assert!(a.references.contains("format"));
        assert!(a.declared.contains("size"));
    }

    #[test]
    fn test_syntax_error_is_parse_error() {
        let mut analysis = ScriptAnalysis::default();
        let err =
            analyze_script("let = ;", component_source_type(false), Path::new("/p/x.js"), &mut analysis)
                .unwrap_err();
        assert!(matches!(err, AutowireError::Parse { .. }));
    }

    #[test]
    fn test_source_type_for_extensions() {
        assert!(source_type_for(Path::new("a.ts")).is_typescript());
        assert!(source_type_for(Path::new("a.tsx")).is_jsx());
        assert!(source_type_for(Path::new("a.mjs")).is_module());
        assert!(!source_type_for(Path::new("a.cjs")).is_module());
    }
}
