use crate::ast::*;
use crate::interpreter::agent::{Agent, ExecutionContext, ScriptOrModule};
use crate::interpreter::completion::Completion;
use crate::interpreter::environment::{Environment, EnvRef};
use crate::interpreter::exec::{lexical_declarations, var_declared_names, var_scoped_functions};
use crate::interpreter::object::PromiseCapability;
use crate::interpreter::property::{PropertyDescriptor, PropertyKey};
use crate::parser;
use crate::types::{JsString, JsValue};
use log::debug;
use rustc_hash::FxHashMap;

/// Local name for `export default <expression>` and anonymous default
/// function/class declarations. Not a legal identifier, so it can never
/// collide with source bindings.
pub const DEFAULT_EXPORT_BINDING: &str = "*default*";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ModuleStatus {
    Unlinked,
    Linking,
    Linked,
    Evaluating,
    Evaluated,
}

#[derive(Clone, Debug)]
pub enum ImportName {
    Name(String),
    Namespace,
}

#[derive(Clone, Debug)]
pub struct ImportEntry {
    pub request: String,
    pub import_name: ImportName,
    pub local_name: String,
}

/// Source-text module record (§16.2.1.6) with the cyclic-record fields
/// used by the Tarjan link/evaluate passes.
pub struct ModuleRecord {
    pub specifier: String,
    pub realm: usize,
    pub program: Program,
    pub environment: Option<EnvRef>,
    pub namespace: Option<u64>,
    pub requested: Vec<String>,
    pub import_entries: Vec<ImportEntry>,
    /// export name → local binding name.
    pub local_exports: Vec<(String, String)>,
    /// export name → (request, imported name).
    pub indirect_exports: Vec<(String, String, String)>,
    /// requests re-exported wholesale.
    pub star_exports: Vec<String>,
    pub status: ModuleStatus,
    pub evaluation_error: Option<JsValue>,
    pub dfs_index: Option<usize>,
    pub dfs_ancestor_index: Option<usize>,
    /// Memoised resolver results per specifier: the idempotence site.
    pub resolved: FxHashMap<String, usize>,
}

#[derive(Clone, Debug, PartialEq)]
pub enum ExportResolution {
    Resolved { module: usize, binding: String },
    Ambiguous,
    NotFound,
}

impl Agent {
    pub fn module_specifier(&self, id: usize) -> String {
        self.modules[id].specifier.clone()
    }

    pub fn module_status(&self, id: usize) -> ModuleStatus {
        self.modules[id].status
    }

    pub fn module_evaluation_error(&self, id: usize) -> Option<JsValue> {
        self.modules[id].evaluation_error.clone()
    }

    // ── parsing (§16.2.1.6.1 ParseModule) ────────────────────────────

    pub fn create_source_text_module(
        &mut self,
        realm: usize,
        specifier: &str,
        source: &str,
    ) -> Result<usize, JsValue> {
        let options = self.features.parser_options();
        let mut program = match parser::parse_module(source, options) {
            Ok(p) => p,
            Err(e) => {
                let env = self.realms[realm].global_env.clone();
                self.push_context(ExecutionContext {
                    function: None,
                    realm,
                    lexical_env: env.clone(),
                    variable_env: env,
                    script_or_module: None,
                    strict: true,
                });
                let error = self.syntax_error(&e.to_string());
                self.pop_context();
                return Err(error);
            }
        };
        name_anonymous_defaults(&mut program);

        let mut requested = Vec::new();
        let mut import_entries = Vec::new();
        let mut local_exports = Vec::new();
        let mut indirect_exports = Vec::new();
        let mut star_exports = Vec::new();

        for statement in &program.body {
            match statement {
                Statement::Import(decl) => {
                    push_unique(&mut requested, &decl.specifier);
                    for binding in &decl.bindings {
                        let entry = match binding {
                            ImportBinding::Default(local) => ImportEntry {
                                request: decl.specifier.clone(),
                                import_name: ImportName::Name("default".to_string()),
                                local_name: local.clone(),
                            },
                            ImportBinding::Named { import, local } => ImportEntry {
                                request: decl.specifier.clone(),
                                import_name: ImportName::Name(import.clone()),
                                local_name: local.clone(),
                            },
                            ImportBinding::Namespace(local) => ImportEntry {
                                request: decl.specifier.clone(),
                                import_name: ImportName::Namespace,
                                local_name: local.clone(),
                            },
                        };
                        import_entries.push(entry);
                    }
                }
                Statement::Export(decl) => match decl {
                    ExportDeclaration::Named { entries, from } => match from {
                        None => {
                            for entry in entries {
                                local_exports.push((entry.exported.clone(), entry.local.clone()));
                            }
                        }
                        Some(request) => {
                            push_unique(&mut requested, request);
                            for entry in entries {
                                indirect_exports.push((
                                    entry.exported.clone(),
                                    request.clone(),
                                    entry.local.clone(),
                                ));
                            }
                        }
                    },
                    ExportDeclaration::Star { alias, from } => {
                        push_unique(&mut requested, from);
                        match alias {
                            None => star_exports.push(from.clone()),
                            Some(alias) => {
                                // `export * as ns from "m"` binds the
                                // namespace locally under a synthetic
                                // name and exports that binding.
                                let synthetic = format!("*namespace*{alias}");
                                import_entries.push(ImportEntry {
                                    request: from.clone(),
                                    import_name: ImportName::Namespace,
                                    local_name: synthetic.clone(),
                                });
                                local_exports.push((alias.clone(), synthetic));
                            }
                        }
                    }
                    ExportDeclaration::Declaration(inner) => {
                        for name in declaration_bound_names(inner) {
                            local_exports.push((name.clone(), name));
                        }
                    }
                    ExportDeclaration::Default(inner) => {
                        let local = match inner.as_ref() {
                            Statement::FunctionDeclaration(f) => {
                                f.name.clone().unwrap_or_else(|| {
                                    DEFAULT_EXPORT_BINDING.to_string()
                                })
                            }
                            Statement::ClassDeclaration(c) => c
                                .name
                                .clone()
                                .unwrap_or_else(|| DEFAULT_EXPORT_BINDING.to_string()),
                            _ => DEFAULT_EXPORT_BINDING.to_string(),
                        };
                        local_exports.push(("default".to_string(), local));
                    }
                },
                _ => {}
            }
        }

        let id = self.modules.len();
        debug!("parsed module {specifier} as record {id}");
        self.modules.push(ModuleRecord {
            specifier: specifier.to_string(),
            realm,
            program,
            environment: None,
            namespace: None,
            requested,
            import_entries,
            local_exports,
            indirect_exports,
            star_exports,
            status: ModuleStatus::Unlinked,
            evaluation_error: None,
            dfs_index: None,
            dfs_ancestor_index: None,
            resolved: FxHashMap::default(),
        });
        Ok(id)
    }

    // ── host resolution (memoised per referrer/specifier) ────────────

    pub(crate) fn resolve_imported_module(
        &mut self,
        referrer: usize,
        specifier: &str,
    ) -> Result<usize, JsValue> {
        if let Some(found) = self.modules[referrer].resolved.get(specifier) {
            return Ok(*found);
        }
        let realm = self.modules[referrer].realm;
        let Some(resolver) = self.realms[realm].resolver.clone() else {
            return Err(self.type_error(&format!(
                "Cannot resolve module '{specifier}': no resolver installed"
            )));
        };
        let resolved = resolver(self, Some(referrer), specifier)?;
        self.modules[referrer]
            .resolved
            .insert(specifier.to_string(), resolved);
        Ok(resolved)
    }

    // ── linking (§16.2.1.5.1) ────────────────────────────────────────

    pub fn link_module(&mut self, id: usize) -> Result<(), JsValue> {
        debug_assert!(!matches!(
            self.modules[id].status,
            ModuleStatus::Linking | ModuleStatus::Evaluating
        ));
        let mut stack = Vec::new();
        match self.inner_module_linking(id, &mut stack, 0) {
            Ok(_) => {
                debug_assert!(matches!(
                    self.modules[id].status,
                    ModuleStatus::Linked | ModuleStatus::Evaluated
                ));
                Ok(())
            }
            Err(error) => {
                for module in stack {
                    self.modules[module].status = ModuleStatus::Unlinked;
                    self.modules[module].dfs_index = None;
                    self.modules[module].dfs_ancestor_index = None;
                }
                Err(error)
            }
        }
    }

    fn inner_module_linking(
        &mut self,
        id: usize,
        stack: &mut Vec<usize>,
        mut index: usize,
    ) -> Result<usize, JsValue> {
        match self.modules[id].status {
            ModuleStatus::Linking
            | ModuleStatus::Linked
            | ModuleStatus::Evaluating
            | ModuleStatus::Evaluated => return Ok(index),
            ModuleStatus::Unlinked => {}
        }
        self.modules[id].status = ModuleStatus::Linking;
        self.modules[id].dfs_index = Some(index);
        self.modules[id].dfs_ancestor_index = Some(index);
        index += 1;
        stack.push(id);

        let requested = self.modules[id].requested.clone();
        for request in requested {
            let required = self.resolve_imported_module(id, &request)?;
            index = self.inner_module_linking(required, stack, index)?;
            let required_status = self.modules[required].status;
            if required_status == ModuleStatus::Linking {
                let anc = self.modules[required]
                    .dfs_ancestor_index
                    .expect("linking module without ancestor index");
                let own = self.modules[id]
                    .dfs_ancestor_index
                    .expect("linking module without ancestor index");
                self.modules[id].dfs_ancestor_index = Some(own.min(anc));
            }
        }

        self.initialize_module_environment(id)?;

        if self.modules[id].dfs_ancestor_index == self.modules[id].dfs_index {
            loop {
                let member = stack.pop().expect("SCC stack underflow");
                self.modules[member].status = ModuleStatus::Linked;
                if member == id {
                    break;
                }
            }
        }
        Ok(index)
    }

    /// InitializeEnvironment (§16.2.1.6.4): build the module scope and
    /// wire import indirections. Runs under a context for the module's
    /// realm so allocations (namespaces, hoisted functions) land there.
    fn initialize_module_environment(&mut self, id: usize) -> Result<(), JsValue> {
        let realm = self.modules[id].realm;
        let global_env = self.realms[realm].global_env.clone();
        self.push_context(ExecutionContext {
            function: None,
            realm,
            lexical_env: global_env.clone(),
            variable_env: global_env,
            script_or_module: Some(ScriptOrModule::Module(id)),
            strict: true,
        });
        let result = self.initialize_module_environment_inner(id);
        self.pop_context();
        result
    }

    fn initialize_module_environment_inner(&mut self, id: usize) -> Result<(), JsValue> {
        let realm = self.modules[id].realm;
        let global_env = self.realms[realm].global_env.clone();
        let env = Environment::new_module(global_env);
        self.modules[id].environment = Some(env.clone());

        let imports = self.modules[id].import_entries.clone();
        for entry in imports {
            let imported = self.resolve_imported_module(id, &entry.request)?;
            match entry.import_name {
                ImportName::Namespace => {
                    let namespace = self.get_module_namespace(imported)?;
                    self.env_create_immutable_binding(&env, &entry.local_name);
                    self.env_initialize_binding(
                        &env,
                        &entry.local_name,
                        JsValue::object(namespace),
                    )?;
                }
                ImportName::Name(import_name) => {
                    let mut seen = Vec::new();
                    match self.resolve_export(imported, &import_name, &mut seen)? {
                        ExportResolution::Resolved { module, binding } => {
                            self.env_create_import_binding(
                                &env,
                                &entry.local_name,
                                module,
                                &binding,
                            );
                        }
                        ExportResolution::Ambiguous => {
                            return Err(self.syntax_error(&format!(
                                "The requested module '{}' contains conflicting star exports for name '{import_name}'",
                                entry.request
                            )));
                        }
                        ExportResolution::NotFound => {
                            return Err(self.syntax_error(&format!(
                                "The requested module '{}' does not provide an export named '{import_name}'",
                                entry.request
                            )));
                        }
                    }
                }
            }
        }

        // Hoisted declarations of the module body.
        let body: Vec<Statement> = self.modules[id].program.body.clone();
        for name in var_declared_names(&body) {
            self.env_create_mutable_binding(&env, &name, false)?;
            self.env_initialize_binding(&env, &name, JsValue::Undefined)?;
        }
        for (kind, name) in lexical_declarations(&body) {
            match kind {
                DeclarationKind::Const => self.env_create_immutable_binding(&env, &name),
                _ => self.env_create_mutable_binding(&env, &name, false)?,
            }
        }
        if module_has_default_expression_export(&body) {
            self.env_create_mutable_binding(&env, DEFAULT_EXPORT_BINDING, false)?;
        }
        // Hoisted function declarations close over the module scope.
        for func in var_scoped_functions(&body) {
            let name = func.name.clone().expect("module functions are named");
            self.env_create_mutable_binding(&env, &name, false)?;
            let value = self.instantiate_function(&func, &env, None);
            self.env_initialize_binding(&env, &name, value)?;
        }
        Ok(())
    }

    // ── export resolution (§16.2.1.6.3) ──────────────────────────────

    pub fn resolve_export(
        &mut self,
        id: usize,
        export_name: &str,
        resolve_set: &mut Vec<(usize, String)>,
    ) -> Result<ExportResolution, JsValue> {
        let key = (id, export_name.to_string());
        if resolve_set.contains(&key) {
            // Circular import of the same name resolves nowhere.
            return Ok(ExportResolution::NotFound);
        }
        resolve_set.push(key);

        let locals = self.modules[id].local_exports.clone();
        for (exported, local) in &locals {
            if exported == export_name {
                // A re-exported import resolves through to its origin.
                if let Some(env) = self.modules[id].environment.clone() {
                    let indirect = env
                        .borrow()
                        .bindings
                        .get(local)
                        .and_then(|b| b.indirect.clone());
                    if let Some((module, binding)) = indirect {
                        return Ok(ExportResolution::Resolved { module, binding });
                    }
                }
                return Ok(ExportResolution::Resolved {
                    module: id,
                    binding: local.clone(),
                });
            }
        }

        let indirects = self.modules[id].indirect_exports.clone();
        for (exported, request, import_name) in &indirects {
            if exported == export_name {
                let imported = self.resolve_imported_module(id, request)?;
                return self.resolve_export(imported, import_name, resolve_set);
            }
        }

        if export_name == "default" {
            // A default export is never drawn from star exports.
            return Ok(ExportResolution::NotFound);
        }

        let stars = self.modules[id].star_exports.clone();
        let mut star_resolution: Option<ExportResolution> = None;
        for request in &stars {
            let imported = self.resolve_imported_module(id, request)?;
            match self.resolve_export(imported, export_name, resolve_set)? {
                ExportResolution::Ambiguous => return Ok(ExportResolution::Ambiguous),
                ExportResolution::NotFound => {}
                resolution @ ExportResolution::Resolved { .. } => match &star_resolution {
                    None => star_resolution = Some(resolution),
                    Some(previous) if *previous == resolution => {}
                    Some(_) => return Ok(ExportResolution::Ambiguous),
                },
            }
        }
        Ok(star_resolution.unwrap_or(ExportResolution::NotFound))
    }

    /// GetExportedNames (§16.2.1.6.2).
    pub fn get_exported_names(
        &mut self,
        id: usize,
        export_star_set: &mut Vec<usize>,
    ) -> Result<Vec<String>, JsValue> {
        if export_star_set.contains(&id) {
            return Ok(Vec::new());
        }
        export_star_set.push(id);
        let mut names: Vec<String> = Vec::new();
        for (exported, _) in &self.modules[id].local_exports {
            push_unique(&mut names, exported);
        }
        for (exported, _, _) in &self.modules[id].indirect_exports {
            push_unique(&mut names, exported);
        }
        let stars = self.modules[id].star_exports.clone();
        for request in stars {
            let imported = self.resolve_imported_module(id, &request)?;
            for name in self.get_exported_names(imported, export_star_set)? {
                if name != "default" {
                    push_unique(&mut names, &name);
                }
            }
        }
        Ok(names)
    }

    // ── namespaces (§10.4.6 via accessors over live bindings) ────────

    /// The module namespace object: one frozen object whose getters read
    /// the live export bindings, so TDZ is observable through it.
    pub fn get_module_namespace(&mut self, id: usize) -> Result<u64, JsValue> {
        if let Some(ns) = self.modules[id].namespace {
            return Ok(ns);
        }
        let realm = self.modules[id].realm;
        let ns_id = self.object_create(None, realm);
        self.modules[id].namespace = Some(ns_id);

        let mut names = self.get_exported_names(id, &mut Vec::new())?;
        names.sort();
        for name in names {
            let mut seen = Vec::new();
            let ExportResolution::Resolved { module, binding } =
                self.resolve_export(id, &name, &mut seen)?
            else {
                continue;
            };
            let getter = self.create_native_function("get", 0, false, move |agent, _this, _args| {
                agent.module_binding_value(module, &binding)
            });
            let obj = self.get_object(ns_id).unwrap();
            obj.borrow_mut().define(
                PropertyKey::from_str(&name),
                PropertyDescriptor {
                    get: Some(getter),
                    set: None,
                    enumerable: Some(true),
                    configurable: Some(false),
                    ..Default::default()
                },
            );
        }
        let tag_key = PropertyKey::Symbol(self.well_known.to_string_tag.clone());
        let obj = self.get_object(ns_id).unwrap();
        {
            let mut data = obj.borrow_mut();
            data.class_name = "Module";
            data.define(
                tag_key,
                PropertyDescriptor::data(
                    JsValue::String(JsString::from_str("Module")),
                    false,
                    false,
                    false,
                ),
            );
            data.extensible = false;
        }
        Ok(ns_id)
    }

    /// Read a module-environment binding for import indirections and
    /// namespace getters; uninitialised bindings throw ReferenceError.
    pub(crate) fn module_binding_value(
        &mut self,
        module: usize,
        binding: &str,
    ) -> Result<JsValue, JsValue> {
        let Some(env) = self.modules[module].environment.clone() else {
            return Err(self.reference_error(&format!(
                "Cannot access '{binding}' before module linking"
            )));
        };
        self.get_binding_value(&env, binding, true)
    }

    // ── evaluation (§16.2.1.5.2) ─────────────────────────────────────

    /// Evaluate the module graph; the returned value is a promise,
    /// already settled because the supported grammar has no top-level
    /// await.
    pub fn evaluate_module(&mut self, id: usize) -> JsValue {
        debug_assert!(matches!(
            self.modules[id].status,
            ModuleStatus::Linked | ModuleStatus::Evaluated
        ));
        let realm = self.modules[id].realm;
        let env = self.realms[realm].global_env.clone();
        self.push_context(ExecutionContext {
            function: None,
            realm,
            lexical_env: env.clone(),
            variable_env: env,
            script_or_module: None,
            strict: true,
        });
        let capability = self
            .new_promise_capability_default()
            .expect("promise capability");

        let mut stack = Vec::new();
        let result = self.inner_module_evaluation(id, &mut stack, 0);
        match result {
            Ok(_) => {
                debug_assert!(self.modules[id].status == ModuleStatus::Evaluated);
                let _ = self.call(
                    &capability.resolve.clone(),
                    &JsValue::Undefined,
                    &[JsValue::Undefined],
                );
            }
            Err(error) => {
                for module in stack {
                    self.modules[module].status = ModuleStatus::Evaluated;
                    self.modules[module].evaluation_error = Some(error.clone());
                }
                self.modules[id].status = ModuleStatus::Evaluated;
                if self.modules[id].evaluation_error.is_none() {
                    self.modules[id].evaluation_error = Some(error.clone());
                }
                let _ = self.call(&capability.reject.clone(), &JsValue::Undefined, &[error]);
            }
        }
        self.pop_context();
        if self.contexts.is_empty() {
            self.run_jobs();
        }
        capability.promise
    }

    fn inner_module_evaluation(
        &mut self,
        id: usize,
        stack: &mut Vec<usize>,
        mut index: usize,
    ) -> Result<usize, JsValue> {
        match self.modules[id].status {
            ModuleStatus::Evaluated => {
                return match self.modules[id].evaluation_error.clone() {
                    Some(error) => Err(error),
                    None => Ok(index),
                };
            }
            ModuleStatus::Evaluating => return Ok(index),
            ModuleStatus::Linked => {}
            _ => panic!("evaluating an unlinked module"),
        }
        self.modules[id].status = ModuleStatus::Evaluating;
        self.modules[id].dfs_index = Some(index);
        self.modules[id].dfs_ancestor_index = Some(index);
        index += 1;
        stack.push(id);

        let requested = self.modules[id].requested.clone();
        for request in requested {
            let required = self.resolve_imported_module(id, &request)?;
            index = self.inner_module_evaluation(required, stack, index)?;
            if self.modules[required].status == ModuleStatus::Evaluating {
                let anc = self.modules[required].dfs_ancestor_index.unwrap();
                let own = self.modules[id].dfs_ancestor_index.unwrap();
                self.modules[id].dfs_ancestor_index = Some(own.min(anc));
            }
        }

        self.execute_module(id)?;

        if self.modules[id].dfs_ancestor_index == self.modules[id].dfs_index {
            loop {
                let member = stack.pop().expect("SCC stack underflow");
                self.modules[member].status = ModuleStatus::Evaluated;
                if member == id {
                    break;
                }
            }
        }
        Ok(index)
    }

    /// ExecuteModule: run the body inside the module environment.
    fn execute_module(&mut self, id: usize) -> Result<(), JsValue> {
        debug!("evaluating module {}", self.modules[id].specifier);
        let realm = self.modules[id].realm;
        let env = self.modules[id]
            .environment
            .clone()
            .expect("linked module without environment");
        let body = self.modules[id].program.body.clone();
        self.push_context(ExecutionContext {
            function: None,
            realm,
            lexical_env: env.clone(),
            variable_env: env,
            script_or_module: Some(ScriptOrModule::Module(id)),
            strict: true,
        });
        let completion = self.evaluate_statements(&body);
        self.pop_context();
        match completion {
            Completion::Throw(error) => Err(error),
            _ => Ok(()),
        }
    }

    // ── dynamic import (the job side) ────────────────────────────────

    pub(crate) fn run_dynamic_import_job(
        &mut self,
        referrer: Option<usize>,
        specifier: &str,
        capability: PromiseCapability,
    ) {
        let result = self.dynamic_import_inner(referrer, specifier);
        match result {
            Ok(namespace) => {
                let _ = self.call(
                    &capability.resolve.clone(),
                    &JsValue::Undefined,
                    &[JsValue::object(namespace)],
                );
            }
            Err(error) => {
                let _ = self.call(&capability.reject.clone(), &JsValue::Undefined, &[error]);
            }
        }
    }

    fn dynamic_import_inner(
        &mut self,
        referrer: Option<usize>,
        specifier: &str,
    ) -> Result<u64, JsValue> {
        let module = match referrer {
            Some(referrer) => self.resolve_imported_module(referrer, specifier)?,
            None => {
                let realm = self.current_realm();
                let Some(resolver) = self.realms[realm].resolver.clone() else {
                    return Err(self.type_error(&format!(
                        "Cannot resolve module '{specifier}': no resolver installed"
                    )));
                };
                resolver(self, None, specifier)?
            }
        };
        if self.modules[module].status == ModuleStatus::Unlinked {
            self.link_module(module)?;
        }
        let promise = self.evaluate_module(module);
        // No top-level await: the promise is settled; surface a
        // rejection as the import error.
        if let Some(error) = self.modules[module].evaluation_error.clone() {
            return Err(error);
        }
        self.get_module_namespace(module)
    }
}

fn push_unique(list: &mut Vec<String>, value: &str) {
    if !list.iter().any(|v| v == value) {
        list.push(value.to_string());
    }
}

/// Anonymous `export default function/class` declarations get the
/// synthetic binding name so hoisting and evaluation have something to
/// bind.
fn name_anonymous_defaults(program: &mut Program) {
    for statement in &mut program.body {
        if let Statement::Export(ExportDeclaration::Default(inner)) = statement {
            match inner.as_mut() {
                Statement::FunctionDeclaration(f) if f.name.is_none() => {
                    f.name = Some(DEFAULT_EXPORT_BINDING.to_string());
                }
                Statement::ClassDeclaration(c) if c.name.is_none() => {
                    c.name = Some(DEFAULT_EXPORT_BINDING.to_string());
                }
                _ => {}
            }
        }
    }
}

fn declaration_bound_names(statement: &Statement) -> Vec<String> {
    let mut out = Vec::new();
    match statement {
        Statement::Variable(decl) => {
            for declarator in &decl.declarators {
                declarator.pattern.bound_names(&mut out);
            }
        }
        Statement::FunctionDeclaration(f) => out.extend(f.name.clone()),
        Statement::ClassDeclaration(c) => out.extend(c.name.clone()),
        _ => {}
    }
    out
}

fn module_has_default_expression_export(body: &[Statement]) -> bool {
    body.iter().any(|s| {
        matches!(
            s,
            Statement::Export(ExportDeclaration::Default(inner))
                if matches!(inner.as_ref(), Statement::Expression(_))
        )
    })
}
